pub mod client;
pub mod cookies;
pub mod response;
pub mod validated_json;

pub use client::Client;
pub use cookies::CookieConfig;
pub use response::ApiResponse;
pub use validated_json::ValidatedJson;
