pub mod jwt;
pub mod otp;
pub mod password;

pub use jwt::{TokenClaims, TokenConfig, TokenType};
pub use password::PasswordHasher;
