//! HTTP REST API
//!
//! - `common`: response envelope, validated JSON, cookies, client metadata
//! - `middleware`: session authentication
//! - `modules`: handlers grouped by resource
//! - `router`: route table, OpenAPI document and layers

pub mod common;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;

#[cfg(test)]
mod api_tests;

pub use error::{ApiError, ApiResult};
pub use router::{create_api_router, ApiDoc, RouterOptions};
pub use state::AppState;
