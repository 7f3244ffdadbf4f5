//! Core entregas library (session, HTTP client, storage, endpoints, config).

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod reports;
pub mod store;
pub mod validation;

pub use errors::{ApiError, ApiErrorKind, ApiResult};
pub use http::ApiClient;
pub use store::TokenStore;
