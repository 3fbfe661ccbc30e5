//! HTTP access to the operations backend.

pub mod api_types;
pub mod client;
pub mod error;

pub use client::{ApiClient, Params};
pub use error::ApiError;
