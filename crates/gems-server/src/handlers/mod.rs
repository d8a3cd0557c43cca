//! HTTP handlers
//!
//! Stateless read-only views over the in-memory mappings. No mutation
//! endpoints, no authentication.

pub mod meta;
pub mod notifications;
pub mod transactions;
pub mod users;

use serde::Serialize;

/// Error body for 404 responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn user_not_found() -> Self {
        Self {
            error: "User not found".to_string(),
        }
    }
}
