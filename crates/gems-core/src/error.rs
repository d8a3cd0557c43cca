//! Error types for GemLedger

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GemsError>;

#[derive(Error, Debug)]
pub enum GemsError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Revision conflict on blob '{0}'")]
    RevisionConflict(String),

    #[error("Persist failed for '{mapping}': {message}")]
    Persist { mapping: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Comment error: {0}")]
    Comment(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for GemsError {
    fn from(e: serde_json::Error) -> Self {
        GemsError::Serialization(e.to_string())
    }
}
