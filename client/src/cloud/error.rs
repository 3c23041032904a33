//! Cloud API error types

use thiserror::Error;

use crate::resource::ResourceError;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Cloud client configuration error: {0}")]
    Config(String),

    #[error("Cloud API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cloud API call {method} failed: {message}")]
    Fault { method: String, message: String },

    #[error("Malformed cloud API response: {0}")]
    Response(String),

    #[error("Invalid page offset {0}: offsets start at 1")]
    InvalidPageOffset(u32),

    #[error("Malformed resource payload: {0}")]
    Resource(#[from] ResourceError),
}
