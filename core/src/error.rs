//! Error types for the marketplace API client.
//!
//! # Design
//! `Remote` carries the raw status and body of any non-2xx response so the
//! caller can tell a 429 from a 500 without the core guessing at retry
//! policy. `NotAuthenticated` is raised while *building* a request, before
//! anything reaches the wire.

use thiserror::Error;

/// Errors returned by `MarketClient` build/parse methods and transports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// The response body was not valid JSON or did not have the expected shape.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The operation needs a bearer token and the client has none.
    #[error("operation requires an authenticated client")]
    NotAuthenticated,

    /// The transport failed before any response was received.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl ApiError {
    /// Status code of a `Remote` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}
