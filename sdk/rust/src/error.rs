use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Errors returned by [`ApiClient`](crate::ApiClient).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer. `body` is the backend's JSON error, or a synthesized
    /// `{"detail": ...}` when the body was not JSON.
    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: Value },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} returned no content")]
    Empty(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl ApiError {
    /// Build the error for a non-2xx response body.
    pub fn from_status(status: StatusCode, raw: &[u8]) -> Self {
        let body = serde_json::from_slice(raw).unwrap_or_else(|_| {
            serde_json::json!({
                "detail": format!("Unknown error (Status: {})", status.as_u16())
            })
        });
        Self::Status { status, body }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable message from the error body.
    ///
    /// Understands both `{"detail": "..."}` and validation errors shaped
    /// `{"detail": [{"msg": "..."}]}`.
    pub fn detail(&self) -> Option<&str> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        match body.get("detail")? {
            Value::String(message) => Some(message.as_str()),
            Value::Array(items) => items.first()?.get("msg")?.as_str(),
            _ => None,
        }
    }
}
