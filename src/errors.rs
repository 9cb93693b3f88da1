//! Typed error hierarchy for the Bugboard client.
//!
//! `ClientError` covers everything a store can observe from the transport:
//! - `Network`: no response was received
//! - `Unauthorized`: 401; the transport has already cleared the session
//! - `Api`: 4xx with the server's message passed through verbatim
//! - `Server`: 5xx, treated as a generic failure
//!
//! Stores never let these escape; they keep `user_message()` in their
//! `error` slot and return `false` / `None` instead.

use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error: no response received";
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Errors surfaced by the API transport and the stores built on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Network error: no response received: {0}")]
    Network(String),

    #[error("Session expired or invalid: {message}")]
    Unauthorized { message: String },

    #[error("Request rejected ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid API base URL '{0}': expected an http(s) URL")]
    InvalidBaseUrl(String),

    #[error("{kind} {id} is not loaded")]
    NotCached { kind: &'static str, id: String },
}

impl ClientError {
    /// The message shown to the user: the server's own text where one was
    /// sent, otherwise a generic description.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::Unauthorized { message }
            | Self::Api { message, .. }
            | Self::Server { message, .. } => {
                if message.trim().is_empty() {
                    FALLBACK_ERROR_MESSAGE.to_string()
                } else {
                    message.clone()
                }
            }
            other => other.to_string(),
        }
    }

    /// HTTP status for errors that came with a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Api { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a non-2xx response by status code.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized { message },
            500..=599 => Self::Server { status, message },
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Pull a human-readable message out of an error body. The backend uses
/// `{"message": ..}` and falls back to `{"error": ..}`.
pub fn extract_message(status: u16, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.message.filter(|m| !m.trim().is_empty()) {
            return msg;
        }
        if let Some(msg) = parsed.error.filter(|m| !m.trim().is_empty()) {
            return msg;
        }
    }

    match status {
        401 => "Unauthorized".to_string(),
        403 => "You do not have permission".to_string(),
        404 => "Resource not found".to_string(),
        422 => "Invalid input".to_string(),
        500..=599 => "Internal server error".to_string(),
        _ => format!("Request failed with status code {}", status),
    }
}
