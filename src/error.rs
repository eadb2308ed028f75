//! Error handling for xhr-session

use thiserror::Error;

use crate::http::response::{ErrorStatus, Response};

/// Main error type for session and request-building operations
#[derive(Error, Debug)]
pub enum XhrError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Body encoding error: {0}")]
    Encode(String),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Build hook error: {0}")]
    Hook(String),

    /// The host transport reported a failure; the response is passed on unmodified.
    #[error("Transport error: {}", transport_detail(.0))]
    Transport(Box<Response>),

    /// The request completed with a status other than 200.
    #[error("Request failed with status {}", .response.status)]
    Status {
        kind: Option<ErrorStatus>,
        response: Box<Response>,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl XhrError {
    /// The response carried by transport and status failures.
    pub fn response(&self) -> Option<&Response> {
        match self {
            XhrError::Transport(response) | XhrError::Status { response, .. } => Some(&**response),
            _ => None,
        }
    }
}

fn transport_detail(response: &Response) -> String {
    response
        .error
        .clone()
        .unwrap_or_else(|| format!("status {}", response.status))
}

/// Result type alias for xhr-session operations
pub type Result<T> = std::result::Result<T, XhrError>;
