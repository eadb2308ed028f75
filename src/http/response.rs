//! HTTP response handling and classification

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requested decoding of the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    ArrayBuffer,
    Blob,
    Json,
}

impl std::str::FromStr for ResponseType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arraybuffer" => Ok(ResponseType::ArrayBuffer),
            "blob" => Ok(ResponseType::Blob),
            "json" => Ok(ResponseType::Json),
            _ => Err(()),
        }
    }
}

/// Parsed response body, present when a response type was requested
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Bytes(Vec<u8>),
}

/// A completed (or failed) exchange as reported by the host transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// HTTP status; 0 when no response was received
    pub status: u16,
    pub status_text: String,
    pub final_url: String,
    /// Raw CRLF-delimited header block
    pub response_headers: String,
    pub response_text: Option<String>,
    pub response: Option<ResponseBody>,
    pub context: Option<Value>,
    /// Transport-level failure description
    pub error: Option<String>,
}

/// Download progress reported while the body streams in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: Option<u64>,
}

/// Labels for common failure statuses.
///
/// Only used to classify rejected responses; success is exactly status 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    TooManyRequests = 429,
    InternalServerError = 500,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl ErrorStatus {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            400 => Some(ErrorStatus::BadRequest),
            401 => Some(ErrorStatus::Unauthorized),
            403 => Some(ErrorStatus::Forbidden),
            404 => Some(ErrorStatus::NotFound),
            405 => Some(ErrorStatus::MethodNotAllowed),
            408 => Some(ErrorStatus::RequestTimeout),
            429 => Some(ErrorStatus::TooManyRequests),
            500 => Some(ErrorStatus::InternalServerError),
            502 => Some(ErrorStatus::BadGateway),
            503 => Some(ErrorStatus::ServiceUnavailable),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}
