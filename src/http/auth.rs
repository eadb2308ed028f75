//! HTTP authentication capabilities

use async_trait::async_trait;
use base64::Engine;

use crate::error::{Result, XhrError};
use crate::header::SharedHeaderSet;

/// Something that writes authorization material into a request's headers.
///
/// Runs concurrently with other auth capabilities and build hooks; it must not
/// assume any ordering relative to them.
#[async_trait]
pub trait Auth: Send + Sync {
    async fn build(&self, headers: &SharedHeaderSet) -> Result<()>;
}

/// `Authorization: Basic ...`
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse `user:password`; a missing password is empty.
    pub fn parse(input: &str) -> Result<Self> {
        let (username, password) = parse_user_pass(input)?;
        Ok(Self { username, password })
    }

    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }
}

#[async_trait]
impl Auth for BasicAuth {
    async fn build(&self, headers: &SharedHeaderSet) -> Result<()> {
        headers.lock().set("authorization", self.header_value());
        Ok(())
    }
}

/// `Authorization: Bearer ...`
#[derive(Debug, Clone)]
pub struct BearerAuth {
    pub token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl Auth for BearerAuth {
    async fn build(&self, headers: &SharedHeaderSet) -> Result<()> {
        if self.token.is_empty() {
            return Err(XhrError::Auth("Bearer token is empty".to_string()));
        }
        headers
            .lock()
            .set("authorization", format!("Bearer {}", self.token));
        Ok(())
    }
}

/// Parse user:password format
pub fn parse_user_pass(input: &str) -> Result<(String, String)> {
    match input.split_once(':') {
        Some((user, pass)) if !user.is_empty() => Ok((user.to_string(), pass.to_string())),
        None if !input.is_empty() => Ok((input.to_string(), String::new())),
        _ => Err(XhrError::Auth("Invalid user:password format".to_string())),
    }
}
