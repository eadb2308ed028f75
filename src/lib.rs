//! xhr-session - session-oriented request building over an injected transport
//!
//! This crate merges session-level and call-level headers, cookies, auth and
//! body into one request descriptor, hands it to a host [`Transport`], and
//! stops tracking cookies the host has taken over from `Set-Cookie` headers.

pub mod cli;
pub mod config;
pub mod cookie;
pub mod error;
pub mod exit_code;
pub mod header;
pub mod http;
pub mod logging;
pub mod options;
pub mod session;
pub mod utils;

pub use config::{Config, Method};
pub use cookie::{CookieJar, CookieSource};
pub use error::{Result, XhrError};
pub use header::{HeaderSet, HeaderValue, RawHeaders};
pub use http::auth::{Auth, BasicAuth, BearerAuth};
pub use http::response::{ErrorStatus, Response, ResponseBody, ResponseType};
pub use http::{Completion, RequestBody, RequestDescriptor, ReqwestTransport, Transport};
pub use options::{query, Body, FormData, Options, PassThrough, Query, QueryValue, RequestUrl};
pub use session::{BuildHook, Reply, Session};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-off GET on a fresh default session. `query` is used unless
/// `options.query` is already set.
pub async fn get(
    url: impl Into<RequestUrl>,
    query: Option<Query>,
    mut options: Options,
) -> Result<Reply> {
    if options.query.is_none() {
        options.query = query;
    }
    session()?.get(url, options).await
}

/// One-off POST on a fresh default session.
pub async fn post(url: impl Into<RequestUrl>, options: Options) -> Result<Reply> {
    session()?.post(url, options).await
}

/// A new session over the default reqwest transport.
pub fn session() -> Result<Session> {
    Session::with_config(Config::default())
}
