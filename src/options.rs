//! Caller-facing request options

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::cookie::CookieSource;
use crate::error::Result;
use crate::header::RawHeaders;
use crate::http::auth::Auth;
use crate::http::response::{Progress, Response, ResponseType};

pub type ResponseCallback = Arc<dyn Fn(&Response) + Send + Sync>;
pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;
pub type EventCallback = Arc<dyn Fn() + Send + Sync>;

/// Target of a request, either still textual or already parsed
#[derive(Debug, Clone, PartialEq)]
pub enum RequestUrl {
    Raw(String),
    Parsed(Url),
}

impl fmt::Display for RequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestUrl::Raw(url) => f.write_str(url),
            RequestUrl::Parsed(url) => f.write_str(url.as_str()),
        }
    }
}

impl From<&str> for RequestUrl {
    fn from(url: &str) -> Self {
        RequestUrl::Raw(url.to_string())
    }
}

impl From<String> for RequestUrl {
    fn from(url: String) -> Self {
        RequestUrl::Raw(url)
    }
}

impl From<&String> for RequestUrl {
    fn from(url: &String) -> Self {
        RequestUrl::Raw(url.clone())
    }
}

impl From<Url> for RequestUrl {
    fn from(url: Url) -> Self {
        RequestUrl::Parsed(url)
    }
}

/// A query parameter value. Only `Text` values are appended to the URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Number(value as f64)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Number(f64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Number(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

pub type Query = IndexMap<String, QueryValue>;

/// Build a [`Query`] from literal pairs.
pub fn query<K: Into<String>, V: Into<QueryValue>, const N: usize>(pairs: [(K, V); N]) -> Query {
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// One part of a multipart form payload
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Multipart form payload; handed to the transport untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub parts: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                file_name: file_name.into(),
                mime,
                bytes,
            },
        ));
        self
    }
}

/// Raw `data` payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent verbatim
    Text(String),
    /// Multipart payload; the transport sets its own content type
    Multipart(FormData),
    /// Flat fields, url-encoded; every value must be a string or number
    Fields(Map<String, Value>),
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Multipart(form)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(fields: Map<String, Value>) -> Self {
        Body::Fields(fields)
    }
}

/// Options forwarded to the host transport as-is
#[derive(Clone, Default)]
pub struct PassThrough {
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub binary: bool,
    pub nocache: bool,
    pub revalidate: bool,
    pub context: Option<Value>,
    pub anonymous: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub on_load: Option<ResponseCallback>,
    pub on_error: Option<ResponseCallback>,
    pub on_abort: Option<EventCallback>,
    pub on_progress: Option<ProgressCallback>,
    pub on_readystatechange: Option<ResponseCallback>,
    pub on_timeout: Option<EventCallback>,
}

impl fmt::Debug for PassThrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThrough")
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("binary", &self.binary)
            .field("nocache", &self.nocache)
            .field("revalidate", &self.revalidate)
            .field("context", &self.context)
            .field("anonymous", &self.anonymous)
            .field("user", &self.user)
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-call options.
///
/// When both `json` and `data` are set, `json` wins.
#[derive(Clone, Default)]
pub struct Options {
    pub query: Option<Query>,
    pub headers: Option<RawHeaders>,
    pub json: Option<Value>,
    pub data: Option<Body>,
    /// Cookie patch; loses to a cookie embedded in `headers`
    pub cookie: Option<CookieSource>,
    pub auth: Option<Arc<dyn Auth>>,
    pub pass_through: PassThrough,
}

impl Options {
    /// Serialize any value as the JSON payload.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.json = Some(serde_json::to_value(value)?);
        Ok(self)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("json", &self.json)
            .field("data", &self.data)
            .field("cookie", &self.cookie)
            .field("auth", &self.auth.is_some())
            .field("pass_through", &self.pass_through)
            .finish()
    }
}
