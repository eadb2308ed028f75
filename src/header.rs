//! Header storage with an embedded cookie jar
//!
//! Header names are stored lowercased. The `cookie` header is never stored
//! directly: writes to it are routed into the jar, and it is rendered from the
//! jar on demand.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;

use crate::cookie::{CookieJar, CookieSource};

/// Reserved header name backed by the cookie jar
pub const COOKIE: &str = "cookie";

/// A header value; repeated headers keep every value in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// All values in order
    pub fn values(&self) -> Vec<String> {
        match self {
            HeaderValue::Single(value) => vec![value.clone()],
            HeaderValue::Multi(values) => values.clone(),
        }
    }

    /// Flatten into one header line value (`,` separated).
    pub fn to_header_string(&self) -> String {
        match self {
            HeaderValue::Single(value) => value.clone(),
            HeaderValue::Multi(values) => values.join(","),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(first) => {
                *self = HeaderValue::Multi(vec![std::mem::take(first), value]);
            }
            HeaderValue::Multi(values) => values.push(value),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multi(values)
    }
}

/// A raw header mapping with an optional embedded cookie patch.
#[derive(Debug, Clone, Default)]
pub struct RawHeaders {
    pub headers: Vec<(String, HeaderValue)>,
    pub cookie: Option<CookieSource>,
}

impl RawHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header. A `cookie` header is parsed into the cookie patch.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        let name = name.into();
        let value = value.into();
        if name.eq_ignore_ascii_case(COOKIE) {
            let mut jar = match self.cookie.take() {
                Some(patch) => CookieJar::with_cookies(patch),
                None => CookieJar::new(),
            };
            jar.merge_from_header(&value.values());
            self.cookie = Some(CookieSource::Jar(jar));
        } else {
            self.headers.push((name, value));
        }
        self
    }

    /// Set the embedded cookie patch
    pub fn cookie(mut self, cookie: impl Into<CookieSource>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }
}

impl<K: Into<String>, V: Into<HeaderValue>, const N: usize> From<[(K, V); N]> for RawHeaders {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs
            .into_iter()
            .fold(RawHeaders::new(), |raw, (name, value)| raw.header(name, value))
    }
}

/// Anything a [`HeaderSet`] can be merged from.
#[derive(Debug, Clone)]
pub enum HeaderSource {
    Set(HeaderSet),
    Raw(RawHeaders),
}

impl From<HeaderSet> for HeaderSource {
    fn from(set: HeaderSet) -> Self {
        HeaderSource::Set(set)
    }
}

impl From<RawHeaders> for HeaderSource {
    fn from(raw: RawHeaders) -> Self {
        HeaderSource::Raw(raw)
    }
}

/// Header-name to value(s) mapping plus its own cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    headers: IndexMap<String, HeaderValue>,
    cookies: CookieJar,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw headers; the cookie patch goes straight into the jar.
    pub fn with_headers(raw: RawHeaders) -> Self {
        let mut set = Self::new();
        set.merge(raw);
        set
    }

    /// Parse a CRLF-delimited `Name: value` block, e.g. a response header block.
    pub fn ingest_raw_block(&mut self, block: &str) -> &mut Self {
        for line in block.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            self.append(name, value.trim());
        }
        self
    }

    /// Overwrite matching header names and fully merge any cookie patch.
    pub fn merge(&mut self, source: impl Into<HeaderSource>) {
        match source.into() {
            HeaderSource::Set(other) => {
                for (name, value) in other.headers {
                    self.headers.insert(name, value);
                }
                self.cookies.merge(other.cookies);
            }
            HeaderSource::Raw(raw) => {
                for (name, value) in raw.headers {
                    self.set(&name, value);
                }
                if let Some(cookie) = raw.cookie {
                    self.cookies.merge(cookie);
                }
            }
        }
    }

    /// Overwrite a single header. `cookie` replaces the matching jar entries.
    pub fn set(&mut self, name: &str, value: impl Into<HeaderValue>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == COOKIE {
            self.cookies.merge_from_header(&value.values());
            return;
        }
        self.headers.insert(name, value);
    }

    /// Add a value; a repeated name becomes a multi-value in arrival order.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == COOKIE {
            self.cookies.merge_from_header(&[value]);
            return;
        }
        match self.headers.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                self.headers.insert(name, HeaderValue::Single(value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// True when neither headers nor cookies are present
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.cookies.is_empty()
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    /// The stored headers without the cookie jar.
    pub fn header_entries(&self) -> RawHeaders {
        RawHeaders {
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            cookie: None,
        }
    }

    /// Flat name to string mapping with the `cookie` header injected.
    pub fn render(&self) -> IndexMap<String, String> {
        let mut rendered: IndexMap<String, String> = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.to_header_string()))
            .collect();
        if !self.cookies.is_empty() {
            rendered.insert(COOKIE.to_string(), self.cookies.serialize());
        }
        rendered
    }
}

/// A [`HeaderSet`] shared between concurrently running build operations.
///
/// The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct SharedHeaderSet(Mutex<HeaderSet>);

impl SharedHeaderSet {
    pub fn new(headers: HeaderSet) -> Self {
        Self(Mutex::new(headers))
    }

    pub fn lock(&self) -> MutexGuard<'_, HeaderSet> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> HeaderSet {
        self.lock().clone()
    }

    pub fn get_mut(&mut self) -> &mut HeaderSet {
        self.0.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> HeaderSet {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
