//! Name/value cookie jar with permanent write suppression
//!
//! The jar only models the leading `name=value` pair of a cookie string.
//! Attributes such as `Path` or `Expires` are discarded on parse.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace};

/// Ordered cookie mapping. Overwrites keep the original insertion slot.
pub type CookieMap = IndexMap<String, String>;

/// Any input a jar can be merged from.
#[derive(Debug, Clone)]
pub enum CookieSource {
    /// Plain name/value pairs
    Map(CookieMap),
    /// Entries of another jar (its suppression set is not carried over)
    Jar(CookieJar),
    /// Raw `name=value; attr=...` strings, e.g. `Set-Cookie` values
    Strings(Vec<String>),
}

impl CookieSource {
    /// Normalize any variant into canonical name/value pairs.
    pub fn into_map(self) -> CookieMap {
        match self {
            CookieSource::Map(map) => map,
            CookieSource::Jar(jar) => jar.entries,
            CookieSource::Strings(strings) => CookieJar::parse_cookie_strings(&strings),
        }
    }
}

impl From<CookieMap> for CookieSource {
    fn from(map: CookieMap) -> Self {
        CookieSource::Map(map)
    }
}

impl From<HashMap<String, String>> for CookieSource {
    fn from(map: HashMap<String, String>) -> Self {
        CookieSource::Map(map.into_iter().collect())
    }
}

impl From<CookieJar> for CookieSource {
    fn from(jar: CookieJar) -> Self {
        CookieSource::Jar(jar)
    }
}

impl From<&CookieJar> for CookieSource {
    fn from(jar: &CookieJar) -> Self {
        CookieSource::Jar(jar.clone())
    }
}

impl From<Vec<String>> for CookieSource {
    fn from(strings: Vec<String>) -> Self {
        CookieSource::Strings(strings)
    }
}

impl From<&[&str]> for CookieSource {
    fn from(strings: &[&str]) -> Self {
        CookieSource::Strings(strings.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&str> for CookieSource {
    fn from(string: &str) -> Self {
        CookieSource::Strings(vec![string.to_string()])
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for CookieSource {
    fn from(pairs: [(K, V); N]) -> Self {
        CookieSource::Map(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Client-side cookie store.
///
/// Names passed to [`CookieJar::delete_and_suppress`] are removed and can never
/// be written again through any merge path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: CookieMap,
    suppressed: HashSet<String>,
}

impl CookieJar {
    /// Create an empty jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a jar seeded from any cookie source
    pub fn with_cookies(source: impl Into<CookieSource>) -> Self {
        let mut jar = Self::new();
        jar.merge(source);
        jar
    }

    /// Set or overwrite every non-suppressed name from `source`.
    pub fn merge(&mut self, source: impl Into<CookieSource>) {
        for (name, value) in source.into().into_map() {
            self.write(name, value);
        }
    }

    /// Like [`CookieJar::merge`] but never overwrites a name already present.
    pub fn merge_missing(&mut self, source: impl Into<CookieSource>) {
        for (name, value) in source.into().into_map() {
            if !self.entries.contains_key(&name) {
                self.write(name, value);
            }
        }
    }

    /// Merge raw `name=value; ...` strings.
    pub fn merge_from_str<S: AsRef<str>>(&mut self, cookie_strings: &[S]) {
        for (name, value) in Self::parse_cookie_strings(cookie_strings) {
            self.write(name, value);
        }
    }

    /// Merge request-side `Cookie` header values, where every `;` separated
    /// segment is its own pair.
    pub fn merge_from_header<S: AsRef<str>>(&mut self, header_values: &[S]) {
        for (name, value) in Self::parse_cookie_header(header_values) {
            self.write(name, value);
        }
    }

    /// Replace all entries. The suppression set survives.
    pub fn set_cookies(&mut self, source: impl Into<CookieSource>) {
        self.entries.clear();
        self.merge(source);
    }

    /// Remove the named cookies and block any future write of those names.
    pub fn delete_and_suppress<S: AsRef<str>>(&mut self, cookie_strings: &[S]) {
        for cookie_string in cookie_strings {
            let (name, _) = parse_cookie_string(cookie_string.as_ref());
            if name.is_empty() {
                continue;
            }
            if self.entries.shift_remove(&name).is_some() {
                debug!("dropped cookie '{}' now managed by the host", name);
            }
            self.suppressed.insert(name);
        }
    }

    /// Adopt the suppression set of another jar.
    pub fn inherit_suppressed(&mut self, other: &CookieJar) {
        for name in &other.suppressed {
            self.entries.shift_remove(name);
            self.suppressed.insert(name.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_suppressed(&self, name: &str) -> bool {
        self.suppressed.contains(name)
    }

    pub fn suppressed(&self) -> impl Iterator<Item = &str> {
        self.suppressed.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn entries(&self) -> &CookieMap {
        &self.entries
    }

    /// Render as `name=value` pairs joined by `;`.
    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Parse raw cookie strings into name/value pairs.
    pub fn parse_cookie_strings<S: AsRef<str>>(strings: &[S]) -> CookieMap {
        strings
            .iter()
            .map(|s| parse_cookie_string(s.as_ref()))
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }

    /// Parse `Cookie` header values (`a=1; b=2`) into name/value pairs.
    pub fn parse_cookie_header<S: AsRef<str>>(header_values: &[S]) -> CookieMap {
        header_values
            .iter()
            .flat_map(|value| value.as_ref().split(';'))
            .map(parse_cookie_string)
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }

    fn write(&mut self, name: String, value: String) {
        if self.suppressed.contains(&name) {
            trace!("ignoring write to suppressed cookie '{}'", name);
            return;
        }
        self.entries.insert(name, value);
    }
}

impl fmt::Display for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Only the segment before the first `;` counts; it is split on the first `=`.
/// A segment without `=` yields an empty value.
fn parse_cookie_string(input: &str) -> (String, String) {
    let pair = input.split(';').next().unwrap_or_default();
    match pair.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
        None => (pair.trim().to_string(), String::new()),
    }
}
