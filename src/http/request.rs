//! Per-call request assembly
//!
//! Stages run in a fixed order: URL query, header and cookie merge, auth and
//! build hooks (scheduled, then joined concurrently), body encoding, finalize.

use std::sync::{Arc, MutexGuard};

use futures_util::future::{try_join_all, BoxFuture};
use log::{debug, trace};
use serde_json::Value;
use url::Url;

use crate::config::Method;
use crate::cookie::CookieSource;
use crate::error::{Result, XhrError};
use crate::header::{HeaderSet, RawHeaders, SharedHeaderSet};
use crate::http::auth::Auth;
use crate::http::{RequestBody, RequestDescriptor};
use crate::options::{Body, Options, PassThrough, Query, QueryValue, RequestUrl};
use crate::session::{BuildHook, Session};
use crate::utils::body_to_string;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An operation scheduled during the auth and hook stages, run at the join.
#[derive(Clone)]
pub enum PendingOp {
    Auth(Arc<dyn Auth>),
    Hook(Arc<dyn BuildHook>),
}

/// Builds one request descriptor from call options and session defaults.
pub struct RequestBuilder {
    url: RequestUrl,
    method: Method,
    query: Option<Query>,
    json: Option<Value>,
    data: Option<Body>,
    cookie: Option<CookieSource>,
    auth: Option<Arc<dyn Auth>>,
    header_patch: Option<RawHeaders>,
    pass_through: PassThrough,

    headers: SharedHeaderSet,
    body: Option<RequestBody>,
    pending: Vec<PendingOp>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<RequestUrl>, method: Method, options: Options) -> Self {
        let Options {
            query,
            headers,
            json,
            data,
            cookie,
            auth,
            pass_through,
        } = options;

        Self {
            url: url.into(),
            method,
            query,
            json,
            data,
            cookie,
            auth,
            header_patch: headers,
            pass_through,
            headers: SharedHeaderSet::default(),
            body: None,
            pending: Vec::new(),
        }
    }

    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// The in-progress header set. Do not hold the guard across an await.
    pub fn headers(&self) -> MutexGuard<'_, HeaderSet> {
        self.headers.lock()
    }

    pub fn pass_through(&self) -> &PassThrough {
        &self.pass_through
    }

    pub fn pass_through_mut(&mut self) -> &mut PassThrough {
        &mut self.pass_through
    }

    /// Run every stage and produce the descriptor for the host transport.
    pub async fn build(mut self, session: &Session) -> Result<RequestDescriptor> {
        self.build_url()?;
        self.build_header_and_cookie(session);
        self.build_auth(session);
        self.build_hooks(session);
        self.join(session).await?;
        self.build_body()?;
        Ok(self.finalize())
    }

    /// Parse the URL and append string query values; numbers and lists are skipped.
    fn build_url(&mut self) -> Result<()> {
        let mut url = match &self.url {
            RequestUrl::Parsed(url) => url.clone(),
            RequestUrl::Raw(raw) => Url::parse(raw)
                .map_err(|e| XhrError::InvalidUrl(format!("Invalid URL '{}': {}", raw, e)))?,
        };

        if let Some(query) = self.query.take() {
            let had_query = url.query().is_some();
            {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in &query {
                    match value {
                        QueryValue::Text(text) => {
                            pairs.append_pair(key, text);
                        }
                        QueryValue::Number(_) | QueryValue::List(_) => {
                            trace!("skipping non-string query value '{}'", key);
                        }
                    }
                }
            }
            if !had_query && url.query() == Some("") {
                url.set_query(None);
            }
        }

        self.url = RequestUrl::Parsed(url);
        Ok(())
    }

    /// Cookie priority: header-embedded patch > cookie option > session jar.
    /// Header priority: header option > session headers.
    fn build_header_and_cookie(&mut self, session: &Session) {
        let session_headers = session.headers();
        let call = self.headers.get_mut();

        call.cookies_mut().inherit_suppressed(session_headers.cookies());
        if !session_headers.cookies().is_empty() {
            call.cookies_mut().merge(session_headers.cookies());
        }
        if let Some(cookie) = self.cookie.take() {
            call.cookies_mut().merge(cookie);
        }

        call.merge(session_headers.header_entries());
        if let Some(patch) = self.header_patch.take() {
            call.merge(patch);
        }
    }

    fn build_auth(&mut self, session: &Session) {
        if let Some(auth) = session.auth() {
            self.pending.push(PendingOp::Auth(auth));
        }
        if let Some(auth) = self.auth.clone() {
            self.pending.push(PendingOp::Auth(auth));
        }
    }

    fn build_hooks(&mut self, session: &Session) {
        self.pending
            .extend(session.build_hooks().into_iter().map(PendingOp::Hook));
    }

    /// Await every scheduled operation; completion order is unspecified.
    async fn join(&mut self, session: &Session) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(());
        }
        debug!("awaiting {} auth/hook operation(s)", pending.len());

        let this = &*self;
        let operations: Vec<BoxFuture<'_, Result<()>>> = pending
            .iter()
            .map(|op| match op {
                PendingOp::Auth(auth) => auth.build(&this.headers),
                PendingOp::Hook(hook) => hook.run(this, session),
            })
            .collect();
        try_join_all(operations).await?;
        Ok(())
    }

    fn build_body(&mut self) -> Result<()> {
        let headers = self.headers.get_mut();

        if let Some(json) = self.json.take() {
            headers.set("Content-Type", JSON_CONTENT_TYPE);
            self.body = Some(RequestBody::Text(serde_json::to_string(&json)?));
            return Ok(());
        }

        match self.data.take() {
            Some(Body::Text(text)) if text.is_empty() => {}
            Some(Body::Text(text)) => self.body = Some(RequestBody::Text(text)),
            Some(Body::Multipart(form)) => self.body = Some(RequestBody::Multipart(form)),
            Some(Body::Fields(fields)) => {
                let encoded = body_to_string(&fields)?;
                headers.set("Content-Type", FORM_CONTENT_TYPE);
                if !encoded.is_empty() {
                    self.body = Some(RequestBody::Text(encoded));
                }
            }
            None => {}
        }
        Ok(())
    }

    fn finalize(self) -> RequestDescriptor {
        let headers = self.headers.into_inner().render();
        RequestDescriptor {
            url: self.url.to_string(),
            method: self.method,
            headers,
            body: self.body,
            options: self.pass_through,
        }
    }
}
