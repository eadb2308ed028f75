//! Long-lived request session
//!
//! A session owns the default headers, cookies, auth and build hooks shared by
//! every call made through it, and reconciles cookies after each response.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use log::{debug, info};

use crate::config::{Config, Method};
use crate::cookie::{CookieJar, CookieSource};
use crate::error::{Result, XhrError};
use crate::header::{HeaderSet, HeaderValue, RawHeaders, SharedHeaderSet};
use crate::http::auth::Auth;
use crate::http::request::RequestBuilder;
use crate::http::response::{ErrorStatus, Response, ResponseBody, ResponseType};
use crate::http::{Completion, ReqwestTransport, Transport};
use crate::options::{Options, RequestUrl};

/// Extension invoked while a request is being assembled.
///
/// Hooks run concurrently with each other and with auth capabilities, after
/// headers and cookies are merged and before the body is encoded.
#[async_trait]
pub trait BuildHook: Send + Sync {
    async fn run(&self, builder: &RequestBuilder, session: &Session) -> Result<()>;
}

/// What a successful call resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The full response (no response type requested, or a custom `on_load`)
    Response(Response),
    /// The parsed body when a response type was requested
    Parsed(Option<ResponseBody>),
}

impl Reply {
    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Response(response) => Some(response),
            Reply::Parsed(_) => None,
        }
    }
}

pub struct Session {
    headers: SharedHeaderSet,
    auth: RwLock<Option<Arc<dyn Auth>>>,
    build_hooks: RwLock<Vec<Arc<dyn BuildHook>>>,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            headers: SharedHeaderSet::default(),
            auth: RwLock::new(None),
            build_hooks: RwLock::new(Vec::new()),
            transport,
        }
    }

    /// Session over the default reqwest transport
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new(config)?))
    }

    /// Copy of the session headers, cookies included
    pub fn headers(&self) -> HeaderSet {
        self.headers.snapshot()
    }

    /// Merge into the session headers
    pub fn set_headers(&self, headers: RawHeaders) {
        self.headers.lock().merge(headers);
    }

    /// Mutate the session headers in place
    pub fn update_headers<R>(&self, f: impl FnOnce(&mut HeaderSet) -> R) -> R {
        f(&mut self.headers.lock())
    }

    /// Copy of the session cookie jar
    pub fn cookies(&self) -> CookieJar {
        self.headers.lock().cookies().clone()
    }

    /// Replace the session cookies; suppressed names stay suppressed
    pub fn set_cookies(&self, cookies: impl Into<CookieSource>) {
        self.headers.lock().cookies_mut().set_cookies(cookies);
    }

    pub fn auth(&self) -> Option<Arc<dyn Auth>> {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_auth(&self, auth: Option<Arc<dyn Auth>>) {
        *self.auth.write().unwrap_or_else(PoisonError::into_inner) = auth;
    }

    /// Register a hook for every build that starts after this call.
    pub fn register_build_hook(&self, hook: impl BuildHook + 'static) {
        self.build_hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Hooks registered so far, in registration order
    pub fn build_hooks(&self) -> Vec<Arc<dyn BuildHook>> {
        self.build_hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn get(&self, url: impl Into<RequestUrl>, options: Options) -> Result<Reply> {
        self.request(Method::Get, url, options).await
    }

    pub async fn post(&self, url: impl Into<RequestUrl>, options: Options) -> Result<Reply> {
        self.request(Method::Post, url, options).await
    }

    /// Build the request, submit it, and settle on the completion.
    pub async fn request(
        &self,
        method: Method,
        url: impl Into<RequestUrl>,
        options: Options,
    ) -> Result<Reply> {
        let mut builder = RequestBuilder::new(url, method, options);
        let on_load = builder.pass_through_mut().on_load.take();
        let on_error = builder.pass_through_mut().on_error.take();
        let response_type = builder.pass_through().response_type;

        let descriptor = builder.build(self).await?;
        debug!("submitting {} {}", descriptor.method, descriptor.url);

        match self.transport.submit(descriptor).await {
            Completion::Load(response) => match on_load {
                Some(on_load) => {
                    on_load(&response);
                    Ok(Reply::Response(response))
                }
                None => self.handle_load(response, response_type),
            },
            Completion::Error(response) => {
                if let Some(on_error) = on_error {
                    on_error(&response);
                }
                Err(XhrError::Transport(Box::new(response)))
            }
        }
    }

    fn handle_load(&self, response: Response, response_type: Option<ResponseType>) -> Result<Reply> {
        self.reconcile_cookies(&response);

        if response.status != 200 {
            let kind = ErrorStatus::from_code(response.status);
            info!(
                "{} answered with status {} ({:?})",
                response.final_url, response.status, kind
            );
            return Err(XhrError::Status {
                kind,
                response: Box::new(response),
            });
        }

        Ok(match response_type {
            Some(_) => Reply::Parsed(response.response),
            None => Reply::Response(response),
        })
    }

    /// The host already stored any `Set-Cookie` it received, so stop tracking
    /// those names here for good.
    fn reconcile_cookies(&self, response: &Response) {
        let mut parsed = HeaderSet::new();
        parsed.ingest_raw_block(&response.response_headers);
        let set_cookies = parsed
            .get("set-cookie")
            .map(HeaderValue::values)
            .unwrap_or_default();
        if set_cookies.is_empty() {
            return;
        }

        let mut headers = self.headers.lock();
        debug!(
            "suppressing {} host-managed cookie(s), session jar {}",
            set_cookies.len(),
            if headers.cookies().is_empty() { "empty" } else { "updated" }
        );
        headers.cookies_mut().delete_and_suppress(&set_cookies);
    }
}
