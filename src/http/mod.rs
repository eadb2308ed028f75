//! Host transport seam
//!
//! The session never talks to the network itself. It hands a finished
//! [`RequestDescriptor`] to a [`Transport`], which reports back exactly one
//! [`Completion`]. [`ReqwestTransport`] is the default implementation.

use std::fmt;

use async_trait::async_trait;
use futures_util::StreamExt;
use indexmap::IndexMap;
use log::{debug, warn};
use reqwest::{Client, ClientBuilder};

use crate::config::{Config, Method};
use crate::error::{Result, XhrError};
use crate::header::COOKIE;
use crate::options::{EventCallback, FormData, FormPart, PassThrough};

pub mod auth;
pub mod request;
pub mod response;

use response::{Progress, Response, ResponseBody, ResponseType};

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Multipart(FormData),
}

/// Final request handed to the host transport
#[derive(Clone)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub headers: IndexMap<String, String>,
    pub body: Option<RequestBody>,
    pub options: PassThrough,
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("options", &self.options)
            .finish()
    }
}

/// Outcome of one submission: either the load or the error path fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Load(Response),
    Error(Response),
}

/// The host's send primitive.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, request: RequestDescriptor) -> Completion;
}

/// Host transport backed by a reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects as usize)
            } else {
                reqwest::redirect::Policy::none()
            });

        if let Some(proxy_config) = &config.proxy {
            let proxy = reqwest::Proxy::all(&proxy_config.url)
                .map_err(|e| XhrError::Config(format!("Invalid proxy: {}", e)))?;

            let proxy = if let (Some(username), Some(password)) =
                (&proxy_config.username, &proxy_config.password)
            {
                proxy.basic_auth(username, password)
            } else {
                proxy
            };

            builder = builder.proxy(proxy);
        }

        if !config.verify_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder.build().map_err(XhrError::Http)?;

        Ok(Self { client })
    }

    fn prepare(&self, request: &RequestDescriptor) -> reqwest::RequestBuilder {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let options = &request.options;

        let mut builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            if options.anonymous && name == COOKIE {
                continue;
            }
            builder = builder.header(name, value);
        }

        if options.nocache {
            builder = builder.header("cache-control", "no-cache");
        } else if options.revalidate {
            builder = builder.header("cache-control", "max-age=0");
        }

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(user) = &options.user {
            builder = builder.basic_auth(user, options.password.as_ref());
        }

        match &request.body {
            Some(RequestBody::Text(text)) if options.binary => {
                builder = builder.body(text.clone().into_bytes())
            }
            Some(RequestBody::Text(text)) => builder = builder.body(text.clone()),
            Some(RequestBody::Multipart(form)) => builder = builder.multipart(multipart(form)),
            None => {}
        }

        builder
    }

    async fn read(&self, request: &RequestDescriptor, response: reqwest::Response) -> Result<Response> {
        let options = &request.options;
        let status = response.status();
        let final_url = response.url().to_string();
        let response_headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()))
            })
            .collect::<Vec<_>>()
            .join("\r\n");

        let total = response.content_length();
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes.extend_from_slice(&chunk);
            if let Some(on_progress) = &options.on_progress {
                on_progress(&Progress {
                    loaded: bytes.len() as u64,
                    total,
                });
            }
        }

        let parsed = match options.response_type {
            Some(ResponseType::Json) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(ResponseBody::Json(value)),
                Err(e) => {
                    warn!("response from {} is not valid JSON: {}", final_url, e);
                    None
                }
            },
            Some(ResponseType::ArrayBuffer) | Some(ResponseType::Blob) => {
                Some(ResponseBody::Bytes(bytes.clone()))
            }
            None => None,
        };

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            final_url,
            response_headers,
            response_text: Some(String::from_utf8_lossy(&bytes).into_owned()),
            response: parsed,
            context: options.context.clone(),
            error: None,
        })
    }

    fn failure(request: &RequestDescriptor, err: &reqwest::Error) -> Response {
        if err.is_timeout() {
            if let Some(on_timeout) = &request.options.on_timeout {
                on_timeout();
            }
        }
        Response {
            final_url: request.url.clone(),
            context: request.options.context.clone(),
            error: Some(err.to_string()),
            ..Response::default()
        }
    }
}

/// Calls `on_abort` if a submission is dropped before it settles.
struct AbortGuard(Option<EventCallback>);

impl AbortGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if let Some(on_abort) = self.0.take() {
            debug!("request dropped before completion");
            on_abort();
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn submit(&self, request: RequestDescriptor) -> Completion {
        debug!("> {} {}", request.method, request.url);
        let mut abort = AbortGuard(request.options.on_abort.clone());
        let sent = self.prepare(&request).send().await;
        let result = match sent {
            Ok(response) => self.read(&request, response).await,
            Err(e) => Err(XhrError::Http(e)),
        };
        abort.disarm();

        match result {
            Ok(response) => {
                debug!("< {} {}", response.status, response.status_text);
                if let Some(on_readystatechange) = &request.options.on_readystatechange {
                    on_readystatechange(&response);
                }
                Completion::Load(response)
            }
            Err(XhrError::Http(e)) => {
                warn!("request to {} failed: {}", request.url, e);
                Completion::Error(Self::failure(&request, &e))
            }
            Err(e) => Completion::Error(Response {
                final_url: request.url.clone(),
                error: Some(e.to_string()),
                ..Response::default()
            }),
        }
    }
}

fn multipart(form: &FormData) -> reqwest::multipart::Form {
    form.parts
        .iter()
        .fold(reqwest::multipart::Form::new(), |multipart, (name, part)| match part {
            FormPart::Text(value) => multipart.text(name.clone(), value.clone()),
            FormPart::File {
                file_name,
                mime,
                bytes,
            } => {
                let mut file = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    match file.mime_str(mime) {
                        Ok(typed) => file = typed,
                        Err(e) => {
                            warn!("ignoring invalid mime type '{}': {}", mime, e);
                            file = reqwest::multipart::Part::bytes(bytes.clone())
                                .file_name(file_name.clone());
                        }
                    }
                }
                multipart.part(name.clone(), file)
            }
        })
}
