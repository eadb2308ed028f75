#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use xhr_session::{Completion, RequestDescriptor, Response, Session, Transport};

/// In-memory host transport: records every descriptor and answers from a script.
#[derive(Default)]
pub struct RecordingTransport {
    script: Mutex<VecDeque<Completion>>,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl RecordingTransport {
    pub fn answering(completions: impl IntoIterator<Item = Completion>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(completions.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().expect("lock").clone()
    }

    pub fn last(&self) -> RequestDescriptor {
        self.requests().pop().expect("at least one request")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn submit(&self, request: RequestDescriptor) -> Completion {
        self.seen.lock().expect("lock").push(request);
        self.script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Completion::Load(ok("")))
    }
}

pub fn session_with(completions: impl IntoIterator<Item = Completion>) -> (Session, Arc<RecordingTransport>) {
    let transport = RecordingTransport::answering(completions);
    (Session::with_transport(transport.clone()), transport)
}

pub fn ok(headers: &str) -> Response {
    Response {
        status: 200,
        status_text: "OK".to_string(),
        response_headers: headers.to_string(),
        ..Response::default()
    }
}

pub fn header<'a>(request: &'a RequestDescriptor, name: &str) -> Option<&'a str> {
    request.headers.get(name).map(String::as_str)
}

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}
