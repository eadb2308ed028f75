mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{header, session_with};
use serde_json::json;
use xhr_session::header::SharedHeaderSet;
use xhr_session::http::request::RequestBuilder;
use xhr_session::options::query;
use xhr_session::{
    Auth, BasicAuth, BearerAuth, Body, BuildHook, Options, PassThrough, QueryValue, RawHeaders,
    RequestBody, Result, Session, XhrError,
};

#[tokio::test]
async fn test_cookie_priority_header_over_option_over_session() {
    let (session, transport) = session_with([]);
    session.set_cookies([("a", "1")]);

    let options = Options {
        cookie: Some([("a", "2"), ("b", "1")].into()),
        headers: Some(RawHeaders::new().cookie([("a", "3")])),
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");
    assert_eq!(header(&transport.last(), "cookie"), Some("a=3;b=1"));
}

#[tokio::test]
async fn test_cookie_header_sends_every_pair() {
    let (session, transport) = session_with([]);
    session.set_cookies([("a", "0")]);

    let options = Options {
        headers: Some(RawHeaders::new().header("Cookie", "a=1; b=2")),
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");
    assert_eq!(header(&transport.last(), "cookie"), Some("a=1;b=2"));
}

#[tokio::test]
async fn test_call_headers_override_session_headers() {
    let (session, transport) = session_with([]);
    session.set_headers(RawHeaders::from([("Accept", "text/html"), ("X-Session", "1")]));

    let options = Options {
        headers: Some(RawHeaders::from([("accept", "application/json")])),
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");

    let request = transport.last();
    assert_eq!(header(&request, "accept"), Some("application/json"));
    assert_eq!(header(&request, "x-session"), Some("1"));
    assert_eq!(header(&request, "cookie"), None);
}

#[tokio::test]
async fn test_per_call_headers_do_not_leak_into_session() {
    let (session, _) = session_with([]);
    session.set_cookies([("a", "1")]);

    let options = Options {
        cookie: Some([("b", "2")].into()),
        headers: Some(RawHeaders::from([("X-Call", "1")])),
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");

    let headers = session.headers();
    assert!(!headers.contains("x-call"));
    assert_eq!(headers.cookies().serialize(), "a=1");
}

#[tokio::test]
async fn test_query_and_bodies_reach_transport() {
    let (session, transport) = session_with([]);

    let options = Options {
        query: Some(query([("a", QueryValue::from("1")), ("b", QueryValue::from(2))])),
        json: Some(json!({ "a": 1 })),
        ..Options::default()
    };
    session.post("https://h/p", options).await.expect("ok");
    let request = transport.last();
    assert_eq!(request.url, "https://h/p?a=1");
    assert_eq!(header(&request, "content-type"), Some("application/json"));
    assert_eq!(request.body, Some(RequestBody::Text("{\"a\":1}".to_string())));

    let fields = json!({ "a": "x", "b": 2 }).as_object().cloned().expect("object");
    let options = Options {
        data: Some(Body::Fields(fields)),
        ..Options::default()
    };
    session.post("https://h/p", options).await.expect("ok");
    let request = transport.last();
    assert_eq!(
        header(&request, "content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(request.body, Some(RequestBody::Text("a=x&b=2".to_string())));
}

#[tokio::test]
async fn test_encoding_failure_aborts_before_submission() {
    let (session, transport) = session_with([]);
    let fields = json!({ "flag": true }).as_object().cloned().expect("object");
    let options = Options {
        data: Some(Body::Fields(fields)),
        ..Options::default()
    };
    let err = session.post("https://h/", options).await.expect_err("encode");
    assert!(matches!(err, XhrError::Encode(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_pass_through_options_reach_transport() {
    let (session, transport) = session_with([]);
    let options = Options {
        pass_through: PassThrough {
            timeout: Some(Duration::from_secs(5)),
            anonymous: true,
            context: Some(json!({ "id": 7 })),
            ..PassThrough::default()
        },
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");
    let request = transport.last();
    assert_eq!(request.options.timeout, Some(Duration::from_secs(5)));
    assert!(request.options.anonymous);
    assert_eq!(request.options.context, Some(json!({ "id": 7 })));
}

#[tokio::test]
async fn test_session_and_call_auth_both_run() {
    let (session, transport) = session_with([]);
    session.set_auth(Some(Arc::new(BasicAuth::new("user", "pass"))));

    session.get("https://h/", Options::default()).await.expect("ok");
    assert_eq!(
        header(&transport.last(), "authorization"),
        Some("Basic dXNlcjpwYXNz")
    );

    struct ApiKey;

    #[async_trait]
    impl Auth for ApiKey {
        async fn build(&self, headers: &SharedHeaderSet) -> Result<()> {
            tokio::task::yield_now().await;
            headers.lock().set("X-Api-Key", "k");
            Ok(())
        }
    }

    let options = Options {
        auth: Some(Arc::new(ApiKey)),
        ..Options::default()
    };
    session.get("https://h/", options).await.expect("ok");
    let request = transport.last();
    assert_eq!(header(&request, "authorization"), Some("Basic dXNlcjpwYXNz"));
    assert_eq!(header(&request, "x-api-key"), Some("k"));
}

#[tokio::test]
async fn test_auth_failure_rejects_build() {
    let (session, transport) = session_with([]);
    let options = Options {
        auth: Some(Arc::new(BearerAuth::new(""))),
        ..Options::default()
    };
    let err = session.get("https://h/", options).await.expect_err("auth");
    assert!(matches!(err, XhrError::Auth(_)));
    assert!(transport.requests().is_empty());
}

/// Signs the request after yielding, so its write lands after other operations started.
struct Signer;

#[async_trait]
impl BuildHook for Signer {
    async fn run(&self, builder: &RequestBuilder, session: &Session) -> Result<()> {
        let cookie_count = builder.headers().cookies().len();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut headers = builder.headers();
        headers.set("X-Signed", format!("{}:{}", builder.method(), cookie_count));
        headers.append("X-Trace", "signer");
        headers.cookies_mut().merge([("hooked", "1")]);
        drop(headers);
        assert!(session.build_hooks().len() >= 1);
        Ok(())
    }
}

struct Tracer;

#[async_trait]
impl BuildHook for Tracer {
    async fn run(&self, builder: &RequestBuilder, _session: &Session) -> Result<()> {
        builder.headers().append("X-Trace", "tracer");
        Ok(())
    }
}

#[tokio::test]
async fn test_build_hooks_see_merged_state_and_mutate_before_body() {
    let (session, transport) = session_with([]);
    session.set_cookies([("sid", "1")]);
    session.register_build_hook(Signer);
    session.register_build_hook(Tracer);

    let options = Options {
        json: Some(json!({ "x": 1 })),
        ..Options::default()
    };
    session.post("https://h/", options).await.expect("ok");

    let request = transport.last();
    assert_eq!(header(&request, "x-signed"), Some("POST:1"));
    assert_eq!(header(&request, "cookie"), Some("sid=1;hooked=1"));
    assert_eq!(header(&request, "content-type"), Some("application/json"));

    let trace = header(&request, "x-trace").expect("trace header");
    assert!(trace.contains("signer") && trace.contains("tracer"));
}

#[tokio::test]
async fn test_hooks_registered_later_only_affect_later_builds() {
    let (session, transport) = session_with([]);
    session.get("https://h/", Options::default()).await.expect("ok");
    session.register_build_hook(Tracer);
    session.get("https://h/", Options::default()).await.expect("ok");

    let requests = transport.requests();
    assert_eq!(header(&requests[0], "x-trace"), None);
    assert_eq!(header(&requests[1], "x-trace"), Some("tracer"));
}
