mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::can_bind_localhost;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xhr_session::http::response::Progress;
use xhr_session::options::query;
use xhr_session::{
    Body, Config, FormData, Options, PassThrough, RawHeaders, Reply, ResponseBody, ResponseType,
    Session, XhrError,
};

fn session() -> Session {
    Session::with_config(Config::default()).expect("session should build")
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_get_sends_merged_headers_and_cookies() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/headers"))
        .and(query_param("page", "1"))
        .and(header("x-session", "s"))
        .and(header("x-call", "c"))
        .and(header("cookie", "sid=1;lang=en"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let session = session();
    session.set_headers(RawHeaders::from([("X-Session", "s")]));
    session.set_cookies([("sid", "1")]);

    let options = Options {
        query: Some(query([("page", "1")])),
        cookie: Some([("lang", "en")].into()),
        headers: Some(RawHeaders::from([("X-Call", "c")])),
        ..Options::default()
    };
    let reply = session
        .get(format!("{}/headers", server.uri()), options)
        .await
        .expect("request should succeed");
    let response = reply.into_response().expect("raw response");
    assert_eq!(response.status, 200);
    assert_eq!(response.response_text.as_deref(), Some("ok"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_post_json_body_and_parsed_reply() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/json"))
        .and(header("content-type", "application/json"))
        .and(body_string("{\"a\":1}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "echo": true })))
        .mount(&server)
        .await;

    let options = Options {
        json: Some(json!({ "a": 1 })),
        pass_through: PassThrough {
            response_type: Some(ResponseType::Json),
            ..PassThrough::default()
        },
        ..Options::default()
    };
    let reply = session()
        .post(format!("{}/json", server.uri()), options)
        .await
        .expect("request should succeed");
    assert_eq!(
        reply,
        Reply::Parsed(Some(ResponseBody::Json(json!({ "echo": true }))))
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_post_form_fields_and_multipart() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("a=x%20y&b=2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = session();
    let fields = json!({ "a": "x y", "b": 2 }).as_object().cloned().expect("object");
    session
        .post(
            format!("{}/form", server.uri()),
            Options {
                data: Some(Body::Fields(fields)),
                ..Options::default()
            },
        )
        .await
        .expect("form post should succeed");

    let form = FormData::new()
        .text("field", "value")
        .file("upload", "a.txt", Some("text/plain".to_string()), b"hello".to_vec());
    session
        .post(
            format!("{}/upload", server.uri()),
            Options {
                data: Some(Body::Multipart(form)),
                ..Options::default()
            },
        )
        .await
        .expect("multipart post should succeed");

    let requests = server.received_requests().await.expect("requests");
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/upload")
        .expect("upload request");
    let content_type = upload
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(String::from_utf8_lossy(&upload.body).contains("hello"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_set_cookie_from_server_is_suppressed() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "sid=server; Path=/; HttpOnly")
                .append_header("set-cookie", "theme=dark"),
        )
        .mount(&server)
        .await;

    let session = session();
    session.set_cookies([("sid", "client"), ("keep", "1")]);
    session
        .get(format!("{}/login", server.uri()), Options::default())
        .await
        .expect("login should succeed");

    let jar = session.cookies();
    assert_eq!(jar.serialize(), "keep=1");
    assert!(jar.is_suppressed("sid"));
    assert!(jar.is_suppressed("theme"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_non_success_status_rejects_with_response() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let err = session()
        .get(format!("{}/missing", server.uri()), Options::default())
        .await
        .expect_err("404 should reject");
    let response = err.response().expect("response attached");
    assert_eq!(response.status, 404);
    assert_eq!(response.response_text.as_deref(), Some("nope"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_timeout_rejects_as_transport_error() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let timeouts = Arc::new(AtomicU64::new(0));
    let counter = timeouts.clone();
    let options = Options {
        pass_through: PassThrough {
            timeout: Some(Duration::from_millis(100)),
            on_timeout: Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..PassThrough::default()
        },
        ..Options::default()
    };
    let err = session()
        .get(format!("{}/slow", server.uri()), options)
        .await
        .expect_err("timeout should reject");
    assert!(matches!(err, XhrError::Transport(_)));
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_dropped_request_reports_abort() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stall"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let aborts = Arc::new(AtomicU64::new(0));
    let counter = aborts.clone();
    let options = Options {
        pass_through: PassThrough {
            on_abort: Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..PassThrough::default()
        },
        ..Options::default()
    };
    let session = session();
    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        session.get(format!("{}/stall", server.uri()), options),
    )
    .await;
    assert!(outcome.is_err(), "request should still be pending");
    assert_eq!(aborts.load(Ordering::SeqCst), 1);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_progress_is_reported() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .mount(&server)
        .await;

    let loaded = Arc::new(AtomicU64::new(0));
    let seen = loaded.clone();
    let options = Options {
        pass_through: PassThrough {
            response_type: Some(ResponseType::ArrayBuffer),
            on_progress: Some(Arc::new(move |progress: &Progress| {
                seen.store(progress.loaded, Ordering::SeqCst);
            })),
            ..PassThrough::default()
        },
        ..Options::default()
    };
    let reply = session()
        .get(format!("{}/bytes", server.uri()), options)
        .await
        .expect("request should succeed");
    assert_eq!(reply, Reply::Parsed(Some(ResponseBody::Bytes(vec![7u8; 4096]))));
    assert_eq!(loaded.load(Ordering::SeqCst), 4096);
}
