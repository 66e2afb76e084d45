//! Router tests: requests go through the full axum stack without a socket.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use smsgate::api::{self, AppState};
use smsgate::auth::Credentials;
use smsgate::calls::CallLog;
use smsgate::driver::simulated::{SimulatedModem, SimulatorHandle, INBOX_FOLDER};
use smsgate::gate::ModemGate;
use smsgate::model::call::MissedCallRecord;

struct Harness {
    app: Router,
    modem: SimulatorHandle,
    calls: Arc<CallLog>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let modem = SimulatedModem::new();
    let handle = modem.handle();
    let gate = Arc::new(ModemGate::new(modem));
    let calls = Arc::new(CallLog::open(dir.path().join("missed_calls.txt")).unwrap());
    let credentials = Credentials::from_pairs([("admin", "s3cret")]);
    let state = AppState::new(gate, INBOX_FOLDER, credentials, Arc::clone(&calls));
    Harness {
        app: api::router(state),
        modem: handle,
        calls,
        _dir: dir,
    }
}

fn basic() -> String {
    format!("Basic {}", STANDARD.encode("admin:s3cret"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, basic())
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let h = harness();
    for uri in ["/sms", "/sms/0", "/getsms", "/missedCalls"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    let wrong = Request::builder()
        .uri("/sms")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("admin:nope")),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_and_get_by_ordinal() {
    let h = harness();
    h.modem.receive_text("+1", "first", Utc::now()).unwrap();
    h.modem.receive_text("+2", &"9".repeat(200), Utc::now()).unwrap();

    let (status, body) = send(&h.app, get("/sms")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["Text"], "first");
    assert!(list[0].get("Locations").is_none());

    let (status, body) = send(&h.app, get("/sms/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Number"], "+2");
    assert_eq!(body["Text"], "9".repeat(200));

    let (status, body) = send(&h.app, get("/sms/2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Sms with id '2' not found");
}

#[tokio::test]
async fn test_post_fans_out_to_every_number() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sms")
        .header(header::AUTHORIZATION, basic())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text":"hello","number":"+1,+2"}"#))
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let sent = h.modem.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].payload, sent[1].payload);
    assert_eq!(sent[0].number, "+1");
    assert_eq!(sent[1].number, "+2");
}

#[tokio::test]
async fn test_post_form_body() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sms")
        .header(header::AUTHORIZATION, basic())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("text=hi+there&number=%2B33612345678"))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.modem.sent()[0].number, "+33612345678");
}

#[tokio::test]
async fn test_post_without_number_is_404() {
    let h = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/sms")
        .header(header::AUTHORIZATION, basic())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text":"hello"}"#))
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Parameters 'text' and 'number' are required.");
    assert!(h.modem.sent().is_empty());
}

#[tokio::test]
async fn test_delete_out_of_range_is_404() {
    let h = harness();
    for text in ["a", "b", "c"] {
        h.modem.receive_text("+1", text, Utc::now()).unwrap();
    }
    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/sms/5")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(h.modem.locations().len(), 3);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/sms/1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
    assert_eq!(h.modem.locations().len(), 2);
}

#[tokio::test]
async fn test_partial_delete_is_500_with_report() {
    let h = harness();
    let parts = h.modem.receive_text("+1", &"p".repeat(200), Utc::now()).unwrap();
    h.modem.fail_delete_of(parts[1]);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/sms/0")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["deleted"][0], parts[0]);
    assert_eq!(body["failed"][0]["location"], parts[1]);
}

#[tokio::test]
async fn test_getsms_pops_then_returns_placeholder() {
    let h = harness();
    h.modem.receive_text("+1", "only one", Utc::now()).unwrap();

    let (status, body) = send(&h.app, get("/getsms")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Text"], "only one");
    assert!(h.modem.locations().is_empty());

    let (status, body) = send(&h.app, get("/getsms")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Date"], "");
    assert_eq!(body["Number"], "");
    assert_eq!(body["State"], "");
    assert_eq!(body["Text"], "");
}

#[tokio::test]
async fn test_status_endpoints_without_auth() {
    let h = harness();
    let plain = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(&h.app, plain("/signal")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["SignalPercent"], 62);

    let (status, body) = send(&h.app, plain("/network")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["NetworkName"], "Telekom.de");

    let (status, body) = send(&h.app, plain("/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Reset done");
    assert_eq!(h.modem.resets(), 1);
}

#[tokio::test]
async fn test_store_unavailable_is_500() {
    let h = harness();
    h.modem.set_initialized(false);
    let (status, body) = send(&h.app, get("/sms")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_missed_calls_list_and_pop() {
    let h = harness();
    let (status, body) = send(&h.app, get("/missedCalls")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["missedCalls"], serde_json::json!([]));

    let ts = chrono::DateTime::parse_from_rfc3339("2024-03-04T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    h.calls.append(MissedCallRecord::new("+1", ts)).unwrap();
    h.calls.append(MissedCallRecord::new("+2", ts)).unwrap();

    let (_, body) = send(&h.app, get("/missedCalls")).await;
    assert_eq!(
        body["missedCalls"],
        serde_json::json!(["+1 2024-03-04T12:00:00Z", "+2 2024-03-04T12:00:00Z"])
    );

    let pop = || {
        Request::builder()
            .method(Method::DELETE)
            .uri("/missedCalls")
            .header(header::AUTHORIZATION, basic())
            .body(Body::empty())
            .unwrap()
    };
    let (status, body) = send(&h.app, pop()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Last missed call removed");
    assert_eq!(body["call"], "+1 2024-03-04T12:00:00Z");

    send(&h.app, pop()).await;
    let (status, body) = send(&h.app, pop()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No missed calls to remove");
}
