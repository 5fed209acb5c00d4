#![allow(clippy::unwrap_used)]
// Integration tests for `SessionManager` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aci_api::{ApiRequest, Credentials, Error, SessionManager, Transport};
use secrecy::ExposeSecret;

// ── Helpers ─────────────────────────────────────────────────────────

const LOGIN: &str = "/api/aaaLogin.json";
const TENANT: &str = "/api/node/mo/uni/tn-t1.json";

async fn setup() -> (MockServer, Arc<SessionManager>) {
    let server = MockServer::start().await;
    let transport = Transport::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
    );
    let session = SessionManager::new(transport, Credentials::new("admin", "secret"));
    (server, Arc::new(session))
}

fn login_response(token: &str) -> Value {
    json!({
        "totalCount": "1",
        "imdata": [{
            "aaaLogin": {
                "attributes": { "token": token, "refreshTimeoutSeconds": "600" }
            }
        }]
    })
}

fn login_mock(token: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response(token)))
}

fn cookie(token: &str) -> String {
    format!("APIC-cookie={token}")
}

fn empty_envelope() -> Value {
    json!({ "totalCount": "0", "imdata": [] })
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_sends_credentials_once() {
    let (server, session) = setup().await;
    let cancel = CancellationToken::new();

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .and(body_json(json!({
            "aaaUser": { "attributes": { "name": "admin", "pwd": "secret" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_response("tok-1")))
        .expect(1)
        .mount(&server)
        .await;

    let first = session.ensure_authenticated(&cancel).await.unwrap();
    let second = session.ensure_authenticated(&cancel).await.unwrap();

    assert_eq!(first.token().expose_secret(), "tok-1");
    assert_eq!(first.generation(), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_login_without_token_is_auth_expired() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .mount(&server)
        .await;

    let result = session.ensure_authenticated(&CancellationToken::new()).await;

    assert!(
        matches!(result, Err(Error::AuthExpired { .. })),
        "expected AuthExpired, got: {result:?}"
    );
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_login_rejected_does_not_touch_resources() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "imdata": [{ "error": { "attributes": { "code": "401", "text": "Username or password is incorrect" } } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = session
        .with_session(&ApiRequest::get(TENANT), &CancellationToken::new())
        .await;

    match result {
        Err(Error::AuthExpired { ref message }) => {
            assert!(
                message.contains("incorrect"),
                "expected fault text in message, got: {message}"
            );
        }
        other => panic!("expected AuthExpired, got: {other:?}"),
    }
}

// ── Cookie + renewal ────────────────────────────────────────────────

#[tokio::test]
async fn test_token_sent_as_apic_cookie() {
    let (server, session) = setup().await;
    login_mock("tok-1").mount(&server).await;

    Mock::given(method("GET"))
        .and(path(TENANT))
        .and(header("cookie", cookie("tok-1").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let resp = session
        .with_session(&ApiRequest::get(TENANT), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_403_renews_once_and_retries() {
    let (server, session) = setup().await;

    login_mock("tok-1")
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    login_mock("tok-2").expect(1).mount(&server).await;

    Mock::given(method("GET"))
        .and(path(TENANT))
        .and(header("cookie", cookie("tok-1").as_str()))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TENANT))
        .and(header("cookie", cookie("tok-2").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    let resp = session
        .with_session(&ApiRequest::get(TENANT), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(resp.status, StatusCode::OK);
    let current = session.current().unwrap();
    assert_eq!(current.token().expose_secret(), "tok-2");
    assert_eq!(current.generation(), 2);
}

#[tokio::test]
async fn test_second_403_surfaces_single_auth_expired() {
    let (server, session) = setup().await;

    login_mock("tok").expect(2).mount(&server).await;
    Mock::given(method("GET"))
        .and(path(TENANT))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let result = session
        .with_session(&ApiRequest::get(TENANT), &CancellationToken::new())
        .await;

    assert!(
        matches!(result, Err(Error::AuthExpired { .. })),
        "expected AuthExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_concurrent_403s_share_one_renewal() {
    let (server, session) = setup().await;
    let cancel = CancellationToken::new();

    login_mock("tok-1")
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    login_mock("tok-2").expect(1).mount(&server).await;

    Mock::given(method("GET"))
        .and(path(TENANT))
        .and(header("cookie", cookie("tok-1").as_str()))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TENANT))
        .and(header("cookie", cookie("tok-2").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .mount(&server)
        .await;

    session.ensure_authenticated(&cancel).await.unwrap();

    let request = ApiRequest::get(TENANT);
    let calls = (0..8).map(|_| session.with_session(&request, &cancel));
    let results = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap().status, StatusCode::OK);
    }
    assert_eq!(session.current().unwrap().generation(), 2);
}

#[tokio::test]
async fn test_concurrent_failed_renewal_is_shared() {
    let (server, session) = setup().await;
    let cancel = CancellationToken::new();

    login_mock("tok-1")
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TENANT))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    session.ensure_authenticated(&cancel).await.unwrap();

    let request = ApiRequest::get(TENANT);
    let results = join_all((0..4).map(|_| session.with_session(&request, &cancel))).await;

    for result in results {
        assert!(
            matches!(result, Err(Error::AuthExpired { .. })),
            "expected AuthExpired, got: {result:?}"
        );
    }
    assert!(session.current().is_none());
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_aborts_in_flight_call() {
    let (server, session) = setup().await;
    login_mock("tok-1").mount(&server).await;

    Mock::given(method("GET"))
        .and(path(TENANT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(empty_envelope())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = session.with_session(&ApiRequest::get(TENANT), &cancel).await;

    assert!(
        matches!(result, Err(Error::Cancelled)),
        "expected Cancelled, got: {result:?}"
    );
}

#[tokio::test]
async fn test_cancelled_before_login_keeps_session_empty() {
    let (server, session) = setup().await;
    login_mock("tok-1").expect(0).mount(&server).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = session.ensure_authenticated(&cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(session.current().is_none());
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_discards_session() {
    let (server, session) = setup().await;
    let cancel = CancellationToken::new();
    login_mock("tok-1").mount(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/aaaLogout.json"))
        .and(header("cookie", cookie("tok-1").as_str()))
        .and(body_json(json!({ "aaaUser": { "attributes": { "name": "admin" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_envelope()))
        .expect(1)
        .mount(&server)
        .await;

    session.ensure_authenticated(&cancel).await.unwrap();
    session.logout(&cancel).await.unwrap();

    assert!(session.current().is_none());
    // Nothing to end the second time round.
    session.logout(&cancel).await.unwrap();
}
