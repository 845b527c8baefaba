//! API layer against a mock CLC endpoint

mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clc_modules::clc::models::Link;
use clc_modules::clc::{ClcClient, ClcConfig, ClcError, Credentials};
use common::{status_link, ALIAS};

fn token_config(server: &MockServer) -> ClcConfig {
    let mut config = ClcConfig::new(Credentials::Token {
        token: "test-token".to_string(),
        alias: ALIAS.to_string(),
    });
    config.api_url = server.uri();
    config
}

fn link(value: serde_json::Value) -> Link {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_password_login_establishes_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/authentication/login"))
        .and(body_json(json!({"username": "user", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userName": "user",
            "accountAlias": ALIAS,
            "locationAlias": "VA1",
            "roles": ["AccountAdmin"],
            "bearerToken": "issued-token"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/VA1WFADWEB01")))
        .and(header("authorization", "Bearer issued-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(common::server_doc(
                "VA1WFADWEB01",
                "started",
                "2015-01-01T00:00:00Z",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ClcConfig::new(Credentials::Password {
        username: "user".to_string(),
        password: "secret".to_string(),
    });
    config.api_url = server.uri();

    let client = ClcClient::connect(config).await.unwrap();
    assert_eq!(client.alias(), ALIAS);
    assert_eq!(client.default_location(), Some("VA1"));

    let found = client.get_server("VA1WFADWEB01").await.unwrap();
    assert!(found.is_active());
}

#[tokio::test]
async fn test_rejected_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/authentication/login"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let mut config = ClcConfig::new(Credentials::Password {
        username: "user".to_string(),
        password: "wrong".to_string(),
    });
    config.api_url = server.uri();

    let err = ClcClient::connect(config).await.unwrap_err();
    assert!(matches!(err, ClcError::Credentials(_)));
    assert!(err
        .to_string()
        .starts_with("Failed to authenticate with clc V2 api"));
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/MISSING")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/BROKEN")))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "Internal error"})),
        )
        .mount(&server)
        .await;

    let client = ClcClient::connect(token_config(&server)).await.unwrap();

    assert!(client.find_server("MISSING").await.unwrap().is_none());
    match client.get_server("BROKEN").await {
        Err(ClcError::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error");
        }
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_for_requests_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/ok-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/bad-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "failed"})))
        .mount(&server)
        .await;

    let client = ClcClient::connect(token_config(&server)).await.unwrap();
    let links = vec![link(status_link("ok-1")), link(status_link("bad-1"))];

    let summary = client.wait_for_requests(&links).await.unwrap();
    assert_eq!(summary.succeeded, vec!["ok-1"]);
    assert_eq!(summary.failed, vec!["bad-1"]);

    let err = client.complete_requests(&links).await.unwrap_err();
    assert!(matches!(err, ClcError::RequestFailed { ref id } if id == "bad-1"));
}

#[tokio::test]
async fn test_wait_polls_until_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/slow-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "executing"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/slow-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = token_config(&server).with_poll_interval(Duration::from_millis(10));
    let client = ClcClient::connect(config).await.unwrap();

    client
        .complete_requests(&[link(status_link("slow-1"))])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_wait_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/stuck-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "notStarted"})))
        .mount(&server)
        .await;

    let config = token_config(&server)
        .with_poll_interval(Duration::from_millis(10))
        .with_wait_timeout(Duration::from_millis(50));
    let client = ClcClient::connect(config).await.unwrap();

    let err = client
        .wait_for_request(&link(status_link("stuck-1")))
        .await
        .unwrap_err();
    assert!(matches!(err, ClcError::WaitTimeout { .. }));
}

#[tokio::test]
async fn test_wait_timeout_covers_whole_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/slow-2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "executing"})))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/slow-2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
        .mount(&server)
        .await;
    // the second request only gets whatever time the first one left over
    Mock::given(method("GET"))
        .and(path(format!("/v2/operations/{ALIAS}/status/stuck-2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "executing"})))
        .expect(1..=3)
        .mount(&server)
        .await;

    let config = token_config(&server)
        .with_poll_interval(Duration::from_millis(100))
        .with_wait_timeout(Duration::from_millis(350));
    let client = ClcClient::connect(config).await.unwrap();

    let err = client
        .wait_for_requests(&[link(status_link("slow-2")), link(status_link("stuck-2"))])
        .await
        .unwrap_err();
    assert!(matches!(err, ClcError::WaitTimeout { ref what, .. } if what == "request stuck-2"));
    server.verify().await;
}

#[tokio::test]
async fn test_server_lookup_by_uuid_retries_until_visible() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/uuid-1")))
        .and(query_param("uuid", "true"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/uuid-1")))
        .and(query_param("uuid", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::server_doc(
            "UC1WFADWEB01",
            "started",
            "2015-01-01T00:00:00Z",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = token_config(&server).with_lookup_retry(5, Duration::from_millis(5));
    let client = ClcClient::connect(config).await.unwrap();

    let found = client.find_server_by_uuid_with_retry("uuid-1").await.unwrap();
    assert_eq!(found.id, "UC1WFADWEB01");
}

#[tokio::test]
async fn test_server_lookup_by_uuid_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/uuid-404")))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let config = token_config(&server).with_lookup_retry(3, Duration::from_millis(1));
    let client = ClcClient::connect(config).await.unwrap();

    let err = client
        .find_server_by_uuid_with_retry("uuid-404")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_policy_name_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/antiAffinityPolicies/{ALIAS}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": "aa-uc1", "name": "spread", "location": "UC1"},
                {"id": "aa-va1", "name": "spread", "location": "VA1"},
                {"id": "aa-dup1", "name": "dup", "location": "UC1"},
                {"id": "aa-dup2", "name": "dup", "location": "UC1"}
            ]
        })))
        .mount(&server)
        .await;

    let client = ClcClient::connect(token_config(&server)).await.unwrap();

    assert_eq!(
        client
            .anti_affinity_policy_id_by_name("spread", Some("va1"))
            .await
            .unwrap(),
        "aa-va1"
    );
    assert!(client
        .anti_affinity_policy_id_by_name("missing", Some("UC1"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(client
        .anti_affinity_policy_id_by_name("dup", Some("UC1"))
        .await
        .unwrap_err()
        .to_string()
        .contains("multiple anti affinity policies"));
}
