mod common;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::ALIAS;

async fn mount_aa_policies(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/antiAffinityPolicies/{ALIAS}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

async fn mount_alert_policies(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

fn disk_policy() -> serde_json::Value {
    json!({
        "id": "ap-1",
        "name": "disk above 80",
        "actions": [{"action": "email", "settings": {"recipients": ["ops@example.com", "dev@example.com"]}}],
        "triggers": [{"metric": "disk", "duration": "00:05:00", "threshold": 80.0}]
    })
}

#[tokio::test]
async fn test_aa_policy_created_in_location() {
    let server = MockServer::start().await;
    mount_aa_policies(
        &server,
        json!([{"id": "aa-other", "name": "Hammer Time", "location": "VA1"}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/antiAffinityPolicies/{ALIAS}")))
        .and(body_json(json!({"name": "Hammer Time", "location": "UC1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "aa-new",
            "name": "Hammer Time",
            "location": "UC1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_aa_policy",
        json!({"name": "Hammer Time"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["policy"]["id"], "aa-new");
}

#[tokio::test]
async fn test_aa_policy_present_is_idempotent() {
    let server = MockServer::start().await;
    mount_aa_policies(
        &server,
        json!([{"id": "aa-1", "name": "Hammer Time", "location": "uc1"}]),
    )
    .await;

    let result = common::run(
        "clc_aa_policy",
        json!({"name": "Hammer Time", "location": "UC1"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(!result.changed);
    assert_eq!(result.results["policy"]["id"], "aa-1");
}

#[tokio::test]
async fn test_aa_policy_absent_deletes() {
    let server = MockServer::start().await;
    mount_aa_policies(
        &server,
        json!([{"id": "aa-1", "name": "Hammer Time", "location": "UC1"}]),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v2/antiAffinityPolicies/{ALIAS}/aa-1")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_aa_policy",
        json!({"name": "Hammer Time", "state": "absent"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert!(result.results["policy"].is_null());
}

#[tokio::test]
async fn test_alert_policy_created() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}")))
        .and(body_partial_json(json!({
            "name": "cpu above 90",
            "actions": [{"action": "email", "settings": {"recipients": ["ops@example.com"]}}],
            "triggers": [{"metric": "cpu", "duration": "00:10:00", "threshold": 90.0}]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "ap-new",
            "name": "cpu above 90",
            "actions": [{"action": "email", "settings": {"recipients": ["ops@example.com"]}}],
            "triggers": [{"metric": "cpu", "duration": "00:10:00", "threshold": 90.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_alert_policy",
        json!({
            "name": "cpu above 90",
            "alert_recipients": ["ops@example.com"],
            "metric": "cpu",
            "duration": "00:10:00",
            "threshold": 90
        }),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["policy"]["id"], "ap-new");
}

#[tokio::test]
async fn test_alert_policy_create_needs_trigger() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([])).await;

    let err = common::run(
        "clc_alert_policy",
        json!({"name": "cpu above 90", "alert_recipients": ["ops@example.com"]}),
        &common::context(&server),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("is required when creating an alert policy"));
}

#[tokio::test]
async fn test_alert_policy_recipient_order_ignored() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([disk_policy()])).await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}/ap-1")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_alert_policy",
        json!({
            "name": "disk above 80",
            "alert_recipients": ["dev@example.com", "ops@example.com"],
            "threshold": 80
        }),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(!result.changed);
}

#[tokio::test]
async fn test_alert_policy_threshold_update() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([disk_policy()])).await;

    let mut updated = disk_policy();
    updated["triggers"][0]["threshold"] = json!(90.0);
    Mock::given(method("PUT"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}/ap-1")))
        .and(body_partial_json(json!({
            "triggers": [{"metric": "disk", "duration": "00:05:00", "threshold": 90.0}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_alert_policy",
        json!({"name": "disk above 80", "threshold": 90}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["policy"]["triggers"][0]["threshold"], 90.0);
}

#[tokio::test]
async fn test_alert_policy_threshold_as_string() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([disk_policy()])).await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}/ap-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(disk_policy()))
        .expect(0)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_alert_policy",
        json!({"name": "disk above 80", "threshold": "80"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(!result.changed);
}

#[tokio::test]
async fn test_alert_policy_ambiguous_name() {
    let server = MockServer::start().await;
    let mut twin = disk_policy();
    twin["id"] = json!("ap-2");
    mount_alert_policies(&server, json!([disk_policy(), twin])).await;

    let err = common::run(
        "clc_alert_policy",
        json!({"name": "disk above 80", "state": "absent"}),
        &common::context(&server),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "multiple alert policies were found with policy name : disk above 80"
    );
}

#[tokio::test]
async fn test_alert_policy_absent_by_id() {
    let server = MockServer::start().await;
    mount_alert_policies(&server, json!([disk_policy()])).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/v2/alertPolicies/{ALIAS}/ap-1")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_alert_policy",
        json!({"id": "ap-1", "state": "absent"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
}
