mod common;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{ALIAS, LOCATION};

fn network(id: &str, name: &str, vlan: u32) -> serde_json::Value {
    json!({
        "id": id,
        "cidr": "10.1.1.0/24",
        "description": name,
        "gateway": "10.1.1.1",
        "name": name,
        "netmask": "255.255.255.0",
        "type": "private",
        "vlan": vlan
    })
}

async fn mount_networks(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v2-experimental/networks/{ALIAS}/{LOCATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_network_found_by_vlan() {
    let server = MockServer::start().await;
    mount_networks(&server, json!([network("net-1", "web tier", 100)])).await;

    let result = common::run(
        "clc_network",
        json!({"id": "100"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(!result.changed);
    assert_eq!(result.results["network"]["id"], "net-1");
}

#[tokio::test]
async fn test_network_description_updated() {
    let server = MockServer::start().await;
    mount_networks(&server, json!([network("net-1", "web tier", 100)])).await;

    Mock::given(method("PUT"))
        .and(path(format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/net-1")))
        .and(body_json(json!({"name": "web tier", "description": "public web"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut refreshed = network("net-1", "web tier", 100);
    refreshed["description"] = json!("public web");
    Mock::given(method("GET"))
        .and(path(format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/net-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(refreshed))
        .mount(&server)
        .await;

    let result = common::run(
        "clc_network",
        json!({"name": "web tier", "description": "public web"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["network"]["description"], "public web");
}

#[tokio::test]
async fn test_network_claimed_and_named() {
    let server = MockServer::start().await;
    mount_networks(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path(format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/claim")))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "operationId": "op-1",
            "uri": format!("/v2-experimental/operations/{ALIAS}/status/op-1")
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/v2-experimental/operations/{ALIAS}/status/op-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "succeeded",
            "summary": {
                "links": [{
                    "rel": "network",
                    "href": format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/net-new"),
                    "id": "net-new"
                }]
            }
        })))
        .mount(&server)
        .await;

    let network_path = format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/net-new");
    Mock::given(method("GET"))
        .and(path(network_path.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(network("net-new", "vlan_999_10.1.1", 999)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(network_path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(network("net-new", "db tier", 999)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(network_path.as_str()))
        .and(body_json(json!({"name": "db tier", "description": "vlan_999_10.1.1"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_network",
        json!({"name": "db tier"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["network"]["id"], "net-new");
    assert_eq!(result.results["network"]["name"], "db tier");
}

#[tokio::test]
async fn test_network_claim_without_wait() {
    let server = MockServer::start().await;
    mount_networks(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path(format!("/v2-experimental/networks/{ALIAS}/{LOCATION}/claim")))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "operationId": "op-2",
            "uri": format!("/v2-experimental/operations/{ALIAS}/status/op-2")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_network",
        json!({"name": "db tier", "wait": false}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert!(result.results["network"].is_null());
}

#[tokio::test]
async fn test_network_released() {
    let server = MockServer::start().await;
    mount_networks(&server, json!([network("net-1", "web tier", 100)])).await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/v2-experimental/networks/{ALIAS}/{LOCATION}/net-1/release"
        )))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_network",
        json!({"id": "net-1", "state": "absent"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
}
