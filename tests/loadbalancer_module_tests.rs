mod common;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{ALIAS, LOCATION};

fn lb_path() -> String {
    format!("/v2/sharedLoadBalancers/{ALIAS}/{LOCATION}")
}

async fn mount_load_balancers(server: &MockServer, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(lb_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(server)
        .await;
}

async fn mount_pools(server: &MockServer, lb_id: &str, pools: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{}/{lb_id}/pools", lb_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(pools))
        .mount(server)
        .await;
}

fn web_lb() -> serde_json::Value {
    json!([{"id": "lb-1", "name": "web", "description": "web", "ipAddress": "66.150.160.10", "status": "enabled"}])
}

fn https_pool() -> serde_json::Value {
    json!([{"id": "pool-443", "port": 443, "method": "roundRobin", "persistence": "standard"}])
}

#[tokio::test]
async fn test_create_load_balancer_with_pool_and_nodes() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, json!([])).await;

    Mock::given(method("POST"))
        .and(path(lb_path()))
        .and(body_json(json!({"name": "web", "description": "web", "status": "enabled"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(web_lb()[0].clone()))
        .expect(1)
        .mount(&server)
        .await;

    // no pools before the create, the new pool afterwards
    Mock::given(method("GET"))
        .and(path(format!("{}/lb-1/pools", lb_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_pools(&server, "lb-1", https_pool()).await;

    Mock::given(method("POST"))
        .and(path(format!("{}/lb-1/pools", lb_path())))
        .and(body_json(json!({"port": 443, "method": "roundRobin", "persistence": "standard"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(https_pool()[0].clone()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/lb-1/pools/pool-443/nodes", lb_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/lb-1/pools/pool-443/nodes", lb_path())))
        .and(body_json(json!([{"ipAddress": "10.0.0.5", "privatePort": 80}])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_loadbalancer",
        json!({
            "name": "web",
            "port": 443,
            "nodes": [{"ipAddress": "10.0.0.5", "privatePort": 80}]
        }),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
    assert_eq!(result.results["loadbalancer"]["id"], "lb-1");
    assert_eq!(result.results["loadbalancer"]["pools"][0]["port"], 443);
}

#[tokio::test]
async fn test_existing_load_balancer_unchanged() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, web_lb()).await;
    mount_pools(&server, "lb-1", https_pool()).await;

    let result = common::run(
        "clc_loadbalancer",
        json!({"name": "web", "port": 443}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(!result.changed);
}

#[tokio::test]
async fn test_pool_method_updated() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, web_lb()).await;
    mount_pools(&server, "lb-1", https_pool()).await;

    Mock::given(method("PUT"))
        .and(path(format!("{}/lb-1/pools/pool-443", lb_path())))
        .and(body_json(json!({"port": 443, "method": "leastConnection", "persistence": "standard"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_loadbalancer",
        json!({"name": "web", "port": 443, "method": "leastConnection"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
}

#[tokio::test]
async fn test_nodes_absent_keeps_others() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, web_lb()).await;
    mount_pools(&server, "lb-1", https_pool()).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/lb-1/pools/pool-443/nodes", lb_path())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"status": "enabled", "ipAddress": "10.0.0.5", "privatePort": 80},
            {"status": "enabled", "ipAddress": "10.0.0.6", "privatePort": 80}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/lb-1/pools/pool-443/nodes", lb_path())))
        .and(body_json(json!([
            {"status": "enabled", "ipAddress": "10.0.0.6", "privatePort": 80}
        ])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_loadbalancer",
        json!({
            "name": "web",
            "port": 443,
            "state": "nodes_absent",
            "nodes": [{"ipAddress": "10.0.0.5", "privatePort": 80}]
        }),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
}

#[tokio::test]
async fn test_port_absent_on_missing_load_balancer() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, json!([])).await;

    let err = common::run(
        "clc_loadbalancer",
        json!({"name": "web", "port": 80, "state": "port_absent"}),
        &common::context(&server),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Load balancer web does not exist");
}

#[tokio::test]
async fn test_absent_deletes_load_balancer() {
    let server = MockServer::start().await;
    mount_load_balancers(&server, web_lb()).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/lb-1", lb_path())))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = common::run(
        "clc_loadbalancer",
        json!({"name": "web", "state": "absent"}),
        &common::context(&server),
    )
    .await
    .unwrap();

    assert!(result.changed);
}
