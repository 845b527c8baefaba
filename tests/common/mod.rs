//! Shared fixtures: a mock CLC API and an execution context pointed at it
#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clc_modules::modules::{
    ExecutionContext, ModuleArgs, ModuleExecutionError, ModuleRegistry, ModuleResult,
};

pub const ALIAS: &str = "WFAD";
pub const LOCATION: &str = "UC1";
pub const ROOT_GROUP_ID: &str = "root-uc1";
pub const DEFAULT_GROUP_ID: &str = "g-default";

pub fn environment(server: &MockServer) -> HashMap<String, String> {
    HashMap::from([
        ("CLC_V2_API_TOKEN".to_string(), "test-token".to_string()),
        ("CLC_ACCT_ALIAS".to_string(), ALIAS.to_string()),
        ("CLC_V2_API_URL".to_string(), server.uri()),
        ("CLC_LOCATION".to_string(), LOCATION.to_string()),
    ])
}

pub fn context(server: &MockServer) -> ExecutionContext {
    ExecutionContext {
        environment: environment(server),
        ..ExecutionContext::default()
    }
}

pub fn check_context(server: &MockServer) -> ExecutionContext {
    ExecutionContext {
        check_mode: true,
        ..context(server)
    }
}

pub fn args(value: Value) -> ModuleArgs {
    ModuleArgs::from_value(value).expect("arguments must be a mapping")
}

pub async fn run(
    module: &str,
    value: Value,
    context: &ExecutionContext,
) -> Result<ModuleResult, ModuleExecutionError> {
    ModuleRegistry::with_clc_modules()
        .execute_module(module, &args(value), context)
        .await
}

pub fn status_link(id: &str) -> Value {
    json!({
        "rel": "status",
        "href": format!("/v2/operations/{ALIAS}/status/{id}"),
        "id": id
    })
}

pub fn queued(server_name: &str, request_id: &str) -> Value {
    json!({
        "server": server_name,
        "isQueued": true,
        "links": [status_link(request_id)]
    })
}

pub fn server_doc(id: &str, power_state: &str, created: &str) -> Value {
    json!({
        "id": id,
        "name": id,
        "groupId": DEFAULT_GROUP_ID,
        "locationId": LOCATION,
        "status": "active",
        "type": "standard",
        "details": {
            "ipAddresses": [{"internal": "10.0.0.5"}],
            "cpu": 2,
            "memoryMB": 4096,
            "powerState": power_state
        },
        "changeInfo": {"createdDate": created}
    })
}

/// Datacenter UC1 whose hardware group holds "Default Group" with `servers`
pub async fn mount_group_tree(server: &MockServer, servers: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/datacenters/{ALIAS}/{LOCATION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "uc1",
            "name": "UC1 - US West (Santa Clara)",
            "links": [{
                "rel": "group",
                "href": format!("/v2/groups/{ALIAS}/{ROOT_GROUP_ID}"),
                "id": ROOT_GROUP_ID
            }]
        })))
        .mount(server)
        .await;

    let mut default_links = vec![json!({
        "rel": "parentGroup",
        "href": format!("/v2/groups/{ALIAS}/{ROOT_GROUP_ID}"),
        "id": ROOT_GROUP_ID
    })];
    default_links.extend(servers.iter().map(|id| {
        json!({"rel": "server", "href": format!("/v2/servers/{ALIAS}/{id}"), "id": id})
    }));

    Mock::given(method("GET"))
        .and(path(format!("/v2/groups/{ALIAS}/{ROOT_GROUP_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ROOT_GROUP_ID,
            "name": "UC1 Hardware",
            "type": "default",
            "groups": [{
                "id": DEFAULT_GROUP_ID,
                "name": "Default Group",
                "type": "default",
                "links": default_links
            }]
        })))
        .mount(server)
        .await;
}

/// Every status link reports `status`
pub async fn mount_request_status(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path_regex(format!("^/v2/operations/{ALIAS}/status/.+$")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(server)
        .await;
}

pub async fn mount_server(server: &MockServer, document: Value) {
    let id = document["id"].as_str().unwrap_or_default().to_string();
    Mock::given(method("GET"))
        .and(path(format!("/v2/servers/{ALIAS}/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}
