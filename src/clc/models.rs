//! Wire models for the CLC v2 API.
//!
//! API Documentation: <https://www.ctl.io/api-docs/v2/>

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hypermedia link attached to most CLC resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub fn find_link<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|l| l.rel == rel)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_name: String,
    pub account_alias: String,
    #[serde(default)]
    pub location_alias: Option<String>,
    pub bearer_token: String,
}

/// Body of `/v2/operations/{alias}/status/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct RequestStatusResponse {
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestStatus {
    NotStarted,
    Executing,
    Resumed,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Succeeded | RequestStatus::Failed)
    }
}

/// Response to server create/delete and the bulk power operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub is_queued: bool,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QueuedOperation {
    pub fn status_link(&self) -> Option<&Link> {
        find_link(&self.links, "status")
    }
}

/// Handle returned by the experimental API for long-running operations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationHandle {
    pub operation_id: String,
    pub uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub status: RequestStatus,
    #[serde(default)]
    pub summary: Option<OperationSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default, rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub servers_count: Option<u32>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Group {
    /// IDs of the servers directly inside this group
    pub fn server_ids(&self) -> Vec<String> {
        self.links
            .iter()
            .filter(|l| l.rel == "server")
            .filter_map(|l| l.id.clone())
            .collect()
    }

    pub fn parent_id(&self) -> Option<&str> {
        find_link(&self.links, "parentGroup").and_then(|l| l.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefaults {
    #[serde(default)]
    pub cpu: Option<DefaultValue<u64>>,
    #[serde(default, rename = "memoryGB")]
    pub memory_gb: Option<DefaultValue<u64>>,
    #[serde(default)]
    pub network_id: Option<DefaultValue<String>>,
    #[serde(default)]
    pub primary_dns: Option<DefaultValue<String>>,
    #[serde(default)]
    pub secondary_dns: Option<DefaultValue<String>>,
    #[serde(default)]
    pub template_name: Option<DefaultValue<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultValue<T> {
    pub value: Option<T>,
    #[serde(default)]
    pub inherited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parent_group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub server_type: Option<String>,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub details: ServerDetails,
    #[serde(default)]
    pub change_info: Option<ChangeInfo>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Server {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn power_state(&self) -> Option<&str> {
        self.details.power_state.as_deref()
    }

    pub fn internal_ip(&self) -> Option<&str> {
        self.details
            .ip_addresses
            .iter()
            .find_map(|ip| ip.internal.as_deref())
    }

    pub fn public_ips(&self) -> Vec<&str> {
        self.details
            .ip_addresses
            .iter()
            .filter_map(|ip| ip.public.as_deref())
            .collect()
    }

    pub fn memory_gb(&self) -> Option<u64> {
        self.details.memory_mb.map(|mb| mb / 1024)
    }

    pub fn has_alert_policy(&self, policy_id: &str) -> bool {
        self.details.alert_policies.iter().any(|p| p.id == policy_id)
    }

    /// Server document as reported back to the caller, with the first
    /// internal and public address lifted to the top level
    pub fn to_result(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let serde_json::Value::Object(ref mut map) = value {
            map.insert(
                "ipaddress".to_string(),
                self.internal_ip().map(Into::into).unwrap_or_default(),
            );
            map.insert(
                "publicip".to_string(),
                self.public_ips()
                    .first()
                    .map(|ip| serde_json::Value::from(*ip))
                    .unwrap_or_default(),
            );
        }
        value
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    #[serde(default)]
    pub alert_policies: Vec<PolicyRef>,
    #[serde(default)]
    pub cpu: Option<u64>,
    #[serde(default, rename = "memoryMB")]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub power_state: Option<String>,
    #[serde(default)]
    pub in_maintenance_mode: Option<bool>,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub custom_fields: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Snapshot {
    /// Snapshot ID, taken from the trailing segment of its self link
    pub fn id(&self) -> Option<&str> {
        find_link(&self.links, "self")
            .and_then(|l| l.href.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInfo {
    #[serde(default)]
    pub created_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub modified_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_server_id: Option<String>,
    #[serde(rename = "isManagedOS")]
    pub is_managed_os: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_server_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_autoscale_policy_id: Option<String>,
    #[serde(rename = "memoryGB", skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<u64>,
    #[serde(rename = "type")]
    pub server_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anti_affinity_policy_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_disks: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
}

/// Single entry of a server `PATCH` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerPatch {
    pub op: String,
    pub member: String,
    pub value: serde_json::Value,
}

impl ServerPatch {
    pub fn set(member: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: "set".to_string(),
            member: member.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOperation {
    PowerOn,
    PowerOff,
}

impl PowerOperation {
    pub fn path_segment(self) -> &'static str {
        match self {
            PowerOperation::PowerOn => "powerOn",
            PowerOperation::PowerOff => "powerOff",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCapabilities {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub deployable_networks: Vec<DeployableNetwork>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployableNetwork {
    pub name: String,
    pub network_id: String,
    #[serde(default, rename = "type")]
    pub network_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpRequest {
    pub ports: Vec<PortSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_restrictions: Vec<SourceRestriction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    pub protocol: String,
    pub port: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_to: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRestriction {
    pub cidr: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePackageRequest {
    pub servers: Vec<String>,
    pub package: PackageRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    pub package_id: String,
    pub parameters: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    pub server_ids: Vec<String>,
    pub snapshot_expiration_days: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiAffinityPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub actions: Vec<AlertAction>,
    #[serde(default)]
    pub triggers: Vec<AlertTrigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl AlertPolicy {
    pub fn recipients(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter(|a| a.action == "email")
            .flat_map(|a| a.settings.recipients.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAction {
    pub action: String,
    #[serde(default)]
    pub settings: AlertActionSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertActionSettings {
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTrigger {
    pub metric: String,
    pub duration: String,
    pub threshold: f64,
}

/// Body used to create or replace an alert policy
#[derive(Debug, Clone, Serialize)]
pub struct AlertPolicyRequest {
    pub name: String,
    pub actions: Vec<AlertAction>,
    pub triggers: Vec<AlertTrigger>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub netmask: Option<String>,
    #[serde(default, rename = "type")]
    pub network_type: Option<String>,
    #[serde(default)]
    pub vlan: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateNetworkRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallPolicy {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub destination: Vec<String>,
    #[serde(default)]
    pub destination_account: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallPolicyRequest {
    pub destination_account: String,
    pub source: Vec<String>,
    pub destination: Vec<String>,
    pub ports: Vec<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pools: Vec<LoadBalancerPool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadBalancerRequest {
    pub name: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerPool {
    pub id: String,
    pub port: u64,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub persistence: Option<String>,
    #[serde(default)]
    pub nodes: Vec<PoolNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolRequest {
    pub port: u64,
    pub method: String,
    pub persistence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub ip_address: String,
    pub private_port: u64,
}

impl PoolNode {
    /// Nodes are identified by address and port; status is not compared
    pub fn same_endpoint(&self, other: &PoolNode) -> bool {
        self.ip_address == other.ip_address && self.private_port == other.private_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_from_api_document() {
        let server: Server = serde_json::from_value(json!({
            "id": "wa1wfadweb01",
            "name": "WA1WFADWEB01",
            "groupId": "2a5c0b9662cf4fc8bf6180f139facdc0",
            "locationId": "WA1",
            "status": "active",
            "type": "standard",
            "details": {
                "ipAddresses": [{"internal": "10.82.131.44"}, {"internal": "10.82.131.45", "public": "65.39.180.227"}],
                "alertPolicies": [{"id": "15836e6219e84ac736d01d4e571bb950", "name": "Production Web Servers - RAM"}],
                "cpu": 2,
                "memoryMB": 4096,
                "powerState": "started",
                "snapshots": [{"name": "2014-05-16.23:45:52", "links": [{"rel": "self", "href": "/v2/servers/WFAD/wa1wfadweb01/snapshots/40"}]}]
            },
            "changeInfo": {"createdDate": "2012-12-17T01:17:17Z", "modifiedDate": "2014-05-16T23:49:25Z"}
        }))
        .unwrap();

        assert!(server.is_active());
        assert_eq!(server.power_state(), Some("started"));
        assert_eq!(server.internal_ip(), Some("10.82.131.44"));
        assert_eq!(server.public_ips(), vec!["65.39.180.227"]);
        assert_eq!(server.memory_gb(), Some(4));
        assert!(server.has_alert_policy("15836e6219e84ac736d01d4e571bb950"));
        assert_eq!(server.details.snapshots[0].id(), Some("40"));

        let result = server.to_result();
        assert_eq!(result["ipaddress"], json!("10.82.131.44"));
        assert_eq!(result["publicip"], json!("65.39.180.227"));
    }

    #[test]
    fn test_unknown_request_status() {
        let status: RequestStatusResponse =
            serde_json::from_value(json!({"status": "queued"})).unwrap();
        assert_eq!(status.status, RequestStatus::Unknown);
        assert!(!status.status.is_terminal());
    }

    #[test]
    fn test_group_server_links() {
        let group: Group = serde_json::from_value(json!({
            "id": "g1",
            "name": "Web",
            "links": [
                {"rel": "parentGroup", "href": "/v2/groups/WFAD/root", "id": "root"},
                {"rel": "server", "href": "/v2/servers/WFAD/wa1wfadweb01", "id": "WA1WFADWEB01"},
                {"rel": "server", "href": "/v2/servers/WFAD/wa1wfadweb02", "id": "WA1WFADWEB02"}
            ]
        }))
        .unwrap();
        assert_eq!(group.server_ids(), vec!["WA1WFADWEB01", "WA1WFADWEB02"]);
        assert_eq!(group.parent_id(), Some("root"));
    }

    #[test]
    fn test_create_server_request_wire_names() {
        let request = CreateServerRequest {
            name: "web".to_string(),
            group_id: "g1".to_string(),
            cpu: Some(2),
            memory_gb: Some(4),
            server_type: "standard".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["memoryGB"], json!(4));
        assert_eq!(body["isManagedOS"], json!(false));
        assert_eq!(body["type"], json!("standard"));
        assert!(body.get("ttl").is_none());
    }
}
