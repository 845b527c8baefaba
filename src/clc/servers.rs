//! Server endpoints: lookup, create/delete, power, snapshots, modification

use reqwest::Method;
use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{
        CreateServerRequest, CreateSnapshotRequest, ExecutePackageRequest, Link, PolicyRef,
        PowerOperation, PublicIpRequest, QueuedOperation, Server, ServerPatch,
    },
};

impl ClcClient {
    pub async fn get_server(&self, server_id: &str) -> Result<Server, ClcError> {
        self.get(&format!("/v2/servers/{}/{}", self.alias(), server_id))
            .await
    }

    /// Like [`ClcClient::get_server`], but a missing server is `None`
    pub async fn find_server(&self, server_id: &str) -> Result<Option<Server>, ClcError> {
        match self.get_server(server_id).await {
            Ok(server) => Ok(Some(server)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get_server_by_uuid(&self, uuid: &str) -> Result<Server, ClcError> {
        self.get(&format!("/v2/servers/{}/{}?uuid=true", self.alias(), uuid))
            .await
    }

    /// Fetch every server in `server_ids`, failing on the first unknown ID
    pub async fn get_servers(&self, server_ids: &[String]) -> Result<Vec<Server>, ClcError> {
        let mut servers = Vec::with_capacity(server_ids.len());
        for id in server_ids {
            let server = self.get_server(id).await.map_err(|e| match e {
                ClcError::NotFound(_) => ClcError::NotFound(format!("server {id}")),
                other => other,
            })?;
            servers.push(server);
        }
        Ok(servers)
    }

    pub async fn create_server(
        &self,
        request: &CreateServerRequest,
    ) -> Result<QueuedOperation, ClcError> {
        info!(name = %request.name, group = %request.group_id, "creating server");
        self.post(&format!("/v2/servers/{}", self.alias()), request)
            .await
    }

    pub async fn delete_server(&self, server_id: &str) -> Result<QueuedOperation, ClcError> {
        info!(server = %server_id, "deleting server");
        self.delete(&format!("/v2/servers/{}/{}", self.alias(), server_id))
            .await
    }

    pub async fn power_operation(
        &self,
        operation: PowerOperation,
        server_ids: &[String],
    ) -> Result<Vec<QueuedOperation>, ClcError> {
        info!(operation = operation.path_segment(), servers = ?server_ids, "power operation");
        self.post(
            &format!(
                "/v2/operations/{}/servers/{}",
                self.alias(),
                operation.path_segment()
            ),
            server_ids,
        )
        .await
    }

    pub async fn modify_server(
        &self,
        server_id: &str,
        patches: &[ServerPatch],
    ) -> Result<Link, ClcError> {
        info!(server = %server_id, changes = patches.len(), "modifying server");
        self.patch(
            &format!("/v2/servers/{}/{}", self.alias(), server_id),
            patches,
        )
        .await
    }

    pub async fn create_snapshots(
        &self,
        server_ids: &[String],
        expiration_days: u64,
    ) -> Result<Vec<QueuedOperation>, ClcError> {
        let request = CreateSnapshotRequest {
            server_ids: server_ids.to_vec(),
            snapshot_expiration_days: expiration_days,
        };
        info!(servers = ?server_ids, expiration_days, "creating snapshots");
        self.post(
            &format!("/v2/operations/{}/servers/createSnapshot", self.alias()),
            &request,
        )
        .await
    }

    pub async fn delete_snapshot(
        &self,
        server_id: &str,
        snapshot_id: &str,
    ) -> Result<Link, ClcError> {
        info!(server = %server_id, snapshot = %snapshot_id, "deleting snapshot");
        self.delete(&format!(
            "/v2/servers/{}/{}/snapshots/{}",
            self.alias(),
            server_id,
            snapshot_id
        ))
        .await
    }

    pub async fn restore_snapshot(
        &self,
        server_id: &str,
        snapshot_id: &str,
        target_group_id: Option<&str>,
    ) -> Result<Link, ClcError> {
        info!(server = %server_id, snapshot = %snapshot_id, "restoring snapshot");
        let body = match target_group_id {
            Some(group) => serde_json::json!({ "targetGroupId": group }),
            None => serde_json::json!({}),
        };
        self.post(
            &format!(
                "/v2/servers/{}/{}/snapshots/{}/restore",
                self.alias(),
                server_id,
                snapshot_id
            ),
            &body,
        )
        .await
    }

    pub async fn add_public_ip(
        &self,
        server_id: &str,
        request: &PublicIpRequest,
    ) -> Result<Link, ClcError> {
        info!(server = %server_id, ports = request.ports.len(), "adding public ip");
        self.post(
            &format!("/v2/servers/{}/{}/publicIPAddresses", self.alias(), server_id),
            request,
        )
        .await
    }

    pub async fn remove_public_ip(
        &self,
        server_id: &str,
        public_ip: &str,
    ) -> Result<Link, ClcError> {
        info!(server = %server_id, ip = %public_ip, "removing public ip");
        self.delete(&format!(
            "/v2/servers/{}/{}/publicIPAddresses/{}",
            self.alias(),
            server_id,
            public_ip
        ))
        .await
    }

    pub async fn execute_package(
        &self,
        request: &ExecutePackageRequest,
    ) -> Result<Vec<QueuedOperation>, ClcError> {
        info!(package = %request.package.package_id, servers = ?request.servers, "executing package");
        self.post(
            &format!("/v2/operations/{}/servers/executePackage", self.alias()),
            request,
        )
        .await
    }

    /// The anti-affinity policy a server belongs to, if any
    pub async fn server_anti_affinity_policy(
        &self,
        server_id: &str,
    ) -> Result<Option<PolicyRef>, ClcError> {
        match self
            .get(&format!(
                "/v2/servers/{}/{}/antiAffinityPolicy",
                self.alias(),
                server_id
            ))
            .await
        {
            Ok(policy) => Ok(Some(policy)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_server_anti_affinity_policy(
        &self,
        server_id: &str,
        policy_id: &str,
    ) -> Result<(), ClcError> {
        info!(server = %server_id, policy = %policy_id, "setting anti-affinity policy");
        self.send_empty(
            Method::PUT,
            &format!(
                "/v2/servers/{}/{}/antiAffinityPolicy",
                self.alias(),
                server_id
            ),
            Some(&serde_json::json!({ "id": policy_id })),
        )
        .await
    }

    pub async fn remove_server_anti_affinity_policy(&self, server_id: &str) -> Result<(), ClcError> {
        info!(server = %server_id, "removing anti-affinity policy");
        self.send_empty::<()>(
            Method::DELETE,
            &format!(
                "/v2/servers/{}/{}/antiAffinityPolicy",
                self.alias(),
                server_id
            ),
            None,
        )
        .await
    }

    pub async fn add_server_alert_policy(
        &self,
        server_id: &str,
        policy_id: &str,
    ) -> Result<(), ClcError> {
        info!(server = %server_id, policy = %policy_id, "adding alert policy");
        self.send_empty(
            Method::POST,
            &format!("/v2/servers/{}/{}/alertPolicies", self.alias(), server_id),
            Some(&serde_json::json!({ "id": policy_id })),
        )
        .await
    }

    pub async fn remove_server_alert_policy(
        &self,
        server_id: &str,
        policy_id: &str,
    ) -> Result<(), ClcError> {
        info!(server = %server_id, policy = %policy_id, "removing alert policy");
        self.send_empty::<()>(
            Method::DELETE,
            &format!(
                "/v2/servers/{}/{}/alertPolicies/{}",
                self.alias(),
                server_id,
                policy_id
            ),
            None,
        )
        .await
    }
}
