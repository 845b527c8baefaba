//! Anti-affinity and alert policy endpoints

use reqwest::Method;
use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{AlertPolicy, AlertPolicyRequest, AntiAffinityPolicy, ItemList},
};

impl ClcClient {
    pub async fn list_anti_affinity_policies(&self) -> Result<Vec<AntiAffinityPolicy>, ClcError> {
        let list: ItemList<AntiAffinityPolicy> = self
            .get(&format!("/v2/antiAffinityPolicies/{}", self.alias()))
            .await?;
        Ok(list.items)
    }

    pub async fn create_anti_affinity_policy(
        &self,
        name: &str,
        location: &str,
    ) -> Result<AntiAffinityPolicy, ClcError> {
        info!(name = %name, location = %location, "creating anti-affinity policy");
        self.post(
            &format!("/v2/antiAffinityPolicies/{}", self.alias()),
            &serde_json::json!({ "name": name, "location": location }),
        )
        .await
    }

    pub async fn delete_anti_affinity_policy(&self, policy_id: &str) -> Result<(), ClcError> {
        info!(policy = %policy_id, "deleting anti-affinity policy");
        self.send_empty::<()>(
            Method::DELETE,
            &format!("/v2/antiAffinityPolicies/{}/{}", self.alias(), policy_id),
            None,
        )
        .await
    }

    pub async fn list_alert_policies(&self) -> Result<Vec<AlertPolicy>, ClcError> {
        let list: ItemList<AlertPolicy> = self
            .get(&format!("/v2/alertPolicies/{}", self.alias()))
            .await?;
        Ok(list.items)
    }

    pub async fn create_alert_policy(
        &self,
        request: &AlertPolicyRequest,
    ) -> Result<AlertPolicy, ClcError> {
        info!(name = %request.name, "creating alert policy");
        self.post(&format!("/v2/alertPolicies/{}", self.alias()), request)
            .await
    }

    pub async fn update_alert_policy(
        &self,
        policy_id: &str,
        request: &AlertPolicyRequest,
    ) -> Result<AlertPolicy, ClcError> {
        info!(policy = %policy_id, name = %request.name, "updating alert policy");
        self.put(
            &format!("/v2/alertPolicies/{}/{}", self.alias(), policy_id),
            request,
        )
        .await
    }

    pub async fn delete_alert_policy(&self, policy_id: &str) -> Result<(), ClcError> {
        info!(policy = %policy_id, "deleting alert policy");
        self.send_empty::<()>(
            Method::DELETE,
            &format!("/v2/alertPolicies/{}/{}", self.alias(), policy_id),
            None,
        )
        .await
    }

    /// Resolve an anti-affinity policy name to its ID within a datacenter
    pub async fn anti_affinity_policy_id_by_name(
        &self,
        name: &str,
        location: Option<&str>,
    ) -> Result<String, ClcError> {
        let policies = self.list_anti_affinity_policies().await?;
        let matches: Vec<&AntiAffinityPolicy> = policies
            .iter()
            .filter(|p| p.name == name)
            .filter(|p| match (location, p.location.as_deref()) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                _ => true,
            })
            .collect();
        single_policy_id(
            matches.iter().map(|p| p.id.as_str()).collect(),
            "anti affinity",
            name,
        )
    }

    pub async fn alert_policy_id_by_name(&self, name: &str) -> Result<String, ClcError> {
        let policies = self.list_alert_policies().await?;
        single_policy_id(
            policies
                .iter()
                .filter(|p| p.name == name)
                .map(|p| p.id.as_str())
                .collect(),
            "alert",
            name,
        )
    }
}

/// Exactly one policy must carry the requested name
fn single_policy_id(ids: Vec<&str>, kind: &str, name: &str) -> Result<String, ClcError> {
    match ids.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(ClcError::NotFound(format!(
            "No {kind} policy was found with policy name : {name}"
        ))),
        _ => Err(ClcError::UnexpectedResponse(format!(
            "multiple {kind} policies were found with policy name : {name}"
        ))),
    }
}
