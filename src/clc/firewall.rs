//! Intra-datacenter firewall policy endpoints

use reqwest::Method;
use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{find_link, FirewallPolicy, FirewallPolicyRequest, Link},
};

#[derive(Debug, serde::Deserialize)]
struct CreatedPolicy {
    #[serde(default)]
    links: Vec<Link>,
}

impl ClcClient {
    fn firewall_path(&self, location: &str) -> String {
        format!(
            "/v2-experimental/firewallPolicies/{}/{}",
            self.alias(),
            location
        )
    }

    pub async fn get_firewall_policy(
        &self,
        location: &str,
        policy_id: &str,
    ) -> Result<Option<FirewallPolicy>, ClcError> {
        match self
            .get(&format!("{}/{}", self.firewall_path(location), policy_id))
            .await
        {
            Ok(policy) => Ok(Some(policy)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a policy and return its ID, read from the `self` link
    pub async fn create_firewall_policy(
        &self,
        location: &str,
        request: &FirewallPolicyRequest,
    ) -> Result<String, ClcError> {
        info!(location = %location, destination = %request.destination_account, "creating firewall policy");
        let created: CreatedPolicy = self.post(&self.firewall_path(location), request).await?;
        find_link(&created.links, "self")
            .and_then(|l| {
                l.id.clone()
                    .or_else(|| l.href.rsplit('/').next().map(String::from))
            })
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ClcError::UnexpectedResponse("firewall policy created without a self link".into())
            })
    }

    pub async fn update_firewall_policy(
        &self,
        location: &str,
        policy_id: &str,
        request: &FirewallPolicyRequest,
    ) -> Result<(), ClcError> {
        info!(policy = %policy_id, "updating firewall policy");
        self.send_empty(
            Method::PUT,
            &format!("{}/{}", self.firewall_path(location), policy_id),
            Some(request),
        )
        .await
    }

    pub async fn delete_firewall_policy(
        &self,
        location: &str,
        policy_id: &str,
    ) -> Result<(), ClcError> {
        info!(policy = %policy_id, "deleting firewall policy");
        self.send_empty::<()>(
            Method::DELETE,
            &format!("{}/{}", self.firewall_path(location), policy_id),
            None,
        )
        .await
    }
}
