//! Network endpoints (experimental API)

use reqwest::Method;
use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{Network, OperationHandle, UpdateNetworkRequest},
};

impl ClcClient {
    pub async fn list_networks(&self, location: &str) -> Result<Vec<Network>, ClcError> {
        self.get(&format!(
            "/v2-experimental/networks/{}/{}",
            self.alias(),
            location
        ))
        .await
    }

    pub async fn get_network(&self, location: &str, network_id: &str) -> Result<Network, ClcError> {
        self.get(&format!(
            "/v2-experimental/networks/{}/{}/{}",
            self.alias(),
            location,
            network_id
        ))
        .await
    }

    /// Ask the platform for a new network; completion is asynchronous
    pub async fn claim_network(&self, location: &str) -> Result<OperationHandle, ClcError> {
        info!(location = %location, "claiming network");
        self.post(
            &format!(
                "/v2-experimental/networks/{}/{}/claim",
                self.alias(),
                location
            ),
            &serde_json::json!({}),
        )
        .await
    }

    pub async fn update_network(
        &self,
        location: &str,
        network_id: &str,
        request: &UpdateNetworkRequest,
    ) -> Result<(), ClcError> {
        info!(network = %network_id, name = %request.name, "updating network");
        self.send_empty(
            Method::PUT,
            &format!(
                "/v2-experimental/networks/{}/{}/{}",
                self.alias(),
                location,
                network_id
            ),
            Some(request),
        )
        .await
    }

    pub async fn release_network(&self, location: &str, network_id: &str) -> Result<(), ClcError> {
        info!(network = %network_id, "releasing network");
        self.send_empty::<()>(
            Method::POST,
            &format!(
                "/v2-experimental/networks/{}/{}/{}/release",
                self.alias(),
                location,
                network_id
            ),
            None,
        )
        .await
    }
}
