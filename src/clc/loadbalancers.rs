//! Shared load balancer, pool, and node endpoints

use reqwest::Method;
use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{LoadBalancer, LoadBalancerPool, LoadBalancerRequest, PoolNode, PoolRequest},
};

impl ClcClient {
    fn lb_path(&self, location: &str) -> String {
        format!("/v2/sharedLoadBalancers/{}/{}", self.alias(), location)
    }

    pub async fn list_load_balancers(&self, location: &str) -> Result<Vec<LoadBalancer>, ClcError> {
        self.get(&self.lb_path(location)).await
    }

    pub async fn create_load_balancer(
        &self,
        location: &str,
        request: &LoadBalancerRequest,
    ) -> Result<LoadBalancer, ClcError> {
        info!(name = %request.name, location = %location, "creating load balancer");
        self.post(&self.lb_path(location), request).await
    }

    pub async fn delete_load_balancer(&self, location: &str, lb_id: &str) -> Result<(), ClcError> {
        info!(load_balancer = %lb_id, "deleting load balancer");
        self.send_empty::<()>(
            Method::DELETE,
            &format!("{}/{}", self.lb_path(location), lb_id),
            None,
        )
        .await
    }

    pub async fn list_pools(
        &self,
        location: &str,
        lb_id: &str,
    ) -> Result<Vec<LoadBalancerPool>, ClcError> {
        self.get(&format!("{}/{}/pools", self.lb_path(location), lb_id))
            .await
    }

    pub async fn create_pool(
        &self,
        location: &str,
        lb_id: &str,
        request: &PoolRequest,
    ) -> Result<LoadBalancerPool, ClcError> {
        info!(load_balancer = %lb_id, port = request.port, "creating pool");
        self.post(
            &format!("{}/{}/pools", self.lb_path(location), lb_id),
            request,
        )
        .await
    }

    pub async fn update_pool(
        &self,
        location: &str,
        lb_id: &str,
        pool_id: &str,
        request: &PoolRequest,
    ) -> Result<(), ClcError> {
        info!(load_balancer = %lb_id, pool = %pool_id, "updating pool");
        self.send_empty(
            Method::PUT,
            &format!("{}/{}/pools/{}", self.lb_path(location), lb_id, pool_id),
            Some(request),
        )
        .await
    }

    pub async fn delete_pool(
        &self,
        location: &str,
        lb_id: &str,
        pool_id: &str,
    ) -> Result<(), ClcError> {
        info!(load_balancer = %lb_id, pool = %pool_id, "deleting pool");
        self.send_empty::<()>(
            Method::DELETE,
            &format!("{}/{}/pools/{}", self.lb_path(location), lb_id, pool_id),
            None,
        )
        .await
    }

    pub async fn list_pool_nodes(
        &self,
        location: &str,
        lb_id: &str,
        pool_id: &str,
    ) -> Result<Vec<PoolNode>, ClcError> {
        self.get(&format!(
            "{}/{}/pools/{}/nodes",
            self.lb_path(location),
            lb_id,
            pool_id
        ))
        .await
    }

    /// Replace the pool's node list
    pub async fn set_pool_nodes(
        &self,
        location: &str,
        lb_id: &str,
        pool_id: &str,
        nodes: &[PoolNode],
    ) -> Result<(), ClcError> {
        info!(load_balancer = %lb_id, pool = %pool_id, nodes = nodes.len(), "setting pool nodes");
        self.send_empty(
            Method::PUT,
            &format!(
                "{}/{}/pools/{}/nodes",
                self.lb_path(location),
                lb_id,
                pool_id
            ),
            Some(nodes),
        )
        .await
    }
}
