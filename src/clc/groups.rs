//! Datacenters, the group hierarchy, and deployment capabilities

use std::collections::VecDeque;

use tracing::info;

use crate::clc::{
    client::ClcClient,
    error::ClcError,
    models::{
        find_link, CreateGroupRequest, Datacenter, DeployableNetwork, DeploymentCapabilities,
        Group, GroupDefaults, Link, Template,
    },
};

impl ClcClient {
    pub async fn get_datacenter(&self, location: &str) -> Result<Datacenter, ClcError> {
        self.get(&format!(
            "/v2/datacenters/{}/{}?groupLinks=true",
            self.alias(),
            location
        ))
        .await
        .map_err(|e| match e {
            ClcError::NotFound(_) => {
                ClcError::NotFound(format!("Unable to find location: {location}"))
            }
            other => other,
        })
    }

    /// The datacenter's hardware group together with its whole subtree
    pub async fn root_group(&self, location: &str) -> Result<Group, ClcError> {
        let datacenter = self.get_datacenter(location).await?;
        let root_id = find_link(&datacenter.links, "group")
            .and_then(|l| l.id.clone())
            .ok_or_else(|| {
                ClcError::UnexpectedResponse(format!("datacenter {location} has no root group"))
            })?;
        self.get_group(&root_id).await
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group, ClcError> {
        self.get(&format!("/v2/groups/{}/{}", self.alias(), group_id))
            .await
    }

    pub async fn group_defaults(&self, group_id: &str) -> Result<GroupDefaults, ClcError> {
        match self
            .get(&format!("/v2/groups/{}/{}/defaults", self.alias(), group_id))
            .await
        {
            Ok(defaults) => Ok(defaults),
            Err(e) if e.is_not_found() => Ok(GroupDefaults::default()),
            Err(e) => Err(e),
        }
    }

    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<Group, ClcError> {
        info!(name = %request.name, parent = %request.parent_group_id, "creating group");
        self.post(&format!("/v2/groups/{}", self.alias()), request)
            .await
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<Link, ClcError> {
        info!(group = %group_id, "deleting group");
        self.delete(&format!("/v2/groups/{}/{}", self.alias(), group_id))
            .await
    }

    pub async fn deployment_capabilities(
        &self,
        location: &str,
    ) -> Result<DeploymentCapabilities, ClcError> {
        self.get(&format!(
            "/v2/datacenters/{}/{}/deploymentCapabilities",
            self.alias(),
            location
        ))
        .await
    }
}

/// Every group in the tree, breadth first, paired with its parent
pub fn walk_groups(root: &Group) -> Vec<(&Group, Option<&Group>)> {
    let mut out = vec![(root, None)];
    let mut queue: VecDeque<&Group> = VecDeque::from([root]);
    while let Some(parent) = queue.pop_front() {
        for child in &parent.groups {
            out.push((child, Some(parent)));
            queue.push_back(child);
        }
    }
    out
}

/// First group named `name` anywhere in the tree
pub fn find_group<'a>(root: &'a Group, name: &str) -> Option<&'a Group> {
    walk_groups(root)
        .into_iter()
        .map(|(group, _)| group)
        .find(|group| group.name == name)
}

pub fn find_group_by_id<'a>(root: &'a Group, id: &str) -> Option<&'a Group> {
    walk_groups(root)
        .into_iter()
        .map(|(group, _)| group)
        .find(|group| group.id == id)
}

/// Group named `name` directly under the group named `parent_name`
pub fn find_child_group<'a>(root: &'a Group, name: &str, parent_name: &str) -> Option<&'a Group> {
    walk_groups(root)
        .into_iter()
        .find(|(group, parent)| {
            group.name == name && parent.is_some_and(|p| p.name == parent_name)
        })
        .map(|(group, _)| group)
}

/// Template named `search`, else the first whose name contains it, ignoring case
pub fn find_template<'a>(templates: &'a [Template], search: &str) -> Option<&'a Template> {
    let needle = search.to_lowercase();
    templates
        .iter()
        .find(|t| t.name.to_lowercase() == needle)
        .or_else(|| templates.iter().find(|t| t.name.to_lowercase().contains(&needle)))
}

/// Network matched by ID or name; without a key, the first deployable network
pub fn find_network<'a>(
    networks: &'a [DeployableNetwork],
    key: Option<&str>,
) -> Option<&'a DeployableNetwork> {
    match key {
        Some(key) => networks
            .iter()
            .find(|n| n.network_id == key || n.name == key),
        None => networks.first(),
    }
}
