//! clc_network - claim, rename, and release datacenter networks

use async_trait::async_trait;
use tracing::{debug, info};

use crate::clc::{
    models::{find_link, Network, UpdateNetworkRequest},
    ClcClient, ClcError,
};
use crate::modules::{
    cloud::{common_arguments, connect, resolve_location},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, Diff, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];

/// clc_network module - manages private networks
pub struct NetworkModule;

#[async_trait]
impl ExecutionModule for NetworkModule {
    fn name(&self) -> &'static str {
        "clc_network"
    }

    fn version(&self) -> &'static str {
        "1.0.0"
    }

    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        self.run(args, context, false).await
    }

    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError> {
        let state = args.choice("state", STATES, "present")?;
        args.get_bool("wait", true)?;
        if state == "absent" && !args.contains("id") && !args.contains("name") {
            return Err(ValidationError::MissingRequiredArg {
                arg: "id or name".to_string(),
            });
        }
        Ok(())
    }

    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        self.run(args, context, true).await
    }

    fn documentation(&self) -> ModuleDocumentation {
        let mut arguments = vec![
            ArgumentSpec::new("id", "str", "The id or vlan of the network. Looked up before name."),
            ArgumentSpec::new("name", "str", "The name of the network. Applied to newly claimed networks."),
            ArgumentSpec::new("description", "str", "A free-form description of the network."),
            ArgumentSpec::new("state", "str", "Whether to claim or release the network").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create, update, or delete networks in CenturyLink Cloud".to_string(),
            arguments,
            examples: vec![
                r#"clc_network:
    location: ca3
    name: My Network
    description: Service network
    state: present"#
                    .to_string(),
                r#"clc_network:
    location: ca3
    name: My Network
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![ReturnValueSpec::new(
                "network",
                "dict",
                "success",
                "The network information",
            )],
        }
    }
}

impl NetworkModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let id = args.get_str("id")?;
        let name = args.get_str("name")?;
        let description = args.get_str("description")?;
        let state = args.choice("state", STATES, "present")?;
        let wait = args.get_bool("wait", true)?;

        let client = connect(args, context).await?;
        let location = resolve_location(&client, args)?;
        let networks = client.list_networks(&location).await?;
        let existing = match_network(&networks, id.as_deref(), name.as_deref()).cloned();
        debug!(location = %location, found = existing.is_some(), "network lookup");

        let header = format!("network {}", name.as_deref().or(id.as_deref()).unwrap_or(""));
        let diff = |before: Option<&Network>, after: Option<&Network>| {
            context.diff_mode.then(|| {
                let before = before.and_then(|n| serde_json::to_value(n).ok());
                let after = after.and_then(|n| serde_json::to_value(n).ok());
                Diff::of_resource(&header, before.as_ref(), after.as_ref())
            })
        };

        if state == "absent" {
            let Some(network) = existing else {
                return Ok(ModuleResult::new(false).with_result("network", serde_json::Value::Null));
            };
            if !check_mode {
                client.release_network(&location, &network.id).await?;
            }
            return Ok(ModuleResult::new(true)
                .with_result("network", serde_json::Value::Null)
                .with_diff(diff(Some(&network), None)));
        }

        match existing {
            Some(network) => {
                let update = pending_update(&network, name.as_deref(), description.as_deref());
                let Some(update) = update else {
                    return Ok(ModuleResult::new(false).with_result("network", &network));
                };
                if check_mode {
                    return Ok(ModuleResult::new(true).with_result("network", &network));
                }
                client.update_network(&location, &network.id, &update).await?;
                let updated = client.get_network(&location, &network.id).await?;
                Ok(ModuleResult::new(true)
                    .with_result("network", &updated)
                    .with_diff(diff(Some(&network), Some(&updated))))
            }
            None => {
                if check_mode {
                    return Ok(ModuleResult::new(true).with_result("network", serde_json::Value::Null));
                }
                let network = claim(&client, &location, name, description, wait).await?;
                Ok(ModuleResult::new(true)
                    .with_result("network", &network)
                    .with_diff(diff(None, network.as_ref())))
            }
        }
    }
}

/// Claim a network and, once the claim completes, apply the requested
/// name and description. Without `wait` the new network's ID is unknown.
async fn claim(
    client: &ClcClient,
    location: &str,
    name: Option<String>,
    description: Option<String>,
    wait: bool,
) -> Result<Option<Network>, ModuleExecutionError> {
    let handle = client.claim_network(location).await?;
    if !wait {
        return Ok(None);
    }

    let status = match client.wait_for_operation(&handle).await {
        Ok(status) => status,
        Err(ClcError::RequestFailed { id }) => {
            return Err(ModuleExecutionError::failed(format!(
                "Unable to claim a network in {location} (operation {id} failed)"
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let network_id = status
        .summary
        .as_ref()
        .and_then(|s| find_link(&s.links, "network"))
        .and_then(|l| l.id.clone())
        .ok_or_else(|| {
            ModuleExecutionError::failed("network claim finished without a network link")
        })?;
    info!(network = %network_id, location = %location, "network claimed");

    let mut network = client.get_network(location, &network_id).await?;
    if let Some(update) = pending_update(&network, name.as_deref(), description.as_deref()) {
        client.update_network(location, &network_id, &update).await?;
        network = client.get_network(location, &network_id).await?;
    }
    Ok(Some(network))
}

/// Match by ID or VLAN first, then by name
fn match_network<'a>(
    networks: &'a [Network],
    id: Option<&str>,
    name: Option<&str>,
) -> Option<&'a Network> {
    if let Some(id) = id {
        if let Some(found) = networks
            .iter()
            .find(|n| n.id == id || n.vlan.is_some_and(|v| v.to_string() == id))
        {
            return Some(found);
        }
    }
    name.and_then(|name| networks.iter().find(|n| n.name == name))
}

/// The update to send, if the requested name or description differ
fn pending_update(
    network: &Network,
    name: Option<&str>,
    description: Option<&str>,
) -> Option<UpdateNetworkRequest> {
    let name_changed = name.is_some_and(|n| n != network.name);
    let description_changed = description.is_some_and(|d| network.description.as_deref() != Some(d));
    if !name_changed && !description_changed {
        return None;
    }
    Some(UpdateNetworkRequest {
        name: name.unwrap_or(&network.name).to_string(),
        description: description
            .map(String::from)
            .or_else(|| network.description.clone()),
    })
}
