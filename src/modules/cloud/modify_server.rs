//! clc_modify_server - resize servers and manage their policy attachments

use async_trait::async_trait;
use tracing::debug;

use crate::clc::{
    models::{Link, Server, ServerPatch},
    ClcClient,
};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];

/// clc_modify_server module - modifies existing servers
pub struct ModifyServerModule;

/// What the caller asked for, with policy names already resolved to IDs
#[derive(Debug, Default)]
struct Requested {
    cpu: Option<u64>,
    memory_gb: Option<u64>,
    anti_affinity_policy: Option<PolicyTarget>,
    alert_policy_id: Option<String>,
}

#[derive(Debug, Clone)]
enum PolicyTarget {
    Id(String),
    /// Resolved per server, since anti-affinity policies are per datacenter
    Name(String),
}

#[async_trait]
impl ExecutionModule for ModifyServerModule {
    fn name(&self) -> &'static str {
        "clc_modify_server"
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
        args.mutually_exclusive(&["anti_affinity_policy_id", "anti_affinity_policy_name"])?;
        args.mutually_exclusive(&["alert_policy_id", "alert_policy_name"])?;
        args.get_u64("cpu")?;
        args.get_u64("memory")?;
        args.get_bool("wait", true)?;
        if args.get_str_list("server_ids")?.is_empty() {
            return Err(ValidationError::MissingRequiredArg {
                arg: "server_ids".to_string(),
            });
        }
        if state == "absent" && (args.contains("cpu") || args.contains("memory")) {
            return Err(ValidationError::InvalidArgValue {
                arg: "state".to_string(),
                value: state,
                reason: "'absent' state is not supported for 'cpu' and 'memory' arguments"
                    .to_string(),
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
            ArgumentSpec::new("server_ids", "list", "A list of server Ids to modify.").required(),
            ArgumentSpec::new("cpu", "int", "How many CPUs to update on the server"),
            ArgumentSpec::new("memory", "int", "Memory (in GB) to set to the server."),
            ArgumentSpec::new("anti_affinity_policy_id", "str", "The anti affinity policy id to be set for a hyper scale server. This is mutually exclusive with 'anti_affinity_policy_name'"),
            ArgumentSpec::new("anti_affinity_policy_name", "str", "The anti affinity policy name to be set for a hyper scale server. This is mutually exclusive with 'anti_affinity_policy_id'"),
            ArgumentSpec::new("alert_policy_id", "str", "The alert policy id to be associated to the server. This is mutually exclusive with 'alert_policy_name'"),
            ArgumentSpec::new("alert_policy_name", "str", "The alert policy name to be associated to the server. This is mutually exclusive with 'alert_policy_id'"),
            ArgumentSpec::new("state", "str", "The state to insure that the provided resources are in.").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "An Ansible module to modify servers in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![
                r#"clc_modify_server:
    server_ids:
      - UC1TEST-SVR01
      - UC1TEST-SVR02
    cpu: 4
    memory: 8"#
                    .to_string(),
                r#"clc_modify_server:
    server_ids:
      - UC1TEST-SVR01
    alert_policy_name: 'test alert policy'
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![
                ReturnValueSpec::new("server_ids", "list", "success", "The list of server ids that are changed"),
                ReturnValueSpec::new("servers", "list", "success", "The list of server objects that are changed"),
            ],
        }
    }
}

impl ModifyServerModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let state = args.choice("state", STATES, "present")?;
        let server_ids = args.get_str_list("server_ids")?;
        let wait = args.get_bool("wait", true)?;

        let client = connect(args, context).await?;
        let requested = Requested {
            cpu: args.get_u64("cpu")?,
            memory_gb: args.get_u64("memory")?,
            anti_affinity_policy: match (
                args.get_str("anti_affinity_policy_id")?,
                args.get_str("anti_affinity_policy_name")?,
            ) {
                (Some(id), _) => Some(PolicyTarget::Id(id)),
                (None, Some(name)) => Some(PolicyTarget::Name(name)),
                (None, None) => None,
            },
            alert_policy_id: match (
                args.get_str("alert_policy_id")?,
                args.get_str("alert_policy_name")?,
            ) {
                (Some(id), _) => Some(id),
                (None, Some(name)) => Some(client.alert_policy_id_by_name(&name).await?),
                (None, None) => None,
            },
        };

        let servers = client.get_servers(&server_ids).await?;
        let mut changed_ids = Vec::new();
        let mut status_links: Vec<Link> = Vec::new();

        for server in &servers {
            let changed = if state == "present" {
                ensure_present(&client, server, &requested, check_mode, &mut status_links).await?
            } else {
                ensure_absent(&client, server, &requested, check_mode).await?
            };
            if changed {
                changed_ids.push(server.id.clone());
            }
        }
        debug!(state = %state, changed = ?changed_ids, "server modification");

        if wait {
            await_requests(&client, &status_links, "server modification").await?;
        }

        let changed_servers = if changed_ids.is_empty() || check_mode {
            servers
                .iter()
                .filter(|s| changed_ids.contains(&s.id))
                .map(Server::to_result)
                .collect::<Vec<_>>()
        } else {
            client
                .get_servers(&changed_ids)
                .await?
                .iter()
                .map(Server::to_result)
                .collect()
        };

        Ok(ModuleResult::new(!changed_ids.is_empty())
            .with_result("server_ids", &changed_ids)
            .with_result("servers", changed_servers))
    }
}

async fn resolve_anti_affinity(
    client: &ClcClient,
    target: &PolicyTarget,
    server: &Server,
) -> Result<String, ModuleExecutionError> {
    match target {
        PolicyTarget::Id(id) => Ok(id.clone()),
        PolicyTarget::Name(name) => Ok(client
            .anti_affinity_policy_id_by_name(name, server.location_id.as_deref())
            .await?),
    }
}

async fn ensure_present(
    client: &ClcClient,
    server: &Server,
    requested: &Requested,
    check_mode: bool,
    status_links: &mut Vec<Link>,
) -> Result<bool, ModuleExecutionError> {
    let mut changed = false;

    let patches = hardware_patches(server, requested.cpu, requested.memory_gb);
    if !patches.is_empty() {
        changed = true;
        if !check_mode {
            status_links.push(client.modify_server(&server.id, &patches).await?);
        }
    }

    if let Some(target) = &requested.anti_affinity_policy {
        let wanted = resolve_anti_affinity(client, target, server).await?;
        let current = client.server_anti_affinity_policy(&server.id).await?;
        if current.map(|p| p.id) != Some(wanted.clone()) {
            changed = true;
            if !check_mode {
                client
                    .set_server_anti_affinity_policy(&server.id, &wanted)
                    .await?;
            }
        }
    }

    if let Some(policy_id) = &requested.alert_policy_id {
        if !server.has_alert_policy(policy_id) {
            changed = true;
            if !check_mode {
                client.add_server_alert_policy(&server.id, policy_id).await?;
            }
        }
    }
    Ok(changed)
}

async fn ensure_absent(
    client: &ClcClient,
    server: &Server,
    requested: &Requested,
    check_mode: bool,
) -> Result<bool, ModuleExecutionError> {
    let mut changed = false;

    if let Some(target) = &requested.anti_affinity_policy {
        let unwanted = resolve_anti_affinity(client, target, server).await?;
        let current = client.server_anti_affinity_policy(&server.id).await?;
        if current.is_some_and(|p| p.id == unwanted) {
            changed = true;
            if !check_mode {
                client.remove_server_anti_affinity_policy(&server.id).await?;
            }
        }
    }

    if let Some(policy_id) = &requested.alert_policy_id {
        if server.has_alert_policy(policy_id) {
            changed = true;
            if !check_mode {
                client
                    .remove_server_alert_policy(&server.id, policy_id)
                    .await?;
            }
        }
    }
    Ok(changed)
}

/// PATCH operations needed to bring cpu and memory to the requested sizes
fn hardware_patches(server: &Server, cpu: Option<u64>, memory_gb: Option<u64>) -> Vec<ServerPatch> {
    let mut patches = Vec::new();
    if let Some(cpu) = cpu.filter(|&c| server.details.cpu != Some(c)) {
        patches.push(ServerPatch::set("cpu", cpu));
    }
    if let Some(memory) = memory_gb.filter(|&m| server.memory_gb() != Some(m)) {
        patches.push(ServerPatch::set("memory", memory));
    }
    patches
}
