//! clc_server - create, delete, and power servers, optionally to an exact count

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use crate::clc::{
    groups::{find_group, find_group_by_id, find_network, find_template},
    models::{
        find_link, CreateServerRequest, Group, Link, PortSpec, PowerOperation, PublicIpRequest,
        Server,
    },
    ClcClient, ClcError,
};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect, resolve_location},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent", "started", "stopped"];
const SERVER_TYPES: &[&str] = &["standard", "hyperscale", "bareMetal"];
const STORAGE_TYPES: &[&str] = &["standard", "hyperscale"];
const PROTOCOLS: &[&str] = &["TCP", "UDP", "ICMP"];
const DEFAULT_GROUP: &str = "Default Group";
const MIN_TTL_SECS: u64 = 3600;
const MAX_NAME_LEN: usize = 6;

/// clc_server module - manages CLC servers
pub struct ServerModule;

/// Everything needed to issue create requests, resolved against the account
#[derive(Debug, Clone)]
struct ServerPlan {
    request: CreateServerRequest,
    add_public_ip: Option<PublicIpRequest>,
    alert_policy_id: Option<String>,
}

/// Outcome of a batch of server creations
#[derive(Debug, Default)]
struct Created {
    servers: Vec<Server>,
    partially_created: Vec<String>,
}

#[async_trait]
impl ExecutionModule for ServerModule {
    fn name(&self) -> &'static str {
        "clc_server"
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
        args.get_choice("type", SERVER_TYPES, None)?;
        args.get_choice("storage_type", STORAGE_TYPES, None)?;
        args.get_choice("public_ip_protocol", PROTOCOLS, None)?;
        args.mutually_exclusive(&["count", "exact_count"])?;
        args.mutually_exclusive(&["anti_affinity_policy_id", "anti_affinity_policy_name"])?;
        args.mutually_exclusive(&["alert_policy_id", "alert_policy_name"])?;
        args.get_bool("wait", true)?;
        args.get_bool("add_public_ip", false)?;
        args.get_bool("managed_os", false)?;
        args.get_u64("cpu")?;
        args.get_u64("memory")?;
        args.get_u64_list("public_ip_ports")?;

        if state == "present" {
            let name = args.get_str("name")?.unwrap_or_default();
            if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
                return Err(ValidationError::InvalidArgValue {
                    arg: "name".to_string(),
                    value: name,
                    reason: format!(
                        "When state = 'present', name must be a string with a minimum \
                         length of 1 and a maximum length of {MAX_NAME_LEN}"
                    ),
                });
            }
            if let Some(count) = args.get_u64("count")? {
                if count < 1 {
                    return Err(ValidationError::InvalidArgValue {
                        arg: "count".to_string(),
                        value: count.to_string(),
                        reason: "count must be at least 1".to_string(),
                    });
                }
            }
            if args.get_u64("exact_count")?.is_some() && !args.contains("count_group") {
                return Err(ValidationError::MissingRequiredArg {
                    arg: "count_group".to_string(),
                });
            }
            if let Some(ttl) = args.get_u64("ttl")? {
                if ttl < MIN_TTL_SECS {
                    return Err(ValidationError::InvalidArgValue {
                        arg: "ttl".to_string(),
                        value: ttl.to_string(),
                        reason: format!("Ttl cannot be <= {MIN_TTL_SECS}"),
                    });
                }
                ttl_expiry(Utc::now(), ttl)?;
            }
            if args.get_str("type")?.as_deref() == Some("bareMetal")
                && (!args.contains("configuration_id") || !args.contains("os_type"))
            {
                return Err(ValidationError::MissingRequiredArg {
                    arg: "configuration_id and os_type (required for bareMetal servers)"
                        .to_string(),
                });
            }
        } else if args.get_str_list("server_ids")?.is_empty() {
            return Err(ValidationError::MissingRequiredArg {
                arg: format!("server_ids (a list of servers to act on when state = '{state}')"),
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
            ArgumentSpec::new("name", "str", "A 1 to 6 character identifier to use for the server.").required(),
            ArgumentSpec::new("state", "str", "The state to insure that the provided resources are in.").default_value("present"),
            ArgumentSpec::new("template", "str", "The template to use for server creation. Will search for a template if a partial string is provided."),
            ArgumentSpec::new("group", "str", "The Server Group to create servers under.").default_value(DEFAULT_GROUP),
            ArgumentSpec::new("count", "int", "The number of servers to build (mutually exclusive with exact_count).").default_value("1"),
            ArgumentSpec::new("exact_count", "int", "Run in idempotent mode. Will insure that this exact number of servers are running in the provided group, creating and deleting them to reach that count. Requires count_group to be set."),
            ArgumentSpec::new("count_group", "str", "Required when exact_count is specified. The Server Group use to determine how many servers to deploy."),
            ArgumentSpec::new("cpu", "int", "How many CPUs to provision on the server. Defaults to the group's default."),
            ArgumentSpec::new("memory", "int", "Memory in GB. Defaults to the group's default."),
            ArgumentSpec::new("type", "str", "The type of server to create: standard, hyperscale or bareMetal.").default_value("standard"),
            ArgumentSpec::new("storage_type", "str", "The type of storage to attach to the server: standard or hyperscale.").default_value("standard"),
            ArgumentSpec::new("network_id", "str", "The network UUID or name on which to create servers."),
            ArgumentSpec::new("add_public_ip", "bool", "Whether to add a public ip to the server.").default_value("false"),
            ArgumentSpec::new("public_ip_protocol", "str", "The protocol to use for the public ip if add_public_ip is set to True.").default_value("TCP"),
            ArgumentSpec::new("public_ip_ports", "list", "A list of ports to allow on the firewall to the servers public ip, if add_public_ip is set to True."),
            ArgumentSpec::new("alias", "str", "The account alias to provision the servers under."),
            ArgumentSpec::new("anti_affinity_policy_id", "str", "The anti-affinity policy to assign to the server. Mutually exclusive with anti_affinity_policy_name."),
            ArgumentSpec::new("anti_affinity_policy_name", "str", "The anti-affinity policy to assign to the server. Mutually exclusive with anti_affinity_policy_id."),
            ArgumentSpec::new("alert_policy_id", "str", "The alert policy to assign to the server. Mutually exclusive with alert_policy_name."),
            ArgumentSpec::new("alert_policy_name", "str", "The alert policy to assign to the server. Mutually exclusive with alert_policy_id."),
            ArgumentSpec::new("additional_disks", "list", "The list of additional disks for the server."),
            ArgumentSpec::new("custom_fields", "list", "The list of custom fields to set on the server."),
            ArgumentSpec::new("description", "str", "The description to set for the server."),
            ArgumentSpec::new("ip_address", "str", "The IP Address for the server."),
            ArgumentSpec::new("managed_os", "bool", "Whether to create the server as 'Managed' or not.").default_value("false"),
            ArgumentSpec::new("packages", "list", "Blueprint packages to run on the server after it is built."),
            ArgumentSpec::new("password", "str", "Password for the administrator / root user."),
            ArgumentSpec::new("primary_dns", "str", "Primary DNS used by the server."),
            ArgumentSpec::new("secondary_dns", "str", "Secondary DNS used by the server."),
            ArgumentSpec::new("server_ids", "list", "Required for started, stopped, and absent states. A list of server Ids to insure are started, stopped, or absent."),
            ArgumentSpec::new("source_server_password", "str", "The password for the source server if a clone is specified."),
            ArgumentSpec::new("ttl", "int", "The time to live for the server in seconds. The server will be deleted when this time expires."),
            ArgumentSpec::new("cpu_autoscale_policy_id", "str", "The autoscale policy to assign to the server."),
            ArgumentSpec::new("configuration_id", "str", "Only required for bare metal servers. Specifies the identifier for the specific configuration type of bare metal server to deploy."),
            ArgumentSpec::new("os_type", "str", "Only required for bare metal servers. Specifies the OS to provision with the bare metal server."),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create, Delete, Start and Stop servers in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![
                r#"clc_server:
    name: test
    template: ubuntu-14-64
    count: 1
    group: Default Group
    state: present"#
                    .to_string(),
                r#"clc_server:
    name: test
    template: ubuntu-14-64
    exact_count: 3
    count_group: Default Group
    group: Default Group"#
                    .to_string(),
                r#"clc_server:
    server_ids:
      - UC1ACCT-TEST01
    state: stopped"#
                    .to_string(),
            ],
            return_values: vec![
                ReturnValueSpec::new("server_ids", "list", "success", "The list of server ids that are created"),
                ReturnValueSpec::new("partially_created_server_ids", "list", "success", "The list of server ids that are partially created"),
                ReturnValueSpec::new("servers", "list", "success", "The list of server objects returned from CLC"),
            ],
        }
    }
}

impl ServerModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let state = args.choice("state", STATES, "present")?;
        let wait = args.get_bool("wait", true)?;
        let client = connect(args, context).await?;

        match state.as_str() {
            "absent" => {
                let server_ids = args.get_str_list("server_ids")?;
                let deleted = delete_servers(&client, &server_ids, wait, check_mode).await?;
                Ok(ModuleResult::new(!deleted.is_empty())
                    .with_result("server_ids", &deleted)
                    .with_result("partially_created_server_ids", Vec::<String>::new())
                    .with_result("servers", Vec::<serde_json::Value>::new()))
            }
            "started" | "stopped" => {
                let server_ids = args.get_str_list("server_ids")?;
                let (changed_ids, servers) =
                    change_power_state(&client, &server_ids, &state, wait, check_mode).await?;
                Ok(ModuleResult::new(!changed_ids.is_empty())
                    .with_result("server_ids", &changed_ids)
                    .with_result("partially_created_server_ids", Vec::<String>::new())
                    .with_result("servers", servers_to_results(&servers)))
            }
            _ => match args.get_u64("exact_count")? {
                Some(exact_count) => {
                    self.enforce_count(&client, args, exact_count as usize, wait, check_mode)
                        .await
                }
                None => {
                    let count = args.get_u64("count")?.unwrap_or(1) as usize;
                    let plan = resolve_plan(&client, args).await?;
                    let created = create_servers(&client, &plan, count, wait, check_mode).await?;
                    Ok(created_result(created, true))
                }
            },
        }
    }

    async fn enforce_count(
        &self,
        client: &ClcClient,
        args: &ModuleArgs,
        exact_count: usize,
        wait: bool,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let location = resolve_location(client, args)?;
        let count_group = args.required_str("count_group")?;
        let root = client.root_group(&location).await?;
        let group = lookup_group(&root, &count_group).ok_or_else(|| {
            ModuleExecutionError::failed(format!(
                "Unable to find group: {count_group} in location: {location}"
            ))
        })?;

        let mut running = Vec::new();
        for id in group.server_ids() {
            if let Some(server) = client.find_server(&id).await? {
                if server.is_active() && server.power_state() == Some("started") {
                    running.push(server);
                }
            }
        }
        debug!(group = %count_group, running = running.len(), exact_count, "counted servers");

        match running.len().cmp(&exact_count) {
            Ordering::Equal => Ok(created_result(Created::default(), false)),
            Ordering::Less => {
                let plan = resolve_plan(client, args).await?;
                let to_create = exact_count - running.len();
                info!(to_create, group = %count_group, "scaling up to exact count");
                let created = create_servers(client, &plan, to_create, wait, check_mode).await?;
                Ok(created_result(created, true))
            }
            Ordering::Greater => {
                let surplus = servers_to_remove(&running, exact_count);
                info!(to_remove = surplus.len(), group = %count_group, "scaling down to exact count");
                let deleted = delete_servers(client, &surplus, wait, check_mode).await?;
                Ok(ModuleResult::new(true)
                    .with_result("server_ids", &deleted)
                    .with_result("partially_created_server_ids", Vec::<String>::new())
                    .with_result("servers", Vec::<serde_json::Value>::new()))
            }
        }
    }
}

/// Groups are named by name or, failing that, by ID
fn lookup_group<'a>(root: &'a Group, key: &str) -> Option<&'a Group> {
    find_group(root, key).or_else(|| find_group_by_id(root, key))
}

fn created_result(created: Created, changed: bool) -> ModuleResult {
    let ids: Vec<&str> = created.servers.iter().map(|s| s.id.as_str()).collect();
    ModuleResult::new(changed)
        .with_result("server_ids", &ids)
        .with_result("partially_created_server_ids", &created.partially_created)
        .with_result("servers", servers_to_results(&created.servers))
}

fn servers_to_results(servers: &[Server]) -> Vec<serde_json::Value> {
    servers.iter().map(Server::to_result).collect()
}

/// Pick the servers to delete when more than `exact_count` are running:
/// newest first by creation date, then by descending name
fn servers_to_remove(running: &[Server], exact_count: usize) -> Vec<String> {
    let surplus = running.len().saturating_sub(exact_count);
    let mut ordered: Vec<&Server> = running.iter().collect();
    ordered.sort_by(|a, b| {
        let created = |s: &Server| s.change_info.as_ref().and_then(|c| c.created_date);
        created(b)
            .cmp(&created(a))
            .then_with(|| b.name.cmp(&a.name))
    });
    ordered
        .into_iter()
        .take(surplus)
        .map(|s| s.id.clone())
        .collect()
}

/// Absolute deletion time for a server living `secs` seconds from `now`
fn ttl_expiry(now: DateTime<Utc>, secs: u64) -> Result<String, ValidationError> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .map(|expires| expires.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| ValidationError::InvalidArgValue {
            arg: "ttl".to_string(),
            value: secs.to_string(),
            reason: "ttl is too far in the future".to_string(),
        })
}

/// Resolve group, hardware sizing, template, network, and policies for a create
async fn resolve_plan(
    client: &ClcClient,
    args: &ModuleArgs,
) -> Result<ServerPlan, ModuleExecutionError> {
    let location = resolve_location(client, args)?;
    let group_name = args
        .get_str("group")?
        .unwrap_or_else(|| DEFAULT_GROUP.to_string());
    let root = client.root_group(&location).await?;
    let group = lookup_group(&root, &group_name).ok_or_else(|| {
        ModuleExecutionError::failed(format!(
            "Unable to find group: {group_name} in location: {location}"
        ))
    })?;
    let defaults = client.group_defaults(&group.id).await?;

    let server_type = args.choice("type", SERVER_TYPES, "standard")?;
    let bare_metal = server_type == "bareMetal";

    let storage_type = match server_type.as_str() {
        "hyperscale" => Some("hyperscale".to_string()),
        "bareMetal" => None,
        _ => Some(args.choice("storage_type", STORAGE_TYPES, "standard")?),
    };

    let (cpu, memory_gb) = if bare_metal {
        (None, None)
    } else {
        let cpu = args
            .get_u64("cpu")?
            .or_else(|| defaults.cpu.as_ref().and_then(|d| d.value))
            .ok_or_else(|| {
                ModuleExecutionError::failed(
                    "Can't determine a default cpu value. Please provide a value for cpu.",
                )
            })?;
        let memory = args
            .get_u64("memory")?
            .or_else(|| defaults.memory_gb.as_ref().and_then(|d| d.value))
            .ok_or_else(|| {
                ModuleExecutionError::failed(
                    "Can't determine a default memory value. Please provide a value for memory.",
                )
            })?;
        (Some(cpu), Some(memory))
    };

    let capabilities = client.deployment_capabilities(&location).await?;

    let source_server_id = if bare_metal {
        None
    } else {
        let template = args
            .get_str("template")?
            .or_else(|| defaults.template_name.as_ref().and_then(|d| d.value.clone()))
            .ok_or_else(|| {
                ModuleExecutionError::invalid_args("template is required when creating a server")
            })?;
        let found = find_template(&capabilities.templates, &template).ok_or_else(|| {
            ModuleExecutionError::failed(format!(
                "Unable to find a template: {template} in location: {location}"
            ))
        })?;
        Some(found.name.clone())
    };

    let requested_network = args
        .get_str("network_id")?
        .or_else(|| defaults.network_id.as_ref().and_then(|d| d.value.clone()));
    let network_id = match find_network(&capabilities.deployable_networks, requested_network.as_deref()) {
        Some(network) => Some(network.network_id.clone()),
        None => match requested_network {
            Some(wanted) => {
                return Err(ModuleExecutionError::failed(format!(
                    "Unable to find a network: {wanted} in location: {location}"
                )))
            }
            None => None,
        },
    };

    let anti_affinity_policy_id = match (
        args.get_str("anti_affinity_policy_id")?,
        args.get_str("anti_affinity_policy_name")?,
    ) {
        (Some(id), _) => Some(id),
        (None, Some(name)) => Some(
            client
                .anti_affinity_policy_id_by_name(&name, Some(&location))
                .await?,
        ),
        (None, None) => None,
    };

    let alert_policy_id = match (
        args.get_str("alert_policy_id")?,
        args.get_str("alert_policy_name")?,
    ) {
        (Some(id), _) => Some(id),
        (None, Some(name)) => Some(client.alert_policy_id_by_name(&name).await?),
        (None, None) => None,
    };

    let ttl = args
        .get_u64("ttl")?
        .map(|secs| ttl_expiry(Utc::now(), secs))
        .transpose()?;

    let add_public_ip = if args.get_bool("add_public_ip", false)? {
        let protocol = args.choice("public_ip_protocol", PROTOCOLS, "TCP")?;
        let ports = args
            .get_u64_list("public_ip_ports")?
            .into_iter()
            .map(|port| PortSpec {
                protocol: protocol.clone(),
                port,
                port_to: None,
            })
            .collect();
        Some(PublicIpRequest {
            ports,
            source_restrictions: Vec::new(),
        })
    } else {
        None
    };

    let request = CreateServerRequest {
        name: args.required_str("name")?,
        description: args.get_str("description")?,
        group_id: group.id.clone(),
        source_server_id,
        is_managed_os: args.get_bool("managed_os", false)?,
        primary_dns: args
            .get_str("primary_dns")?
            .or_else(|| defaults.primary_dns.as_ref().and_then(|d| d.value.clone())),
        secondary_dns: args
            .get_str("secondary_dns")?
            .or_else(|| defaults.secondary_dns.as_ref().and_then(|d| d.value.clone())),
        network_id,
        ip_address: args.get_str("ip_address")?,
        password: args.get_str("password")?,
        source_server_password: args.get_str("source_server_password")?,
        cpu,
        cpu_autoscale_policy_id: args.get_str("cpu_autoscale_policy_id")?,
        memory_gb,
        server_type,
        storage_type,
        anti_affinity_policy_id,
        custom_fields: args.get_as("custom_fields")?.unwrap_or_default(),
        additional_disks: args.get_as("additional_disks")?.unwrap_or_default(),
        ttl,
        packages: args.get_as("packages")?.unwrap_or_default(),
        configuration_id: args.get_str("configuration_id")?,
        os_type: args.get_str("os_type")?,
    };

    Ok(ServerPlan {
        request,
        add_public_ip,
        alert_policy_id,
    })
}

/// Queue `count` server builds, wait for them, then fetch the new servers
/// and apply the post-build steps (public IP, alert policy)
async fn create_servers(
    client: &ClcClient,
    plan: &ServerPlan,
    count: usize,
    wait: bool,
    check_mode: bool,
) -> Result<Created, ModuleExecutionError> {
    let mut created = Created::default();
    if check_mode || count == 0 {
        return Ok(created);
    }

    let mut status_links: Vec<Link> = Vec::new();
    let mut uuids: Vec<String> = Vec::new();
    for _ in 0..count {
        let queued = client.create_server(&plan.request).await?;
        if !queued.is_queued {
            return Err(ModuleExecutionError::failed(format!(
                "Unable to process server request: {}",
                queued.error_message.unwrap_or_default()
            )));
        }
        if let Some(link) = queued.status_link() {
            status_links.push(link.clone());
        }
        match find_link(&queued.links, "self").and_then(|l| l.id.clone()) {
            Some(uuid) => uuids.push(uuid),
            None => warn!(server = %queued.server, "create response carried no server uuid"),
        }
    }

    if wait {
        await_requests(client, &status_links, "server").await?;
    }

    for uuid in uuids {
        match client.find_server_by_uuid_with_retry(&uuid).await {
            Ok(server) => created.servers.push(server),
            Err(ClcError::NotFound(_)) => {
                warn!(uuid = %uuid, "server never became visible");
                created.partially_created.push(uuid);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut follow_up: Vec<Link> = Vec::new();
    if let Some(public_ip) = &plan.add_public_ip {
        for server in &created.servers {
            follow_up.push(client.add_public_ip(&server.id, public_ip).await?);
        }
    }
    if let Some(policy_id) = &plan.alert_policy_id {
        for server in &created.servers {
            client.add_server_alert_policy(&server.id, policy_id).await?;
        }
    }

    if wait && !follow_up.is_empty() {
        await_requests(client, &follow_up, "public ip").await?;
        let mut refreshed = Vec::with_capacity(created.servers.len());
        for server in &created.servers {
            refreshed.push(client.get_server(&server.id).await?);
        }
        created.servers = refreshed;
    }

    Ok(created)
}

/// Delete the listed servers that still exist; returns the IDs deleted
async fn delete_servers(
    client: &ClcClient,
    server_ids: &[String],
    wait: bool,
    check_mode: bool,
) -> Result<Vec<String>, ModuleExecutionError> {
    let mut deleted = Vec::new();
    let mut status_links = Vec::new();

    for id in server_ids {
        if client.find_server(id).await?.is_none() {
            debug!(server = %id, "already absent");
            continue;
        }
        deleted.push(id.clone());
        if check_mode {
            continue;
        }
        let queued = client.delete_server(id).await?;
        if let Some(link) = queued.status_link() {
            status_links.push(link.clone());
        }
    }

    if wait {
        await_requests(client, &status_links, "server").await?;
    }
    Ok(deleted)
}

/// Power servers on or off; returns the IDs changed and the refreshed servers
async fn change_power_state(
    client: &ClcClient,
    server_ids: &[String],
    state: &str,
    wait: bool,
    check_mode: bool,
) -> Result<(Vec<String>, Vec<Server>), ModuleExecutionError> {
    let servers = client.get_servers(server_ids).await?;
    let to_change: Vec<String> = servers
        .iter()
        .filter(|s| s.power_state() != Some(state))
        .map(|s| s.id.clone())
        .collect();

    if to_change.is_empty() || check_mode {
        return Ok((to_change, servers));
    }

    let operation = if state == "started" {
        PowerOperation::PowerOn
    } else {
        PowerOperation::PowerOff
    };
    let queued = client.power_operation(operation, &to_change).await?;
    if let Some(failed) = queued.iter().find(|q| !q.is_queued) {
        return Err(ModuleExecutionError::failed(format!(
            "Unable to change power state of server {}: {}",
            failed.server,
            failed.error_message.clone().unwrap_or_default()
        )));
    }

    if wait {
        let links: Vec<Link> = queued
            .iter()
            .filter_map(|q| q.status_link().cloned())
            .collect();
        await_requests(client, &links, "server").await?;
        let refreshed = client.get_servers(server_ids).await?;
        return Ok((to_change, refreshed));
    }
    Ok((to_change, servers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn server(id: &str, name: &str, created: Option<&str>) -> Server {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "status": "active",
            "details": {"powerState": "started"},
            "changeInfo": created.map(|c| json!({"createdDate": c}))
        }))
        .unwrap()
    }

    fn args(value: serde_json::Value) -> ModuleArgs {
        ModuleArgs::from_value(value).unwrap()
    }

    #[test]
    fn test_newest_servers_removed_first() {
        let running = vec![
            server("a", "UC1WEB01", Some("2015-01-01T00:00:00Z")),
            server("c", "UC1WEB03", Some("2015-03-01T00:00:00Z")),
            server("b", "UC1WEB02", Some("2015-02-01T00:00:00Z")),
        ];
        assert_eq!(servers_to_remove(&running, 1), vec!["c", "b"]);
        assert!(servers_to_remove(&running, 3).is_empty());
        assert!(servers_to_remove(&running, 5).is_empty());
    }

    #[test]
    fn test_name_breaks_ties_without_dates() {
        let running = vec![
            server("a", "UC1WEB01", None),
            server("b", "UC1WEB02", None),
        ];
        assert_eq!(servers_to_remove(&running, 1), vec!["b"]);
    }

    #[test]
    fn test_name_length_validation() {
        let module = ServerModule;
        let err = module
            .validate_args(&args(json!({"name": "toolongname", "template": "ubuntu"})))
            .unwrap_err();
        assert!(err.to_string().contains("maximum length of 6"));
        assert!(module
            .validate_args(&args(json!({"name": "web", "template": "ubuntu"})))
            .is_ok());
    }

    #[test]
    fn test_exact_count_requires_count_group() {
        let err = ServerModule
            .validate_args(&args(json!({"name": "web", "exact_count": 2})))
            .unwrap_err();
        assert!(err.to_string().contains("count_group"));
    }

    #[test]
    fn test_count_and_exact_count_are_exclusive() {
        assert!(ServerModule
            .validate_args(&args(json!({
                "name": "web", "count": 1, "exact_count": 2, "count_group": "Web"
            })))
            .is_err());
    }

    #[test]
    fn test_absent_requires_server_ids() {
        assert!(ServerModule
            .validate_args(&args(json!({"state": "absent"})))
            .is_err());
        assert!(ServerModule
            .validate_args(&args(json!({"state": "absent", "server_ids": ["UC1WEB01"]})))
            .is_ok());
    }

    #[test]
    fn test_ttl_minimum() {
        assert!(ServerModule
            .validate_args(&args(json!({"name": "web", "ttl": 60})))
            .is_err());
        assert!(ServerModule
            .validate_args(&args(json!({"name": "web", "ttl": 7200})))
            .is_ok());
    }

    #[test]
    fn test_ttl_expiry() {
        let now = DateTime::parse_from_rfc3339("2015-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ttl_expiry(now, 7200).unwrap(), "2015-06-01T02:00:00Z");
        assert!(ttl_expiry(now, 10_000_000_000_000_000).is_err());
        assert!(ttl_expiry(now, u64::MAX).is_err());
    }

    #[test]
    fn test_huge_ttl_rejected_by_validation() {
        let err = ServerModule
            .validate_args(&args(json!({"name": "web", "ttl": 10_000_000_000_000_000u64})))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidArgValue { ref arg, .. } if arg == "ttl"
        ));
    }

    #[test]
    fn test_bare_metal_requires_configuration() {
        assert!(ServerModule
            .validate_args(&args(json!({"name": "bm", "type": "bareMetal"})))
            .is_err());
        assert!(ServerModule
            .validate_args(&args(json!({
                "name": "bm", "type": "bareMetal",
                "configuration_id": "cfg", "os_type": "ubuntu14_64Bit"
            })))
            .is_ok());
    }

    #[tokio::test]
    async fn test_server_never_visible_is_partially_created() {
        use crate::clc::{ClcConfig, Credentials};
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/servers/WFAD"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "server": "web",
                "isQueued": true,
                "links": [
                    {"rel": "status", "href": "/v2/operations/WFAD/status/build-1", "id": "build-1"},
                    {"rel": "self", "href": "/v2/servers/WFAD/uuid-lost?uuid=True", "id": "uuid-lost"}
                ]
            })))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/operations/WFAD/status/build-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "succeeded"})))
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/servers/WFAD/uuid-lost"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&mock)
            .await;

        let mut config = ClcConfig::new(Credentials::Token {
            token: "test-token".to_string(),
            alias: "WFAD".to_string(),
        })
        .with_lookup_retry(3, Duration::from_millis(1))
        .with_poll_interval(Duration::from_millis(10));
        config.api_url = mock.uri();
        let client = ClcClient::connect(config).await.unwrap();

        let plan = ServerPlan {
            request: CreateServerRequest {
                name: "web".to_string(),
                group_id: "g-default".to_string(),
                server_type: "standard".to_string(),
                ..CreateServerRequest::default()
            },
            add_public_ip: None,
            alert_policy_id: None,
        };
        let created = create_servers(&client, &plan, 1, true, false).await.unwrap();
        assert!(created.servers.is_empty());

        let result = created_result(created, true);
        assert_eq!(result.results["partially_created_server_ids"], json!(["uuid-lost"]));
        assert_eq!(result.results["server_ids"], json!([]));
        mock.verify().await;
    }

    proptest! {
        #[test]
        fn prop_surplus_removal_reaches_exact_count(running in 0usize..20, exact in 0usize..20) {
            let servers: Vec<Server> = (0..running)
                .map(|i| server(&format!("s{i}"), &format!("UC1WEB{i:02}"), None))
                .collect();
            let removed = servers_to_remove(&servers, exact);
            prop_assert_eq!(removed.len(), running.saturating_sub(exact));
            prop_assert_eq!(running - removed.len(), running.min(exact));
        }
    }
}
