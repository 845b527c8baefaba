//! clc_loadbalancer - shared load balancers, their pools, and pool nodes

use async_trait::async_trait;
use tracing::debug;

use crate::clc::{
    models::{LoadBalancer, LoadBalancerPool, LoadBalancerRequest, PoolNode, PoolRequest},
    ClcClient,
};
use crate::modules::{
    cloud::{common_arguments, connect, resolve_location},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent", "port_absent", "nodes_present", "nodes_absent"];
const PORTS: &[&str] = &["80", "443"];
const METHODS: &[&str] = &["leastConnection", "roundRobin"];
const PERSISTENCE: &[&str] = &["standard", "sticky"];
const STATUSES: &[&str] = &["enabled", "disabled"];

/// clc_loadbalancer module - manages shared load balancers
pub struct LoadBalancerModule;

/// Requested pool settings
#[derive(Debug, Clone)]
struct PoolSpec {
    port: u64,
    method: String,
    persistence: String,
}

#[async_trait]
impl ExecutionModule for LoadBalancerModule {
    fn name(&self) -> &'static str {
        "clc_loadbalancer"
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
        args.required_str("name")?;
        let state = args.choice("state", STATES, "present")?;
        args.get_choice("port", PORTS, None)?;
        args.get_choice("method", METHODS, None)?;
        args.get_choice("persistence", PERSISTENCE, None)?;
        args.get_choice("status", STATUSES, None)?;
        args.get_as::<Vec<PoolNode>>("nodes")?;

        let needs_port = matches!(state.as_str(), "port_absent" | "nodes_present" | "nodes_absent");
        if needs_port && !args.contains("port") {
            return Err(ValidationError::MissingRequiredArg {
                arg: format!("port (required when state = '{state}')"),
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
            ArgumentSpec::new("name", "str", "The name of the loadbalancer").required(),
            ArgumentSpec::new("description", "str", "A description for the loadbalancer"),
            ArgumentSpec::new("alias", "str", "The alias of your CLC Account"),
            ArgumentSpec::new("port", "int", "Port to configure on the public-facing side of the load balancer pool: 80 or 443"),
            ArgumentSpec::new("method", "str", "The balancing method for the load balancer pool: leastConnection or roundRobin"),
            ArgumentSpec::new("persistence", "str", "The persistence method for the load balancer: standard or sticky"),
            ArgumentSpec::new("nodes", "list", "A list of nodes that needs to be added to the load balancer pool, as {ipAddress, privatePort} mappings"),
            ArgumentSpec::new("status", "str", "The status of the loadbalancer").default_value("enabled"),
            ArgumentSpec::new("state", "str", "Whether to create or delete the load balancer pool").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create, Delete shared loadbalancers in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![
                r#"clc_loadbalancer:
    name: test
    description: test
    alias: TEST
    location: WA1
    port: 443
    nodes:
      - ipAddress: 10.11.22.123
        privatePort: 80
    state: present"#
                    .to_string(),
                r#"clc_loadbalancer:
    name: test
    alias: TEST
    location: WA1
    port: 443
    nodes:
      - ipAddress: 10.11.22.234
        privatePort: 80
    state: nodes_absent"#
                    .to_string(),
            ],
            return_values: vec![ReturnValueSpec::new(
                "loadbalancer",
                "dict",
                "success",
                "The load balancer result object from CLC",
            )],
        }
    }
}

impl LoadBalancerModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let name = args.required_str("name")?;
        let state = args.choice("state", STATES, "present")?;
        let port = args.get_u64("port")?;
        let nodes: Vec<PoolNode> = args.get_as("nodes")?.unwrap_or_default();

        let client = connect(args, context).await?;
        let location = resolve_location(&client, args)?;
        let existing = client
            .list_load_balancers(&location)
            .await?
            .into_iter()
            .find(|lb| lb.name == name);
        debug!(load_balancer = %name, found = existing.is_some(), "load balancer lookup");

        let reconciler = Reconciler {
            client: &client,
            location: &location,
            check_mode,
        };

        match state.as_str() {
            "absent" => {
                let Some(lb) = existing else {
                    return Ok(ModuleResult::new(false)
                        .with_result("loadbalancer", serde_json::Value::Null));
                };
                if !check_mode {
                    client.delete_load_balancer(&location, &lb.id).await?;
                }
                Ok(ModuleResult::new(true).with_result("loadbalancer", &lb))
            }
            "present" => {
                let request = LoadBalancerRequest {
                    name: name.clone(),
                    description: args.get_str("description")?.unwrap_or_else(|| name.clone()),
                    status: args.choice("status", STATUSES, "enabled")?,
                };
                let (mut changed, lb) = match existing {
                    Some(lb) => (false, lb),
                    None if check_mode => {
                        return Ok(ModuleResult::new(true).with_result("loadbalancer", &request))
                    }
                    None => (true, client.create_load_balancer(&location, &request).await?),
                };

                if let Some(port) = port {
                    let spec = PoolSpec {
                        port,
                        method: args.choice("method", METHODS, "roundRobin")?,
                        persistence: args.choice("persistence", PERSISTENCE, "standard")?,
                    };
                    let (pool_changed, pool) = reconciler.ensure_pool(&lb.id, &spec).await?;
                    changed |= pool_changed;
                    if let (Some(pool), true) = (pool, args.contains("nodes")) {
                        changed |= reconciler.replace_nodes(&lb.id, &pool, &nodes).await?;
                    }
                }
                reconciler.result(changed, lb).await
            }
            "port_absent" => {
                let lb = require_lb(existing, &name)?;
                let pool = reconciler.find_pool(&lb.id, port).await?;
                let changed = match pool {
                    Some(pool) => {
                        if !check_mode {
                            client.delete_pool(&location, &lb.id, &pool.id).await?;
                        }
                        true
                    }
                    None => false,
                };
                reconciler.result(changed, lb).await
            }
            _ => {
                let lb = require_lb(existing, &name)?;
                let pool = reconciler.find_pool(&lb.id, port).await?.ok_or_else(|| {
                    ModuleExecutionError::failed(format!(
                        "No pool for port {} exists on load balancer {name}",
                        port.unwrap_or_default()
                    ))
                })?;
                let current = client.list_pool_nodes(&location, &lb.id, &pool.id).await?;
                let desired = if state == "nodes_present" {
                    with_nodes(&current, &nodes)
                } else {
                    without_nodes(&current, &nodes)
                };
                let changed = desired.len() != current.len();
                if changed && !check_mode {
                    client
                        .set_pool_nodes(&location, &lb.id, &pool.id, &desired)
                        .await?;
                }
                reconciler.result(changed, lb).await
            }
        }
    }
}

struct Reconciler<'a> {
    client: &'a ClcClient,
    location: &'a str,
    check_mode: bool,
}

impl Reconciler<'_> {
    async fn find_pool(
        &self,
        lb_id: &str,
        port: Option<u64>,
    ) -> Result<Option<LoadBalancerPool>, ModuleExecutionError> {
        let Some(port) = port else {
            return Ok(None);
        };
        Ok(self
            .client
            .list_pools(self.location, lb_id)
            .await?
            .into_iter()
            .find(|p| p.port == port))
    }

    /// Create the pool for `spec.port`, or update its method/persistence.
    /// In check mode a missing pool yields `None`.
    async fn ensure_pool(
        &self,
        lb_id: &str,
        spec: &PoolSpec,
    ) -> Result<(bool, Option<LoadBalancerPool>), ModuleExecutionError> {
        let request = PoolRequest {
            port: spec.port,
            method: spec.method.clone(),
            persistence: spec.persistence.clone(),
        };
        match self.find_pool(lb_id, Some(spec.port)).await? {
            Some(pool) => {
                let same = pool.method.as_deref() == Some(spec.method.as_str())
                    && pool.persistence.as_deref() == Some(spec.persistence.as_str());
                if same {
                    return Ok((false, Some(pool)));
                }
                if !self.check_mode {
                    self.client
                        .update_pool(self.location, lb_id, &pool.id, &request)
                        .await?;
                }
                Ok((true, Some(pool)))
            }
            None if self.check_mode => Ok((true, None)),
            None => {
                let pool = self
                    .client
                    .create_pool(self.location, lb_id, &request)
                    .await?;
                Ok((true, Some(pool)))
            }
        }
    }

    /// Make the pool's node set exactly `nodes`
    async fn replace_nodes(
        &self,
        lb_id: &str,
        pool: &LoadBalancerPool,
        nodes: &[PoolNode],
    ) -> Result<bool, ModuleExecutionError> {
        let current = self
            .client
            .list_pool_nodes(self.location, lb_id, &pool.id)
            .await?;
        let same = current.len() == nodes.len()
            && nodes
                .iter()
                .all(|n| current.iter().any(|c| c.same_endpoint(n)));
        if same {
            return Ok(false);
        }
        if !self.check_mode {
            self.client
                .set_pool_nodes(self.location, lb_id, &pool.id, nodes)
                .await?;
        }
        Ok(true)
    }

    async fn result(
        &self,
        changed: bool,
        mut lb: LoadBalancer,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        lb.pools = self.client.list_pools(self.location, &lb.id).await?;
        Ok(ModuleResult::new(changed).with_result("loadbalancer", &lb))
    }
}

fn require_lb(existing: Option<LoadBalancer>, name: &str) -> Result<LoadBalancer, ModuleExecutionError> {
    existing.ok_or_else(|| {
        ModuleExecutionError::failed(format!("Load balancer {name} does not exist"))
    })
}

/// `current` plus every node in `add` not already present
fn with_nodes(current: &[PoolNode], add: &[PoolNode]) -> Vec<PoolNode> {
    let mut nodes = current.to_vec();
    for node in add {
        if !nodes.iter().any(|n| n.same_endpoint(node)) {
            nodes.push(node.clone());
        }
    }
    nodes
}

/// `current` minus every node in `remove`
fn without_nodes(current: &[PoolNode], remove: &[PoolNode]) -> Vec<PoolNode> {
    current
        .iter()
        .filter(|n| !remove.iter().any(|r| r.same_endpoint(n)))
        .cloned()
        .collect()
}
