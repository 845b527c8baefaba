//! clc_firewall_policy - cross-account firewall policies within a datacenter

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::clc::{
    models::{FirewallPolicy, FirewallPolicyRequest},
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

static PORT_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^(any|icmp|(tcp|udp)/\d{1,5}(-\d{1,5})?)$"));

fn valid_port(port: &str) -> bool {
    PORT_PATTERN
        .as_ref()
        .is_ok_and(|pattern| pattern.is_match(&port.to_lowercase()))
}

/// clc_firewall_policy module - manages firewall policies
pub struct FirewallPolicyModule;

#[async_trait]
impl ExecutionModule for FirewallPolicyModule {
    fn name(&self) -> &'static str {
        "clc_firewall_policy"
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
        args.required_str("source_account_alias")?;
        args.get_bool("enabled", true)?;
        args.get_bool("wait", true)?;

        for port in args.get_str_list("ports")? {
            if !valid_port(&port) {
                return Err(ValidationError::InvalidArgValue {
                    arg: "ports".to_string(),
                    value: port,
                    reason: "expected any, icmp, tcp/N, udp/N, tcp/N-M or udp/N-M".to_string(),
                });
            }
        }

        if state == "absent" && !args.contains("firewall_policy_id") {
            return Err(ValidationError::MissingRequiredArg {
                arg: "firewall_policy_id".to_string(),
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
            ArgumentSpec::new("source_account_alias", "str", "CLC alias for the source account").required(),
            ArgumentSpec::new("destination_account_alias", "str", "CLC alias for the destination account. Defaults to the source account."),
            ArgumentSpec::new("firewall_policy_id", "str", "Id of the firewall policy. This is required to update or delete an existing firewall policy"),
            ArgumentSpec::new("source", "list", "The list of source addresses for traffic on the originating firewall. Required when creating."),
            ArgumentSpec::new("destination", "list", "The list of destination addresses for traffic on the terminating firewall. Required when creating."),
            ArgumentSpec::new("ports", "list", "The list of ports associated with the policy: any, icmp, tcp/N, udp/N or a range such as tcp/8000-8080. Required when creating."),
            ArgumentSpec::new("enabled", "bool", "Whether the firewall policy is enabled or disabled").default_value("true"),
            ArgumentSpec::new("state", "str", "Whether to create or delete the firewall policy").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create or delete or update firewall policies on Centurylink Cloud".to_string(),
            arguments,
            examples: vec![
                r#"clc_firewall_policy:
    source_account_alias: WFAD
    location: VA1
    state: present
    source: 10.128.216.0/24
    destination: 10.128.216.0/24
    ports: any
    destination_account_alias: WFAD"#
                    .to_string(),
                r#"clc_firewall_policy:
    source_account_alias: WFAD
    location: VA1
    state: absent
    firewall_policy_id: c62105233d7a4231bd2e91b9c791e43e1"#
                    .to_string(),
            ],
            return_values: vec![
                ReturnValueSpec::new("firewall_policy_id", "str", "success", "The fire wall policy id"),
                ReturnValueSpec::new("firewall_policy", "dict", "success", "The fire wall policy information"),
            ],
        }
    }
}

impl FirewallPolicyModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let state = args.choice("state", STATES, "present")?;
        let source_alias = args.required_str("source_account_alias")?;
        let policy_id = args.get_str("firewall_policy_id")?;
        let wait = args.get_bool("wait", true)?;

        let client = connect(args, context).await?.for_account(&source_alias);
        let location = resolve_location(&client, args)?;

        let existing = match &policy_id {
            Some(id) => client.get_firewall_policy(&location, id).await?,
            None => None,
        };
        debug!(location = %location, policy = ?policy_id, found = existing.is_some(), "firewall policy lookup");

        let diff = |before: Option<&FirewallPolicy>, after: Option<&serde_json::Value>| {
            context.diff_mode.then(|| {
                let before = before.and_then(|p| serde_json::to_value(p).ok());
                Diff::of_resource("firewall policy", before.as_ref(), after)
            })
        };

        if state == "absent" {
            let Some(policy) = existing else {
                return Ok(ModuleResult::new(false)
                    .with_result("firewall_policy_id", &policy_id)
                    .with_result("firewall_policy", serde_json::Value::Null));
            };
            if !check_mode {
                client.delete_firewall_policy(&location, &policy.id).await?;
            }
            return Ok(ModuleResult::new(true)
                .with_result("firewall_policy_id", &policy.id)
                .with_result("firewall_policy", serde_json::Value::Null)
                .with_diff(diff(Some(&policy), None)));
        }

        let requested = Requested {
            destination_account: args
                .get_str("destination_account_alias")?
                .unwrap_or_else(|| source_alias.clone()),
            source: args.get_str_list("source")?,
            destination: args.get_str_list("destination")?,
            ports: args
                .get_str_list("ports")?
                .into_iter()
                .map(|port| port.to_lowercase())
                .collect(),
            enabled: args.get_bool("enabled", true)?,
        };

        match existing {
            Some(policy) => {
                let Some(request) = requested.update_for(&policy) else {
                    return Ok(ModuleResult::new(false)
                        .with_result("firewall_policy_id", &policy.id)
                        .with_result("firewall_policy", &policy));
                };
                if check_mode {
                    return Ok(ModuleResult::new(true)
                        .with_result("firewall_policy_id", &policy.id)
                        .with_result("firewall_policy", &policy));
                }
                client
                    .update_firewall_policy(&location, &policy.id, &request)
                    .await?;
                let updated = fetch_policy(&client, &location, &policy.id, wait).await?;
                let after = serde_json::to_value(&updated).ok();
                Ok(ModuleResult::new(true)
                    .with_result("firewall_policy_id", &policy.id)
                    .with_result("firewall_policy", &updated)
                    .with_diff(diff(Some(&policy), after.as_ref())))
            }
            None => {
                if let Some(id) = &policy_id {
                    return Err(ModuleExecutionError::failed(format!(
                        "Firewall policy {id} does not exist in {location}"
                    )));
                }
                let request = requested.create()?;
                if check_mode {
                    return Ok(ModuleResult::new(true)
                        .with_result("firewall_policy_id", serde_json::Value::Null)
                        .with_result("firewall_policy", &request));
                }
                let id = client.create_firewall_policy(&location, &request).await?;
                let created = fetch_policy(&client, &location, &id, wait).await?;
                let after = serde_json::to_value(&created).ok();
                Ok(ModuleResult::new(true)
                    .with_result("firewall_policy_id", &id)
                    .with_result("firewall_policy", &created)
                    .with_diff(diff(None, after.as_ref())))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Requested {
    destination_account: String,
    source: Vec<String>,
    destination: Vec<String>,
    ports: Vec<String>,
    enabled: bool,
}

impl Requested {
    fn create(&self) -> Result<FirewallPolicyRequest, ModuleExecutionError> {
        for (name, values) in [
            ("source", &self.source),
            ("destination", &self.destination),
            ("ports", &self.ports),
        ] {
            if values.is_empty() {
                return Err(ModuleExecutionError::invalid_args(format!(
                    "{name} is required when creating a firewall policy"
                )));
            }
        }
        Ok(FirewallPolicyRequest {
            destination_account: self.destination_account.clone(),
            source: self.source.clone(),
            destination: self.destination.clone(),
            ports: self.ports.clone(),
            enabled: self.enabled,
        })
    }

    /// Full replacement body when any requested field differs from `policy`;
    /// unset lists keep the policy's current values
    fn update_for(&self, policy: &FirewallPolicy) -> Option<FirewallPolicyRequest> {
        let pick = |wanted: &Vec<String>, current: &Vec<String>| {
            if wanted.is_empty() {
                current.clone()
            } else {
                wanted.clone()
            }
        };
        let request = FirewallPolicyRequest {
            destination_account: policy
                .destination_account
                .clone()
                .unwrap_or_else(|| self.destination_account.clone()),
            source: pick(&self.source, &policy.source),
            destination: pick(&self.destination, &policy.destination),
            ports: pick(&self.ports, &policy.ports),
            enabled: self.enabled,
        };
        let unchanged = same_entries(&request.source, &policy.source)
            && same_entries(&request.destination, &policy.destination)
            && same_entries(&request.ports, &policy.ports)
            && request.enabled == policy.enabled;
        (!unchanged).then_some(request)
    }
}

/// Order and case are not significant in address or port lists
fn same_entries(a: &[String], b: &[String]) -> bool {
    let normalized = |values: &[String]| {
        let mut values: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
        values.sort();
        values
    };
    normalized(a) == normalized(b)
}

/// Read the policy back; with `wait`, poll until it leaves `pending`
async fn fetch_policy(
    client: &ClcClient,
    location: &str,
    policy_id: &str,
    wait: bool,
) -> Result<FirewallPolicy, ModuleExecutionError> {
    let deadline = Instant::now() + client.config().wait_timeout;
    loop {
        let policy = client
            .get_firewall_policy(location, policy_id)
            .await?
            .ok_or_else(|| ClcError::NotFound(format!("firewall policy {policy_id}")))?;
        let pending = policy.status.as_deref() == Some("pending");
        if !wait || !pending {
            return Ok(policy);
        }
        if Instant::now() >= deadline {
            return Err(ClcError::WaitTimeout {
                what: format!("firewall policy {policy_id}"),
                seconds: client.config().wait_timeout.as_secs(),
            }
            .into());
        }
        debug!(policy = %policy_id, "firewall policy still pending");
        sleep(client.config().poll_interval.max(Duration::from_millis(10))).await;
    }
}
