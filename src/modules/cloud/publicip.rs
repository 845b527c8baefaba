//! clc_publicip - add or remove public IP addresses on servers

use async_trait::async_trait;
use tracing::debug;

use crate::clc::models::{Link, PortSpec, PublicIpRequest};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];
const PROTOCOLS: &[&str] = &["TCP", "UDP", "ICMP"];

/// clc_publicip module - manages server public IPs
pub struct PublicIpModule;

#[async_trait]
impl ExecutionModule for PublicIpModule {
    fn name(&self) -> &'static str {
        "clc_publicip"
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
        args.get_choice("protocol", PROTOCOLS, None)?;
        args.get_bool("wait", true)?;
        if args.get_str_list("server_ids")?.is_empty() {
            return Err(ValidationError::MissingRequiredArg {
                arg: "server_ids".to_string(),
            });
        }
        if state == "present" && args.get_u64_list("ports")?.is_empty() {
            return Err(ValidationError::MissingRequiredArg {
                arg: "ports".to_string(),
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
            ArgumentSpec::new("protocol", "str", "The protocol that the public IP will listen for.").default_value("TCP"),
            ArgumentSpec::new("ports", "list", "A list of ports to expose. This is required when state is 'present'"),
            ArgumentSpec::new("server_ids", "list", "A list of servers to create public ips on.").required(),
            ArgumentSpec::new("state", "str", "Determine whether to create or delete public IPs.").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Add or Remove public IP for servers in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![
                r#"clc_publicip:
    protocol: TCP
    ports:
      - 80
    server_ids:
      - UC1TEST-SVR01
      - UC1TEST-SVR02
    state: present"#
                    .to_string(),
                r#"clc_publicip:
    server_ids:
      - UC1TEST-SVR01
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![ReturnValueSpec::new(
                "server_ids",
                "list",
                "success",
                "The list of server ids that are changed",
            )],
        }
    }
}

impl PublicIpModule {
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
        let servers = client.get_servers(&server_ids).await?;

        let mut changed_ids = Vec::new();
        let mut status_links: Vec<Link> = Vec::new();

        if state == "present" {
            let protocol = args.choice("protocol", PROTOCOLS, "TCP")?;
            let request = PublicIpRequest {
                ports: port_specs(&protocol, &args.get_u64_list("ports")?),
                source_restrictions: Vec::new(),
            };
            for server in servers.iter().filter(|s| s.public_ips().is_empty()) {
                changed_ids.push(server.id.clone());
                if !check_mode {
                    status_links.push(client.add_public_ip(&server.id, &request).await?);
                }
            }
        } else {
            for server in &servers {
                let ips = server.public_ips();
                if ips.is_empty() {
                    continue;
                }
                changed_ids.push(server.id.clone());
                if check_mode {
                    continue;
                }
                for ip in ips {
                    status_links.push(client.remove_public_ip(&server.id, ip).await?);
                }
            }
        }
        debug!(state = %state, changed = ?changed_ids, "public ip reconciliation");

        if wait {
            await_requests(&client, &status_links, "public ip").await?;
        }

        Ok(ModuleResult::new(!changed_ids.is_empty()).with_result("server_ids", &changed_ids))
    }
}

/// ICMP carries no port; every other protocol gets one entry per port
fn port_specs(protocol: &str, ports: &[u64]) -> Vec<PortSpec> {
    if protocol == "ICMP" {
        return vec![PortSpec {
            protocol: protocol.to_string(),
            port: 0,
            port_to: None,
        }];
    }
    ports
        .iter()
        .map(|&port| PortSpec {
            protocol: protocol.to_string(),
            port,
            port_to: None,
        })
        .collect()
}
