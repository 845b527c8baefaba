//! clc_server_snapshot - create, delete, and restore server snapshots

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clc::models::{Link, Server};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent", "restore"];
const DEFAULT_EXPIRATION_DAYS: u64 = 7;

/// clc_server_snapshot module - manages server snapshots
pub struct ServerSnapshotModule;

#[async_trait]
impl ExecutionModule for ServerSnapshotModule {
    fn name(&self) -> &'static str {
        "clc_server_snapshot"
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
        args.choice("state", STATES, "present")?;
        args.get_bool("wait", true)?;
        if let Some(days) = args.get_u64("expiration_days")? {
            if !(1..=10).contains(&days) {
                return Err(ValidationError::InvalidArgValue {
                    arg: "expiration_days".to_string(),
                    value: days.to_string(),
                    reason: "snapshots expire after 1 to 10 days".to_string(),
                });
            }
        }
        if args.get_str_list("server_ids")?.is_empty() {
            return Err(ValidationError::MissingRequiredArg {
                arg: "server_ids".to_string(),
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
            ArgumentSpec::new("server_ids", "list", "The list of CLC server Ids.").required(),
            ArgumentSpec::new("expiration_days", "int", "The number of days to keep the server snapshot before it expires.").default_value("7"),
            ArgumentSpec::new("state", "str", "The state to insure that the provided resources are in: present, absent or restore.").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create, Delete and Restore server snapshots in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![
                r#"clc_server_snapshot:
    server_ids:
      - UC1TEST-SVR01
      - UC1TEST-SVR02
    expiration_days: 10
    state: present"#
                    .to_string(),
                r#"clc_server_snapshot:
    server_ids:
      - UC1TEST-SVR01
    state: restore"#
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

impl ServerSnapshotModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let state = args.choice("state", STATES, "present")?;
        let server_ids = args.get_str_list("server_ids")?;
        let expiration_days = args
            .get_u64("expiration_days")?
            .unwrap_or(DEFAULT_EXPIRATION_DAYS);
        let wait = args.get_bool("wait", true)?;

        let client = connect(args, context).await?;
        let servers = client.get_servers(&server_ids).await?;
        let (to_change, _): (Vec<&Server>, Vec<&Server>) = servers
            .iter()
            .partition(|s| needs_change(&state, s));
        let changed_ids: Vec<String> = to_change.iter().map(|s| s.id.clone()).collect();
        debug!(state = %state, servers = ?changed_ids, "snapshot reconciliation");

        if check_mode || to_change.is_empty() {
            return Ok(ModuleResult::new(!changed_ids.is_empty())
                .with_result("server_ids", &changed_ids));
        }

        let mut status_links: Vec<Link> = Vec::new();
        match state.as_str() {
            "present" => {
                let queued = client.create_snapshots(&changed_ids, expiration_days).await?;
                if let Some(rejected) = queued.iter().find(|q| !q.is_queued) {
                    return Err(ModuleExecutionError::failed(format!(
                        "Failed to create snapshot for server {}: {}",
                        rejected.server,
                        rejected.error_message.clone().unwrap_or_default()
                    )));
                }
                status_links.extend(queued.iter().filter_map(|q| q.status_link().cloned()));
            }
            "absent" => {
                for server in &to_change {
                    for snapshot in &server.details.snapshots {
                        match snapshot.id() {
                            Some(id) => status_links.push(client.delete_snapshot(&server.id, id).await?),
                            None => warn!(server = %server.id, snapshot = %snapshot.name, "snapshot has no id"),
                        }
                    }
                }
            }
            _ => {
                for server in &to_change {
                    let snapshot_id = server
                        .details
                        .snapshots
                        .first()
                        .and_then(|s| s.id())
                        .ok_or_else(|| {
                            ModuleExecutionError::failed(format!(
                                "Failed to restore snapshot for server {}: snapshot has no id",
                                server.id
                            ))
                        })?;
                    status_links.push(
                        client
                            .restore_snapshot(&server.id, snapshot_id, server.group_id.as_deref())
                            .await?,
                    );
                }
            }
        }

        if wait {
            await_requests(&client, &status_links, "snapshot").await?;
        }
        Ok(ModuleResult::new(true).with_result("server_ids", &changed_ids))
    }
}

/// present acts on servers without snapshots, absent and restore on servers with one
fn needs_change(state: &str, server: &Server) -> bool {
    let has_snapshot = !server.details.snapshots.is_empty();
    match state {
        "present" => !has_snapshot,
        _ => has_snapshot,
    }
}
