//! clc_blueprint_package - run a blueprint package on servers

use async_trait::async_trait;
use std::collections::HashMap;

use crate::clc::models::{ExecutePackageRequest, Link, PackageRef};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

/// clc_blueprint_package module - executes blueprint packages.
///
/// Package execution has no observable end state, so every run reports a change.
pub struct BlueprintPackageModule;

#[async_trait]
impl ExecutionModule for BlueprintPackageModule {
    fn name(&self) -> &'static str {
        "clc_blueprint_package"
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
        args.required_str("package_id")?;
        args.choice("state", &["present"], "present")?;
        args.get_as::<HashMap<String, serde_json::Value>>("package_params")?;
        args.get_bool("wait", true)?;
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
            ArgumentSpec::new("server_ids", "list", "A list of server Ids to deploy the blue print package.").required(),
            ArgumentSpec::new("package_id", "str", "The package id of the blue print.").required(),
            ArgumentSpec::new("package_params", "dict", "The dictionary of arguments required to deploy the blue print."),
            ArgumentSpec::new("state", "str", "Whether to install or uninstall the package. Currently it supports only 'present' for install action.").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "An Ansible module to deploy blue print package on a set of servers in CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![r#"clc_blueprint_package:
    server_ids:
      - UC1TEST-SERVER1
      - UC1TEST-SERVER2
    package_id: 77abb844-579d-478d-3955-c69ab4a7ba1a
    package_params: {}"#
                .to_string()],
            return_values: vec![ReturnValueSpec::new(
                "server_ids",
                "list",
                "success",
                "The list of server ids that are changed",
            )],
        }
    }
}

impl BlueprintPackageModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let server_ids = args.get_str_list("server_ids")?;
        let wait = args.get_bool("wait", true)?;
        let request = ExecutePackageRequest {
            servers: server_ids.clone(),
            package: PackageRef {
                package_id: args.required_str("package_id")?,
                parameters: args.get_as("package_params")?.unwrap_or_default(),
            },
        };

        let client = connect(args, context).await?;
        // Fails fast on unknown servers before anything is queued.
        client.get_servers(&server_ids).await?;

        if !check_mode {
            let queued = client.execute_package(&request).await?;
            if let Some(rejected) = queued.iter().find(|q| !q.is_queued) {
                return Err(ModuleExecutionError::failed(format!(
                    "Failed while installing blueprint package {} on server {}: {}",
                    request.package.package_id,
                    rejected.server,
                    rejected.error_message.clone().unwrap_or_default()
                )));
            }
            if wait {
                let links: Vec<Link> = queued
                    .iter()
                    .filter_map(|q| q.status_link().cloned())
                    .collect();
                await_requests(&client, &links, "blueprint package").await?;
            }
        }

        Ok(ModuleResult::new(true).with_result("server_ids", &server_ids))
    }
}
