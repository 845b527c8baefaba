//! clc_group - create or delete server groups

use async_trait::async_trait;
use tracing::debug;

use crate::clc::{
    groups::{find_child_group, find_group},
    models::{CreateGroupRequest, Group},
};
use crate::modules::{
    cloud::{await_requests, common_arguments, connect, resolve_location},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, Diff, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];

/// clc_group module - manages server groups
pub struct GroupModule;

#[async_trait]
impl ExecutionModule for GroupModule {
    fn name(&self) -> &'static str {
        "clc_group"
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
        args.choice("state", STATES, "present")?;
        args.get_bool("wait", true)?;
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
            ArgumentSpec::new("name", "str", "The name of the Server Group").required(),
            ArgumentSpec::new("description", "str", "A description of the Server Group"),
            ArgumentSpec::new("parent", "str", "The parent group of the server group. If parent is not provided, it creates the group at top level."),
            ArgumentSpec::new("state", "str", "Whether to create or delete the group").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "Create or delete Server Groups at CenturyLink Cloud".to_string(),
            arguments,
            examples: vec![
                r#"clc_group:
    name: My Cool Server Group
    parent: Default Group
    state: present"#
                    .to_string(),
                r#"clc_group:
    name: My Cool Server Group
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![ReturnValueSpec::new(
                "group",
                "dict",
                "success",
                "The group information",
            )],
        }
    }
}

impl GroupModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let name = args.required_str("name")?;
        let description = args.get_str("description")?;
        let state = args.choice("state", STATES, "present")?;
        let wait = args.get_bool("wait", true)?;

        let client = connect(args, context).await?;
        let location = resolve_location(&client, args)?;
        let root = client.root_group(&location).await?;
        let parent_name = args.get_str("parent")?.unwrap_or_else(|| root.name.clone());

        let parent = find_group(&root, &parent_name).ok_or_else(|| {
            ModuleExecutionError::failed(format!("parent group: {parent_name} does not exist"))
        })?;
        let existing = find_child_group(&root, &name, &parent_name);
        debug!(group = %name, parent = %parent_name, exists = existing.is_some(), "group lookup");

        let diff = |before: Option<&Group>, after: Option<&Group>| {
            context.diff_mode.then(|| {
                let before = before.and_then(|g| serde_json::to_value(g).ok());
                let after = after.and_then(|g| serde_json::to_value(g).ok());
                Diff::of_resource(&format!("group {name}"), before.as_ref(), after.as_ref())
            })
        };

        if state == "absent" {
            let Some(group) = existing else {
                return Ok(ModuleResult::new(false).with_result("group", serde_json::Value::Null));
            };
            if !check_mode {
                let status = client.delete_group(&group.id).await?;
                if wait {
                    await_requests(&client, std::slice::from_ref(&status), "group").await?;
                }
            }
            return Ok(ModuleResult::new(true)
                .with_result("group", serde_json::Value::Null)
                .with_diff(diff(Some(group), None)));
        }

        if let Some(group) = existing {
            return Ok(ModuleResult::new(false).with_result("group", group));
        }

        let request = CreateGroupRequest {
            name: name.clone(),
            description: Some(description.unwrap_or_else(|| name.clone())),
            parent_group_id: parent.id.clone(),
        };
        if check_mode {
            return Ok(ModuleResult::new(true).with_result("group", &request));
        }
        let created = client.create_group(&request).await?;
        Ok(ModuleResult::new(true)
            .with_result("group", &created)
            .with_diff(diff(None, Some(&created))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_required() {
        let args = ModuleArgs::from_value(json!({"state": "present"})).unwrap();
        assert!(GroupModule.validate_args(&args).is_err());
    }

    #[test]
    fn test_state_choices() {
        let args = ModuleArgs::from_value(json!({"name": "Web", "state": "restore"})).unwrap();
        assert!(matches!(
            GroupModule.validate_args(&args),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }
}
