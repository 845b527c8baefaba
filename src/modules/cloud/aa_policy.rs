//! clc_aa_policy - anti-affinity policies

use async_trait::async_trait;

use crate::clc::models::AntiAffinityPolicy;
use crate::modules::{
    cloud::{common_arguments, connect, resolve_location},
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, Diff, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];

/// clc_aa_policy module - manages anti-affinity policies
pub struct AntiAffinityPolicyModule;

#[async_trait]
impl ExecutionModule for AntiAffinityPolicyModule {
    fn name(&self) -> &'static str {
        "clc_aa_policy"
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
            ArgumentSpec::new("name", "str", "The name of the Anti Affinity Policy.").required(),
            ArgumentSpec::new("state", "str", "Whether to create or delete the policy.").default_value("present"),
        ];
        arguments.extend(common_arguments());

        ModuleDocumentation {
            description: "An Ansible module to Create or Delete Anti Affinity Policies at CenturyLink Cloud.".to_string(),
            arguments,
            examples: vec![r#"clc_aa_policy:
    name: Hammer Time
    location: UK3
    state: present"#
                .to_string()],
            return_values: vec![ReturnValueSpec::new(
                "policy",
                "dict",
                "success",
                "The anti affinity policy information",
            )],
        }
    }
}

impl AntiAffinityPolicyModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let name = args.required_str("name")?;
        let state = args.choice("state", STATES, "present")?;

        let client = connect(args, context).await?;
        let location = resolve_location(&client, args)?;
        let existing = client
            .list_anti_affinity_policies()
            .await?
            .into_iter()
            .find(|p| p.name == name && located_in(p, &location));

        let diff = |before: Option<&AntiAffinityPolicy>, after: Option<&AntiAffinityPolicy>| {
            context.diff_mode.then(|| {
                let before = before.and_then(|p| serde_json::to_value(p).ok());
                let after = after.and_then(|p| serde_json::to_value(p).ok());
                Diff::of_resource(&format!("anti affinity policy {name}"), before.as_ref(), after.as_ref())
            })
        };

        match (state.as_str(), existing) {
            ("present", Some(policy)) => Ok(ModuleResult::new(false).with_result("policy", &policy)),
            ("present", None) => {
                if check_mode {
                    return Ok(ModuleResult::new(true).with_result("policy", serde_json::Value::Null));
                }
                let policy = client.create_anti_affinity_policy(&name, &location).await?;
                Ok(ModuleResult::new(true)
                    .with_result("policy", &policy)
                    .with_diff(diff(None, Some(&policy))))
            }
            (_, Some(policy)) => {
                if !check_mode {
                    client.delete_anti_affinity_policy(&policy.id).await?;
                }
                Ok(ModuleResult::new(true)
                    .with_result("policy", serde_json::Value::Null)
                    .with_diff(diff(Some(&policy), None)))
            }
            (_, None) => Ok(ModuleResult::new(false).with_result("policy", serde_json::Value::Null)),
        }
    }
}

/// Policies without a reported location are assumed to match
fn located_in(policy: &AntiAffinityPolicy, location: &str) -> bool {
    policy
        .location
        .as_deref()
        .map_or(true, |l| l.eq_ignore_ascii_case(location))
}
