//! clc_alert_policy - account-wide alert policies

use async_trait::async_trait;
use chrono::NaiveTime;

use crate::clc::models::{AlertAction, AlertActionSettings, AlertPolicy, AlertPolicyRequest, AlertTrigger};
use crate::modules::{
    cloud::connect,
    error::{ModuleExecutionError, ValidationError},
    interface::{
        ArgumentSpec, Diff, ExecutionContext, ExecutionModule, ModuleArgs, ModuleDocumentation,
        ModuleResult, ReturnValueSpec,
    },
};

const STATES: &[&str] = &["present", "absent"];
const METRICS: &[&str] = &["cpu", "memory", "disk"];

/// clc_alert_policy module - manages alert policies
pub struct AlertPolicyModule;

/// Requested policy contents; unset fields keep the existing policy's values
#[derive(Debug, Clone, Default, PartialEq)]
struct Requested {
    recipients: Option<Vec<String>>,
    metric: Option<String>,
    duration: Option<String>,
    threshold: Option<f64>,
}

#[async_trait]
impl ExecutionModule for AlertPolicyModule {
    fn name(&self) -> &'static str {
        "clc_alert_policy"
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
        args.get_choice("metric", METRICS, None)?;
        args.get_str_list("alert_recipients")?;
        args.get_f64("threshold")?;

        if let Some(duration) = args.get_str("duration")? {
            if NaiveTime::parse_from_str(&duration, "%H:%M:%S").is_err() {
                return Err(ValidationError::InvalidArgValue {
                    arg: "duration".to_string(),
                    value: duration,
                    reason: "expected HH:MM:SS".to_string(),
                });
            }
        }

        if state == "present" && !args.contains("name") {
            return Err(ValidationError::MissingRequiredArg {
                arg: "name".to_string(),
            });
        }
        if state == "absent" && !args.contains("name") && !args.contains("id") {
            return Err(ValidationError::MissingRequiredArg {
                arg: "name or id".to_string(),
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
        ModuleDocumentation {
            description: "An Ansible module to Create or Delete Alert Policies at CenturyLink Cloud.".to_string(),
            arguments: vec![
                ArgumentSpec::new("alias", "str", "The alias of your CLC Account"),
                ArgumentSpec::new("name", "str", "The name of the alert policy. This is mutually exclusive with id"),
                ArgumentSpec::new("id", "str", "The alert policy id. This is mutually exclusive with name"),
                ArgumentSpec::new("alert_recipients", "list", "A list of recipient email ids to notify the alert. This is required for state 'present'"),
                ArgumentSpec::new("metric", "str", "The metric on which to measure the condition that will trigger the alert: cpu, memory or disk. This is required for state 'present'"),
                ArgumentSpec::new("duration", "str", "The length of time in minutes that the condition must exceed the threshold, as HH:MM:SS. This is required for state 'present'"),
                ArgumentSpec::new("threshold", "int", "The threshold that will trigger the alert when the metric equals or exceeds it. This is required for state 'present'"),
                ArgumentSpec::new("state", "str", "Whether to create or delete the policy.").default_value("present"),
            ],
            examples: vec![
                r#"clc_alert_policy:
    alias: wfad
    name: Alert Policy for disk above 80%
    alert_recipients:
      - test1@centurylink.com
    metric: disk
    duration: 00:05:00
    threshold: 80
    state: present"#
                    .to_string(),
                r#"clc_alert_policy:
    alias: wfad
    name: Alert Policy for disk above 80%
    state: absent"#
                    .to_string(),
            ],
            return_values: vec![ReturnValueSpec::new(
                "policy",
                "dict",
                "success",
                "The alert policy information",
            )],
        }
    }
}

impl AlertPolicyModule {
    async fn run(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
        check_mode: bool,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let state = args.choice("state", STATES, "present")?;
        let name = args.get_str("name")?;
        let id = args.get_str("id")?;
        let requested = Requested {
            recipients: args
                .contains("alert_recipients")
                .then(|| args.get_str_list("alert_recipients"))
                .transpose()?,
            metric: args.get_choice("metric", METRICS, None)?,
            duration: args.get_str("duration")?,
            threshold: args.get_f64("threshold")?,
        };

        let client = connect(args, context).await?;
        let policies = client.list_alert_policies().await?;
        let existing = match (&id, &name) {
            (Some(id), _) => policies.iter().find(|p| &p.id == id),
            (None, Some(name)) => {
                let matches: Vec<&AlertPolicy> = policies.iter().filter(|p| &p.name == name).collect();
                if matches.len() > 1 {
                    return Err(ModuleExecutionError::failed(format!(
                        "multiple alert policies were found with policy name : {name}"
                    )));
                }
                matches.into_iter().next()
            }
            (None, None) => None,
        };

        let diff = |before: Option<&AlertPolicy>, after: Option<&serde_json::Value>| {
            context.diff_mode.then(|| {
                let before = before.and_then(|p| serde_json::to_value(p).ok());
                Diff::of_resource("alert policy", before.as_ref(), after)
            })
        };

        if state == "absent" {
            let Some(policy) = existing else {
                return Ok(ModuleResult::new(false).with_result("policy", serde_json::Value::Null));
            };
            if !check_mode {
                client.delete_alert_policy(&policy.id).await?;
            }
            return Ok(ModuleResult::new(true)
                .with_result("policy", serde_json::Value::Null)
                .with_diff(diff(Some(policy), None)));
        }

        let name = name.unwrap_or_default();
        match existing {
            None => {
                let request = requested.create(&name)?;
                if check_mode {
                    return Ok(ModuleResult::new(true).with_result("policy", &request));
                }
                let created = client.create_alert_policy(&request).await?;
                let after = serde_json::to_value(&created).ok();
                Ok(ModuleResult::new(true)
                    .with_result("policy", &created)
                    .with_diff(diff(None, after.as_ref())))
            }
            Some(policy) => {
                let Some(request) = requested.update_for(&name, policy) else {
                    return Ok(ModuleResult::new(false).with_result("policy", policy));
                };
                if check_mode {
                    return Ok(ModuleResult::new(true).with_result("policy", policy));
                }
                let updated = client.update_alert_policy(&policy.id, &request).await?;
                let after = serde_json::to_value(&updated).ok();
                Ok(ModuleResult::new(true)
                    .with_result("policy", &updated)
                    .with_diff(diff(Some(policy), after.as_ref())))
            }
        }
    }
}

impl Requested {
    fn create(&self, name: &str) -> Result<AlertPolicyRequest, ModuleExecutionError> {
        let missing = |field: &str| {
            ModuleExecutionError::invalid_args(format!(
                "{field} is required when creating an alert policy"
            ))
        };
        let recipients = self
            .recipients
            .clone()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| missing("alert_recipients"))?;
        Ok(AlertPolicyRequest {
            name: name.to_string(),
            actions: vec![email_action(recipients)],
            triggers: vec![AlertTrigger {
                metric: self.metric.clone().ok_or_else(|| missing("metric"))?,
                duration: self.duration.clone().ok_or_else(|| missing("duration"))?,
                threshold: self.threshold.ok_or_else(|| missing("threshold"))?,
            }],
        })
    }

    /// Replacement body when anything requested differs from `policy`
    fn update_for(&self, name: &str, policy: &AlertPolicy) -> Option<AlertPolicyRequest> {
        let current = policy.triggers.first();
        let trigger = AlertTrigger {
            metric: self
                .metric
                .clone()
                .or_else(|| current.map(|t| t.metric.clone()))
                .unwrap_or_default(),
            duration: self
                .duration
                .clone()
                .or_else(|| current.map(|t| t.duration.clone()))
                .unwrap_or_default(),
            threshold: self
                .threshold
                .or_else(|| current.map(|t| t.threshold))
                .unwrap_or_default(),
        };
        let recipients = self.recipients.clone().unwrap_or_else(|| policy.recipients());

        let mut sorted_current = policy.recipients();
        sorted_current.sort();
        let mut sorted_wanted = recipients.clone();
        sorted_wanted.sort();

        let unchanged = name == policy.name
            && sorted_wanted == sorted_current
            && current == Some(&trigger);
        if unchanged {
            return None;
        }
        Some(AlertPolicyRequest {
            name: name.to_string(),
            actions: vec![email_action(recipients)],
            triggers: vec![trigger],
        })
    }
}

fn email_action(recipients: Vec<String>) -> AlertAction {
    AlertAction {
        action: "email".to_string(),
        settings: AlertActionSettings { recipients },
    }
}
