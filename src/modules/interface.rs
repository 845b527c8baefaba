//! Module interface traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::modules::error::{ModuleExecutionError, ValidationError};

/// Unified interface for all CLC modules
#[async_trait]
pub trait ExecutionModule: Send + Sync {
    /// Module name (e.g., "clc_server", "clc_group")
    fn name(&self) -> &'static str;

    /// Module version
    fn version(&self) -> &'static str;

    /// Execute the module with given arguments
    async fn execute(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError>;

    /// Validate module arguments before execution
    fn validate_args(&self, args: &ModuleArgs) -> Result<(), ValidationError>;

    /// Report whether the module would make changes without making them
    async fn check_mode(
        &self,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError>;

    /// Get module documentation
    fn documentation(&self) -> ModuleDocumentation;
}

/// Module execution arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleArgs {
    /// Direct module arguments
    pub args: HashMap<String, serde_json::Value>,
}

impl ModuleArgs {
    pub fn new(args: HashMap<String, serde_json::Value>) -> Self {
        Self { args }
    }

    /// Build arguments from a JSON object, ignoring nulls
    pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                args: map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            }),
            serde_json::Value::Null => Ok(Self::default()),
            other => Err(ValidationError::InvalidArgValue {
                arg: "<root>".to_string(),
                value: other.to_string(),
                reason: "module arguments must be a mapping".to_string(),
            }),
        }
    }
}

/// Module execution context
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Environment used to resolve credentials and endpoints
    pub environment: HashMap<String, String>,
    pub check_mode: bool,
    pub diff_mode: bool,
    pub verbosity: u8,
}

impl ExecutionContext {
    /// Context backed by the current process environment
    pub fn from_process_env() -> Self {
        Self {
            environment: std::env::vars().collect(),
            ..Self::default()
        }
    }
}

/// Module execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(flatten)]
    pub results: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

impl ModuleResult {
    pub fn new(changed: bool) -> Self {
        Self {
            changed,
            ..Self::default()
        }
    }

    /// Result for a module that aborted with an error
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    pub fn with_result(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.results.insert(key.to_string(), value);
        self
    }

    pub fn with_diff(mut self, diff: Option<Diff>) -> Self {
        self.diff = diff;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
    pub before: Option<String>,
    pub after: Option<String>,
    pub before_header: Option<String>,
    pub after_header: Option<String>,
}

impl Diff {
    /// Pretty-printed JSON diff of a resource before and after reconciliation
    pub fn of_resource(
        header: &str,
        before: Option<&serde_json::Value>,
        after: Option<&serde_json::Value>,
    ) -> Self {
        let render = |value: Option<&serde_json::Value>| {
            value.map(|v| serde_json::to_string_pretty(v).unwrap_or_default())
        };
        Self {
            before: render(before),
            after: render(after),
            before_header: Some(header.to_string()),
            after_header: Some(header.to_string()),
        }
    }
}

/// Module documentation
#[derive(Debug, Clone)]
pub struct ModuleDocumentation {
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub examples: Vec<String>,
    pub return_values: Vec<ReturnValueSpec>,
}

#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub argument_type: String,
    pub default: Option<String>,
}

impl ArgumentSpec {
    pub fn new(name: &str, argument_type: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
            argument_type: argument_type.to_string(),
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReturnValueSpec {
    pub name: String,
    pub description: String,
    pub returned: String,
    pub value_type: String,
}

impl ReturnValueSpec {
    pub fn new(name: &str, value_type: &str, returned: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            returned: returned.to_string(),
            value_type: value_type.to_string(),
        }
    }
}
