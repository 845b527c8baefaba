use thiserror::Error;

use crate::clc::ClcError;

/// Errors that can occur while running a module
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid arguments: {message}")]
    InvalidArgs { message: String },

    #[error("{message}")]
    ExecutionFailed { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Api(#[from] ClcError),
}

impl ModuleError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ModuleError::InvalidArgs {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ModuleError::ExecutionFailed {
            message: message.into(),
        }
    }
}

/// Errors that can occur during argument validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required argument: {arg}")]
    MissingRequiredArg { arg: String },

    #[error("Invalid argument value: {arg} = {value} - {reason}")]
    InvalidArgValue {
        arg: String,
        value: String,
        reason: String,
    },

    #[error("value of {arg} must be one of: {choices:?}, got: {value}")]
    InvalidChoice {
        arg: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("parameters are mutually exclusive: {args:?}")]
    MutuallyExclusive { args: Vec<String> },
}

/// Module execution error
pub type ModuleExecutionError = ModuleError;

impl From<serde_json::Error> for ModuleError {
    fn from(err: serde_json::Error) -> Self {
        ModuleError::ExecutionFailed {
            message: format!("JSON serialization error: {err}"),
        }
    }
}
