use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::modules::ExecutionContext;

/// Run a single CenturyLink Cloud module
#[derive(Parser, Debug)]
#[command(name = "clc-module")]
#[command(about = "Reconcile CenturyLink Cloud resources with Ansible-style modules")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ClcModuleCli {
    /// Module to run (e.g. clc_server, clc_group)
    #[arg(required_unless_present = "list")]
    pub module: Option<String>,

    /// JSON or YAML argument file (or stdin if -)
    pub args: Option<PathBuf>,

    /// Report what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Include before/after documents in the result
    #[arg(long)]
    pub diff: bool,

    /// Enable verbose logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// List available modules
    #[arg(long)]
    pub list: bool,

    /// Show the module's documentation instead of running it
    #[arg(long)]
    pub doc: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub check_mode: bool,
    pub diff_mode: bool,
    pub verbosity: u8,
}

impl From<&ClcModuleCli> for RunOptions {
    fn from(cli: &ClcModuleCli) -> Self {
        Self {
            check_mode: cli.check,
            diff_mode: cli.diff,
            verbosity: cli.verbosity,
        }
    }
}

impl RunOptions {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Execution context for a module run against `environment`
    pub fn context(&self, environment: HashMap<String, String>) -> ExecutionContext {
        ExecutionContext {
            environment,
            check_mode: self.check_mode,
            diff_mode: self.diff_mode,
            verbosity: self.verbosity,
        }
    }
}
