//! Central registry for all CLC modules

use crate::clc::config;
use crate::modules::{
    cloud,
    error::ModuleExecutionError,
    interface::{ExecutionContext, ExecutionModule, ModuleArgs, ModuleResult},
};
use std::collections::HashMap;

/// Central registry for all CLC modules
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn ExecutionModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Create a registry with every CLC module pre-registered
    pub fn with_clc_modules() -> Self {
        let mut registry = Self::new();

        registry.register(Box::new(cloud::ServerModule));
        registry.register(Box::new(cloud::GroupModule));
        registry.register(Box::new(cloud::NetworkModule));
        registry.register(Box::new(cloud::LoadBalancerModule));
        registry.register(Box::new(cloud::FirewallPolicyModule));
        registry.register(Box::new(cloud::AntiAffinityPolicyModule));
        registry.register(Box::new(cloud::AlertPolicyModule));
        registry.register(Box::new(cloud::PublicIpModule));
        registry.register(Box::new(cloud::BlueprintPackageModule));
        registry.register(Box::new(cloud::ServerSnapshotModule));
        registry.register(Box::new(cloud::ModifyServerModule));

        registry
    }

    pub fn register(&mut self, module: Box<dyn ExecutionModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get_module(&self, name: &str) -> Option<&dyn ExecutionModule> {
        self.modules.get(name).map(|m| m.as_ref())
    }

    pub fn list_modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute_module(
        &self,
        module_name: &str,
        args: &ModuleArgs,
        context: &ExecutionContext,
    ) -> Result<ModuleResult, ModuleExecutionError> {
        let module = self
            .get_module(module_name)
            .ok_or_else(|| ModuleExecutionError::ModuleNotFound(module_name.to_string()))?;

        module.validate_args(args)?;

        let mut result = if context.check_mode {
            module.check_mode(args, context).await?
        } else {
            module.execute(args, context).await?
        };
        result
            .warnings
            .extend(config::ignored_settings(&context.environment));
        Ok(result)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
