//! CenturyLink Cloud modules
//!
//! Every module follows the same shape: resolve credentials from the
//! environment, look the resource up, diff it against the requested state,
//! then create, update, or delete it, optionally waiting on the platform's
//! queued requests.

pub mod aa_policy;
pub mod alert_policy;
pub mod blueprint_package;
pub mod firewall_policy;
pub mod group;
pub mod loadbalancer;
pub mod modify_server;
pub mod network;
pub mod publicip;
pub mod server;
pub mod server_snapshot;

pub use aa_policy::AntiAffinityPolicyModule;
pub use alert_policy::AlertPolicyModule;
pub use blueprint_package::BlueprintPackageModule;
pub use firewall_policy::FirewallPolicyModule;
pub use group::GroupModule;
pub use loadbalancer::LoadBalancerModule;
pub use modify_server::ModifyServerModule;
pub use network::NetworkModule;
pub use publicip::PublicIpModule;
pub use server::ServerModule;
pub use server_snapshot::ServerSnapshotModule;

use crate::clc::{models::Link, ClcClient, ClcConfig, ClcError};
use crate::modules::{
    error::ModuleError,
    interface::{ArgumentSpec, ExecutionContext, ModuleArgs},
};

/// Open an API session from the context's environment, scoped to the
/// module's `alias` argument when one is given
pub(crate) async fn connect(
    args: &ModuleArgs,
    context: &ExecutionContext,
) -> Result<ClcClient, ModuleError> {
    let config = ClcConfig::from_env(&context.environment)?;
    let client = ClcClient::connect(config).await?;
    match args.get_str("alias")? {
        Some(alias) => Ok(client.for_account(&alias)),
        None => Ok(client),
    }
}

/// The `location` argument, or the account's default datacenter
pub(crate) fn resolve_location(
    client: &ClcClient,
    args: &ModuleArgs,
) -> Result<String, ModuleError> {
    match args.get_str("location")? {
        Some(location) => Ok(location),
        None => client.default_location().map(String::from).ok_or_else(|| {
            ModuleError::invalid_args(
                "location is required: pass location or set the CLC_LOCATION environment variable",
            )
        }),
    }
}

/// Wait on queued requests, failing the module if any of them failed
pub(crate) async fn await_requests(
    client: &ClcClient,
    links: &[Link],
    what: &str,
) -> Result<(), ModuleError> {
    if links.is_empty() {
        return Ok(());
    }
    match client.complete_requests(links).await {
        Ok(()) => Ok(()),
        Err(ClcError::RequestFailed { id }) => Err(ModuleError::failed(format!(
            "Unable to process {what} request (request {id} failed)"
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Arguments accepted by every module
pub(crate) fn common_arguments() -> Vec<ArgumentSpec> {
    vec![
        ArgumentSpec::new(
            "location",
            "str",
            "Datacenter to operate in. Defaults to the account's primary datacenter.",
        ),
        ArgumentSpec::new(
            "wait",
            "bool",
            "Whether to wait for the provisioning tasks to finish before returning.",
        )
        .default_value("true"),
    ]
}
