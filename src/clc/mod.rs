//! CenturyLink Cloud v2 API layer shared by every module

pub mod client;
pub mod config;
pub mod error;
pub mod firewall;
pub mod groups;
pub mod loadbalancers;
pub mod models;
pub mod networks;
pub mod policies;
pub mod requests;
pub mod servers;

pub use client::ClcClient;
pub use config::{ClcConfig, Credentials};
pub use error::ClcError;
pub use requests::RequestSummary;
