//! CLC Modules - declarative management of CenturyLink Cloud resources
//!
//! Each module reconciles one kind of resource (servers, groups, networks,
//! load balancers, policies) to a requested state through the CLC v2 API.
//! Modules are looked up by name in a [`ModuleRegistry`] and driven by the
//! `clc-module` binary.

pub mod clc;
pub mod cli;
pub mod modules;

pub use clc::{ClcClient, ClcConfig, ClcError};
pub use modules::{ModuleRegistry, ModuleResult};
