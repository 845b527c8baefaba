//! Ansible-style modules for CenturyLink Cloud resources

pub mod args;
pub mod cloud;
pub mod error;
pub mod interface;
pub mod registry;

// Re-export commonly used types
pub use error::*;
pub use interface::*;
pub use registry::ModuleRegistry;
