//! High-level commands.
//!
//! Each command ties the pipeline stages together behind one call so the CLI
//! (or any other frontend) only gathers inputs and renders reports.

pub mod deploy;

pub use deploy::{DeployCommand, DeployOptions, DeployReport};

// Re-export status command types from the status module
pub use crate::status::{StatusCommand, StatusOptions, StatusReport};
