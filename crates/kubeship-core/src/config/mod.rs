//! Configuration management and deployment input collection
//!
//! Supports two configuration scopes:
//! - Global: User-wide defaults
//! - Project: Defaults for the current project, checked in next to the app

pub mod collector;
pub mod context;
pub mod merge;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

use serde::{Deserialize, Serialize};

pub use collector::{
    ConfigCollector, DeployDefaults, DeploymentSpec, RawInputs, ValidationError, validate_app_name,
    validate_namespace,
};
pub use context::{FixedNamespace, KubeconfigContext, NamespaceContext};
pub use merge::merge_configs;
pub use parser::{parse_kubeship_toml, parse_kubeship_toml_str, to_toml};
pub use paths::config_path_for_scope;
pub use schema::{ClusterConfig, DefaultsConfig, KubeshipConfig};
pub use store::ConfigStore;

/// Configuration scope levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigScope {
    /// User-wide configuration
    Global,
    /// Project configuration (e.g., checked into version control)
    Project,
}
