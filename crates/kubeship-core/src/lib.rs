//! Kubeship Core Library
//!
//! Turns a handful of deployment parameters into a consistent set of
//! workload manifests and applies them to a cluster in dependency order.

pub mod apply;
pub mod capability;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod context;
pub mod labels;
pub mod manifest;
pub mod status;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        ConfigCollector, ConfigScope, ConfigStore, DeploymentSpec, KubeshipConfig,
        NamespaceContext, RawInputs, ValidationError,
    };

    // Cluster
    pub use crate::cluster::{ClusterClient, ClusterError, ResourceKind, ResourceStatus};

    // Pipeline
    pub use crate::apply::{
        ApplyGate, ApplyOrchestrator, ApplyResult, ApplyStatus, AutoApprove, RunError, RunResult,
        RunStep,
    };
    pub use crate::capability::{CapabilityProbe, PlatformCapabilities};
    pub use crate::labels::{LabelPlanner, LabelSet};
    pub use crate::manifest::{Manifest, ManifestSet, ManifestSynthesizer};

    // Commands
    pub use crate::commands::{DeployCommand, DeployOptions, DeployReport};
    pub use crate::context::AppContext;
}
