//! Configuration schema for kubeship.toml
//!
//! The same structure is used for both layers:
//! - Global: ~/.config/kubeship/kubeship.toml
//! - Project: ./kubeship.toml

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::collector::{
    DEFAULT_CPU_LIMIT, DEFAULT_CPU_REQUEST, DEFAULT_MEMORY_LIMIT, DEFAULT_MEMORY_REQUEST,
    DEFAULT_NAMESPACE, DEFAULT_OUTPUT_DIR, DEFAULT_PORT, DEFAULT_REPLICAS,
};
use crate::cluster::DEFAULT_FIELD_MANAGER;

/// Root configuration structure for kubeship.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubeshipConfig {
    /// Defaults substituted for deployment inputs left empty
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Cluster interaction settings
    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// Per-field deployment defaults. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Used when neither the caller nor the kubeconfig names a namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,

    /// Directory the rendered manifests are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Field manager name used for server-side apply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,
}

impl KubeshipConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration populated with every built-in default, used by `config init`.
    pub fn builtin() -> Self {
        Self {
            defaults: DefaultsConfig {
                app_name: None,
                image: None,
                namespace: Some(DEFAULT_NAMESPACE.to_string()),
                port: Some(DEFAULT_PORT),
                replicas: Some(DEFAULT_REPLICAS),
                cpu_request: Some(DEFAULT_CPU_REQUEST.to_string()),
                cpu_limit: Some(DEFAULT_CPU_LIMIT.to_string()),
                memory_request: Some(DEFAULT_MEMORY_REQUEST.to_string()),
                memory_limit: Some(DEFAULT_MEMORY_LIMIT.to_string()),
                output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
            },
            cluster: ClusterConfig {
                field_manager: Some(DEFAULT_FIELD_MANAGER.to_string()),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.defaults.port == Some(0) {
            anyhow::bail!("defaults.port must be between 1 and 65535");
        }
        if self.defaults.replicas == Some(0) {
            anyhow::bail!("defaults.replicas must be at least 1");
        }
        if let Some(ns) = &self.defaults.namespace
            && ns.trim().is_empty()
        {
            anyhow::bail!("defaults.namespace must not be empty");
        }
        if let Some(manager) = &self.cluster.field_manager
            && manager.trim().is_empty()
        {
            anyhow::bail!("cluster.field_manager must not be empty");
        }
        Ok(())
    }

    pub fn field_manager(&self) -> &str {
        self.cluster
            .field_manager
            .as_deref()
            .unwrap_or(DEFAULT_FIELD_MANAGER)
    }
}
