//! Cluster client abstraction.
//!
//! The engine only ever talks to the cluster through [`ClusterClient`], so the
//! pipeline can run against a live API server or an in-memory fake.

pub mod kube_client;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::Manifest;

pub use kube_client::KubeClusterClient;

/// Field manager used for server-side apply unless configured otherwise
pub const DEFAULT_FIELD_MANAGER: &str = "kubeship";

/// API group/version that carries the platform route kind
pub const ROUTE_API_VERSION: &str = "route.openshift.io/v1";

/// Resource kinds the engine renders and applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Deployment,
    Service,
    Route,
}

impl ResourceKind {
    pub fn kind(self) -> &'static str {
        match self {
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Route => "Route",
        }
    }

    pub fn api_version(self) -> &'static str {
        match self {
            ResourceKind::Deployment => "apps/v1",
            ResourceKind::Service => "v1",
            ResourceKind::Route => ROUTE_API_VERSION,
        }
    }

    /// `(group, version)`; the core group is the empty string.
    pub fn group_version(self) -> (&'static str, &'static str) {
        match self.api_version().split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version()),
        }
    }

    /// Suffix used in output file names (`<app>-<suffix>.yaml`)
    pub fn file_suffix(self) -> &'static str {
        match self {
            ResourceKind::Deployment => "deployment",
            ResourceKind::Service => "service",
            ResourceKind::Route => "route",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Observed state of a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub exists: bool,
    /// `None` when readiness does not apply or cannot be determined
    pub ready: Option<bool>,
    pub summary: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl ResourceStatus {
    pub fn missing(kind: ResourceKind, name: &str, namespace: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            exists: false,
            ready: None,
            summary: None,
            details: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("failed to encode manifest: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Operations the engine needs from a cluster.
///
/// Calls are blocking; the engine issues them strictly one at a time.
pub trait ClusterClient {
    /// Whether `kind` is served under `api_version` (e.g. `route.openshift.io/v1`).
    fn query_capability(&self, api_version: &str, kind: &str) -> Result<bool, ClusterError>;

    fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError>;

    fn create_namespace(&self, name: &str) -> Result<(), ClusterError>;

    /// Create-or-update keyed by kind + name + namespace.
    fn apply_resource(&self, manifest: &Manifest) -> Result<(), ClusterError>;

    fn get_resource_status(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<ResourceStatus, ClusterError>;
}
