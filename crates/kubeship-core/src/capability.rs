//! Detection of optional platform features on the target cluster.

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterClient, ROUTE_API_VERSION};

/// Kind name of the platform's external exposure resource
pub const ROUTE_KIND: &str = "Route";

/// What the target cluster supports beyond core workload kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    routes: bool,
}

impl PlatformCapabilities {
    pub fn new(routes: bool) -> Self {
        Self { routes }
    }

    /// No optional capabilities
    pub fn none() -> Self {
        Self::new(false)
    }

    pub fn with_routes() -> Self {
        Self::new(true)
    }

    /// Whether the external exposure (route) kind is served
    pub fn supports_routes(&self) -> bool {
        self.routes
    }
}

/// Queries the cluster once per run and caches the answer.
///
/// A failed query is indistinguishable from "not supported": the probe never
/// fails a run.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    cached: OnceCell<PlatformCapabilities>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, client: &dyn ClusterClient) -> PlatformCapabilities {
        *self.cached.get_or_init(|| detect(client))
    }

    /// The cached answer, if the cluster has already been asked
    pub fn cached(&self) -> Option<PlatformCapabilities> {
        self.cached.get().copied()
    }
}

fn detect(client: &dyn ClusterClient) -> PlatformCapabilities {
    match client.query_capability(ROUTE_API_VERSION, ROUTE_KIND) {
        Ok(routes) => {
            tracing::debug!(routes, "route capability probed");
            PlatformCapabilities::new(routes)
        }
        Err(err) => {
            tracing::debug!(error = %err, "route capability query failed, treating as absent");
            PlatformCapabilities::none()
        }
    }
}
