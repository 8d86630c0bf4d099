//! Observed cluster state of a deployed application.
//!
//! Reads back the resources a deploy run would have applied and reduces each
//! one to a short readiness summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::CapabilityProbe;
use crate::cluster::{ClusterClient, ClusterError, ResourceKind, ResourceStatus};

// =============================================================================
// Data Structures
// =============================================================================

/// Options for the status command
#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub app_name: String,
    pub namespace: String,
    /// Force route lookup on or off; `None` asks the cluster
    pub routes: Option<bool>,
}

impl StatusOptions {
    pub fn new(app_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            namespace: namespace.into(),
            routes: None,
        }
    }

    pub fn with_routes(mut self, routes: bool) -> Self {
        self.routes = Some(routes);
        self
    }
}

/// Resources of one application, in apply order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub app_name: String,
    pub namespace: String,
    pub resources: Vec<ResourceStatus>,
}

impl StatusReport {
    /// Every resource exists and none reports not-ready
    pub fn is_healthy(&self) -> bool {
        self.resources
            .iter()
            .all(|r| r.exists && r.ready != Some(false))
    }

    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceStatus> {
        self.resources.iter().find(|r| r.kind == kind)
    }
}

// =============================================================================
// Command
// =============================================================================

#[derive(Debug, Default)]
pub struct StatusCommand {
    probe: CapabilityProbe,
}

impl StatusCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn execute(
        &self,
        options: &StatusOptions,
        client: &dyn ClusterClient,
    ) -> Result<StatusReport, ClusterError> {
        let routes = options
            .routes
            .unwrap_or_else(|| self.probe.probe(client).supports_routes());

        let mut kinds = vec![ResourceKind::Deployment, ResourceKind::Service];
        if routes {
            kinds.push(ResourceKind::Route);
        }

        let resources = kinds
            .into_iter()
            .map(|kind| client.get_resource_status(kind, &options.app_name, &options.namespace))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            app = %options.app_name,
            namespace = %options.namespace,
            resources = resources.len(),
            "collected status"
        );

        Ok(StatusReport {
            app_name: options.app_name.clone(),
            namespace: options.namespace.clone(),
            resources,
        })
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Reduce a fetched object (everything but `metadata`) to a [`ResourceStatus`].
pub fn summarize_resource(
    kind: ResourceKind,
    name: &str,
    namespace: &str,
    data: &Value,
) -> ResourceStatus {
    let (ready, summary, details) = match kind {
        ResourceKind::Deployment => summarize_deployment(data),
        ResourceKind::Service => summarize_service(data),
        ResourceKind::Route => summarize_route(data),
    };

    ResourceStatus {
        kind,
        name: name.to_string(),
        namespace: namespace.to_string(),
        exists: true,
        ready,
        summary: Some(summary),
        details,
    }
}

type Summary = (Option<bool>, String, BTreeMap<String, String>);

fn summarize_deployment(data: &Value) -> Summary {
    let desired = data
        .pointer("/spec/replicas")
        .and_then(Value::as_i64)
        .unwrap_or(1);
    let ready = data
        .pointer("/status/readyReplicas")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let updated = data
        .pointer("/status/updatedReplicas")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    let details = BTreeMap::from([
        ("desiredReplicas".to_string(), desired.to_string()),
        ("readyReplicas".to_string(), ready.to_string()),
        ("updatedReplicas".to_string(), updated.to_string()),
    ]);
    (
        Some(ready >= desired),
        format!("{ready}/{desired} replicas ready"),
        details,
    )
}

fn summarize_service(data: &Value) -> Summary {
    let service_type = data
        .pointer("/spec/type")
        .and_then(Value::as_str)
        .unwrap_or("ClusterIP");
    let cluster_ip = data.pointer("/spec/clusterIP").and_then(Value::as_str);

    let mut details = BTreeMap::from([("type".to_string(), service_type.to_string())]);
    let summary = match cluster_ip {
        Some(ip) => {
            details.insert("clusterIP".to_string(), ip.to_string());
            format!("{service_type} {ip}")
        }
        None => service_type.to_string(),
    };
    (None, summary, details)
}

fn summarize_route(data: &Value) -> Summary {
    let host = data
        .pointer("/spec/host")
        .and_then(Value::as_str)
        .or_else(|| {
            data.pointer("/status/ingress/0/host")
                .and_then(Value::as_str)
        });

    let admitted = data
        .pointer("/status/ingress")
        .and_then(Value::as_array)
        .map(|ingress| {
            ingress.iter().any(|entry| {
                entry
                    .get("conditions")
                    .and_then(Value::as_array)
                    .is_some_and(|conditions| {
                        conditions.iter().any(|c| {
                            c.get("type").and_then(Value::as_str) == Some("Admitted")
                                && c.get("status").and_then(Value::as_str) == Some("True")
                        })
                    })
            })
        })
        .unwrap_or(false);

    let mut details = BTreeMap::from([("admitted".to_string(), admitted.to_string())]);
    let summary = match host {
        Some(host) => {
            details.insert("host".to_string(), host.to_string());
            let scheme = if data.pointer("/spec/tls").is_some() {
                "https"
            } else {
                "http"
            };
            format!("{scheme}://{host}")
        }
        None => "no host assigned".to_string(),
    };
    (Some(admitted), summary, details)
}
