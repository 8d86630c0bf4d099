//! Manifest synthesis from a spec, its label set and platform capabilities.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec as WorkloadSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, ResourceRequirements, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::route::{
    InsecureEdgeTerminationPolicy, Route, RoutePort, RouteSpec, RouteTargetReference, TlsConfig,
    TlsTermination,
};
use super::{Manifest, ManifestDocument, ManifestSet};
use crate::capability::PlatformCapabilities;
use crate::cluster::ResourceKind;
use crate::config::DeploymentSpec;
use crate::labels::LabelSet;

pub const MAX_SURGE: &str = "25%";
pub const MAX_UNAVAILABLE: &str = "25%";
pub const REVISION_HISTORY_LIMIT: i32 = 10;

const RESTART_ALWAYS: &str = "Always";
const ROLLING_UPDATE: &str = "RollingUpdate";
const CLUSTER_IP: &str = "ClusterIP";
const TCP: &str = "TCP";
const ROUTE_WEIGHT: i32 = 100;

/// Renders the fixed deployment topology.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestSynthesizer;

impl ManifestSynthesizer {
    /// Deterministic: identical inputs produce identical documents.
    pub fn synthesize(
        spec: &DeploymentSpec,
        labels: &LabelSet,
        caps: PlatformCapabilities,
    ) -> ManifestSet {
        let workload = Manifest::new(
            ResourceKind::Deployment,
            spec.app_name(),
            spec.namespace(),
            ManifestDocument::Deployment(Box::new(build_workload(spec, labels))),
        );
        let internal_exposure = Manifest::new(
            ResourceKind::Service,
            spec.app_name(),
            spec.namespace(),
            ManifestDocument::Service(Box::new(build_service(spec, labels))),
        );
        // No route on platforms without one; ingress is left to the operator.
        let external_exposure = caps.supports_routes().then(|| {
            Manifest::new(
                ResourceKind::Route,
                spec.app_name(),
                spec.namespace(),
                ManifestDocument::Route(Box::new(build_route(
                    spec,
                    labels,
                    internal_exposure.name(),
                ))),
            )
        });

        ManifestSet {
            workload,
            internal_exposure,
            external_exposure,
        }
    }
}

fn object_meta(spec: &DeploymentSpec, labels: &LabelSet) -> ObjectMeta {
    ObjectMeta {
        name: Some(spec.app_name().to_string()),
        namespace: Some(spec.namespace().to_string()),
        labels: Some(labels.labels().clone()),
        ..Default::default()
    }
}

fn build_workload(spec: &DeploymentSpec, labels: &LabelSet) -> Deployment {
    let container = Container {
        name: spec.app_name().to_string(),
        image: Some(spec.image_reference().to_string()),
        ports: Some(vec![ContainerPort {
            name: Some(labels.port_name().to_string()),
            container_port: i32::from(spec.container_port()),
            protocol: Some(TCP.to_string()),
            ..Default::default()
        }]),
        resources: Some(ResourceRequirements {
            requests: Some(quantities(spec.cpu_request(), spec.memory_request())),
            limits: Some(quantities(spec.cpu_limit(), spec.memory_limit())),
            ..Default::default()
        }),
        ..Default::default()
    };

    Deployment {
        metadata: object_meta(spec, labels),
        spec: Some(WorkloadSpec {
            replicas: Some(spec.replica_count()),
            revision_history_limit: Some(REVISION_HISTORY_LIMIT),
            selector: LabelSelector {
                match_labels: Some(labels.selector()),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some(ROLLING_UPDATE.to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::String(MAX_SURGE.to_string())),
                    max_unavailable: Some(IntOrString::String(MAX_UNAVAILABLE.to_string())),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.labels().clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some(RESTART_ALWAYS.to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

fn build_service(spec: &DeploymentSpec, labels: &LabelSet) -> Service {
    Service {
        metadata: object_meta(spec, labels),
        spec: Some(ServiceSpec {
            type_: Some(CLUSTER_IP.to_string()),
            selector: Some(labels.selector()),
            ports: Some(vec![ServicePort {
                name: Some(labels.port_name().to_string()),
                port: i32::from(spec.container_port()),
                target_port: Some(IntOrString::String(labels.port_name().to_string())),
                protocol: Some(TCP.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn build_route(spec: &DeploymentSpec, labels: &LabelSet, service_name: &str) -> Route {
    let kind = ResourceKind::Route;
    Route {
        api_version: kind.api_version().to_string(),
        kind: kind.kind().to_string(),
        metadata: object_meta(spec, labels),
        spec: RouteSpec {
            host: None,
            to: RouteTargetReference {
                kind: ResourceKind::Service.kind().to_string(),
                name: service_name.to_string(),
                weight: ROUTE_WEIGHT,
            },
            port: RoutePort {
                target_port: IntOrString::String(labels.port_name().to_string()),
            },
            tls: TlsConfig {
                termination: TlsTermination::Edge,
                insecure_edge_termination_policy: InsecureEdgeTerminationPolicy::Redirect,
            },
        },
    }
}
