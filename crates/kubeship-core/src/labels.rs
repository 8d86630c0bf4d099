//! Label, selector and port-name vocabulary shared by all manifests.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::capability::PlatformCapabilities;
use crate::config::DeploymentSpec;

pub const APP_LABEL: &str = "app";
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const PART_OF_LABEL: &str = "app.kubernetes.io/part-of";
pub const RUNTIME_VERSION_LABEL: &str = "app.openshift.io/runtime-version";

pub const PORT_NAME_PREFIX: &str = "http-";

const FALLBACK_RUNTIME_VERSION: &str = "latest";

/// Labels plus the selector and port name every manifest must agree on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
    selector_key: String,
    selector_value: String,
    port_name: String,
}

impl LabelSet {
    /// Full label map for object and pod-template metadata
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn selector_key(&self) -> &str {
        &self.selector_key
    }

    pub fn selector_value(&self) -> &str {
        &self.selector_value
    }

    /// The pod selector as a map (`{app: <appName>}`)
    pub fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.selector_key.clone(), self.selector_value.clone())])
    }

    /// Named port shared by the container, the service and the route
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Derives a [`LabelSet`] from a validated spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelPlanner;

impl LabelPlanner {
    pub fn plan(spec: &DeploymentSpec, caps: PlatformCapabilities) -> LabelSet {
        let app = spec.app_name();

        let mut labels: BTreeMap<String, String> = [
            APP_LABEL,
            COMPONENT_LABEL,
            INSTANCE_LABEL,
            NAME_LABEL,
            PART_OF_LABEL,
        ]
        .into_iter()
        .map(|key| (key.to_string(), app.to_string()))
        .collect();

        if caps.supports_routes() {
            labels.insert(
                RUNTIME_VERSION_LABEL.to_string(),
                runtime_version(spec.image_reference()),
            );
        }

        LabelSet {
            labels,
            selector_key: APP_LABEL.to_string(),
            selector_value: app.to_string(),
            port_name: port_name(spec.container_port()),
        }
    }
}

pub fn port_name(port: u16) -> String {
    format!("{PORT_NAME_PREFIX}{port}")
}

/// Image tag if it is usable as a label value, `latest` otherwise.
fn runtime_version(image: &str) -> String {
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    let without_digest = last_segment.split('@').next().unwrap_or(last_segment);
    match without_digest.split_once(':') {
        Some((_, tag)) if is_label_value(tag) => tag.to_string(),
        _ => FALLBACK_RUNTIME_VERSION.to_string(),
    }
}

fn is_label_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
