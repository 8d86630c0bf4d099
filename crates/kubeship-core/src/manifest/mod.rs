//! Rendered manifests.
//!
//! Documents are assembled as typed structures and serialized once, at the
//! boundary, so the same inputs always produce the same bytes.

pub mod output;
pub mod route;
pub mod synth;

use anyhow::Context;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use serde::Serialize;

use crate::cluster::ResourceKind;

pub use output::{manifest_path, write_manifest_set};
pub use route::Route;
pub use synth::ManifestSynthesizer;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ManifestDocument {
    Deployment(Box<Deployment>),
    Service(Box<Service>),
    Route(Box<Route>),
}

/// One rendered resource plus the identity it is applied under.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    kind: ResourceKind,
    name: String,
    namespace: String,
    document: ManifestDocument,
}

impl Manifest {
    pub(crate) fn new(
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        document: ManifestDocument,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            namespace: namespace.to_string(),
            document,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn as_deployment(&self) -> Option<&Deployment> {
        match &self.document {
            ManifestDocument::Deployment(d) => Some(&**d),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match &self.document {
            ManifestDocument::Service(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&Route> {
        match &self.document {
            ManifestDocument::Route(r) => Some(&**r),
            _ => None,
        }
    }

    /// `<name>-<kind suffix>.yaml`
    pub fn file_name(&self) -> String {
        format!("{}-{}.yaml", self.name, self.kind.file_suffix())
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.document)
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(&self.document)
            .with_context(|| format!("Failed to render {} '{}' as YAML", self.kind, self.name))
    }
}

/// The manifests for one run, in apply order.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    workload: Manifest,
    internal_exposure: Manifest,
    external_exposure: Option<Manifest>,
}

impl ManifestSet {
    pub fn workload(&self) -> &Manifest {
        &self.workload
    }

    pub fn internal_exposure(&self) -> &Manifest {
        &self.internal_exposure
    }

    /// Present only when the platform supports routes
    pub fn external_exposure(&self) -> Option<&Manifest> {
        self.external_exposure.as_ref()
    }

    pub fn app_name(&self) -> &str {
        self.workload.name()
    }

    pub fn namespace(&self) -> &str {
        self.workload.namespace()
    }

    /// Workload, internal exposure, then external exposure if present.
    pub fn iter(&self) -> impl Iterator<Item = &Manifest> {
        std::iter::once(&self.workload)
            .chain(std::iter::once(&self.internal_exposure))
            .chain(self.external_exposure.iter())
    }

    pub fn len(&self) -> usize {
        2 + usize::from(self.external_exposure.is_some())
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Multi-document YAML stream of every manifest
    pub fn render(&self) -> anyhow::Result<String> {
        let documents = self
            .iter()
            .map(Manifest::to_yaml)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(documents.join("---\n"))
    }

    /// BLAKE3 digest of [`ManifestSet::render`]
    pub fn fingerprint(&self) -> anyhow::Result<String> {
        let rendered = self.render()?;
        Ok(blake3::hash(rendered.as_bytes()).to_hex().to_string())
    }
}
