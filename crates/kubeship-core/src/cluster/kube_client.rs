//! [`ClusterClient`] backed by the Kubernetes API.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use kube::api::{
    Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams, PostParams,
};
use tokio::runtime::Runtime;

use super::{ClusterClient, ClusterError, ResourceKind, ResourceStatus};
use crate::manifest::Manifest;
use crate::status::summarize_resource;

const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Blocking client over `kube`, driving the async API from an owned runtime.
pub struct KubeClusterClient {
    runtime: Runtime,
    client: Client,
    field_manager: String,
}

impl fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterClient")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Connect using the inferred configuration (kubeconfig or in-cluster).
    pub fn connect(field_manager: impl Into<String>) -> anyhow::Result<Self> {
        let runtime = Runtime::new().context("Failed to create tokio runtime")?;
        let client = runtime
            .block_on(Client::try_default())
            .context("Failed to create cluster client; check your kubeconfig")?;

        Ok(Self {
            runtime,
            client,
            field_manager: field_manager.into(),
        })
    }

    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }

    fn dynamic_api(&self, kind: ResourceKind, namespace: &str) -> Api<DynamicObject> {
        let (group, version) = kind.group_version();
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, kind.kind()));
        Api::namespaced_with(self.client.clone(), namespace, &resource)
    }
}

impl ClusterClient for KubeClusterClient {
    fn query_capability(&self, api_version: &str, kind: &str) -> Result<bool, ClusterError> {
        let resources = self
            .runtime
            .block_on(self.client.list_api_group_resources(api_version))
            .map_err(map_kube_error)?;
        Ok(resources.resources.iter().any(|r| r.kind == kind))
    }

    fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let found = self
            .runtime
            .block_on(api.get_opt(name))
            .map_err(map_kube_error)?;
        Ok(found.is_some())
    }

    fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(BTreeMap::from([(
                    MANAGED_BY_LABEL.to_string(),
                    self.field_manager.clone(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };

        match self
            .runtime
            .block_on(api.create(&PostParams::default(), &namespace))
            .map_err(map_kube_error)
        {
            Ok(_) => Ok(()),
            // Created concurrently by someone else; the namespace exists either way.
            Err(ClusterError::Conflict(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn apply_resource(&self, manifest: &Manifest) -> Result<(), ClusterError> {
        let api = self.dynamic_api(manifest.kind(), manifest.namespace());
        let body = manifest.to_json()?;
        let params = PatchParams::apply(&self.field_manager).force();

        self.runtime
            .block_on(api.patch(manifest.name(), &params, &Patch::Apply(&body)))
            .map_err(map_kube_error)?;
        Ok(())
    }

    fn get_resource_status(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<ResourceStatus, ClusterError> {
        let api = self.dynamic_api(kind, namespace);
        let object = self
            .runtime
            .block_on(api.get_opt(name))
            .map_err(map_kube_error)?;

        Ok(match object {
            Some(object) => summarize_resource(kind, name, namespace, &object.data),
            None => ResourceStatus::missing(kind, name, namespace),
        })
    }
}

fn map_kube_error(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) => {
            let message = response.message.clone();
            match response.code {
                401 | 403 => ClusterError::Forbidden(message),
                404 => ClusterError::NotFound(message),
                409 => ClusterError::Conflict(message),
                code => ClusterError::Rejected(format!("{message} (HTTP {code})")),
            }
        }
        other => ClusterError::Unavailable(other.to_string()),
    }
}
