//! In-memory cluster and scripted gates shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use kubeship_core::apply::{ApplyGate, Checkpoint};
use kubeship_core::cluster::{ClusterClient, ClusterError, ResourceKind, ResourceStatus};
use kubeship_core::config::{
    ConfigCollector, DeploymentSpec, FixedNamespace, RawInputs,
};
use kubeship_core::manifest::Manifest;
use kubeship_core::status::summarize_resource;

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    QueryCapability(String, String),
    NamespaceExists(String),
    CreateNamespace(String),
    Apply(ResourceKind, String),
    GetStatus(ResourceKind, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapabilityAnswer {
    Supported(bool),
    Error,
}

#[derive(Debug)]
struct State {
    capability: CapabilityAnswer,
    namespaces: BTreeSet<String>,
    objects: BTreeMap<(ResourceKind, String, String), serde_json::Value>,
    apply_failures: BTreeMap<ResourceKind, String>,
    namespace_query_failure: Option<String>,
    namespace_create_failure: Option<String>,
    calls: Vec<Call>,
}

/// [`ClusterClient`] keeping objects in memory, counting calls and injecting failures.
#[derive(Debug)]
pub struct FakeCluster {
    state: RefCell<State>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCluster {
    /// A vanilla cluster: no routes, only the `default` namespace.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                capability: CapabilityAnswer::Supported(false),
                namespaces: BTreeSet::from(["default".to_string()]),
                objects: BTreeMap::new(),
                apply_failures: BTreeMap::new(),
                namespace_query_failure: None,
                namespace_create_failure: None,
                calls: Vec::new(),
            }),
        }
    }

    /// A cluster serving the route kind
    pub fn openshift() -> Self {
        Self::new().with_routes(true)
    }

    pub fn with_routes(self, routes: bool) -> Self {
        self.state.borrow_mut().capability = CapabilityAnswer::Supported(routes);
        self
    }

    /// Capability queries fail instead of answering
    pub fn with_capability_error(self) -> Self {
        self.state.borrow_mut().capability = CapabilityAnswer::Error;
        self
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state
            .borrow_mut()
            .namespaces
            .insert(namespace.to_string());
        self
    }

    pub fn fail_apply(&self, kind: ResourceKind, message: &str) {
        self.state
            .borrow_mut()
            .apply_failures
            .insert(kind, message.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.apply_failures.clear();
        state.namespace_query_failure = None;
        state.namespace_create_failure = None;
    }

    pub fn fail_namespace_query(&self, message: &str) {
        self.state.borrow_mut().namespace_query_failure = Some(message.to_string());
    }

    pub fn fail_namespace_create(&self, message: &str) {
        self.state.borrow_mut().namespace_create_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn reset_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn capability_queries(&self) -> usize {
        self.count(|c| matches!(c, Call::QueryCapability(..)))
    }

    /// Kinds passed to `apply_resource`, in call order (failed calls included)
    pub fn apply_calls(&self) -> Vec<ResourceKind> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Apply(kind, _) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    /// Namespace creations plus apply calls
    pub fn mutating_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateNamespace(_) | Call::Apply(..)))
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.state.borrow().namespaces.contains(namespace)
    }

    pub fn object(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Option<serde_json::Value> {
        self.state
            .borrow()
            .objects
            .get(&(kind, name.to_string(), namespace.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// Pretend the platform reconciled the object: merge `status` into it.
    pub fn set_status(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
        status: serde_json::Value,
    ) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state
            .objects
            .get_mut(&(kind, name.to_string(), namespace.to_string()))
            && let Some(map) = object.as_object_mut()
        {
            map.insert("status".to_string(), status);
        }
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl ClusterClient for FakeCluster {
    fn query_capability(&self, api_version: &str, kind: &str) -> Result<bool, ClusterError> {
        self.record(Call::QueryCapability(
            api_version.to_string(),
            kind.to_string(),
        ));
        match self.state.borrow().capability {
            CapabilityAnswer::Supported(routes) => Ok(routes),
            CapabilityAnswer::Error => Err(ClusterError::Unavailable(
                "discovery endpoint unreachable".to_string(),
            )),
        }
    }

    fn namespace_exists(&self, name: &str) -> Result<bool, ClusterError> {
        self.record(Call::NamespaceExists(name.to_string()));
        let state = self.state.borrow();
        if let Some(message) = &state.namespace_query_failure {
            return Err(ClusterError::Forbidden(message.clone()));
        }
        Ok(state.namespaces.contains(name))
    }

    fn create_namespace(&self, name: &str) -> Result<(), ClusterError> {
        self.record(Call::CreateNamespace(name.to_string()));
        let mut state = self.state.borrow_mut();
        if let Some(message) = &state.namespace_create_failure {
            return Err(ClusterError::Forbidden(message.clone()));
        }
        state.namespaces.insert(name.to_string());
        Ok(())
    }

    fn apply_resource(&self, manifest: &Manifest) -> Result<(), ClusterError> {
        self.record(Call::Apply(manifest.kind(), manifest.name().to_string()));
        let body = manifest.to_json()?;
        let mut state = self.state.borrow_mut();
        if let Some(message) = state.apply_failures.get(&manifest.kind()) {
            return Err(ClusterError::Rejected(message.clone()));
        }
        if !state.namespaces.contains(manifest.namespace()) {
            return Err(ClusterError::NotFound(format!(
                "namespaces \"{}\" not found",
                manifest.namespace()
            )));
        }
        state.objects.insert(
            (
                manifest.kind(),
                manifest.name().to_string(),
                manifest.namespace().to_string(),
            ),
            body,
        );
        Ok(())
    }

    fn get_resource_status(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: &str,
    ) -> Result<ResourceStatus, ClusterError> {
        self.record(Call::GetStatus(kind, name.to_string()));
        Ok(match self.object(kind, name, namespace) {
            Some(object) => summarize_resource(kind, name, namespace, &object),
            None => ResourceStatus::missing(kind, name, namespace),
        })
    }
}

/// Where a [`ScriptedGate`] says no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineAt {
    Nothing,
    BeginApply,
    CreateNamespace,
    Apply(ResourceKind),
}

/// Gate that declines one checkpoint and records every checkpoint it saw.
#[derive(Debug)]
pub struct ScriptedGate {
    decline: DeclineAt,
    pub seen: Vec<String>,
}

impl ScriptedGate {
    pub fn declining(decline: DeclineAt) -> Self {
        Self {
            decline,
            seen: Vec::new(),
        }
    }

    pub fn approving() -> Self {
        Self::declining(DeclineAt::Nothing)
    }
}

impl ApplyGate for ScriptedGate {
    fn confirm(&mut self, checkpoint: &Checkpoint<'_>) -> bool {
        let (label, declined) = match checkpoint {
            Checkpoint::BeginApply(_) => (
                "begin".to_string(),
                self.decline == DeclineAt::BeginApply,
            ),
            Checkpoint::CreateNamespace(ns) => (
                format!("create-namespace:{ns}"),
                self.decline == DeclineAt::CreateNamespace,
            ),
            Checkpoint::Apply(manifest) => (
                format!("apply:{}", manifest.kind()),
                self.decline == DeclineAt::Apply(manifest.kind()),
            ),
        };
        self.seen.push(label);
        !declined
    }
}

/// Inputs for the `demo` app with everything but the output target filled in.
pub fn demo_inputs() -> RawInputs {
    RawInputs {
        app_name: Some("demo".to_string()),
        image: Some("quay.io/acme/demo:1.4.2".to_string()),
        namespace: Some("apps".to_string()),
        port: Some("8080".to_string()),
        replicas: Some("2".to_string()),
        skip_output: true,
        ..Default::default()
    }
}

pub fn demo_spec() -> DeploymentSpec {
    ConfigCollector::default()
        .collect(&demo_inputs(), &FixedNamespace::none())
        .expect("demo inputs are valid")
}
