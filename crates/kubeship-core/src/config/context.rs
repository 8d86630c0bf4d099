//! Lookup of the caller's active namespace.

use kube::config::Kubeconfig;

/// Source of the namespace the caller is currently working in.
pub trait NamespaceContext {
    /// `None` when no active namespace can be determined.
    fn active_namespace(&self) -> Option<String>;
}

/// Reads the current context's namespace from the kubeconfig
/// (`$KUBECONFIG` or `~/.kube/config`).
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeconfigContext;

impl NamespaceContext for KubeconfigContext {
    fn active_namespace(&self) -> Option<String> {
        let kubeconfig = match Kubeconfig::read() {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(error = %err, "kubeconfig not readable");
                return None;
            }
        };
        let current = kubeconfig.current_context.as_deref()?;
        kubeconfig
            .contexts
            .iter()
            .find(|named| named.name == current)
            .and_then(|named| named.context.as_ref())
            .and_then(|context| context.namespace.clone())
    }
}

/// A fixed answer, for callers that already know the namespace context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedNamespace(Option<String>);

impl FixedNamespace {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn active(namespace: impl Into<String>) -> Self {
        Self(Some(namespace.into()))
    }
}

impl NamespaceContext for FixedNamespace {
    fn active_namespace(&self) -> Option<String> {
        self.0.clone()
    }
}
