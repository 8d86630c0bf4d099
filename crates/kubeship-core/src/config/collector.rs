//! Collection and validation of deployment inputs.
//!
//! Raw inputs arrive as loosely-typed strings (from flags, prompts or a config
//! file). The collector substitutes defaults for anything empty, validates the
//! result and produces an immutable [`DeploymentSpec`].

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::context::NamespaceContext;
use super::schema::DefaultsConfig;

/// Namespace used when neither the caller nor the kubeconfig names one
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REPLICAS: u32 = 1;
pub const DEFAULT_CPU_REQUEST: &str = "250m";
pub const DEFAULT_CPU_LIMIT: &str = "500m";
pub const DEFAULT_MEMORY_REQUEST: &str = "256Mi";
pub const DEFAULT_MEMORY_LIMIT: &str = "512Mi";
pub const DEFAULT_OUTPUT_DIR: &str = "k8s";

/// Input validation failures. Reported before any cluster call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid container port '{0}': expected an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("invalid replica count '{0}': expected an integer of at least 1")]
    InvalidReplicaCount(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error(
        "invalid {field} '{value}': must consist of lowercase alphanumeric characters or '-', \
         {rule}, and be at most 63 characters"
    )]
    InvalidName {
        field: &'static str,
        value: String,
        rule: &'static str,
    },
}

/// Deployment parameters as gathered from the user, before defaulting.
///
/// `None` and blank strings are both treated as "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub app_name: Option<String>,
    pub image: Option<String>,
    pub namespace: Option<String>,
    pub port: Option<String>,
    pub replicas: Option<String>,
    pub cpu_request: Option<String>,
    pub cpu_limit: Option<String>,
    pub memory_request: Option<String>,
    pub memory_limit: Option<String>,
    pub output_target: Option<String>,
    /// Do not write rendered manifests anywhere
    pub skip_output: bool,
}

/// Defaults substituted for empty inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployDefaults {
    pub app_name: String,
    pub image: String,
    pub namespace: String,
    pub port: String,
    pub replicas: String,
    pub cpu_request: String,
    pub cpu_limit: String,
    pub memory_request: String,
    pub memory_limit: String,
    pub output_dir: PathBuf,
}

impl Default for DeployDefaults {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            image: String::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            port: DEFAULT_PORT.to_string(),
            replicas: DEFAULT_REPLICAS.to_string(),
            cpu_request: DEFAULT_CPU_REQUEST.to_string(),
            cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            memory_request: DEFAULT_MEMORY_REQUEST.to_string(),
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl From<&DefaultsConfig> for DeployDefaults {
    fn from(config: &DefaultsConfig) -> Self {
        let builtin = DeployDefaults::default();
        Self {
            app_name: config.app_name.clone().unwrap_or(builtin.app_name),
            image: config.image.clone().unwrap_or(builtin.image),
            namespace: config.namespace.clone().unwrap_or(builtin.namespace),
            port: config
                .port
                .map(|p| p.to_string())
                .unwrap_or(builtin.port),
            replicas: config
                .replicas
                .map(|r| r.to_string())
                .unwrap_or(builtin.replicas),
            cpu_request: config.cpu_request.clone().unwrap_or(builtin.cpu_request),
            cpu_limit: config.cpu_limit.clone().unwrap_or(builtin.cpu_limit),
            memory_request: config
                .memory_request
                .clone()
                .unwrap_or(builtin.memory_request),
            memory_limit: config.memory_limit.clone().unwrap_or(builtin.memory_limit),
            output_dir: config.output_dir.clone().unwrap_or(builtin.output_dir),
        }
    }
}

/// Validated, immutable record of what the user asked for.
///
/// Only [`ConfigCollector::collect`] constructs one; every downstream
/// artifact is derived from it without mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSpec {
    app_name: String,
    image_reference: String,
    namespace: String,
    container_port: u16,
    replica_count: i32,
    cpu_request: String,
    cpu_limit: String,
    memory_request: String,
    memory_limit: String,
    output_target: Option<PathBuf>,
}

impl DeploymentSpec {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn image_reference(&self) -> &str {
        &self.image_reference
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn container_port(&self) -> u16 {
        self.container_port
    }

    pub fn replica_count(&self) -> i32 {
        self.replica_count
    }

    pub fn cpu_request(&self) -> &str {
        &self.cpu_request
    }

    pub fn cpu_limit(&self) -> &str {
        &self.cpu_limit
    }

    pub fn memory_request(&self) -> &str {
        &self.memory_request
    }

    pub fn memory_limit(&self) -> &str {
        &self.memory_limit
    }

    /// Directory the rendered manifests are written to, if any
    pub fn output_target(&self) -> Option<&Path> {
        self.output_target.as_deref()
    }
}

/// Turns [`RawInputs`] into a validated [`DeploymentSpec`].
#[derive(Debug, Clone, Default)]
pub struct ConfigCollector {
    defaults: DeployDefaults,
}

impl ConfigCollector {
    pub fn new(defaults: DeployDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &DeployDefaults {
        &self.defaults
    }

    /// Apply defaults and validate.
    ///
    /// The namespace is resolved in order: explicit input, the active
    /// namespace reported by `context`, then the configured default.
    /// `context` is only consulted when no namespace was supplied.
    pub fn collect(
        &self,
        raw: &RawInputs,
        context: &dyn NamespaceContext,
    ) -> Result<DeploymentSpec, ValidationError> {
        let app_name = or_default(&raw.app_name, &self.defaults.app_name);
        if app_name.is_empty() {
            return Err(ValidationError::MissingRequiredField("appName"));
        }

        let image_reference = or_default(&raw.image, &self.defaults.image);
        if image_reference.is_empty() {
            return Err(ValidationError::MissingRequiredField("imageReference"));
        }

        let namespace = match supplied(&raw.namespace) {
            Some(ns) => ns.to_string(),
            None => self.resolve_context_namespace(context),
        };
        if namespace.is_empty() {
            return Err(ValidationError::MissingRequiredField("namespace"));
        }

        validate_app_name(&app_name)?;
        validate_namespace(&namespace)?;

        let container_port = parse_port(&or_default(&raw.port, &self.defaults.port))?;
        let replica_count = parse_replicas(&or_default(&raw.replicas, &self.defaults.replicas))?;

        let output_target = if raw.skip_output {
            None
        } else {
            Some(
                supplied(&raw.output_target)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.defaults.output_dir.clone()),
            )
        };

        Ok(DeploymentSpec {
            app_name,
            image_reference,
            namespace,
            container_port,
            replica_count,
            cpu_request: or_default(&raw.cpu_request, &self.defaults.cpu_request),
            cpu_limit: or_default(&raw.cpu_limit, &self.defaults.cpu_limit),
            memory_request: or_default(&raw.memory_request, &self.defaults.memory_request),
            memory_limit: or_default(&raw.memory_limit, &self.defaults.memory_limit),
            output_target,
        })
    }

    fn resolve_context_namespace(&self, context: &dyn NamespaceContext) -> String {
        match context.active_namespace() {
            Some(ns) if !ns.trim().is_empty() => {
                tracing::debug!(namespace = %ns, "using active namespace from client context");
                ns.trim().to_string()
            }
            _ => {
                tracing::debug!(
                    namespace = %self.defaults.namespace,
                    "no active namespace in client context, using default"
                );
                self.defaults.namespace.trim().to_string()
            }
        }
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn or_default(value: &Option<String>, default: &str) -> String {
    supplied(value).unwrap_or(default.trim()).to_string()
}

fn parse_port(value: &str) -> Result<u16, ValidationError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|p| (1..=i64::from(u16::MAX)).contains(p))
        .and_then(|p| u16::try_from(p).ok())
        .ok_or_else(|| ValidationError::InvalidPort(value.to_string()))
}

fn parse_replicas(value: &str) -> Result<i32, ValidationError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|r| *r >= 1)
        .and_then(|r| i32::try_from(r).ok())
        .ok_or_else(|| ValidationError::InvalidReplicaCount(value.to_string()))
}

/// RFC 1123 label, the rule for namespace names.
pub(crate) fn is_dns1123_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    let edge_ok = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes.first().is_some_and(edge_ok)
        && bytes.last().is_some_and(edge_ok)
        && bytes.iter().all(|b| edge_ok(b) || *b == b'-')
}

/// RFC 1035 label. Service names must satisfy it, so the app name must too.
pub(crate) fn is_dns1035_label(value: &str) -> bool {
    is_dns1123_label(value) && value.as_bytes().first().is_some_and(u8::is_ascii_lowercase)
}

/// Checks an app name against the naming rule of every object it labels.
pub fn validate_app_name(value: &str) -> Result<(), ValidationError> {
    if is_dns1035_label(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            field: "appName",
            value: value.to_string(),
            rule: "start with a letter, end with an alphanumeric character",
        })
    }
}

pub fn validate_namespace(value: &str) -> Result<(), ValidationError> {
    if is_dns1123_label(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName {
            field: "namespace",
            value: value.to_string(),
            rule: "start and end with an alphanumeric character",
        })
    }
}
