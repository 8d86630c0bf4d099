//! Per-step and per-run apply outcomes.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::ResourceKind;

/// Steps of a run, in their fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStep {
    /// The go-ahead asked for before any cluster call
    Confirmation,
    Namespace,
    Workload,
    InternalExposure,
    ExternalExposure,
}

impl RunStep {
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Deployment => RunStep::Workload,
            ResourceKind::Service => RunStep::InternalExposure,
            ResourceKind::Route => RunStep::ExternalExposure,
        }
    }

    /// Whether a failure at this step halts the run
    pub fn is_mandatory(self) -> bool {
        !matches!(self, RunStep::ExternalExposure)
    }
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStep::Confirmation => "confirmation",
            RunStep::Namespace => "namespace",
            RunStep::Workload => "workload",
            RunStep::InternalExposure => "internal exposure",
            RunStep::ExternalExposure => "external exposure",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStatus {
    Applied,
    Failed,
    Skipped,
}

impl fmt::Display for ApplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplyStatus::Applied => "applied",
            ApplyStatus::Failed => "failed",
            ApplyStatus::Skipped => "skipped",
        })
    }
}

/// Outcome for a single manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub step: RunStep,
    pub kind: ResourceKind,
    pub name: String,
    pub status: ApplyStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "message")]
pub enum NamespaceOutcome {
    /// The run stopped before the namespace was looked at
    NotChecked,
    Existing,
    Created,
    Declined,
    Failed(String),
}

impl NamespaceOutcome {
    pub fn is_ensured(&self) -> bool {
        matches!(self, NamespaceOutcome::Existing | NamespaceOutcome::Created)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HaltReason {
    Failed,
    Aborted,
}

/// Where and why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Halt {
    pub step: RunStep,
    pub reason: HaltReason,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Fatal outcomes of a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("namespace '{namespace}' could not be ensured: {reason}")]
    NamespaceFatal { namespace: String, reason: String },

    #[error("workload '{name}' failed to apply: {reason}")]
    WorkloadApplyFatal { name: String, reason: String },

    #[error("internal exposure '{name}' failed to apply: {reason}")]
    InternalExposureApplyFatal { name: String, reason: String },

    #[error("run aborted at {step} step")]
    Aborted { step: RunStep },
}

/// Terminal output of an apply run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub namespace: String,
    pub namespace_outcome: NamespaceOutcome,
    /// One entry per manifest, in apply order
    pub steps: Vec<ApplyResult>,
    pub halt: Option<Halt>,
    pub warnings: Vec<String>,
    /// Digest of the rendered manifest set
    pub fingerprint: String,
    /// Manifest files written before the apply phase
    pub written: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Namespace ensured and every mandatory manifest applied
    pub fn is_success(&self) -> bool {
        self.halt.is_none()
            && self.namespace_outcome.is_ensured()
            && self
                .steps
                .iter()
                .filter(|s| s.step.is_mandatory())
                .all(|s| s.status == ApplyStatus::Applied)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn step(&self, step: RunStep) -> Option<&ApplyResult> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn statuses(&self) -> Vec<ApplyStatus> {
        self.steps.iter().map(|s| s.status).collect()
    }

    pub fn summary(&self) -> RunSummary {
        self.steps
            .iter()
            .fold(RunSummary::default(), |mut summary, s| {
                match s.status {
                    ApplyStatus::Applied => summary.applied += 1,
                    ApplyStatus::Failed => summary.failed += 1,
                    ApplyStatus::Skipped => summary.skipped += 1,
                }
                summary
            })
    }

    /// The fatal error behind a halted run, if any
    pub fn failure(&self) -> Option<RunError> {
        let halt = self.halt.as_ref()?;
        if halt.reason == HaltReason::Aborted {
            return Some(RunError::Aborted { step: halt.step });
        }
        let name = || {
            self.step(halt.step)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        match halt.step {
            RunStep::Confirmation => Some(RunError::Aborted { step: halt.step }),
            RunStep::Namespace => Some(RunError::NamespaceFatal {
                namespace: self.namespace.clone(),
                reason: halt.message.clone(),
            }),
            RunStep::Workload => Some(RunError::WorkloadApplyFatal {
                name: name(),
                reason: halt.message.clone(),
            }),
            RunStep::InternalExposure => Some(RunError::InternalExposureApplyFatal {
                name: name(),
                reason: halt.message.clone(),
            }),
            // Never halts a run; failures there are warnings.
            RunStep::ExternalExposure => None,
        }
    }

    /// `Ok` for a successful run, the fatal error otherwise
    pub fn into_result(self) -> Result<RunResult, RunError> {
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
