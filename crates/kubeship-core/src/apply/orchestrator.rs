//! Namespace -> Workload -> InternalExposure -> ExternalExposure.
//!
//! The order is fixed: a service is useless without pods to select, and a
//! route is useless without a service to point at. Namespace, workload and
//! internal exposure failures halt the run; an external exposure failure is
//! recorded as a warning. Nothing already applied is rolled back, so a retry
//! is a plain idempotent re-apply.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;

use super::gate::{ApplyGate, Checkpoint};
use super::report::{
    ApplyResult, ApplyStatus, Halt, HaltReason, NamespaceOutcome, RunResult, RunStep,
};
use crate::cluster::ClusterClient;
use crate::config::DeploymentSpec;
use crate::manifest::{Manifest, ManifestSet, write_manifest_set};

#[derive(Debug, Clone, Default)]
pub struct ApplyOrchestrator {
    output_target: Option<PathBuf>,
}

impl ApplyOrchestrator {
    pub fn new(output_target: Option<PathBuf>) -> Self {
        Self { output_target }
    }

    /// Orchestrator writing to the deployment's output target, if it has one.
    pub fn for_spec(spec: &DeploymentSpec) -> Self {
        Self::new(spec.output_target().map(Path::to_path_buf))
    }

    pub fn output_target(&self) -> Option<&Path> {
        self.output_target.as_deref()
    }

    /// Persist, then apply `manifests` in order.
    ///
    /// Manifests are written before any cluster call; a write failure is
    /// returned as `Err` and nothing is applied. Every other outcome,
    /// including fatal apply failures, is reported through the [`RunResult`].
    pub fn apply(
        &self,
        manifests: &ManifestSet,
        client: &dyn ClusterClient,
        gate: &mut dyn ApplyGate,
    ) -> anyhow::Result<RunResult> {
        let started_at = Utc::now();
        let fingerprint = manifests
            .fingerprint()
            .context("Failed to render manifests")?;

        let written = match &self.output_target {
            Some(dir) => write_manifest_set(manifests, dir)
                .with_context(|| format!("Failed to write manifests to {}", dir.display()))?,
            None => Vec::new(),
        };

        let mut run = RunResult {
            namespace: manifests.namespace().to_string(),
            namespace_outcome: NamespaceOutcome::NotChecked,
            steps: Vec::with_capacity(manifests.len()),
            halt: None,
            warnings: Vec::new(),
            fingerprint,
            written,
            started_at,
            finished_at: started_at,
        };

        if !gate.confirm(&Checkpoint::BeginApply(manifests)) {
            tracing::info!("apply phase declined");
            run.halt = Some(Halt {
                step: RunStep::Confirmation,
                reason: HaltReason::Aborted,
                message: "apply phase declined".to_string(),
            });
        } else {
            run.namespace_outcome = ensure_namespace(manifests.namespace(), client, gate);
            match &run.namespace_outcome {
                NamespaceOutcome::Declined => {
                    run.halt = Some(Halt {
                        step: RunStep::Namespace,
                        reason: HaltReason::Failed,
                        message: "namespace creation declined".to_string(),
                    });
                }
                NamespaceOutcome::Failed(message) => {
                    run.halt = Some(Halt {
                        step: RunStep::Namespace,
                        reason: HaltReason::Failed,
                        message: message.clone(),
                    });
                }
                _ => {}
            }
        }

        for manifest in manifests.iter() {
            let result = match &run.halt {
                Some(halt) => skipped(
                    manifest,
                    format!("not attempted: run halted at {} step", halt.step),
                ),
                None => apply_step(manifest, client, gate, &mut run),
            };
            run.steps.push(result);
        }

        run.finished_at = Utc::now();
        let summary = run.summary();
        tracing::info!(
            namespace = %run.namespace,
            applied = summary.applied,
            failed = summary.failed,
            skipped = summary.skipped,
            success = run.is_success(),
            "apply run finished"
        );
        Ok(run)
    }
}

fn ensure_namespace(
    namespace: &str,
    client: &dyn ClusterClient,
    gate: &mut dyn ApplyGate,
) -> NamespaceOutcome {
    match client.namespace_exists(namespace) {
        Ok(true) => {
            tracing::debug!(namespace, "namespace exists");
            NamespaceOutcome::Existing
        }
        Ok(false) => {
            if !gate.confirm(&Checkpoint::CreateNamespace(namespace)) {
                tracing::info!(namespace, "namespace creation declined");
                return NamespaceOutcome::Declined;
            }
            match client.create_namespace(namespace) {
                Ok(()) => {
                    tracing::info!(namespace, "created namespace");
                    NamespaceOutcome::Created
                }
                Err(err) => {
                    tracing::error!(namespace, error = %err, "failed to create namespace");
                    NamespaceOutcome::Failed(err.to_string())
                }
            }
        }
        Err(err) => {
            tracing::error!(namespace, error = %err, "failed to query namespace");
            NamespaceOutcome::Failed(err.to_string())
        }
    }
}

fn apply_step(
    manifest: &Manifest,
    client: &dyn ClusterClient,
    gate: &mut dyn ApplyGate,
    run: &mut RunResult,
) -> ApplyResult {
    let step = RunStep::for_kind(manifest.kind());

    if !gate.confirm(&Checkpoint::Apply(manifest)) {
        tracing::info!(%step, name = manifest.name(), "apply declined");
        if step.is_mandatory() {
            run.halt = Some(Halt {
                step,
                reason: HaltReason::Aborted,
                message: format!("{} '{}' declined", manifest.kind(), manifest.name()),
            });
        }
        return skipped(manifest, "declined".to_string());
    }

    match client.apply_resource(manifest) {
        Ok(()) => {
            tracing::info!(%step, kind = %manifest.kind(), name = manifest.name(), "applied");
            ApplyResult {
                step,
                kind: manifest.kind(),
                name: manifest.name().to_string(),
                status: ApplyStatus::Applied,
                message: None,
            }
        }
        Err(err) => {
            let message = err.to_string();
            if step.is_mandatory() {
                tracing::error!(%step, name = manifest.name(), error = %err, "apply failed");
                run.halt = Some(Halt {
                    step,
                    reason: HaltReason::Failed,
                    message: message.clone(),
                });
            } else {
                tracing::warn!(%step, name = manifest.name(), error = %err, "apply failed");
                run.warnings.push(format!(
                    "{} '{}' was not applied: {}",
                    manifest.kind(),
                    manifest.name(),
                    message
                ));
            }
            ApplyResult {
                step,
                kind: manifest.kind(),
                name: manifest.name().to_string(),
                status: ApplyStatus::Failed,
                message: Some(message),
            }
        }
    }
}

fn skipped(manifest: &Manifest, message: String) -> ApplyResult {
    ApplyResult {
        step: RunStep::for_kind(manifest.kind()),
        kind: manifest.kind(),
        name: manifest.name().to_string(),
        status: ApplyStatus::Skipped,
        message: Some(message),
    }
}
