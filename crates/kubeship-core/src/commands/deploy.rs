//! Deploy command implementation.
//!
//! Collects the deployment parameters, probes the cluster, synthesizes the
//! manifests and hands them to the [`ApplyOrchestrator`].

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::apply::{ApplyGate, ApplyOrchestrator, RunResult};
use crate::capability::{CapabilityProbe, PlatformCapabilities};
use crate::cluster::ClusterClient;
use crate::config::{
    ConfigCollector, DeployDefaults, DeploymentSpec, KubeshipConfig, NamespaceContext, RawInputs,
};
use crate::labels::{LabelPlanner, LabelSet};
use crate::manifest::{ManifestSet, ManifestSynthesizer, write_manifest_set};

/// Options for the deploy command
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Parameters as supplied by the user
    pub inputs: RawInputs,
    /// Render (and write) manifests without touching the cluster
    pub dry_run: bool,
    /// Force route emission on or off; `None` asks the cluster
    pub routes: Option<bool>,
}

impl DeployOptions {
    pub fn new(inputs: RawInputs) -> Self {
        Self {
            inputs,
            ..Self::default()
        }
    }

    /// Set the dry-run flag
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Override route capability detection
    pub fn with_routes(mut self, routes: bool) -> Self {
        self.routes = Some(routes);
        self
    }
}

/// Report from a deploy operation
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub spec: DeploymentSpec,
    pub capabilities: PlatformCapabilities,
    pub labels: LabelSet,
    pub manifests: ManifestSet,
    /// BLAKE3 digest of the rendered manifests
    pub fingerprint: String,
    /// Manifest files written to the output target
    pub written: Vec<PathBuf>,
    /// `None` for dry runs
    pub run: Option<RunResult>,
}

impl DeployReport {
    pub fn is_dry_run(&self) -> bool {
        self.run.is_none()
    }

    pub fn warnings(&self) -> &[String] {
        match &self.run {
            Some(run) => &run.warnings,
            None => &[],
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.run.as_ref().map_or(0, RunResult::exit_code)
    }
}

/// Deploy command orchestrator
#[derive(Debug, Default)]
pub struct DeployCommand {
    collector: ConfigCollector,
    probe: CapabilityProbe,
}

impl DeployCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command using the `[defaults]` of a loaded configuration
    pub fn from_config(config: &KubeshipConfig) -> Self {
        Self::with_defaults(DeployDefaults::from(&config.defaults))
    }

    pub fn with_defaults(defaults: DeployDefaults) -> Self {
        Self {
            collector: ConfigCollector::new(defaults),
            probe: CapabilityProbe::new(),
        }
    }

    pub fn collector(&self) -> &ConfigCollector {
        &self.collector
    }

    /// Collect, probe and synthesize without any side effects.
    ///
    /// `client` is only used for the capability query; without one, and
    /// without an explicit `routes` override, no route is emitted.
    /// Validation failures surface as a [`crate::config::ValidationError`]
    /// inside the returned error.
    pub fn render(
        &self,
        options: &DeployOptions,
        namespace_context: &dyn NamespaceContext,
        client: Option<&dyn ClusterClient>,
    ) -> anyhow::Result<DeployReport> {
        let spec = self.collector.collect(&options.inputs, namespace_context)?;
        tracing::debug!(app = spec.app_name(), namespace = spec.namespace(), "collected spec");

        let capabilities = match (options.routes, client) {
            (Some(routes), _) => PlatformCapabilities::new(routes),
            (None, Some(client)) => self.probe.probe(client),
            (None, None) => PlatformCapabilities::none(),
        };

        let labels = LabelPlanner::plan(&spec, capabilities);
        let manifests = ManifestSynthesizer::synthesize(&spec, &labels, capabilities);
        let fingerprint = manifests
            .fingerprint()
            .context("Failed to render manifests")?;

        Ok(DeployReport {
            spec,
            capabilities,
            labels,
            manifests,
            fingerprint,
            written: Vec::new(),
            run: None,
        })
    }

    /// Render and write manifests; never mutates the cluster.
    pub fn dry_run(
        &self,
        options: &DeployOptions,
        namespace_context: &dyn NamespaceContext,
        client: Option<&dyn ClusterClient>,
    ) -> anyhow::Result<DeployReport> {
        let mut report = self.render(options, namespace_context, client)?;
        if let Some(dir) = report.spec.output_target().map(Path::to_path_buf) {
            report.written = write_manifest_set(&report.manifests, &dir)
                .with_context(|| format!("Failed to write manifests to {}", dir.display()))?;
        }
        tracing::info!(
            app = report.spec.app_name(),
            manifests = report.manifests.len(),
            "dry run complete"
        );
        Ok(report)
    }

    /// Full run: render, write, then apply through `gate`.
    ///
    /// With `options.dry_run` set this behaves like [`DeployCommand::dry_run`].
    pub fn execute(
        &self,
        options: &DeployOptions,
        namespace_context: &dyn NamespaceContext,
        client: &dyn ClusterClient,
        gate: &mut dyn ApplyGate,
    ) -> anyhow::Result<DeployReport> {
        if options.dry_run {
            return self.dry_run(options, namespace_context, Some(client));
        }

        let mut report = self.render(options, namespace_context, Some(client))?;
        let orchestrator = ApplyOrchestrator::for_spec(&report.spec);
        let run = orchestrator.apply(&report.manifests, client, gate)?;

        report.written = run.written.clone();
        report.run = Some(run);
        Ok(report)
    }
}
