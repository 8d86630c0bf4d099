//! Integration tests for ordered apply, fatal halts and gates.

mod support;

use kubeship_core::apply::{
    AbortSignal, ApplyOrchestrator, ApplyStatus, AutoApprove, HaltReason, NamespaceOutcome,
    RunError, RunStep,
};
use kubeship_core::capability::PlatformCapabilities;
use kubeship_core::cluster::ResourceKind;
use kubeship_core::labels::LabelPlanner;
use kubeship_core::manifest::{ManifestSet, ManifestSynthesizer};
use support::{Call, DeclineAt, FakeCluster, ScriptedGate, demo_spec};
use tempfile::TempDir;

use ApplyStatus::{Applied, Failed, Skipped};

fn manifests(caps: PlatformCapabilities) -> ManifestSet {
    let spec = demo_spec();
    let labels = LabelPlanner::plan(&spec, caps);
    ManifestSynthesizer::synthesize(&spec, &labels, caps)
}

#[test]
fn applies_in_dependency_order() {
    let cluster = FakeCluster::openshift();
    let set = manifests(PlatformCapabilities::with_routes());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(
        cluster.apply_calls(),
        vec![
            ResourceKind::Deployment,
            ResourceKind::Service,
            ResourceKind::Route
        ]
    );
    assert_eq!(run.statuses(), vec![Applied, Applied, Applied]);
    assert!(run.is_success());
    assert_eq!(run.exit_code(), 0);
}

#[test]
fn namespace_is_ensured_before_any_apply() {
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    let calls = cluster.calls();
    assert_eq!(calls[0], Call::NamespaceExists("apps".to_string()));
    assert_eq!(calls[1], Call::CreateNamespace("apps".to_string()));
    assert!(matches!(calls[2], Call::Apply(ResourceKind::Deployment, _)));
    assert_eq!(run.namespace_outcome, NamespaceOutcome::Created);
    assert!(cluster.has_namespace("apps"));
}

#[test]
fn existing_namespace_is_not_recreated() {
    let cluster = FakeCluster::new().with_namespace("apps");
    let set = manifests(PlatformCapabilities::none());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.namespace_outcome, NamespaceOutcome::Existing);
    assert!(
        !cluster
            .calls()
            .iter()
            .any(|c| matches!(c, Call::CreateNamespace(_)))
    );
}

#[test]
fn workload_failure_halts_before_service() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    cluster.fail_apply(ResourceKind::Deployment, "admission webhook denied");
    let set = manifests(PlatformCapabilities::with_routes());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.statuses(), vec![Failed, Skipped, Skipped]);
    assert_eq!(cluster.apply_calls(), vec![ResourceKind::Deployment]);
    assert_eq!(run.exit_code(), 1);

    let halt = run.halt.as_ref().unwrap();
    assert_eq!(halt.step, RunStep::Workload);
    assert_eq!(halt.reason, HaltReason::Failed);
    assert!(matches!(
        run.failure(),
        Some(RunError::WorkloadApplyFatal { ref name, .. }) if name == "demo"
    ));
}

#[test]
fn service_failure_keeps_applied_workload() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    cluster.fail_apply(ResourceKind::Service, "port conflict");
    let set = manifests(PlatformCapabilities::with_routes());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.statuses(), vec![Applied, Failed, Skipped]);
    // No rollback: the workload stays in place.
    assert!(
        cluster
            .object(ResourceKind::Deployment, "demo", "apps")
            .is_some()
    );
    assert!(matches!(
        run.failure(),
        Some(RunError::InternalExposureApplyFatal { .. })
    ));
    assert_eq!(run.exit_code(), 1);
}

#[test]
fn route_failure_is_a_warning() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    cluster.fail_apply(ResourceKind::Route, "host already claimed");
    let set = manifests(PlatformCapabilities::with_routes());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.statuses(), vec![Applied, Applied, Failed]);
    assert!(run.halt.is_none());
    assert!(run.failure().is_none());
    assert_eq!(run.exit_code(), 0);
    assert_eq!(run.warnings.len(), 1);
    assert!(run.warnings[0].contains("host already claimed"));
}

#[test]
fn retry_after_failure_is_idempotent() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    cluster.fail_apply(ResourceKind::Service, "transient");
    let set = manifests(PlatformCapabilities::with_routes());
    let orchestrator = ApplyOrchestrator::default();

    let first = orchestrator.apply(&set, &cluster, &mut AutoApprove).unwrap();
    assert_eq!(first.exit_code(), 1);
    let workload_after_first = cluster.object(ResourceKind::Deployment, "demo", "apps");

    cluster.clear_failures();
    let second = orchestrator.apply(&set, &cluster, &mut AutoApprove).unwrap();
    assert_eq!(second.statuses(), vec![Applied, Applied, Applied]);
    assert_eq!(
        cluster.object(ResourceKind::Deployment, "demo", "apps"),
        workload_after_first
    );

    let third = orchestrator.apply(&set, &cluster, &mut AutoApprove).unwrap();
    assert_eq!(third.statuses(), vec![Applied, Applied, Applied]);
    assert_eq!(cluster.object_count(), 3);
}

#[test]
fn namespace_query_failure_is_fatal() {
    let cluster = FakeCluster::new();
    cluster.fail_namespace_query("namespaces is forbidden");
    let set = manifests(PlatformCapabilities::none());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.statuses(), vec![Skipped, Skipped]);
    assert!(cluster.apply_calls().is_empty());
    assert!(matches!(
        run.failure(),
        Some(RunError::NamespaceFatal { ref namespace, .. }) if namespace == "apps"
    ));
}

#[test]
fn namespace_creation_failure_is_fatal() {
    let cluster = FakeCluster::new();
    cluster.fail_namespace_create("quota exceeded");
    let set = manifests(PlatformCapabilities::none());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert!(matches!(run.namespace_outcome, NamespaceOutcome::Failed(_)));
    assert_eq!(run.statuses(), vec![Skipped, Skipped]);
    assert_eq!(run.exit_code(), 1);
}

#[test]
fn declining_namespace_creation_is_fatal() {
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());
    let mut gate = ScriptedGate::declining(DeclineAt::CreateNamespace);

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut gate)
        .unwrap();

    assert_eq!(run.namespace_outcome, NamespaceOutcome::Declined);
    assert_eq!(cluster.mutating_calls(), 0);
    assert!(matches!(run.failure(), Some(RunError::NamespaceFatal { .. })));
    assert_eq!(gate.seen, vec!["begin", "create-namespace:apps"]);
}

#[test]
fn declining_begin_makes_no_cluster_calls() {
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());
    let mut gate = ScriptedGate::declining(DeclineAt::BeginApply);

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut gate)
        .unwrap();

    assert!(cluster.calls().is_empty());
    assert_eq!(run.namespace_outcome, NamespaceOutcome::NotChecked);
    assert_eq!(run.statuses(), vec![Skipped, Skipped]);
    let failure = run.failure().unwrap();
    assert_eq!(
        failure,
        RunError::Aborted {
            step: RunStep::Confirmation
        }
    );
    assert_eq!(failure.to_string(), "run aborted at confirmation step");
}

#[test]
fn declining_service_aborts_between_steps() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    let set = manifests(PlatformCapabilities::with_routes());
    let mut gate = ScriptedGate::declining(DeclineAt::Apply(ResourceKind::Service));

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut gate)
        .unwrap();

    assert_eq!(run.statuses(), vec![Applied, Skipped, Skipped]);
    assert_eq!(cluster.apply_calls(), vec![ResourceKind::Deployment]);
    assert_eq!(
        run.failure(),
        Some(RunError::Aborted {
            step: RunStep::InternalExposure
        })
    );
    assert_eq!(run.exit_code(), 1);
}

#[test]
fn declining_route_is_skipped_without_failing() {
    let cluster = FakeCluster::openshift().with_namespace("apps");
    let set = manifests(PlatformCapabilities::with_routes());
    let mut gate = ScriptedGate::declining(DeclineAt::Apply(ResourceKind::Route));

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut gate)
        .unwrap();

    assert_eq!(run.statuses(), vec![Applied, Applied, Skipped]);
    assert_eq!(run.exit_code(), 0);
}

#[test]
fn tripped_abort_signal_stops_at_first_checkpoint() {
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());
    let signal = AbortSignal::new();
    signal.abort();

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut signal.clone())
        .unwrap();

    assert_eq!(cluster.mutating_calls(), 0);
    assert_eq!(run.halt.as_ref().unwrap().reason, HaltReason::Aborted);
}

#[test]
fn manifests_are_written_before_apply() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("k8s");
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());
    let mut gate = ScriptedGate::declining(DeclineAt::BeginApply);

    let run = ApplyOrchestrator::new(Some(out.clone()))
        .apply(&set, &cluster, &mut gate)
        .unwrap();

    // Written even though the apply phase was declined.
    assert!(out.join("demo-deployment.yaml").exists());
    assert!(out.join("demo-service.yaml").exists());
    assert!(!out.join("demo-route.yaml").exists());
    assert_eq!(run.written.len(), 2);
}

#[test]
fn write_failure_prevents_any_cluster_call() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let cluster = FakeCluster::new();
    let set = manifests(PlatformCapabilities::none());

    let result = ApplyOrchestrator::new(Some(blocker.join("k8s"))).apply(
        &set,
        &cluster,
        &mut AutoApprove,
    );

    assert!(result.is_err());
    assert!(cluster.calls().is_empty());
}

#[test]
fn run_result_records_fingerprint_and_timestamps() {
    let cluster = FakeCluster::new().with_namespace("apps");
    let set = manifests(PlatformCapabilities::none());

    let run = ApplyOrchestrator::default()
        .apply(&set, &cluster, &mut AutoApprove)
        .unwrap();

    assert_eq!(run.fingerprint, set.fingerprint().unwrap());
    assert!(run.finished_at >= run.started_at);
    assert_eq!(run.summary().applied, 2);
}
