//! Ordered application of a manifest set to the cluster.

pub mod gate;
pub mod orchestrator;
pub mod report;

pub use gate::{AbortSignal, ApplyGate, AutoApprove, Checkpoint};
pub use orchestrator::ApplyOrchestrator;
pub use report::{
    ApplyResult, ApplyStatus, Halt, HaltReason, NamespaceOutcome, RunError, RunResult, RunStep,
    RunSummary,
};
