//! Step-boundary confirmation and abort.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::manifest::{Manifest, ManifestSet};

/// A point between steps where the caller may stop the run.
#[derive(Debug, Clone, Copy)]
pub enum Checkpoint<'a> {
    /// Before any cluster mutation
    BeginApply(&'a ManifestSet),
    /// The target namespace is missing and would be created
    CreateNamespace(&'a str),
    /// The manifest is about to be applied
    Apply(&'a Manifest),
}

/// Decides whether the run may pass a checkpoint.
///
/// Only consulted between steps; an in-flight cluster call is never
/// interrupted.
pub trait ApplyGate {
    fn confirm(&mut self, checkpoint: &Checkpoint<'_>) -> bool;
}

/// Passes every checkpoint (non-interactive runs, `--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ApplyGate for AutoApprove {
    fn confirm(&mut self, _checkpoint: &Checkpoint<'_>) -> bool {
        true
    }
}

/// Shared flag another thread can trip to stop the run at the next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl ApplyGate for AbortSignal {
    fn confirm(&mut self, _checkpoint: &Checkpoint<'_>) -> bool {
        !self.is_aborted()
    }
}
