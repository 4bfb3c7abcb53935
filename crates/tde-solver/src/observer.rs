//! Observer interface for solver progress, warnings and cancellation.
//!
//! A single observer groups all callbacks; the default is a no-op. In the
//! threaded sections the solver serializes calls through one reporter, so
//! implementations never see concurrent invocations of `on_progress`.

use serde::{Deserialize, Serialize};

/// Solver phase attached to progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Influence-operator assembly
    Build = 1,
    /// Iteration
    Solve = 2,
}

/// One progress tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub iteration: usize,
    pub residual: f64,
    pub phase: Phase,
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Idle,
    Assembling,
    Iterating,
    Converged,
    /// Cooperative stop, or iteration budget exhausted with the
    /// best-so-far solution kept.
    Stopped,
    Diverged,
}

/// Grouped solver callbacks. All methods default to no-ops; `stop_requested`
/// is polled between sweeps and between post-processing batches.
pub trait SolverObserver: Send + Sync {
    fn on_progress(&self, _progress: Progress) {}
    fn on_message(&self, _message: &str) {}
    fn on_warning(&self, _message: &str) {}
    fn on_error(&self, _message: &str) {}
    fn on_end(&self, _status: SolveStatus) {}
    fn stop_requested(&self) -> bool {
        false
    }
}

/// The default observer: ignores everything, never stops.
pub struct NullObserver;

impl SolverObserver for NullObserver {}
