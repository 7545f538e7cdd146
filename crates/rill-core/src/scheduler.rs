//! Lifecycle scheduler.
//!
//! Runs one lifecycle phase across every registered component in
//! dependency order. A parent's hook for a phase always completes before
//! any of its children's hooks for the same phase.
//!
//! # Algorithm
//!
//! 1. Fetch the graph's topological order (recomputed only if the graph was
//!    mutated since the last phase).
//! 2. If the graph has a cycle, fail before calling any hook.
//! 3. Call the phase hook of each component in order. The first hook error
//!    stops the traversal and is returned as-is.

use crate::component::ComponentError;
use crate::graph::{DependencyGraph, GraphError};
use crate::id::ComponentId;
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One of the five lifecycle phases, in the order a driver runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Reset,
    Before,
    After,
    Finish,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Setup,
        Phase::Reset,
        Phase::Before,
        Phase::After,
        Phase::Finish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Reset => "reset",
            Phase::Before => "before",
            Phase::After => "after",
            Phase::Finish => "finish",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors and reports
// ---------------------------------------------------------------------------

/// Why a phase or time step did not complete. Graph and hook errors are
/// passed through without added context.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Hook(#[from] ComponentError),
    #[error("time step {index} out of order (next allowed {next}, {timesteps} in total)")]
    StepOutOfOrder {
        index: usize,
        next: usize,
        timesteps: usize,
    },
}

/// Summary of a completed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Number of hooks called.
    pub components: usize,
}

// ---------------------------------------------------------------------------
// LifecycleScheduler
// ---------------------------------------------------------------------------

/// Drives lifecycle phases over a [`DependencyGraph`].
///
/// The scheduler does not own components. Callers pass a dispatch function
/// that invokes the phase hook of a given component.
#[derive(Debug, Default)]
pub struct LifecycleScheduler {
    /// How many times each phase ran to completion.
    completed: [u64; 5],
}

impl LifecycleScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `phase` over every component in topological order.
    ///
    /// On a cycle no hook is called. On a hook error the remaining
    /// components are skipped and the error is returned unchanged.
    pub fn run_phase<F>(
        &mut self,
        graph: &mut DependencyGraph,
        phase: Phase,
        mut dispatch: F,
    ) -> Result<PhaseReport, LifecycleError>
    where
        F: FnMut(ComponentId, Phase) -> Result<(), ComponentError>,
    {
        let span = tracing::debug_span!("phase", %phase);
        let _guard = span.enter();

        graph.topological_order()?;
        let order = graph.take_topo_cache();

        let mut outcome = Ok(());
        for &id in &order {
            tracing::trace!(component = ?id, "dispatch");
            if let Err(err) = dispatch(id, phase) {
                tracing::warn!(component = ?id, error = %err, "hook failed; aborting phase");
                outcome = Err(err);
                break;
            }
        }

        let components = order.len();
        graph.restore_topo_cache(order);
        outcome?;

        self.completed[phase.index()] += 1;
        tracing::debug!(components, "phase complete");
        Ok(PhaseReport { phase, components })
    }

    /// Number of times `phase` has completed without error.
    pub fn completed(&self, phase: Phase) -> u64 {
        self.completed[phase.index()]
    }
}
