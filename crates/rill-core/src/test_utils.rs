//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::component::{Component, ComponentError};
use crate::scheduler::Phase;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Call log
// ===========================================================================

/// Ordered record of hook calls, shared between probes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<String>>>,
}

impl CallLog {
    pub fn record(&self, label: &str, phase: Phase) {
        self.calls.borrow_mut().push(format!("{label}.{phase}"));
    }

    /// All calls so far, formatted as `label.phase`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls made during `phase`, as labels.
    pub fn labels_for(&self, phase: Phase) -> Vec<String> {
        let suffix = format!(".{phase}");
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| c.strip_suffix(&suffix).map(str::to_owned))
            .collect()
    }

    /// Position of `label.phase` in the log.
    pub fn position(&self, label: &str, phase: Phase) -> Option<usize> {
        let call = format!("{label}.{phase}");
        self.calls.borrow().iter().position(|c| *c == call)
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

// ===========================================================================
// Components
// ===========================================================================

/// Component that records every hook call into a [`CallLog`].
#[derive(Debug)]
pub struct Probe {
    label: String,
    log: CallLog,
}

impl Probe {
    pub fn new(label: impl Into<String>, log: CallLog) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn hit(&self, phase: Phase) -> Result<(), ComponentError> {
        self.log.record(&self.label, phase);
        Ok(())
    }
}

impl Component for Probe {
    fn setup(&mut self) -> Result<(), ComponentError> {
        self.hit(Phase::Setup)
    }
    fn reset(&mut self) -> Result<(), ComponentError> {
        self.hit(Phase::Reset)
    }
    fn before(&mut self) -> Result<(), ComponentError> {
        self.hit(Phase::Before)
    }
    fn after(&mut self) -> Result<(), ComponentError> {
        self.hit(Phase::After)
    }
    fn finish(&mut self) -> Result<(), ComponentError> {
        self.hit(Phase::Finish)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Component whose hook for one phase always fails.
#[derive(Debug)]
pub struct Failing {
    phase: Phase,
    message: String,
}

impl Failing {
    pub fn on(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    fn check(&self, phase: Phase) -> Result<(), ComponentError> {
        if phase == self.phase {
            Err(ComponentError::Failed(self.message.clone()))
        } else {
            Ok(())
        }
    }
}

impl Component for Failing {
    fn setup(&mut self) -> Result<(), ComponentError> {
        self.check(Phase::Setup)
    }
    fn reset(&mut self) -> Result<(), ComponentError> {
        self.check(Phase::Reset)
    }
    fn before(&mut self) -> Result<(), ComponentError> {
        self.check(Phase::Before)
    }
    fn after(&mut self) -> Result<(), ComponentError> {
        self.check(Phase::After)
    }
    fn finish(&mut self) -> Result<(), ComponentError> {
        self.check(Phase::Finish)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
