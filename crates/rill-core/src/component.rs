//! Lifecycle-bearing components.
//!
//! A component is anything that takes part in the dependency graph and
//! reacts to the five lifecycle phases. Implementors override only the
//! hooks they need; the rest default to no-ops. Hooks take no context
//! argument: a component reads what it needs through handles it was given
//! at construction (a [`Clock`](crate::model::Clock),
//! [`SharedValues`](crate::values::SharedValues), and so on).
//!
//! Hooks are called by the scheduler only, in dependency order.

use crate::id::ModelId;
use crate::scheduler::Phase;

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// A component participating in the lifecycle.
///
/// `reset` runs before every simulation run, so implementations with real
/// state must make it restore their initial state no matter how often it is
/// called.
pub trait Component: std::fmt::Debug {
    /// Allocate per-run buffers. Called once when the model is built.
    fn setup(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Restore initial state. Called once per simulation run.
    fn reset(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Read upstream state at the start of a time step.
    fn before(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Publish results at the end of a time step.
    fn after(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Release resources at teardown.
    fn finish(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Downcast to `&dyn Any` for type-safe access to concrete component types.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to `&mut dyn Any` for type-safe mutable access to concrete component types.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

impl dyn Component {
    /// Dispatch the hook for `phase`.
    pub fn run(&mut self, phase: Phase) -> Result<(), ComponentError> {
        match phase {
            Phase::Setup => self.setup(),
            Phase::Reset => self.reset(),
            Phase::Before => self.before(),
            Phase::After => self.after(),
            Phase::Finish => self.finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentError
// ---------------------------------------------------------------------------

/// Errors raised by component hooks.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// The hook could not complete.
    #[error("{0}")]
    Failed(String),
    /// The component was configured or wired inconsistently.
    #[error("invalid component state: {0}")]
    Invalid(String),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

// ---------------------------------------------------------------------------
// Metadata and records
// ---------------------------------------------------------------------------

/// Descriptive metadata attached to a component when it is added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMeta {
    /// Human-readable name. Not required to be unique.
    pub name: Option<String>,
    pub comment: Option<String>,
}

impl ComponentMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A component as stored by its model.
#[derive(Debug)]
pub(crate) struct ComponentRecord {
    /// The owning model. Fixed at construction.
    pub(crate) model: ModelId,
    pub(crate) meta: ComponentMeta,
    pub(crate) behaviour: Box<dyn Component>,
}
