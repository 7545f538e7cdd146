//! Recorders for the Rill lifecycle engine.
//!
//! Recorders are ordinary components that observe other components through
//! shared handles ([`SharedValues`](rill_core::values::SharedValues),
//! [`Clock`](rill_core::model::Clock)) and summarise what they see. Each one
//! must run after whatever it observes, so the `attach` constructors add the
//! recorder to the model and wire it as a child of its source in one call.
//!
//! # Usage
//!
//! ```ignore
//! let events = EventRecorder::attach(
//!     &mut model,
//!     ComponentMeta::named("drought events"),
//!     restriction,
//!     restriction_flag.clone(),
//!     7,
//! )?;
//! let longest = EventDurationRecorder::attach(
//!     &mut model,
//!     ComponentMeta::named("longest drought"),
//!     events,
//!     Aggregation::Max,
//! )?;
//! model.run()?;
//! ```

pub mod events;
pub mod progress;

pub use events::{Aggregation, Event, EventDurationRecorder, EventLog, EventRecorder};
pub use progress::{ProgressRecorder, ProgressUpdate};

use rill_core::id::ComponentId;
use rill_core::model::ModelError;

/// Errors from building or wiring recorders.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("minimum event length must be at least 1, got {0}")]
    InvalidMinimumEventLength(usize),
    #[error("component {0:?} is not an event recorder")]
    NotAnEventRecorder(ComponentId),
    #[error(transparent)]
    Model(#[from] ModelError),
}
