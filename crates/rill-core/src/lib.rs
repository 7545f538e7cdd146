//! Rill Core -- component dependency graph and lifecycle orchestration.
//!
//! A simulated network is a set of components whose per-step behavior must
//! run in an order that respects the dependencies declared between them.
//! This crate tracks those dependencies and drives the lifecycle phases
//! across the whole network.
//!
//! # Lifecycle
//!
//! Every component exposes five hooks, each run across all components in
//! dependency order (parents before children):
//!
//! 1. **Setup** -- once when the model is built; allocate per-run buffers.
//! 2. **Reset** -- once per simulation run; restore initial state.
//! 3. **Before** -- once per time step; read upstream state.
//! 4. **After** -- once per time step; publish results.
//! 5. **Finish** -- once at teardown; release resources.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut model = Model::new(ModelConfig::new(365, 1))?;
//! let storage = model.add_with(ComponentMeta::named("storage"), Storage::new());
//! let control = model.add_with(ComponentMeta::named("control"), ControlCurve::new());
//! // The control curve reads the storage level, so it runs second.
//! model.children(storage)?.add(control)?;
//! model.run()?;
//! ```
//!
//! # Key Types
//!
//! - [`graph::DependencyGraph`] -- Directed graph over component handles
//!   plus a synthetic root, with a cached topological order.
//! - [`relation::RelationView`] -- Parents or children of one component,
//!   read from and written to the graph.
//! - [`component::Component`] -- The lifecycle hooks, all no-ops by default.
//! - [`scheduler::LifecycleScheduler`] -- Runs one phase in dependency order.
//! - [`model::Model`] -- Owns the graph, the components, and the clock.

pub mod component;
pub mod config;
pub mod graph;
pub mod id;
pub mod model;
pub mod relation;
pub mod scheduler;
pub mod values;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
