//! The model: owns the dependency graph, the components, and the scheduler.
//!
//! # Architecture
//!
//! The `Model` owns:
//! - A [`DependencyGraph`] over [`ComponentId`] handles plus the root
//! - A `SecondaryMap` of component records (behaviour, name, comment, owner),
//!   keyed by handles issued through [`ModelId`]
//! - A [`LifecycleScheduler`] that walks the graph in dependency order
//! - A [`Clock`] shared with any component that needs the current time step
//!
//! Components are registered the moment they are added; there is no
//! separate registration step. Additional dependencies are wired through
//! [`Model::parents`] and [`Model::children`].
//!
//! # Run sequence
//!
//! [`Model::run`] drives `setup` (only when components were added or removed
//! since the last setup), then `reset`, then `before`/`after` once per time
//! step, then `finish`.

use crate::component::{Component, ComponentError, ComponentMeta, ComponentRecord};
use crate::config::{ConfigError, ModelConfig};
use crate::graph::{DependencyGraph, GraphError};
use crate::id::{ComponentId, ModelId};
use crate::relation::{Direction, RelationView};
use crate::scheduler::{LifecycleError, LifecycleScheduler, Phase, PhaseReport};
use slotmap::SecondaryMap;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from model-level operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown component: {0:?}")]
    UnknownComponent(ComponentId),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ClockState {
    index: Cell<usize>,
    timesteps: usize,
    scenarios: usize,
}

/// Shared view of the current time step.
///
/// Clones observe the same state. The driver advances it; components only
/// read it.
#[derive(Debug, Clone)]
pub struct Clock {
    state: Rc<ClockState>,
}

impl Clock {
    pub fn new(timesteps: usize, scenarios: usize) -> Self {
        Self {
            state: Rc::new(ClockState {
                index: Cell::new(0),
                timesteps,
                scenarios,
            }),
        }
    }

    /// Zero-based index of the current time step.
    pub fn index(&self) -> usize {
        self.state.index.get()
    }

    /// Move to time step `index`.
    pub fn set_index(&self, index: usize) {
        self.state.index.set(index);
    }

    /// Total time steps per run.
    pub fn timesteps(&self) -> usize {
        self.state.timesteps
    }

    /// Number of scenarios simulated side by side.
    pub fn scenarios(&self) -> usize {
        self.state.scenarios
    }
}

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Result of a complete [`Model::run`].
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub timesteps: usize,
    pub scenarios: usize,
    pub elapsed: Duration,
}

impl RunStats {
    /// Scenario-steps simulated per second of wall time.
    pub fn speed(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.timesteps * self.scenarios) as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Owner of a component network.
#[derive(Debug)]
pub struct Model {
    id: ModelId,
    config: ModelConfig,
    graph: DependencyGraph,
    components: SecondaryMap<ComponentId, ComponentRecord>,
    scheduler: LifecycleScheduler,
    clock: Clock,
    /// Set when the component set changed since the last setup.
    needs_setup: bool,
    /// Lowest time step index `step` accepts. Rewound by `reset`.
    next_step: usize,
}

impl Default for Model {
    fn default() -> Self {
        Self::build(ModelConfig::default())
    }
}

impl Model {
    /// Create an empty model from a validated configuration.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ModelConfig) -> Self {
        let clock = Clock::new(config.timesteps, config.scenarios);
        Self {
            id: ModelId::new(),
            config,
            graph: DependencyGraph::new(),
            components: SecondaryMap::new(),
            scheduler: LifecycleScheduler::new(),
            clock,
            needs_setup: true,
            next_step: 0,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// A handle on the model's clock.
    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Component management
    // -----------------------------------------------------------------------

    /// Add an unnamed component. It is registered under the root at once.
    pub fn add<C: Component + 'static>(&mut self, component: C) -> ComponentId {
        self.add_boxed(ComponentMeta::default(), Box::new(component))
    }

    /// Add a component with a name and comment.
    pub fn add_with<C: Component + 'static>(&mut self, meta: ComponentMeta, component: C) -> ComponentId {
        self.add_boxed(meta, Box::new(component))
    }

    pub fn add_boxed(&mut self, meta: ComponentMeta, behaviour: Box<dyn Component>) -> ComponentId {
        tracing::debug!(name = meta.name.as_deref().unwrap_or(""), "adding component");
        let id = self.id.issue();
        self.components.insert(
            id,
            ComponentRecord {
                model: self.id,
                meta,
                behaviour,
            },
        );
        self.graph.register(id);
        self.needs_setup = true;
        id
    }

    /// Remove a component and every edge touching it. Returns its behaviour.
    pub fn remove(&mut self, id: ComponentId) -> Result<Box<dyn Component>, ModelError> {
        let record = self
            .components
            .remove(id)
            .ok_or(ModelError::UnknownComponent(id))?;
        self.graph.unregister(id)?;
        self.id.retire(id);
        self.needs_setup = true;
        Ok(record.behaviour)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Number of components (the root is not a component).
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components in registration order.
    pub fn component_ids(&self) -> &[ComponentId] {
        self.graph.components()
    }

    fn record(&self, id: ComponentId) -> Result<&ComponentRecord, ModelError> {
        self.components.get(id).ok_or(ModelError::UnknownComponent(id))
    }

    pub fn name(&self, id: ComponentId) -> Option<&str> {
        self.components.get(id)?.meta.name.as_deref()
    }

    pub fn set_name(&mut self, id: ComponentId, name: Option<String>) -> Result<(), ModelError> {
        let record = self
            .components
            .get_mut(id)
            .ok_or(ModelError::UnknownComponent(id))?;
        record.meta.name = name;
        Ok(())
    }

    pub fn comment(&self, id: ComponentId) -> Option<&str> {
        self.components.get(id)?.meta.comment.as_deref()
    }

    /// The model that created `id`. Handles issued by another model are
    /// unknown here; see [`ComponentId::owner`] for those.
    pub fn model_of(&self, id: ComponentId) -> Result<ModelId, ModelError> {
        Ok(self.record(id)?.model)
    }

    /// First component, in registration order, with the given name.
    pub fn find(&self, name: &str) -> Option<ComponentId> {
        self.graph
            .components()
            .iter()
            .copied()
            .find(|&id| self.name(id) == Some(name))
    }

    /// The behaviour of `id` as a trait object.
    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id).map(|r| r.behaviour.as_ref())
    }

    /// The behaviour of `id` downcast to its concrete type.
    pub fn get<T: 'static>(&self, id: ComponentId) -> Option<&T> {
        self.components.get(id)?.behaviour.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components
            .get_mut(id)?
            .behaviour
            .as_any_mut()
            .downcast_mut::<T>()
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// View over the parents of `id`.
    pub fn parents(&mut self, id: ComponentId) -> Result<RelationView<'_>, ModelError> {
        self.record(id)?;
        Ok(RelationView::new(&mut self.graph, id, Direction::Parents))
    }

    /// View over the children of `id`.
    pub fn children(&mut self, id: ComponentId) -> Result<RelationView<'_>, ModelError> {
        self.record(id)?;
        Ok(RelationView::new(&mut self.graph, id, Direction::Children))
    }

    /// Make `child` depend on `parent`.
    pub fn connect(&mut self, parent: ComponentId, child: ComponentId) -> Result<(), ModelError> {
        self.children(parent)?.add(child)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run one phase over every component in dependency order.
    pub fn run_phase(&mut self, phase: Phase) -> Result<PhaseReport, LifecycleError> {
        let components = &mut self.components;
        let report = self.scheduler.run_phase(&mut self.graph, phase, |id, phase| {
            match components.get_mut(id) {
                Some(record) => record.behaviour.run(phase),
                None => Err(ComponentError::Invalid(format!(
                    "component {id:?} is registered but has no behaviour"
                ))),
            }
        })?;
        match phase {
            Phase::Setup => self.needs_setup = false,
            Phase::Reset => self.next_step = 0,
            _ => {}
        }
        Ok(report)
    }

    /// Returns true if `setup` has not run since the component set changed.
    pub fn needs_setup(&self) -> bool {
        self.needs_setup
    }

    /// Run `before` then `after` for time step `index`.
    ///
    /// Steps only move forward within a run: `index` must be below the
    /// configured number of time steps and past the last completed step
    /// since `reset`.
    pub fn step(&mut self, index: usize) -> Result<(), LifecycleError> {
        let timesteps = self.config.timesteps;
        if index < self.next_step || index >= timesteps {
            return Err(LifecycleError::StepOutOfOrder {
                index,
                next: self.next_step,
                timesteps,
            });
        }
        self.clock.set_index(index);
        self.run_phase(Phase::Before)?;
        self.run_phase(Phase::After)?;
        self.next_step = index + 1;
        Ok(())
    }

    /// Run a full simulation: setup if needed, reset, every time step, finish.
    ///
    /// The first error aborts the run; `finish` is not called in that case.
    pub fn run(&mut self) -> Result<RunStats, LifecycleError> {
        let span = tracing::info_span!("run", model = self.id.raw());
        let _guard = span.enter();

        if self.needs_setup {
            self.run_phase(Phase::Setup)?;
        }
        self.clock.set_index(0);
        self.run_phase(Phase::Reset)?;

        let started = Instant::now();
        for index in 0..self.config.timesteps {
            self.step(index)?;
        }
        let elapsed = started.elapsed();

        self.run_phase(Phase::Finish)?;

        let stats = RunStats {
            timesteps: self.config.timesteps,
            scenarios: self.config.scenarios,
            elapsed,
        };
        tracing::info!(
            timesteps = stats.timesteps,
            speed = stats.speed(),
            "run complete"
        );
        Ok(stats)
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        for &id in self.graph.components() {
            self.id.retire(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CallLog, Failing, Probe};

    fn probe(model: &mut Model, log: &CallLog, name: &str) -> ComponentId {
        model.add_with(ComponentMeta::named(name), Probe::new(name, log.clone()))
    }

    #[test]
    fn add_registers_under_root() {
        let mut model = Model::default();
        let log = CallLog::default();
        let a = probe(&mut model, &log, "a");

        assert!(model.contains(a));
        assert_eq!(model.len(), 1);
        assert!(model.graph().has_edge(crate::id::Node::Root, a.into()));
        assert!(model.parents(a).unwrap().is_empty().unwrap());
        assert!(model.children(a).unwrap().is_empty().unwrap());
    }

    #[test]
    fn metadata_accessors() {
        let mut model = Model::default();
        let id = model.add_with(
            ComponentMeta::named("reservoir").with_comment("upper basin"),
            Probe::new("reservoir", CallLog::default()),
        );

        assert_eq!(model.name(id), Some("reservoir"));
        assert_eq!(model.comment(id), Some("upper basin"));
        assert_eq!(model.model_of(id).unwrap(), model.id());

        model.set_name(id, Some("lake".into())).unwrap();
        assert_eq!(model.name(id), Some("lake"));
        assert_eq!(model.find("lake"), Some(id));
        assert_eq!(model.find("reservoir"), None);
    }

    #[test]
    fn names_need_not_be_unique() {
        let mut model = Model::default();
        let log = CallLog::default();
        let first = probe(&mut model, &log, "twin");
        let _second = probe(&mut model, &log, "twin");
        assert_eq!(model.find("twin"), Some(first));
    }

    #[test]
    fn downcast_access() {
        let mut model = Model::default();
        let id = probe(&mut model, &CallLog::default(), "p");
        assert_eq!(model.get::<Probe>(id).unwrap().label(), "p");
        assert!(model.get::<Failing>(id).is_none());
        assert!(model.get_mut::<Probe>(id).is_some());
        assert!(model.component(id).is_some());
    }

    #[test]
    fn remove_cleans_graph() {
        let mut model = Model::default();
        let log = CallLog::default();
        let p = probe(&mut model, &log, "p");
        let c = probe(&mut model, &log, "c");
        let g = probe(&mut model, &log, "g");
        model.connect(p, c).unwrap();
        model.connect(c, g).unwrap();

        let removed = model.remove(c).unwrap();
        assert!(removed.as_any().downcast_ref::<Probe>().is_some());
        assert!(!model.contains(c));
        assert!(model.children(p).unwrap().is_empty().unwrap());
        assert!(model.parents(g).unwrap().is_empty().unwrap());

        model.run_phase(Phase::Setup).unwrap();
        assert_eq!(log.calls(), vec!["p.setup", "g.setup"]);

        assert!(matches!(model.remove(c), Err(ModelError::UnknownComponent(_))));
        assert!(matches!(model.children(c), Err(ModelError::UnknownComponent(_))));
    }

    #[test]
    fn run_phase_honors_dependencies() {
        let mut model = Model::default();
        let log = CallLog::default();
        let child = probe(&mut model, &log, "child");
        let parent = probe(&mut model, &log, "parent");
        model.parents(child).unwrap().add(parent).unwrap();

        model.run_phase(Phase::Before).unwrap();
        assert_eq!(log.calls(), vec!["parent.before", "child.before"]);
    }

    #[test]
    fn run_sequence() {
        let config = ModelConfig::new(2, 1);
        let mut model = Model::new(config).unwrap();
        let log = CallLog::default();
        probe(&mut model, &log, "a");

        let stats = model.run().unwrap();
        assert_eq!(stats.timesteps, 2);
        assert_eq!(
            log.calls(),
            vec![
                "a.setup", "a.reset", "a.before", "a.after", "a.before", "a.after", "a.finish"
            ]
        );
        assert!(!model.needs_setup());

        // A second run skips setup.
        log.clear();
        model.run().unwrap();
        assert_eq!(log.calls().first().map(String::as_str), Some("a.reset"));
    }

    #[test]
    fn adding_component_requires_setup_again() {
        let mut model = Model::default();
        let log = CallLog::default();
        probe(&mut model, &log, "a");
        model.run().unwrap();
        assert!(!model.needs_setup());

        probe(&mut model, &log, "b");
        assert!(model.needs_setup());
    }

    #[test]
    fn clock_advances_during_run() {
        let mut model = Model::new(ModelConfig::new(3, 2)).unwrap();
        let clock = model.clock();
        assert_eq!(clock.timesteps(), 3);
        assert_eq!(clock.scenarios(), 2);

        model.run().unwrap();
        assert_eq!(clock.index(), 2);
    }

    #[test]
    fn hook_error_aborts_run() {
        let mut model = Model::new(ModelConfig::new(5, 1)).unwrap();
        let log = CallLog::default();
        let a = probe(&mut model, &log, "a");
        let bad = model.add(Failing::on(Phase::Before, "bad input"));
        model.connect(a, bad).unwrap();

        let err = model.run().unwrap_err();
        assert_eq!(err.to_string(), "bad input");
        assert!(!log.calls().iter().any(|c| c.ends_with(".after")));
        assert!(!log.calls().iter().any(|c| c.ends_with(".finish")));
    }

    #[test]
    fn cycle_surfaces_from_run_phase() {
        let mut model = Model::default();
        let log = CallLog::default();
        let a = probe(&mut model, &log, "a");
        let b = probe(&mut model, &log, "b");
        model.connect(a, b).unwrap();
        model.connect(b, a).unwrap();

        let err = model.run_phase(Phase::Setup).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Graph(GraphError::CycleDetected(_))
        ));
        assert!(log.calls().is_empty());
        assert!(model.needs_setup());
    }

    #[test]
    fn handles_from_another_model_are_unknown() {
        let log = CallLog::default();
        let mut a = Model::default();
        let a0 = probe(&mut a, &log, "a0");
        let a1 = probe(&mut a, &log, "a1");
        let mut b = Model::default();
        let _b0 = probe(&mut b, &log, "b0");
        let b1 = probe(&mut b, &log, "b1");

        assert_ne!(a1, b1);
        assert!(!a.contains(b1));
        assert!(matches!(a.connect(a0, b1), Err(ModelError::UnknownComponent(id)) if id == b1));
        assert!(matches!(a.connect(b1, a0), Err(ModelError::UnknownComponent(id)) if id == b1));
        assert!(matches!(a.parents(b1), Err(ModelError::UnknownComponent(_))));
        assert!(matches!(a.model_of(b1), Err(ModelError::UnknownComponent(_))));
        assert!(a.children(a0).unwrap().is_empty().unwrap());
        assert!(a.parents(a1).unwrap().is_empty().unwrap());

        assert_eq!(a1.owner(), Some(a.id()));
        assert_eq!(b1.owner(), Some(b.id()));
        assert_eq!(b.model_of(b1).unwrap(), b.id());
    }

    #[test]
    fn removed_and_dropped_handles_lose_their_owner() {
        let log = CallLog::default();
        let mut model = Model::default();
        let kept = probe(&mut model, &log, "kept");
        let gone = probe(&mut model, &log, "gone");

        model.remove(gone).unwrap();
        assert_eq!(gone.owner(), None);
        assert_eq!(kept.owner(), Some(model.id()));

        drop(model);
        assert_eq!(kept.owner(), None);
    }

    #[test]
    fn steps_only_move_forward_within_range() {
        let mut model = Model::new(ModelConfig::new(6, 1)).unwrap();
        let log = CallLog::default();
        probe(&mut model, &log, "a");
        model.run_phase(Phase::Setup).unwrap();
        model.run_phase(Phase::Reset).unwrap();

        model.step(0).unwrap();
        model.step(5).unwrap();
        log.clear();

        let err = model.step(2).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::StepOutOfOrder { index: 2, next: 6, timesteps: 6 }
        ));
        assert!(matches!(
            model.step(6),
            Err(LifecycleError::StepOutOfOrder { index: 6, .. })
        ));
        assert!(log.calls().is_empty());
        assert_eq!(model.clock().index(), 5);

        // Reset rewinds.
        model.run_phase(Phase::Reset).unwrap();
        model.step(2).unwrap();
    }

    #[test]
    fn step_repeats_are_rejected() {
        let mut model = Model::new(ModelConfig::new(3, 1)).unwrap();
        model.run_phase(Phase::Reset).unwrap();
        model.step(1).unwrap();
        assert!(model.step(1).is_err());
    }

    #[test]
    fn invalid_config_rejected() {
        let err = Model::new(ModelConfig::new(0, 1)).unwrap_err();
        assert!(matches!(err, ModelError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn run_stats_speed() {
        let stats = RunStats {
            timesteps: 10,
            scenarios: 2,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(stats.speed(), 10.0);

        let instant = RunStats {
            elapsed: Duration::ZERO,
            ..stats
        };
        assert!(instant.speed().is_infinite());
    }
}
