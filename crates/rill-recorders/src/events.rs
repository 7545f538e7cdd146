//! Discrete event tracking.
//!
//! An [`EventRecorder`] watches a per-scenario threshold and records a span
//! of time steps for as long as the threshold stays non-zero. An
//! [`EventDurationRecorder`] turns those spans into one value per scenario
//! at the end of a run.

use std::cell::RefCell;
use std::rc::Rc;

use rill_core::component::{Component, ComponentError, ComponentMeta};
use rill_core::id::ComponentId;
use rill_core::model::{Clock, Model, ModelError};
use rill_core::values::SharedValues;

use crate::RecorderError;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A span of time steps during which a threshold was active in one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub scenario: usize,
    /// Time step index at which the threshold first became active.
    pub start: usize,
    /// Time step index at which the event closed. `None` while open.
    pub end: Option<usize>,
}

impl Event {
    fn open(scenario: usize, start: usize) -> Self {
        Self {
            scenario,
            start,
            end: None,
        }
    }

    /// Length in time steps, once closed. `None` while open or if `end`
    /// precedes `start`.
    pub fn duration(&self) -> Option<usize> {
        self.end.and_then(|end| end.checked_sub(self.start))
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// Completed events, shared between an [`EventRecorder`] and its readers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventLog {
    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Copy of every recorded event, in completion order.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Durations of completed events, grouped by scenario. Scenarios at or
    /// beyond `scenarios` are dropped.
    pub fn durations_by_scenario(&self, scenarios: usize) -> Vec<Vec<usize>> {
        let mut grouped = vec![Vec::new(); scenarios];
        for event in self.events.borrow().iter() {
            if let (Some(bucket), Some(duration)) = (grouped.get_mut(event.scenario), event.duration()) {
                bucket.push(duration);
            }
        }
        grouped
    }
}

// ---------------------------------------------------------------------------
// EventRecorder
// ---------------------------------------------------------------------------

/// Records events while a threshold is non-zero.
///
/// An event opens on the first step the threshold is active and closes on
/// the first step it is not. Closed events shorter than
/// `minimum_event_length` steps are discarded, which filters out flicker
/// caused by hysteresis. Events still open when the run finishes are closed
/// at the final step and always kept.
#[derive(Debug)]
pub struct EventRecorder {
    clock: Clock,
    threshold: SharedValues,
    minimum_event_length: usize,
    log: EventLog,
    current: Vec<Option<Event>>,
}

impl EventRecorder {
    pub fn new(
        clock: Clock,
        threshold: SharedValues,
        minimum_event_length: usize,
    ) -> Result<Self, RecorderError> {
        if minimum_event_length < 1 {
            return Err(RecorderError::InvalidMinimumEventLength(minimum_event_length));
        }
        Ok(Self {
            clock,
            threshold,
            minimum_event_length,
            log: EventLog::default(),
            current: Vec::new(),
        })
    }

    /// Add a recorder to `model` that runs after `source`, the component
    /// publishing into `threshold`.
    pub fn attach(
        model: &mut Model,
        meta: ComponentMeta,
        source: ComponentId,
        threshold: SharedValues,
        minimum_event_length: usize,
    ) -> Result<ComponentId, RecorderError> {
        if !model.contains(source) {
            return Err(ModelError::UnknownComponent(source).into());
        }
        let clock = model.clock();
        let recorder = Self::new(clock, threshold, minimum_event_length)?;
        let id = model.add_with(meta, recorder);
        model.connect(source, id)?;
        Ok(id)
    }

    pub fn minimum_event_length(&self) -> usize {
        self.minimum_event_length
    }

    /// Handle on the completed events.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.events()
    }

    fn triggered(&self, scenario: usize) -> Result<bool, ComponentError> {
        self.threshold
            .get(scenario)
            .map(|value| value != 0.0)
            .ok_or_else(|| {
                ComponentError::Invalid(format!(
                    "threshold has {} values but scenario {scenario} was requested",
                    self.threshold.len()
                ))
            })
    }
}

/// Steps elapsed from `start` to `step`; an error if the clock went back.
fn rewound(step: usize, start: usize) -> Result<usize, ComponentError> {
    step.checked_sub(start).ok_or_else(|| {
        ComponentError::Invalid(format!(
            "clock moved back to step {step} while an event opened at step {start}"
        ))
    })
}

impl Component for EventRecorder {
    fn reset(&mut self) -> Result<(), ComponentError> {
        self.log.clear();
        self.current = vec![None; self.clock.scenarios()];
        Ok(())
    }

    fn after(&mut self) -> Result<(), ComponentError> {
        let step = self.clock.index();
        for scenario in 0..self.current.len() {
            let triggered = self.triggered(scenario)?;
            self.current[scenario] = match (self.current[scenario], triggered) {
                (Some(event), true) => Some(event),
                (Some(mut event), false) => {
                    let length = rewound(step, event.start)?;
                    event.end = Some(step);
                    if length >= self.minimum_event_length {
                        tracing::trace!(scenario, start = event.start, end = step, "event closed");
                        self.log.push(event);
                    }
                    None
                }
                (None, true) => Some(Event::open(scenario, step)),
                (None, false) => None,
            };
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ComponentError> {
        let step = self.clock.index();
        for slot in &mut self.current {
            if let Some(mut event) = slot.take() {
                rewound(step, event.start)?;
                event.end = Some(step);
                self.log.push(event);
            }
        }
        tracing::debug!(events = self.log.len(), "event recording finished");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// EventDurationRecorder
// ---------------------------------------------------------------------------

/// How per-scenario event durations are combined into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl Aggregation {
    /// Combine `durations`. Empty input yields 0.
    pub fn apply(self, durations: &[usize]) -> f64 {
        if durations.is_empty() {
            return 0.0;
        }
        let sum: usize = durations.iter().sum();
        match self {
            Aggregation::Sum => sum as f64,
            Aggregation::Mean => sum as f64 / durations.len() as f64,
            Aggregation::Min => durations.iter().copied().min().unwrap_or(0) as f64,
            Aggregation::Max => durations.iter().copied().max().unwrap_or(0) as f64,
            Aggregation::Count => durations.len() as f64,
        }
    }
}

/// Aggregates the durations found by an [`EventRecorder`], per scenario.
///
/// Values are computed in `finish`, so this recorder must be a child of the
/// event recorder it reads from; [`EventDurationRecorder::attach`] wires
/// that up. Scenarios without events report 0.
#[derive(Debug)]
pub struct EventDurationRecorder {
    clock: Clock,
    log: EventLog,
    aggregation: Aggregation,
    values: SharedValues,
}

impl EventDurationRecorder {
    pub fn new(clock: Clock, log: EventLog, aggregation: Aggregation) -> Self {
        Self {
            clock,
            log,
            aggregation,
            values: SharedValues::default(),
        }
    }

    /// Add a duration recorder to `model` reading from the event recorder
    /// `events`.
    pub fn attach(
        model: &mut Model,
        meta: ComponentMeta,
        events: ComponentId,
        aggregation: Aggregation,
    ) -> Result<ComponentId, RecorderError> {
        let log = model
            .get::<EventRecorder>(events)
            .map(EventRecorder::log)
            .ok_or(RecorderError::NotAnEventRecorder(events))?;
        let clock = model.clock();
        let id = model.add_with(meta, Self::new(clock, log, aggregation));
        model.connect(events, id)?;
        Ok(id)
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Handle on the per-scenario results.
    pub fn values(&self) -> SharedValues {
        self.values.clone()
    }
}

impl Component for EventDurationRecorder {
    fn setup(&mut self) -> Result<(), ComponentError> {
        self.values.replace(vec![0.0; self.clock.scenarios()]);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ComponentError> {
        self.values.fill(0.0);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ComponentError> {
        let grouped = self.log.durations_by_scenario(self.values.len());
        for (scenario, durations) in grouped.iter().enumerate() {
            self.values.set(scenario, self.aggregation.apply(durations));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
