//! Run progress reporting.

use std::time::Instant;

use rill_core::component::{Component, ComponentError};
use rill_core::model::Clock;

/// One progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Whole percent of time steps completed.
    pub percent: usize,
    /// Time steps times scenarios per second since the previous report.
    /// `None` on the 0% report.
    pub speed: Option<f64>,
}

/// Reports whole-percent progress through a run.
///
/// A report is emitted as a `tracing` info event each time the completed
/// percentage increases. Attach it anywhere in the model; it only reads the
/// clock.
#[derive(Debug)]
pub struct ProgressRecorder {
    clock: Clock,
    last_percent: Option<usize>,
    last_index: usize,
    since: Option<Instant>,
    history: Vec<ProgressUpdate>,
}

impl ProgressRecorder {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            last_percent: None,
            last_index: 0,
            since: None,
            history: Vec::new(),
        }
    }

    pub fn last_update(&self) -> Option<ProgressUpdate> {
        self.history.last().copied()
    }

    /// Every report emitted in the current run.
    pub fn history(&self) -> &[ProgressUpdate] {
        &self.history
    }

    fn emit(&mut self, update: ProgressUpdate) {
        match update.speed {
            Some(speed) => tracing::info!(percent = update.percent, speed, "progress"),
            None => tracing::info!(percent = update.percent, "progress"),
        }
        self.history.push(update);
    }
}

impl Component for ProgressRecorder {
    fn setup(&mut self) -> Result<(), ComponentError> {
        self.last_percent = None;
        self.last_index = 0;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ComponentError> {
        self.last_percent = None;
        self.last_index = 0;
        self.history.clear();
        self.since = Some(Instant::now());
        Ok(())
    }

    fn after(&mut self) -> Result<(), ComponentError> {
        let since = self
            .since
            .ok_or_else(|| ComponentError::Invalid("progress recorder stepped before reset".into()))?;
        let index = self.clock.index();
        let total = self.clock.timesteps().max(1);
        let percent = ((index + 1) * 100 / total).min(100);

        if self.last_percent.is_some_and(|last| percent <= last) {
            return Ok(());
        }
        let speed = if percent >= 1 {
            let steps = index.checked_sub(self.last_index).ok_or_else(|| {
                ComponentError::Invalid(format!(
                    "clock moved back to step {index} after step {}",
                    self.last_index
                ))
            })? * self.clock.scenarios();
            let seconds = since.elapsed().as_secs_f64();
            Some(if seconds > 0.0 {
                steps as f64 / seconds
            } else {
                f64::INFINITY
            })
        } else {
            None
        };
        self.last_percent = Some(percent);
        self.emit(ProgressUpdate { percent, speed });

        self.since = Some(Instant::now());
        self.last_index = index;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_through(recorder: &mut ProgressRecorder, clock: &Clock) {
        recorder.reset().unwrap();
        for index in 0..clock.timesteps() {
            clock.set_index(index);
            recorder.after().unwrap();
        }
    }

    #[test]
    fn reports_each_percent_once() {
        let clock = Clock::new(200, 1);
        let mut recorder = ProgressRecorder::new(clock.clone());
        recorder.setup().unwrap();
        step_through(&mut recorder, &clock);

        let percents: Vec<usize> = recorder.history().iter().map(|u| u.percent).collect();
        assert_eq!(percents, (0..=100).collect::<Vec<_>>());
        assert_eq!(recorder.history()[0].speed, None);
        assert!(recorder.history()[1..].iter().all(|u| u.speed.is_some()));
    }

    #[test]
    fn short_runs_jump_percentages() {
        let clock = Clock::new(4, 2);
        let mut recorder = ProgressRecorder::new(clock.clone());
        step_through(&mut recorder, &clock);

        let percents: Vec<usize> = recorder.history().iter().map(|u| u.percent).collect();
        assert_eq!(percents, vec![25, 50, 75, 100]);
        assert_eq!(recorder.last_update().map(|u| u.percent), Some(100));
    }

    #[test]
    fn reset_starts_a_fresh_report() {
        let clock = Clock::new(2, 1);
        let mut recorder = ProgressRecorder::new(clock.clone());
        step_through(&mut recorder, &clock);
        step_through(&mut recorder, &clock);
        assert_eq!(recorder.history().len(), 2);
    }

    #[test]
    fn clock_moving_back_is_an_error() {
        let clock = Clock::new(10, 1);
        let mut recorder = ProgressRecorder::new(clock.clone());
        recorder.reset().unwrap();
        clock.set_index(5);
        recorder.after().unwrap();
        clock.set_index(8);
        recorder.after().unwrap();
        // A higher percentage reached from an earlier step.
        recorder.last_percent = Some(0);
        clock.set_index(2);
        assert!(matches!(recorder.after(), Err(ComponentError::Invalid(_))));
    }

    #[test]
    fn percent_never_exceeds_one_hundred() {
        let clock = Clock::new(4, 1);
        let mut recorder = ProgressRecorder::new(clock.clone());
        recorder.reset().unwrap();
        clock.set_index(9);
        recorder.after().unwrap();
        assert_eq!(recorder.last_update().map(|u| u.percent), Some(100));
    }

    #[test]
    fn after_without_reset_is_an_error() {
        let clock = Clock::new(2, 1);
        let mut recorder = ProgressRecorder::new(clock);
        assert!(matches!(recorder.after(), Err(ComponentError::Invalid(_))));
    }
}
