//! Robustness controllers: stateful transforms from raw to effective
//! robustness.

use std::fmt;
use std::sync::Arc;

/// Transform applied to the raw robustness value of a constraint.
///
/// The preview path (`preview`) is pure and safe to call from worker
/// threads; the advance path (`advance`) moves the controller's internal
/// state forward and is reserved for the once-per-iteration state update
/// on the coordinator thread.
pub enum RobustnessController<I, O> {
    /// Return the raw robustness unchanged.
    Identity,
    /// Spread the error linearly with respect to the time progressed.
    TimeProgressLinear(TimeProgressLinear<I, O>),
}

impl<I, O> RobustnessController<I, O> {
    /// Apply the transform without changing controller state.
    pub fn preview(&self, raw: f64, input: &I, output: &O) -> f64 {
        match self {
            Self::Identity => raw,
            Self::TimeProgressLinear(c) => c.effective(raw, (c.time_fn)(input, output)),
        }
    }

    /// Apply the transform and advance the controller state.
    pub fn advance(&mut self, raw: f64, input: &I, output: &O) -> f64 {
        match self {
            Self::Identity => raw,
            Self::TimeProgressLinear(c) => {
                let current_time = (c.time_fn)(input, output);
                c.advance(raw, current_time)
            }
        }
    }
}

impl<I, O> Clone for RobustnessController<I, O> {
    /// Cloning starts a fresh trajectory: accumulated state is reset so
    /// each evaluation stream advances its own controller.
    fn clone(&self) -> Self {
        match self {
            Self::Identity => Self::Identity,
            Self::TimeProgressLinear(c) => Self::TimeProgressLinear(TimeProgressLinear {
                time_fn: Arc::clone(&c.time_fn),
                final_time: c.final_time,
                previous_time: 0.0,
                accumulated: 0.0,
            }),
        }
    }
}

impl<I, O> fmt::Debug for RobustnessController<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::TimeProgressLinear(c) => f
                .debug_struct("TimeProgressLinear")
                .field("final_time", &c.final_time)
                .field("previous_time", &c.previous_time)
                .field("accumulated", &c.accumulated)
                .finish(),
        }
    }
}

/// Controller that discounts robustness by the error accumulated per unit
/// of progressed time.
///
/// On each advance with current time `t`, the effective robustness is
/// `r - (t - t_prev) * A`; the accumulator then grows by
/// `effective / (t_final - t)`.
pub struct TimeProgressLinear<I, O> {
    time_fn: Arc<dyn Fn(&I, &O) -> f64 + Send + Sync>,
    final_time: f64,
    previous_time: f64,
    accumulated: f64,
}

impl<I, O> TimeProgressLinear<I, O> {
    pub fn new(
        time_fn: impl Fn(&I, &O) -> f64 + Send + Sync + 'static,
        final_time: f64,
    ) -> Self {
        Self {
            time_fn: Arc::new(time_fn),
            final_time,
            previous_time: 0.0,
            accumulated: 0.0,
        }
    }

    fn effective(&self, raw: f64, current_time: f64) -> f64 {
        raw - (current_time - self.previous_time) * self.accumulated
    }

    fn advance(&mut self, raw: f64, current_time: f64) -> f64 {
        let result = self.effective(raw, current_time);
        self.previous_time = current_time;
        self.accumulated += result / (self.final_time - current_time);
        result
    }
}

impl<I, O> From<TimeProgressLinear<I, O>> for RobustnessController<I, O> {
    fn from(controller: TimeProgressLinear<I, O>) -> Self {
        Self::TimeProgressLinear(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> RobustnessController<f64, f64> {
        TimeProgressLinear::new(|_input: &f64, output: &f64| *output, 10.0).into()
    }

    #[test]
    fn identity_paths_agree() {
        let mut controller: RobustnessController<f64, f64> = RobustnessController::Identity;
        assert_eq!(controller.preview(1.5, &0.0, &0.0), 1.5);
        assert_eq!(controller.advance(1.5, &0.0, &0.0), 1.5);
    }

    #[test]
    fn time_progress_discounts_by_accumulated_error() {
        let mut controller = linear();
        // Times 0, 1, 2; raw robustness 2.0 each step.
        assert_eq!(controller.advance(2.0, &0.0, &0.0), 2.0);
        assert!((controller.advance(2.0, &0.0, &1.0) - 1.8).abs() < 1e-12);
        assert!((controller.advance(2.0, &0.0, &2.0) - 1.6).abs() < 1e-12);
    }

    #[test]
    fn preview_leaves_state_untouched() {
        let mut controller = linear();
        controller.advance(2.0, &0.0, &0.0);
        // Any number of previews between advances changes nothing.
        let previewed = controller.preview(2.0, &0.0, &1.0);
        assert!((previewed - 1.8).abs() < 1e-12);
        assert!((controller.preview(2.0, &0.0, &1.0) - 1.8).abs() < 1e-12);
        assert!((controller.advance(2.0, &0.0, &1.0) - 1.8).abs() < 1e-12);
    }

    #[test]
    fn clone_resets_the_trajectory() {
        let mut controller = linear();
        controller.advance(2.0, &0.0, &0.0);
        controller.advance(2.0, &0.0, &1.0);
        let mut fresh = controller.clone();
        assert_eq!(fresh.advance(2.0, &0.0, &0.0), 2.0);
    }
}
