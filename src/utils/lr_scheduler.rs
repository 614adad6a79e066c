//! Learning rate schedule and training cadence
//!
//! [`Schedule`] carries the scalar settings a solver is created with: the base
//! learning rate, the step-decay interval and factor, and the print/test/save
//! cadences a training loop consults. [`StepDecay`] is the stateful form of the
//! same decay, driven through the [`LRScheduler`] trait.

use serde::{Deserialize, Serialize};

/// Core trait for learning rate schedulers.
///
/// # Example
///
/// ```
/// use layernet::utils::lr_scheduler::{LRScheduler, StepDecay};
///
/// let mut scheduler = StepDecay::new(0.1, 2, 0.5);
/// for _ in 0..2 {
///     scheduler.step();
/// }
/// assert!((scheduler.get_lr() - 0.05).abs() < 1e-7);
///
/// scheduler.reset();
/// assert_eq!(scheduler.get_lr(), 0.1);
/// ```
pub trait LRScheduler {
    /// Learning rate for the current step.
    fn get_lr(&self) -> f32;

    /// Advances to the next step and recomputes the learning rate.
    fn step(&mut self);

    /// Returns to step zero and the initial learning rate.
    fn reset(&mut self);
}

/// Step decay: `lr = initial_lr * gamma^(step / step_size)`.
///
/// A `step_size` of zero never decays.
///
/// # Fields
///
/// * `initial_lr` - Starting learning rate
/// * `step_size` - Number of steps between decays
/// * `gamma` - Multiplicative factor applied at each decay
/// * `current_step` - Steps taken so far
/// * `current_lr` - Current learning rate value
#[derive(Debug, Clone, PartialEq)]
pub struct StepDecay {
    initial_lr: f32,
    step_size: usize,
    gamma: f32,
    current_step: usize,
    current_lr: f32,
}

impl StepDecay {
    pub fn new(initial_lr: f32, step_size: usize, gamma: f32) -> Self {
        Self {
            initial_lr,
            step_size,
            gamma,
            current_step: 0,
            current_lr: initial_lr,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }
}

impl LRScheduler for StepDecay {
    fn get_lr(&self) -> f32 {
        self.current_lr
    }

    fn step(&mut self) {
        self.current_step += 1;
        self.current_lr = decayed(self.initial_lr, self.gamma, self.step_size, self.current_step);
    }

    fn reset(&mut self) {
        self.current_step = 0;
        self.current_lr = self.initial_lr;
    }
}

fn decayed(base: f32, gamma: f32, step_size: usize, step: usize) -> f32 {
    if step_size == 0 {
        return base;
    }
    let num_decays = step / step_size;
    base * gamma.powi(num_decays as i32)
}

fn one() -> f32 {
    1.0
}

/// Solver schedule settings.
///
/// Cadences of zero disable the matching action. Deserializes from the same
/// keys it exposes; every field except `learning_rate` has a default.
///
/// # Example
///
/// ```
/// use layernet::utils::lr_scheduler::Schedule;
///
/// let schedule = Schedule {
///     lr_scale_each: 100,
///     lr_scale: 0.5,
///     print_each: 10,
///     ..Schedule::new(0.1)
/// };
/// assert_eq!(schedule.learning_rate_at(99), 0.1);
/// assert_eq!(schedule.learning_rate_at(250), 0.025);
/// assert!(schedule.should_print(20));
/// assert!(!schedule.should_test(20));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub learning_rate: f32,
    #[serde(default)]
    pub print_each: usize,
    #[serde(default)]
    pub test_each: usize,
    #[serde(default)]
    pub save_each: usize,
    #[serde(default)]
    pub lr_scale_each: usize,
    #[serde(default = "one")]
    pub lr_scale: f32,
}

impl Schedule {
    /// Constant learning rate with every cadence disabled.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            print_each: 0,
            test_each: 0,
            save_each: 0,
            lr_scale_each: 0,
            lr_scale: 1.0,
        }
    }

    /// Learning rate to use at `step`.
    pub fn learning_rate_at(&self, step: usize) -> f32 {
        decayed(self.learning_rate, self.lr_scale, self.lr_scale_each, step)
    }

    pub fn should_print(&self, step: usize) -> bool {
        due(self.print_each, step)
    }

    pub fn should_test(&self, step: usize) -> bool {
        due(self.test_each, step)
    }

    pub fn should_save(&self, step: usize) -> bool {
        due(self.save_each, step)
    }

    /// Stateful scheduler starting from this schedule's base rate.
    pub fn scheduler(&self) -> StepDecay {
        StepDecay::new(self.learning_rate, self.lr_scale_each, self.lr_scale)
    }
}

fn due(each: usize, step: usize) -> bool {
    each != 0 && step > 0 && step % each == 0
}
