//! Shared utilities
//!
//! Gaussian tensor generation, the learning-rate schedule, and the diagnostic
//! trace sink.

pub mod lr_scheduler;
pub mod rng;
pub mod trace;

pub use lr_scheduler::{LRScheduler, Schedule, StepDecay};
pub use rng::TensorRng;
pub use trace::{Level, Trace};
