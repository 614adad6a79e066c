//! Solver configuration
//!
//! This module parses solver settings from JSON files and turns them into a
//! ready [`Solver`]. The schedule keys sit at the top level next to the
//! solver-specific ones.

use crate::solvers::Solver;
use crate::utils::lr_scheduler::Schedule;
use serde::Deserialize;
use std::error::Error;
use std::fs;
use tracing::info;

/// Solver types accepted in `solver_type`.
pub const SOLVER_TYPES: [&str; 2] = ["sgd", "rmsprop"];

/// Configuration for a solver.
///
/// Fields not used by the selected solver are ignored. Defaults:
///
/// - **sgd**: `decay_rate` 0, `momentum` 0
/// - **rmsprop**: `decay_rate` 0.999, `reg_strength` 0, `gradient_clip` 5
///
/// Schedule defaults: every cadence 0 (never), `lr_scale` 1.
///
/// # Example
///
/// ```json
/// {
///   "solver_type": "sgd",
///   "learning_rate": 0.01,
///   "lr_scale_each": 1000,
///   "lr_scale": 0.5,
///   "print_each": 100,
///   "decay_rate": 0.0005,
///   "momentum": 0.9
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    /// Type of solver: "sgd" or "rmsprop"
    pub solver_type: String,

    /// Base learning rate, decay interval and the training cadences
    #[serde(flatten)]
    pub schedule: Schedule,

    /// SGD weight decay, or RMSprop squared-gradient decay
    pub decay_rate: Option<f32>,

    /// SGD momentum
    pub momentum: Option<f32>,

    /// RMSprop L2 regularization strength
    pub reg_strength: Option<f32>,

    /// RMSprop gradient clipping bound
    pub gradient_clip: Option<f32>,
}

impl SolverConfig {
    /// Decay rate with the solver-specific default applied.
    pub fn decay_rate(&self) -> f32 {
        match self.solver_type.to_lowercase().as_str() {
            "rmsprop" => self.decay_rate.unwrap_or(0.999),
            _ => self.decay_rate.unwrap_or(0.0),
        }
    }

    pub fn momentum(&self) -> f32 {
        self.momentum.unwrap_or(0.0)
    }

    pub fn reg_strength(&self) -> f32 {
        self.reg_strength.unwrap_or(0.0)
    }

    pub fn gradient_clip(&self) -> f32 {
        self.gradient_clip.unwrap_or(5.0)
    }
}

/// Loads a solver configuration from a JSON file.
///
/// # Returns
///
/// `Ok(SolverConfig)` on success, or an error if the file cannot be read, the
/// JSON is invalid, or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use layernet::config::load_solver_config;
///
/// let cfg = load_solver_config("config/solver_sgd.json").unwrap();
/// assert_eq!(cfg.solver_type, "sgd");
/// ```
pub fn load_solver_config(path: &str) -> Result<SolverConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: SolverConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(msg: impl Into<String>) -> Box<dyn Error> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into()))
}

fn validate_config(config: &SolverConfig) -> Result<(), Box<dyn Error>> {
    let solver_type = config.solver_type.to_lowercase();
    if !SOLVER_TYPES.contains(&solver_type.as_str()) {
        return Err(invalid(format!(
            "Invalid solver type '{}'. Must be one of: {}",
            config.solver_type,
            SOLVER_TYPES.join(", ")
        )));
    }

    let schedule = &config.schedule;
    if schedule.learning_rate < 0.0 {
        return Err(invalid("learning_rate must be non-negative"));
    }
    if schedule.lr_scale < 0.0 {
        return Err(invalid("lr_scale must be non-negative"));
    }

    if let Some(decay_rate) = config.decay_rate {
        if !(0.0..=1.0).contains(&decay_rate) {
            return Err(invalid("decay_rate must lie in [0, 1]"));
        }
    }

    if let Some(momentum) = config.momentum {
        if momentum < 0.0 {
            return Err(invalid("momentum must be non-negative"));
        }
    }

    if let Some(reg_strength) = config.reg_strength {
        if reg_strength < 0.0 {
            return Err(invalid("reg_strength must be non-negative"));
        }
    }

    if let Some(gradient_clip) = config.gradient_clip {
        if gradient_clip < 0.0 {
            return Err(invalid("gradient_clip must be non-negative"));
        }
    }

    Ok(())
}

/// Builds the solver described by `config`.
///
/// # Errors
///
/// Returns an error if the configuration does not validate.
pub fn build_solver(config: &SolverConfig) -> Result<Solver, Box<dyn Error>> {
    validate_config(config)?;

    let schedule = config.schedule.clone();
    let solver = match config.solver_type.to_lowercase().as_str() {
        "rmsprop" => Solver::rmsprop(
            schedule,
            config.decay_rate(),
            config.reg_strength(),
            config.gradient_clip(),
        ),
        _ => Solver::sgd(schedule, config.decay_rate(), config.momentum()),
    };

    info!(
        solver = solver.rule_name(),
        learning_rate = config.schedule.learning_rate,
        "solver built"
    );
    Ok(solver)
}
