//! Solvers: gradient-to-weight update rules
//!
//! A [`Solver`] is invoked once per mini-batch, after a full forward and backward
//! sweep over a [`Model`]. It walks the model's weights, hands each one to its
//! [`UpdateRule`] together with a solver-owned "previous state" tensor of the same
//! size, and finally clears every derivative buffer of the model so the next
//! batch starts accumulating from zero.
//!
//! # Available Update Rules
//!
//! - [`Sgd`]: gradient descent with momentum and weight decay
//! - [`RmsProp`]: RMSprop with gradient clipping and L2 regularization
//!
//! # Example
//!
//! ```ignore
//! use layernet::solvers::Solver;
//! use layernet::utils::lr_scheduler::Schedule;
//!
//! let mut solver = Solver::sgd(Schedule::new(0.01), 0.0005, 0.9);
//! for step in 0..num_steps {
//!     model.forward(State::Train);
//!     model.backward(State::Train);
//!     solver.learn(Some(&model), solver.schedule().learning_rate_at(step));
//! }
//! ```

pub mod rmsprop;
pub mod sgd;

pub use rmsprop::RmsProp;
pub use sgd::Sgd;

use crate::model::Model;
use crate::tensor::{SharedTensor, Tensor};
use crate::utils::lr_scheduler::Schedule;
use tracing::{debug, info};

/// Per-weight update rule.
///
/// `update` reads the weight's values and derivatives, reads and writes the
/// paired previous-state tensor, and writes new weight values. It must not clear
/// the derivative; the solver does that once for the whole model.
pub trait UpdateRule {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Applies the rule to one weight.
    ///
    /// # Arguments
    ///
    /// * `weight` - Weight tensor; its derivative holds the gradient summed over the batch
    /// * `weight_prev` - Solver state paired with this weight (same size)
    /// * `learning_rate` - Step size for this update
    /// * `batch_size` - Number of samples the derivative was summed over
    ///
    /// # Panics
    ///
    /// Implementations panic if `weight` and `weight_prev` have different lengths.
    fn update(&self, weight: &mut Tensor, weight_prev: &mut Tensor, learning_rate: f32, batch_size: usize);
}

/// Gradient-descent solver.
///
/// Holds the schedule, one update rule, and the previous-state tensors paired by
/// index with [`Model::weights`]. The state is allocated (zeroed) the first time a
/// model is bound, and again if the weight list no longer matches it.
pub struct Solver {
    schedule: Schedule,
    rule: Box<dyn UpdateRule>,
    weight_prev: Vec<Tensor>,
}

impl Solver {
    pub fn new(schedule: Schedule, rule: Box<dyn UpdateRule>) -> Self {
        Self {
            schedule,
            rule,
            weight_prev: Vec::new(),
        }
    }

    /// SGD with momentum and weight decay.
    pub fn sgd(schedule: Schedule, decay_rate: f32, momentum: f32) -> Self {
        Self::new(schedule, Box::new(Sgd::new(decay_rate, momentum)))
    }

    /// RMSprop with gradient clipping and L2 regularization.
    pub fn rmsprop(schedule: Schedule, decay_rate: f32, reg_strength: f32, gradient_clip: f32) -> Self {
        Self::new(
            schedule,
            Box::new(RmsProp::new(decay_rate, reg_strength, gradient_clip)),
        )
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Name of the update rule.
    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// Previous-state tensors, paired by index with the bound model's weights.
    pub fn weight_prev(&self) -> &[Tensor] {
        &self.weight_prev
    }

    /// Drops the previous-state tensors; they are reallocated on the next `learn`.
    pub fn reset(&mut self) {
        self.weight_prev.clear();
    }

    /// Updates every weight of `model`, then clears all of its derivatives.
    ///
    /// Does nothing when `model` is `None`. Derivatives are cleared exactly once,
    /// after every weight has been updated.
    pub fn learn(&mut self, model: Option<&Model>, learning_rate: f32) {
        let Some(model) = model else {
            return;
        };

        let weights = model.weights();
        self.bind(&weights);

        let batch_size = model.batch_size();
        debug!(
            rule = self.rule.name(),
            weights = weights.len(),
            batch_size,
            learning_rate,
            "learn"
        );
        for (weight, weight_prev) in weights.iter().zip(self.weight_prev.iter_mut()) {
            self.rule
                .update(&mut weight.borrow_mut(), weight_prev, learning_rate, batch_size);
        }

        model.clear_deriv();
    }

    fn bind(&mut self, weights: &[SharedTensor]) {
        let matches = self.weight_prev.len() == weights.len()
            && self
                .weight_prev
                .iter()
                .zip(weights)
                .all(|(prev, weight)| prev.size() == weight.borrow().size());
        if matches {
            return;
        }

        self.weight_prev = weights
            .iter()
            .map(|weight| Tensor::with_size(weight.borrow().size()))
            .collect();
        info!(
            rule = self.rule.name(),
            tensors = self.weight_prev.len(),
            "allocated solver state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{InnerProductLayer, Layer, ScaleLayer, State};
    use crate::param::Param;
    use crate::utils::TensorRng;

    fn model() -> Model {
        let input = Tensor::from_vec([1, 1, 2, 2], vec![1.0, -1.0, 0.5, 2.0]).into_shared();
        let mut model = Model::new("net", input.clone(), None);
        let mut rng = TensorRng::new(5);
        let fc = InnerProductLayer::new("fc", vec![input], &Param::new().with("num_output", 3), &mut rng)
            .unwrap();
        let out = fc.outputs()[0].clone();
        model.add_layer(Box::new(fc));
        model.add_layer(Box::new(ScaleLayer::new("scale", vec![out], &Param::new()).unwrap()));
        model
    }

    fn seed_output_deriv(model: &Model) {
        let output = model.output().unwrap();
        output.borrow_mut().deriv_mut().iter_mut().for_each(|d| *d = 1.0);
    }

    #[test]
    fn test_learn_without_model_is_noop() {
        let mut solver = Solver::sgd(Schedule::new(0.1), 0.0, 0.9);
        solver.learn(None, 0.1);
        assert!(solver.weight_prev().is_empty());
    }

    #[test]
    fn test_state_allocated_to_match_weights() {
        let mut model = model();
        let mut solver = Solver::sgd(Schedule::new(0.1), 0.0, 0.9);

        model.forward(State::Train);
        solver.learn(Some(&model), 0.1);

        let sizes: Vec<[usize; 4]> = solver.weight_prev().iter().map(|t| t.size()).collect();
        let expected: Vec<[usize; 4]> = model.weights().iter().map(|w| w.borrow().size()).collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn test_learn_clears_every_derivative() {
        let mut model = model();
        let mut solver = Solver::rmsprop(Schedule::new(0.01), 0.999, 0.0, 5.0);

        model.forward(State::Train);
        seed_output_deriv(&model);
        model.backward(State::Train);
        solver.learn(Some(&model), 0.01);

        for w in model.weights() {
            assert!(w.borrow().deriv().iter().all(|&d| d == 0.0));
        }
        for layer in model.layers() {
            for t in layer.inputs().iter().chain(layer.outputs()) {
                assert!(t.borrow().deriv().iter().all(|&d| d == 0.0));
            }
        }
    }

    #[test]
    fn test_learn_moves_weights() {
        let mut model = model();
        let mut solver = Solver::sgd(Schedule::new(0.1), 0.0, 0.0);
        let before: Vec<Tensor> = model.weights().iter().map(|w| w.borrow().clone()).collect();

        model.forward(State::Train);
        seed_output_deriv(&model);
        model.backward(State::Train);
        solver.learn(Some(&model), 0.1);

        let after: Vec<Tensor> = model.weights().iter().map(|w| w.borrow().clone()).collect();
        for (b, a) in before.iter().zip(after.iter()) {
            assert_ne!(b.data(), a.data());
        }
    }

    #[test]
    fn test_reset_drops_state() {
        let model = model();
        let mut solver = Solver::sgd(Schedule::new(0.1), 0.0, 0.9);
        solver.learn(Some(&model), 0.1);
        assert_eq!(solver.weight_prev().len(), 4);

        solver.reset();
        assert!(solver.weight_prev().is_empty());
        assert_eq!(solver.rule_name(), "sgd");
    }
}
