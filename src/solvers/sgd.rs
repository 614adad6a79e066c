//! Stochastic gradient descent with momentum and weight decay
//!
//! Per weight element, with `g` the gradient averaged over the batch:
//!
//! `v = momentum × prev + learning_rate × decay_rate × w + learning_rate × g`
//!
//! then `prev = v` and `w -= v`.

use crate::solvers::UpdateRule;
use crate::tensor::Tensor;

/// SGD update rule.
///
/// # Fields
///
/// * `decay_rate` - Weight decay factor, scaled by the learning rate
/// * `momentum` - Fraction of the previous update carried into the next one
///
/// # Example
///
/// ```
/// use layernet::solvers::{Sgd, UpdateRule};
/// use layernet::tensor::Tensor;
///
/// let rule = Sgd::new(0.0, 0.0);
/// let mut weight = Tensor::from_vec([1, 1, 1, 1], vec![1.0]);
/// weight.deriv_mut()[0] = 2.0;
/// let mut prev = Tensor::new(1, 1, 1, 1);
///
/// rule.update(&mut weight, &mut prev, 0.1, 1);
/// assert!((weight.data()[0] - 0.8).abs() < 1e-6);
/// assert!((prev.data()[0] - 0.2).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sgd {
    decay_rate: f32,
    momentum: f32,
}

impl Sgd {
    pub fn new(decay_rate: f32, momentum: f32) -> Self {
        Self {
            decay_rate,
            momentum,
        }
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }
}

impl UpdateRule for Sgd {
    fn name(&self) -> &'static str {
        "sgd"
    }

    fn update(&self, weight: &mut Tensor, weight_prev: &mut Tensor, learning_rate: f32, batch_size: usize) {
        assert_eq!(
            weight.len(),
            weight_prev.len(),
            "weight and previous state must have the same length"
        );

        let batch = batch_size as f32;
        let (data, deriv) = weight.split_mut();
        let prev = weight_prev.data_mut();

        for ((w, &d), p) in data.iter_mut().zip(deriv.iter()).zip(prev.iter_mut()) {
            let dv = d / batch;
            let v = self.momentum * *p + *w * learning_rate * self.decay_rate + learning_rate * dv;
            *p = v;
            *w -= v;
        }
    }
}
