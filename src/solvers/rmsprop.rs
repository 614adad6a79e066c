//! RMSprop with gradient clipping and L2 regularization
//!
//! Per weight element, with `g` the gradient averaged over the batch:
//!
//! 1. `prev = decay_rate × prev + (1 - decay_rate) × g²` (unclipped `g`)
//! 2. clip `g` into `[-gradient_clip, gradient_clip]`
//! 3. `w += -learning_rate × g / sqrt(prev + ε) - reg_strength × w`
//!
//! `ε` is `f32::EPSILON`, keeping the division finite when `prev` is zero.

use crate::solvers::UpdateRule;
use crate::tensor::Tensor;

/// RMSprop update rule.
///
/// # Fields
///
/// * `decay_rate` - Decay of the squared-gradient moving average (typical: 0.999)
/// * `reg_strength` - L2 regularization strength
/// * `gradient_clip` - Bound on the magnitude of the averaged gradient
#[derive(Debug, Clone, PartialEq)]
pub struct RmsProp {
    decay_rate: f32,
    reg_strength: f32,
    gradient_clip: f32,
}

impl RmsProp {
    pub fn new(decay_rate: f32, reg_strength: f32, gradient_clip: f32) -> Self {
        Self {
            decay_rate,
            reg_strength,
            gradient_clip,
        }
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    pub fn reg_strength(&self) -> f32 {
        self.reg_strength
    }

    pub fn gradient_clip(&self) -> f32 {
        self.gradient_clip
    }
}

impl UpdateRule for RmsProp {
    fn name(&self) -> &'static str {
        "rmsprop"
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
            // Adaptive rate from the unclipped gradient
            let mut dv = d / batch;
            *p = self.decay_rate * *p + (1.0 - self.decay_rate) * dv * dv;

            if dv > self.gradient_clip {
                dv = self.gradient_clip;
            } else if dv < -self.gradient_clip {
                dv = -self.gradient_clip;
            }

            *w += -learning_rate * (dv / (*p + f32::EPSILON).sqrt()) - self.reg_strength * *w;
        }
    }
}
