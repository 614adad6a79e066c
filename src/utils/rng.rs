//! Random tensor generation for weight initialization.
//!
//! Layers never reach for a global generator: the caller passes a [`TensorRng`]
//! into the constructors that need random weights, which keeps model assembly
//! reproducible from a seed.

use crate::error::LayerError;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Seedable generator producing Gaussian-filled tensors.
pub struct TensorRng {
    rng: StdRng,
}

impl TensorRng {
    /// Create a generator with an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// New tensor of the given size filled with independent N(mean, std²) samples.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::InvalidParameter`] if `std` is negative or not finite.
    pub fn gaussian(
        &mut self,
        width: usize,
        height: usize,
        channels: usize,
        batch: usize,
        mean: f32,
        std: f32,
    ) -> Result<Tensor, LayerError> {
        let normal = normal(mean, std)?;
        let len = width * height * channels * batch;
        let data = (0..len).map(|_| normal.sample(&mut self.rng)).collect();
        Ok(Tensor::from_vec([width, height, channels, batch], data))
    }
}

// `Normal::new` accepts a negative std and mirrors the samples.
fn normal(mean: f32, std: f32) -> Result<Normal<f32>, LayerError> {
    if !std.is_finite() || std < 0.0 {
        return Err(LayerError::InvalidParameter {
            key: "std".to_string(),
            reason: format!("standard deviation must be finite and non-negative, got {}", std),
        });
    }
    Normal::new(mean, std).map_err(|e| LayerError::InvalidParameter {
        key: "std".to_string(),
        reason: e.to_string(),
    })
}
