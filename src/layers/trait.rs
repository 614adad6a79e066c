//! Layer contracts
//!
//! This module defines the [`Layer`] trait every layer implements, the
//! [`Classifier`] extension for layers that also compute a loss, and the
//! execution [`State`] passed to each pass.

use crate::error::LayerError;
use crate::tensor::SharedTensor;

/// Execution mode handed to every pass.
///
/// None of the current layers behave differently between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Train,
    Test,
}

/// Core trait for neural network layers.
///
/// A layer references its input tensors (shared, produced elsewhere), owns its
/// weight tensors (possibly none) and owns at least one output tensor. Weights and
/// outputs are allocated once, at construction, and reused for every batch.
///
/// # Pass contract
///
/// - `forward` reads input and weight *values* and writes output *values*. It
///   never touches derivative buffers and may be called repeatedly.
/// - `backward` reads output *derivatives* and input/weight *values*, and **adds**
///   into input and weight derivative buffers. Several layers may share an input,
///   so each contributes its part; the caller zeroes derivatives before the first
///   `backward` of a batch (see [`crate::model::Model::clear_deriv`]).
///
/// # Example
///
/// ```ignore
/// layer.forward(State::Train);
/// // ... seed output derivatives ...
/// layer.backward(State::Train);
/// ```
pub trait Layer {
    /// Layer name, used in diagnostics and lookups.
    fn name(&self) -> &str;

    /// Input tensors, in the order given at construction.
    fn inputs(&self) -> &[SharedTensor];

    /// Learnable weight tensors, in a fixed order.
    fn weights(&self) -> &[SharedTensor];

    /// Output tensors.
    fn outputs(&self) -> &[SharedTensor];

    /// Forward propagation.
    fn forward(&mut self, state: State);

    /// Backward propagation, accumulating derivatives.
    fn backward(&mut self, state: State);

    /// The classifier view of this layer, if it computes a loss.
    fn as_classifier(&self) -> Option<&dyn Classifier> {
        None
    }

    /// Number of learnable scalars.
    fn parameter_count(&self) -> usize {
        self.weights().iter().map(|w| w.borrow().len()).sum()
    }
}

/// A layer taking activations and ground-truth labels and producing a loss.
///
/// Classifiers always have exactly two inputs: the activations and a labels
/// tensor holding one label per batch element. The loss is reset at the start of
/// every `backward` and accumulated over the batch.
pub trait Classifier: Layer {
    /// Loss computed by the last backward pass.
    fn loss(&self) -> f32;
}

/// Validates the input arity of a layer.
pub(crate) fn check_inputs(
    name: &str,
    inputs: &[SharedTensor],
    expected: usize,
) -> Result<(), LayerError> {
    if inputs.len() != expected {
        let plural = if expected == 1 { "input" } else { "inputs" };
        return Err(LayerError::configuration(
            name,
            format!("must have {} {}, got {}", expected, plural, inputs.len()),
        ));
    }
    Ok(())
}
