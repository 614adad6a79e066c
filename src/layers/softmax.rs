//! Softmax classifier with negative log-likelihood loss
//!
//! Forward normalizes each batch element's activations into a probability
//! distribution. Backward seeds the derivative of the activations with the
//! combined softmax + cross-entropy gradient, `softmax(x) - onehot(label)`, and
//! accumulates `-ln(p[label])` into the loss.

use crate::error::LayerError;
use crate::layers::r#trait::{check_inputs, Classifier, Layer, State};
use crate::tensor::{SharedTensor, Tensor};

/// Softmax classifier layer.
///
/// Takes two inputs: the activations `[w, h, c, batch]` and a labels tensor holding
/// one class index per batch element (stored as `f32`, truncated to an index).
/// The output has the size of the activations.
///
/// # Example
///
/// ```
/// use layernet::layers::{Classifier, Layer, SoftMaxLayer, State};
/// use layernet::tensor::Tensor;
///
/// let logits = Tensor::from_vec([1, 1, 3, 1], vec![0.0, 0.0, 0.0]).into_shared();
/// let labels = Tensor::from_vec([1, 1, 1, 1], vec![0.0]).into_shared();
/// let mut layer = SoftMaxLayer::new("prob", vec![logits, labels]).unwrap();
///
/// layer.forward(State::Train);
/// layer.backward(State::Train);
/// assert!((layer.loss() - 3.0f32.ln()).abs() < 1e-6);
/// ```
pub struct SoftMaxLayer {
    name: String,
    inputs: Vec<SharedTensor>,
    weights: Vec<SharedTensor>,
    outputs: Vec<SharedTensor>,
    loss: f32,
}

impl SoftMaxLayer {
    /// Creates the classifier over `[activations, labels]`.
    ///
    /// # Errors
    ///
    /// [`LayerError::InvalidLayerConfiguration`] unless there are exactly two
    /// inputs and the labels tensor holds at least one value per batch element.
    pub fn new(name: &str, inputs: Vec<SharedTensor>) -> Result<Self, LayerError> {
        check_inputs(name, &inputs, 2)?;

        let size = inputs[0].borrow().size();
        let num_labels = inputs[1].borrow().len();
        if num_labels < size[3] {
            return Err(LayerError::configuration(
                name,
                format!(
                    "labels hold {} values for a batch of {}",
                    num_labels, size[3]
                ),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            inputs,
            weights: Vec::new(),
            outputs: vec![Tensor::with_size(size).into_shared()],
            loss: 0.0,
        })
    }

    /// Most probable class of every batch element, from the last forward pass.
    pub fn predictions(&self) -> Vec<usize> {
        let output = self.outputs[0].borrow();
        let data_size = output.sample_len();
        if data_size == 0 {
            return Vec::new();
        }

        output
            .data()
            .chunks(data_size)
            .map(|probs| {
                probs
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &p)| {
                        if p > best.1 {
                            (i, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }
}

impl Layer for SoftMaxLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn inputs(&self) -> &[SharedTensor] {
        &self.inputs
    }

    fn weights(&self) -> &[SharedTensor] {
        &self.weights
    }

    fn outputs(&self) -> &[SharedTensor] {
        &self.outputs
    }

    fn forward(&mut self, _state: State) {
        let input = self.inputs[0].borrow();
        let mut output = self.outputs[0].borrow_mut();

        let data_size = output.sample_len();
        if data_size == 0 {
            return;
        }
        let batch_size = output.batch();
        let in_data = input.data();
        let out_data = output.data_mut();

        for batch in 0..batch_size {
            let range = batch * data_size..(batch + 1) * data_size;
            let x = &in_data[range.clone()];
            let y = &mut out_data[range];

            // Shift by the max so exp never overflows
            let val_max = x.iter().copied().fold(x[0], f32::max);

            // out = norm(exp(in - max))
            let mut sum = 0.0f32;
            for (out, &v) in y.iter_mut().zip(x) {
                *out = (v - val_max).exp();
                sum += *out;
            }
            let inv_sum = 1.0 / sum;
            y.iter_mut().for_each(|out| *out *= inv_sum);
        }
    }

    /// Seeds the activation derivatives with `softmax - onehot(label)`.
    ///
    /// This is the first backward pass of a sweep: the activation derivative is
    /// overwritten with the softmax output rather than accumulated into.
    ///
    /// # Panics
    ///
    /// Panics if a label is negative, not a number, or not below the number of
    /// classes.
    fn backward(&mut self, _state: State) {
        let mut input = self.inputs[0].borrow_mut();
        let labels = self.inputs[1].borrow();
        let output = self.outputs[0].borrow();

        let data_size = output.sample_len();
        let batch_size = output.batch();
        let out_data = output.data();
        let in_deriv = input.deriv_mut();
        let label_data = labels.data();

        in_deriv.copy_from_slice(out_data);
        self.loss = 0.0;
        for batch in 0..batch_size {
            let label = label_data[batch];
            assert!(
                label >= 0.0 && (label as usize) < data_size,
                "layer '{}': label {} of batch element {} is outside [0, {})",
                self.name,
                label,
                batch,
                data_size
            );
            let index = batch * data_size + label as usize;
            in_deriv[index] -= 1.0;
            self.loss -= out_data[index].ln();
        }
    }

    fn as_classifier(&self) -> Option<&dyn Classifier> {
        Some(self)
    }
}

impl Classifier for SoftMaxLayer {
    fn loss(&self) -> f32 {
        self.loss
    }
}
