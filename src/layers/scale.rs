//! Scale layer: learnable per-channel affine transform
//!
//! Each channel `c` has its own scale and (optionally) bias, shared by every
//! spatial position and every batch element:
//!
//! `out = scale[c] × in + bias[c]`
//!
//! Because the weights are shared across the whole channel slab, their gradients
//! are sums over every spatial index of every batch element.

use crate::error::LayerError;
use crate::layers::r#trait::{check_inputs, Layer, State};
use crate::param::Param;
use crate::tensor::{SharedTensor, Tensor};

/// Per-channel scale and bias.
///
/// # Shapes
///
/// * input and output: `[w, h, channels, batch]`
/// * scale (weight 0): `[1, 1, channels, 1]`, initialized to 1
/// * bias (weight 1, present iff `use_bias`): `[1, 1, channels, 1]`, initialized to 0
///
/// # Example
///
/// ```
/// use layernet::layers::{Layer, ScaleLayer, State};
/// use layernet::param::Param;
/// use layernet::tensor::Tensor;
///
/// let input = Tensor::from_vec([1, 1, 2, 1], vec![4.0, -3.0]).into_shared();
/// let mut layer = ScaleLayer::new("scale", vec![input], &Param::new()).unwrap();
/// layer.forward(State::Train);
/// // Identity until trained
/// assert_eq!(layer.outputs()[0].borrow().data(), &[4.0, -3.0]);
/// ```
pub struct ScaleLayer {
    name: String,
    inputs: Vec<SharedTensor>,
    weights: Vec<SharedTensor>,
    outputs: Vec<SharedTensor>,
}

impl ScaleLayer {
    /// Creates the layer with unit scale and zero bias.
    ///
    /// # Errors
    ///
    /// [`LayerError::InvalidLayerConfiguration`] unless there is exactly one
    /// input; [`LayerError::InvalidParameter`] if `use_bias` is not a boolean.
    pub fn new(name: &str, inputs: Vec<SharedTensor>, param: &Param) -> Result<Self, LayerError> {
        check_inputs(name, &inputs, 1)?;

        let use_bias: bool = param.get_or("use_bias", true)?;
        let size = inputs[0].borrow().size();
        let channels = size[2];

        let mut scale = Tensor::new(1, 1, channels, 1);
        scale.set(1.0);
        let mut weights = vec![scale.into_shared()];
        if use_bias {
            weights.push(Tensor::new(1, 1, channels, 1).into_shared());
        }

        Ok(Self {
            name: name.to_string(),
            inputs,
            weights,
            outputs: vec![Tensor::with_size(size).into_shared()],
        })
    }

    pub fn scale(&self) -> &SharedTensor {
        &self.weights[0]
    }

    pub fn bias(&self) -> Option<&SharedTensor> {
        self.weights.get(1)
    }
}

impl Layer for ScaleLayer {
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
        let scale = self.weights[0].borrow();
        let bias = self.weights.get(1).map(|b| b.borrow());
        let mut output = self.outputs[0].borrow_mut();

        let data_size = output.width() * output.height();
        let num_channel = output.channels();
        let batch_size = output.batch();
        let in_data = input.data();
        let scale_data = scale.data();
        let out_data = output.data_mut();

        for batch in 0..batch_size {
            for channel in 0..num_channel {
                let offset = (batch * num_channel + channel) * data_size;
                let shift = bias.as_ref().map_or(0.0, |b| b.data()[channel]);
                for i in offset..offset + data_size {
                    out_data[i] = scale_data[channel] * in_data[i] + shift;
                }
            }
        }
    }

    fn backward(&mut self, _state: State) {
        let mut input = self.inputs[0].borrow_mut();
        let output = self.outputs[0].borrow();
        let mut scale = self.weights[0].borrow_mut();
        let mut bias = self.weights.get(1).map(|b| b.borrow_mut());

        let data_size = output.width() * output.height();
        let num_channel = output.channels();
        let batch_size = output.batch();
        let out_deriv = output.deriv();
        let (in_data, in_deriv) = input.data_and_deriv_mut();
        let (scale_data, scale_deriv) = scale.data_and_deriv_mut();

        // in_deriv    += scale * out_deriv
        // scale_deriv += in * out_deriv
        // bias_deriv  += out_deriv
        for batch in 0..batch_size {
            for channel in 0..num_channel {
                let offset = (batch * num_channel + channel) * data_size;
                for i in offset..offset + data_size {
                    let dv = out_deriv[i];
                    in_deriv[i] += dv * scale_data[channel];
                    scale_deriv[channel] += dv * in_data[i];
                    if let Some(bias) = bias.as_mut() {
                        bias.deriv_mut()[channel] += dv;
                    }
                }
            }
        }
    }
}
