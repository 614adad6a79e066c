//! Inner product (fully connected) layer
//!
//! Every output unit is a dot product of the whole flattened input sample with one
//! row of the filter matrix, plus an optional bias:
//! `out[b, i] = bias[i] + Σ_j in[b, j] × filter[i, j]`

use crate::error::LayerError;
use crate::layers::r#trait::{check_inputs, Layer, State};
use crate::param::Param;
use crate::tensor::{SharedTensor, Tensor};
use crate::utils::TensorRng;

/// Fully connected layer.
///
/// # Shapes
///
/// * input: any `[w, h, c, batch]`; `num_input = w × h × c`
/// * filter (weight 0): `[num_input, num_output, 1, 1]`, row `i` holds the
///   `num_input` coefficients of output `i`
/// * bias (weight 1, present iff `use_bias`): `[1, 1, num_output, 1]`
/// * output: `[1, 1, num_output, batch]`
///
/// # Parameters
///
/// * `num_output` - required, number of output units
/// * `use_bias` - optional, default `true`
///
/// # Example
///
/// ```
/// use layernet::layers::{InnerProductLayer, Layer};
/// use layernet::param::Param;
/// use layernet::tensor::Tensor;
/// use layernet::utils::TensorRng;
///
/// let input = Tensor::new(28, 28, 1, 16).into_shared();
/// let param = Param::new().with("num_output", 10);
/// let mut rng = TensorRng::new(42);
/// let layer = InnerProductLayer::new("fc1", vec![input], &param, &mut rng).unwrap();
/// assert_eq!(layer.num_input(), 784);
/// assert_eq!(layer.outputs()[0].borrow().size(), [1, 1, 10, 16]);
/// ```
pub struct InnerProductLayer {
    name: String,
    num_input: usize,
    num_output: usize,
    inputs: Vec<SharedTensor>,
    weights: Vec<SharedTensor>,
    outputs: Vec<SharedTensor>,
}

impl InnerProductLayer {
    /// Creates the layer, initializing the filter from N(0, 1/num_input) and the
    /// bias to zero.
    ///
    /// # Errors
    ///
    /// * [`LayerError::InvalidLayerConfiguration`] unless there is exactly one
    ///   input, or if the input sample or `num_output` is empty
    /// * [`LayerError::MissingParameter`] if `num_output` is absent
    /// * [`LayerError::InvalidParameter`] if a parameter has the wrong type
    pub fn new(
        name: &str,
        inputs: Vec<SharedTensor>,
        param: &Param,
        rng: &mut TensorRng,
    ) -> Result<Self, LayerError> {
        check_inputs(name, &inputs, 1)?;

        let use_bias: bool = param.get_or("use_bias", true)?;
        let num_output: u32 = param.get("num_output")?;
        let num_output = num_output as usize;
        let num_input = inputs[0].borrow().sample_len();
        check_sizes(name, num_input, num_output)?;

        let std = (1.0f32 / num_input as f32).sqrt();
        let filter = rng.gaussian(num_input, num_output, 1, 1, 0.0, std)?;
        let bias = use_bias.then(|| Tensor::new(1, 1, num_output, 1));

        Ok(Self::assemble(name, inputs, filter, bias, num_input, num_output))
    }

    /// Creates the layer around explicit filter and bias values.
    ///
    /// `filter` must have size `[num_input, num_output, 1, 1]` and `bias`, if any,
    /// `[1, 1, num_output, 1]`.
    pub fn from_weights(
        name: &str,
        inputs: Vec<SharedTensor>,
        filter: Tensor,
        bias: Option<Tensor>,
    ) -> Result<Self, LayerError> {
        check_inputs(name, &inputs, 1)?;

        let num_input = inputs[0].borrow().sample_len();
        let num_output = filter.height();
        check_sizes(name, num_input, num_output)?;
        if filter.size() != [num_input, num_output, 1, 1] {
            return Err(LayerError::configuration(
                name,
                format!(
                    "filter size {:?} does not match {} inputs",
                    filter.size(),
                    num_input
                ),
            ));
        }
        if let Some(bias) = &bias {
            if bias.size() != [1, 1, num_output, 1] {
                return Err(LayerError::configuration(
                    name,
                    format!("bias size {:?} does not match {} outputs", bias.size(), num_output),
                ));
            }
        }

        Ok(Self::assemble(name, inputs, filter, bias, num_input, num_output))
    }

    fn assemble(
        name: &str,
        inputs: Vec<SharedTensor>,
        filter: Tensor,
        bias: Option<Tensor>,
        num_input: usize,
        num_output: usize,
    ) -> Self {
        let batch = inputs[0].borrow().batch();

        let mut weights = vec![filter.into_shared()];
        if let Some(bias) = bias {
            weights.push(bias.into_shared());
        }

        Self {
            name: name.to_string(),
            num_input,
            num_output,
            inputs,
            weights,
            outputs: vec![Tensor::new(1, 1, num_output, batch).into_shared()],
        }
    }

    pub fn num_input(&self) -> usize {
        self.num_input
    }

    pub fn num_output(&self) -> usize {
        self.num_output
    }

    pub fn filter(&self) -> &SharedTensor {
        &self.weights[0]
    }

    pub fn bias(&self) -> Option<&SharedTensor> {
        self.weights.get(1)
    }
}

fn check_sizes(name: &str, num_input: usize, num_output: usize) -> Result<(), LayerError> {
    if num_input == 0 {
        return Err(LayerError::configuration(name, "input holds no values"));
    }
    if num_output == 0 {
        return Err(LayerError::configuration(name, "num_output must be greater than 0"));
    }
    Ok(())
}

impl Layer for InnerProductLayer {
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
        let filter = self.weights[0].borrow();
        let bias = self.weights.get(1).map(|b| b.borrow());
        let mut output = self.outputs[0].borrow_mut();

        let num_in = self.num_input;
        let num_out = self.num_output;
        let in_data = input.data();
        let filter_data = filter.data();
        let out_data = output.data_mut();

        // out = filter * in + bias
        for batch in 0..input.batch() {
            let x = &in_data[batch * num_in..(batch + 1) * num_in];
            let y = &mut out_data[batch * num_out..(batch + 1) * num_out];
            for (i, out) in y.iter_mut().enumerate() {
                let row = &filter_data[i * num_in..(i + 1) * num_in];
                let mut ip: f32 = row.iter().zip(x).map(|(w, v)| w * v).sum();
                if let Some(bias) = &bias {
                    ip += bias.data()[i];
                }
                *out = ip;
            }
        }
    }

    fn backward(&mut self, _state: State) {
        let mut input = self.inputs[0].borrow_mut();
        let output = self.outputs[0].borrow();
        let mut filter = self.weights[0].borrow_mut();
        let mut bias = self.weights.get(1).map(|b| b.borrow_mut());

        let num_in = self.num_input;
        let num_out = self.num_output;
        let batch_size = input.batch();
        let out_deriv = output.deriv();
        let (in_data, in_deriv) = input.data_and_deriv_mut();
        let (filter_data, filter_deriv) = filter.data_and_deriv_mut();

        // in_deriv     += filter^T * out_deriv
        // filter_deriv += out_deriv * in^T
        // bias_deriv   += out_deriv
        for batch in 0..batch_size {
            let in_offset = batch * num_in;
            for i in 0..num_out {
                let dv = out_deriv[batch * num_out + i];
                for j in 0..num_in {
                    let filter_index = num_in * i + j;
                    in_deriv[in_offset + j] += dv * filter_data[filter_index];
                    filter_deriv[filter_index] += dv * in_data[in_offset + j];
                }
                if let Some(bias) = bias.as_mut() {
                    bias.deriv_mut()[i] += dv;
                }
            }
        }
    }
}
