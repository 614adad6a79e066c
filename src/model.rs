//! Model: an ordered sequence of layers over a data input
//!
//! The model runs forward passes in layer order and backward passes in reverse
//! order, exposes the flattened list of every learnable weight for the solver, and
//! clears every derivative buffer between batches.

use crate::layers::{Layer, State};
use crate::tensor::SharedTensor;
use tracing::debug;

/// Ordered layer sequence with its data input and optional labels.
///
/// # Example
///
/// ```
/// use layernet::layers::{InnerProductLayer, State};
/// use layernet::model::Model;
/// use layernet::param::Param;
/// use layernet::tensor::Tensor;
/// use layernet::utils::TensorRng;
///
/// let input = Tensor::new(1, 1, 4, 2).into_shared();
/// let mut model = Model::new("mlp", input.clone(), None);
/// let mut rng = TensorRng::new(42);
/// let fc = InnerProductLayer::new("fc", vec![input], &Param::new().with("num_output", 3), &mut rng)
///     .unwrap();
/// model.add_layer(Box::new(fc));
///
/// model.forward(State::Test);
/// assert_eq!(model.batch_size(), 2);
/// assert_eq!(model.weights().len(), 2);
/// ```
pub struct Model {
    name: String,
    input: SharedTensor,
    labels: Option<SharedTensor>,
    layers: Vec<Box<dyn Layer>>,
}

impl Model {
    pub fn new(name: &str, input: SharedTensor, labels: Option<SharedTensor>) -> Self {
        Self {
            name: name.to_string(),
            input,
            labels,
            layers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data tensor fed to the first layer.
    pub fn input(&self) -> &SharedTensor {
        &self.input
    }

    /// Label tensor fed to the classifier, if any.
    pub fn labels(&self) -> Option<&SharedTensor> {
        self.labels.as_ref()
    }

    /// Appends a layer. Layers run forward in the order they are added.
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) {
        debug!(
            model = %self.name,
            layer = layer.name(),
            weights = layer.weights().len(),
            parameters = layer.parameter_count(),
            "layer added"
        );
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// Looks a layer up by name.
    pub fn layer(&self, name: &str) -> Option<&dyn Layer> {
        self.layers
            .iter()
            .find(|layer| layer.name() == name)
            .map(|layer| &**layer)
    }

    /// First output of the last layer.
    pub fn output(&self) -> Option<SharedTensor> {
        self.layers
            .last()
            .and_then(|layer| layer.outputs().first().cloned())
    }

    /// Copies a batch of samples into the input tensor.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not fill the input tensor exactly.
    pub fn set_input(&self, data: &[f32]) {
        let mut input = self.input.borrow_mut();
        assert_eq!(
            data.len(),
            input.len(),
            "input len mismatch: expected {}, got {}",
            input.len(),
            data.len()
        );
        input.data_mut().copy_from_slice(data);
    }

    /// Copies one label per batch element into the label tensor.
    ///
    /// # Panics
    ///
    /// Panics if the model has no label tensor or `labels` does not fill it.
    pub fn set_labels(&self, labels: &[f32]) {
        let tensor = self
            .labels
            .as_ref()
            .unwrap_or_else(|| panic!("model '{}' has no label tensor", self.name));
        let mut tensor = tensor.borrow_mut();
        assert_eq!(
            labels.len(),
            tensor.len(),
            "labels len mismatch: expected {}, got {}",
            tensor.len(),
            labels.len()
        );
        tensor.data_mut().copy_from_slice(labels);
    }

    /// Runs every layer forward, in order.
    pub fn forward(&mut self, state: State) {
        for layer in self.layers.iter_mut() {
            layer.forward(state);
        }
    }

    /// Runs every layer backward, in reverse order.
    ///
    /// Derivatives accumulate: call [`Model::clear_deriv`] (or let the solver do
    /// it) before the next batch.
    pub fn backward(&mut self, state: State) {
        for layer in self.layers.iter_mut().rev() {
            layer.backward(state);
        }
    }

    /// Every learnable weight, layer by layer.
    ///
    /// The order is stable across calls; solvers pair their per-weight state
    /// with this list by index.
    pub fn weights(&self) -> Vec<SharedTensor> {
        self.layers
            .iter()
            .flat_map(|layer| layer.weights().iter().cloned())
            .collect()
    }

    /// Batch size of the data input.
    pub fn batch_size(&self) -> usize {
        self.input.borrow().batch()
    }

    /// Zeroes the derivative buffer of every tensor the model reaches.
    pub fn clear_deriv(&self) {
        self.input.borrow_mut().clear_deriv();
        for layer in &self.layers {
            let tensors = layer
                .inputs()
                .iter()
                .chain(layer.weights())
                .chain(layer.outputs());
            for tensor in tensors {
                tensor.borrow_mut().clear_deriv();
            }
        }
    }

    /// Sum of the losses of every classifier layer.
    pub fn loss(&self) -> f32 {
        self.layers
            .iter()
            .filter_map(|layer| layer.as_classifier())
            .map(|classifier| classifier.loss())
            .sum()
    }

    /// Number of learnable scalars across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{InnerProductLayer, ScaleLayer, SoftMaxLayer};
    use crate::param::Param;
    use crate::tensor::Tensor;
    use crate::utils::TensorRng;

    fn classifier_model() -> Model {
        let input = Tensor::new(1, 1, 4, 2).into_shared();
        let labels = Tensor::new(1, 1, 1, 2).into_shared();
        let mut model = Model::new("net", input.clone(), Some(labels.clone()));
        let mut rng = TensorRng::new(9);

        let fc = InnerProductLayer::new("fc", vec![input], &Param::new().with("num_output", 3), &mut rng)
            .unwrap();
        let fc_out = fc.outputs()[0].clone();
        model.add_layer(Box::new(fc));

        let scale = ScaleLayer::new("scale", vec![fc_out], &Param::new()).unwrap();
        let scale_out = scale.outputs()[0].clone();
        model.add_layer(Box::new(scale));

        let prob = SoftMaxLayer::new("prob", vec![scale_out, labels]).unwrap();
        model.add_layer(Box::new(prob));
        model
    }

    #[test]
    fn test_weights_are_flattened_in_layer_order() {
        let model = classifier_model();
        let weights = model.weights();
        let sizes: Vec<[usize; 4]> = weights.iter().map(|w| w.borrow().size()).collect();
        assert_eq!(
            sizes,
            vec![[4, 3, 1, 1], [1, 1, 3, 1], [1, 1, 3, 1], [1, 1, 3, 1]]
        );
        assert_eq!(model.parameter_count(), 12 + 3 + 3 + 3);
    }

    #[test]
    fn test_weights_order_is_stable() {
        let model = classifier_model();
        let first = model.weights();
        let second = model.weights();
        for (a, b) in first.iter().zip(second.iter()) {
            assert!(std::rc::Rc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_layer_lookup() {
        let model = classifier_model();
        assert_eq!(model.layers().len(), 3);
        assert!(model.layer("scale").is_some());
        assert!(model.layer("missing").is_none());
        assert_eq!(model.output().unwrap().borrow().size(), [1, 1, 3, 2]);
    }

    #[test]
    fn test_full_sweep_and_clear() {
        let mut model = classifier_model();
        model.set_input(&[0.5, -1.0, 2.0, 0.0, 1.0, 1.0, -0.5, 0.25]);
        model.set_labels(&[2.0, 0.0]);

        model.forward(State::Train);
        model.backward(State::Train);
        assert!(model.loss() > 0.0);
        let touched = model
            .weights()
            .iter()
            .any(|w| w.borrow().deriv().iter().any(|&d| d != 0.0));
        assert!(touched);

        model.clear_deriv();
        for w in model.weights() {
            assert!(w.borrow().deriv().iter().all(|&d| d == 0.0));
        }
        assert!(model.input().borrow().deriv().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_loss_without_classifier_is_zero() {
        let input = Tensor::new(1, 1, 2, 1).into_shared();
        let mut model = Model::new("plain", input.clone(), None);
        model.add_layer(Box::new(ScaleLayer::new("s", vec![input], &Param::new()).unwrap()));
        model.forward(State::Train);
        assert_eq!(model.loss(), 0.0);
    }

    #[test]
    #[should_panic(expected = "has no label tensor")]
    fn test_set_labels_without_label_tensor() {
        let input = Tensor::new(1, 1, 2, 1).into_shared();
        let model = Model::new("plain", input, None);
        model.set_labels(&[0.0]);
    }
}
