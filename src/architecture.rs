//! Architecture configuration
//!
//! This module describes a linear stack of layers in JSON and builds the
//! matching [`Model`], wiring each layer to the output of the one before it.

use crate::layers::{InnerProductLayer, Layer, ScaleLayer, SoftMaxLayer};
use crate::model::Model;
use crate::param::Param;
use crate::tensor::{SharedTensor, Tensor};
use crate::utils::rng::TensorRng;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fs;
use tracing::info;

/// Layer types accepted in `layer_type`.
pub const LAYER_TYPES: [&str; 3] = ["inner_product", "scale", "softmax"];

/// Configuration for a single layer.
///
/// `params` is handed to the layer constructor unchanged:
///
/// - **inner_product**: `num_output` (required), `use_bias` (default true)
/// - **scale**: `use_bias` (default true)
/// - **softmax**: no parameters
///
/// # Example
///
/// ```json
/// {
///   "name": "fc1",
///   "layer_type": "inner_product",
///   "params": { "num_output": 64 }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Unique layer name
    pub name: String,

    /// Type of layer: "inner_product", "scale", or "softmax"
    pub layer_type: String,

    /// Layer parameters
    #[serde(default)]
    pub params: Param,
}

/// Configuration for a whole model.
///
/// # Example
///
/// ```json
/// {
///   "name": "mlp",
///   "input": [1, 1, 784, 32],
///   "layers": [
///     { "name": "fc1", "layer_type": "inner_product", "params": { "num_output": 128 } },
///     { "name": "scale1", "layer_type": "scale" },
///     { "name": "fc2", "layer_type": "inner_product", "params": { "num_output": 10 } },
///     { "name": "prob", "layer_type": "softmax" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Model name
    #[serde(default = "default_name")]
    pub name: String,

    /// Input size as `[width, height, channels, batch]`
    pub input: [usize; 4],

    /// Layers in forward order
    pub layers: Vec<LayerConfig>,
}

fn default_name() -> String {
    "model".to_string()
}

impl ArchitectureConfig {
    /// Whether the last layer is a classifier that needs a label tensor.
    pub fn has_classifier(&self) -> bool {
        self.layers
            .last()
            .map(|layer| layer.layer_type.eq_ignore_ascii_case("softmax"))
            .unwrap_or(false)
    }
}

/// Loads an architecture configuration from a JSON file.
///
/// # Returns
///
/// `Ok(ArchitectureConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid, or the description fails validation.
///
/// # Examples
///
/// ```no_run
/// use layernet::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/mlp.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn invalid(msg: impl Into<String>) -> Box<dyn Error> {
    Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg.into()))
}

/// Validates an architecture configuration.
///
/// Checks that there is at least one layer, that every layer type is known,
/// that names are unique and non-empty, that a softmax layer only appears
/// last, and that the input size holds at least one value.
///
/// # Errors
///
/// Returns an error describing the first problem found.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<(), Box<dyn Error>> {
    if config.layers.is_empty() {
        return Err(invalid("Architecture must have at least one layer"));
    }

    if config.input.iter().any(|&dim| dim == 0) {
        return Err(invalid(format!(
            "Input size {:?} must not have a zero dimension",
            config.input
        )));
    }

    let mut names = HashSet::new();
    let last = config.layers.len() - 1;
    for (i, layer) in config.layers.iter().enumerate() {
        if layer.name.is_empty() {
            return Err(invalid(format!("Layer {}: name must not be empty", i)));
        }
        if !names.insert(layer.name.as_str()) {
            return Err(invalid(format!(
                "Layer {}: duplicate layer name '{}'",
                i, layer.name
            )));
        }

        let layer_type = layer.layer_type.to_lowercase();
        if !LAYER_TYPES.contains(&layer_type.as_str()) {
            return Err(invalid(format!(
                "Layer {}: Invalid layer type '{}'. Must be one of: {}",
                i,
                layer.layer_type,
                LAYER_TYPES.join(", ")
            )));
        }
        if layer_type == "softmax" && i != last {
            return Err(invalid(format!(
                "Layer {}: softmax layer '{}' must be the last layer",
                i, layer.name
            )));
        }
        if layer_type == "inner_product" && !layer.params.contains("num_output") {
            return Err(invalid(format!(
                "Layer {}: inner_product layer requires 'num_output'",
                i
            )));
        }
    }

    Ok(())
}

/// Builds a model from an architecture configuration.
///
/// Allocates the data input and, when the last layer is a classifier, a label
/// tensor of size `[1, 1, 1, batch]`. Each layer reads the output of the layer
/// before it; the classifier also reads the labels.
///
/// # Arguments
///
/// * `config` - Validated architecture configuration
/// * `rng` - Generator for weight initialization
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a layer rejects its
/// parameters.
///
/// # Examples
///
/// ```no_run
/// use layernet::architecture::{build_model, load_architecture};
/// use layernet::utils::TensorRng;
///
/// let config = load_architecture("config/architectures/mlp.json").unwrap();
/// let mut rng = TensorRng::new(42);
/// let model = build_model(&config, &mut rng).unwrap();
/// assert_eq!(model.layers().len(), config.layers.len());
/// ```
pub fn build_model(config: &ArchitectureConfig, rng: &mut TensorRng) -> Result<Model, Box<dyn Error>> {
    validate_architecture(config)?;

    let input = Tensor::with_size(config.input).into_shared();
    let batch = config.input[3];
    let labels = config
        .has_classifier()
        .then(|| Tensor::new(1, 1, 1, batch).into_shared());

    let mut model = Model::new(&config.name, input.clone(), labels.clone());
    let mut prev: SharedTensor = input;

    for layer_config in &config.layers {
        let name = layer_config.name.as_str();
        let layer: Box<dyn Layer> = match layer_config.layer_type.to_lowercase().as_str() {
            "inner_product" => Box::new(InnerProductLayer::new(
                name,
                vec![prev.clone()],
                &layer_config.params,
                rng,
            )?),
            "scale" => Box::new(ScaleLayer::new(name, vec![prev.clone()], &layer_config.params)?),
            "softmax" => {
                let labels = labels
                    .clone()
                    .ok_or_else(|| invalid(format!("softmax layer '{}' has no label tensor", name)))?;
                Box::new(SoftMaxLayer::new(name, vec![prev.clone(), labels])?)
            }
            other => return Err(invalid(format!("Unknown layer type: {}", other))),
        };

        if let Some(output) = layer.outputs().first() {
            prev = output.clone();
        }
        model.add_layer(layer);
    }

    info!(
        model = %model.name(),
        layers = model.layers().len(),
        parameters = model.parameter_count(),
        "model built"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, layer_type: &str) -> LayerConfig {
        LayerConfig {
            name: name.to_string(),
            layer_type: layer_type.to_string(),
            params: Param::new(),
        }
    }

    fn fc(name: &str, num_output: u32) -> LayerConfig {
        LayerConfig {
            params: Param::new().with("num_output", num_output),
            ..layer(name, "inner_product")
        }
    }

    fn config(layers: Vec<LayerConfig>) -> ArchitectureConfig {
        ArchitectureConfig {
            name: "test".to_string(),
            input: [1, 1, 4, 2],
            layers,
        }
    }

    #[test]
    fn test_validate_accepts_classifier_stack() {
        let cfg = config(vec![fc("fc", 3), layer("scale", "scale"), layer("prob", "softmax")]);
        assert!(validate_architecture(&cfg).is_ok());
        assert!(cfg.has_classifier());
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(validate_architecture(&config(vec![])).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let err = validate_architecture(&config(vec![layer("x", "conv2d")])).unwrap_err();
        assert!(err.to_string().contains("Invalid layer type"));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let err = validate_architecture(&config(vec![fc("fc", 3), fc("fc", 2)])).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_rejects_softmax_in_the_middle() {
        let cfg = config(vec![fc("fc", 3), layer("prob", "softmax"), layer("scale", "scale")]);
        assert!(validate_architecture(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_num_output() {
        assert!(validate_architecture(&config(vec![layer("fc", "inner_product")])).is_err());
    }

    #[test]
    fn test_build_wires_layers_in_sequence() {
        let cfg = config(vec![fc("fc", 3), layer("scale", "scale"), layer("prob", "softmax")]);
        let mut rng = TensorRng::new(1);
        let model = build_model(&cfg, &mut rng).unwrap();

        assert_eq!(model.layers().len(), 3);
        assert_eq!(model.labels().unwrap().borrow().size(), [1, 1, 1, 2]);

        let fc_out = &model.layers()[0].outputs()[0];
        let scale_in = &model.layers()[1].inputs()[0];
        assert!(std::rc::Rc::ptr_eq(fc_out, scale_in));
        assert_eq!(model.layers()[2].inputs().len(), 2);
        assert!(model.layers()[2].as_classifier().is_some());
    }

    #[test]
    fn test_build_without_classifier_has_no_labels() {
        let cfg = config(vec![fc("fc", 3)]);
        let mut rng = TensorRng::new(1);
        let model = build_model(&cfg, &mut rng).unwrap();
        assert!(model.labels().is_none());
    }

    #[test]
    fn test_build_propagates_layer_errors() {
        let cfg = config(vec![fc("fc", 0)]);
        let mut rng = TensorRng::new(1);
        let err = build_model(&cfg, &mut rng).err().unwrap();
        assert!(err.to_string().contains("fc"));
    }
}
