//! Error types for layer construction.

use std::fmt;

/// Errors raised while assembling a layer.
///
/// These are contract violations of the caller (a malformed graph or parameter
/// set). They are detected once, at construction, and never during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerError {
    /// Wrong input arity or an unusable shape.
    InvalidLayerConfiguration { layer: String, reason: String },
    /// A required parameter is absent from the parameter bag.
    MissingParameter { key: String },
    /// A parameter is present but its value cannot be used.
    InvalidParameter { key: String, reason: String },
}

impl LayerError {
    pub(crate) fn configuration(layer: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLayerConfiguration {
            layer: layer.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLayerConfiguration { layer, reason } => {
                write!(f, "layer '{layer}': {reason}")
            }
            Self::MissingParameter { key } => write!(f, "missing required parameter '{key}'"),
            Self::InvalidParameter { key, reason } => {
                write!(f, "invalid parameter '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for LayerError {}
