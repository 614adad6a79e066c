//! Parameter bag consumed by layer constructors
//!
//! Layers read their settings (`use_bias`, `num_output`, ...) from a map of named
//! JSON scalars. Optional entries are read with a default, required entries fail
//! with [`LayerError::MissingParameter`] when absent.

use crate::error::LayerError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named layer parameters.
///
/// # Example
///
/// ```
/// use layernet::param::Param;
///
/// let param = Param::new().with("num_output", 10).with("use_bias", false);
/// assert_eq!(param.get::<u32>("num_output").unwrap(), 10);
/// assert!(!param.get_or("use_bias", true).unwrap());
/// assert_eq!(param.get_or("missing", 3u32).unwrap(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Param {
    values: Map<String, Value>,
}

impl Param {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an entry, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Reads a required entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, LayerError> {
        match self.values.get(key) {
            Some(value) => decode(key, value),
            None => Err(LayerError::MissingParameter {
                key: key.to_string(),
            }),
        }
    }

    /// Reads an optional entry, falling back to `default` when absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, LayerError> {
        match self.values.get(key) {
            Some(value) => decode(key, value),
            None => Ok(default),
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T, LayerError> {
    T::deserialize(value).map_err(|e| LayerError::InvalidParameter {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_missing() {
        let param = Param::new();
        assert_eq!(
            param.get::<u32>("num_output"),
            Err(LayerError::MissingParameter {
                key: "num_output".to_string()
            })
        );
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let param = Param::new().with("use_bias", "yes");
        match param.get_or("use_bias", true) {
            Err(LayerError::InvalidParameter { key, .. }) => assert_eq!(key, "use_bias"),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_unsigned_is_invalid() {
        let param = Param::new().with("num_output", -3);
        assert!(matches!(
            param.get::<u32>("num_output"),
            Err(LayerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_deserialize_from_json_object() {
        let param: Param = serde_json::from_str(r#"{"num_output": 4, "use_bias": false}"#).unwrap();
        assert!(param.contains("num_output"));
        assert_eq!(param.get::<usize>("num_output").unwrap(), 4);
        assert!(!param.get::<bool>("use_bias").unwrap());
    }
}
