//! Layer abstractions for neural networks
//!
//! This module provides the Layer and Classifier traits and the concrete layers:
//! inner product (fully connected), per-channel scale, and softmax classifier.

mod r#trait;
pub mod inner_product;
pub mod scale;
pub mod softmax;

// Re-export the contracts for convenience
pub use inner_product::InnerProductLayer;
pub use r#trait::{Classifier, Layer, State};
pub use scale::ScaleLayer;
pub use softmax::SoftMaxLayer;
