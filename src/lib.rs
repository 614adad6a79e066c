//! Layernet
//!
//! A small neural network training engine: layers with hand-derived forward and
//! backward passes over shared data/derivative tensors, and gradient-descent
//! solvers that update the learnable weights once per batch.
//!
//! # Modules
//!
//! - `tensor`: 4-D value/derivative container shared between layers
//! - `param`: Named layer parameters with typed lookup
//! - `error`: Layer construction errors
//! - `layers`: Layer and Classifier traits, InnerProduct, Scale, SoftMax
//! - `model`: Ordered layer sequence driving forward/backward sweeps
//! - `solvers`: Solver with SGD and RMSprop update rules
//! - `utils`: Gaussian RNG, learning-rate schedule, trace sink
//! - `config`: Solver configuration loading
//! - `architecture`: Architecture description loading and model building

pub mod architecture;
pub mod config;
pub mod error;
pub mod layers;
pub mod model;
pub mod param;
pub mod solvers;
pub mod tensor;
pub mod utils;
