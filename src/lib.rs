//! Kolmogorov-Arnold graph neural networks on candle.
//!
//! Facade over the workspace crates:
//!
//! - [`kan`]: spline-based KAN layers and the KAN factory
//! - [`nn`]: graph convolutions, molecular encoders and the KAEdge, KAGIN
//!   and KAGCN models
//!
//! The most used types are re-exported at the root.

pub use kagnn_kan as kan;
pub use kagnn_nn as nn;

pub use kagnn_kan::{make_kan, KANLinear, SplineConfig, KAN};
pub use kagnn_nn::{
    Error, GraphBatch, GraphModel, ModelConfig, Readout, Result, KAEdge, KAGCN, KAGIN,
};
