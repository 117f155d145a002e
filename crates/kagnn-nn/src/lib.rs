//! Graph neural networks with Kolmogorov-Arnold transforms.
//!
//! Every message-passing layer has an inner transform: the MLP in GIN, the
//! weight matrix in GCN, the edge function in EdgeConv. This crate makes
//! that transform a pluggable [`candle_nn::Module`] and fills it with a KAN
//! from [`kagnn_kan`].
//!
//! ```text
//! h_i' = UPDATE(h_i, AGGREGATE({MESSAGE(h_i, h_j) : j -> i}))
//! ```
//!
//! ## Model Variants
//!
//! | Model | Block | Inner transform |
//! |-------|-------|-----------------|
//! | [`KAEdge`] | EdgeConv, BN, SiLU, dropout | KAN `2·in -> hidden -> hidden` |
//! | [`KAGIN`] | GIN, BN, dropout | KAN `hidden -> .. -> hidden` |
//! | [`KAGCN`] | GCN, SiLU, dropout | one KAN layer, grid 4 / order 3 |
//!
//! All three expose two independently parameterised heads through
//! [`GraphModel`]: a per-node KAN projection and a sum-pooled KAN readout.
//!
//! ## Molecular Features
//!
//! With `ogb_encoders` set, node (and for GIN edge) inputs are integer
//! matrices indexed into the [`features`] vocabulary and embedded by a
//! [`CategoricalEncoder`]. Column order is part of the contract: atomic
//! number, chirality, degree, formal charge, numH, radical electrons,
//! hybridization, aromaticity, ring membership.
//!
//! ## Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use kagnn_nn::{GraphBatch, GraphModel, ModelConfig, Readout, KAGCN};
//!
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//!
//! let config = ModelConfig::default().with_hidden_dim(16).with_num_classes(2);
//! let model = KAGCN::new(&config, vb)?;
//!
//! let x = Tensor::randn(0f32, 1f32, (5, 9), &device)?;
//! let edge_index = Tensor::new(&[[0i64, 1, 2, 3], [1, 2, 3, 4]], &device)?;
//! let batch = GraphBatch::single(x, &edge_index)?;
//! let per_graph = model.forward(&batch, Readout::Graph, false)?; // (1, 2)
//! ```
//!
//! ## References
//!
//! - Kipf & Welling (2017). "Semi-Supervised Classification with Graph Convolutional Networks."
//! - Xu et al. (2019). "How Powerful are Graph Neural Networks?"
//! - Wang et al. (2019). "Dynamic Graph CNN for Learning on Point Clouds."
//! - Hu et al. (2020). "Open Graph Benchmark."

pub mod conv;
pub mod encoder;
pub mod error;
pub mod features;
pub mod graph;
pub mod models;
pub mod pool;

pub use conv::{Aggregation, EdgeConv, GCNConv, GINConv, GraphConv};
pub use encoder::CategoricalEncoder;
pub use error::{Error, Result};
pub use features::{
    atom_feature_dims, atom_to_feature_vector, bond_feature_dims, bond_to_feature_vector,
    AtomFeature, BondFeature, FeatureValue,
};
pub use graph::GraphBatch;
pub use models::{
    ka_edge_conv_layer, ka_gcn_layer, kan_layer, Block, FeatureEncoder, GraphModel, ModelConfig,
    Readout, GCN_INNER_SPLINE, KAEdge, KAGCN, KAGIN,
};
pub use pool::{global_add_pool, global_mean_pool, Pooling};
