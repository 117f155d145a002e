//! Graph model variants with KAN transforms and dual readout heads.
//!
//! Every variant stacks graph-convolution blocks over an encoded node
//! representation and then branches into one of two independently
//! parameterised heads:
//!
//! | Readout | Head | Output |
//! |---------|------|--------|
//! | [`Readout::Node`] | per-node [`KANLinear`] | `(num_nodes, num_classes)` |
//! | [`Readout::Graph`] | sum pool, then [`KAN`] | `(num_graphs, num_classes)` |

mod config;
mod edge;
mod gcn;
mod gin;

pub use config::ModelConfig;
pub use edge::{ka_edge_conv_layer, KAEdge};
pub use gcn::{ka_gcn_layer, kan_layer, KAGCN, GCN_INNER_SPLINE};
pub use gin::KAGIN;

use candle_core::Tensor;
use candle_nn::{linear, BatchNorm, Linear, Module, ModuleT, VarBuilder};
use kagnn_kan::{KANLinear, KAN};
use serde::{Deserialize, Serialize};

use crate::conv::GraphConv;
use crate::encoder::CategoricalEncoder;
use crate::error::{Error, Result};
use crate::graph::GraphBatch;
use crate::pool::global_add_pool;

/// Which head a forward call evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readout {
    /// One row per node, no pooling.
    Node,
    /// One row per graph in `batch`.
    Graph,
}

/// Shared forward surface of the KAN graph models.
///
/// Implementors provide the backbone and both heads; the readout
/// branches are derived from them.
pub trait GraphModel {
    /// Final per-node representation `(num_nodes, hidden_dim)`.
    fn node_embeddings(&self, batch: &GraphBatch, train: bool) -> Result<Tensor>;

    /// Per-node projection `hidden_dim -> num_classes`.
    fn node_head(&self) -> &KANLinear;

    /// Pooled readout `hidden_dim -> num_classes`.
    fn graph_head(&self) -> &KAN;

    fn forward_node(&self, batch: &GraphBatch, train: bool) -> Result<Tensor> {
        let h = self.node_embeddings(batch, train)?;
        Ok(self.node_head().forward(&h)?)
    }

    fn forward_graph(&self, batch: &GraphBatch, train: bool) -> Result<Tensor> {
        let h = self.node_embeddings(batch, train)?;
        let pooled = global_add_pool(&h, batch.batch(), batch.num_graphs())?;
        Ok(self.graph_head().forward(&pooled)?)
    }

    fn forward(&self, batch: &GraphBatch, readout: Readout, train: bool) -> Result<Tensor> {
        match readout {
            Readout::Node => self.forward_node(batch, train),
            Readout::Graph => self.forward_graph(batch, train),
        }
    }
}

/// One backbone layer: a convolution and its optional batch norm.
#[derive(Debug, Clone)]
pub struct Block<C> {
    conv: C,
    norm: Option<BatchNorm>,
}

impl<C: GraphConv> Block<C> {
    pub fn new(conv: C, norm: Option<BatchNorm>) -> Self {
        Self { conv, norm }
    }

    pub fn conv(&self) -> &C {
        &self.conv
    }

    pub fn norm(&self) -> Option<&BatchNorm> {
        self.norm.as_ref()
    }

    /// Convolution followed by normalisation.
    ///
    /// In training, batch norm needs at least two nodes: with one, the
    /// unbiased running variance would become NaN.
    pub fn forward(&self, x: &Tensor, edge_index: &Tensor, train: bool) -> Result<Tensor> {
        let h = self.conv.forward(x, edge_index)?;
        match &self.norm {
            Some(norm) => {
                if train && h.dim(0)? < 2 {
                    return Err(Error::InvalidGraph(
                        "batch norm in training needs more than one node".into(),
                    ));
                }
                Ok(norm.forward_t(&h, train)?)
            }
            None => Ok(h),
        }
    }
}

/// Input projection for node or edge features.
#[derive(Debug, Clone)]
pub enum FeatureEncoder {
    /// Summed embedding lookups over integer feature columns.
    Categorical(CategoricalEncoder),
    /// Affine map over raw numeric features.
    Linear(Linear),
}

impl FeatureEncoder {
    pub(crate) fn linear(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self::Linear(linear(in_dim, out_dim, vb)?))
    }

    pub fn encode(&self, features: &Tensor) -> Result<Tensor> {
        match self {
            Self::Categorical(encoder) => encoder.encode(features),
            Self::Linear(lin) => Ok(lin.forward(features)?),
        }
    }
}
