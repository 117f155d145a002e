//! GCN model whose convolution transforms are single KAN layers.

use candle_core::Tensor;
use candle_nn::{Dropout, VarBuilder};
use kagnn_kan::{make_kan, KANLinear, SplineConfig, KAN};
use tracing::{debug, trace};

use super::{Block, FeatureEncoder, GraphModel, ModelConfig};
use crate::conv::GCNConv;
use crate::encoder::CategoricalEncoder;
use crate::error::Result;
use crate::graph::GraphBatch;

/// Spline hyperparameters of the KAN inside every [`KAGCN`] convolution.
///
/// Fixed at grid 4, order 3 whatever the model's own `grid_size` and
/// `spline_order`; those only shape the two heads.
pub const GCN_INNER_SPLINE: SplineConfig = SplineConfig::new(4, 3);

/// A single spline layer `input_dim -> output_dim` with the
/// [`GCN_INNER_SPLINE`] hyperparameters.
pub fn kan_layer(input_dim: usize, output_dim: usize, vb: VarBuilder) -> Result<KANLinear> {
    Ok(KANLinear::new(input_dim, output_dim, GCN_INNER_SPLINE, vb)?)
}

/// GCN convolution whose pre-propagation transform is [`kan_layer`].
pub fn ka_gcn_layer(in_feat: usize, out_feat: usize, vb: VarBuilder) -> Result<GCNConv<KANLinear>> {
    let lin = kan_layer(in_feat, out_feat, vb.pp("lin"))?;
    Ok(GCNConv::new(lin, out_feat, true, vb)?)
}

/// GCN backbone with KAN transforms.
///
/// Each block is GCN conv, SiLU and dropout; there is no batch norm. The
/// graph head is a single-layer KAN regardless of `hidden_layers`.
#[derive(Debug, Clone)]
pub struct KAGCN {
    atom_encoder: FeatureEncoder,
    blocks: Vec<Block<GCNConv<KANLinear>>>,
    dropout: Dropout,
    node_head: KANLinear,
    graph_head: KAN,
    config: ModelConfig,
}

impl KAGCN {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let spline = config.spline();
        let hidden = config.hidden_dim;

        let atom_encoder = if config.ogb_encoders {
            FeatureEncoder::Categorical(CategoricalEncoder::atom(
                hidden,
                None,
                vb.pp("atom_encoder"),
            )?)
        } else {
            FeatureEncoder::linear(config.num_node_features, hidden, vb.pp("atom_encoder"))?
        };

        let blocks = (0..config.gnn_layers)
            .map(|i| Ok(Block::new(ka_gcn_layer(hidden, hidden, vb.pp("conv").pp(i))?, None)))
            .collect::<Result<Vec<_>>>()?;

        let graph_head = make_kan(hidden, hidden, config.num_classes, 1, spline, vb.pp("readout"))?;
        let node_head = KANLinear::new(hidden, config.num_classes, spline, vb.pp("lay_out"))?;

        let spline_parameters = blocks
            .iter()
            .map(|b| b.conv().lin().parameter_count())
            .sum::<usize>()
            + graph_head.parameter_count()
            + node_head.parameter_count();
        debug!(
            model = "KAGCN",
            layers = config.gnn_layers,
            hidden_dim = hidden,
            grid_size = config.grid_size,
            spline_order = config.spline_order,
            inner_grid_size = GCN_INNER_SPLINE.grid_size,
            inner_spline_order = GCN_INNER_SPLINE.spline_order,
            spline_parameters,
            "built graph model"
        );

        Ok(Self {
            atom_encoder,
            blocks,
            dropout: Dropout::new(config.dropout as f32),
            node_head,
            graph_head,
            config: config.clone(),
        })
    }

    pub fn atom_encoder(&self) -> &FeatureEncoder {
        &self.atom_encoder
    }

    pub fn blocks(&self) -> &[Block<GCNConv<KANLinear>>] {
        &self.blocks
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl GraphModel for KAGCN {
    fn node_embeddings(&self, batch: &GraphBatch, train: bool) -> Result<Tensor> {
        trace!(
            nodes = batch.num_nodes(),
            edges = batch.num_edges(),
            train,
            "KAGCN forward"
        );
        let mut h = self.atom_encoder.encode(batch.x())?;
        for block in &self.blocks {
            h = block.forward(&h, batch.edge_index(), train)?;
            h = candle_nn::ops::silu(&h)?;
            h = self.dropout.forward(&h, train)?;
        }
        Ok(h)
    }

    fn node_head(&self) -> &KANLinear {
        &self.node_head
    }

    fn graph_head(&self) -> &KAN {
        &self.graph_head
    }
}
