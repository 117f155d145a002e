//! Edge-convolution model: KAN messages over `[x_i, x_j - x_i]`.

use candle_core::Tensor;
use candle_nn::{batch_norm, BatchNormConfig, Dropout, VarBuilder};
use kagnn_kan::{make_kan, KANLinear, SplineConfig, KAN};
use tracing::{debug, trace};

use super::{Block, GraphModel, ModelConfig};
use crate::conv::EdgeConv;
use crate::error::Result;
use crate::graph::GraphBatch;

/// Edge convolution whose message function is a single-hidden-layer KAN.
///
/// The KAN maps `2 * in_channels` (center and neighbour difference) to
/// `out_channels`. Both spline hyperparameters are required; a missing one
/// fails before any parameter is registered.
pub fn ka_edge_conv_layer(
    in_channels: usize,
    out_channels: usize,
    grid_size: Option<usize>,
    spline_order: Option<usize>,
    vb: VarBuilder,
) -> Result<EdgeConv<KAN>> {
    let spline = SplineConfig::from_options(grid_size, spline_order)?;
    let kan = make_kan(2 * in_channels, out_channels, out_channels, 1, spline, vb)?;
    Ok(EdgeConv::new(kan, out_channels))
}

/// Edge-convolution backbone with KAN messages.
///
/// Each block is edge conv, batch norm, SiLU and dropout. The first block
/// reads `num_node_features` raw features; there is no input encoder.
#[derive(Debug, Clone)]
pub struct KAEdge {
    blocks: Vec<Block<EdgeConv<KAN>>>,
    dropout: Dropout,
    node_head: KANLinear,
    graph_head: KAN,
    config: ModelConfig,
}

impl KAEdge {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let spline = config.spline();
        let hidden = config.hidden_dim;

        let mut blocks = Vec::with_capacity(config.gnn_layers);
        for i in 0..config.gnn_layers {
            let in_channels = if i == 0 {
                config.num_node_features
            } else {
                hidden
            };
            let conv = ka_edge_conv_layer(
                in_channels,
                hidden,
                Some(config.grid_size),
                Some(config.spline_order),
                vb.pp("conv").pp(i),
            )?;
            let norm = batch_norm(hidden, BatchNormConfig::default(), vb.pp("bn").pp(i))?;
            blocks.push(Block::new(conv, Some(norm)));
        }

        let graph_head = make_kan(
            hidden,
            hidden,
            config.num_classes,
            config.hidden_layers,
            spline,
            vb.pp("kan"),
        )?;
        let node_head = KANLinear::new(hidden, config.num_classes, spline, vb.pp("lay_out"))?;

        let spline_parameters = blocks
            .iter()
            .map(|b| b.conv().nn().parameter_count())
            .sum::<usize>()
            + graph_head.parameter_count()
            + node_head.parameter_count();
        debug!(
            model = "KAEdge",
            layers = config.gnn_layers,
            hidden_dim = hidden,
            grid_size = config.grid_size,
            spline_order = config.spline_order,
            spline_parameters,
            "built graph model"
        );

        Ok(Self {
            blocks,
            dropout: Dropout::new(config.dropout as f32),
            node_head,
            graph_head,
            config: config.clone(),
        })
    }

    pub fn blocks(&self) -> &[Block<EdgeConv<KAN>>] {
        &self.blocks
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl GraphModel for KAEdge {
    fn node_embeddings(&self, batch: &GraphBatch, train: bool) -> Result<Tensor> {
        trace!(
            nodes = batch.num_nodes(),
            edges = batch.num_edges(),
            train,
            "KAEdge forward"
        );
        let mut h = batch.x().clone();
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

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use crate::models::Readout;

    fn config() -> ModelConfig {
        ModelConfig::default()
            .with_num_node_features(6)
            .with_gnn_layers(2)
            .with_hidden_dim(8)
            .with_num_classes(3)
    }

    fn ring(n: usize, features: usize, device: &Device) -> GraphBatch {
        let x = Tensor::randn(0f32, 1f32, (n, features), device).unwrap();
        let mut flat: Vec<i64> = (0..n as i64).collect();
        flat.extend((0..n as i64).map(|i| (i + 1) % n as i64));
        let ei = Tensor::from_vec(flat, (2, n), device).unwrap();
        GraphBatch::single(x, &ei).unwrap()
    }

    #[test]
    fn test_edge_layer_requires_grid_size() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let err = ka_edge_conv_layer(4, 8, None, Some(3), vb).unwrap_err();
        assert!(matches!(err, crate::Error::Kan(kagnn_kan::Error::InvalidConfig(_))));
        assert!(varmap.all_vars().is_empty());
    }

    #[test]
    fn test_edge_layer_requires_spline_order() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        assert!(ka_edge_conv_layer(4, 8, Some(4), None, vb).is_err());
        assert!(varmap.all_vars().is_empty());
    }

    #[test]
    fn test_edge_layer_kan_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let conv = ka_edge_conv_layer(5, 7, Some(4), Some(3), vb).unwrap();
        assert_eq!(conv.nn().widths(), vec![10, 7]);
    }

    #[test]
    fn test_kaedge_forward_shapes() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let model = KAEdge::new(&config(), vb).unwrap();
        assert_eq!(model.blocks().len(), 2);
        assert!(model.blocks().iter().all(|b| b.norm().is_some()));

        let batch = ring(7, 6, &device);
        let node = model.forward(&batch, Readout::Node, false).unwrap();
        assert_eq!(node.dims(), &[7, 3]);
        let graph = model.forward(&batch, Readout::Graph, false).unwrap();
        assert_eq!(graph.dims(), &[1, 3]);
    }

    #[test]
    fn test_first_block_reads_raw_features() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let model = KAEdge::new(&config(), vb).unwrap();
        assert_eq!(model.blocks()[0].conv().nn().in_features(), 12);
        assert_eq!(model.blocks()[1].conv().nn().in_features(), 16);
        assert_eq!(model.graph_head().widths(), vec![8, 8, 3]);
    }
}
