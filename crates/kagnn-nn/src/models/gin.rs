//! GIN model with a KAN update function and optional molecular encoders.

use candle_core::Tensor;
use candle_nn::{batch_norm, BatchNormConfig, Dropout, VarBuilder};
use kagnn_kan::{make_kan, KANLinear, KAN};
use tracing::{debug, trace};

use super::{Block, FeatureEncoder, GraphModel, ModelConfig};
use crate::conv::GINConv;
use crate::encoder::CategoricalEncoder;
use crate::error::Result;
use crate::graph::GraphBatch;

/// GIN backbone whose update function is a KAN.
///
/// Node features are encoded to `hidden_dim` first: summed atom
/// embeddings when `ogb_encoders` is set, a linear projection otherwise.
/// Each block is GIN conv, batch norm and dropout with no activation in
/// between, since the KAN is already nonlinear.
#[derive(Debug, Clone)]
pub struct KAGIN {
    atom_encoder: FeatureEncoder,
    bond_encoder: Option<FeatureEncoder>,
    blocks: Vec<Block<GINConv<KAN>>>,
    dropout: Dropout,
    node_head: KANLinear,
    graph_head: KAN,
    config: ModelConfig,
}

impl KAGIN {
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let spline = config.spline();
        let hidden = config.hidden_dim;

        let (atom_encoder, bond_encoder) = if config.ogb_encoders {
            let atom = CategoricalEncoder::atom(hidden, None, vb.pp("atom_encoder"))?;
            let bond = CategoricalEncoder::bond(hidden, vb.pp("bond_encoder"))?;
            (
                FeatureEncoder::Categorical(atom),
                Some(FeatureEncoder::Categorical(bond)),
            )
        } else {
            let atom =
                FeatureEncoder::linear(config.num_node_features, hidden, vb.pp("atom_encoder"))?;
            let bond = match config.num_edge_features {
                0 => None,
                n => Some(FeatureEncoder::linear(n, hidden, vb.pp("bond_encoder"))?),
            };
            (atom, bond)
        };

        let mut blocks = Vec::with_capacity(config.gnn_layers);
        for i in 0..config.gnn_layers {
            let nn = make_kan(
                hidden,
                hidden,
                hidden,
                config.hidden_layers,
                spline,
                vb.pp("conv").pp(i).pp("nn"),
            )?;
            let norm = batch_norm(hidden, BatchNormConfig::default(), vb.pp("bn").pp(i))?;
            blocks.push(Block::new(GINConv::new(nn), Some(norm)));
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
            model = "KAGIN",
            layers = config.gnn_layers,
            hidden_dim = hidden,
            grid_size = config.grid_size,
            spline_order = config.spline_order,
            ogb_encoders = config.ogb_encoders,
            spline_parameters,
            "built graph model"
        );

        Ok(Self {
            atom_encoder,
            bond_encoder,
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

    pub fn bond_encoder(&self) -> Option<&FeatureEncoder> {
        self.bond_encoder.as_ref()
    }

    pub fn blocks(&self) -> &[Block<GINConv<KAN>>] {
        &self.blocks
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Encode `batch.edge_attr` to `(num_edges, hidden_dim)`.
    ///
    /// Returns `None` when the batch carries no edge features or the model
    /// has no bond encoder. The convolutions do not consume the result.
    pub fn encode_edges(&self, batch: &GraphBatch) -> Result<Option<Tensor>> {
        match (&self.bond_encoder, batch.edge_attr()) {
            (Some(encoder), Some(edge_attr)) => Ok(Some(encoder.encode(edge_attr)?)),
            _ => Ok(None),
        }
    }
}

impl GraphModel for KAGIN {
    fn node_embeddings(&self, batch: &GraphBatch, train: bool) -> Result<Tensor> {
        trace!(
            nodes = batch.num_nodes(),
            edges = batch.num_edges(),
            train,
            "KAGIN forward"
        );
        let mut h = self.atom_encoder.encode(batch.x())?;
        for block in &self.blocks {
            h = block.forward(&h, batch.edge_index(), train)?;
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

    fn path(n: usize, x: Tensor, device: &Device) -> GraphBatch {
        let src: Vec<i64> = (0..n as i64 - 1).collect();
        let dst: Vec<i64> = (1..n as i64).collect();
        let flat: Vec<i64> = src.iter().chain(dst.iter()).copied().collect();
        let ei = Tensor::from_vec(flat, (2, n - 1), device).unwrap();
        GraphBatch::single(x, &ei).unwrap()
    }

    #[test]
    fn test_linear_encoders() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = ModelConfig::default()
            .with_num_node_features(5)
            .with_num_edge_features(2)
            .with_hidden_dim(8);

        let model = KAGIN::new(&config, vb).unwrap();
        assert!(matches!(model.atom_encoder(), FeatureEncoder::Linear(_)));

        let x = Tensor::randn(0f32, 1f32, (4, 5), &device).unwrap();
        let batch = path(4, x, &device)
            .with_edge_attr(Tensor::randn(0f32, 1f32, (3, 2), &device).unwrap())
            .unwrap();
        let edges = model.encode_edges(&batch).unwrap().unwrap();
        assert_eq!(edges.dims(), &[3, 8]);

        let out = model.forward_node(&batch, false).unwrap();
        assert_eq!(out.dims(), &[4, 1]);
    }

    #[test]
    fn test_no_bond_encoder_without_edge_features() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = ModelConfig::default()
            .with_num_edge_features(0)
            .with_hidden_dim(8);

        let model = KAGIN::new(&config, vb).unwrap();
        assert!(model.bond_encoder().is_none());
    }

    #[test]
    fn test_ogb_encoders_take_integer_features() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = ModelConfig::default()
            .with_ogb_encoders(true)
            .with_hidden_dim(8)
            .with_num_classes(2);

        let model = KAGIN::new(&config, vb).unwrap();
        assert!(matches!(model.atom_encoder(), FeatureEncoder::Categorical(_)));

        let rows: Vec<i64> = vec![
            5, 0, 2, 5, 1, 0, 2, 1, 1, //
            7, 1, 3, 5, 0, 0, 3, 0, 1, //
            0, 0, 1, 6, 3, 0, 4, 0, 0,
        ];
        let x = Tensor::from_vec(rows, (3, 9), &device).unwrap();
        let attr = Tensor::from_vec(vec![0i64, 0, 1, 3, 5, 1], (2, 3), &device).unwrap();
        let batch = path(3, x, &device).with_edge_attr(attr).unwrap();

        assert_eq!(model.encode_edges(&batch).unwrap().unwrap().dims(), &[2, 8]);
        assert_eq!(model.forward_graph(&batch, false).unwrap().dims(), &[1, 2]);
    }

    #[test]
    fn test_gin_blocks_use_configured_depth() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = ModelConfig::default()
            .with_hidden_dim(8)
            .with_hidden_layers(3)
            .with_gnn_layers(3);

        let model = KAGIN::new(&config, vb).unwrap();
        assert_eq!(model.blocks().len(), 3);
        for block in model.blocks() {
            assert_eq!(block.conv().nn().widths(), vec![8, 8, 8, 8]);
            assert_eq!(block.conv().eps(), 0.0);
        }
    }
}
