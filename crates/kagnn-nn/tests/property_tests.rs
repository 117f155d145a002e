//! Property-based tests for the graph models.
//!
//! - Readout shapes hold for any connectivity and graph assignment
//! - Sum pooling preserves the column totals
//! - Categorical encoding accepts every in-vocabulary row

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use kagnn_nn::{
    atom_feature_dims, global_add_pool, CategoricalEncoder, GraphBatch, GraphModel, ModelConfig,
    Readout, KAEdge, KAGCN, KAGIN,
};
use proptest::prelude::*;

/// Random graph: node count, directed edges and a sorted assignment.
fn arb_graph() -> impl Strategy<Value = (usize, Vec<(i64, i64)>, Vec<i64>)> {
    (1usize..9).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n as i64, 0..n as i64), 0..16);
        let assignment = prop::collection::vec(0i64..3, n).prop_map(|mut a| {
            a.sort_unstable();
            a
        });
        (Just(n), edges, assignment)
    })
}

fn to_batch(n: usize, edges: &[(i64, i64)], assignment: &[i64], features: usize) -> GraphBatch {
    let device = Device::Cpu;
    let x = Tensor::randn(0f32, 1f32, (n, features), &device).unwrap();
    let flat: Vec<i64> = edges
        .iter()
        .map(|&(s, _)| s)
        .chain(edges.iter().map(|&(_, t)| t))
        .collect();
    let edge_index = Tensor::from_vec(flat, (2, edges.len()), &device).unwrap();
    let batch = Tensor::from_slice(assignment, n, &device).unwrap();
    GraphBatch::new(x, &edge_index, &batch).unwrap()
}

fn small_config() -> ModelConfig {
    ModelConfig::default()
        .with_num_node_features(3)
        .with_num_edge_features(0)
        .with_gnn_layers(2)
        .with_hidden_dim(4)
        .with_hidden_layers(1)
        .with_num_classes(2)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn readout_shapes_for_any_graph((n, edges, assignment) in arb_graph()) {
        let batch = to_batch(n, &edges, &assignment, 3);
        let graphs = *assignment.iter().max().unwrap() as usize + 1;
        prop_assert_eq!(batch.num_graphs(), graphs);

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = small_config();
        let models: Vec<Box<dyn GraphModel>> = vec![
            Box::new(KAEdge::new(&config, vb.pp("edge")).unwrap()),
            Box::new(KAGIN::new(&config, vb.pp("gin")).unwrap()),
            Box::new(KAGCN::new(&config, vb.pp("gcn")).unwrap()),
        ];

        for model in &models {
            let node = model.forward(&batch, Readout::Node, false).unwrap();
            prop_assert_eq!(node.dims(), &[n, 2]);
            let graph = model.forward(&batch, Readout::Graph, false).unwrap();
            prop_assert_eq!(graph.dims(), &[graphs, 2]);
        }
    }

    #[test]
    fn add_pool_preserves_totals((n, _edges, assignment) in arb_graph()) {
        let device = Device::Cpu;
        let x = Tensor::randn(0f32, 1f32, (n, 3), &device).unwrap();
        let batch = Tensor::from_slice(assignment.as_slice(), n, &device).unwrap();
        let graphs = *assignment.iter().max().unwrap() as usize + 1;

        let pooled = global_add_pool(&x, &batch, graphs).unwrap();
        let pooled: Vec<f32> = pooled.sum(0).unwrap().to_vec1().unwrap();
        let total: Vec<f32> = x.sum(0).unwrap().to_vec1().unwrap();
        for (p, t) in pooled.iter().zip(&total) {
            prop_assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    fn atom_encoder_accepts_vocabulary_rows(
        rows in 1usize..6,
        seeds in prop::collection::vec(0usize..1000, 9),
    ) {
        let device = Device::Cpu;
        let dims = atom_feature_dims();
        let row: Vec<i64> = seeds.iter().zip(&dims).map(|(s, d)| (s % d) as i64).collect();
        let flat: Vec<i64> = row.iter().copied().cycle().take(rows * 9).collect();
        let x = Tensor::from_vec(flat, (rows, 9), &device).unwrap();

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let encoder = CategoricalEncoder::atom(6, None, vb).unwrap();
        let out = encoder.encode(&x).unwrap();
        prop_assert_eq!(out.dims(), &[rows, 6]);
    }
}
