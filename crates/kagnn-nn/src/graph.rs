//! Graph inputs for a forward pass.

use candle_core::{DType, Tensor};

use crate::error::{Error, Result};

/// Node features, connectivity and graph assignment for one forward call.
///
/// `edge_index` is `(2 x E)` with row 0 the source `j` and row 1 the target
/// `i` of each message. `batch[v]` is the graph that node `v` belongs to.
/// Indices are stored as `u32`.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    x: Tensor,
    edge_index: Tensor,
    batch: Tensor,
    edge_attr: Option<Tensor>,
    edge_weight: Option<Tensor>,
    num_graphs: usize,
}

impl GraphBatch {
    /// Create a batch, validating connectivity and assignment.
    ///
    /// # Arguments
    /// - `x`: Node features (N x F), float or categorical indices
    /// - `edge_index`: Edge list (2 x E), any integer dtype
    /// - `batch`: Graph assignment (N), any integer dtype
    pub fn new(x: Tensor, edge_index: &Tensor, batch: &Tensor) -> Result<Self> {
        let num_nodes = x.dim(0)?;

        let dims = edge_index.dims();
        if dims.len() != 2 || dims[0] != 2 {
            return Err(Error::InvalidGraph(format!(
                "edge_index must have shape (2, E), got {dims:?}"
            )));
        }
        let edge_index = edge_index.to_dtype(DType::I64)?;
        if let Some(&bad) = edge_index
            .flatten_all()?
            .to_vec1::<i64>()?
            .iter()
            .find(|&&v| v < 0 || v as usize >= num_nodes)
        {
            return Err(Error::InvalidGraph(format!(
                "edge endpoint {bad} out of range for {num_nodes} nodes"
            )));
        }

        let batch = batch.flatten_all()?.to_dtype(DType::I64)?;
        let assignment = batch.to_vec1::<i64>()?;
        if assignment.len() != num_nodes {
            return Err(Error::InvalidGraph(format!(
                "batch assigns {} nodes but x has {num_nodes}",
                assignment.len()
            )));
        }
        if let Some(&bad) = assignment.iter().find(|&&g| g < 0) {
            return Err(Error::InvalidGraph(format!("negative graph index {bad}")));
        }
        let num_graphs = assignment.iter().max().map_or(0, |&g| g as usize + 1);

        Ok(Self {
            x,
            edge_index: edge_index.to_dtype(DType::U32)?,
            batch: batch.to_dtype(DType::U32)?,
            edge_attr: None,
            edge_weight: None,
            num_graphs,
        })
    }

    /// A batch holding a single graph.
    pub fn single(x: Tensor, edge_index: &Tensor) -> Result<Self> {
        let num_nodes = x.dim(0)?;
        let batch = Tensor::zeros(num_nodes, DType::U32, x.device())?;
        Self::new(x, edge_index, &batch)
    }

    /// Attach per-edge features (E x F_e).
    pub fn with_edge_attr(mut self, edge_attr: Tensor) -> Result<Self> {
        self.check_edge_rows(&edge_attr, "edge_attr")?;
        self.edge_attr = Some(edge_attr);
        Ok(self)
    }

    /// Attach per-edge scalar weights (E).
    pub fn with_edge_weight(mut self, edge_weight: Tensor) -> Result<Self> {
        self.check_edge_rows(&edge_weight, "edge_weight")?;
        self.edge_weight = Some(edge_weight);
        Ok(self)
    }

    fn check_edge_rows(&self, t: &Tensor, name: &str) -> Result<()> {
        let rows = t.dim(0)?;
        if rows != self.num_edges() {
            return Err(Error::InvalidGraph(format!(
                "{name} has {rows} rows but the graph has {} edges",
                self.num_edges()
            )));
        }
        Ok(())
    }

    pub fn x(&self) -> &Tensor {
        &self.x
    }

    pub fn edge_index(&self) -> &Tensor {
        &self.edge_index
    }

    pub fn batch(&self) -> &Tensor {
        &self.batch
    }

    pub fn edge_attr(&self) -> Option<&Tensor> {
        self.edge_attr.as_ref()
    }

    pub fn edge_weight(&self) -> Option<&Tensor> {
        self.edge_weight.as_ref()
    }

    pub fn num_nodes(&self) -> usize {
        self.x.dims().first().copied().unwrap_or(0)
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.dims()[1]
    }

    /// Number of graphs: largest assignment plus one.
    pub fn num_graphs(&self) -> usize {
        self.num_graphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn path_edges(device: &Device) -> Tensor {
        Tensor::from_vec(vec![0i64, 1, 1, 2, 1, 0, 2, 1], (2, 4), device).unwrap()
    }

    #[test]
    fn test_single_graph_batch() {
        let device = Device::Cpu;
        let x = Tensor::randn(0f32, 1f32, (3, 4), &device).unwrap();
        let g = GraphBatch::single(x, &path_edges(&device)).unwrap();

        assert_eq!(g.num_nodes(), 3);
        assert_eq!(g.num_edges(), 4);
        assert_eq!(g.num_graphs(), 1);
        assert_eq!(g.edge_index().dtype(), DType::U32);
    }

    #[test]
    fn test_num_graphs_from_assignment() {
        let device = Device::Cpu;
        let x = Tensor::zeros((4, 2), DType::F32, &device).unwrap();
        let edges = Tensor::from_vec(vec![0u32, 2, 1, 3], (2, 2), &device).unwrap();
        let batch = Tensor::new(&[0u32, 0, 1, 2], &device).unwrap();

        let g = GraphBatch::new(x, &edges, &batch).unwrap();
        assert_eq!(g.num_graphs(), 3);
    }

    #[test]
    fn test_edge_endpoint_out_of_range() {
        let device = Device::Cpu;
        let x = Tensor::zeros((2, 2), DType::F32, &device).unwrap();
        let edges = Tensor::from_vec(vec![0i64, 2], (2, 1), &device).unwrap();

        let err = GraphBatch::single(x, &edges).unwrap_err();
        assert!(matches!(err, Error::InvalidGraph(_)));
    }

    #[test]
    fn test_bad_edge_index_shape() {
        let device = Device::Cpu;
        let x = Tensor::zeros((2, 2), DType::F32, &device).unwrap();
        let edges = Tensor::from_vec(vec![0i64, 1, 1], (3, 1), &device).unwrap();
        assert!(GraphBatch::single(x, &edges).is_err());
    }

    #[test]
    fn test_batch_length_mismatch() {
        let device = Device::Cpu;
        let x = Tensor::zeros((3, 2), DType::F32, &device).unwrap();
        let batch = Tensor::new(&[0u32, 0], &device).unwrap();
        assert!(GraphBatch::new(x, &path_edges(&device), &batch).is_err());
    }

    #[test]
    fn test_edge_weight_rows_checked() {
        let device = Device::Cpu;
        let x = Tensor::zeros((3, 2), DType::F32, &device).unwrap();
        let g = GraphBatch::single(x, &path_edges(&device)).unwrap();

        assert!(g.clone().with_edge_weight(Tensor::ones(4, DType::F32, &device).unwrap()).is_ok());
        assert!(g.with_edge_weight(Tensor::ones(3, DType::F32, &device).unwrap()).is_err());
    }
}
