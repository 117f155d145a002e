//! Graph-level readout over node embeddings.

use candle_core::{DType, Result, Tensor};
use serde::{Deserialize, Serialize};

/// How node embeddings are reduced to one row per graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pooling {
    #[default]
    Sum,
    Mean,
}

impl Pooling {
    pub fn apply(self, x: &Tensor, batch: &Tensor, num_graphs: usize) -> Result<Tensor> {
        match self {
            Pooling::Sum => global_add_pool(x, batch, num_graphs),
            Pooling::Mean => global_mean_pool(x, batch, num_graphs),
        }
    }
}

/// Sum node rows per graph: `out[g] = Σ_{v : batch[v] = g} x[v]`.
///
/// `x` is `(N, C)`, `batch` is `(N,)`; the result is `(num_graphs, C)`.
/// Graphs with no nodes pool to zero.
pub fn global_add_pool(x: &Tensor, batch: &Tensor, num_graphs: usize) -> Result<Tensor> {
    let (n, channels) = x.dims2()?;
    let out = Tensor::zeros((num_graphs, channels), x.dtype(), x.device())?;
    if n == 0 || num_graphs == 0 {
        return Ok(out);
    }
    let batch = batch.to_dtype(DType::U32)?;
    out.index_add(&batch, x, 0)
}

/// Average node rows per graph.
pub fn global_mean_pool(x: &Tensor, batch: &Tensor, num_graphs: usize) -> Result<Tensor> {
    let n = x.dim(0)?;
    let sum = global_add_pool(x, batch, num_graphs)?;
    if n == 0 || num_graphs == 0 {
        return Ok(sum);
    }
    let batch = batch.to_dtype(DType::U32)?;
    let ones = Tensor::ones(n, x.dtype(), x.device())?;
    let counts = Tensor::zeros(num_graphs, x.dtype(), x.device())?
        .index_add(&batch, &ones, 0)?
        .maximum(1.0)?;
    sum.broadcast_div(&counts.unsqueeze(1)?)
}
