//! Message-passing convolutions over an edge list.
//!
//! Each layer is generic over its inner transform `F: Module`, so the same
//! convolution runs with a plain [`candle_nn::Linear`], a [`kagnn_kan::KAN`]
//! or a single [`kagnn_kan::KANLinear`]:
//! - [`EdgeConv`]: dynamic edge convolution (Wang et al., 2019)
//! - [`GINConv`]: graph isomorphism network (Xu et al., 2019)
//! - [`GCNConv`]: graph convolutional network (Kipf & Welling, 2017)
//!
//! # Message Passing Framework
//!
//! ```text
//! h_i' = UPDATE(h_i, AGGREGATE({MESSAGE(h_i, h_j) : j -> i}))
//! ```
//!
//! `edge_index` is a `(2, E)` integer tensor. Row 0 holds the message
//! source `j`, row 1 the receiving node `i`. Nodes without incoming edges
//! aggregate to zero.

use candle_core::{DType, Result, Tensor};
use candle_nn::{Module, VarBuilder};

/// Aggregation function for message passing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Aggregation {
    /// Sum aggregation: m_i = Σ m_ij
    #[default]
    Sum,
    /// Mean aggregation: m_i = (1/|N(i)|) Σ m_ij
    Mean,
    /// Element-wise max over incoming messages.
    Max,
}

/// A graph convolution driven by node features and connectivity.
pub trait GraphConv {
    /// Node features `(N, in)` and `edge_index` `(2, E)` to `(N, out)`.
    fn forward(&self, x: &Tensor, edge_index: &Tensor) -> Result<Tensor>;
}

/// Split `edge_index` into contiguous `(source, target)` index vectors.
pub(crate) fn endpoints(edge_index: &Tensor) -> Result<(Tensor, Tensor)> {
    let edge_index = edge_index.to_dtype(DType::U32)?;
    let src = edge_index.get(0)?.contiguous()?;
    let dst = edge_index.get(1)?.contiguous()?;
    Ok((src, dst))
}

/// Combine per-edge `messages` `(E, C)` into `(num_nodes, C)` at `dst`.
pub fn aggregate(
    messages: &Tensor,
    dst: &Tensor,
    num_nodes: usize,
    aggregation: Aggregation,
) -> Result<Tensor> {
    let (num_edges, channels) = messages.dims2()?;
    let device = messages.device();
    let dtype = messages.dtype();
    let zeros = Tensor::zeros((num_nodes, channels), dtype, device)?;
    if num_edges == 0 || num_nodes == 0 {
        return Ok(zeros);
    }

    match aggregation {
        Aggregation::Sum => zeros.index_add(dst, messages, 0),
        Aggregation::Mean => {
            let sum = zeros.index_add(dst, messages, 0)?;
            let ones = Tensor::ones(num_edges, dtype, device)?;
            let counts = Tensor::zeros(num_nodes, dtype, device)?
                .index_add(dst, &ones, 0)?
                .maximum(1.0)?;
            sum.broadcast_div(&counts.unsqueeze(1)?)
        }
        Aggregation::Max => {
            let targets = dst.to_vec1::<u32>()?;
            let mut incoming: Vec<Vec<u32>> = vec![Vec::new(); num_nodes];
            for (edge, &target) in targets.iter().enumerate() {
                incoming[target as usize].push(edge as u32);
            }

            let empty = Tensor::zeros(channels, dtype, device)?;
            let rows = incoming
                .iter()
                .map(|edges| {
                    if edges.is_empty() {
                        Ok(empty.clone())
                    } else {
                        let ids = Tensor::from_slice(edges.as_slice(), edges.len(), device)?;
                        messages.index_select(&ids, 0)?.max(0)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Tensor::stack(&rows, 0)
        }
    }
}

/// Edge convolution layer.
///
/// Implements: h_i' = AGG_{j -> i} F([h_i, h_j - h_i])
///
/// `F` maps `2 * in` channels to `out_channels`. The default aggregation is
/// [`Aggregation::Max`].
///
/// # Reference
///
/// Wang et al., "Dynamic Graph CNN for Learning on Point Clouds",
/// ACM TOG 2019.
#[derive(Debug, Clone)]
pub struct EdgeConv<F> {
    nn: F,
    out_channels: usize,
    aggregation: Aggregation,
}

impl<F: Module> EdgeConv<F> {
    /// Wrap `nn` as the per-edge message function.
    pub fn new(nn: F, out_channels: usize) -> Self {
        Self {
            nn,
            out_channels,
            aggregation: Aggregation::Max,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn nn(&self) -> &F {
        &self.nn
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }
}

impl<F: Module> GraphConv for EdgeConv<F> {
    fn forward(&self, x: &Tensor, edge_index: &Tensor) -> Result<Tensor> {
        let n = x.dim(0)?;
        let (src, dst) = endpoints(edge_index)?;
        if src.dim(0)? == 0 {
            return Tensor::zeros((n, self.out_channels), x.dtype(), x.device());
        }

        let x_i = x.index_select(&dst, 0)?;
        let x_j = x.index_select(&src, 0)?;
        let diff = (&x_j - &x_i)?;
        let messages = self.nn.forward(&Tensor::cat(&[&x_i, &diff], 1)?)?;
        aggregate(&messages, &dst, n, self.aggregation)
    }
}

/// Graph Isomorphism Network layer.
///
/// Implements: h_i' = F((1 + eps) * h_i + Σ_{j -> i} h_j)
///
/// `eps` is fixed at construction (0 unless set with [`GINConv::with_eps`]).
///
/// # Reference
///
/// Xu et al., "How Powerful are Graph Neural Networks?", ICLR 2019.
#[derive(Debug, Clone)]
pub struct GINConv<F> {
    nn: F,
    eps: f64,
}

impl<F: Module> GINConv<F> {
    pub fn new(nn: F) -> Self {
        Self { nn, eps: 0.0 }
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn nn(&self) -> &F {
        &self.nn
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }
}

impl<F: Module> GraphConv for GINConv<F> {
    fn forward(&self, x: &Tensor, edge_index: &Tensor) -> Result<Tensor> {
        let n = x.dim(0)?;
        let (src, dst) = endpoints(edge_index)?;
        let neighbors = if src.dim(0)? == 0 {
            x.zeros_like()?
        } else {
            aggregate(&x.index_select(&src, 0)?, &dst, n, Aggregation::Sum)?
        };
        let combined = ((x * (1.0 + self.eps))? + neighbors)?;
        self.nn.forward(&combined)
    }
}

/// Graph Convolutional Network layer.
///
/// Implements: H' = D^{-1/2} (A + I) D^{-1/2} F(H) + b
///
/// Where:
/// - A is the (optionally weighted) adjacency given by `edge_index`
/// - D is the in-degree matrix of A + I
/// - F is the inner transform, applied before propagation
/// - b is a zero-initialised bias
///
/// # Reference
///
/// Kipf & Welling, "Semi-Supervised Classification with Graph Convolutional
/// Networks", ICLR 2017.
#[derive(Debug, Clone)]
pub struct GCNConv<F> {
    lin: F,
    bias: Option<Tensor>,
    add_self_loops: bool,
    normalize: bool,
}

impl<F: Module> GCNConv<F> {
    /// Create a GCN layer around `lin`, registering `bias` when requested.
    pub fn new(lin: F, out_features: usize, bias: bool, vb: VarBuilder) -> Result<Self> {
        let bias = if bias {
            Some(vb.get_with_hints(out_features, "bias", candle_nn::Init::Const(0.0))?)
        } else {
            None
        };
        Ok(Self {
            lin,
            bias,
            add_self_loops: true,
            normalize: true,
        })
    }

    pub fn with_self_loops(mut self, add_self_loops: bool) -> Self {
        self.add_self_loops = add_self_loops;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn lin(&self) -> &F {
        &self.lin
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    /// Forward pass with optional per-edge weights `(E,)`.
    ///
    /// Self-loops carry weight 1. Nodes with zero degree receive no
    /// normalised messages (only the bias).
    pub fn forward_weighted(
        &self,
        x: &Tensor,
        edge_index: &Tensor,
        edge_weight: Option<&Tensor>,
    ) -> Result<Tensor> {
        let n = x.dim(0)?;
        let device = x.device();
        let dtype = x.dtype();

        let (mut src, mut dst) = endpoints(edge_index)?;
        let num_edges = src.dim(0)?;
        let mut weight = match edge_weight {
            Some(w) => w.flatten_all()?.to_dtype(dtype)?,
            None => Tensor::ones(num_edges, dtype, device)?,
        };
        if self.add_self_loops && n > 0 {
            let loops = Tensor::arange(0u32, n as u32, device)?;
            let loop_weight = Tensor::ones(n, dtype, device)?;
            if num_edges == 0 {
                src = loops.clone();
                dst = loops;
                weight = loop_weight;
            } else {
                src = Tensor::cat(&[&src, &loops], 0)?;
                dst = Tensor::cat(&[&dst, &loops], 0)?;
                weight = Tensor::cat(&[&weight, &loop_weight], 0)?;
            }
        }

        let h = self.lin.forward(x)?;
        let out = if src.dim(0)? == 0 {
            h.zeros_like()?
        } else {
            let norm = if self.normalize {
                let deg = Tensor::zeros(n, dtype, device)?.index_add(&dst, &weight, 0)?;
                let inv_sqrt = deg.maximum(f64::MIN_POSITIVE)?.sqrt()?.recip()?;
                let deg_inv_sqrt = deg.gt(0.0)?.where_cond(&inv_sqrt, &deg.zeros_like()?)?;
                let left = deg_inv_sqrt.index_select(&src, 0)?;
                let right = deg_inv_sqrt.index_select(&dst, 0)?;
                ((left * weight)? * right)?
            } else {
                weight
            };
            let messages = h.index_select(&src, 0)?.broadcast_mul(&norm.unsqueeze(1)?)?;
            aggregate(&messages, &dst, n, Aggregation::Sum)?
        };

        match &self.bias {
            Some(bias) => out.broadcast_add(bias),
            None => Ok(out),
        }
    }
}

impl<F: Module> GraphConv for GCNConv<F> {
    fn forward(&self, x: &Tensor, edge_index: &Tensor) -> Result<Tensor> {
        self.forward_weighted(x, edge_index, None)
    }
}
