//! Categorical feature encoders.
//!
//! A row of categorical indices `[c_0, .., c_{k-1}]` becomes one dense vector
//!
//! ```text
//! h = Σ_k E_k[c_k]
//! ```
//!
//! where `E_k` is the embedding table of attribute `k`. Tables are
//! initialised independently with Xavier-uniform bounds
//! `±sqrt(6 / (cardinality + emb_dim))`.

use candle_core::{DType, Module, Tensor};
use candle_nn::{Embedding, Init, VarBuilder};

use crate::error::{Error, Result};
use crate::features::{atom_feature_dims, bond_feature_dims};

/// Sum of per-attribute embedding lookups.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    tables: Vec<Embedding>,
    cardinalities: Vec<usize>,
    emb_dim: usize,
}

impl CategoricalEncoder {
    /// Create one embedding table per entry of `cardinalities`.
    ///
    /// Tables are registered as `embeddings.{i}.weight`.
    pub fn new(emb_dim: usize, cardinalities: &[usize], vb: VarBuilder) -> Result<Self> {
        if emb_dim == 0 {
            return Err(Error::InvalidConfig("embedding width must be positive".into()));
        }
        if let Some(column) = cardinalities.iter().position(|&c| c == 0) {
            return Err(Error::InvalidConfig(format!(
                "feature column {column} has an empty vocabulary"
            )));
        }

        let vb = vb.pp("embeddings");
        let tables = cardinalities
            .iter()
            .enumerate()
            .map(|(i, &cardinality)| {
                let bound = (6.0 / (cardinality + emb_dim) as f64).sqrt();
                let weight = vb.pp(i).get_with_hints(
                    (cardinality, emb_dim),
                    "weight",
                    Init::Uniform {
                        lo: -bound,
                        up: bound,
                    },
                )?;
                Ok(Embedding::new(weight, emb_dim))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tables,
            cardinalities: cardinalities.to_vec(),
            emb_dim,
        })
    }

    /// Atom encoder over [`atom_feature_dims`], or `dims` when given.
    pub fn atom(emb_dim: usize, dims: Option<&[usize]>, vb: VarBuilder) -> Result<Self> {
        match dims {
            Some(dims) => Self::new(emb_dim, dims, vb),
            None => Self::new(emb_dim, &atom_feature_dims(), vb),
        }
    }

    /// Bond encoder over [`bond_feature_dims`].
    pub fn bond(emb_dim: usize, vb: VarBuilder) -> Result<Self> {
        Self::new(emb_dim, &bond_feature_dims(), vb)
    }

    pub fn emb_dim(&self) -> usize {
        self.emb_dim
    }

    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    pub fn tables(&self) -> &[Embedding] {
        &self.tables
    }

    /// Encode an integer feature matrix.
    ///
    /// # Arguments
    /// - `features`: Categorical indices (N x k), `k <= num tables`
    ///
    /// # Returns
    /// - Summed embeddings (N x emb_dim)
    pub fn encode(&self, features: &Tensor) -> Result<Tensor> {
        let (n, columns) = features.dims2()?;
        if columns > self.tables.len() {
            return Err(Error::InvalidConfig(format!(
                "feature matrix has {columns} columns but the encoder has {} tables",
                self.tables.len()
            )));
        }
        if features.dtype().is_float() {
            return Err(Error::InvalidConfig(format!(
                "categorical features must be integers, got {:?}",
                features.dtype()
            )));
        }

        let indices = features.to_dtype(DType::I64)?;
        for (row_index, row) in indices.to_vec2::<i64>()?.iter().enumerate() {
            for (column, &value) in row.iter().enumerate() {
                let cardinality = self.cardinalities[column];
                if value < 0 || value as usize >= cardinality {
                    tracing::debug!(row = row_index, column, value, cardinality, "categorical index out of range");
                    return Err(Error::FeatureOutOfRange {
                        column,
                        value,
                        cardinality,
                    });
                }
            }
        }

        let indices = indices.to_dtype(DType::U32)?;
        let mut out = Tensor::zeros((n, self.emb_dim), self.dtype(), features.device())?;
        for (column, table) in self.tables.iter().take(columns).enumerate() {
            let ids = indices.narrow(1, column, 1)?.squeeze(1)?;
            out = (out + table.forward(&ids)?)?;
        }
        Ok(out)
    }

    fn dtype(&self) -> DType {
        self.tables
            .first()
            .map_or(DType::F32, |t| t.embeddings().dtype())
    }
}
