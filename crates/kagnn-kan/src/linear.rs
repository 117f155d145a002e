//! A single Kolmogorov-Arnold layer.
//!
//! Every (input, output) pair carries its own learnable univariate function:
//! a B-spline with trainable coefficients plus a residual SiLU branch.
//!
//! ```text
//! y_o = Σ_i  w_base[o,i] · silu(x_i)  +  scaler[o,i] · Σ_c w_spline[o,i,c] · B_c(x_i)
//! ```

use candle_core::{Module, Result, Tensor};
use candle_nn::{ops, Init, VarBuilder};

use crate::config::SplineConfig;
use crate::spline::{b_spline_bases, knot_grid};

/// A KAN layer mapping `in_features` to `out_features`.
///
/// Parameters are registered through the [`VarBuilder`] as `base_weight`
/// `(out, in)`, `spline_weight` `(out, in, grid_size + spline_order)` and
/// `spline_scaler` `(out, in)`. The knot grid is a fixed buffer.
#[derive(Debug, Clone)]
pub struct KANLinear {
    in_features: usize,
    out_features: usize,
    config: SplineConfig,
    grid: Tensor,
    base_weight: Tensor,
    spline_weight: Tensor,
    spline_scaler: Tensor,
}

/// Kaiming-uniform bound with negative slope `sqrt(5) * scale`.
fn kaiming_bound(fan_in: usize, scale: f64) -> f64 {
    (6.0 / ((1.0 + 5.0 * scale * scale) * fan_in.max(1) as f64)).sqrt()
}

impl KANLinear {
    /// Create a new KAN layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `config`: Spline hyperparameters
    /// - `vb`: Variable builder for parameter initialization
    pub fn new(
        in_features: usize,
        out_features: usize,
        config: SplineConfig,
        vb: VarBuilder,
    ) -> crate::Result<Self> {
        config.validate()?;
        if in_features == 0 || out_features == 0 {
            return Err(crate::Error::InvalidConfig(format!(
                "KAN layer widths must be positive, got {in_features} -> {out_features}"
            )));
        }

        let grid = knot_grid(&config, in_features, vb.dtype(), vb.device())?;

        let base_bound = kaiming_bound(in_features, config.scale_base);
        let base_weight = vb.get_with_hints(
            (out_features, in_features),
            "base_weight",
            Init::Uniform {
                lo: -base_bound,
                up: base_bound,
            },
        )?;

        let noise = 0.5 * config.scale_noise / config.grid_size as f64;
        let spline_weight = vb.get_with_hints(
            (out_features, in_features, config.num_coefficients()),
            "spline_weight",
            Init::Uniform {
                lo: -noise,
                up: noise,
            },
        )?;

        let scaler_bound = kaiming_bound(in_features, config.scale_spline);
        let spline_scaler = vb.get_with_hints(
            (out_features, in_features),
            "spline_scaler",
            Init::Uniform {
                lo: -scaler_bound,
                up: scaler_bound,
            },
        )?;

        Ok(Self {
            in_features,
            out_features,
            config,
            grid,
            base_weight,
            spline_weight,
            spline_scaler,
        })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn config(&self) -> &SplineConfig {
        &self.config
    }

    /// Knot buffer (in_features x num_knots).
    pub fn grid(&self) -> &Tensor {
        &self.grid
    }

    pub fn base_weight(&self) -> &Tensor {
        &self.base_weight
    }

    pub fn spline_weight(&self) -> &Tensor {
        &self.spline_weight
    }

    pub fn spline_scaler(&self) -> &Tensor {
        &self.spline_scaler
    }

    /// Spline coefficients multiplied by their per-edge scaler.
    pub fn scaled_spline_weight(&self) -> Result<Tensor> {
        self.spline_weight
            .broadcast_mul(&self.spline_scaler.unsqueeze(2)?)
    }

    /// Number of trainable scalars.
    pub fn parameter_count(&self) -> usize {
        let edges = self.in_features * self.out_features;
        edges * (2 + self.config.num_coefficients())
    }

    /// Sparsity regulariser over the spline coefficients.
    ///
    /// `activation_weight * Σ|φ| + entropy_weight * H(|φ| / Σ|φ|)` where `|φ|`
    /// is the mean absolute coefficient of each edge function.
    pub fn regularization_loss(
        &self,
        activation_weight: f64,
        entropy_weight: f64,
    ) -> Result<Tensor> {
        let l1 = self.spline_weight.abs()?.mean(2)?;
        let total = l1.sum_all()?;
        let p = l1.broadcast_div(&total)?;
        // p * ln(p), with 0 * ln(0) taken as 0.
        let p_safe = p.maximum(f32::MIN_POSITIVE as f64)?;
        let entropy = p.mul(&p_safe.log()?)?.sum_all()?.neg()?;
        total.affine(activation_weight, 0.0)? + entropy.affine(entropy_weight, 0.0)?
    }
}

impl Module for KANLinear {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let (n, in_features) = x.dims2()?;
        if in_features != self.in_features {
            return Err(candle_core::Error::wrap(crate::Error::DimensionMismatch {
                expected: self.in_features,
                got: in_features,
            }));
        }

        let base = ops::silu(x)?.matmul(&self.base_weight.t()?)?;

        let coefficients = self.config.num_coefficients();
        let bases = b_spline_bases(x, &self.grid, self.config.spline_order)?
            .reshape((n, in_features * coefficients))?;
        let spline_weight = self
            .scaled_spline_weight()?
            .reshape((self.out_features, in_features * coefficients))?;
        let spline = bases.matmul(&spline_weight.t()?)?;

        base + spline
    }
}
