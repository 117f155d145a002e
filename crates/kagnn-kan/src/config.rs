//! Spline hyperparameters shared by every KAN layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hyperparameters of the learnable spline on each KAN edge.
///
/// `grid_size` and `spline_order` shape the parameters; the remaining
/// fields only affect initialisation and the grid domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplineConfig {
    /// Number of knot intervals inside `grid_range`.
    pub grid_size: usize,
    /// Polynomial order of each spline segment (3 = cubic).
    pub spline_order: usize,
    /// Half-width scale of the initial coefficient noise (default: 0.1).
    #[serde(default = "default_scale_noise")]
    pub scale_noise: f64,
    /// Scale of the residual SiLU branch initialisation (default: 1.0).
    #[serde(default = "default_scale")]
    pub scale_base: f64,
    /// Scale of the per-edge spline scaler initialisation (default: 1.0).
    #[serde(default = "default_scale")]
    pub scale_spline: f64,
    /// Domain covered by the interior knots (default: (-1, 1)).
    #[serde(default = "default_grid_range")]
    pub grid_range: (f64, f64),
}

fn default_scale_noise() -> f64 {
    0.1
}

fn default_scale() -> f64 {
    1.0
}

fn default_grid_range() -> (f64, f64) {
    (-1.0, 1.0)
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self::new(5, 3)
    }
}

impl SplineConfig {
    /// Config with the given grid and order and default scales.
    pub const fn new(grid_size: usize, spline_order: usize) -> Self {
        Self {
            grid_size,
            spline_order,
            scale_noise: 0.1,
            scale_base: 1.0,
            scale_spline: 1.0,
            grid_range: (-1.0, 1.0),
        }
    }

    /// Build a config from optional hyperparameters.
    ///
    /// Both values are mandatory: a missing one is a configuration error,
    /// never a silent default.
    pub fn from_options(grid_size: Option<usize>, spline_order: Option<usize>) -> Result<Self> {
        let grid_size =
            grid_size.ok_or_else(|| Error::InvalidConfig("grid size must be provided".into()))?;
        let spline_order = spline_order
            .ok_or_else(|| Error::InvalidConfig("spline order must be provided".into()))?;
        let config = Self::new(grid_size, spline_order);
        config.validate()?;
        Ok(config)
    }

    pub fn with_scale_noise(mut self, scale_noise: f64) -> Self {
        self.scale_noise = scale_noise;
        self
    }

    pub fn with_scale_base(mut self, scale_base: f64) -> Self {
        self.scale_base = scale_base;
        self
    }

    pub fn with_scale_spline(mut self, scale_spline: f64) -> Self {
        self.scale_spline = scale_spline;
        self
    }

    pub fn with_grid_range(mut self, lo: f64, hi: f64) -> Self {
        self.grid_range = (lo, hi);
        self
    }

    /// Number of spline coefficients per edge: `grid_size + spline_order`.
    pub fn num_coefficients(&self) -> usize {
        self.grid_size + self.spline_order
    }

    /// Number of knots per input feature: `grid_size + 2 * spline_order + 1`.
    pub fn num_knots(&self) -> usize {
        self.grid_size + 2 * self.spline_order + 1
    }

    /// Check the config is usable.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::InvalidConfig("grid size must be at least 1".into()));
        }
        let (lo, hi) = self.grid_range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(Error::InvalidConfig(format!(
                "grid range must be a finite, non-empty interval, got ({lo}, {hi})"
            )));
        }
        if self.scale_noise < 0.0 || self.scale_base < 0.0 || self.scale_spline < 0.0 {
            return Err(Error::InvalidConfig("initialisation scales must be non-negative".into()));
        }
        Ok(())
    }
}
