//! Hyperparameters shared by the model variants.

use kagnn_kan::SplineConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Model configuration.
///
/// # Example
///
/// ```rust,ignore
/// use kagnn_nn::ModelConfig;
///
/// let config = ModelConfig::default()
///     .with_num_node_features(9)
///     .with_hidden_dim(16)
///     .with_num_classes(2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Raw node feature width (default: 9).
    pub num_node_features: usize,
    /// Raw edge feature width, 0 for none (default: 0).
    #[serde(default)]
    pub num_edge_features: usize,
    /// Number of stacked convolution blocks (default: 2).
    pub gnn_layers: usize,
    /// Width of every block output (default: 64).
    pub hidden_dim: usize,
    /// Depth of the KANs built by the factory (default: 2).
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: usize,
    /// Spline knot intervals (default: 4).
    pub grid_size: usize,
    /// Spline polynomial order (default: 3).
    pub spline_order: usize,
    /// Output width of both heads (default: 1).
    pub num_classes: usize,
    /// Dropout probability after each block (default: 0.0).
    #[serde(default)]
    pub dropout: f64,
    /// Embed integer atom/bond features instead of projecting raw ones.
    #[serde(default)]
    pub ogb_encoders: bool,
}

fn default_hidden_layers() -> usize {
    2
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            num_node_features: 9,
            num_edge_features: 0,
            gnn_layers: 2,
            hidden_dim: 64,
            hidden_layers: default_hidden_layers(),
            grid_size: 4,
            spline_order: 3,
            num_classes: 1,
            dropout: 0.0,
            ogb_encoders: false,
        }
    }
}

impl ModelConfig {
    pub fn with_num_node_features(mut self, n: usize) -> Self {
        self.num_node_features = n;
        self
    }

    pub fn with_num_edge_features(mut self, n: usize) -> Self {
        self.num_edge_features = n;
        self
    }

    pub fn with_gnn_layers(mut self, n: usize) -> Self {
        self.gnn_layers = n;
        self
    }

    pub fn with_hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    pub fn with_hidden_layers(mut self, n: usize) -> Self {
        self.hidden_layers = n;
        self
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_spline_order(mut self, spline_order: usize) -> Self {
        self.spline_order = spline_order;
        self
    }

    pub fn with_num_classes(mut self, n: usize) -> Self {
        self.num_classes = n;
        self
    }

    pub fn with_dropout(mut self, p: f64) -> Self {
        self.dropout = p;
        self
    }

    pub fn with_ogb_encoders(mut self, enabled: bool) -> Self {
        self.ogb_encoders = enabled;
        self
    }

    /// Spline hyperparameters for the configured KANs.
    pub fn spline(&self) -> SplineConfig {
        SplineConfig::new(self.grid_size, self.spline_order)
    }

    /// Check the config is constructible.
    pub fn validate(&self) -> Result<()> {
        if self.gnn_layers == 0 {
            return Err(Error::InvalidConfig("gnn_layers must be at least 1".into()));
        }
        if self.hidden_dim == 0 || self.num_classes == 0 {
            return Err(Error::InvalidConfig(
                "hidden_dim and num_classes must be positive".into(),
            ));
        }
        if self.hidden_layers == 0 {
            return Err(Error::InvalidConfig("hidden_layers must be at least 1".into()));
        }
        if self.num_node_features == 0 && !self.ogb_encoders {
            return Err(Error::InvalidConfig("num_node_features must be positive".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        self.spline().validate()?;
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
