//! Stacked KAN layers and the shared factory used by every model.

use candle_core::{Module, Result, Tensor};
use candle_nn::VarBuilder;

use crate::config::SplineConfig;
use crate::linear::KANLinear;

/// A feed-forward stack of [`KANLinear`] layers.
///
/// There is no activation between layers: each edge function already
/// carries its own nonlinearity.
#[derive(Debug, Clone)]
pub struct KAN {
    layers: Vec<KANLinear>,
}

impl KAN {
    /// Create a KAN from its boundary widths `[in, hidden.., out]`.
    ///
    /// Layer `i` maps `widths[i] -> widths[i + 1]` and registers its
    /// parameters under `layers.{i}`.
    pub fn new(widths: &[usize], config: SplineConfig, vb: VarBuilder) -> crate::Result<Self> {
        if widths.len() < 2 {
            return Err(crate::Error::InvalidConfig(
                "Need at least input and output widths".into(),
            ));
        }

        let vb = vb.pp("layers");
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| KANLinear::new(pair[0], pair[1], config, vb.pp(i)))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[KANLinear] {
        &self.layers
    }

    /// Boundary widths `[in, hidden.., out]`.
    pub fn widths(&self) -> Vec<usize> {
        let mut widths = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            widths.push(first.in_features());
        }
        widths.extend(self.layers.iter().map(KANLinear::out_features));
        widths
    }

    pub fn in_features(&self) -> usize {
        self.layers.first().map_or(0, KANLinear::in_features)
    }

    pub fn out_features(&self) -> usize {
        self.layers.last().map_or(0, KANLinear::out_features)
    }

    /// Get total parameter count.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(KANLinear::parameter_count).sum()
    }

    /// Sum of [`KANLinear::regularization_loss`] over all layers.
    pub fn regularization_loss(
        &self,
        activation_weight: f64,
        entropy_weight: f64,
    ) -> Result<Tensor> {
        let mut total: Option<Tensor> = None;
        for layer in &self.layers {
            let loss = layer.regularization_loss(activation_weight, entropy_weight)?;
            total = Some(match total {
                Some(acc) => (acc + loss)?,
                None => loss,
            });
        }
        match total {
            Some(total) => Ok(total),
            None => candle_core::bail!("KAN has no layers"),
        }
    }
}

impl Module for KAN {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let mut current = x.clone();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }
}

/// Boundary widths produced by [`make_kan`].
///
/// `[in] + [hidden] * (hidden_layers - 1) + [out]`; `hidden_layers <= 1`
/// yields a single layer with no intermediate width.
pub fn layer_widths(
    num_features: usize,
    hidden_dim: usize,
    out_dim: usize,
    hidden_layers: usize,
) -> Vec<usize> {
    let mut widths = Vec::with_capacity(hidden_layers.max(1) + 1);
    widths.push(num_features);
    widths.extend(std::iter::repeat(hidden_dim).take(hidden_layers.saturating_sub(1)));
    widths.push(out_dim);
    widths
}

/// Build a KAN of `hidden_layers` spline layers.
///
/// Every model variant and readout head goes through this function so the
/// width layout is decided in one place.
pub fn make_kan(
    num_features: usize,
    hidden_dim: usize,
    out_dim: usize,
    hidden_layers: usize,
    config: SplineConfig,
    vb: VarBuilder,
) -> crate::Result<KAN> {
    let widths = layer_widths(num_features, hidden_dim, out_dim, hidden_layers);
    tracing::trace!(?widths, grid_size = config.grid_size, spline_order = config.spline_order, "building KAN");
    KAN::new(&widths, config, vb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn vb(varmap: &VarMap) -> VarBuilder<'_> {
        VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu)
    }

    #[test]
    fn test_layer_widths_single_layer() {
        assert_eq!(layer_widths(6, 32, 2, 1), vec![6, 2]);
        assert_eq!(layer_widths(6, 32, 2, 0), vec![6, 2]);
    }

    #[test]
    fn test_layer_widths_deep() {
        assert_eq!(layer_widths(6, 32, 2, 3), vec![6, 32, 32, 2]);
    }

    #[test]
    fn test_make_kan_single_layer_has_no_hidden_width() {
        let varmap = VarMap::new();
        let kan = make_kan(6, 32, 2, 1, SplineConfig::new(4, 3), vb(&varmap)).unwrap();

        assert_eq!(kan.layers().len(), 1);
        assert_eq!(kan.widths(), vec![6, 2]);
    }

    #[test]
    fn test_make_kan_deep() {
        let varmap = VarMap::new();
        let kan = make_kan(6, 16, 2, 4, SplineConfig::new(4, 3), vb(&varmap)).unwrap();

        assert_eq!(kan.layers().len(), 4);
        assert_eq!(kan.widths(), vec![6, 16, 16, 16, 2]);
        assert!(kan.layers()[1..3].iter().all(|l| l.in_features() == 16 && l.out_features() == 16));
    }

    #[test]
    fn test_kan_forward_shape() {
        let varmap = VarMap::new();
        let kan = KAN::new(&[3, 8, 4, 2], SplineConfig::default(), vb(&varmap)).unwrap();

        let x = Tensor::randn(0f32, 1f32, (5, 3), &Device::Cpu).unwrap();
        let out = kan.forward(&x).unwrap();
        assert_eq!(out.dims(), &[5, 2]);
    }

    #[test]
    fn test_kan_creation_invalid_widths() {
        let varmap = VarMap::new();
        assert!(KAN::new(&[3], SplineConfig::default(), vb(&varmap)).is_err());
    }

    #[test]
    fn test_identical_shapes_hold_independent_parameters() {
        let varmap = VarMap::new();
        let root = vb(&varmap);
        let a = make_kan(4, 4, 2, 2, SplineConfig::new(4, 3), root.pp("a")).unwrap();
        let b = make_kan(4, 4, 2, 2, SplineConfig::new(4, 3), root.pp("b")).unwrap();

        assert_eq!(a.widths(), b.widths());
        assert_eq!(a.parameter_count(), b.parameter_count());
        let wa = a.layers()[0].base_weight().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let wb = b.layers()[0].base_weight().flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert_ne!(wa, wb);
        assert_eq!(varmap.all_vars().len(), 2 * 2 * 3);
    }

    #[test]
    fn test_regularization_loss_sums_layers() {
        let varmap = VarMap::new();
        let kan = KAN::new(&[3, 4, 2], SplineConfig::default(), vb(&varmap)).unwrap();

        let total = kan.regularization_loss(1.0, 0.0).unwrap().to_scalar::<f32>().unwrap();
        let manual: f32 = kan
            .layers()
            .iter()
            .map(|l| l.regularization_loss(1.0, 0.0).unwrap().to_scalar::<f32>().unwrap())
            .sum();
        assert!((total - manual).abs() < 1e-6);
    }
}
