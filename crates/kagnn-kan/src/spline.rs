//! B-spline bases evaluated on tensors.
//!
//! The knot vector extends the interior grid by `spline_order` knots on each
//! side so that every point of `grid_range` is covered by exactly
//! `spline_order + 1` non-zero bases. The Cox-de Boor recursion is written
//! with broadcast tensor ops, so gradients flow from the bases back to the
//! input and on to whatever produced it.
//!
//! ```text
//! B_{i,0}(x) = 1 if t_i <= x < t_{i+1} else 0
//! B_{i,k}(x) = (x - t_i) / (t_{i+k} - t_i) * B_{i,k-1}(x)
//!            + (t_{i+k+1} - x) / (t_{i+k+1} - t_{i+1}) * B_{i+1,k-1}(x)
//! ```

use candle_core::{DType, Device, Result, Tensor};

use crate::config::SplineConfig;

/// Uniform knot positions for one input feature.
///
/// Returns `grid_size + 2 * spline_order + 1` knots, the interior ones
/// spanning `grid_range`.
pub fn uniform_knots(config: &SplineConfig) -> Vec<f64> {
    let (lo, hi) = config.grid_range;
    let h = (hi - lo) / config.grid_size as f64;
    let order = config.spline_order as i64;
    (-order..=(config.grid_size as i64 + order))
        .map(|i| lo + i as f64 * h)
        .collect()
}

/// Knot tensor of shape `(in_features, num_knots)`, one identical row per input.
pub fn knot_grid(
    config: &SplineConfig,
    in_features: usize,
    dtype: DType,
    device: &Device,
) -> Result<Tensor> {
    let knots = uniform_knots(config);
    let num_knots = knots.len();
    let data: Vec<f64> = (0..in_features).flat_map(|_| knots.iter().copied()).collect();
    Tensor::from_vec(data, (in_features, num_knots), device)?.to_dtype(dtype)
}

/// Evaluate all B-spline bases of `order` at every entry of `x`.
///
/// # Arguments
/// - `x`: Inputs (N x in_features)
/// - `grid`: Knots (in_features x num_knots)
/// - `order`: Spline order
///
/// # Returns
/// - Bases (N x in_features x (num_knots - order - 1))
pub fn b_spline_bases(x: &Tensor, grid: &Tensor, order: usize) -> Result<Tensor> {
    let dtype = x.dtype();
    let num_knots = grid.dim(1)?;
    if num_knots < order + 2 {
        candle_core::bail!("grid with {num_knots} knots cannot carry splines of order {order}");
    }

    // (N, in, 1) so each input broadcasts against its own knot row.
    let x = x.unsqueeze(2)?;

    let lower = grid.narrow(1, 0, num_knots - 1)?;
    let upper = grid.narrow(1, 1, num_knots - 1)?;
    let mut bases = x
        .broadcast_ge(&lower)?
        .to_dtype(dtype)?
        .mul(&x.broadcast_lt(&upper)?.to_dtype(dtype)?)?;

    for k in 1..=order {
        let width = num_knots - 1 - k;
        let t_i = grid.narrow(1, 0, width)?;
        let t_ik = grid.narrow(1, k, width)?;
        let t_i1 = grid.narrow(1, 1, width)?;
        let t_ik1 = grid.narrow(1, k + 1, width)?;

        let left = x
            .broadcast_sub(&t_i)?
            .broadcast_div(&(&t_ik - &t_i)?)?
            .mul(&bases.narrow(2, 0, width)?)?;
        let right = t_ik1
            .broadcast_sub(&x)?
            .broadcast_div(&(&t_ik1 - &t_i1)?)?
            .mul(&bases.narrow(2, 1, width)?)?;
        bases = (left + right)?;
    }

    Ok(bases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_knots_span_range() {
        let config = SplineConfig::new(4, 3);
        let knots = uniform_knots(&config);

        assert_eq!(knots.len(), config.num_knots());
        // Interior knots start at index `spline_order` and end at `len - 1 - spline_order`.
        assert!((knots[3] + 1.0).abs() < 1e-12);
        assert!((knots[knots.len() - 4] - 1.0).abs() < 1e-12);
        assert!((knots[1] - knots[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bases_shape() {
        let device = Device::Cpu;
        let config = SplineConfig::new(5, 3);
        let grid = knot_grid(&config, 4, DType::F32, &device).unwrap();
        let x = Tensor::randn(0f32, 0.3f32, (6, 4), &device).unwrap();

        let bases = b_spline_bases(&x, &grid, config.spline_order).unwrap();
        assert_eq!(bases.dims(), &[6, 4, config.num_coefficients()]);
    }

    #[test]
    fn test_partition_of_unity_inside_range() {
        // Inside the grid range the bases sum to one.
        let device = Device::Cpu;
        let config = SplineConfig::new(8, 3);
        let grid = knot_grid(&config, 1, DType::F32, &device).unwrap();
        let points = vec![-0.95f32, -0.5, -0.1, 0.0, 0.3, 0.75, 0.99];
        let x = Tensor::from_vec(points.clone(), (points.len(), 1), &device).unwrap();

        let sums = b_spline_bases(&x, &grid, config.spline_order)
            .unwrap()
            .sum(2)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();

        for (p, s) in points.iter().zip(sums.iter()) {
            assert!((s - 1.0).abs() < 1e-5, "Not partition of unity at x={}: sum={}", p, s);
        }
    }

    #[test]
    fn test_bases_vanish_far_outside_grid() {
        let device = Device::Cpu;
        let config = SplineConfig::new(4, 3);
        let grid = knot_grid(&config, 1, DType::F32, &device).unwrap();
        let x = Tensor::from_vec(vec![-10f32, 10.0], (2, 1), &device).unwrap();

        let total = b_spline_bases(&x, &grid, 3)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_order_zero_is_indicator() {
        let device = Device::Cpu;
        let config = SplineConfig::new(2, 0).with_grid_range(0.0, 2.0);
        let grid = knot_grid(&config, 1, DType::F32, &device).unwrap();
        let x = Tensor::from_vec(vec![0.5f32, 1.5], (2, 1), &device).unwrap();

        let bases = b_spline_bases(&x, &grid, 0)
            .unwrap()
            .squeeze(1)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        assert_eq!(bases, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
