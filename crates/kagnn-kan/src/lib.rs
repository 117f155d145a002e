//! Kolmogorov-Arnold Network layers for candle.
//!
//! A KAN replaces the fixed `activation(W x)` of an MLP layer by a learnable
//! univariate function on every edge:
//!
//! ```text
//! MLP:  y = σ(W x)
//! KAN:  y_o = Σ_i φ_{o,i}(x_i)
//! ```
//!
//! Each `φ` is a B-spline over a uniform knot grid plus a SiLU residual
//! branch. Two hyperparameters fix its shape:
//!
//! - **grid size**: number of knot intervals inside the grid range
//! - **spline order**: polynomial degree of each segment
//!
//! ## Modules
//!
//! - [`config`]: [`SplineConfig`] hyperparameters
//! - [`spline`]: knot grids and Cox-de Boor basis evaluation on tensors
//! - [`linear`]: [`KANLinear`], a single layer
//! - [`network`]: [`KAN`] stacks and the [`make_kan`] factory
//!
//! ## Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device, Module, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use kagnn_kan::{make_kan, SplineConfig};
//!
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//! // 16 -> 32 -> 32 -> 2
//! let kan = make_kan(16, 32, 2, 3, SplineConfig::new(4, 3), vb)?;
//! let x = Tensor::randn(0f32, 1f32, (10, 16), &Device::Cpu)?;
//! let y = kan.forward(&x)?; // (10, 2)
//! ```
//!
//! ## References
//!
//! - Liu et al. (2024). "KAN: Kolmogorov-Arnold Networks."

pub mod config;
pub mod error;
pub mod linear;
pub mod network;
pub mod spline;

pub use config::SplineConfig;
pub use error::{Error, Result};
pub use linear::KANLinear;
pub use network::{layer_widths, make_kan, KAN};
