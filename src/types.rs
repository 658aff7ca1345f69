//! Shared numeric types.
//!
//! Point data moves through the crate as plain `nalgebra` dynamic matrices;
//! the aliases here keep signatures short without committing callers to a
//! particular storage layout.

use nalgebra::{DMatrix, DVector};

/// Dynamic matrix of `f64` holding point data, one sample per row.
///
/// The rigid-plane estimator packs matched 2D point pairs into an N×4 matrix
/// with rows `[x1, y1, x2, y2]`; other model implementations are free to
/// choose their own column layout.
pub type PointMatrix = DMatrix<f64>;

/// Dynamic column vector of `f64` used for model parameters and residuals.
pub type ParamVector = DVector<f64>;
