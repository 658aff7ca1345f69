//! Geometric model types.
//!
//! The crate's concrete model is the planar similarity transform: uniform
//! scale, rotation, and translation between two 2D coordinate frames. The
//! struct here is a plain parameter container; fitting lives in
//! [`estimators`](crate::estimators) and the consensus loop in
//! [`core`](crate::core).

use nalgebra::{Matrix3, Vector2};
use serde::{Deserialize, Serialize};

use crate::types::{ParamVector, PointMatrix};

/// 2D similarity transform `q = s·R(θ)·p + t`.
///
/// Parameter order everywhere in the crate is `[scale, angle, tx, ty]`, with
/// the angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    /// Uniform scale factor.
    pub scale: f64,
    /// Rotation angle in radians, counter-clockwise.
    pub angle: f64,
    /// Translation along x.
    pub tx: f64,
    /// Translation along y.
    pub ty: f64,
}

impl SimilarityTransform {
    pub fn new(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        Self {
            scale,
            angle,
            tx,
            ty,
        }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Apply the transform to a single point.
    pub fn apply(&self, p: Vector2<f64>) -> Vector2<f64> {
        let (sin, cos) = self.angle.sin_cos();
        Vector2::new(
            self.scale * (cos * p.x - sin * p.y) + self.tx,
            self.scale * (sin * p.x + cos * p.y) + self.ty,
        )
    }

    /// Apply the transform to every row of an N×2 point matrix.
    pub fn transform_points(&self, points: &PointMatrix) -> PointMatrix {
        let mut out = PointMatrix::zeros(points.nrows(), 2);
        for r in 0..points.nrows() {
            let q = self.apply(Vector2::new(points[(r, 0)], points[(r, 1)]));
            out[(r, 0)] = q.x;
            out[(r, 1)] = q.y;
        }
        out
    }

    /// The inverse transform, mapping destination points back to sources.
    ///
    /// Requires a non-zero scale; the estimator's degeneracy bounds keep
    /// fitted scales strictly positive.
    pub fn inverse(&self) -> Self {
        let inv_scale = 1.0 / self.scale;
        let (sin, cos) = (-self.angle).sin_cos();
        Self {
            scale: inv_scale,
            angle: -self.angle,
            tx: -inv_scale * (cos * self.tx - sin * self.ty),
            ty: -inv_scale * (sin * self.tx + cos * self.ty),
        }
    }

    /// Homogeneous 3×3 matrix form, for composing with other planar maps.
    pub fn to_matrix3(&self) -> Matrix3<f64> {
        let (sin, cos) = self.angle.sin_cos();
        Matrix3::new(
            self.scale * cos,
            -self.scale * sin,
            self.tx,
            self.scale * sin,
            self.scale * cos,
            self.ty,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Pack into a `[scale, angle, tx, ty]` parameter vector.
    pub fn to_params(&self) -> ParamVector {
        ParamVector::from_column_slice(&[self.scale, self.angle, self.tx, self.ty])
    }

    /// Unpack from a `[scale, angle, tx, ty]` parameter vector.
    pub fn from_params(params: &ParamVector) -> Self {
        Self::new(params[0], params[1], params[2], params[3])
    }
}
