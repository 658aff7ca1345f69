//! Planar similarity estimator for 2D point correspondences.

use std::f64::consts::TAU;

use nalgebra::{DMatrix, DVector, Vector2};

use crate::core::RobustModel;
use crate::models::SimilarityTransform;
use crate::optim::{lm_minimize, LmControl, ResidualFunction};
use crate::types::PointMatrix;

/// Estimates a 2D similarity transform (uniform scale, rotation, translation)
/// from point correspondences.
///
/// Correspondences are stored as an N×4 matrix with rows `[x1, y1, x2, y2]`,
/// mapping source `(x1, y1)` onto destination `(x2, y2)`. Two distinct
/// correspondences determine the transform in closed form; candidate models
/// whose scale falls outside `[min_scale, max_scale]` or whose rotation
/// exceeds `max_rotation` are treated as degenerate.
pub struct RigidPlaneEstimator {
    data: PointMatrix,
    min_scale: f64,
    max_scale: f64,
    max_rotation: f64,
}

impl RigidPlaneEstimator {
    /// Wrap an N×4 correspondence matrix. A matrix with a different column
    /// count yields an estimator with zero usable samples.
    pub fn new(correspondences: PointMatrix) -> Self {
        Self {
            data: correspondences,
            min_scale: 0.5,
            max_scale: 2.0,
            max_rotation: TAU,
        }
    }

    /// Pair up two N×2 point matrices row by row, truncating to the shorter
    /// one.
    pub fn from_point_sets(points1: &PointMatrix, points2: &PointMatrix) -> Self {
        if points1.ncols() < 2 || points2.ncols() < 2 {
            return Self::new(PointMatrix::zeros(0, 4));
        }
        let rows = points1.nrows().min(points2.nrows());
        let mut data = PointMatrix::zeros(rows, 4);
        for i in 0..rows {
            data[(i, 0)] = points1[(i, 0)];
            data[(i, 1)] = points1[(i, 1)];
            data[(i, 2)] = points2[(i, 0)];
            data[(i, 3)] = points2[(i, 1)];
        }
        Self::new(data)
    }

    /// Pair up two point slices, truncating to the shorter one. Accepts any
    /// scalar that widens losslessly into `f64`.
    pub fn from_point_slices<T: Copy + Into<f64>>(
        points1: &[[T; 2]],
        points2: &[[T; 2]],
    ) -> Self {
        let rows = points1.len().min(points2.len());
        let mut data = PointMatrix::zeros(rows, 4);
        for (i, (a, b)) in points1.iter().zip(points2.iter()).enumerate() {
            data[(i, 0)] = a[0].into();
            data[(i, 1)] = a[1].into();
            data[(i, 2)] = b[0].into();
            data[(i, 3)] = b[1].into();
        }
        Self::new(data)
    }

    /// Allowed scale range for candidate models.
    pub fn set_scale_bounds(&mut self, min_scale: f64, max_scale: f64) {
        self.min_scale = min_scale;
        self.max_scale = max_scale;
    }

    /// Maximum rotation in radians. Solved angles are normalized to
    /// `[0, 2π)` before the check, so the default of 2π admits every
    /// rotation.
    pub fn set_max_rotation(&mut self, max_rotation: f64) {
        self.max_rotation = max_rotation;
    }

    /// The wrapped correspondence matrix.
    pub fn correspondences(&self) -> &PointMatrix {
        &self.data
    }

    fn source(&self, index: usize) -> Vector2<f64> {
        Vector2::new(self.data[(index, 0)], self.data[(index, 1)])
    }

    fn destination(&self, index: usize) -> Vector2<f64> {
        Vector2::new(self.data[(index, 2)], self.data[(index, 3)])
    }

    /// Closed-form transform from correspondences `i` and `j`, or `None`
    /// when the pair is degenerate or the solution violates the bounds.
    fn solve_two_point(&self, i: usize, j: usize) -> Option<SimilarityTransform> {
        let d_src = self.source(j) - self.source(i);
        let d_dst = self.destination(j) - self.destination(i);

        let len_src = d_src.norm();
        let len_dst = d_dst.norm();
        // Coincident points carry no direction to solve against.
        if len_src <= f64::EPSILON || len_dst <= f64::EPSILON {
            return None;
        }

        let scale = len_dst / len_src;
        if scale < self.min_scale || scale > self.max_scale {
            return None;
        }

        let mut angle = d_dst.y.atan2(d_dst.x) - d_src.y.atan2(d_src.x);
        if angle < 0.0 {
            angle += TAU;
        }
        // Rounding in the addition can land exactly on 2π; keep [0, 2π).
        if angle >= TAU {
            angle -= TAU;
        }
        if angle > self.max_rotation {
            return None;
        }

        // Translation from the first correspondence: t = p2 − s·R(θ)·p1.
        let (sin, cos) = angle.sin_cos();
        let p1 = self.source(i);
        let p2 = self.destination(i);
        let tx = p2.x - scale * (cos * p1.x - sin * p1.y);
        let ty = p2.y - scale * (sin * p1.x + cos * p1.y);

        Some(SimilarityTransform::new(scale, angle, tx, ty))
    }

    /// Polish a consensus estimate over its inlier set, treating each
    /// inlier's squared distance as one least-squares residual.
    ///
    /// Returns `None` when `inliers` is empty; otherwise the minimizer
    /// reached from the given starting model.
    pub fn refine_model(
        &self,
        model: &SimilarityTransform,
        inliers: &[usize],
        control: &LmControl,
    ) -> Option<SimilarityTransform> {
        if inliers.is_empty() {
            return None;
        }
        let residuals = InlierResiduals {
            data: &self.data,
            inliers,
        };
        let minimum = lm_minimize(&residuals, &model.to_params(), control);
        Some(SimilarityTransform::from_params(&minimum.params))
    }
}

impl RobustModel for RigidPlaneEstimator {
    type Model = SimilarityTransform;

    fn total_sample_count(&self) -> usize {
        if self.data.ncols() == 4 {
            self.data.nrows()
        } else {
            0
        }
    }

    fn min_samples(&self) -> usize {
        2
    }

    fn find_possible_models(&self, samples: &[usize]) -> Vec<SimilarityTransform> {
        if samples.len() < 2 {
            return Vec::new();
        }
        let (i, j) = (samples[0], samples[1]);
        if i >= self.data.nrows() || j >= self.data.nrows() {
            return Vec::new();
        }
        match self.solve_two_point(i, j) {
            Some(model) => vec![model],
            None => Vec::new(),
        }
    }

    fn fit_to_model(&self, index: usize, model: &SimilarityTransform) -> f64 {
        (model.apply(self.source(index)) - self.destination(index)).norm_squared()
    }
}

/// Residuals of one inlier set under `[scale, angle, tx, ty]` parameters,
/// borrowing the estimator's correspondence matrix for the duration of a
/// refinement call.
struct InlierResiduals<'a> {
    data: &'a PointMatrix,
    inliers: &'a [usize],
}

impl InlierResiduals<'_> {
    /// Mapped-point error `u = s·R(θ)·p1 + t − p2` for one correspondence.
    fn point_error(&self, transform: &SimilarityTransform, index: usize) -> Vector2<f64> {
        let mapped = transform.apply(Vector2::new(self.data[(index, 0)], self.data[(index, 1)]));
        Vector2::new(
            mapped.x - self.data[(index, 2)],
            mapped.y - self.data[(index, 3)],
        )
    }
}

impl ResidualFunction for InlierResiduals<'_> {
    fn function_count(&self) -> usize {
        self.inliers.len()
    }

    fn residual_values(&self, params: &DVector<f64>, out: &mut DVector<f64>) {
        let transform = SimilarityTransform::from_params(params);
        for (k, &index) in self.inliers.iter().enumerate() {
            out[k] = self.point_error(&transform, index).norm_squared();
        }
    }

    fn has_jacobian(&self) -> bool {
        true
    }

    fn jacobian(&self, params: &DVector<f64>, out: &mut DMatrix<f64>) {
        let transform = SimilarityTransform::from_params(params);
        let (sin, cos) = transform.angle.sin_cos();
        for (k, &index) in self.inliers.iter().enumerate() {
            let p = Vector2::new(self.data[(index, 0)], self.data[(index, 1)]);
            let u = self.point_error(&transform, index);
            // r = uᵀu with u = s·R(θ)·p + t − q, so each derivative is
            // 2·uᵀ·∂u.
            let rotated = Vector2::new(cos * p.x - sin * p.y, sin * p.x + cos * p.y);
            let swirled = Vector2::new(-sin * p.x - cos * p.y, cos * p.x - sin * p.y);
            out[(0, k)] = 2.0 * u.dot(&rotated);
            out[(1, k)] = 2.0 * transform.scale * u.dot(&swirled);
            out[(2, k)] = 2.0 * u.x;
            out[(3, k)] = 2.0 * u.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use std::f64::consts::{FRAC_PI_2, PI};

    /// N×4 correspondence matrix mapping `sources` through `truth`.
    fn correspondences_for(truth: &SimilarityTransform, sources: &[(f64, f64)]) -> PointMatrix {
        let mut data = PointMatrix::zeros(sources.len(), 4);
        for (i, &(x, y)) in sources.iter().enumerate() {
            let q = truth.apply(Vector2::new(x, y));
            data[(i, 0)] = x;
            data[(i, 1)] = y;
            data[(i, 2)] = q.x;
            data[(i, 3)] = q.y;
        }
        data
    }

    fn inlier_ssq(estimator: &RigidPlaneEstimator, model: &SimilarityTransform) -> f64 {
        (0..estimator.total_sample_count())
            .map(|i| estimator.fit_to_model(i, model))
            .sum()
    }

    #[test]
    fn two_point_solve_recovers_exact_transform() {
        let truth = SimilarityTransform::new(1.2, 0.4, 3.0, -2.0);
        let data = correspondences_for(&truth, &[(0.0, 0.0), (2.0, 1.0), (5.0, -3.0)]);
        let estimator = RigidPlaneEstimator::new(data);

        let models = estimator.find_possible_models(&[0, 1]);
        assert_eq!(models.len(), 1);
        let model = &models[0];
        assert_relative_eq!(model.scale, truth.scale, epsilon = 1e-9);
        assert_relative_eq!(model.angle, truth.angle, epsilon = 1e-9);
        assert_relative_eq!(model.tx, truth.tx, epsilon = 1e-9);
        assert_relative_eq!(model.ty, truth.ty, epsilon = 1e-9);

        // The third point was not part of the sample but must fit too.
        assert!(estimator.fit_to_model(2, model) < 1e-12);
    }

    #[test]
    fn coincident_points_are_degenerate() {
        // Sources coincide.
        let mut data = PointMatrix::zeros(2, 4);
        data[(0, 0)] = 1.0;
        data[(0, 1)] = 1.0;
        data[(0, 2)] = 2.0;
        data[(0, 3)] = 2.0;
        data[(1, 0)] = 1.0;
        data[(1, 1)] = 1.0;
        data[(1, 2)] = 4.0;
        data[(1, 3)] = 5.0;
        let estimator = RigidPlaneEstimator::new(data);
        assert!(estimator.find_possible_models(&[0, 1]).is_empty());

        // Destinations coincide.
        let mut data = PointMatrix::zeros(2, 4);
        data[(0, 0)] = 0.0;
        data[(0, 1)] = 0.0;
        data[(0, 2)] = 3.0;
        data[(0, 3)] = 3.0;
        data[(1, 0)] = 1.0;
        data[(1, 1)] = 0.0;
        data[(1, 2)] = 3.0;
        data[(1, 3)] = 3.0;
        let estimator = RigidPlaneEstimator::new(data);
        assert!(estimator.find_possible_models(&[0, 1]).is_empty());
    }

    #[test]
    fn scale_bounds_reject_out_of_range_pairs() {
        let truth = SimilarityTransform::new(3.0, 0.1, 0.0, 0.0);
        let data = correspondences_for(&truth, &[(0.0, 0.0), (1.0, 2.0)]);
        let mut estimator = RigidPlaneEstimator::new(data);

        // Scale 3 lies outside the default [0.5, 2.0] range.
        assert!(estimator.find_possible_models(&[0, 1]).is_empty());

        estimator.set_scale_bounds(0.1, 5.0);
        let models = estimator.find_possible_models(&[0, 1]);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].scale, 3.0, epsilon = 1e-9);

        // A shrinking transform fails the lower bound the same way.
        let truth = SimilarityTransform::new(0.3, 0.1, 0.0, 0.0);
        let data = correspondences_for(&truth, &[(0.0, 0.0), (1.0, 2.0)]);
        let estimator = RigidPlaneEstimator::new(data);
        assert!(estimator.find_possible_models(&[0, 1]).is_empty());
    }

    #[test]
    fn rotation_bound_rejects_large_angles() {
        // A −90° rotation normalizes to 3π/2.
        let truth = SimilarityTransform::new(1.0, -FRAC_PI_2, 1.0, 2.0);
        let data = correspondences_for(&truth, &[(0.0, 0.0), (4.0, 1.0)]);
        let mut estimator = RigidPlaneEstimator::new(data);

        let models = estimator.find_possible_models(&[0, 1]);
        assert_eq!(models.len(), 1);
        assert_relative_eq!(models[0].angle, 3.0 * FRAC_PI_2, epsilon = 1e-9);

        estimator.set_max_rotation(PI);
        assert!(estimator.find_possible_models(&[0, 1]).is_empty());
    }

    #[test]
    fn fit_scores_are_squared_distances() {
        let mut data = PointMatrix::zeros(1, 4);
        data[(0, 2)] = 3.0;
        data[(0, 3)] = 4.0;
        let estimator = RigidPlaneEstimator::new(data);
        let identity = SimilarityTransform::identity();
        assert_abs_diff_eq!(estimator.fit_to_model(0, &identity), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn wrong_shape_matrix_has_no_samples() {
        let estimator = RigidPlaneEstimator::new(PointMatrix::zeros(5, 3));
        assert_eq!(estimator.total_sample_count(), 0);
    }

    #[test]
    fn point_slice_constructor_zips_to_shorter_input() {
        let a = [[0.0_f64, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let b = [[1.0_f64, 1.0], [2.0, 1.0]];
        let estimator = RigidPlaneEstimator::from_point_slices(&a, &b);
        assert_eq!(estimator.total_sample_count(), 2);
        assert_abs_diff_eq!(estimator.correspondences()[(1, 2)], 2.0, epsilon = 1e-12);

        let a = [[0_i32, 0], [2, 0]];
        let b = [[1_i32, 1], [5, 1]];
        let estimator = RigidPlaneEstimator::from_point_slices(&a, &b);
        assert_eq!(estimator.total_sample_count(), 2);
        assert_abs_diff_eq!(estimator.correspondences()[(1, 0)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn analytic_jacobian_matches_forward_differences() {
        let truth = SimilarityTransform::new(1.4, 0.25, 2.0, -1.0);
        let sources = [(0.0, 0.0), (1.0, 2.0), (-3.0, 1.5), (2.5, -0.5)];
        let data = correspondences_for(&truth, &sources);
        let inliers: Vec<usize> = (0..sources.len()).collect();
        let residuals = InlierResiduals {
            data: &data,
            inliers: &inliers,
        };

        // Probe away from the optimum so the derivatives are non-trivial.
        let params = DVector::from_column_slice(&[1.3, 0.1, 1.0, 0.5]);
        let mut analytic = DMatrix::zeros(4, sources.len());
        residuals.jacobian(&params, &mut analytic);

        let mut base = DVector::zeros(sources.len());
        residuals.residual_values(&params, &mut base);
        let eps = 1e-7;
        for j in 0..4 {
            let mut probe = params.clone();
            probe[j] += eps;
            let mut shifted = DVector::zeros(sources.len());
            residuals.residual_values(&probe, &mut shifted);
            for i in 0..sources.len() {
                let numeric = (shifted[i] - base[i]) / eps;
                assert_abs_diff_eq!(analytic[(j, i)], numeric, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn refinement_polishes_a_perturbed_estimate() {
        let truth = SimilarityTransform::new(1.5, 0.3, 10.0, -5.0);
        let sources: Vec<(f64, f64)> = (0..12)
            .map(|i| (0.7 * i as f64, ((i * i) % 5) as f64 - 2.0))
            .collect();
        let data = correspondences_for(&truth, &sources);
        let estimator = RigidPlaneEstimator::new(data);
        let inliers: Vec<usize> = (0..12).collect();

        let rough = SimilarityTransform::new(1.55, 0.26, 10.3, -5.2);
        let rough_ssq = inlier_ssq(&estimator, &rough);

        let refined = estimator
            .refine_model(&rough, &inliers, &LmControl::default())
            .unwrap();
        let refined_ssq = inlier_ssq(&estimator, &refined);

        assert!(refined_ssq < rough_ssq);
        assert!(refined_ssq < 1e-8);
        assert_abs_diff_eq!(refined.scale, truth.scale, epsilon = 1e-3);
        assert_abs_diff_eq!(refined.angle, truth.angle, epsilon = 1e-3);
        assert_abs_diff_eq!(refined.tx, truth.tx, epsilon = 1e-2);
        assert_abs_diff_eq!(refined.ty, truth.ty, epsilon = 1e-2);
    }

    #[test]
    fn refinement_without_inliers_returns_none() {
        let estimator = RigidPlaneEstimator::new(PointMatrix::zeros(0, 4));
        let identity = SimilarityTransform::identity();
        assert!(estimator
            .refine_model(&identity, &[], &LmControl::default())
            .is_none());
    }
}
