//! High-level estimation entry points.
//!
//! These functions validate their inputs, wire an estimator into a
//! [`RansacDriver`](crate::core::RansacDriver), run the consensus search and
//! apply the configured refinement, reporting failures through
//! [`EstimationError`] instead of the driver's bare `bool`.

use std::fmt;

use nalgebra::DMatrix;

use crate::core::{RansacDriver, RobustModel};
use crate::estimators::RigidPlaneEstimator;
use crate::models::SimilarityTransform;
use crate::optim::LmControl;
use crate::settings::{RansacSettings, Refinement};

/// Why an estimation call produced no model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimationError {
    /// A point matrix did not have exactly two columns.
    InvalidDimensions {
        /// Rows of the offending matrix.
        rows: usize,
        /// Columns of the offending matrix.
        cols: usize,
    },
    /// The two point sets have different lengths.
    MismatchedPointSets {
        /// Rows in the first set.
        left: usize,
        /// Rows in the second set.
        right: usize,
    },
    /// Fewer correspondences than a minimal sample needs.
    TooFewCorrespondences {
        /// Minimal sample size of the model.
        needed: usize,
        /// Correspondences actually supplied.
        got: usize,
    },
    /// The consensus loop ended without an acceptable model.
    NoConsensus,
}

impl fmt::Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationError::InvalidDimensions { rows, cols } => {
                write!(f, "expected an Nx2 point matrix, got {}x{}", rows, cols)
            }
            EstimationError::MismatchedPointSets { left, right } => {
                write!(f, "point sets differ in length: {} vs {}", left, right)
            }
            EstimationError::TooFewCorrespondences { needed, got } => {
                write!(f, "need at least {} correspondences, got {}", needed, got)
            }
            EstimationError::NoConsensus => write!(f, "no model reached consensus"),
        }
    }
}

impl std::error::Error for EstimationError {}

/// Result of a successful estimation.
#[derive(Debug, Clone)]
pub struct EstimationResult<M> {
    /// The estimated model, refined according to the settings.
    pub model: M,
    /// Indices of inlier correspondences, ascending.
    pub inliers: Vec<usize>,
    /// Number of inlier correspondences.
    pub inlier_count: usize,
    /// Consensus iterations performed.
    pub iterations: usize,
}

/// Estimate a planar similarity transform from 2D point correspondences.
///
/// # Arguments
/// * `points1` - Source points (Nx2 matrix)
/// * `points2` - Destination points (Nx2 matrix, row-aligned with `points1`)
/// * `threshold` - Inlier threshold on the squared point distance; overrides
///   `settings.fitting_threshold`
/// * `settings` - Optional loop settings (uses defaults if None)
///
/// # Returns
/// `EstimationResult` with the transform, the inlier indices and the
/// iteration count.
///
/// # Example
/// ```
/// use nalgebra::DMatrix;
/// use simsac::api::estimate_similarity;
/// use simsac::settings::RansacSettings;
///
/// // Five points displaced by (1, 2).
/// let sources = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 1.0), (1.0, 3.0)];
/// let mut points1 = DMatrix::<f64>::zeros(5, 2);
/// let mut points2 = DMatrix::<f64>::zeros(5, 2);
/// for (i, (x, y)) in sources.iter().enumerate() {
///     points1[(i, 0)] = *x;
///     points1[(i, 1)] = *y;
///     points2[(i, 0)] = x + 1.0;
///     points2[(i, 1)] = y + 2.0;
/// }
///
/// let settings = RansacSettings {
///     seed: Some(7),
///     ..RansacSettings::default()
/// };
/// let result = estimate_similarity(&points1, &points2, 1e-6, Some(settings)).unwrap();
/// assert_eq!(result.inlier_count, 5);
/// assert!((result.model.tx - 1.0).abs() < 1e-9);
/// assert!((result.model.ty - 2.0).abs() < 1e-9);
/// ```
pub fn estimate_similarity(
    points1: &DMatrix<f64>,
    points2: &DMatrix<f64>,
    threshold: f64,
    settings_opt: Option<RansacSettings>,
) -> Result<EstimationResult<SimilarityTransform>, EstimationError> {
    for points in [points1, points2] {
        if points.ncols() != 2 {
            return Err(EstimationError::InvalidDimensions {
                rows: points.nrows(),
                cols: points.ncols(),
            });
        }
    }
    if points1.nrows() != points2.nrows() {
        return Err(EstimationError::MismatchedPointSets {
            left: points1.nrows(),
            right: points2.nrows(),
        });
    }

    let estimator = RigidPlaneEstimator::from_point_sets(points1, points2);
    if estimator.total_sample_count() < estimator.min_samples() {
        return Err(EstimationError::TooFewCorrespondences {
            needed: estimator.min_samples(),
            got: estimator.total_sample_count(),
        });
    }

    let mut settings = settings_opt.unwrap_or_default();
    settings.fitting_threshold = threshold;
    let refinement = settings.refinement;

    let mut driver = RansacDriver::new(estimator, settings);
    if !driver.find_best_model() {
        return Err(EstimationError::NoConsensus);
    }
    let model = match driver.best_model().copied() {
        Some(model) => model,
        None => return Err(EstimationError::NoConsensus),
    };

    let refined = match refinement {
        Refinement::LevenbergMarquardt => driver
            .model()
            .refine_model(&model, driver.inlying_points(), &LmControl::default())
            .unwrap_or(model),
        Refinement::None => model,
    };

    Ok(EstimationResult {
        model: refined,
        inliers: driver.inlying_points().to_vec(),
        inlier_count: driver.inlier_count(),
        iterations: driver.iterations(),
    })
}
