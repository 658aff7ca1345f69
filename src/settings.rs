//! Configuration types for the RANSAC driver.
//!
//! All knobs are plain scalars with documented defaults. Settings are read
//! once per [`find_best_model`](crate::core::RansacDriver::find_best_model)
//! call; mutating them between runs is fine, mutating them mid-run is not
//! possible because the driver borrows itself mutably for the whole call.

use serde::{Deserialize, Serialize};

/// Post-consensus polishing strategy applied to the winning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refinement {
    /// Return the raw minimal-sample estimate unchanged.
    None,
    /// Re-fit all model parameters over the inlier set with
    /// [`lm_minimize`](crate::optim::lm_minimize).
    LevenbergMarquardt,
}

/// Scalar settings controlling the consensus loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RansacSettings {
    /// Hard cap on consensus iterations, regardless of the adaptive estimate.
    pub max_iterations: usize,
    /// Budget of minimal-sample draws per iteration before a degenerate
    /// configuration is declared unrecoverable and the whole run fails.
    pub max_samplings: usize,
    /// A candidate must collect strictly more inliers than this to be stored
    /// as the best model. 0 disables the bar.
    pub min_inliers: usize,
    /// Upper bound on the per-point fit score (squared distance for the
    /// rigid-plane model) for a point to count as an inlier.
    pub fitting_threshold: f64,
    /// Target probability that at least one drawn minimal sample is
    /// outlier-free; drives the adaptive iteration estimate.
    pub selection_probability: f64,
    /// Polish applied to the winning model by the high-level API.
    pub refinement: Refinement,
    /// Fixed RNG seed for reproducible runs; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_samplings: 100,
            min_inliers: 0,
            fitting_threshold: 1.0,
            selection_probability: 0.99,
            refinement: Refinement::LevenbergMarquardt,
            seed: None,
        }
    }
}
