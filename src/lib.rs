//! # simsac - Robust estimation with RANSAC
//!
//! `simsac` estimates parametric models from correspondence data contaminated
//! by outliers. A randomized consensus loop draws minimal samples, solves
//! candidate models in closed form and keeps the candidate supported by the
//! most points; the winner can then be polished over its inlier set with the
//! bundled least-squares solvers.
//!
//! ## Quick Start
//!
//! The easiest way in is the high-level API:
//!
//! ```rust
//! use nalgebra::DMatrix;
//! use simsac::estimate_similarity;
//!
//! // Four correspondences displaced by (1, 1).
//! let points1 = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
//! let points2 = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 2.0, 1.0, 2.0, 2.0, 1.0, 2.0]);
//!
//! let result = estimate_similarity(&points1, &points2, 1e-6, None).unwrap();
//! assert_eq!(result.inlier_count, 4);
//! assert!((result.model.tx - 1.0).abs() < 1e-9);
//! ```
//!
//! ## Custom models
//!
//! The consensus loop is generic over [`RobustModel`](crate::core::RobustModel);
//! implementing it on your own type plugs a new geometry into
//! [`RansacDriver`](crate::core::RansacDriver):
//!
//! ```rust
//! use simsac::core::{RansacDriver, RobustModel};
//! use simsac::RansacSettings;
//!
//! // Scalar observations sharing one offset; the model is the offset.
//! struct OffsetModel {
//!     ys: Vec<f64>,
//! }
//!
//! impl RobustModel for OffsetModel {
//!     type Model = f64;
//!
//!     fn total_sample_count(&self) -> usize {
//!         self.ys.len()
//!     }
//!
//!     fn min_samples(&self) -> usize {
//!         1
//!     }
//!
//!     fn find_possible_models(&self, samples: &[usize]) -> Vec<f64> {
//!         vec![self.ys[samples[0]]]
//!     }
//!
//!     fn fit_to_model(&self, index: usize, model: &f64) -> f64 {
//!         (self.ys[index] - model).powi(2)
//!     }
//! }
//!
//! let model = OffsetModel {
//!     ys: vec![5.0, 5.01, 4.99, 5.02, 80.0],
//! };
//! let mut driver = RansacDriver::with_seed(model, RansacSettings::default(), 42);
//! assert!(driver.find_best_model());
//! assert_eq!(driver.inlier_count(), 4);
//! ```
//!
//! ## Modules
//!
//! - **[`api`](api)**: High-level estimation entry points
//! - **[`core`](crate::core)**: The model contract and the consensus driver
//! - **[`estimators`](estimators)**: Built-in model estimators
//! - **[`models`](models)**: Geometric model types
//! - **[`optim`](optim)**: Damped Gauss–Newton and quasi-Newton minimizers
//! - **[`settings`](settings)**: Configuration types for the consensus loop
//! - **[`types`](types)**: Matrix and vector aliases
//! - **[`utils`](utils)**: Sampling helpers

pub mod api;
pub mod core;
pub mod estimators;
pub mod models;
pub mod optim;
pub mod settings;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use api::{estimate_similarity, EstimationError, EstimationResult};

// Re-export the core trait and driver for easy access
pub use crate::core::{RansacDriver, RobustModel};

// Re-export settings for convenience
pub use settings::{RansacSettings, Refinement};
