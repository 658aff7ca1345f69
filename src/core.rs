//! Model contract and the randomized consensus driver.
//!
//! [`RobustModel`] is the complete capability set a geometric model exposes
//! to the driver: how many correspondences exist, how many a minimal sample
//! needs, candidate generation from a minimal sample, and per-point fit
//! scoring. [`RansacDriver`] owns one model instance plus the loop state and
//! runs the search; it knows nothing about the model's geometry.
//!
//! The driver signals failure through its `bool` return rather than an error
//! type so the hot loop stays allocation- and branching-light; the high-level
//! functions in [`api`](crate::api) translate that into a typed error.

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::settings::RansacSettings;
use crate::utils::SampleSequence;

/// Capability set a geometric model must expose to [`RansacDriver`].
pub trait RobustModel {
    /// Candidate model type produced from minimal samples.
    type Model: Clone;

    /// Total number of candidate correspondences available.
    fn total_sample_count(&self) -> usize;

    /// Number of correspondences a minimal sample needs; must be at least 1.
    fn min_samples(&self) -> usize;

    /// Generate zero or more candidate models from exactly
    /// [`min_samples`](Self::min_samples) point indices.
    ///
    /// An empty vector signals a degenerate or inadmissible configuration
    /// (coincident points, out-of-bounds scale or rotation). Degeneracy is
    /// never an error; the driver retries with a fresh sample.
    fn find_possible_models(&self, samples: &[usize]) -> Vec<Self::Model>;

    /// Non-negative fit score of one point under one candidate model, lower
    /// is better; typically a squared geometric distance.
    fn fit_to_model(&self, index: usize, model: &Self::Model) -> f64;
}

/// Randomized consensus loop over one [`RobustModel`] instance.
///
/// Construct with [`new`](Self::new) or [`with_seed`](Self::with_seed), call
/// [`find_best_model`](Self::find_best_model), then read the winning model
/// and its supporting points through the accessors. The driver can be run
/// repeatedly; every run starts from cleared best state and a fresh shuffled
/// permutation, reusing the RNG stream.
pub struct RansacDriver<M: RobustModel> {
    /// Loop settings, mutable between runs.
    pub settings: RansacSettings,
    model: M,
    rng: StdRng,
    best_model: Option<M::Model>,
    best_inliers: Vec<usize>,
    iterations: usize,
    required_iterations: usize,
}

impl<M: RobustModel> RansacDriver<M> {
    /// Create a driver, seeding the RNG from `settings.seed` when present
    /// and from entropy otherwise.
    pub fn new(model: M, settings: RansacSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            settings,
            model,
            rng,
            best_model: None,
            best_inliers: Vec::new(),
            iterations: 0,
            required_iterations: 0,
        }
    }

    /// Create a driver with an explicit RNG seed, overriding `settings.seed`.
    pub fn with_seed(model: M, settings: RansacSettings, seed: u64) -> Self {
        let mut driver = Self::new(model, settings);
        driver.rng = StdRng::seed_from_u64(seed);
        driver
    }

    /// Run the consensus search. Returns `true` iff a best model was
    /// accepted; on `false` the best model and inlier set are empty.
    ///
    /// One outer iteration draws a minimal sample (retrying degenerate draws
    /// up to `max_samplings` times), scores every candidate model against all
    /// points, and updates the stored best plus the adaptive iteration
    /// estimate. The loop ends when the iteration count reaches
    /// `min(max_iterations, required_iterations)`.
    pub fn find_best_model(&mut self) -> bool {
        self.best_model = None;
        self.best_inliers.clear();
        self.iterations = 0;
        self.required_iterations = 1;

        let total = self.model.total_sample_count();
        let min_samples = self.model.min_samples();
        if min_samples == 0 || total < min_samples {
            debug!(
                "consensus impossible: {} samples available, {} needed",
                total, min_samples
            );
            return false;
        }

        let mut sequence = SampleSequence::new(total, &mut self.rng);
        let mut inlier_buf: Vec<usize> = Vec::with_capacity(total);

        while self.iterations < self.settings.max_iterations.min(self.required_iterations) {
            // Draw until the model finds the sample non-degenerate. With only
            // one possible sample the first attempt settles it either way.
            let mut models = Vec::new();
            for _ in 0..self.settings.max_samplings {
                let block = sequence.next_block(min_samples, &mut self.rng);
                models = self.model.find_possible_models(block);
                if total == min_samples || !models.is_empty() {
                    break;
                }
            }
            if models.is_empty() {
                debug!(
                    "no admissible model within {} sampling draws",
                    self.settings.max_samplings
                );
                self.best_model = None;
                self.best_inliers.clear();
                return false;
            }

            for model in &models {
                inlier_buf.clear();
                for index in 0..total {
                    if self.model.fit_to_model(index, model) < self.settings.fitting_threshold {
                        inlier_buf.push(index);
                    }
                }

                if inlier_buf.len() > self.best_inliers.len() {
                    if inlier_buf.len() > self.settings.min_inliers {
                        debug!(
                            "consensus improved: {} of {} inliers at iteration {}",
                            inlier_buf.len(),
                            total,
                            self.iterations
                        );
                        self.best_model = Some(model.clone());
                        self.best_inliers.clear();
                        self.best_inliers.extend_from_slice(&inlier_buf);
                    }

                    let p = inlier_buf.len() as f64 / total as f64;
                    if p == 1.0 {
                        self.required_iterations = 0;
                    } else if p > 0.0 {
                        let estimate = (1.0 - self.settings.selection_probability).ln()
                            / (1.0 - p.powi(min_samples as i32)).ln();
                        self.required_iterations = estimate.round() as usize;
                    }
                    // p == 0 would make the estimate singular; the strict
                    // improvement test above keeps this branch unreachable,
                    // and the estimate is left as it was.
                }
            }

            self.iterations += 1;
        }

        self.best_model.is_some()
    }

    /// The accepted best model from the last run, if any.
    pub fn best_model(&self) -> Option<&M::Model> {
        self.best_model.as_ref()
    }

    /// Indices of the points supporting the best model, ascending.
    pub fn inlying_points(&self) -> &[usize] {
        &self.best_inliers
    }

    /// Number of points supporting the best model.
    pub fn inlier_count(&self) -> usize {
        self.best_inliers.len()
    }

    /// Outer iterations performed by the last run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Adaptive iteration estimate as of the end of the last run.
    pub fn required_iterations(&self) -> usize {
        self.required_iterations
    }

    /// Borrow the wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutably borrow the wrapped model, e.g. to adjust its bounds between
    /// runs.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Consume the driver and recover the wrapped model.
    pub fn into_model(self) -> M {
        self.model
    }
}
