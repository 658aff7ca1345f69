//! Example: Robust similarity fitting from contaminated correspondences
//!
//! Fits a planar similarity transform to point matches where a third of the
//! matches are wrong, then compares the estimate against the ground truth.

use nalgebra::{DMatrix, Vector2};
use rand::Rng;
use simsac::api::estimate_similarity;
use simsac::models::SimilarityTransform;
use simsac::RansacSettings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Robust Similarity Fitting Example ===\n");

    let n_inliers = 70;
    let n_outliers = 30;
    let n_total = n_inliers + n_outliers;

    let mut rng = rand::thread_rng();

    // Ground truth: scale 1.5, rotation 0.3 rad, translation (10, -5).
    let truth = SimilarityTransform::new(1.5, 0.3, 10.0, -5.0);
    println!(
        "True transform: scale {:.2}, angle {:.2} rad, translation ({:.2}, {:.2})",
        truth.scale, truth.angle, truth.tx, truth.ty
    );
    println!(
        "Generating {} inliers and {} outliers\n",
        n_inliers, n_outliers
    );

    let mut points1 = DMatrix::<f64>::zeros(n_total, 2);
    let mut points2 = DMatrix::<f64>::zeros(n_total, 2);

    // Inliers: transformed points with a little noise on the destination.
    for i in 0..n_inliers {
        let x = rng.gen_range(-10.0..10.0);
        let y = rng.gen_range(-10.0..10.0);
        let q = truth.apply(Vector2::new(x, y));
        points1[(i, 0)] = x;
        points1[(i, 1)] = y;
        points2[(i, 0)] = q.x + rng.gen_range(-0.01..0.01);
        points2[(i, 1)] = q.y + rng.gen_range(-0.01..0.01);
    }

    // Outliers: unrelated matches.
    for i in n_inliers..n_total {
        points1[(i, 0)] = rng.gen_range(-10.0..10.0);
        points1[(i, 1)] = rng.gen_range(-10.0..10.0);
        points2[(i, 0)] = rng.gen_range(-30.0..30.0);
        points2[(i, 1)] = rng.gen_range(-30.0..30.0);
    }

    // Threshold is on the squared distance: 0.04 admits points within 0.2.
    let settings = RansacSettings {
        min_inliers: 40,
        ..RansacSettings::default()
    };
    let result = estimate_similarity(&points1, &points2, 0.04, Some(settings))?;

    println!("RANSAC results:");
    println!(
        "  Found {} inliers out of {} matches",
        result.inlier_count, n_total
    );
    println!(
        "  Inlier ratio: {:.2}%",
        100.0 * result.inlier_count as f64 / n_total as f64
    );
    println!("  Iterations: {}", result.iterations);

    let model = &result.model;
    println!(
        "\nEstimated transform: scale {:.4}, angle {:.4} rad, translation ({:.4}, {:.4})",
        model.scale, model.angle, model.tx, model.ty
    );
    println!("  Error in scale: {:.6}", (model.scale - truth.scale).abs());
    println!("  Error in angle: {:.6}", (model.angle - truth.angle).abs());
    println!(
        "  Error in translation: ({:.6}, {:.6})",
        (model.tx - truth.tx).abs(),
        (model.ty - truth.ty).abs()
    );

    // How many of the found inliers are true inliers?
    let true_inliers = result.inliers.iter().filter(|&&i| i < n_inliers).count();
    println!(
        "\nCorrectly identified {} of {} true inliers",
        true_inliers, n_inliers
    );

    Ok(())
}
