//! Robust perspective homography estimation.
//!
//! A seeded RANSAC loop around the normalised 4-point DLT solve, plus a
//! final least-squares refit on the consensus set. The reprojection
//! tolerance is part of [`RansacHomographyConfig`] and defaults to the
//! 2 px gate used throughout the detection pipeline.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

/// RANSAC configuration for homography fitting.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RansacHomographyConfig {
    /// Number of minimal-sample iterations.
    pub max_iters: usize,
    /// Reprojection error below which a correspondence counts as an inlier
    /// (pixels).
    pub inlier_threshold: f64,
    /// Minimum consensus size for a model to be reported at all.
    pub min_inliers: usize,
    /// RNG seed; fitting is deterministic for a fixed seed.
    pub seed: u64,
}

impl Default for RansacHomographyConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 2.0,
            min_inliers: 4,
            seed: 42,
        }
    }
}

/// Fitted homography with its consensus bookkeeping.
#[derive(Clone, Debug)]
pub struct RansacHomographyResult {
    /// Source-to-destination transform.
    pub h: Matrix3<f64>,
    /// Per-correspondence inlier classification, aligned with the input.
    pub inlier_mask: Vec<bool>,
    /// Per-correspondence reprojection error (pixels).
    pub errors: Vec<f64>,
    pub n_inliers: usize,
}

/// Applies `h` to `(x, y)` and dehomogenises.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let v = h * Vector3::new(x, y, 1.0);
    if v[2].abs() < EPS {
        return [f64::NAN, f64::NAN];
    }
    [v[0] / v[2], v[1] / v[2]]
}

/// Estimates the homography mapping `src` onto `dst` with RANSAC.
///
/// Errors when fewer than four correspondences are supplied, when no
/// minimal sample produces a model, or when the best consensus stays below
/// `config.min_inliers`.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacHomographyConfig,
) -> Result<RansacHomographyResult, String> {
    if src.len() != dst.len() {
        return Err(format!(
            "correspondence count mismatch: {} vs {}",
            src.len(),
            dst.len()
        ));
    }
    let n = src.len();
    if n < 4 {
        return Err(format!("need at least 4 correspondences, got {n}"));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Matrix3<f64>, Vec<f64>, usize, f64)> = None;

    for _ in 0..config.max_iters {
        let sample = rand::seq::index::sample(&mut rng, n, 4);
        let sample_src: Vec<[f64; 2]> = sample.iter().map(|i| src[i]).collect();
        let sample_dst: Vec<[f64; 2]> = sample.iter().map(|i| dst[i]).collect();
        let Some(h) = dlt_homography(&sample_src, &sample_dst) else {
            continue;
        };

        let errors = reprojection_errors(&h, src, dst);
        let (n_inliers, mean_err) = consensus(&errors, config.inlier_threshold);
        let better = match &best {
            None => true,
            Some((_, _, best_inliers, best_err)) => {
                n_inliers > *best_inliers || (n_inliers == *best_inliers && mean_err < *best_err)
            }
        };
        if better {
            best = Some((h, errors, n_inliers, mean_err));
            // A full consensus cannot be improved upon.
            if n_inliers == n {
                break;
            }
        }
    }

    let (mut h, mut errors, mut n_inliers, _) =
        best.ok_or_else(|| "no homography model found".to_string())?;
    if n_inliers < config.min_inliers {
        return Err(format!(
            "too few inliers: {n_inliers} < {}",
            config.min_inliers
        ));
    }

    // Least-squares refit on the consensus set; kept only when it does not
    // shrink the consensus (a degenerate refit must not ruin the result).
    let inlier_idx: Vec<usize> = errors
        .iter()
        .enumerate()
        .filter(|(_, &e)| e < config.inlier_threshold)
        .map(|(i, _)| i)
        .collect();
    let refit_src: Vec<[f64; 2]> = inlier_idx.iter().map(|&i| src[i]).collect();
    let refit_dst: Vec<[f64; 2]> = inlier_idx.iter().map(|&i| dst[i]).collect();
    if let Some(refit) = dlt_homography(&refit_src, &refit_dst) {
        let refit_errors = reprojection_errors(&refit, src, dst);
        let (refit_inliers, _) = consensus(&refit_errors, config.inlier_threshold);
        if refit_inliers >= n_inliers {
            h = refit;
            errors = refit_errors;
            n_inliers = refit_inliers;
        }
    }

    let inlier_mask: Vec<bool> = errors
        .iter()
        .map(|&e| e < config.inlier_threshold)
        .collect();
    Ok(RansacHomographyResult {
        h,
        inlier_mask,
        errors,
        n_inliers,
    })
}

fn consensus(errors: &[f64], threshold: f64) -> (usize, f64) {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    for &e in errors {
        if e < threshold {
            count += 1;
            sum += e;
        }
    }
    let mean = if count > 0 { sum / count as f64 } else { f64::INFINITY };
    (count, mean)
}

fn reprojection_errors(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]]) -> Vec<f64> {
    src.iter()
        .zip(dst)
        .map(|(s, d)| {
            let p = project(h, s[0], s[1]);
            if p[0].is_finite() && p[1].is_finite() {
                ((p[0] - d[0]).powi(2) + (p[1] - d[1]).powi(2)).sqrt()
            } else {
                f64::INFINITY
            }
        })
        .collect()
}

/// Hartley-normalised direct linear transform. Returns `None` for
/// degenerate configurations (coincident points, rank-deficient system).
fn dlt_homography(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = src.len();
    if n < 4 {
        return None;
    }
    let (t_src, src_n) = normalize_points(src)?;
    let (t_dst, dst_n) = normalize_points(dst)?;

    // Stack the 2n x 9 constraint matrix; pad to 9 rows so the SVD always
    // exposes the full right singular basis.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for i in 0..n {
        let [x1, y1] = src_n[i];
        let [x2, y2] = dst_n[i];
        let r1 = 2 * i;
        let r2 = 2 * i + 1;
        a[(r1, 0)] = -x1;
        a[(r1, 1)] = -y1;
        a[(r1, 2)] = -1.0;
        a[(r1, 6)] = x2 * x1;
        a[(r1, 7)] = x2 * y1;
        a[(r1, 8)] = x2;
        a[(r2, 3)] = -x1;
        a[(r2, 4)] = -y1;
        a[(r2, 5)] = -1.0;
        a[(r2, 6)] = y2 * x1;
        a[(r2, 7)] = y2 * y1;
        a[(r2, 8)] = y2;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    // Null vector = right singular vector of the smallest singular value.
    let mut min_idx = 0usize;
    for (i, &s) in svd.singular_values.iter().enumerate() {
        if s < svd.singular_values[min_idx] {
            min_idx = i;
        }
    }
    let hv = v_t.row(min_idx);
    let h_norm = Matrix3::new(hv[0], hv[1], hv[2], hv[3], hv[4], hv[5], hv[6], hv[7], hv[8]);

    let h = t_dst.try_inverse()? * h_norm * t_src;
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    // Fix the scale so downstream comparisons are stable.
    let s = h[(2, 2)];
    Some(if s.abs() > EPS { h / s } else { h })
}

/// Similarity transform moving the centroid to the origin and the mean
/// distance to sqrt(2), plus the transformed points.
fn normalize_points(points: &[[f64; 2]]) -> Option<(Matrix3<f64>, Vec<[f64; 2]>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    Some((t, normalized))
}
