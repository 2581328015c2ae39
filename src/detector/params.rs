//! Parameter types configuring the detection pipeline.

use serde::{Deserialize, Serialize};

use crate::homography::RansacHomographyConfig;
use crate::matching::DistanceNorm;

/// How candidates are chosen when several templates could claim a cluster.
///
/// The pipeline walks clusters in index order and templates in registration
/// order, committing to the first accepted candidate. This is a deliberate,
/// order-sensitive simplification of the full assignment problem; keeping
/// it behind an explicit policy leaves room for best-fit or global
/// assignment variants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SelectionPolicy {
    #[default]
    GreedyFirstFit,
}

/// Detector-wide parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Quantile driving the mean-shift bandwidth estimate.
    pub bandwidth_quantile: f32,
    /// Minimum cross-checked matches before a homography is attempted.
    pub min_matches: usize,
    /// Minimum inlier count the fitted homography must explain; `None`
    /// accepts any model the estimator reports.
    pub min_inliers: Option<usize>,
    /// Candidate rejection gate: fraction of an already-accepted
    /// detection's AABB area that the candidate may overlap.
    pub overlap_thresh: f64,
    /// Distance norm of the descriptor matcher.
    pub norm: DistanceNorm,
    /// Homography RANSAC configuration (2 px reprojection tolerance).
    pub ransac: RansacHomographyConfig,
    pub selection: SelectionPolicy,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            bandwidth_quantile: 0.02,
            min_matches: 10,
            min_inliers: Some(10),
            overlap_thresh: 0.5,
            norm: DistanceNorm::Hamming,
            ransac: RansacHomographyConfig::default(),
            selection: SelectionPolicy::default(),
        }
    }
}
