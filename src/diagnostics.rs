//! Per-detection diagnostics: stage counters and timings.

use serde::Serialize;

/// Wall-clock breakdown of one detection pass, in milliseconds.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TimingBreakdown {
    pub extract_ms: f64,
    pub cluster_ms: f64,
    pub match_ms: f64,
    pub total_ms: f64,
}

/// What one detection pass did, stage by stage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectionReport {
    /// Keypoints extracted from the test image.
    pub n_keypoints: usize,
    /// Spatial clusters the keypoints were partitioned into.
    pub n_clusters: usize,
    /// (cluster, template) estimation attempts.
    pub matching_attempts: usize,
    /// Candidates discarded by the overlap gate.
    pub overlap_rejections: usize,
    /// Accepted detections.
    pub n_detections: usize,
    pub timing: TimingBreakdown,
}
