//! logo-detector — multi-instance logo detection via keypoint matching.
//!
//! Locates every instance of a set of known template images (logos) inside
//! a larger test image, tolerating affine/perspective distortion, and
//! scores the detections against ground-truth annotations. The pipeline
//! stages are:
//!
//! 1. **Features** – keypoints/descriptors come from a pluggable
//!    [`keypoints::FeatureExtractor`]; the crate never detects features
//!    itself.
//! 2. **Cluster** – mean-shift partitions the test image's keypoints into
//!    spatial groups so disjoint instances cannot merge into one match.
//! 3. **Match** – per cluster, each registered template is tried in turn:
//!    cross-checked brute-force descriptor matching, RANSAC homography
//!    with a 2 px reprojection gate, inlier-count verification, and a
//!    warp of the template corners into the test image.
//! 4. **Dedup** – greedy first-fit acceptance with an overlap gate against
//!    already-accepted detections.
//! 5. **Validate** – AABB-overlap scoring against annotation rows and
//!    dataset-level aggregation.

pub mod cluster;
pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod draw;
pub mod homography;
pub mod keypoints;
pub mod matching;
pub mod types;
pub mod validation;

// --- High-level re-exports -------------------------------------------------

pub use crate::detector::{DetectorParams, SelectionPolicy, Template, TemplateMatcher};
pub use crate::diagnostics::DetectionReport;
pub use crate::types::{Aabb, DetectedObject, GroundTruth, Quad};
pub use crate::validation::{
    aggregate, validate_detections, AggregateError, DatasetSummary, ImageTally,
};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use image::GrayImage;
/// use logo_detector::keypoints::{FeatureExtractor, KeypointSet};
/// use logo_detector::prelude::*;
///
/// struct MyExtractor;
/// impl FeatureExtractor for MyExtractor {
///     fn detect_and_compute(&self, _image: &GrayImage) -> KeypointSet {
///         KeypointSet::default()
///     }
/// }
///
/// # fn main() {
/// let mut detector = TemplateMatcher::new(Box::new(MyExtractor), DetectorParams::default());
/// detector.register("acme", &GrayImage::new(64, 64));
///
/// let test_image = GrayImage::new(640, 480);
/// let objects = detector.detect(&test_image);
/// println!("{} instances found", objects.len());
/// # }
/// ```
pub mod prelude {
    pub use crate::detector::{DetectorParams, TemplateMatcher};
    pub use crate::types::{DetectedObject, GroundTruth};
    pub use crate::validation::{aggregate, validate_detections, ImageTally};
}
