//! Multi-instance template detection.
//!
//! The pipeline, cluster by cluster:
//! - extract keypoints/descriptors from the test image (via the plugged-in
//!   [`crate::keypoints::FeatureExtractor`]),
//! - partition them spatially with mean-shift ([`crate::cluster`]),
//! - for each cluster, try every registered template: cross-checked
//!   descriptor matching, RANSAC homography, inlier gate, corner warp
//!   ([`estimate`]),
//! - accept the first candidate that does not significantly overlap an
//!   earlier acceptance (greedy first-fit, see
//!   [`params::SelectionPolicy`]).
//!
//! Submodules
//! - [`params`] – detector configuration.
//! - `estimate` – per-(template, cluster) bounding-box estimation.
//! - `pipeline` – template registry and the [`TemplateMatcher`] itself.

mod estimate;
pub mod params;
mod pipeline;

pub use params::{DetectorParams, SelectionPolicy};
pub use pipeline::{overlaps_accepted, Template, TemplateMatcher};
