//! Template registry and the detection pipeline.

use std::time::Instant;

use image::GrayImage;
use log::debug;

use super::estimate::matching_bounding_box;
use super::params::{DetectorParams, SelectionPolicy};
use crate::cluster::cluster_keypoints;
use crate::diagnostics::{DetectionReport, TimingBreakdown};
use crate::keypoints::{FeatureExtractor, KeypointSet};
use crate::matching::{BruteForceMatcher, DescriptorMatcher};
use crate::types::{DetectedObject, Quad};

/// A registered template: its pixels (the corner geometry of the warp)
/// and the extracted keypoints.
#[derive(Clone, Debug)]
pub struct Template {
    pub label: String,
    pub image: GrayImage,
    pub keys: KeypointSet,
}

impl Template {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Multi-instance detector over an ordered template registry.
///
/// Registration order is significant: within a cluster, templates are
/// tried first-registered first, and the first accepted candidate wins.
/// The registry is append-only; `detect` never mutates, so a built
/// detector can serve concurrent callers as long as the plugged-in
/// capabilities are reentrant.
pub struct TemplateMatcher {
    extractor: Box<dyn FeatureExtractor>,
    matcher: Box<dyn DescriptorMatcher>,
    templates: Vec<Template>,
    params: DetectorParams,
}

impl TemplateMatcher {
    /// Builds a detector around a feature extractor, matching descriptors
    /// with the stock cross-checked brute-force matcher under
    /// `params.norm`.
    pub fn new(extractor: Box<dyn FeatureExtractor>, params: DetectorParams) -> Self {
        let matcher = Box::new(BruteForceMatcher::new(params.norm));
        Self::with_matcher(extractor, matcher, params)
    }

    /// Builds a detector with a caller-supplied descriptor matcher.
    pub fn with_matcher(
        extractor: Box<dyn FeatureExtractor>,
        matcher: Box<dyn DescriptorMatcher>,
        params: DetectorParams,
    ) -> Self {
        Self {
            extractor,
            matcher,
            templates: Vec::new(),
            params,
        }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Registers a template under `label`.
    ///
    /// Appends two registry entries: one for the image as supplied and one
    /// for its brightness inverse, so logos printed in inverted polarity
    /// still match. Both entries share the label and the registration
    /// priority slot.
    pub fn register(&mut self, label: &str, image: &GrayImage) {
        let keys = self.extractor.detect_and_compute(image);
        debug!("register '{label}': {} keypoints", keys.len());
        self.templates.push(Template {
            label: label.to_string(),
            image: image.clone(),
            keys,
        });

        let mut inverted = image.clone();
        image::imageops::invert(&mut inverted);
        let keys = self.extractor.detect_and_compute(&inverted);
        debug!("register '{label}' (inverted): {} keypoints", keys.len());
        self.templates.push(Template {
            label: label.to_string(),
            image: inverted,
            keys,
        });
    }

    /// Detects all template instances in `image`.
    ///
    /// The returned list is ordered by cluster index; an image with no
    /// keypoints yields an empty list.
    pub fn detect(&self, image: &GrayImage) -> Vec<DetectedObject> {
        self.detect_with_report(image).0
    }

    /// Like [`detect`](Self::detect), also returning per-stage counters
    /// and timings.
    pub fn detect_with_report(&self, image: &GrayImage) -> (Vec<DetectedObject>, DetectionReport) {
        let total_start = Instant::now();

        let extract_start = Instant::now();
        let keys = self.extractor.detect_and_compute(image);
        let extract_ms = elapsed_ms(extract_start);

        let cluster_start = Instant::now();
        let clusters = cluster_keypoints(&keys, self.params.bandwidth_quantile);
        let cluster_ms = elapsed_ms(cluster_start);
        debug!(
            "detect: {} keypoints in {} clusters",
            keys.len(),
            clusters.len()
        );

        let match_start = Instant::now();
        let mut detections: Vec<DetectedObject> = Vec::new();
        let mut attempts = 0usize;
        let mut overlap_rejections = 0usize;
        for (cluster_idx, cluster) in clusters.iter().enumerate() {
            match self.params.selection {
                SelectionPolicy::GreedyFirstFit => {
                    self.claim_cluster_first_fit(
                        cluster_idx,
                        cluster,
                        &mut detections,
                        &mut attempts,
                        &mut overlap_rejections,
                    );
                }
            }
        }
        let match_ms = elapsed_ms(match_start);

        let report = DetectionReport {
            n_keypoints: keys.len(),
            n_clusters: clusters.len(),
            matching_attempts: attempts,
            overlap_rejections,
            n_detections: detections.len(),
            timing: TimingBreakdown {
                extract_ms,
                cluster_ms,
                match_ms,
                total_ms: elapsed_ms(total_start),
            },
        };
        (detections, report)
    }

    /// Greedy first-fit claim of one cluster: templates in registration
    /// order, first accepted candidate wins, overlap-rejected candidates
    /// are discarded (not retried) and the next template gets its turn.
    fn claim_cluster_first_fit(
        &self,
        cluster_idx: usize,
        cluster: &KeypointSet,
        detections: &mut Vec<DetectedObject>,
        attempts: &mut usize,
        overlap_rejections: &mut usize,
    ) {
        for template in &self.templates {
            *attempts += 1;
            let Some(quad) =
                matching_bounding_box(template, cluster, self.matcher.as_ref(), &self.params)
            else {
                continue;
            };
            if overlaps_accepted(&quad, detections, self.params.overlap_thresh) {
                debug!(
                    "cluster {cluster_idx}: '{}' overlaps an accepted detection, discarded",
                    template.label
                );
                *overlap_rejections += 1;
                continue;
            }
            debug!("cluster {cluster_idx}: accepted '{}'", template.label);
            detections.push(DetectedObject {
                label: template.label.clone(),
                bounding_box: quad,
            });
            return;
        }
    }
}

/// Whether `candidate` significantly overlaps any already-accepted
/// detection: its AABB intersection with some prior detection exceeds
/// `thresh` times *that prior detection's* AABB area. The denominator is
/// deliberately the existing detection, not the candidate.
pub fn overlaps_accepted(candidate: &Quad, accepted: &[DetectedObject], thresh: f64) -> bool {
    let cand = candidate.aabb();
    accepted.iter().any(|prior| {
        let prior_box = prior.bounding_box.aabb();
        cand.intersection_area(&prior_box) as f64 > thresh * prior_box.area() as f64
    })
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
