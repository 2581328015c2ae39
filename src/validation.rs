//! Overlap-based scoring of detections against ground-truth annotations.
//!
//! A detection is correct when a same-brand annotation covers more than
//! [`MIN_OVERLAP_FRAC`] of the *detection's* axis-aligned bounding box.
//! Note the deliberate asymmetry with the detector's dedup gate (which
//! divides by the existing detection's area). One annotation may satisfy
//! any number of detections; no one-to-one assignment is enforced.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use log::debug;
use serde::Serialize;

use crate::types::{DetectedObject, GroundTruth};

/// Fraction of a detection's AABB area that a matching annotation must
/// cover.
pub const MIN_OVERLAP_FRAC: f64 = 0.2;

/// Marks each detection correct or not against the annotations of one
/// image. Output order follows the input detections.
pub fn validate_detections(rows: &[GroundTruth], detections: &[DetectedObject]) -> Vec<bool> {
    // Keyed lookup so each detection only scans its own brand's rows.
    let mut by_brand: HashMap<&str, Vec<&GroundTruth>> = HashMap::new();
    for row in rows {
        by_brand.entry(row.brand.as_str()).or_default().push(row);
    }

    detections
        .iter()
        .map(|detection| {
            let detected = detection.bounding_box.aabb();
            let detected_area = detected.area() as f64;
            let Some(candidates) = by_brand.get(detection.label.as_str()) else {
                return false;
            };
            candidates.iter().any(|row| {
                detected.intersection_area(&row.aabb()) as f64 > MIN_OVERLAP_FRAC * detected_area
            })
        })
        .collect()
}

/// Per-image confusion counts.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ImageTally {
    /// Ground-truth annotations present in the image.
    pub actual_positives: usize,
    /// Detections matched to an annotation.
    pub true_positives: usize,
    /// Detections left unmatched.
    pub false_positives: usize,
}

impl ImageTally {
    /// Tallies one image from its annotations and validation mask.
    pub fn from_image(rows: &[GroundTruth], correct: &[bool]) -> Self {
        let true_positives = correct.iter().filter(|&&c| c).count();
        Self {
            actual_positives: rows.len(),
            true_positives,
            false_positives: correct.len() - true_positives,
        }
    }
}

/// Dataset-wide detection statistics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub true_positives: usize,
    pub actual_positives: usize,
    pub true_positive_ratio: f64,
    pub false_positives: usize,
    pub false_positives_per_image: f64,
    pub image_count: usize,
}

/// Aggregation preconditions the caller must guard against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateError {
    /// No per-image tallies were supplied.
    NoImages,
    /// The dataset carries no ground-truth annotations at all.
    NoAnnotations,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::NoImages => write!(f, "no images to aggregate"),
            AggregateError::NoAnnotations => {
                write!(f, "dataset has no ground-truth annotations")
            }
        }
    }
}

impl Error for AggregateError {}

/// Sums per-image tallies into dataset statistics.
///
/// Refuses empty input instead of emitting NaN ratios.
pub fn aggregate(tallies: &[ImageTally]) -> Result<DatasetSummary, AggregateError> {
    let image_count = tallies.len();
    if image_count == 0 {
        return Err(AggregateError::NoImages);
    }

    let mut actual_positives = 0usize;
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    for tally in tallies {
        actual_positives += tally.actual_positives;
        true_positives += tally.true_positives;
        false_positives += tally.false_positives;
    }
    if actual_positives == 0 {
        return Err(AggregateError::NoAnnotations);
    }

    debug!(
        "aggregate: {image_count} images, {true_positives}/{actual_positives} true positives, \
         {false_positives} false positives"
    );
    Ok(DatasetSummary {
        true_positives,
        actual_positives,
        true_positive_ratio: true_positives as f64 / actual_positives as f64,
        false_positives,
        false_positives_per_image: false_positives as f64 / image_count as f64,
        image_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Quad;

    fn detection(label: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> DetectedObject {
        DetectedObject {
            label: label.to_string(),
            bounding_box: Quad::new([[x1, y1], [x1, y2], [x2, y2], [x2, y1]]),
        }
    }

    fn annotation(brand: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> GroundTruth {
        GroundTruth {
            brand: brand.to_string(),
            image_file: "img.jpg".to_string(),
            bbx1: x1,
            bby1: y1,
            bbx2: x2,
            bby2: y2,
        }
    }

    #[test]
    fn quarter_overlap_clears_the_gate() {
        // Intersection 2500 over a 10000 px detection: 25% > 20%.
        let rows = vec![annotation("acme", 50, 50, 150, 150)];
        let detections = vec![detection("acme", 0, 0, 100, 100)];
        assert_eq!(validate_detections(&rows, &detections), vec![true]);
    }

    #[test]
    fn sliver_overlap_fails_the_gate() {
        // Intersection 100 over 10000: 1% < 20%.
        let rows = vec![annotation("acme", 90, 90, 150, 150)];
        let detections = vec![detection("acme", 0, 0, 100, 100)];
        assert_eq!(validate_detections(&rows, &detections), vec![false]);
    }

    #[test]
    fn brand_mismatch_never_matches() {
        let rows = vec![annotation("acme", 0, 0, 100, 100)];
        let detections = vec![detection("other", 0, 0, 100, 100)];
        assert_eq!(validate_detections(&rows, &detections), vec![false]);
    }

    #[test]
    fn one_annotation_may_satisfy_several_detections() {
        let rows = vec![annotation("acme", 0, 0, 100, 100)];
        let detections = vec![
            detection("acme", 0, 0, 90, 90),
            detection("acme", 10, 10, 100, 100),
        ];
        assert_eq!(validate_detections(&rows, &detections), vec![true, true]);
    }

    #[test]
    fn mask_order_follows_detections() {
        let rows = vec![annotation("acme", 0, 0, 50, 50)];
        let detections = vec![
            detection("acme", 200, 200, 250, 250),
            detection("acme", 0, 0, 50, 50),
        ];
        assert_eq!(validate_detections(&rows, &detections), vec![false, true]);
    }

    #[test]
    fn tally_counts_split_by_mask() {
        let rows = vec![annotation("a", 0, 0, 1, 1), annotation("b", 0, 0, 1, 1)];
        let tally = ImageTally::from_image(&rows, &[true, false, false]);
        assert_eq!(tally.actual_positives, 2);
        assert_eq!(tally.true_positives, 1);
        assert_eq!(tally.false_positives, 2);
    }

    #[test]
    fn aggregate_two_image_scenario() {
        // Image A: 2 annotations, 1 correct detection.
        // Image B: 1 annotation, 2 detections of which 1 correct.
        let a = ImageTally {
            actual_positives: 2,
            true_positives: 1,
            false_positives: 0,
        };
        let b = ImageTally {
            actual_positives: 1,
            true_positives: 1,
            false_positives: 1,
        };
        let summary = aggregate(&[a, b]).unwrap();
        assert_eq!(summary.actual_positives, 3);
        assert_eq!(summary.true_positives, 2);
        assert_eq!(summary.false_positives, 1);
        assert!((summary.true_positive_ratio - 2.0 / 3.0).abs() < 1e-12);
        assert!((summary.false_positives_per_image - 0.5).abs() < 1e-12);
        assert_eq!(summary.image_count, 2);
    }

    #[test]
    fn aggregate_refuses_empty_dataset() {
        assert_eq!(aggregate(&[]), Err(AggregateError::NoImages));
    }

    #[test]
    fn aggregate_refuses_annotation_free_dataset() {
        let tallies = vec![ImageTally::default(), ImageTally::default()];
        assert_eq!(aggregate(&tallies), Err(AggregateError::NoAnnotations));
    }
}
