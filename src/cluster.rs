//! Mean-shift spatial clustering of keypoint locations.
//!
//! Splitting the test image's keypoints into spatial groups bounds the
//! matching search: one global match per template would merge disjoint
//! logo instances into a single (wrong) homography. The clustering follows
//! the usual mean-shift recipe: a k-nearest-neighbour bandwidth estimate,
//! seeds from bandwidth-sized bins, per-seed hill climbing, and mode
//! deduplication. Every point is always assigned to its nearest surviving
//! mode, so the result is a complete and disjoint partition.

use log::{debug, warn};
use rayon::prelude::*;

use crate::keypoints::KeypointSet;

const MAX_ITERS: usize = 300;
const MIN_BIN_FREQ: usize = 1;

/// Cluster assignment for a point set: `labels[i]` is the cluster index of
/// point `i`, indices are dense in `0..n_clusters`.
#[derive(Clone, Debug)]
pub struct ClusterLabels {
    pub labels: Vec<usize>,
    pub n_clusters: usize,
}

/// Estimates a mean-shift bandwidth from 2D point locations.
///
/// For each point, takes the distance to its k-th nearest neighbour
/// (k = `max(1, floor(n * quantile))`, the point itself included) and
/// returns the mean over all points. Degenerate inputs (fewer than two
/// distinct locations) yield 0.0; callers fall back to a single cluster.
pub fn estimate_bandwidth(points: &[[f32; 2]], quantile: f32) -> f32 {
    let n = points.len();
    if n == 0 {
        return 0.0;
    }
    let k = ((n as f32 * quantile) as usize).max(1);

    let mut acc = 0.0f64;
    let mut dists = vec![0.0f32; n];
    for p in points {
        for (j, q) in points.iter().enumerate() {
            dists[j] = dist(p, q);
        }
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap());
        acc += dists[k - 1] as f64;
    }
    (acc / n as f64) as f32
}

/// Runs mean-shift with bin seeding over `points` and labels every point
/// with the index of its nearest mode.
///
/// A non-finite or non-positive bandwidth cannot seed the grid; the whole
/// set then collapses into one cluster rather than failing.
pub fn mean_shift(points: &[[f32; 2]], bandwidth: f32) -> ClusterLabels {
    if points.is_empty() {
        return ClusterLabels {
            labels: Vec::new(),
            n_clusters: 0,
        };
    }
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        warn!(
            "mean_shift: degenerate bandwidth {bandwidth}, grouping all {} points into one cluster",
            points.len()
        );
        return ClusterLabels {
            labels: vec![0; points.len()],
            n_clusters: 1,
        };
    }

    let seeds = bin_seeds(points, bandwidth);

    // Hill-climb each seed to its local density mode. Seeds are independent,
    // so this is the one data-parallel loop of the pipeline; collect keeps
    // the seed order, which keeps the output deterministic.
    let mut modes: Vec<([f32; 2], usize)> = seeds
        .par_iter()
        .filter_map(|seed| climb_seed(points, *seed, bandwidth))
        .collect();

    // Merge modes that converged within one bandwidth of each other,
    // keeping the denser one. Sorting by population first (coordinates as
    // tie-break) makes the surviving set and its order reproducible.
    modes.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.0[0].partial_cmp(&b.0[0]).unwrap())
            .then(a.0[1].partial_cmp(&b.0[1]).unwrap())
    });
    let mut centers: Vec<[f32; 2]> = Vec::new();
    for (mode, _) in &modes {
        if centers.iter().all(|c| dist(c, mode) >= bandwidth) {
            centers.push(*mode);
        }
    }
    if centers.is_empty() {
        // All seeds died (isolated bins); degrade to one cluster.
        return ClusterLabels {
            labels: vec![0; points.len()],
            n_clusters: 1,
        };
    }

    // Force every point into its nearest mode: no point is left unassigned.
    let labels = points
        .iter()
        .map(|p| {
            let mut best = 0usize;
            let mut best_d = f32::INFINITY;
            for (ci, c) in centers.iter().enumerate() {
                let d = dist(p, c);
                if d < best_d {
                    best_d = d;
                    best = ci;
                }
            }
            best
        })
        .collect();

    ClusterLabels {
        labels,
        n_clusters: centers.len(),
    }
}

/// Partitions a keypoint set into spatial clusters.
///
/// Returns one sub-selection per cluster index, each preserving the
/// original relative keypoint order. The union of the returned selections
/// is exactly the input set.
pub fn cluster_keypoints(keys: &KeypointSet, quantile: f32) -> Vec<KeypointSet> {
    let points = keys.points();
    let bandwidth = estimate_bandwidth(&points, quantile);
    let assignment = mean_shift(&points, bandwidth);
    debug!(
        "cluster_keypoints: {} keypoints, bandwidth={:.2}, {} clusters",
        keys.len(),
        bandwidth,
        assignment.n_clusters
    );

    let mut index_sets: Vec<Vec<usize>> = vec![Vec::new(); assignment.n_clusters];
    for (i, &label) in assignment.labels.iter().enumerate() {
        index_sets[label].push(i);
    }
    index_sets.iter().map(|idx| keys.select(idx)).collect()
}

#[inline]
fn dist(a: &[f32; 2], b: &[f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Seeds from the discretised bandwidth grid: one seed per occupied bin,
/// placed at the bin centre. Keys are sorted, so seed order is stable.
fn bin_seeds(points: &[[f32; 2]], bandwidth: f32) -> Vec<[f32; 2]> {
    use std::collections::BTreeMap;

    let mut bins: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for p in points {
        let key = (
            (p[0] / bandwidth).round() as i64,
            (p[1] / bandwidth).round() as i64,
        );
        *bins.entry(key).or_insert(0) += 1;
    }
    bins.into_iter()
        .filter(|&(_, count)| count >= MIN_BIN_FREQ)
        .map(|((bx, by), _)| [bx as f32 * bandwidth, by as f32 * bandwidth])
        .collect()
}

/// Shifts one seed to the mean of its in-bandwidth neighbours until the
/// update falls below `1e-3 * bandwidth`. Returns the mode and its final
/// population, or `None` when the seed never captures a point.
fn climb_seed(points: &[[f32; 2]], mut mean: [f32; 2], bandwidth: f32) -> Option<([f32; 2], usize)> {
    let stop = 1e-3 * bandwidth;
    let mut population = 0usize;

    for _ in 0..MAX_ITERS {
        let mut sx = 0.0f32;
        let mut sy = 0.0f32;
        let mut count = 0usize;
        for p in points {
            if dist(p, &mean) <= bandwidth {
                sx += p[0];
                sy += p[1];
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let next = [sx / count as f32, sy / count as f32];
        let shift = dist(&next, &mean);
        mean = next;
        population = count;
        if shift < stop {
            break;
        }
    }
    Some((mean, population))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::{Descriptor, Keypoint};

    fn keypoint_set(points: &[[f32; 2]]) -> KeypointSet {
        let keypoints = points.iter().map(|p| Keypoint::at(p[0], p[1])).collect();
        let descriptors = (0..points.len()).map(|i| Descriptor(vec![i as u8])).collect();
        KeypointSet::new(keypoints, descriptors)
    }

    fn blob(cx: f32, cy: f32, n: usize) -> Vec<[f32; 2]> {
        (0..n)
            .map(|i| [cx + (i % 3) as f32, cy + (i / 3) as f32])
            .collect()
    }

    #[test]
    fn two_separated_blobs_form_two_clusters() {
        let mut points = blob(10.0, 10.0, 9);
        points.extend(blob(200.0, 200.0, 9));
        let bandwidth = estimate_bandwidth(&points, 0.3);
        let assignment = mean_shift(&points, bandwidth);
        assert_eq!(assignment.n_clusters, 2);
        // Points of the same blob share a label, and the blobs differ.
        assert!(assignment.labels[..9].iter().all(|&l| l == assignment.labels[0]));
        assert!(assignment.labels[9..].iter().all(|&l| l == assignment.labels[9]));
        assert_ne!(assignment.labels[0], assignment.labels[9]);
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let mut points = blob(0.0, 0.0, 7);
        points.extend(blob(80.0, 5.0, 5));
        let keys = keypoint_set(&points);
        let clusters = cluster_keypoints(&keys, 0.25);

        let mut seen = vec![0usize; keys.len()];
        for cluster in &clusters {
            for d in &cluster.descriptors {
                seen[d.0[0] as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1), "every keypoint exactly once");
    }

    #[test]
    fn clusters_preserve_relative_order() {
        let mut points = blob(0.0, 0.0, 6);
        points.extend(blob(90.0, 90.0, 6));
        let keys = keypoint_set(&points);
        for cluster in cluster_keypoints(&keys, 0.25) {
            let ids: Vec<u8> = cluster.descriptors.iter().map(|d| d.0[0]).collect();
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            assert_eq!(ids, sorted);
        }
    }

    #[test]
    fn identical_points_collapse_to_one_cluster() {
        let points = vec![[5.0, 5.0]; 4];
        let bandwidth = estimate_bandwidth(&points, 0.5);
        assert_eq!(bandwidth, 0.0);
        let assignment = mean_shift(&points, bandwidth);
        assert_eq!(assignment.n_clusters, 1);
        assert_eq!(assignment.labels, vec![0; 4]);
    }

    #[test]
    fn single_point_yields_one_cluster() {
        let keys = keypoint_set(&[[3.0, 4.0]]);
        let clusters = cluster_keypoints(&keys, 0.02);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 1);
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        let keys = KeypointSet::default();
        assert!(cluster_keypoints(&keys, 0.02).is_empty());
    }

    #[test]
    fn labelling_is_deterministic() {
        let mut points = blob(0.0, 0.0, 8);
        points.extend(blob(50.0, 120.0, 8));
        let bandwidth = estimate_bandwidth(&points, 0.2);
        let a = mean_shift(&points, bandwidth);
        let b = mean_shift(&points, bandwidth);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.n_clusters, b.n_clusters);
    }
}
