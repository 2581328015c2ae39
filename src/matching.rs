//! Brute-force descriptor matching with mutual cross-checking.
//!
//! Mirrors the behaviour of a cross-checked brute-force matcher: a pair is
//! kept only when each descriptor is the other's nearest neighbour. The
//! matcher is a capability seam ([`DescriptorMatcher`]) so callers can swap
//! in an approximate index without touching the detector.

use crate::keypoints::Descriptor;

/// Distance norm applied to raw descriptor bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistanceNorm {
    /// Euclidean distance over byte values (float-style descriptors).
    L2,
    /// Popcount of the XOR (binary descriptors, e.g. ORB/BRIEF).
    Hamming,
}

impl DistanceNorm {
    pub fn distance(&self, a: &Descriptor, b: &Descriptor) -> f32 {
        debug_assert_eq!(a.0.len(), b.0.len(), "descriptor length mismatch");
        match self {
            DistanceNorm::L2 => {
                let sum: f32 = a
                    .0
                    .iter()
                    .zip(&b.0)
                    .map(|(&x, &y)| {
                        let d = x as f32 - y as f32;
                        d * d
                    })
                    .sum();
                sum.sqrt()
            }
            DistanceNorm::Hamming => a
                .0
                .iter()
                .zip(&b.0)
                .map(|(&x, &y)| (x ^ y).count_ones())
                .sum::<u32>() as f32,
        }
    }
}

/// A matched descriptor pair: `query_idx` indexes the first (template) set,
/// `train_idx` the second (test/cluster) set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptorMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

/// Descriptor-matching capability producing mutual-nearest-neighbour pairs.
pub trait DescriptorMatcher {
    fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch>;
}

/// Exhaustive matcher with mandatory cross-checking in both directions.
#[derive(Clone, Copy, Debug)]
pub struct BruteForceMatcher {
    norm: DistanceNorm,
}

impl BruteForceMatcher {
    pub fn new(norm: DistanceNorm) -> Self {
        Self { norm }
    }

    pub fn norm(&self) -> DistanceNorm {
        self.norm
    }

    /// Index of the nearest descriptor in `pool`, ties broken by the lower
    /// index so matching stays deterministic.
    fn nearest(&self, desc: &Descriptor, pool: &[Descriptor]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, cand) in pool.iter().enumerate() {
            let d = self.norm.distance(desc, cand);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((idx, d)),
            }
        }
        best
    }
}

impl DescriptorMatcher for BruteForceMatcher {
    fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        // Forward pass: best train index for every query descriptor.
        let forward: Vec<Option<(usize, f32)>> =
            query.iter().map(|q| self.nearest(q, train)).collect();

        // Backward pass: best query index for every train descriptor.
        let backward: Vec<Option<usize>> = train
            .iter()
            .map(|t| self.nearest(t, query).map(|(i, _)| i))
            .collect();

        let mut matches = Vec::new();
        for (query_idx, fw) in forward.iter().enumerate() {
            let Some((train_idx, distance)) = *fw else {
                continue;
            };
            if backward[train_idx] == Some(query_idx) {
                matches.push(DescriptorMatch {
                    query_idx,
                    train_idx,
                    distance,
                });
            }
        }
        matches
    }
}
