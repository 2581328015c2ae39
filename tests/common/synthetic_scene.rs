//! Synthetic logo scenes and a deterministic feature extractor.
//!
//! The extractor treats strict local intensity extrema as keypoints and
//! describes each by its raw 3x3 patch. Templates are black squares with
//! sparse bright dots of pairwise-distinct values, so a pasted copy of a
//! template reproduces the exact keypoints and descriptors of the
//! original, shifted by the paste offset.

use image::GrayImage;
use logo_detector::keypoints::{Descriptor, FeatureExtractor, Keypoint, KeypointSet};

/// Finds pixels that are strict local extrema against their 8-neighbourhood
/// by at least `margin`, describing each with its 3x3 patch bytes.
pub struct ExtremumExtractor {
    pub margin: i32,
}

impl Default for ExtremumExtractor {
    fn default() -> Self {
        Self { margin: 40 }
    }
}

impl FeatureExtractor for ExtremumExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> KeypointSet {
        let (w, h) = image.dimensions();
        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        if w < 3 || h < 3 {
            return KeypointSet::default();
        }

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let v = image.get_pixel(x, y)[0] as i32;
                let mut lo = i32::MAX;
                let mut hi = i32::MIN;
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let n = image
                            .get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0]
                            as i32;
                        lo = lo.min(n);
                        hi = hi.max(n);
                    }
                }
                if v - hi >= self.margin || lo - v >= self.margin {
                    keypoints.push(Keypoint::at(x as f32, y as f32));
                    let mut patch = Vec::with_capacity(9);
                    for dy in -1i32..=1 {
                        for dx in -1i32..=1 {
                            patch.push(
                                image.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0],
                            );
                        }
                    }
                    descriptors.push(Descriptor(patch));
                }
            }
        }
        KeypointSet::new(keypoints, descriptors)
    }
}

fn lcg(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state >> 33
}

/// Black `side` x `side` template with one bright dot per 8 px cell.
///
/// Dot positions are jittered by a seeded LCG and dot values are pairwise
/// distinct, so descriptors identify dots unambiguously.
pub fn dotted_template(side: u32, seed: u64) -> GrayImage {
    let mut image = GrayImage::new(side, side);
    let mut state = seed.wrapping_add(0x9e3779b97f4a7c15);
    let cells = side / 8;
    let mut dot = 0u32;
    for cy in 0..cells {
        for cx in 0..cells {
            let jx = (lcg(&mut state) % 5) as u32;
            let jy = (lcg(&mut state) % 5) as u32;
            let x = cx * 8 + 2 + jx;
            let y = cy * 8 + 2 + jy;
            let value = 120 + (dot * 3) % 130;
            if x < side - 1 && y < side - 1 {
                image.put_pixel(x, y, image::Luma([value as u8]));
            }
            dot += 1;
        }
    }
    image
}

/// Copies `template` into `scene` with its top-left corner at `(left, top)`.
pub fn paste(scene: &mut GrayImage, template: &GrayImage, left: u32, top: u32) {
    for y in 0..template.height() {
        for x in 0..template.width() {
            scene.put_pixel(left + x, top + y, *template.get_pixel(x, y));
        }
    }
}

/// Black scene with a template instance pasted at each position.
pub fn scene_with_instances(
    width: u32,
    height: u32,
    template: &GrayImage,
    positions: &[(u32, u32)],
) -> GrayImage {
    let mut scene = GrayImage::new(width, height);
    for &(left, top) in positions {
        paste(&mut scene, template, left, top);
    }
    scene
}
