//! Bounding-box estimation for one (template, cluster) pair.

use log::debug;

use super::params::DetectorParams;
use super::pipeline::Template;
use crate::homography::{fit_homography_ransac, project};
use crate::keypoints::KeypointSet;
use crate::matching::DescriptorMatcher;
use crate::types::Quad;

/// Attempts to locate `template` inside `cluster`.
///
/// Returns the perspective-warped template outline, or `None` when the
/// pair fails any gate: too few cross-checked matches, no homography,
/// or a consensus below the inlier threshold. All geometry stays in
/// floating point; coordinates are truncated to pixels only for the
/// returned [`Quad`].
pub(super) fn matching_bounding_box(
    template: &Template,
    cluster: &KeypointSet,
    matcher: &dyn DescriptorMatcher,
    params: &DetectorParams,
) -> Option<Quad> {
    let matches = matcher.match_descriptors(&template.keys.descriptors, &cluster.descriptors);
    if matches.len() < params.min_matches {
        return None;
    }

    let src: Vec<[f64; 2]> = matches
        .iter()
        .map(|m| {
            let kp = &template.keys.keypoints[m.query_idx];
            [kp.x as f64, kp.y as f64]
        })
        .collect();
    let dst: Vec<[f64; 2]> = matches
        .iter()
        .map(|m| {
            let kp = &cluster.keypoints[m.train_idx];
            [kp.x as f64, kp.y as f64]
        })
        .collect();

    let result = match fit_homography_ransac(&src, &dst, &params.ransac) {
        Ok(r) => r,
        Err(reason) => {
            debug!("homography rejected for '{}': {reason}", template.label);
            return None;
        }
    };
    if let Some(min_inliers) = params.min_inliers {
        if result.n_inliers < min_inliers {
            debug!(
                "'{}': {} inliers below the {min_inliers} gate",
                template.label, result.n_inliers
            );
            return None;
        }
    }

    warp_template_outline(&result.h, template.width(), template.height())
}

/// Warps the template's corner points through `h`, in the fixed order
/// top-left, bottom-left, bottom-right, top-right.
fn warp_template_outline(h: &nalgebra::Matrix3<f64>, width: u32, height: u32) -> Option<Quad> {
    let w = width as f64;
    let hh = height as f64;
    let corners = [
        [0.0, 0.0],
        [0.0, hh - 1.0],
        [w - 1.0, hh - 1.0],
        [w - 1.0, 0.0],
    ];
    let mut vertices = [[0i32; 2]; 4];
    for (v, c) in vertices.iter_mut().zip(&corners) {
        let p = project(h, c[0], c[1]);
        if !p[0].is_finite() || !p[1].is_finite() {
            return None;
        }
        *v = [p[0] as i32, p[1] as i32];
    }
    Some(Quad::new(vertices))
}
