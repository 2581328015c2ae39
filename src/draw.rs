//! Detection overlay rendering for visual inspection.

use image::GrayImage;

use crate::types::{DetectedObject, Quad};

const CORRECT_SHADE: u8 = 255;
const INCORRECT_SHADE: u8 = 90;

/// Returns a copy of `image` with each detection's outline drawn in.
///
/// With a `correctness` mask (as produced by
/// [`crate::validation::validate_detections`]), correct detections render
/// bright and incorrect ones dim; without it every outline is bright.
pub fn annotate_detections(
    image: &GrayImage,
    objects: &[DetectedObject],
    correctness: Option<&[bool]>,
) -> GrayImage {
    let mut annotated = image.clone();
    for (i, object) in objects.iter().enumerate() {
        let correct = correctness.map_or(true, |mask| mask.get(i).copied().unwrap_or(false));
        let shade = if correct { CORRECT_SHADE } else { INCORRECT_SHADE };
        draw_quad(&mut annotated, &object.bounding_box, shade);
    }
    annotated
}

fn draw_quad(image: &mut GrayImage, quad: &Quad, shade: u8) {
    for i in 0..4 {
        let a = quad.vertices[i];
        let b = quad.vertices[(i + 1) % 4];
        draw_line(image, a, b, shade);
    }
}

/// Bresenham segment, clipped to the image bounds.
fn draw_line(image: &mut GrayImage, from: [i32; 2], to: [i32; 2], shade: u8) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let (mut x, mut y) = (from[0], from[1]);
    let dx = (to[0] - x).abs();
    let dy = -(to[1] - y).abs();
    let sx = if x < to[0] { 1 } else { -1 };
    let sy = if y < to[1] { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            image.put_pixel(x as u32, y as u32, image::Luma([shade]));
        }
        if x == to[0] && y == to[1] {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
