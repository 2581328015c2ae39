use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates, `(x1, y1)` inclusive
/// min corner and `(x2, y2)` max corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Aabb {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Smallest box enclosing a set of vertices.
    pub fn from_points(points: &[[i32; 2]]) -> Self {
        let mut b = Self {
            x1: i32::MAX,
            y1: i32::MAX,
            x2: i32::MIN,
            y2: i32::MIN,
        };
        for p in points {
            b.x1 = b.x1.min(p[0]);
            b.y1 = b.y1.min(p[1]);
            b.x2 = b.x2.max(p[0]);
            b.y2 = b.y2.max(p[1]);
        }
        b
    }

    pub fn area(&self) -> i64 {
        (self.x2 - self.x1) as i64 * (self.y2 - self.y1) as i64
    }

    /// Intersection area with another box; zero when disjoint.
    pub fn intersection_area(&self, other: &Aabb) -> i64 {
        let ox = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0) as i64;
        let oy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0) as i64;
        ox * oy
    }
}

/// Perspective-warped template outline: four vertices in pixel coordinates.
///
/// Vertex 0 is always the warped image of the template's top-left corner;
/// the remaining vertices follow the template outline in order
/// (top-left, bottom-left, bottom-right, top-right).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub vertices: [[i32; 2]; 4],
}

impl Quad {
    pub fn new(vertices: [[i32; 2]; 4]) -> Self {
        Self { vertices }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }
}

/// One accepted detection: which template label matched and where.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectedObject {
    pub label: String,
    pub bounding_box: Quad,
}

/// One ground-truth logo annotation, as loaded from the dataset metadata
/// table. Field names follow the annotation columns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroundTruth {
    pub brand: String,
    pub image_file: String,
    pub bbx1: i32,
    pub bby1: i32,
    pub bbx2: i32,
    pub bby2: i32,
}

impl GroundTruth {
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.bbx1, self.bby1, self.bbx2, self.bby2)
    }
}
