// Math utilities and helper functions

use glam::{Affine2, IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Check if two f32 values are approximately equal
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Relative closeness check used to skip redundant setter writes
pub fn close_to_percent(a: f32, b: f32, percentage: f32) -> bool {
    if a == b {
        return true;
    }
    let scale = a.abs().max(b.abs());
    (a - b).abs() <= scale * percentage
}

/// Floor division for tile -> chunk conversions (rounds toward negative infinity)
#[inline]
pub fn floor_div(value: i32, divisor: i32) -> i32 {
    debug_assert!(divisor > 0, "floor_div divisor must be positive");
    value.div_euclid(divisor)
}

/// Component-wise floor division of a tile index
#[inline]
pub fn floor_div_vec(value: IVec2, divisor: i32) -> IVec2 {
    IVec2::new(floor_div(value.x, divisor), floor_div(value.y, divisor))
}

/// 2D cross product of two vectors (z component of the 3D cross)
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Axis-aligned box, stored as its four edges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Box2 {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl Box2 {
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Box spanning two corner points
    pub fn from_corners(bottom_left: Vec2, top_right: Vec2) -> Self {
        Self::new(bottom_left.x, bottom_left.y, top_right.x, top_right.y)
    }

    /// Box with the given center and half extents
    pub fn centered(center: Vec2, half_extents: Vec2) -> Self {
        Self::from_corners(center - half_extents, center + half_extents)
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = first;
        let mut max = first;
        for p in iter {
            min = min.min(p);
            max = max.max(p);
        }
        Some(Self::from_corners(min, max))
    }

    pub fn bottom_left(&self) -> Vec2 {
        Vec2::new(self.left, self.bottom)
    }

    pub fn top_right(&self) -> Vec2 {
        Vec2::new(self.right, self.top)
    }

    pub fn center(&self) -> Vec2 {
        (self.bottom_left() + self.top_right()) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.top_right() - self.bottom_left()
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Corners in counter-clockwise order starting bottom-left
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left, self.bottom),
            Vec2::new(self.right, self.bottom),
            Vec2::new(self.right, self.top),
            Vec2::new(self.left, self.top),
        ]
    }

    pub fn union(&self, other: &Box2) -> Box2 {
        Box2::new(
            self.left.min(other.left),
            self.bottom.min(other.bottom),
            self.right.max(other.right),
            self.top.max(other.top),
        )
    }

    pub fn translated(&self, offset: Vec2) -> Box2 {
        Box2::from_corners(self.bottom_left() + offset, self.top_right() + offset)
    }

    /// Closed-interval overlap test (touching edges count)
    pub fn intersects(&self, other: &Box2) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.bottom && point.y <= self.top
    }

    /// Bounding box of this box after an affine transform
    pub fn transformed(&self, matrix: &Affine2) -> Box2 {
        let corners = self.corners().map(|c| matrix.transform_point2(c));
        // Four corners are always present.
        Box2::from_points(corners).unwrap_or_default()
    }
}

/// Box rotated by `rotation` radians around `origin`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Box2Rotated {
    pub rect: Box2,
    pub rotation: f32,
    pub origin: Vec2,
}

impl Box2Rotated {
    pub fn new(rect: Box2, rotation: f32, origin: Vec2) -> Self {
        Self {
            rect,
            rotation,
            origin,
        }
    }

    /// Rotated box spinning around its own center
    pub fn around_center(rect: Box2, rotation: f32) -> Self {
        Self::new(rect, rotation, rect.center())
    }

    /// World-space corners in counter-clockwise order
    pub fn corners(&self) -> [Vec2; 4] {
        let rot = Vec2::from_angle(self.rotation);
        self.rect
            .corners()
            .map(|c| self.origin + rot.rotate(c - self.origin))
    }

    pub fn calc_bounding_box(&self) -> Box2 {
        Box2::from_points(self.corners()).unwrap_or_default()
    }

    /// Transform every corner, keeping the result as an arbitrary quad
    pub fn transformed_corners(&self, matrix: &Affine2) -> [Vec2; 4] {
        self.corners().map(|c| matrix.transform_point2(c))
    }
}

/// Circle in some coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    pub position: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self { position, radius }
    }

    pub fn bounding_box(&self) -> Box2 {
        Box2::centered(self.position, Vec2::splat(self.radius))
    }
}

/// Separating-axis test between two convex quads given as corner lists
pub fn quads_overlap(a: &[Vec2; 4], b: &[Vec2; 4]) -> bool {
    fn separated(axis_source: &[Vec2; 4], a: &[Vec2; 4], b: &[Vec2; 4]) -> bool {
        for i in 0..4 {
            let edge = axis_source[(i + 1) % 4] - axis_source[i];
            let axis = edge.perp();
            if axis.length_squared() == 0.0 {
                continue;
            }
            let (a_min, a_max) = project(a, axis);
            let (b_min, b_max) = project(b, axis);
            if a_max < b_min || b_max < a_min {
                return true;
            }
        }
        false
    }

    fn project(points: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
        points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
            let d = p.dot(axis);
            (lo.min(d), hi.max(d))
        })
    }

    !separated(a, a, b) && !separated(b, a, b)
}
