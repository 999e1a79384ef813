// Collision shapes and their mass properties

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::PhysicsError;
use crate::core::math::{cross, Box2};

/// Mass properties of a shape at a given density.
///
/// `inertia` is about `center`, the shape's own centroid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

/// Local-space collision shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ShapeRepr")]
pub enum Shape {
    Circle { radius: f32, center: Vec2 },
    /// Convex polygon, counter-clockwise
    Polygon { vertices: Vec<Vec2> },
    /// Axis-aligned box. Massless by convention (used for grid/tile geometry).
    Aabb { half_extents: Vec2, center: Vec2 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Shape::Circle {
            radius,
            center: Vec2::ZERO,
        }
    }

    pub fn circle_at(radius: f32, center: Vec2) -> Self {
        Shape::Circle { radius, center }
    }

    pub fn aabb(half_extents: Vec2) -> Self {
        Shape::Aabb {
            half_extents,
            center: Vec2::ZERO,
        }
    }

    pub fn aabb_at(half_extents: Vec2, center: Vec2) -> Self {
        Shape::Aabb {
            half_extents,
            center,
        }
    }

    /// Convex polygon. Clockwise input is rewound counter-clockwise.
    pub fn polygon(mut vertices: Vec<Vec2>) -> Result<Self, PhysicsError> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidPolygon(format!(
                "need at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }

        check_convex(&vertices)?;
        Ok(Shape::Polygon { vertices })
    }

    /// Check a shape built outside the constructors (deserialized, or a
    /// variant written by hand) before its mass is computed.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        match self {
            Shape::Circle { radius, center } => {
                if !radius.is_finite() || *radius < 0.0 || !center.is_finite() {
                    return Err(PhysicsError::InvalidShape(format!("circle radius {}", radius)));
                }
            }
            Shape::Aabb {
                half_extents,
                center,
            } => {
                if !half_extents.is_finite() || half_extents.min_element() < 0.0 || !center.is_finite()
                {
                    return Err(PhysicsError::InvalidShape(format!(
                        "box half extents {}",
                        half_extents
                    )));
                }
            }
            Shape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(PhysicsError::InvalidPolygon(format!(
                        "need at least 3 vertices, got {}",
                        vertices.len()
                    )));
                }
                if vertices.iter().any(|v| !v.is_finite()) {
                    return Err(PhysicsError::InvalidPolygon("non-finite vertex".to_string()));
                }
                if signed_area(vertices) <= 0.0 {
                    return Err(PhysicsError::InvalidPolygon(
                        "vertices are not counter-clockwise".to_string(),
                    ));
                }
                check_convex(vertices)?;
            }
        }
        Ok(())
    }

    /// Polygon box with the given half extents, rotated by `angle` around `center`
    pub fn oriented_box(half_extents: Vec2, center: Vec2, angle: f32) -> Self {
        let rot = Vec2::from_angle(angle);
        let vertices = [
            Vec2::new(-half_extents.x, -half_extents.y),
            Vec2::new(half_extents.x, -half_extents.y),
            Vec2::new(half_extents.x, half_extents.y),
            Vec2::new(-half_extents.x, half_extents.y),
        ]
        .iter()
        .map(|v| center + rot.rotate(*v))
        .collect();
        Shape::Polygon { vertices }
    }

    pub fn area(&self) -> f32 {
        match self {
            Shape::Circle { radius, .. } => PI * radius * radius,
            Shape::Polygon { vertices } => signed_area(vertices),
            Shape::Aabb { half_extents, .. } => 4.0 * half_extents.x * half_extents.y,
        }
    }

    pub fn centroid(&self) -> Vec2 {
        match self {
            Shape::Circle { center, .. } | Shape::Aabb { center, .. } => *center,
            Shape::Polygon { vertices } => polygon_mass(vertices, 1.0).center,
        }
    }

    /// Mass, centroid and inertia about the centroid for a given density
    pub fn mass_data(&self, density: f32) -> MassData {
        match self {
            Shape::Circle { radius, center } => {
                let mass = density * PI * radius * radius;
                MassData {
                    mass,
                    center: *center,
                    inertia: 0.5 * mass * radius * radius,
                }
            }
            Shape::Polygon { vertices } => polygon_mass(vertices, density),
            Shape::Aabb { center, .. } => MassData {
                mass: 0.0,
                center: *center,
                inertia: 0.0,
            },
        }
    }

    /// World-space bounds given a body position and rotation
    pub fn compute_aabb(&self, position: Vec2, rotation: f32) -> Box2 {
        let rot = Vec2::from_angle(rotation);
        match self {
            Shape::Circle { radius, center } => {
                Box2::centered(position + rot.rotate(*center), Vec2::splat(*radius))
            }
            Shape::Polygon { vertices } => {
                Box2::from_points(vertices.iter().map(|v| position + rot.rotate(*v)))
                    .unwrap_or_default()
            }
            Shape::Aabb {
                half_extents,
                center,
            } => {
                let corners = Box2::centered(*center, *half_extents).corners();
                Box2::from_points(corners.iter().map(|c| position + rot.rotate(*c)))
                    .unwrap_or_default()
            }
        }
    }
}

/// Wire form of [`Shape`]; decoding goes through [`Shape::validate`]
#[derive(Deserialize)]
enum ShapeRepr {
    Circle { radius: f32, center: Vec2 },
    Polygon { vertices: Vec<Vec2> },
    Aabb { half_extents: Vec2, center: Vec2 },
}

impl TryFrom<ShapeRepr> for Shape {
    type Error = PhysicsError;

    fn try_from(repr: ShapeRepr) -> Result<Self, Self::Error> {
        let shape = match repr {
            ShapeRepr::Circle { radius, center } => Shape::Circle { radius, center },
            ShapeRepr::Polygon { vertices } => Shape::Polygon { vertices },
            ShapeRepr::Aabb {
                half_extents,
                center,
            } => Shape::Aabb {
                half_extents,
                center,
            },
        };
        shape.validate()?;
        Ok(shape)
    }
}

fn check_convex(vertices: &[Vec2]) -> Result<(), PhysicsError> {
    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let c = vertices[(i + 2) % n];
        if cross(b - a, c - b) <= 0.0 {
            return Err(PhysicsError::InvalidPolygon(format!(
                "vertex {} is not convex or is degenerate",
                (i + 1) % n
            )));
        }
    }
    Ok(())
}

fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        twice_area += cross(vertices[i], vertices[(i + 1) % n]);
    }
    0.5 * twice_area
}

// Triangle fan around the first vertex keeps the sums well conditioned.
fn polygon_mass(vertices: &[Vec2], density: f32) -> MassData {
    let origin = vertices[0];
    let mut area = 0.0;
    let mut center = Vec2::ZERO;
    let mut inertia = 0.0;
    const INV3: f32 = 1.0 / 3.0;

    for i in 1..vertices.len() - 1 {
        let e1 = vertices[i] - origin;
        let e2 = vertices[i + 1] - origin;
        let d = cross(e1, e2);

        let triangle_area = 0.5 * d;
        area += triangle_area;
        center += triangle_area * INV3 * (e1 + e2);

        let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
        let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
        inertia += (0.25 * INV3 * d) * (int_x2 + int_y2);
    }

    debug_assert!(area > 0.0, "polygon area must be positive");

    let mass = density * area;
    center /= area;

    MassData {
        mass,
        center: origin + center,
        // Shift from the fan origin to the centroid.
        inertia: density * inertia - mass * center.dot(center),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_mass() {
        let data = Shape::circle_at(0.5, Vec2::new(1.0, 0.0)).mass_data(1.0);
        assert_relative_eq!(data.mass, PI * 0.25, epsilon = 1e-6);
        assert_eq!(data.center, Vec2::new(1.0, 0.0));
        assert_relative_eq!(data.inertia, 0.5 * data.mass * 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_square_polygon_mass() {
        let square = Shape::polygon(vec![
            Vec2::new(1.0, 1.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(1.0, 3.0),
        ])
        .unwrap();

        let data = square.mass_data(2.0);
        assert_relative_eq!(data.mass, 8.0, epsilon = 1e-5);
        assert_relative_eq!(data.center.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(data.center.y, 2.0, epsilon = 1e-5);
        // m * (w² + h²) / 12
        assert_relative_eq!(data.inertia, 8.0 * 8.0 / 12.0, epsilon = 1e-4);
    }

    #[test]
    fn test_clockwise_polygon_is_rewound() {
        let shape = Shape::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ])
        .unwrap();
        assert!(shape.area() > 0.0);
    }

    #[test]
    fn test_invalid_polygons() {
        assert!(Shape::polygon(vec![Vec2::ZERO, Vec2::X]).is_err());
        // Concave arrow head
        let concave = Shape::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ]);
        assert!(matches!(concave, Err(PhysicsError::InvalidPolygon(_))));
    }

    #[test]
    fn test_aabb_is_massless() {
        let shape = Shape::aabb_at(Vec2::new(0.5, 0.5), Vec2::new(2.0, 2.0));
        let data = shape.mass_data(10.0);
        assert_eq!(data.mass, 0.0);
        assert_eq!(data.center, Vec2::new(2.0, 2.0));
        assert_relative_eq!(shape.area(), 1.0);
    }

    #[test]
    fn test_compute_aabb_rotated_box() {
        let shape = Shape::aabb(Vec2::new(1.0, 0.5));
        let bounds = shape.compute_aabb(Vec2::new(10.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(bounds.left, 9.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.right, 10.5, epsilon = 1e-5);
        assert_relative_eq!(bounds.bottom, -1.0, epsilon = 1e-5);
        assert_relative_eq!(bounds.top, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_decoding_rejects_bad_polygons() {
        let empty = Shape::Polygon { vertices: vec![] };
        let bytes = ron::to_string(&empty).unwrap();
        assert!(ron::from_str::<Shape>(&bytes).is_err());

        let clockwise = Shape::Polygon {
            vertices: vec![Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X],
        };
        assert!(clockwise.validate().is_err());
        assert!(ron::from_str::<Shape>(&ron::to_string(&clockwise).unwrap()).is_err());

        let negative = Shape::circle(-1.0);
        assert!(matches!(negative.validate(), Err(PhysicsError::InvalidShape(_))));

        let square = Shape::oriented_box(Vec2::splat(0.5), Vec2::ZERO, 0.3);
        let decoded: Shape = ron::from_str(&ron::to_string(&square).unwrap()).unwrap();
        assert_eq!(decoded, square);
    }
}
