use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

use super::collision::CollisionGroups;
use super::shape::{MassData, Shape};
use super::PhysicsError;

/// A shaped, filtered collision surface attached to a body.
///
/// Mass data is derived from the shape and density on first use and dropped
/// whenever either of them changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// Unique within the owning body. Empty until the body names it.
    pub(crate) id: String,
    shape: Shape,
    density: f32,
    #[serde(rename = "layer")]
    collision_layer: u32,
    #[serde(rename = "mask")]
    collision_mask: u32,
    hard: bool,
    #[serde(skip)]
    mass_data: OnceCell<MassData>,
}

impl Fixture {
    pub fn new(shape: Shape, density: f32) -> Self {
        Self {
            id: String::new(),
            shape,
            density,
            collision_layer: CollisionGroups::Default.layer(),
            collision_mask: CollisionGroups::Default.filter(),
            hard: true,
            mass_data: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn collision_layer(&self) -> u32 {
        self.collision_layer
    }

    pub fn collision_mask(&self) -> u32 {
        self.collision_mask
    }

    pub fn hard(&self) -> bool {
        self.hard
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.mass_data.take();
    }

    pub fn set_density(&mut self, density: f32) {
        debug_assert!(!density.is_nan(), "fixture density is NaN");
        if self.density == density {
            return;
        }
        self.density = density;
        self.mass_data.take();
    }

    pub fn set_collision_layer(&mut self, layer: u32) {
        self.collision_layer = layer;
    }

    pub fn set_collision_mask(&mut self, mask: u32) {
        self.collision_mask = mask;
    }

    pub fn set_hard(&mut self, hard: bool) {
        self.hard = hard;
    }

    /// Mass, centroid and inertia (about the centroid) of this fixture
    pub fn mass_data(&self) -> MassData {
        *self
            .mass_data
            .get_or_init(|| self.shape.mass_data(self.density))
    }

    pub fn mass(&self) -> f32 {
        self.mass_data().mass
    }

    pub fn centroid(&self) -> Vec2 {
        self.mass_data().center
    }

    pub fn inertia(&self) -> f32 {
        self.mass_data().inertia
    }

    /// Layer/mask filter: either side's mask must include the other's layer
    pub fn collides_with(&self, other: &Fixture) -> bool {
        (self.collision_mask & other.collision_layer) != 0
            || (other.collision_mask & self.collision_layer) != 0
    }
}

/// Fixtures compare by their replicated fields; the mass cache is ignored.
impl PartialEq for Fixture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.shape == other.shape
            && self.density == other.density
            && self.collision_layer == other.collision_layer
            && self.collision_mask == other.collision_mask
            && self.hard == other.hard
    }
}

/// Builder for creating fixtures with common configurations
pub struct FixtureBuilder {
    id: Option<String>,
    shape: Shape,
    density: f32,
    collision_layer: u32,
    collision_mask: u32,
    hard: bool,
}

impl FixtureBuilder {
    fn with_shape(shape: Shape) -> Self {
        Self {
            id: None,
            shape,
            density: 1.0,
            collision_layer: CollisionGroups::Default.layer(),
            collision_mask: CollisionGroups::Default.filter(),
            hard: true,
        }
    }

    /// Create a circle-shaped fixture centered on the body origin
    pub fn circle(radius: f32) -> Self {
        Self::with_shape(Shape::circle(radius))
    }

    /// Create a box-shaped fixture (axis aligned, massless)
    pub fn aabb(half_width: f32, half_height: f32) -> Self {
        Self::with_shape(Shape::aabb(Vec2::new(half_width, half_height)))
    }

    /// Create a box-shaped fixture as a polygon so it carries mass
    pub fn solid_box(half_width: f32, half_height: f32) -> Self {
        Self::with_shape(Shape::oriented_box(
            Vec2::new(half_width, half_height),
            Vec2::ZERO,
            0.0,
        ))
    }

    /// Create a fixture from a convex polygon
    pub fn polygon(vertices: Vec<Vec2>) -> Result<Self, PhysicsError> {
        Shape::polygon(vertices).map(Self::with_shape)
    }

    /// Create a fixture from an already built shape
    pub fn shape(shape: Shape) -> Self {
        Self::with_shape(shape)
    }

    /// Set the fixture name (otherwise the body picks `fixture_<n>`)
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Move a circle or box so it sits at `center` in body space
    pub fn offset(mut self, center: Vec2) -> Self {
        self.shape = match self.shape {
            Shape::Circle { radius, .. } => Shape::Circle { radius, center },
            Shape::Aabb { half_extents, .. } => Shape::Aabb {
                half_extents,
                center,
            },
            Shape::Polygon { vertices } => {
                let shift = center - Shape::Polygon {
                    vertices: vertices.clone(),
                }
                .centroid();
                Shape::Polygon {
                    vertices: vertices.into_iter().map(|v| v + shift).collect(),
                }
            }
        };
        self
    }

    /// Set density (mass will be calculated from shape area)
    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Set layer and mask from a collision group
    pub fn collision_groups(mut self, groups: CollisionGroups) -> Self {
        (self.collision_layer, self.collision_mask) = groups.layer_mask();
        self.hard = groups.is_hard();
        self
    }

    pub fn layer(mut self, layer: u32) -> Self {
        self.collision_layer = layer;
        self
    }

    pub fn mask(mut self, mask: u32) -> Self {
        self.collision_mask = mask;
        self
    }

    /// Non-hard fixtures raise collision events without blocking
    pub fn hard(mut self, hard: bool) -> Self {
        self.hard = hard;
        self
    }

    pub fn build(self) -> Fixture {
        let mut fixture = Fixture::new(self.shape, self.density);
        fixture.id = self.id.unwrap_or_default();
        fixture.collision_layer = self.collision_layer;
        fixture.collision_mask = self.collision_mask;
        fixture.hard = self.hard;
        fixture
    }
}

/// Common fixture configurations for game objects
pub mod presets {
    use super::*;

    /// Round mob fixture (players, NPCs)
    pub fn mob_fixture(radius: f32) -> Fixture {
        FixtureBuilder::circle(radius)
            .id("body")
            .collision_groups(CollisionGroups::Mob)
            .density(1.0)
            .build()
    }

    /// Full-tile wall fixture
    pub fn wall_fixture(tile_size: f32) -> Fixture {
        let half = tile_size / 2.0;
        FixtureBuilder::aabb(half, half)
            .id("wall")
            .collision_groups(CollisionGroups::Impassable)
            .build()
    }

    /// Small dense projectile fixture
    pub fn projectile_fixture(radius: f32) -> Fixture {
        FixtureBuilder::circle(radius)
            .id("projectile")
            .collision_groups(CollisionGroups::Projectile)
            .density(0.1)
            .build()
    }

    /// Trigger zone: detects but doesn't block
    pub fn sensor_fixture(half_width: f32, half_height: f32) -> Fixture {
        FixtureBuilder::aabb(half_width, half_height)
            .id("sensor")
            .collision_groups(CollisionGroups::Sensor)
            .build()
    }
}
