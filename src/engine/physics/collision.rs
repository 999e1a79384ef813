/// Collision groups for filtering what fixtures can collide with each other
///
/// Each group is a single layer bit. `filter()` gives the mask of layers a
/// group collides with; a fixture built from a group gets
/// `collision_layer = group bit` and `collision_mask = filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionGroups {
    /// Default group - interacts with everything
    Default = 0b0000_0001,

    /// Walls and other impassable tile geometry
    Impassable = 0b0000_0010,

    /// Mobs: players, NPCs and anything that walks
    Mob = 0b0000_0100,

    /// Waist-high obstacles (tables, railings)
    Opaque = 0b0000_1000,

    /// Small items lying around
    Item = 0b0001_0000,

    /// Fast moving projectiles
    Projectile = 0b0010_0000,

    /// Ghosts / observers
    Ghost = 0b0100_0000,

    /// Trigger zones - detect but never block
    Sensor = 0b1000_0000,
}

impl CollisionGroups {
    /// Layer bit of this group
    pub fn layer(self) -> u32 {
        self as u32
    }

    /// Layers this group collides with
    pub fn filter(self) -> u32 {
        use CollisionGroups::*;
        match self {
            // Mobs bump into walls, obstacles, other mobs and projectiles
            Mob => Impassable as u32 | Opaque as u32 | Mob as u32 | Projectile as u32 | Sensor as u32,

            // Projectiles hit mobs and walls but not each other
            Projectile => Mob as u32 | Impassable as u32 | Opaque as u32,

            // Walls block everything solid
            Impassable => Mob as u32 | Item as u32 | Projectile as u32,

            Opaque => Mob as u32 | Projectile as u32,

            // Items only rest on walls
            Item => Impassable as u32,

            // Ghosts pass through everything
            Ghost => 0,

            // Sensors and the default group see everything
            Sensor | Default => u32::MAX,
        }
    }

    /// Whether fixtures in this group physically block movement
    pub fn is_hard(self) -> bool {
        !matches!(self, CollisionGroups::Sensor | CollisionGroups::Ghost)
    }

    /// `(layer, mask)` pair for a fixture in this group
    pub fn layer_mask(self) -> (u32, u32) {
        (self.layer(), self.filter())
    }
}
