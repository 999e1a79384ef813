use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::contact::EdgeKey;
use super::events::BodyEvent;
use super::fixture::Fixture;
use super::PhysicsError;
use crate::core::config::PhysicsConfig;
use crate::core::math::{approx_equal, close_to_percent, cross, Box2};

slotmap::new_key_type! {
    /// Handle to identify rigid bodies
    pub struct BodyHandle;
}

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyType {
    /// Immovable, always asleep
    Static,
    /// User driven, unaffected by forces
    Kinematic,
    /// Kinematic, but takes part in mass and impulse bookkeeping
    KinematicController,
    /// Fully simulated
    Dynamic,
}

impl BodyType {
    /// Dynamic or KinematicController: has mass and accepts impulses
    pub fn has_mass(self) -> bool {
        matches!(self, BodyType::Dynamic | BodyType::KinematicController)
    }

    /// Static or Kinematic
    pub fn is_non_dynamic(self) -> bool {
        matches!(self, BodyType::Static | BodyType::Kinematic)
    }
}

/// Whether a body is standing on something or floating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyStatus {
    #[default]
    OnGround,
    InAir,
}

/// Velocity writes closer than this to the current value are ignored
const VELOCITY_EPSILON: f32 = 0.0001;

/// Rigid body state: fixtures, aggregated mass, velocities and sleep state.
///
/// Methods that would notify other systems push a [`BodyEvent`] into the
/// body's outbox instead; the owning world drains it.
#[derive(Debug, Clone)]
pub struct RigidBody {
    body_type: BodyType,
    fixtures: Vec<Fixture>,

    mass: f32,
    inv_mass: f32,
    /// Rotational inertia about the center of mass
    inertia: f32,
    inv_inertia: f32,
    local_center: Vec2,
    /// Bumped on every mass recompute
    mass_revision: u32,

    linear_velocity: Vec2,
    angular_velocity: f32,
    force: Vec2,
    torque: f32,
    linear_damping: f32,
    angular_damping: f32,

    awake: bool,
    sleep_time: f32,
    sleeping_allowed: bool,
    fixed_rotation: bool,
    can_collide: bool,
    status: BodyStatus,

    /// Head of this body's contact edge list
    pub(crate) contact_edges: Option<EdgeKey>,
    /// Body this one is attached to (velocities compose up the chain)
    pub(crate) parent: Option<BodyHandle>,

    dirty: bool,
    events: Vec<BodyEvent>,
}

impl RigidBody {
    fn with_type(body_type: BodyType) -> Self {
        Self {
            body_type,
            fixtures: Vec::new(),
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            local_center: Vec2::ZERO,
            mass_revision: 0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            linear_damping: 0.2,
            angular_damping: 0.2,
            awake: body_type != BodyType::Static,
            sleep_time: 0.0,
            sleeping_allowed: true,
            fixed_rotation: false,
            can_collide: true,
            status: BodyStatus::OnGround,
            contact_edges: None,
            parent: None,
            dirty: false,
            events: Vec::new(),
        }
    }

    // --- Body type ---

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Change the body type.
    ///
    /// Recomputes mass, puts Static bodies to sleep with zero velocity and
    /// wakes everything else, then clears accumulated force and torque.
    /// Outside the crate, go through `PhysicsWorld::set_body_type`, which also
    /// regenerates contacts.
    pub(crate) fn set_body_type(&mut self, body_type: BodyType) {
        if self.body_type == body_type {
            return;
        }

        let old = self.body_type;
        self.body_type = body_type;

        self.reset_mass_data();

        if body_type == BodyType::Static {
            self.set_awake_internal(false);
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
        } else {
            self.set_awake_internal(true);
        }

        self.force = Vec2::ZERO;
        self.torque = 0.0;
        self.dirty = true;

        log::debug!("Body type changed {:?} -> {:?}", old, body_type);
        self.events
            .push(BodyEvent::BodyTypeChanged { old, new: body_type });
    }

    // --- Sleep state ---

    pub fn awake(&self) -> bool {
        self.awake
    }

    /// Wake or sleep the body. Static bodies can never be woken.
    pub fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        self.set_awake_internal(awake);
    }

    pub fn wake_body(&mut self) {
        self.set_awake(true);
    }

    /// Wake without resetting the sleep timer
    pub fn force_awake(&mut self) {
        if self.awake || self.body_type == BodyType::Static {
            return;
        }
        self.awake = true;
        self.dirty = true;
        self.events.push(BodyEvent::Wake);
    }

    fn set_awake_internal(&mut self, awake: bool) {
        if self.awake == awake {
            return;
        }
        self.awake = awake;

        if awake {
            self.sleep_time = 0.0;
            self.events.push(BodyEvent::Wake);
        } else {
            self.events.push(BodyEvent::Sleep);
            self.reset_dynamics();
            self.sleep_time = 0.0;
        }

        self.dirty = true;
    }

    pub fn sleeping_allowed(&self) -> bool {
        self.sleeping_allowed
    }

    /// Disabling sleep wakes the body
    pub fn set_sleeping_allowed(&mut self, allowed: bool) {
        if self.sleeping_allowed == allowed {
            return;
        }
        if !allowed {
            self.set_awake(true);
        }
        self.sleeping_allowed = allowed;
        self.dirty = true;
    }

    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    pub fn set_sleep_time(&mut self, value: f32) {
        debug_assert!(!value.is_nan(), "sleep time is NaN");
        if close_to_percent(value, self.sleep_time, 0.00001) {
            return;
        }
        self.sleep_time = value;
    }

    /// Zero force, torque and both velocities
    pub fn reset_dynamics(&mut self) {
        self.torque = 0.0;
        self.angular_velocity = 0.0;
        self.force = Vec2::ZERO;
        self.linear_velocity = Vec2::ZERO;
        self.dirty = true;
    }

    // --- Velocities and forces ---

    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Ignored for Static bodies; a non-zero velocity wakes the body
    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        debug_assert!(!velocity.is_nan(), "linear velocity is NaN");

        if self.body_type == BodyType::Static {
            return;
        }

        if velocity.dot(velocity) > 0.0 {
            self.set_awake(true);
        }

        if self.linear_velocity.abs_diff_eq(velocity, VELOCITY_EPSILON) {
            return;
        }

        self.linear_velocity = velocity;
        self.dirty = true;
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Ignored for Static bodies and bodies with fixed rotation
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        debug_assert!(!velocity.is_nan(), "angular velocity is NaN");

        if self.body_type == BodyType::Static || self.fixed_rotation {
            return;
        }

        if velocity * velocity > 0.0 {
            self.set_awake(true);
        }

        if approx_equal(self.angular_velocity, velocity, VELOCITY_EPSILON) {
            return;
        }

        self.angular_velocity = velocity;
        self.dirty = true;
    }

    pub fn force(&self) -> Vec2 {
        self.force
    }

    pub fn torque(&self) -> f32 {
        self.torque
    }

    pub fn momentum(&self) -> Vec2 {
        self.linear_velocity * self.mass()
    }

    pub fn set_momentum(&mut self, momentum: Vec2) {
        let mass = self.mass();
        if mass > 0.0 {
            self.set_linear_velocity(momentum / mass);
        }
    }

    /// Impulse through the center of mass
    pub fn apply_linear_impulse(&mut self, impulse: Vec2) {
        if !self.body_type.has_mass() {
            return;
        }
        self.set_awake(true);

        self.set_linear_velocity(self.linear_velocity + impulse * self.inv_mass);
    }

    /// Impulse applied at `point`, a body-space offset from the body origin
    pub fn apply_linear_impulse_at(&mut self, impulse: Vec2, point: Vec2) {
        if !self.body_type.has_mass() {
            return;
        }
        self.set_awake(true);

        self.set_linear_velocity(self.linear_velocity + impulse * self.inv_mass);
        let arm = point - self.local_center;
        self.set_angular_velocity(self.angular_velocity + self.inv_inertia * cross(arm, impulse));
    }

    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if !self.body_type.has_mass() {
            return;
        }
        self.set_awake(true);

        self.set_angular_velocity(self.angular_velocity + impulse * self.inv_inertia);
    }

    /// Continuous force, only accepted by Dynamic bodies
    pub fn apply_force(&mut self, force: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
    }

    /// Continuous torque, only accepted by Dynamic bodies
    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) {
        debug_assert!(!damping.is_nan());
        self.linear_damping = damping;
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) {
        debug_assert!(!damping.is_nan());
        self.angular_damping = damping;
    }

    // --- Mass ---

    /// Mass in kilograms; zero unless Dynamic or KinematicController
    pub fn mass(&self) -> f32 {
        if self.body_type.has_mass() {
            self.mass
        } else {
            0.0
        }
    }

    pub fn inv_mass(&self) -> f32 {
        if self.body_type.has_mass() {
            self.inv_mass
        } else {
            0.0
        }
    }

    /// Rotational inertia about the center of mass, in kg·m²
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Override inertia. Only Dynamic bodies without fixed rotation accept it.
    pub fn set_inertia(&mut self, inertia: f32) {
        debug_assert!(!inertia.is_nan(), "inertia is NaN");

        if self.body_type != BodyType::Dynamic || self.fixed_rotation || inertia <= 0.0 {
            return;
        }
        if close_to_percent(self.inertia, inertia, 0.00001) {
            return;
        }

        self.inertia = inertia;
        self.inv_inertia = 1.0 / inertia;
        self.dirty = true;
    }

    /// Center of mass in body space
    pub fn local_center(&self) -> Vec2 {
        self.local_center
    }

    /// Recompute mass, center of mass and inertia from the fixtures.
    ///
    /// Kinematic bodies stay massless. Dynamic and KinematicController bodies
    /// always end up with positive mass (1 when no fixture has mass).
    pub fn reset_mass_data(&mut self) {
        self.mass_revision = self.mass_revision.wrapping_add(1);
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.local_center = Vec2::ZERO;

        if self.body_type == BodyType::Kinematic {
            return;
        }

        let mut mass = 0.0;
        let mut weighted_center = Vec2::ZERO;

        for fixture in &self.fixtures {
            let data = fixture.mass_data();
            if data.mass <= 0.0 {
                continue;
            }
            mass += data.mass;
            weighted_center += data.center * data.mass;
        }

        if self.body_type == BodyType::Static {
            self.mass = mass;
            if mass > 0.0 {
                self.local_center = weighted_center / mass;
            }
            return;
        }

        let center = if mass > 0.0 {
            self.mass = mass;
            self.inv_mass = 1.0 / mass;
            weighted_center * self.inv_mass
        } else {
            // Always need positive mass.
            self.mass = 1.0;
            self.inv_mass = 1.0;
            Vec2::ZERO
        };

        // Parallel axis: move each fixture's inertia onto the body's center of mass.
        let mut inertia = 0.0;
        for fixture in &self.fixtures {
            let data = fixture.mass_data();
            if data.mass <= 0.0 {
                continue;
            }
            inertia += data.inertia + data.mass * (data.center - center).length_squared();
        }

        if inertia > 0.0 && !self.fixed_rotation {
            self.inertia = inertia;
            self.inv_inertia = 1.0 / inertia;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        debug_assert!(self.inertia >= 0.0, "negative inertia");
        debug_assert!(self.mass > 0.0, "massless dynamic body");

        self.local_center = center;
    }

    /// Number of mass recomputes so far
    pub fn mass_revision(&self) -> u32 {
        self.mass_revision
    }

    pub fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    /// Locking rotation zeroes angular velocity and drops inertia
    pub fn set_fixed_rotation(&mut self, fixed: bool) {
        if self.fixed_rotation == fixed {
            return;
        }
        self.fixed_rotation = fixed;
        self.angular_velocity = 0.0;
        self.reset_mass_data();
        self.dirty = true;
    }

    // --- Collision flags ---

    pub fn can_collide(&self) -> bool {
        self.can_collide
    }

    pub fn set_can_collide(&mut self, can_collide: bool) {
        if self.can_collide == can_collide {
            return;
        }
        self.can_collide = can_collide;
        self.dirty = true;
        self.events.push(BodyEvent::CollisionChanged { can_collide });
    }

    pub fn status(&self) -> BodyStatus {
        self.status
    }

    pub fn set_status(&mut self, status: BodyStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.dirty = true;
    }

    /// True if any fixture is hard
    pub fn hard(&self) -> bool {
        self.fixtures.iter().any(Fixture::hard)
    }

    pub fn set_hard(&mut self, hard: bool) {
        for fixture in &mut self.fixtures {
            fixture.set_hard(hard);
        }
        self.dirty = true;
    }

    /// Union of the fixtures' layers
    pub fn collision_layer(&self) -> u32 {
        self.fixtures
            .iter()
            .fold(0, |layers, f| layers | f.collision_layer())
    }

    /// Union of the fixtures' masks
    pub fn collision_mask(&self) -> u32 {
        self.fixtures
            .iter()
            .fold(0, |mask, f| mask | f.collision_mask())
    }

    // --- Fixtures ---

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Linear scan by ID
    pub fn get_fixture(&self, name: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id() == name)
    }

    /// The fixture's own ID, or the first free `fixture_<n>` name
    pub fn get_fixture_name(&self, fixture: &Fixture) -> String {
        if !fixture.id().is_empty() {
            return fixture.id().to_string();
        }

        let mut i = 0;
        loop {
            i += 1;
            let name = format!("fixture_{}", i);
            if self.get_fixture(&name).is_none() {
                return name;
            }
        }
    }

    /// Attach a fixture, naming it if needed, and recompute mass.
    /// Returns the fixture's ID.
    pub fn add_fixture(&mut self, fixture: Fixture) -> Result<String, PhysicsError> {
        let id = self.insert_fixture(fixture)?;
        self.reset_mass_data();
        Ok(id)
    }

    /// Detach a fixture by ID and recompute mass
    pub fn remove_fixture(&mut self, name: &str) -> Option<Fixture> {
        let removed = self.take_fixture(name)?;
        self.reset_mass_data();
        Some(removed)
    }

    /// Edit a fixture in place; mass is recomputed afterwards
    pub fn modify_fixture<F>(&mut self, name: &str, edit: F) -> bool
    where
        F: FnOnce(&mut Fixture),
    {
        let Some(fixture) = self.fixtures.iter_mut().find(|f| f.id() == name) else {
            return false;
        };
        edit(fixture);
        // Renaming through the editor is not allowed.
        fixture.id = name.to_string();

        self.reset_mass_data();
        self.fixture_changed(name);
        true
    }

    /// Mark a fixture as changed for replication and listeners
    pub fn fixture_changed(&mut self, name: &str) {
        self.dirty = true;
        self.events.push(BodyEvent::FixtureUpdated {
            fixture: name.to_string(),
        });
    }

    /// Insert without recomputing mass (batched by callers)
    pub(crate) fn insert_fixture(&mut self, mut fixture: Fixture) -> Result<String, PhysicsError> {
        let id = self.get_fixture_name(&fixture);
        if self.get_fixture(&id).is_some() {
            return Err(PhysicsError::DuplicateFixture(id));
        }
        fixture.id = id.clone();
        self.fixtures.push(fixture);
        self.fixture_changed(&id);
        Ok(id)
    }

    /// Remove without recomputing mass (batched by callers)
    pub(crate) fn take_fixture(&mut self, name: &str) -> Option<Fixture> {
        let index = self.fixtures.iter().position(|f| f.id() == name)?;
        let removed = self.fixtures.remove(index);
        self.fixture_changed(name);
        Some(removed)
    }

    // --- Bounds ---

    /// World bounds of all fixtures for a body placed at `position`/`rotation`.
    /// A body without fixtures yields a zero-size box at its position.
    pub fn get_world_aabb(&self, position: Vec2, rotation: f32) -> Box2 {
        self.fixtures
            .iter()
            .map(|f| f.shape().compute_aabb(position, rotation))
            .reduce(|acc, b| acc.union(&b))
            .unwrap_or_else(|| Box2::from_corners(position, position))
    }

    /// Bounds in body space
    pub fn local_aabb(&self) -> Box2 {
        self.get_world_aabb(Vec2::ZERO, 0.0)
    }

    /// Body-space point -> world space
    pub fn get_world_point(&self, local_point: Vec2, position: Vec2, rotation: f32) -> Vec2 {
        position + Vec2::from_angle(rotation).rotate(local_point)
    }

    /// World-space point -> body space
    pub fn get_local_point(&self, world_point: Vec2, position: Vec2, rotation: f32) -> Vec2 {
        Vec2::from_angle(-rotation).rotate(world_point - position)
    }

    // --- Contacts ---

    pub(crate) fn contact_edges(&self) -> Option<EdgeKey> {
        self.contact_edges
    }

    pub fn parent(&self) -> Option<BodyHandle> {
        self.parent
    }

    // --- Replication / events ---

    /// Whether replicated state changed since the last `clear_dirty`
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Drain queued notifications
    pub fn take_events(&mut self) -> Vec<BodyEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    // --- Stepping ---

    /// Integrate accumulated force and advance the sleep timer.
    pub(crate) fn integrate(&mut self, dt: f32, config: &PhysicsConfig) {
        if !self.awake || self.body_type == BodyType::Static {
            return;
        }

        if self.body_type == BodyType::Dynamic {
            let mut velocity = self.linear_velocity + dt * self.inv_mass * self.force;
            let mut angular = self.angular_velocity + dt * self.inv_inertia * self.torque;

            velocity *= 1.0 / (1.0 + dt * self.linear_damping);
            angular *= 1.0 / (1.0 + dt * self.angular_damping);

            self.linear_velocity = velocity;
            self.angular_velocity = if self.fixed_rotation { 0.0 } else { angular };
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }

        let resting = self.angular_velocity * self.angular_velocity
            <= config.angular_sleep_tolerance * config.angular_sleep_tolerance
            && self.linear_velocity.length_squared()
                <= config.linear_sleep_tolerance * config.linear_sleep_tolerance;

        if !self.sleeping_allowed || !resting {
            self.sleep_time = 0.0;
            return;
        }

        self.sleep_time += dt;
        if self.sleep_time >= config.time_to_sleep {
            log::trace!("Body resting for {:.2}s, going to sleep", self.sleep_time);
            self.set_awake(false);
        }
    }
}

/// Builder for creating rigid bodies with common configurations
pub struct BodyBuilder {
    body_type: BodyType,
    fixtures: Vec<Fixture>,
    linear_velocity: Vec2,
    angular_velocity: f32,
    linear_damping: f32,
    angular_damping: f32,
    sleeping_allowed: bool,
    fixed_rotation: bool,
    can_collide: bool,
    status: BodyStatus,
}

impl BodyBuilder {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            fixtures: Vec::new(),
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.2,
            angular_damping: 0.2,
            sleeping_allowed: true,
            fixed_rotation: false,
            can_collide: true,
            status: BodyStatus::OnGround,
        }
    }

    /// Create a new dynamic body (affected by forces and collisions)
    pub fn new_dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    /// Create a new kinematic body (not affected by forces)
    pub fn new_kinematic() -> Self {
        Self::new(BodyType::Kinematic)
    }

    /// Kinematic body that still carries mass (player controllers)
    pub fn new_kinematic_controller() -> Self {
        Self::new(BodyType::KinematicController)
    }

    /// Create a new static body (completely immovable)
    pub fn new_static() -> Self {
        Self::new(BodyType::Static)
    }

    /// Start from configured defaults
    pub fn from_config(body_type: BodyType, config: &PhysicsConfig) -> Self {
        Self::new(body_type)
            .linear_damping(config.linear_damping)
            .angular_damping(config.angular_damping)
            .fixed_rotation(config.fixed_rotation)
    }

    pub fn fixture(mut self, fixture: Fixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    /// Set the initial linear velocity
    pub fn linvel(mut self, x: f32, y: f32) -> Self {
        self.linear_velocity = Vec2::new(x, y);
        self
    }

    /// Set the initial angular velocity (radians per second)
    pub fn angvel(mut self, angvel: f32) -> Self {
        self.angular_velocity = angvel;
        self
    }

    pub fn linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn angular_damping(mut self, damping: f32) -> Self {
        self.angular_damping = damping;
        self
    }

    /// Set whether the body can sleep when inactive
    pub fn sleeping_allowed(mut self, allowed: bool) -> Self {
        self.sleeping_allowed = allowed;
        self
    }

    /// Lock rotation (useful for player characters)
    pub fn fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    pub fn can_collide(mut self, can_collide: bool) -> Self {
        self.can_collide = can_collide;
        self
    }

    pub fn status(mut self, status: BodyStatus) -> Self {
        self.status = status;
        self
    }

    /// Build the rigid body. Fails if two fixtures share an ID.
    pub fn build(self) -> Result<RigidBody, PhysicsError> {
        let mut body = RigidBody::with_type(self.body_type);
        body.linear_damping = self.linear_damping;
        body.angular_damping = self.angular_damping;
        body.sleeping_allowed = self.sleeping_allowed;
        body.fixed_rotation = self.fixed_rotation;
        body.can_collide = self.can_collide;
        body.status = self.status;

        for fixture in self.fixtures {
            body.insert_fixture(fixture)?;
        }
        body.reset_mass_data();

        if self.body_type != BodyType::Static {
            body.linear_velocity = self.linear_velocity;
            if !self.fixed_rotation {
                body.angular_velocity = self.angular_velocity;
            }
        }

        // Construction is not a change anyone needs to hear about.
        body.events.clear();
        body.dirty = false;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::fixture::FixtureBuilder;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn two_circle_body() -> RigidBody {
        BodyBuilder::new_dynamic()
            .fixture(FixtureBuilder::circle(0.5).offset(Vec2::new(-1.0, 0.0)).build())
            .fixture(FixtureBuilder::circle(0.5).offset(Vec2::new(1.0, 0.0)).build())
            .build()
            .unwrap()
    }

    #[test]
    fn test_two_circle_mass() {
        let body = two_circle_body();
        let circle_mass = PI * 0.25;

        assert_relative_eq!(body.mass(), 2.0 * circle_mass, epsilon = 1e-5);
        assert_relative_eq!(body.mass(), 1.5708, epsilon = 1e-4);
        assert_relative_eq!(body.local_center().x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(body.local_center().y, 0.0, epsilon = 1e-6);

        // Each disc: ½mr² about its own center plus m·d² with d = 1
        let expected = 2.0 * (0.5 * circle_mass * 0.25 + circle_mass);
        assert_relative_eq!(body.inertia(), expected, epsilon = 1e-5);
        assert_relative_eq!(body.inv_inertia(), 1.0 / expected, epsilon = 1e-5);
    }

    #[test]
    fn test_reset_mass_data_idempotent() {
        let mut body = two_circle_body();
        body.reset_mass_data();
        let first = (
            body.mass(),
            body.inv_mass(),
            body.inertia(),
            body.inv_inertia(),
            body.local_center(),
        );
        body.reset_mass_data();
        let second = (
            body.mass(),
            body.inv_mass(),
            body.inertia(),
            body.inv_inertia(),
            body.local_center(),
        );
        assert_eq!(first.0.to_bits(), second.0.to_bits());
        assert_eq!(first.1.to_bits(), second.1.to_bits());
        assert_eq!(first.2.to_bits(), second.2.to_bits());
        assert_eq!(first.3.to_bits(), second.3.to_bits());
        assert_eq!(first.4, second.4);
    }

    #[test]
    fn test_massless_dynamic_body_gets_unit_mass() {
        let body = BodyBuilder::new_dynamic()
            .fixture(FixtureBuilder::aabb(0.5, 0.5).build())
            .build()
            .unwrap();
        assert_eq!(body.mass(), 1.0);
        assert_eq!(body.inv_mass(), 1.0);
        assert_eq!(body.inertia(), 0.0);
    }

    #[test]
    fn test_kinematic_is_massless() {
        let body = BodyBuilder::new_kinematic()
            .fixture(FixtureBuilder::circle(1.0).build())
            .build()
            .unwrap();
        assert_eq!(body.mass(), 0.0);
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inertia(), 0.0);
    }

    #[test]
    fn test_fixed_rotation_drops_inertia() {
        let mut body = two_circle_body();
        body.set_angular_velocity(3.0);
        body.set_fixed_rotation(true);
        assert_eq!(body.inertia(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
        assert_eq!(body.angular_velocity(), 0.0);

        body.apply_angular_impulse(10.0);
        assert_eq!(body.angular_velocity(), 0.0);
    }

    #[test]
    fn test_static_never_wakes() {
        let mut body = BodyBuilder::new_static()
            .fixture(FixtureBuilder::circle(1.0).build())
            .build()
            .unwrap();
        assert!(!body.awake());

        body.set_awake(true);
        body.wake_body();
        body.force_awake();
        body.set_linear_velocity(Vec2::new(1.0, 0.0));
        body.apply_linear_impulse(Vec2::new(5.0, 0.0));
        body.apply_force(Vec2::new(5.0, 0.0));

        assert!(!body.awake());
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.angular_velocity(), 0.0);
        assert!(body.take_events().is_empty());
    }

    #[test]
    fn test_set_body_type_to_static_sleeps_and_zeroes() {
        let mut body = two_circle_body();
        body.set_linear_velocity(Vec2::new(2.0, 1.0));
        body.apply_force(Vec2::new(1.0, 0.0));
        body.take_events();

        body.set_body_type(BodyType::Static);

        assert!(!body.awake());
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.force(), Vec2::ZERO);
        assert_eq!(body.mass(), 0.0);
        assert_eq!(
            body.take_events(),
            vec![
                BodyEvent::Sleep,
                BodyEvent::BodyTypeChanged {
                    old: BodyType::Dynamic,
                    new: BodyType::Static
                }
            ]
        );

        // Unchanged type is a no-op
        body.set_body_type(BodyType::Static);
        assert!(body.take_events().is_empty());

        body.set_body_type(BodyType::Dynamic);
        assert!(body.awake());
        assert!(body.mass() > 0.0);
    }

    #[test]
    fn test_sleep_resets_dynamics() {
        let mut body = two_circle_body();
        body.set_linear_velocity(Vec2::new(1.0, 1.0));
        body.set_angular_velocity(1.0);
        body.take_events();

        body.set_awake(false);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.angular_velocity(), 0.0);
        assert_eq!(body.take_events(), vec![BodyEvent::Sleep]);

        body.set_awake(false);
        assert!(body.take_events().is_empty());

        body.wake_body();
        assert_eq!(body.take_events(), vec![BodyEvent::Wake]);
    }

    #[test]
    fn test_impulse_acceptance_by_type() {
        let mut kinematic = BodyBuilder::new_kinematic().build().unwrap();
        kinematic.set_awake(false);
        kinematic.apply_linear_impulse(Vec2::new(1.0, 0.0));
        assert_eq!(kinematic.linear_velocity(), Vec2::ZERO);
        assert!(!kinematic.awake());

        let mut controller = BodyBuilder::new_kinematic_controller()
            .fixture(FixtureBuilder::solid_box(0.5, 0.5).build())
            .build()
            .unwrap();
        controller.set_awake(false);
        controller.apply_linear_impulse(Vec2::new(2.0, 0.0));
        assert!(controller.awake());
        assert_relative_eq!(controller.linear_velocity().x, 2.0, epsilon = 1e-5);

        // Controllers take impulses but not continuous force
        controller.apply_force(Vec2::new(1.0, 0.0));
        assert_eq!(controller.force(), Vec2::ZERO);
    }

    #[test]
    fn test_off_center_impulse_spins() {
        let mut body = BodyBuilder::new_dynamic()
            .fixture(FixtureBuilder::solid_box(0.5, 0.5).build())
            .build()
            .unwrap();
        body.apply_linear_impulse_at(Vec2::new(0.0, 1.0), Vec2::new(0.5, 0.0));
        assert!(body.angular_velocity() > 0.0);
        assert_relative_eq!(body.linear_velocity().y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fixture_auto_naming() {
        let mut body = BodyBuilder::new_dynamic().build().unwrap();
        let a = body.add_fixture(FixtureBuilder::circle(0.1).build()).unwrap();
        let b = body
            .add_fixture(FixtureBuilder::circle(0.1).id("fixture_2").build())
            .unwrap();
        let c = body.add_fixture(FixtureBuilder::circle(0.1).build()).unwrap();

        assert_eq!(a, "fixture_1");
        assert_eq!(b, "fixture_2");
        assert_eq!(c, "fixture_3");
        assert_eq!(body.fixture_count(), 3);
        assert!(body.get_fixture("fixture_3").is_some());
    }

    #[test]
    fn test_duplicate_fixture_rejected() {
        let mut body = BodyBuilder::new_dynamic().build().unwrap();
        body.add_fixture(FixtureBuilder::circle(0.1).id("a").build())
            .unwrap();
        let err = body
            .add_fixture(FixtureBuilder::circle(0.2).id("a").build())
            .unwrap_err();
        assert!(matches!(err, PhysicsError::DuplicateFixture(ref id) if id == "a"));
    }

    #[test]
    fn test_modify_fixture_recomputes_mass() {
        let mut body = BodyBuilder::new_dynamic()
            .fixture(FixtureBuilder::solid_box(0.5, 0.5).id("hull").build())
            .build()
            .unwrap();
        assert_relative_eq!(body.mass(), 1.0, epsilon = 1e-5);

        assert!(body.modify_fixture("hull", |f| f.set_density(4.0)));
        assert_relative_eq!(body.mass(), 4.0, epsilon = 1e-5);
        assert!(!body.modify_fixture("missing", |f| f.set_density(4.0)));
    }

    #[test]
    fn test_sleep_timer() {
        let config = PhysicsConfig::default();
        let mut body = two_circle_body();
        let dt = 1.0 / 60.0;

        for _ in 0..40 {
            body.integrate(dt, &config);
        }
        assert!(!body.awake());
        assert_eq!(body.take_events().last(), Some(&BodyEvent::Sleep));
    }

    #[test]
    fn test_sleep_not_allowed_keeps_awake() {
        let config = PhysicsConfig::default();
        let mut body = two_circle_body();
        body.set_sleeping_allowed(false);
        for _ in 0..120 {
            body.integrate(1.0 / 60.0, &config);
        }
        assert!(body.awake());
    }

    #[test]
    fn test_world_aabb_union() {
        let body = two_circle_body();
        let aabb = body.get_world_aabb(Vec2::new(10.0, 0.0), 0.0);
        assert_relative_eq!(aabb.left, 8.5, epsilon = 1e-5);
        assert_relative_eq!(aabb.right, 11.5, epsilon = 1e-5);
        assert_relative_eq!(aabb.top, 0.5, epsilon = 1e-5);
    }
}
