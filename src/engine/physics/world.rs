use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

use super::body::{BodyHandle, BodyType, RigidBody};
use super::contact::{Contact, ContactGraph, ContactKey};
use super::events::{CollisionFilters, PhysicsEvent, PreventCollideEvent, PreventCollideHandler};
use super::fixture::Fixture;
use super::joint::{Joint, JointHandle};
use super::PhysicsError;
use crate::core::config::PhysicsConfig;
use crate::core::math::Box2;

/// Position and rotation of a body in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub rotation: f32,
}

impl Pose {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec2) -> Self {
        Self::new(position, 0.0)
    }
}

/// Callbacks into the broadphase / contact manager.
///
/// Every method defaults to doing nothing so implementors only override
/// what they track.
pub trait BroadphaseHooks {
    /// A fixture was attached to a body in the world
    fn create_fixture(&mut self, _body: BodyHandle, _fixture: &Fixture) {}

    /// A fixture is being detached from a body in the world
    fn destroy_fixture(&mut self, _body: BodyHandle, _fixture: &Fixture) {}

    /// The body's contacts need to be rebuilt (e.g. after a type change)
    fn regenerate_contacts(&mut self, _body: BodyHandle) {}

    /// A contact is about to be destroyed
    fn destroy_contact(&mut self, _key: ContactKey, _contact: &Contact) {}

    /// The body left the world
    fn remove_body(&mut self, _body: BodyHandle) {}
}

/// Hooks for a world without a broadphase
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBroadphase;

impl BroadphaseHooks for NoBroadphase {}

/// Physics world that owns all bodies and their relationships.
///
/// Bodies live in a slotmap arena; contacts, joints and attachment parents
/// reference them by [`BodyHandle`]. Body notifications are collected into a
/// world event queue, drained by the caller with [`PhysicsWorld::drain_events`].
pub struct PhysicsWorld {
    config: PhysicsConfig,

    /// Rigid body arena
    bodies: SlotMap<BodyHandle, RigidBody>,

    /// World placement of each body
    poses: SecondaryMap<BodyHandle, Pose>,

    contacts: ContactGraph,

    joints: SlotMap<JointHandle, Joint>,

    /// Prevent-collide observers
    filters: CollisionFilters,

    /// Broadphase / contact manager callbacks
    hooks: Box<dyn BroadphaseHooks>,

    events: Vec<PhysicsEvent>,
}

impl PhysicsWorld {
    /// Create a new physics world without a broadphase
    pub fn new(config: PhysicsConfig) -> Self {
        Self::with_hooks(config, NoBroadphase)
    }

    /// Create a new physics world reporting to the given broadphase
    pub fn with_hooks<H: BroadphaseHooks + 'static>(config: PhysicsConfig, hooks: H) -> Self {
        Self {
            config,
            bodies: SlotMap::with_key(),
            poses: SecondaryMap::new(),
            contacts: ContactGraph::new(),
            joints: SlotMap::with_key(),
            filters: CollisionFilters::new(),
            hooks: Box::new(hooks),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PhysicsConfig) {
        self.config = config;
    }

    // --- Bodies ---

    /// Add a rigid body at the origin
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.add_body_at(body, Pose::default())
    }

    /// Add a rigid body at the given pose
    pub fn add_body_at(&mut self, body: RigidBody, pose: Pose) -> BodyHandle {
        let handle = self.bodies.insert(body);
        self.poses.insert(handle, pose);

        for fixture in self.bodies[handle].fixtures() {
            self.hooks.create_fixture(handle, fixture);
        }

        log::debug!(
            "Added {:?} body {:?} with {} fixtures",
            self.bodies[handle].body_type(),
            handle,
            self.bodies[handle].fixture_count()
        );
        handle
    }

    /// Remove a body, severing its contacts, joints and attachments first
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        if !self.bodies.contains_key(handle) {
            return None;
        }

        self.contacts
            .destroy_contacts(&mut self.bodies, handle, self.hooks.as_mut());
        self.joints.retain(|_, joint| !joint.involves(handle));

        for body in self.bodies.values_mut() {
            if body.parent == Some(handle) {
                body.parent = None;
            }
        }

        self.flush_events();
        let mut body = self.bodies.remove(handle)?;
        self.poses.remove(handle);

        for fixture in body.fixtures() {
            self.hooks.destroy_fixture(handle, fixture);
        }
        self.hooks.remove_body(handle);

        self.push_events(handle, &mut body);
        Some(body)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains_key(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        self.poses.get(handle).copied()
    }

    pub fn set_pose(&mut self, handle: BodyHandle, pose: Pose) -> bool {
        match self.poses.get_mut(handle) {
            Some(current) => {
                *current = pose;
                true
            }
            None => false,
        }
    }

    fn body_or_err(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    /// Change a body's type and ask the broadphase to rebuild its contacts
    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<(), PhysicsError> {
        let body = self.body_or_err(handle)?;
        if body.body_type() == body_type {
            return Ok(());
        }
        body.set_body_type(body_type);
        self.hooks.regenerate_contacts(handle);
        Ok(())
    }

    pub fn wake_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        self.body_or_err(handle)?.wake_body();
        Ok(())
    }

    /// World bounds of a body's fixtures; empty if the body is unknown
    pub fn get_world_aabb(&self, handle: BodyHandle) -> Box2 {
        match (self.bodies.get(handle), self.poses.get(handle)) {
            (Some(body), Some(pose)) => body.get_world_aabb(pose.position, pose.rotation),
            _ => Box2::default(),
        }
    }

    // --- Fixtures ---

    /// Attach a fixture and register it with the broadphase
    pub fn add_fixture(&mut self, handle: BodyHandle, fixture: Fixture) -> Result<String, PhysicsError> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        let id = body.add_fixture(fixture)?;
        if let Some(fixture) = body.get_fixture(&id) {
            self.hooks.create_fixture(handle, fixture);
        }
        Ok(id)
    }

    /// Detach a fixture by ID, unregistering it from the broadphase first
    pub fn remove_fixture(&mut self, handle: BodyHandle, name: &str) -> Result<Option<Fixture>, PhysicsError> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))?;
        let Some(fixture) = body.get_fixture(name) else {
            return Ok(None);
        };
        self.hooks.destroy_fixture(handle, fixture);
        Ok(body.remove_fixture(name))
    }

    /// Split borrow for code that edits a body while notifying the broadphase
    pub(crate) fn body_and_hooks(
        &mut self,
        handle: BodyHandle,
    ) -> Option<(&mut RigidBody, &mut dyn BroadphaseHooks)> {
        let body = self.bodies.get_mut(handle)?;
        Some((body, self.hooks.as_mut()))
    }

    // --- Contacts ---

    pub fn contacts(&self) -> &ContactGraph {
        &self.contacts
    }

    /// Record a contact between two fixtures if the bodies may collide
    pub fn create_contact(
        &mut self,
        body_a: BodyHandle,
        fixture_a: &str,
        body_b: BodyHandle,
        fixture_b: &str,
    ) -> Option<ContactKey> {
        let (a, b) = (self.bodies.get(body_a)?, self.bodies.get(body_b)?);
        if !a.can_collide() || !b.can_collide() {
            return None;
        }
        if !self.should_collide(body_a, body_b) {
            return None;
        }
        self.contacts
            .create_contact(&mut self.bodies, body_a, fixture_a, body_b, fixture_b)
    }

    pub fn destroy_contact(&mut self, key: ContactKey) -> Option<Contact> {
        let contact = self.contacts.contact(key)?;
        self.hooks.destroy_contact(key, contact);
        self.contacts.destroy_contact(&mut self.bodies, key)
    }

    /// Tear down every contact of a body
    pub fn destroy_contacts(&mut self, handle: BodyHandle) -> usize {
        self.contacts
            .destroy_contacts(&mut self.bodies, handle, self.hooks.as_mut())
    }

    pub fn contact_count(&self, handle: BodyHandle) -> usize {
        self.bodies
            .get(handle)
            .map_or(0, |body| self.contacts.contact_count(body))
    }

    /// Wake every body sharing a contact with `handle`.
    ///
    /// Waking is never propagated on its own; this is the explicit opt-in.
    pub fn wake_contacts(&mut self, handle: BodyHandle) -> usize {
        let Some(body) = self.bodies.get(handle) else {
            return 0;
        };
        let others: Vec<BodyHandle> = self
            .contacts
            .edges(body.contact_edges())
            .map(|edge| edge.other)
            .collect();

        let mut woken = 0;
        for other in others {
            if let Some(body) = self.bodies.get_mut(other) {
                if !body.awake() && body.body_type() != BodyType::Static {
                    body.wake_body();
                    woken += 1;
                }
            }
        }
        woken
    }

    // --- Joints ---

    pub fn add_joint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        collide_connected: bool,
    ) -> Result<JointHandle, PhysicsError> {
        for handle in [a, b] {
            if !self.bodies.contains_key(handle) {
                return Err(PhysicsError::UnknownBody(handle));
            }
        }
        Ok(self.joints.insert(Joint::new(a, b, collide_connected)))
    }

    pub fn remove_joint(&mut self, joint: JointHandle) -> Option<Joint> {
        self.joints.remove(joint)
    }

    pub fn joint(&self, joint: JointHandle) -> Option<&Joint> {
        self.joints.get(joint)
    }

    // --- Collision filtering ---

    /// Register an observer that may veto collisions
    pub fn subscribe_prevent_collide<H: PreventCollideHandler + 'static>(&mut self, handler: H) {
        self.filters.subscribe(handler);
    }

    pub fn collision_filters(&self) -> &CollisionFilters {
        &self.filters
    }

    /// Decide whether two bodies may collide.
    ///
    /// Two non-dynamic bodies never collide. A joint with `collide_connected`
    /// off between exactly this pair vetoes next. Otherwise observers are asked
    /// with `a` as the subject, then with `b`; the first cancel wins.
    pub fn should_collide(&mut self, a: BodyHandle, b: BodyHandle) -> bool {
        let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
            return false;
        };
        let (type_a, type_b) = (body_a.body_type(), body_b.body_type());

        if type_a.is_non_dynamic() && type_b.is_non_dynamic() {
            return false;
        }

        if self
            .joints
            .values()
            .any(|joint| !joint.collide_connected && joint.connects(a, b))
        {
            return false;
        }

        let mut event = PreventCollideEvent::new(a, b, type_a, type_b);
        self.filters.dispatch(&mut event);
        if event.cancelled() {
            return false;
        }

        let mut event = PreventCollideEvent::new(b, a, type_b, type_a);
        self.filters.dispatch(&mut event);
        !event.cancelled()
    }

    // --- Attachment ---

    /// Attach `child` to `parent` so its velocity composes with the parent's
    pub fn attach(&mut self, child: BodyHandle, parent: BodyHandle) -> Result<(), PhysicsError> {
        for handle in [child, parent] {
            if !self.bodies.contains_key(handle) {
                return Err(PhysicsError::UnknownBody(handle));
            }
        }

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(PhysicsError::AttachCycle { child, parent });
            }
            cursor = self.bodies.get(current).and_then(RigidBody::parent);
        }

        self.body_or_err(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn detach(&mut self, child: BodyHandle) -> Option<BodyHandle> {
        self.bodies.get_mut(child)?.parent.take()
    }

    /// Velocity in map space: the body's own velocity plus every ancestor's
    pub fn map_velocities(&self, handle: BodyHandle) -> Option<(Vec2, f32)> {
        let body = self.bodies.get(handle)?;
        let mut linear = body.linear_velocity();
        let mut angular = body.angular_velocity();

        let mut cursor = body.parent();
        while let Some(parent) = cursor.and_then(|h| self.bodies.get(h)) {
            linear += parent.linear_velocity();
            angular += parent.angular_velocity();
            cursor = parent.parent();
        }

        Some((linear, angular))
    }

    // --- Stepping & events ---

    /// Advance every body by `dt`: integrate forces, move poses, run sleep timers
    pub fn step(&mut self, dt: f32) {
        for (handle, body) in self.bodies.iter_mut() {
            body.integrate(dt, &self.config);

            if body.awake() && body.body_type() != BodyType::Static {
                if let Some(pose) = self.poses.get_mut(handle) {
                    pose.position += body.linear_velocity() * dt;
                    pose.rotation += body.angular_velocity() * dt;
                }
            }
        }
        self.flush_events();
    }

    fn push_events(&mut self, handle: BodyHandle, body: &mut RigidBody) {
        self.events.extend(
            body.take_events()
                .into_iter()
                .map(|event| PhysicsEvent { body: handle, event }),
        );
    }

    /// Move pending body notifications into the world queue, in handle order
    pub fn flush_events(&mut self) {
        for (handle, body) in self.bodies.iter_mut() {
            if body.has_pending_events() {
                self.events.extend(
                    body.take_events()
                        .into_iter()
                        .map(|event| PhysicsEvent { body: handle, event }),
                );
            }
        }
    }

    /// Take all queued notifications
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        self.flush_events();
        std::mem::take(&mut self.events)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
