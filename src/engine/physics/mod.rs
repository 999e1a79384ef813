// Rigid-body state: shapes, fixtures, bodies, contacts and the world arena

pub mod body;
pub mod collision;
pub mod contact;
pub mod events;
pub mod fixture;
pub mod joint;
pub mod shape;
pub mod world;

use thiserror::Error;

pub use body::{BodyBuilder, BodyHandle, BodyStatus, BodyType, RigidBody};
pub use collision::CollisionGroups;
pub use contact::{Contact, ContactEdge, ContactGraph, ContactKey, EdgeKey};
pub use events::{BodyEvent, CollisionFilters, PhysicsEvent, PreventCollideEvent, PreventCollideHandler};
pub use fixture::{presets, Fixture, FixtureBuilder};
pub use joint::{Joint, JointHandle};
pub use shape::{MassData, Shape};
pub use world::{BroadphaseHooks, NoBroadphase, PhysicsWorld, Pose};

/// Errors raised by illegal physics operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Invalid polygon: {0}")]
    InvalidPolygon(String),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Fixture '{0}' already exists on this body")]
    DuplicateFixture(String),

    #[error("Unknown body {0:?}")]
    UnknownBody(BodyHandle),

    #[error("Attaching {child:?} to {parent:?} would create a cycle")]
    AttachCycle { child: BodyHandle, parent: BodyHandle },
}
