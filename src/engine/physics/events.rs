use super::body::{BodyHandle, BodyType};

/// Notification raised by a body while it is being mutated.
///
/// Bodies queue these in an outbox; the world drains them into
/// [`PhysicsEvent`]s tagged with the body handle.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyEvent {
    /// Body woke up
    Wake,
    /// Body went to sleep (dynamics were reset)
    Sleep,
    /// Body type changed
    BodyTypeChanged { old: BodyType, new: BodyType },
    /// Collision processing was enabled or disabled
    CollisionChanged { can_collide: bool },
    /// A fixture was added, removed or edited
    FixtureUpdated { fixture: String },
}

/// Body event tagged with the body it came from
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsEvent {
    pub body: BodyHandle,
    pub event: BodyEvent,
}

/// Cancelable notification asking whether two bodies may collide.
///
/// Raised once with `body` = self and once with `body` = other.
#[derive(Debug)]
pub struct PreventCollideEvent {
    pub body: BodyHandle,
    pub other: BodyHandle,
    pub body_type: BodyType,
    pub other_type: BodyType,
    cancelled: bool,
}

impl PreventCollideEvent {
    pub(crate) fn new(
        body: BodyHandle,
        other: BodyHandle,
        body_type: BodyType,
        other_type: BodyType,
    ) -> Self {
        Self {
            body,
            other,
            body_type,
            other_type,
            cancelled: false,
        }
    }

    /// Veto the collision
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Observer for [`PreventCollideEvent`]s
pub trait PreventCollideHandler {
    fn prevent_collide(&mut self, event: &mut PreventCollideEvent);
}

impl<F> PreventCollideHandler for F
where
    F: FnMut(&mut PreventCollideEvent),
{
    fn prevent_collide(&mut self, event: &mut PreventCollideEvent) {
        self(event)
    }
}

/// Ordered registry of prevent-collide observers
#[derive(Default)]
pub struct CollisionFilters {
    handlers: Vec<Box<dyn PreventCollideHandler>>,
}

impl CollisionFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<H: PreventCollideHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run observers in subscription order, stopping at the first cancel
    pub fn dispatch(&mut self, event: &mut PreventCollideEvent) {
        for handler in &mut self.handlers {
            handler.prevent_collide(event);
            if event.cancelled() {
                return;
            }
        }
    }
}

impl std::fmt::Debug for CollisionFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionFilters")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
