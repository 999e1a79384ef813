use super::body::BodyHandle;

slotmap::new_key_type! {
    /// Handle to identify joints
    pub struct JointHandle;
}

/// Connection between two bodies.
///
/// Only the collision-filtering side of a joint is tracked here; endpoints
/// are stored in canonical order so `(a, b)` and `(b, a)` are the same joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Joint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    /// Whether the connected bodies still collide with each other
    pub collide_connected: bool,
}

impl Joint {
    pub fn new(a: BodyHandle, b: BodyHandle, collide_connected: bool) -> Self {
        let (body_a, body_b) = canonical_pair(a, b);
        Self {
            body_a,
            body_b,
            collide_connected,
        }
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Whether this joint links exactly this pair, in either direction
    pub fn connects(&self, a: BodyHandle, b: BodyHandle) -> bool {
        (self.body_a, self.body_b) == canonical_pair(a, b)
    }

    pub fn involves(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }
}

/// Order a pair of body handles so the pair's identity ignores direction
pub fn canonical_pair(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
