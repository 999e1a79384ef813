use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an entity owned by the external entity container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EntityUid(pub u64);

impl EntityUid {
    /// Reserved "no entity" value
    pub const INVALID: EntityUid = EntityUid(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for EntityUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
