// CBOR wire encoding and tick-ordered delivery of snapshots

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::SyncError;
use crate::core::timing::GameTick;

/// Serialize a snapshot to CBOR bytes
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SyncError> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(|e| SyncError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Deserialize a snapshot from CBOR bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SyncError> {
    ciborium::de::from_reader(bytes).map_err(|e| SyncError::Decode(e.to_string()))
}

/// A snapshot tagged with the tick it was taken at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub tick: GameTick,
    pub state: T,
}

impl<T> Stamped<T> {
    pub fn new(tick: GameTick, state: T) -> Self {
        Self { tick, state }
    }
}

/// Holds the newest snapshot received for one body or grid.
///
/// Snapshots are applied whole; an older (or same-tick) snapshot arriving
/// after a newer one is dropped rather than merged.
#[derive(Debug, Clone)]
pub struct StateReceiver<T> {
    last_tick: Option<GameTick>,
    pending: Option<Stamped<T>>,
}

impl<T> Default for StateReceiver<T> {
    fn default() -> Self {
        Self {
            last_tick: None,
            pending: None,
        }
    }
}

impl<T> StateReceiver<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the newest snapshot accepted so far
    pub fn last_tick(&self) -> Option<GameTick> {
        self.last_tick
    }

    /// Offer a snapshot. Returns `false` if it was stale and dropped.
    pub fn offer(&mut self, snapshot: Stamped<T>) -> bool {
        if let Some(last) = self.last_tick {
            if snapshot.tick <= last {
                log::debug!("Dropping stale snapshot {} (have {})", snapshot.tick, last);
                return false;
            }
        }

        self.last_tick = Some(snapshot.tick);
        self.pending = Some(snapshot);
        true
    }

    /// Decode and offer a CBOR-encoded snapshot
    pub fn offer_bytes(&mut self, bytes: &[u8]) -> Result<bool, SyncError>
    where
        T: DeserializeOwned,
    {
        Ok(self.offer(decode(bytes)?))
    }

    /// Take the pending snapshot, if any, for application
    pub fn take(&mut self) -> Option<Stamped<T>> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
