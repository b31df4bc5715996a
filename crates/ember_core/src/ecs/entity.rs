//! Entity handles.
//!
//! Entities are opaque 4-byte handles referencing component data held by
//! the world. Ids are allocated monotonically and never reused, so a
//! stale handle can never alias a newer entity.

use serde::{Deserialize, Serialize};

/// Opaque entity handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u32);

impl Entity {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Numeric id, used by storages as their key.
    pub fn index(&self) -> u32 {
        self.0
    }
}
