//! Generation-scoped actor handles.
//!
//! Actors are identified by handle, never by value. The generation
//! field allows O(1) staleness checks against the arena without a
//! lookup table: a despawned slot bumps its generation, invalidating
//! every handle minted for the previous occupant.

use std::fmt;

/// Handle to an actor slot in a [`Stage`](https://docs.rs/troupe-stage) arena.
///
/// Handles are minted by the arena on spawn and become stale on
/// despawn. Comparing or hashing a stale handle is fine; resolving it
/// yields `None` (or [`GraphError::StaleHandle`](crate::GraphError) on
/// fallible paths).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId {
    index: u32,
    generation: u32,
}

impl ActorId {
    /// Create a handle from raw parts. Normally only the arena mints
    /// handles; this is public for tests and serialization shims.
    pub fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Arena generation this handle was minted under.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}.{}", self.index, self.generation)
    }
}
