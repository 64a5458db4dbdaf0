//! Identifiers and simple allocators for animator handles.

use serde::{Deserialize, Serialize};

/// Handle of an [`EntityAnimator`](crate::entity::EntityAnimator) in the engine arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Handle of a [`TrackAnimator`](crate::track::TrackAnimator) in the engine arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub u32);

/// Monotonic allocator for EntityId and TrackId.
/// Handles are never reused, so a removed animator's handle stays invalid.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_entity: u32,
    next_track: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_track(&mut self) -> TrackId {
        let id = TrackId(self.next_track);
        self.next_track = self.next_track.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
