//! Output contracts from the core engine.
//!
//! Outputs carry the committed state of every entity that changed this tick
//! and a separate list of semantic events. Hosts apply the states to their
//! scene objects and act on the events (returning recycled objects to their
//! pools, surfacing diagnostics).

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::binding::ChannelKind;
use crate::ids::{EntityId, TrackId};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformState {
    pub rotation: Quat,
    pub position: Vec3,
    pub scale: Vec3,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialState {
    pub color: Vec4,
    pub opacity: f32,
    pub arrow_opacity: f32,
    /// `1` while inside the animation window, `-1` after it, `0` before the
    /// first tick following a configure.
    pub animation_spawned: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            opacity: 1.0,
            arrow_opacity: 1.0,
            animation_spawned: 0.0,
        }
    }
}

/// Everything the host needs to place and shade one entity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Local transform of the animated object (offset rotation/position, scale).
    pub local: TransformState,
    /// Local rotation of the entity's world-space anchor.
    pub world_rotation: Quat,
    /// Absolute position from definite-position animation, if any was committed.
    pub world_position: Option<Vec3>,
    /// Position of the entity's individual track relative to its parent track.
    pub anchor: Vec3,
    pub material: MaterialState,
}

/// One entity's committed state for this tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Change {
    pub entity: EntityId,
    pub state: EntityState,
}

/// Discrete semantic signals emitted during stepping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CoreEvent {
    /// The entity passed its despawn point with recycling armed.
    RecycleRequested { entity: EntityId },
    /// Definite position combined with disabled note gravity; the anchor
    /// height was rewritten.
    LegacyQuirk { entity: EntityId, original_y: f32, corrected_y: f32 },
    /// A channel's point data was rejected and the channel left out.
    CurveRejected {
        entity: Option<EntityId>,
        track: Option<TrackId>,
        kind: ChannelKind,
        message: String,
    },
    TrackEnabled { track: TrackId },
    TrackDisabled { track: TrackId },
}

/// Outputs returned by Engine::update().
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub events: Vec<CoreEvent>,
}

impl Outputs {
    pub fn with_capacity(events: usize) -> Self {
        Self {
            changes: Vec::new(),
            events: Vec::with_capacity(events),
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_change(&mut self, change: Change) {
        self.changes.push(change);
    }

    #[inline]
    pub fn push_event(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.events.is_empty()
    }

    pub fn change_for(&self, entity: EntityId) -> Option<&EntityState> {
        self.changes
            .iter()
            .find(|c| c.entity == entity)
            .map(|c| &c.state)
    }
}
