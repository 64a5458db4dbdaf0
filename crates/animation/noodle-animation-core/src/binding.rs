//! Channel kinds and the property-key tables that resolve authored keys to them.
//!
//! Authored data names properties with strings (`"position"`, `"_dissolve"`,
//! ...). Keys are resolved once, at parse time, into a [`ChannelKind`] plus
//! the unit conversion to bake into the parsed keyframes. Unknown keys resolve
//! to `None` and are ignored so newer map features do not break playback.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::value::{ChannelValue, ValueKind};

use glam::{Quat, Vec3, Vec4};

/// A known animatable channel. Each kind feeds exactly one aggregator (or, for
/// `Time`, the entity's lifetime override).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelKind {
    LocalRotation,
    WorldRotation,
    OffsetPosition,
    DefinitePosition,
    Scale,
    Color,
    Dissolve,
    DissolveArrow,
    Time,
}

impl ChannelKind {
    pub const COUNT: usize = 9;

    pub const ALL: [ChannelKind; Self::COUNT] = [
        ChannelKind::LocalRotation,
        ChannelKind::WorldRotation,
        ChannelKind::OffsetPosition,
        ChannelKind::DefinitePosition,
        ChannelKind::Scale,
        ChannelKind::Color,
        ChannelKind::Dissolve,
        ChannelKind::DissolveArrow,
        ChannelKind::Time,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn value_kind(self) -> ValueKind {
        match self {
            ChannelKind::LocalRotation | ChannelKind::WorldRotation => ValueKind::Quat,
            ChannelKind::OffsetPosition | ChannelKind::DefinitePosition | ChannelKind::Scale => {
                ValueKind::Vec3
            }
            ChannelKind::Color => ValueKind::Color,
            ChannelKind::Dissolve | ChannelKind::DissolveArrow | ChannelKind::Time => {
                ValueKind::Float
            }
        }
    }

    /// Baseline a channel blends from when no earlier curve is active.
    pub fn default_value(self) -> ChannelValue {
        match self {
            ChannelKind::LocalRotation | ChannelKind::WorldRotation => {
                ChannelValue::Quat(Quat::IDENTITY)
            }
            ChannelKind::OffsetPosition | ChannelKind::DefinitePosition => {
                ChannelValue::Vec3(Vec3::ZERO)
            }
            ChannelKind::Scale => ChannelValue::Vec3(Vec3::ONE),
            ChannelKind::Color => ChannelValue::Color(Vec4::ONE),
            ChannelKind::Dissolve | ChannelKind::DissolveArrow => ChannelValue::Float(1.0),
            ChannelKind::Time => ChannelValue::Float(-1.0),
        }
    }
}

/// Result of resolving an authored property key.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResolvedKey {
    pub kind: ChannelKind,
    /// Factor baked into parsed positional values.
    pub unit_scale: f32,
    /// The key names an absolute ("definite") position.
    pub definite_position: bool,
}

impl ResolvedKey {
    fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            unit_scale: 1.0,
            definite_position: false,
        }
    }

    fn scaled(mut self, factor: f32) -> Self {
        self.unit_scale = factor;
        self
    }

    fn definite(mut self) -> Self {
        self.definite_position = true;
        self
    }
}

/// Which owner's key table to resolve against. Entity and track tables agree
/// on most keys but differ in aliases and unit conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropertyTable {
    /// Per-entity curves and path animations assigned through tracks.
    Entity,
    /// Track-level `AnimateTrack` events.
    Track,
}

impl PropertyTable {
    pub fn resolve(self, key: &str, cfg: &Config) -> Option<ResolvedKey> {
        use ChannelKind as K;
        let v3 = cfg.unit_scale;
        let shared = match key {
            "_dissolve" | "dissolve" => Some(ResolvedKey::new(K::Dissolve)),
            "_dissolveArrow" | "dissolveArrow" => Some(ResolvedKey::new(K::DissolveArrow)),
            "_localRotation" | "localRotation" => Some(ResolvedKey::new(K::LocalRotation)),
            "_scale" | "scale" => Some(ResolvedKey::new(K::Scale)),
            "_color" | "color" => Some(ResolvedKey::new(K::Color)),
            "_rotation" | "offsetWorldRotation" => Some(ResolvedKey::new(K::WorldRotation)),
            "_position" => Some(ResolvedKey::new(K::OffsetPosition)),
            _ => None,
        };
        if shared.is_some() {
            return shared;
        }
        match self {
            PropertyTable::Entity => match key {
                "offsetPosition" => Some(ResolvedKey::new(K::OffsetPosition)),
                "_definitePosition" => Some(ResolvedKey::new(K::DefinitePosition).definite()),
                "definitePosition" => Some(
                    ResolvedKey::new(K::DefinitePosition)
                        .scaled(v3)
                        .definite(),
                ),
                "position" => Some(ResolvedKey::new(K::DefinitePosition).scaled(v3)),
                "_time" | "time" => Some(ResolvedKey::new(K::Time)),
                _ => None,
            },
            PropertyTable::Track => match key {
                "rotation" => Some(ResolvedKey::new(K::WorldRotation)),
                "offsetPosition" | "localPosition" => {
                    Some(ResolvedKey::new(K::OffsetPosition).scaled(v3))
                }
                "position" => Some(ResolvedKey::new(K::DefinitePosition).scaled(v3)),
                "_time" | "time" => Some(ResolvedKey::new(K::Time)),
                _ => None,
            },
        }
    }
}
