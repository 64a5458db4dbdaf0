//! Input documents: per-entity custom data, custom events, environment geometry
//! and point definitions.
//!
//! Both map format generations are accepted: v2 documents prefix custom keys
//! with an underscore (`_track`, `_animation`), v3 documents do not. Unknown
//! keys are ignored.

use glam::{Vec2, Vec3, Vec4};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::curve::PointDefinitions;
use crate::error::LoadError;
use crate::interp::Easing;

/// One track name or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackRef {
    One(String),
    Many(Vec<String>),
}

impl TrackRef {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            TrackRef::One(name) => std::slice::from_ref(name),
            TrackRef::Many(names) => names,
        };
        slice.iter().map(String::as_str)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Note,
    Bomb,
    Obstacle,
    Chain,
    Arc,
}

/// Intrinsic obstacle shape as laid out on the grid.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleShape {
    pub size: Vec3,
    pub position: Vec3,
}

/// Animation-relevant custom data of one map object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomData {
    #[serde(alias = "_track")]
    pub track: Option<TrackRef>,
    /// Individual path animation, property key to point data.
    #[serde(alias = "_animation")]
    pub animation: Option<IndexMap<String, JsonValue>>,
    /// Euler degrees.
    #[serde(alias = "_localRotation")]
    pub local_rotation: Option<JsonValue>,
    /// Euler degrees, or a single yaw angle.
    #[serde(alias = "_rotation")]
    pub world_rotation: Option<JsonValue>,
    #[serde(alias = "_fake")]
    pub fake: bool,
    #[serde(alias = "_disableNoteGravity")]
    pub disable_note_gravity: bool,
}

fn white() -> Vec4 {
    Vec4::ONE
}

/// Already-parsed object data an entity animator is configured from.
///
/// Times are song-BPM beats: `spawn_time` is when the object appears,
/// `song_time` when it reaches the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySource {
    pub kind: EntityKind,
    pub song_time: f32,
    pub spawn_time: f32,
    pub half_jump_duration: f32,
    /// Obstacle length in beats.
    #[serde(default)]
    pub duration: f32,
    /// Grid placement (x, y) of the object container.
    #[serde(default)]
    pub grid_position: Vec2,
    #[serde(default = "white")]
    pub base_color: Vec4,
    #[serde(default)]
    pub obstacle: Option<ObstacleShape>,
    #[serde(default)]
    pub custom: CustomData,
}

impl EntitySource {
    pub fn new(kind: EntityKind, song_time: f32, spawn_time: f32, half_jump_duration: f32) -> Self {
        Self {
            kind,
            song_time,
            spawn_time,
            half_jump_duration,
            duration: 0.0,
            grid_position: Vec2::ZERO,
            base_color: Vec4::ONE,
            obstacle: None,
            custom: CustomData::default(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, LoadError> {
        serde_json::from_str(s).map_err(LoadError::Entity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomEventKind {
    AnimateTrack,
    AssignPathAnimation,
    AssignTrackParent,
    AssignPlayerToTrack,
    AnimateComponent,
    #[serde(other)]
    Other,
}

/// Payload of a custom event. Keys that are not event parameters are
/// property animations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventData {
    #[serde(alias = "_track")]
    pub track: Option<TrackRef>,
    /// Beats.
    #[serde(alias = "_duration")]
    pub duration: Option<f32>,
    #[serde(alias = "_easing")]
    pub easing: Option<String>,
    #[serde(alias = "_repeat")]
    pub repeat: Option<u32>,
    #[serde(alias = "_parentTrack")]
    pub parent_track: Option<String>,
    #[serde(alias = "_childrenTracks")]
    pub children_tracks: Option<Vec<String>>,
    #[serde(flatten)]
    pub properties: IndexMap<String, JsonValue>,
}

impl EventData {
    /// Event easing; unknown names fall back to linear.
    pub fn easing(&self) -> Easing {
        match self.easing.as_deref() {
            None => Easing::Linear,
            Some(name) => Easing::from_name(name).unwrap_or_else(|| {
                log::warn!("unknown event easing '{name}', using easeLinear");
                Easing::Linear
            }),
        }
    }
}

/// A timed custom event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    /// Beat position as written in the map.
    #[serde(alias = "_time", alias = "b")]
    pub beat: f32,
    /// Beat position after tempo changes; equals `beat` when absent.
    #[serde(default)]
    pub song_time: Option<f32>,
    #[serde(rename = "type", alias = "_type", alias = "t")]
    pub kind: CustomEventKind,
    #[serde(default, alias = "_data", alias = "d")]
    pub data: EventData,
}

impl CustomEvent {
    pub fn new(beat: f32, kind: CustomEventKind, data: EventData) -> Self {
        Self {
            beat,
            song_time: None,
            kind,
            data,
        }
    }

    #[inline]
    pub fn song_time(&self) -> f32 {
        self.song_time.unwrap_or(self.beat)
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.data.duration.unwrap_or(0.0)
    }

    /// Track names this event targets.
    pub fn tracks(&self) -> impl Iterator<Item = &str> {
        self.data.track.iter().flat_map(|t| t.names())
    }
}

pub fn parse_custom_events(s: &str) -> Result<Vec<CustomEvent>, LoadError> {
    serde_json::from_str(s).map_err(LoadError::Events)
}

/// An environment enhancement / geometry object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometrySource {
    /// v2 document; positions are already in editor units.
    pub legacy: bool,
    #[serde(alias = "_scale")]
    pub scale: Option<Vec3>,
    #[serde(alias = "_position")]
    pub position: Option<Vec3>,
    #[serde(alias = "_localPosition")]
    pub local_position: Option<Vec3>,
    #[serde(alias = "_rotation")]
    pub rotation: Option<Vec3>,
    #[serde(alias = "_localRotation")]
    pub local_rotation: Option<Vec3>,
    #[serde(alias = "_track")]
    pub track: Option<String>,
}

impl GeometrySource {
    pub fn from_json(s: &str) -> Result<Self, LoadError> {
        serde_json::from_str(s).map_err(LoadError::Geometry)
    }
}

#[derive(Deserialize)]
struct LegacyPointDefinition {
    #[serde(rename = "_name")]
    name: String,
    #[serde(rename = "_points")]
    points: JsonValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointDefinitionsDoc {
    Named(IndexMap<String, JsonValue>),
    Legacy(Vec<LegacyPointDefinition>),
}

/// Parse a point definition table: a v3 object of name to points, or a v2
/// list of `{ "_name", "_points" }` entries.
pub fn parse_point_definitions(s: &str) -> Result<PointDefinitions, LoadError> {
    let doc: PointDefinitionsDoc =
        serde_json::from_str(s).map_err(LoadError::PointDefinitions)?;
    Ok(match doc {
        PointDefinitionsDoc::Named(map) => map.into_iter().collect(),
        PointDefinitionsDoc::Legacy(list) => {
            list.into_iter().map(|d| (d.name, d.points)).collect()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_and_v3_custom_data_agree() {
        let v2 = r#"{
            "kind": "note", "song_time": 8.0, "spawn_time": 6.0, "half_jump_duration": 2.0,
            "custom": { "_track": "a", "_disableNoteGravity": true,
                        "_animation": { "_dissolve": [[0, 0], [1, 1]] } }
        }"#;
        let v3 = r#"{
            "kind": "note", "song_time": 8.0, "spawn_time": 6.0, "half_jump_duration": 2.0,
            "custom": { "track": "a", "disableNoteGravity": true,
                        "animation": { "_dissolve": [[0, 0], [1, 1]] } }
        }"#;
        let a = EntitySource::from_json(v2).unwrap();
        let b = EntitySource::from_json(v3).unwrap();
        assert_eq!(a, b);
        assert!(a.custom.disable_note_gravity);
        assert_eq!(a.base_color, Vec4::ONE);
    }

    #[test]
    fn track_ref_accepts_one_or_many() {
        let one: TrackRef = serde_json::from_str(r#""a""#).unwrap();
        let many: TrackRef = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(one.names().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(many.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn event_properties_exclude_parameters_and_keep_order() {
        let events = parse_custom_events(
            r#"[{ "b": 4, "t": "AnimateTrack",
                  "d": { "track": "t", "duration": 2, "easing": "easeInQuad",
                         "scale": [[1, 1, 1, 0]], "dissolve": [[0, 0]] } },
                { "_time": 1, "_type": "SomethingNew", "_data": {} }]"#,
        )
        .unwrap();
        let ev = &events[0];
        assert_eq!(ev.kind, CustomEventKind::AnimateTrack);
        assert_eq!(ev.duration(), 2.0);
        assert_eq!(ev.data.easing(), Easing::InQuad);
        assert_eq!(ev.song_time(), 4.0);
        let keys: Vec<&str> = ev.data.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["scale", "dissolve"]);
        assert_eq!(events[1].kind, CustomEventKind::Other);
    }

    #[test]
    fn point_definitions_accept_both_layouts() {
        let v3 = parse_point_definitions(r#"{ "up": [[0, 0], [1, 1]] }"#).unwrap();
        let v2 = parse_point_definitions(r#"[{ "_name": "up", "_points": [[0, 0], [1, 1]] }]"#)
            .unwrap();
        assert_eq!(v3, v2);
        assert!(matches!(
            parse_point_definitions("42"),
            Err(LoadError::PointDefinitions(_))
        ));
    }
}
