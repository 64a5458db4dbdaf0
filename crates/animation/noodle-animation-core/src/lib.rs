//! Noodle Animation Core (engine-agnostic)
//!
//! Evaluates track and path animations of a beatmap editor: keyframe curves
//! with easing, named tracks shared by many objects and parented under other
//! tracks, fixed-capacity aggregation of every same-tick contribution, and
//! per-object lifetime/recycling against the playback clock. Hosts feed
//! parsed custom data and events in, step the [`Engine`] once per frame and
//! apply the resulting [`Outputs`] to their scene.

pub mod accumulate;
pub mod binding;
pub mod channel;
pub mod config;
pub mod curve;
pub mod data;
pub mod engine;
pub mod entity;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod interp;
pub mod outputs;
pub mod scratch;
pub mod track;
pub mod value;

// Re-exports for hosts
pub use accumulate::{Aggregator, AggregatorSet, AGGREGATOR_CAPACITY};
pub use binding::{ChannelKind, PropertyTable, ResolvedKey};
pub use channel::{Channel, ChannelSet, Placement};
pub use config::Config;
pub use curve::{parse_curve, Curve, Keyframe, PointDefinitions};
pub use data::{
    parse_custom_events, parse_point_definitions, CustomData, CustomEvent, CustomEventKind,
    EntityKind, EntitySource, EventData, GeometrySource, ObstacleShape, TrackRef,
};
pub use engine::Engine;
pub use entity::{AnimationWindow, AnimatorState, EntityAnimator, EntityRole, TickOutcome};
pub use error::{LoadError, MalformedCurveError};
pub use ids::{EntityId, TrackId};
pub use inputs::{BeatTimeMap, ClockSample, IdentityBeatMap};
pub use interp::Easing;
pub use outputs::{Change, CoreEvent, EntityState, MaterialState, Outputs, TransformState};
pub use track::TrackAnimator;
pub use value::{ChannelValue, CurveValue, ValueKind};

pub use glam;
