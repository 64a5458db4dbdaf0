//! Entity animators: the per-object end of the animation pipeline.
//!
//! An [`EntityAnimator`] owns the aggregators of one animated object. Parent
//! tracks write into them first (through the engine's intent buffer), then
//! the entity's own path and individual channels, and finally
//! [`commit`](EntityAnimator::commit) folds each aggregator once into the
//! published [`EntityState`].
//!
//! Lifecycle: `Idle → Configured → Evaluating → Recycled`. Any configure call
//! starts over from a clean state.

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::accumulate::AggregatorSet;
use crate::binding::{ChannelKind, PropertyTable};
use crate::channel::{ChannelSet, Placement};
use crate::config::Config;
use crate::curve::PointDefinitions;
use crate::data::{CustomEvent, CustomEventKind, EntityKind, EntitySource, GeometrySource};
use crate::error::MalformedCurveError;
use crate::ids::{EntityId, TrackId};
use crate::inputs::BeatTimeMap;
use crate::interp::functions::{euler_deg_to_quat, lerp_f32};
use crate::outputs::EntityState;
use crate::value::ChannelValue;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimatorState {
    Idle,
    Configured,
    Evaluating,
    Recycled,
}

/// What the animator drives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRole {
    /// A map object (note, bomb, obstacle, chain, arc).
    Object(EntityKind),
    /// Environment geometry; world rotation is its local rotation.
    Geometry,
    /// The transform of a child track parented under another track.
    TrackDriver(TrackId),
}

/// Song-time span an entity's path animations are laid over.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationWindow {
    pub begin: f32,
    pub end: f32,
}

impl AnimationWindow {
    /// Map a normalized lifetime fraction onto the window (unclamped).
    #[inline]
    pub fn at(&self, fraction: f32) -> f32 {
        lerp_f32(self.begin, self.end, fraction)
    }
}

/// Outcome of a single [`EntityAnimator::tick`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Disabled or never configured.
    Skipped,
    Evaluated,
    /// Passed the despawn point with recycling armed; evaluation skipped.
    Recycled,
}

/// The anchor height rewrite applied for definite position plus disabled
/// note gravity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuirkCorrection {
    pub original_y: f32,
    pub corrected_y: f32,
}

/// Shared inputs of a configure call.
#[derive(Copy, Clone)]
pub struct ConfigureContext<'a> {
    pub cfg: &'a Config,
    pub defs: &'a PointDefinitions,
    pub beat_map: &'a dyn BeatTimeMap,
}

/// Non-fatal findings of a configure call.
#[derive(Debug, Default)]
pub struct ConfigureReport {
    pub rejected: Vec<(ChannelKind, MalformedCurveError)>,
    pub quirk: Option<QuirkCorrection>,
}

#[derive(Clone, Debug)]
pub struct EntityAnimator {
    id: EntityId,
    state: AnimatorState,
    role: Option<EntityRole>,
    enabled: bool,
    aggregators: AggregatorSet,
    /// Path animations inherited from the entity's tracks.
    path_channels: ChannelSet,
    /// The entity's own animation; a key written twice keeps the last curve.
    individual_channels: ChannelSet,
    tracks: Vec<TrackId>,
    window: AnimationWindow,
    song_time: f32,
    fake: bool,
    time_override: Option<f32>,
    animated_life: bool,
    recycle_armed: bool,
    output: EntityState,
}

impl EntityAnimator {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            state: AnimatorState::Idle,
            role: None,
            enabled: false,
            aggregators: AggregatorSet::new(Vec4::ONE),
            path_channels: ChannelSet::new(),
            individual_channels: ChannelSet::new(),
            tracks: Vec::new(),
            window: AnimationWindow::default(),
            song_time: 0.0,
            fake: false,
            time_override: None,
            animated_life: false,
            recycle_armed: false,
            output: EntityState::default(),
        }
    }

    /// Tear down to a fresh state, returning the tracks the entity was
    /// attached to so the caller can detach it.
    pub fn reset(&mut self, base_color: Vec4) -> Vec<TrackId> {
        let tracks = std::mem::take(&mut self.tracks);
        let id = self.id;
        *self = Self::new(id);
        self.aggregators = AggregatorSet::new(base_color);
        self.output.material.color = base_color;
        tracks
    }

    /// Configure from object data. Attachment to `tracks` is recorded but the
    /// caller links the entity into each track's children.
    ///
    /// `tracks` pairs each parent track with the events assigned to it; only
    /// `AssignPathAnimation` events contribute.
    pub fn configure(
        &mut self,
        source: &EntitySource,
        ctx: ConfigureContext<'_>,
        tracks: &[(TrackId, Vec<&CustomEvent>)],
    ) -> ConfigureReport {
        let mut report = ConfigureReport::default();
        self.reset(source.base_color);

        self.state = AnimatorState::Configured;
        self.role = Some(EntityRole::Object(source.kind));
        self.enabled = ctx.cfg.animation_mode;
        if !self.enabled {
            return report;
        }

        let mut duration = 0.0;
        if source.kind == EntityKind::Obstacle {
            duration = source.duration;
            if let Some(shape) = source.obstacle {
                let position = shape.position - Vec3::new(0.0, 0.0, ctx.cfg.obstacle_depth_offset);
                let size = Vec3::new(
                    ctx.cfg.clamp_obstacle_size(shape.size.x),
                    ctx.cfg.clamp_obstacle_size(shape.size.y),
                    ctx.cfg.clamp_obstacle_size(shape.size.z),
                );
                self.aggregators.offset_position.preload(position);
                self.aggregators.scale.preload(size);
            }
        }

        let custom = &source.custom;
        if let Some(rot) = custom.local_rotation.as_ref().and_then(euler_from_json) {
            self.aggregators.local_rotation.preload(rot);
        }
        if let Some(rot) = custom.world_rotation.as_ref().and_then(world_rotation_from_json) {
            self.aggregators.world_rotation.preload(rot);
        }

        self.song_time = source.song_time;
        self.fake = custom.fake;
        // Obstacles leave the grid early, so the window ends at the jump-out
        // rather than at the despawn time.
        self.window = AnimationWindow {
            begin: source.spawn_time,
            end: source.song_time + duration + source.half_jump_duration,
        };
        self.output.anchor = Vec3::new(source.grid_position.x, source.grid_position.y, 0.0);

        let mut definite = false;
        for (track, events) in tracks {
            self.tracks.push(*track);
            for ev in events
                .iter()
                .filter(|ev| ev.kind == CustomEventKind::AssignPathAnimation)
            {
                let activate = ev.song_time();
                let transition = match ev.duration() {
                    d if d != 0.0 => ctx.beat_map.beat_to_song_time(ev.beat + d) - activate,
                    _ => 0.0,
                };
                let placement = Placement::Path {
                    activate,
                    begin: self.window.begin,
                    end: self.window.end,
                    transition,
                    easing: ev.data.easing(),
                };
                for (key, raw) in &ev.data.properties {
                    definite |= is_definite_key(key);
                    add_curve(
                        &mut self.path_channels,
                        key,
                        raw,
                        placement,
                        &ctx,
                        false,
                        &mut report,
                    );
                }
            }
        }

        if let Some(animation) = &custom.animation {
            let placement = Placement::path(self.window.begin, self.window.end);
            for (key, raw) in animation {
                definite |= is_definite_key(key);
                add_curve(
                    &mut self.individual_channels,
                    key,
                    raw,
                    placement,
                    &ctx,
                    true,
                    &mut report,
                );
            }
        }

        if definite && custom.disable_note_gravity {
            log::error!(
                "disableNoteGravity is bugged when combined with definitePosition, please remove it!"
            );
            let original_y = self.output.anchor.y;
            let corrected_y = original_y * -0.1 + 1.0;
            self.output.anchor.y = corrected_y;
            report.quirk = Some(QuirkCorrection {
                original_y,
                corrected_y,
            });
        }

        self.path_channels.finish();
        self.individual_channels.finish();
        report
    }

    /// Configure as environment geometry with optional single parent track.
    pub fn configure_geometry(&mut self, source: &GeometrySource, cfg: &Config, track: Option<TrackId>) {
        self.reset(Vec4::ONE);

        self.state = AnimatorState::Configured;
        self.role = Some(EntityRole::Geometry);
        self.enabled = true;
        self.aggregators.alias_world_rotation = true;

        let unit = if source.legacy { 1.0 } else { cfg.unit_scale };
        if let Some(scale) = source.scale {
            self.aggregators.scale.set_default(scale);
        }
        if let Some(p) = source.local_position.or(source.position) {
            self.aggregators.offset_position.set_default(p * unit);
        }
        if let Some(r) = source.local_rotation.or(source.rotation) {
            self.aggregators.local_rotation.set_default(euler_deg_to_quat(r));
        }
        self.tracks.extend(track);
        self.snap();
    }

    /// Configure as the driver of `track`'s transform.
    pub fn configure_track_driver(&mut self, track: TrackId) {
        self.reset(Vec4::ONE);
        self.state = AnimatorState::Configured;
        self.role = Some(EntityRole::TrackDriver(track));
    }

    /// Record a parent track attachment made outside of configure.
    pub(crate) fn attach_track(&mut self, track: TrackId) {
        if !self.tracks.contains(&track) {
            self.tracks.push(track);
        }
    }

    /// Drop every track attachment, returning them.
    pub(crate) fn take_tracks(&mut self) -> Vec<TrackId> {
        std::mem::take(&mut self.tracks)
    }

    /// Route a contribution into the matching aggregator.
    #[inline]
    pub fn contribute(&mut self, kind: ChannelKind, value: ChannelValue) {
        match (kind, value) {
            (ChannelKind::Time, ChannelValue::Float(f)) => self.set_query_time_override(Some(f)),
            _ => {
                if !self.aggregators.add(kind, value) {
                    log::trace!("entity {:?}: {kind:?} contribution dropped", self.id);
                }
            }
        }
    }

    /// Scrub to a normalized position of the animation window. `None` or a
    /// negative fraction returns control to the playback clock.
    pub fn set_query_time_override(&mut self, fraction: Option<f32>) {
        self.time_override = match fraction {
            Some(f) if f >= 0.0 => Some(self.window.at(f)),
            _ => None,
        };
    }

    /// Ask for a recycle request once the entity passes its despawn point.
    pub fn arm_recycle(&mut self) {
        self.recycle_armed = true;
    }

    /// Evaluate the entity's own channels at `song_time` (or the override).
    pub fn tick(&mut self, song_time: f32) -> TickOutcome {
        if !self.enabled || matches!(self.state, AnimatorState::Idle | AnimatorState::Recycled) {
            return TickOutcome::Skipped;
        }
        let time = self.time_override.unwrap_or(song_time);

        if let Some(EntityRole::Object(kind)) = self.role {
            if kind != EntityKind::Chain {
                self.output.material.animation_spawned =
                    if time > self.window.end { -1.0 } else { 1.0 };
            }
            let world_position_pending = self.aggregators.world_position.count() > 0;
            self.animated_life = self.time_override.is_some_and(|t| t < self.song_time)
                || world_position_pending
                || (self.fake && time < self.window.end);

            if self.recycle_armed {
                let despawn = if !world_position_pending && !self.fake {
                    self.song_time
                } else {
                    self.window.end
                };
                if time > despawn {
                    log::debug!("entity {:?} recycled at {time}", self.id);
                    self.animated_life = false;
                    self.aggregators.discard();
                    self.state = AnimatorState::Recycled;
                    return TickOutcome::Recycled;
                }
            }
        }

        self.state = AnimatorState::Evaluating;
        let Self {
            path_channels,
            individual_channels,
            aggregators,
            id,
            ..
        } = self;
        let mut lifetime = None;
        let mut route = |kind: ChannelKind, value: ChannelValue| match (kind, value) {
            (ChannelKind::Time, ChannelValue::Float(f)) => lifetime = Some(f),
            _ => {
                if !aggregators.add(kind, value) {
                    log::trace!("entity {id:?}: {kind:?} contribution dropped");
                }
            }
        };
        path_channels.update(time, &mut route);
        individual_channels.update(time, &mut route);
        if let Some(f) = lifetime {
            self.set_query_time_override(Some(f));
        }
        TickOutcome::Evaluated
    }

    /// Fold every aggregator that received a contribution this cycle into the
    /// published state. Returns whether the state changed.
    pub fn commit(&mut self) -> bool {
        let before = self.output;
        let agg = &mut self.aggregators;
        let out = &mut self.output;

        if agg.local_rotation.count() > 0 {
            out.local.rotation = agg.local_rotation.get();
        }
        if agg.offset_position.count() > 0 {
            out.local.position = agg.offset_position.get();
        }
        if agg.scale.count() > 0 {
            out.local.scale = agg.scale.get();
        }
        if agg.world_rotation.count() > 0 && self.role != Some(EntityRole::Geometry) {
            out.world_rotation = agg.world_rotation.get();
        }
        if agg.world_position.count() > 0 {
            out.world_position = Some(agg.world_position.get());
        }

        match self.role {
            Some(EntityRole::Object(kind)) if agg.has_material_writes() => {
                if agg.color.count() > 0 {
                    out.material.color = agg.color.get();
                }
                let arrow = agg.arrow_opacity.get();
                if kind == EntityKind::Note {
                    out.material.arrow_opacity = arrow;
                }
                out.material.opacity = agg.opacity.get();
            }
            _ => agg.discard(),
        }

        self.output != before
    }

    /// Apply the local transform (and world rotation outside geometry)
    /// straight from the aggregators; used while scrubbing a paused clock.
    pub fn snap(&mut self) {
        let agg = &mut self.aggregators;
        let out = &mut self.output;
        out.local.rotation = agg.local_rotation.get();
        out.local.position = agg.offset_position.get();
        out.local.scale = agg.scale.get();
        if self.role != Some(EntityRole::Geometry) {
            out.world_rotation = agg.world_rotation.get();
        }
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> AnimatorState {
        self.state
    }

    #[inline]
    pub fn role(&self) -> Option<EntityRole> {
        self.role
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn tracks(&self) -> &[TrackId] {
        &self.tracks
    }

    #[inline]
    pub fn window(&self) -> AnimationWindow {
        self.window
    }

    #[inline]
    pub fn time_override(&self) -> Option<f32> {
        self.time_override
    }

    #[inline]
    pub fn animated_life(&self) -> bool {
        self.animated_life
    }

    #[inline]
    pub fn recycle_armed(&self) -> bool {
        self.recycle_armed
    }

    #[inline]
    pub fn output(&self) -> &EntityState {
        &self.output
    }

    #[inline]
    pub fn aggregators(&self) -> &AggregatorSet {
        &self.aggregators
    }

    /// Number of channels the entity evaluates itself (path plus individual).
    pub fn channel_count(&self) -> usize {
        self.path_channels.len() + self.individual_channels.len()
    }

    pub fn path_channels(&self) -> &ChannelSet {
        &self.path_channels
    }

    pub fn individual_channels(&self) -> &ChannelSet {
        &self.individual_channels
    }
}

fn is_definite_key(key: &str) -> bool {
    key == "_definitePosition" || key == "definitePosition"
}

fn add_curve(
    set: &mut ChannelSet,
    key: &str,
    raw: &JsonValue,
    placement: Placement,
    ctx: &ConfigureContext<'_>,
    overwrite: bool,
    report: &mut ConfigureReport,
) {
    let Some(resolved) = PropertyTable::Entity.resolve(key, ctx.cfg) else {
        return;
    };
    if let Err(err) = set.add(key, resolved, raw, placement, ctx.defs, overwrite) {
        log::warn!("animation '{key}' rejected: {err}");
        report.rejected.push((resolved.kind, err));
    }
}

fn euler_from_json(v: &JsonValue) -> Option<Quat> {
    let arr = v.as_array()?;
    if arr.len() != 3 {
        log::warn!("custom rotation needs 3 components, found {}", arr.len());
        return None;
    }
    let mut e = [0.0f32; 3];
    for (slot, c) in e.iter_mut().zip(arr) {
        *slot = c.as_f64()? as f32;
    }
    Some(euler_deg_to_quat(Vec3::from_array(e)))
}

fn world_rotation_from_json(v: &JsonValue) -> Option<Quat> {
    match v.as_f64() {
        Some(yaw) => Some(euler_deg_to_quat(Vec3::new(0.0, yaw as f32, 0.0))),
        None => euler_from_json(v),
    }
}
