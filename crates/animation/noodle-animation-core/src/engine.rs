//! Engine: arena ownership, the track graph and the per-tick scheduler.
//!
//! Methods:
//! - configuration: new, set_beat_map, set_point_definitions, load_events
//! - arena: get_or_create_track, spawn_entity, configure_entity,
//!   configure_geometry, set_entity_enabled, remove_entity
//! - playback: update (tracks → intents → entities → commit), notify_time_changed
//!
//! Each update runs in fixed phases:
//! 1. every track evaluates and records write intents for its enabled children
//! 2. lifetime writes, then aggregator writes, are applied in recording order
//! 3. every entity evaluates its own channels into the same aggregators
//! 4. every evaluated entity commits; changed states are published

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::binding::ChannelKind;
use crate::config::Config;
use crate::curve::PointDefinitions;
use crate::data::{CustomEvent, CustomEventKind, EntitySource, GeometrySource};
use crate::entity::{ConfigureContext, EntityAnimator, TickOutcome};
use crate::error::MalformedCurveError;
use crate::ids::{EntityId, IdAllocator, TrackId};
use crate::inputs::{BeatTimeMap, ClockSample, IdentityBeatMap};
use crate::outputs::{Change, CoreEvent, Outputs};
use crate::scratch::Scratch;
use crate::track::TrackAnimator;

pub struct Engine {
    cfg: Config,
    ids: IdAllocator,
    entities: IndexMap<EntityId, EntityAnimator>,
    tracks: IndexMap<TrackId, TrackAnimator>,
    track_names: HashMap<String, TrackId>,

    // Authored inputs
    events: Vec<CustomEvent>,
    events_by_track: IndexMap<String, Vec<usize>>,
    point_definitions: PointDefinitions,
    beat_map: Box<dyn BeatTimeMap>,

    scratch: Scratch,
    /// Events raised outside of `update`, flushed into the next outputs.
    pending: Vec<CoreEvent>,
    outputs: Outputs,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.cfg)
            .field("entities", &self.entities.len())
            .field("tracks", &self.tracks.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    /// Create a new engine with the given config.
    pub fn new(cfg: Config) -> Self {
        Self {
            scratch: Scratch::new(&cfg),
            outputs: Outputs::with_capacity(cfg.events_capacity),
            pending: Vec::new(),
            ids: IdAllocator::new(),
            entities: IndexMap::new(),
            tracks: IndexMap::new(),
            track_names: HashMap::new(),
            events: Vec::new(),
            events_by_track: IndexMap::new(),
            point_definitions: PointDefinitions::new(),
            beat_map: Box::new(IdentityBeatMap),
            cfg,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Install the beat to song-time conversion used for path transitions.
    pub fn set_beat_map(&mut self, map: Box<dyn BeatTimeMap>) {
        self.beat_map = map;
    }

    /// Install named point definitions. Curves already built keep the
    /// definitions they were resolved against.
    pub fn set_point_definitions(&mut self, defs: PointDefinitions) {
        self.point_definitions = defs;
    }

    /// Replace all custom events: rebuild every track's channels and the
    /// track parent graph. Entities pick up path animation changes on their
    /// next configure.
    pub fn load_events(&mut self, events: Vec<CustomEvent>) {
        self.events = events;
        self.events_by_track.clear();
        for (idx, ev) in self.events.iter().enumerate() {
            for name in ev.tracks() {
                self.events_by_track
                    .entry(name.to_string())
                    .or_default()
                    .push(idx);
            }
        }

        // Tracks created here are built on creation; the rest are rebuilt.
        let existing: Vec<TrackId> = self.tracks.keys().copied().collect();
        for id in &existing {
            self.rebuild_track_channels(*id);
        }

        // Make sure every referenced track exists before wiring parents.
        let mut names: Vec<String> = self.events_by_track.keys().cloned().collect();
        for ev in &self.events {
            if ev.kind == CustomEventKind::AssignTrackParent {
                names.extend(ev.data.parent_track.iter().cloned());
                names.extend(ev.data.children_tracks.iter().flatten().cloned());
            }
        }
        for name in names {
            self.get_or_create_track(&name);
        }

        self.rebuild_track_parents();
        let ids: Vec<TrackId> = self.tracks.keys().copied().collect();
        self.refresh_tracks(ids);
    }

    /// Handle of the track with `name`, if it exists.
    pub fn track_id(&self, name: &str) -> Option<TrackId> {
        self.track_names.get(name).copied()
    }

    /// Handle of the track with `name`, creating (and loading) it when missing.
    pub fn get_or_create_track(&mut self, name: &str) -> TrackId {
        if let Some(id) = self.track_names.get(name) {
            return *id;
        }
        let id = self.ids.alloc_track();
        self.tracks.insert(id, TrackAnimator::new(id, name));
        self.track_names.insert(name.to_string(), id);
        self.rebuild_track_channels(id);
        id
    }

    /// Allocate an idle entity animator.
    pub fn spawn_entity(&mut self) -> EntityId {
        let id = self.ids.alloc_entity();
        self.entities.insert(id, EntityAnimator::new(id));
        id
    }

    /// (Re)configure an entity from object data, attaching it to its tracks.
    /// Returns `false` for an unknown handle.
    pub fn configure_entity(&mut self, id: EntityId, source: &EntitySource) -> bool {
        let Some(previous) = self.detach_entity(id) else {
            return false;
        };

        let track_ids: Vec<TrackId> = match (&source.custom.track, self.cfg.animation_mode) {
            (Some(tracks), true) => tracks
                .names()
                .map(str::to_string)
                .collect::<Vec<_>>()
                .iter()
                .map(|name| self.get_or_create_track(name))
                .collect(),
            _ => Vec::new(),
        };

        let report = {
            let mut per_track = Vec::with_capacity(track_ids.len());
            for tid in &track_ids {
                let name = self.tracks.get(tid).map(|t| t.name()).unwrap_or_default();
                let events: Vec<&CustomEvent> = self
                    .events_by_track
                    .get(name)
                    .map(|idxs| idxs.iter().map(|i| &self.events[*i]).collect())
                    .unwrap_or_default();
                per_track.push((*tid, events));
            }
            let ctx = ConfigureContext {
                cfg: &self.cfg,
                defs: &self.point_definitions,
                beat_map: self.beat_map.as_ref(),
            };
            let Some(entity) = self.entities.get_mut(&id) else {
                return false;
            };
            entity.configure(source, ctx, &per_track)
        };

        for (kind, err) in report.rejected {
            self.pending.push(rejected_event(Some(id), None, kind, &err));
        }
        if let Some(q) = report.quirk {
            self.pending.push(CoreEvent::LegacyQuirk {
                entity: id,
                original_y: q.original_y,
                corrected_y: q.corrected_y,
            });
        }
        let current = self.attach_entity(id);
        self.refresh_tracks(previous.into_iter().chain(current));
        true
    }

    /// Configure an entity as environment geometry.
    pub fn configure_geometry(&mut self, id: EntityId, source: &GeometrySource) -> bool {
        let Some(previous) = self.detach_entity(id) else {
            return false;
        };
        let track = source.track.as_deref().map(|name| self.get_or_create_track(name));
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.configure_geometry(source, &self.cfg, track);
        }
        let current = self.attach_entity(id);
        self.refresh_tracks(previous.into_iter().chain(current));
        true
    }

    /// Enable or disable an entity; its tracks recompute their enabled state.
    pub fn set_entity_enabled(&mut self, id: EntityId, enabled: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        entity.set_enabled(enabled);
        let tracks = entity.tracks().to_vec();
        self.refresh_tracks(tracks);
    }

    /// Request recycling once the entity passes its despawn point.
    pub fn arm_recycle(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.arm_recycle();
        }
    }

    /// Scrub an entity to a normalized position of its window (`None` clears).
    pub fn set_query_time_override(&mut self, id: EntityId, fraction: Option<f32>) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_query_time_override(fraction);
        }
    }

    /// Destroy an entity animator, detaching it from its tracks first.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(previous) = self.detach_entity(id) else {
            return false;
        };
        self.entities.shift_remove(&id);
        self.refresh_tracks(previous);
        true
    }

    /// Step all animators to `clock`.
    pub fn update(&mut self, clock: ClockSample) -> &Outputs {
        self.scratch.begin_frame();
        self.outputs.clear();
        self.outputs.events.append(&mut self.pending);

        // 1) Tracks record intents.
        let mut idle_drivers = Vec::new();
        for track in self.tracks.values_mut() {
            if !track.tick(clock.beat_time, &mut self.scratch) {
                idle_drivers.extend(track.driver());
            }
        }
        for driver in idle_drivers {
            if let Some(entity) = self.entities.get_mut(&driver) {
                entity.set_enabled(false);
            }
        }
        log::trace!(
            "tick {}: {} track intents",
            clock.song_time,
            self.scratch.intents.len()
        );

        // 2) Apply lifetime writes first so they take effect this tick.
        for (target, fraction) in self.scratch.lifetimes.drain(..) {
            if let Some(entity) = self.entities.get_mut(&target) {
                entity.set_query_time_override(Some(fraction));
            }
        }
        for intent in self.scratch.intents.drain(..) {
            if let Some(entity) = self.entities.get_mut(&intent.target) {
                entity.contribute(intent.kind, intent.value);
            }
        }

        // 3) + 4) Entities evaluate and commit.
        for entity in self.entities.values_mut() {
            let before = *entity.output();
            match entity.tick(clock.song_time) {
                TickOutcome::Skipped => continue,
                TickOutcome::Recycled => {
                    self.scratch.recycled.push(entity.id());
                    self.outputs.push_event(CoreEvent::RecycleRequested {
                        entity: entity.id(),
                    });
                }
                TickOutcome::Evaluated => {
                    entity.commit();
                    if *entity.output() != before {
                        self.outputs.push_change(Change {
                            entity: entity.id(),
                            state: *entity.output(),
                        });
                    }
                }
            }
        }

        let recycled = std::mem::take(&mut self.scratch.recycled);
        for id in &recycled {
            self.set_entity_enabled(*id, false);
        }
        self.scratch.recycled = recycled;

        self.outputs.events.append(&mut self.pending);
        &self.outputs
    }

    /// Time jumped while paused: snap every active entity's local transform
    /// straight from its aggregators.
    pub fn notify_time_changed(&mut self, clock: ClockSample) -> &Outputs {
        self.outputs.clear();
        if clock.is_playing {
            return &self.outputs;
        }
        for entity in self.entities.values_mut() {
            if !entity.is_enabled() || entity.role().is_none() {
                continue;
            }
            entity.snap();
            self.outputs.push_change(Change {
                entity: entity.id(),
                state: *entity.output(),
            });
        }
        &self.outputs
    }

    #[inline]
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityAnimator> {
        self.entities.get(&id)
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackAnimator> {
        self.tracks.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityAnimator> {
        self.entities.values()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackAnimator> {
        self.tracks.values()
    }

    /// Entity carrying a parented track's own transform.
    pub fn track_driver(&self, id: TrackId) -> Option<EntityId> {
        self.tracks.get(&id).and_then(TrackAnimator::driver)
    }

    /// Recompute a track's enabled-children snapshot, mirror the result onto
    /// its driver, then do the same for every ancestor.
    pub fn refresh_track(&mut self, id: TrackId) {
        self.refresh_tracks([id]);
    }

    /// Refresh several tracks at once. Ancestors are revisited whenever a
    /// driver's enabled flag flips, so every parent settles on the final
    /// state of all its child tracks.
    pub fn refresh_tracks(&mut self, ids: impl IntoIterator<Item = TrackId>) {
        let mut queue: VecDeque<TrackId> = VecDeque::new();
        for id in ids {
            if !queue.contains(&id) {
                queue.push_back(id);
            }
        }
        // Bounds the walk when parent links form a cycle.
        let n = self.tracks.len();
        let mut budget = n * n + queue.len();
        while let Some(tid) = queue.pop_front() {
            if budget == 0 {
                log::warn!("track refresh did not settle; parent links may form a cycle");
                break;
            }
            budget -= 1;
            let Some(track) = self.tracks.get(&tid) else {
                continue;
            };
            let enabled_children: Vec<EntityId> = track
                .children()
                .iter()
                .copied()
                .filter(|c| self.entities.get(c).is_some_and(EntityAnimator::is_enabled))
                .collect();

            let Some(track) = self.tracks.get_mut(&tid) else {
                continue;
            };
            let was = track.set_enabled_children(enabled_children);
            let now = track.is_enabled();
            let driver = track.driver();
            let parents = track.parents().to_vec();

            if was != now {
                log::debug!("track '{}' {}", track.name(), if now { "enabled" } else { "disabled" });
                self.pending.push(if now {
                    CoreEvent::TrackEnabled { track: tid }
                } else {
                    CoreEvent::TrackDisabled { track: tid }
                });
            }
            let Some(entity) = driver.and_then(|d| self.entities.get_mut(&d)) else {
                continue;
            };
            if entity.is_enabled() != now {
                entity.set_enabled(now);
                for p in parents {
                    if !queue.contains(&p) {
                        queue.push_back(p);
                    }
                }
            }
        }
    }

    fn rebuild_track_channels(&mut self, id: TrackId) {
        let Some(track) = self.tracks.get_mut(&id) else {
            return;
        };
        let events = self
            .events_by_track
            .get(track.name())
            .into_iter()
            .flatten()
            .map(|i| &self.events[*i])
            .filter(|ev| ev.kind == CustomEventKind::AnimateTrack);
        let rejected = track.set_events(events, &self.cfg, &self.point_definitions);
        for (kind, err) in rejected {
            self.pending.push(rejected_event(None, Some(id), kind, &err));
        }
    }

    /// Rewire parent links and drivers from `AssignTrackParent` events.
    fn rebuild_track_parents(&mut self) {
        let drivers: Vec<EntityId> = self.tracks.values().filter_map(TrackAnimator::driver).collect();
        for track in self.tracks.values_mut() {
            track.parents.clear();
            track.children.retain(|c| !drivers.contains(c));
        }
        for driver in &drivers {
            if let Some(entity) = self.entities.get_mut(driver) {
                entity.take_tracks();
            }
        }

        let links: Vec<(String, Vec<String>)> = self
            .events
            .iter()
            .filter(|ev| ev.kind == CustomEventKind::AssignTrackParent)
            .filter_map(|ev| {
                let parent = ev.data.parent_track.clone()?;
                let children = ev.data.children_tracks.clone().unwrap_or_default();
                Some((parent, children))
            })
            .collect();

        for (parent_name, children) in links {
            let parent = self.get_or_create_track(&parent_name);
            for child_name in children {
                let child = self.get_or_create_track(&child_name);
                if child == parent {
                    continue;
                }
                let driver = self.ensure_driver(child);
                if let Some(track) = self.tracks.get_mut(&child) {
                    if !track.parents.contains(&parent) {
                        track.parents.push(parent);
                    }
                }
                if let Some(track) = self.tracks.get_mut(&parent) {
                    track.attach(driver);
                }
                if let Some(entity) = self.entities.get_mut(&driver) {
                    entity.attach_track(parent);
                }
            }
        }
    }

    fn ensure_driver(&mut self, track: TrackId) -> EntityId {
        if let Some(driver) = self.track_driver(track) {
            return driver;
        }
        let id = self.spawn_entity();
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.configure_track_driver(track);
        }
        if let Some(t) = self.tracks.get_mut(&track) {
            t.driver = Some(id);
        }
        id
    }

    /// Unlink an entity from all its tracks, returning them for a later
    /// refresh. `None` for an unknown handle.
    fn detach_entity(&mut self, id: EntityId) -> Option<Vec<TrackId>> {
        let entity = self.entities.get_mut(&id)?;
        let tracks = entity.take_tracks();
        for t in &tracks {
            if let Some(track) = self.tracks.get_mut(t) {
                track.detach(id);
            }
        }
        Some(tracks)
    }

    /// Link an entity into the children of every track it recorded.
    fn attach_entity(&mut self, id: EntityId) -> Vec<TrackId> {
        let tracks = self
            .entities
            .get(&id)
            .map(|e| e.tracks().to_vec())
            .unwrap_or_default();
        for t in &tracks {
            if let Some(track) = self.tracks.get_mut(t) {
                track.attach(id);
            }
        }
        tracks
    }
}

fn rejected_event(
    entity: Option<EntityId>,
    track: Option<TrackId>,
    kind: ChannelKind,
    err: &MalformedCurveError,
) -> CoreEvent {
    CoreEvent::CurveRejected {
        entity,
        track,
        kind,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EntityKind, EventData, TrackRef};

    fn parent_event(parent: &str, children: &[&str]) -> CustomEvent {
        let data = EventData {
            parent_track: Some(parent.into()),
            children_tracks: Some(children.iter().map(|c| c.to_string()).collect()),
            ..EventData::default()
        };
        CustomEvent::new(0.0, CustomEventKind::AssignTrackParent, data)
    }

    fn note_on(track: &str) -> EntitySource {
        let mut src = EntitySource::new(EntityKind::Note, 10.0, 8.0, 2.0);
        src.custom.track = Some(TrackRef::One(track.into()));
        src
    }

    #[test]
    fn track_parents_are_wired_through_drivers() {
        let mut engine = Engine::default();
        engine.load_events(vec![parent_event("root", &["a", "b"])]);
        let root = engine.track_id("root").unwrap();
        let a = engine.track_id("a").unwrap();
        let driver_a = engine.track_driver(a).unwrap();
        assert_eq!(engine.track(a).unwrap().parents(), &[root]);
        assert!(engine.track(root).unwrap().children().contains(&driver_a));
        assert!(!engine.track(root).unwrap().is_enabled());

        let e = engine.spawn_entity();
        engine.configure_entity(e, &note_on("a"));
        assert!(engine.track(a).unwrap().is_enabled());
        assert!(engine.entity(driver_a).unwrap().is_enabled());
        assert!(engine.track(root).unwrap().is_enabled());
    }

    #[test]
    fn reloading_events_does_not_duplicate_links() {
        let mut engine = Engine::default();
        let events = vec![parent_event("root", &["a"])];
        engine.load_events(events.clone());
        engine.load_events(events);
        let root = engine.track_id("root").unwrap();
        let a = engine.track_id("a").unwrap();
        assert_eq!(engine.track(root).unwrap().children().len(), 1);
        assert_eq!(engine.track(a).unwrap().parents().len(), 1);
    }

    #[test]
    fn unknown_handles_are_rejected() {
        let mut engine = Engine::default();
        assert!(!engine.configure_entity(EntityId(99), &note_on("a")));
        assert!(!engine.remove_entity(EntityId(99)));
        assert!(engine.track_id("a").is_none());
    }
}
