//! Track animators: named, shareable animation sources.
//!
//! A track owns channels built from its `AnimateTrack` events and fans every
//! evaluated value out to each currently enabled child entity. Tracks form a
//! parent graph through their driver entities: a child track's driver is an
//! entity attached to the parent track, so enabling or disabling children
//! ripples up the chain (see `Engine::refresh_track`).

use crate::binding::{ChannelKind, PropertyTable};
use crate::channel::{ChannelSet, Placement};
use crate::config::Config;
use crate::curve::PointDefinitions;
use crate::data::CustomEvent;
use crate::error::MalformedCurveError;
use crate::ids::{EntityId, TrackId};
use crate::scratch::Scratch;

#[derive(Clone, Debug)]
pub struct TrackAnimator {
    id: TrackId,
    name: String,
    pub(crate) parents: Vec<TrackId>,
    pub(crate) children: Vec<EntityId>,
    cached_enabled: Vec<EntityId>,
    enabled: bool,
    /// Entity carrying this track's own transform when it is parented.
    pub(crate) driver: Option<EntityId>,
    channels: ChannelSet,
}

impl TrackAnimator {
    pub fn new(id: TrackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parents: Vec::new(),
            children: Vec::new(),
            cached_enabled: Vec::new(),
            enabled: false,
            driver: None,
            channels: ChannelSet::new(),
        }
    }

    /// Rebuild every channel from `events`. The new channel set replaces the
    /// old one only once fully built; malformed properties are skipped and
    /// returned.
    pub fn set_events<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a CustomEvent>,
        cfg: &Config,
        defs: &PointDefinitions,
    ) -> Vec<(ChannelKind, MalformedCurveError)> {
        let mut rejected = Vec::new();
        let mut channels = ChannelSet::new();
        for ev in events {
            let placement = Placement::Event {
                start: ev.beat,
                duration: ev.duration(),
                repeat: ev.data.repeat.unwrap_or(0),
                easing: ev.data.easing(),
            };
            for (key, raw) in &ev.data.properties {
                let Some(resolved) = PropertyTable::Track.resolve(key, cfg) else {
                    continue;
                };
                if let Err(err) = channels.add(key, resolved, raw, placement, defs, false) {
                    log::warn!("track '{}': '{key}' rejected: {err}", self.name);
                    rejected.push((resolved.kind, err));
                }
            }
        }
        channels.finish();
        self.channels = channels;
        rejected
    }

    /// Evaluate at `beat_time` and record one write per enabled child.
    /// Returns `false` (and disables the track) when no child is enabled.
    pub fn tick(&mut self, beat_time: f32, scratch: &mut Scratch) -> bool {
        if self.cached_enabled.is_empty() {
            self.enabled = false;
            return false;
        }
        let children = &self.cached_enabled;
        self.channels.update(beat_time, |kind, value| {
            for child in children {
                scratch.push(*child, kind, value);
            }
        });
        true
    }

    /// Replace the enabled-children snapshot. Returns the previous enabled
    /// state so callers can detect transitions.
    pub(crate) fn set_enabled_children(&mut self, enabled: Vec<EntityId>) -> bool {
        let was = self.enabled;
        self.cached_enabled = enabled;
        self.enabled = !self.cached_enabled.is_empty();
        was
    }

    pub(crate) fn attach(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn detach(&mut self, child: EntityId) {
        self.children.retain(|c| *c != child);
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn parents(&self) -> &[TrackId] {
        &self.parents
    }

    #[inline]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    #[inline]
    pub fn enabled_children(&self) -> &[EntityId] {
        &self.cached_enabled
    }

    #[inline]
    pub fn driver(&self) -> Option<EntityId> {
        self.driver
    }

    #[inline]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomEventKind, EventData};
    use crate::value::ChannelValue;
    use serde_json::json;

    fn animate(beat: f32, duration: f32, props: serde_json::Value) -> CustomEvent {
        let mut data = EventData {
            duration: Some(duration),
            ..EventData::default()
        };
        if let serde_json::Value::Object(map) = props {
            data.properties.extend(map);
        }
        CustomEvent::new(beat, CustomEventKind::AnimateTrack, data)
    }

    #[test]
    fn tick_fans_out_to_enabled_children_only() {
        let cfg = Config::default();
        let mut track = TrackAnimator::new(TrackId(0), "t");
        let events = [animate(0.0, 2.0, json!({ "dissolve": [[0.0, 0.0], [1.0, 1.0]] }))];
        assert!(track.set_events(&events, &cfg, &PointDefinitions::new()).is_empty());

        let mut scratch = Scratch::new(&cfg);
        assert!(!track.tick(1.0, &mut scratch));
        assert!(!track.is_enabled());

        track.set_enabled_children(vec![EntityId(4), EntityId(7)]);
        assert!(track.tick(1.0, &mut scratch));
        let targets: Vec<EntityId> = scratch.intents.iter().map(|i| i.target).collect();
        assert_eq!(targets, vec![EntityId(4), EntityId(7)]);
        assert_eq!(scratch.intents[0].value, ChannelValue::Float(0.5));
    }

    #[test]
    fn set_events_is_idempotent() {
        let cfg = Config::default();
        let defs = PointDefinitions::new();
        let events = [
            animate(0.0, 1.0, json!({ "position": [[0.0, 1.0, 0.0, 0.0]] })),
            animate(2.0, 1.0, json!({ "scale": [[2.0, 2.0, 2.0, 0.0]], "unknown": 1 })),
        ];
        let mut track = TrackAnimator::new(TrackId(0), "t");
        track.set_events(&events, &cfg, &defs);
        let first = track.channels().len();
        track.set_events(&events, &cfg, &defs);
        assert_eq!(track.channels().len(), first);
        assert_eq!(first, 2);
    }

    #[test]
    fn rejected_properties_do_not_block_the_rest() {
        let cfg = Config::default();
        let events = [animate(
            0.0,
            1.0,
            json!({ "color": "nowhere", "dissolve": [[0.0, 0.0]] }),
        )];
        let mut track = TrackAnimator::new(TrackId(0), "t");
        let rejected = track.set_events(&events, &cfg, &PointDefinitions::new());
        assert_eq!(rejected.len(), 1);
        assert!(track.channels().contains(ChannelKind::Dissolve));
        assert!(!track.channels().contains(ChannelKind::Color));
    }
}
