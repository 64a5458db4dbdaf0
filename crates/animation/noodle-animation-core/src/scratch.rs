//! Scratch buffers and frame lifecycle.
//!
//! Track animators do not write into entity aggregators directly. During the
//! first pass of a tick they record [`WriteIntent`]s here; the engine applies
//! them in recording order before any entity evaluates its own channels, so
//! track contributions always precede entity contributions.

use crate::binding::ChannelKind;
use crate::config::Config;
use crate::ids::EntityId;
use crate::value::ChannelValue;

/// A deferred aggregator write from a track to one of its entities.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WriteIntent {
    pub target: EntityId,
    pub kind: ChannelKind,
    pub value: ChannelValue,
}

#[derive(Debug, Default)]
pub struct Scratch {
    pub intents: Vec<WriteIntent>,
    /// Lifetime (`time` channel) writes, normalized window fractions.
    pub lifetimes: Vec<(EntityId, f32)>,
    /// Entities that finished this tick in the recycled state.
    pub recycled: Vec<EntityId>,
}

impl Scratch {
    pub fn new(cfg: &Config) -> Self {
        Self {
            intents: Vec::with_capacity(cfg.events_capacity),
            lifetimes: Vec::new(),
            recycled: Vec::new(),
        }
    }

    #[inline]
    pub fn begin_frame(&mut self) {
        self.intents.clear();
        self.lifetimes.clear();
        self.recycled.clear();
    }

    /// Record one track value for one entity.
    #[inline]
    pub fn push(&mut self, target: EntityId, kind: ChannelKind, value: ChannelValue) {
        match (kind, value) {
            (ChannelKind::Time, ChannelValue::Float(f)) => self.lifetimes.push((target, f)),
            _ => self.intents.push(WriteIntent {
                target,
                kind,
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_writes_are_kept_apart() {
        let mut scratch = Scratch::new(&Config::default());
        scratch.push(EntityId(1), ChannelKind::Time, ChannelValue::Float(0.5));
        scratch.push(EntityId(1), ChannelKind::Dissolve, ChannelValue::Float(0.5));
        assert_eq!(scratch.lifetimes, vec![(EntityId(1), 0.5)]);
        assert_eq!(scratch.intents.len(), 1);
        scratch.begin_frame();
        assert!(scratch.intents.is_empty() && scratch.lifetimes.is_empty());
    }
}
