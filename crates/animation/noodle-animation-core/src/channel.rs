//! Channels: curves bound to one animatable property, placed on a time line.
//!
//! A channel owns the curves authored for one [`ChannelKind`] of one owner
//! (a track or an entity). Curves keep insertion order, which is the order
//! their values reach the aggregators. Each curve carries a [`Placement`]
//! that maps the owner's query time into the curve's normalized `[0,1]`
//! domain, and is active from its activation time until a later curve of the
//! same channel activates.

use glam::{Quat, Vec3, Vec4};
use serde_json::Value as JsonValue;

use crate::binding::{ChannelKind, ResolvedKey};
use crate::curve::{parse_curve, Curve, PointDefinitions};
use crate::error::MalformedCurveError;
use crate::interp::Easing;
use crate::value::{ChannelValue, CurveValue};

/// How a curve's normalized time is derived from the owner's query time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Placement {
    /// A timed track event: plays over `duration`, `repeat` extra times.
    Event {
        start: f32,
        duration: f32,
        repeat: u32,
        easing: Easing,
    },
    /// Entity path animation spanning the entity's own window `[begin, end]`.
    /// A non-zero `transition` blends in from the previously active path.
    Path {
        activate: f32,
        begin: f32,
        end: f32,
        transition: f32,
        easing: Easing,
    },
}

impl Placement {
    /// Path animation over `[begin, end]`, active from the start of time.
    pub fn path(begin: f32, end: f32) -> Self {
        Placement::Path {
            activate: f32::NEG_INFINITY,
            begin,
            end,
            transition: 0.0,
            easing: Easing::Linear,
        }
    }

    /// Time at which the curve becomes active.
    #[inline]
    pub fn activation(&self) -> f32 {
        match *self {
            Placement::Event { start, .. } => start,
            Placement::Path { activate, .. } => activate,
        }
    }

    /// Normalized curve time for query time `t`.
    pub fn local_time(&self, t: f32) -> f32 {
        match *self {
            Placement::Event {
                start,
                duration,
                repeat,
                easing,
            } => {
                if duration <= 0.0 {
                    return 1.0;
                }
                let elapsed = t - start;
                if elapsed >= duration * (repeat as f32 + 1.0) {
                    return 1.0;
                }
                easing.apply((elapsed / duration).fract())
            }
            Placement::Path { begin, end, .. } => {
                if end <= begin {
                    return 1.0;
                }
                ((t - begin) / (end - begin)).clamp(0.0, 1.0)
            }
        }
    }

    /// Blend weight of this curve against the previous one, `1.0` when fully in.
    pub fn transition_weight(&self, t: f32) -> f32 {
        match *self {
            Placement::Path {
                activate,
                transition,
                easing,
                ..
            } if transition > 0.0 && t < activate + transition => {
                easing.apply((t - activate) / transition)
            }
            _ => 1.0,
        }
    }
}

#[derive(Clone, Debug)]
struct ChannelEntry<T> {
    curve: Curve<T>,
    placement: Placement,
    /// Authored property key the curve was parsed from.
    source: Option<Box<str>>,
    active_until: f32,
    previous: Option<usize>,
}

/// Ordered curves of one property with a shared default.
#[derive(Clone, Debug)]
pub struct Channel<T> {
    entries: Vec<ChannelEntry<T>>,
    default: T,
    start_time: f32,
}

impl<T: CurveValue> Channel<T> {
    pub fn new(default: T) -> Self {
        Self {
            entries: Vec::new(),
            default,
            start_time: f32::INFINITY,
        }
    }

    /// Append a curve; evaluation follows insertion order.
    pub fn add_curve(&mut self, curve: Curve<T>, placement: Placement) {
        self.push_entry(None, curve, placement);
    }

    /// Append a curve authored under `source`. With `replace`, curves
    /// previously added from the same source are dropped first; curves from
    /// other keys of this channel are kept.
    pub fn add_authored(&mut self, source: &str, curve: Curve<T>, placement: Placement, replace: bool) {
        if replace {
            self.entries.retain(|e| e.source.as_deref() != Some(source));
        }
        self.push_entry(Some(source.into()), curve, placement);
    }

    fn push_entry(&mut self, source: Option<Box<str>>, curve: Curve<T>, placement: Placement) {
        self.entries.push(ChannelEntry {
            curve,
            placement,
            source,
            active_until: f32::INFINITY,
            previous: None,
        });
    }

    /// Finish a rebuild: derive each curve's active span and the channel start.
    pub fn sort(&mut self) {
        let activations: Vec<f32> = self
            .entries
            .iter()
            .map(|e| e.placement.activation())
            .collect();
        self.start_time = activations.iter().copied().fold(f32::INFINITY, f32::min);

        for (i, entry) in self.entries.iter_mut().enumerate() {
            let own = activations[i];
            entry.active_until = activations
                .iter()
                .copied()
                .filter(|a| *a > own)
                .fold(f32::INFINITY, f32::min);

            // Latest earlier activation; ties resolve to the last inserted.
            let mut previous: Option<usize> = None;
            for (j, a) in activations.iter().enumerate() {
                if *a < own && previous.map_or(true, |p| *a >= activations[p]) {
                    previous = Some(j);
                }
            }
            entry.previous = previous;
        }
    }

    #[inline]
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn default_value(&self) -> T {
        self.default
    }

    /// Evaluate every curve active at `t`, in insertion order.
    pub fn update_property<F: FnMut(T)>(&self, t: f32, mut setter: F) {
        for entry in &self.entries {
            let activation = entry.placement.activation();
            if t < activation || t >= entry.active_until {
                continue;
            }
            let local = entry.placement.local_time(t);
            let value = entry.curve.sample(local);
            let weight = entry.placement.transition_weight(t);
            if weight >= 1.0 {
                setter(value);
                continue;
            }
            let from = entry
                .previous
                .map(|p| self.entries[p].curve.sample(local))
                .unwrap_or(self.default);
            setter(T::lerp(from, value, weight));
        }
    }

    fn has_definite_position(&self) -> bool {
        self.entries.iter().any(|e| e.curve.is_definite_position())
    }
}

/// A channel of any payload type.
#[derive(Clone, Debug)]
pub enum AnyChannel {
    Float(Channel<f32>),
    Vec3(Channel<Vec3>),
    Quat(Channel<Quat>),
    Color(Channel<Vec4>),
}

impl AnyChannel {
    fn sort(&mut self) {
        match self {
            AnyChannel::Float(c) => c.sort(),
            AnyChannel::Vec3(c) => c.sort(),
            AnyChannel::Quat(c) => c.sort(),
            AnyChannel::Color(c) => c.sort(),
        }
    }

    pub fn start_time(&self) -> f32 {
        match self {
            AnyChannel::Float(c) => c.start_time(),
            AnyChannel::Vec3(c) => c.start_time(),
            AnyChannel::Quat(c) => c.start_time(),
            AnyChannel::Color(c) => c.start_time(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AnyChannel::Float(c) => c.is_empty(),
            AnyChannel::Vec3(c) => c.is_empty(),
            AnyChannel::Quat(c) => c.is_empty(),
            AnyChannel::Color(c) => c.is_empty(),
        }
    }

    fn has_definite_position(&self) -> bool {
        match self {
            AnyChannel::Vec3(c) => c.has_definite_position(),
            _ => false,
        }
    }

    fn update<F: FnMut(ChannelValue)>(&self, t: f32, mut emit: F) {
        match self {
            AnyChannel::Float(c) => c.update_property(t, |v| emit(v.into_channel())),
            AnyChannel::Vec3(c) => c.update_property(t, |v| emit(v.into_channel())),
            AnyChannel::Quat(c) => c.update_property(t, |v| emit(v.into_channel())),
            AnyChannel::Color(c) => c.update_property(t, |v| emit(v.into_channel())),
        }
    }
}

/// Payloads that can live in an [`AnyChannel`].
trait ChannelPayload: CurveValue {
    fn wrap(channel: Channel<Self>) -> AnyChannel;
    fn channel_mut(any: &mut AnyChannel) -> Option<&mut Channel<Self>>;
    fn from_value(v: ChannelValue) -> Option<Self>;
}

macro_rules! channel_payload {
    ($ty:ty, $variant:ident) => {
        impl ChannelPayload for $ty {
            fn wrap(channel: Channel<Self>) -> AnyChannel {
                AnyChannel::$variant(channel)
            }

            fn channel_mut(any: &mut AnyChannel) -> Option<&mut Channel<Self>> {
                match any {
                    AnyChannel::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn from_value(v: ChannelValue) -> Option<Self> {
                match v {
                    ChannelValue::$variant(x) => Some(x),
                    _ => None,
                }
            }
        }
    };
}

channel_payload!(f32, Float);
channel_payload!(Vec3, Vec3);
channel_payload!(Quat, Quat);
channel_payload!(Vec4, Color);

/// One slot per [`ChannelKind`]; empty slots are skipped. Slots evaluate in
/// the order they were first filled.
#[derive(Clone, Debug, Default)]
pub struct ChannelSet {
    slots: [Option<AnyChannel>; ChannelKind::COUNT],
    order: Vec<ChannelKind>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw`, authored under property key `source`, and add it to the
    /// channel of `key.kind`.
    ///
    /// With `overwrite` earlier curves from the same `source` are replaced,
    /// otherwise the curve is appended. On error the set is left untouched.
    pub fn add(
        &mut self,
        source: &str,
        key: ResolvedKey,
        raw: &JsonValue,
        placement: Placement,
        defs: &PointDefinitions,
        overwrite: bool,
    ) -> Result<(), MalformedCurveError> {
        let slot = &mut self.slots[key.kind.index()];
        let pushed = match key.kind.default_value() {
            ChannelValue::Float(_) => push::<f32>(slot, source, key, raw, placement, defs, overwrite),
            ChannelValue::Vec3(_) => push::<Vec3>(slot, source, key, raw, placement, defs, overwrite),
            ChannelValue::Quat(_) => push::<Quat>(slot, source, key, raw, placement, defs, overwrite),
            ChannelValue::Color(_) => push::<Vec4>(slot, source, key, raw, placement, defs, overwrite),
        };
        if pushed.is_ok() && !self.order.contains(&key.kind) {
            self.order.push(key.kind);
        }
        pushed
    }

    /// Sort every channel and drop the empty ones.
    pub fn finish(&mut self) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(AnyChannel::is_empty) {
                *slot = None;
            }
            if let Some(channel) = slot {
                channel.sort();
            }
        }
        let slots = &self.slots;
        self.order.retain(|kind| slots[kind.index()].is_some());
    }

    /// Kinds in evaluation order.
    #[inline]
    pub fn kinds(&self) -> &[ChannelKind] {
        &self.order
    }

    #[inline]
    pub fn get(&self, kind: ChannelKind) -> Option<&AnyChannel> {
        self.slots[kind.index()].as_ref()
    }

    #[inline]
    pub fn contains(&self, kind: ChannelKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Any definite-position curve present.
    pub fn has_definite_position(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(AnyChannel::has_definite_position)
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
        self.order.clear();
    }

    /// Evaluate every started channel at `t`, in first-insertion order.
    pub fn update<F: FnMut(ChannelKind, ChannelValue)>(&self, t: f32, mut emit: F) {
        for &kind in &self.order {
            let Some(channel) = &self.slots[kind.index()] else {
                continue;
            };
            if t >= channel.start_time() {
                channel.update(t, |v| emit(kind, v));
            }
        }
    }
}

fn push<T: ChannelPayload>(
    slot: &mut Option<AnyChannel>,
    source: &str,
    key: ResolvedKey,
    raw: &JsonValue,
    placement: Placement,
    defs: &PointDefinitions,
    overwrite: bool,
) -> Result<(), MalformedCurveError> {
    let mut curve = parse_curve::<T>(raw, key.unit_scale, defs)?;
    if key.definite_position {
        curve.mark_definite_position();
    }
    let default = T::from_value(key.kind.default_value()).ok_or(MalformedCurveError::Shape(
        "channel default does not match its payload",
    ))?;

    let any = slot.get_or_insert_with(|| T::wrap(Channel::new(default)));
    let channel = T::channel_mut(any).ok_or(MalformedCurveError::Shape(
        "channel slot holds a different payload",
    ))?;
    channel.add_authored(source, curve, placement, overwrite);
    Ok(())
}
