//! Fixed-capacity aggregation of same-tick contributions into one value per channel.
//!
//! Several producers write into an entity's aggregators during a tick (parent
//! tracks first, then the entity's own channels). The commit pass reads each
//! aggregator once, folding contributions in insertion order with the
//! channel's operator, and the transient contributions are dropped. Preloaded
//! contributions are standing baselines that survive every read.

use glam::{Quat, Vec3, Vec4};

use crate::binding::ChannelKind;
use crate::value::ChannelValue;

/// Most contributions one aggregator holds per cycle. Practical authoring
/// tops out at parent track + entity + definite position + environment default.
pub const AGGREGATOR_CAPACITY: usize = 4;

#[derive(Clone, Debug)]
pub struct Aggregator<T: Copy> {
    items: [T; AGGREGATOR_CAPACITY],
    count: usize,
    keep: usize,
    combine: fn(T, T) -> T,
    default: T,
}

impl<T: Copy> Aggregator<T> {
    pub fn new(default: T, combine: fn(T, T) -> T) -> Self {
        Self {
            items: [default; AGGREGATOR_CAPACITY],
            count: 0,
            keep: 0,
            combine,
            default,
        }
    }

    /// Append a contribution for this cycle. Beyond capacity the newest is
    /// dropped and `false` is returned.
    #[inline]
    pub fn add(&mut self, v: T) -> bool {
        if self.count >= AGGREGATOR_CAPACITY {
            return false;
        }
        self.items[self.count] = v;
        self.count += 1;
        true
    }

    /// Append a contribution that survives every future [`get`](Self::get).
    #[inline]
    pub fn preload(&mut self, v: T) {
        if self.add(v) {
            self.keep += 1;
        }
    }

    /// Fold all current contributions in insertion order, then discard the
    /// transient ones. Returns the default when nothing was contributed.
    pub fn get(&mut self) -> T {
        if self.count == 0 {
            return self.default;
        }
        let value = self.fold();
        self.count = self.keep;
        value
    }

    /// Fold without consuming this cycle's contributions.
    pub fn peek(&self) -> T {
        if self.count == 0 {
            return self.default;
        }
        self.fold()
    }

    fn fold(&self) -> T {
        let mut value = self.items[0];
        for item in &self.items[1..self.count] {
            value = (self.combine)(value, *item);
        }
        value
    }

    /// Drop this cycle's contributions without reading them.
    #[inline]
    pub fn discard(&mut self) {
        self.count = self.keep;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn keep(&self) -> usize {
        self.keep
    }

    #[inline]
    pub fn default_value(&self) -> T {
        self.default
    }

    #[inline]
    pub fn set_default(&mut self, v: T) {
        self.default = v;
    }
}

/// Channel operators.
pub mod ops {
    use glam::{Quat, Vec3, Vec4};

    /// Rotation composition; order-sensitive.
    #[inline]
    pub fn quat_product(a: Quat, b: Quat) -> Quat {
        a * b
    }

    #[inline]
    pub fn vec_sum(a: Vec3, b: Vec3) -> Vec3 {
        a + b
    }

    #[inline]
    pub fn vec_scale(a: Vec3, b: Vec3) -> Vec3 {
        a * b
    }

    #[inline]
    pub fn color_multiply(a: Vec4, b: Vec4) -> Vec4 {
        a * b
    }

    #[inline]
    pub fn scalar_multiply(a: f32, b: f32) -> f32 {
        a * b
    }
}

/// The full aggregator set of one entity.
#[derive(Clone, Debug)]
pub struct AggregatorSet {
    pub local_rotation: Aggregator<Quat>,
    pub world_rotation: Aggregator<Quat>,
    pub offset_position: Aggregator<Vec3>,
    pub world_position: Aggregator<Vec3>,
    pub scale: Aggregator<Vec3>,
    pub color: Aggregator<Vec4>,
    pub opacity: Aggregator<f32>,
    pub arrow_opacity: Aggregator<f32>,
    /// World rotation writes land in `local_rotation` (geometry).
    pub alias_world_rotation: bool,
}

impl AggregatorSet {
    pub fn new(base_color: Vec4) -> Self {
        Self {
            local_rotation: Aggregator::new(Quat::IDENTITY, ops::quat_product),
            world_rotation: Aggregator::new(Quat::IDENTITY, ops::quat_product),
            offset_position: Aggregator::new(Vec3::ZERO, ops::vec_sum),
            world_position: Aggregator::new(Vec3::ZERO, ops::vec_sum),
            scale: Aggregator::new(Vec3::ONE, ops::vec_scale),
            color: Aggregator::new(base_color, ops::color_multiply),
            opacity: Aggregator::new(1.0, ops::scalar_multiply),
            arrow_opacity: Aggregator::new(1.0, ops::scalar_multiply),
            alias_world_rotation: false,
        }
    }

    #[inline]
    fn world_rotation_mut(&mut self) -> &mut Aggregator<Quat> {
        if self.alias_world_rotation {
            &mut self.local_rotation
        } else {
            &mut self.world_rotation
        }
    }

    /// Route a channel write to its aggregator. Returns `false` when the write
    /// was not absorbed (saturated, kind mismatch, or not an aggregated channel).
    pub fn add(&mut self, kind: ChannelKind, value: ChannelValue) -> bool {
        match (kind, value) {
            (ChannelKind::LocalRotation, ChannelValue::Quat(q)) => self.local_rotation.add(q),
            (ChannelKind::WorldRotation, ChannelValue::Quat(q)) => {
                self.world_rotation_mut().add(q)
            }
            (ChannelKind::OffsetPosition, ChannelValue::Vec3(v)) => self.offset_position.add(v),
            (ChannelKind::DefinitePosition, ChannelValue::Vec3(v)) => self.world_position.add(v),
            (ChannelKind::Scale, ChannelValue::Vec3(v)) => self.scale.add(v),
            (ChannelKind::Color, ChannelValue::Color(c)) => self.color.add(c),
            (ChannelKind::Dissolve, ChannelValue::Float(f)) => self.opacity.add(f),
            (ChannelKind::DissolveArrow, ChannelValue::Float(f)) => self.arrow_opacity.add(f),
            _ => false,
        }
    }

    /// Drop every transient contribution, keeping preloaded baselines.
    pub fn discard(&mut self) {
        self.local_rotation.discard();
        self.world_rotation.discard();
        self.offset_position.discard();
        self.world_position.discard();
        self.scale.discard();
        self.color.discard();
        self.opacity.discard();
        self.arrow_opacity.discard();
    }

    /// True when any material aggregator holds a contribution.
    pub fn has_material_writes(&self) -> bool {
        self.color.count() > 0 || self.opacity.count() > 0 || self.arrow_opacity.count() > 0
    }
}
