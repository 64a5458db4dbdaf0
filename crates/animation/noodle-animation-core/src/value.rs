//! Typed channel payloads and the per-type operations curves need.

use std::fmt::Debug;

use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::interp::functions::{catmull_rom_vec3, euler_deg_to_quat, lerp_hsv};

/// Coarse payload kind of a channel.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Float,
    Vec3,
    Quat,
    Color,
}

/// A value produced by a channel for one tick, tagged with its payload kind.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ChannelValue {
    Float(f32),
    Vec3(Vec3),
    /// Quaternion (x, y, z, w)
    Quat(Quat),
    /// RGBA color
    Color(Vec4),
}

impl ChannelValue {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            ChannelValue::Float(_) => ValueKind::Float,
            ChannelValue::Vec3(_) => ValueKind::Vec3,
            ChannelValue::Quat(_) => ValueKind::Quat,
            ChannelValue::Color(_) => ValueKind::Color,
        }
    }
}

/// Payload types that can be stored in keyframes and sampled from a curve.
pub trait CurveValue: Copy + Debug + PartialEq + 'static {
    const KIND: ValueKind;
    /// Numeric components authored per point.
    const COMPONENTS: usize;
    /// Fewest numeric components accepted per point.
    const MIN_COMPONENTS: usize = Self::COMPONENTS;

    /// Build a value from authored components (`MIN_COMPONENTS..=COMPONENTS` long).
    fn from_components(c: &[f32]) -> Self;

    /// Apply a unit conversion factor. Only positional payloads are affected.
    #[inline]
    fn scaled(self, _factor: f32) -> Self {
        self
    }

    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Spline interpolation between `p1` and `p2`; types without spline support lerp.
    #[inline]
    fn spline(_p0: Self, p1: Self, p2: Self, _p3: Self, t: f32) -> Self {
        Self::lerp(p1, p2, t)
    }

    /// Hue-space interpolation; types without a hue lerp.
    #[inline]
    fn lerp_hsv(a: Self, b: Self, t: f32) -> Self {
        Self::lerp(a, b, t)
    }

    fn into_channel(self) -> ChannelValue;
}

impl CurveValue for f32 {
    const KIND: ValueKind = ValueKind::Float;
    const COMPONENTS: usize = 1;

    #[inline]
    fn from_components(c: &[f32]) -> Self {
        c[0]
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }

    #[inline]
    fn into_channel(self) -> ChannelValue {
        ChannelValue::Float(self)
    }
}

impl CurveValue for Vec3 {
    const KIND: ValueKind = ValueKind::Vec3;
    const COMPONENTS: usize = 3;

    #[inline]
    fn from_components(c: &[f32]) -> Self {
        Vec3::new(c[0], c[1], c[2])
    }

    #[inline]
    fn scaled(self, factor: f32) -> Self {
        self * factor
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    #[inline]
    fn spline(p0: Self, p1: Self, p2: Self, p3: Self, t: f32) -> Self {
        catmull_rom_vec3(p0, p1, p2, p3, t)
    }

    #[inline]
    fn into_channel(self) -> ChannelValue {
        ChannelValue::Vec3(self)
    }
}

/// Rotations are authored as euler angles in degrees and stored as quaternions.
impl CurveValue for Quat {
    const KIND: ValueKind = ValueKind::Quat;
    const COMPONENTS: usize = 3;

    #[inline]
    fn from_components(c: &[f32]) -> Self {
        euler_deg_to_quat(Vec3::new(c[0], c[1], c[2]))
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.slerp(b, t)
    }

    #[inline]
    fn into_channel(self) -> ChannelValue {
        ChannelValue::Quat(self)
    }
}

/// RGBA color; a point with only RGB gets an opaque alpha.
impl CurveValue for Vec4 {
    const KIND: ValueKind = ValueKind::Color;
    const COMPONENTS: usize = 4;
    const MIN_COMPONENTS: usize = 3;

    #[inline]
    fn from_components(c: &[f32]) -> Self {
        let a = c.get(3).copied().unwrap_or(1.0);
        Vec4::new(c[0], c[1], c[2], a)
    }

    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }

    #[inline]
    fn lerp_hsv(a: Self, b: Self, t: f32) -> Self {
        lerp_hsv(a, b, t)
    }

    #[inline]
    fn into_channel(self) -> ChannelValue {
        ChannelValue::Color(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_accepts_rgb_with_opaque_alpha() {
        let c = <Vec4 as CurveValue>::from_components(&[0.5, 0.25, 1.0]);
        assert_eq!(c, Vec4::new(0.5, 0.25, 1.0, 1.0));
    }

    #[test]
    fn only_vectors_take_unit_scale() {
        assert_eq!(Vec3::ONE.scaled(2.0), Vec3::splat(2.0));
        assert_eq!(0.5f32.scaled(2.0), 0.5);
        assert_eq!(Quat::IDENTITY.scaled(2.0), Quat::IDENTITY);
    }
}
