//! Point definitions: typed keyframe curves and their parser.
//!
//! Authored points are JSON arrays laid out as `[v1..vN, time, flags...]`:
//! the value components come first, then the normalized time, then optional
//! string flags (an easing name, `"splineCatmullRom"`, `"lerpHSV"`). A curve
//! can also be written as a single point without a time, as a bare number
//! (float channels), or as the name of an entry in the point-definition table.
//!
//! Model:
//! - Keyframes are sorted by time after parsing (stable, so equal times keep
//!   authored order).
//! - The easing and flags of a keyframe shape the segment that ends at it.
//! - Sampling clamps: before the first keyframe yields the first value, after
//!   the last yields the last value.

use hashbrown::HashMap;
use serde_json::Value as JsonValue;

use crate::error::MalformedCurveError;
use crate::interp::Easing;
use crate::value::CurveValue;

/// Named point definitions a curve may reference by string.
pub type PointDefinitions = HashMap<String, JsonValue>;

const FLAG_SPLINE: &str = "splineCatmullRom";
const FLAG_HSV: &str = "lerpHSV";

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Keyframe<T> {
    /// Normalized time in [0,1] within the owning window.
    pub time: f32,
    pub value: T,
    pub easing: Easing,
    /// Catmull-Rom through the neighbouring keyframes (vector3 only).
    pub spline: bool,
    /// Interpolate through HSV space (color only).
    pub hsv: bool,
}

impl<T> Keyframe<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
            spline: false,
            hsv: false,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Curve<T> {
    points: Vec<Keyframe<T>>,
    definite_position: bool,
}

impl<T: CurveValue> Curve<T> {
    /// Build from keyframes, sorting them by time. Fails on an empty list.
    pub fn from_keyframes(mut points: Vec<Keyframe<T>>) -> Result<Self, MalformedCurveError> {
        if points.is_empty() {
            return Err(MalformedCurveError::Empty);
        }
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self {
            points,
            definite_position: false,
        })
    }

    pub fn constant(value: T) -> Self {
        Self {
            points: vec![Keyframe::new(0.0, value)],
            definite_position: false,
        }
    }

    #[inline]
    pub fn points(&self) -> &[Keyframe<T>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flag this curve as an absolute ("definite") position.
    pub fn mark_definite_position(&mut self) {
        self.definite_position = true;
    }

    #[inline]
    pub fn is_definite_position(&self) -> bool {
        self.definite_position
    }

    /// Sample at normalized time `t`.
    pub fn sample(&self, t: f32) -> T {
        let points = &self.points;
        let n = points.len();
        let first = &points[0];
        let last = &points[n - 1];
        if n == 1 || t.is_nan() || t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First keyframe strictly after t; 1..n-1 given the clamps above.
        let r = points.partition_point(|p| p.time <= t);
        let l = r - 1;
        let left = &points[l];
        let right = &points[r];
        if t == left.time {
            return left.value;
        }

        let frac = (t - left.time) / (right.time - left.time);
        let eased = right.easing.apply(frac);
        if right.spline {
            let p0 = points[l.saturating_sub(1)].value;
            let p3 = points[(r + 1).min(n - 1)].value;
            T::spline(p0, left.value, right.value, p3, eased)
        } else if right.hsv {
            T::lerp_hsv(left.value, right.value, eased)
        } else {
            T::lerp(left.value, right.value, eased)
        }
    }
}

/// Parse authored point data into a curve, baking `unit_scale` into values.
pub fn parse_curve<T: CurveValue>(
    raw: &JsonValue,
    unit_scale: f32,
    defs: &PointDefinitions,
) -> Result<Curve<T>, MalformedCurveError> {
    let raw = match raw {
        JsonValue::String(name) => defs
            .get(name)
            .filter(|v| !v.is_string())
            .ok_or_else(|| MalformedCurveError::UnresolvedReference(name.clone()))?,
        other => other,
    };

    let mut points = match raw {
        JsonValue::Number(_) => {
            if T::MIN_COMPONENTS != 1 {
                return Err(MalformedCurveError::Shape(
                    "a bare number only describes a float channel",
                ));
            }
            let v = number_at(raw, 0, 0)?;
            vec![Keyframe::new(0.0, T::from_components(&[v]))]
        }
        JsonValue::Array(items) if items.is_empty() => return Err(MalformedCurveError::Empty),
        JsonValue::Array(items) if items[0].is_array() => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let tokens = item.as_array().ok_or(MalformedCurveError::Shape(
                    "a point list mixes arrays and scalars",
                ))?;
                out.push(parse_point::<T>(tokens, index, true)?);
            }
            out
        }
        JsonValue::Array(items) => vec![parse_point::<T>(items, 0, false)?],
        _ => {
            return Err(MalformedCurveError::Shape(
                "expected a number, an array, or a point definition name",
            ))
        }
    };

    if unit_scale != 1.0 {
        for p in &mut points {
            p.value = p.value.scaled(unit_scale);
        }
    }
    Curve::from_keyframes(points)
}

/// Tokenize one authored point. In a point list the time is mandatory; a lone
/// point may omit it and then sits at time 0.
fn parse_point<T: CurveValue>(
    tokens: &[JsonValue],
    index: usize,
    in_list: bool,
) -> Result<Keyframe<T>, MalformedCurveError> {
    let numeric = tokens.iter().take_while(|t| t.is_number()).count();
    let mut numbers = Vec::with_capacity(numeric);
    for component in 0..numeric {
        numbers.push(number_at(&tokens[component], index, component)?);
    }

    let (value_len, time) = if numeric == T::COMPONENTS + 1 {
        (T::COMPONENTS, numbers[T::COMPONENTS])
    } else if in_list && numeric >= T::MIN_COMPONENTS + 1 && numeric <= T::COMPONENTS {
        (numeric - 1, numbers[numeric - 1])
    } else if !in_list && numeric >= T::MIN_COMPONENTS && numeric <= T::COMPONENTS {
        (numeric, 0.0)
    } else {
        return Err(MalformedCurveError::Arity {
            index,
            expected: T::COMPONENTS + usize::from(in_list),
            found: numeric,
        });
    };

    let mut key = Keyframe::new(time, T::from_components(&numbers[..value_len]));
    for token in &tokens[numeric..] {
        let flag = token.as_str().ok_or(MalformedCurveError::Shape(
            "numbers may not follow point flags",
        ))?;
        match flag {
            FLAG_SPLINE => key.spline = true,
            FLAG_HSV => key.hsv = true,
            f if f.starts_with("ease") => key.easing = f.parse()?,
            f => return Err(MalformedCurveError::UnknownFlag(f.to_string())),
        }
    }
    Ok(key)
}

fn number_at(v: &JsonValue, index: usize, component: usize) -> Result<f32, MalformedCurveError> {
    v.as_f64()
        .map(|n| n as f32)
        .filter(|n| n.is_finite())
        .ok_or(MalformedCurveError::NotANumber { index, component })
}
