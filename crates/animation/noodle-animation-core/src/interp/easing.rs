//! Easing catalogue keyed by the names map authors write (`easeInOutQuad`, ...).
//!
//! Every easing maps `t ∈ [0,1]` to an eased fraction with `f(0) = 0` and
//! `f(1) = 1`; Back and Elastic overshoot in between.

use std::f32::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MalformedCurveError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Linear,
    /// Holds the left value until the segment ends.
    Step,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InElastic,
    OutElastic,
    InOutElastic,
    InBounce,
    OutBounce,
    InOutBounce,
}

const NAMES: &[(&str, Easing)] = &[
    ("easeLinear", Easing::Linear),
    ("easeStep", Easing::Step),
    ("easeInQuad", Easing::InQuad),
    ("easeOutQuad", Easing::OutQuad),
    ("easeInOutQuad", Easing::InOutQuad),
    ("easeInCubic", Easing::InCubic),
    ("easeOutCubic", Easing::OutCubic),
    ("easeInOutCubic", Easing::InOutCubic),
    ("easeInQuart", Easing::InQuart),
    ("easeOutQuart", Easing::OutQuart),
    ("easeInOutQuart", Easing::InOutQuart),
    ("easeInQuint", Easing::InQuint),
    ("easeOutQuint", Easing::OutQuint),
    ("easeInOutQuint", Easing::InOutQuint),
    ("easeInSine", Easing::InSine),
    ("easeOutSine", Easing::OutSine),
    ("easeInOutSine", Easing::InOutSine),
    ("easeInExpo", Easing::InExpo),
    ("easeOutExpo", Easing::OutExpo),
    ("easeInOutExpo", Easing::InOutExpo),
    ("easeInCirc", Easing::InCirc),
    ("easeOutCirc", Easing::OutCirc),
    ("easeInOutCirc", Easing::InOutCirc),
    ("easeInBack", Easing::InBack),
    ("easeOutBack", Easing::OutBack),
    ("easeInOutBack", Easing::InOutBack),
    ("easeInElastic", Easing::InElastic),
    ("easeOutElastic", Easing::OutElastic),
    ("easeInOutElastic", Easing::InOutElastic),
    ("easeInBounce", Easing::InBounce),
    ("easeOutBounce", Easing::OutBounce),
    ("easeInOutBounce", Easing::InOutBounce),
];

impl Easing {
    /// Look up an authored easing name.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.iter().find(|(n, _)| *n == name).map(|(_, e)| *e)
    }

    /// Authored name of this easing.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(_, e)| *e == self)
            .map(|(n, _)| *n)
            .unwrap_or("easeLinear")
    }

    /// Remap a fraction. Inputs outside `[0,1]` are clamped first.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::Step => t.floor(),
            Easing::InQuad => t * t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::InCubic => t.powi(3),
            Easing::OutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::InOutCubic => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::InQuart => t.powi(4),
            Easing::OutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::InQuint => t.powi(5),
            Easing::OutQuint => 1.0 - (1.0 - t).powi(5),
            Easing::InOutQuint => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::InExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * t - 10.0)
                }
            }
            Easing::OutExpo => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::InOutExpo => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Easing::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::OutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Easing::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Easing::InBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                C3 * t.powi(3) - C1 * t * t
            }
            Easing::OutBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::InOutBack => {
                const C2: f32 = 1.70158 * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }
            Easing::InElastic => {
                const C4: f32 = (2.0 * PI) / 3.0;
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * C4).sin()
                }
            }
            Easing::OutElastic => {
                const C4: f32 = (2.0 * PI) / 3.0;
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
                }
            }
            Easing::InOutElastic => {
                const C5: f32 = (2.0 * PI) / 4.5;
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0
                } else {
                    (2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }
            Easing::InBounce => 1.0 - bounce_out(1.0 - t),
            Easing::OutBounce => bounce_out(t),
            Easing::InOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }
}

fn bounce_out(mut t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        t -= 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        t -= 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        t -= 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

impl FromStr for Easing {
    type Err = MalformedCurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Easing::from_name(s).ok_or_else(|| MalformedCurveError::UnknownEasing(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_easing_pins_its_endpoints() {
        for (name, easing) in NAMES {
            let start = easing.apply(0.0);
            let end = easing.apply(1.0);
            assert!(start.abs() < 1e-4, "{name} f(0) = {start}");
            assert!((end - 1.0).abs() < 1e-4, "{name} f(1) = {end}");
        }
    }

    #[test]
    fn names_round_trip() {
        for (name, easing) in NAMES {
            assert_eq!(Easing::from_name(name), Some(*easing));
            assert_eq!(easing.name(), *name);
        }
        assert!("easeSideways".parse::<Easing>().is_err());
    }

    #[test]
    fn step_holds_until_the_end() {
        assert_eq!(Easing::Step.apply(0.99), 0.0);
        assert_eq!(Easing::Step.apply(1.0), 1.0);
    }

    #[test]
    fn in_out_variants_are_symmetric_at_half() {
        for easing in [
            Easing::InOutQuad,
            Easing::InOutCubic,
            Easing::InOutSine,
            Easing::InOutCirc,
            Easing::InOutExpo,
        ] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-4, "{easing:?}");
        }
    }
}
