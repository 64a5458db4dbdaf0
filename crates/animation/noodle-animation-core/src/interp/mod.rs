//! Interpolation helpers and the easing catalogue.
//!
//! `functions` holds the value-space helpers (euler conversion, spline, HSV),
//! `easing` maps authored easing names to time-remapping functions.

pub mod easing;
pub mod functions;

pub use easing::Easing;
