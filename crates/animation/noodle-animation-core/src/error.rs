//! Error types for curve parsing and document loading.

use thiserror::Error;

/// A single channel's point data could not be turned into a curve.
///
/// Owners catch this, log it, and leave the channel absent; the rest of the
/// rebuild continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedCurveError {
    #[error("point definition is empty")]
    Empty,
    #[error("point {index} has {found} numeric components, expected {expected}")]
    Arity {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("point {index} component {component} is not a finite number")]
    NotANumber { index: usize, component: usize },
    #[error("unknown easing '{0}'")]
    UnknownEasing(String),
    #[error("unknown point flag '{0}'")]
    UnknownFlag(String),
    #[error("named point definition '{0}' does not exist")]
    UnresolvedReference(String),
    #[error("unsupported point definition shape: {0}")]
    Shape(&'static str),
}

/// Errors produced while reading external JSON documents.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("entity custom data parse error: {0}")]
    Entity(#[source] serde_json::Error),
    #[error("custom event parse error: {0}")]
    Events(#[source] serde_json::Error),
    #[error("geometry parse error: {0}")]
    Geometry(#[source] serde_json::Error),
    #[error("point definitions parse error: {0}")]
    PointDefinitions(#[source] serde_json::Error),
}
