//! Error types for tween construction and completion

use thiserror::Error;

/// Errors produced while building curves, starting tweens, or awaiting them
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TweenError {
    /// A required tween property was never provided
    #[error("missing required tween property `{0}` (a tween needs `from`, `to` and `duration_ms`)")]
    Missing(&'static str),

    /// Duration is negative, not finite, or too long to count in frames
    #[error(
        "tween duration must be a non-negative number of milliseconds below {max} (got {0})",
        max = u32::MAX as f64 * crate::tween::FRAME_MS
    )]
    InvalidDuration(f64),

    /// `from` and `to` describe different sets of properties
    #[error("`from` and `to` must have the same keys (from: {from:?}, to: {to:?})")]
    MismatchedKeys { from: Vec<String>, to: Vec<String> },

    /// Bezier control point x values must stay inside the unit interval
    #[error("bezier x values must be in [0, 1] range (x1 = {x1}, x2 = {x2})")]
    ControlPointOutOfRange { x1: f64, x2: f64 },

    /// No preset is registered under this name
    #[error("unknown easing preset `{0}`")]
    UnknownPreset(String),

    /// The frame scheduler dropped the tween before it resolved
    #[error("frame scheduler dropped the tween before it completed")]
    Abandoned,
}

impl TweenError {
    /// Whether this error comes from a bad argument at call time
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, TweenError::Abandoned)
    }
}

pub type Result<T, E = TweenError> = std::result::Result<T, E>;
