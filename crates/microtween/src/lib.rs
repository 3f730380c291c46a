//! Microtween
//!
//! A small tweening library: give it starting and ending values, a duration
//! and an easing curve, and it calls back once per frame with the
//! interpolated values until it reaches the end.
//!
//! # Features
//!
//! - **Bezier Easing**: CSS-style cubic bezier curves, inverted with a
//!   sample table, Newton-Raphson and bisection
//! - **Presets**: named curves such as `easeOut`, `elastic` and `expo`
//! - **Injected Scheduling**: frames are paced by a [`FrameScheduler`], either
//!   a deterministic [`ManualScheduler`] or a background [`ThreadScheduler`]
//! - **Cancellable**: cancelling a tween jumps its result to the end values

pub mod easing;
pub mod error;
pub mod presets;
pub mod scheduler;
pub mod tween;

pub use easing::{CubicBezier, Easing, EasingFn, EasingInput};
pub use error::TweenError;
pub use presets::{preset, presets, Preset};
pub use scheduler::{FrameScheduler, ManualScheduler, ThreadScheduler, TickCallback, TickId};
pub use tween::{
    frame_count, start_tween, FrameCallback, TweenCanceller, TweenHandle, TweenSpec, TweenState,
    ValueMap, FRAME_MS,
};
