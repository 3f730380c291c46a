//! Tweens: frame-by-frame interpolation between two value maps
//!
//! A tween owns its `from`/`to` snapshot and an easing, and advances one
//! frame per scheduler tick. Every frame computes
//! `from + (to - from) * easing(frame / length)` for each property and hands
//! the result to the frame callback. The final frame delivers `to` exactly.
//!
//! ```
//! use std::sync::Arc;
//! use microtween::{start_tween, ManualScheduler, TweenSpec};
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let mut handle = start_tween(
//!     TweenSpec::new()
//!         .from([("x", 0.0)])
//!         .to([("x", 10.0)])
//!         .duration_ms(100.0)
//!         .easing("easeOut"),
//!     &scheduler,
//! )
//! .unwrap();
//!
//! scheduler.run_until_idle(100);
//! assert_eq!(handle.try_result().unwrap().unwrap()["x"], 10.0);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, trace};

use crate::easing::{Easing, EasingInput};
use crate::error::{Result, TweenError};
use crate::scheduler::{lock, FrameScheduler};

/// Nominal frame length in milliseconds (60 Hz)
pub const FRAME_MS: f64 = 16.6666;

/// Longest tween, in frames, that [`frame_count`] can represent
const MAX_FRAMES: f64 = u32::MAX as f64;

/// Named numeric properties, iterated in insertion order
pub type ValueMap = IndexMap<String, f64>;

/// Called with the interpolated values of every frame
pub type FrameCallback = Box<dyn FnMut(&ValueMap) + Send>;

/// Number of frames a tween of `duration_ms` runs for
///
/// Saturates at `u32::MAX`; [`start_tween`] rejects durations that long.
pub fn frame_count(duration_ms: f64) -> u32 {
    (duration_ms / FRAME_MS).round() as u32
}

/// Lifecycle of a single tween
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenState {
    /// Started, first frame not yet run
    Scheduled,
    /// The given frame was the last one delivered
    Running(u32),
    /// Reached the final frame
    Completed,
    /// Cancelled before the final frame
    Cancelled,
}

impl TweenState {
    pub fn is_finished(self) -> bool {
        matches!(self, TweenState::Completed | TweenState::Cancelled)
    }
}

// ============================================================================
// Tween Spec
// ============================================================================

/// Everything needed to start a tween
///
/// `from`, `to` and `duration_ms` are required; leaving one out is reported
/// by [`start_tween`]. The easing defaults to the `default` preset.
#[derive(Default)]
pub struct TweenSpec {
    from: Option<ValueMap>,
    to: Option<ValueMap>,
    duration_ms: Option<f64>,
    easing: EasingInput,
    on_frame: Option<FrameCallback>,
}

impl TweenSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: starting values
    pub fn from<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.from = Some(collect_values(values));
        self
    }

    /// Builder: ending values
    pub fn to<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.to = Some(collect_values(values));
        self
    }

    /// Builder: duration in milliseconds
    pub fn duration_ms(mut self, ms: f64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Builder: duration
    pub fn duration(self, duration: Duration) -> Self {
        self.duration_ms(duration.as_secs_f64() * 1000.0)
    }

    /// Builder: easing by preset name, preset, control points or function
    pub fn easing(mut self, easing: impl Into<EasingInput>) -> Self {
        self.easing = easing.into();
        self
    }

    /// Builder: per-frame callback
    pub fn on_frame<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ValueMap) + Send + 'static,
    {
        self.on_frame = Some(Box::new(callback));
        self
    }

    /// Start the tween on `scheduler`
    pub fn start<S>(self, scheduler: &Arc<S>) -> Result<TweenHandle>
    where
        S: FrameScheduler + 'static,
    {
        start_tween(self, scheduler)
    }
}

fn collect_values<I, K>(values: I) -> ValueMap
where
    I: IntoIterator<Item = (K, f64)>,
    K: Into<String>,
{
    values.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

impl fmt::Debug for TweenSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenSpec")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration_ms", &self.duration_ms)
            .field("easing", &self.easing)
            .field("on_frame", &self.on_frame.is_some())
            .finish()
    }
}

// ============================================================================
// Starting a tween
// ============================================================================

/// Validate `spec` and schedule its first frame.
///
/// All argument errors are reported here, before anything is scheduled.
/// The scheduler is held weakly: if every other reference to it is dropped,
/// the tween stops and its completion reports [`TweenError::Abandoned`].
pub fn start_tween<S>(spec: TweenSpec, scheduler: &Arc<S>) -> Result<TweenHandle>
where
    S: FrameScheduler + 'static,
{
    let TweenSpec {
        from,
        to,
        duration_ms,
        easing,
        on_frame,
    } = spec;

    let from = from.ok_or(TweenError::Missing("from"))?;
    let to = to.ok_or(TweenError::Missing("to"))?;
    let duration_ms = duration_ms.ok_or(TweenError::Missing("duration_ms"))?;
    if !duration_ms.is_finite() || duration_ms < 0.0 || duration_ms / FRAME_MS > MAX_FRAMES {
        return Err(TweenError::InvalidDuration(duration_ms));
    }
    let spans = pair_values(&from, &to)?;
    let easing = easing.resolve()?;
    let length = frame_count(duration_ms);

    let (sender, receiver) = oneshot::channel();
    let shared = Arc::new(TweenShared {
        cancelled: AtomicBool::new(false),
        state: Mutex::new(TweenState::Scheduled),
        completion: Mutex::new(Some(sender)),
        to,
    });

    debug!(duration_ms, frames = length, properties = spans.len(), ?easing, "tween started");

    let scheduler: Weak<S> = Arc::downgrade(scheduler);
    let scheduler: Weak<dyn FrameScheduler> = scheduler;
    FrameLoop {
        shared: Arc::clone(&shared),
        scheduler,
        spans,
        easing,
        length,
        on_frame,
    }
    .schedule(1);

    Ok(TweenHandle {
        shared,
        completion: receiver,
        outcome: None,
    })
}

/// Pair each `from` value with its `to` value, in `from` order
fn pair_values(from: &ValueMap, to: &ValueMap) -> Result<Vec<Span>> {
    let spans: Option<Vec<Span>> = from
        .iter()
        .map(|(key, &start)| {
            to.get(key).map(|&end| Span {
                key: key.clone(),
                start,
                end,
            })
        })
        .collect();

    match spans {
        Some(spans) if spans.len() == to.len() => Ok(spans),
        _ => Err(TweenError::MismatchedKeys {
            from: from.keys().cloned().collect(),
            to: to.keys().cloned().collect(),
        }),
    }
}

/// One interpolated property
#[derive(Debug)]
struct Span {
    key: String,
    start: f64,
    end: f64,
}

/// State shared between the frame loop and the handle
#[derive(Debug)]
struct TweenShared {
    cancelled: AtomicBool,
    state: Mutex<TweenState>,
    completion: Mutex<Option<oneshot::Sender<ValueMap>>>,
    to: ValueMap,
}

impl TweenShared {
    /// Record progress; a concurrent cancel may already have finished the tween
    fn advance(&self, frame: u32) {
        let mut state = lock(&self.state);
        if !state.is_finished() {
            *state = TweenState::Running(frame);
        }
    }

    /// Resolve completion with the end values, unless a cancel got there first
    fn complete(&self) -> bool {
        let mut completion = lock(&self.completion);
        match completion.take() {
            Some(sender) => {
                *lock(&self.state) = TweenState::Completed;
                // The handle may be gone; nobody is waiting then
                let _ = sender.send(self.to.clone());
                true
            }
            None => false,
        }
    }

    fn cancel(&self) -> bool {
        let mut completion = lock(&self.completion);
        let Some(sender) = completion.take() else {
            return false;
        };
        self.cancelled.store(true, Ordering::Release);
        *lock(&self.state) = TweenState::Cancelled;
        let _ = sender.send(self.to.clone());
        debug!("tween cancelled, jumping to end values");
        true
    }

    /// Drop the completion sender without a value
    fn abandon(&self) {
        if lock(&self.completion).take().is_some() {
            debug!("tween abandoned by its frame scheduler");
        }
    }
}

// ============================================================================
// Frame loop
// ============================================================================

/// The per-tween frame state, moved from one scheduled tick into the next
struct FrameLoop {
    shared: Arc<TweenShared>,
    scheduler: Weak<dyn FrameScheduler>,
    spans: Vec<Span>,
    easing: Easing,
    length: u32,
    on_frame: Option<FrameCallback>,
}

impl FrameLoop {
    fn schedule(self, frame: u32) {
        let Some(scheduler) = self.scheduler.upgrade() else {
            // Dropping self abandons the tween
            return;
        };
        scheduler.schedule_next_tick(Box::new(move || self.run(frame)));
    }

    fn run(mut self, frame: u32) {
        if self.shared.cancelled.load(Ordering::Acquire) {
            trace!(frame, "tween cancelled, not scheduling further frames");
            return;
        }

        if frame >= self.length {
            // Snap to the exact end values instead of the eased estimate
            let to = &self.shared.to;
            if let Some(on_frame) = self.on_frame.as_mut() {
                on_frame(to);
            }
            if self.shared.complete() {
                debug!(frames = self.length, "tween completed");
            }
            return;
        }

        let progress = self.easing.apply(f64::from(frame) / f64::from(self.length));
        let current: ValueMap = self
            .spans
            .iter()
            .map(|span| {
                let value = span.start + (span.end - span.start) * progress;
                (span.key.clone(), value)
            })
            .collect();

        self.shared.advance(frame);
        trace!(frame, progress, "tween frame");

        if let Some(on_frame) = self.on_frame.as_mut() {
            on_frame(&current);
        }

        self.schedule(frame + 1);
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        // No-op once the tween has resolved
        self.shared.abandon();
    }
}

// ============================================================================
// Handles
// ============================================================================

/// A running tween
///
/// Await the handle (or use [`TweenHandle::wait`] / [`TweenHandle::try_result`])
/// to get the final values. Dropping the handle does not stop the tween.
#[derive(Debug)]
pub struct TweenHandle {
    shared: Arc<TweenShared>,
    completion: oneshot::Receiver<ValueMap>,
    outcome: Option<Result<ValueMap>>,
}

impl TweenHandle {
    /// Stop the tween and resolve it with its `to` values.
    ///
    /// Frames already running finish; no further frames are delivered.
    /// Returns false if the tween had already finished.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// A cloneable token that can cancel this tween from elsewhere
    pub fn canceller(&self) -> TweenCanceller {
        TweenCanceller {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TweenState {
        *lock(&self.shared.state)
    }

    /// The values the tween ends on
    pub fn target(&self) -> &ValueMap {
        &self.shared.to
    }

    /// Poll for the final values without blocking
    pub fn try_result(&mut self) -> Option<Result<ValueMap>> {
        if self.outcome.is_none() {
            self.outcome = match self.completion.try_recv() {
                Ok(values) => Some(Ok(values)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Err(TweenError::Abandoned)),
            };
        }
        self.outcome.clone()
    }

    /// Block the current thread until the tween resolves.
    ///
    /// Only useful when frames run on another thread, such as with
    /// [`ThreadScheduler`](crate::ThreadScheduler). Panics if called from
    /// inside an async runtime; await the handle there instead.
    pub fn wait(mut self) -> Result<ValueMap> {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => self
                .completion
                .blocking_recv()
                .map_err(|_| TweenError::Abandoned),
        }
    }
}

impl Future for TweenHandle {
    type Output = Result<ValueMap>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.outcome.take() {
            return Poll::Ready(outcome);
        }
        Pin::new(&mut self.completion)
            .poll(cx)
            .map(|result| result.map_err(|_| TweenError::Abandoned))
    }
}

/// Cancels a tween; see [`TweenHandle::cancel`]
#[derive(Clone, Debug)]
pub struct TweenCanceller {
    shared: Arc<TweenShared>,
}

impl TweenCanceller {
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}
