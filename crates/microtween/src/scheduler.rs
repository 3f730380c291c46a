//! Frame scheduling
//!
//! Tweens never drive time themselves. Each frame asks a [`FrameScheduler`]
//! to run a callback at the next frame boundary, and the scheduler decides
//! when that is:
//! - [`ManualScheduler`] - advanced explicitly, one frame per `step()`
//! - [`ThreadScheduler`] - a background thread ticking at a target FPS

use slotmap::{new_key_type, SlotMap};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::trace;

new_key_type! {
    /// Handle to a pending frame callback
    pub struct TickId;
}

/// Work to run at the next frame boundary
pub type TickCallback = Box<dyn FnOnce() + Send>;

/// The frame-pacing capability tweens are driven by
///
/// Implementations only promise that callbacks run in scheduling order,
/// roughly once per frame, on some later call; never re-entrantly from
/// inside `schedule_next_tick`.
pub trait FrameScheduler: Send + Sync {
    /// Queue `callback` for the next frame
    fn schedule_next_tick(&self, callback: TickCallback) -> TickId;

    /// Drop a pending callback. Returns false if it already ran or was
    /// never scheduled here.
    fn cancel_tick(&self, id: TickId) -> bool;

    /// Number of callbacks waiting for a frame
    fn pending_ticks(&self) -> usize;
}

/// Lock a mutex, recovering the data if a callback panicked while it was held
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pending callbacks in scheduling order
#[derive(Default)]
struct TickQueue {
    callbacks: SlotMap<TickId, TickCallback>,
    order: VecDeque<TickId>,
}

impl TickQueue {
    fn push(&mut self, callback: TickCallback) -> TickId {
        let id = self.callbacks.insert(callback);
        self.order.push_back(id);
        id
    }

    fn remove(&mut self, id: TickId) -> bool {
        // Stale ids left in `order` are skipped by `take_frame`
        self.callbacks.remove(id).is_some()
    }

    /// Take everything due this frame. Callbacks scheduled while these run
    /// land in the next frame.
    fn take_frame(&mut self) -> Vec<TickCallback> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.callbacks.remove(id))
            .collect()
    }

    fn len(&self) -> usize {
        self.callbacks.len()
    }
}

// ============================================================================
// Manual Scheduler
// ============================================================================

/// A scheduler that only advances when told to
///
/// Useful for tests and headless rendering, where frames should be
/// deterministic rather than tied to a wall clock.
///
/// ```
/// use microtween::{FrameScheduler, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// scheduler.schedule_next_tick(Box::new(|| println!("frame!")));
/// assert_eq!(scheduler.pending_ticks(), 1);
/// assert_eq!(scheduler.step(), 1);
/// assert_eq!(scheduler.pending_ticks(), 0);
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<TickQueue>,
    frame: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one frame, running every callback that was pending.
    ///
    /// Returns how many callbacks ran.
    pub fn step(&self) -> usize {
        // Release the lock before running so callbacks can reschedule
        let callbacks = lock(&self.queue).take_frame();
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let count = callbacks.len();
        trace!(frame, count, "manual scheduler step");

        for callback in callbacks {
            callback();
        }
        count
    }

    /// Step until nothing is pending or `max_steps` frames have run.
    ///
    /// Returns the number of frames stepped.
    pub fn run_until_idle(&self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.pending_ticks() > 0 {
            self.step();
            steps += 1;
        }
        steps
    }

    /// Frames stepped so far
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule_next_tick(&self, callback: TickCallback) -> TickId {
        lock(&self.queue).push(callback)
    }

    fn cancel_tick(&self, id: TickId) -> bool {
        lock(&self.queue).remove(id)
    }

    fn pending_ticks(&self) -> usize {
        lock(&self.queue).len()
    }
}

// ============================================================================
// Thread Scheduler
// ============================================================================

/// Default frame rate for [`ThreadScheduler`]
pub const DEFAULT_FPS: u32 = 60;

/// A scheduler that runs callbacks from a background thread at a fixed rate
///
/// Stands in for a display-synchronized frame loop when there is no
/// display. Call `start_background()` before sharing it; the thread stops
/// when the scheduler is dropped.
///
/// ```ignore
/// let mut scheduler = ThreadScheduler::with_fps(60);
/// scheduler.start_background();
/// let scheduler = Arc::new(scheduler);
/// ```
pub struct ThreadScheduler {
    queue: Arc<Mutex<TickQueue>>,
    /// Stop signal for background thread
    stop_flag: Arc<AtomicBool>,
    /// Background thread handle (if running)
    thread_handle: Option<JoinHandle<()>>,
    target_fps: u32,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::with_fps(DEFAULT_FPS)
    }

    /// Create a scheduler ticking at `fps` frames per second (clamped to 1..=240)
    pub fn with_fps(fps: u32) -> Self {
        Self {
            queue: Arc::new(Mutex::new(TickQueue::default())),
            stop_flag: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            target_fps: fps.clamp(1, 240),
        }
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Time between frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.target_fps))
    }

    /// Start the frame thread
    pub fn start_background(&mut self) {
        if self.thread_handle.is_some() {
            return; // Already running
        }

        let queue = Arc::clone(&self.queue);
        let stop_flag = Arc::clone(&self.stop_flag);
        let frame_duration = self.frame_interval();

        self.thread_handle = Some(thread::spawn(move || {
            let mut frame: u64 = 0;

            while !stop_flag.load(Ordering::Relaxed) {
                let start = Instant::now();

                let callbacks = lock(&queue).take_frame();
                if !callbacks.is_empty() {
                    frame += 1;
                    trace!(frame, count = callbacks.len(), "frame thread tick");
                }
                for callback in callbacks {
                    callback();
                }

                // Sleep for remaining frame time
                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        }));
    }

    /// Stop the frame thread. Pending callbacks stay queued.
    pub fn stop_background(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.take() {
            // The last reference can be released by a callback on the frame
            // thread itself, which must not join itself. The flag stays set
            // so the detached loop exits after this frame.
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
        self.stop_flag.store(false, Ordering::Relaxed);
    }

    /// Check if the background thread is running
    pub fn is_background_running(&self) -> bool {
        self.thread_handle.is_some()
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.stop_background();
    }
}

impl FrameScheduler for ThreadScheduler {
    fn schedule_next_tick(&self, callback: TickCallback) -> TickId {
        lock(&self.queue).push(callback)
    }

    fn cancel_tick(&self, id: TickId) -> bool {
        lock(&self.queue).remove(id)
    }

    fn pending_ticks(&self) -> usize {
        lock(&self.queue).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn push_log(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> TickCallback {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(value))
    }

    #[test]
    fn test_step_runs_in_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.schedule_next_tick(push_log(&log, 1));
        scheduler.schedule_next_tick(push_log(&log, 2));
        scheduler.schedule_next_tick(push_log(&log, 3));

        assert_eq!(scheduler.step(), 3);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(scheduler.frame(), 1);
    }

    #[test]
    fn test_cancel_tick() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.schedule_next_tick(push_log(&log, 1));
        let id = scheduler.schedule_next_tick(push_log(&log, 2));

        assert!(scheduler.cancel_tick(id));
        assert!(!scheduler.cancel_tick(id));
        assert_eq!(scheduler.pending_ticks(), 1);

        scheduler.step();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_rescheduled_work_waits_for_next_step() {
        let scheduler = Arc::new(ManualScheduler::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_log = Arc::clone(&log);
        scheduler.schedule_next_tick(Box::new(move || {
            inner_log.lock().unwrap().push(1);
            inner_scheduler.schedule_next_tick(push_log(&inner_log, 2));
        }));

        assert_eq!(scheduler.step(), 1);
        assert_eq!(*log.lock().unwrap(), vec![1]);
        assert_eq!(scheduler.pending_ticks(), 1);

        assert_eq!(scheduler.step(), 1);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_run_until_idle_respects_limit() {
        let scheduler = ManualScheduler::new();
        assert_eq!(scheduler.run_until_idle(10), 0);

        scheduler.schedule_next_tick(Box::new(|| {}));
        assert_eq!(scheduler.run_until_idle(10), 1);
        assert_eq!(scheduler.pending_ticks(), 0);
    }

    #[test]
    fn test_fps_is_clamped() {
        assert_eq!(ThreadScheduler::with_fps(0).target_fps(), 1);
        assert_eq!(ThreadScheduler::with_fps(1000).target_fps(), 240);
        assert_eq!(
            ThreadScheduler::with_fps(50).frame_interval(),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn test_thread_scheduler_runs_callbacks() {
        let mut scheduler = ThreadScheduler::with_fps(240);
        scheduler.start_background();
        assert!(scheduler.is_background_running());

        let (tx, rx) = mpsc::channel();
        scheduler.schedule_next_tick(Box::new(move || {
            let _ = tx.send(42);
        }));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));

        scheduler.stop_background();
        assert!(!scheduler.is_background_running());
    }

    #[test]
    fn test_frame_thread_exits_when_it_drops_last_reference() {
        let mut scheduler = ThreadScheduler::with_fps(240);
        scheduler.start_background();
        // The frame thread holds its own clone of the queue until it exits
        let queue = Arc::downgrade(&scheduler.queue);
        let scheduler = Arc::new(scheduler);

        let (release_tx, release_rx) = mpsc::channel::<()>();
        let held = Arc::clone(&scheduler);
        scheduler.schedule_next_tick(Box::new(move || {
            let _ = release_rx.recv();
            drop(held);
        }));
        drop(scheduler);
        release_tx.send(()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while queue.upgrade().is_some() {
            assert!(Instant::now() < deadline, "frame thread kept running");
            thread::sleep(Duration::from_millis(5));
        }
    }
}
