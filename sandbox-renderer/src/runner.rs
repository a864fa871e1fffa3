//! Frame-driven execution: completions, tracked frame requests, per-frame
//! tasks and self-scheduling loops.

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    future::Future,
    pin::Pin,
    rc::{Rc, Weak},
    task::{Context, Poll},
};

use futures::{
    channel::oneshot,
    future::{self, join_all, LocalBoxFuture},
    FutureExt,
};

use crate::host::{FrameHandle, FrameScheduler};

/// Resolves once an animation has committed its final geometry.
///
/// A completion also resolves when the animation is abandoned because its
/// backend was destroyed, so awaiting it never hangs.
#[must_use = "completions do nothing unless awaited or polled"]
pub struct Completion(LocalBoxFuture<'static, ()>);

impl Completion {
    /// An already resolved completion.
    pub fn ready() -> Self {
        Self(future::ready(()).boxed_local())
    }

    /// A completion resolved through the returned sender (or by dropping it).
    pub fn channel() -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel::<()>();
        let fut = async move {
            // A cancelled sender means the owner went away; treat it as done.
            let _ = rx.await;
        };
        (CompletionSender(tx), Self(fut.boxed_local()))
    }

    /// Resolves once every completion in `parts` has resolved.
    pub fn all(parts: impl IntoIterator<Item = Completion>) -> Self {
        let parts: Vec<Completion> = parts.into_iter().collect();
        Self(
            async move {
                join_all(parts).await;
            }
            .boxed_local(),
        )
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Completion")
    }
}

/// Resolves the paired [`Completion`].
#[derive(Debug)]
pub struct CompletionSender(oneshot::Sender<()>);

impl CompletionSender {
    /// Resolve the completion.
    pub fn complete(self) {
        let _ = self.0.send(());
    }
}

/// Frame requests tracked so they can all be cancelled at once.
#[derive(Clone)]
pub struct FrameDriver {
    scheduler: Rc<dyn FrameScheduler>,
    pending: Rc<RefCell<HashSet<FrameHandle>>>,
}

impl FrameDriver {
    /// Wrap a scheduler.
    #[must_use]
    pub fn new(scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            pending: Rc::default(),
        }
    }

    /// Current time on the frame clock.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    /// Request `callback` on the next frame.
    pub fn request(&self, callback: impl FnOnce(f64) + 'static) -> FrameHandle {
        let slot: Rc<Cell<Option<FrameHandle>>> = Rc::default();
        let fired_slot = Rc::clone(&slot);
        let pending = Rc::clone(&self.pending);
        let handle = self.scheduler.request_frame(Box::new(move |timestamp| {
            if let Some(handle) = fired_slot.take() {
                pending.borrow_mut().remove(&handle);
            }
            callback(timestamp);
        }));
        slot.set(Some(handle));
        self.pending.borrow_mut().insert(handle);
        handle
    }

    /// Cancel one request issued by this driver.
    pub fn cancel(&self, handle: FrameHandle) {
        let removed = self.pending.borrow_mut().remove(&handle);
        if removed {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Cancel every pending request issued by this driver.
    pub fn cancel_all(&self) {
        let handles: Vec<FrameHandle> = self.pending.borrow_mut().drain().collect();
        if !handles.is_empty() {
            tracing::debug!("Cancelling {} pending frame(s)", handles.len());
        }
        for handle in handles {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Number of requests that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl std::fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDriver")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// A finite animation advanced once per frame against a weakly held target.
///
/// `step` returns `true` once the animation has committed. If the target has
/// been dropped the task stops and its completion resolves.
pub struct FrameTask<T, F> {
    driver: FrameDriver,
    target: Weak<T>,
    step: F,
    done: CompletionSender,
}

impl<T, F> FrameTask<T, F>
where
    T: 'static,
    F: FnMut(&T, f64) -> bool + 'static,
{
    /// Create a task.
    pub fn new(driver: FrameDriver, target: Weak<T>, step: F, done: CompletionSender) -> Self {
        Self {
            driver,
            target,
            step,
            done,
        }
    }

    /// Run the first step now, then continue on subsequent frames.
    pub fn start_now(self) {
        let now = self.driver.now();
        self.run(now);
    }

    /// Run the first step on the next frame.
    pub fn schedule(self) {
        let driver = self.driver.clone();
        driver.request(move |timestamp| self.run(timestamp));
    }

    fn run(mut self, timestamp: f64) {
        let Some(target) = self.target.upgrade() else {
            tracing::trace!("Animation target gone, abandoning task");
            return;
        };
        let finished = (self.step)(&target, timestamp);
        drop(target);
        if finished {
            self.done.complete();
        } else {
            self.schedule();
        }
    }
}

struct LoopState {
    running: Cell<bool>,
    handle: Cell<Option<FrameHandle>>,
    callback: RefCell<Box<dyn FnMut(f64)>>,
}

/// A free-running per-frame callback that reschedules itself until stopped.
#[derive(Debug)]
pub struct FrameLoop {
    driver: FrameDriver,
    state: RefCell<Option<Rc<LoopState>>>,
}

impl FrameLoop {
    /// Create a stopped loop on `driver`.
    #[must_use]
    pub fn new(driver: FrameDriver) -> Self {
        Self {
            driver,
            state: RefCell::new(None),
        }
    }

    /// Start calling `callback` every frame, replacing any running callback.
    pub fn start(&self, callback: impl FnMut(f64) + 'static) {
        self.stop();
        let state = Rc::new(LoopState {
            running: Cell::new(true),
            handle: Cell::new(None),
            callback: RefCell::new(Box::new(callback)),
        });
        Self::schedule(&self.driver, &state);
        *self.state.borrow_mut() = Some(state);
    }

    /// Stop the loop. Safe to call from inside the callback.
    pub fn stop(&self) {
        let Some(state) = self.state.borrow_mut().take() else {
            return;
        };
        state.running.set(false);
        if let Some(handle) = state.handle.take() {
            self.driver.cancel(handle);
        }
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(|s| s.running.get())
    }

    fn schedule(driver: &FrameDriver, state: &Rc<LoopState>) {
        let next_driver = driver.clone();
        let next_state = Rc::clone(state);
        let handle = driver.request(move |timestamp| {
            next_state.handle.set(None);
            if !next_state.running.get() {
                return;
            }
            (next_state.callback.borrow_mut())(timestamp);
            if next_state.running.get() {
                Self::schedule(&next_driver, &next_state);
            }
        });
        state.handle.set(Some(handle));
    }
}

impl std::fmt::Debug for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopState")
            .field("running", &self.running.get())
            .finish_non_exhaustive()
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::headless::ManualScheduler;

    fn driver() -> (Rc<ManualScheduler>, FrameDriver) {
        let scheduler = Rc::new(ManualScheduler::new());
        let driver = FrameDriver::new(scheduler.clone());
        (scheduler, driver)
    }

    // ===========================================
    // Completion Tests
    // ===========================================

    #[test]
    fn test_completion_ready() {
        assert!(Completion::ready().now_or_never().is_some());
    }

    #[test]
    fn test_completion_channel_resolves_on_complete_or_drop() {
        let (tx, mut c) = Completion::channel();
        assert!((&mut c).now_or_never().is_none());
        tx.complete();
        assert!(c.now_or_never().is_some());

        let (tx, c) = Completion::channel();
        drop(tx);
        assert!(c.now_or_never().is_some());
    }

    #[test]
    fn test_completion_all_waits_for_every_part() {
        let (a_tx, a) = Completion::channel();
        let (b_tx, b) = Completion::channel();
        let mut all = Completion::all([a, b]);
        a_tx.complete();
        assert!((&mut all).now_or_never().is_none());
        b_tx.complete();
        assert!(all.now_or_never().is_some());
    }

    // ===========================================
    // FrameDriver Tests
    // ===========================================

    #[test]
    fn test_driver_tracks_pending_until_fired() {
        let (scheduler, driver) = driver();
        let fired = Rc::new(Cell::new(0.0));
        let f = Rc::clone(&fired);
        driver.request(move |t| f.set(t));
        assert_eq!(driver.pending(), 1);
        scheduler.advance(16.0);
        assert_eq!(driver.pending(), 0);
        assert!((fired.get() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_driver_cancel_all_drops_callbacks() {
        let (scheduler, driver) = driver();
        let fired = Rc::new(Cell::new(false));
        for _ in 0..3 {
            let f = Rc::clone(&fired);
            driver.request(move |_| f.set(true));
        }
        driver.cancel_all();
        scheduler.advance(16.0);
        assert!(!fired.get());
        assert_eq!(scheduler.queued(), 0);
    }

    // ===========================================
    // FrameTask Tests
    // ===========================================

    #[test]
    fn test_task_runs_until_step_finishes() {
        let (scheduler, driver) = driver();
        let target = Rc::new(Cell::new(0u32));
        let (tx, mut done) = Completion::channel();
        FrameTask::new(
            driver,
            Rc::downgrade(&target),
            |count: &Cell<u32>, _| {
                count.set(count.get() + 1);
                count.get() == 3
            },
            tx,
        )
        .schedule();

        scheduler.advance(16.0);
        scheduler.advance(16.0);
        assert!((&mut done).now_or_never().is_none());
        scheduler.advance(16.0);
        assert!(done.now_or_never().is_some());
        assert_eq!(target.get(), 3);
    }

    #[test]
    fn test_task_abandoned_when_target_dropped() {
        let (scheduler, driver) = driver();
        let target = Rc::new(Cell::new(0u32));
        let (tx, done) = Completion::channel();
        FrameTask::new(driver, Rc::downgrade(&target), |_: &Cell<u32>, _| false, tx).schedule();
        drop(target);
        scheduler.advance(16.0);
        assert!(done.now_or_never().is_some());
        assert_eq!(scheduler.queued(), 0);
    }

    // ===========================================
    // FrameLoop Tests
    // ===========================================

    #[test]
    fn test_loop_runs_every_frame_until_stopped() {
        let (scheduler, driver) = driver();
        let frames = Rc::new(Cell::new(0));
        let f = Rc::clone(&frames);
        let frame_loop = FrameLoop::new(driver);
        frame_loop.start(move |_| f.set(f.get() + 1));
        assert!(frame_loop.is_running());

        for _ in 0..4 {
            scheduler.advance(16.0);
        }
        assert_eq!(frames.get(), 4);

        frame_loop.stop();
        scheduler.advance(16.0);
        assert_eq!(frames.get(), 4);
        assert!(!frame_loop.is_running());
        assert_eq!(scheduler.queued(), 0);
    }
}
