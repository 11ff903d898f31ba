//! Reentrant busy tracking around units of work.
//!
//! [`BusyGuard`] counts how many guarded operations are in flight on the
//! current (single-threaded, cooperative) runtime and tells an observer when
//! the count leaves or returns to zero. It provides no mutual exclusion:
//! operations that suspend may interleave. Index mutations stay atomic because
//! they never hold a suspension point between reading old state and writing
//! new state.
//!
//! Nested `run` calls only move the counter, so a composite operation that
//! issues several guarded sub-operations signals busy once and idle once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use tracing::trace;

/// Busy state reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyState {
    Busy,
    Idle,
}

type Observer = Box<dyn Fn(BusyState)>;

#[derive(Default)]
pub struct BusyGuard {
    depth: Cell<usize>,
    observer: RefCell<Option<Observer>>,
}

impl BusyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: impl Fn(BusyState) + 'static) -> Self {
        let guard = Self::new();
        guard.set_observer(observer);
        guard
    }

    /// Replace the state-change observer.
    pub fn set_observer(&self, observer: impl Fn(BusyState) + 'static) {
        *self.observer.borrow_mut() = Some(Box::new(observer));
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_busy(&self) -> bool {
        self.depth.get() > 0
    }

    /// Run `work` inside the busy region.
    ///
    /// On the 0→1 transition the observer sees [`BusyState::Busy`] and the
    /// task yields once so observers can render before the work starts; on
    /// the 1→0 transition it sees [`BusyState::Idle`] and the task yields
    /// again. The output of `work`, including any error it carries, is
    /// returned after the counter has been restored.
    pub async fn run<F>(&self, work: F) -> F::Output
    where
        F: Future,
    {
        let entered = self.enter();
        if entered.outermost {
            tokio::task::yield_now().await;
        }

        let output = work.await;

        if entered.leave() {
            tokio::task::yield_now().await;
        }
        output
    }

    fn enter(&self) -> Entered<'_> {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        trace!(depth, "busy region entered");
        if depth == 1 {
            self.notify(BusyState::Busy);
        }
        Entered {
            guard: self,
            armed: true,
            outermost: depth == 1,
        }
    }

    /// Returns true when this call brought the guard back to idle.
    fn leave(&self) -> bool {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        trace!(depth, "busy region left");
        if depth == 0 {
            self.notify(BusyState::Idle);
            true
        } else {
            false
        }
    }

    fn notify(&self, state: BusyState) {
        if let Some(observer) = self.observer.borrow().as_ref() {
            observer(state);
        }
    }
}

impl fmt::Debug for BusyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusyGuard")
            .field("depth", &self.depth.get())
            .field("observer", &self.observer.borrow().is_some())
            .finish()
    }
}

/// Depth held by one `run` call. Restores the counter when the call's future
/// is dropped mid-flight (cancellation or panic).
struct Entered<'g> {
    guard: &'g BusyGuard,
    armed: bool,
    outermost: bool,
}

impl Entered<'_> {
    fn leave(mut self) -> bool {
        self.armed = false;
        self.guard.leave()
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.guard.leave();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recording_guard() -> (Rc<BusyGuard>, Rc<RefCell<Vec<BusyState>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let guard = BusyGuard::with_observer(move |state| sink.borrow_mut().push(state));
        (Rc::new(guard), seen)
    }

    #[tokio::test]
    async fn test_single_run_signals_busy_then_idle() {
        let (guard, seen) = recording_guard();
        let value = guard.run(async { 42 }).await;

        assert_eq!(value, 42);
        assert_eq!(*seen.borrow(), vec![BusyState::Busy, BusyState::Idle]);
        assert_eq!(guard.depth(), 0);
    }

    #[tokio::test]
    async fn test_nested_runs_do_not_resignal() {
        let (guard, seen) = recording_guard();
        let inner = Rc::clone(&guard);
        guard
            .run(async {
                assert_eq!(inner.depth(), 1);
                inner.run(async { assert_eq!(inner.depth(), 2) }).await;
                inner.run(async {}).await;
                assert_eq!(inner.depth(), 1);
            })
            .await;

        assert_eq!(*seen.borrow(), vec![BusyState::Busy, BusyState::Idle]);
    }

    #[tokio::test]
    async fn test_error_still_restores_idle() {
        let (guard, seen) = recording_guard();
        let result: Result<(), &str> = guard.run(async { Err("boom") }).await;

        assert_eq!(result, Err("boom"));
        assert!(!guard.is_busy());
        assert_eq!(*seen.borrow(), vec![BusyState::Busy, BusyState::Idle]);
    }

    #[tokio::test]
    async fn test_observers_see_busy_before_work_runs() {
        let (guard, _) = recording_guard();
        let work_started = Cell::new(false);

        let observed = futures::join!(
            guard.run(async { work_started.set(true) }),
            async { (guard.is_busy(), work_started.get()) }
        )
        .1;

        assert_eq!(observed, (true, false));
        assert!(work_started.get());
    }

    #[tokio::test]
    async fn test_interleaved_runs_share_one_busy_region() {
        let (guard, seen) = recording_guard();
        let slow = guard.run(async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            1
        });
        let fast = guard.run(async { 2 });

        let (a, b) = futures::join!(slow, fast);
        assert_eq!((a, b), (1, 2));
        assert_eq!(*seen.borrow(), vec![BusyState::Busy, BusyState::Idle]);
    }

    #[tokio::test]
    async fn test_cancelled_run_releases_depth() {
        let (guard, seen) = recording_guard();
        {
            let pending = guard.run(futures::future::pending::<()>());
            let timed_out =
                tokio::time::timeout(std::time::Duration::from_millis(5), pending).await;
            assert!(timed_out.is_err());
        }

        assert_eq!(guard.depth(), 0);
        assert_eq!(*seen.borrow(), vec![BusyState::Busy, BusyState::Idle]);
    }
}
