//! Frame / idle scheduler
//!
//! Producers decide *when* the next edit stream runs. Two timings:
//! - `NextFrame`: after one frame interval
//! - `Idle`: after the idle timeout, for low-priority work
//!
//! Every request can be withdrawn until it fires. Cancellation wins over a
//! timer that expires at the same moment.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub type CallbackId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timing {
    NextFrame,
    Idle,
}

pub struct Scheduler {
    /// Monotonic callback ID counter
    next_id: AtomicU64,

    /// Requests that have not fired yet. Dropping the sender cancels.
    pending: Arc<DashMap<CallbackId, oneshot::Sender<()>>>,

    frame_interval: Duration,
    idle_timeout: Duration,
}

impl Scheduler {
    pub fn new(frame_interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
            frame_interval,
            idle_timeout,
        }
    }

    pub fn delay(&self, timing: Timing) -> Duration {
        match timing {
            Timing::NextFrame => self.frame_interval,
            Timing::Idle => self.idle_timeout,
        }
    }

    /// Run `callback` on a tokio worker once `timing` elapses
    pub fn request<F>(&self, timing: Timing, callback: F) -> CallbackId
    where
        F: FnOnce() + Send + 'static,
    {
        let (id, task) = self.prepare(timing, callback);
        tokio::spawn(task);
        id
    }

    /// Same as [`Scheduler::request`] for callbacks that must stay on the
    /// current thread (anything touching a session). Needs a `LocalSet`.
    pub fn request_local<F>(&self, timing: Timing, callback: F) -> CallbackId
    where
        F: FnOnce() + 'static,
    {
        let (id, task) = self.prepare(timing, callback);
        tokio::task::spawn_local(task);
        id
    }

    fn prepare<F>(&self, timing: Timing, callback: F) -> (CallbackId, impl Future<Output = ()>)
    where
        F: FnOnce(),
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, cancelled) = oneshot::channel();
        self.pending.insert(id, tx);

        let delay = self.delay(timing);
        let pending = Arc::clone(&self.pending);
        let task = async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if pending.remove(&id).is_some() {
                        tracing::trace!("callback {} fired ({:?})", id, timing);
                        callback();
                    }
                }
                _ = cancelled => {
                    tracing::trace!("callback {} cancelled", id);
                }
            }
        };
        (id, task)
    }

    /// Withdraw a request. False when it already fired or never existed.
    pub fn cancel(&self, id: CallbackId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Withdraw everything, returning how many requests were dropped
    pub fn cancel_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Requests that have not fired yet
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16), Duration::from_millis(50))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.pending.clear();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending.len())
            .field("frame_interval", &self.frame_interval)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use tokio::time::sleep;

    fn fast() -> Scheduler {
        Scheduler::new(Duration::from_millis(1), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_request_fires() {
        let scheduler = fast();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        scheduler.request(Timing::NextFrame, move || flag.store(true, Ordering::SeqCst));
        assert_eq!(scheduler.pending(), 1);

        sleep(Duration::from_millis(50)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_prevents_callback() {
        let scheduler = Scheduler::new(Duration::from_millis(20), Duration::from_millis(20));
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let id = scheduler.request(Timing::Idle, move || flag.store(true, Ordering::SeqCst));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        sleep(Duration::from_millis(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_frame_before_idle() {
        let scheduler = fast();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&order);
        scheduler.request(Timing::Idle, move || log.lock().unwrap().push(Timing::Idle));
        let log = Arc::clone(&order);
        scheduler.request(Timing::NextFrame, move || {
            log.lock().unwrap().push(Timing::NextFrame)
        });

        sleep(Duration::from_millis(60)).await;
        assert_eq!(
            *order.lock().unwrap(),
            vec![Timing::NextFrame, Timing::Idle]
        );
    }

    #[tokio::test]
    async fn test_local_callbacks() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = fast();
                let hits = Rc::new(Cell::new(0));

                for _ in 0..3 {
                    let hits = Rc::clone(&hits);
                    scheduler.request_local(Timing::NextFrame, move || hits.set(hits.get() + 1));
                }
                let dropped = scheduler.request_local(Timing::Idle, || panic!("cancelled"));
                assert!(scheduler.cancel(dropped));

                sleep(Duration::from_millis(50)).await;
                assert_eq!(hits.get(), 3);
            })
            .await;
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let scheduler = Scheduler::default();
        scheduler.request(Timing::NextFrame, || {});
        scheduler.request(Timing::Idle, || {});
        assert_eq!(scheduler.cancel_all(), 2);
        assert_eq!(scheduler.pending(), 0);
    }
}
