//! Single-threaded UI job queue.
//!
//! Workers never touch UI state directly after they finish; they post a
//! closure here and whoever owns the [`UiLoop`] (the UI thread) runs it.

use std::marker::PhantomData;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Owning end of the queue. Not `Send`: jobs run on the thread that created it.
pub struct UiLoop {
    tx: Sender<UiJob>,
    rx: Receiver<UiJob>,
    _pinned: PhantomData<Rc<()>>,
}

/// Cloneable posting end, safe to hand to worker tasks.
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiJob>,
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl UiLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            _pinned: PhantomData,
        }
    }

    pub fn handle(&self) -> UiHandle {
        UiHandle {
            tx: self.tx.clone(),
        }
    }

    /// Runs everything already queued. Returns how many jobs ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Waits up to `timeout` for one job and runs it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Runs jobs as they arrive until `done` holds or `timeout` passes.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            self.run_next(left);
        }
    }
}

impl UiHandle {
    /// Queues `job` for the UI thread. False once the loop is gone.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn jobs_run_on_the_loop_thread_in_order() {
        let ui = UiLoop::new();
        let handle = ui.handle();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let loop_thread = thread::current().id();

        let worker = {
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for i in 0..3 {
                    let seen = Arc::clone(&seen);
                    handle.post(move || {
                        assert_eq!(thread::current().id(), loop_thread);
                        seen.lock().push(i);
                    });
                }
            })
        };
        worker.join().unwrap();

        assert_eq!(ui.run_pending(), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn run_until_times_out_without_jobs() {
        let ui = UiLoop::new();
        assert!(!ui.run_until(Duration::from_millis(20), || false));
    }

    #[test]
    fn run_until_stops_when_condition_holds() {
        let ui = UiLoop::new();
        let handle = ui.handle();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            handle.post(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        });
        assert!(ui.run_until(Duration::from_secs(5), || count.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn post_fails_after_loop_dropped() {
        let ui = UiLoop::new();
        let handle = ui.handle();
        drop(ui);
        assert!(!handle.post(|| {}));
    }
}
