//! Coalesces bursts of change notifications into reconciliation passes.
//!
//! At most one pass runs at a time. Notifications that arrive while a pass
//! is running collapse into exactly one follow-up pass. A pass is only
//! started once notifications have been quiet for the debounce delay, or
//! once `max_wait` has elapsed since the first pending notification.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// One reconciliation pass. Fetches fresh data every time it runs.
#[async_trait]
pub trait PassRunner: Send + 'static {
    async fn run_pass(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// Notified; waiting for the debounce window to close.
    Scheduled,
    Running,
    /// Notified during the running pass; one follow-up is owed.
    RunningWithPending,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerTiming {
    pub debounce: Duration,
    pub max_wait: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            max_wait: Duration::from_millis(1000),
        }
    }
}

struct Inner {
    state: SchedulerState,
    first_pending: Instant,
    last_notify: Instant,
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Notify,
    passes: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap, cloneable handle used to request passes.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Request a pass. Safe to call at any rate.
    pub fn notify(&self) {
        let now = Instant::now();
        let mut inner = self.shared.lock();
        inner.last_notify = now;
        match inner.state {
            SchedulerState::Idle => {
                inner.state = SchedulerState::Scheduled;
                inner.first_pending = now;
                drop(inner);
                self.shared.wake.notify_one();
            }
            SchedulerState::Running => {
                inner.state = SchedulerState::RunningWithPending;
                inner.first_pending = now;
            }
            SchedulerState::Scheduled | SchedulerState::RunningWithPending => {}
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.lock().state
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.shared.passes.load(Ordering::Acquire)
    }
}

/// Start the scheduler loop. The runner is handed back when `shutdown`
/// flips to `true` (or its sender is dropped); a running pass is always
/// allowed to finish first.
pub fn spawn<R: PassRunner>(
    runner: R,
    timing: SchedulerTiming,
    shutdown: watch::Receiver<bool>,
) -> (SchedulerHandle, JoinHandle<R>) {
    let now = Instant::now();
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            state: SchedulerState::Idle,
            first_pending: now,
            last_notify: now,
        }),
        wake: Notify::new(),
        passes: AtomicU64::new(0),
    });
    let handle = SchedulerHandle {
        shared: Arc::clone(&shared),
    };
    let task = tokio::spawn(run_scheduler(shared, runner, timing, shutdown));
    (handle, task)
}

async fn run_scheduler<R: PassRunner>(
    shared: Arc<Shared>,
    mut runner: R,
    timing: SchedulerTiming,
    mut shutdown: watch::Receiver<bool>,
) -> R {
    loop {
        while shared.lock().state == SchedulerState::Idle {
            tokio::select! {
                _ = shared.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Update scheduler shutting down");
                        return runner;
                    }
                }
            }
        }

        // Debounce: push the deadline out while notifications keep coming,
        // but never past max_wait from the first one.
        loop {
            let deadline = {
                let inner = shared.lock();
                (inner.last_notify + timing.debounce).min(inner.first_pending + timing.max_wait)
            };
            if Instant::now() >= deadline {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Update scheduler shutting down with a pass pending");
                        return runner;
                    }
                }
            }
        }

        shared.lock().state = SchedulerState::Running;
        runner.run_pass().await;
        let completed = shared.passes.fetch_add(1, Ordering::AcqRel) + 1;

        let mut inner = shared.lock();
        inner.state = match inner.state {
            SchedulerState::RunningWithPending => {
                debug!("Pass {completed} done; changes arrived meanwhile, scheduling follow-up");
                SchedulerState::Scheduled
            }
            _ => {
                debug!("Pass {completed} done; idle");
                SchedulerState::Idle
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingRunner {
        runs: Arc<AtomicUsize>,
        pass_duration: Duration,
    }

    #[async_trait]
    impl PassRunner for CountingRunner {
        async fn run_pass(&mut self) {
            tokio::time::sleep(self.pass_duration).await;
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn start(
        pass_duration: Duration,
    ) -> (SchedulerHandle, Arc<AtomicUsize>, watch::Sender<bool>, JoinHandle<CountingRunner>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = spawn(
            CountingRunner {
                runs: Arc::clone(&runs),
                pass_duration,
            },
            SchedulerTiming {
                debounce: Duration::from_millis(100),
                max_wait: Duration::from_millis(1000),
            },
            shutdown_rx,
        );
        (handle, runs, shutdown_tx, task)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_pass() {
        let (handle, runs, _shutdown, _task) = start(Duration::ZERO);

        handle.notify();
        sleep_ms(20).await;
        handle.notify();
        sleep_ms(20).await;
        handle.notify();
        assert_eq!(handle.state(), SchedulerState::Scheduled);

        sleep_ms(500).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(handle.passes(), 1);
        assert_eq!(handle.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pass_without_notification() {
        let (handle, runs, _shutdown, _task) = start(Duration::ZERO);
        sleep_ms(1000).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_run_separately() {
        let (handle, runs, _shutdown, _task) = start(Duration::ZERO);

        handle.notify();
        sleep_ms(300).await;
        handle.notify();
        sleep_ms(300).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_during_pass_owe_exactly_one_follow_up() {
        let (handle, runs, _shutdown, _task) = start(Duration::from_millis(500));

        handle.notify();
        sleep_ms(150).await;
        assert_eq!(handle.state(), SchedulerState::Running);

        for _ in 0..5 {
            handle.notify();
            sleep_ms(10).await;
        }
        assert_eq!(handle.state(), SchedulerState::RunningWithPending);

        sleep_ms(2000).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(handle.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_notifications_bounded_by_max_wait() {
        let (handle, runs, _shutdown, _task) = start(Duration::ZERO);

        for _ in 0..30 {
            handle.notify();
            sleep_ms(50).await;
        }
        // 1.5s of notifications 50ms apart: the debounce never closes, so
        // max_wait forces one pass at 1s.
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The rest of the stream is one more window, closed by its debounce.
        sleep_ms(500).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(handle.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_runner() {
        let (handle, runs, shutdown, task) = start(Duration::ZERO);
        handle.notify();
        sleep_ms(200).await;

        shutdown.send(true).unwrap();
        let runner = task.await.unwrap();
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
