//! Debounced model calls with last-input-wins delivery.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Delays a call until input has been quiet for a fixed period.
///
/// Scheduling again before the period elapses supersedes the pending call.
/// A superseded call that is already in flight is aborted, and its result is
/// never applied: state always reflects the most recent input, regardless of
/// the order in which responses arrive.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    quiet: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule `call`; hand its output to `apply` if nothing newer was scheduled.
    pub fn schedule<F, Fut, T, A>(&self, call: F, apply: A)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        A: FnOnce(T) + Send + 'static,
    {
        self.schedule_after(self.quiet, call, apply)
    }

    /// Like [`schedule`](Self::schedule) with a one-off quiet period.
    ///
    /// Different inputs feeding the same call can settle at different rates
    /// (a toggle settles faster than typing); they still supersede each other.
    pub fn schedule_after<F, Fut, T, A>(&self, quiet: Duration, call: F, apply: A)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        A: FnOnce(T) + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let output = call().await;
            if current.load(Ordering::SeqCst) == generation {
                apply(output);
            } else {
                debug!("Discarding superseded result (generation {})", generation);
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Cancel whatever is pending or in flight.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            pending.abort();
        }
    }

    /// Whether a scheduled call has not yet finished.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_latest_input() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let calls = Arc::new(AtomicUsize::new(0));
        let applied = Arc::new(Mutex::new(Vec::new()));

        for (i, input) in ["Cough", "Cough+Fever", "Cough+Fever+Fatigue"].into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            let calls = Arc::clone(&calls);
            let applied = Arc::clone(&applied);
            debouncer.schedule(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    input.to_string()
                },
                move |out| applied.lock().unwrap().push(out),
            );
        }

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*applied.lock().unwrap(), vec!["Cough+Fever+Fatigue".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_discarded_when_superseded() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let applied = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&applied);
        debouncer.schedule(
            || async {
                tokio::time::sleep(Duration::from_millis(5000)).await;
                "slow-old"
            },
            move |out| sink.lock().unwrap().push(out),
        );

        // Old call is now in flight.
        tokio::time::sleep(Duration::from_millis(1200)).await;

        let sink = Arc::clone(&applied);
        debouncer.schedule(|| async { "fast-new" }, move |out| sink.lock().unwrap().push(out));

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(*applied.lock().unwrap(), vec!["fast-new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_call() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        debouncer.schedule(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );
        assert!(debouncer.is_pending());
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_after_supersedes_across_periods() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let applied = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&applied);
        debouncer.schedule_after(
            Duration::from_millis(2000),
            || async { "notes" },
            move |out| sink.lock().unwrap().push(out),
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        let sink = Arc::clone(&applied);
        debouncer.schedule(|| async { "symptoms" }, move |out| sink.lock().unwrap().push(out));

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(*applied.lock().unwrap(), vec!["symptoms"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_fire_separately() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let counter = Arc::clone(&calls);
            debouncer.schedule(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                |_| {},
            );
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
