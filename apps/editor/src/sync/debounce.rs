use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// Quiet period before a debounced write fires.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(1500);

/// Trailing-edge debounce over a cancelable timer task.
///
/// Each `schedule` call restarts the window and replaces the pending work.
/// Cancelling only ever stops the wait: once the window elapses the work is
/// spawned on its own task and runs to completion even if the debouncer is
/// rescheduled, cancelled, or dropped.
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    /// Restarts the window with `work` as the pending job. Outside a tokio
    /// runtime nothing can be timed, so the call is logged and dropped.
    pub fn schedule<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!("No tokio runtime; debounced work not scheduled");
            return;
        };
        let window = self.window;
        let timer = handle.spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(work);
        });

        if let Some(previous) = self.slot().replace(timer) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    /// True while a window is open and its work has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|timer| !timer.is_finished())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_trailing_edge_fires() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_WINDOW);

        for _ in 0..5 {
            debouncer.schedule(counting(&fired));
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(1090)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_schedule_outside_runtime_is_skipped() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_WINDOW);

        debouncer.schedule(counting(&fired));

        assert!(!debouncer.is_pending());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_stop_the_wait() {
        let fired = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_WINDOW);

        debouncer.schedule(counting(&fired));
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        debouncer.schedule(counting(&fired));
        drop(debouncer);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
