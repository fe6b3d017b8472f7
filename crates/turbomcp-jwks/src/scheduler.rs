//! Periodic refresh scheduling
//!
//! The cache does not own a timer. It hands its refresh pass to a
//! [`Scheduler`], so tests and embedders with their own cron machinery can
//! swap the default [`TokioScheduler`] out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::error::{JwksError, JwksResult};

/// Work run on every tick
pub type RefreshTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Something that can run a task on a fixed period
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first one period from now
    ///
    /// # Errors
    ///
    /// Returns [`JwksError::Scheduling`] if the timer cannot be armed.
    fn every(&self, period: Duration, task: RefreshTask) -> JwksResult<ScheduledRefresh>;
}

/// Handle to an armed timer
///
/// Dropping the handle does not stop the timer; call [`ScheduledRefresh::cancel`].
pub struct ScheduledRefresh {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ScheduledRefresh {
    /// Wrap a cancellation callback
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle for a timer that needs no cancellation
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stop the timer
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for ScheduledRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledRefresh")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler backed by a task on the current tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, task: RefreshTask) -> JwksResult<ScheduledRefresh> {
        if period.is_zero() {
            return Err(JwksError::Scheduling(
                "refresh period must be greater than zero".to_string(),
            ));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| JwksError::Scheduling(format!("no tokio runtime available: {e}")))?;

        let start = tokio::time::Instant::now()
            .checked_add(period)
            .ok_or_else(|| {
                JwksError::Scheduling(format!("refresh period of {period:?} is out of range"))
            })?;

        let handle: JoinHandle<()> = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(period_secs = period.as_secs(), "Running scheduled JWKS refresh");
                task().await;
            }
        });

        Ok(ScheduledRefresh::new(move || handle.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: Arc<AtomicUsize>) -> RefreshTask {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[test]
    fn test_no_runtime_is_scheduling_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let result = TokioScheduler.every(Duration::from_secs(60), counting_task(counter));
        assert!(matches!(result, Err(JwksError::Scheduling(_))));
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let result = TokioScheduler.every(Duration::ZERO, counting_task(counter));
        assert!(matches!(result, Err(JwksError::Scheduling(_))));
    }

    #[tokio::test]
    async fn test_unrepresentable_period_rejected() {
        let counter = Arc::new(AtomicUsize::new(0));
        let result = TokioScheduler.every(Duration::MAX, counting_task(Arc::clone(&counter)));
        assert!(matches!(result, Err(JwksError::Scheduling(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_after_each_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = TokioScheduler
            .every(Duration::from_secs(3600), counting_task(Arc::clone(&counter)))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
