use core::time::Duration;

use crate::futures::SleepProvider;

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider for [`Allocator`](crate::Allocator).
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    async fn sleep_for(dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// An implementation of [`SleepProvider`] using Tokio's yield.
///
/// This strategy ignores the backoff delay and yields to the scheduler
/// immediately, which keeps latency low when contention is rare.
///
/// Under heavy contention it re-reads the store far more often than a
/// timer-based sleep would, so prefer [`TokioSleep`] when many callers hit
/// the same partition.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    async fn sleep_for(_dur: Duration) {
        tokio::task::yield_now().await;
    }
}
