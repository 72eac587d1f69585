use core::{future::Future, time::Duration};

/// A trait that abstracts over how to pause between allocation attempts in
/// async contexts.
///
/// The allocator is generic over this so the backoff between conflicting
/// attempts can be a real timer in production and a bare scheduler yield in
/// tight loops.
pub trait SleepProvider {
    /// Returns a future that completes after roughly `dur`.
    ///
    /// The future must be `Send` so allocations can be spawned onto
    /// multi-threaded executors.
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}
