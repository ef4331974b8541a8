//! Platform abstraction traits for Trellis runtime services.
//!
//! The reconciler never blocks or spawns threads. It asks the host event
//! loop to call back into it through [`RuntimeScheduler`] and reads time
//! through [`Clock`], so the same core runs under a desktop loop, a test
//! harness, or any other single-threaded driver.

use crate::lane::Millis;

/// Wakes the host event loop on behalf of the reconciler.
///
/// Both requests are hints: the host answers them by calling
/// [`Reconciler::flush_microtasks`](crate::Reconciler::flush_microtasks) and
/// [`Reconciler::run_host_callback`](crate::Reconciler::run_host_callback)
/// on the thread that owns the reconciler.
pub trait RuntimeScheduler: Send + Sync {
    /// Request a macrotask turn to run time-sliced work from the task queue.
    fn request_host_callback(&self);

    /// Request that sync work and queued dispatches be flushed before the
    /// host yields back to its event loop.
    fn schedule_microtask(&self);
}

/// Provides timing information for the runtime.
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now(&self) -> Millis;
}
