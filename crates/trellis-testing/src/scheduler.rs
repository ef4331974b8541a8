use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use trellis_core::RuntimeScheduler;

/// Scheduler that records wakeup requests for a test driver to answer.
#[derive(Default)]
pub struct TestScheduler {
    host_callback: AtomicBool,
    microtask: AtomicBool,
    host_callback_requests: AtomicUsize,
    microtask_requests: AtomicUsize,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a host callback was requested since the last call.
    pub fn take_host_callback(&self) -> bool {
        self.host_callback.swap(false, Ordering::SeqCst)
    }

    /// Returns whether a microtask was requested since the last call.
    pub fn take_microtask(&self) -> bool {
        self.microtask.swap(false, Ordering::SeqCst)
    }

    pub fn host_callback_requested(&self) -> bool {
        self.host_callback.load(Ordering::SeqCst)
    }

    pub fn microtask_requested(&self) -> bool {
        self.microtask.load(Ordering::SeqCst)
    }

    /// Total host callback requests over the scheduler's lifetime.
    pub fn host_callback_requests(&self) -> usize {
        self.host_callback_requests.load(Ordering::SeqCst)
    }

    pub fn microtask_requests(&self) -> usize {
        self.microtask_requests.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScheduler")
            .field("host_callback", &self.host_callback_requested())
            .field("microtask", &self.microtask_requested())
            .finish()
    }
}

impl RuntimeScheduler for TestScheduler {
    fn request_host_callback(&self) {
        self.host_callback_requests.fetch_add(1, Ordering::SeqCst);
        self.host_callback.store(true, Ordering::SeqCst);
    }

    fn schedule_microtask(&self) {
        self.microtask_requests.fetch_add(1, Ordering::SeqCst);
        self.microtask.store(true, Ordering::SeqCst);
    }
}
