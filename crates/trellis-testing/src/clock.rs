use std::sync::atomic::{AtomicU64, Ordering};

use trellis_core::{Clock, Millis};

/// Clock that only moves when told to.
///
/// With a non-zero auto step every read advances time by that many
/// milliseconds, which makes any loop that checks the clock eventually
/// run out of its time budget.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    auto_step: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: Millis) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: Millis) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn set_auto_step(&self, ms: Millis) {
        self.auto_step.store(ms, Ordering::SeqCst);
    }

    /// Current time without applying the auto step.
    pub fn peek(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        let step = self.auto_step.load(Ordering::SeqCst);
        self.now.fetch_add(step, Ordering::SeqCst) + step
    }
}
