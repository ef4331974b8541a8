//! `std`-backed clock and scheduler for driving a Trellis reconciler.
//!
//! [`StdRuntime`] wires [`StdScheduler`] and [`StdClock`] into a
//! [`Runtime`]. Hand that runtime to [`trellis_core::Reconciler`] and poll
//! the scheduler's request flags from the event loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use trellis_core::{Clock, Millis, Runtime, RuntimeHandle, RuntimeScheduler};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records wakeup requests in atomics and pokes an optional
/// waker so a blocked event loop can pick them up.
pub struct StdScheduler {
    host_callback_requested: AtomicBool,
    microtask_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            host_callback_requested: AtomicBool::new(false),
            microtask_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a host callback has been requested since the last call.
    pub fn take_host_callback_request(&self) -> bool {
        self.host_callback_requested.swap(false, Ordering::SeqCst)
    }

    /// Returns whether a microtask has been requested since the last call.
    pub fn take_microtask_request(&self) -> bool {
        self.microtask_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever work is requested.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered waker.
    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "host_callback_requested",
                &self.host_callback_requested.load(Ordering::SeqCst),
            )
            .field(
                "microtask_requested",
                &self.microtask_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn request_host_callback(&self) {
        self.host_callback_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn schedule_microtask(&self) {
        self.microtask_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Clock implementation backed by [`std::time::Instant`].
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// A [`Runtime`] together with the scheduler and clock it was built from.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Arc<StdClock>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let clock = Arc::new(StdClock::default());
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        log::debug!("std runtime created");
        Self {
            scheduler,
            clock,
            runtime,
        }
    }

    /// The runtime to hand to a reconciler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    /// Returns whether a host callback was requested since the last poll.
    pub fn take_host_callback_request(&self) -> bool {
        self.scheduler.take_host_callback_request()
    }

    /// Returns whether a microtask was requested since the last poll.
    pub fn take_microtask_request(&self) -> bool {
        self.scheduler.take_microtask_request()
    }

    /// Registers a waker to be called when the runtime requests work.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    /// Clears any previously registered waker.
    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use trellis_core::{Component, Element, Reconciler, StateSetter};
    use trellis_testing::MemoryHost;

    use super::StdRuntime;

    #[test]
    fn state_update_requests_microtask_and_rerenders() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        {
            let wakes = wakes.clone();
            runtime.set_waker(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            });
        }

        let setter: Rc<RefCell<Option<StateSetter<i64>>>> = Rc::new(RefCell::new(None));
        let counter = {
            let setter = setter.clone();
            Component::new("Counter", move |hooks, _| {
                let (count, set_count) = hooks.use_state(|| 0i64)?;
                setter.borrow_mut().replace(set_count);
                Ok(Element::host("span").child(count).into())
            })
        };

        let mut host = MemoryHost::new();
        let container = host.create_container();
        let mut reconciler = Reconciler::new(host, runtime.runtime());
        let root = reconciler.create_container(container);
        reconciler.update_container(counter.element(), root).unwrap();
        assert!(runtime.take_host_callback_request());
        reconciler.run_until_idle().unwrap();
        assert_eq!(reconciler.host().text_content(container), "0");

        let set_count = setter.borrow().clone().expect("setter captured during render");
        set_count.set(5);
        assert!(runtime.take_microtask_request(), "dispatch should request a microtask");
        assert!(wakes.load(Ordering::SeqCst) >= 2);

        reconciler.flush_microtasks().unwrap();
        while runtime.take_host_callback_request() {
            reconciler.run_host_callback().unwrap();
        }
        assert_eq!(reconciler.host().text_content(container), "5");
    }

    #[test]
    fn clock_is_monotonic() {
        use trellis_core::Clock;
        let runtime = StdRuntime::new();
        let clock = runtime.clock();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
