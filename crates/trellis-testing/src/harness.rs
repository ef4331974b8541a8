//! Drives a reconciler the way a host event loop would.

use std::sync::Arc;

use trellis_core::{
    HostAdapter, Lane, Lanes, Millis, Node, PropValue, ReconcileError, Reconciler, ReconcilerConfig, RootId,
    Runtime,
};

use crate::clock::ManualClock;
use crate::host::{ContainerId, HostOp, MemoryHost, NodeId};
use crate::scheduler::TestScheduler;

/// A reconciler over a [`MemoryHost`] with one mounted root, a manual clock
/// and a scheduler whose wakeups are answered by [`pump`](Self::pump).
pub struct TestHarness {
    reconciler: Reconciler<MemoryHost>,
    scheduler: Arc<TestScheduler>,
    clock: Arc<ManualClock>,
    root: RootId,
    container: ContainerId,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let scheduler = Arc::new(TestScheduler::new());
        let clock = Arc::new(ManualClock::new());
        let runtime = Runtime::new(scheduler.clone(), clock.clone());
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let mut reconciler = Reconciler::with_config(host, runtime, config);
        let root = reconciler.create_container(container);
        Self {
            reconciler,
            scheduler,
            clock,
            root,
            container,
        }
    }

    /// Schedules `node` as the root's content without running any work.
    pub fn render(&mut self, node: impl Into<Node>) -> Result<Lane, ReconcileError> {
        self.reconciler.update_container(node, self.root)
    }

    /// Schedules `node` at discrete priority and flushes it synchronously.
    pub fn render_sync(&mut self, node: impl Into<Node>) -> Result<(), ReconcileError> {
        let root = self.root;
        self.reconciler
            .flush_sync(|r| r.update_container(node, root))?
            .map(|_| ())
    }

    /// Answers one outstanding wakeup, microtasks first. Returns `false`
    /// when nothing was requested.
    pub fn step(&mut self) -> Result<bool, ReconcileError> {
        if self.scheduler.take_microtask() {
            self.reconciler.flush_microtasks()?;
            return Ok(true);
        }
        if self.scheduler.take_host_callback() {
            self.reconciler.run_host_callback()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Answers only pending microtasks, leaving time-sliced work queued.
    pub fn flush_microtasks(&mut self) -> Result<(), ReconcileError> {
        while self.scheduler.take_microtask() {
            self.reconciler.flush_microtasks()?;
        }
        Ok(())
    }

    /// Runs exactly one host callback turn if one was requested.
    pub fn run_host_callback(&mut self) -> Result<bool, ReconcileError> {
        self.flush_microtasks()?;
        if self.scheduler.take_host_callback() {
            return self.reconciler.run_host_callback();
        }
        Ok(false)
    }

    /// Answers wakeups until the reconciler stops asking for them.
    pub fn pump(&mut self) -> Result<usize, ReconcileError> {
        let mut steps = 0;
        while self.step()? {
            steps += 1;
        }
        Ok(steps)
    }

    /// Drains all work, including work that never requested a wakeup.
    pub fn run_until_idle(&mut self) -> Result<(), ReconcileError> {
        self.pump()?;
        self.reconciler.run_until_idle()
    }

    /// Runs `f` while the host reports `lane` as the current event priority.
    pub fn with_event_priority<R>(&mut self, lane: Lane, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.reconciler.host().current_event_priority();
        self.reconciler.host().set_event_priority(lane);
        let result = f(self);
        self.reconciler.host().set_event_priority(previous);
        result
    }

    /// Invokes the `name` callback of the first element whose `id`
    /// attribute is `id`, as a discrete event.
    pub fn click(&mut self, id: &str) -> Result<(), ReconcileError> {
        self.fire(id, "on_click", Lanes::SYNC)
    }

    /// Invokes a callback attribute at the given event priority. The
    /// microtasks it produced are flushed while the event is still current,
    /// so its dispatches take the event's lane.
    pub fn fire(&mut self, id: &str, name: &str, lane: Lane) -> Result<(), ReconcileError> {
        let Some(node) = self.find(id) else {
            return Err(ReconcileError::render("TestHarness", format!("no element with id {id:?}")));
        };
        self.with_event_priority(lane, |h| {
            h.reconciler.host().trigger(node, name);
            h.flush_microtasks()
        })
    }

    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.reconciler
            .host()
            .find(self.container, "id", PropValue::from(id))
    }

    pub fn advance_time(&self, ms: Millis) {
        self.clock.advance(ms);
    }

    pub fn text(&self) -> String {
        self.reconciler.host().text_content(self.container)
    }

    pub fn serialize(&self) -> String {
        self.reconciler.host().serialize(self.container)
    }

    pub fn dump_tree(&self) -> String {
        self.reconciler.host().dump_tree(self.container)
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        self.reconciler.host_mut().take_ops()
    }

    pub fn take_mutations(&mut self) -> Vec<HostOp> {
        self.reconciler.host_mut().take_mutations()
    }

    pub fn commit_count(&self) -> usize {
        self.reconciler.host().commit_count()
    }

    pub fn pending_lanes(&self) -> Lanes {
        self.reconciler.pending_lanes(self.root)
    }

    pub fn root(&self) -> RootId {
        self.root
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &TestScheduler {
        &self.scheduler
    }

    pub fn reconciler(&self) -> &Reconciler<MemoryHost> {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut Reconciler<MemoryHost> {
        &mut self.reconciler
    }

    pub fn host(&self) -> &MemoryHost {
        self.reconciler.host()
    }

    pub fn host_mut(&mut self) -> &mut MemoryHost {
        self.reconciler.host_mut()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
