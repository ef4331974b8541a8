//! Scheduling, rendering and committing roots.

use crate::error::ReconcileError;
use crate::event_priority::{
    scheduler_priority_for_lanes, DEFAULT_EVENT_PRIORITY, DISCRETE_EVENT_PRIORITY,
};
use crate::fiber::{FiberId, FiberProps};
use crate::flags::Flags;
use crate::host::HostAdapter;
use crate::lane::{includes_blocking_lane, Lane, Lanes, Millis};
use crate::reconciler::{Reconciler, RootExitStatus};
use crate::root::RootId;
use crate::scheduler::{PriorityLevel, TaskKind, TaskOutcome};

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn schedule_update_on_fiber(&mut self, root: RootId, lane: Lane, event_time: Millis) {
        self.roots[root.index()].lanes.mark_updated(lane);
        self.ensure_root_is_scheduled(root, event_time);
    }

    /// Makes sure exactly one callback is queued for the root's most urgent
    /// pending work, reusing the existing one when the priority matches.
    pub(crate) fn ensure_root_is_scheduled(&mut self, root_id: RootId, current_time: Millis) {
        let wip_lanes = if self.work.root == Some(root_id) {
            self.work.render_lanes
        } else {
            Lanes::NONE
        };
        let root = &mut self.roots[root_id.index()];
        root.lanes.mark_starved_lanes_as_expired(current_time, &self.config);
        let next_lanes = root.lanes.next_lanes(wip_lanes);
        let existing = root.callback_node;

        if next_lanes.is_empty() {
            if let Some(task) = existing {
                self.tasks.cancel(task);
            }
            root.callback_node = None;
            root.callback_priority = Lanes::NONE;
            return;
        }

        let new_priority = next_lanes.highest_priority_lane();
        if root.callback_priority == new_priority {
            return;
        }
        if let Some(task) = existing {
            self.tasks.cancel(task);
        }

        let callback = if new_priority == Lanes::SYNC {
            self.sync_queue.push(root_id);
            self.runtime.schedule_microtask();
            None
        } else {
            let level = scheduler_priority_for_lanes(next_lanes);
            let task = self
                .tasks
                .schedule(level, TaskKind::PerformConcurrentWork(root_id), self.runtime.now());
            self.runtime.request_host_callback();
            Some(task)
        };
        log::debug!(
            "root {} scheduled at {new_priority:?} for {next_lanes:?}",
            root_id.index()
        );
        root.callback_node = callback;
        root.callback_priority = new_priority;
    }

    /// Runs queued tasks until the slice budget runs out. Returns whether
    /// tasks remain, in which case another host callback was requested.
    pub fn run_host_callback(&mut self) -> Result<bool, ReconcileError> {
        self.process_dispatches();
        self.tasks.begin_slice(self.runtime.now());
        let result = self.work_loop_tasks();
        let has_more = !self.tasks.is_empty();
        if has_more {
            self.runtime.request_host_callback();
        }
        result.map(|()| has_more)
    }

    fn work_loop_tasks(&mut self) -> Result<(), ReconcileError> {
        while let Some(task) = self.tasks.peek() {
            let now = self.runtime.now();
            if task.expiration_time > now && self.tasks.should_yield(now) {
                break;
            }
            let did_timeout = task.expiration_time <= now;
            let previous = self.tasks.set_current_priority(task.priority);
            let outcome = self.run_task(task.kind, did_timeout);
            self.tasks.set_current_priority(previous);
            match outcome {
                Ok(TaskOutcome::Continue) => {}
                Ok(TaskOutcome::Done) => self.tasks.complete(task.id),
                Err(err) => {
                    self.tasks.complete(task.id);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn run_task(&mut self, kind: TaskKind, did_timeout: bool) -> Result<TaskOutcome, ReconcileError> {
        match kind {
            TaskKind::PerformConcurrentWork(root) => self.perform_concurrent_work_on_root(root, did_timeout),
            TaskKind::FlushPassiveEffects(root) => {
                self.roots[root.index()].passive_callback = None;
                if self.flush_passive_effects(root) {
                    self.process_dispatches();
                }
                Ok(TaskOutcome::Done)
            }
        }
    }

    /// Priority the running task was scheduled at.
    pub fn current_task_priority(&self) -> PriorityLevel {
        self.tasks.current_priority()
    }

    fn perform_concurrent_work_on_root(
        &mut self,
        root_id: RootId,
        did_timeout: bool,
    ) -> Result<TaskOutcome, ReconcileError> {
        let index = root_id.index();
        let original = self.roots[index].callback_node;
        if self.flush_passive_effects(root_id) {
            self.process_dispatches();
            if self.roots[index].callback_node != original {
                // An effect rescheduled the root; this task is obsolete.
                return Ok(TaskOutcome::Done);
            }
        }

        let lanes = self.roots[index].lanes.next_lanes(Lanes::NONE);
        if lanes.is_empty() {
            return Ok(TaskOutcome::Done);
        }

        let should_time_slice = !includes_blocking_lane(lanes, &self.config)
            && !self.roots[index].lanes.includes_expired_lane(lanes)
            && !did_timeout;
        let status = if should_time_slice {
            self.render_root_concurrent(root_id, lanes)
        } else {
            self.render_root_sync(root_id, lanes)
        };
        let status = match status {
            Ok(status) => status,
            Err(err) => {
                self.reset_root_callback(root_id);
                return Err(err);
            }
        };

        if status == RootExitStatus::Completed {
            self.commit_finished_render(root_id)?;
        }
        self.ensure_root_is_scheduled(root_id, self.runtime.now());

        let root = &self.roots[index];
        if root.callback_node.is_some() && root.callback_node == original {
            return Ok(TaskOutcome::Continue);
        }
        Ok(TaskOutcome::Done)
    }

    fn commit_finished_render(&mut self, root_id: RootId) -> Result<(), ReconcileError> {
        let root = &mut self.roots[root_id.index()];
        root.finished_work = self.fibers[root.current].alternate;
        self.commit_root(root_id)
    }

    pub(crate) fn perform_sync_work_on_root(&mut self, root_id: RootId) -> Result<(), ReconcileError> {
        let index = root_id.index();
        if self.flush_passive_effects(root_id) {
            self.process_dispatches();
        }
        let lanes = self.roots[index].lanes.next_lanes(Lanes::NONE);
        if !lanes.intersects(Lanes::SYNC) {
            self.ensure_root_is_scheduled(root_id, self.runtime.now());
            return Ok(());
        }
        if let Err(err) = self.render_root_sync(root_id, lanes) {
            self.reset_root_callback(root_id);
            return Err(err);
        }
        self.commit_finished_render(root_id)
    }

    fn reset_root_callback(&mut self, root_id: RootId) {
        let root = &mut self.roots[root_id.index()];
        if let Some(task) = root.callback_node.take() {
            self.tasks.cancel(task);
        }
        root.callback_priority = Lanes::NONE;
    }

    fn render_root_sync(&mut self, root_id: RootId, lanes: Lanes) -> Result<RootExitStatus, ReconcileError> {
        if self.work.root != Some(root_id) || self.work.render_lanes != lanes {
            self.prepare_fresh_stack(root_id, lanes);
        }
        while let Some(unit) = self.work.fiber {
            if let Err(err) = self.perform_unit_of_work(unit) {
                self.abandon_render();
                return Err(err);
            }
        }
        self.work.root = None;
        self.work.render_lanes = Lanes::NONE;
        Ok(self.work.exit_status)
    }

    fn render_root_concurrent(&mut self, root_id: RootId, lanes: Lanes) -> Result<RootExitStatus, ReconcileError> {
        if self.work.root != Some(root_id) || self.work.render_lanes != lanes {
            self.prepare_fresh_stack(root_id, lanes);
        }
        while let Some(unit) = self.work.fiber {
            if self.tasks.should_yield(self.runtime.now()) {
                log::trace!("yielding with {unit:?} pending");
                return Ok(RootExitStatus::InProgress);
            }
            if let Err(err) = self.perform_unit_of_work(unit) {
                self.abandon_render();
                return Err(err);
            }
        }
        self.work.root = None;
        self.work.render_lanes = Lanes::NONE;
        Ok(self.work.exit_status)
    }

    /// Discards any render in progress and starts a new one at the root.
    fn prepare_fresh_stack(&mut self, root_id: RootId, lanes: Lanes) {
        if self.work.fiber.is_some() {
            log::debug!(
                "discarding render of {:?} to start {lanes:?}",
                self.work.render_lanes
            );
        }
        self.free_fresh_fibers();
        let root = &mut self.roots[root_id.index()];
        root.finished_work = None;
        let current = root.current;
        let wip = self.fibers.create_work_in_progress(current, FiberProps::Empty);
        self.work.fiber = Some(wip);
        self.work.root = Some(root_id);
        self.work.render_lanes = lanes;
        self.work.exit_status = RootExitStatus::InProgress;
        self.concurrent_queues.finish_queueing();
        log::debug!("rendering root {} at {lanes:?}", root_id.index());
    }

    fn free_fresh_fibers(&mut self) {
        for id in std::mem::take(&mut self.work.fresh_fibers) {
            self.fibers.free(id);
        }
    }

    fn abandon_render(&mut self) {
        self.free_fresh_fibers();
        self.work.fiber = None;
        self.work.root = None;
        self.work.render_lanes = Lanes::NONE;
        self.work.exit_status = RootExitStatus::InProgress;
    }

    fn perform_unit_of_work(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        let current = self.fibers[unit].alternate;
        log::trace!("begin {unit:?} ({:?})", self.fibers[unit].tag);
        let next = self.begin_work(current, unit, self.work.render_lanes)?;
        let fiber = &mut self.fibers[unit];
        fiber.memoized_props = fiber.pending_props.clone();
        match next {
            Some(next) => self.work.fiber = Some(next),
            None => self.complete_unit_of_work(unit)?,
        }
        Ok(())
    }

    fn complete_unit_of_work(&mut self, unit: FiberId) -> Result<(), ReconcileError> {
        let mut completed = unit;
        loop {
            let current = self.fibers[completed].alternate;
            self.complete_work(current, completed)?;
            let fiber = &self.fibers[completed];
            if let Some(sibling) = fiber.sibling {
                self.work.fiber = Some(sibling);
                return Ok(());
            }
            match fiber.return_fiber {
                Some(parent) => completed = parent,
                None => break,
            }
        }
        self.work.fiber = None;
        self.work.exit_status = RootExitStatus::Completed;
        Ok(())
    }

    fn commit_root(&mut self, root_id: RootId) -> Result<(), ReconcileError> {
        let runtime = self.runtime.clone();
        let _priority = runtime.scoped_update_priority(DISCRETE_EVENT_PRIORITY);
        self.commit_root_impl(root_id)
    }

    fn commit_root_impl(&mut self, root_id: RootId) -> Result<(), ReconcileError> {
        let index = root_id.index();
        let Some(finished) = self.roots[index].finished_work.take() else {
            return Ok(());
        };

        let fiber = &self.fibers[finished];
        let remaining = fiber.lanes | fiber.child_lanes | self.concurrent_queues.lanes();
        let all_flags = fiber.flags | fiber.subtree_flags;
        let root = &mut self.roots[index];
        root.callback_node = None;
        root.callback_priority = Lanes::NONE;
        log::debug!("committing root {index}, remaining {remaining:?}");

        self.host.prepare_for_commit(&self.roots[index].container);
        let mutated = if all_flags.intersects(Flags::MUTATION_MASK | Flags::LAYOUT_MASK) {
            self.commit_mutation_effects(root_id, finished)
        } else {
            Ok(())
        };
        self.host.reset_after_commit(&self.roots[index].container);
        if let Err(err) = mutated {
            self.work.deleted_fibers.clear();
            self.abandon_render();
            return Err(err);
        }

        self.roots[index].lanes.mark_finished(remaining);
        if all_flags.intersects(Flags::PASSIVE) {
            self.schedule_passive_flush(root_id);
        }

        self.roots[index].current = finished;
        self.work.fresh_fibers.clear();
        for deleted in std::mem::take(&mut self.work.deleted_fibers) {
            for id in self.fibers.collect_subtree(deleted) {
                self.fibers.free(id);
            }
        }
        self.sync_alternate_lanes(finished);
        self.mark_staged_update_lanes();

        self.commit_layout_effects(finished);

        if !self.roots[index].pending_passive_unmounts.is_empty() {
            self.schedule_passive_flush(root_id);
        }

        self.process_dispatches();
        self.ensure_root_is_scheduled(root_id, self.runtime.now());
        Ok(())
    }

    /// Copies the lanes of the committed tree onto the now-detached twins.
    /// Lanes marked on a twin before its render cleared them would otherwise
    /// keep it looking busy.
    fn sync_alternate_lanes(&mut self, finished: FiberId) {
        let mut stack = vec![finished];
        while let Some(id) = stack.pop() {
            let fiber = &self.fibers[id];
            let (lanes, child_lanes, first_child) = (fiber.lanes, fiber.child_lanes, fiber.child);
            let alternate = fiber.alternate;
            let Some(alt) = alternate.and_then(|alt| self.fibers.get_mut(alt)) else {
                continue;
            };
            let stale_below = !alt.child_lanes.is_empty();
            alt.lanes = lanes;
            alt.child_lanes = child_lanes;
            if !stale_below {
                continue;
            }
            let mut child = first_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.fibers[c].sibling;
            }
        }
    }

    fn schedule_passive_flush(&mut self, root_id: RootId) {
        let root = &mut self.roots[root_id.index()];
        root.has_pending_passive_effects = true;
        if root.passive_callback.is_some() {
            return;
        }
        let task = self.tasks.schedule(
            PriorityLevel::Normal,
            TaskKind::FlushPassiveEffects(root_id),
            self.runtime.now(),
        );
        root.passive_callback = Some(task);
        self.runtime.request_host_callback();
    }

    /// Runs pending passive effects of `root_id`. Returns whether any were
    /// pending.
    pub(crate) fn flush_passive_effects(&mut self, root_id: RootId) -> bool {
        let root = &mut self.roots[root_id.index()];
        if !root.has_pending_passive_effects {
            return false;
        }
        root.has_pending_passive_effects = false;
        if let Some(task) = root.passive_callback.take() {
            self.tasks.cancel(task);
        }
        let runtime = self.runtime.clone();
        let _priority = runtime.scoped_update_priority(DEFAULT_EVENT_PRIORITY);
        self.commit_passive_effects(root_id);
        true
    }
}
