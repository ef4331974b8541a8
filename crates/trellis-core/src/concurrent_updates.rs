//! Staging of updates that arrive outside a render.
//!
//! Updates are not linked into their queues right away: a render in
//! progress must not observe them half way through. They are held here and
//! linked in one go when the next render starts.

use std::rc::Rc;

use crate::fiber::{FiberId, FiberQueue, RootState, StateNode, WorkTag};
use crate::hooks::QueuedHookUpdate;
use crate::host::HostAdapter;
use crate::lane::{Lane, Lanes};
use crate::reconciler::Reconciler;
use crate::root::RootId;
use crate::update_queue::{SharedQueue, Update};

pub(crate) enum StagedUpdate {
    Root {
        queue: Rc<SharedQueue<RootState>>,
        update: Update<RootState>,
    },
    Hook(Box<dyn QueuedHookUpdate>),
}

#[derive(Default)]
pub(crate) struct ConcurrentQueues {
    staged: Vec<StagedUpdate>,
    targets: Vec<(FiberId, Lane)>,
    lanes: Lanes,
}

impl ConcurrentQueues {
    fn stage(&mut self, fiber: FiberId, update: StagedUpdate, lane: Lane) {
        self.staged.push(update);
        self.targets.push((fiber, lane));
        self.lanes |= lane;
    }

    /// Links every staged update into its queue.
    pub(crate) fn finish_queueing(&mut self) {
        self.lanes = Lanes::NONE;
        self.targets.clear();
        for staged in self.staged.drain(..) {
            match staged {
                StagedUpdate::Root { queue, update } => queue.push(update),
                StagedUpdate::Hook(update) => update.link(),
            }
        }
    }

    /// Lanes of updates staged since the current render started.
    pub(crate) fn lanes(&self) -> Lanes {
        self.lanes
    }
}

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn enqueue_concurrent_hook_update(
        &mut self,
        fiber: FiberId,
        update: Box<dyn QueuedHookUpdate>,
        lane: Lane,
    ) -> Option<RootId> {
        self.concurrent_queues
            .stage(fiber, StagedUpdate::Hook(update), lane);
        self.mark_update_lane_from_fiber_to_root(fiber, lane)
    }

    pub(crate) fn enqueue_concurrent_root_update(
        &mut self,
        fiber: FiberId,
        update: Update<RootState>,
    ) -> Option<RootId> {
        let queue = match &self.fibers[fiber].update_queue {
            FiberQueue::Root(queue) => Rc::clone(&queue.shared),
            _ => return None,
        };
        let lane = update.lane;
        self.concurrent_queues
            .stage(fiber, StagedUpdate::Root { queue, update }, lane);
        self.mark_update_lane_from_fiber_to_root(fiber, lane)
    }

    /// Marks the lanes of updates that are still staged once more. A render
    /// that ran while they waited may have cleared them from the fibers it
    /// committed.
    pub(crate) fn mark_staged_update_lanes(&mut self) {
        let targets = std::mem::take(&mut self.concurrent_queues.targets);
        for &(fiber, lane) in &targets {
            self.mark_update_lane_from_fiber_to_root(fiber, lane);
        }
        self.concurrent_queues.targets = targets;
    }

    /// Marks `lane` on the fiber and its twin and as child work on every
    /// ancestor, returning the root the fiber belongs to.
    fn mark_update_lane_from_fiber_to_root(&mut self, fiber: FiberId, lane: Lane) -> Option<RootId> {
        if !self.fibers.contains(fiber) {
            return None;
        }
        self.fibers[fiber].lanes |= lane;
        if let Some(alternate) = self.fibers[fiber].alternate {
            if let Some(alt) = self.fibers.get_mut(alternate) {
                alt.lanes |= lane;
            }
        }

        let mut node = fiber;
        while let Some(parent) = self.fibers[node].return_fiber {
            self.fibers[parent].child_lanes |= lane;
            if let Some(alternate) = self.fibers[parent].alternate {
                if let Some(alt) = self.fibers.get_mut(alternate) {
                    alt.child_lanes |= lane;
                }
            }
            node = parent;
        }

        let top = &self.fibers[node];
        match (top.tag, &top.state_node) {
            (WorkTag::HostRoot, StateNode::Root(root)) => Some(*root),
            _ => None,
        }
    }
}
