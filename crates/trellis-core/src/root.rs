use std::cell::RefCell;
use std::rc::Rc;

use crate::fiber::FiberId;
use crate::hooks::Cleanup;
use crate::host::HostAdapter;
use crate::lane::{Lane, Lanes, RootLanes};
use crate::scheduler::TaskId;

/// Handle to a mounted root, returned by `create_container`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(u32);

impl RootId {
    pub(crate) fn new(index: usize) -> Self {
        RootId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shared teardown slot of an effect; see `hooks::Effect`.
pub(crate) type DestroySlot = Rc<RefCell<Option<Cleanup>>>;

/// Root container state. Lives for as long as the tree is mounted.
pub(crate) struct FiberRoot<H: HostAdapter> {
    pub(crate) container: H::Container,
    pub(crate) current: FiberId,
    pub(crate) finished_work: Option<FiberId>,
    pub(crate) lanes: RootLanes,
    pub(crate) callback_node: Option<TaskId>,
    pub(crate) callback_priority: Lane,
    /// Follow-up task that will flush passive effects.
    pub(crate) passive_callback: Option<TaskId>,
    /// A commit left passive effects that have not run yet.
    pub(crate) has_pending_passive_effects: bool,
    /// Passive teardowns of subtrees deleted in a commit.
    pub(crate) pending_passive_unmounts: Vec<DestroySlot>,
}

impl<H: HostAdapter> FiberRoot<H> {
    pub(crate) fn new(container: H::Container, current: FiberId) -> Self {
        Self {
            container,
            current,
            finished_work: None,
            lanes: RootLanes::default(),
            callback_node: None,
            callback_priority: Lanes::NONE,
            passive_callback: None,
            has_pending_passive_effects: false,
            pending_passive_unmounts: Vec::new(),
        }
    }
}
