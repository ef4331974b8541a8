//! Fibers: the reconciler's double-buffered tree.
//!
//! Every tree position has up to two fibers, the committed one and its
//! work-in-progress twin, linked through `alternate`. Both live in a
//! generational arena so handles held outside the tree (dispatchers) can
//! detect that their fiber was deleted.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::element::{Element, ElementType, Key, Node, Props};
use crate::flags::Flags;
use crate::hooks::{Effect, Hook};
use crate::host::HostAdapter;
use crate::lane::Lanes;
use crate::root::RootId;
use crate::update_queue::UpdateQueue;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FiberId({}v{})", self.index, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkTag {
    /// A component that has never rendered; becomes `FunctionComponent`.
    IndeterminateComponent,
    FunctionComponent,
    HostRoot,
    HostComponent,
    HostText,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FiberType {
    Root,
    Host(Rc<str>),
    Text,
    Component(crate::element::Component),
}

impl FiberType {
    pub(crate) fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (FiberType::Host(a), ElementType::Host(b)) => a == b,
            (FiberType::Component(a), ElementType::Component(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn host_type(&self) -> &str {
        match self {
            FiberType::Host(ty) => ty,
            _ => "",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) enum FiberProps {
    #[default]
    Empty,
    Props(Rc<Props>),
    Text(Rc<str>),
}

impl FiberProps {
    pub(crate) fn props(&self) -> Option<&Rc<Props>> {
        match self {
            FiberProps::Props(props) => Some(props),
            _ => None,
        }
    }

    pub(crate) fn text(&self) -> Option<&Rc<str>> {
        match self {
            FiberProps::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// State rendered by the host root.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RootState {
    pub element: Node,
}

#[derive(Clone, Default)]
pub(crate) enum FiberState {
    #[default]
    Empty,
    Root(RootState),
    Hooks(Rc<Vec<Hook>>),
}

impl FiberState {
    pub(crate) fn hooks(&self) -> Option<Rc<Vec<Hook>>> {
        match self {
            FiberState::Hooks(hooks) => Some(Rc::clone(hooks)),
            _ => None,
        }
    }
}

pub(crate) enum FiberQueue<P> {
    Empty,
    Root(UpdateQueue<RootState>),
    Effects(Rc<Vec<Rc<Effect>>>),
    HostUpdate(P),
}

impl<P> FiberQueue<P> {
    fn clone_for_work_in_progress(&self) -> Self {
        match self {
            FiberQueue::Root(queue) => FiberQueue::Root(queue.clone()),
            FiberQueue::Effects(effects) => FiberQueue::Effects(Rc::clone(effects)),
            FiberQueue::Empty | FiberQueue::HostUpdate(_) => FiberQueue::Empty,
        }
    }

    pub(crate) fn effects(&self) -> Option<Rc<Vec<Rc<Effect>>>> {
        match self {
            FiberQueue::Effects(effects) => Some(Rc::clone(effects)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum StateNode<I> {
    None,
    Root(RootId),
    Instance(I),
}

impl<I> StateNode<I> {
    pub(crate) fn instance(&self) -> Option<&I> {
        match self {
            StateNode::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

pub(crate) struct Fiber<H: HostAdapter> {
    pub(crate) tag: WorkTag,
    pub(crate) key: Option<Key>,
    pub(crate) ty: FiberType,
    pub(crate) pending_props: FiberProps,
    pub(crate) memoized_props: FiberProps,
    pub(crate) memoized_state: FiberState,
    pub(crate) update_queue: FiberQueue<H::UpdatePayload>,
    pub(crate) state_node: StateNode<H::Instance>,
    pub(crate) return_fiber: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) index: usize,
    pub(crate) flags: Flags,
    pub(crate) subtree_flags: Flags,
    pub(crate) deletions: Vec<FiberId>,
    pub(crate) lanes: Lanes,
    pub(crate) child_lanes: Lanes,
    pub(crate) alternate: Option<FiberId>,
}

impl<H: HostAdapter> Fiber<H> {
    pub(crate) fn new(tag: WorkTag, key: Option<Key>, ty: FiberType, pending_props: FiberProps) -> Self {
        Self {
            tag,
            key,
            ty,
            pending_props,
            memoized_props: FiberProps::Empty,
            memoized_state: FiberState::Empty,
            update_queue: FiberQueue::Empty,
            state_node: StateNode::None,
            return_fiber: None,
            child: None,
            sibling: None,
            index: 0,
            flags: Flags::empty(),
            subtree_flags: Flags::empty(),
            deletions: Vec::new(),
            lanes: Lanes::NONE,
            child_lanes: Lanes::NONE,
            alternate: None,
        }
    }

    pub(crate) fn from_element(element: &Element) -> Self {
        let (tag, ty) = match &element.ty {
            ElementType::Host(name) => (WorkTag::HostComponent, FiberType::Host(Rc::clone(name))),
            ElementType::Component(component) => (
                WorkTag::IndeterminateComponent,
                FiberType::Component(component.clone()),
            ),
        };
        Self::new(tag, element.key, ty, FiberProps::Props(Rc::clone(&element.props)))
    }

    pub(crate) fn from_text(text: &Rc<str>) -> Self {
        Self::new(WorkTag::HostText, None, FiberType::Text, FiberProps::Text(Rc::clone(text)))
    }

    pub(crate) fn is_host(&self) -> bool {
        matches!(self.tag, WorkTag::HostComponent | WorkTag::HostText)
    }

    pub(crate) fn is_host_parent(&self) -> bool {
        matches!(self.tag, WorkTag::HostComponent | WorkTag::HostRoot)
    }
}

struct Slot<H: HostAdapter> {
    generation: u32,
    fiber: Option<Fiber<H>>,
}

pub(crate) struct FiberArena<H: HostAdapter> {
    slots: Vec<Slot<H>>, // FUTURE(no_std): fixed-capacity slab.
    free: Vec<u32>,
    live: usize,
}

impl<H: HostAdapter> FiberArena<H> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn alloc(&mut self, fiber: Fiber<H>) -> FiberId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.fiber = Some(fiber);
            return FiberId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            fiber: Some(fiber),
        });
        FiberId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn free(&mut self, id: FiberId) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation || slot.fiber.is_none() {
            return;
        }
        slot.fiber = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
    }

    pub(crate) fn get(&self, id: FiberId) -> Option<&Fiber<H>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<H>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.fiber.as_mut())
    }

    pub(crate) fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Creates or recycles the work-in-progress twin of `current`.
    pub(crate) fn create_work_in_progress(&mut self, current: FiberId, pending_props: FiberProps) -> FiberId {
        let wip = match self[current].alternate.filter(|alt| self.contains(*alt)) {
            Some(wip) => {
                let fiber = &mut self[wip];
                fiber.pending_props = pending_props;
                fiber.flags = Flags::empty();
                fiber.subtree_flags = Flags::empty();
                fiber.deletions.clear();
                wip
            }
            None => {
                let source = &self[current];
                let mut fiber = Fiber::new(source.tag, source.key, source.ty.clone(), pending_props);
                fiber.state_node = source.state_node.clone();
                fiber.alternate = Some(current);
                let wip = self.alloc(fiber);
                self[current].alternate = Some(wip);
                wip
            }
        };

        let source = &self[current];
        let tag = source.tag;
        let ty = source.ty.clone();
        let child = source.child;
        let sibling = source.sibling;
        let index = source.index;
        let memoized_props = source.memoized_props.clone();
        let memoized_state = source.memoized_state.clone();
        let update_queue = source.update_queue.clone_for_work_in_progress();
        let lanes = source.lanes;
        let child_lanes = source.child_lanes;

        let fiber = &mut self[wip];
        fiber.tag = tag;
        fiber.ty = ty;
        fiber.child = child;
        fiber.sibling = sibling;
        fiber.index = index;
        fiber.memoized_props = memoized_props;
        fiber.memoized_state = memoized_state;
        fiber.update_queue = update_queue;
        fiber.lanes = lanes;
        fiber.child_lanes = child_lanes;
        wip
    }

    /// Ids of `root` and all its descendants, plus their alternates.
    pub(crate) fn collect_subtree(&self, root: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(fiber) = self.get(id) else { continue };
            out.push(id);
            if let Some(alternate) = fiber.alternate {
                out.push(alternate);
            }
            let mut child = fiber.child;
            while let Some(c) = child {
                stack.push(c);
                child = self.get(c).and_then(|f| f.sibling);
            }
        }
        out
    }
}

impl<H: HostAdapter> Index<FiberId> for FiberArena<H> {
    type Output = Fiber<H>;

    fn index(&self, id: FiberId) -> &Fiber<H> {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber id {id:?}"),
        }
    }
}

impl<H: HostAdapter> IndexMut<FiberId> for FiberArena<H> {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber<H> {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("stale fiber id {id:?}"),
        }
    }
}
