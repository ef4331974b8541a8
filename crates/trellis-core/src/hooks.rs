//! Per-component state, effects and refs.
//!
//! A component's hooks are stored on its fiber as an ordered list. Each
//! render walks that list with a cursor: in [`HookMode::Mount`] every call
//! appends a fresh hook, in [`HookMode::Update`] every call must line up
//! with the hook of the same kind at the same position on the previous
//! render.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::element::{Component, Node, Props};
use crate::error::ReconcileError;
use crate::fiber::{FiberId, FiberQueue, FiberState};
use crate::flags::{Flags, HookFlags};
use crate::host::HostAdapter;
use crate::lane::{Lane, Lanes};
use crate::reconciler::Reconciler;
use crate::root::DestroySlot;
use crate::runtime::{PendingDispatch, RuntimeHandle};

/// Teardown returned by an effect.
pub type Cleanup = Box<dyn FnOnce()>;

type EffectCreate = Box<dyn FnOnce() -> Option<Cleanup>>;

type Reducer<S, A> = Rc<dyn Fn(&S, &A) -> S>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookMode {
    /// First render of the component; hooks are created.
    Mount,
    /// Re-render; hooks are read back in call order.
    Update,
}

pub(crate) enum Hook {
    State(Box<dyn Any>),
    Effect(Rc<Effect>),
    Ref(Rc<dyn Any>),
}

impl Hook {
    fn kind(&self) -> &'static str {
        match self {
            Hook::State(_) => "state",
            Hook::Effect(_) => "effect",
            Hook::Ref(_) => "ref",
        }
    }
}

/// Dependency value compared between renders.
#[derive(Clone, Debug)]
pub enum Dep {
    Unit,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(Rc<str>),
    /// Address of a shared value; equal only for the same allocation.
    Ptr(usize),
}

impl Dep {
    pub fn ptr<T: ?Sized>(value: &Rc<T>) -> Dep {
        Dep::Ptr(Rc::as_ptr(value) as *const () as usize)
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dep::Unit, Dep::Unit) => true,
            (Dep::Bool(a), Dep::Bool(b)) => a == b,
            (Dep::Int(a), Dep::Int(b)) => a == b,
            (Dep::Uint(a), Dep::Uint(b)) => a == b,
            // Bitwise so NaN equals itself and 0.0 differs from -0.0.
            (Dep::Float(a), Dep::Float(b)) => a.to_bits() == b.to_bits(),
            (Dep::Str(a), Dep::Str(b)) => a == b,
            (Dep::Ptr(a), Dep::Ptr(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for Dep {
    fn from(_: ()) -> Self {
        Dep::Unit
    }
}

impl From<bool> for Dep {
    fn from(value: bool) -> Self {
        Dep::Bool(value)
    }
}

impl From<i32> for Dep {
    fn from(value: i32) -> Self {
        Dep::Int(value.into())
    }
}

impl From<i64> for Dep {
    fn from(value: i64) -> Self {
        Dep::Int(value)
    }
}

impl From<u32> for Dep {
    fn from(value: u32) -> Self {
        Dep::Uint(value.into())
    }
}

impl From<u64> for Dep {
    fn from(value: u64) -> Self {
        Dep::Uint(value)
    }
}

impl From<usize> for Dep {
    fn from(value: usize) -> Self {
        Dep::Uint(value as u64)
    }
}

impl From<f64> for Dep {
    fn from(value: f64) -> Self {
        Dep::Float(value)
    }
}

impl From<&str> for Dep {
    fn from(value: &str) -> Self {
        Dep::Str(value.into())
    }
}

impl From<String> for Dep {
    fn from(value: String) -> Self {
        Dep::Str(value.into())
    }
}

impl From<Rc<str>> for Dep {
    fn from(value: Rc<str>) -> Self {
        Dep::Str(value)
    }
}

fn are_hook_inputs_equal(next: &[Dep], prev: Option<&[Dep]>) -> bool {
    let Some(prev) = prev else {
        return false;
    };
    if prev.len() != next.len() {
        log::warn!(
            "effect dependency list changed length from {} to {}",
            prev.len(),
            next.len()
        );
        return false;
    }
    next == prev
}

/// One effect instance produced by a render.
///
/// The teardown slot is shared with the effect of the same hook on the
/// previous render, so a commit that skips the effect keeps the old
/// teardown reachable.
pub(crate) struct Effect {
    pub(crate) tag: HookFlags,
    create: RefCell<Option<EffectCreate>>,
    pub(crate) destroy: DestroySlot,
    deps: Option<Vec<Dep>>,
}

impl Effect {
    pub(crate) fn must_run(&self, timing: HookFlags) -> bool {
        self.tag.contains(timing | HookFlags::HAS_EFFECT)
    }

    pub(crate) fn run_destroy(&self) {
        let destroy = self.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    pub(crate) fn run_create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let destroy = create();
            *self.destroy.borrow_mut() = destroy;
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tag", &self.tag)
            .field("deps", &self.deps)
            .finish()
    }
}

struct HookUpdate<S, A> {
    lane: Lane,
    action: Rc<A>,
    eager_state: Option<S>,
}

impl<S: Clone, A> Clone for HookUpdate<S, A> {
    fn clone(&self) -> Self {
        Self {
            lane: self.lane,
            action: Rc::clone(&self.action),
            eager_state: self.eager_state.clone(),
        }
    }
}

/// Queue of a state hook, shared by both twins of the fiber and by every
/// dispatcher handed out for it.
struct HookQueue<S, A> {
    pending: RefCell<Vec<HookUpdate<S, A>>>,
    last_rendered_reducer: RefCell<Reducer<S, A>>,
    last_rendered_state: RefCell<S>,
}

struct StateHook<S, A> {
    memoized_state: S,
    base_state: S,
    base_queue: RefCell<Vec<HookUpdate<S, A>>>,
    queue: Rc<HookQueue<S, A>>,
}

/// Type-erased hook update travelling from a dispatcher to the reconciler.
pub(crate) trait QueuedHookUpdate {
    fn set_lane(&mut self, lane: Lane);

    /// Computes the next state ahead of render. True when it equals the
    /// last rendered state, so the update can be dropped.
    fn eagerly_bails_out(&mut self) -> bool;

    /// Appends the update to its hook's pending queue.
    fn link(self: Box<Self>);
}

struct QueuedUpdate<S, A> {
    queue: Rc<HookQueue<S, A>>,
    update: HookUpdate<S, A>,
}

impl<S: Clone + PartialEq + 'static, A: 'static> QueuedHookUpdate for QueuedUpdate<S, A> {
    fn set_lane(&mut self, lane: Lane) {
        self.update.lane = lane;
    }

    fn eagerly_bails_out(&mut self) -> bool {
        let reducer = Rc::clone(&*self.queue.last_rendered_reducer.borrow());
        let current = self.queue.last_rendered_state.borrow().clone();
        let eager = reducer(&current, &self.update.action);
        let same = eager == current;
        self.update.eager_state = Some(eager);
        same
    }

    fn link(self: Box<Self>) {
        let QueuedUpdate { queue, update } = *self;
        queue.pending.borrow_mut().push(update);
    }
}

trait DispatchTarget<A> {
    fn queued_update(self: Rc<Self>, action: A) -> Box<dyn QueuedHookUpdate>;
}

impl<S: Clone + PartialEq + 'static, A: 'static> DispatchTarget<A> for HookQueue<S, A> {
    fn queued_update(self: Rc<Self>, action: A) -> Box<dyn QueuedHookUpdate> {
        Box::new(QueuedUpdate {
            queue: self,
            update: HookUpdate {
                lane: Lanes::NONE,
                action: Rc::new(action),
                eager_state: None,
            },
        })
    }
}

/// Sends actions to a state or reducer hook.
///
/// Handles stay valid across renders and compare equal when they target the
/// same hook. Dispatching after the component was deleted, or after the
/// runtime was dropped, does nothing.
pub struct Dispatch<A: 'static> {
    fiber: FiberId,
    target: Rc<dyn DispatchTarget<A>>,
    runtime: RuntimeHandle,
}

impl<A: 'static> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        let Some(event_time) = self.runtime.now() else {
            return;
        };
        let lane = self.runtime.request_update_lane();
        let update = Rc::clone(&self.target).queued_update(action);
        self.runtime.enqueue_dispatch(PendingDispatch {
            fiber: self.fiber,
            lane,
            event_time,
            update,
        });
    }
}

impl<A: 'static> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            fiber: self.fiber,
            target: Rc::clone(&self.target),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A: 'static> PartialEq for Dispatch<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.target, &other.target)
    }
}

impl<A: 'static> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").field("fiber", &self.fiber).finish()
    }
}

/// Action accepted by `use_state` setters.
pub enum SetStateAction<S> {
    Value(S),
    Update(Box<dyn Fn(&S) -> S>),
}

pub type StateSetter<S> = Dispatch<SetStateAction<S>>;

impl<S: 'static> Dispatch<SetStateAction<S>> {
    pub fn set(&self, value: S) {
        self.dispatch(SetStateAction::Value(value));
    }

    pub fn update(&self, f: impl Fn(&S) -> S + 'static) {
        self.dispatch(SetStateAction::Update(Box::new(f)));
    }
}

fn basic_state_reducer<S: Clone>(state: &S, action: &SetStateAction<S>) -> S {
    match action {
        SetStateAction::Value(value) => value.clone(),
        SetStateAction::Update(f) => f(state),
    }
}

pub(crate) struct RenderedHooks {
    hooks: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    flags: Flags,
    skipped_lanes: Lanes,
}

/// Hook context handed to a component while it renders.
pub struct Hooks {
    mode: HookMode,
    component: &'static str,
    fiber: FiberId,
    current: Option<Rc<Vec<Hook>>>,
    cursor: usize,
    hooks: Vec<Hook>,
    effects: Vec<Rc<Effect>>,
    render_lanes: Lanes,
    flags: Flags,
    skipped_lanes: Lanes,
    runtime: RuntimeHandle,
}

impl Hooks {
    fn new(
        component: &'static str,
        fiber: FiberId,
        current: Option<Rc<Vec<Hook>>>,
        render_lanes: Lanes,
        runtime: RuntimeHandle,
    ) -> Self {
        let mode = if current.is_some() {
            HookMode::Update
        } else {
            HookMode::Mount
        };
        Self {
            mode,
            component,
            fiber,
            current,
            cursor: 0,
            hooks: Vec::new(),
            effects: Vec::new(),
            render_lanes,
            flags: Flags::empty(),
            skipped_lanes: Lanes::NONE,
            runtime,
        }
    }

    pub fn mode(&self) -> HookMode {
        self.mode
    }

    pub fn component_name(&self) -> &'static str {
        self.component
    }

    pub fn use_state<S>(
        &mut self,
        init: impl FnOnce() -> S,
    ) -> Result<(S, StateSetter<S>), ReconcileError>
    where
        S: Clone + PartialEq + 'static,
    {
        self.use_reducer(basic_state_reducer::<S>, init)
    }

    pub fn use_reducer<S, A>(
        &mut self,
        reducer: impl Fn(&S, &A) -> S + 'static,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<A>), ReconcileError>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let reducer: Reducer<S, A> = Rc::new(reducer);
        match self.mode {
            HookMode::Mount => Ok(self.mount_reducer(reducer, init())),
            HookMode::Update => self.update_reducer(reducer),
        }
    }

    fn mount_reducer<S, A>(&mut self, reducer: Reducer<S, A>, initial: S) -> (S, Dispatch<A>)
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let queue = Rc::new(HookQueue {
            pending: RefCell::new(Vec::new()),
            last_rendered_reducer: RefCell::new(reducer),
            last_rendered_state: RefCell::new(initial.clone()),
        });
        self.hooks.push(Hook::State(Box::new(StateHook {
            memoized_state: initial.clone(),
            base_state: initial.clone(),
            base_queue: RefCell::new(Vec::new()),
            queue: Rc::clone(&queue),
        })));
        (initial, self.dispatcher(queue))
    }

    fn update_reducer<S, A>(
        &mut self,
        reducer: Reducer<S, A>,
    ) -> Result<(S, Dispatch<A>), ReconcileError>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        let (current, index) = self.next_current_hook()?;
        let hook = match &current[index] {
            Hook::State(state) => state.downcast_ref::<StateHook<S, A>>(),
            _ => None,
        };
        let Some(hook) = hook else {
            return Err(self.kind_mismatch(index, "state"));
        };

        let queue = Rc::clone(&hook.queue);
        *queue.last_rendered_reducer.borrow_mut() = Rc::clone(&reducer);

        // Pending updates move onto the committed hook's base queue, so they
        // survive if this render is thrown away.
        let pending = std::mem::take(&mut *queue.pending.borrow_mut());
        if !pending.is_empty() {
            hook.base_queue.borrow_mut().extend(pending);
        }
        let base_queue = hook.base_queue.borrow().clone();

        let (memoized_state, base_state, next_base_queue) = if base_queue.is_empty() {
            (hook.memoized_state.clone(), hook.base_state.clone(), Vec::new())
        } else {
            let mut new_state = hook.base_state.clone();
            let mut new_base_state = None;
            let mut new_base_queue: Vec<HookUpdate<S, A>> = Vec::new();
            for update in base_queue {
                if !self.render_lanes.is_superset_of(update.lane) {
                    if new_base_queue.is_empty() {
                        new_base_state = Some(new_state.clone());
                    }
                    self.skipped_lanes |= update.lane;
                    new_base_queue.push(update);
                    continue;
                }
                if !new_base_queue.is_empty() {
                    new_base_queue.push(HookUpdate {
                        lane: Lanes::NONE,
                        ..update.clone()
                    });
                }
                new_state = match update.eager_state {
                    Some(eager) => eager,
                    None => reducer(&new_state, &update.action),
                };
            }
            let base_state = new_base_state.unwrap_or_else(|| new_state.clone());
            (new_state, base_state, new_base_queue)
        };

        *queue.last_rendered_state.borrow_mut() = memoized_state.clone();
        self.hooks.push(Hook::State(Box::new(StateHook {
            memoized_state: memoized_state.clone(),
            base_state,
            base_queue: RefCell::new(next_base_queue),
            queue: Rc::clone(&queue),
        })));
        Ok((memoized_state, self.dispatcher(queue)))
    }

    fn dispatcher<S, A>(&self, queue: Rc<HookQueue<S, A>>) -> Dispatch<A>
    where
        S: Clone + PartialEq + 'static,
        A: 'static,
    {
        Dispatch {
            fiber: self.fiber,
            target: queue,
            runtime: self.runtime.clone(),
        }
    }

    /// Passive effect, run after the commit has been painted.
    pub fn use_effect(
        &mut self,
        create: impl FnOnce() -> Option<Cleanup> + 'static,
        deps: Option<Vec<Dep>>,
    ) -> Result<(), ReconcileError> {
        self.effect_impl(Flags::PASSIVE, HookFlags::PASSIVE, Box::new(create), deps)
    }

    /// Effect run synchronously during the commit, after mutations.
    pub fn use_layout_effect(
        &mut self,
        create: impl FnOnce() -> Option<Cleanup> + 'static,
        deps: Option<Vec<Dep>>,
    ) -> Result<(), ReconcileError> {
        self.effect_impl(Flags::UPDATE, HookFlags::LAYOUT, Box::new(create), deps)
    }

    fn effect_impl(
        &mut self,
        fiber_flags: Flags,
        timing: HookFlags,
        create: EffectCreate,
        deps: Option<Vec<Dep>>,
    ) -> Result<(), ReconcileError> {
        let destroy = match self.mode {
            HookMode::Mount => Rc::new(RefCell::new(None)),
            HookMode::Update => {
                let (current, index) = self.next_current_hook()?;
                let prev = match &current[index] {
                    Hook::Effect(effect) if effect.tag.contains(timing) => Rc::clone(effect),
                    _ => return Err(self.kind_mismatch(index, "effect")),
                };
                if let Some(next) = &deps {
                    if are_hook_inputs_equal(next, prev.deps.as_deref()) {
                        self.push_effect(timing, create, Rc::clone(&prev.destroy), deps);
                        return Ok(());
                    }
                }
                Rc::clone(&prev.destroy)
            }
        };
        self.flags |= fiber_flags;
        self.push_effect(HookFlags::HAS_EFFECT | timing, create, destroy, deps);
        Ok(())
    }

    fn push_effect(
        &mut self,
        tag: HookFlags,
        create: EffectCreate,
        destroy: DestroySlot,
        deps: Option<Vec<Dep>>,
    ) {
        let effect = Rc::new(Effect {
            tag,
            create: RefCell::new(Some(create)),
            destroy,
            deps,
        });
        self.effects.push(Rc::clone(&effect));
        self.hooks.push(Hook::Effect(effect));
    }

    /// Mutable cell that keeps its identity for the component's lifetime.
    pub fn use_ref<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<Rc<RefCell<T>>, ReconcileError> {
        match self.mode {
            HookMode::Mount => {
                let cell = Rc::new(RefCell::new(init()));
                self.hooks.push(Hook::Ref(cell.clone()));
                Ok(cell)
            }
            HookMode::Update => {
                let (current, index) = self.next_current_hook()?;
                let cell = match &current[index] {
                    Hook::Ref(any) => Rc::clone(any).downcast::<RefCell<T>>().ok(),
                    _ => None,
                };
                let Some(cell) = cell else {
                    return Err(self.kind_mismatch(index, "ref"));
                };
                self.hooks.push(Hook::Ref(cell.clone()));
                Ok(cell)
            }
        }
    }

    /// Previous render's hook list and the position of the next hook in it.
    fn next_current_hook(&mut self) -> Result<(Rc<Vec<Hook>>, usize), ReconcileError> {
        let index = self.cursor;
        let current = self.current.clone().unwrap_or_default();
        if index >= current.len() {
            return Err(ReconcileError::HookCountMismatch {
                component: self.component,
                previous: current.len(),
                rendered: index + 1,
            });
        }
        self.cursor += 1;
        Ok((current, index))
    }

    fn kind_mismatch(&self, index: usize, expected: &'static str) -> ReconcileError {
        if let Some(found) = self.current.as_ref().and_then(|hooks| hooks.get(index)) {
            log::debug!(
                "{} hook #{index} was {} on the previous render",
                self.component,
                found.kind()
            );
        }
        ReconcileError::HookKindMismatch {
            component: self.component,
            index,
            expected,
        }
    }

    fn finish(self) -> Result<RenderedHooks, ReconcileError> {
        if let Some(current) = &self.current {
            if self.cursor != current.len() {
                return Err(ReconcileError::HookCountMismatch {
                    component: self.component,
                    previous: current.len(),
                    rendered: self.cursor,
                });
            }
        }
        Ok(RenderedHooks {
            hooks: self.hooks,
            effects: self.effects,
            flags: self.flags,
            skipped_lanes: self.skipped_lanes,
        })
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("component", &self.component)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<H: HostAdapter> Reconciler<H> {
    /// Renders a function component and stores its hooks on `wip`.
    pub(crate) fn render_with_hooks(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Component,
        props: &Props,
        render_lanes: Lanes,
    ) -> Result<Node, ReconcileError> {
        // A previous render with no hooks still puts the component in update
        // mode.
        let current_hooks = current.map(|c| self.fibers[c].memoized_state.hooks().unwrap_or_default());
        let mut hooks = Hooks::new(
            component.name(),
            wip,
            current_hooks,
            render_lanes,
            self.runtime.handle(),
        );
        let children = component.render(&mut hooks, props)?;
        let rendered = hooks.finish()?;

        let fiber = &mut self.fibers[wip];
        fiber.memoized_state = FiberState::Hooks(Rc::new(rendered.hooks));
        fiber.update_queue = FiberQueue::Effects(Rc::new(rendered.effects));
        fiber.flags |= rendered.flags;
        fiber.lanes |= rendered.skipped_lanes;
        Ok(children)
    }

    /// Applies every dispatch waiting in the runtime inbox.
    pub(crate) fn process_dispatches(&mut self) {
        while let Some(dispatch) = self.runtime.take_dispatch() {
            self.dispatch_set_state(dispatch);
        }
    }

    fn dispatch_set_state(&mut self, dispatch: PendingDispatch) {
        let PendingDispatch {
            fiber,
            lane,
            event_time,
            mut update,
        } = dispatch;
        let Some(target) = self.fibers.get(fiber) else {
            log::warn!("dropping state update for an unmounted component ({fiber:?})");
            return;
        };
        let lane = if lane.is_empty() {
            self.host.current_event_priority()
        } else {
            lane
        };
        update.set_lane(lane);

        let alternate_lanes = target
            .alternate
            .and_then(|alt| self.fibers.get(alt))
            .map_or(Lanes::NONE, |alt| alt.lanes);
        if target.lanes.is_empty() && alternate_lanes.is_empty() && update.eagerly_bails_out() {
            log::trace!("state update on {fiber:?} bailed out eagerly");
            return;
        }

        match self.enqueue_concurrent_hook_update(fiber, update, lane) {
            Some(root) => self.schedule_update_on_fiber(root, lane, event_time),
            None => log::warn!("state update on {fiber:?} has no mounted root"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_deps_compare_bitwise() {
        assert_eq!(Dep::Float(f64::NAN), Dep::Float(f64::NAN));
        assert_ne!(Dep::Float(0.0), Dep::Float(-0.0));
        assert_ne!(Dep::Int(1), Dep::Uint(1));
    }

    #[test]
    fn ptr_deps_follow_allocation() {
        let a = Rc::new(5);
        let b = Rc::new(5);
        assert_eq!(Dep::ptr(&a), Dep::ptr(&a.clone()));
        assert_ne!(Dep::ptr(&a), Dep::ptr(&b));
    }

    #[test]
    fn missing_previous_deps_never_match() {
        assert!(!are_hook_inputs_equal(&[Dep::Unit], None));
        assert!(are_hook_inputs_equal(&[], Some(&[])));
        assert!(!are_hook_inputs_equal(&[Dep::from(1)], Some(&[Dep::from(1), Dep::from(2)])));
        assert!(are_hook_inputs_equal(&[Dep::from("a")], Some(&[Dep::from("a")])));
    }

    #[test]
    fn effect_cleanup_is_shared_and_runs_once() {
        thread_local! {
            static CLEANUPS: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
        }
        let slot: DestroySlot = Rc::new(RefCell::new(None));
        let effect = Effect {
            tag: HookFlags::HAS_EFFECT | HookFlags::PASSIVE,
            create: RefCell::new(Some(Box::new(|| {
                Some(Box::new(|| CLEANUPS.with(|c| c.set(c.get() + 1))) as Cleanup)
            }) as EffectCreate)),
            destroy: Rc::clone(&slot),
            deps: None,
        };
        assert!(effect.must_run(HookFlags::PASSIVE));
        assert!(!effect.must_run(HookFlags::LAYOUT));
        effect.run_create();
        assert!(slot.borrow().is_some());
        effect.run_destroy();
        effect.run_destroy();
        assert_eq!(CLEANUPS.with(|c| c.get()), 1);
    }
}
