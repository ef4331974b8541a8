//! Commit phase: applying a finished tree to the host and running effects.

use std::rc::Rc;

use crate::element::HostRef;
use crate::error::ReconcileError;
use crate::fiber::{FiberId, FiberQueue, WorkTag};
use crate::flags::{Flags, HookFlags};
use crate::host::HostAdapter;
use crate::reconciler::Reconciler;
use crate::root::RootId;

/// Where a host node gets inserted.
enum HostParent<I> {
    Instance(I),
    Container,
}

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn commit_mutation_effects(&mut self, root: RootId, finished: FiberId) -> Result<(), ReconcileError> {
        let deletions = std::mem::take(&mut self.fibers[finished].deletions);
        for deleted in deletions {
            self.commit_deletion(root, finished, deleted)?;
        }

        if self.fibers[finished].subtree_flags.intersects(Flags::MUTATION_MASK) {
            let mut child = self.fibers[finished].child;
            while let Some(c) = child {
                self.commit_mutation_effects(root, c)?;
                child = self.fibers[c].sibling;
            }
        }

        let flags = self.fibers[finished].flags;
        if flags.contains(Flags::REF) {
            let previous = self.fibers[finished].alternate.and_then(|current| self.host_ref_of(current));
            if let Some(previous) = previous {
                previous.detach();
            }
        }
        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(root, finished)?;
            self.fibers[finished].flags.remove(Flags::PLACEMENT);
        }
        if flags.contains(Flags::UPDATE) {
            match self.fibers[finished].tag {
                WorkTag::HostComponent => self.commit_host_update(finished)?,
                WorkTag::HostText => self.commit_host_text_update(finished)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn host_ref_of(&self, fiber: FiberId) -> Option<HostRef> {
        self.fibers.get(fiber)?.memoized_props.props()?.host_ref().cloned()
    }

    fn commit_host_update(&mut self, finished: FiberId) -> Result<(), ReconcileError> {
        let fiber = &mut self.fibers[finished];
        let FiberQueue::HostUpdate(payload) = std::mem::replace(&mut fiber.update_queue, FiberQueue::Empty) else {
            return Ok(());
        };
        let Some(instance) = fiber.state_node.instance().cloned() else {
            return Ok(());
        };
        let ty: Rc<str> = fiber.ty.host_type().into();
        let new_props = fiber.memoized_props.props().cloned().unwrap_or_default();
        let old_props = fiber
            .alternate
            .and_then(|current| self.fibers[current].memoized_props.props().cloned())
            .unwrap_or_default();
        self.host
            .commit_update(&instance, payload, &ty, &old_props, &new_props)?;
        Ok(())
    }

    fn commit_host_text_update(&mut self, finished: FiberId) -> Result<(), ReconcileError> {
        let fiber = &self.fibers[finished];
        let Some(instance) = fiber.state_node.instance().cloned() else {
            return Ok(());
        };
        let new_text = fiber.memoized_props.text().cloned().unwrap_or_else(|| "".into());
        let old_text = fiber
            .alternate
            .and_then(|current| self.fibers[current].memoized_props.text().cloned())
            .unwrap_or_else(|| "".into());
        self.host.commit_text_update(&instance, &old_text, &new_text)?;
        Ok(())
    }

    /// Nearest host parent, starting at `start` itself.
    fn nearest_host_parent(&self, start: Option<FiberId>) -> HostParent<H::Instance> {
        let mut node = start;
        while let Some(id) = node {
            let fiber = &self.fibers[id];
            match fiber.tag {
                WorkTag::HostComponent => {
                    if let Some(instance) = fiber.state_node.instance() {
                        return HostParent::Instance(instance.clone());
                    }
                }
                WorkTag::HostRoot => return HostParent::Container,
                _ => {}
            }
            node = fiber.return_fiber;
        }
        HostParent::Container
    }

    /// The host node `fiber` must be inserted before: the first following
    /// host node in tree order that is not itself being placed.
    fn host_sibling(&self, fiber: FiberId) -> Option<H::Instance> {
        let mut node = fiber;
        'siblings: loop {
            while self.fibers[node].sibling.is_none() {
                match self.fibers[node].return_fiber {
                    Some(parent) if !self.fibers[parent].is_host_parent() => node = parent,
                    _ => return None,
                }
            }
            node = self.fibers[node].sibling?;

            while !self.fibers[node].is_host() {
                if self.fibers[node].flags.contains(Flags::PLACEMENT) {
                    continue 'siblings;
                }
                match self.fibers[node].child {
                    Some(child) => node = child,
                    None => continue 'siblings,
                }
            }

            let candidate = &self.fibers[node];
            if !candidate.flags.contains(Flags::PLACEMENT) {
                return candidate.state_node.instance().cloned();
            }
        }
    }

    fn commit_placement(&mut self, root: RootId, fiber: FiberId) -> Result<(), ReconcileError> {
        let parent = self.nearest_host_parent(self.fibers[fiber].return_fiber);
        let before = self.host_sibling(fiber);
        self.insert_or_append_placement_node(root, fiber, before.as_ref(), &parent)
    }

    fn insert_or_append_placement_node(
        &mut self,
        root: RootId,
        node: FiberId,
        before: Option<&H::Instance>,
        parent: &HostParent<H::Instance>,
    ) -> Result<(), ReconcileError> {
        let fiber = &self.fibers[node];
        if fiber.is_host() {
            let Some(child) = fiber.state_node.instance().cloned() else {
                return Ok(());
            };
            let container = &self.roots[root.index()].container;
            match (parent, before) {
                (HostParent::Instance(p), Some(b)) => self.host.insert_before(p, &child, b)?,
                (HostParent::Instance(p), None) => self.host.append_child(p, &child)?,
                (HostParent::Container, Some(b)) => self.host.insert_in_container_before(container, &child, b)?,
                (HostParent::Container, None) => self.host.append_child_to_container(container, &child)?,
            }
            return Ok(());
        }
        let mut child = fiber.child;
        while let Some(c) = child {
            self.insert_or_append_placement_node(root, c, before, parent)?;
            child = self.fibers[c].sibling;
        }
        Ok(())
    }

    /// Detaches a deleted subtree from the host and tears down its effects.
    fn commit_deletion(&mut self, root: RootId, return_fiber: FiberId, deleted: FiberId) -> Result<(), ReconcileError> {
        let parent = self.nearest_host_parent(Some(return_fiber));
        self.commit_deletion_effects_on_fiber(root, &parent, deleted, true)?;
        self.work.deleted_fibers.push(deleted);
        Ok(())
    }

    fn commit_deletion_effects_on_fiber(
        &mut self,
        root: RootId,
        parent: &HostParent<H::Instance>,
        fiber: FiberId,
        remove_host: bool,
    ) -> Result<(), ReconcileError> {
        match self.fibers[fiber].tag {
            WorkTag::HostComponent | WorkTag::HostText => {
                if let Some(host_ref) = self.host_ref_of(fiber) {
                    host_ref.detach();
                }
                // Nested host nodes leave with this one.
                self.commit_deletion_children(root, parent, fiber, false)?;
                if remove_host {
                    if let Some(instance) = self.fibers[fiber].state_node.instance().cloned() {
                        let container = &self.roots[root.index()].container;
                        match parent {
                            HostParent::Instance(p) => self.host.remove_child(p, &instance)?,
                            HostParent::Container => self.host.remove_child_from_container(container, &instance)?,
                        }
                    }
                }
            }
            WorkTag::FunctionComponent => {
                if let Some(effects) = self.fibers[fiber].update_queue.effects() {
                    for effect in effects.iter() {
                        if effect.tag.contains(HookFlags::LAYOUT) {
                            effect.run_destroy();
                        } else if effect.tag.contains(HookFlags::PASSIVE) {
                            self.roots[root.index()]
                                .pending_passive_unmounts
                                .push(Rc::clone(&effect.destroy));
                        }
                    }
                }
                self.commit_deletion_children(root, parent, fiber, remove_host)?;
            }
            WorkTag::IndeterminateComponent | WorkTag::HostRoot => {
                self.commit_deletion_children(root, parent, fiber, remove_host)?;
            }
        }
        Ok(())
    }

    fn commit_deletion_children(
        &mut self,
        root: RootId,
        parent: &HostParent<H::Instance>,
        fiber: FiberId,
        remove_host: bool,
    ) -> Result<(), ReconcileError> {
        let mut child = self.fibers[fiber].child;
        while let Some(c) = child {
            self.commit_deletion_effects_on_fiber(root, parent, c, remove_host)?;
            child = self.fibers[c].sibling;
        }
        Ok(())
    }

    /// Function fibers under `root` carrying `mask`, children before parents.
    fn effect_fibers(&self, root: FiberId, mask: Flags) -> Vec<FiberId> {
        let mut out = Vec::new();
        self.collect_effect_fibers(root, mask, &mut out);
        out
    }

    fn collect_effect_fibers(&self, node: FiberId, mask: Flags, out: &mut Vec<FiberId>) {
        let fiber = &self.fibers[node];
        if fiber.subtree_flags.intersects(mask) {
            let mut child = fiber.child;
            while let Some(c) = child {
                self.collect_effect_fibers(c, mask, out);
                child = self.fibers[c].sibling;
            }
        }
        if fiber.tag == WorkTag::FunctionComponent && fiber.flags.intersects(mask) {
            out.push(node);
        }
    }

    fn run_effects(&self, fibers: &[FiberId], timing: HookFlags, create: bool) {
        for id in fibers {
            let Some(effects) = self.fibers[*id].update_queue.effects() else {
                continue;
            };
            for effect in effects.iter().filter(|e| e.must_run(timing)) {
                if create {
                    effect.run_create();
                } else {
                    effect.run_destroy();
                }
            }
        }
    }

    /// Layout effects: every teardown first, then host refs, then every
    /// setup.
    pub(crate) fn commit_layout_effects(&mut self, finished: FiberId) {
        let fibers = self.effect_fibers(finished, Flags::LAYOUT_MASK);
        self.run_effects(&fibers, HookFlags::LAYOUT, false);
        self.attach_refs(finished);
        self.run_effects(&fibers, HookFlags::LAYOUT, true);
    }

    fn attach_refs(&mut self, node: FiberId) {
        let fiber = &self.fibers[node];
        if fiber.subtree_flags.contains(Flags::REF) {
            let mut child = fiber.child;
            while let Some(c) = child {
                self.attach_refs(c);
                child = self.fibers[c].sibling;
            }
        }
        let fiber = &mut self.fibers[node];
        if fiber.tag != WorkTag::HostComponent || !fiber.flags.contains(Flags::REF) {
            return;
        }
        fiber.flags.remove(Flags::REF);
        let instance = fiber.state_node.instance().cloned();
        if let (Some(host_ref), Some(instance)) = (self.host_ref_of(node), instance) {
            host_ref.attach(instance);
        }
    }

    /// Runs the passive teardowns of deleted subtrees, then the passive
    /// teardowns and setups of the committed tree.
    pub(crate) fn commit_passive_effects(&mut self, root: RootId) {
        let root_state = &mut self.roots[root.index()];
        let unmounts = std::mem::take(&mut root_state.pending_passive_unmounts);
        let current = root_state.current;
        for slot in unmounts {
            let destroy = slot.borrow_mut().take();
            if let Some(destroy) = destroy {
                destroy();
            }
        }
        let fibers = self.effect_fibers(current, Flags::PASSIVE);
        self.run_effects(&fibers, HookFlags::PASSIVE, false);
        self.run_effects(&fibers, HookFlags::PASSIVE, true);
    }
}
