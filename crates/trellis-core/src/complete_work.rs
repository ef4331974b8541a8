use std::rc::Rc;

use crate::error::ReconcileError;
use crate::fiber::{FiberId, FiberQueue, StateNode, WorkTag};
use crate::flags::Flags;
use crate::host::HostAdapter;
use crate::lane::Lanes;
use crate::reconciler::Reconciler;

impl<H: HostAdapter> Reconciler<H> {
    /// Creates or diffs the host instance of a finished fiber and folds its
    /// children's flags and lanes into it.
    pub(crate) fn complete_work(&mut self, current: Option<FiberId>, wip: FiberId) -> Result<(), ReconcileError> {
        match self.fibers[wip].tag {
            WorkTag::HostComponent => self.complete_host_component(current, wip)?,
            WorkTag::HostText => self.complete_host_text(current, wip)?,
            WorkTag::HostRoot | WorkTag::FunctionComponent | WorkTag::IndeterminateComponent => {}
        }
        self.bubble_properties(wip);
        Ok(())
    }

    fn complete_host_component(&mut self, current: Option<FiberId>, wip: FiberId) -> Result<(), ReconcileError> {
        let fiber = &self.fibers[wip];
        let ty: Rc<str> = fiber.ty.host_type().into();
        let new_props = fiber.pending_props.props().cloned().unwrap_or_default();
        let existing = fiber.state_node.instance().cloned();

        match (current, existing) {
            (Some(current), Some(instance)) => {
                let old_props = self.fibers[current]
                    .memoized_props
                    .props()
                    .cloned()
                    .unwrap_or_default();
                if old_props.host_ref() != new_props.host_ref() {
                    self.fibers[wip].flags |= Flags::REF;
                }
                if Rc::ptr_eq(&old_props, &new_props) {
                    return Ok(());
                }
                if let Some(payload) = self.host.prepare_update(&instance, &ty, &old_props, &new_props) {
                    let fiber = &mut self.fibers[wip];
                    fiber.update_queue = FiberQueue::HostUpdate(payload);
                    fiber.flags |= Flags::UPDATE;
                }
            }
            _ => {
                let instance = self.host.create_instance(&ty, &new_props)?;
                self.append_all_children(&instance, wip)?;
                self.fibers[wip].state_node = StateNode::Instance(instance.clone());
                self.host.finalize_initial_children(&instance, &ty, &new_props)?;
                if new_props.host_ref().is_some() {
                    self.fibers[wip].flags |= Flags::REF;
                }
            }
        }
        Ok(())
    }

    fn complete_host_text(&mut self, current: Option<FiberId>, wip: FiberId) -> Result<(), ReconcileError> {
        let fiber = &self.fibers[wip];
        let new_text = fiber.pending_props.text().cloned().unwrap_or_else(|| "".into());
        match (current, fiber.state_node.instance().is_some()) {
            (Some(current), true) => {
                let changed = self.fibers[current].memoized_props.text() != Some(&new_text);
                if changed {
                    self.fibers[wip].flags |= Flags::UPDATE;
                }
            }
            _ => {
                let instance = self.host.create_text_instance(&new_text)?;
                self.fibers[wip].state_node = StateNode::Instance(instance);
            }
        }
        Ok(())
    }

    /// Attaches the nearest host descendants of `wip` to a freshly created
    /// instance, skipping through component fibers.
    fn append_all_children(&mut self, parent: &H::Instance, wip: FiberId) -> Result<(), ReconcileError> {
        let mut node = self.fibers[wip].child;
        while let Some(id) = node {
            let fiber = &self.fibers[id];
            if fiber.is_host() {
                if let Some(child) = fiber.state_node.instance().cloned() {
                    self.host.append_initial_child(parent, &child)?;
                }
            } else if let Some(child) = fiber.child {
                node = Some(child);
                continue;
            }

            let mut cursor = id;
            loop {
                if cursor == wip {
                    return Ok(());
                }
                if let Some(sibling) = self.fibers[cursor].sibling {
                    node = Some(sibling);
                    break;
                }
                match self.fibers[cursor].return_fiber {
                    Some(parent_fiber) if parent_fiber != wip => cursor = parent_fiber,
                    _ => return Ok(()),
                }
            }
        }
        Ok(())
    }

    fn bubble_properties(&mut self, wip: FiberId) {
        let mut child_lanes = Lanes::NONE;
        let mut subtree_flags = Flags::empty();
        let mut child = self.fibers[wip].child;
        while let Some(c) = child {
            let fiber = &self.fibers[c];
            child_lanes |= fiber.lanes | fiber.child_lanes;
            subtree_flags |= fiber.subtree_flags | fiber.flags;
            child = fiber.sibling;
        }
        let fiber = &mut self.fibers[wip];
        fiber.subtree_flags |= subtree_flags;
        fiber.child_lanes = child_lanes;
    }
}
