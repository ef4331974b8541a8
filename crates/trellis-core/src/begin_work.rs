use std::rc::Rc;

use crate::element::{Node, Props};
use crate::error::ReconcileError;
use crate::fiber::{FiberId, FiberQueue, FiberState, FiberType, WorkTag};
use crate::host::HostAdapter;
use crate::lane::Lanes;
use crate::reconciler::Reconciler;

impl<H: HostAdapter> Reconciler<H> {
    /// Renders one fiber and reconciles its children. Returns the first
    /// child to work on next, if any.
    pub(crate) fn begin_work(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_lanes: Lanes,
    ) -> Result<Option<FiberId>, ReconcileError> {
        self.fibers[wip].lanes = Lanes::NONE;
        match self.fibers[wip].tag {
            WorkTag::IndeterminateComponent => self.mount_indeterminate_component(wip, render_lanes),
            WorkTag::FunctionComponent => self.update_function_component(current, wip, render_lanes),
            WorkTag::HostRoot => self.update_host_root(current, wip, render_lanes),
            WorkTag::HostComponent => Ok(self.update_host_component(current, wip)),
            WorkTag::HostText => Ok(None),
        }
    }

    fn component_and_props(&self, wip: FiberId) -> Option<(crate::element::Component, Rc<Props>)> {
        let fiber = &self.fibers[wip];
        let FiberType::Component(component) = &fiber.ty else {
            return None;
        };
        let props = fiber.pending_props.props().cloned().unwrap_or_default();
        Some((component.clone(), props))
    }

    fn mount_indeterminate_component(
        &mut self,
        wip: FiberId,
        render_lanes: Lanes,
    ) -> Result<Option<FiberId>, ReconcileError> {
        let Some((component, props)) = self.component_and_props(wip) else {
            return Ok(None);
        };
        let children = self.render_with_hooks(None, wip, &component, &props, render_lanes)?;
        self.fibers[wip].tag = WorkTag::FunctionComponent;
        Ok(self.reconcile_children(None, wip, &children))
    }

    fn update_function_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_lanes: Lanes,
    ) -> Result<Option<FiberId>, ReconcileError> {
        let Some((component, props)) = self.component_and_props(wip) else {
            return Ok(None);
        };
        let children = self.render_with_hooks(current, wip, &component, &props, render_lanes)?;
        Ok(self.reconcile_children(current, wip, &children))
    }

    fn update_host_root(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_lanes: Lanes,
    ) -> Result<Option<FiberId>, ReconcileError> {
        let pending = match &self.fibers[wip].update_queue {
            FiberQueue::Root(queue) => queue.shared.take(),
            _ => Vec::new(),
        };
        if !pending.is_empty() {
            // Keep the committed twin's base list in step so an abandoned
            // render does not lose these updates.
            if let Some(current) = current {
                if let FiberQueue::Root(queue) = &mut self.fibers[current].update_queue {
                    queue.base_updates.extend(pending.iter().cloned());
                }
            }
            if let FiberQueue::Root(queue) = &mut self.fibers[wip].update_queue {
                queue.base_updates.extend(pending);
            }
        }

        let processed = match &mut self.fibers[wip].update_queue {
            FiberQueue::Root(queue) => queue.process(render_lanes),
            _ => None,
        };
        let fiber = &mut self.fibers[wip];
        if let Some(processed) = processed {
            fiber.memoized_state = FiberState::Root(processed.state);
            fiber.lanes |= processed.skipped_lanes;
        }
        let element = match &fiber.memoized_state {
            FiberState::Root(state) => state.element.clone(),
            _ => Node::Empty,
        };
        Ok(self.reconcile_children(current, wip, &element))
    }

    fn update_host_component(&mut self, current: Option<FiberId>, wip: FiberId) -> Option<FiberId> {
        let fiber = &self.fibers[wip];
        let props = fiber.pending_props.props().cloned().unwrap_or_default();
        let next_children = if self.host.should_set_text_content(fiber.ty.host_type(), &props) {
            // The host renders the text itself; no text fiber.
            Node::Empty
        } else {
            props.children_node()
        };
        self.reconcile_children(current, wip, &next_children)
    }

    fn reconcile_children(&mut self, current: Option<FiberId>, wip: FiberId, next_children: &Node) -> Option<FiberId> {
        let child = match current {
            None => self.reconcile_child_fibers(wip, None, next_children, false),
            Some(current) => {
                let current_child = self.fibers[current].child;
                self.reconcile_child_fibers(wip, current_child, next_children, true)
            }
        };
        self.fibers[wip].child = child;
        child
    }
}
