//! Child reconciliation.
//!
//! Diffs the children described by a render against the committed children
//! of the same fiber, reusing fibers whose key and type match. With side
//! effect tracking on, unmatched old children are recorded as deletions on
//! the parent and new or moved children get `Placement`. Tracking is off
//! while mounting a fresh subtree: the whole subtree is inserted at once by
//! its topmost placement.

use std::rc::Rc;

use crate::hash::Map;
use crate::element::{flatten_children, Element, Key, Node};
use crate::fiber::{Fiber, FiberId, FiberProps, WorkTag};
use crate::flags::Flags;
use crate::host::HostAdapter;
use crate::reconciler::Reconciler;

/// Identity used to match remaining old children in the map phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ChildKey {
    Key(Key),
    Index(usize),
}

impl ChildKey {
    fn of(key: Option<Key>, index: usize) -> Self {
        match key {
            Some(key) => ChildKey::Key(key),
            None => ChildKey::Index(index),
        }
    }
}

impl<H: HostAdapter> Reconciler<H> {
    /// Reconciles `new_child` against the list starting at `current_first`
    /// and returns the first new child.
    pub(crate) fn reconcile_child_fibers(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        new_child: &Node,
        track: bool,
    ) -> Option<FiberId> {
        match new_child {
            Node::Element(element) => {
                let fiber = self.reconcile_single_element(return_fiber, current_first, element, track);
                Some(self.place_single_child(fiber, track))
            }
            Node::Text(text) => {
                let fiber = self.reconcile_single_text(return_fiber, current_first, text, track);
                Some(self.place_single_child(fiber, track))
            }
            Node::List(items) => {
                let items = flatten_children(items);
                self.reconcile_children_array(return_fiber, current_first, &items, track)
            }
            Node::Empty => {
                self.delete_remaining_children(return_fiber, current_first, track);
                None
            }
        }
    }

    fn alloc_fresh(&mut self, fiber: Fiber<H>, return_fiber: FiberId) -> FiberId {
        let id = self.fibers.alloc(fiber);
        self.fibers[id].return_fiber = Some(return_fiber);
        self.work.fresh_fibers.push(id);
        id
    }

    fn use_fiber(&mut self, fiber: FiberId, props: FiberProps, return_fiber: FiberId) -> FiberId {
        let clone = self.fibers.create_work_in_progress(fiber, props);
        let wip = &mut self.fibers[clone];
        wip.index = 0;
        wip.sibling = None;
        wip.return_fiber = Some(return_fiber);
        clone
    }

    fn delete_child(&mut self, return_fiber: FiberId, child: FiberId, track: bool) {
        if !track {
            return;
        }
        let parent = &mut self.fibers[return_fiber];
        parent.deletions.push(child);
        parent.flags |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children(&mut self, return_fiber: FiberId, first: Option<FiberId>, track: bool) {
        if !track {
            return;
        }
        let mut child = first;
        while let Some(c) = child {
            self.delete_child(return_fiber, c, true);
            child = self.fibers[c].sibling;
        }
    }

    fn place_single_child(&mut self, fiber: FiberId, track: bool) -> FiberId {
        let new_fiber = &mut self.fibers[fiber];
        if track && new_fiber.alternate.is_none() {
            new_fiber.flags |= Flags::PLACEMENT;
        }
        fiber
    }

    fn place_child(&mut self, fiber: FiberId, last_placed_index: usize, new_index: usize, track: bool) -> usize {
        self.fibers[fiber].index = new_index;
        if !track {
            return last_placed_index;
        }
        let old_index = self.fibers[fiber].alternate.map(|current| self.fibers[current].index);
        let new_fiber = &mut self.fibers[fiber];
        match old_index {
            Some(old_index) if old_index < last_placed_index => {
                // Moved right.
                new_fiber.flags |= Flags::PLACEMENT;
                last_placed_index
            }
            Some(old_index) => old_index,
            None => {
                new_fiber.flags |= Flags::PLACEMENT;
                last_placed_index
            }
        }
    }

    fn reconcile_single_element(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        element: &Element,
        track: bool,
    ) -> FiberId {
        let mut child = current_first;
        while let Some(c) = child {
            if self.fibers[c].key == element.key {
                if self.fibers[c].ty.matches(&element.ty) {
                    let rest = self.fibers[c].sibling;
                    self.delete_remaining_children(return_fiber, rest, track);
                    return self.use_fiber(c, FiberProps::Props(Rc::clone(&element.props)), return_fiber);
                }
                self.delete_remaining_children(return_fiber, Some(c), track);
                break;
            }
            self.delete_child(return_fiber, c, track);
            child = self.fibers[c].sibling;
        }
        self.alloc_fresh(Fiber::from_element(element), return_fiber)
    }

    fn reconcile_single_text(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        text: &Rc<str>,
        track: bool,
    ) -> FiberId {
        if let Some(c) = current_first.filter(|c| self.fibers[*c].tag == WorkTag::HostText) {
            let rest = self.fibers[c].sibling;
            self.delete_remaining_children(return_fiber, rest, track);
            return self.use_fiber(c, FiberProps::Text(Rc::clone(text)), return_fiber);
        }
        self.delete_remaining_children(return_fiber, current_first, track);
        self.alloc_fresh(Fiber::from_text(text), return_fiber)
    }

    fn update_text_node(&mut self, return_fiber: FiberId, current: Option<FiberId>, text: &Rc<str>) -> FiberId {
        match current.filter(|c| self.fibers[*c].tag == WorkTag::HostText) {
            Some(c) => self.use_fiber(c, FiberProps::Text(Rc::clone(text)), return_fiber),
            None => self.alloc_fresh(Fiber::from_text(text), return_fiber),
        }
    }

    fn update_element(&mut self, return_fiber: FiberId, current: Option<FiberId>, element: &Element) -> FiberId {
        match current.filter(|c| self.fibers[*c].ty.matches(&element.ty)) {
            Some(c) => self.use_fiber(c, FiberProps::Props(Rc::clone(&element.props)), return_fiber),
            None => self.alloc_fresh(Fiber::from_element(element), return_fiber),
        }
    }

    fn create_child(&mut self, return_fiber: FiberId, node: &Node) -> Option<FiberId> {
        match node {
            Node::Text(text) => Some(self.alloc_fresh(Fiber::from_text(text), return_fiber)),
            Node::Element(element) => Some(self.alloc_fresh(Fiber::from_element(element), return_fiber)),
            Node::Empty | Node::List(_) => None,
        }
    }

    /// Updates `old` in place when `node` occupies the same slot, or
    /// returns `None` when the keys disagree.
    fn update_slot(&mut self, return_fiber: FiberId, old: Option<FiberId>, node: &Node) -> Option<FiberId> {
        let key = old.and_then(|old| self.fibers[old].key);
        match node {
            Node::Text(text) => {
                if key.is_some() {
                    return None;
                }
                Some(self.update_text_node(return_fiber, old, text))
            }
            Node::Element(element) => {
                if element.key != key {
                    return None;
                }
                Some(self.update_element(return_fiber, old, element))
            }
            Node::Empty | Node::List(_) => None,
        }
    }

    fn map_remaining_children(&self, first: Option<FiberId>) -> Map<ChildKey, FiberId> {
        let mut existing = Map::default();
        let mut child = first;
        while let Some(c) = child {
            let fiber = &self.fibers[c];
            existing.insert(ChildKey::of(fiber.key, fiber.index), c);
            child = fiber.sibling;
        }
        existing
    }

    fn update_from_map(
        &mut self,
        existing: &Map<ChildKey, FiberId>,
        return_fiber: FiberId,
        new_index: usize,
        node: &Node,
    ) -> Option<FiberId> {
        match node {
            Node::Text(text) => {
                let matched = existing.get(&ChildKey::Index(new_index)).copied();
                Some(self.update_text_node(return_fiber, matched, text))
            }
            Node::Element(element) => {
                let matched = existing.get(&ChildKey::of(element.key, new_index)).copied();
                Some(self.update_element(return_fiber, matched, element))
            }
            Node::Empty | Node::List(_) => None,
        }
    }

    fn link_sibling(&mut self, first: &mut Option<FiberId>, previous: &mut Option<FiberId>, fiber: FiberId) {
        match *previous {
            None => *first = Some(fiber),
            Some(prev) => self.fibers[prev].sibling = Some(fiber),
        }
        *previous = Some(fiber);
    }

    fn reconcile_children_array(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        items: &[&Node],
        track: bool,
    ) -> Option<FiberId> {
        let mut first_new: Option<FiberId> = None;
        let mut previous_new: Option<FiberId> = None;
        let mut old_fiber = current_first;
        let mut last_placed_index = 0;
        let mut new_index = 0;
        let mut next_old: Option<FiberId> = None;

        // Walk both lists in order while the slots line up.
        while let Some(old) = old_fiber {
            if new_index >= items.len() {
                break;
            }
            let slot_old = if self.fibers[old].index > new_index {
                next_old = Some(old);
                None
            } else {
                next_old = self.fibers[old].sibling;
                Some(old)
            };
            let Some(new_fiber) = self.update_slot(return_fiber, slot_old, items[new_index]) else {
                if slot_old.is_none() {
                    old_fiber = next_old;
                }
                break;
            };
            if track {
                if let Some(old) = slot_old {
                    if self.fibers[new_fiber].alternate.is_none() {
                        // Slot matched but the old fiber could not be reused.
                        self.delete_child(return_fiber, old, true);
                    }
                }
            }
            last_placed_index = self.place_child(new_fiber, last_placed_index, new_index, track);
            self.link_sibling(&mut first_new, &mut previous_new, new_fiber);
            old_fiber = next_old;
            new_index += 1;
        }

        if new_index == items.len() {
            self.delete_remaining_children(return_fiber, old_fiber, track);
            return first_new;
        }

        if old_fiber.is_none() {
            for (index, node) in items.iter().enumerate().skip(new_index) {
                let Some(new_fiber) = self.create_child(return_fiber, node) else {
                    continue;
                };
                last_placed_index = self.place_child(new_fiber, last_placed_index, index, track);
                self.link_sibling(&mut first_new, &mut previous_new, new_fiber);
            }
            return first_new;
        }

        let mut existing = self.map_remaining_children(old_fiber);
        for (index, node) in items.iter().enumerate().skip(new_index) {
            let Some(new_fiber) = self.update_from_map(&existing, return_fiber, index, node) else {
                continue;
            };
            if track && self.fibers[new_fiber].alternate.is_some() {
                let reused = &self.fibers[new_fiber];
                existing.remove(&ChildKey::of(reused.key, index));
            }
            last_placed_index = self.place_child(new_fiber, last_placed_index, index, track);
            self.link_sibling(&mut first_new, &mut previous_new, new_fiber);
        }

        if track {
            let mut leftovers: Vec<FiberId> = existing.into_values().collect();
            leftovers.sort_by_key(|id| self.fibers[*id].index);
            for child in leftovers {
                self.delete_child(return_fiber, child, true);
            }
        }
        first_new
    }
}
