//! Update queue used by host roots.
//!
//! Pending updates land in a queue shared by both twins of a fiber. A render
//! moves them into the base list and processes the list once, skipping the
//! ones whose lane is not being rendered. Skipped updates, and every update
//! after the first skipped one, stay in the base list so a later render can
//! replay them in their original order.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::lane::{Lane, Lanes};

/// How an update derives the next state.
pub enum UpdatePayload<S> {
    Replace(S),
    Transform(Rc<dyn Fn(&S) -> S>),
}

impl<S: Clone> UpdatePayload<S> {
    fn apply(&self, prev: &S) -> S {
        match self {
            UpdatePayload::Replace(next) => next.clone(),
            UpdatePayload::Transform(f) => f(prev),
        }
    }
}

impl<S: Clone> Clone for UpdatePayload<S> {
    fn clone(&self) -> Self {
        match self {
            UpdatePayload::Replace(value) => UpdatePayload::Replace(value.clone()),
            UpdatePayload::Transform(f) => UpdatePayload::Transform(Rc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for UpdatePayload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePayload::Replace(_) => f.write_str("Replace(..)"),
            UpdatePayload::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Update<S> {
    pub(crate) lane: Lane,
    pub(crate) payload: UpdatePayload<S>,
}

/// Updates enqueued since the last render, shared by both twins.
pub(crate) struct SharedQueue<S> {
    pending: RefCell<Vec<Update<S>>>, // FUTURE(no_std): ring buffer.
}

impl<S> SharedQueue<S> {
    pub(crate) fn new() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, update: Update<S>) {
        self.pending.borrow_mut().push(update);
    }

    pub(crate) fn take(&self) -> Vec<Update<S>> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

pub(crate) struct Processed<S> {
    pub(crate) state: S,
    pub(crate) skipped_lanes: Lanes,
}

pub(crate) struct UpdateQueue<S> {
    pub(crate) base_state: S,
    pub(crate) base_updates: Vec<Update<S>>,
    pub(crate) shared: Rc<SharedQueue<S>>,
}

impl<S: Clone> Clone for UpdateQueue<S> {
    fn clone(&self) -> Self {
        Self {
            base_state: self.base_state.clone(),
            base_updates: self.base_updates.clone(),
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S: Clone> UpdateQueue<S> {
    pub(crate) fn new(base_state: S) -> Self {
        Self {
            base_state,
            base_updates: Vec::new(),
            shared: Rc::new(SharedQueue::new()),
        }
    }

    /// Applies the base list for `render_lanes`.
    ///
    /// Returns `None` when there was nothing to process, in which case the
    /// memoized state is unchanged.
    pub(crate) fn process(&mut self, render_lanes: Lanes) -> Option<Processed<S>> {
        if self.base_updates.is_empty() {
            return None;
        }
        let updates = std::mem::take(&mut self.base_updates);
        let mut new_state = self.base_state.clone();
        let mut new_base_state = None;
        let mut skipped_lanes = Lanes::NONE;

        for update in updates {
            if !render_lanes.is_superset_of(update.lane) {
                if self.base_updates.is_empty() {
                    new_base_state = Some(new_state.clone());
                }
                skipped_lanes |= update.lane;
                self.base_updates.push(update);
                continue;
            }
            if !self.base_updates.is_empty() {
                // Already rendered in this lane; replay it after the skipped one.
                self.base_updates.push(Update {
                    lane: Lanes::NONE,
                    payload: update.payload.clone(),
                });
            }
            new_state = update.payload.apply(&new_state);
        }

        self.base_state = new_base_state.unwrap_or_else(|| new_state.clone());
        Some(Processed {
            state: new_state,
            skipped_lanes,
        })
    }
}
