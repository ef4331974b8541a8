//! Minimal host used by unit tests: a flat arena of nodes and an op log.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::element::Props;
use crate::error::HostError;
use crate::host::HostAdapter;
use crate::lane::{Lane, Lanes, Millis};
use crate::platform::Clock;
use crate::reconciler::Reconciler;
use crate::runtime::{DefaultScheduler, Runtime};

#[derive(Debug, Default)]
pub(crate) struct Node {
    pub(crate) ty: String,
    pub(crate) text: String,
    pub(crate) children: Vec<usize>,
}

#[derive(Default)]
pub(crate) struct TestHost {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root_children: Vec<usize>,
    pub(crate) ops: Vec<String>,
    pub(crate) priority: Cell<Lane>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        let host = Self::default();
        host.priority.set(Lanes::DEFAULT);
        host
    }

    pub(crate) fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.root_children {
            self.collect_text(*child, &mut out);
        }
        out
    }

    fn collect_text(&self, id: usize, out: &mut String) {
        let node = &self.nodes[id];
        out.push_str(&node.text);
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    fn node_mut(&mut self, id: usize) -> Result<&mut Node, HostError> {
        self.nodes.get_mut(id).ok_or(HostError::Missing { id })
    }

    fn insert(list: &mut Vec<usize>, child: usize, before: Option<usize>) {
        list.retain(|c| *c != child);
        match before.and_then(|b| list.iter().position(|c| *c == b)) {
            Some(index) => list.insert(index, child),
            None => list.push(child),
        }
    }
}

impl HostAdapter for TestHost {
    type Instance = usize;
    type Container = ();
    type UpdatePayload = String;

    fn create_instance(&mut self, ty: &str, props: &Props) -> Result<usize, HostError> {
        self.nodes.push(Node {
            ty: ty.to_string(),
            text: props.text_content().unwrap_or_default().to_string(),
            children: Vec::new(),
        });
        Ok(self.nodes.len() - 1)
    }

    fn create_text_instance(&mut self, text: &str) -> Result<usize, HostError> {
        self.nodes.push(Node {
            ty: "#text".to_string(),
            text: text.to_string(),
            children: Vec::new(),
        });
        Ok(self.nodes.len() - 1)
    }

    fn append_initial_child(&mut self, parent: &usize, child: &usize) -> Result<(), HostError> {
        self.node_mut(*parent)?.children.push(*child);
        Ok(())
    }

    fn finalize_initial_children(&mut self, _: &usize, _: &str, _: &Props) -> Result<(), HostError> {
        Ok(())
    }

    fn prepare_update(&self, _: &usize, _: &str, old: &Props, new: &Props) -> Option<String> {
        let text = new.text_content().unwrap_or_default();
        (old.text_content().unwrap_or_default() != text).then(|| text.to_string())
    }

    fn should_set_text_content(&self, _: &str, props: &Props) -> bool {
        props.text_content().is_some()
    }

    fn current_event_priority(&self) -> Lane {
        self.priority.get()
    }

    fn append_child(&mut self, parent: &usize, child: &usize) -> Result<(), HostError> {
        self.ops.push(format!("append {child} to {parent}"));
        Self::insert(&mut self.node_mut(*parent)?.children, *child, None);
        Ok(())
    }

    fn append_child_to_container(&mut self, _: &(), child: &usize) -> Result<(), HostError> {
        self.ops.push(format!("append {child} to root"));
        Self::insert(&mut self.root_children, *child, None);
        Ok(())
    }

    fn insert_before(&mut self, parent: &usize, child: &usize, before: &usize) -> Result<(), HostError> {
        self.ops.push(format!("insert {child} before {before}"));
        Self::insert(&mut self.node_mut(*parent)?.children, *child, Some(*before));
        Ok(())
    }

    fn insert_in_container_before(&mut self, _: &(), child: &usize, before: &usize) -> Result<(), HostError> {
        self.ops.push(format!("insert {child} before {before}"));
        Self::insert(&mut self.root_children, *child, Some(*before));
        Ok(())
    }

    fn remove_child(&mut self, parent: &usize, child: &usize) -> Result<(), HostError> {
        self.ops.push(format!("remove {child}"));
        self.node_mut(*parent)?.children.retain(|c| c != child);
        Ok(())
    }

    fn remove_child_from_container(&mut self, _: &(), child: &usize) -> Result<(), HostError> {
        self.ops.push(format!("remove {child}"));
        self.root_children.retain(|c| c != child);
        Ok(())
    }

    fn commit_update(&mut self, instance: &usize, payload: String, _: &str, _: &Props, _: &Props) -> Result<(), HostError> {
        self.ops.push(format!("update {instance}"));
        self.node_mut(*instance)?.text = payload;
        Ok(())
    }

    fn commit_text_update(&mut self, instance: &usize, _: &str, new_text: &str) -> Result<(), HostError> {
        self.ops.push(format!("text {instance}"));
        self.node_mut(*instance)?.text = new_text.to_string();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct TestClock(AtomicU64);

impl TestClock {
    pub(crate) fn advance(&self, ms: Millis) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Millis {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) fn reconciler() -> (Reconciler<TestHost>, Arc<TestClock>) {
    let clock = Arc::new(TestClock::default());
    let runtime = Runtime::new(Arc::new(DefaultScheduler), clock.clone());
    (Reconciler::new(TestHost::new(), runtime), clock)
}
