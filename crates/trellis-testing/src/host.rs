//! In-memory host tree.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use trellis_core::{
    HostAdapter, HostError, Lane, PropValue, Props, DEFAULT_EVENT_PRIORITY,
};

pub type NodeId = usize;

/// Identifies one container (a mount point) inside a [`MemoryHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub usize);

/// Attribute changes computed by `prepare_update`. `None` means removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropsDiff {
    pub attributes: IndexMap<Rc<str>, Option<PropValue>>,
    pub text: Option<String>,
}

impl PropsDiff {
    fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.text.is_none()
    }
}

/// One mutation applied to the host, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    Create { id: NodeId, ty: String },
    CreateText { id: NodeId, text: String },
    AppendInitial { parent: NodeId, child: NodeId },
    Append { parent: Option<NodeId>, child: NodeId },
    InsertBefore { parent: Option<NodeId>, child: NodeId, before: NodeId },
    Remove { parent: Option<NodeId>, child: NodeId },
    Update { id: NodeId },
    TextUpdate { id: NodeId, text: String },
}

impl fmt::Display for HostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent_name = |parent: &Option<NodeId>| match parent {
            Some(id) => format!("#{id}"),
            None => "container".to_string(),
        };
        match self {
            HostOp::Create { id, ty } => write!(f, "create #{id} <{ty}>"),
            HostOp::CreateText { id, text } => write!(f, "create #{id} {text:?}"),
            HostOp::AppendInitial { parent, child } => write!(f, "initial #{child} -> #{parent}"),
            HostOp::Append { parent, child } => write!(f, "append #{child} -> {}", parent_name(parent)),
            HostOp::InsertBefore { parent, child, before } => {
                write!(f, "insert #{child} before #{before} in {}", parent_name(parent))
            }
            HostOp::Remove { parent, child } => write!(f, "remove #{child} from {}", parent_name(parent)),
            HostOp::Update { id } => write!(f, "update #{id}"),
            HostOp::TextUpdate { id, text } => write!(f, "text #{id} {text:?}"),
        }
    }
}

#[derive(Clone, Debug)]
enum NodeKind {
    Element { ty: String, props: Props },
    Text(String),
}

#[derive(Clone, Debug)]
struct MemoryNode {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Host that keeps its tree in memory and records every mutation.
///
/// Elements whose only child is text render that text themselves, so no
/// separate text node is created for them.
pub struct MemoryHost {
    nodes: Vec<MemoryNode>, // FUTURE(no_std): arena-backed node storage.
    containers: Vec<Vec<NodeId>>,
    ops: Vec<HostOp>,
    commits: usize,
    event_priority: Cell<Lane>,
    reject_type: Option<String>,
    reject_updates: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            containers: Vec::new(),
            ops: Vec::new(),
            commits: 0,
            event_priority: Cell::new(DEFAULT_EVENT_PRIORITY),
            reject_type: None,
            reject_updates: false,
        }
    }

    pub fn create_container(&mut self) -> ContainerId {
        self.containers.push(Vec::new());
        ContainerId(self.containers.len() - 1)
    }

    /// Priority reported for updates issued outside an explicit priority scope.
    pub fn set_event_priority(&self, lane: Lane) {
        self.event_priority.set(lane);
    }

    /// Runs `f` as if it were handling an event of priority `lane`.
    pub fn with_event_priority<R>(&self, lane: Lane, f: impl FnOnce() -> R) -> R {
        let previous = self.event_priority.replace(lane);
        let result = f();
        self.event_priority.set(previous);
        result
    }

    /// Makes `create_instance` fail for elements of type `ty`.
    pub fn reject_type(&mut self, ty: impl Into<String>) {
        self.reject_type = Some(ty.into());
    }

    /// Makes `commit_update` fail while `reject` is set.
    pub fn reject_updates(&mut self, reject: bool) {
        self.reject_updates = reject;
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Mutations after the initial build: everything but node creation.
    pub fn take_mutations(&mut self) -> Vec<HostOp> {
        self.take_ops()
            .into_iter()
            .filter(|op| {
                !matches!(
                    op,
                    HostOp::Create { .. } | HostOp::CreateText { .. } | HostOp::AppendInitial { .. }
                )
            })
            .collect()
    }

    /// Number of commits applied so far.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn children(&self, container: ContainerId) -> &[NodeId] {
        self.containers.get(container.0).map_or(&[], Vec::as_slice)
    }

    pub fn node_children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn node_type(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { ty, .. } => Some(ty),
            NodeKind::Text(_) => None,
        }
    }

    pub fn props(&self, id: NodeId) -> Option<&Props> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { props, .. } => Some(props),
            NodeKind::Text(_) => None,
        }
    }

    /// First element in document order with attribute `name` equal to `value`.
    pub fn find(&self, container: ContainerId, name: &str, value: impl Into<PropValue>) -> Option<NodeId> {
        let value = value.into();
        let mut stack: Vec<NodeId> = self.children(container).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.props(id).and_then(|p| p.get(name)) == Some(&value) {
                return Some(id);
            }
            stack.extend(self.node_children(id).iter().rev().copied());
        }
        None
    }

    /// Invokes the callback stored in attribute `name` of node `id`.
    pub fn trigger(&self, id: NodeId, name: &str) -> bool {
        let callback = self.props(id).and_then(|p| p.callback(name)).cloned();
        match callback {
            Some(callback) => {
                callback.call();
                true
            }
            None => {
                log::warn!("node #{id} has no {name} callback");
                false
            }
        }
    }

    /// Concatenated text of everything mounted in `container`.
    pub fn text_content(&self, container: ContainerId) -> String {
        let mut out = String::new();
        for id in self.children(container) {
            self.collect_text(*id, &mut out);
        }
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { props, .. } => {
                if let Some(text) = props.text_content() {
                    out.push_str(text);
                }
            }
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    /// Markup-like rendering of `container`, e.g. `<ul><li>a</li></ul>`.
    pub fn serialize(&self, container: ContainerId) -> String {
        let mut out = String::new();
        for id in self.children(container) {
            self.serialize_node(*id, &mut out);
        }
        out
    }

    fn serialize_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            out.push_str("<?>");
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { ty, props } => {
                out.push('<');
                out.push_str(ty);
                for (name, value) in props.attributes() {
                    if !matches!(value, PropValue::Callback(_)) {
                        out.push_str(&format!(" {name}={value}"));
                    }
                }
                out.push('>');
                if let Some(text) = props.text_content() {
                    out.push_str(text);
                }
                for child in &node.children {
                    self.serialize_node(*child, out);
                }
                out.push_str(&format!("</{ty}>"));
            }
        }
    }

    pub fn dump_tree(&self, container: ContainerId) -> String {
        let mut out = String::new();
        for id in self.children(container) {
            self.dump_node(&mut out, *id, 0);
        }
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Element { ty, .. }) => out.push_str(&format!("{indent}[{id}] <{ty}>\n")),
            Some(NodeKind::Text(text)) => out.push_str(&format!("{indent}[{id}] {text:?}\n")),
            None => out.push_str(&format!("{indent}[{id}] (missing)\n")),
        }
        for child in self.node_children(id) {
            self.dump_node(out, *child, depth + 1);
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes.get_mut(id).ok_or(HostError::Missing { id })
    }

    fn container_mut(&mut self, container: ContainerId) -> Result<&mut Vec<NodeId>, HostError> {
        self.containers
            .get_mut(container.0)
            .ok_or(HostError::Missing { id: container.0 })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<(&mut String, &mut Props), HostError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { ty, props } => Ok((ty, props)),
            NodeKind::Text(_) => Err(HostError::TypeMismatch { id, expected: "element" }),
        }
    }

    fn insert(list: &mut Vec<NodeId>, child: NodeId, before: Option<NodeId>) -> Result<(), HostError> {
        list.retain(|c| *c != child);
        match before {
            Some(before) => {
                let index = list
                    .iter()
                    .position(|c| *c == before)
                    .ok_or(HostError::Missing { id: before })?;
                list.insert(index, child);
            }
            None => list.push(child),
        }
        Ok(())
    }

    fn remove(list: &mut Vec<NodeId>, child: NodeId) -> Result<(), HostError> {
        let index = list
            .iter()
            .position(|c| *c == child)
            .ok_or(HostError::Missing { id: child })?;
        list.remove(index);
        Ok(())
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("nodes", &self.nodes.len())
            .field("containers", &self.containers.len())
            .field("commits", &self.commits)
            .finish()
    }
}

impl HostAdapter for MemoryHost {
    type Instance = NodeId;
    type Container = ContainerId;
    type UpdatePayload = PropsDiff;

    fn create_instance(&mut self, ty: &str, props: &Props) -> Result<NodeId, HostError> {
        if self.reject_type.as_deref() == Some(ty) {
            return Err(HostError::Rejected {
                reason: format!("<{ty}> is not supported"),
            });
        }
        let id = self.nodes.len();
        self.nodes.push(MemoryNode {
            kind: NodeKind::Element {
                ty: ty.to_string(),
                props: props.clone(),
            },
            children: Vec::new(),
        });
        self.ops.push(HostOp::Create { id, ty: ty.to_string() });
        Ok(id)
    }

    fn create_text_instance(&mut self, text: &str) -> Result<NodeId, HostError> {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode {
            kind: NodeKind::Text(text.to_string()),
            children: Vec::new(),
        });
        self.ops.push(HostOp::CreateText { id, text: text.to_string() });
        Ok(id)
    }

    fn append_initial_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        self.node_mut(*parent)?.children.push(*child);
        self.ops.push(HostOp::AppendInitial {
            parent: *parent,
            child: *child,
        });
        Ok(())
    }

    fn finalize_initial_children(&mut self, _instance: &NodeId, _ty: &str, _props: &Props) -> Result<(), HostError> {
        Ok(())
    }

    fn prepare_update(&self, _instance: &NodeId, _ty: &str, old_props: &Props, new_props: &Props) -> Option<PropsDiff> {
        let mut diff = PropsDiff::default();
        for (name, value) in new_props.attributes() {
            if old_props.get(name) != Some(value) {
                diff.attributes.insert(name.into(), Some(value.clone()));
            }
        }
        for (name, _) in old_props.attributes() {
            if new_props.get(name).is_none() {
                diff.attributes.insert(name.into(), None);
            }
        }
        if old_props.text_content() != new_props.text_content() {
            diff.text = Some(new_props.text_content().unwrap_or_default().to_string());
        }
        (!diff.is_empty()).then_some(diff)
    }

    fn should_set_text_content(&self, _ty: &str, props: &Props) -> bool {
        props.text_content().is_some()
    }

    fn current_event_priority(&self) -> Lane {
        self.event_priority.get()
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        Self::insert(&mut self.node_mut(*parent)?.children, *child, None)?;
        self.ops.push(HostOp::Append {
            parent: Some(*parent),
            child: *child,
        });
        Ok(())
    }

    fn append_child_to_container(&mut self, container: &ContainerId, child: &NodeId) -> Result<(), HostError> {
        Self::insert(self.container_mut(*container)?, *child, None)?;
        self.ops.push(HostOp::Append {
            parent: None,
            child: *child,
        });
        Ok(())
    }

    fn insert_before(&mut self, parent: &NodeId, child: &NodeId, before: &NodeId) -> Result<(), HostError> {
        Self::insert(&mut self.node_mut(*parent)?.children, *child, Some(*before))?;
        self.ops.push(HostOp::InsertBefore {
            parent: Some(*parent),
            child: *child,
            before: *before,
        });
        Ok(())
    }

    fn insert_in_container_before(
        &mut self,
        container: &ContainerId,
        child: &NodeId,
        before: &NodeId,
    ) -> Result<(), HostError> {
        Self::insert(self.container_mut(*container)?, *child, Some(*before))?;
        self.ops.push(HostOp::InsertBefore {
            parent: None,
            child: *child,
            before: *before,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
        Self::remove(&mut self.node_mut(*parent)?.children, *child)?;
        self.ops.push(HostOp::Remove {
            parent: Some(*parent),
            child: *child,
        });
        Ok(())
    }

    fn remove_child_from_container(&mut self, container: &ContainerId, child: &NodeId) -> Result<(), HostError> {
        Self::remove(self.container_mut(*container)?, *child)?;
        self.ops.push(HostOp::Remove {
            parent: None,
            child: *child,
        });
        Ok(())
    }

    fn commit_update(
        &mut self,
        instance: &NodeId,
        _payload: PropsDiff,
        _ty: &str,
        _old_props: &Props,
        new_props: &Props,
    ) -> Result<(), HostError> {
        if self.reject_updates {
            return Err(HostError::Rejected {
                reason: format!("update of node {instance} refused"),
            });
        }
        let (_, props) = self.element_mut(*instance)?;
        *props = new_props.clone();
        self.ops.push(HostOp::Update { id: *instance });
        Ok(())
    }

    fn commit_text_update(&mut self, instance: &NodeId, _old_text: &str, new_text: &str) -> Result<(), HostError> {
        match &mut self.node_mut(*instance)?.kind {
            NodeKind::Text(text) => *text = new_text.to_string(),
            NodeKind::Element { .. } => {
                return Err(HostError::TypeMismatch {
                    id: *instance,
                    expected: "text",
                })
            }
        }
        self.ops.push(HostOp::TextUpdate {
            id: *instance,
            text: new_text.to_string(),
        });
        Ok(())
    }

    fn reset_after_commit(&mut self, _container: &ContainerId) {
        self.commits += 1;
    }
}
