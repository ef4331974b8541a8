//! Descriptions of desired output.
//!
//! A render produces a [`Node`] tree; the reconciler diffs it against the
//! committed fibers. Descriptions are cheap to clone: props are shared behind
//! `Rc` and components compare by identity.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::ReconcileError;
use crate::hash::key_hash;
use crate::hooks::Hooks;

/// Identity of a child among its siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key(u64);

impl Key {
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        Key(key_hash(value))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Host callback stored in props. Compares by pointer.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn()>);

impl Callback {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Callback(Rc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Slot that holds the host instance of the element it is attached to while
/// that element is mounted. Compares by identity.
#[derive(Clone, Default)]
pub struct HostRef(Rc<RefCell<Option<Rc<dyn Any>>>>);

impl HostRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// The attached instance, if it is mounted and has type `T`.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.0.borrow().as_ref()?.downcast_ref::<T>().cloned()
    }

    pub fn is_attached(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub(crate) fn attach<T: 'static>(&self, instance: T) {
        self.0.replace(Some(Rc::new(instance)));
    }

    pub(crate) fn detach(&self) {
        self.0.replace(None);
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostRef").field(&self.is_attached()).finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Callback(Callback),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => write!(f, "{s:?}"),
            PropValue::Int(v) => write!(f, "{v}"),
            PropValue::Float(v) => write!(f, "{v}"),
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Callback(_) => f.write_str("{callback}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        PropValue::Callback(value)
    }
}

/// Attributes and children of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attributes: IndexMap<Rc<str>, PropValue>,
    children: Vec<Node>,
    host_ref: Option<HostRef>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn push_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name)? {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name)? {
            PropValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.attributes.get(name)? {
            PropValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn callback(&self, name: &str) -> Option<&Callback> {
        match self.attributes.get(name)? {
            PropValue::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attributes.iter().map(|(k, v)| (&**k, v))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn host_ref(&self) -> Option<&HostRef> {
        self.host_ref.as_ref()
    }

    pub fn set_host_ref(&mut self, host_ref: HostRef) {
        self.host_ref = Some(host_ref);
    }

    /// The text of a sole text child, if that is all this element contains.
    pub fn text_content(&self) -> Option<&str> {
        match self.children.as_slice() {
            [Node::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// Children as a single description: nothing, one node, or a list.
    pub(crate) fn children_node(&self) -> Node {
        match self.children.as_slice() {
            [] => Node::Empty,
            [only] => only.clone(),
            many => Node::List(many.to_vec()),
        }
    }
}

pub type RenderResult = Result<Node, ReconcileError>;

type RenderFn = dyn Fn(&mut Hooks, &Props) -> RenderResult;

struct ComponentDef {
    name: &'static str,
    render: Box<RenderFn>,
}

/// A stateful unit: a named function from props to a description.
///
/// Two components are the same type only if they are clones of one
/// `Component` value, so define each component once and reuse it.
#[derive(Clone)]
pub struct Component(Rc<ComponentDef>);

impl Component {
    pub fn new(
        name: &'static str,
        render: impl Fn(&mut Hooks, &Props) -> RenderResult + 'static,
    ) -> Self {
        Component(Rc::new(ComponentDef {
            name,
            render: Box::new(render),
        }))
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub(crate) fn render(&self, hooks: &mut Hooks, props: &Props) -> RenderResult {
        (self.0.render)(hooks, props)
    }

    pub fn element(&self) -> Element {
        Element::new(ElementType::Component(self.clone()))
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.0.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    Host(Rc<str>),
    Component(Component),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub(crate) ty: ElementType,
    pub(crate) key: Option<Key>,
    pub(crate) props: Rc<Props>,
}

impl Element {
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            key: None,
            props: Rc::new(Props::default()),
        }
    }

    pub fn host(ty: impl Into<Rc<str>>) -> Self {
        Self::new(ElementType::Host(ty.into()))
    }

    pub fn key<K: Hash + ?Sized>(mut self, key: &K) -> Self {
        self.key = Some(Key::of(key));
        self
    }

    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        Rc::make_mut(&mut self.props).set(name, value);
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        Rc::make_mut(&mut self.props).push_child(child);
        self
    }

    /// Attaches `host_ref` to this element's host instance. Ignored on
    /// component elements.
    pub fn host_ref(mut self, host_ref: &HostRef) -> Self {
        Rc::make_mut(&mut self.props).set_host_ref(host_ref.clone());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        let props = Rc::make_mut(&mut self.props);
        for child in children {
            props.push_child(child);
        }
        self
    }

    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }
}

/// A description of desired output.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Node {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Element),
    /// Sibling descriptions. Nested lists are flattened into their parent.
    List(Vec<Node>),
}

impl Node {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Node::Text(text.into())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        let mut flat = Vec::new();
        for item in items {
            flatten_into(item.into(), &mut flat);
        }
        Node::List(flat)
    }
}

fn flatten_into(node: Node, out: &mut Vec<Node>) {
    match node {
        Node::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        other => out.push(other),
    }
}

/// Borrowing flatten used by the child diff.
pub(crate) fn flatten_children(items: &[Node]) -> Vec<&Node> {
    fn walk<'a>(items: &'a [Node], out: &mut Vec<&'a Node>) {
        for item in items {
            match item {
                Node::List(nested) => walk(nested, out),
                other => out.push(other),
            }
        }
    }
    let mut out = Vec::with_capacity(items.len());
    walk(items, &mut out);
    out
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Node::Element(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.into())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value.into())
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Text(value.to_string().into())
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Text(value.to_string().into())
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::list(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_attributes_and_children() {
        let element = Element::host("div")
            .attr("id", "root")
            .attr("count", 3)
            .child("hello");
        assert_eq!(element.props().get_str("id"), Some("root"));
        assert_eq!(element.props().get_int("count"), Some(3));
        assert_eq!(element.props().text_content(), Some("hello"));
    }

    #[test]
    fn keys_are_stable() {
        assert_eq!(Key::of("a"), Key::of("a"));
        assert_ne!(Key::of("a"), Key::of("b"));
    }

    #[test]
    fn nested_lists_flatten() {
        let node = Node::list(vec![
            Node::text("a"),
            Node::List(vec![Node::text("b"), Node::text("c")]),
        ]);
        match node {
            Node::List(items) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn components_compare_by_identity() {
        let a = Component::new("A", |_, _| Ok(Node::Empty));
        let b = Component::new("A", |_, _| Ok(Node::Empty));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
