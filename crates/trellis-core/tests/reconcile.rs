use trellis_core::{Component, Element, HostError, HostRef, Lanes, Node, ReconcileError};
use trellis_testing::{HostOp, TestHarness};

fn list(labels: &[&str]) -> Element {
    Element::host("ul").attr("id", "list").children(
        labels
            .iter()
            .map(|label| Element::host("li").key(*label).attr("id", *label).child(*label)),
    )
}

fn mounted(labels: &[&str]) -> TestHarness {
    let mut h = TestHarness::new();
    h.render_sync(list(labels)).unwrap();
    h.take_ops();
    h
}

fn id(h: &TestHarness, id: &str) -> usize {
    h.find(id).unwrap_or_else(|| panic!("no element with id {id}"))
}

#[test]
fn initial_mount_builds_detached_then_attaches_once() {
    let mut h = TestHarness::new();
    h.render_sync(list(&["a", "b"])).unwrap();
    let ops = h.take_ops();
    let attaches: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, HostOp::Append { .. } | HostOp::InsertBefore { .. }))
        .collect();
    assert_eq!(attaches, [&HostOp::Append { parent: None, child: id(&h, "list") }]);
    assert_eq!(h.serialize(), r#"<ul id="list"><li id="a">a</li><li id="b">b</li></ul>"#);
}

#[test]
fn moving_an_item_back_appends_only_that_item() {
    let mut h = mounted(&["a", "b", "c", "d"]);
    let (ul, a) = (id(&h, "list"), id(&h, "a"));

    h.render_sync(list(&["b", "c", "d", "a"])).unwrap();
    assert_eq!(h.take_mutations(), [HostOp::Append { parent: Some(ul), child: a }]);
    assert_eq!(h.text(), "bcda");
}

#[test]
fn removed_items_are_deleted_before_moves() {
    let mut h = mounted(&["a", "b", "c", "d"]);
    let (ul, a, c) = (id(&h, "list"), id(&h, "a"), id(&h, "c"));

    h.render_sync(list(&["b", "d", "a"])).unwrap();
    assert_eq!(
        h.take_mutations(),
        [
            HostOp::Remove { parent: Some(ul), child: c },
            HostOp::Append { parent: Some(ul), child: a },
        ]
    );
    assert_eq!(h.text(), "bda");
}

#[test]
fn new_item_is_inserted_before_its_stable_sibling() {
    let mut h = mounted(&["a", "b"]);
    let (ul, b) = (id(&h, "list"), id(&h, "b"));

    h.render_sync(list(&["a", "x", "b"])).unwrap();
    let x = id(&h, "x");
    assert_eq!(
        h.take_mutations(),
        [HostOp::InsertBefore { parent: Some(ul), child: x, before: b }]
    );
    assert_eq!(h.text(), "axb");
}

#[test]
fn rendering_the_same_tree_commits_no_mutations() {
    let mut h = mounted(&["a", "b", "c"]);
    let before = h.commit_count();
    h.render_sync(list(&["a", "b", "c"])).unwrap();
    assert!(h.take_ops().is_empty());
    assert_eq!(h.commit_count(), before + 1);
}

#[test]
fn changed_attributes_and_text_update_in_place() {
    let mut h = TestHarness::new();
    h.render_sync(Element::host("p").attr("id", "p").attr("class", "old").child("one")).unwrap();
    let p = id(&h, "p");
    h.take_ops();

    h.render_sync(Element::host("p").attr("id", "p").attr("class", "new").child("two")).unwrap();
    assert_eq!(h.take_mutations(), [HostOp::Update { id: p }]);
    assert_eq!(h.serialize(), r#"<p id="p" class="new">two</p>"#);
}

#[test]
fn text_children_update_without_replacement() {
    let mut h = TestHarness::new();
    h.render_sync(Element::host("p").children([Node::text("a"), Node::text("b")])).unwrap();
    h.take_ops();

    h.render_sync(Element::host("p").children([Node::text("a"), Node::text("c")])).unwrap();
    let ops = h.take_mutations();
    assert_eq!(ops.len(), 1);
    assert!(matches!(&ops[0], HostOp::TextUpdate { text, .. } if text == "c"));
    assert_eq!(h.text(), "ac");
}

#[test]
fn changing_element_type_replaces_the_node() {
    let mut h = TestHarness::new();
    h.render_sync(Element::host("p").attr("id", "old").child("x")).unwrap();
    let old = id(&h, "old");
    h.take_ops();

    h.render_sync(Element::host("h1").attr("id", "new").child("x")).unwrap();
    let new = id(&h, "new");
    assert_eq!(
        h.take_mutations(),
        [
            HostOp::Remove { parent: None, child: old },
            HostOp::Append { parent: None, child: new },
        ]
    );
    assert_eq!(h.serialize(), r#"<h1 id="new">x</h1>"#);
}

#[test]
fn host_ref_follows_the_mounted_instance() {
    let node_ref = HostRef::new();
    let mut h = TestHarness::new();

    h.render_sync(Element::host("p").attr("id", "first").host_ref(&node_ref)).unwrap();
    assert_eq!(node_ref.get::<usize>(), Some(id(&h, "first")));

    h.render_sync(Element::host("p").attr("id", "first").attr("class", "x").host_ref(&node_ref)).unwrap();
    assert_eq!(node_ref.get::<usize>(), Some(id(&h, "first")));

    h.render_sync(Element::host("h1").attr("id", "second").host_ref(&node_ref)).unwrap();
    assert_eq!(node_ref.get::<usize>(), Some(id(&h, "second")));

    h.render_sync(Element::host("h1").attr("id", "second")).unwrap();
    assert!(!node_ref.is_attached());

    h.render_sync(Element::host("h1").attr("id", "second").host_ref(&node_ref)).unwrap();
    assert!(node_ref.is_attached());
    h.render_sync(Node::Empty).unwrap();
    assert!(!node_ref.is_attached());
}

#[test]
fn host_ref_moves_between_siblings() {
    let node_ref = HostRef::new();
    let pair = |on_a: bool| {
        let a = Element::host("li").key("a").attr("id", "a");
        let b = Element::host("li").key("b").attr("id", "b");
        let (a, b) = if on_a { (a.host_ref(&node_ref), b) } else { (a, b.host_ref(&node_ref)) };
        Element::host("ul").children([a, b])
    };
    let mut h = TestHarness::new();
    h.render_sync(pair(true)).unwrap();
    assert_eq!(node_ref.get::<usize>(), Some(id(&h, "a")));

    h.render_sync(pair(false)).unwrap();
    assert_eq!(node_ref.get::<usize>(), Some(id(&h, "b")));
}

#[test]
fn failed_render_leaves_the_committed_tree_alone() {
    let boom = Component::new("Boom", |_, props| {
        if props.get_bool("explode") == Some(true) {
            return Err(ReconcileError::render("Boom", "exploded"));
        }
        Ok(Node::text("calm"))
    });
    let page = |explode: bool| {
        Element::host("main").children([
            Node::from(Element::host("h1").child("title")),
            Node::from(boom.element().attr("explode", explode)),
        ])
    };
    let mut h = TestHarness::new();
    h.render(page(false)).unwrap();
    h.pump().unwrap();
    assert_eq!(h.text(), "titlecalm");
    h.take_ops();

    h.render(page(true)).unwrap();
    let err = h.pump().unwrap_err();
    assert_eq!(err, ReconcileError::render("Boom", "exploded"));
    assert!(h.take_mutations().is_empty());
    assert_eq!(h.text(), "titlecalm");

    h.render(page(false)).unwrap();
    h.pump().unwrap();
    assert_eq!(h.text(), "titlecalm");
}

#[test]
fn host_rejection_aborts_the_render() {
    let mut h = mounted(&["a"]);
    h.host_mut().reject_type("video");

    h.render(Element::host("section").child(Element::host("video"))).unwrap();
    let err = h.run_until_idle().unwrap_err();
    assert_eq!(
        err,
        ReconcileError::Host(HostError::Rejected {
            reason: "<video> is not supported".to_string(),
        })
    );
    assert_eq!(h.text(), "a");
    assert!(!h.reconciler().is_rendering());
}

#[test]
fn failed_commit_keeps_the_update_pending() {
    let mut h = TestHarness::new();
    h.render_sync(Element::host("p").attr("id", "p").attr("class", "old")).unwrap();
    let p = id(&h, "p");
    h.take_ops();
    h.host_mut().reject_updates(true);

    h.render(Element::host("p").attr("id", "p").attr("class", "new")).unwrap();
    let err = h.run_until_idle().unwrap_err();
    assert_eq!(
        err,
        ReconcileError::Host(HostError::Rejected {
            reason: format!("update of node {p} refused"),
        })
    );
    assert_eq!(h.pending_lanes(), Lanes::DEFAULT);
    assert!(h.take_mutations().is_empty());
    assert_eq!(h.serialize(), r#"<p id="p" class="old"></p>"#);

    h.host_mut().reject_updates(false);
    h.render(Element::host("p").attr("id", "p").attr("class", "new")).unwrap();
    h.run_until_idle().unwrap();
    assert_eq!(h.take_mutations(), [HostOp::Update { id: p }]);
    assert_eq!(h.serialize(), r#"<p id="p" class="new"></p>"#);
    assert_eq!(h.pending_lanes(), Lanes::NONE);
}

#[test]
fn multiple_roots_render_independently() {
    let mut h = TestHarness::new();
    let second = h.host_mut().create_container();
    let other = h.reconciler_mut().create_container(second);

    h.render_sync(Element::host("p").child("first")).unwrap();
    h.reconciler_mut()
        .update_container(Element::host("p").child("second"), other)
        .unwrap();
    h.run_until_idle().unwrap();

    assert_eq!(h.text(), "first");
    assert_eq!(h.host().text_content(second), "second");
    assert_ne!(h.root(), other);
}
