use std::sync::Arc;

use crate::element::{Component, Element, Node};
use crate::error::ReconcileError;
use crate::fiber::{FiberId, WorkTag};
use crate::lane::Lanes;
use crate::reconciler::Reconciler;
use crate::test_host::{reconciler, TestClock, TestHost};

fn item(clock: Option<Arc<TestClock>>) -> Component {
    Component::new("Item", move |_, props| {
        if let Some(clock) = &clock {
            clock.advance(3);
        }
        let label = props.get_str("label").unwrap_or_default().to_string();
        Ok(Element::host("span").child(label).into())
    })
}

fn items(component: &Component, labels: &[&str]) -> Node {
    Element::host("div")
        .children(
            labels
                .iter()
                .map(|label| component.element().key(*label).attr("label", *label)),
        )
        .into()
}

fn walk(r: &Reconciler<TestHost>, id: FiberId, visit: &mut impl FnMut(FiberId)) {
    visit(id);
    let mut child = r.fibers[id].child;
    while let Some(c) = child {
        walk(r, c, visit);
        child = r.fibers[c].sibling;
    }
}

/// Committed fibers plus their live twins; anything else in the arena leaked.
fn reachable(r: &Reconciler<TestHost>) -> usize {
    let mut count = 0;
    walk(r, r.roots[0].current, &mut |id| {
        count += 1;
        if r.fibers[id].alternate.is_some_and(|alt| r.fibers.contains(alt)) {
            count += 1;
        }
    });
    count
}

#[test]
fn mount_rewrites_indeterminate_components() {
    let (mut r, _) = reconciler();
    let root = r.create_container(());
    let component = item(None);
    r.update_container(items(&component, &["a", "b"]), root).unwrap();
    r.run_until_idle().unwrap();

    assert_eq!(r.host().text(), "ab");
    let tree = r.debug_tree(root);
    assert!(tree.contains("FunctionComponent Item"), "{tree}");
    assert!(!tree.contains("IndeterminateComponent"), "{tree}");
}

#[test]
fn twins_point_at_each_other() {
    let (mut r, _) = reconciler();
    let root = r.create_container(());
    let component = item(None);
    for labels in [&["a", "b", "c"][..], &["c", "a"], &["a", "b", "d", "c"]] {
        r.update_container(items(&component, labels), root).unwrap();
        r.run_until_idle().unwrap();
    }

    walk(&r, r.roots[0].current, &mut |id| {
        if let Some(alt) = r.fibers[id].alternate {
            assert_eq!(r.fibers[alt].alternate, Some(id));
        }
    });
    assert_eq!(r.host().text(), "abdc");
    assert_eq!(reachable(&r), r.fiber_count());
}

#[test]
fn deleted_subtrees_are_freed() {
    let (mut r, _) = reconciler();
    let root = r.create_container(());
    let component = item(None);
    r.update_container(items(&component, &["a", "b", "c", "d"]), root).unwrap();
    r.run_until_idle().unwrap();
    r.update_container(items(&component, &["a", "b", "c", "d"]), root).unwrap();
    r.run_until_idle().unwrap();
    let before = r.fiber_count();

    r.update_container(items(&component, &["b"]), root).unwrap();
    r.run_until_idle().unwrap();

    assert_eq!(r.host().text(), "b");
    assert!(r.fiber_count() < before);
    assert_eq!(reachable(&r), r.fiber_count());
}

#[test]
fn interrupted_render_releases_its_fibers() {
    let (mut r, clock) = reconciler();
    let root = r.create_container(());
    let component = item(Some(clock.clone()));

    r.update_container(items(&component, &["a", "b", "c", "d", "e"]), root).unwrap();
    let more = r.run_host_callback().unwrap();
    assert!(more, "render should have yielded");
    assert!(r.is_rendering());
    assert_eq!(r.host().text(), "");

    r.flush_sync(|r| r.update_container(items(&component, &["x"]), root))
        .unwrap()
        .unwrap();
    assert_eq!(r.host().text(), "x");

    r.run_until_idle().unwrap();
    assert_eq!(r.host().text(), "x");
    assert_eq!(reachable(&r), r.fiber_count());
    assert_eq!(r.pending_lanes(root), Lanes::NONE);
}

#[test]
fn render_error_keeps_committed_tree() {
    let (mut r, _) = reconciler();
    let root = r.create_container(());
    let flaky = Component::new("Flaky", |_, props| {
        if props.get_bool("fail") == Some(true) {
            return Err(ReconcileError::render("Flaky", "asked to fail"));
        }
        Ok(Node::text("ok"))
    });

    r.update_container(flaky.element().attr("fail", false), root).unwrap();
    r.run_until_idle().unwrap();
    let committed = r.fiber_count();

    r.update_container(flaky.element().attr("fail", true), root).unwrap();
    let err = r.run_until_idle().unwrap_err();
    assert!(matches!(err, ReconcileError::Render { component: "Flaky", .. }));
    assert_eq!(r.host().text(), "ok");
    assert!(!r.is_rendering());
    assert!(r.fiber_count() >= committed);
    assert_eq!(reachable(&r), r.fiber_count());

    r.update_container(Element::host("p").child("fine"), root).unwrap();
    r.run_until_idle().unwrap();
    assert_eq!(r.host().text(), "fine");
}

#[test]
fn root_fiber_is_host_root() {
    let (mut r, _) = reconciler();
    let root = r.create_container(());
    assert_eq!(r.fibers[r.roots[root.index()].current].tag, WorkTag::HostRoot);
    assert!(matches!(
        r.update_container(Node::Empty, crate::root::RootId::new(7)),
        Err(ReconcileError::UnknownRoot(_))
    ));
}
