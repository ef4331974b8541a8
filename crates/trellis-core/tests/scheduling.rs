use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::{Component, Element, Lanes, Node, StateSetter, DISCRETE_EVENT_PRIORITY, IDLE_EVENT_PRIORITY};
use trellis_testing::TestHarness;

type Slot<S> = Rc<RefCell<Option<StateSetter<S>>>>;

fn setter<S: Clone + 'static>(slot: &Slot<S>) -> StateSetter<S> {
    slot.borrow().clone().expect("setter captured during render")
}

/// Renders `[state]` followed by `count` empty items, so the render has
/// enough units of work to be sliced.
fn app<S>(slot: Slot<S>, init: S, count: usize) -> Component
where
    S: Clone + PartialEq + std::fmt::Display + 'static,
{
    let item = Component::new("Item", |_, _| Ok(Element::host("i").into()));
    Component::new("App", move |hooks, _| {
        let init = init.clone();
        let (value, set_value) = hooks.use_state(move || init)?;
        slot.borrow_mut().replace(set_value);
        let items = (0..count).map(|i| Node::from(item.element().key(&i)));
        Ok(Node::list(
            std::iter::once(Node::from(Element::host("span").child(format!("[{value}]")))).chain(items),
        ))
    })
}

#[test]
fn updates_in_one_turn_commit_once() {
    let slot: Slot<i64> = Rc::default();
    let mut h = TestHarness::new();
    h.render(app(slot.clone(), 0, 0).element()).unwrap();
    h.pump().unwrap();
    assert_eq!(h.text(), "[0]");
    assert_eq!(h.commit_count(), 1);

    let set = setter(&slot);
    set.update(|c| c + 1);
    set.update(|c| c + 1);
    set.update(|c| c + 1);
    h.pump().unwrap();

    assert_eq!(h.text(), "[3]");
    assert_eq!(h.commit_count(), 2);
    assert_eq!(h.pending_lanes(), Lanes::NONE);
}

#[test]
fn sync_update_commits_before_idle_update() {
    let a: Slot<i64> = Rc::default();
    let b: Slot<i64> = Rc::default();
    let pair = {
        let (a, b) = (a.clone(), b.clone());
        Component::new("Pair", move |hooks, _| {
            let (x, set_x) = hooks.use_state(|| 0i64)?;
            let (y, set_y) = hooks.use_state(|| 0i64)?;
            a.borrow_mut().replace(set_x);
            b.borrow_mut().replace(set_y);
            Ok(Element::host("span").child(format!("a{x} b{y}")).into())
        })
    };
    let mut h = TestHarness::new();
    h.render_sync(pair.element()).unwrap();
    assert_eq!(h.text(), "a0 b0");

    let runtime = h.reconciler().runtime().clone();
    runtime.with_update_priority(IDLE_EVENT_PRIORITY, || setter(&a).set(1));
    runtime.with_update_priority(DISCRETE_EVENT_PRIORITY, || setter(&b).set(1));

    h.flush_microtasks().unwrap();
    assert_eq!(h.text(), "a0 b1");
    assert_eq!(h.pending_lanes(), Lanes::IDLE);

    h.pump().unwrap();
    assert_eq!(h.text(), "a1 b1");
    assert_eq!(h.pending_lanes(), Lanes::NONE);
}

#[test]
fn long_render_is_sliced_without_restarting() {
    let renders = Rc::new(Cell::new(0usize));
    let counted = {
        let renders = renders.clone();
        Component::new("Counted", move |_, props| {
            renders.set(renders.get() + 1);
            Ok(Element::host("b").child(props.get_int("n").unwrap_or_default()).into())
        })
    };
    let tree = Element::host("div").children((0..20i64).map(|n| counted.element().key(&n).attr("n", n)));

    let mut h = TestHarness::new();
    h.clock().set_auto_step(1);
    h.render(tree).unwrap();

    assert!(h.run_host_callback().unwrap(), "first slice should leave work behind");
    assert!(h.reconciler().is_rendering());
    assert_eq!(h.text(), "");

    h.pump().unwrap();
    let expected: String = (0..20).map(|n| n.to_string()).collect();
    assert_eq!(h.text(), expected);
    assert_eq!(renders.get(), 20);
    assert_eq!(h.commit_count(), 1);
    assert!(h.scheduler().host_callback_requests() > 2);
}

#[test]
fn starved_lane_is_expired_and_rendered_without_yielding() {
    let slot: Slot<i64> = Rc::default();
    let mut h = TestHarness::new();
    h.clock().set_auto_step(1);
    h.render(app(slot.clone(), 7, 60).element()).unwrap();

    assert!(h.run_host_callback().unwrap());
    assert!(h.reconciler().is_rendering());
    assert_eq!(h.reconciler().expired_lanes(h.root()), Lanes::NONE);

    h.advance_time(10_000);
    setter(&slot).set(8);
    h.flush_microtasks().unwrap();
    assert_eq!(h.reconciler().expired_lanes(h.root()), Lanes::DEFAULT);

    h.run_host_callback().unwrap();
    assert!(!h.reconciler().is_rendering());
    assert_eq!(h.text(), "[7]");

    let requests = h.scheduler().host_callback_requests();
    assert!(!h.run_host_callback().unwrap(), "expired lane should finish in one turn");
    assert_eq!(h.text(), "[8]");
    assert_eq!(h.scheduler().host_callback_requests(), requests);
    assert_eq!(h.reconciler().expired_lanes(h.root()), Lanes::NONE);
    assert_eq!(h.commit_count(), 2);
}

#[test]
fn sync_update_preempts_and_default_update_is_rebased() {
    let slot: Slot<String> = Rc::default();
    let mut h = TestHarness::new();
    h.render_sync(app(slot.clone(), String::new(), 20).element()).unwrap();
    assert_eq!(h.text(), "[]");

    let set = setter(&slot);
    h.clock().set_auto_step(1);
    set.update(|s| format!("{s}A"));
    h.flush_microtasks().unwrap();
    assert!(h.run_host_callback().unwrap());
    assert!(h.reconciler().is_rendering());

    h.reconciler()
        .runtime()
        .with_update_priority(DISCRETE_EVENT_PRIORITY, || set.update(|s| format!("{s}B")));
    h.flush_microtasks().unwrap();
    assert_eq!(h.text(), "[B]");
    assert!(!h.reconciler().is_rendering());
    assert_eq!(h.pending_lanes(), Lanes::DEFAULT);

    h.pump().unwrap();
    assert_eq!(h.text(), "[AB]");
    assert_eq!(h.pending_lanes(), Lanes::NONE);
}

#[test]
fn update_staged_during_a_render_is_not_dropped_by_a_later_same_value() {
    let outer: Slot<i64> = Rc::default();
    let inner: Slot<i64> = Rc::default();
    let tail = {
        let inner = inner.clone();
        Component::new("Tail", move |hooks, _| {
            let (c, set_c) = hooks.use_state(|| 0i64)?;
            inner.borrow_mut().replace(set_c);
            Ok(Element::host("b").child(format!("c{c}")).into())
        })
    };
    let item = Component::new("Item", |_, _| Ok(Element::host("i").into()));
    let page = {
        let outer = outer.clone();
        Component::new("Page", move |hooks, _| {
            let (a, set_a) = hooks.use_state(|| 0i64)?;
            outer.borrow_mut().replace(set_a);
            let items = (0..30).map(|i| Node::from(item.element().key(&i)));
            Ok(Node::list(
                std::iter::once(Node::from(Element::host("span").child(format!("[{a}]"))))
                    .chain(items)
                    .chain(std::iter::once(Node::from(tail.element()))),
            ))
        })
    };
    let mut h = TestHarness::new();
    h.render_sync(page.element()).unwrap();
    assert_eq!(h.text(), "[0]c0");

    h.clock().set_auto_step(1);
    setter(&outer).set(1);
    h.flush_microtasks().unwrap();
    assert!(h.run_host_callback().unwrap());
    assert!(h.reconciler().is_rendering());

    // Reaches the tail only after this render has already started.
    setter(&inner).set(5);
    h.flush_microtasks().unwrap();
    let commits = h.commit_count();
    while h.commit_count() == commits {
        h.run_host_callback().unwrap();
    }
    assert_eq!(h.text(), "[1]c0");

    setter(&inner).set(0);
    h.run_until_idle().unwrap();
    assert_eq!(h.text(), "[1]c0");
}

#[test]
fn idle_reconciler_requests_nothing() {
    let mut h = TestHarness::new();
    h.render(Element::host("p").child("still")).unwrap();
    h.run_until_idle().unwrap();
    assert!(!h.reconciler().has_pending_work());
    assert_eq!(h.pump().unwrap(), 0);
    assert_eq!(h.text(), "still");
}
