use std::error::Error;

use trellis_core::{
    Callback, Cleanup, Component, Dep, Element, Lane, Node, Reconciler, ReconcileError,
    CONTINUOUS_EVENT_PRIORITY, DISCRETE_EVENT_PRIORITY,
};
use trellis_runtime_std::StdRuntime;
use trellis_testing::{ContainerId, MemoryHost};

const ROW_COUNT: i64 = 200;

fn counter() -> Component {
    Component::new("Counter", |hooks, _| {
        let (count, set_count) = hooks.use_state(|| 0i64)?;
        let (log_entries, set_log) = hooks.use_state(Vec::<String>::new)?;
        hooks.use_effect(
            move || {
                log::info!("count is now {count}");
                set_log.update(move |entries| {
                    let mut entries = entries.clone();
                    entries.push(format!("saw {count}"));
                    entries
                });
                Some(Box::new(move || log::debug!("leaving count {count}")) as Cleanup)
            },
            Some(vec![Dep::from(count)]),
        )?;

        let increment = set_count.clone();
        let decrement = set_count;
        Ok(Element::host("section")
            .attr("id", "counter")
            .child(Element::host("h1").child(format!("Count: {count}")))
            .child(
                Element::host("button")
                    .attr("id", "inc")
                    .attr("on_click", Callback::new(move || increment.update(|c| c + 1)))
                    .child("+"),
            )
            .child(
                Element::host("button")
                    .attr("id", "dec")
                    .attr("on_click", Callback::new(move || decrement.update(|c| c - 1)))
                    .child("-"),
            )
            .child(Element::host("ul").children(log_entries.iter().map(|e| Element::host("li").child(e.as_str()))))
            .into())
    })
}

fn rows() -> Component {
    let row = Component::new("Row", |_, props| {
        let n = props.get_int("n").unwrap_or_default();
        Ok(Element::host("li").child(format!("row {n}")).into())
    });
    Component::new("Rows", move |hooks, _| {
        let (shift, set_shift) = hooks.use_state(|| 0i64)?;
        Ok(Element::host("ol")
            .attr("id", "rows")
            .attr("on_scroll", Callback::new(move || set_shift.update(|s| s + 1)))
            .children((0..ROW_COUNT).map(|i| {
                let n = i + shift;
                row.element().key(&n).attr("n", n)
            }))
            .into())
    })
}

fn app() -> Node {
    Node::list([counter().element(), rows().element()])
}

struct Demo {
    runtime: StdRuntime,
    reconciler: Reconciler<MemoryHost>,
    container: ContainerId,
}

impl Demo {
    fn new() -> Self {
        let runtime = StdRuntime::new();
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let reconciler = Reconciler::new(host, runtime.runtime());
        Self {
            runtime,
            reconciler,
            container,
        }
    }

    /// One pass of the event loop: microtasks first, then one host callback.
    fn turn(&mut self) -> Result<bool, ReconcileError> {
        if self.runtime.take_microtask_request() {
            self.reconciler.flush_microtasks()?;
            return Ok(true);
        }
        if self.runtime.take_host_callback_request() {
            self.reconciler.run_host_callback()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn settle(&mut self) -> Result<usize, ReconcileError> {
        let mut turns = 0;
        while self.turn()? {
            turns += 1;
        }
        Ok(turns)
    }

    fn fire(&mut self, id: &str, name: &str, priority: Lane) -> Result<(), ReconcileError> {
        let host = self.reconciler.host();
        let Some(node) = host.find(self.container, "id", id) else {
            log::warn!("no element with id {id}");
            return Ok(());
        };
        self.runtime
            .runtime()
            .with_update_priority(priority, || host.trigger(node, name));
        // Event handlers run to completion before the loop turns again.
        self.reconciler.flush_microtasks()?;
        let _ = self.runtime.take_microtask_request();
        Ok(())
    }

    fn headline(&self) -> String {
        let host = self.reconciler.host();
        host.find(self.container, "id", "counter")
            .and_then(|section| host.node_children(section).first().copied())
            .and_then(|h1| host.props(h1))
            .and_then(|props| props.text_content().map(str::to_string))
            .unwrap_or_default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("=== Trellis Counter Demo ===");
    let mut demo = Demo::new();
    let root = demo.reconciler.create_container(demo.container);
    demo.reconciler.update_container(app(), root)?;
    let turns = demo.settle()?;
    println!("mounted in {turns} turns: {}", demo.headline());

    for _ in 0..3 {
        demo.fire("inc", "on_click", DISCRETE_EVENT_PRIORITY)?;
    }
    println!("after three clicks: {}", demo.headline());

    demo.fire("rows", "on_scroll", CONTINUOUS_EVENT_PRIORITY)?;
    demo.fire("dec", "on_click", DISCRETE_EVENT_PRIORITY)?;
    println!("click during scroll: {}", demo.headline());

    let turns = demo.settle()?;
    println!("scroll settled in {turns} turns");
    println!("{}", demo.reconciler.host().dump_tree(demo.container));
    println!(
        "{} fibers live, {} commits",
        demo.reconciler.fiber_count(),
        demo.reconciler.host().commit_count()
    );
    Ok(())
}
