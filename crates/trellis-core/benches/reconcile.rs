use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trellis_core::{Component, Element, Node};
use trellis_testing::TestHarness;

const SECTION_COUNT: usize = 4;
const ROWS_PER_SECTION: usize = 32;
const LIST_SIZE_SAMPLES: &[usize] = &[16, 64, 256, 1024];

fn row() -> Component {
    Component::new("Row", |_, props| {
        let n = props.get_int("n").unwrap_or_default();
        Ok(Element::host("li")
            .child(Element::host("b").child(format!("Item {n} title")))
            .child(Element::host("i").child(format!("Detail {n}")))
            .into())
    })
}

fn page(row: &Component, sections: usize, rows_per_section: usize, offset: i64) -> Node {
    Element::host("main")
        .children((0..sections).map(|section| {
            Element::host("section").key(&section).children(
                (0..rows_per_section as i64).map(|r| {
                    let n = r + offset;
                    row.element().key(&n).attr("n", n)
                }),
            )
        }))
        .into()
}

struct Fixture {
    harness: TestHarness,
    row: Component,
}

impl Fixture {
    fn new() -> Self {
        Self {
            harness: TestHarness::new(),
            row: row(),
        }
    }

    fn render(&mut self, node: Node) {
        self.harness.render_sync(node).expect("render");
    }
}

fn bench_mount(c: &mut Criterion) {
    c.bench_function("reconcile_mount", |b| {
        b.iter(|| {
            let mut fixture = Fixture::new();
            let tree = page(&fixture.row, SECTION_COUNT, ROWS_PER_SECTION, 0);
            fixture.render(tree);
            black_box(fixture.harness.commit_count());
        });
    });
}

fn bench_rerender(c: &mut Criterion) {
    let mut fixture = Fixture::new();
    let tree = page(&fixture.row, SECTION_COUNT, ROWS_PER_SECTION, 0);
    // Warm up so steady-state updates are measured.
    fixture.render(tree.clone());

    c.bench_function("reconcile_rerender", |b| {
        b.iter(|| {
            fixture.render(tree.clone());
        });
    });
}

fn bench_keyed_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_keyed_shift");
    for &size in LIST_SIZE_SAMPLES {
        group.bench_with_input(BenchmarkId::new("rows", size), &size, |b, &size| {
            let mut fixture = Fixture::new();
            let mut offset = 0;
            fixture.render(page(&fixture.row, 1, size, offset));
            b.iter(|| {
                offset += 1;
                let tree = page(&fixture.row, 1, size, offset);
                fixture.render(tree);
                black_box(fixture.harness.take_ops());
            });
        });
    }
    group.finish();
}

fn bench_sliced(c: &mut Criterion) {
    let mut fixture = Fixture::new();
    let tree = page(&fixture.row, SECTION_COUNT, ROWS_PER_SECTION, 0);
    fixture.harness.clock().set_auto_step(1);

    c.bench_function("reconcile_time_sliced", |b| {
        b.iter(|| {
            fixture.harness.render(tree.clone()).expect("schedule");
            let steps = fixture.harness.pump().expect("pump");
            black_box(steps);
        });
    });
}

criterion_group!(reconcile, bench_mount, bench_rerender, bench_keyed_shift, bench_sliced);
criterion_main!(reconcile);
