use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dom::{DomArena, NodeIndex};
use interpreter::{EditWriter, Interpreter, TemplateDescriptor, ROOT_ID};

/// `rows` list items, each with a class, a text child and a click listener
fn list_stream(rows: u64) -> EditWriter<NodeIndex> {
    let mut w = EditWriter::new();
    w.create_element("ul", 1);
    for row in 0..rows {
        let li = 2 + row * 2;
        w.create_element("li", li)
            .set_attribute_str(li, "class", "row")
            .new_event_listener("click", li, row, true)
            .create_text_node(format!("row {}", row), li + 1)
            .append_children(None, 1);
    }
    w.append_children(Some(1), rows as u32)
        .append_children(Some(ROOT_ID), 1);
    w
}

fn bench_create_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_list");

    for rows in [10u64, 100, 1000] {
        let (bytes, _) = list_stream(rows).finish();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter(|| {
                let (arena, mount) = DomArena::with_mount("main").unwrap();
                let mut interp = Interpreter::new(arena, mount);
                let (bytes, values) = list_stream(rows).finish();
                black_box(interp.apply_edits(&bytes, values).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_template_instances(c: &mut Criterion) {
    let descriptor = TemplateDescriptor::from_json(
        r#"{"root": {"type": "element", "tag": "article",
            "attrs": [{"type": "dynamic", "name": "title", "slot": 0}],
            "children": [
                {"type": "element", "tag": "h2", "children": [{"type": "dynamic_text", "slot": 1}]},
                {"type": "element", "tag": "p", "children": [{"type": "text", "text": "static"}]}
            ]}}"#,
    )
    .unwrap();

    c.bench_function("template_instances_100", |b| {
        b.iter(|| {
            let (arena, mount) = DomArena::with_mount("main").unwrap();
            let mut interp = Interpreter::new(arena, mount);
            interp.register_template(1, &descriptor).unwrap();

            let mut w: EditWriter<NodeIndex> = EditWriter::new();
            for id in 1..=100 {
                w.load_template(1, id)
                    .set_node(0, "t")
                    .set_node(1, "heading")
                    .append_children(Some(ROOT_ID), 1);
            }
            let (bytes, values) = w.finish();
            black_box(interp.apply_edits(&bytes, values).unwrap())
        })
    });
}

fn bench_decode_only(c: &mut Criterion) {
    let (bytes, _) = list_stream(1000).finish();
    c.bench_function("decode_1000_rows", |b| {
        b.iter(|| {
            let count = interpreter::EditReader::new(black_box(&bytes))
                .filter(|edit| edit.is_ok())
                .count();
            black_box(count)
        })
    });
}

criterion_group!(
    benches,
    bench_create_list,
    bench_template_instances,
    bench_decode_only
);
criterion_main!(benches);
