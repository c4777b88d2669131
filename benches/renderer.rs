use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use archwire::config::{Config, LayoutConfig};
use archwire::layout::{compute_layout, route};
use archwire::parser::parse_schema;
use archwire::render::render_svg;

fn dense_schema_source(boxes: usize, fanout: usize) -> String {
    let mut nodes = String::new();
    for i in 0..boxes {
        if i > 0 {
            nodes.push(',');
        }
        nodes.push_str(&format!(
            r#"{{ "id": "svc{i}", "label": "Service {i}", "subtitle": "tier {}" }}"#,
            i % 3
        ));
    }
    let mut connections = String::new();
    for i in 0..boxes.saturating_sub(1) {
        if i > 0 {
            connections.push(',');
        }
        connections.push_str(&format!(
            r#"{{ "from": "svc{i}", "to": "svc{}", "label": "hop {i}" }}"#,
            i + 1
        ));
    }
    for i in 0..fanout.min(boxes.saturating_sub(2)) {
        connections.push_str(&format!(
            r#",{{ "from": "svc{i}", "to": ["svc{}", "svc{}"] }}"#,
            i + 1,
            i + 2
        ));
    }
    format!(r#"{{ "nodes": [{nodes}], "connections": [{connections}] }}"#)
}

fn fixture(name: &str) -> &'static str {
    match name {
        "basic" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/basic.json"
        )),
        "platform" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/platform.json"
        )),
        "corridor" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/corridor.json"
        )),
        _ => panic!("unknown fixture"),
    }
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for name in ["basic", "platform", "corridor"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let schema = parse_schema(black_box(data)).expect("parse failed");
                black_box(schema.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout_and_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_route");
    let config = LayoutConfig::default();
    for (boxes, fanout) in [(10usize, 4usize), (40, 16), (80, 40)] {
        let name = format!("dense_{boxes}_{fanout}");
        let schema = parse_schema(&dense_schema_source(boxes, fanout)).expect("parse failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &schema, |b, schema| {
            b.iter(|| {
                let layout = compute_layout(black_box(schema), &config);
                let routing = route(schema, &layout, &config);
                black_box(routing.connections.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = Config::default();
    for name in ["basic", "platform", "corridor"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let schema = parse_schema(black_box(data)).expect("parse failed");
                let layout = compute_layout(&schema, &config.layout);
                let routing = route(&schema, &layout, &config.layout);
                let svg = render_svg(
                    &schema,
                    &layout,
                    &routing,
                    &config.theme,
                    &config.layout,
                    &config.render,
                );
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout_and_routing, bench_end_to_end
);
criterion_main!(benches);
