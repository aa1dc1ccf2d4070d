//! Performance benchmarks for the streaming parser.
//!
//! Benchmarks whole-document parses and the streaming pattern of
//! re-parsing every growing prefix of a reply.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use streamtree_parser::{MarkdownParser, ParseOptions};

const REPLY: &str = "# Setting up

Install the tool with `cargo install streamtree`, then run it on a
file. See [the docs](https://example.com/docs) for **all options**.

1. Create a config
2. Add your *custom* tags
3. Parse

```rust
fn main() {
    let nodes = parse(\"Hello **world**\");
    println!(\"{:?}\", nodes);
}
```

| flag | meaning |
|------|---------|
| `--final` | input is complete |
| `--stream` | report loading changes |

::: tip
Math works too: $$e^{i\\pi} + 1 = 0$$
:::

> Note: links like [this one](https://example.com/a/very/long/path) stream cleanly.
";

/// Benchmark parsing a complete reply, streaming and final.
fn bench_document(c: &mut Criterion) {
    let parser = MarkdownParser::new();
    let mut group = c.benchmark_group("document");
    group.throughput(Throughput::Bytes(REPLY.len() as u64));

    for (name, options) in [
        ("streaming", ParseOptions::default()),
        ("final", ParseOptions::default().with_final(true)),
    ] {
        group.bench_with_input(BenchmarkId::new("parse", name), &options, |b, options| {
            b.iter(|| parser.parse(black_box(REPLY), options));
        });
    }

    group.finish();
}

/// Benchmark re-parsing the reply at every chunk boundary, as a chat UI does.
fn bench_prefixes(c: &mut Criterion) {
    let parser = MarkdownParser::new();
    let options = ParseOptions::default();
    let mut group = c.benchmark_group("prefixes");

    for chunk in [4usize, 16, 64] {
        let ends: Vec<usize> = (1..=REPLY.len())
            .step_by(chunk)
            .filter(|&end| REPLY.is_char_boundary(end))
            .collect();
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &ends, |b, ends| {
            b.iter(|| {
                for &end in ends {
                    let _ = parser.parse(black_box(&REPLY[..end]), &options);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_document, bench_prefixes);
criterion_main!(benches);
