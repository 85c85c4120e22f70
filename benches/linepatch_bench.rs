use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indoc::indoc;
use linepatch::{create_patch, extract_chunks, preview_patch, ChunkOptions, FileMap};

// --- Differencing Benchmarks ---

fn differencing_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Differencing");

    // Small file, one substituted line
    let original = FileMap::from([("small.py".to_string(), "a\nb\nc\n".to_string())]);
    let edited = FileMap::from([("small.py".to_string(), "a\nx\nc\n".to_string())]);
    group.bench_function("single_substitution", |b| {
        b.iter(|| create_patch(black_box(&original), black_box(&edited)))
    });

    // Large file with scattered edits of every kind
    let large_original: String = (0..5000).map(|i| format!("line {}\n", i)).collect();
    let large_edited: String = (0..5000)
        .filter(|i| i % 97 != 0)
        .map(|i| {
            if i % 50 == 0 {
                format!("changed {}\nextra {}\n", i, i)
            } else {
                format!("line {}\n", i)
            }
        })
        .collect();
    let original = FileMap::from([("large.txt".to_string(), large_original)]);
    let edited = FileMap::from([("large.txt".to_string(), large_edited)]);
    group.bench_function("large_file_scattered_edits", |b| {
        b.iter(|| create_patch(black_box(&original), black_box(&edited)))
    });

    let patch = create_patch(&original, &edited);
    group.bench_function("large_file_preview", |b| {
        b.iter(|| preview_patch(black_box(&original), black_box(&patch)))
    });

    group.finish();
}

// --- Chunk Extraction Benchmarks ---

fn extraction_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Extraction");

    let module = indoc! {r#"
        import os

        class Loader:
            def __init__(self, root):
                self.root = root

            def load(self, name):
                with open(os.path.join(self.root, name)) as f:
                    return f.read()

        def parse_config(text):
            return dict(line.split("=", 1) for line in text.splitlines())
    "#};
    let options = ChunkOptions::default();
    group.bench_function("small_module", |b| {
        b.iter(|| extract_chunks(black_box(module), &["loadConfig"], "loader.py", &options))
    });

    let large_module: String = (0..300)
        .map(|i| format!("def handler_{}(event):\n    return event.get('id_{}')\n\n", i, i))
        .collect();
    group.bench_function("large_module_300_functions", |b| {
        b.iter(|| extract_chunks(black_box(&large_module), &["handler_150"], "h.py", &options))
    });

    group.finish();
}

criterion_group!(benches, differencing_benches, extraction_benches);
criterion_main!(benches);
