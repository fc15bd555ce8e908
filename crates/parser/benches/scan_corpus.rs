//! Benchmarks for the locator and the item key parser.
//!
//! Run with: cargo bench
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glob::glob;
use hostmacro_parser::{find_all, ItemKey, MacroKind, ScanSet};
use std::fs;

/// Load every corpus file as (name, lines).
fn load_corpus() -> Vec<(String, Vec<String>)> {
    let mut corpus = Vec::new();

    // Try multiple paths to handle different working directories
    let patterns = ["benches/corpus/*.txt", "crates/parser/benches/corpus/*.txt"];

    for pattern in patterns {
        for path in glob(pattern).expect("Failed to read glob pattern").flatten() {
            if let Ok(content) = fs::read_to_string(&path) {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                if !corpus.iter().any(|(n, _)| n == &name) {
                    corpus.push((name, content.lines().map(str::to_string).collect()));
                }
            }
        }
    }

    corpus.sort_by(|a, b| a.0.cmp(&b.0));
    corpus
}

fn full_scan_set() -> ScanSet<'static> {
    ScanSet::new()
        .with_kinds(&[
            MacroKind::UserMacro,
            MacroKind::PositionalMacro,
            MacroKind::Replacement,
            MacroKind::MacroFunction,
            MacroKind::Reference,
            MacroKind::LldMacro,
        ])
        .with_names([
            "HOSTNAME",
            "HOST.HOST",
            "HOST.NAME",
            "HOST.CONN",
            "HOST.PORT",
            "ITEM.VALUE",
            "ITEM.LASTVALUE",
        ])
}

fn bench_locator(c: &mut Criterion) {
    let corpus = load_corpus();

    if corpus.is_empty() {
        eprintln!("Warning: No corpus files found under benches/corpus.");
        return;
    }

    let set = full_scan_set();
    let mut group = c.benchmark_group("find_all");
    for (name, lines) in &corpus {
        let bytes: usize = lines.iter().map(String::len).sum();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::new("scan", name), lines, |b, lines| {
            b.iter(|| {
                for line in lines {
                    black_box(find_all(line, &set));
                }
            });
        });
    }
    group.finish();
}

fn bench_item_keys(c: &mut Criterion) {
    let corpus = load_corpus();
    let Some((_, keys)) = corpus.iter().find(|(name, _)| name == "item_keys") else {
        return;
    };

    let mut group = c.benchmark_group("item_key");
    group.bench_function("parse", |b| {
        b.iter(|| {
            for key in keys {
                let _ = black_box(ItemKey::parse(key));
            }
        });
    });
    group.bench_function("parse_and_substitute", |b| {
        b.iter(|| {
            for key in keys {
                if let Ok(parsed) = ItemKey::parse(key) {
                    black_box(parsed.substitute(|v| v.starts_with('{').then(|| v.to_lowercase())));
                }
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_locator, bench_item_keys);
criterion_main!(benches);
