use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use message_archive_search::artifact::shard::ShardName;
use message_archive_search::artifact::tokenize::tokenize;
use message_archive_search::indexer::IndexedCorpus;
use message_archive_search::model::MessageRecord;
use message_archive_search::search::SearchIndex;

const WORDS: [&str; 24] = [
    "archive", "message", "search", "general", "release", "quartz", "sequoia", "harbor",
    "thread", "reply", "update", "window", "render", "shard", "token", "forward", "status",
    "moment", "player", "static", "winter", "signal", "bridge", "lantern",
];

/// Deterministic synthetic archive; word choice cycles so every record stays
/// distinct without pulling in a RNG.
fn build_records(count: usize) -> Vec<MessageRecord> {
    (0..count)
        .map(|idx| {
            let pick = |offset: usize| WORDS[(idx * 7 + offset * 13) % WORDS.len()];
            let body: Vec<&str> = (0..12).map(pick).collect();
            serde_json::from_value(serde_json::json!({
                "id": idx as u64 + 1,
                "page": (idx % 40) as u32 + 1,
                "timestamp": "2024-11-20T10:00:00Z",
                "user": format!("user-{}", idx % 50),
                "flair": if idx % 3 == 0 { Some(pick(3)) } else { None },
                "title": format!("{} {}", pick(1), pick(2)),
                "body": body.join(" "),
            }))
            .expect("valid record fixture")
        })
        .collect()
}

fn encoded_shards(count: usize) -> Vec<Vec<u8>> {
    let corpus = IndexedCorpus::from_records(build_records(count)).expect("corpus builds");
    ShardName::ALL
        .iter()
        .map(|name| corpus.shard_bytes(*name).expect("shard encodes"))
        .collect()
}

fn loaded_index(count: usize) -> SearchIndex {
    SearchIndex::from_shard_bytes(encoded_shards(count)).expect("index imports")
}

// =============================================================================
// Tokenizer Benchmarks
// =============================================================================

/// Benchmark the tokenizer on a long message body (~10KB).
fn bench_tokenize_long_body(c: &mut Criterion) {
    let long_body: String = (0..100)
        .map(|i| {
            format!(
                "Paragraph {}: the archive keeps every message, and search must \
                 find each one again. Punctuation, digits like 2024, and CASE \
                 all pass through the same normalization. ",
                i
            )
        })
        .collect();

    c.bench_function("tokenize_long_body", |b| {
        b.iter(|| black_box(tokenize(&long_body)))
    });
}

// =============================================================================
// Builder Benchmarks
// =============================================================================

/// Benchmark corpus construction on a realistic archive size.
/// Target: well under a second; the builder runs once per site deploy.
fn bench_build_corpus_5k(c: &mut Criterion) {
    let records = build_records(5_000);
    c.bench_function("build_corpus_5k", |b| {
        b.iter(|| {
            let corpus = IndexedCorpus::from_records(black_box(records.clone()))
                .expect("corpus builds");
            black_box(corpus)
        })
    });
}

/// Benchmark encoding the full 14-shard set from a built corpus.
fn bench_encode_shard_set_5k(c: &mut Criterion) {
    let corpus = IndexedCorpus::from_records(build_records(5_000)).expect("corpus builds");
    c.bench_function("encode_shard_set_5k", |b| {
        b.iter(|| {
            for name in ShardName::ALL {
                let bytes = corpus.shard_bytes(name).expect("shard encodes");
                black_box(bytes);
            }
        })
    });
}

/// Parameterized benchmark for corpus construction at different archive sizes.
fn bench_build_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_scaling");
    for size in [500, 2_000, 10_000] {
        let records = build_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let corpus = IndexedCorpus::from_records(black_box(records.clone()))
                    .expect("corpus builds");
                black_box(corpus)
            })
        });
    }
    group.finish();
}

// =============================================================================
// Import Benchmarks
// =============================================================================

/// Benchmark decoding and cross-checking a fetched shard set. This is the
/// one-time cost the first page-session query pays.
/// Target: <100ms at 10k messages
fn bench_import_shard_set_10k(c: &mut Criterion) {
    let shards = encoded_shards(10_000);
    c.bench_function("import_shard_set_10k", |b| {
        b.iter(|| {
            let index = SearchIndex::from_shard_bytes(black_box(shards.clone()))
                .expect("index imports");
            black_box(index)
        })
    });
}

// =============================================================================
// Query Benchmarks
// =============================================================================

/// Benchmark a single-token query against a loaded index.
/// Target: <1ms; this runs on every keystroke.
fn bench_search_single_token(c: &mut Criterion) {
    let index = loaded_index(10_000);
    c.bench_function("search_single_token", |b| {
        b.iter(|| black_box(index.search(black_box("archive"), 10)))
    });
}

/// Benchmark a short prefix, the widest token unions the runtime ever takes.
fn bench_search_short_prefix(c: &mut Criterion) {
    let index = loaded_index(10_000);
    c.bench_function("search_short_prefix", |b| {
        b.iter(|| black_box(index.search(black_box("s"), 10)))
    });
}

/// Benchmark a multi-token query, which intersects per-token unions.
fn bench_search_multi_token(c: &mut Criterion) {
    let index = loaded_index(10_000);
    c.bench_function("search_multi_token", |b| {
        b.iter(|| black_box(index.search(black_box("archive message search"), 10)))
    });
}

/// Benchmark a query with no matches; must stay cheap since users type
/// through plenty of these on the way to a hit.
fn bench_search_no_match(c: &mut Criterion) {
    let index = loaded_index(10_000);
    c.bench_function("search_no_match", |b| {
        b.iter(|| black_box(index.search(black_box("zyzzyva"), 10)))
    });
}

criterion_group!(
    benches,
    // Tokenizer benchmarks
    bench_tokenize_long_body,
    // Builder benchmarks
    bench_build_corpus_5k,
    bench_encode_shard_set_5k,
    bench_build_scaling,
    // Import benchmarks
    bench_import_shard_set_10k,
    // Query benchmarks
    bench_search_single_token,
    bench_search_short_prefix,
    bench_search_multi_token,
    bench_search_no_match,
);
criterion_main!(benches);
