use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::runtime::Runtime;
use triedex::core::index::FullTextIndex;

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "search", "index",
    "trie", "node", "query", "token", "snapshot", "merge", "score", "field", "phrase", "fuzzy",
];

/// Helper to create random document text
fn create_text(rng: &mut StdRng, word_count: usize) -> String {
    (0..word_count)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn populated_index(runtime: &Runtime, documents: u32) -> FullTextIndex<u32> {
    let mut rng = StdRng::seed_from_u64(42);
    let index = FullTextIndex::builder().build().unwrap();

    runtime.block_on(async {
        index.begin_batch_change().await.unwrap();
        for key in 0..documents {
            let text = create_text(&mut rng, 50);
            index.add_text(key, &text).await.unwrap();
        }
        index.commit_batch_change().await.unwrap();
    });

    index
}

/// Benchmark single document insertion
fn bench_single_insert(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let index = FullTextIndex::<u32>::builder().build().unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    c.bench_function("single_document_insert", |b| {
        let mut key = 0;
        b.iter(|| {
            let text = create_text(&mut rng, 100);
            runtime.block_on(index.add_text(key, &text)).unwrap();
            key += 1;
        });
    });
}

/// Benchmark single document insertion into an already large index
fn bench_insert_into_populated_index(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("insert_into_populated_index");
    group.sample_size(20);

    for documents in [1_000u32, 20_000] {
        let index = populated_index(&runtime, documents);
        let mut rng = StdRng::seed_from_u64(7);

        group.bench_with_input(BenchmarkId::from_parameter(documents), &documents, |b, &documents| {
            let mut key = documents;
            b.iter(|| {
                let text = create_text(&mut rng, 50);
                runtime.block_on(index.add_text(key, &text)).unwrap();
                key += 1;
            });
        });
    }

    group.finish();
}

/// Benchmark batch insertion
fn bench_batch_insert(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("batch_insert");

    for batch_size in [10u32, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch_size, |b, &batch_size| {
            b.iter(|| black_box(populated_index(&runtime, batch_size)));
        });
    }

    group.finish();
}

/// Benchmark query shapes over a fixed index
fn bench_search(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let index = populated_index(&runtime, 2000);
    let mut group = c.benchmark_group("search");

    for query in ["fox", "quick & fox", "quick > fox", "quick ~3 fox", "\"lazy dog\"", "sea*", "?serch"] {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            b.iter(|| black_box(index.search(query).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_insert_into_populated_index,
    bench_batch_insert,
    bench_search
);
criterion_main!(benches);
