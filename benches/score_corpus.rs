use criterion::{criterion_group, criterion_main, Criterion};
use piieval::{
    aggregate_metrics, build_label_mapping, identify_pii_entities, score_texts, Data, DataItem,
    GazetteerRecogniser, LabelGroup,
};
use pprof::criterion::{Output, PProfProfiler};
use serde_jsonlines::json_lines;
use std::collections::BTreeSet;
use std::path::Path;

const FIXTURE: &str = "./tests/fixtures/benchmark.jsonl";

fn read_items<P: AsRef<Path>>(path: P) -> Vec<DataItem> {
    json_lines::<DataItem, P>(path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect::<Vec<_>>()
}

/// Corpus of `n_copies` copies of the fixture, with the predictions of a gazetteer.
fn build_corpus(n_copies: usize) -> Data {
    let items = read_items(FIXTURE);
    let data = Data::from(
        items
            .iter()
            .cycle()
            .take(items.len() * n_copies)
            .cloned()
            .collect::<Vec<_>>(),
    );
    let recogniser = GazetteerRecogniser::new()
        .with_term("PER", "Bob")
        .with_term("PER", "Smith")
        .with_term("PER", "Ann")
        .with_term("LOC", "Melbourne")
        .with_term("LOC", "Sydney")
        .with_term("LOC", "Oslo")
        .with_term("EMAIL_ADDRESS", "zoë.ek@example.com");
    identify_pii_entities(data, &recogniser).unwrap()
}

fn groups() -> Vec<LabelGroup> {
    vec![
        BTreeSet::from([String::from("PER"), String::from("PERSON")]),
        BTreeSet::from([String::from("LOC"), String::from("GPE")]),
        BTreeSet::from([String::from("EMAIL_ADDRESS")]),
    ]
}

fn benchmark_corpus(c: &mut Criterion, name: &str, n_copies: usize, parallel: bool) {
    let data = build_corpus(n_copies);
    let mapping = build_label_mapping(&groups(), &BTreeSet::from([String::from("DATE")]));
    c.bench_function(name, |b| {
        b.iter(|| {
            let scores = score_texts(&data.items, &mapping, parallel).unwrap();
            aggregate_metrics(&scores, 1.0).unwrap()
        })
    });
}

fn benchmark_small_corpus(c: &mut Criterion) {
    benchmark_corpus(c, "small_corpus_scores", 20, false);
}
fn benchmark_big_corpus(c: &mut Criterion) {
    benchmark_corpus(c, "big_corpus_scores", 2_000, false);
}
fn benchmark_big_corpus_parallel(c: &mut Criterion) {
    benchmark_corpus(c, "big_corpus_scores_parallel", 2_000, true);
}

criterion_group!(
    name=corpus_benches;
    config = Criterion::default().sample_size(100).with_profiler(PProfProfiler::new(3000, Output::Flamegraph(None)));
    targets = benchmark_small_corpus,
    benchmark_big_corpus,
    benchmark_big_corpus_parallel
);
criterion_main!(corpus_benches);
