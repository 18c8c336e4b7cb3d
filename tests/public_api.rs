use piieval::{
    evaluate_conf, group_report, identify_pii_entities, run_benchmark, spans_to_tokens,
    tokens_to_spans, DataItem, DatasetReader, EvalConfig, EvalConfigBuilder, JsonLinesReader,
    LabelGroup, MatchMode, MemoryReporter, Recogniser, RecogniserFactory, RecogniserParams,
    SpanLabel, TokenEvaluator, Tokeniser, TokeniserFactory, WordPunctTokeniser, OUTSIDE_LABEL,
};
use serde_jsonlines::json_lines;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const FIXTURE: &str = "tests/fixtures/benchmark.jsonl";

pub trait CloseEnough {
    fn are_close(&self, other: &Self, eps: f64) -> bool;
}

impl CloseEnough for f64 {
    fn are_close(&self, other: &Self, eps: f64) -> bool {
        f64::abs(self - other) < eps
    }
}

fn group(labels: &[&str]) -> LabelGroup {
    labels.iter().map(|l| String::from(*l)).collect()
}

fn groups() -> Vec<LabelGroup> {
    vec![
        group(&["PER", "PERSON"]),
        group(&["LOC", "GPE"]),
        group(&["EMAIL_ADDRESS"]),
    ]
}

fn nontargeted() -> BTreeSet<String> {
    BTreeSet::from([String::from("DATE")])
}

fn params() -> RecogniserParams {
    let terms = BTreeMap::from([
        (
            String::from("PER"),
            vec![String::from("Bob"), String::from("Smith"), String::from("Ann")],
        ),
        (
            String::from("LOC"),
            vec![
                String::from("Melbourne"),
                String::from("Sydney"),
                String::from("Oslo"),
            ],
        ),
        (
            String::from("EMAIL_ADDRESS"),
            vec![String::from("zoë.ek@example.com")],
        ),
    ]);
    RecogniserParams { terms }
}

#[test]
fn fixture_is_readable_as_json_lines() {
    let items = json_lines::<DataItem, _>(FIXTURE)
        .expect("file benchmark.jsonl not found in test directory")
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|item| item.pred_labels.is_none()));
    assert_eq!(
        items[2].true_labels[0],
        SpanLabel::new("EMAIL_ADDRESS", 13, 31)
    );
}

#[test]
fn true_spans_survive_tokenisation() {
    let data = JsonLinesReader.build_data(Path::new(FIXTURE)).unwrap();
    for item in data.items {
        let tokens = WordPunctTokeniser.tokenise(&item.text);
        let token_labels = spans_to_tokens(&item.true_labels, &tokens);
        let spans: Vec<SpanLabel> = tokens_to_spans(&token_labels)
            .unwrap()
            .into_iter()
            .filter(|s| s.entity_type != OUTSIDE_LABEL)
            .collect();
        assert_eq!(spans, item.true_labels, "{}", item.text);
    }
}

#[test]
fn benchmark_of_a_gazetteer() {
    let recogniser = RecogniserFactory::create("gazetteer", params()).unwrap();
    let mut reporter = MemoryReporter::new();
    let metrics = run_benchmark(
        &JsonLinesReader,
        Path::new(FIXTURE),
        recogniser.as_ref(),
        &groups(),
        &nontargeted(),
        &EvalConfig::default(),
        &mut reporter,
    )
    .unwrap();

    // F1 of the texts: "Bob" and "Smith" cover 8 of the 9 characters of "Bob Smith", "Perth"
    // is missed, the text without entity is skipped.
    let expected_exact = (34.0 / 35.0 + 1.0 + 1.0 + 0.8) / 4.0;
    let expected_partial = (1.0 + 1.0 + 1.0 + 0.8) / 4.0;
    assert!(metrics["exact_match_f1"].are_close(&expected_exact, 1e-9));
    assert!(metrics["partial_match_f1_threshold_at_50%"].are_close(&expected_partial, 1e-9));

    assert_eq!(reporter.run_name(), Some("GazetteerRecogniser"));
    assert!(!reporter.is_open());
    // 2 aggregate metrics, 3 groups for each of the 2 match modes
    assert_eq!(reporter.metrics().len(), 8);
    assert!(reporter
        .get("PER|PERSON_exact_match_f1")
        .unwrap()
        .are_close(&(52.0 / 53.0), 1e-9));
    assert!(reporter
        .get("GPE|LOC_exact_match_f1")
        .unwrap()
        .are_close(&(6.0 / 7.0), 1e-9));
    assert_eq!(
        reporter.get("EMAIL_ADDRESS_partial_match_f1_threshold_at_50%"),
        Some(1.0)
    );
}

#[test]
fn report_of_a_gazetteer() {
    let recogniser = RecogniserFactory::create("gazetteer", params()).unwrap();
    let data = JsonLinesReader.build_data(Path::new(FIXTURE)).unwrap();
    let data = identify_pii_entities(data, recogniser.as_ref()).unwrap();
    let config = EvalConfigBuilder::default()
        .match_mode(MatchMode::Exact)
        .parallel(true)
        .build()
        .unwrap();
    let report = evaluate_conf(&data, &groups(), &nontargeted(), config).unwrap();

    let names: Vec<&str> = report.iter().map(|row| row.group.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Overall_Weighted",
            "Overall_Macro",
            "PER|PERSON",
            "GPE|LOC",
            "EMAIL_ADDRESS"
        ]
    );
    let per = report.get("PER|PERSON").unwrap();
    assert_eq!(per.precision, 1.0);
    assert!(per.recall.are_close(&(26.0 / 27.0), 1e-9));
    assert_eq!(per.support, 3);
    let loc = report.get("GPE|LOC").unwrap();
    assert_eq!(loc.recall, 0.75);
    assert_eq!(loc.support, 4);
    let overall = report.get("Overall_Weighted").unwrap();
    assert_eq!(overall.support, 8);
    assert!(overall
        .recall
        .are_close(&((26.0 / 27.0 * 3.0 + 0.75 * 4.0 + 1.0) / 8.0), 1e-9));

    // the report does not depend on the way the texts were scored
    let sequential = evaluate_conf(&data, &groups(), &nontargeted(), EvalConfig::default()).unwrap();
    assert_eq!(report.to_string(), sequential.to_string());
}

#[test]
fn unsupported_entities_are_rejected() {
    let recogniser = RecogniserFactory::create("email", RecogniserParams::default()).unwrap();
    let err = recogniser
        .analyse("Bob", &[String::from("PER")])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Recogniser EmailRecogniser does not support entity type PER"
    );
}

#[test]
fn empty_report_for_unscored_groups() {
    let report = group_report(&[], &groups(), &EvalConfig::default()).unwrap();
    assert_eq!(report.len(), 5);
    assert!(report.get("Overall_Macro").unwrap().fscore.is_nan());
}

#[test]
fn token_evaluation_of_a_gazetteer() {
    let recogniser = RecogniserFactory::create("gazetteer", params()).unwrap();
    let evaluator = TokenEvaluator::new(
        recogniser.as_ref(),
        vec![String::from("PER"), String::from("LOC")],
        TokeniserFactory::create("word_punct").unwrap(),
    )
    .with_label_conversion(BTreeMap::from([(String::from("PER"), String::from("PERSON"))]));
    assert_eq!(evaluator.evaluated_entities(), vec!["PERSON", "LOC"]);

    let texts = vec![String::from("Bob Smith visited Perth.")];
    let annotations = vec![["PERSON", "PERSON", "O", "LOC", "O"].map(String::from).to_vec()];
    let (counters, mistakes) = evaluator.evaluate_all(&texts, &annotations).unwrap();
    assert_eq!(mistakes[0].token_errors.len(), 1);
    assert_eq!(mistakes[0].token_errors[0].token, "Perth");

    let scores = evaluator.calculate_score(&counters, 1.0).unwrap();
    assert_eq!(scores.fscore["PERSON"], 1.0);
    assert_eq!(scores.recall["LOC"], 0.0);
    assert!(scores.precision["LOC"].is_nan());
}
