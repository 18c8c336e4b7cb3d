use clap::Parser;
use env_logger::Env;
use piieval::{
    aggregate_metrics, build_label_mapping, group_report, score_texts, DataItem, EvalConfig,
    LabelGroup,
};
use serde_jsonlines::json_lines;
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::Path;
use std::time::{Duration, Instant};

fn read_items<P: AsRef<Path>>(path: P, n_copies: usize) -> Vec<DataItem> {
    let items = json_lines::<DataItem, P>(path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();
    items
        .iter()
        .cycle()
        .take(items.len() * n_copies)
        .cloned()
        .collect()
}

/// Parses a group such as `PER,PERSON`.
fn parse_group(s: &str) -> Result<LabelGroup, String> {
    let group: LabelGroup = s
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if group.is_empty() {
        return Err(format!("empty label group: {:?}", s));
    }
    Ok(group)
}

#[derive(Debug, Parser)]
struct Args {
    #[arg(short, long, default_value_t = 1)]
    n_samples: u32,
    /// JSON lines dataset, with predictions
    #[arg(short, long, default_value_t = String::from("./tests/fixtures/benchmark.jsonl"))]
    dataset: String,
    /// Number of copies of the dataset scored at once
    #[arg(short, long, default_value_t = 1)]
    copies: usize,
    /// Label groups, such as `-g PER,PERSON -g LOC`
    #[arg(short, long = "group", value_parser = parse_group)]
    groups: Vec<LabelGroup>,
    #[arg(long)]
    nontargeted: Vec<String>,
    #[arg(short, long)]
    parallel: bool,
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    use log::LevelFilter;

    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    let n_samples = args.n_samples;
    let iter = Range {
        start: 0,
        end: n_samples,
    };
    let nontargeted: BTreeSet<String> = args.nontargeted.iter().cloned().collect();
    let mapping = build_label_mapping(&args.groups, &nontargeted);
    let config = EvalConfig {
        parallel: args.parallel,
        ..EvalConfig::default()
    };
    let mut total_duration = Duration::ZERO;
    let mut last_scores = Vec::new();
    for _ in iter {
        let items = read_items(&args.dataset, args.copies);
        let now = Instant::now();
        {
            last_scores = score_texts(&items, &mapping, config.parallel).unwrap();
            aggregate_metrics(&last_scores, config.beta).unwrap();
        }
        let elapsed = now.elapsed();
        total_duration += elapsed;
    }
    println!(
        "Total duration: {} with {n_samples} samples",
        total_duration.as_secs_f64()
    );
    if !args.groups.is_empty() {
        println!("{}", group_report(&last_scores, &args.groups, &config).unwrap());
    }
}
