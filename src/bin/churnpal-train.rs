//! Trains the churn classifier with cross-validation and writes the artifact.

use std::path::PathBuf;

use churnpal::artifact::ArtifactLocation;
use churnpal::config;
use churnpal::logging;
use churnpal::training::{self, FinalFit, TrainReport};
use tracing::info;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("churnpal-train") {
        logging::init_console();
        eprintln!("File logging disabled: {err}");
    }

    let (mut config, source) =
        config::load_or_default(options.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(path) = &source {
        info!("Loaded config from {}", path.display());
    }
    let settings = &mut config.training;
    if let Some(data) = options.data {
        settings.data_path = data;
    }
    if let Some(out) = options.out {
        settings.artifact = ArtifactLocation::bundle(out);
    }
    if let Some(seed) = options.seed {
        settings.seed = seed;
    }
    if let Some(c) = options.c {
        settings.c = c;
    }
    if let Some(n_splits) = options.n_splits {
        settings.n_splits = n_splits;
    }
    if let Some(final_fit) = options.final_fit {
        settings.final_fit = final_fit;
    }
    config.validate().map_err(|err| err.to_string())?;

    let report = training::run(&config).map_err(|err| err.to_string())?;
    print_report(config.training.c, &report, &config.training.artifact);
    Ok(())
}

fn print_report(c: f64, report: &TrainReport, artifact: &ArtifactLocation) {
    for fold in &report.folds {
        match fold.auc {
            Some(auc) => println!("fold {}: auc={auc:.3}", fold.fold),
            None => println!("fold {}: auc=undefined (single-class held-out rows)", fold.fold),
        }
    }
    match &report.summary {
        Some(summary) => println!("C={c} {summary}"),
        None => println!("C={c} no defined fold AUC"),
    }
    match report.test_auc {
        Some(auc) => println!("test auc={auc:.3} accuracy={:.3}", report.test_accuracy),
        None => println!("test auc=undefined accuracy={:.3}", report.test_accuracy),
    }
    if report.convergence_warnings > 0 {
        println!(
            "warning: {} fit(s) stopped before converging",
            report.convergence_warnings
        );
    }
    println!("artifact written to {artifact}");
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    out: Option<PathBuf>,
    seed: Option<u64>,
    c: Option<f64>,
    n_splits: Option<usize>,
    final_fit: Option<FinalFit>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                options.data = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--c" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--c requires a value".to_string())?;
                options.c = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --c value: {value}"))?,
                );
            }
            "--n-splits" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--n-splits requires a value".to_string())?;
                options.n_splits = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --n-splits value: {value}"))?,
                );
            }
            "--final-fit" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--final-fit requires a value".to_string())?;
                options.final_fit = Some(match value.as_str() {
                    "last_fold" | "last-fold" => FinalFit::LastFold,
                    "full_train" | "full-train" => FinalFit::FullTrain,
                    other => return Err(format!("Invalid --final-fit value: {other}")),
                });
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "churnpal-train",
        "",
        "Cross-validates an L2 logistic regression churn model and writes the encoder/model artifact.",
        "",
        "Usage:",
        "  churnpal-train [--config churnpal.toml] [--data churn.csv] [--out model.json] [options]",
        "",
        "Options:",
        "  --config <file>        Config file (default: ./churnpal.toml when present).",
        "  --data <csv>           Training CSV with a header row (default: training.data_path).",
        "  --out <file>           Write a single-file artifact here (default: training.artifact).",
        "  --seed <u64>           Seed for the split and fold shuffles (default: 1).",
        "  --c <f64>              Inverse regularization strength (default: 1.0).",
        "  --n-splits <n>         Cross-validation folds (default: 5).",
        "  --final-fit <mode>     last_fold (default) or full_train.",
    ]
    .join("\n")
}
