//! Smoke-test utility: scores the example customer locally or against a running server.

use std::path::PathBuf;

use churnpal::artifact::{self, ArtifactLocation};
use churnpal::config;
use churnpal::http_client;
use churnpal::predictor;
use churnpal::record::example_customer;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let record = example_customer();

    let probability = match &options.url {
        Some(url) => http_client::predict_remote(url, &record).map_err(|err| err.to_string())?,
        None => {
            let location = match options.artifact {
                Some(path) => ArtifactLocation::bundle(path),
                None => {
                    let (config, _) = config::load_or_default(options.config.as_deref())
                        .map_err(|err| err.to_string())?;
                    config.serving.artifact
                }
            };
            let artifact = artifact::load(&location).map_err(|err| err.to_string())?;
            predictor::predict_one(&record, &artifact).map_err(|err| err.to_string())?
        }
    };
    println!("Churn probability: {probability}");
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    artifact: Option<PathBuf>,
    url: Option<String>,
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
            "--artifact" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifact requires a value".to_string())?;
                options.artifact = Some(PathBuf::from(value));
            }
            "--url" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--url requires a value".to_string())?;
                options.url = Some(value.clone());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    if options.url.is_some() && options.artifact.is_some() {
        return Err("--url and --artifact are mutually exclusive".to_string());
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "churnpal-predict",
        "",
        "Prints the churn probability of a built-in example customer.",
        "",
        "Usage:",
        "  churnpal-predict [--config churnpal.toml] [--artifact model.json]",
        "  churnpal-predict --url http://localhost:9696/predict",
        "",
        "Options:",
        "  --config <file>     Config file (default: ./churnpal.toml when present).",
        "  --artifact <file>   Single-file artifact to load (default: serving.artifact).",
        "  --url <endpoint>    POST the customer to a running server instead of loading locally.",
    ]
    .join("\n")
}
