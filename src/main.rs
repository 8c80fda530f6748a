//! Entry point for the churn prediction HTTP service.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use churnpal::config;
use churnpal::logging;
use churnpal::serving::PredictServer;
use tracing::info;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("churnpal") {
        logging::init_console();
        eprintln!("File logging disabled: {err}");
    }

    let (mut config, source) =
        config::load_or_default(options.config.as_deref()).map_err(|err| err.to_string())?;
    match &source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found; using defaults"),
    }
    if let Some(bind) = options.bind {
        config.serving.bind = bind;
    }
    if options.cache {
        config.serving.cache_artifact = true;
    }
    config.validate().map_err(|err| err.to_string())?;

    info!(
        artifact = %config.serving.artifact,
        cache = config.serving.cache_artifact,
        "Starting predict service"
    );
    let server = PredictServer::bind(&config.serving).map_err(|err| err.to_string())?;
    server.run(&SHUTDOWN).map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    bind: Option<String>,
    cache: bool,
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
            "--bind" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bind requires a value".to_string())?;
                options.bind = Some(value.clone());
            }
            "--cache" => {
                options.cache = true;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "churnpal",
        "",
        "Serves churn probabilities over HTTP: POST a customer as a JSON object to the predict route.",
        "",
        "Usage:",
        "  churnpal [--config churnpal.toml] [--bind 0.0.0.0:9696] [--cache]",
        "",
        "Options:",
        "  --config <file>   Config file (default: ./churnpal.toml when present).",
        "  --bind <addr>     Listen address (default: serving.bind, 0.0.0.0:9696).",
        "  --cache           Load the artifact once at startup instead of per request.",
    ]
    .join("\n")
}
