use clap::{Arg, Command};
use log::LevelFilter;
use phishscan::config::Config;
use phishscan::inference::InferenceContext;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishscan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing email classifier: hybrid sequence model plus URL/keyword features behind a web form")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phishscan.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-email")
                .long("test-email")
                .value_name("FILE")
                .help("Classify an email body from a file and exit")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .value_name("ADDR")
                .help("Override the configured listen address")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match Config::generate_default(generate_path) {
            Ok(()) => {
                println!("Default configuration written to {generate_path}");
                return;
            }
            Err(e) => {
                log::error!("Failed to generate configuration: {e:#}");
                process::exit(1);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e:#}");
            process::exit(1);
        }
    };

    if let Some(listen) = matches.get_one::<String>("listen") {
        config.listen = listen.clone();
    }

    if let Err(e) = config.check_artifacts() {
        log::error!("Artifact check failed: {e:#}");
        process::exit(1);
    }

    // Artifacts are loaded once here and shared read-only for the process
    // lifetime; every request recomputes its features from scratch.
    let context = match InferenceContext::load(&config) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            log::error!("Failed to load trained artifacts: {e:#}");
            process::exit(1);
        }
    };
    log::info!(
        "inference context ready (threshold {:.2})",
        context.threshold()
    );

    if let Some(email_path) = matches.get_one::<String>("test-email") {
        test_email(&context, email_path);
        return;
    }

    if let Err(e) = phishscan::server::serve(&config.listen, context).await {
        log::error!("Server error: {e:#}");
        process::exit(1);
    }
}

fn test_email(context: &InferenceContext, path: &str) {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => {
            log::error!("Failed to read {path}: {e}");
            process::exit(1);
        }
    };

    let (normalized, vector) = context.features(&body);
    println!("Normalized: {normalized}");
    println!("Features:   {vector:?}");

    match context.classify(&body) {
        Ok(prediction) => {
            println!(
                "Result:     {} ({:.2}%)",
                prediction.label,
                prediction.score * 100.0
            );
        }
        Err(e) => {
            log::error!("Prediction failed: {e:#}");
            process::exit(1);
        }
    }
}
