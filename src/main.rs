mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cli::{Cli, Command};
use musaix_analyzer::callback::WebhookCallback;
use musaix_analyzer::config::{self, Config, Credentials};
use musaix_analyzer::embedding::OpenAiEmbedder;
use musaix_analyzer::pipeline;
use musaix_analyzer::storage::HttpObjectStore;
use musaix_analyzer::{build_router, AppState, Analyzer, ProcessingStatus, Worker};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = match config::find_config(cli.config.as_deref()) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, bind),
        Command::Analyze { input, output } => analyze(&config, &input, output.as_deref()),
        Command::Validate { input } => validate(&config, &input),
    }
}

fn serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    // Fail at startup, not on the first request
    let creds = Credentials::from_env()?;

    let embedder = OpenAiEmbedder::new(&config.embedding, creds.embedding_api_key.clone())?;
    let analyzer = Analyzer::new(config.analysis.clone(), Box::new(embedder));
    let store = HttpObjectStore::new(
        &creds.storage_url,
        &config.storage.bucket,
        creds.storage_service_key.clone(),
    )?;
    let sink = WebhookCallback::new(&creds.app_url, &config.callback, creds.webhook_secret.clone())?;
    log::info!("Callback target: {}", sink.url());

    let worker = Arc::new(
        Worker::new(analyzer, Box::new(store), Box::new(sink))
            .with_default_suffix(config.storage.default_suffix.clone()),
    );
    let app = build_router(AppState::with_max_jobs(
        Arc::clone(&worker),
        config.server.max_concurrent_jobs,
    ));

    // The blocking HTTP clients inside `worker` must be dropped outside the
    // async runtime, so the runtime is built here rather than via #[tokio::main].
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    let bind = config.server.bind.clone();
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind {}", bind))?;
        log::info!(
            "{} v{} listening on http://{}",
            musaix_analyzer::api::SERVICE_NAME,
            env!("CARGO_PKG_VERSION"),
            bind
        );
        axum::serve(listener, app).await.context("Server error")
    })?;

    drop(runtime);
    drop(worker);
    Ok(())
}

fn analyze(config: &Config, input: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let api_key = config::require_env(config::ENV_EMBEDDING_KEY)?;
    let embedder = OpenAiEmbedder::new(&config.embedding, api_key)?;
    let analyzer = Analyzer::new(config.analysis.clone(), Box::new(embedder));

    log::info!("Analyzing {}", input.display());
    let result = analyzer.analyze(input);
    let json = serde_json::to_string_pretty(&result)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Result written to {}", path.display());
        }
        None => println!("{}", json),
    }

    if result.status() == ProcessingStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn validate(config: &Config, input: &std::path::Path) -> Result<()> {
    let valid = pipeline::validate_audio(input, config.analysis.validate_duration_secs);
    println!("{}", valid);
    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
