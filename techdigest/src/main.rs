/*
techdigest - single-binary main.rs
This binary runs the Telegram update listener and the scheduled digest
pipeline inside the same process.
*/

use anyhow::{Context, Result};
use chrono::Timelike;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use techdigest::llm::remote::RemoteProvider;
use techdigest::llm::CompletionProvider;
use techdigest::news::{NewsApiClient, NewsSource};
use techdigest::pipeline::Pipeline;
use techdigest::subscribers::Registry;
use techdigest::telegram::{run_listener, TelegramClient, Transport};

#[derive(Parser, Debug)]
#[command(name = "techdigest", about = "Scheduled technology news digest bot")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a single digest tick immediately and exit
    #[arg(long)]
    once: bool,

    /// Disable the Telegram update listener (scheduler only)
    #[arg(long)]
    no_listener: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths: packaged defaults plus an optional override.
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() {
            Some(&default_path)
        } else {
            None
        },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");

    // Secrets come from the environment; config only names the variables.
    let telegram_token = std::env::var(&config.telegram.token_env)
        .with_context(|| format!("env var '{}' not set", config.telegram.token_env))?;
    let news_api_key = std::env::var(&config.news.api_key_env)
        .with_context(|| format!("env var '{}' not set", config.news.api_key_env))?;
    let llm_api_key = std::env::var(&config.llm.api_key_env)
        .with_context(|| format!("env var '{}' not set", config.llm.api_key_env))?;

    let news: Arc<dyn NewsSource> = Arc::new(NewsApiClient::new(
        news_api_key,
        config.news.page_size.unwrap_or(10),
    )?);

    let llm_api_url = config
        .llm
        .api_url
        .clone()
        .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
    let llm_model = config
        .llm
        .model
        .clone()
        .unwrap_or_else(|| "gpt-4o-mini".to_string());
    let llm: Arc<dyn CompletionProvider> = Arc::new(
        RemoteProvider::new(llm_api_url, llm_api_key, llm_model).with_defaults(
            config.llm.timeout_seconds.unwrap_or(30),
            config.llm.max_tokens.unwrap_or(500),
            0.7,
        ),
    );

    let poll_timeout = config.telegram.poll_timeout_seconds.unwrap_or(50);
    let telegram = Arc::new(match &config.telegram.api_url {
        Some(api_url) => {
            TelegramClient::with_api_base(api_url.as_str(), telegram_token, poll_timeout)?
        }
        None => TelegramClient::new(telegram_token, poll_timeout)?,
    });

    let registry = Registry::new();
    let language = config.news.language.clone().unwrap_or_else(|| "en".to_string());
    let pipeline = Pipeline::new(
        news,
        llm,
        telegram.clone() as Arc<dyn Transport>,
        registry.clone(),
        language,
    );

    if args.once {
        info!("Running a single digest tick (--once)");
        match pipeline.run_tick().await? {
            Some(report) => info!(
                title = %report.article_title,
                delivered = report.delivered,
                failed = report.failed,
                "digest tick complete"
            ),
            None => info!("tick skipped"),
        }
        return Ok(());
    }

    let shutdown_notify = Arc::new(Notify::new());

    let mut listener_handle = None;
    if !args.no_listener {
        info!("Spawning Telegram update listener");
        let l_client = telegram.clone();
        let l_registry = registry.clone();
        let l_shutdown = shutdown_notify.clone();
        listener_handle = Some(tokio::spawn(async move {
            run_listener(l_client, l_registry, l_shutdown).await;
        }));
    } else {
        info!("Update listener disabled via CLI (--no-listener)");
    }

    let times = config
        .scheduler
        .parsed_times()
        .context("failed to parse scheduler times")?;
    info!(times = ?config.scheduler.times, "scheduler ready");

    // Scheduler loop: wake twice a minute, fire when a configured wall-clock
    // time is reached, and never fire the same minute twice.
    let mut last_fired: Option<String> = None;
    loop {
        let now = chrono::Local::now();
        let due = times
            .iter()
            .any(|t| t.hour() == now.hour() && t.minute() == now.minute());
        let minute_stamp = now.format("%Y-%m-%d %H:%M").to_string();

        if due && last_fired.as_deref() != Some(minute_stamp.as_str()) {
            last_fired = Some(minute_stamp);
            match pipeline.run_tick().await {
                Ok(Some(report)) => info!(
                    title = %report.article_title,
                    delivered = report.delivered,
                    failed = report.failed,
                    "digest tick complete"
                ),
                Ok(None) => {}
                Err(e) => error!(%e, "digest tick failed"),
            }
        }

        select! {
            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
                break;
            }
        }
    }

    shutdown_notify.notify_waiters();
    if let Some(handle) = listener_handle {
        match tokio::time::timeout(Duration::from_secs(10), handle).await {
            Ok(Ok(())) => info!("listener exited cleanly"),
            Ok(Err(join_err)) => error!(%join_err, "listener task panicked"),
            Err(_) => info!("Timed out waiting for listener to exit; continuing shutdown"),
        }
    }

    info!("Shutdown complete");
    Ok(())
}
