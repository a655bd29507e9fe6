//! matchbell-worker: polls the match feed and sends milestone alerts.
//!
//! Channels are picked from config: webhook and/or Telegram when set,
//! otherwise alerts are written to the log.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use matchbell_core::{config, Config, Milestone};
use matchbell_feed::HttpEventFeed;
use matchbell_notify::{Dispatcher, LogNotifier, NotificationBuilder, TelegramNotifier, TemplateRenderer, WebhookNotifier};
use matchbell_scheduler::Scheduler;
use matchbell_store::FileKvStore;

// ── CLI ─────────────────────────────────────────────────────────────

/// Match alert worker: sends pre-start, live and result notifications.
#[derive(Parser, Debug)]
#[command(name = "matchbell-worker", version, about)]
struct Cli {
    /// Feed URL (overrides FEED_URL from config).
    #[arg(long, env = "MATCHBELL_FEED_URL")]
    feed_url: Option<String>,

    /// Seconds between checks (overrides CHECK_INTERVAL_SECS).
    #[arg(long, env = "MATCHBELL_INTERVAL")]
    interval: Option<u64>,

    /// Directory for persisted state (overrides DATA_DIR).
    #[arg(long, env = "MATCHBELL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Run a single check and exit.
    #[arg(long)]
    once: bool,

    /// Send the "notifications ready" alert and exit.
    #[arg(long)]
    test_notification: bool,

    /// Print the rendered alert for a milestone (e.g. `started`) and exit.
    #[arg(long, value_name = "MILESTONE")]
    preview: Option<Milestone>,
}

// ── Channels ────────────────────────────────────────────────────────

fn build_dispatcher(cfg: &Config) -> anyhow::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::empty();
    let renderer = Arc::new(TemplateRenderer::new());

    if let Some(webhook) = WebhookNotifier::from_config(&cfg.delivery, renderer).context("webhook channel")? {
        dispatcher.add_channel(Box::new(webhook));
    }
    if let Some(telegram) = TelegramNotifier::from_config(&cfg.delivery).context("telegram channel")? {
        dispatcher.add_channel(Box::new(telegram));
    }
    if dispatcher.channel_count() == 0 {
        info!("No delivery channel configured, alerts go to the log");
        dispatcher.add_channel(Box::new(LogNotifier::new()));
    }
    Ok(dispatcher)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::from_env();
    if let Some(url) = cli.feed_url {
        cfg.feed.url = Some(url);
    }
    if let Some(interval) = cli.interval {
        cfg.scheduler.check_interval_secs = interval;
    }
    if let Some(dir) = cli.data_dir {
        cfg.storage.data_dir = dir;
    }
    cfg.log_summary();

    let feed = HttpEventFeed::from_config(&cfg.feed).context("feed")?;
    let backend = FileKvStore::new(&cfg.storage.data_dir)
        .with_context(|| format!("opening data dir {}", cfg.storage.data_dir.display()))?;

    let scheduler = Scheduler::builder(Arc::new(feed), build_dispatcher(&cfg)?, Arc::new(backend))
        .config(cfg.scheduler.clone())
        .notifications(NotificationBuilder::from_config(&cfg.delivery))
        .build();

    if let Some(milestone) = cli.preview {
        let record = scheduler.preview_notification(milestone)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if cli.test_notification {
        let delivered = scheduler.send_test_notification().await?;
        info!(channels = ?delivered.channels, "Test notification sent");
        return Ok(());
    }

    if cli.once {
        let report = scheduler.force_check_now().await?;
        info!(
            events = report.events,
            delivered = report.delivered,
            duplicates = report.duplicates,
            "Check complete"
        );
        scheduler.stop().await;
        return Ok(());
    }

    scheduler.start().await?;
    info!("matchbell-worker running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Shutdown requested");
    scheduler.stop().await;

    let stats = scheduler.stats().await;
    info!(
        delivered = stats.counters.alerts_delivered,
        failed = stats.counters.delivery_failures,
        ticks = stats.counters.ticks,
        "matchbell-worker exited cleanly"
    );
    Ok(())
}
