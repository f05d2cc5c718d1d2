//! Graph research collector
//!
//! Background job that gathers one user's social-graph data and turns it
//! into labeled training examples.
//!
//! # Flow
//!
//! - **Snapshot**: profile, friends (recursively), wall and likes of the token owner
//! - **Collection**: sample wall posts, fetch their authors, extract features
//! - **Hand-off**: write the training set to a uniquely named file
//!
//! # Cancellation
//!
//! SIGINT/SIGTERM stop the run; no further requests are issued and partial
//! results are discarded.

use anyhow::{bail, Context};
use graph_research::collector::metrics::DatasetAnalyzer;
use graph_research::{
    output, Config, FeatureExtractor, GraphClient, SnapshotBuilder, TrainingSetBuilder,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  🚀 Graph Research Collector v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    let config = Config::from_env().context("failed to load configuration")?;
    info!("✅ Configuration loaded and validated");

    // A token passed on the command line wins over the environment
    let access_token = std::env::args()
        .nth(1)
        .or_else(|| config.graph.access_token.clone());
    if access_token.is_none() {
        bail!("no access token: pass one as the first argument or set GRAPH_ACCESS_TOKEN");
    }

    tokio::select! {
        result = run(&config, access_token) => {
            if let Err(e) = &result {
                error!("❌ Collection failed: {:#}", e);
            }
            result
        }
        _ = shutdown_signal() => {
            warn!("📴 Shutdown signal received, discarding partial results");
            Ok(())
        }
    }
}

async fn run(config: &Config, access_token: Option<String>) -> anyhow::Result<()> {
    let client = GraphClient::new(&config.graph, access_token)?;
    let builder = SnapshotBuilder::new(client, config.graph.limits);

    info!(
        "🔍 Building snapshot of '{}' (friends: {})...",
        config.collector.user_id, config.collector.friend_depth
    );
    let owner = builder
        .build(&config.collector.user_id, config.collector.friend_depth)
        .await
        .with_context(|| format!("failed to build snapshot of {}", config.collector.user_id))?;
    info!(
        "✅ Snapshot of {}: {} friends, {} posts, {} likes",
        owner.identity,
        owner.friends.len(),
        owner.wall.len(),
        owner.likes.len()
    );

    let training = TrainingSetBuilder::new(
        builder,
        FeatureExtractor::new(config.collector.interaction_window),
        config.collector.sample_limit,
        config.collector.author_concurrency,
    );
    let (set, metrics) = training
        .collect(Arc::new(owner))
        .await
        .context("failed to collect training data")?;

    metrics.log_summary();
    for issue in DatasetAnalyzer::detect_issues(&metrics) {
        warn!("⚠️ {}", issue);
    }

    let path = output::write_training_set(&config.output.dir, &set)
        .context("failed to store training data")?;
    info!("👋 Collection complete: {}", path.display());
    Ok(())
}

/// Initialize structured logging with tracing
///
/// `LOG_FORMAT=json` switches to JSON lines; `LOG_DIR` adds a daily-rolling log file.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("graph_research=debug,reqwest=warn,info"));

    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));
    let stdout_layer = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(std::env::var("NO_COLOR").is_err())
            .boxed()
    };

    let (file_layer, guard) = match std::env::var("LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "collector.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
