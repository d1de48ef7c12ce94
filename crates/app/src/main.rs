mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinelist_core::{
    load_config, validate_config, CatalogSnapshot, DiscoverClient, EngineHandle, SettingsBackend,
    SettingsStore, SqliteSettingsBackend, TmdbDiscoverClient,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_tracing();

    let config_path = std::env::var("CINELIST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("cinelist {} starting", VERSION);
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Discover endpoint: {}", config.tmdb.base_url);

    let backend: Arc<dyn SettingsBackend> = Arc::new(
        SqliteSettingsBackend::new(&config.database.path)
            .context("Failed to open settings database")?,
    );
    let settings =
        Arc::new(SettingsStore::open(backend).context("Failed to load persisted settings")?);
    info!(
        "Settings: language={}, min_rating={}, favorites={}",
        settings.language(),
        settings.min_rating(),
        settings.favorites().len()
    );

    let client: Arc<dyn DiscoverClient> = Arc::new(
        TmdbDiscoverClient::new(&config.tmdb).context("Failed to create discover client")?,
    );

    let engine = EngineHandle::spawn(
        &config.engine,
        config.tmdb.page_size,
        client,
        Arc::clone(&settings),
    );

    watch_snapshots(&engine, &config.tmdb.image_base_url).await;

    info!("Shutting down...");
    engine.shutdown().await;

    let last = engine.snapshot();
    match serde_json::to_string(&last) {
        Ok(json) => debug!("Final catalog state: {}", json),
        Err(e) => warn!("Failed to serialize final catalog state: {}", e),
    }
    debug!("Final metrics:\n{}", metrics::encode_metrics());

    info!("Engine stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let json = std::env::var("CINELIST_LOG_FORMAT").is_ok_and(|v| v == "json");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Log every catalog change until a shutdown signal arrives.
async fn watch_snapshots(engine: &EngineHandle, image_base_url: &str) {
    let mut rx = engine.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let snapshot = rx.borrow_and_update().clone();
        log_snapshot(&snapshot, image_base_url);
        metrics::record_snapshot(&snapshot);

        tokio::select! {
            _ = &mut shutdown => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    warn!("Engine stopped unexpectedly");
                    break;
                }
            }
        }
    }
}

fn log_snapshot(snapshot: &CatalogSnapshot, image_base_url: &str) {
    info!(
        "Catalog [{} {} {}+]: {} items, page {}, loading={}, favorites={}{}",
        snapshot.query.sort_by(),
        snapshot.query.language,
        snapshot.query.min_rating,
        snapshot.items.len(),
        snapshot.page,
        snapshot.loading,
        snapshot.favorites.len(),
        if snapshot.guarded { ", guarded" } else { "" }
    );

    if let Some(ref err) = snapshot.error {
        warn!("Catalog error: {}", err);
    }

    if let Some(first) = snapshot.items.first() {
        debug!(
            "First item: {} ({}) {}",
            first.title,
            first.release_year,
            first.poster_url(image_base_url).unwrap_or_default()
        );
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
