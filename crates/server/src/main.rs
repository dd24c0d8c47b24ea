use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crowdlift_core::binding::{BindingStore, SqliteBindingStore};
use crowdlift_core::content::{ContentError, ContentRef, ContentStore, WorkStateUpdate};
use crowdlift_core::lifecycle::CampaignController;
use crowdlift_core::marketplace::{HttpMarketplaceClient, MarketplaceGateway};
use crowdlift_core::reconciler::{AlwaysActive, StatusReconciler};
use crowdlift_core::review::{ReviewStateStore, SqliteReviewStore, TaskReviewWorkflow};
use crowdlift_core::{load_config, metrics, validate_config};

use crowdlift_server::api::create_router;
use crowdlift_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Work-state sink used until a content backend is attached.
///
/// Content-entity persistence lives outside this service; the dashboard
/// backend consumes the same events through the API. This sink keeps the
/// lifecycle path honest by logging every update it would have written.
struct LoggingContentStore;

impl ContentStore for LoggingContentStore {
    fn update_work_state(
        &self,
        entity: &ContentRef,
        update: WorkStateUpdate,
    ) -> Result<(), ContentError> {
        info!(
            "Work state for {}: enabled={} campaign={:?}",
            entity, update.work_enabled, update.campaign_id
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CROWDLIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Marketplace URL: {}", config.marketplace.url);
    info!("Database path: {:?}", config.database.path);

    // Log a config hash so deployments are distinguishable in logs
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Starting crowdlift {} (config {})", VERSION, &config_hash[..16]);

    // Create marketplace client
    let gateway: Arc<dyn MarketplaceGateway> = Arc::new(
        HttpMarketplaceClient::new(config.marketplace.clone())
            .context("Failed to create marketplace client")?,
    );
    info!("Marketplace gateway initialized ({})", gateway.name());

    // Create SQLite binding store
    let bindings: Arc<dyn BindingStore> = Arc::new(
        SqliteBindingStore::new(&config.database.path)
            .context("Failed to create binding store")?,
    );
    info!("Binding store initialized");

    // Create SQLite review store
    let review_store: Arc<dyn ReviewStateStore> = Arc::new(
        SqliteReviewStore::new(&config.database.path).context("Failed to create review store")?,
    );
    info!("Review store initialized");

    // Content persistence is external; log what would be written
    let content: Arc<dyn ContentStore> = Arc::new(LoggingContentStore);

    // Create lifecycle controller
    let controller = Arc::new(CampaignController::new(
        Arc::clone(&gateway),
        Arc::clone(&bindings),
        Arc::clone(&content),
        config.marketplace.campaign_defaults.clone(),
    ));

    // Create review workflow
    let review = Arc::new(TaskReviewWorkflow::new(
        Arc::clone(&gateway),
        Arc::clone(&review_store),
    ));

    // Create reconciler if enabled
    let reconciler = if config.reconciler.enabled {
        let reconciler = Arc::new(StatusReconciler::new(
            config.reconciler.clone(),
            Arc::clone(&bindings),
            Arc::clone(&gateway),
            Arc::clone(&content),
            Arc::new(AlwaysActive),
        ));
        reconciler.start();
        Some(reconciler)
    } else {
        info!("Reconciler disabled in config");
        None
    };

    // Register core metrics
    let registry = prometheus::Registry::new();
    for metric in metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        bindings,
        controller,
        reconciler.clone(),
        review,
        review_store,
        gateway,
        registry,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop reconciler if running
    if let Some(ref reconciler) = reconciler {
        info!("Stopping reconciler...");
        reconciler.stop();
    }

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
