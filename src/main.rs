//! Shelf Keeper - QR presence tracking and shelf inventory
//!
//! Main entry point for the keeper service.

use shelf_keeper::{
    auto_checkin::AutoCheckin,
    detector::VisionClient,
    inventory_ledger::InventoryLedger,
    presence_tracker::PresenceTracker,
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf_keeper=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shelf Keeper v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load()?;
    let settings = config.keeper.tracker_settings()?;
    tracing::info!(
        camera_name = %config.keeper.camera_name,
        qr_vision_service = %config.keeper.qr_vision_service,
        scan_interval_ms = ?settings.scan_interval.map(|d| d.as_millis() as u64),
        grace_period_ms = settings.grace_period.as_millis() as u64,
        auto_checkin = config.keeper.auto_checkin,
        "Configuration loaded"
    );

    // Initialize components
    let detector = Arc::new(VisionClient::new(
        config.keeper.qr_vision_service.clone(),
        config.keeper.detector_timeout(),
    )?);
    if !detector.health_check().await {
        tracing::warn!(
            url = %detector.base_url(),
            "QR vision service not reachable yet; scans will retry"
        );
    }

    let tracker = Arc::new(PresenceTracker::new(
        config.keeper.camera_name.clone(),
        detector,
        settings,
    ));
    tracing::info!("PresenceTracker initialized");

    let ledger = Arc::new(InventoryLedger::new());
    tracing::info!("InventoryLedger initialized");

    let auto_checkin = if config.keeper.auto_checkin {
        Some(AutoCheckin::new(ledger.clone()).spawn(tracker.subscribe()))
    } else {
        None
    };

    tracker.start().await;

    let state = AppState::new(tracker.clone(), ledger);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = web_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    tracker.stop().await;
    if let Some(handle) = auto_checkin {
        handle.abort();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
