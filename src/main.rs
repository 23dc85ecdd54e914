// main.rs
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use homestrip::{
    colour::Brightness,
    config,
    devices::{DeviceHandle, ReconciliationEngine},
    docs,
    events::{ALL_EVENTS, EventBus},
    handlers::*,
    metrics,
    models::{AccessoryInfo, AppState},
    transport::ScriptTransport,
    utils,
};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const EVENT_CHANNEL_SIZE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let settings = config::Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)?;
        tracing::info!("Metrics exposed on port {}", settings.metrics.port);
    }

    let bus = Arc::new(EventBus::new());
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
    {
        let events_tx = events_tx.clone();
        bus.subscribe(ALL_EVENTS, move |event| {
            let _ = events_tx.send(event.clone());
        });
    }

    let device_settings = &settings.device;
    let engine = ReconciliationEngine::new(
        Box::new(ScriptTransport::from_settings(device_settings)),
        device_settings.profile.clone(),
        Brightness::new(device_settings.default_brightness)?,
        bus.clone(),
    );
    let (device, worker) = DeviceHandle::spawn(engine, device_settings.queue_capacity, bus);
    tracing::info!(
        address = %device_settings.address,
        profile = %device_settings.profile,
        "Device worker started"
    );

    let periodic_sync = (device_settings.sync_interval_secs > 0).then(|| {
        device.spawn_periodic_sync(Duration::from_secs(device_settings.sync_interval_secs))
    });

    let state = Arc::new(AppState::new(
        device,
        AccessoryInfo::from(device_settings),
        events_tx,
        usize::try_from(settings.server.max_connections)?,
    ));

    let app = Router::new()
        .route("/api/power", get(get_power).put(set_power))
        .route("/api/hue", get(get_hue).put(set_hue))
        .route("/api/saturation", get(get_saturation).put(set_saturation))
        .route("/api/brightness", get(get_brightness).put(set_brightness))
        .route("/api/status", get(get_status))
        .route("/api/accessory", get(get_accessory))
        .route("/ws/events", get(handle_events_ws_upgrade))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", docs::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(&settings.server.address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind address: {}", e))?;

    tracing::info!("Server started on {}", settings.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    // Dropping the last handle closes the queue and lets the worker finish.
    if let Some(periodic_sync) = periodic_sync {
        periodic_sync.abort();
    }
    drop(state);
    if tokio::time::timeout(Duration::from_secs(5), worker).await.is_err() {
        tracing::warn!("Device worker did not stop in time");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
