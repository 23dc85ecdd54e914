// utils.rs
use super::models::AppState;
use uuid::Uuid;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub async fn cleanup_client_connection(client_id: Uuid, state: &AppState) {
    state.clients.remove(&client_id);
    info!("Client {} disconnected", client_id);
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("homestrip=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
