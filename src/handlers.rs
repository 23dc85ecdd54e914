// handlers.rs

use crate::{
    error::AppError,
    models::{
        AccessoryInfo, AckResponse, AppState, BrightnessResponse, HueResponse, PowerResponse,
        SaturationResponse, SetBrightnessRequest, SetHueRequest, SetPowerRequest,
        SetSaturationRequest, StatusResponse, WsMessage,
    },
    utils,
};
use axum::{
    Json,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(get, path = "/api/power", responses((status = 200, body = PowerResponse)))]
pub async fn get_power(State(state): State<Arc<AppState>>) -> Result<Json<PowerResponse>, AppError> {
    let outcome = state.device.get_power().await?;
    Ok(Json(PowerResponse {
        power: outcome.value,
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(
    put,
    path = "/api/power",
    request_body = SetPowerRequest,
    responses((status = 200, body = AckResponse), (status = 503, description = "Queue full"))
)]
pub async fn set_power(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetPowerRequest>,
) -> Result<Json<AckResponse>, AppError> {
    let outcome = state.device.set_power(request.power).await?;
    Ok(Json(AckResponse {
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(get, path = "/api/hue", responses((status = 200, body = HueResponse)))]
pub async fn get_hue(State(state): State<Arc<AppState>>) -> Result<Json<HueResponse>, AppError> {
    let outcome = state.device.get_hue().await?;
    Ok(Json(HueResponse {
        hue: outcome.value,
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(
    put,
    path = "/api/hue",
    request_body = SetHueRequest,
    responses((status = 200, body = AckResponse), (status = 422, description = "Hue out of range"))
)]
pub async fn set_hue(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetHueRequest>,
) -> Result<Json<AckResponse>, AppError> {
    request.validate()?;
    let outcome = state.device.set_hue(request.hue).await?;
    Ok(Json(AckResponse {
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(get, path = "/api/saturation", responses((status = 200, body = SaturationResponse)))]
pub async fn get_saturation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SaturationResponse>, AppError> {
    let outcome = state.device.get_saturation().await?;
    Ok(Json(SaturationResponse {
        saturation: outcome.value,
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(
    put,
    path = "/api/saturation",
    request_body = SetSaturationRequest,
    responses((status = 200, body = AckResponse), (status = 422, description = "Saturation out of range"))
)]
pub async fn set_saturation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetSaturationRequest>,
) -> Result<Json<AckResponse>, AppError> {
    request.validate()?;
    let outcome = state.device.set_saturation(request.saturation).await?;
    Ok(Json(AckResponse {
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(get, path = "/api/brightness", responses((status = 200, body = BrightnessResponse)))]
pub async fn get_brightness(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BrightnessResponse>, AppError> {
    let outcome = state.device.get_brightness().await?;
    Ok(Json(BrightnessResponse {
        brightness: outcome.value,
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(
    put,
    path = "/api/brightness",
    request_body = SetBrightnessRequest,
    responses((status = 200, body = AckResponse), (status = 422, description = "Brightness out of range"))
)]
pub async fn set_brightness(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetBrightnessRequest>,
) -> Result<Json<AckResponse>, AppError> {
    request.validate()?;
    let outcome = state.device.set_brightness(request.brightness).await?;
    Ok(Json(AckResponse {
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(get, path = "/api/status", responses((status = 200, body = StatusResponse)))]
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let outcome = state.device.snapshot().await?;
    Ok(Json(StatusResponse {
        snapshot: outcome.value,
        freshness: outcome.freshness,
    }))
}

#[utoipa::path(get, path = "/api/accessory", responses((status = 200, body = AccessoryInfo)))]
pub async fn get_accessory(State(state): State<Arc<AppState>>) -> Json<AccessoryInfo> {
    Json(state.accessory.clone())
}

pub async fn handle_events_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.clients.len() >= state.max_connections {
        warn!(limit = state.max_connections, "Rejecting event client, too many connections");
        return AppError::TooManyConnections(state.max_connections).into_response();
    }
    info!("Event client connection attempt");
    ws.on_upgrade(|socket| handle_client(socket, state))
}

async fn handle_client(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = Uuid::new_v4();
    let (tx, mut direct) = broadcast::channel(16);
    let mut events = state.events.subscribe();
    state.clients.insert(client_id, tx.clone());
    info!(%client_id, "Event client connected");

    let _ = tx.send(WsMessage::Connected {
        client_id: client_id.to_string(),
    });

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                received = direct.recv() => match received {
                    Ok(message) => message,
                    Err(_) => break,
                },
                event = events.recv() => match event {
                    Ok(event) => WsMessage::Event { event },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%client_id, skipped, "Event client lagging");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Could not encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::pin!(send_task, recv_task);
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    utils::cleanup_client_connection(client_id, &state).await;
}
