use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::DeviceSettings;
use crate::devices::{DeviceHandle, DeviceSnapshot, Freshness};
use crate::events::TimedEvent;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessoryInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub address: String,
    pub port: u16,
    pub profile: String,
    pub pure_white: bool,
}

impl From<&DeviceSettings> for AccessoryInfo {
    fn from(settings: &DeviceSettings) -> Self {
        Self {
            name: settings.name.clone(),
            manufacturer: settings.manufacturer.clone(),
            model: settings.model.clone(),
            serial_number: settings.serial_number.clone(),
            address: settings.address.clone(),
            port: settings.port,
            profile: settings.profile.clone(),
            pure_white: settings.pure_white,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetPowerRequest {
    pub power: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetHueRequest {
    #[validate(range(min = 0.0, max = 360.0))]
    pub hue: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetSaturationRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub saturation: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetBrightnessRequest {
    #[validate(range(max = 100))]
    pub brightness: u8,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PowerResponse {
    pub power: bool,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HueResponse {
    pub hue: f64,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaturationResponse {
    pub saturation: f64,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BrightnessResponse {
    pub brightness: u8,
    pub freshness: Freshness,
}

/// Answer to a set request: accepted, and whether the strip confirmed it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AckResponse {
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusResponse {
    pub snapshot: DeviceSnapshot,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Connected { client_id: String },
    Event { event: TimedEvent },
    Error { message: String, code: u16 },
}

pub struct AppState {
    pub device: DeviceHandle,
    pub accessory: AccessoryInfo,
    pub events: broadcast::Sender<TimedEvent>,
    pub clients: DashMap<Uuid, broadcast::Sender<WsMessage>>,
    pub max_connections: usize,
}

impl AppState {
    pub fn new(
        device: DeviceHandle,
        accessory: AccessoryInfo,
        events: broadcast::Sender<TimedEvent>,
        max_connections: usize,
    ) -> Self {
        Self {
            device,
            accessory,
            events,
            clients: DashMap::new(),
            max_connections,
        }
    }
}
