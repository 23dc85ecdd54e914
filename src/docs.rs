use utoipa::OpenApi;
use crate::{devices, events, handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_power,
        handlers::set_power,
        handlers::get_hue,
        handlers::set_hue,
        handlers::get_saturation,
        handlers::set_saturation,
        handlers::get_brightness,
        handlers::set_brightness,
        handlers::get_status,
        handlers::get_accessory,
    ),
    components(
        schemas(
            models::AccessoryInfo,
            models::SetPowerRequest,
            models::SetHueRequest,
            models::SetSaturationRequest,
            models::SetBrightnessRequest,
            models::PowerResponse,
            models::HueResponse,
            models::SaturationResponse,
            models::BrightnessResponse,
            models::AckResponse,
            models::StatusResponse,
            devices::Freshness,
            events::EngineEvent,
        )
    )
)]
pub struct ApiDoc;
