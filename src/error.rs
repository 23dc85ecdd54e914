// error.rs
use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StripError {
    #[error("Device did not respond within {0:?}")]
    TransportTimeout(Duration),
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error("Invalid colour: {0}")]
    InvalidColour(String),
    #[error("Invalid brightness {0}, expected 0..=100")]
    InvalidBrightness(u8),
    #[error("Operation queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
    #[error("Device worker has stopped")]
    WorkerStopped,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Strip(#[from] StripError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Too many event clients (limit {0})")]
    TooManyConnections(usize),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Strip(StripError::QueueFull { .. }) | AppError::TooManyConnections(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Strip(StripError::InvalidColour(_) | StripError::InvalidBrightness(_))
            | AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Strip(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = crate::models::WsMessage::Error {
            message: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
