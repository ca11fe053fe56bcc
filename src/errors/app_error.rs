use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::instructions::InstructionError;
use crate::core::provisioning::ProvisioningError;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("An error occurred while saving instructions: {0}")]
    InstructionWrite(#[source] InstructionError),

    #[error("{0}")]
    Provisioning(#[from] ProvisioningError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InstructionWrite(_) | AppError::Provisioning(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // Instruction errors use the `detail` key, everything else `error`
            AppError::InstructionWrite(_) => json!({ "detail": self.to_string() }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
