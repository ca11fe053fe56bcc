use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::instructions::{BusinessProfile, InstructionError};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// `POST /set-instruction`
///
/// Overwrites the stored instructions. The next call picks them up.
/// An unreadable body is reported like a failed write.
pub async fn set_instruction(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BusinessProfile>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(profile) = body.map_err(|rejection| {
        AppError::InstructionWrite(InstructionError::InvalidProfile(rejection.body_text()))
    })?;

    state
        .instructions
        .save(&profile)
        .await
        .map_err(AppError::InstructionWrite)?;

    Ok(Json(json!({ "message": "Instructions saved successfully." })))
}
