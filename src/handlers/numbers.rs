use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use crate::core::provisioning::ProvisioningError;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AssignNumberRequest {
    /// Accepted as a string or a number; empty strings and zero count as missing
    #[serde(default)]
    pub user_id: Option<Value>,
}

impl AssignNumberRequest {
    fn user_id(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// `POST /assign-twilio-number`
///
/// Returns the user's number, buying one on first request.
pub async fn assign_twilio_number(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AssignNumberRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let user_id = request
        .user_id()
        .ok_or_else(|| AppError::BadRequest("User ID is required".to_string()))?;

    let provisioner = state.provisioner().cloned();
    let assignment = state
        .numbers
        .get_or_create(&user_id, || async move {
            match provisioner {
                Some(provisioner) => provisioner.provision().await,
                None => Err(ProvisioningError::NotConfigured),
            }
        })
        .await?;

    let message = if assignment.newly_assigned {
        info!(user_id = %user_id, number = %assignment.number, "Assigned Twilio number");
        "Twilio number assigned successfully"
    } else {
        "User already has a Twilio number assigned"
    };

    Ok(Json(json!({
        "message": message,
        "twilio_number": assignment.number,
    })))
}
