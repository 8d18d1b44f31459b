use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use mingle_db::models::RegisterOutcome;
use mingle_types::api::{ApiResponse, QrResolveResponse, RegisterEventRequest, RegisterEventResponse};
use mingle_types::models::Registration;

use crate::{ApiError, AppState, blocking, required};

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterEventRequest>,
) -> Result<Json<RegisterEventResponse>, ApiError> {
    let (Some(event_id), Some(username)) = (req.event_id, required(&req.username)) else {
        return Err(ApiError::validation("Incomplete data."));
    };
    let username = username.to_string();

    let outcome =
        blocking(&state, move |db| db.register_for_event(event_id, &username, req.role.as_deref())).await?;

    match outcome {
        RegisterOutcome::Registered { qr_token } => Ok(Json(RegisterEventResponse {
            success: true,
            message: "Registration successful.".to_string(),
            qr_token,
        })),
        RegisterOutcome::UnknownUser => Err(ApiError::not_found("User not found.")),
        RegisterOutcome::UnknownEvent => Err(ApiError::not_found("Event not found.")),
    }
}

/// Ids of the events a user is registered for.
pub async fn registered_events(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<i64>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.registered_event_ids(&username)).await?))
}

pub async fn unregister(
    State(state): State<AppState>,
    Path((username, event_id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse>, ApiError> {
    if blocking(&state, move |db| db.unregister(event_id, &username)).await? {
        Ok(Json(ApiResponse::ok("Unregistered successfully.")))
    } else {
        Err(ApiError::validation("Registration not found."))
    }
}

pub async fn get_registration(
    State(state): State<AppState>,
    Path((username, event_id)): Path<(String, i64)>,
) -> Result<Json<Registration>, ApiError> {
    blocking(&state, move |db| db.get_registration(&username, event_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Not found"))
}

pub async fn resolve_qr(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<QrResolveResponse>, ApiError> {
    let resolved = blocking(&state, move |db| db.resolve_qr(&token, Utc::now())).await?;

    Ok(Json(match resolved {
        Some((username, event_id)) => QrResolveResponse {
            success: true,
            username: Some(username),
            event_id: Some(event_id),
            message: None,
        },
        None => QrResolveResponse {
            success: false,
            username: None,
            event_id: None,
            message: Some("Invalid or expired QR token.".to_string()),
        },
    }))
}
