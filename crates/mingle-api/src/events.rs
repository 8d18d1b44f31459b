use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;

use mingle_types::api::{ApiResponse, CreateEventRequest, CreatedResponse, SmartMatch};
use mingle_types::models::{Attendee, Event};

use crate::users::UsernameQuery;
use crate::{ApiError, AppState, blocking, required};

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.list_events()).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    blocking(&state, move |db| db.get_event(event_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Event not found."))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    if required(&req.name).is_none() {
        return Err(ApiError::validation("Event name is required."));
    }

    let name = req.name.clone();
    let id = blocking(&state, move |db| db.create_event(&req)).await?;
    info!("Created event {} ({})", name, id);
    Ok(Json(CreatedResponse {
        success: true,
        message: "Event created.".to_string(),
        id,
    }))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse>, ApiError> {
    if blocking(&state, move |db| db.delete_event(event_id)).await? {
        info!("Deleted event {}", event_id);
        Ok(Json(ApiResponse::ok("Event deleted successfully.")))
    } else {
        Err(ApiError::validation("Event not found."))
    }
}

pub async fn attendees(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<Attendee>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.attendees(event_id)).await?))
}

pub async fn smart_matches(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Query(q): Query<UsernameQuery>,
) -> Result<Json<Vec<SmartMatch>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.smart_matches(event_id, &q.username)).await?))
}
