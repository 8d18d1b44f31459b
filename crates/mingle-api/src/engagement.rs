use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;

use mingle_db::engagement::Recorded;
use mingle_types::api::{ApiResponse, CheckinRequest, CheckinStatus, FeedbackRequest, FeedbackStatus};

use crate::{ApiError, AppState, blocking, required};

fn unknown(recorded: Recorded) -> Option<ApiError> {
    match recorded {
        Recorded::UnknownUser => Some(ApiError::not_found("User not found.")),
        Recorded::UnknownEvent => Some(ApiError::not_found("Event not found.")),
        Recorded::New | Recorded::Existing => None,
    }
}

pub async fn check_in(
    State(state): State<AppState>,
    Json(req): Json<CheckinRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let (Some(username), Some(event_id)) = (required(&req.username), req.event_id) else {
        return Err(ApiError::validation("Missing data."));
    };
    let username = username.to_string();

    let recorded = blocking(&state, move |db| db.check_in(&username, event_id, Utc::now())).await?;
    if let Some(err) = unknown(recorded) {
        return Err(err);
    }
    Ok(Json(ApiResponse::ok("Checked in successfully!")))
}

pub async fn check_in_status(
    State(state): State<AppState>,
    Path((username, event_id)): Path<(String, i64)>,
) -> Result<Json<CheckinStatus>, ApiError> {
    let checked_in = blocking(&state, move |db| db.is_checked_in(&username, event_id)).await?;
    Ok(Json(CheckinStatus { checked_in }))
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let (Some(event_id), Some(username), Some(rating)) = (req.event_id, required(&req.username), req.rating)
    else {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    };
    if !(1..=5).contains(&rating) {
        return Err(ApiError::BadRequest("Rating must be between 1 and 5.".to_string()));
    }
    let username = username.to_string();
    let comment = req.comment;

    let recorded = blocking(&state, move |db| {
        db.submit_feedback(event_id, &username, rating, comment.as_deref(), Utc::now())
    })
    .await?;
    if let Some(err) = unknown(recorded) {
        return Err(err);
    }

    let message = if recorded == Recorded::Existing { "Feedback updated!" } else { "Feedback submitted!" };
    Ok(Json(ApiResponse::ok(message)))
}

pub async fn feedback_status(
    State(state): State<AppState>,
    Path((username, event_id)): Path<(String, i64)>,
) -> Result<Json<FeedbackStatus>, ApiError> {
    let submitted = blocking(&state, move |db| db.has_feedback(&username, event_id)).await?;
    Ok(Json(FeedbackStatus { submitted }))
}
