use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

use mingle_types::api::{ApiResponse, Conversation, MarkReadRequest, MarkReadResponse, SendMessageRequest};
use mingle_types::models::Message;

use crate::connections::PairQuery;
use crate::users::UsernameQuery;
use crate::{ApiError, AppState, blocking, required};

pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if required(&req.sender).is_none() || required(&req.receiver).is_none() || required(&req.text).is_none() {
        return Err(ApiError::validation("Missing data."));
    }

    let sent = blocking(&state, move |db| db.send_message(&req.sender, &req.receiver, &req.text, Utc::now())).await?;
    match sent {
        Some(_) => Ok(Json(ApiResponse::ok("Message sent."))),
        None => Err(ApiError::not_found("User not found.")),
    }
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.messages_between(&q.user1, &q.user2)).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    if required(&req.me).is_none() || required(&req.other).is_none() {
        return Err(ApiError::validation("Missing data."));
    }
    let updated = blocking(&state, move |db| db.mark_read(&req.me, &req.other)).await?;
    Ok(Json(MarkReadResponse { success: true, updated }))
}

pub async fn conversations(
    State(state): State<AppState>,
    Query(q): Query<UsernameQuery>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.conversations(&q.username)).await?))
}
