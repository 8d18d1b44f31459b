use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::info;

use mingle_types::api::{ApiResponse, CreateUserRequest, CreatedResponse, UpdateProfileRequest};
use mingle_types::models::Profile;

use crate::{ApiError, AppState, blocking, required};

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(mut req): Json<CreateUserRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let Some(username) = required(&req.username).map(str::to_string) else {
        return Err(ApiError::validation("Username is required."));
    };
    req.username = username.clone();

    let created = blocking(&state, move |db| {
        if db.user_exists(&req.username)? {
            return Ok(None);
        }
        db.create_user(&req).map(Some)
    })
    .await?;

    let Some(id) = created else {
        return Err(ApiError::validation("Username already exists."));
    };
    info!("Created user {} ({})", username, id);
    Ok(Json(CreatedResponse {
        success: true,
        message: "User created.".to_string(),
        id,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<UsernameQuery>,
) -> Result<Json<Profile>, ApiError> {
    blocking(&state, move |db| db.get_profile(&q.username))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found."))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if required(&req.username).is_none() {
        return Err(ApiError::validation("Missing username."));
    }

    if blocking(&state, move |db| db.update_profile(&req)).await? {
        Ok(Json(ApiResponse::ok("Profile updated.")))
    } else {
        Err(ApiError::not_found("User not found."))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_organizations(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.search_organizations(&q.q)).await?))
}
