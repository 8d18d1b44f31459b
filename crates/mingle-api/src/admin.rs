use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use mingle_db::analytics::DEFAULT_DENSITY_DAYS;
use mingle_insights::matrix::{COMPACT_SIZE, EXPANDED_SIZE, connectivity_matrix};
use mingle_insights::roles::normalize_roles;
use mingle_types::api::{
    AdminStats, ApiResponse, ConnectionAudit, DailyCount, DensityPoint, EventFeedback, EventStats,
    NamedCount, RoleCount, RoleMatrix, Topic,
};

use crate::{ApiError, AppState, blocking};

pub async fn stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(blocking(&state, |db| db.admin_stats(Utc::now())).await?))
}

#[derive(Debug, Deserialize)]
pub struct EventStatsQuery {
    pub days: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn event_stats(
    State(state): State<AppState>,
    Query(q): Query<EventStatsQuery>,
) -> Result<Json<Vec<EventStats>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.event_stats(q.days, q.limit, Utc::now())).await?))
}

#[derive(Debug, Deserialize)]
pub struct DensityQuery {
    pub days: Option<i64>,
}

pub async fn density_history(
    State(state): State<AppState>,
    Query(q): Query<DensityQuery>,
) -> Result<Json<Vec<DensityPoint>>, ApiError> {
    let days = q.days.filter(|d| *d > 0).unwrap_or(DEFAULT_DENSITY_DAYS);
    Ok(Json(blocking(&state, move |db| db.density_history(days, Utc::now())).await?))
}

/// `eventId` arrives from dashboards as a string that may be empty or
/// `undefined`; anything unparsable means "all users".
#[derive(Debug, Deserialize)]
pub struct RolesQuery {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    pub size: Option<usize>,
}

impl RolesQuery {
    fn event_id(&self) -> Option<i64> {
        self.event_id.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

pub async fn roles(
    State(state): State<AppState>,
    Query(q): Query<RolesQuery>,
) -> Result<Json<Vec<RoleCount>>, ApiError> {
    let event_id = q.event_id();
    Ok(Json(blocking(&state, move |db| db.role_counts(event_id)).await?))
}

pub async fn normalized_roles(
    State(state): State<AppState>,
    Query(q): Query<RolesQuery>,
) -> Result<Json<Vec<RoleCount>>, ApiError> {
    let event_id = q.event_id();
    let raw = blocking(&state, move |db| db.role_counts(event_id)).await?;
    Ok(Json(normalize_roles(&raw)))
}

pub async fn role_matrix(
    State(state): State<AppState>,
    Query(q): Query<RolesQuery>,
) -> Result<Json<RoleMatrix>, ApiError> {
    let size = match q.size {
        Some(s) if s >= EXPANDED_SIZE => EXPANDED_SIZE,
        _ => COMPACT_SIZE,
    };
    let event_id = q.event_id();
    let raw = blocking(&state, move |db| db.role_counts(event_id)).await?;
    Ok(Json(connectivity_matrix(&normalize_roles(&raw), size)))
}

pub async fn growth(State(state): State<AppState>) -> Result<Json<Vec<DailyCount>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.connection_activity()).await?))
}

pub async fn all_connections(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionAudit>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.all_connections()).await?))
}

pub async fn top_skills(State(state): State<AppState>) -> Result<Json<Vec<NamedCount>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.top_skills()).await?))
}

pub async fn topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    Ok(Json(blocking(&state, |db| db.topics()).await?))
}

pub async fn event_feedback(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<EventFeedback>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.event_feedback(event_id)).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse>, ApiError> {
    if blocking(&state, move |db| db.delete_user(user_id)).await? {
        info!("Deleted user {} and dependent rows", user_id);
        Ok(Json(ApiResponse::ok("User deleted.")))
    } else {
        Err(ApiError::not_found("User not found."))
    }
}
