use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use mingle_types::api::{
    EventImpact, GrowthPoint, Leaderboard, NamedCount, RadarStats, RankResponse, RoleCount,
    StatsSummary, TimelineEntry,
};

use crate::{ApiError, AppState, blocking};

pub async fn summary(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<StatsSummary>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.stats_summary(&username, Utc::now())).await?))
}

pub async fn rank(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<RankResponse>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.rank(&username)).await?))
}

pub async fn growth(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<GrowthPoint>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.user_growth(&username)).await?))
}

pub async fn productive_events(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<NamedCount>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.productive_events(&username)).await?))
}

pub async fn event_impact(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<EventImpact>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.event_impact(&username)).await?))
}

pub async fn timeline(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.timeline(&username)).await?))
}

pub async fn roles(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<RoleCount>>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.connection_roles(&username)).await?))
}

pub async fn radar(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<RadarStats>, ApiError> {
    Ok(Json(blocking(&state, move |db| db.radar(&username)).await?))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

pub async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Leaderboard>, ApiError> {
    let page = q.page.unwrap_or(1);
    Ok(Json(blocking(&state, move |db| db.leaderboard(page)).await?))
}
