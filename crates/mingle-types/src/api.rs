use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{ProfileSnippet, UserRole};

// -- Generic envelopes --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

// -- Users & events --

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub name: String,
    pub date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

/// Profile edit. `skills` and `interests` are comma-joined tag lists and are
/// resynced into the tag tables; `None` leaves a field untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linkedin: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub qualifications: Option<String>,
    pub photo: Option<String>,
    pub skills: Option<String>,
    pub interests: Option<String>,
}

// -- Registrations & QR tokens --

#[derive(Debug, Deserialize)]
pub struct RegisterEventRequest {
    pub event_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterEventResponse {
    pub success: bool,
    pub message: String,
    pub qr_token: String,
}

#[derive(Debug, Serialize)]
pub struct QrResolveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Connections --

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub scanner_username: String,
    #[serde(default)]
    pub scanned_username: String,
    pub event_id: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ProfileSnippet>,
    #[serde(rename = "isDuplicate", skip_serializing_if = "std::ops::Not::not")]
    pub is_duplicate: bool,
    #[serde(rename = "isReconnection", skip_serializing_if = "std::ops::Not::not")]
    pub is_reconnection: bool,
    #[serde(rename = "encounterCount", skip_serializing_if = "Option::is_none")]
    pub encounter_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub author_username: String,
    #[serde(default)]
    pub other_username: String,
    #[serde(default)]
    pub note: String,
}

// -- Check-ins & feedback --

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    #[serde(default)]
    pub username: String,
    pub event_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckinStatus {
    #[serde(rename = "checkedIn")]
    pub checked_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub event_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackStatus {
    pub submitted: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub me: String,
    #[serde(default)]
    pub other: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub username: String,
    pub name: Option<String>,
    pub photo: Option<String>,
    #[serde(rename = "lastMessage")]
    pub last_message: String,
    pub timestamp: String,
    #[serde(rename = "unreadCount")]
    pub unread_count: i64,
}

// -- Personal stats --

#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub points: i64,
    pub connections: i64,
    pub events_attended: i64,
    pub events_upcoming: i64,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub rank: i64,
    pub percentile: i64,
}

#[derive(Debug, Serialize)]
pub struct GrowthPoint {
    pub date: String,
    pub daily_count: i64,
}

#[derive(Debug, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RadarStats {
    pub categories: Vec<String>,
    #[serde(rename = "userValues")]
    pub user_values: Vec<i64>,
    #[serde(rename = "globalValues")]
    pub global_values: Vec<f64>,
}

/// Connections made at one event beside that event's turnout.
#[derive(Debug, Serialize)]
pub struct EventImpact {
    pub name: String,
    pub date: String,
    pub my_connections: i64,
    pub total_attendees: i64,
}

#[derive(Debug, Serialize)]
pub struct TimelineEntry {
    pub name: String,
    pub date: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub fullname: Option<String>,
    pub points: i64,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub users: Vec<LeaderboardEntry>,
    pub total: i64,
}

// -- Admin analytics --

#[derive(Debug, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// One connection row with both sides' names and notes, for the admin log.
#[derive(Debug, Serialize)]
pub struct ConnectionAudit {
    pub created_at: String,
    pub scanner_username: String,
    pub scanner_name: Option<String>,
    pub scanner_note: String,
    pub scanned_username: String,
    pub scanned_name: Option<String>,
    pub scanned_note: String,
    pub event_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCount {
    pub position: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleMatrix {
    pub labels: Vec<String>,
    pub cells: Vec<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityPoint {
    pub date: String,
    pub density: f64,
    pub events: String,
    pub category: String,
    pub zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrowthStat {
    pub count: i64,
    pub pct: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: GrowthStat,
    pub connections: GrowthStat,
    #[serde(rename = "eventsCount")]
    pub events_count: i64,
}

#[derive(Debug, Serialize)]
pub struct EventStats {
    pub id: i64,
    pub name: String,
    pub date: String,
    pub registration_count: i64,
    pub attendee_count: i64,
    pub avg_rating: f64,
    pub vibe: String,
    #[serde(rename = "vibeScore")]
    pub vibe_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredComment {
    pub text: String,
    pub score: i32,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct EventFeedback {
    pub comments: Vec<ScoredComment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartMatch {
    pub username: String,
    pub fullname: Option<String>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub photo_url: Option<String>,
    pub skills: String,
    pub special_interests: String,
    pub match_score: u32,
    pub common_tags: Vec<String>,
}
