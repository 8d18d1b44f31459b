use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use mingle_db::connections::{SCANNER_POINTS, ScanRequest};
use mingle_db::models::{ConnectKind, ConnectOutcome};
use mingle_types::api::{ApiResponse, ConnectRequest, ConnectResponse, UpdateNoteRequest};
use mingle_types::models::ConnectionCard;

use crate::users::UsernameQuery;
use crate::{ApiError, AppState, blocking, required};

/// Turn a recorder outcome into the payload the scanning client shows.
pub fn connect_response(outcome: ConnectOutcome) -> ConnectResponse {
    let (message, is_duplicate, is_reconnection, encounter_count) = match outcome.kind {
        ConnectKind::Duplicate => ("Already connected at this event.".to_string(), true, false, None),
        ConnectKind::FirstMeeting => (format!("Connection Saved! 🎉 (+{} pts)", SCANNER_POINTS), false, false, None),
        ConnectKind::Reconnection => (
            format!("Strengthened Connection! 🤝 (+{} pts)", SCANNER_POINTS),
            false,
            true,
            Some(outcome.encounter_count),
        ),
    };

    ConnectResponse {
        success: true,
        message,
        user: outcome.profile,
        is_duplicate,
        is_reconnection,
        encounter_count,
    }
}

pub async fn connect(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<ConnectResponse>, ApiError> {
    let (Some(scanner), Some(scanned), Some(event_id)) =
        (required(&req.scanner_username), required(&req.scanned_username), req.event_id)
    else {
        return Err(ApiError::validation("Missing data."));
    };
    let scanner = scanner.to_string();
    let scanned = scanned.to_string();
    let note = req.note;

    let outcome = blocking(&state, move |db| {
        let scan = ScanRequest::new(&scanner, &scanned, event_id, note.as_deref());
        db.record_connection(&scan, Utc::now())
    })
    .await?;

    Ok(Json(connect_response(outcome)))
}

pub async fn list_connections(
    State(state): State<AppState>,
    Query(q): Query<UsernameQuery>,
) -> Result<Json<Vec<ConnectionCard>>, ApiError> {
    if required(&q.username).is_none() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(blocking(&state, move |db| db.connections_for(&q.username)).await?))
}

pub async fn update_note(
    State(state): State<AppState>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if required(&req.author_username).is_none() || required(&req.other_username).is_none() {
        return Err(ApiError::validation("Missing data."));
    }

    let updated =
        blocking(&state, move |db| db.update_note(&req.author_username, &req.other_username, &req.note)).await?;
    if updated {
        Ok(Json(ApiResponse::ok("Private note updated!")))
    } else {
        Err(ApiError::not_found("Connection not found."))
    }
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    #[serde(default)]
    pub user1: String,
    #[serde(default)]
    pub user2: String,
}

pub async fn delete_pair(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> Result<Json<ApiResponse>, ApiError> {
    if required(&q.user1).is_none() || required(&q.user2).is_none() {
        return Err(ApiError::validation("Missing data"));
    }
    blocking(&state, move |db| db.delete_pair(&q.user1, &q.user2)).await?;
    Ok(Json(ApiResponse::ok("Connection removed.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mingle_types::models::ProfileSnippet;

    #[test]
    fn test_reconnection_payload() {
        let resp = connect_response(ConnectOutcome {
            kind: ConnectKind::Reconnection,
            profile: Some(ProfileSnippet::default()),
            encounter_count: 2,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["message"], "Strengthened Connection! 🤝 (+10 pts)");
        assert_eq!(json["isReconnection"], true);
        assert_eq!(json["encounterCount"], 2);
        assert!(json.get("isDuplicate").is_none());
    }

    #[test]
    fn test_first_meeting_payload_omits_flags() {
        let resp = connect_response(ConnectOutcome {
            kind: ConnectKind::FirstMeeting,
            profile: None,
            encounter_count: 0,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Connection Saved! 🎉 (+10 pts)");
        assert!(json.get("isDuplicate").is_none());
        assert!(json.get("isReconnection").is_none());
        assert!(json.get("user").is_none());
    }
}
