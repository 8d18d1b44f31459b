//! HTTP surface of the networking service: axum handlers over `mingle_db`.

pub mod admin;
pub mod connections;
pub mod engagement;
pub mod error;
pub mod events;
pub mod messages;
pub mod registrations;
pub mod state;
pub mod stats;
pub mod users;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use mingle_db::Database;
use tracing::error;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Run blocking database work off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Database(e.into())
        })?
        .map_err(ApiError::from)
}

/// Treat empty or whitespace-only strings as missing.
pub(crate) fn required(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Users, profiles & events
        .route("/api/users", post(users::create_user))
        .route("/api/user/profile", get(users::get_profile).post(users::update_profile))
        .route("/api/organizations/search", get(users::search_organizations))
        .route("/api/events", get(events::list_events).post(events::create_event))
        .route("/api/events/{event_id}", get(events::get_event).delete(events::delete_event))
        .route("/api/events/{event_id}/attendees", get(events::attendees))
        .route("/api/event/{event_id}/smart-matches", get(events::smart_matches))
        // Registrations & QR tokens
        .route("/api/registrations", post(registrations::register))
        .route("/api/registrations/{username}", get(registrations::registered_events))
        .route(
            "/api/registrations/{username}/{event_id}",
            get(registrations::get_registration).delete(registrations::unregister),
        )
        .route("/qr/resolve/{token}", get(registrations::resolve_qr))
        // Connections
        .route("/connections", post(connections::connect).get(connections::list_connections))
        .route("/connections/note", put(connections::update_note))
        .route("/connection", delete(connections::delete_pair))
        // Check-ins & feedback
        .route("/api/checkin", post(engagement::check_in))
        .route("/api/checkin/status/{username}/{event_id}", get(engagement::check_in_status))
        .route("/api/feedback", post(engagement::submit_feedback))
        .route("/api/feedback/status/{username}/{event_id}", get(engagement::feedback_status))
        // Messages
        .route("/api/messages", get(messages::get_messages).post(messages::send_message))
        .route("/api/messages/mark-read", post(messages::mark_read))
        .route("/api/conversations", get(messages::conversations))
        // Personal stats
        .route("/api/stats/summary/{username}", get(stats::summary))
        .route("/api/stats/rank/{username}", get(stats::rank))
        .route("/api/stats/growth/{username}", get(stats::growth))
        .route("/api/stats/productive-events/{username}", get(stats::productive_events))
        .route("/api/stats/event-impact/{username}", get(stats::event_impact))
        .route("/api/stats/timeline/{username}", get(stats::timeline))
        .route("/api/stats/roles/{username}", get(stats::roles))
        .route("/api/stats/radar/{username}", get(stats::radar))
        .route("/api/leaderboard", get(stats::leaderboard))
        // Admin analytics
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/event-stats", get(admin::event_stats))
        .route("/api/admin/density-history", get(admin::density_history))
        .route("/api/admin/roles", get(admin::roles))
        .route("/api/admin/roles/normalized", get(admin::normalized_roles))
        .route("/api/admin/role-matrix", get(admin::role_matrix))
        .route("/api/admin/topics", get(admin::topics))
        .route("/api/admin/growth", get(admin::growth))
        .route("/api/admin/all-connections", get(admin::all_connections))
        .route("/api/analytics/skills", get(admin::top_skills))
        .route("/api/admin/event-feedback/{event_id}", get(admin::event_feedback))
        .route("/api/admin/users/{user_id}", delete(admin::delete_user))
        .with_state(state)
}
