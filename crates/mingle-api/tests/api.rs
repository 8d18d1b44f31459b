use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use mingle_api::{AppState, AppStateInner, router};
use mingle_db::Database;
use mingle_db::models::RegisterOutcome;
use mingle_types::api::{CreateEventRequest, CreateUserRequest};
use mingle_types::models::UserRole;

struct TestApp {
    state: AppState,
    event_id: i64,
}

impl TestApp {
    /// alice and bob, both registered for an event dated today.
    fn new() -> Self {
        let state = AppStateInner::new(Database::open_in_memory().unwrap());
        for name in ["alice", "bob"] {
            state
                .db
                .create_user(&CreateUserRequest {
                    username: name.to_string(),
                    fullname: format!("{} Example", name),
                    email: None,
                    phone_number: None,
                    role: UserRole::Attendee,
                })
                .unwrap();
        }
        let event_id = state
            .db
            .create_event(&CreateEventRequest {
                name: "RustConf".to_string(),
                date: Utc::now().date_naive(),
                start_time: None,
                end_time: None,
                location: None,
                category: Some("Tech".to_string()),
                description: None,
                photo: None,
            })
            .unwrap();
        for name in ["alice", "bob"] {
            let outcome = state.db.register_for_event(event_id, name, None).unwrap();
            assert!(matches!(outcome, RegisterOutcome::Registered { .. }));
        }
        Self { state, event_id }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn scan(&self, scanner: &str, scanned: &str, event_id: i64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/connections",
            Some(json!({
                "scanner_username": scanner,
                "scanned_username": scanned,
                "event_id": event_id,
                "note": "talked about tokio",
            })),
        )
        .await
    }

    fn points(&self, username: &str) -> i64 {
        self.state.db.networking_points(username).unwrap().unwrap()
    }
}

#[tokio::test]
async fn test_first_scan_then_duplicate() {
    let app = TestApp::new();

    let (status, body) = app.scan("alice", "bob", app.event_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Connection Saved! 🎉 (+10 pts)");
    assert_eq!(body["user"]["name"], "bob Example");
    assert!(body.get("isDuplicate").is_none());
    assert_eq!(app.points("alice"), 10);
    assert_eq!(app.points("bob"), 5);

    let (status, body) = app.scan("bob", "alice", app.event_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["isDuplicate"], true);
    assert_eq!(body["message"], "Already connected at this event.");
    assert_eq!(app.points("alice"), 10);
    assert_eq!(app.points("bob"), 5);

    let (_, cards) = app.send(Method::GET, "/connections?username=bob", None).await;
    assert_eq!(cards.as_array().unwrap().len(), 1);
    assert_eq!(cards[0]["username"], "alice");
    // the scanner's note is private to the scanner
    assert_eq!(cards[0]["note"], "");
}

#[tokio::test]
async fn test_unregistered_scanner_gets_403() {
    let app = TestApp::new();
    let (status, body) = app.scan("alice", "bob", 99).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "You are not registered for this event.");
}

#[tokio::test]
async fn test_missing_fields_are_reported_not_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::POST, "/connections", Some(json!({ "scanner_username": "alice" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Missing data.");
}

#[tokio::test]
async fn test_qr_token_round_trip() {
    let app = TestApp::new();
    let (_, body) = app
        .send(
            Method::POST,
            "/api/registrations",
            Some(json!({ "event_id": app.event_id, "username": "alice", "role": "Speaker" })),
        )
        .await;
    assert_eq!(body["success"], true);
    let token = body["qr_token"].as_str().unwrap().to_string();

    let (_, resolved) = app.send(Method::GET, &format!("/qr/resolve/{}", token), None).await;
    assert_eq!(resolved["username"], "alice");
    assert_eq!(resolved["eventId"], app.event_id);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/registrations/alice/{}", app.event_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, resolved) = app.send(Method::GET, &format!("/qr/resolve/{}", token), None).await;
    assert_eq!(resolved["success"], false);
}

#[tokio::test]
async fn test_density_and_matrix_endpoints() {
    let app = TestApp::new();
    app.scan("alice", "bob", app.event_id).await;

    let (status, history) = app.send(Method::GET, "/api/admin/density-history?days=7", None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["density"], 100.0);
    assert_eq!(history[0]["zone"], "Exceptional Mix");
    assert_eq!(history[0]["events"], "RustConf");

    let (_, matrix) = app
        .send(Method::GET, "/api/admin/role-matrix?eventId=undefined&size=15", None)
        .await;
    assert_eq!(matrix["labels"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_feedback_validation_and_revision() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::POST, "/api/feedback", Some(json!({ "event_id": app.event_id, "username": "alice" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing fields");

    let feedback = json!({ "event_id": app.event_id, "username": "alice", "rating": 4, "comment": "Great talks" });
    let (_, body) = app.send(Method::POST, "/api/feedback", Some(feedback.clone())).await;
    assert_eq!(body["message"], "Feedback submitted!");
    let (_, body) = app.send(Method::POST, "/api/feedback", Some(feedback)).await;
    assert_eq!(body["message"], "Feedback updated!");

    let (_, status) = app
        .send(Method::GET, &format!("/api/feedback/status/alice/{}", app.event_id), None)
        .await;
    assert_eq!(status["submitted"], true);

    let (_, inspector) = app
        .send(Method::GET, &format!("/api/admin/event-feedback/{}", app.event_id), None)
        .await;
    assert_eq!(inspector["comments"][0]["source"], "Feedback (Rated 4/5)");
}

#[tokio::test]
async fn test_signup_body_with_client_extras_is_accepted() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users",
            Some(json!({
                "username": "carol",
                "fullname": "Carol Example",
                "password": "hunter2",
                "adminCode": "",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["id"].as_i64().is_some());
}

#[tokio::test]
async fn test_activity_and_personal_history_endpoints() {
    let app = TestApp::new();
    app.scan("alice", "bob", app.event_id).await;

    let (status, growth) = app.send(Method::GET, "/api/admin/growth", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(growth.as_array().unwrap().len(), 1);
    assert_eq!(growth[0]["count"], 1);

    let (_, log) = app.send(Method::GET, "/api/admin/all-connections", None).await;
    assert_eq!(log[0]["scanner_username"], "alice");
    assert_eq!(log[0]["scanned_name"], "bob Example");
    assert_eq!(log[0]["scanner_note"], "talked about tokio");
    assert_eq!(log[0]["event_name"], "RustConf");

    let (_, impact) = app.send(Method::GET, "/api/stats/event-impact/bob", None).await;
    assert_eq!(impact[0]["name"], "RustConf");
    assert_eq!(impact[0]["my_connections"], 1);
    assert_eq!(impact[0]["total_attendees"], 2);

    let (_, timeline) = app.send(Method::GET, "/api/stats/timeline/alice", None).await;
    assert_eq!(timeline[0]["status"], "Registered");
}

#[tokio::test]
async fn test_skills_and_organization_lookup() {
    let app = TestApp::new();
    let profile = json!({ "username": "alice", "company": "Ferrous Systems", "skills": "Rust, Embedded" });
    let (_, body) = app.send(Method::POST, "/api/user/profile", Some(profile)).await;
    assert_eq!(body["success"], true);

    let (_, skills) = app.send(Method::GET, "/api/analytics/skills", None).await;
    assert_eq!(skills.as_array().unwrap().len(), 2);
    assert_eq!(skills[0]["count"], 1);

    let (_, orgs) = app.send(Method::GET, "/api/organizations/search?q=ferrous", None).await;
    assert_eq!(orgs, json!(["Ferrous Systems"]));
    let (_, none) = app.send(Method::GET, "/api/organizations/search?q=globex", None).await;
    assert_eq!(none, json!([]));
}
