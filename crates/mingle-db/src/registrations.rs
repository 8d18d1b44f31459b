use anyhow::Result;
use chrono::{DateTime, Utc};
use mingle_types::models::Registration;
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use crate::models::RegisterOutcome;
use crate::users::resolve_user_id;
use crate::{Database, OptionalExt, format_timestamp};

pub const DEFAULT_REGISTRATION_ROLE: &str = "Attendee";

impl Database {
    /// Register `username` for an event and issue a fresh QR token. Registering
    /// again updates the role and replaces the previous token.
    pub fn register_for_event(
        &self,
        event_id: i64,
        username: &str,
        role: Option<&str>,
    ) -> Result<RegisterOutcome> {
        self.with_tx(|tx| {
            let Some(user_id) = resolve_user_id(&tx, username)? else {
                return Ok(RegisterOutcome::UnknownUser);
            };
            let event_exists: Option<i64> = tx
                .query_row("SELECT id FROM events WHERE id = ?1", [event_id], |row| row.get(0))
                .optional()?;
            if event_exists.is_none() {
                return Ok(RegisterOutcome::UnknownEvent);
            }

            let role = role
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_REGISTRATION_ROLE);

            tx.execute(
                "INSERT INTO registrations (event_id, user_id, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT(event_id, user_id) DO UPDATE SET role = excluded.role",
                rusqlite::params![event_id, user_id, role],
            )?;

            let qr_token = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO qr_codes (event_id, user_id, qr_token, expires_at) VALUES (?1, ?2, ?3, NULL)
                 ON CONFLICT(event_id, user_id) DO UPDATE SET
                    qr_token = excluded.qr_token,
                    created_at = datetime('now'),
                    expires_at = NULL",
                rusqlite::params![event_id, user_id, qr_token],
            )?;

            tx.commit()?;
            debug!("Registered {} for event {}", username, event_id);
            Ok(RegisterOutcome::Registered { qr_token })
        })
    }

    /// Drops the registration; its QR token is removed by the cascade.
    pub fn unregister(&self, event_id: i64, username: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM registrations
                 WHERE event_id = ?1 AND user_id = (SELECT id FROM users WHERE username = ?2)",
                rusqlite::params![event_id, username],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn get_registration(&self, username: &str, event_id: i64) -> Result<Option<Registration>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id, r.event_id, u.username, r.role, r.registered_at, q.qr_token
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 LEFT JOIN qr_codes q ON q.event_id = r.event_id AND q.user_id = r.user_id
                 WHERE u.username = ?1 AND r.event_id = ?2",
                rusqlite::params![username, event_id],
                |row| {
                    Ok(Registration {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        username: row.get(2)?,
                        role: row.get(3)?,
                        registered_at: row.get(4)?,
                        qr_token: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Ids of every event the user is registered for.
    pub fn registered_event_ids(&self, username: &str) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.event_id FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 WHERE u.username = ?1
                 ORDER BY r.event_id",
            )?;
            let ids = stmt
                .query_map([username], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// Resolve a scanned token to `(username, event_id)`. Tokens with an
    /// `expires_at` at or before `now` do not resolve.
    pub fn resolve_qr(&self, token: &str, now: DateTime<Utc>) -> Result<Option<(String, i64)>> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT u.username, q.event_id
                 FROM qr_codes q
                 JOIN users u ON u.id = q.user_id
                 WHERE q.qr_token = ?1 AND (q.expires_at IS NULL OR q.expires_at > ?2)
                 LIMIT 1",
                rusqlite::params![token, now],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
    }
}

pub(crate) fn is_registered(conn: &Connection, user_id: i64, event_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM registrations WHERE user_id = ?1 AND event_id = ?2",
            [user_id, event_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::models::RegisterOutcome;
    use crate::test_support::*;

    #[test]
    fn test_reregistering_replaces_token() {
        let db = db();
        user(&db, "alice");
        let id = event(&db, "Meetup", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());

        let first = register(&db, id, "alice");
        let second = match db.register_for_event(id, "alice", Some("Speaker")).unwrap() {
            RegisterOutcome::Registered { qr_token } => qr_token,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_ne!(first, second);

        let now = noon(2026, 5, 1);
        assert!(db.resolve_qr(&first, now).unwrap().is_none());
        assert_eq!(db.resolve_qr(&second, now).unwrap(), Some(("alice".to_string(), id)));

        let reg = db.get_registration("alice", id).unwrap().unwrap();
        assert_eq!(reg.role, "Speaker");
        assert_eq!(reg.qr_token.as_deref(), Some(second.as_str()));
        assert_eq!(db.registered_event_ids("alice").unwrap(), vec![id]);
    }

    #[test]
    fn test_register_unknowns() {
        let db = db();
        user(&db, "alice");
        let id = event(&db, "Meetup", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());

        assert_eq!(db.register_for_event(id, "ghost", None).unwrap(), RegisterOutcome::UnknownUser);
        assert_eq!(
            db.register_for_event(id + 100, "alice", None).unwrap(),
            RegisterOutcome::UnknownEvent
        );
    }

    #[test]
    fn test_unregister_invalidates_token() {
        let db = db();
        user(&db, "alice");
        let id = event(&db, "Meetup", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let token = register(&db, id, "alice");

        assert!(db.unregister(id, "alice").unwrap());
        assert!(db.get_registration("alice", id).unwrap().is_none());
        assert!(db.resolve_qr(&token, noon(2026, 5, 1)).unwrap().is_none());
    }

    #[test]
    fn test_expired_token_does_not_resolve() {
        let db = db();
        user(&db, "alice");
        let id = event(&db, "Meetup", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap());
        let token = register(&db, id, "alice");

        db.with_conn_mut(|conn| {
            conn.execute("UPDATE qr_codes SET expires_at = '2026-05-01 10:00:00'", [])?;
            Ok(())
        })
        .unwrap();

        assert!(db.resolve_qr(&token, noon(2026, 5, 1)).unwrap().is_none());
        assert!(db.resolve_qr(&token, noon(2026, 4, 30)).unwrap().is_some());
    }
}
