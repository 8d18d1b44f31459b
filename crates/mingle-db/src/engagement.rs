use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::users::resolve_user_id;
use crate::{Database, OptionalExt, format_timestamp};

/// Result of a check-in or feedback write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    New,
    /// Check-in already present, or feedback revised in place.
    Existing,
    UnknownUser,
    UnknownEvent,
}

fn event_exists(conn: &rusqlite::Connection, event_id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM events WHERE id = ?1", [event_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

impl Database {
    /// Idempotent: a second check-in keeps the first timestamp.
    pub fn check_in(&self, username: &str, event_id: i64, now: DateTime<Utc>) -> Result<Recorded> {
        let now = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let Some(user_id) = resolve_user_id(conn, username)? else {
                return Ok(Recorded::UnknownUser);
            };
            if !event_exists(conn, event_id)? {
                return Ok(Recorded::UnknownEvent);
            }
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO event_checkins (event_id, user_id, checked_in_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![event_id, user_id, now],
            )?;
            Ok(if inserted > 0 { Recorded::New } else { Recorded::Existing })
        })
    }

    pub fn is_checked_in(&self, username: &str, event_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT c.id FROM event_checkins c
                     JOIN users u ON u.id = c.user_id
                     WHERE u.username = ?1 AND c.event_id = ?2",
                    rusqlite::params![username, event_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// One feedback row per user and event; submitting again replaces the
    /// rating and comment.
    pub fn submit_feedback(
        &self,
        event_id: i64,
        username: &str,
        rating: i64,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Recorded> {
        let now = format_timestamp(now);
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());
        self.with_tx(|tx| {
            let Some(user_id) = resolve_user_id(&tx, username)? else {
                return Ok(Recorded::UnknownUser);
            };
            if !event_exists(&tx, event_id)? {
                return Ok(Recorded::UnknownEvent);
            }

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM event_feedback WHERE event_id = ?1 AND user_id = ?2",
                    [event_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            tx.execute(
                "INSERT INTO event_feedback (event_id, user_id, rating, comment, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(event_id, user_id) DO UPDATE SET
                    rating = excluded.rating,
                    comment = excluded.comment,
                    updated_at = excluded.updated_at",
                rusqlite::params![event_id, user_id, rating, comment, now],
            )?;
            tx.commit()?;

            Ok(if existing.is_some() { Recorded::Existing } else { Recorded::New })
        })
    }

    pub fn has_feedback(&self, username: &str, event_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT f.id FROM event_feedback f
                     JOIN users u ON u.id = f.user_id
                     WHERE u.username = ?1 AND f.event_id = ?2",
                    rusqlite::params![username, event_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}
