use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mingle_types::models::ConnectionCard;
use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::ConnectError;
use crate::events::event_date;
use crate::messages::insert_message;
use crate::models::{ConnectKind, ConnectOutcome};
use crate::registrations::is_registered;
use crate::users::{SNIPPET_COLUMNS, query_snippet, resolve_user_id, snippet_from_row};
use crate::{Database, OptionalExt, format_timestamp};

pub const SCANNER_POINTS: i64 = 10;
pub const SCANNED_POINTS: i64 = 5;
pub const CONNECTION_WINDOW_HOURS: i64 = 72;

/// Whether `now` lies within the window around midnight UTC of `event_date`.
/// The distance is absolute, so the window opens before the event as well.
pub fn within_connection_window(event_date: NaiveDate, now: DateTime<Utc>) -> bool {
    let start = event_date.and_time(NaiveTime::MIN).and_utc();
    let distance_ms = (now - start).num_milliseconds().unsigned_abs();
    distance_ms <= (CONNECTION_WINDOW_HOURS as u64) * 3_600_000
}

/// One scan of another attendee's code.
#[derive(Debug, Clone)]
pub struct ScanRequest<'a> {
    pub scanner: &'a str,
    pub scanned: &'a str,
    pub event_id: i64,
    pub note: Option<&'a str>,
}

impl<'a> ScanRequest<'a> {
    pub fn new(scanner: &'a str, scanned: &'a str, event_id: i64, note: Option<&'a str>) -> Self {
        Self { scanner, scanned, event_id, note }
    }
}

pub fn first_meeting_message(event_name: &str) -> String {
    format!("👋 Connected at {}", event_name)
}

/// `prior` is the number of rows the pair had before this one.
pub fn reconnection_message(event_name: &str, prior: i64) -> String {
    format!("👋 Great to see you again at {}! (Interaction #{})", event_name, prior + 1)
}

const PAIR_AT_EVENT_SQL: &str = "SELECT id FROM connections
     WHERE min(scanner_id, scanned_id) = min(?1, ?2)
       AND max(scanner_id, scanned_id) = max(?1, ?2)
       AND event_id = ?3";

const PAIR_COUNT_SQL: &str = "SELECT COUNT(*) FROM connections
     WHERE (scanner_id = ?1 AND scanned_id = ?2) OR (scanner_id = ?2 AND scanned_id = ?1)";

/// Insert one pair row. `false` means the unique pair index already holds
/// this pair at this event, in either direction.
fn insert_pair(
    conn: &Connection,
    scanner_id: i64,
    scanned_id: i64,
    event_id: i64,
    note: &str,
    created_at: &str,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO connections (scanner_id, scanned_id, event_id, scanner_note, scanned_note, created_at)
         VALUES (?1, ?2, ?3, ?4, '', ?5)",
        rusqlite::params![scanner_id, scanned_id, event_id, note, created_at],
    )?;
    Ok(inserted > 0)
}

impl Database {
    /// Record that two attendees met at an event.
    ///
    /// Eligibility (scanner registration, event window) is checked before any
    /// write. The rest runs in one transaction on the writer: a pair that
    /// already has a row at this event comes back as `Duplicate` with nothing
    /// written; otherwise the row, both point awards and the auto-message from
    /// the scanned person to the scanner commit together.
    pub fn record_connection(
        &self,
        scan: &ScanRequest<'_>,
        now: DateTime<Utc>,
    ) -> std::result::Result<ConnectOutcome, ConnectError> {
        let (scanner_id, scanned_id) = self.check_scan_eligibility(scan, now)?;
        let created_at = format_timestamp(now);

        self.with_tx(|tx| {
            let profile = query_snippet(&tx, scanned_id)?;
            let prior: i64 = tx.query_row(PAIR_COUNT_SQL, [scanner_id, scanned_id], |row| row.get(0))?;

            let existing: Option<i64> = tx
                .query_row(PAIR_AT_EVENT_SQL, [scanner_id, scanned_id, scan.event_id], |row| row.get(0))
                .optional()?;
            if existing.is_some() {
                debug!(
                    "Duplicate scan {} -> {} at event {}",
                    scan.scanner, scan.scanned, scan.event_id
                );
                return Ok(ConnectOutcome {
                    kind: ConnectKind::Duplicate,
                    profile,
                    encounter_count: prior,
                });
            }

            // The unique pair index decides races the check above cannot see.
            let inserted = insert_pair(
                &tx,
                scanner_id,
                scanned_id,
                scan.event_id,
                scan.note.unwrap_or_default(),
                &created_at,
            )?;
            if !inserted {
                return Ok(ConnectOutcome {
                    kind: ConnectKind::Duplicate,
                    profile,
                    encounter_count: prior,
                });
            }

            tx.execute(
                "UPDATE users SET networking_points = networking_points + ?1 WHERE id = ?2",
                [SCANNER_POINTS, scanner_id],
            )?;
            tx.execute(
                "UPDATE users SET networking_points = networking_points + ?1 WHERE id = ?2",
                [SCANNED_POINTS, scanned_id],
            )?;

            let event_name: String = tx
                .query_row("SELECT name FROM events WHERE id = ?1", [scan.event_id], |row| row.get(0))
                .optional()?
                .unwrap_or_else(|| "an event".to_string());
            let (kind, text) = if prior > 0 {
                (ConnectKind::Reconnection, reconnection_message(&event_name, prior))
            } else {
                (ConnectKind::FirstMeeting, first_meeting_message(&event_name))
            };
            insert_message(&tx, scanned_id, scanner_id, &text, &created_at)?;

            tx.commit()?;
            info!(
                "Connection {} -> {} at event {} ({:?}, prior encounters: {})",
                scan.scanner, scan.scanned, scan.event_id, kind, prior
            );
            Ok(ConnectOutcome {
                kind,
                profile,
                encounter_count: prior,
            })
        })
    }

    fn check_scan_eligibility(
        &self,
        scan: &ScanRequest<'_>,
        now: DateTime<Utc>,
    ) -> std::result::Result<(i64, i64), ConnectError> {
        self.with_conn(|conn| Ok(scan_preconditions(conn, scan, now)))?
    }

    /// One card per person the user has met; the most recent row wins and
    /// only the viewer's own note is included.
    pub fn connections_for(&self, username: &str) -> Result<Vec<ConnectionCard>> {
        self.with_conn(|conn| {
            let Some(me) = resolve_user_id(conn, username)? else {
                return Ok(Vec::new());
            };

            let sql = format!(
                "SELECT c.id, u.id, u.username, c.event_id, e.name, c.created_at,
                        CASE WHEN c.scanner_id = ?1 THEN c.scanner_note ELSE c.scanned_note END,
                        COALESCE(r.role, 'Attendee'),
                        {SNIPPET_COLUMNS}
                 FROM connections c
                 JOIN users u ON u.id = CASE WHEN c.scanner_id = ?1 THEN c.scanned_id ELSE c.scanner_id END
                 LEFT JOIN events e ON e.id = c.event_id
                 LEFT JOIN master_organizations mo ON mo.id = u.organization_id
                 LEFT JOIN registrations r ON r.user_id = u.id AND r.event_id = c.event_id
                 WHERE c.scanner_id = ?1 OR c.scanned_id = ?1
                 ORDER BY c.id DESC"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([me], |row| {
                let other_id: i64 = row.get(1)?;
                Ok((
                    other_id,
                    ConnectionCard {
                        id: row.get(0)?,
                        username: row.get(2)?,
                        event_id: row.get(3)?,
                        event_name: row.get(4)?,
                        created_at: row.get(5)?,
                        note: row.get(6)?,
                        role: row.get(7)?,
                        profile: snippet_from_row(row, 8)?,
                    },
                ))
            })?;

            let mut seen = HashSet::new();
            let mut cards = Vec::new();
            for row in rows {
                let (other_id, card) = row?;
                if seen.insert(other_id) {
                    cards.push(card);
                }
            }
            Ok(cards)
        })
    }

    /// Set the author's side of their most recent row with `other`.
    /// Returns false when the pair has never met.
    pub fn update_note(&self, author: &str, other: &str, note: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let (Some(author_id), Some(other_id)) =
                (resolve_user_id(conn, author)?, resolve_user_id(conn, other)?)
            else {
                return Ok(false);
            };

            let updated = conn.execute(
                "UPDATE connections SET
                    scanner_note = CASE WHEN scanner_id = ?1 THEN ?3 ELSE scanner_note END,
                    scanned_note = CASE WHEN scanned_id = ?1 THEN ?3 ELSE scanned_note END
                 WHERE id = (
                    SELECT id FROM connections
                    WHERE (scanner_id = ?1 AND scanned_id = ?2) OR (scanner_id = ?2 AND scanned_id = ?1)
                    ORDER BY id DESC LIMIT 1
                 )",
                rusqlite::params![author_id, other_id, note],
            )?;
            Ok(updated > 0)
        })
    }

    /// Remove every row for the pair, across all events.
    pub fn delete_pair(&self, user1: &str, user2: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM connections
                 WHERE (scanner_id = (SELECT id FROM users WHERE username = ?1)
                        AND scanned_id = (SELECT id FROM users WHERE username = ?2))
                    OR (scanner_id = (SELECT id FROM users WHERE username = ?2)
                        AND scanned_id = (SELECT id FROM users WHERE username = ?1))",
                [user1, user2],
            )?;
            Ok(deleted)
        })
    }

    /// Rows between two people across every event.
    pub fn pair_encounters(&self, user1: &str, user2: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let (Some(a), Some(b)) = (resolve_user_id(conn, user1)?, resolve_user_id(conn, user2)?) else {
                return Ok(0);
            };
            let count = conn.query_row(PAIR_COUNT_SQL, [a, b], |row| row.get(0))?;
            Ok(count)
        })
    }
}

fn scan_preconditions(
    conn: &Connection,
    scan: &ScanRequest<'_>,
    now: DateTime<Utc>,
) -> std::result::Result<(i64, i64), ConnectError> {
    if scan.scanner == scan.scanned {
        return Err(ConnectError::SelfConnection);
    }

    let Some(scanner_id) = resolve_user_id(conn, scan.scanner)? else {
        return Err(ConnectError::NotRegistered);
    };
    if !is_registered(conn, scanner_id, scan.event_id)? {
        return Err(ConnectError::NotRegistered);
    }

    let Some(date) = event_date(conn, scan.event_id)? else {
        return Err(ConnectError::EventNotFound);
    };
    if !within_connection_window(date, now) {
        return Err(ConnectError::EventClosed);
    }

    let Some(scanned_id) = resolve_user_id(conn, scan.scanned)? else {
        return Err(ConnectError::UnknownUser);
    };
    Ok((scanner_id, scanned_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn points(db: &Database, username: &str) -> i64 {
        db.networking_points(username).unwrap().unwrap()
    }

    fn connection_rows(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM connections", [], |r| r.get(0))?))
            .unwrap()
    }

    /// alice and bob registered for an event dated on `now`'s day.
    fn setup() -> (Database, i64, DateTime<Utc>) {
        let db = db();
        user(&db, "alice");
        user(&db, "bob");
        let now = noon(2026, 5, 1);
        let id = event(&db, "RustConf", now.date_naive());
        register(&db, id, "alice");
        register(&db, id, "bob");
        (db, id, now)
    }

    #[test]
    fn test_window_is_symmetric_and_inclusive() {
        let date = day(2026, 4, 28);
        let start = Utc.with_ymd_and_hms(2026, 4, 28, 0, 0, 0).unwrap();

        assert!(within_connection_window(date, start));
        assert!(within_connection_window(date, start + Duration::hours(72)));
        assert!(!within_connection_window(date, start + Duration::hours(72) + Duration::seconds(1)));
        assert!(within_connection_window(date, start - Duration::hours(72)));
        assert!(!within_connection_window(date, start - Duration::hours(73)));
    }

    #[test]
    fn test_first_scan_records_and_awards_points() {
        let (db, id, now) = setup();

        let out = db
            .record_connection(&ScanRequest::new("alice", "bob", id, Some("talked about async")), now)
            .unwrap();
        assert_eq!(out.kind, ConnectKind::FirstMeeting);
        assert_eq!(out.encounter_count, 0);
        assert_eq!(out.profile.unwrap().name.as_deref(), Some("bob Example"));

        assert_eq!(points(&db, "alice"), 10);
        assert_eq!(points(&db, "bob"), 5);
        assert_eq!(connection_rows(&db), 1);

        let thread = db.messages_between("alice", "bob").unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].sender, "bob");
        assert_eq!(thread[0].text, "👋 Connected at RustConf");
    }

    #[test]
    fn test_rescan_at_same_event_is_duplicate() {
        let (db, id, now) = setup();
        db.record_connection(&ScanRequest::new("alice", "bob", id, None), now).unwrap();

        for (a, b) in [("alice", "bob"), ("bob", "alice"), ("alice", "bob")] {
            let out = db.record_connection(&ScanRequest::new(a, b, id, None), now).unwrap();
            assert_eq!(out.kind, ConnectKind::Duplicate);
            assert!(out.profile.is_some());
        }

        assert_eq!(connection_rows(&db), 1);
        assert_eq!(points(&db, "alice"), 10);
        assert_eq!(points(&db, "bob"), 5);
        assert_eq!(db.messages_between("alice", "bob").unwrap().len(), 1);
    }

    #[test]
    fn test_meeting_again_at_another_event_is_reconnection() {
        let (db, first, now) = setup();
        db.record_connection(&ScanRequest::new("alice", "bob", first, None), now).unwrap();

        let later = now + Duration::days(30);
        let second = event(&db, "Meetup", later.date_naive());
        register(&db, second, "alice");
        register(&db, second, "bob");

        let out = db.record_connection(&ScanRequest::new("bob", "alice", second, None), later).unwrap();
        assert_eq!(out.kind, ConnectKind::Reconnection);
        assert_eq!(out.encounter_count, 1);
        assert_eq!(connection_rows(&db), 2);
        assert_eq!(db.pair_encounters("alice", "bob").unwrap(), 2);

        // bob scanned this time, so bob earns the larger award
        assert_eq!(points(&db, "bob"), 15);
        assert_eq!(points(&db, "alice"), 15);

        let thread = db.messages_between("alice", "bob").unwrap();
        assert_eq!(thread[1].sender, "alice");
        assert_eq!(thread[1].text, "👋 Great to see you again at Meetup! (Interaction #2)");
    }

    #[test]
    fn test_unregistered_scanner_is_rejected() {
        let (db, _, now) = setup();
        let other = event(&db, "Other", now.date_naive());

        let err = db
            .record_connection(&ScanRequest::new("alice", "bob", other, None), now)
            .unwrap_err();
        assert!(matches!(err, ConnectError::NotRegistered));
        assert_eq!(err.to_string(), "You are not registered for this event.");

        let err = db
            .record_connection(&ScanRequest::new("ghost", "bob", other, None), now)
            .unwrap_err();
        assert!(matches!(err, ConnectError::NotRegistered));
        assert_eq!(connection_rows(&db), 0);
    }

    #[test]
    fn test_closed_event_writes_nothing() {
        let (db, id, now) = setup();
        let err = db
            .record_connection(&ScanRequest::new("alice", "bob", id, None), now + Duration::days(4))
            .unwrap_err();
        assert!(matches!(err, ConnectError::EventClosed));
        assert_eq!(err.to_string(), "This event has ended.");
        assert_eq!(connection_rows(&db), 0);
        assert_eq!(points(&db, "alice"), 0);
    }

    #[test]
    fn test_self_scan_and_unknown_target() {
        let (db, id, now) = setup();
        assert!(matches!(
            db.record_connection(&ScanRequest::new("alice", "alice", id, None), now),
            Err(ConnectError::SelfConnection)
        ));
        assert!(matches!(
            db.record_connection(&ScanRequest::new("alice", "ghost", id, None), now),
            Err(ConnectError::UnknownUser)
        ));
    }

    #[test]
    fn test_scanned_person_need_not_be_registered() {
        let (db, id, now) = setup();
        user(&db, "walkin");
        let out = db.record_connection(&ScanRequest::new("alice", "walkin", id, None), now).unwrap();
        assert_eq!(out.kind, ConnectKind::FirstMeeting);
    }

    #[test]
    fn test_cards_dedupe_and_show_only_own_note() {
        let (db, first, now) = setup();
        db.record_connection(&ScanRequest::new("alice", "bob", first, Some("alice's note")), now)
            .unwrap();

        let later = now + Duration::days(10);
        let second = event(&db, "Meetup", later.date_naive());
        register(&db, second, "alice");
        db.record_connection(&ScanRequest::new("alice", "bob", second, None), later).unwrap();

        let cards = db.connections_for("alice").unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].username, "bob");
        assert_eq!(cards[0].event_id, second);
        assert_eq!(cards[0].event_name.as_deref(), Some("Meetup"));

        assert!(db.update_note("bob", "alice", "bob's note").unwrap());
        let bob_cards = db.connections_for("bob").unwrap();
        assert_eq!(bob_cards[0].note, "bob's note");
        assert_eq!(db.connections_for("alice").unwrap()[0].note, "");

        assert!(!db.update_note("alice", "ghost", "x").unwrap());
    }

    #[test]
    fn test_delete_pair_removes_all_events() {
        let (db, first, now) = setup();
        db.record_connection(&ScanRequest::new("alice", "bob", first, None), now).unwrap();
        let later = now + Duration::days(10);
        let second = event(&db, "Meetup", later.date_naive());
        register(&db, second, "bob");
        db.record_connection(&ScanRequest::new("bob", "alice", second, None), later).unwrap();

        assert_eq!(db.delete_pair("bob", "alice").unwrap(), 2);
        assert!(db.connections_for("alice").unwrap().is_empty());
        // points are never taken back
        assert_eq!(points(&db, "bob"), 15);
    }

    #[test]
    fn test_unique_index_rejects_reversed_pair() {
        let (db, id, now) = setup();
        db.record_connection(&ScanRequest::new("alice", "bob", id, None), now).unwrap();

        let result = db.with_conn_mut(|conn| {
            Ok(conn.execute(
                "INSERT INTO connections (scanner_id, scanned_id, event_id)
                 SELECT b.id, a.id, ?1 FROM users a, users b
                 WHERE a.username = 'alice' AND b.username = 'bob'",
                [id],
            )?)
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_pair_index_rejects_reversed_row() {
        let (db, id, now) = setup();
        let created_at = format_timestamp(now);

        let inserted = db
            .with_conn_mut(|conn| {
                let alice = resolve_user_id(conn, "alice")?.unwrap();
                let bob = resolve_user_id(conn, "bob")?.unwrap();
                assert!(insert_pair(conn, bob, alice, id, "", &created_at)?);
                insert_pair(conn, alice, bob, id, "hi", &created_at)
            })
            .unwrap();
        assert!(!inserted);
        assert_eq!(connection_rows(&db), 1);
        assert_eq!(points(&db, "alice"), 0);
        assert_eq!(points(&db, "bob"), 0);
    }

    #[test]
    fn test_failed_message_rolls_back_scan() {
        let (db, id, now) = setup();
        db.with_conn_mut(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_messages BEFORE INSERT ON messages
                 BEGIN SELECT RAISE(ABORT, 'messages unavailable'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let result = db.record_connection(&ScanRequest::new("alice", "bob", id, Some("hi")), now);
        assert!(matches!(result, Err(ConnectError::Database(_))));
        assert_eq!(connection_rows(&db), 0);
        assert_eq!(points(&db, "alice"), 0);
        assert_eq!(points(&db, "bob"), 0);

        db.with_conn_mut(|conn| Ok(conn.execute_batch("DROP TRIGGER reject_messages")?)).unwrap();
        let out = db.record_connection(&ScanRequest::new("alice", "bob", id, None), now).unwrap();
        assert_eq!(out.kind, ConnectKind::FirstMeeting);
        assert_eq!(points(&db, "alice"), 10);
    }
}
