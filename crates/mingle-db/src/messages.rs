use anyhow::Result;
use chrono::{DateTime, Utc};
use mingle_types::api::Conversation;
use mingle_types::models::Message;
use rusqlite::Connection;

use crate::users::{PHOTO_SQL, resolve_user_id};
use crate::{Database, format_timestamp};

pub const EMPTY_CONVERSATION_TEXT: &str = "Start a conversation 👋";
pub const EMPTY_CONVERSATION_TIMESTAMP: &str = "1970-01-01 00:00:00";

pub(crate) fn insert_message(
    conn: &Connection,
    sender_id: i64,
    receiver_id: i64,
    text: &str,
    timestamp: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (sender_id, receiver_id, text, timestamp) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![sender_id, receiver_id, text, timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Returns `None` when either username is unknown.
    pub fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let timestamp = format_timestamp(now);
        self.with_conn_mut(|conn| {
            let (Some(sender_id), Some(receiver_id)) =
                (resolve_user_id(conn, sender)?, resolve_user_id(conn, receiver)?)
            else {
                return Ok(None);
            };
            insert_message(conn, sender_id, receiver_id, text, &timestamp).map(Some)
        })
    }

    /// Both directions of a conversation, oldest first.
    pub fn messages_between(&self, user1: &str, user2: &str) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, s.username, r.username, m.text, m.timestamp, m.is_read
                 FROM messages m
                 JOIN users s ON s.id = m.sender_id
                 JOIN users r ON r.id = m.receiver_id
                 WHERE (s.username = ?1 AND r.username = ?2)
                    OR (s.username = ?2 AND r.username = ?1)
                 ORDER BY m.timestamp ASC, m.id ASC",
            )?;
            let messages = stmt
                .query_map([user1, user2], |row| {
                    Ok(Message {
                        id: row.get(0)?,
                        sender: row.get(1)?,
                        receiver: row.get(2)?,
                        text: row.get(3)?,
                        timestamp: row.get(4)?,
                        is_read: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(messages)
        })
    }

    /// Mark everything `other` sent to `me` as read.
    pub fn mark_read(&self, me: &str, other: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE is_read = 0
                   AND sender_id = (SELECT id FROM users WHERE username = ?1)
                   AND receiver_id = (SELECT id FROM users WHERE username = ?2)",
                [other, me],
            )?;
            Ok(updated)
        })
    }

    /// One inbox entry per person the user has a connection with, unread
    /// threads first, then most recent.
    pub fn conversations(&self, username: &str) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let Some(me) = resolve_user_id(conn, username)? else {
                return Ok(Vec::new());
            };

            let sql = format!(
                "WITH contacts AS (
                    SELECT DISTINCT CASE WHEN scanner_id = ?1 THEN scanned_id ELSE scanner_id END AS other_id
                    FROM connections
                    WHERE scanner_id = ?1 OR scanned_id = ?1
                 )
                 SELECT u.username, u.fullname, {PHOTO_SQL},
                    (SELECT m.text FROM messages m
                      WHERE (m.sender_id = ?1 AND m.receiver_id = u.id)
                         OR (m.sender_id = u.id AND m.receiver_id = ?1)
                      ORDER BY m.timestamp DESC, m.id DESC LIMIT 1),
                    (SELECT m.timestamp FROM messages m
                      WHERE (m.sender_id = ?1 AND m.receiver_id = u.id)
                         OR (m.sender_id = u.id AND m.receiver_id = ?1)
                      ORDER BY m.timestamp DESC, m.id DESC LIMIT 1),
                    (SELECT COUNT(*) FROM messages m
                      WHERE m.sender_id = u.id AND m.receiver_id = ?1 AND m.is_read = 0)
                 FROM contacts c
                 JOIN users u ON u.id = c.other_id"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut inbox = stmt
                .query_map([me], |row| {
                    let last: Option<String> = row.get(3)?;
                    let timestamp: Option<String> = row.get(4)?;
                    Ok(Conversation {
                        username: row.get(0)?,
                        name: row.get(1)?,
                        photo: row.get(2)?,
                        last_message: last.unwrap_or_else(|| EMPTY_CONVERSATION_TEXT.to_string()),
                        timestamp: timestamp.unwrap_or_else(|| EMPTY_CONVERSATION_TIMESTAMP.to_string()),
                        unread_count: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Fixed-width timestamps sort lexically.
            inbox.sort_by(|a, b| {
                b.unread_count
                    .cmp(&a.unread_count)
                    .then_with(|| b.timestamp.cmp(&a.timestamp))
            });
            Ok(inbox)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::test_support::*;

    #[test]
    fn test_send_and_read_thread() {
        let db = db();
        user(&db, "alice");
        user(&db, "bob");
        let t = noon(2026, 5, 1);

        db.send_message("alice", "bob", "hi", t).unwrap().unwrap();
        db.send_message("bob", "alice", "hey", t + Duration::minutes(1)).unwrap().unwrap();
        assert!(db.send_message("alice", "ghost", "?", t).unwrap().is_none());

        let thread = db.messages_between("bob", "alice").unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].text, "hi");
        assert_eq!(thread[1].sender, "bob");

        assert_eq!(db.mark_read("alice", "bob").unwrap(), 1);
        assert_eq!(db.mark_read("alice", "bob").unwrap(), 0);
        assert!(db.messages_between("alice", "bob").unwrap()[1].is_read);
        assert!(!db.messages_between("alice", "bob").unwrap()[0].is_read);
    }

    #[test]
    fn test_conversations_list_connected_people_unread_first() {
        let db = db();
        for name in ["alice", "bob", "carol", "dave"] {
            user(&db, name);
        }
        let id = event(&db, "Meetup", noon(2026, 5, 1).date_naive());
        for name in ["alice", "bob", "carol"] {
            register(&db, id, name);
        }
        let t = noon(2026, 5, 1);
        db.record_connection(&crate::connections::ScanRequest::new("alice", "bob", id, None), t)
            .unwrap();
        db.record_connection(&crate::connections::ScanRequest::new("alice", "carol", id, None), t)
            .unwrap();
        db.mark_read("alice", "bob").unwrap();
        db.mark_read("alice", "carol").unwrap();

        db.send_message("alice", "bob", "see you later", t + Duration::hours(1)).unwrap();
        db.send_message("carol", "alice", "coffee?", t + Duration::minutes(5)).unwrap();
        // dave never connected, so no inbox entry even with messages
        db.send_message("dave", "alice", "spam", t).unwrap();

        let inbox = db.conversations("alice").unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].username, "carol");
        assert_eq!(inbox[0].unread_count, 1);
        assert_eq!(inbox[1].username, "bob");
        assert_eq!(inbox[1].last_message, "see you later");
    }

    #[test]
    fn test_conversations_for_unknown_user() {
        let db = db();
        assert!(db.conversations("ghost").unwrap().is_empty());
    }
}
