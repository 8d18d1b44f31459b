use anyhow::Result;
use chrono::NaiveDate;
use mingle_types::api::CreateEventRequest;
use mingle_types::models::{Attendee, Event};
use rusqlite::{Connection, Row};

use crate::users::{SNIPPET_COLUMNS, snippet_from_row};
use crate::{Database, OptionalExt};

const EVENT_COLUMNS: &str =
    "id, name, date, start_time, end_time, location, category, description, photo_url";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        date: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        location: row.get(5)?,
        category: row.get(6)?,
        description: row.get(7)?,
        photo: row.get(8)?,
    })
}

impl Database {
    pub fn create_event(&self, req: &CreateEventRequest) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events (name, date, start_time, end_time, location, category, description, photo_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    req.name.trim(),
                    req.date,
                    req.start_time,
                    req.end_time,
                    req.location,
                    req.category,
                    req.description,
                    req.photo,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_event(&self, event_id: i64) -> Result<Option<Event>> {
        self.with_conn(|conn| query_event(conn, event_id))
    }

    /// All events, soonest date first.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC, id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let events = stmt
                .query_map([], event_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(events)
        })
    }

    /// Deletes the event; registrations, tokens, check-ins, feedback and
    /// connections go with it.
    pub fn delete_event(&self, event_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM events WHERE id = ?1", [event_id])?;
            Ok(deleted > 0)
        })
    }

    pub fn attendees(&self, event_id: i64) -> Result<Vec<Attendee>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT r.id, u.username, r.role, {SNIPPET_COLUMNS}
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 LEFT JOIN master_organizations mo ON mo.id = u.organization_id
                 WHERE r.event_id = ?1
                 ORDER BY r.registered_at ASC, r.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let attendees = stmt
                .query_map([event_id], |row| {
                    Ok(Attendee {
                        registration_id: row.get(0)?,
                        username: row.get(1)?,
                        role: row.get(2)?,
                        profile: snippet_from_row(row, 3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(attendees)
        })
    }
}

pub(crate) fn query_event(conn: &Connection, event_id: i64) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    conn.query_row(&sql, [event_id], event_from_row).optional()
}

pub(crate) fn event_date(conn: &Connection, event_id: i64) -> Result<Option<NaiveDate>> {
    conn.query_row("SELECT date FROM events WHERE id = ?1", [event_id], |row| row.get(0))
        .optional()
}
