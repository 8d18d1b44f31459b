use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use mingle_insights::roles::normalize_roles;
use mingle_types::api::{
    EventImpact, GrowthPoint, NamedCount, RadarStats, RoleCount, StatsSummary, TimelineEntry,
};

use crate::Database;
use crate::analytics::role_count_from_row;

/// How many entries the personal breakdowns keep.
pub const PERSONAL_TOP: usize = 5;

/// Rows touching the user, expressed as "the other person" per row. Binds
/// the username as `?1`.
const OTHER_PERSON_SQL: &str = "SELECT c.id, c.event_id, c.created_at,
        CASE WHEN c.scanner_id = me.id THEN c.scanned_id ELSE c.scanner_id END AS other_id
     FROM connections c
     JOIN users me ON me.username = ?1
     WHERE c.scanner_id = me.id OR c.scanned_id = me.id";

impl Database {
    /// Points, distinct people met, and registrations split into past and
    /// upcoming relative to `now`'s date. Unknown users get all zeros.
    pub fn stats_summary(&self, username: &str, now: DateTime<Utc>) -> Result<StatsSummary> {
        let today = now.date_naive();
        self.with_conn(|conn| {
            let points = conn
                .query_row(
                    "SELECT COALESCE(MAX(networking_points), 0) FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )?;
            let connections = conn.query_row(
                &format!("SELECT COUNT(DISTINCT other_id) FROM ({OTHER_PERSON_SQL})"),
                [username],
                |row| row.get(0),
            )?;
            let (events_attended, events_upcoming) = conn.query_row(
                "SELECT COALESCE(SUM(e.date < ?2), 0), COALESCE(SUM(e.date >= ?2), 0)
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 JOIN events e ON e.id = r.event_id
                 WHERE u.username = ?1",
                rusqlite::params![username, today],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(StatsSummary {
                points,
                connections,
                events_attended,
                events_upcoming,
            })
        })
    }

    /// New people met per day: each person counts once, on the day of the
    /// first row with them.
    pub fn user_growth(&self, username: &str) -> Result<Vec<GrowthPoint>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT date(first_met) AS day, COUNT(*)
                 FROM (SELECT other_id, MIN(created_at) AS first_met FROM ({OTHER_PERSON_SQL}) GROUP BY other_id)
                 GROUP BY day
                 ORDER BY day ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let points = stmt
                .query_map([username], |row| {
                    Ok(GrowthPoint {
                        date: row.get(0)?,
                        daily_count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(points)
        })
    }

    /// Events where the user recorded the most connections.
    pub fn productive_events(&self, username: &str) -> Result<Vec<NamedCount>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT e.name, COUNT(*) AS n
                 FROM ({OTHER_PERSON_SQL}) mine
                 JOIN events e ON e.id = mine.event_id
                 GROUP BY e.id
                 ORDER BY n DESC, e.id ASC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![username, PERSONAL_TOP as i64], |row| {
                    Ok(NamedCount {
                        name: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// For each event where the user connected with anyone: distinct people
    /// met there and the event's registration count. Oldest event first.
    pub fn event_impact(&self, username: &str) -> Result<Vec<EventImpact>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT e.name, e.date, COUNT(DISTINCT mine.other_id),
                    (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id)
                 FROM ({OTHER_PERSON_SQL}) mine
                 JOIN events e ON e.id = mine.event_id
                 GROUP BY e.id
                 ORDER BY e.date ASC, e.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([username], |row| {
                    Ok(EventImpact {
                        name: row.get(0)?,
                        date: row.get(1)?,
                        my_connections: row.get(2)?,
                        total_attendees: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every event the user registered for, by date. `status` is
    /// "Checked In" once the user checked in there, "Registered" otherwise.
    pub fn timeline(&self, username: &str) -> Result<Vec<TimelineEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.name, e.date,
                    CASE WHEN ci.id IS NULL THEN 'Registered' ELSE 'Checked In' END
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 JOIN events e ON e.id = r.event_id
                 LEFT JOIN event_checkins ci ON ci.event_id = r.event_id AND ci.user_id = r.user_id
                 WHERE u.username = ?1
                 ORDER BY e.date ASC, e.id ASC",
            )?;
            let rows = stmt
                .query_map([username], |row| {
                    Ok(TimelineEntry {
                        name: row.get(0)?,
                        date: row.get(1)?,
                        status: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Normalized roles of the people met, one count per connection row.
    pub fn connection_roles(&self, username: &str) -> Result<Vec<RoleCount>> {
        let raw = self.with_conn(|conn| {
            let sql = format!(
                "SELECT COALESCE(u.position, ''), COUNT(*)
                 FROM ({OTHER_PERSON_SQL}) mine
                 JOIN users u ON u.id = mine.other_id
                 GROUP BY COALESCE(u.position, '')
                 ORDER BY COUNT(*) DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([username], role_count_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut roles = normalize_roles(&raw);
        roles.truncate(PERSONAL_TOP);
        Ok(roles)
    }

    /// Registrations per event category for the user, beside the global
    /// registrations per category divided by the number of users. Categories
    /// are compared trimmed and case-insensitively; the first spelling wins.
    pub fn radar(&self, username: &str) -> Result<RadarStats> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT TRIM(category), MIN(id) AS first_id FROM events
                 WHERE category IS NOT NULL AND TRIM(category) != ''
                 GROUP BY LOWER(TRIM(category))
                 ORDER BY first_id ASC",
            )?;
            let categories = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT LOWER(TRIM(e.category)), COUNT(*)
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 JOIN events e ON e.id = r.event_id
                 WHERE u.username = ?1 AND e.category IS NOT NULL AND TRIM(e.category) != ''
                 GROUP BY LOWER(TRIM(e.category))",
            )?;
            let mine: HashMap<String, i64> = stmt
                .query_map([username], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            let mut stmt = conn.prepare(
                "SELECT LOWER(TRIM(e.category)), COUNT(*)
                 FROM registrations r
                 JOIN events e ON e.id = r.event_id
                 WHERE e.category IS NOT NULL AND TRIM(e.category) != ''
                 GROUP BY LOWER(TRIM(e.category))",
            )?;
            let global: HashMap<String, i64> = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let user_values = categories
                .iter()
                .map(|c| mine.get(&c.to_lowercase()).copied().unwrap_or(0))
                .collect();
            let global_values = categories
                .iter()
                .map(|c| match (global.get(&c.to_lowercase()), users) {
                    (Some(&n), users) if users > 0 => n as f64 / users as f64,
                    _ => 0.0,
                })
                .collect();

            Ok(RadarStats {
                categories,
                user_values,
                global_values,
            })
        })
    }
}
