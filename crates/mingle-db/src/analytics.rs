//! Read-only admin aggregates. SQL collects the raw rows; the math lives in
//! `mingle_insights`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use mingle_insights::density::{DensityZone, density_percent};
use mingle_insights::growth::percent_change;
use mingle_insights::matching::{TagProfile, score, top_matches};
use mingle_insights::sentiment::{TextSource, Vibe, score_texts, vibe_score};
use mingle_insights::topics::{MAX_TOPICS, top_topics};
use mingle_types::api::{
    AdminStats, ConnectionAudit, DailyCount, DensityPoint, EventFeedback, EventStats, GrowthStat,
    NamedCount, RoleCount, SmartMatch, Topic,
};
use rusqlite::Connection;

use crate::models::{CandidateRow, DensityRow, FeedbackRow};
use crate::users::{PHOTO_SQL, TagKind, load_tags, resolve_user_id};
use crate::{Database, format_timestamp};

pub const DEFAULT_DENSITY_DAYS: i64 = 30;
const GROWTH_WINDOW_DAYS: i64 = 30;
/// Days with activity shown on the admin growth chart.
pub const ACTIVITY_DAYS: i64 = 30;
pub const TOP_SKILLS: i64 = 10;

impl Database {
    /// Cumulative network density for each day inside the lookback window
    /// that saw at least one connection, oldest first.
    pub fn density_history(&self, days: i64, now: DateTime<Utc>) -> Result<Vec<DensityPoint>> {
        let since = lookback_start(now, days).map(format_timestamp);
        let until = format_timestamp(now);

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "WITH days AS (
                    SELECT DISTINCT date(created_at) AS day
                    FROM connections
                    WHERE (?1 IS NULL OR created_at >= ?1) AND created_at <= ?2
                 )
                 SELECT d.day,
                    (SELECT COUNT(*) FROM connections c WHERE date(c.created_at) <= d.day),
                    (SELECT COUNT(*) FROM users u WHERE u.role != 'admin' AND date(u.created_at) <= d.day),
                    (SELECT group_concat(name, ', ') FROM (
                        SELECT DISTINCT e.name AS name FROM connections c2
                        JOIN events e ON e.id = c2.event_id
                        WHERE date(c2.created_at) = d.day)),
                    (SELECT group_concat(category, ', ') FROM (
                        SELECT DISTINCT e.category AS category FROM connections c2
                        JOIN events e ON e.id = c2.event_id
                        WHERE date(c2.created_at) = d.day AND e.category IS NOT NULL AND e.category != ''))
                 FROM days d
                 ORDER BY d.day ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![since, until], |row| {
                    Ok((
                        DensityRow {
                            date: row.get(0)?,
                            links: row.get(1)?,
                            nodes: row.get(2)?,
                        },
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(rows
            .into_iter()
            .map(|(row, events, category)| {
                let density = density_percent(row.links, row.nodes);
                DensityPoint {
                    date: row.date,
                    density,
                    events: events.unwrap_or_else(|| "No Event".to_string()),
                    category: category.unwrap_or_else(|| "N/A".to_string()),
                    zone: DensityZone::for_density(density).label().to_string(),
                }
            })
            .collect())
    }

    /// Raw `(position, count)` rows, before normalization. With an event,
    /// only that event's registrants count; otherwise the whole user base.
    pub fn role_counts(&self, event_id: Option<i64>) -> Result<Vec<RoleCount>> {
        self.with_conn(|conn| {
            let rows = match event_id {
                Some(event_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT u.position, COUNT(*) AS n
                         FROM registrations r
                         JOIN users u ON u.id = r.user_id
                         WHERE r.event_id = ?1 AND u.position IS NOT NULL AND u.position != ''
                         GROUP BY u.position
                         ORDER BY n DESC, u.position ASC",
                    )?;
                    let rows = stmt
                        .query_map([event_id], role_count_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT position, COUNT(*) AS n
                         FROM users
                         WHERE position IS NOT NULL AND position != ''
                         GROUP BY position
                         ORDER BY n DESC, position ASC",
                    )?;
                    let rows = stmt
                        .query_map([], role_count_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn event_feedback_rows(&self, event_id: i64) -> Result<Vec<FeedbackRow>> {
        self.with_conn(|conn| feedback_rows(conn, event_id))
    }

    /// Feedback comments and scanner notes for one event, each scored on
    /// its own.
    pub fn event_feedback(&self, event_id: i64) -> Result<EventFeedback> {
        let texts = self.with_conn(|conn| event_texts(conn, event_id))?;
        Ok(EventFeedback {
            comments: score_texts(&texts),
        })
    }

    /// Per-event turnout, rating and vibe, newest first. Events with neither
    /// registrations nor check-ins are left out. `days` of 0 or `None`
    /// means no date filter.
    pub fn event_stats(
        &self,
        days: Option<i64>,
        limit: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventStats>> {
        let since = days
            .filter(|d| *d > 0)
            .and_then(|d| lookback_start(now, d))
            .map(|start| start.date_naive().to_string());
        let limit = limit.filter(|l| *l >= 0).unwrap_or(-1);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM (
                    SELECT e.id, e.name, e.date,
                        (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) AS registration_count,
                        (SELECT COUNT(*) FROM event_checkins c WHERE c.event_id = e.id) AS attendee_count,
                        (SELECT COALESCE(AVG(rating), 0) FROM event_feedback f WHERE f.event_id = e.id) AS avg_rating
                    FROM events e
                    WHERE ?1 IS NULL OR e.date >= ?1
                 )
                 WHERE registration_count > 0 OR attendee_count > 0
                 ORDER BY date DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![since, limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut stats = Vec::with_capacity(rows.len());
            for (id, name, date, registration_count, attendee_count, avg_rating) in rows {
                let avg = vibe_score(&score_texts(&event_texts(conn, id)?));
                stats.push(EventStats {
                    id,
                    name,
                    date,
                    registration_count,
                    attendee_count,
                    avg_rating,
                    vibe: Vibe::for_score(avg).label().to_string(),
                    vibe_score: format!("{:.1}", avg),
                });
            }
            Ok(stats)
        })
    }

    /// Totals with the last 30 days compared against the 30 before them.
    pub fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats> {
        let recent_start = format_timestamp(now - Duration::days(GROWTH_WINDOW_DAYS));
        let previous_start = format_timestamp(now - Duration::days(2 * GROWTH_WINDOW_DAYS));

        self.with_conn(|conn| {
            let users = growth_stat(conn, "users", &recent_start, &previous_start)?;
            let connections = growth_stat(conn, "connections", &recent_start, &previous_start)?;
            let events_count = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            Ok(AdminStats {
                users,
                connections,
                events_count,
            })
        })
    }

    /// Connections recorded per day for the most recent days with any
    /// activity, oldest first.
    pub fn connection_activity(&self) -> Result<Vec<DailyCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT day, n FROM (
                    SELECT date(created_at) AS day, COUNT(*) AS n
                    FROM connections
                    GROUP BY day
                    ORDER BY day DESC
                    LIMIT ?1
                 )
                 ORDER BY day ASC",
            )?;
            let rows = stmt
                .query_map([ACTIVITY_DAYS], |row| {
                    Ok(DailyCount {
                        date: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every connection row with both names and both notes, newest first.
    pub fn all_connections(&self) -> Result<Vec<ConnectionAudit>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.created_at,
                    s.username, s.fullname, c.scanner_note,
                    t.username, t.fullname, c.scanned_note,
                    e.name
                 FROM connections c
                 JOIN users s ON s.id = c.scanner_id
                 JOIN users t ON t.id = c.scanned_id
                 JOIN events e ON e.id = c.event_id
                 ORDER BY c.created_at DESC, c.id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ConnectionAudit {
                        created_at: row.get(0)?,
                        scanner_username: row.get(1)?,
                        scanner_name: row.get(2)?,
                        scanner_note: row.get(3)?,
                        scanned_username: row.get(4)?,
                        scanned_name: row.get(5)?,
                        scanned_note: row.get(6)?,
                        event_name: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most common skills across all profiles.
    pub fn top_skills(&self) -> Result<Vec<NamedCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ms.name, COUNT(us.user_id) AS n
                 FROM master_skills ms
                 JOIN user_skills us ON us.skill_id = ms.id
                 GROUP BY ms.id
                 ORDER BY n DESC, ms.name ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([TOP_SKILLS], |row| {
                    Ok(NamedCount {
                        name: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every non-empty note, from both sides of every connection.
    pub fn all_notes(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT scanner_note FROM connections WHERE scanner_note != ''
                 UNION ALL
                 SELECT scanned_note FROM connections WHERE scanned_note != ''",
            )?;
            let notes = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(notes)
        })
    }

    pub fn topics(&self) -> Result<Vec<Topic>> {
        Ok(top_topics(&self.all_notes()?, MAX_TOPICS))
    }

    /// Best tag-overlap suggestions among the other registrants of an event.
    pub fn smart_matches(&self, event_id: i64, username: &str) -> Result<Vec<SmartMatch>> {
        self.with_conn(|conn| {
            let Some(me) = resolve_user_id(conn, username)? else {
                return Ok(Vec::new());
            };
            let mine = TagProfile::new(
                &load_tags(conn, me, TagKind::Skill)?,
                &load_tags(conn, me, TagKind::Interest)?,
            );

            let sql = format!(
                "SELECT u.id, u.username, u.fullname, u.position, u.company, {PHOTO_SQL}
                 FROM registrations r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.event_id = ?1 AND u.id != ?2
                 ORDER BY r.id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let candidates = stmt
                .query_map([event_id, me], |row| {
                    Ok(CandidateRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        fullname: row.get(2)?,
                        position: row.get(3)?,
                        company: row.get(4)?,
                        photo_url: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut scored = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let skills = load_tags(conn, candidate.user_id, TagKind::Skill)?;
                let interests = load_tags(conn, candidate.user_id, TagKind::Interest)?;
                let result = score(&mine, &TagProfile::new(&skills, &interests));
                scored.push(((candidate, skills.join(", "), interests.join(", ")), result));
            }

            Ok(top_matches(scored)
                .into_iter()
                .map(|((c, skills, interests), m)| SmartMatch {
                    username: c.username,
                    fullname: c.fullname,
                    position: c.position,
                    company: c.company,
                    photo_url: c.photo_url,
                    skills,
                    special_interests: interests,
                    match_score: m.score,
                    common_tags: m.common_tags,
                })
                .collect())
        })
    }
}

/// `now` minus `days`, or `None` when that falls outside chrono's range.
/// Callers treat `None` as "no lower bound".
fn lookback_start(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| now.checked_sub_signed(d))
}

pub(crate) fn role_count_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoleCount> {
    Ok(RoleCount {
        position: row.get(0)?,
        count: row.get(1)?,
    })
}

fn feedback_rows(conn: &Connection, event_id: i64) -> Result<Vec<FeedbackRow>> {
    let mut stmt = conn.prepare(
        "SELECT rating, comment FROM event_feedback WHERE event_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([event_id], |row| {
            Ok(FeedbackRow {
                rating: row.get(0)?,
                comment: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Feedback comments first, then scanner notes, in insertion order.
fn event_texts(conn: &Connection, event_id: i64) -> Result<Vec<(String, TextSource)>> {
    let mut texts: Vec<(String, TextSource)> = feedback_rows(conn, event_id)?
        .into_iter()
        .filter_map(|f| f.comment.map(|c| (c, TextSource::Feedback { rating: f.rating })))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT scanner_note FROM connections
         WHERE event_id = ?1 AND scanner_note != ''
         ORDER BY id ASC",
    )?;
    for note in stmt.query_map([event_id], |row| row.get::<_, String>(0))? {
        texts.push((note?, TextSource::NetworkingNote));
    }
    Ok(texts)
}

fn growth_stat(conn: &Connection, table: &str, recent_start: &str, previous_start: &str) -> Result<GrowthStat> {
    let sql = format!(
        "SELECT COUNT(*),
            COUNT(CASE WHEN created_at >= ?1 THEN 1 END),
            COUNT(CASE WHEN created_at >= ?2 AND created_at < ?1 THEN 1 END)
         FROM {table}"
    );
    let (total, recent, previous): (i64, i64, i64) = conn.query_row(&sql, [recent_start, previous_start], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    Ok(GrowthStat {
        count: total,
        pct: percent_change(recent, previous),
    })
}
