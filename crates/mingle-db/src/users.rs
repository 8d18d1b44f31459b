use anyhow::Result;
use mingle_insights::matching::split_tags;
use mingle_types::api::{CreateUserRequest, Leaderboard, LeaderboardEntry, RankResponse, UpdateProfileRequest};
use mingle_types::models::{Profile, ProfileSnippet, UserRole};
use rusqlite::{Connection, Row};

use crate::{Database, OptionalExt};

pub const LEADERBOARD_PAGE_SIZE: i64 = 20;
pub const ORGANIZATION_SEARCH_LIMIT: i64 = 50;

/// Inline photos above this size are data URIs nobody wants in a list view.
pub(crate) const PHOTO_SQL: &str = "CASE WHEN length(u.photo_url) > 2000 THEN NULL ELSE u.photo_url END";

/// Columns for `snippet_from_row`; expects `users u` and
/// `LEFT JOIN master_organizations mo ON mo.id = u.organization_id`.
pub(crate) const SNIPPET_COLUMNS: &str = "u.fullname, u.position, COALESCE(mo.name, u.company), \
     CASE WHEN length(u.photo_url) > 2000 THEN NULL ELSE u.photo_url END, u.email, u.linkedin_url";

pub(crate) fn snippet_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ProfileSnippet> {
    Ok(ProfileSnippet {
        name: row.get(offset)?,
        position: row.get(offset + 1)?,
        company: row.get(offset + 2)?,
        photo: row.get(offset + 3)?,
        email: row.get(offset + 4)?,
        linkedin: row.get(offset + 5)?,
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum TagKind {
    Skill,
    Interest,
}

impl TagKind {
    fn master_table(self) -> &'static str {
        match self {
            TagKind::Skill => "master_skills",
            TagKind::Interest => "master_interests",
        }
    }

    fn junction_table(self) -> &'static str {
        match self {
            TagKind::Skill => "user_skills",
            TagKind::Interest => "user_interests",
        }
    }

    fn fk_column(self) -> &'static str {
        match self {
            TagKind::Skill => "skill_id",
            TagKind::Interest => "interest_id",
        }
    }
}

impl Database {
    // -- Users --

    pub fn create_user(&self, req: &CreateUserRequest) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, fullname, email, phone_number, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    req.username.trim(),
                    req.fullname.trim(),
                    &req.email,
                    &req.phone_number,
                    req.role.as_str(),
                ),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn user_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(resolve_user_id(conn, username)?.is_some()))
    }

    pub fn get_profile(&self, username: &str) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, username))
    }

    /// Apply a profile edit in one transaction: scalar fields, organization
    /// lookup-or-create, and tag resync. Returns false for an unknown user.
    pub fn update_profile(&self, req: &UpdateProfileRequest) -> Result<bool> {
        self.with_tx(|tx| {
            let Some(user_id) = resolve_user_id(&tx, &req.username)? else {
                return Ok(false);
            };

            // NULL parameter = leave column alone, '' = clear it
            tx.execute(
                "UPDATE users SET
                    fullname       = CASE WHEN ?2 IS NULL THEN fullname       ELSE NULLIF(TRIM(?2), '') END,
                    email          = CASE WHEN ?3 IS NULL THEN email          ELSE NULLIF(TRIM(?3), '') END,
                    phone_number   = CASE WHEN ?4 IS NULL THEN phone_number   ELSE NULLIF(TRIM(?4), '') END,
                    linkedin_url   = CASE WHEN ?5 IS NULL THEN linkedin_url   ELSE NULLIF(TRIM(?5), '') END,
                    position       = CASE WHEN ?6 IS NULL THEN position       ELSE NULLIF(TRIM(?6), '') END,
                    qualifications = CASE WHEN ?7 IS NULL THEN qualifications ELSE NULLIF(TRIM(?7), '') END,
                    photo_url      = CASE WHEN ?8 IS NULL THEN photo_url      ELSE NULLIF(TRIM(?8), '') END
                 WHERE id = ?1",
                rusqlite::params![
                    user_id,
                    req.name,
                    req.email,
                    req.phone_number,
                    req.linkedin,
                    req.position,
                    req.qualifications,
                    req.photo,
                ],
            )?;

            if let Some(company) = &req.company {
                let company = company.trim();
                let org_id = if company.is_empty() {
                    None
                } else {
                    Some(find_or_create_organization(&tx, company)?)
                };
                tx.execute(
                    "UPDATE users SET organization_id = ?1, company = NULLIF(?2, '') WHERE id = ?3",
                    rusqlite::params![org_id, company, user_id],
                )?;
            }

            if let Some(skills) = &req.skills {
                resync_tags(&tx, user_id, &split_tags(skills), TagKind::Skill)?;
            }
            if let Some(interests) = &req.interests {
                resync_tags(&tx, user_id, &split_tags(interests), TagKind::Interest)?;
            }

            tx.commit()?;
            Ok(true)
        })
    }

    /// Removes a user and, through the foreign keys, every row that refers to them.
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            Ok(deleted > 0)
        })
    }

    pub fn networking_points(&self, username: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT networking_points FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn rank(&self, username: &str) -> Result<RankResponse> {
        self.with_conn(|conn| {
            let points: Option<i64> = conn
                .query_row(
                    "SELECT networking_points FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(points) = points else {
                return Ok(RankResponse { rank: 0, percentile: 0 });
            };

            let ahead: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE networking_points > ?1",
                [points],
                |row| row.get(0),
            )?;
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

            let rank = ahead + 1;
            Ok(RankResponse {
                rank,
                percentile: mingle_insights::growth::percentile(rank, total),
            })
        })
    }

    pub fn leaderboard(&self, page: i64) -> Result<Leaderboard> {
        let offset = (page.max(1) - 1) * LEADERBOARD_PAGE_SIZE;
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

            let sql = format!(
                "SELECT u.username, u.fullname, u.networking_points, {PHOTO_SQL}
                 FROM users u
                 ORDER BY u.networking_points DESC, u.id ASC
                 LIMIT ?1 OFFSET ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let users = stmt
                .query_map([LEADERBOARD_PAGE_SIZE, offset], |row| {
                    Ok(LeaderboardEntry {
                        username: row.get(0)?,
                        fullname: row.get(1)?,
                        points: row.get(2)?,
                        photo_url: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Leaderboard { users, total })
        })
    }

    /// Organization names containing `query` (case-insensitive), sorted by
    /// name. An empty query lists the first names alphabetically.
    pub fn search_organizations(&self, query: &str) -> Result<Vec<String>> {
        let needle = query.trim().to_lowercase();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM master_organizations
                 WHERE ?1 = '' OR instr(lower(name), ?1) > 0
                 ORDER BY name COLLATE NOCASE ASC
                 LIMIT ?2",
            )?;
            let names = stmt
                .query_map(rusqlite::params![needle, ORGANIZATION_SEARCH_LIMIT], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }
}

pub(crate) fn resolve_user_id(conn: &Connection, username: &str) -> Result<Option<i64>> {
    conn.query_row("SELECT id FROM users WHERE username = ?1", [username], |row| row.get(0))
        .optional()
}

pub(crate) fn query_snippet(conn: &Connection, user_id: i64) -> Result<Option<ProfileSnippet>> {
    let sql = format!(
        "SELECT {SNIPPET_COLUMNS}
         FROM users u
         LEFT JOIN master_organizations mo ON mo.id = u.organization_id
         WHERE u.id = ?1"
    );
    conn.query_row(&sql, [user_id], |row| snippet_from_row(row, 0))
        .optional()
}

fn query_profile(conn: &Connection, username: &str) -> Result<Option<Profile>> {
    let sql = format!(
        "SELECT u.id, u.username, u.phone_number, u.qualifications, u.networking_points, u.role,
                {SNIPPET_COLUMNS}
         FROM users u
         LEFT JOIN master_organizations mo ON mo.id = u.organization_id
         WHERE u.username = ?1"
    );

    let row = conn
        .query_row(&sql, [username], |row| {
            let snippet = snippet_from_row(row, 6)?;
            Ok(Profile {
                user_id: row.get(0)?,
                username: row.get(1)?,
                phone_number: row.get(2)?,
                qualifications: row.get(3)?,
                networking_points: row.get(4)?,
                role: UserRole::from_db(&row.get::<_, String>(5)?),
                name: snippet.name,
                email: snippet.email,
                linkedin: snippet.linkedin,
                company: snippet.company,
                position: snippet.position,
                photo: snippet.photo,
                skills: Vec::new(),
                interests: Vec::new(),
            })
        })
        .optional()?;

    let Some(mut profile) = row else {
        return Ok(None);
    };
    profile.skills = load_tags(conn, profile.user_id, TagKind::Skill)?;
    profile.interests = load_tags(conn, profile.user_id, TagKind::Interest)?;
    Ok(Some(profile))
}

/// A user's tags in the order they entered them.
pub(crate) fn load_tags(conn: &Connection, user_id: i64, kind: TagKind) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT m.name FROM {junction} j
         JOIN {master} m ON m.id = j.{fk}
         WHERE j.user_id = ?1
         ORDER BY j.position ASC",
        junction = kind.junction_table(),
        master = kind.master_table(),
        fk = kind.fk_column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let tags = stmt
        .query_map([user_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(tags)
}

/// Replace a user's junction rows with `tags`, creating master rows as needed.
fn resync_tags(conn: &Connection, user_id: i64, tags: &[String], kind: TagKind) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE user_id = ?1", kind.junction_table()),
        [user_id],
    )?;

    for (position, tag) in tags.iter().enumerate() {
        conn.execute(
            &format!("INSERT OR IGNORE INTO {} (name) VALUES (?1)", kind.master_table()),
            [tag],
        )?;
        let tag_id: i64 = conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?1", kind.master_table()),
            [tag],
            |row| row.get(0),
        )?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, {}, position) VALUES (?1, ?2, ?3)",
                kind.junction_table(),
                kind.fk_column()
            ),
            rusqlite::params![user_id, tag_id, position as i64],
        )?;
    }
    Ok(())
}

fn find_or_create_organization(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO master_organizations (name, type) VALUES (?1, 'Other')",
        [name],
    )?;
    let id = conn.query_row(
        "SELECT id FROM master_organizations WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn edit(username: &str) -> UpdateProfileRequest {
        UpdateProfileRequest {
            username: username.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_profile_round_trip_with_tags() {
        let db = db();
        user(&db, "alice");

        let mut req = edit("alice");
        req.position = Some("Staff Engineer".to_string());
        req.company = Some("Acme".to_string());
        req.skills = Some("Rust, Go, ".to_string());
        req.interests = Some("climbing".to_string());
        assert!(db.update_profile(&req).unwrap());

        let p = db.get_profile("alice").unwrap().unwrap();
        assert_eq!(p.position.as_deref(), Some("Staff Engineer"));
        assert_eq!(p.company.as_deref(), Some("Acme"));
        assert_eq!(p.skills, vec!["Rust", "Go"]);
        assert_eq!(p.skills_display(), "Rust, Go");
        assert_eq!(p.interests, vec!["climbing"]);
        assert_eq!(p.role, UserRole::Attendee);
    }

    #[test]
    fn test_untouched_fields_survive_and_tags_resync() {
        let db = db();
        user(&db, "bob");

        let mut first = edit("bob");
        first.position = Some("Designer".to_string());
        first.skills = Some("figma, sketch".to_string());
        db.update_profile(&first).unwrap();

        let mut second = edit("bob");
        second.skills = Some("sketch".to_string());
        db.update_profile(&second).unwrap();

        let p = db.get_profile("bob").unwrap().unwrap();
        assert_eq!(p.position.as_deref(), Some("Designer"));
        assert_eq!(p.skills, vec!["sketch"]);

        let mut cleared = edit("bob");
        cleared.position = Some(String::new());
        db.update_profile(&cleared).unwrap();
        assert_eq!(db.get_profile("bob").unwrap().unwrap().position, None);
    }

    #[test]
    fn test_update_unknown_user() {
        let db = db();
        assert!(!db.update_profile(&edit("ghost")).unwrap());
    }

    #[test]
    fn test_search_organizations() {
        let db = db();
        for (name, company) in [("a", "Acme Robotics"), ("b", "acme labs"), ("c", "Globex")] {
            user(&db, name);
            let mut req = edit(name);
            req.company = Some(company.to_string());
            db.update_profile(&req).unwrap();
        }

        assert_eq!(db.search_organizations("ACME").unwrap(), vec!["acme labs", "Acme Robotics"]);
        assert_eq!(db.search_organizations(" glob ").unwrap(), vec!["Globex"]);
        assert_eq!(db.search_organizations("").unwrap().len(), 3);
        assert!(db.search_organizations("%").unwrap().is_empty());
    }

    #[test]
    fn test_rank_and_leaderboard() {
        let db = db();
        for name in ["a", "b", "c", "d"] {
            user(&db, name);
        }
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE users SET networking_points = 30 WHERE username = 'c'", [])?;
            conn.execute("UPDATE users SET networking_points = 10 WHERE username = 'a'", [])?;
            Ok(())
        })
        .unwrap();

        let rank = db.rank("a").unwrap();
        assert_eq!(rank.rank, 2);
        assert_eq!(rank.percentile, 50);
        assert_eq!(db.rank("nobody").unwrap().rank, 0);

        let board = db.leaderboard(1).unwrap();
        assert_eq!(board.total, 4);
        assert_eq!(board.users[0].username, "c");
        assert_eq!(board.users[1].username, "a");
        assert!(db.leaderboard(2).unwrap().users.is_empty());
    }
}
