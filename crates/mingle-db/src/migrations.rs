use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE master_organizations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                type        TEXT NOT NULL DEFAULT 'Other'
            );

            CREATE TABLE master_skills (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE master_interests (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE
            );

            CREATE TABLE users (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                username            TEXT NOT NULL UNIQUE,
                fullname            TEXT,
                email               TEXT,
                phone_number        TEXT,
                linkedin_url        TEXT,
                organization_id     INTEGER REFERENCES master_organizations(id) ON DELETE SET NULL,
                company             TEXT,
                position            TEXT,
                qualifications      TEXT,
                photo_url           TEXT,
                role                TEXT NOT NULL DEFAULT 'attendee'
                                    CHECK (role IN ('attendee', 'admin')),
                networking_points   INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_skills (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                skill_id    INTEGER NOT NULL REFERENCES master_skills(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                PRIMARY KEY (user_id, skill_id)
            );

            CREATE TABLE user_interests (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                interest_id INTEGER NOT NULL REFERENCES master_interests(id) ON DELETE CASCADE,
                position    INTEGER NOT NULL,
                PRIMARY KEY (user_id, interest_id)
            );

            CREATE TABLE events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                date        TEXT NOT NULL,
                start_time  TEXT,
                end_time    TEXT,
                location    TEXT,
                category    TEXT,
                description TEXT,
                photo_url   TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE registrations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id        INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                role            TEXT NOT NULL DEFAULT 'Attendee',
                registered_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_id, user_id)
            );

            -- Tied to the registration row: dropping a registration drops its token.
            CREATE TABLE qr_codes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    INTEGER NOT NULL,
                user_id     INTEGER NOT NULL,
                qr_token    TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                expires_at  TEXT,
                UNIQUE(event_id, user_id),
                FOREIGN KEY (event_id, user_id)
                    REFERENCES registrations(event_id, user_id) ON DELETE CASCADE
            );

            CREATE TABLE connections (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                scanner_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                scanned_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                event_id        INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                scanner_note    TEXT NOT NULL DEFAULT '',
                scanned_note    TEXT NOT NULL DEFAULT '',
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (scanner_id != scanned_id)
            );

            -- At most one row per unordered pair per event.
            CREATE UNIQUE INDEX idx_connections_pair_event
                ON connections(min(scanner_id, scanned_id), max(scanner_id, scanned_id), event_id);

            CREATE INDEX idx_connections_created
                ON connections(created_at);

            CREATE TABLE event_checkins (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id        INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                checked_in_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_id, user_id)
            );

            CREATE TABLE event_feedback (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id    INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment     TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_id, user_id)
            );

            CREATE TABLE messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                receiver_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
                is_read     INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_messages_pair
                ON messages(sender_id, receiver_id, timestamp);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
