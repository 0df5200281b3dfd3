//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

const COUNTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS counts (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    key     TEXT NOT NULL UNIQUE,
    count   INTEGER NOT NULL DEFAULT 0,
    day     TEXT NULL
);

CREATE TABLE IF NOT EXISTS snorts (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    nick    TEXT NOT NULL,
    day     TEXT NOT NULL,
    count   INTEGER NOT NULL DEFAULT 0,
    UNIQUE (nick, day)
);
"#;

const ENDORSEMENTS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS person (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    platform_id TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS skill (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    key     TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS endorsement (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    endorser_id INTEGER NOT NULL REFERENCES person(id),
    endorsee_id INTEGER NOT NULL REFERENCES person(id),
    skill_id    INTEGER NOT NULL REFERENCES skill(id),
    UNIQUE (endorser_id, endorsee_id, skill_id)
);

CREATE INDEX IF NOT EXISTS idx_endorsement_endorsee ON endorsement(endorsee_id);
"#;

/// Create all tables. Safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    conn.execute_batch(COUNTS_SCHEMA)?;
    conn.execute_batch(ENDORSEMENTS_SCHEMA)?;

    if version < SCHEMA_VERSION {
        info!("Initialized database schema v{}", SCHEMA_VERSION);
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

pub fn drop_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS endorsement;
         DROP TABLE IF EXISTS skill;
         DROP TABLE IF EXISTS person;
         DROP TABLE IF EXISTS snorts;
         DROP TABLE IF EXISTS counts;
         DROP TABLE IF EXISTS schema_version;",
    )?;
    Ok(())
}
