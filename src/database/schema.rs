//! Database schema definitions

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Create or migrate the schema. Safe to run on every open.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = schema_version(conn)?;

    if current_version == 0 {
        info!("Creating database schema v{}", SCHEMA_VERSION);
        conn.execute_batch(TABLES)?;
        conn.execute_batch(INDEXES)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        conn.execute_batch(INDEXES)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Schema version stored in the database, 0 if not initialized.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

const TABLES: &str = r"
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id TEXT NOT NULL UNIQUE,
    artifact TEXT,
    status TEXT NOT NULL,
    created_at REAL NOT NULL,
    updated_at REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS engagement_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    views INTEGER NOT NULL,
    likes INTEGER NOT NULL,
    comments INTEGER NOT NULL,
    shares INTEGER NOT NULL,
    timestamp REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS validation_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id TEXT NOT NULL,
    validation_type TEXT NOT NULL,
    result TEXT NOT NULL,
    score REAL NOT NULL,
    timestamp REAL NOT NULL
);

-- One row per (post, platform); re-checks overwrite the verdict.
CREATE TABLE IF NOT EXISTS social_posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id TEXT NOT NULL,
    post_id TEXT NOT NULL,
    platform TEXT NOT NULL,
    valid INTEGER NOT NULL,
    checked_at REAL NOT NULL,
    UNIQUE(post_id, platform)
);
";

const INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions(status);
CREATE INDEX IF NOT EXISTS idx_metrics_post_platform ON engagement_metrics(post_id, platform);
CREATE INDEX IF NOT EXISTS idx_validation_submission ON validation_results(submission_id);
";
