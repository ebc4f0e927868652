//! Persistence for the single display preference. A tiny key/value table
//! in an embedded SQLite file stands in for the browser-style local
//! storage the preference came from: one fixed key, read once at startup,
//! written on every toggle. No migrations, no versioning.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::{params, Connection, OptionalExtension};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".recipe-finder";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "prefs.sqlite";
/// Fixed key under which the dark/light preference is stored.
pub const DARK_MODE_KEY: &str = "dark_mode";

/// Ensure the preference store exists and return a live connection.
pub fn ensure_schema() -> Result<Connection> {
    let db_path = db_path()?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open preference store")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create the key/value table when missing. Split from [`ensure_schema`]
/// so tests can run against an in-memory connection.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS prefs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create prefs table")?;
    Ok(())
}

/// Read the dark-mode flag. Absent or unrecognized values fall back to the
/// light palette.
pub fn load_dark_mode(conn: &Connection) -> Result<bool> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM prefs WHERE key = ?1",
            params![DARK_MODE_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read dark mode preference")?;

    Ok(value.as_deref() == Some("true"))
}

/// Persist the dark-mode flag, overwriting any previous value.
pub fn save_dark_mode(conn: &Connection, enabled: bool) -> Result<()> {
    conn.execute(
        "INSERT INTO prefs (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![DARK_MODE_KEY, if enabled { "true" } else { "false" }],
    )
    .context("failed to save dark mode preference")?;
    Ok(())
}

/// Resolve the absolute path to the preference store inside the user's
/// home.
fn db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}
