//! Local SQLite store.
//!
//! Holds non-secret settings (category/key/value) and a history of written
//! export files. Business data never lands here; it lives in the hosted
//! backend. Uses rusqlite with WAL mode and versioned migrations.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};

/// Managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

impl DbState {
    pub fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::Storage(format!("database lock poisoned: {e}")))
    }
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initialize the database at `{app_data_dir}/settings.db`.
///
/// On open failure the file is deleted and opened again once; it only holds
/// settings that can be re-entered.
pub fn init(app_data_dir: &Path) -> AppResult<DbState> {
    fs::create_dir_all(app_data_dir)?;

    let db_path = app_data_dir.join("settings.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            open_and_configure(&db_path)?
        }
    };

    run_migrations(&conn)?;
    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

fn open_and_configure(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(conn)
}

fn run_migrations(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");
    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    Ok(())
}

/// Migration v1: settings.
fn migrate_v1(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS local_settings (
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now')),
            PRIMARY KEY (setting_category, setting_key)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        AppError::from(e)
    })?;
    info!("Applied migration v1 (local_settings)");
    Ok(())
}

/// Migration v2: export history.
fn migrate_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS export_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL CHECK (kind IN ('summary', 'detailed')),
            file_path TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            created_at TEXT DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_export_history_created
            ON export_history(created_at);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        AppError::from(e)
    })?;
    info!("Applied migration v2 (export_history)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )?;
    Ok(())
}

pub fn delete_all_settings(conn: &Connection, category: &str) -> AppResult<()> {
    conn.execute(
        "DELETE FROM local_settings WHERE setting_category = ?1",
        params![category],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Export history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub kind: String,
    pub file_path: String,
    pub row_count: i64,
    pub created_at: String,
}

pub fn record_export(conn: &Connection, kind: &str, file_path: &Path, rows: usize) -> AppResult<()> {
    conn.execute(
        "INSERT INTO export_history (kind, file_path, row_count) VALUES (?1, ?2, ?3)",
        params![kind, file_path.to_string_lossy(), rows as i64],
    )?;
    Ok(())
}

/// Most recent exports first.
pub fn recent_exports(conn: &Connection, limit: u32) -> AppResult<Vec<ExportEntry>> {
    let mut stmt = conn.prepare(
        "SELECT kind, file_path, row_count, COALESCE(created_at, '')
         FROM export_history ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(ExportEntry {
            kind: row.get(0)?,
            file_path: row.get(1)?,
            row_count: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Run all migrations on the given connection (test helper).
#[cfg(test)]
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        run_migrations(&conn).expect("migrations");
        conn
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare table list");
        stmt.query_map([], |row| row.get(0))
            .expect("query tables")
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_migrations_create_tables() {
        let conn = test_db();
        let tables = table_names(&conn);
        assert!(tables.contains(&"local_settings".to_string()));
        assert!(tables.contains(&"export_history".to_string()));
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = test_db();
        run_migrations(&conn).expect("second run");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, CURRENT_SCHEMA_VERSION as i64);
    }

    #[test]
    fn test_settings_crud() {
        let conn = test_db();
        set_setting(&conn, "backend", "utc_offset_minutes", "-240").expect("set");
        assert_eq!(
            get_setting(&conn, "backend", "utc_offset_minutes").as_deref(),
            Some("-240")
        );
        set_setting(&conn, "backend", "utc_offset_minutes", "-300").expect("update");
        assert_eq!(
            get_setting(&conn, "backend", "utc_offset_minutes").as_deref(),
            Some("-300")
        );
        delete_all_settings(&conn, "backend").expect("delete");
        assert!(get_setting(&conn, "backend", "utc_offset_minutes").is_none());
    }

    #[test]
    fn test_export_history_newest_first() {
        let conn = test_db();
        record_export(&conn, "summary", Path::new("/tmp/a.xlsx"), 3).unwrap();
        record_export(&conn, "detailed", Path::new("/tmp/b.xlsx"), 9).unwrap();
        let entries = recent_exports(&conn, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "detailed");
        assert_eq!(entries[0].row_count, 9);
        assert_eq!(entries[1].file_path, "/tmp/a.xlsx");
    }

    #[test]
    fn test_export_kind_is_constrained() {
        let conn = test_db();
        assert!(record_export(&conn, "pdf", Path::new("/tmp/c.pdf"), 1).is_err());
    }

    #[test]
    fn test_init_creates_file_db() {
        let dir = std::env::temp_dir().join(format!("pizza_db_{}", uuid::Uuid::new_v4()));
        let state = init(&dir).expect("init");
        assert!(state.db_path.exists());
        {
            let conn = state.lock().unwrap();
            set_setting(&conn, "backend", "k", "v").unwrap();
        }
        let _ = fs::remove_dir_all(&dir);
    }
}
