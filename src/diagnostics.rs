//! Diagnostics for support requests.
//!
//! Provides:
//! - **About info**: version, build timestamp, git SHA, platform
//! - **Status**: backend configuration, session, local database, recent exports
//! - **Diagnostics export**: about + status + log files in a zip bundle
//! - **Log rotation helpers**: used by `lib.rs` to configure rolling log files.

use serde_json::{json, Value};
use std::fs;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::auth::ContextSummary;
use crate::db::{self, DbState};
use crate::error::AppResult;
use crate::storage::{self, CredentialStore};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

/// Maximum bytes of a single log file copied into a bundle (5 MB).
pub const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Rolling file prefix. Daily files are named `cancellations.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "cancellations";

const APP_DIR_NAME: &str = "bo.pizzario.cancellations";

// ---------------------------------------------------------------------------
// About info
// ---------------------------------------------------------------------------

pub fn get_about_info() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "gitSha": env!("BUILD_GIT_SHA"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    })
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Snapshot for the settings screen. Never includes secrets.
pub fn get_status(
    db: &DbState,
    credentials: &dyn CredentialStore,
    session: &ContextSummary,
) -> AppResult<Value> {
    let (schema_version, recent_exports) = {
        let conn = db.lock()?;
        let schema_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        (schema_version, db::recent_exports(&conn, 5)?)
    }; // lock released here

    let db_size = fs::metadata(&db.db_path).map(|m| m.len()).unwrap_or(0);

    Ok(json!({
        "backendConfigured": storage::is_configured(credentials),
        "session": session,
        "database": {
            "schemaVersion": schema_version,
            "sizeBytes": db_size,
        },
        "recentExports": recent_exports,
        "logDir": get_log_dir().to_string_lossy(),
    }))
}

// ---------------------------------------------------------------------------
// Diagnostics export (zip bundle)
// ---------------------------------------------------------------------------

/// Writes `about.json`, `status.json` and the log files into a zip in
/// `output_dir`. Returns the path of the bundle.
pub fn export_diagnostics(status: &Value, output_dir: &Path, include_logs: bool) -> AppResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let zip_path = output_dir.join(format!("pizza-cancellations-diagnostics-{timestamp}.zip"));

    let file = fs::File::create(&zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let zip_options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let pretty = |v: &Value| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());

    zip.start_file("about.json", zip_options)?;
    zip.write_all(pretty(&get_about_info()).as_bytes())?;

    zip.start_file("status.json", zip_options)?;
    zip.write_all(pretty(status).as_bytes())?;

    if include_logs {
        for path in log_files(&get_log_dir()) {
            let fname = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let Ok(f) = fs::File::open(&path) else {
                continue;
            };
            let mut buf = Vec::new();
            // Cap each file to keep the bundle small.
            if f.take(MAX_LOG_SIZE).read_to_end(&mut buf).is_ok() {
                zip.start_file(format!("logs/{fname}"), zip_options)?;
                zip.write_all(&buf)?;
            }
        }
    }

    zip.finish()?;
    info!(path = %zip_path.display(), "diagnostics bundle written");
    Ok(zip_path)
}

// ---------------------------------------------------------------------------
// Log rotation
// ---------------------------------------------------------------------------

/// Returns the log directory path (same location used by lib.rs).
pub fn get_log_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join(APP_DIR_NAME).join("logs")
}

/// Log files in `dir`, newest first.
fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_log = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
            if is_log {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(std::time::UNIX_EPOCH);
                files.push((path, modified));
            }
        }
    }
    files.sort_by(|a, b| b.1.cmp(&a.1));
    files.into_iter().map(|(p, _)| p).collect()
}

/// Prune old log files in `dir`, keeping only the most recent `keep`.
pub fn prune_logs_in(dir: &Path, keep: usize) -> usize {
    let mut removed = 0;
    for path in log_files(dir).iter().skip(keep) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to prune log file {}: {e}", path.display()),
        }
    }
    removed
}

pub fn prune_old_logs() {
    let log_dir = get_log_dir();
    if log_dir.exists() {
        prune_logs_in(&log_dir, MAX_LOG_FILES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionContext;
    use crate::test_support::MemoryCredentials;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{tag}_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_about_info_has_required_fields() {
        let info = get_about_info();
        for key in ["version", "buildTimestamp", "gitSha", "platform", "arch"] {
            assert!(info.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_log_dir_is_stable() {
        let d1 = get_log_dir();
        assert_eq!(d1, get_log_dir());
        assert!(d1.to_string_lossy().contains(APP_DIR_NAME));
    }

    #[test]
    fn test_status_reports_schema_and_exports() {
        let dir = temp_dir("diag_status");
        let db_state = db::init(&dir).unwrap();
        {
            let conn = db_state.lock().unwrap();
            db::record_export(&conn, "summary", &dir.join("a.xlsx"), 4).unwrap();
        }
        let status = get_status(
            &db_state,
            &MemoryCredentials::default(),
            &SessionContext::signed_out().summary(),
        )
        .unwrap();
        assert_eq!(status["backendConfigured"], json!(false));
        assert_eq!(status["database"]["schemaVersion"], json!(2));
        assert_eq!(status["recentExports"][0]["row_count"], json!(4));
        assert_eq!(status["session"]["signed_in"], json!(false));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_export_diagnostics_creates_zip() {
        let dir = temp_dir("diag_export");
        let path = export_diagnostics(&json!({ "ok": true }), &dir, false).unwrap();
        let file = fs::File::open(&path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_prune_keeps_newest_log_files() {
        let dir = temp_dir("diag_prune");
        for day in 1..=4 {
            fs::write(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-0{day}")), "x").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        fs::write(dir.join("unrelated.txt"), "keep").unwrap();

        assert_eq!(prune_logs_in(&dir, 2), 2);
        assert!(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-04")).exists());
        assert!(!dir.join(format!("{LOG_FILE_PREFIX}.2026-10-01")).exists());
        assert!(dir.join("unrelated.txt").exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
