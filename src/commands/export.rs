use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::Manager;
use tracing::warn;

use super::{connect, lock, to_message, Shared};
use crate::auth::AuthState;
use crate::backend::Backend;
use crate::db;
use crate::export::{self, ExportKind, ExportOutcome};
use crate::supervisor::SupervisorScreen;

/// `dir` when given, else the downloads folder, else `<app data>/exports`.
fn output_dir(dir: Option<String>, app: &tauri::AppHandle) -> Result<PathBuf, String> {
    if let Some(dir) = dir.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    app.path()
        .download_dir()
        .or_else(|_| app.path().app_data_dir().map(|d| d.join("exports")))
        .map_err(|e| format!("export dir: {e}"))
}

fn remember(db: &db::DbState, outcome: &ExportOutcome) {
    let stored = db
        .lock()
        .and_then(|conn| db::record_export(&conn, outcome.kind.as_str(), &outcome.path, outcome.rows));
    if let Err(e) = stored {
        warn!(error = %e, "export not added to history");
    }
}

async fn run_export(
    kind: ExportKind,
    dir: Option<String>,
    app: &tauri::AppHandle,
    backend: &Backend,
    auth_state: &AuthState,
    screen: &Shared<SupervisorScreen>,
    db: &db::DbState,
) -> Result<Value, String> {
    let dir = output_dir(dir, app)?;
    let filters = lock(screen).applied_filters;
    let today = backend.calendar().today();
    let (remote, ctx) = connect(backend, auth_state).await.map_err(to_message)?;

    let outcome = match kind {
        ExportKind::Summary => {
            export::export_summary(remote.as_ref(), &ctx, &filters, &dir, today).await
        }
        ExportKind::Detailed => {
            export::export_detailed(remote.as_ref(), &ctx, &filters, &dir, today).await
        }
    }
    .map_err(to_message)?;

    remember(db, &outcome);
    serde_json::to_value(&outcome).map_err(|e| e.to_string())
}

/// One row per record matching the applied filters.
#[tauri::command]
pub async fn export_summary(
    dir: Option<String>,
    app: tauri::AppHandle,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Shared<SupervisorScreen>>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    run_export(ExportKind::Summary, dir, &app, &backend, &auth_state, &screen, &db).await
}

/// One row per cancelled pizza of every record matching the applied filters.
#[tauri::command]
pub async fn export_detailed(
    dir: Option<String>,
    app: tauri::AppHandle,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Shared<SupervisorScreen>>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    run_export(ExportKind::Detailed, dir, &app, &backend, &auth_state, &screen, &db).await
}

#[tauri::command]
pub async fn export_get_history(
    limit: Option<u32>,
    db: tauri::State<'_, db::DbState>,
) -> Result<Value, String> {
    let entries = {
        let conn = db.lock().map_err(to_message)?;
        db::recent_exports(&conn, limit.unwrap_or(20)).map_err(to_message)?
    };
    serde_json::to_value(entries).map_err(|e| e.to_string())
}
