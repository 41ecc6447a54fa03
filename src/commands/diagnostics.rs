use serde_json::{json, Value};
use std::sync::Arc;
use tauri::Manager;

use super::to_message;
use crate::auth::AuthState;
use crate::db;
use crate::diagnostics;
use crate::storage::CredentialStore;

#[tauri::command]
pub async fn diagnostics_get_about() -> Result<Value, String> {
    Ok(diagnostics::get_about_info())
}

#[tauri::command]
pub async fn diagnostics_get_status(
    db: tauri::State<'_, db::DbState>,
    credentials: tauri::State<'_, Arc<dyn CredentialStore>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
) -> Result<Value, String> {
    diagnostics::get_status(&db, credentials.inner().as_ref(), &auth_state.snapshot().summary())
        .map_err(to_message)
}

#[tauri::command]
pub async fn diagnostics_export(
    include_logs: Option<bool>,
    db: tauri::State<'_, db::DbState>,
    credentials: tauri::State<'_, Arc<dyn CredentialStore>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let include_logs = include_logs.unwrap_or(true);
    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("app data dir: {e}"))?;
    let status =
        diagnostics::get_status(&db, credentials.inner().as_ref(), &auth_state.snapshot().summary())
            .map_err(to_message)?;
    let zip_path = diagnostics::export_diagnostics(&status, &data_dir, include_logs)
        .map_err(to_message)?;
    Ok(json!({
        "success": true,
        "path": zip_path.to_string_lossy(),
        "options": { "includeLogs": include_logs },
    }))
}
