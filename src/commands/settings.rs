use serde_json::{json, Value};
use std::sync::Arc;
use tauri::Emitter;
use tracing::info;

use super::{reset_screens, to_message, Shared};
use crate::api;
use crate::auth::AuthState;
use crate::backend::Backend;
use crate::cashier::CashierScreen;
use crate::config::{LocalCalendar, SETTINGS_CATEGORY};
use crate::db;
use crate::storage::{self, CredentialStore, KEY_UTC_OFFSET_MINUTES};
use crate::supervisor::SupervisorScreen;

type Credentials = Arc<dyn CredentialStore>;

/// Split a pasted connection string into URL and key when the URL field is
/// empty.
fn url_and_key(supabase_url: &str, anon_key: &str) -> (String, String) {
    let key = api::extract_anon_key_from_connection_string(anon_key)
        .unwrap_or_else(|| anon_key.trim().to_string());
    let url = if supabase_url.trim().is_empty() {
        api::extract_project_url_from_connection_string(anon_key).unwrap_or_default()
    } else {
        api::normalize_project_url(supabase_url)
    };
    (url, key)
}

#[tauri::command]
pub async fn settings_is_configured(
    credentials: tauri::State<'_, Credentials>,
    backend: tauri::State<'_, Arc<Backend>>,
) -> Result<Value, String> {
    Ok(json!({
        "configured": storage::is_configured(credentials.inner().as_ref()),
        "ready": backend.is_ready(),
        "utc_offset_minutes": backend.calendar().offset_minutes(),
    }))
}

#[tauri::command]
pub async fn settings_test_connection(
    supabase_url: String,
    anon_key: String,
) -> Result<Value, String> {
    let (url, key) = url_and_key(&supabase_url, &anon_key);
    if url.is_empty() || key.is_empty() {
        return Err("Backend URL and anon key are required".into());
    }
    let result = api::test_connectivity(&url, &key).await;
    serde_json::to_value(result).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn settings_save_backend(
    supabase_url: String,
    anon_key: String,
    utc_offset_minutes: Option<i32>,
    credentials: tauri::State<'_, Credentials>,
    backend: tauri::State<'_, Arc<Backend>>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    let (url, key) = url_and_key(&supabase_url, &anon_key);
    if url.is_empty() || key.is_empty() {
        return Err("Backend URL and anon key are required".into());
    }
    if let Some(minutes) = utc_offset_minutes {
        LocalCalendar::from_offset_minutes(minutes).map_err(to_message)?;
    }

    storage::save_backend_credentials(credentials.inner().as_ref(), &url, &key, utc_offset_minutes)
        .map_err(to_message)?;

    let ready = {
        let conn = db.lock().map_err(to_message)?;
        // The offset is not secret; keep a copy next to the other local settings.
        if let Some(minutes) = utc_offset_minutes {
            db::set_setting(&conn, SETTINGS_CATEGORY, KEY_UTC_OFFSET_MINUTES, &minutes.to_string())
                .map_err(to_message)?;
        }
        backend.reload(credentials.inner().as_ref(), Some(&*conn))
    };

    info!(ready, "backend settings saved");
    let _ = app.emit("backend_configured", json!({ "ready": ready }));
    Ok(json!({ "success": true, "ready": ready }))
}

/// Forget the backend, the stored session and the local settings.
#[tauri::command]
pub async fn settings_factory_reset(
    credentials: tauri::State<'_, Credentials>,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    cashier: tauri::State<'_, Shared<CashierScreen>>,
    supervisor: tauri::State<'_, Shared<SupervisorScreen>>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<Value, String> {
    {
        let conn = db.lock().map_err(to_message)?;
        db::delete_all_settings(&conn, SETTINGS_CATEGORY).map_err(to_message)?;
    }
    storage::factory_reset(credentials.inner().as_ref()).map_err(to_message)?;
    backend.clear();
    auth_state.sign_out_locally();
    reset_screens(&backend, &cashier, &supervisor);

    let _ = app.emit("app_reset", json!({ "source": "factory_reset" }));
    Ok(json!({ "success": true }))
}
