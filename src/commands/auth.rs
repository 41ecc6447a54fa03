use serde_json::Value;
use std::sync::Arc;

use super::{connect, reset_screens, to_message, Shared};
use crate::auth::AuthState;
use crate::backend::Backend;
use crate::cashier::CashierScreen;
use crate::routing;
use crate::supervisor::SupervisorScreen;

fn summary_json(ctx: &crate::auth::SessionContext) -> Result<Value, String> {
    serde_json::to_value(ctx.summary()).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn auth_get_session(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
) -> Result<Value, String> {
    if !backend.is_ready() {
        return summary_json(&auth_state.snapshot());
    }
    let (_, ctx) = connect(&backend, &auth_state).await.map_err(to_message)?;
    summary_json(&ctx)
}

#[tauri::command]
pub async fn auth_sign_in(
    email: String,
    password: String,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    cashier: tauri::State<'_, Shared<CashierScreen>>,
    supervisor: tauri::State<'_, Shared<SupervisorScreen>>,
) -> Result<Value, String> {
    let remote = backend.remote().map_err(to_message)?;
    let ctx = auth_state
        .sign_in(remote.as_ref(), &email, password)
        .await
        .map_err(to_message)?;
    reset_screens(&backend, &cashier, &supervisor);
    summary_json(&ctx)
}

#[tauri::command]
pub async fn auth_sign_out(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    cashier: tauri::State<'_, Shared<CashierScreen>>,
    supervisor: tauri::State<'_, Shared<SupervisorScreen>>,
) -> Result<Value, String> {
    let ctx = match backend.remote() {
        Ok(remote) => auth_state.sign_out(remote.as_ref()).await,
        Err(_) => auth_state.sign_out_locally(),
    };
    reset_screens(&backend, &cashier, &supervisor);
    summary_json(&ctx)
}

/// Screen to render (or path to redirect to) for `path`.
#[tauri::command]
pub async fn route_resolve(
    path: String,
    auth_state: tauri::State<'_, Arc<AuthState>>,
) -> Result<Value, String> {
    let decision = routing::resolve(&path, &auth_state.snapshot());
    serde_json::to_value(decision).map_err(|e| e.to_string())
}
