use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::{connect, lock, snapshot, to_message, PageStep, Shared};
use crate::auth::AuthState;
use crate::backend::Backend;
use crate::remote::Page;
use crate::supervisor::{self, BranchFilter, SupervisorScreen};
use crate::view_state::Toggle;

type Screen = Shared<SupervisorScreen>;

fn view(screen: &Screen) -> Result<Value, String> {
    let s = lock(screen);
    let rows = serde_json::to_value(s.rows()).map_err(|e| e.to_string())?;
    snapshot(
        &*s,
        [
            ("rows", rows),
            ("has_prev", Value::Bool(s.records.has_prev())),
            ("has_next", Value::Bool(s.records.has_next())),
            ("reported_total", Value::from(s.reported_total())),
            ("can_validate", Value::Bool(s.can_validate())),
            (
                "validated_label",
                s.validated_label().map(Value::String).unwrap_or(Value::Null),
            ),
        ],
    )
}

/// Fetch `page` with the applied filters and show it.
async fn load_page(
    page: Page,
    backend: &Backend,
    auth_state: &AuthState,
    screen: &Screen,
) -> Result<Value, String> {
    let query = lock(screen).begin_load(page);
    let outcome = match connect(backend, auth_state).await {
        Ok((remote, ctx)) => supervisor::load_records(remote.as_ref(), &ctx, &query).await,
        Err(e) => Err(e),
    };
    lock(screen).apply_records(page, outcome);
    view(screen)
}

#[tauri::command]
pub async fn supervisor_get_state(screen: tauri::State<'_, Screen>) -> Result<Value, String> {
    view(&screen)
}

/// Branches for the filter select and the first page with the applied filters.
#[tauri::command]
pub async fn supervisor_load(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let (remote, ctx) = connect(&backend, &auth_state).await.map_err(to_message)?;
    let branches = supervisor::load_branches(remote.as_ref(), &ctx).await;
    let page = {
        let mut s = lock(&screen);
        s.apply_branches(branches);
        s.records.first_page()
    };
    load_page(page, &backend, &auth_state, &screen).await
}

/// Edit the filter inputs. Nothing reloads until the filters are applied.
#[tauri::command]
pub async fn supervisor_set_filters(
    branch: String,
    date: Option<NaiveDate>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let branch = BranchFilter::parse(&branch).map_err(|e| e.to_string())?;
    {
        let mut s = lock(&screen);
        s.set_branch_filter(branch);
        s.set_date_filter(date);
    }
    view(&screen)
}

#[tauri::command]
pub async fn supervisor_apply_filters(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let page = lock(&screen).apply_filters();
    load_page(page, &backend, &auth_state, &screen).await
}

#[tauri::command]
pub async fn supervisor_clear_filters(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let page = lock(&screen).clear_filters();
    load_page(page, &backend, &auth_state, &screen).await
}

#[tauri::command]
pub async fn supervisor_load_page(
    step: PageStep,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let target = step.target(&lock(&screen).records);
    match target {
        Some(page) => load_page(page, &backend, &auth_state, &screen).await,
        None => view(&screen),
    }
}

#[tauri::command]
pub async fn supervisor_toggle_detail(
    record_id: Uuid,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let toggle = lock(&screen)
        .toggle_detail(record_id)
        .map_err(|e| e.to_string())?;
    if let Toggle::Fetch(id) = toggle {
        let outcome = match connect(&backend, &auth_state).await {
            Ok((remote, ctx)) => supervisor::load_detail(remote.as_ref(), &ctx, id).await,
            Err(e) => Err(e),
        };
        lock(&screen).apply_detail(id, outcome);
    }
    view(&screen)
}

#[tauri::command]
pub async fn supervisor_set_arrived(
    value: String,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    lock(&screen).set_arrived_input(value);
    view(&screen)
}

/// Store the arrived count of the open record. Local check failures and a
/// record validated elsewhere come back as the screen notice.
#[tauri::command]
pub async fn supervisor_validate(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let pending = lock(&screen).begin_validation();
    if let Some(pending) = pending {
        let outcome = match connect(&backend, &auth_state).await {
            Ok((remote, ctx)) => supervisor::save_validation(remote.as_ref(), &ctx, pending).await,
            Err(e) => Err(e),
        };
        lock(&screen).finish_validation(pending.record_id, &outcome);
    }
    view(&screen)
}
