use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::{connect, lock, snapshot, to_message, PageStep, Shared};
use crate::auth::AuthState;
use crate::backend::Backend;
use crate::cashier::{self, CashierScreen};
use crate::models::ShiftPeriod;
use crate::view_state::Toggle;

type Screen = Shared<CashierScreen>;

fn view(screen: &Screen) -> Result<Value, String> {
    let s = lock(screen);
    snapshot(
        &*s,
        [
            ("has_prev", Value::Bool(s.recent.has_prev())),
            ("has_next", Value::Bool(s.recent.has_next())),
        ],
    )
}

/// Apply a form edit and return the new state.
fn edit(
    screen: &Screen,
    f: impl FnOnce(&mut CashierScreen) -> Result<(), crate::error::ValidationError>,
) -> Result<Value, String> {
    f(&mut lock(screen)).map_err(|e| e.to_string())?;
    view(screen)
}

#[tauri::command]
pub async fn cashier_get_state(screen: tauri::State<'_, Screen>) -> Result<Value, String> {
    view(&screen)
}

/// Catalogs for the selects and the first page of the cashier's records.
#[tauri::command]
pub async fn cashier_load(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let (remote, ctx) = connect(&backend, &auth_state).await.map_err(to_message)?;
    let catalogs = cashier::load_catalogs(remote.as_ref(), &ctx)
        .await
        .map_err(to_message)?;
    let page = lock(&screen).recent.first_page();
    let recent = cashier::load_recent(remote.as_ref(), &ctx, page).await;
    {
        let mut s = lock(&screen);
        s.apply_catalogs(catalogs);
        s.apply_recent(page, recent);
    }
    view(&screen)
}

#[tauri::command]
pub async fn cashier_set_header(
    cashier_name: String,
    date: Option<NaiveDate>,
    shift: ShiftPeriod,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    edit(&screen, |s| {
        s.draft.cashier_name = cashier_name;
        s.draft.date = date;
        s.draft.shift = shift;
        Ok(())
    })
}

#[tauri::command]
pub async fn cashier_add_line(screen: tauri::State<'_, Screen>) -> Result<Value, String> {
    edit(&screen, |s| {
        s.draft.add_line();
        Ok(())
    })
}

#[tauri::command]
pub async fn cashier_remove_line(
    index: usize,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    edit(&screen, |s| s.draft.remove_line(index))
}

#[tauri::command]
pub async fn cashier_set_line(
    index: usize,
    flavor_id: Option<Uuid>,
    reason_id: Option<Uuid>,
    quantity: Option<i64>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    edit(&screen, |s| {
        s.draft.set_flavor(index, flavor_id)?;
        s.draft.set_reason(index, reason_id)?;
        s.draft.set_quantity(index, quantity)
    })
}

/// Validate and store the form. Validation problems come back as the
/// screen notice, not as a command error.
#[tauri::command]
pub async fn cashier_submit(
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let calendar = backend.calendar();
    let submission = lock(&screen).begin_submit(calendar.today());
    let Some(submission) = submission else {
        return view(&screen);
    };

    let outcome = match connect(&backend, &auth_state).await {
        Ok((remote, ctx)) => cashier::submit_record(remote.as_ref(), &ctx, &submission).await,
        Err(e) => Err(e),
    };
    let reload = lock(&screen).finish_submit(&outcome, &calendar);

    if let Some(page) = reload {
        match connect(&backend, &auth_state).await {
            Ok((remote, ctx)) => {
                let recent = cashier::load_recent(remote.as_ref(), &ctx, page).await;
                lock(&screen).apply_recent(page, recent);
            }
            Err(e) => warn!(error = %e, "recent records not reloaded after save"),
        }
    }
    view(&screen)
}

#[tauri::command]
pub async fn cashier_load_page(
    step: PageStep,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let target = step.target(&lock(&screen).recent);
    let Some(page) = target else {
        return view(&screen);
    };
    let (remote, ctx) = connect(&backend, &auth_state).await.map_err(to_message)?;
    let recent = cashier::load_recent(remote.as_ref(), &ctx, page).await;
    lock(&screen).apply_recent(page, recent);
    view(&screen)
}

#[tauri::command]
pub async fn cashier_toggle_detail(
    record_id: Uuid,
    backend: tauri::State<'_, Arc<Backend>>,
    auth_state: tauri::State<'_, Arc<AuthState>>,
    screen: tauri::State<'_, Screen>,
) -> Result<Value, String> {
    let toggle = lock(&screen).toggle_detail(record_id);
    if let Toggle::Fetch(id) = toggle {
        let outcome = match connect(&backend, &auth_state).await {
            Ok((remote, ctx)) => cashier::load_detail(remote.as_ref(), &ctx, id).await,
            Err(e) => Err(e),
        };
        lock(&screen).apply_detail(id, outcome);
    }
    view(&screen)
}
