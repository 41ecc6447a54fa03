//! IPC command handlers.
//!
//! Handlers are thin: they take the managed state, release every screen lock
//! before awaiting the backend, and return a JSON snapshot of what changed.
//! Errors reach the frontend as the user-facing message.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::{AuthState, SessionContext};
use crate::backend::Backend;
use crate::cashier::CashierScreen;
use crate::error::{AppError, AppResult};
use crate::remote::{Page, RemoteStore};
use crate::supervisor::SupervisorScreen;
use crate::view_state::Pager;

pub mod auth;
pub mod cashier;
pub mod diagnostics;
pub mod export;
pub mod settings;
pub mod supervisor;

pub(crate) type Shared<T> = Arc<Mutex<T>>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A new identity starts with fresh screens.
pub(crate) fn reset_screens(
    backend: &Backend,
    cashier: &Shared<CashierScreen>,
    supervisor: &Shared<SupervisorScreen>,
) {
    *lock(cashier) = CashierScreen::new(&backend.calendar());
    *lock(supervisor) = SupervisorScreen::new();
}

pub(crate) fn to_message(e: AppError) -> String {
    e.user_message()
}

/// Backend client and a fresh session context for one command.
pub(crate) async fn connect(
    backend: &Backend,
    auth_state: &AuthState,
) -> AppResult<(Arc<dyn RemoteStore>, SessionContext)> {
    let remote = backend.remote()?;
    let ctx = auth_state.current(remote.as_ref()).await?;
    Ok((remote, ctx))
}

/// `value` serialized, with `extra` fields merged into the top-level object.
pub(crate) fn snapshot<S: Serialize>(
    value: &S,
    extra: impl IntoIterator<Item = (&'static str, Value)>,
) -> Result<Value, String> {
    let mut json = serde_json::to_value(value).map_err(|e| e.to_string())?;
    if let Value::Object(map) = &mut json {
        for (key, field) in extra {
            map.insert(key.to_string(), field);
        }
    }
    Ok(json)
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStep {
    First,
    Next,
    Prev,
    Current,
}

impl PageStep {
    /// Target page for this step, or `None` when the pager cannot move.
    pub fn target<T>(self, pager: &Pager<T>) -> Option<Page> {
        match self {
            PageStep::First => Some(pager.first_page()),
            PageStep::Next => pager.next_page(),
            PageStep::Prev => pager.prev_page(),
            PageStep::Current => Some(pager.page),
        }
    }
}
