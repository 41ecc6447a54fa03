#![recursion_limit = "256"]

//! Pizza Río cancellations - Tauri v2 Backend
//!
//! Branch cashiers record the pizzas cancelled during a shift; supervisors
//! review every branch, confirm how many cancelled pizzas arrived at central
//! and export the filtered records as spreadsheets.
//!
//! The domain modules are headless. The `desktop` feature adds the Tauri shell
//! that registers the IPC command handlers called by the frontend via
//! `@tauri-apps/api/core::invoke()`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod auth;
pub mod backend;
pub mod cashier;
#[cfg(feature = "desktop")]
mod commands;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod models;
pub mod reconciliation;
pub mod remote;
pub mod routing;
pub mod storage;
pub mod supervisor;
#[cfg(test)]
mod test_support;
pub mod view_state;
pub mod xlsx;

/// Structured logging to the console and a daily rolling file.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pizza_cancellations_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if installed.is_ok() {
        // Dropping the guard flushes and stops the writer; the app runs until
        // process exit.
        std::mem::forget(guard);
    }
}

// ============================================================================
// App entry point
// ============================================================================

#[cfg(feature = "desktop")]
pub fn run() {
    use std::sync::{Arc, Mutex};
    use tauri::{Emitter, Manager};
    use tracing::{info, warn};

    init_tracing();
    info!(
        "Starting Pizza Río cancellations v{}",
        env!("CARGO_PKG_VERSION")
    );

    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;

            let db_state = db::init(&app_data_dir)?;
            let credentials: Arc<dyn storage::CredentialStore> = Arc::new(storage::KeyringStore);

            let backend = Arc::new(backend::Backend::new());
            {
                let conn = db_state.lock()?;
                backend.reload(credentials.as_ref(), Some(&*conn));
            }
            let calendar = backend.calendar();

            let auth_state = Arc::new(auth::AuthState::new(credentials.clone()));
            let cashier_screen = Arc::new(Mutex::new(cashier::CashierScreen::new(&calendar)));
            let supervisor_screen = Arc::new(Mutex::new(supervisor::SupervisorScreen::new()));

            app.manage(db_state);
            app.manage(credentials);
            app.manage(backend.clone());
            app.manage(auth_state.clone());
            app.manage(cashier_screen);
            app.manage(supervisor_screen);

            // Forward auth changes to the frontend.
            let mut subscription = auth_state.subscribe();
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                while let Some(change) = subscription.recv().await {
                    if let Err(e) = handle.emit("auth_state_changed", &change) {
                        warn!("Failed to emit auth_state_changed: {e}");
                    }
                }
            });

            // Restore the previous session, if any.
            tauri::async_runtime::spawn(async move {
                match backend.remote() {
                    Ok(remote) => {
                        auth_state.init(remote.as_ref()).await;
                    }
                    Err(e) => {
                        info!("Skipping session restore: {e}");
                        auth_state.init_signed_out();
                    }
                }
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Session
            commands::auth::auth_get_session,
            commands::auth::auth_sign_in,
            commands::auth::auth_sign_out,
            commands::auth::route_resolve,
            // Cashier
            commands::cashier::cashier_get_state,
            commands::cashier::cashier_load,
            commands::cashier::cashier_set_header,
            commands::cashier::cashier_add_line,
            commands::cashier::cashier_remove_line,
            commands::cashier::cashier_set_line,
            commands::cashier::cashier_submit,
            commands::cashier::cashier_load_page,
            commands::cashier::cashier_toggle_detail,
            // Supervisor
            commands::supervisor::supervisor_get_state,
            commands::supervisor::supervisor_load,
            commands::supervisor::supervisor_set_filters,
            commands::supervisor::supervisor_apply_filters,
            commands::supervisor::supervisor_clear_filters,
            commands::supervisor::supervisor_load_page,
            commands::supervisor::supervisor_toggle_detail,
            commands::supervisor::supervisor_set_arrived,
            commands::supervisor::supervisor_validate,
            // Export
            commands::export::export_summary,
            commands::export::export_detailed,
            commands::export::export_get_history,
            // Settings
            commands::settings::settings_is_configured,
            commands::settings::settings_test_connection,
            commands::settings::settings_save_backend,
            commands::settings::settings_factory_reset,
            // Diagnostics
            commands::diagnostics::diagnostics_get_about,
            commands::diagnostics::diagnostics_get_status,
            commands::diagnostics::diagnostics_export,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Pizza Río cancellations");
}
