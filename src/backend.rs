//! Live backend connection shared by the commands.
//!
//! Holds the Supabase client built from the resolved configuration and the
//! branch calendar. Rebuilt whenever the backend settings change.

use rusqlite::Connection;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::api::SupabaseClient;
use crate::config::{BackendConfig, LocalCalendar};
use crate::error::{AppError, AppResult};
use crate::remote::RemoteStore;
use crate::storage::CredentialStore;

#[derive(Default)]
struct Inner {
    remote: Option<Arc<dyn RemoteStore>>,
    calendar: LocalCalendar,
    last_error: Option<String>,
}

#[derive(Default)]
pub struct Backend {
    inner: RwLock<Inner>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the configuration from every source and rebuild the client.
    pub fn reload(&self, credentials: &dyn CredentialStore, conn: Option<&Connection>) -> bool {
        self.apply(BackendConfig::load(credentials, conn))
    }

    /// Install the client for `config`. A configuration error leaves the
    /// backend unconfigured and is kept for [`Backend::remote`].
    pub fn apply(&self, config: AppResult<BackendConfig>) -> bool {
        let built = config.and_then(|c| {
            let client = SupabaseClient::new(&c)?;
            Ok((Arc::new(client) as Arc<dyn RemoteStore>, c.calendar()))
        });

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match built {
            Ok((remote, calendar)) => {
                info!(offset = calendar.offset_minutes(), "backend client ready");
                inner.remote = Some(remote);
                inner.calendar = calendar;
                inner.last_error = None;
                true
            }
            Err(e) => {
                warn!(error = %e, "backend not configured");
                inner.remote = None;
                inner.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Use `remote` directly. Lets the shell run against another store.
    pub fn install(&self, remote: Arc<dyn RemoteStore>, calendar: LocalCalendar) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remote = Some(remote);
        inner.calendar = calendar;
        inner.last_error = None;
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remote = None;
        inner.last_error = None;
    }

    pub fn remote(&self) -> AppResult<Arc<dyn RemoteStore>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.remote.clone().ok_or_else(|| {
            AppError::Config(
                inner
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "backend not configured".into()),
            )
        })
    }

    pub fn is_ready(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .remote
            .is_some()
    }

    pub fn calendar(&self) -> LocalCalendar {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .calendar
    }
}
