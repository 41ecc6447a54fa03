//! Backend configuration and the local civil calendar.
//!
//! Each value is looked up in the OS keyring first, then in the local
//! settings database (category `backend`), then in the environment.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::api::{
    extract_anon_key_from_connection_string, extract_project_url_from_connection_string,
    normalize_project_url,
};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::ShiftPeriod;
use crate::storage::{
    CredentialStore, KEY_SUPABASE_ANON_KEY, KEY_SUPABASE_URL, KEY_UTC_OFFSET_MINUTES,
};

pub const SETTINGS_CATEGORY: &str = "backend";

pub const ENV_SUPABASE_URL: &str = "PIZZA_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "PIZZA_SUPABASE_ANON_KEY";
pub const ENV_UTC_OFFSET_MINUTES: &str = "PIZZA_UTC_OFFSET_MINUTES";

/// America/La_Paz, UTC-4 all year.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub utc_offset_minutes: i32,
}

impl BackendConfig {
    /// Resolve from the three sources. `settings` and `env` are lookups by key
    /// so the order can be tested without touching the real keyring or the
    /// process environment.
    pub fn resolve(
        credentials: &dyn CredentialStore,
        settings: impl Fn(&str) -> Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> AppResult<Self> {
        let lookup = |key: &str, env_key: &str| -> Option<String> {
            credentials
                .get(key)
                .or_else(|| settings(key))
                .or_else(|| env(env_key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_key = lookup(KEY_SUPABASE_ANON_KEY, ENV_SUPABASE_ANON_KEY)
            .ok_or_else(|| AppError::Config("missing anon key".into()))?;

        // A connection string carries both values; an explicit URL still wins.
        let (anon_key, embedded_url) = match extract_anon_key_from_connection_string(&raw_key) {
            Some(key) => (key, extract_project_url_from_connection_string(&raw_key)),
            None => (raw_key, None),
        };

        let supabase_url = lookup(KEY_SUPABASE_URL, ENV_SUPABASE_URL)
            .map(|u| normalize_project_url(&u))
            .or(embedded_url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Config("missing backend URL".into()))?;

        let utc_offset_minutes = match lookup(KEY_UTC_OFFSET_MINUTES, ENV_UTC_OFFSET_MINUTES) {
            Some(raw) => raw.parse::<i32>().map_err(|_| {
                AppError::Config(format!("invalid UTC offset minutes: {raw}"))
            })?,
            None => DEFAULT_UTC_OFFSET_MINUTES,
        };

        debug!(url = %supabase_url, utc_offset_minutes, "backend configuration resolved");
        Ok(Self {
            supabase_url,
            anon_key,
            utc_offset_minutes,
        })
    }

    /// Resolve against the keyring, the settings database and the real
    /// process environment.
    pub fn load(credentials: &dyn CredentialStore, conn: Option<&Connection>) -> AppResult<Self> {
        Self::resolve(
            credentials,
            |key| conn.and_then(|c| db::get_setting(c, SETTINGS_CATEGORY, key)),
            |key| std::env::var(key).ok(),
        )
    }

    pub fn calendar(&self) -> LocalCalendar {
        LocalCalendar::from_offset_minutes(self.utc_offset_minutes).unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default UTC offset");
            LocalCalendar::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Local calendar
// ---------------------------------------------------------------------------

/// Civil date and shift period as seen at the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalCalendar {
    offset: FixedOffset,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES)
            .unwrap_or(Self { offset: Utc.fix() })
    }
}

impl LocalCalendar {
    pub fn from_offset_minutes(minutes: i32) -> AppResult<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| AppError::Config(format!("UTC offset out of range: {minutes} min")))
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn shift_at(&self, instant: DateTime<Utc>) -> ShiftPeriod {
        ShiftPeriod::at(instant.with_timezone(&self.offset).time())
    }

    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }

    pub fn current_shift(&self) -> ShiftPeriod {
        self.shift_at(Utc::now())
    }
}
