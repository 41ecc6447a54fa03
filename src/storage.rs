//! Secret storage using the OS credential store.
//!
//! On Windows this uses the Credential Manager (via the `keyring` crate), on
//! macOS Keychain, and on Linux the kernel keyring. Holds the backend URL,
//! the anon key and the refresh token of the last session.

use keyring::Entry;
use tracing::{info, warn};

use crate::error::AppResult;

const SERVICE_NAME: &str = "pizza-cancellations";

// Credential keys
pub const KEY_SUPABASE_URL: &str = "supabase_url";
pub const KEY_SUPABASE_ANON_KEY: &str = "supabase_anon_key";
pub const KEY_UTC_OFFSET_MINUTES: &str = "utc_offset_minutes";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[
    KEY_SUPABASE_URL,
    KEY_SUPABASE_ANON_KEY,
    KEY_UTC_OFFSET_MINUTES,
    KEY_REFRESH_TOKEN,
];

/// Key/value secret store. The OS keyring in production, a map in tests.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn delete(&self, key: &str) -> AppResult<()>;
}

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

pub fn set_credential(key: &str, value: &str) -> AppResult<()> {
    Entry::new(SERVICE_NAME, key)?.set_password(value)?;
    Ok(())
}

/// Silently succeeds if the entry does not exist.
pub fn delete_credential(key: &str) -> AppResult<()> {
    match Entry::new(SERVICE_NAME, key)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// The OS keyring behind [`CredentialStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringStore;

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Option<String> {
        get_credential(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        set_credential(key, value)
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        delete_credential(key)
    }
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The backend is usable once both URL and anon key are stored.
pub fn is_configured(store: &dyn CredentialStore) -> bool {
    let has = |key| store.get(key).is_some_and(|v| !v.trim().is_empty());
    has(KEY_SUPABASE_URL) && has(KEY_SUPABASE_ANON_KEY)
}

/// Store the backend settings entered on the setup screen.
pub fn save_backend_credentials(
    store: &dyn CredentialStore,
    supabase_url: &str,
    anon_key: &str,
    utc_offset_minutes: Option<i32>,
) -> AppResult<()> {
    store.set(KEY_SUPABASE_URL, supabase_url.trim())?;
    store.set(KEY_SUPABASE_ANON_KEY, anon_key.trim())?;
    if let Some(offset) = utc_offset_minutes {
        store.set(KEY_UTC_OFFSET_MINUTES, &offset.to_string())?;
    }
    info!("backend credentials stored");
    Ok(())
}

/// Remove every stored credential, including the session token.
pub fn factory_reset(store: &dyn CredentialStore) -> AppResult<()> {
    for key in ALL_KEYS {
        store.delete(key)?;
    }
    info!("all credentials cleared (factory reset)");
    Ok(())
}
