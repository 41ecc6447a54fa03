//! Row types exchanged with the remote tables.
//!
//! Field names follow the deployed schema (`turno`, `cantidad`, the `sucursal`
//! role); the Rust side uses English names through serde renames.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// The only authorization axis of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "sucursal")]
    BranchCashier,
    Supervisor,
    #[serde(other)]
    Unknown,
}

/// Half-day bucket attached to a cancellation record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftPeriod {
    #[default]
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl ShiftPeriod {
    /// AM until noon, PM afterwards.
    pub fn at(time: NaiveTime) -> Self {
        if time.hour() < 12 {
            ShiftPeriod::Am
        } else {
            ShiftPeriod::Pm
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftPeriod::Am => "AM",
            ShiftPeriod::Pm => "PM",
        }
    }
}

impl fmt::Display for ShiftPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by the auth service. Wiped from memory on drop.
#[derive(Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

// ---------------------------------------------------------------------------
// Catalogs and profile
// ---------------------------------------------------------------------------

/// `{ name }` object produced by an embedded resource select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonRef {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub branch_id: Option<Uuid>,
    #[serde(default, rename = "branches")]
    pub branch: Option<NamedRef>,
}

impl Profile {
    pub fn branch_name(&self) -> &str {
        self.branch.as_ref().map(|b| b.name.as_str()).unwrap_or("—")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReason {
    pub id: Uuid,
    pub reason: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Shift header as read back from `cancellation_records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub id: Uuid,
    pub branch_id: Uuid,
    #[serde(default)]
    pub cashier_name: String,
    pub date: NaiveDate,
    /// Older rows carried the shift on each pizza instead.
    #[serde(default, rename = "turno")]
    pub shift: Option<ShiftPeriod>,
    pub total_cancelled: u32,
    #[serde(default)]
    pub total_sent: Option<u32>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default, rename = "branches")]
    pub branch: Option<NamedRef>,
}

impl CancellationRecord {
    pub fn branch_name(&self) -> &str {
        self.branch.as_ref().map(|b| b.name.as_str()).unwrap_or("—")
    }

    pub fn shift_label(&self) -> &'static str {
        self.shift.map(ShiftPeriod::as_str).unwrap_or("—")
    }

    /// A zero count is treated like "not yet validated", the same as null.
    pub fn is_validated(&self) -> bool {
        self.total_sent.unwrap_or(0) > 0
    }
}

/// Insert payload for a shift header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCancellationRecord {
    pub branch_id: Uuid,
    pub cashier_name: String,
    pub date: NaiveDate,
    #[serde(rename = "turno")]
    pub shift: ShiftPeriod,
    pub total_cancelled: u32,
    pub created_by: Uuid,
}

/// Line item with its joined catalog labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledPizza {
    pub id: Uuid,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(default, rename = "flavors")]
    pub flavor: Option<NamedRef>,
    #[serde(default, rename = "cancellation_reasons")]
    pub reason: Option<ReasonRef>,
}

impl CancelledPizza {
    pub fn flavor_label(&self) -> &str {
        self.flavor.as_ref().map(|f| f.name.as_str()).unwrap_or("—")
    }

    pub fn reason_label(&self) -> &str {
        self.reason.as_ref().map(|r| r.reason.as_str()).unwrap_or("—")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCancelledPizza {
    pub record_id: Uuid,
    pub flavor_id: Uuid,
    pub reason_id: Uuid,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

// ---------------------------------------------------------------------------
// Screen messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeTone {
    Success,
    Warning,
    Error,
}

/// One-line status message shown under a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub tone: NoticeTone,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            tone: NoticeTone::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            tone: NoticeTone::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: NoticeTone::Error,
            text: text.into(),
        }
    }
}

/// dd-MM-yyyy, the format used on screen and in exports.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}
