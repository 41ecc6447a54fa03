//! The boundary to the hosted backend.
//!
//! Every read and write the screens need goes through [`RemoteStore`]. The
//! production implementation is [`crate::api::SupabaseClient`]; tests use an
//! in-memory fake. Row-level authorization happens on the other side of this
//! trait and is not modelled here.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Branch, CancellationReason, CancellationRecord, CancelledPizza, Flavor, NewCancellationRecord,
    NewCancelledPizza, Profile, Session,
};

/// A bounded window of rows: `size` rows starting at `index * size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn first(size: u32) -> Self {
        Self { index: 0, size }
    }

    pub fn offset(&self) -> u32 {
        self.index.saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            index: self.index.saturating_add(1),
            size: self.size,
        }
    }

    pub fn prev(&self) -> Option<Self> {
        self.index.checked_sub(1).map(|index| Self {
            index,
            size: self.size,
        })
    }
}

/// Equality filters for a record listing. Results are always newest date first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub created_by: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub page: Page,
}

impl RecordQuery {
    pub fn page(page: Page) -> Self {
        Self {
            created_by: None,
            branch_id: None,
            date: None,
            page,
        }
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    // -- auth -------------------------------------------------------------

    /// Exchange an e-mail/password pair for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Exchange a stored refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session>;

    /// Revoke the session on the server.
    async fn sign_out(&self, session: &Session) -> AppResult<()>;

    // -- reads ------------------------------------------------------------

    /// The single profile row of the session's user, with its branch name.
    async fn fetch_profile(&self, session: &Session) -> AppResult<Profile>;

    /// All branches, ordered by name.
    async fn list_branches(&self, session: &Session) -> AppResult<Vec<Branch>>;

    async fn list_active_flavors(&self, session: &Session) -> AppResult<Vec<Flavor>>;

    async fn list_active_reasons(&self, session: &Session) -> AppResult<Vec<CancellationReason>>;

    async fn list_records(
        &self,
        session: &Session,
        query: &RecordQuery,
    ) -> AppResult<Vec<CancellationRecord>>;

    /// Line items of one record with flavor and reason labels.
    async fn list_pizzas(
        &self,
        session: &Session,
        record_id: Uuid,
    ) -> AppResult<Vec<CancelledPizza>>;

    // -- writes -----------------------------------------------------------

    /// Insert a header and return the stored row (with its new id).
    async fn insert_record(
        &self,
        session: &Session,
        record: &NewCancellationRecord,
    ) -> AppResult<CancellationRecord>;

    async fn insert_pizzas(&self, session: &Session, pizzas: &[NewCancelledPizza])
        -> AppResult<()>;

    async fn delete_record(&self, session: &Session, record_id: Uuid) -> AppResult<()>;

    /// Set `total_sent` on a record that has not been validated yet (null or
    /// zero). Returns the updated rows; an empty vector means nothing matched.
    async fn set_total_sent(
        &self,
        session: &Session,
        record_id: Uuid,
        total_sent: u32,
    ) -> AppResult<Vec<CancellationRecord>>;
}
