//! Cashier screen: shift record entry and the cashier's recent submissions.
//!
//! The screen state is plain data. Network work happens in the free async
//! functions, which the shell calls with the state lock released, and the
//! results are applied back through the `CashierScreen` methods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::SessionContext;
use crate::config::LocalCalendar;
use crate::error::{AppError, AppResult, ValidationError};
use crate::models::{
    CancellationReason, CancellationRecord, CancelledPizza, Flavor, NewCancellationRecord,
    NewCancelledPizza, Notice, Role, ShiftPeriod,
};
use crate::remote::{Page, RecordQuery, RemoteStore};
use crate::view_state::{DetailPanel, Pager, Toggle};

pub const RECENT_PAGE_SIZE: u32 = 5;

const SAVED_MESSAGE: &str = "Record saved";
const SAVE_FAILED_MESSAGE: &str = "Error saving the record";
const DETAIL_FAILED_MESSAGE: &str = "Could not load the record detail";

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// One pizza row of the form. `None` means the field is still empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PizzaLineDraft {
    pub flavor_id: Option<Uuid>,
    pub reason_id: Option<Uuid>,
    pub quantity: Option<u32>,
}

impl Default for PizzaLineDraft {
    fn default() -> Self {
        Self {
            flavor_id: None,
            reason_id: None,
            quantity: Some(1),
        }
    }
}

impl PizzaLineDraft {
    fn is_complete(&self) -> bool {
        self.flavor_id.is_some() && self.reason_id.is_some() && self.quantity.unwrap_or(0) > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub cashier_name: String,
    pub date: Option<NaiveDate>,
    pub shift: ShiftPeriod,
    pub lines: Vec<PizzaLineDraft>,
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub cashier_name: String,
    pub date: NaiveDate,
    pub shift: ShiftPeriod,
    pub lines: Vec<ValidLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidLine {
    pub flavor_id: Uuid,
    pub reason_id: Uuid,
    pub quantity: u32,
}

impl RecordDraft {
    /// Empty form: today, the current shift period and one blank pizza.
    pub fn new(calendar: &LocalCalendar) -> Self {
        Self {
            cashier_name: String::new(),
            date: Some(calendar.today()),
            shift: calendar.current_shift(),
            lines: vec![PizzaLineDraft::default()],
        }
    }

    pub fn reset(&mut self, calendar: &LocalCalendar) {
        *self = Self::new(calendar);
    }

    pub fn add_line(&mut self) {
        self.lines.push(PizzaLineDraft::default());
    }

    pub fn remove_line(&mut self, index: usize) -> Result<(), ValidationError> {
        if index >= self.lines.len() {
            return Err(ValidationError::NoSuchLine(index));
        }
        if self.lines.len() == 1 {
            return Err(ValidationError::LastLine);
        }
        self.lines.remove(index);
        Ok(())
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut PizzaLineDraft, ValidationError> {
        self.lines
            .get_mut(index)
            .ok_or(ValidationError::NoSuchLine(index))
    }

    pub fn set_flavor(&mut self, index: usize, flavor_id: Option<Uuid>) -> Result<(), ValidationError> {
        self.line_mut(index)?.flavor_id = flavor_id;
        Ok(())
    }

    pub fn set_reason(&mut self, index: usize, reason_id: Option<Uuid>) -> Result<(), ValidationError> {
        self.line_mut(index)?.reason_id = reason_id;
        Ok(())
    }

    /// `None` clears the field. Values below 1 become 1.
    pub fn set_quantity(&mut self, index: usize, quantity: Option<i64>) -> Result<(), ValidationError> {
        self.line_mut(index)?.quantity =
            quantity.map(|q| u32::try_from(q.max(1)).unwrap_or(u32::MAX));
        Ok(())
    }

    /// First unmet condition wins: name, date, pizza fields, future date,
    /// empty pizza list.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidSubmission, ValidationError> {
        let cashier_name = self.cashier_name.trim();
        if cashier_name.is_empty() {
            return Err(ValidationError::MissingCashierName);
        }
        let date = self.date.ok_or(ValidationError::MissingDate)?;
        if let Some(line) = self.lines.iter().position(|l| !l.is_complete()) {
            return Err(ValidationError::IncompleteLine { line });
        }
        if date > today {
            return Err(ValidationError::FutureDate);
        }

        let lines: Vec<ValidLine> = self
            .lines
            .iter()
            .filter_map(|l| {
                Some(ValidLine {
                    flavor_id: l.flavor_id?,
                    reason_id: l.reason_id?,
                    quantity: l.quantity?,
                })
            })
            .collect();
        if lines.is_empty() {
            return Err(ValidationError::NoLines);
        }

        Ok(ValidSubmission {
            cashier_name: cashier_name.to_string(),
            date,
            shift: self.shift,
            lines,
        })
    }
}

// ---------------------------------------------------------------------------
// Screen state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CashierScreen {
    pub draft: RecordDraft,
    pub flavors: Vec<Flavor>,
    pub reasons: Vec<CancellationReason>,
    pub recent: Pager<CancellationRecord>,
    pub detail: DetailPanel<CancelledPizza>,
    pub notice: Option<Notice>,
    pub saving: bool,
}

impl CashierScreen {
    pub fn new(calendar: &LocalCalendar) -> Self {
        Self {
            draft: RecordDraft::new(calendar),
            flavors: Vec::new(),
            reasons: Vec::new(),
            recent: Pager::new(RECENT_PAGE_SIZE),
            detail: DetailPanel::Collapsed,
            notice: None,
            saving: false,
        }
    }

    pub fn apply_catalogs(&mut self, catalogs: Catalogs) {
        self.flavors = catalogs.flavors;
        self.reasons = catalogs.reasons;
    }

    /// Validate the form and mark the screen busy. A validation failure is
    /// shown as a warning and nothing is sent.
    pub fn begin_submit(&mut self, today: NaiveDate) -> Option<ValidSubmission> {
        if self.saving {
            return None;
        }
        match self.draft.validate(today) {
            Ok(submission) => {
                self.saving = true;
                self.notice = None;
                Some(submission)
            }
            Err(e) => {
                self.notice = Some(Notice::warning(e.to_string()));
                None
            }
        }
    }

    /// Apply the outcome of [`submit_record`]. On success the form is reset
    /// and the caller should reload the first page of recent records.
    pub fn finish_submit(
        &mut self,
        outcome: &AppResult<CancellationRecord>,
        calendar: &LocalCalendar,
    ) -> Option<Page> {
        self.saving = false;
        match outcome {
            Ok(_) => {
                self.draft.reset(calendar);
                self.notice = Some(Notice::success(SAVED_MESSAGE));
                Some(self.recent.first_page())
            }
            Err(e) if e.is_validation() => {
                self.notice = Some(Notice::warning(e.user_message()));
                None
            }
            Err(_) => {
                self.notice = Some(Notice::error(SAVE_FAILED_MESSAGE));
                None
            }
        }
    }

    pub fn apply_recent(&mut self, page: Page, outcome: AppResult<Vec<CancellationRecord>>) {
        match outcome {
            Ok(rows) => self.recent.apply(page, rows),
            Err(e) => warn!(error = %e, "recent records could not be loaded"),
        }
    }

    pub fn toggle_detail(&mut self, record_id: Uuid) -> Toggle {
        self.detail.toggle(record_id)
    }

    pub fn apply_detail(&mut self, record_id: Uuid, outcome: AppResult<Vec<CancelledPizza>>) {
        match outcome {
            Ok(items) => {
                self.detail.resolve(record_id, items);
            }
            Err(e) => {
                warn!(%record_id, error = %e, "record detail could not be loaded");
                if self.detail.open_id() == Some(record_id) {
                    self.detail.collapse();
                    self.notice = Some(Notice::error(DETAIL_FAILED_MESSAGE));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Remote operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalogs {
    pub flavors: Vec<Flavor>,
    pub reasons: Vec<CancellationReason>,
}

/// Active flavors and reasons for the form selects.
pub async fn load_catalogs(remote: &dyn RemoteStore, ctx: &SessionContext) -> AppResult<Catalogs> {
    let (session, _) = ctx.require_role(Role::BranchCashier)?;
    let flavors = remote.list_active_flavors(session).await?;
    let reasons = remote.list_active_reasons(session).await?;
    Ok(Catalogs { flavors, reasons })
}

/// One page of the signed-in cashier's own records, newest date first.
pub async fn load_recent(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    page: Page,
) -> AppResult<Vec<CancellationRecord>> {
    let (session, _) = ctx.require_role(Role::BranchCashier)?;
    let query = RecordQuery {
        created_by: Some(session.user_id()),
        ..RecordQuery::page(page)
    };
    remote.list_records(session, &query).await
}

pub async fn load_detail(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    record_id: Uuid,
) -> AppResult<Vec<CancelledPizza>> {
    let session = ctx.require_session()?;
    remote.list_pizzas(session, record_id).await
}

/// One cancelled pizza per line.
fn total_cancelled(lines: usize) -> Result<u32, ValidationError> {
    u32::try_from(lines).map_err(|_| ValidationError::TooManyLines)
}

/// Store a validated submission: the header first, then every pizza pointing
/// at it. When the pizzas cannot be stored the header is deleted again.
pub async fn submit_record(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    submission: &ValidSubmission,
) -> AppResult<CancellationRecord> {
    let (session, profile) = ctx.require_role(Role::BranchCashier)?;
    let branch_id = profile
        .branch_id
        .ok_or_else(|| AppError::Forbidden("cashier profile has no branch".into()))?;
    if submission.lines.is_empty() {
        return Err(ValidationError::NoLines.into());
    }

    let header = NewCancellationRecord {
        branch_id,
        cashier_name: submission.cashier_name.clone(),
        date: submission.date,
        shift: submission.shift,
        total_cancelled: total_cancelled(submission.lines.len())?,
        created_by: session.user_id(),
    };
    let record = remote.insert_record(session, &header).await.map_err(|e| {
        error!(error = %e, "record header insert failed");
        e
    })?;

    let pizzas: Vec<NewCancelledPizza> = submission
        .lines
        .iter()
        .map(|l| NewCancelledPizza {
            record_id: record.id,
            flavor_id: l.flavor_id,
            reason_id: l.reason_id,
            quantity: l.quantity,
        })
        .collect();

    if let Err(insert_err) = remote.insert_pizzas(session, &pizzas).await {
        error!(record_id = %record.id, error = %insert_err, "pizza insert failed, removing header");
        return match remote.delete_record(session, record.id).await {
            Ok(()) => Err(insert_err),
            Err(delete_err) => {
                error!(record_id = %record.id, error = %delete_err, "header left without pizzas");
                Err(AppError::OrphanedRecord {
                    record_id: record.id,
                    cause: delete_err.to_string(),
                })
            }
        };
    }

    info!(
        record_id = %record.id,
        branch_id = %branch_id,
        pizzas = pizzas.len(),
        "cancellation record saved"
    );
    Ok(record)
}
