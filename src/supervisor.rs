//! Supervisor screen: filtered review of every branch's records, the detail
//! panel and the one-time "arrived at central" validation.
//!
//! Same split as the cashier screen: `SupervisorScreen` holds what is shown,
//! the free async functions talk to the backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::SessionContext;
use crate::error::{AppError, AppResult, ValidationError};
use crate::models::{Branch, CancellationRecord, CancelledPizza, Notice, Role};
use crate::reconciliation::{reported_quantity, Discrepancy, Totals};
use crate::remote::{Page, RecordQuery, RemoteStore};
use crate::view_state::{DetailPanel, Pager, Toggle};

pub const REVIEW_PAGE_SIZE: u32 = 5;

/// Rows per request when collecting every filtered record.
const FETCH_ALL_BATCH: u32 = 200;

const LOAD_FAILED_MESSAGE: &str = "Error loading records";
const DETAIL_FAILED_MESSAGE: &str = "Could not load the record detail";
const VALIDATION_SAVED_MESSAGE: &str = "Validation saved";
const VALIDATION_FAILED_MESSAGE: &str = "Error saving the validation";

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// `"all"` or a branch id on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BranchFilter {
    #[default]
    All,
    Branch(Uuid),
}

impl BranchFilter {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return Ok(BranchFilter::All);
        }
        Uuid::parse_str(raw)
            .map(BranchFilter::Branch)
            .map_err(|_| ValidationError::InvalidBranchFilter(raw.to_string()))
    }

    pub fn branch_id(&self) -> Option<Uuid> {
        match self {
            BranchFilter::All => None,
            BranchFilter::Branch(id) => Some(*id),
        }
    }
}

impl fmt::Display for BranchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchFilter::All => f.write_str("all"),
            BranchFilter::Branch(id) => write!(f, "{id}"),
        }
    }
}

impl TryFrom<String> for BranchFilter {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BranchFilter> for String {
    fn from(value: BranchFilter) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilters {
    pub branch: BranchFilter,
    pub date: Option<NaiveDate>,
}

impl RecordFilters {
    pub fn query(&self, page: Page) -> RecordQuery {
        RecordQuery {
            branch_id: self.branch.branch_id(),
            date: self.date,
            ..RecordQuery::page(page)
        }
    }
}

/// Parse the "arrived at central" input. Only whole numbers from zero up.
pub fn parse_arrived_count(raw: &str) -> Result<u32, ValidationError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidArrivedCount)
}

// ---------------------------------------------------------------------------
// Screen state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReviewRow {
    #[serde(flatten)]
    pub record: CancellationRecord,
    pub discrepancy: Discrepancy,
}

/// A validation that passed the local checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingValidation {
    pub record_id: Uuid,
    pub total_sent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupervisorScreen {
    pub branches: Vec<Branch>,
    /// What the filter inputs show. Only takes effect on apply.
    pub draft_filters: RecordFilters,
    pub applied_filters: RecordFilters,
    pub records: Pager<CancellationRecord>,
    pub totals: Totals,
    pub selected: Option<CancellationRecord>,
    pub detail: DetailPanel<CancelledPizza>,
    pub arrived_input: String,
    pub notice: Option<Notice>,
    pub loading: bool,
    pub saving_validation: bool,
}

impl Default for SupervisorScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorScreen {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            draft_filters: RecordFilters::default(),
            applied_filters: RecordFilters::default(),
            records: Pager::new(REVIEW_PAGE_SIZE),
            totals: Totals::default(),
            selected: None,
            detail: DetailPanel::Collapsed,
            arrived_input: String::new(),
            notice: None,
            loading: false,
            saving_validation: false,
        }
    }

    pub fn apply_branches(&mut self, outcome: AppResult<Vec<Branch>>) {
        match outcome {
            Ok(branches) => self.branches = branches,
            Err(e) => error!(error = %e, "branches could not be loaded"),
        }
    }

    pub fn set_branch_filter(&mut self, branch: BranchFilter) {
        self.draft_filters.branch = branch;
    }

    pub fn set_date_filter(&mut self, date: Option<NaiveDate>) {
        self.draft_filters.date = date;
    }

    /// Make the edited filters effective. Returns the page to load.
    pub fn apply_filters(&mut self) -> Page {
        self.applied_filters = self.draft_filters;
        self.records.first_page()
    }

    pub fn clear_filters(&mut self) -> Page {
        self.draft_filters = RecordFilters::default();
        self.apply_filters()
    }

    /// Start loading `page` with the applied filters. Any open detail closes.
    pub fn begin_load(&mut self, page: Page) -> RecordQuery {
        self.loading = true;
        self.close_detail();
        self.applied_filters.query(page)
    }

    pub fn apply_records(&mut self, page: Page, outcome: AppResult<Vec<CancellationRecord>>) {
        self.loading = false;
        match outcome {
            Ok(rows) => self.records.apply(page, rows),
            Err(e) => {
                error!(error = %e, "records could not be loaded");
                self.records.apply(page, Vec::new());
                self.notice = Some(Notice::error(LOAD_FAILED_MESSAGE));
            }
        }
        self.totals = Totals::of(&self.records.rows);
    }

    /// Loaded rows with their discrepancy.
    pub fn rows(&self) -> Vec<ReviewRow> {
        self.records
            .rows
            .iter()
            .map(|r| ReviewRow {
                record: r.clone(),
                discrepancy: Discrepancy::of(r),
            })
            .collect()
    }

    fn close_detail(&mut self) {
        self.selected = None;
        self.detail.collapse();
        self.arrived_input.clear();
        self.notice = None;
    }

    /// Open the detail of a loaded record, or close it when it is already
    /// open. Opening pre-fills the arrived input with the stored count.
    pub fn toggle_detail(&mut self, record_id: Uuid) -> Result<Toggle, ValidationError> {
        let record = self
            .records
            .rows
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or(ValidationError::NoRecordSelected)?;

        match self.detail.toggle(record_id) {
            Toggle::Collapsed => {
                self.close_detail();
                Ok(Toggle::Collapsed)
            }
            fetch => {
                self.arrived_input = record.total_sent.map(|n| n.to_string()).unwrap_or_default();
                self.selected = Some(record);
                self.notice = None;
                Ok(fetch)
            }
        }
    }

    pub fn apply_detail(&mut self, record_id: Uuid, outcome: AppResult<Vec<CancelledPizza>>) {
        match outcome {
            Ok(items) => {
                self.detail.resolve(record_id, items);
            }
            Err(e) => {
                error!(%record_id, error = %e, "record detail could not be loaded");
                // Keep the panel open with no pizzas, the record stays selected.
                self.detail.resolve(record_id, Vec::new());
                self.notice = Some(Notice::error(DETAIL_FAILED_MESSAGE));
            }
        }
    }

    /// Sum of pizza quantities in the open detail.
    pub fn reported_total(&self) -> u64 {
        reported_quantity(self.detail.items())
    }

    /// The arrived count can be entered while nothing (or zero) is stored.
    pub fn can_validate(&self) -> bool {
        self.selected.as_ref().is_some_and(|r| !r.is_validated())
    }

    /// Read-only text once a record is validated.
    pub fn validated_label(&self) -> Option<String> {
        self.selected
            .as_ref()
            .filter(|r| r.is_validated())
            .and_then(|r| r.total_sent)
            .map(|n| format!("validated: {n} arrived"))
    }

    pub fn set_arrived_input(&mut self, raw: impl Into<String>) {
        self.arrived_input = raw.into();
    }

    /// Local checks before the update is sent. Failures become a warning.
    pub fn begin_validation(&mut self) -> Option<PendingValidation> {
        if self.saving_validation {
            return None;
        }
        match self.check_validation() {
            Ok(pending) => {
                self.saving_validation = true;
                self.notice = None;
                Some(pending)
            }
            Err(e) => {
                self.notice = Some(Notice::warning(e.to_string()));
                None
            }
        }
    }

    fn check_validation(&self) -> Result<PendingValidation, ValidationError> {
        let record = self
            .selected
            .as_ref()
            .ok_or(ValidationError::NoRecordSelected)?;
        if record.is_validated() {
            return Err(ValidationError::AlreadyValidated);
        }
        let total_sent = parse_arrived_count(&self.arrived_input)?;
        Ok(PendingValidation {
            record_id: record.id,
            total_sent,
        })
    }

    pub fn finish_validation(&mut self, record_id: Uuid, outcome: &AppResult<CancellationRecord>) {
        self.saving_validation = false;
        match outcome {
            Ok(updated) => {
                for row in self.records.rows.iter_mut().filter(|r| r.id == record_id) {
                    row.total_sent = updated.total_sent;
                }
                if let Some(selected) = self.selected.as_mut().filter(|r| r.id == record_id) {
                    selected.total_sent = updated.total_sent;
                }
                self.totals = Totals::of(&self.records.rows);
                self.notice = Some(Notice::success(VALIDATION_SAVED_MESSAGE));
            }
            Err(e) if e.is_validation() || matches!(e, AppError::NoRowsAffected) => {
                self.notice = Some(Notice::warning(e.user_message()));
            }
            Err(_) => {
                self.notice = Some(Notice::error(VALIDATION_FAILED_MESSAGE));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Remote operations
// ---------------------------------------------------------------------------

/// All branches for the filter select, by name.
pub async fn load_branches(remote: &dyn RemoteStore, ctx: &SessionContext) -> AppResult<Vec<Branch>> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    remote.list_branches(session).await
}

pub async fn load_records(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    query: &RecordQuery,
) -> AppResult<Vec<CancellationRecord>> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    remote.list_records(session, query).await
}

pub async fn load_detail(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    record_id: Uuid,
) -> AppResult<Vec<CancelledPizza>> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    remote.list_pizzas(session, record_id).await
}

/// Store the arrived count. Only matches a record that is not validated yet,
/// so an empty result means either a policy denial or a record validated
/// elsewhere in the meantime.
pub async fn save_validation(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    pending: PendingValidation,
) -> AppResult<CancellationRecord> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    let rows = remote
        .set_total_sent(session, pending.record_id, pending.total_sent)
        .await
        .map_err(|e| {
            error!(record_id = %pending.record_id, error = %e, "validation update failed");
            e
        })?;

    match rows.into_iter().next() {
        Some(updated) => {
            info!(
                record_id = %updated.id,
                total_sent = pending.total_sent,
                "record validated"
            );
            Ok(updated)
        }
        None => {
            warn!(record_id = %pending.record_id, "validation update matched no row");
            Err(AppError::NoRowsAffected)
        }
    }
}

/// Every record matching `filters`, newest first, fetched batch by batch.
pub async fn fetch_all_filtered(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    filters: &RecordFilters,
) -> AppResult<Vec<CancellationRecord>> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    let mut page = Page::first(FETCH_ALL_BATCH);
    let mut all = Vec::new();
    loop {
        let batch = remote.list_records(session, &filters.query(page)).await?;
        let done = (batch.len() as u32) < page.size;
        all.extend(batch);
        if done {
            return Ok(all);
        }
        page = page.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoticeTone;
    use crate::test_support::{
        cashier_profile, date, record, signed_in, supervisor_profile, FakeRemote,
    };

    struct Fixture {
        remote: FakeRemote,
        ctx: SessionContext,
        norte: Branch,
        sur: Branch,
    }

    fn fixture() -> Fixture {
        let remote = FakeRemote::new();
        let norte = remote.add_branch("Norte");
        let sur = remote.add_branch("Sur");
        Fixture {
            remote,
            ctx: signed_in(&supervisor_profile()),
            norte,
            sur,
        }
    }

    async fn load(f: &Fixture, screen: &mut SupervisorScreen, page: Page) {
        let query = screen.begin_load(page);
        let outcome = load_records(&f.remote, &f.ctx, &query).await;
        screen.apply_records(page, outcome);
    }

    #[test]
    fn branch_filter_parses_all_and_ids() {
        let id = Uuid::new_v4();
        assert_eq!(BranchFilter::parse("all"), Ok(BranchFilter::All));
        assert_eq!(BranchFilter::parse(""), Ok(BranchFilter::All));
        assert_eq!(BranchFilter::parse(&id.to_string()), Ok(BranchFilter::Branch(id)));
        assert!(BranchFilter::parse("centro").is_err());

        let json = serde_json::to_value(BranchFilter::Branch(id)).unwrap();
        assert_eq!(json, serde_json::json!(id.to_string()));
        let back: BranchFilter = serde_json::from_value(serde_json::json!("all")).unwrap();
        assert_eq!(back, BranchFilter::All);
    }

    #[test]
    fn arrived_count_must_be_a_non_negative_integer() {
        assert_eq!(parse_arrived_count(" 7 "), Ok(7));
        assert_eq!(parse_arrived_count("0"), Ok(0));
        assert_eq!(parse_arrived_count("-1"), Err(ValidationError::InvalidArrivedCount));
        assert_eq!(parse_arrived_count("siete"), Err(ValidationError::InvalidArrivedCount));
        assert_eq!(parse_arrived_count(""), Err(ValidationError::InvalidArrivedCount));
    }

    #[tokio::test]
    async fn filters_take_effect_only_on_apply() {
        let f = fixture();
        f.remote.add_record(record(&f.norte, date(2026, 10, 1), 3, None));
        f.remote.add_record(record(&f.sur, date(2026, 10, 2), 4, Some(4)));
        let mut screen = SupervisorScreen::new();

        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        assert_eq!(screen.records.rows.len(), 2);

        screen.set_branch_filter(BranchFilter::Branch(f.norte.id));
        let page = screen.records.first_page();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.records.rows.len(), 2, "unapplied filter ignored");

        let page = screen.apply_filters();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.records.rows.len(), 1);
        assert_eq!(screen.totals.cancelled, 3);

        let page = screen.clear_filters();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.records.rows.len(), 2);
        assert_eq!(screen.draft_filters, RecordFilters::default());

        screen.set_date_filter(Some(date(2026, 10, 2)));
        let page = screen.records.first_page();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.records.rows.len(), 2, "unapplied date ignored");

        let page = screen.apply_filters();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.applied_filters.date, Some(date(2026, 10, 2)));
        assert_eq!(screen.records.rows.len(), 1);
        assert_eq!(screen.records.rows[0].branch_id, f.sur.id);
        assert_eq!(screen.totals.cancelled, 4);

        // Branch and date combine.
        screen.set_branch_filter(BranchFilter::Branch(f.norte.id));
        let page = screen.apply_filters();
        load(&f, &mut screen, page).await;
        assert!(screen.records.rows.is_empty());

        let page = screen.clear_filters();
        load(&f, &mut screen, page).await;
        assert_eq!(screen.records.rows.len(), 2);
        assert_eq!(screen.applied_filters, RecordFilters::default());
    }

    #[tokio::test]
    async fn pages_hold_at_most_five_and_totals_follow_the_page() {
        let f = fixture();
        for day in 1..=6 {
            f.remote
                .add_record(record(&f.norte, date(2026, 10, day), 2, Some(1)));
        }
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        assert_eq!(screen.records.rows.len(), 5);
        assert!(screen.records.has_next());
        assert_eq!(
            screen.totals,
            Totals {
                records: 5,
                cancelled: 10,
                sent: 5
            }
        );

        let next = screen.records.next_page().unwrap();
        load(&f, &mut screen, next).await;
        assert_eq!(screen.records.rows.len(), 1);
        assert!(!screen.records.has_next());
        assert_eq!(screen.totals.records, 1);
    }

    #[tokio::test]
    async fn load_failure_shows_empty_list() {
        let f = fixture();
        f.remote.add_record(record(&f.norte, date(2026, 10, 1), 3, None));
        f.remote.state().fail_reads = true;
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        assert!(screen.records.rows.is_empty());
        assert_eq!(screen.notice.as_ref().unwrap().tone, NoticeTone::Error);
    }

    #[tokio::test]
    async fn detail_toggle_prefills_and_clears_input() {
        let f = fixture();
        let id = f
            .remote
            .add_record(record(&f.norte, date(2026, 10, 1), 3, Some(2)));
        f.remote.add_pizza(id, "Muzzarella", "Demora", 2);
        f.remote.add_pizza(id, "Napolitana", "Error de pedido", 3);
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;

        assert_eq!(screen.toggle_detail(id), Ok(Toggle::Fetch(id)));
        assert_eq!(screen.arrived_input, "2");
        screen.apply_detail(id, load_detail(&f.remote, &f.ctx, id).await);
        assert_eq!(screen.reported_total(), 5);
        assert_eq!(screen.validated_label().as_deref(), Some("validated: 2 arrived"));
        assert!(!screen.can_validate());

        screen.notice = Some(Notice::success("x"));
        assert_eq!(screen.toggle_detail(id), Ok(Toggle::Collapsed));
        assert!(screen.selected.is_none());
        assert!(screen.arrived_input.is_empty());
        assert!(screen.notice.is_none());
        assert_eq!(screen.reported_total(), 0);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_update() {
        let f = fixture();
        let id = f.remote.add_record(record(&f.norte, date(2026, 10, 1), 3, None));
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        screen.toggle_detail(id).unwrap();

        for bad in ["-2", "tres", ""] {
            screen.set_arrived_input(bad);
            assert!(screen.begin_validation().is_none());
            assert_eq!(screen.notice.as_ref().unwrap().tone, NoticeTone::Warning);
        }
        assert_eq!(f.remote.call_count("set_total_sent"), 0);
    }

    #[tokio::test]
    async fn saved_validation_updates_row_and_selection() {
        let f = fixture();
        let id = f.remote.add_record(record(&f.norte, date(2026, 10, 1), 10, None));
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        screen.toggle_detail(id).unwrap();
        assert!(screen.can_validate());

        screen.set_arrived_input("7");
        let pending = screen.begin_validation().unwrap();
        let outcome = save_validation(&f.remote, &f.ctx, pending).await;
        screen.finish_validation(id, &outcome);

        assert_eq!(screen.notice, Some(Notice::success("Validation saved")));
        assert_eq!(screen.records.rows[0].total_sent, Some(7));
        assert_eq!(screen.selected.as_ref().unwrap().total_sent, Some(7));
        assert_eq!(screen.totals.sent, 7);
        assert_eq!(screen.rows()[0].discrepancy.to_string(), "missing 3");
        assert!(!screen.can_validate());
        assert_eq!(
            screen.begin_validation(),
            None,
            "second validation is refused locally"
        );
    }

    #[tokio::test]
    async fn zero_sent_can_still_be_validated() {
        let f = fixture();
        let id = f.remote.add_record(record(&f.norte, date(2026, 10, 1), 2, Some(0)));
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        screen.toggle_detail(id).unwrap();
        screen.set_arrived_input("2");
        let pending = screen.begin_validation().unwrap();
        assert!(save_validation(&f.remote, &f.ctx, pending).await.is_ok());
    }

    #[tokio::test]
    async fn empty_update_result_is_advisory() {
        let f = fixture();
        let id = f.remote.add_record(record(&f.norte, date(2026, 10, 1), 4, None));
        f.remote.state().deny_updates = true;
        let mut screen = SupervisorScreen::new();
        load(&f, &mut screen, Page::first(REVIEW_PAGE_SIZE)).await;
        screen.toggle_detail(id).unwrap();
        screen.set_arrived_input("4");

        let pending = screen.begin_validation().unwrap();
        let outcome = save_validation(&f.remote, &f.ctx, pending).await;
        assert!(matches!(outcome, Err(AppError::NoRowsAffected)));
        screen.finish_validation(id, &outcome);

        let notice = screen.notice.clone().unwrap();
        assert_eq!(notice.tone, NoticeTone::Warning);
        assert!(notice.text.contains("access policies"));
        assert_eq!(screen.records.rows[0].total_sent, None);
    }

    #[tokio::test]
    async fn already_validated_row_is_not_overwritten_remotely() {
        let f = fixture();
        let id = f.remote.add_record(record(&f.norte, date(2026, 10, 1), 4, Some(3)));
        let pending = PendingValidation {
            record_id: id,
            total_sent: 9,
        };
        let outcome = save_validation(&f.remote, &f.ctx, pending).await;
        assert!(matches!(outcome, Err(AppError::NoRowsAffected)));
        assert_eq!(f.remote.state().records[0].total_sent, Some(3));
    }

    #[tokio::test]
    async fn cashiers_cannot_review() {
        let f = fixture();
        let ctx = signed_in(&cashier_profile(f.norte.id, "Norte"));
        assert!(matches!(
            load_branches(&f.remote, &ctx).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn branches_are_listed_by_name() {
        let f = fixture();
        f.remote.add_branch("Centro");
        let mut screen = SupervisorScreen::new();
        screen.apply_branches(load_branches(&f.remote, &f.ctx).await);
        let names: Vec<&str> = screen.branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Centro", "Norte", "Sur"]);
    }

    #[tokio::test]
    async fn fetch_all_filtered_walks_every_batch() {
        let f = fixture();
        for i in 0..(FETCH_ALL_BATCH + 3) {
            let day = 1 + i % 28;
            f.remote.add_record(record(&f.norte, date(2026, 9, day), 1, None));
        }
        f.remote.add_record(record(&f.sur, date(2026, 9, 1), 1, None));

        let filters = RecordFilters {
            branch: BranchFilter::Branch(f.norte.id),
            date: None,
        };
        let all = fetch_all_filtered(&f.remote, &f.ctx, &filters).await.unwrap();
        assert_eq!(all.len() as u32, FETCH_ALL_BATCH + 3);
        assert_eq!(f.remote.call_count("list_records"), 2);
    }
}
