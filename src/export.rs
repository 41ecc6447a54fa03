//! Spreadsheet exports of the supervisor's filtered record set.
//!
//! Two layouts: a summary with one row per record and a detailed sheet with
//! one row per pizza. Both cover every record matching the applied filters,
//! not only the page on screen.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::auth::SessionContext;
use crate::error::AppResult;
use crate::models::{display_date, CancellationRecord, CancelledPizza, Role};
use crate::reconciliation::Discrepancy;
use crate::remote::RemoteStore;
use crate::supervisor::{fetch_all_filtered, RecordFilters};
use crate::xlsx::{self, Cell, Sheet};

pub const SUMMARY_HEADER: [&str; 7] = [
    "Fecha",
    "Turno",
    "Sucursal",
    "Cajero",
    "Total canceladas",
    "Enviadas a central",
    "Discrepancia",
];

pub const DETAIL_HEADER: [&str; 7] = [
    "Fecha", "Turno", "Sucursal", "Cajero", "Sabor", "Motivo", "Cantidad",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Summary,
    Detailed,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Summary => "summary",
            ExportKind::Detailed => "detailed",
        }
    }

    pub fn file_name(self, on: NaiveDate) -> String {
        let stem = match self {
            ExportKind::Summary => "cancelaciones_resumen",
            ExportKind::Detailed => "cancelaciones_detalle",
        };
        format!("{stem}_{}.xlsx", on.format("%Y-%m-%d"))
    }

    fn sheet_name(self) -> &'static str {
        match self {
            ExportKind::Summary => "Resumen",
            ExportKind::Detailed => "Detalle",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub kind: ExportKind,
    pub path: PathBuf,
    /// Data rows, header excluded.
    pub rows: usize,
}

// ---------------------------------------------------------------------------
// Sheet assembly
// ---------------------------------------------------------------------------

fn header_cells(record: &CancellationRecord) -> Vec<Cell> {
    vec![
        display_date(record.date).into(),
        record.shift_label().into(),
        record.branch_name().into(),
        record.cashier_name.clone().into(),
    ]
}

pub fn summary_sheet(records: &[CancellationRecord]) -> Sheet {
    let mut sheet = Sheet::new(ExportKind::Summary.sheet_name(), &SUMMARY_HEADER);
    for record in records {
        let mut row = header_cells(record);
        row.push(record.total_cancelled.into());
        row.push(record.total_sent.into());
        row.push(Discrepancy::of(record).to_string().into());
        sheet.push(row);
    }
    sheet
}

/// One row per pizza. Record fields are written on the first pizza only; a
/// record without pizzas still gets one row with its fields.
pub fn detailed_sheet(records: &[(CancellationRecord, Vec<CancelledPizza>)]) -> Sheet {
    let mut sheet = Sheet::new(ExportKind::Detailed.sheet_name(), &DETAIL_HEADER);
    for (record, pizzas) in records {
        if pizzas.is_empty() {
            let mut row = header_cells(record);
            row.extend([Cell::Empty, Cell::Empty, Cell::Empty]);
            sheet.push(row);
            continue;
        }
        for (i, pizza) in pizzas.iter().enumerate() {
            let mut row = if i == 0 {
                header_cells(record)
            } else {
                vec![Cell::Empty; 4]
            };
            row.push(pizza.flavor_label().into());
            row.push(pizza.reason_label().into());
            row.push(pizza.quantity.into());
            sheet.push(row);
        }
    }
    sheet
}

/// Pizzas of every record, fetched one record after the other.
pub async fn collect_details(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    records: Vec<CancellationRecord>,
) -> AppResult<Vec<(CancellationRecord, Vec<CancelledPizza>)>> {
    let (session, _) = ctx.require_role(Role::Supervisor)?;
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let pizzas = remote.list_pizzas(session, record.id).await?;
        out.push((record, pizzas));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

fn write(kind: ExportKind, sheet: &Sheet, dir: &Path, today: NaiveDate) -> AppResult<ExportOutcome> {
    let path = dir.join(kind.file_name(today));
    xlsx::write_file(&path, sheet)?;
    info!(kind = kind.as_str(), rows = sheet.rows.len(), path = %path.display(), "export written");
    Ok(ExportOutcome {
        kind,
        path,
        rows: sheet.rows.len(),
    })
}

pub async fn export_summary(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    filters: &RecordFilters,
    dir: &Path,
    today: NaiveDate,
) -> AppResult<ExportOutcome> {
    let records = fetch_all_filtered(remote, ctx, filters).await?;
    write(ExportKind::Summary, &summary_sheet(&records), dir, today)
}

pub async fn export_detailed(
    remote: &dyn RemoteStore,
    ctx: &SessionContext,
    filters: &RecordFilters,
    dir: &Path,
    today: NaiveDate,
) -> AppResult<ExportOutcome> {
    let records = fetch_all_filtered(remote, ctx, filters).await?;
    let details = collect_details(remote, ctx, records).await?;
    write(ExportKind::Detailed, &detailed_sheet(&details), dir, today)
}
