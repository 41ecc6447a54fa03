//! Single-sheet `.xlsx` output on top of `rust_xlsxwriter`.
//!
//! Exports build a [`Sheet`] first so the row layout can be tested without
//! touching the file system; [`write_file`] renders it with a bold header.

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sheet_title(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn position(row: usize, col: usize) -> AppResult<(RowNum, ColNum)> {
    let r = RowNum::try_from(row).map_err(|_| AppError::Storage(format!("row {row} out of range")))?;
    let c = ColNum::try_from(col).map_err(|_| AppError::Storage(format!("column {col} out of range")))?;
    Ok((r, c))
}

fn write_cell(ws: &mut Worksheet, row: usize, col: usize, cell: &Cell) -> AppResult<()> {
    let (r, c) = position(row, col)?;
    match cell {
        Cell::Text(text) => {
            ws.write_string(r, c, text)?;
        }
        Cell::Number(n) if n.is_finite() => {
            ws.write_number(r, c, *n)?;
        }
        Cell::Number(_) | Cell::Empty => {}
    }
    Ok(())
}

/// Render `sheet` into a workbook held in memory.
pub fn build_workbook(sheet: &Sheet) -> AppResult<Workbook> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let ws = workbook.add_worksheet();
    ws.set_name(sheet_title(&sheet.name))?;

    for (col, title) in sheet.header.iter().enumerate() {
        let (r, c) = position(0, col)?;
        ws.write_string_with_format(r, c, title, &bold)?;
    }
    for (i, row) in sheet.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            write_cell(ws, i + 1, col, cell)?;
        }
    }
    ws.autofit();

    Ok(workbook)
}

pub fn write_file(path: &Path, sheet: &Sheet) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut workbook = build_workbook(sheet)?;
    workbook.save(path)?;
    Ok(())
}
