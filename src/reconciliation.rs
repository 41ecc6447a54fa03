//! Cancelled versus sent-to-central comparison.
//!
//! Nothing here is stored; every value is derived from the rows on screen.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::models::{CancellationRecord, CancelledPizza};

/// Outcome of comparing a record's cancelled count with what arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discrepancy {
    /// Nothing entered yet.
    Pending,
    Balanced,
    Missing(u32),
    Surplus(u32),
}

/// Colour class for the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Pending,
    Ok,
    Missing,
    Surplus,
}

impl Discrepancy {
    pub fn between(cancelled: u32, sent: Option<u32>) -> Self {
        match sent {
            None => Discrepancy::Pending,
            Some(sent) if sent == cancelled => Discrepancy::Balanced,
            Some(sent) if sent < cancelled => Discrepancy::Missing(cancelled - sent),
            Some(sent) => Discrepancy::Surplus(sent - cancelled),
        }
    }

    pub fn of(record: &CancellationRecord) -> Self {
        Self::between(record.total_cancelled, record.total_sent)
    }

    pub fn tone(&self) -> Tone {
        match self {
            Discrepancy::Pending => Tone::Pending,
            Discrepancy::Balanced => Tone::Ok,
            Discrepancy::Missing(_) => Tone::Missing,
            Discrepancy::Surplus(_) => Tone::Surplus,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::Pending => f.write_str("pending"),
            Discrepancy::Balanced => f.write_str("no discrepancy"),
            Discrepancy::Missing(n) => write!(f, "missing {n}"),
            Discrepancy::Surplus(n) => write!(f, "surplus {n}"),
        }
    }
}

/// Serialized as `{ "label": "missing 3", "tone": "missing" }`.
impl Serialize for Discrepancy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Discrepancy", 2)?;
        s.serialize_field("label", &self.to_string())?;
        s.serialize_field("tone", &self.tone())?;
        s.end()
    }
}

/// Aggregates over the rows currently loaded. Null sent counts as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub records: usize,
    pub cancelled: u64,
    pub sent: u64,
}

impl Totals {
    pub fn of(records: &[CancellationRecord]) -> Self {
        records.iter().fold(Totals::default(), |acc, r| Totals {
            records: acc.records + 1,
            cancelled: acc.cancelled + u64::from(r.total_cancelled),
            sent: acc.sent + u64::from(r.total_sent.unwrap_or(0)),
        })
    }
}

/// Sum of line-item quantities, the "total pizzas reported" of a record.
pub fn reported_quantity(pizzas: &[CancelledPizza]) -> u64 {
    pizzas.iter().map(|p| u64::from(p.quantity)).sum()
}
