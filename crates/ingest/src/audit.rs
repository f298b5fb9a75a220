//! Data-quality audit of each loaded table.

use chrono::NaiveDateTime;
use cohort_core::types::{CostRecord, Order, Session};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct TableAudit {
    pub table: &'static str,
    pub rows_read: usize,
    pub duplicates_removed: usize,
    pub rows_kept: usize,
    /// Distinct values of each categorical column, sorted.
    pub categories: BTreeMap<&'static str, Vec<String>>,
    pub first_ts: Option<NaiveDateTime>,
    pub last_ts: Option<NaiveDateTime>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn span(values: impl Iterator<Item = NaiveDateTime>) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    values.fold((None, None), |(lo, hi), ts| {
        (
            Some(lo.map_or(ts, |l: NaiveDateTime| l.min(ts))),
            Some(hi.map_or(ts, |h: NaiveDateTime| h.max(ts))),
        )
    })
}

impl TableAudit {
    pub fn of_sessions(rows: &[Session], rows_read: usize, duplicates_removed: usize) -> Self {
        let mut categories = BTreeMap::new();
        categories.insert("region", distinct(rows.iter().map(|s| s.region.as_str())));
        categories.insert("device", distinct(rows.iter().map(|s| s.device.as_str())));
        categories.insert("channel", distinct(rows.iter().map(|s| s.channel.as_str())));
        let (first_ts, last_ts) = span(rows.iter().map(|s| s.session_start));
        Self {
            table: "visits",
            rows_read,
            duplicates_removed,
            rows_kept: rows.len(),
            categories,
            first_ts,
            last_ts,
        }
    }

    pub fn of_orders(rows: &[Order], rows_read: usize, duplicates_removed: usize) -> Self {
        let (first_ts, last_ts) = span(rows.iter().map(|o| o.event_dt));
        Self {
            table: "orders",
            rows_read,
            duplicates_removed,
            rows_kept: rows.len(),
            categories: BTreeMap::new(),
            first_ts,
            last_ts,
        }
    }

    pub fn of_costs(rows: &[CostRecord], rows_read: usize, duplicates_removed: usize) -> Self {
        let mut categories = BTreeMap::new();
        categories.insert("channel", distinct(rows.iter().map(|c| c.channel.as_str())));
        let (first_ts, last_ts) = span(rows.iter().map(|c| c.dt.and_time(chrono::NaiveTime::MIN)));
        Self {
            table: "costs",
            rows_read,
            duplicates_removed,
            rows_kept: rows.len(),
            categories,
            first_ts,
            last_ts,
        }
    }
}
