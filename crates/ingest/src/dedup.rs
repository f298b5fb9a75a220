//! Exact full-row duplicate removal.

use chrono::{NaiveDate, NaiveDateTime};
use cohort_core::types::{CostRecord, Order, Session, UserId};
use std::collections::HashSet;
use std::hash::Hash;

/// A hashable view of every field of a row.
pub trait RowIdentity {
    type Key<'a>: Hash + Eq
    where
        Self: 'a;

    fn row_key(&self) -> Self::Key<'_>;
}

/// Float bits with `-0.0` folded onto `0.0`.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

impl RowIdentity for Session {
    type Key<'a> = (UserId, &'a str, &'a str, &'a str, NaiveDateTime, NaiveDateTime);

    fn row_key(&self) -> Self::Key<'_> {
        (
            self.user_id,
            &self.region,
            &self.device,
            &self.channel,
            self.session_start,
            self.session_end,
        )
    }
}

impl RowIdentity for Order {
    type Key<'a> = (UserId, NaiveDateTime, u64);

    fn row_key(&self) -> Self::Key<'_> {
        (self.user_id, self.event_dt, float_key(self.revenue))
    }
}

impl RowIdentity for CostRecord {
    type Key<'a> = (NaiveDate, &'a str, u64);

    fn row_key(&self) -> Self::Key<'_> {
        (self.dt, &self.channel, float_key(self.costs))
    }
}

/// Drop rows identical to an earlier row. Keeps first occurrences in input
/// order and returns how many rows were removed.
pub fn dedup_rows<T: RowIdentity>(rows: Vec<T>) -> (Vec<T>, usize) {
    let mut keep = Vec::with_capacity(rows.len());
    {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            keep.push(seen.insert(row.row_key()));
        }
    }

    let before = rows.len();
    let kept: Vec<T> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, first)| first.then_some(row))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(user_id: UserId, day: u32, revenue: f64) -> Order {
        Order {
            user_id,
            event_dt: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            revenue,
        }
    }

    #[test]
    fn test_removes_exact_duplicates_only() {
        let rows = vec![
            order(1, 1, 4.99),
            order(1, 1, 4.99),
            order(1, 1, 5.99),
            order(2, 1, 4.99),
        ];
        let (kept, removed) = dedup_rows(rows);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_preserves_first_occurrence_order() {
        let rows = vec![
            order(3, 2, 1.0),
            order(1, 1, 1.0),
            order(3, 2, 1.0),
            order(2, 1, 1.0),
        ];
        let (kept, _) = dedup_rows(rows);
        let ids: Vec<UserId> = kept.iter().map(|o| o.user_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let (kept, removed) = dedup_rows(vec![order(1, 1, 0.0), order(1, 1, -0.0)]);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_cost_rows_differ_by_channel() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let rows = vec![
            CostRecord { dt, channel: "a".into(), costs: 10.0 },
            CostRecord { dt, channel: "b".into(), costs: 10.0 },
        ];
        let (_, removed) = dedup_rows(rows);
        assert_eq!(removed, 0);
    }
}
