//! Rolling retention: the share of a cohort's day-0 users who come back
//! inside a later lifetime window (days 14 through 28 by default).

use crate::aggregate::{as_f64, distinct_by, ratio_rows, Horizon};
use crate::pipeline::MetricInputs;
use cohort_core::period::Granularity;
use cohort_core::types::CohortKey;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetentionRow {
    pub cohort: CohortKey,
    pub day0_users: usize,
    pub retained_users: usize,
    pub retention: Option<f64>,
}

/// Retention over `[retention_from_day, retention_to_day]` for every mature
/// cohort that has day-0 activity.
pub fn retention(inputs: &MetricInputs<'_>, granularity: Granularity, by_channel: bool) -> Vec<RetentionRow> {
    let rules = &inputs.rules;
    let maturity = inputs.maturity(granularity, by_channel);
    let window = Horizon::between(inputs.config.retention_from_day, inputs.config.retention_to_day);
    let sessions = &inputs.events.sessions;

    let day0_window = Horizon::day(0);
    let day0 = distinct_by(
        sessions,
        |e| {
            day0_window
                .contains(e.lifetime_days)
                .then(|| rules.cohort_key(e.profile, granularity, by_channel))
        },
        |e| e.session.user_id,
    );
    let retained = distinct_by(
        sessions,
        |e| {
            window
                .contains(e.lifetime_days)
                .then(|| rules.cohort_key(e.profile, granularity, by_channel))
        },
        |e| e.session.user_id,
    );

    let keys: Vec<CohortKey> = day0
        .keys()
        .filter(|key| maturity.is_mature(key))
        .cloned()
        .collect();

    ratio_rows(keys, &as_f64(&retained), &as_f64(&day0))
        .into_iter()
        .map(|row| RetentionRow {
            day0_users: day0.get(&row.key).copied().unwrap_or(0),
            retained_users: retained.get(&row.key).copied().unwrap_or(0),
            retention: row.value,
            cohort: row.key,
        })
        .collect()
}
