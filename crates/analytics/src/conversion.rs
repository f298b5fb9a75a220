//! Purchase conversion: the share of a cohort's new users who buy within
//! the attribution horizon.

use crate::aggregate::{as_f64, distinct_by, ratio_rows, Horizon};
use crate::pipeline::MetricInputs;
use cohort_core::period::Granularity;
use cohort_core::types::CohortKey;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRow {
    pub cohort: CohortKey,
    pub new_users: usize,
    pub buyers: usize,
    pub conversion: Option<f64>,
}

pub fn conversion(inputs: &MetricInputs<'_>, granularity: Granularity, by_channel: bool) -> Vec<ConversionRow> {
    let rules = &inputs.rules;
    let maturity = inputs.maturity(granularity, by_channel);
    let horizon = Horizon::attribution(inputs.config.horizon_days);

    let new_users = distinct_by(
        inputs.profiles.iter(),
        |p| {
            let key = rules.cohort_key(p, granularity, by_channel);
            maturity.is_mature(&key).then_some(key)
        },
        |p| p.user_id,
    );
    let buyers = distinct_by(
        &inputs.events.orders,
        |e| {
            horizon
                .contains(e.lifetime_days)
                .then(|| rules.cohort_key(e.profile, granularity, by_channel))
        },
        |e| e.order.user_id,
    );

    ratio_rows(new_users.keys().cloned(), &as_f64(&buyers), &as_f64(&new_users))
        .into_iter()
        .map(|row| ConversionRow {
            new_users: new_users.get(&row.key).copied().unwrap_or(0),
            buyers: buyers.get(&row.key).copied().unwrap_or(0),
            conversion: row.value,
            cohort: row.key,
        })
        .collect()
}
