//! Unit economics per acquisition cohort: CAC, LTV over the attribution
//! horizon, and ROI. Only mature cohorts are reported.

use crate::aggregate::{as_f64, distinct_by, ratio_rows, roi, sum_by, Horizon};
use crate::pipeline::MetricInputs;
use cohort_core::period::Granularity;
use cohort_core::types::CohortKey;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitEconomicsRow {
    pub cohort: CohortKey,
    pub users: usize,
    pub revenue_sum: f64,
    pub cost_sum: f64,
    pub ltv: Option<f64>,
    pub cac: Option<f64>,
    pub roi: Option<f64>,
    pub roi_percent: Option<f64>,
}

/// CAC, LTV and ROI for every mature cohort of `granularity`, split by
/// first-touch channel when `by_channel` is set.
///
/// Spend is attributed by the calendar period and channel it was incurred
/// in, not by the individual users it acquired. Cohorts with spend but no
/// acquired users are reported with an undefined CAC and ROI.
pub fn unit_economics(
    inputs: &MetricInputs<'_>,
    granularity: Granularity,
    by_channel: bool,
) -> Vec<UnitEconomicsRow> {
    let rules = &inputs.rules;
    let maturity = inputs.maturity(granularity, by_channel);
    let horizon = Horizon::attribution(inputs.config.horizon_days);

    let users = distinct_by(
        inputs.profiles.iter(),
        |p| {
            let key = rules.cohort_key(p, granularity, by_channel);
            maturity.is_mature(&key).then_some(key)
        },
        |p| p.user_id,
    );

    let revenue = sum_by(
        &inputs.events.orders,
        |e| {
            if !horizon.contains(e.lifetime_days) {
                return None;
            }
            let key = rules.cohort_key(e.profile, granularity, by_channel);
            maturity.is_mature(&key).then_some(key)
        },
        |e| e.order.revenue,
    );

    let spend = sum_by(
        inputs.costs,
        |c| {
            let key = CohortKey::new(&c.channel, rules.period_of(granularity, c.dt), by_channel);
            maturity.is_mature(&key).then_some(key)
        },
        |c| c.costs,
    );

    let keys: BTreeSet<CohortKey> = users.keys().chain(spend.keys()).cloned().collect();
    let user_counts = as_f64(&users);
    let ltv = ratio_rows(keys.iter().cloned(), &revenue, &user_counts);
    let cac = ratio_rows(keys.iter().cloned(), &spend, &user_counts);

    let rows: Vec<UnitEconomicsRow> = ltv
        .into_iter()
        .zip(cac)
        .map(|(ltv, cac)| {
            let roi = roi(ltv.value, cac.value);
            UnitEconomicsRow {
                users: users.get(&ltv.key).copied().unwrap_or(0),
                revenue_sum: ltv.numerator,
                cost_sum: cac.numerator,
                ltv: ltv.value,
                cac: cac.value,
                roi,
                roi_percent: roi.map(|r| r * 100.0),
                cohort: ltv.key,
            }
        })
        .collect();

    debug!(
        granularity = ?granularity,
        by_channel,
        cohorts = rows.len(),
        "Unit economics computed"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, cost, date, order, session, with_inputs};
    use cohort_core::config::AnalysisConfig;
    use cohort_core::period::Period;
    use cohort_core::types::Tables;

    fn tables() -> Tables {
        Tables {
            sessions: vec![session(1, "chA", at(5, 1, 10))],
            orders: vec![order(1, at(5, 3, 9), 100.0), order(1, at(5, 29, 9), 40.0)],
            costs: vec![cost(date(5, 1), "chA", 50.0), cost(date(5, 1), "chB", 30.0)],
        }
    }

    #[test]
    fn test_single_user_month_cohort() {
        let config = AnalysisConfig::default();
        let rows = with_inputs(&tables(), &config, at(5, 30, 0), |inputs| {
            unit_economics(inputs, Granularity::Month, false)
        });

        assert_eq!(rows.len(), 1);
        let may = &rows[0];
        assert_eq!(may.cohort, CohortKey::overall(Period::month(date(5, 1))));
        assert_eq!(may.users, 1);
        // The day-28 order falls outside the 28-day horizon.
        assert_eq!(may.revenue_sum, 100.0);
        assert_eq!(may.cost_sum, 80.0);
        assert_eq!(may.ltv, Some(100.0));
        assert_eq!(may.cac, Some(80.0));
        assert!((may.roi.unwrap() - 0.25).abs() < 1e-12);
        assert!((may.roi_percent.unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_spend_without_users_has_undefined_roi() {
        let config = AnalysisConfig::default();
        let rows = with_inputs(&tables(), &config, at(6, 30, 0), |inputs| {
            unit_economics(inputs, Granularity::Week, true)
        });

        let week = Period::week(date(5, 1), config.week_start);
        let a = rows
            .iter()
            .find(|r| r.cohort == CohortKey::per_channel("chA", week))
            .unwrap();
        assert_eq!(a.cac, Some(50.0));
        assert_eq!(a.roi, Some(1.0));

        let b = rows
            .iter()
            .find(|r| r.cohort == CohortKey::per_channel("chB", week))
            .unwrap();
        assert_eq!(b.users, 0);
        assert_eq!(b.cost_sum, 30.0);
        assert_eq!(b.cac, None);
        assert_eq!(b.roi, None);
        assert_eq!(b.roi_percent, None);
    }

    #[test]
    fn test_immature_cohorts_are_excluded() {
        let config = AnalysisConfig::default();
        let rows = with_inputs(&tables(), &config, at(5, 20, 0), |inputs| {
            unit_economics(inputs, Granularity::Month, false)
        });
        assert!(rows.is_empty());
    }
}
