//! Payback curves by weeks since acquisition, detection of channels that
//! have not paid back, and ROI heatmaps for them.
//!
//! Week indices are 1-based: the acquisition week is `N_week = 1`, so
//! `N_week = 5` is the first week after four full elapsed weeks. Orders
//! placed before the acquisition week land on `N_week <= 0` and open the
//! cumulative curve.

use crate::aggregate::{distinct_by, mean_by, ratio, roi, sum_by};
use crate::cohort::n_week;
use crate::pipeline::MetricInputs;
use cohort_core::period::{Granularity, Period};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaybackRow {
    pub channel: String,
    pub cohort_week: Period,
    pub n_week: i64,
    pub week_revenue: f64,
    pub cum_revenue: f64,
    pub cohort_users: usize,
    pub cohort_costs: f64,
    pub ltv: Option<f64>,
    pub cac: Option<f64>,
    pub roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadChannel {
    pub channel: String,
    pub n_week: i64,
    pub mean_roi: f64,
    pub cohorts: usize,
}

/// Mean ROI per cohort week (rows) and `N_week` (columns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiHeatmap {
    pub channels: Vec<String>,
    pub weeks: Vec<i64>,
    pub rows: Vec<(Period, Vec<Option<f64>>)>,
}

/// Cumulative LTV, CAC and ROI per (channel, cohort week, N_week) for every
/// week that had revenue, up to `payback_max_week`. There is no lower
/// bound, so a cohort's final `cum_revenue` matches its attributed revenue.
/// Cohort sizes and spend cover every cohort, mature or not.
pub fn payback_curves(inputs: &MetricInputs<'_>) -> Vec<PaybackRow> {
    let rules = &inputs.rules;
    let max_week = inputs.config.payback_max_week;
    let cohort_users = distinct_by(
        inputs.profiles.iter(),
        |p| Some((p.first_channel.clone(), rules.cohort_period(p, Granularity::Week))),
        |p| p.user_id,
    );
    let cohort_costs = sum_by(
        inputs.costs,
        |c| Some((c.channel.clone(), rules.period_of(Granularity::Week, c.dt))),
        |c| c.costs,
    );
    let week_revenue = sum_by(
        &inputs.events.orders,
        |e| {
            let cohort = rules.cohort_period(e.profile, Granularity::Week);
            let order_week = rules.period_of(Granularity::Week, e.order.event_dt.date());
            let n = n_week(cohort.start(), order_week.start());
            (n <= max_week).then(|| (e.profile.first_channel.clone(), cohort, n))
        },
        |e| e.order.revenue,
    );

    let mut rows = Vec::with_capacity(week_revenue.len());
    let mut running: Option<((String, Period), f64)> = None;
    for ((channel, cohort, n), revenue) in week_revenue {
        let key = (channel, cohort);
        let cum_revenue = match running.take() {
            Some((prev, total)) if prev == key => total + revenue,
            _ => revenue,
        };
        let users = cohort_users.get(&key).copied().unwrap_or(0);
        let costs = cohort_costs.get(&key).copied().unwrap_or(0.0);
        let ltv = ratio(cum_revenue, users as f64);
        let cac = ratio(costs, users as f64);
        rows.push(PaybackRow {
            channel: key.0.clone(),
            cohort_week: key.1,
            n_week: n,
            week_revenue: revenue,
            cum_revenue,
            cohort_users: users,
            cohort_costs: costs,
            ltv,
            cac,
            roi: roi(ltv, cac),
        });
        running = Some((key, cum_revenue));
    }
    rows
}

/// Channels whose mean ROI across cohorts at `n_week` is negative. Channels
/// with no defined ROI at that week are not flagged.
pub fn bad_channels(rows: &[PaybackRow], n_week: i64) -> Vec<BadChannel> {
    let mut per_channel: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.n_week == n_week) {
        if let Some(roi) = row.roi {
            let slot = per_channel.entry(row.channel.as_str()).or_insert((0.0, 0));
            slot.0 += roi;
            slot.1 += 1;
        }
    }

    let flagged: Vec<BadChannel> = per_channel
        .into_iter()
        .map(|(channel, (sum, cohorts))| (channel, sum / cohorts as f64, cohorts))
        .filter(|(_, mean_roi, _)| *mean_roi < 0.0)
        .map(|(channel, mean_roi, cohorts)| BadChannel {
            channel: channel.to_string(),
            n_week,
            mean_roi,
            cohorts,
        })
        .collect();

    info!(
        n_week,
        flagged = ?flagged.iter().map(|b| b.channel.as_str()).collect::<Vec<_>>(),
        "Payback check complete"
    );
    flagged
}

/// Mean ROI of `channels` per cohort week and `N_week` in `1..=weeks`.
pub fn roi_heatmap(rows: &[PaybackRow], channels: &[String], weeks: i64) -> RoiHeatmap {
    let wanted: BTreeSet<&str> = channels.iter().map(String::as_str).collect();
    let cells = mean_by(
        rows.iter()
            .filter(|r| wanted.contains(r.channel.as_str()) && (1..=weeks).contains(&r.n_week))
            .filter_map(|r| r.roi.map(|roi| (r.cohort_week, r.n_week, roi))),
        |(cohort, n, _)| (*cohort, *n),
        |(_, _, roi)| *roi,
    );

    let mut by_cohort: BTreeMap<Period, Vec<Option<f64>>> = BTreeMap::new();
    for r in rows.iter().filter(|r| wanted.contains(r.channel.as_str())) {
        by_cohort
            .entry(r.cohort_week)
            .or_insert_with(|| vec![None; weeks.max(0) as usize]);
    }
    for ((cohort, n), mean) in cells {
        if let Some(row) = by_cohort.get_mut(&cohort) {
            row[(n - 1) as usize] = Some(mean);
        }
    }

    RoiHeatmap {
        channels: channels.to_vec(),
        weeks: (1..=weeks).collect(),
        rows: by_cohort.into_iter().collect(),
    }
}
