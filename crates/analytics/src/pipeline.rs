//! Pipeline run: threads one set of normalized tables through every stage
//! and collects the derived tables. Nothing is shared between runs.

use crate::acquisition::{self, ChannelSummaryRow, DailyCacRow, NewUsersRow};
use crate::activity::{self, ActivityRow, DauRow};
use crate::cohort::{CohortRules, Enriched};
use crate::conversion::{self, ConversionRow};
use crate::economics::{self, UnitEconomicsRow};
use crate::maturity::{max_event_ts, MaturityIndex};
use crate::payback::{self, BadChannel, PaybackRow, RoiHeatmap};
use crate::profile::ProfileSet;
use crate::retention::{self, RetentionRow};
use chrono::{DateTime, NaiveDateTime, Utc};
use cohort_core::config::AnalysisConfig;
use cohort_core::period::{Granularity, Period};
use cohort_core::types::{CohortKey, CostRecord, Profile, Tables};
use cohort_core::{CohortError, CohortResult};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Everything a metric needs from the current run.
#[derive(Debug, Clone, Copy)]
pub struct MetricInputs<'a> {
    pub config: &'a AnalysisConfig,
    pub rules: CohortRules,
    pub profiles: &'a ProfileSet,
    pub events: &'a Enriched<'a>,
    pub costs: &'a [CostRecord],
    pub max_acq_date: NaiveDateTime,
}

impl MetricInputs<'_> {
    pub fn maturity(&self, granularity: Granularity, by_channel: bool) -> MaturityIndex {
        MaturityIndex::build(
            self.profiles,
            &self.rules,
            granularity,
            by_channel,
            self.config.horizon_days,
            self.max_acq_date,
        )
    }
}

/// A profile with its cohort periods and the CAC of its acquisition day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    #[serde(flatten)]
    pub profile: Profile,
    pub cohort_month: Period,
    pub cohort_week: Period,
    pub acquisition_cac: Option<f64>,
}

/// Per-channel ROI heatmap of a flagged channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelHeatmap {
    pub channel: String,
    pub heatmap: RoiHeatmap,
}

/// Every table derived by one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub max_acq_date: NaiveDateTime,
    pub dropped_orders: usize,
    pub profiles: Vec<ProfileRow>,
    pub mature_months: Vec<CohortKey>,
    pub mature_channel_months: Vec<CohortKey>,
    pub mature_channel_weeks: Vec<CohortKey>,
    pub dau: Vec<DauRow>,
    pub channel_dau: Vec<DauRow>,
    pub activity: Vec<ActivityRow>,
    pub channel_activity: Vec<ActivityRow>,
    pub channel_summary: Vec<ChannelSummaryRow>,
    pub daily_new_users: Vec<NewUsersRow>,
    pub daily_cac: Vec<DailyCacRow>,
    pub monthly_economics: Vec<UnitEconomicsRow>,
    pub weekly_channel_economics: Vec<UnitEconomicsRow>,
    pub retention: Vec<RetentionRow>,
    pub conversion: Vec<ConversionRow>,
    pub payback: Vec<PaybackRow>,
    pub bad_channels: Vec<BadChannel>,
    pub bad_channel_heatmap: RoiHeatmap,
    pub channel_heatmaps: Vec<ChannelHeatmap>,
}

/// One execution of the pipeline with a fixed configuration.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    config: AnalysisConfig,
}

impl PipelineRun {
    pub fn new(config: AnalysisConfig) -> CohortResult<Self> {
        config.validate()?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, tables: &Tables) -> CohortResult<PipelineReport> {
        info!(run_id = %self.run_id, "Pipeline run started");

        let rules = CohortRules::from_config(&self.config);
        let profiles = ProfileSet::build(&tables.sessions);
        if profiles.is_empty() {
            return Err(CohortError::EmptyInput(
                "no sessions to build profiles from".into(),
            ));
        }

        let max_acq_date = match self.config.max_acq_date {
            Some(ts) => ts,
            None => max_event_ts(tables)
                .ok_or_else(|| CohortError::EmptyInput("no event timestamps".into()))?,
        };

        let events = Enriched::build(tables, &profiles, &rules);
        let inputs = MetricInputs {
            config: &self.config,
            rules,
            profiles: &profiles,
            events: &events,
            costs: &tables.costs,
            max_acq_date,
        };

        let daily_cac = acquisition::daily_cac(&profiles, &tables.costs);
        let payback = payback::payback_curves(&inputs);
        let bad_channels = payback::bad_channels(&payback, self.config.bad_channel_week);
        let flagged: Vec<String> = bad_channels.iter().map(|b| b.channel.clone()).collect();
        let bad_channel_heatmap =
            payback::roi_heatmap(&payback, &flagged, self.config.heatmap_weeks);
        let channel_heatmaps = flagged
            .iter()
            .map(|channel| ChannelHeatmap {
                channel: channel.clone(),
                heatmap: payback::roi_heatmap(
                    &payback,
                    std::slice::from_ref(channel),
                    self.config.payback_max_week,
                ),
            })
            .collect();

        let report = PipelineReport {
            run_id: self.run_id,
            started_at: self.started_at,
            max_acq_date,
            dropped_orders: events.dropped_orders,
            profiles: profile_rows(&profiles, &rules, &daily_cac),
            mature_months: inputs.maturity(Granularity::Month, false).mature_cohorts(),
            mature_channel_months: inputs.maturity(Granularity::Month, true).mature_cohorts(),
            mature_channel_weeks: inputs.maturity(Granularity::Week, true).mature_cohorts(),
            dau: activity::dau(&events.sessions, &rules, false),
            channel_dau: activity::dau(&events.sessions, &rules, true),
            activity: activity::monthly_activity(&events.sessions, &rules, false),
            channel_activity: activity::monthly_activity(&events.sessions, &rules, true),
            channel_summary: acquisition::channel_summary(&profiles, &tables.costs),
            daily_new_users: acquisition::daily_new_users(&profiles),
            daily_cac,
            monthly_economics: economics::unit_economics(&inputs, Granularity::Month, false),
            weekly_channel_economics: economics::unit_economics(&inputs, Granularity::Week, true),
            retention: retention::retention(&inputs, Granularity::Month, true),
            conversion: conversion::conversion(&inputs, Granularity::Week, true),
            payback,
            bad_channels,
            bad_channel_heatmap,
            channel_heatmaps,
        };

        info!(
            run_id = %self.run_id,
            profiles = report.profiles.len(),
            max_acq_date = %max_acq_date,
            mature_months = report.mature_months.len(),
            bad_channels = report.bad_channels.len(),
            "Pipeline run finished"
        );
        Ok(report)
    }
}

fn profile_rows(profiles: &ProfileSet, rules: &CohortRules, daily_cac: &[DailyCacRow]) -> Vec<ProfileRow> {
    let cac: HashMap<(&str, chrono::NaiveDate), Option<f64>> = daily_cac
        .iter()
        .map(|row| ((row.channel.as_str(), row.date), row.cac))
        .collect();
    profiles
        .iter()
        .map(|p| ProfileRow {
            profile: p.clone(),
            cohort_month: rules.cohort_period(p, Granularity::Month),
            cohort_week: rules.cohort_period(p, Granularity::Week),
            acquisition_cac: cac
                .get(&(p.first_channel.as_str(), p.first_date()))
                .copied()
                .flatten(),
        })
        .collect()
}
