//! Table builders shared by the metric unit tests.

use crate::cohort::{CohortRules, Enriched};
use crate::pipeline::MetricInputs;
use crate::profile::ProfileSet;
use chrono::{NaiveDate, NaiveDateTime};
use cohort_core::config::AnalysisConfig;
use cohort_core::types::{CostRecord, Order, Session, Tables};

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

pub fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    date(month, day).and_hms_opt(hour, 0, 0).unwrap()
}

pub fn session(user_id: u64, channel: &str, start: NaiveDateTime) -> Session {
    Session {
        user_id,
        region: "United States".into(),
        device: "iPhone".into(),
        channel: channel.into(),
        session_start: start,
        session_end: start,
    }
}

pub fn order(user_id: u64, event_dt: NaiveDateTime, revenue: f64) -> Order {
    Order {
        user_id,
        event_dt,
        revenue,
    }
}

pub fn cost(dt: NaiveDate, channel: &str, costs: f64) -> CostRecord {
    CostRecord {
        dt,
        channel: channel.into(),
        costs,
    }
}

/// Build profiles and events for `tables` and hand the metric inputs to `f`.
pub fn with_inputs<R>(
    tables: &Tables,
    config: &AnalysisConfig,
    max_acq_date: NaiveDateTime,
    f: impl FnOnce(&MetricInputs<'_>) -> R,
) -> R {
    let rules = CohortRules::from_config(config);
    let profiles = ProfileSet::build(&tables.sessions);
    let events = Enriched::build(tables, &profiles, &rules);
    let inputs = MetricInputs {
        config,
        rules,
        profiles: &profiles,
        events: &events,
        costs: &tables.costs,
        max_acq_date,
    };
    f(&inputs)
}
