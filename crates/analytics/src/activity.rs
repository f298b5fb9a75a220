//! Active-user metrics: DAU, MAU and stickiness. These count every session
//! and are never restricted to mature cohorts.

use crate::aggregate::{distinct_by, mean_by, ratio};
use crate::cohort::{CohortRules, SessionEvent};
use chrono::NaiveDate;
use cohort_core::period::{Granularity, Period};
use cohort_core::types::CohortKey;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DauRow {
    pub date: NaiveDate,
    pub channel: Option<String>,
    pub dau: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRow {
    pub month: Period,
    pub channel: Option<String>,
    /// Mean DAU over the days of the month that had any session.
    pub mean_dau: f64,
    pub mau: usize,
    pub stickiness: Option<f64>,
}

fn activity_key(event: &SessionEvent<'_>, granularity: Granularity, rules: &CohortRules, by_channel: bool) -> CohortKey {
    CohortKey::new(
        &event.profile.first_channel,
        rules.period_of(granularity, event.session.session_start.date()),
        by_channel,
    )
}

/// Distinct users per calendar day, optionally per first-touch channel.
pub fn dau(events: &[SessionEvent<'_>], rules: &CohortRules, by_channel: bool) -> Vec<DauRow> {
    distinct_by(
        events,
        |e| Some(activity_key(e, Granularity::Day, rules, by_channel)),
        |e| e.session.user_id,
    )
    .into_iter()
    .map(|(key, dau)| DauRow {
        date: key.period.start(),
        channel: key.channel,
        dau,
    })
    .collect()
}

/// Mean DAU, MAU and stickiness per calendar month.
pub fn monthly_activity(events: &[SessionEvent<'_>], rules: &CohortRules, by_channel: bool) -> Vec<ActivityRow> {
    let daily = dau(events, rules, by_channel);
    let mean_dau = mean_by(
        &daily,
        |row| CohortKey {
            channel: row.channel.clone(),
            period: Period::month(row.date),
        },
        |row| row.dau as f64,
    );
    let mau = distinct_by(
        events,
        |e| Some(activity_key(e, Granularity::Month, rules, by_channel)),
        |e| e.session.user_id,
    );

    mau.into_iter()
        .map(|(key, mau)| {
            let mean_dau = mean_dau.get(&key).copied().unwrap_or(0.0);
            ActivityRow {
                stickiness: ratio(mean_dau, mau as f64),
                month: key.period,
                channel: key.channel,
                mean_dau,
                mau,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Enriched;
    use crate::profile::ProfileSet;
    use cohort_core::types::{Session, Tables};

    fn session(user_id: u64, channel: &str, month: u32, day: u32) -> Session {
        let ts = NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Session {
            user_id,
            region: "UK".into(),
            device: "PC".into(),
            channel: channel.into(),
            session_start: ts,
            session_end: ts,
        }
    }

    fn tables() -> Tables {
        Tables {
            sessions: vec![
                session(1, "a", 5, 1),
                session(1, "a", 5, 1),
                session(2, "b", 5, 1),
                session(1, "a", 5, 2),
                session(3, "b", 6, 1),
            ],
            orders: Vec::new(),
            costs: Vec::new(),
        }
    }

    #[test]
    fn test_dau_counts_distinct_users() {
        let tables = tables();
        let profiles = ProfileSet::build(&tables.sessions);
        let rules = CohortRules::default();
        let events = Enriched::build(&tables, &profiles, &rules);

        let rows = dau(&events.sessions, &rules, false);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].dau, 2);
        assert_eq!(rows[1].dau, 1);
    }

    #[test]
    fn test_stickiness_is_mean_dau_over_mau() {
        let tables = tables();
        let profiles = ProfileSet::build(&tables.sessions);
        let rules = CohortRules::default();
        let events = Enriched::build(&tables, &profiles, &rules);

        let rows = monthly_activity(&events.sessions, &rules, false);
        let may = &rows[0];
        assert_eq!(may.month.to_string(), "2024-05");
        assert_eq!(may.mau, 2);
        assert!((may.mean_dau - 1.5).abs() < 1e-12);
        assert!((may.stickiness.unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_activity_per_channel() {
        let tables = tables();
        let profiles = ProfileSet::build(&tables.sessions);
        let rules = CohortRules::default();
        let events = Enriched::build(&tables, &profiles, &rules);

        let rows = monthly_activity(&events.sessions, &rules, true);
        let may_b = rows
            .iter()
            .find(|r| r.channel.as_deref() == Some("b") && r.month.to_string() == "2024-05")
            .unwrap();
        assert_eq!(may_b.mau, 1);
        assert_eq!(may_b.stickiness, Some(1.0));
    }
}
