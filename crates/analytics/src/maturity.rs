//! Cohort maturity: a cohort is mature once its last member has had the
//! full attribution window before the latest observed data.

use crate::cohort::CohortRules;
use crate::profile::ProfileSet;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use cohort_core::period::Granularity;
use cohort_core::types::{CohortKey, Tables};
use std::collections::BTreeMap;

/// Latest session start or purchase timestamp in the data.
pub fn max_event_ts(tables: &Tables) -> Option<NaiveDateTime> {
    let sessions = tables.sessions.iter().map(|s| s.session_start);
    let orders = tables.orders.iter().map(|o| o.event_dt);
    sessions.chain(orders).max()
}

/// Maturity of every cohort of one granularity and channel split.
#[derive(Debug, Clone)]
pub struct MaturityIndex {
    last_join: BTreeMap<CohortKey, NaiveDateTime>,
    window: Duration,
    max_acq_date: NaiveDateTime,
}

impl MaturityIndex {
    pub fn build(
        profiles: &ProfileSet,
        rules: &CohortRules,
        granularity: Granularity,
        by_channel: bool,
        horizon_days: u32,
        max_acq_date: NaiveDateTime,
    ) -> Self {
        let mut last_join: BTreeMap<CohortKey, NaiveDateTime> = BTreeMap::new();
        for profile in profiles.iter() {
            let key = rules.cohort_key(profile, granularity, by_channel);
            let slot = last_join.entry(key).or_insert(profile.first_touch_ts);
            if profile.first_touch_ts > *slot {
                *slot = profile.first_touch_ts;
            }
        }
        Self {
            last_join,
            window: Duration::days(i64::from(horizon_days) - 1),
            max_acq_date,
        }
    }

    /// Whether the attribution window of `key` closes on or before
    /// `max_acq_date`. Cohorts with no members are judged by the last
    /// instant of their period. A window ending past the representable
    /// range never closes.
    pub fn is_mature(&self, key: &CohortKey) -> bool {
        let last_join = self.last_join.get(key).copied().unwrap_or_else(|| {
            key.period.next_start().and_time(NaiveTime::MIN) - Duration::seconds(1)
        });
        last_join
            .checked_add_signed(self.window)
            .is_some_and(|end| end <= self.max_acq_date)
    }

    /// Mature cohorts that have at least one member, in key order.
    pub fn mature_cohorts(&self) -> Vec<CohortKey> {
        self.last_join
            .keys()
            .filter(|key| self.is_mature(key))
            .cloned()
            .collect()
    }

    pub fn last_join(&self, key: &CohortKey) -> Option<NaiveDateTime> {
        self.last_join.get(key).copied()
    }

    pub fn max_acq_date(&self) -> NaiveDateTime {
        self.max_acq_date
    }
}
