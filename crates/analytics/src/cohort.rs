//! Cohort assignment and event enrichment.
//!
//! Every profile belongs to exactly one month cohort and one week cohort,
//! both truncations of its first-touch timestamp. Sessions and orders are
//! joined to their user's profile and tagged with `lifetime_days`.

use crate::profile::ProfileSet;
use chrono::{NaiveDate, NaiveDateTime};
use cohort_core::config::{AnalysisConfig, LifetimeBasis};
use cohort_core::period::{Granularity, Period, WeekStart};
use cohort_core::types::{CohortKey, Order, Profile, Session, Tables};
use tracing::{info, warn};

/// Calendar conventions shared by every cohort computation of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohortRules {
    pub week_start: WeekStart,
    pub lifetime_basis: LifetimeBasis,
}

impl CohortRules {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            week_start: config.week_start,
            lifetime_basis: config.lifetime_basis,
        }
    }

    pub fn period_of(&self, granularity: Granularity, date: NaiveDate) -> Period {
        Period::containing(granularity, date, self.week_start)
    }

    /// Acquisition period of a profile.
    pub fn cohort_period(&self, profile: &Profile, granularity: Granularity) -> Period {
        self.period_of(granularity, profile.first_date())
    }

    pub fn cohort_key(&self, profile: &Profile, granularity: Granularity, by_channel: bool) -> CohortKey {
        CohortKey::new(
            &profile.first_channel,
            self.cohort_period(profile, granularity),
            by_channel,
        )
    }

    /// Days from first touch to `event`.
    pub fn lifetime_days(&self, first_touch: NaiveDateTime, event: NaiveDateTime) -> i64 {
        match self.lifetime_basis {
            LifetimeBasis::CalendarDays => (event.date() - first_touch.date()).num_days(),
            LifetimeBasis::ElapsedDays => (event - first_touch).num_seconds().div_euclid(86_400),
        }
    }
}

/// 1-based index of the week `event_week_start` falls in, counted from
/// `cohort_week_start`: the acquisition week itself is week 1, so week 5
/// means four full weeks have elapsed.
pub fn n_week(cohort_week_start: NaiveDate, event_week_start: NaiveDate) -> i64 {
    (event_week_start - cohort_week_start).num_days().div_euclid(7) + 1
}

/// A session joined with its user's profile.
#[derive(Debug, Clone, Copy)]
pub struct SessionEvent<'a> {
    pub session: &'a Session,
    pub profile: &'a Profile,
    pub lifetime_days: i64,
}

/// An order joined with its user's profile.
#[derive(Debug, Clone, Copy)]
pub struct OrderEvent<'a> {
    pub order: &'a Order,
    pub profile: &'a Profile,
    pub lifetime_days: i64,
}

/// Events of a run after the inner join with profiles.
#[derive(Debug, Clone, Default)]
pub struct Enriched<'a> {
    pub sessions: Vec<SessionEvent<'a>>,
    pub orders: Vec<OrderEvent<'a>>,
    /// Orders whose user never had a session.
    pub dropped_orders: usize,
}

impl<'a> Enriched<'a> {
    /// Inner-join sessions and orders with `profiles`. Orders from users
    /// without a profile are dropped.
    pub fn build(tables: &'a Tables, profiles: &'a ProfileSet, rules: &CohortRules) -> Self {
        let sessions: Vec<SessionEvent<'a>> = tables
            .sessions
            .iter()
            .filter_map(|session| {
                let profile = profiles.get(session.user_id)?;
                Some(SessionEvent {
                    session,
                    profile,
                    lifetime_days: rules.lifetime_days(profile.first_touch_ts, session.session_start),
                })
            })
            .collect();

        let orders: Vec<OrderEvent<'a>> = tables
            .orders
            .iter()
            .filter_map(|order| {
                let profile = profiles.get(order.user_id)?;
                Some(OrderEvent {
                    order,
                    profile,
                    lifetime_days: rules.lifetime_days(profile.first_touch_ts, order.event_dt),
                })
            })
            .collect();

        let dropped_orders = tables.orders.len() - orders.len();
        if dropped_orders > 0 {
            metrics::counter!("analytics.orphan_orders").increment(dropped_orders as u64);
            warn!(dropped_orders, "Orders from users without sessions were dropped");
        }
        info!(
            sessions = sessions.len(),
            orders = orders.len(),
            "Events joined with profiles"
        );

        Self {
            sessions,
            orders,
            dropped_orders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn session(user_id: u64, day: u32, hour: u32) -> Session {
        Session {
            user_id,
            region: "UK".into(),
            device: "PC".into(),
            channel: "organic".into(),
            session_start: ts(day, hour),
            session_end: ts(day, hour),
        }
    }

    #[test]
    fn test_calendar_days_count_midnights() {
        let rules = CohortRules::default();
        assert_eq!(rules.lifetime_days(ts(1, 23), ts(2, 1)), 1);
        assert_eq!(rules.lifetime_days(ts(1, 1), ts(1, 23)), 0);
    }

    #[test]
    fn test_elapsed_days_count_full_24h_periods() {
        let rules = CohortRules {
            lifetime_basis: LifetimeBasis::ElapsedDays,
            ..CohortRules::default()
        };
        assert_eq!(rules.lifetime_days(ts(1, 23), ts(2, 1)), 0);
        assert_eq!(rules.lifetime_days(ts(1, 23), ts(2, 23)), 1);
    }

    #[test]
    fn test_n_week_is_one_based() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(n_week(start, start), 1);
        assert_eq!(n_week(start, start + chrono::Duration::days(7)), 2);
        assert_eq!(n_week(start, start + chrono::Duration::days(28)), 5);
    }

    #[test]
    fn test_cohort_key_for_profile() {
        let rules = CohortRules::default();
        let profile = Profile {
            user_id: 1,
            first_touch_ts: ts(8, 12),
            first_channel: "TipTop".into(),
            region: "UK".into(),
            device: "PC".into(),
        };
        let month = rules.cohort_key(&profile, Granularity::Month, false);
        assert_eq!(month.to_string(), "2024-05");
        let week = rules.cohort_key(&profile, Granularity::Week, true);
        assert_eq!(week.to_string(), "TipTop/2024-05-06");
    }

    #[test]
    fn test_enrich_drops_orders_without_profile() {
        let tables = Tables {
            sessions: vec![session(1, 1, 10), session(1, 3, 10)],
            orders: vec![
                Order { user_id: 1, event_dt: ts(2, 9), revenue: 4.99 },
                Order { user_id: 42, event_dt: ts(2, 9), revenue: 9.99 },
            ],
            costs: Vec::new(),
        };
        let rules = CohortRules::default();
        let profiles = ProfileSet::build(&tables.sessions);
        let enriched = Enriched::build(&tables, &profiles, &rules);

        assert_eq!(enriched.sessions.len(), 2);
        assert_eq!(enriched.orders.len(), 1);
        assert_eq!(enriched.dropped_orders, 1);
        assert_eq!(enriched.orders[0].lifetime_days, 1);
        assert_eq!(enriched.sessions[1].lifetime_days, 2);
    }
}
