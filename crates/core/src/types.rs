use crate::period::Period;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = u64;

/// One visit to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub region: String,
    pub device: String,
    pub channel: String,
    pub session_start: NaiveDateTime,
    pub session_end: NaiveDateTime,
}

/// One purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: UserId,
    pub event_dt: NaiveDateTime,
    pub revenue: f64,
}

/// Marketing spend for one channel on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub dt: NaiveDate,
    pub channel: String,
    pub costs: f64,
}

/// The three normalized input logs of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub sessions: Vec<Session>,
    pub orders: Vec<Order>,
    pub costs: Vec<CostRecord>,
}

/// First-touch attributes of one user, derived from their earliest session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub first_touch_ts: NaiveDateTime,
    pub first_channel: String,
    pub region: String,
    pub device: String,
}

impl Profile {
    pub fn first_date(&self) -> NaiveDate {
        self.first_touch_ts.date()
    }
}

/// Acquisition cohort: a period, optionally split by first-touch channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CohortKey {
    pub channel: Option<String>,
    pub period: Period,
}

impl CohortKey {
    pub fn overall(period: Period) -> Self {
        Self {
            channel: None,
            period,
        }
    }

    pub fn per_channel(channel: impl Into<String>, period: Period) -> Self {
        Self {
            channel: Some(channel.into()),
            period,
        }
    }

    /// Key for `period`, keeping the channel only when `by_channel` is set.
    pub fn new(channel: &str, period: Period, by_channel: bool) -> Self {
        if by_channel {
            Self::per_channel(channel, period)
        } else {
            Self::overall(period)
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{}/{}", channel, self.period),
            None => write!(f, "{}", self.period),
        }
    }
}
