//! Acquisition volume and spend per channel over the whole observation
//! period. Unbounded metrics: no maturity filtering applies.

use crate::aggregate::{distinct_by, ratio, sum_by};
use crate::profile::ProfileSet;
use chrono::NaiveDate;
use cohort_core::types::CostRecord;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummaryRow {
    pub channel: String,
    pub users: usize,
    pub user_share: Option<f64>,
    pub costs: f64,
    pub cac: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUsersRow {
    pub date: NaiveDate,
    pub channel: String,
    pub new_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCacRow {
    pub channel: String,
    pub date: NaiveDate,
    pub costs: f64,
    pub new_users: usize,
    pub cac: Option<f64>,
}

/// Users, spend and whole-period CAC per channel, most popular first.
pub fn channel_summary(profiles: &ProfileSet, costs: &[CostRecord]) -> Vec<ChannelSummaryRow> {
    let users = distinct_by(profiles.iter(), |p| Some(p.first_channel.clone()), |p| p.user_id);
    let spend = sum_by(costs, |c| Some(c.channel.clone()), |c| c.costs);
    let total = profiles.len() as f64;

    let channels: BTreeSet<&String> = users.keys().chain(spend.keys()).collect();
    let mut rows: Vec<ChannelSummaryRow> = channels
        .into_iter()
        .map(|channel| {
            let n = users.get(channel).copied().unwrap_or(0);
            let costs = spend.get(channel).copied().unwrap_or(0.0);
            ChannelSummaryRow {
                channel: channel.clone(),
                users: n,
                user_share: ratio(n as f64, total),
                costs,
                cac: ratio(costs, n as f64),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.users.cmp(&a.users).then_with(|| a.channel.cmp(&b.channel)));
    rows
}

/// New users per first-touch date and channel.
pub fn daily_new_users(profiles: &ProfileSet) -> Vec<NewUsersRow> {
    distinct_by(
        profiles.iter(),
        |p| Some((p.first_date(), p.first_channel.clone())),
        |p| p.user_id,
    )
    .into_iter()
    .map(|((date, channel), new_users)| NewUsersRow {
        date,
        channel,
        new_users,
    })
    .collect()
}

/// Daily spend per channel divided by the users that channel acquired that
/// day. Days with spend but no new users have an undefined CAC.
pub fn daily_cac(profiles: &ProfileSet, costs: &[CostRecord]) -> Vec<DailyCacRow> {
    let new_users = distinct_by(
        profiles.iter(),
        |p| Some((p.first_channel.clone(), p.first_date())),
        |p| p.user_id,
    );
    sum_by(costs, |c| Some((c.channel.clone(), c.dt)), |c| c.costs)
        .into_iter()
        .map(|((channel, date), costs)| {
            let n = new_users.get(&(channel.clone(), date)).copied().unwrap_or(0);
            DailyCacRow {
                cac: ratio(costs, n as f64),
                channel,
                date,
                costs,
                new_users: n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::types::Session;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn session(user_id: u64, channel: &str, day: u32) -> Session {
        let ts = date(day).and_hms_opt(9, 0, 0).unwrap();
        Session {
            user_id,
            region: "UK".into(),
            device: "PC".into(),
            channel: channel.into(),
            session_start: ts,
            session_end: ts,
        }
    }

    fn cost(channel: &str, day: u32, amount: f64) -> CostRecord {
        CostRecord {
            dt: date(day),
            channel: channel.into(),
            costs: amount,
        }
    }

    #[test]
    fn test_channel_summary_orders_by_popularity() {
        let profiles = ProfileSet::build(&[
            session(1, "organic", 1),
            session(2, "FaceBoom", 1),
            session(3, "FaceBoom", 2),
        ]);
        let costs = vec![cost("FaceBoom", 1, 30.0), cost("TipTop", 1, 10.0)];
        let rows = channel_summary(&profiles, &costs);

        assert_eq!(rows[0].channel, "FaceBoom");
        assert_eq!(rows[0].cac, Some(15.0));
        let organic = rows.iter().find(|r| r.channel == "organic").unwrap();
        assert_eq!(organic.cac, Some(0.0));
        let tiptop = rows.iter().find(|r| r.channel == "TipTop").unwrap();
        assert_eq!(tiptop.users, 0);
        assert_eq!(tiptop.cac, None);
    }

    #[test]
    fn test_daily_cac_is_undefined_without_new_users() {
        let profiles = ProfileSet::build(&[session(1, "FaceBoom", 1), session(2, "FaceBoom", 1)]);
        let costs = vec![cost("FaceBoom", 1, 10.0), cost("FaceBoom", 2, 8.0)];
        let rows = daily_cac(&profiles, &costs);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cac, Some(5.0));
        assert_eq!(rows[1].new_users, 0);
        assert_eq!(rows[1].cac, None);
    }

    #[test]
    fn test_daily_new_users() {
        let profiles = ProfileSet::build(&[
            session(1, "organic", 1),
            session(2, "organic", 1),
            session(3, "organic", 3),
        ]);
        let rows = daily_new_users(&profiles);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].new_users, 2);
    }
}
