//! Grouping primitives every metric is composed from: sums and distinct-user
//! counts per key, attribution horizons, and zero-safe ratios.

use cohort_core::types::UserId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Inclusive `lifetime_days` range an event must fall in to be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Horizon {
    pub from_day: i64,
    pub to_day: i64,
}

impl Horizon {
    /// Everything from acquisition through `last_day`.
    pub fn through(last_day: i64) -> Self {
        Self {
            from_day: i64::MIN,
            to_day: last_day,
        }
    }

    /// Attribution window of `days` days: day 0 through day `days - 1`.
    pub fn attribution(days: u32) -> Self {
        Self::through(i64::from(days) - 1)
    }

    pub fn between(from_day: i64, to_day: i64) -> Self {
        Self { from_day, to_day }
    }

    pub fn day(day: i64) -> Self {
        Self::between(day, day)
    }

    pub fn contains(&self, lifetime_days: i64) -> bool {
        lifetime_days >= self.from_day && lifetime_days <= self.to_day
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

/// Return on investment `(ltv - cac) / cac`, undefined when either side is
/// undefined or CAC is zero.
pub fn roi(ltv: Option<f64>, cac: Option<f64>) -> Option<f64> {
    let (ltv, cac) = (ltv?, cac?);
    ratio(ltv - cac, cac)
}

/// Sum `value` per `key`. Rows mapped to `None` are skipped.
pub fn sum_by<T, K: Ord>(
    rows: impl IntoIterator<Item = T>,
    mut key: impl FnMut(&T) -> Option<K>,
    mut value: impl FnMut(&T) -> f64,
) -> BTreeMap<K, f64> {
    let mut sums = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(&row) {
            *sums.entry(k).or_insert(0.0) += value(&row);
        }
    }
    sums
}

/// Count distinct users per `key`. Rows mapped to `None` are skipped.
pub fn distinct_by<T, K: Ord>(
    rows: impl IntoIterator<Item = T>,
    mut key: impl FnMut(&T) -> Option<K>,
    mut user: impl FnMut(&T) -> UserId,
) -> BTreeMap<K, usize> {
    let mut users: BTreeMap<K, HashSet<UserId>> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(&row) {
            users.entry(k).or_default().insert(user(&row));
        }
    }
    users.into_iter().map(|(k, set)| (k, set.len())).collect()
}

/// Mean of the values per key.
pub fn mean_by<T, K: Ord>(
    rows: impl IntoIterator<Item = T>,
    mut key: impl FnMut(&T) -> K,
    mut value: impl FnMut(&T) -> f64,
) -> BTreeMap<K, f64> {
    let mut acc: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let slot = acc.entry(key(&row)).or_insert((0.0, 0));
        slot.0 += value(&row);
        slot.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

/// One ratio metric for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioRow<K> {
    pub key: K,
    pub numerator: f64,
    pub denominator: f64,
    pub value: Option<f64>,
}

/// Join a numerator table and a denominator table on `keys`.
///
/// A key missing from either table contributes zero to that side, so a
/// missing denominator yields an undefined ratio rather than a dropped row.
pub fn ratio_rows<K: Ord + Clone>(
    keys: impl IntoIterator<Item = K>,
    numerators: &BTreeMap<K, f64>,
    denominators: &BTreeMap<K, f64>,
) -> Vec<RatioRow<K>> {
    keys.into_iter()
        .collect::<BTreeSet<K>>()
        .into_iter()
        .map(|key| {
            let numerator = numerators.get(&key).copied().unwrap_or(0.0);
            let denominator = denominators.get(&key).copied().unwrap_or(0.0);
            RatioRow {
                value: ratio(numerator, denominator),
                key,
                numerator,
                denominator,
            }
        })
        .collect()
}

/// Convert a count table into the float form `ratio_rows` consumes.
pub fn as_f64<K: Ord + Clone>(counts: &BTreeMap<K, usize>) -> BTreeMap<K, f64> {
    counts.iter().map(|(k, v)| (k.clone(), *v as f64)).collect()
}
