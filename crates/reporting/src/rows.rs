//! Column layouts of every derived table.

use crate::table::TableRow;
use cohort_analytics::acquisition::{ChannelSummaryRow, DailyCacRow, NewUsersRow};
use cohort_analytics::activity::{ActivityRow, DauRow};
use cohort_analytics::conversion::ConversionRow;
use cohort_analytics::economics::UnitEconomicsRow;
use cohort_analytics::payback::{BadChannel, PaybackRow};
use cohort_analytics::pipeline::ProfileRow;
use cohort_analytics::retention::RetentionRow;
use cohort_core::types::CohortKey;
use cohort_ingest::{ColumnPlan, TableAudit};
use serde_json::Value;
use std::fmt::Display;

fn text(value: impl Display) -> Value {
    Value::String(value.to_string())
}

/// Channel and period cells of a cohort key. Overall cohorts have no channel.
fn cohort_cells(key: &CohortKey) -> [Value; 2] {
    [Value::from(key.channel.clone()), text(key.period)]
}

impl TableRow for ProfileRow {
    fn columns() -> Vec<&'static str> {
        vec![
            "user_id",
            "first_ts",
            "channel",
            "region",
            "device",
            "dt",
            "month",
            "week",
            "acquisition_cost",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        let p = &self.profile;
        vec![
            Value::from(p.user_id),
            text(p.first_touch_ts),
            Value::from(p.first_channel.clone()),
            Value::from(p.region.clone()),
            Value::from(p.device.clone()),
            text(p.first_date()),
            text(self.cohort_month),
            text(self.cohort_week),
            Value::from(self.acquisition_cac),
        ]
    }
}

impl TableRow for DauRow {
    fn columns() -> Vec<&'static str> {
        vec!["date", "channel", "dau"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![text(self.date), Value::from(self.channel.clone()), Value::from(self.dau)]
    }
}

impl TableRow for ActivityRow {
    fn columns() -> Vec<&'static str> {
        vec!["month", "channel", "mean_dau", "mau", "stickiness"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            text(self.month),
            Value::from(self.channel.clone()),
            Value::from(self.mean_dau),
            Value::from(self.mau),
            Value::from(self.stickiness),
        ]
    }
}

impl TableRow for ChannelSummaryRow {
    fn columns() -> Vec<&'static str> {
        vec!["channel", "users", "user_share", "costs", "cac"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.channel.clone()),
            Value::from(self.users),
            Value::from(self.user_share),
            Value::from(self.costs),
            Value::from(self.cac),
        ]
    }
}

impl TableRow for NewUsersRow {
    fn columns() -> Vec<&'static str> {
        vec!["dt", "channel", "new_users"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            text(self.date),
            Value::from(self.channel.clone()),
            Value::from(self.new_users),
        ]
    }
}

impl TableRow for DailyCacRow {
    fn columns() -> Vec<&'static str> {
        vec!["channel", "dt", "costs", "new_users", "cac"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.channel.clone()),
            text(self.date),
            Value::from(self.costs),
            Value::from(self.new_users),
            Value::from(self.cac),
        ]
    }
}

impl TableRow for UnitEconomicsRow {
    fn columns() -> Vec<&'static str> {
        vec![
            "channel",
            "cohort",
            "users",
            "revenue_sum",
            "cost_sum",
            "ltv",
            "cac",
            "roi",
            "roi_percent",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        let [channel, cohort] = cohort_cells(&self.cohort);
        vec![
            channel,
            cohort,
            Value::from(self.users),
            Value::from(self.revenue_sum),
            Value::from(self.cost_sum),
            Value::from(self.ltv),
            Value::from(self.cac),
            Value::from(self.roi),
            Value::from(self.roi_percent),
        ]
    }
}

impl TableRow for RetentionRow {
    fn columns() -> Vec<&'static str> {
        vec!["channel", "cohort", "day0_users", "retained_users", "retention"]
    }

    fn cells(&self) -> Vec<Value> {
        let [channel, cohort] = cohort_cells(&self.cohort);
        vec![
            channel,
            cohort,
            Value::from(self.day0_users),
            Value::from(self.retained_users),
            Value::from(self.retention),
        ]
    }
}

impl TableRow for ConversionRow {
    fn columns() -> Vec<&'static str> {
        vec!["channel", "cohort", "new_users", "buyers", "conversion"]
    }

    fn cells(&self) -> Vec<Value> {
        let [channel, cohort] = cohort_cells(&self.cohort);
        vec![
            channel,
            cohort,
            Value::from(self.new_users),
            Value::from(self.buyers),
            Value::from(self.conversion),
        ]
    }
}

impl TableRow for PaybackRow {
    fn columns() -> Vec<&'static str> {
        vec![
            "channel",
            "cohort_week",
            "n_week",
            "week_revenue",
            "cum_revenue",
            "cohort_users",
            "cohort_costs",
            "ltv",
            "cac",
            "roi",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.channel.clone()),
            text(self.cohort_week),
            Value::from(self.n_week),
            Value::from(self.week_revenue),
            Value::from(self.cum_revenue),
            Value::from(self.cohort_users),
            Value::from(self.cohort_costs),
            Value::from(self.ltv),
            Value::from(self.cac),
            Value::from(self.roi),
        ]
    }
}

impl TableRow for BadChannel {
    fn columns() -> Vec<&'static str> {
        vec!["channel", "n_week", "mean_roi", "cohorts"]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.channel.clone()),
            Value::from(self.n_week),
            Value::from(self.mean_roi),
            Value::from(self.cohorts),
        ]
    }
}

impl TableRow for TableAudit {
    fn columns() -> Vec<&'static str> {
        vec![
            "table",
            "rows_read",
            "duplicates_removed",
            "rows_kept",
            "first_ts",
            "last_ts",
            "categories",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        let categories = self
            .categories
            .iter()
            .map(|(column, values)| format!("{column}: {}", values.join("|")))
            .collect::<Vec<_>>()
            .join("; ");
        vec![
            Value::from(self.table),
            Value::from(self.rows_read),
            Value::from(self.duplicates_removed),
            Value::from(self.rows_kept),
            self.first_ts.map_or(Value::Null, text),
            self.last_ts.map_or(Value::Null, text),
            Value::from(categories),
        ]
    }
}

impl TableRow for ColumnPlan {
    fn columns() -> Vec<&'static str> {
        vec![
            "table",
            "column",
            "rows",
            "min",
            "max",
            "original",
            "narrowed",
            "bytes_before",
            "bytes_after",
        ]
    }

    fn cells(&self) -> Vec<Value> {
        vec![
            Value::from(self.table),
            Value::from(self.column),
            Value::from(self.rows),
            Value::from(self.min),
            Value::from(self.max),
            serde_json::to_value(self.original).unwrap_or(Value::Null),
            serde_json::to_value(self.narrowed).unwrap_or(Value::Null),
            Value::from(self.bytes_before()),
            Value::from(self.bytes_after()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cohort_core::period::Period;

    fn may() -> Period {
        Period::month(NaiveDate::from_ymd_opt(2019, 5, 1).unwrap())
    }

    #[test]
    fn test_every_row_matches_its_header() {
        let row = UnitEconomicsRow {
            cohort: CohortKey::per_channel("TipTop", may()),
            users: 10,
            revenue_sum: 49.9,
            cost_sum: 100.0,
            ltv: Some(4.99),
            cac: Some(10.0),
            roi: Some(-0.501),
            roi_percent: Some(-50.1),
        };
        assert_eq!(row.cells().len(), UnitEconomicsRow::columns().len());

        let row = BadChannel {
            channel: "TipTop".into(),
            n_week: 5,
            mean_roi: -0.3,
            cohorts: 4,
        };
        assert_eq!(row.cells().len(), BadChannel::columns().len());
    }

    #[test]
    fn test_overall_cohort_has_null_channel() {
        let row = RetentionRow {
            cohort: CohortKey::overall(may()),
            day0_users: 4,
            retained_users: 0,
            retention: Some(0.0),
        };
        let cells = row.cells();
        assert_eq!(cells[0], Value::Null);
        assert_eq!(cells[1], Value::from("2019-05"));
    }

    #[test]
    fn test_undefined_ratio_is_null() {
        let row = ChannelSummaryRow {
            channel: "MediaTornado".into(),
            users: 0,
            user_share: Some(0.0),
            costs: 7.2,
            cac: None,
        };
        assert_eq!(row.cells()[4], Value::Null);
    }
}
