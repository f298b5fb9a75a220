//! Report bundles: every table of one run, written to a directory as CSV
//! and/or JSON next to a `run.json` manifest.

use crate::table::ReportTable;
use cohort_analytics::payback::RoiHeatmap;
use cohort_analytics::PipelineReport;
use cohort_core::config::OutputFormat;
use cohort_core::CohortResult;
use cohort_ingest::IngestOutcome;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Every table of one run, under the file stem it is written as.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub manifest: Value,
    pub tables: Vec<ReportTable>,
}

impl ReportBundle {
    pub fn from_report(report: &PipelineReport) -> Self {
        let manifest = json!({
            "run_id": report.run_id.to_string(),
            "started_at": report.started_at.to_rfc3339(),
            "max_acq_date": report.max_acq_date.to_string(),
            "profiles": report.profiles.len(),
            "dropped_orders": report.dropped_orders,
            "mature_months": report.mature_months.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "bad_channels": report.bad_channels.iter().map(|b| b.channel.clone()).collect::<Vec<_>>(),
        });

        let mut tables = vec![
            ReportTable::from_rows("profiles", &report.profiles),
            ReportTable::from_rows("dau", &report.dau),
            ReportTable::from_rows("dau_by_channel", &report.channel_dau),
            ReportTable::from_rows("activity_monthly", &report.activity),
            ReportTable::from_rows("activity_monthly_by_channel", &report.channel_activity),
            ReportTable::from_rows("channel_summary", &report.channel_summary),
            ReportTable::from_rows("new_users_daily", &report.daily_new_users),
            ReportTable::from_rows("cac_daily", &report.daily_cac),
            ReportTable::from_rows("unit_economics_monthly", &report.monthly_economics),
            ReportTable::from_rows(
                "unit_economics_weekly_by_channel",
                &report.weekly_channel_economics,
            ),
            ReportTable::from_rows("retention_14_28", &report.retention),
            ReportTable::from_rows("conversion_weekly", &report.conversion),
            ReportTable::from_rows("payback", &report.payback),
            ReportTable::from_rows("bad_channels", &report.bad_channels),
            heatmap_table("roi_heatmap_bad_channels", &report.bad_channel_heatmap),
        ];
        let mut stems = BTreeSet::new();
        for channel in &report.channel_heatmaps {
            let stem = unique_stem(&mut stems, &channel.channel);
            tables.push(heatmap_table(&format!("roi_heatmap_{stem}"), &channel.heatmap));
        }

        Self { manifest, tables }
    }

    /// Add the ingestion audit and the column width plan.
    pub fn with_ingest(mut self, outcome: &IngestOutcome) -> Self {
        self.tables
            .push(ReportTable::from_rows("ingest_audit", &outcome.audits));
        self.tables
            .push(ReportTable::from_rows("column_widths", &outcome.narrowing.columns));
        if let Value::Object(manifest) = &mut self.manifest {
            manifest.insert(
                "memory_reduction_percent".into(),
                Value::from(outcome.narrowing.reduction_percent()),
            );
        }
        self
    }

    pub fn table(&self, name: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Write each table as `<name>.csv` and/or `<name>.json`, plus a
    /// `run.json` manifest. Returns the paths written.
    pub fn write_to_dir(&self, dir: &Path, format: OutputFormat) -> CohortResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        let manifest_path = dir.join("run.json");
        fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest)?)?;
        written.push(manifest_path);

        for table in &self.tables {
            if format.writes_csv() {
                let path = dir.join(format!("{}.csv", table.name));
                fs::write(&path, table.export_csv()?)?;
                written.push(path);
            }
            if format.writes_json() {
                let path = dir.join(format!("{}.json", table.name));
                fs::write(&path, table.export_json()?)?;
                written.push(path);
            }
            debug!(table = %table.name, rows = table.len(), "Report table written");
        }

        info!(dir = %dir.display(), files = written.len(), "Reports written");
        Ok(written)
    }

    pub fn render_text(&self) -> String {
        self.tables
            .iter()
            .map(ReportTable::render_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Pivot of cohort week by `N_week`, one column per week.
pub fn heatmap_table(name: &str, heatmap: &RoiHeatmap) -> ReportTable {
    let mut columns = vec!["cohort_week".to_string()];
    columns.extend(heatmap.weeks.iter().map(|w| format!("week_{w}")));
    let mut table = ReportTable::new(name, columns);
    for (cohort, cells) in &heatmap.rows {
        let mut row = vec![Value::String(cohort.to_string())];
        row.extend(cells.iter().map(|cell| Value::from(*cell)));
        table.push_row(row);
    }
    table
}

fn file_stem(channel: &str) -> String {
    channel
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// `file_stem` of `channel`, suffixed `_2`, `_3` and so on when another
/// channel already took it.
fn unique_stem(taken: &mut BTreeSet<String>, channel: &str) -> String {
    let base = file_stem(channel);
    let mut stem = base.clone();
    let mut n = 1;
    while !taken.insert(stem.clone()) {
        n += 1;
        stem = format!("{base}_{n}");
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cohort_core::period::{Period, WeekStart};

    #[test]
    fn test_heatmap_table_layout() {
        let week = Period::week(NaiveDate::from_ymd_opt(2019, 5, 6).unwrap(), WeekStart::Monday);
        let heatmap = RoiHeatmap {
            channels: vec!["TipTop".into()],
            weeks: vec![1, 2, 3],
            rows: vec![(week, vec![Some(-0.8), None, Some(-0.5)])],
        };
        let table = heatmap_table("roi_heatmap_tiptop", &heatmap);
        assert_eq!(table.columns, vec!["cohort_week", "week_1", "week_2", "week_3"]);
        assert_eq!(table.rows[0][0], Value::from("2019-05-06"));
        assert_eq!(table.rows[0][2], Value::Null);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("lambdaMediaAds"), "lambdamediaads");
        assert_eq!(file_stem("Left Hand/Ads"), "left_hand_ads");
    }

    #[test]
    fn test_colliding_stems_get_suffixes() {
        let mut taken = BTreeSet::new();
        assert_eq!(unique_stem(&mut taken, "A b"), "a_b");
        assert_eq!(unique_stem(&mut taken, "a_b"), "a_b_2");
        assert_eq!(unique_stem(&mut taken, "a-b"), "a_b_3");
        assert_eq!(unique_stem(&mut taken, "TipTop"), "tiptop");
    }
}
