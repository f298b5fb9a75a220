use chrono::NaiveDate;
use cohort_analytics::PipelineRun;
use cohort_core::config::{AnalysisConfig, OutputFormat};
use cohort_ingest::{load_costs, load_orders, load_sessions, normalize};
use cohort_reporting::ReportBundle;
use std::fs;

const VISITS: &str = "\
user_id,region,device,channel,session_start,session_end
1,United States,iPhone,FaceBoom,2019-05-01 10:00:00,2019-05-01 10:20:00
2,United States,Mac,organic,2019-05-02 11:00:00,2019-05-02 11:05:00
1,United States,iPhone,FaceBoom,2019-05-20 09:00:00,2019-05-20 09:30:00
";

const ORDERS: &str = "\
user_id,event_dt,revenue
1,2019-05-03 12:00:00,4.99
";

const COSTS: &str = "\
dt,channel,costs
2019-05-01,FaceBoom,20.0
";

#[test]
fn bundle_writes_every_table_in_both_formats() {
    let outcome = normalize(
        load_sessions(VISITS.as_bytes(), b',').unwrap(),
        load_orders(ORDERS.as_bytes(), b',').unwrap(),
        load_costs(COSTS.as_bytes(), b',').unwrap(),
    )
    .unwrap();

    let config = AnalysisConfig {
        max_acq_date: NaiveDate::from_ymd_opt(2019, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0),
        ..AnalysisConfig::default()
    };
    let report = PipelineRun::new(config).unwrap().run(&outcome.tables).unwrap();
    let bundle = ReportBundle::from_report(&report).with_ingest(&outcome);

    let economics = bundle.table("unit_economics_monthly").unwrap();
    assert_eq!(economics.len(), 1);
    let csv = economics.export_csv().unwrap();
    assert!(csv.starts_with("channel,cohort,users,revenue_sum,cost_sum,ltv,cac,roi,roi_percent"));
    assert!(csv.contains(",2019-05,2,4.99,20.0,2.495,10.0,"));

    let channel_dau = bundle.table("dau_by_channel").unwrap().export_csv().unwrap();
    assert!(channel_dau.starts_with("date,channel,dau"));
    assert!(channel_dau.contains("2019-05-20,FaceBoom,1"));

    let dir = std::env::temp_dir().join(format!("cohort-reporting-{}", std::process::id()));
    let written = bundle.write_to_dir(&dir, OutputFormat::Both).unwrap();
    assert_eq!(written.len(), 1 + 2 * bundle.tables.len());
    assert!(dir.join("run.json").exists());
    assert!(dir.join("payback.csv").exists());
    assert!(dir.join("ingest_audit.json").exists());
    assert!(dir.join("dau_by_channel.csv").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.join("run.json")).unwrap()).unwrap();
    assert_eq!(manifest["profiles"], 2);
    assert_eq!(manifest["run_id"], report.run_id.to_string());

    fs::remove_dir_all(&dir).unwrap();
}
