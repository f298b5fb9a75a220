//! Typed CSV loading for the three input logs.
//!
//! Every timestamp must parse; a single bad cell fails the whole load.

use crate::audit::TableAudit;
use crate::dedup::dedup_rows;
use crate::narrow::{narrow_tables, NarrowingReport};
use cohort_core::config::InputConfig;
use cohort_core::timestamp::parse_timestamp;
use cohort_core::types::{CostRecord, Order, Session, Tables, UserId};
use cohort_core::{CohortError, CohortResult};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const SESSION_COLUMNS: &[&str] = &[
    "user_id",
    "region",
    "device",
    "channel",
    "session_start",
    "session_end",
];
const ORDER_COLUMNS: &[&str] = &["user_id", "event_dt", "revenue"];
const COST_COLUMNS: &[&str] = &["dt", "channel", "costs"];

#[derive(Debug, Deserialize)]
struct RawSession {
    user_id: UserId,
    region: String,
    device: String,
    channel: String,
    session_start: String,
    session_end: String,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    user_id: UserId,
    event_dt: String,
    revenue: f64,
}

#[derive(Debug, Deserialize)]
struct RawCost {
    dt: String,
    channel: String,
    costs: f64,
}

/// Normalized tables together with what ingestion observed about them.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub tables: Tables,
    pub audits: Vec<TableAudit>,
    pub narrowing: NarrowingReport,
}

fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn check_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    table: &'static str,
    required: &[&str],
) -> CohortResult<()> {
    let headers = reader.headers()?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(CohortError::Schema(format!(
            "{table} is missing column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

fn timestamp(
    raw: &str,
    table: &'static str,
    row: usize,
    column: &'static str,
) -> CohortResult<NaiveDateTime> {
    parse_timestamp(raw).ok_or_else(|| CohortError::Timestamp {
        table,
        row,
        column,
        value: raw.to_string(),
    })
}

fn amount(value: f64, table: &'static str, row: usize, column: &str) -> CohortResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(CohortError::Schema(format!(
            "{table} row {row}: {column} must be a non-negative number, got {value}"
        )));
    }
    Ok(value)
}

/// Load the visits log.
pub fn load_sessions<R: Read>(reader: R, delimiter: u8) -> CohortResult<Vec<Session>> {
    let mut reader = csv_reader(reader, delimiter);
    check_headers(&mut reader, "visits", SESSION_COLUMNS)?;

    let mut sessions = Vec::new();
    for (idx, record) in reader.deserialize::<RawSession>().enumerate() {
        let row = idx + 1;
        let raw = record?;
        let session_start = timestamp(&raw.session_start, "visits", row, "session_start")?;
        let session_end = timestamp(&raw.session_end, "visits", row, "session_end")?;
        if session_end < session_start {
            debug!(row, user_id = raw.user_id, "Session ends before it starts");
        }
        sessions.push(Session {
            user_id: raw.user_id,
            region: raw.region,
            device: raw.device,
            channel: raw.channel,
            session_start,
            session_end,
        });
    }
    Ok(sessions)
}

/// Load the orders log.
pub fn load_orders<R: Read>(reader: R, delimiter: u8) -> CohortResult<Vec<Order>> {
    let mut reader = csv_reader(reader, delimiter);
    check_headers(&mut reader, "orders", ORDER_COLUMNS)?;

    let mut orders = Vec::new();
    for (idx, record) in reader.deserialize::<RawOrder>().enumerate() {
        let row = idx + 1;
        let raw = record?;
        orders.push(Order {
            user_id: raw.user_id,
            event_dt: timestamp(&raw.event_dt, "orders", row, "event_dt")?,
            revenue: amount(raw.revenue, "orders", row, "revenue")?,
        });
    }
    Ok(orders)
}

/// Load the marketing costs log. Only the date part of `dt` is kept.
pub fn load_costs<R: Read>(reader: R, delimiter: u8) -> CohortResult<Vec<CostRecord>> {
    let mut reader = csv_reader(reader, delimiter);
    check_headers(&mut reader, "costs", COST_COLUMNS)?;

    let mut costs = Vec::new();
    for (idx, record) in reader.deserialize::<RawCost>().enumerate() {
        let row = idx + 1;
        let raw = record?;
        costs.push(CostRecord {
            dt: timestamp(&raw.dt, "costs", row, "dt")?.date(),
            channel: raw.channel,
            costs: amount(raw.costs, "costs", row, "costs")?,
        });
    }
    Ok(costs)
}

fn open(path: &Path) -> CohortResult<File> {
    File::open(path).map_err(|e| {
        CohortError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })
}

fn record_rows(table: &'static str, read: usize, removed: usize) {
    metrics::counter!("ingest.rows", "table" => table).increment(read as u64);
    metrics::counter!("ingest.duplicates", "table" => table).increment(removed as u64);
    if removed > 0 {
        warn!(table, removed, "Dropped duplicate rows");
    }
    info!(table, rows = read - removed, "Table loaded");
}

/// Normalize raw tables that are already in memory: deduplicate, audit and
/// plan numeric widths.
pub fn normalize(
    sessions: Vec<Session>,
    orders: Vec<Order>,
    costs: Vec<CostRecord>,
) -> CohortResult<IngestOutcome> {
    if sessions.is_empty() {
        return Err(CohortError::EmptyInput("visits log has no rows".into()));
    }

    let (sessions_read, orders_read, costs_read) = (sessions.len(), orders.len(), costs.len());
    let (sessions, sessions_removed) = dedup_rows(sessions);
    let (orders, orders_removed) = dedup_rows(orders);
    let (costs, costs_removed) = dedup_rows(costs);

    record_rows("visits", sessions_read, sessions_removed);
    record_rows("orders", orders_read, orders_removed);
    record_rows("costs", costs_read, costs_removed);

    let audits = vec![
        TableAudit::of_sessions(&sessions, sessions_read, sessions_removed),
        TableAudit::of_orders(&orders, orders_read, orders_removed),
        TableAudit::of_costs(&costs, costs_read, costs_removed),
    ];

    let tables = Tables {
        sessions,
        orders,
        costs,
    };
    let narrowing = narrow_tables(&tables);
    info!(
        bytes_before = narrowing.bytes_before(),
        bytes_after = narrowing.bytes_after(),
        reduction_pct = narrowing.reduction_percent(),
        "Numeric column widths planned"
    );

    Ok(IngestOutcome {
        tables,
        audits,
        narrowing,
    })
}

/// Load, deduplicate and audit all three logs named by `config`.
pub fn load_tables(config: &InputConfig) -> CohortResult<IngestOutcome> {
    let delimiter = config.delimiter as u8;
    let sessions = load_sessions(open(&config.visits_path)?, delimiter)?;
    let orders = load_orders(open(&config.orders_path)?, delimiter)?;
    let costs = load_costs(open(&config.costs_path)?, delimiter)?;
    normalize(sessions, orders, costs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISITS: &str = "\
user_id,region,device,channel,session_start,session_end
981449118918,United States,iPhone,organic,2024-05-01 02:36:01,2024-05-01 02:45:01
278965908054,United States,iPhone,TipTop,2024-05-01 04:46:31,2024-05-01 04:47:35
";

    #[test]
    fn test_load_sessions() {
        let sessions = load_sessions(VISITS.as_bytes(), b',').unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].user_id, 981_449_118_918);
        assert_eq!(sessions[1].channel, "TipTop");
        assert_eq!(sessions[1].session_start.to_string(), "2024-05-01 04:46:31");
    }

    #[test]
    fn test_bad_timestamp_is_fatal() {
        let data = "user_id,event_dt,revenue\n1,2024-05-01 10:00:00,4.99\n2,not-a-date,4.99\n";
        match load_orders(data.as_bytes(), b',') {
            Err(CohortError::Timestamp { table, row, column, value }) => {
                assert_eq!(table, "orders");
                assert_eq!(row, 2);
                assert_eq!(column, "event_dt");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let data = "dt,channel\n2024-05-01,organic\n";
        let err = load_costs(data.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, CohortError::Schema(msg) if msg.contains("costs")));
    }

    #[test]
    fn test_negative_revenue_rejected() {
        let data = "user_id,event_dt,revenue\n1,2024-05-01 10:00:00,-1\n";
        assert!(matches!(
            load_orders(data.as_bytes(), b','),
            Err(CohortError::Schema(_))
        ));
    }

    #[test]
    fn test_costs_keep_date_only() {
        let data = "dt,channel,costs\n2024-05-01,organic,0.0\n2024-05-02,FaceBoom,113.3\n";
        let costs = load_costs(data.as_bytes(), b',').unwrap();
        assert_eq!(costs[1].dt.to_string(), "2024-05-02");
        assert!((costs[1].costs - 113.3).abs() < 1e-9);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let data = "user_id;event_dt;revenue\n7;2024-05-01 10:00:00;4.99\n";
        let orders = load_orders(data.as_bytes(), b';').unwrap();
        assert_eq!(orders[0].user_id, 7);
    }

    #[test]
    fn test_normalize_requires_sessions() {
        assert!(matches!(
            normalize(Vec::new(), Vec::new(), Vec::new()),
            Err(CohortError::EmptyInput(_))
        ));
    }
}
