//! Ingestion and normalization of the visits, orders and costs logs:
//! typed CSV loading, full-row deduplication, numeric width planning and
//! data-quality audits.

pub mod audit;
pub mod dedup;
pub mod loader;
pub mod narrow;

pub use audit::TableAudit;
pub use dedup::{dedup_rows, RowIdentity};
pub use loader::{load_costs, load_orders, load_sessions, load_tables, normalize, IngestOutcome};
pub use narrow::{ColumnPlan, ColumnWidth, NarrowingReport};
