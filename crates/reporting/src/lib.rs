//! Tabular presentation of pipeline output: named-column tables written as
//! CSV or JSON and rendered for the terminal.

pub mod bundle;
pub mod rows;
pub mod table;

pub use bundle::{heatmap_table, ReportBundle};
pub use table::{ReportTable, TableRow};
