//! Named-column tables and their CSV, JSON and terminal renderings.

use cohort_core::CohortResult;
use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

/// A row type that can be laid out as one line of a [`ReportTable`].
pub trait TableRow {
    fn columns() -> Vec<&'static str>;
    fn cells(&self) -> Vec<Value>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ReportTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows<T: TableRow>(name: impl Into<String>, rows: &[T]) -> Self {
        Self {
            name: name.into(),
            columns: T::columns().into_iter().map(String::from).collect(),
            rows: rows.iter().map(T::cells).collect(),
        }
    }

    pub fn push_row(&mut self, cells: Vec<Value>) {
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// CSV with a header line. Undefined values become empty cells.
    pub fn export_csv(&self) -> CohortResult<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| std::io::Error::other(e).into())
    }

    /// Array of column-to-value records, in column order.
    pub fn export_json(&self) -> CohortResult<String> {
        let records: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(record)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    pub fn render_text(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().map(cell_text));
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        format!("{}\n{}", self.name, table)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
