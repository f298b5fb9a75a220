//! Numeric width planning: picks the narrowest storage type whose range
//! strictly contains a column's observed min and max.

use cohort_core::types::Tables;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnWidth {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
}

impl ColumnWidth {
    pub fn bytes(self) -> usize {
        match self {
            ColumnWidth::Int8 => 1,
            ColumnWidth::Int16 | ColumnWidth::Float16 => 2,
            ColumnWidth::Int32 | ColumnWidth::Float32 => 4,
            ColumnWidth::Int64 | ColumnWidth::UInt64 | ColumnWidth::Float64 => 8,
        }
    }
}

/// Largest finite half-precision value.
const F16_MAX: f64 = 65504.0;

/// Width plan for one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnPlan {
    pub table: &'static str,
    pub column: &'static str,
    pub rows: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub original: ColumnWidth,
    pub narrowed: ColumnWidth,
}

impl ColumnPlan {
    pub fn bytes_before(&self) -> usize {
        self.rows * self.original.bytes()
    }

    pub fn bytes_after(&self) -> usize {
        self.rows * self.narrowed.bytes()
    }
}

pub fn integer_width(min: i128, max: i128) -> ColumnWidth {
    let fits = |lo: i128, hi: i128| min > lo && max < hi;
    if fits(i8::MIN.into(), i8::MAX.into()) {
        ColumnWidth::Int8
    } else if fits(i16::MIN.into(), i16::MAX.into()) {
        ColumnWidth::Int16
    } else if fits(i32::MIN.into(), i32::MAX.into()) {
        ColumnWidth::Int32
    } else if min >= i128::from(i64::MIN) && max <= i128::from(i64::MAX) {
        ColumnWidth::Int64
    } else {
        ColumnWidth::UInt64
    }
}

pub fn float_width(min: f64, max: f64) -> ColumnWidth {
    if min > -F16_MAX && max < F16_MAX {
        ColumnWidth::Float16
    } else if min > f64::from(f32::MIN) && max < f64::from(f32::MAX) {
        ColumnWidth::Float32
    } else {
        ColumnWidth::Float64
    }
}

fn plan_integers(
    table: &'static str,
    column: &'static str,
    values: impl Iterator<Item = u64>,
) -> ColumnPlan {
    let mut rows = 0;
    let mut bounds: Option<(u64, u64)> = None;
    for v in values {
        rows += 1;
        bounds = Some(match bounds {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }
    let narrowed = bounds
        .map(|(lo, hi)| integer_width(lo.into(), hi.into()))
        .unwrap_or(ColumnWidth::Int64);
    ColumnPlan {
        table,
        column,
        rows,
        min: bounds.map(|(lo, _)| lo as f64),
        max: bounds.map(|(_, hi)| hi as f64),
        original: ColumnWidth::Int64,
        narrowed,
    }
}

fn plan_floats(
    table: &'static str,
    column: &'static str,
    values: impl Iterator<Item = f64>,
) -> ColumnPlan {
    let mut rows = 0;
    let mut bounds: Option<(f64, f64)> = None;
    for v in values {
        rows += 1;
        bounds = Some(match bounds {
            None => (v, v),
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
        });
    }
    let narrowed = bounds
        .map(|(lo, hi)| float_width(lo, hi))
        .unwrap_or(ColumnWidth::Float64);
    ColumnPlan {
        table,
        column,
        rows,
        min: bounds.map(|(lo, _)| lo),
        max: bounds.map(|(_, hi)| hi),
        original: ColumnWidth::Float64,
        narrowed,
    }
}

/// Width plans for every numeric column of the three logs.
#[derive(Debug, Clone, Serialize)]
pub struct NarrowingReport {
    pub columns: Vec<ColumnPlan>,
}

impl NarrowingReport {
    pub fn bytes_before(&self) -> usize {
        self.columns.iter().map(ColumnPlan::bytes_before).sum()
    }

    pub fn bytes_after(&self) -> usize {
        self.columns.iter().map(ColumnPlan::bytes_after).sum()
    }

    pub fn reduction_percent(&self) -> f64 {
        let before = self.bytes_before();
        if before == 0 {
            return 0.0;
        }
        100.0 * (before - self.bytes_after()) as f64 / before as f64
    }
}

pub fn narrow_tables(tables: &Tables) -> NarrowingReport {
    NarrowingReport {
        columns: vec![
            plan_integers("visits", "user_id", tables.sessions.iter().map(|s| s.user_id)),
            plan_integers("orders", "user_id", tables.orders.iter().map(|o| o.user_id)),
            plan_floats("orders", "revenue", tables.orders.iter().map(|o| o.revenue)),
            plan_floats("costs", "costs", tables.costs.iter().map(|c| c.costs)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_bounds_are_strict() {
        assert_eq!(integer_width(0, 126), ColumnWidth::Int8);
        // 127 equals i8::MAX, which the strict rule does not accept.
        assert_eq!(integer_width(0, 127), ColumnWidth::Int16);
        assert_eq!(integer_width(-40_000, 5), ColumnWidth::Int32);
        assert_eq!(integer_width(0, 981_449_118_918), ColumnWidth::Int64);
        assert_eq!(integer_width(0, u64::MAX.into()), ColumnWidth::UInt64);
    }

    #[test]
    fn test_float_widths() {
        assert_eq!(float_width(0.0, 49.99), ColumnWidth::Float16);
        assert_eq!(float_width(0.0, 70_000.0), ColumnWidth::Float32);
        assert_eq!(float_width(0.0, 1e300), ColumnWidth::Float64);
    }

    #[test]
    fn test_empty_column_keeps_original_width() {
        let plan = plan_floats("orders", "revenue", std::iter::empty());
        assert_eq!(plan.narrowed, ColumnWidth::Float64);
        assert_eq!(plan.rows, 0);
        assert!(plan.min.is_none());
    }

    #[test]
    fn test_memory_report() {
        let report = NarrowingReport {
            columns: vec![plan_floats("costs", "costs", [1.0, 2.0, 3.0, 4.0].into_iter())],
        };
        assert_eq!(report.bytes_before(), 32);
        assert_eq!(report.bytes_after(), 8);
        assert!((report.reduction_percent() - 75.0).abs() < 1e-9);
    }
}
