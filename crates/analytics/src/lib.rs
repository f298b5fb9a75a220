//! Cohort unit economics: first-touch profiles, cohort assignment,
//! maturity filtering and the CAC / LTV / ROI / retention / conversion
//! metrics computed over them.

pub mod acquisition;
pub mod activity;
pub mod aggregate;
pub mod cohort;
pub mod conversion;
pub mod economics;
#[cfg(test)]
mod fixtures;
pub mod maturity;
pub mod payback;
pub mod pipeline;
pub mod profile;
pub mod retention;

pub use cohort::{CohortRules, Enriched, OrderEvent, SessionEvent};
pub use maturity::MaturityIndex;
pub use pipeline::{MetricInputs, PipelineReport, PipelineRun};
pub use profile::ProfileSet;
