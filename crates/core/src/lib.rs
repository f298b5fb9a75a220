//! Shared domain types, configuration and errors for the cohort
//! unit-economics pipeline.

pub mod config;
pub mod error;
pub mod period;
pub mod timestamp;
pub mod types;

pub use config::{AnalysisConfig, AppConfig, LifetimeBasis, OutputFormat};
pub use error::{CohortError, CohortResult};
pub use period::{Granularity, Period, WeekStart};
pub use types::{CohortKey, CostRecord, Order, Profile, Session, Tables, UserId};
