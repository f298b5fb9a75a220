use crate::error::{CohortError, CohortResult};
use crate::period::WeekStart;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `COHORT_METRICS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_visits_path")]
    pub visits_path: PathBuf,
    #[serde(default = "default_orders_path")]
    pub orders_path: PathBuf,
    #[serde(default = "default_costs_path")]
    pub costs_path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

/// How `lifetime_days` is measured between first touch and an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeBasis {
    /// Difference of calendar dates.
    #[default]
    CalendarDays,
    /// Whole 24-hour periods between the two timestamps.
    ElapsedDays,
}

/// Longest attribution or retention window accepted, in days.
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Attribution horizon; events with `lifetime_days <= horizon_days - 1` count.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    #[serde(default = "default_retention_from_day")]
    pub retention_from_day: i64,
    #[serde(default = "default_retention_to_day")]
    pub retention_to_day: i64,
    #[serde(default)]
    pub week_start: WeekStart,
    #[serde(default)]
    pub lifetime_basis: LifetimeBasis,
    #[serde(default = "default_payback_max_week")]
    pub payback_max_week: i64,
    #[serde(default = "default_bad_channel_week")]
    pub bad_channel_week: i64,
    #[serde(default = "default_heatmap_weeks")]
    pub heatmap_weeks: i64,
    /// Overrides the latest observed event timestamp for maturity checks.
    #[serde(default, deserialize_with = "crate::timestamp::optional::deserialize")]
    pub max_acq_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    pub fn writes_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    pub fn writes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub print: bool,
}

// Default functions
fn default_visits_path() -> PathBuf {
    PathBuf::from("data/visits.csv")
}
fn default_orders_path() -> PathBuf {
    PathBuf::from("data/orders.csv")
}
fn default_costs_path() -> PathBuf {
    PathBuf::from("data/costs.csv")
}
fn default_delimiter() -> char {
    ','
}
fn default_horizon_days() -> u32 {
    28
}
fn default_retention_from_day() -> i64 {
    14
}
fn default_retention_to_day() -> i64 {
    28
}
fn default_payback_max_week() -> i64 {
    10
}
fn default_bad_channel_week() -> i64 {
    5
}
fn default_heatmap_weeks() -> i64 {
    8
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            visits_path: default_visits_path(),
            orders_path: default_orders_path(),
            costs_path: default_costs_path(),
            delimiter: default_delimiter(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            retention_from_day: default_retention_from_day(),
            retention_to_day: default_retention_to_day(),
            week_start: WeekStart::default(),
            lifetime_basis: LifetimeBasis::default(),
            payback_max_week: default_payback_max_week(),
            bad_channel_week: default_bad_channel_week(),
            heatmap_weeks: default_heatmap_weeks(),
            max_acq_date: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            print: false,
        }
    }
}

impl AnalysisConfig {
    /// Largest `lifetime_days` still inside the attribution horizon.
    pub fn horizon_last_day(&self) -> i64 {
        i64::from(self.horizon_days) - 1
    }

    pub fn validate(&self) -> CohortResult<()> {
        if self.horizon_days == 0 {
            return Err(CohortError::Config("horizon_days must be at least 1".into()));
        }
        if i64::from(self.horizon_days) > MAX_WINDOW_DAYS {
            return Err(CohortError::Config(format!(
                "horizon_days {} exceeds the {MAX_WINDOW_DAYS} day limit",
                self.horizon_days
            )));
        }
        if self.retention_from_day < 0 || self.retention_from_day > self.retention_to_day {
            return Err(CohortError::Config(format!(
                "retention window [{}, {}] is empty or negative",
                self.retention_from_day, self.retention_to_day
            )));
        }
        if self.retention_to_day > MAX_WINDOW_DAYS {
            return Err(CohortError::Config(format!(
                "retention_to_day {} exceeds the {MAX_WINDOW_DAYS} day limit",
                self.retention_to_day
            )));
        }
        if self.payback_max_week < 1 || self.bad_channel_week < 1 || self.heatmap_weeks < 1 {
            return Err(CohortError::Config(
                "week indices are 1-based and must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("COHORT_METRICS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> CohortResult<()> {
        if !self.input.delimiter.is_ascii() {
            return Err(CohortError::Config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.input.delimiter
            )));
        }
        self.analysis.validate()
    }
}
