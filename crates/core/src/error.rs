use thiserror::Error;

pub type CohortResult<T> = Result<T, CohortError>;

#[derive(Error, Debug)]
pub enum CohortError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unparsable timestamp in {table} row {row}, column {column}: {value:?}")]
    Timestamp {
        table: &'static str,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for CohortError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
