#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field of a dataset row is missing or cannot be parsed.
    #[error("Data format error in row {row} (order_id={order_id}): field '{field}' {reason}")]
    DataFormat {
        row: i64,
        order_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
