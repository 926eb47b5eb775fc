use std::path::PathBuf;

/// File name the dashboard reads when no source is configured.
pub const DEFAULT_DATASET_FILE: &str = "data_merged.csv";

/// DuckDB table the dataset is registered as.
pub const ORDERS_TABLE: &str = "orders";

/// Synthetic 1-based row number column added on registration.
pub const ROW_NUM_COLUMN: &str = "row_num";

pub const DEFAULT_CURRENCY: &str = "AUD";
pub const DEFAULT_LOCALE: &str = "en_AU";

/// Columns every dataset must provide. Extra columns are ignored.
pub fn required_columns() -> [&'static str; 5] {
    [
        "order_id",
        "order_purchase_timestamp",
        "price",
        "payment_type",
        "payment_value",
    ]
}

/// Where the merged order dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// A CSV file already on disk.
    Path(PathBuf),
    /// A CSV (optionally `.gz`) file served over HTTP, cached locally.
    Url(String),
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Path(PathBuf::from(DEFAULT_DATASET_FILE))
    }
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("order-dashboard")
    } else {
        PathBuf::from(".order-dashboard-cache")
    }
}
