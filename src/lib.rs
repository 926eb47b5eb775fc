//! Order dashboard SDK for Rust.
//!
//! Loads a merged e-commerce order dataset (CSV, local or downloaded and
//! cached), queries it in-process via DuckDB, and turns the rows inside a
//! date range into a monthly order/revenue series, a payment method summary
//! and two headline metrics ready for a presentation layer to render.
//!
//! # Quick start
//!
//! ```no_run
//! use order_dashboard::{DateRange, OrderDashboard};
//! use chrono::NaiveDate;
//!
//! let dashboard = OrderDashboard::builder()
//!     .source_path("data_merged.csv")
//!     .build()
//!     .unwrap();
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2017, 12, 31).unwrap(),
//! )
//! .unwrap();
//! let snapshot = dashboard.snapshot(Some(range)).unwrap();
//! println!("{} orders, {}", snapshot.total_orders, snapshot.formatted_revenue);
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod connection;
pub mod currency;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod queries;
pub mod sql_builder;

pub use cache::CacheManager;
pub use config::DatasetSource;
pub use connection::Connection;
pub use currency::{format_currency, CurrencyConfig};
pub use dashboard::DashboardState;
pub use error::{DashboardError, Result};
pub use models::{
    DashboardSnapshot, DateRange, MonthlyBucket, OrderRecord, PaymentMethodSummary,
};
pub use sql_builder::SqlBuilder;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// OrderDashboardBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`OrderDashboard`].
///
/// Use [`OrderDashboard::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](OrderDashboardBuilder::build).
pub struct OrderDashboardBuilder {
    source: DatasetSource,
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    currency: CurrencyConfig,
}

impl Default for OrderDashboardBuilder {
    fn default() -> Self {
        Self {
            source: DatasetSource::default(),
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(120),
            currency: CurrencyConfig::default(),
        }
    }
}

impl OrderDashboardBuilder {
    /// Read the dataset from a local CSV file.
    ///
    /// Defaults to `data_merged.csv` in the working directory.
    pub fn source_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = DatasetSource::Path(path.as_ref().to_path_buf());
        self
    }

    /// Download the dataset from a URL (plain or `.gz` CSV) into the cache.
    pub fn source_url(mut self, url: &str) -> Self {
        self.source = DatasetSource::Url(url.to_string());
        self
    }

    /// Set a custom cache directory for downloaded datasets.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/order-dashboard` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Never download; only use previously cached datasets.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for downloads. Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Currency and locale used for the formatted revenue metric.
    ///
    /// Defaults to `AUD` in `en_AU`.
    pub fn currency(mut self, currency: CurrencyConfig) -> Self {
        self.currency = currency;
        self
    }

    /// Build the dashboard, initializing the cache and DuckDB connection.
    ///
    /// The dataset is not read until the first query.
    pub fn build(self) -> Result<OrderDashboard> {
        let cache = CacheManager::new(self.cache_dir, self.offline, self.timeout)?;
        let conn = Connection::new(cache, self.source)?;
        Ok(OrderDashboard {
            conn,
            currency: self.currency,
        })
    }
}

// ---------------------------------------------------------------------------
// OrderDashboard
// ---------------------------------------------------------------------------

/// The main entry point: a dataset connection plus display configuration.
///
/// Created via [`OrderDashboard::builder()`].
pub struct OrderDashboard {
    conn: Connection,
    currency: CurrencyConfig,
}

impl OrderDashboard {
    /// Create a new builder for configuring the dashboard.
    pub fn builder() -> OrderDashboardBuilder {
        OrderDashboardBuilder::default()
    }

    /// Access the order query interface.
    pub fn orders(&self) -> queries::orders::OrderQuery<'_> {
        queries::orders::OrderQuery::new(&self.conn)
    }

    pub fn currency(&self) -> &CurrencyConfig {
        &self.currency
    }

    /// Load the full validated dataset into a [`DashboardState`].
    ///
    /// The state starts with the dataset's full date span selected; callers
    /// narrow it with [`DashboardState::set_date_range`] without reloading.
    pub fn state(&self) -> Result<DashboardState> {
        let records = self.orders().records(None)?;
        Ok(DashboardState::new(records))
    }

    /// Compute the dashboard for one range (`None` = full dataset span).
    ///
    /// Every timestamp is validated once; filtering is then pushed down to
    /// DuckDB so only matching rows are loaded.
    pub fn snapshot(&self, range: Option<DateRange>) -> Result<DashboardSnapshot> {
        let orders = self.orders();
        let bounds = orders.date_bounds()?;
        let range = range.or(bounds);
        let records = orders.load_records(range.as_ref())?;
        DashboardState {
            date_range: range,
            dataset: records,
        }
        .snapshot(&self.currency)
    }

    /// Execute a raw SQL query against the DuckDB database.
    ///
    /// Registers the dataset first so `orders` is always queryable.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.ensure_orders()?;
        self.conn.execute(query, params)
    }

    /// Re-read the dataset on next access, re-downloading it if stale.
    ///
    /// Returns `true` if a remote dataset was stale and its cache cleared.
    pub fn refresh(&self) -> Result<bool> {
        let stale = match self.conn.source() {
            DatasetSource::Url(url) => self.conn.cache.borrow_mut().is_stale(url)?,
            DatasetSource::Path(_) => false,
        };
        if stale {
            self.conn.cache.borrow_mut().clear()?;
            tracing::info!("Dataset was stale; cache cleared");
        }
        self.conn.reset_views();
        Ok(stale)
    }

    /// Registered DuckDB table names. Empty until the first query.
    pub fn views(&self) -> Vec<String> {
        self.conn.views()
    }

    /// Consume the dashboard, dropping the HTTP client and DuckDB connection.
    pub fn close(self) {
        self.conn.cache.borrow_mut().close();
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for OrderDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.conn.source() {
            DatasetSource::Path(p) => p.display().to_string(),
            DatasetSource::Url(u) => u.clone(),
        };
        let views = self.conn.views();
        let cache = self.conn.cache.borrow();
        write!(
            f,
            "OrderDashboard(source={}, cache_dir={}, views=[{}], currency={}/{}, offline={})",
            source,
            cache.cache_dir.display(),
            views.join(", "),
            self.currency.currency_code(),
            self.currency.locale(),
            cache.offline
        )
    }
}
