//! Order queries against the DuckDB `orders` table.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{self, ORDERS_TABLE, ROW_NUM_COLUMN};
use crate::error::{DashboardError, Result};
use crate::models::{parse_timestamp, DateRange, OrderRecord, RawOrderRow};
use crate::sql_builder::SqlBuilder;

const TIMESTAMP_COLUMN: &str = "order_purchase_timestamp";

/// A purchase timestamp as text, next to the date DuckDB reads from it.
#[derive(Debug, Deserialize)]
struct TimestampRow {
    row_num: i64,
    order_id: Option<String>,
    order_purchase_timestamp: Option<String>,
    sql_date: Option<String>,
}

// ---------------------------------------------------------------------------
// OrderQuery
// ---------------------------------------------------------------------------

/// Query interface over the merged order dataset.
pub struct OrderQuery<'a> {
    conn: &'a crate::connection::Connection,
}

impl<'a> OrderQuery<'a> {
    /// Create a new `OrderQuery` bound to the given connection.
    pub fn new(conn: &'a crate::connection::Connection) -> Self {
        Self { conn }
    }

    /// Number of rows in the dataset.
    pub fn count(&self) -> Result<i64> {
        self.conn.ensure_orders()?;

        let (sql, params) = SqlBuilder::new(ORDERS_TABLE)
            .select(&["COUNT(*) AS n"])
            .build();
        let value = self.conn.execute_scalar(&sql, &params)?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Load validated records, optionally restricted to `range`.
    ///
    /// Every timestamp in the dataset is validated first, so a bad row
    /// outside the range still fails the call instead of being filtered
    /// away. Any other malformed field in the returned rows fails with
    /// [`DashboardError::DataFormat`].
    pub fn records(&self, range: Option<&DateRange>) -> Result<Vec<OrderRecord>> {
        self.conn.ensure_orders()?;
        self.scan_timestamps()?;
        self.load_records(range)
    }

    /// Load and parse rows inside `range` without the whole-dataset scan.
    ///
    /// Only sound after [`scan_timestamps`](Self::scan_timestamps) has
    /// succeeded on the current registration.
    pub(crate) fn load_records(&self, range: Option<&DateRange>) -> Result<Vec<OrderRecord>> {
        self.conn.ensure_orders()?;

        let mut columns = vec![ROW_NUM_COLUMN];
        columns.extend(config::required_columns());

        let mut qb = SqlBuilder::new(ORDERS_TABLE);
        qb.select(&columns);
        if let Some(r) = range {
            qb.where_date_range(TIMESTAMP_COLUMN, r);
        }
        qb.order_by(&["row_num ASC"]);

        let (sql, params) = qb.build();
        let rows: Vec<RawOrderRow> = self.conn.execute_into(&sql, &params)?;
        let records = rows
            .into_iter()
            .map(RawOrderRow::parse)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            rows = records.len(),
            range = ?range,
            "Loaded order records"
        );
        Ok(records)
    }

    /// Fail on the first row whose timestamp is missing or invalid.
    pub fn check_timestamps(&self) -> Result<()> {
        self.conn.ensure_orders()?;
        self.scan_timestamps().map(|_| ())
    }

    /// Inclusive range from the first to the last purchase date.
    ///
    /// Validates every timestamp on the way. Returns `None` for an empty
    /// dataset. Used to bound date pickers.
    pub fn date_bounds(&self) -> Result<Option<DateRange>> {
        self.conn.ensure_orders()?;
        self.scan_timestamps()
    }

    /// Distinct payment types present in the dataset, sorted.
    pub fn payment_types(&self) -> Result<Vec<String>> {
        self.conn.ensure_orders()?;

        let (sql, params) = SqlBuilder::new(ORDERS_TABLE)
            .select(&["payment_type"])
            .distinct()
            .where_not_null("payment_type")
            .order_by(&["payment_type ASC"])
            .build();

        let rows = self.conn.execute(&sql, &params)?;
        Ok(rows
            .into_iter()
            .filter_map(|r| {
                r.get("payment_type")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .collect())
    }

    /// Parse every timestamp with [`parse_timestamp`] and return the bounds.
    ///
    /// A value is accepted only when DuckDB reads the same calendar date
    /// from it, so the SQL range filter in [`load_records`](Self::load_records)
    /// selects exactly the rows [`DateRange::contains`] would.
    fn scan_timestamps(&self) -> Result<Option<DateRange>> {
        let (sql, params) = SqlBuilder::new(ORDERS_TABLE)
            .select(&[
                ROW_NUM_COLUMN,
                "order_id",
                TIMESTAMP_COLUMN,
                "CAST(CAST(TRY_CAST(order_purchase_timestamp AS TIMESTAMP) AS DATE) AS VARCHAR) AS sql_date",
            ])
            .order_by(&["row_num ASC"])
            .build();
        let rows: Vec<TimestampRow> = self.conn.execute_into(&sql, &params)?;

        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
        for row in &rows {
            let text = row
                .order_purchase_timestamp
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty());
            let Some(text) = text else {
                return Err(timestamp_error(row, "is missing".to_string()));
            };
            let sql_date = row
                .sql_date
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            let date = parse_timestamp(text)
                .map(|ts| ts.date())
                .filter(|d| sql_date == Some(*d))
                .ok_or_else(|| {
                    timestamp_error(row, format!("is not a valid timestamp: '{}'", text))
                })?;
            bounds = Some(match bounds {
                None => (date, date),
                Some((lo, hi)) => (lo.min(date), hi.max(date)),
            });
        }

        tracing::debug!(rows = rows.len(), "Validated purchase timestamps");
        Ok(bounds.map(|(start, end)| DateRange { start, end }))
    }
}

fn timestamp_error(row: &TimestampRow, reason: String) -> DashboardError {
    let order_id = row
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or("?")
        .to_string();
    tracing::warn!(row = row.row_num, order_id = %order_id, %reason, "Dataset has an invalid timestamp");
    DashboardError::DataFormat {
        row: row.row_num,
        order_id,
        field: TIMESTAMP_COLUMN,
        reason,
    }
}
