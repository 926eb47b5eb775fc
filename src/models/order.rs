use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// DateRange: Inclusive calendar-date filter
// ---------------------------------------------------------------------------

/// An inclusive `[start, end]` range of calendar dates.
///
/// A timestamp is inside the range when its date falls on or between the two
/// bounds, so every instant of `end` is included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidArgument(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Range covering a single day.
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        let date = ts.date();
        date >= self.start && date <= self.end
    }

    /// First date after the range, for half-open SQL comparisons.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end.succ_opt().unwrap_or(NaiveDate::MAX)
    }
}

// ---------------------------------------------------------------------------
// RawOrderRow: Untyped dataset row as read from DuckDB
// ---------------------------------------------------------------------------

/// One dataset row with every field still in its textual form.
///
/// The dataset is registered with all columns as `VARCHAR`, so blanks arrive
/// as `None` and nothing has been coerced yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrderRow {
    pub row_num: i64,
    pub order_id: Option<String>,
    pub order_purchase_timestamp: Option<String>,
    pub price: Option<String>,
    pub payment_type: Option<String>,
    pub payment_value: Option<String>,
}

impl RawOrderRow {
    /// Validate every required field and produce a typed record.
    ///
    /// Fails on the first missing or unparseable field with
    /// [`DashboardError::DataFormat`] naming the field and the row.
    pub fn parse(self) -> Result<OrderRecord> {
        let row = self.row_num;
        let order_id = required_text(row, "?", "order_id", self.order_id)?;

        let ts_text = required_text(
            row,
            &order_id,
            "order_purchase_timestamp",
            self.order_purchase_timestamp,
        )?;
        let order_purchase_timestamp = parse_timestamp(&ts_text).ok_or_else(|| {
            format_error(
                row,
                &order_id,
                "order_purchase_timestamp",
                format!("is not a valid timestamp: '{}'", ts_text),
            )
        })?;

        let price = required_amount(row, &order_id, "price", self.price)?;
        let payment_type = required_text(row, &order_id, "payment_type", self.payment_type)?;
        let payment_value =
            required_amount(row, &order_id, "payment_value", self.payment_value)?;

        Ok(OrderRecord {
            order_id,
            order_purchase_timestamp,
            price,
            payment_type,
            payment_value,
        })
    }
}

// ---------------------------------------------------------------------------
// OrderRecord: One validated line item
// ---------------------------------------------------------------------------

/// One line item of a purchase, with its payment instance.
///
/// `order_id` repeats across rows when an order has several items or
/// payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub order_purchase_timestamp: NaiveDateTime,
    pub price: Decimal,
    pub payment_type: String,
    pub payment_value: Decimal,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a purchase timestamp. Date-only values mean midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a monetary amount, accepting plain and scientific notation.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn format_error(row: i64, order_id: &str, field: &'static str, reason: String) -> DashboardError {
    tracing::warn!(row, order_id, field, %reason, "Rejected dataset row");
    DashboardError::DataFormat {
        row,
        order_id: order_id.to_string(),
        field,
        reason,
    }
}

fn required_text(
    row: i64,
    order_id: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format_error(row, order_id, field, "is missing".to_string())),
    }
}

fn required_amount(
    row: i64,
    order_id: &str,
    field: &'static str,
    value: Option<String>,
) -> Result<Decimal> {
    let text = required_text(row, order_id, field, value)?;
    parse_amount(&text).ok_or_else(|| {
        format_error(
            row,
            order_id,
            field,
            format!("is not numeric: '{}'", text),
        )
    })
}
