use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::DateRange;

// ---------------------------------------------------------------------------
// MonthlyBucket: Orders and revenue for one calendar month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// Last day of the month the bucket covers.
    pub order_date: NaiveDate,
    /// Distinct `order_id` values purchased in the month.
    pub order_count: u64,
    /// Sum of line-item prices in the month.
    pub revenue: Decimal,
}

impl MonthlyBucket {
    /// `YYYY-MM` label for chart axes.
    pub fn month_label(&self) -> String {
        format!("{:04}-{:02}", self.order_date.year(), self.order_date.month())
    }
}

// ---------------------------------------------------------------------------
// PaymentMethodSummary: Transaction totals for one payment type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub payment_type: String,
    pub total_transaction_value: Decimal,
    /// Raw row count, not distinct orders.
    pub transaction_count: u64,
}

// ---------------------------------------------------------------------------
// DashboardSnapshot: Everything the presentation shell renders
// ---------------------------------------------------------------------------

/// Headline metrics and chart series for one date-range selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub date_range: Option<DateRange>,
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub formatted_revenue: String,
    pub monthly_orders: Vec<MonthlyBucket>,
    pub payment_methods: Vec<PaymentMethodSummary>,
}

impl DashboardSnapshot {
    /// True when the selected range matched no rows.
    pub fn is_empty(&self) -> bool {
        self.monthly_orders.is_empty() && self.payment_methods.is_empty()
    }
}
