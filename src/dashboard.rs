//! Explicit dashboard state: the loaded dataset plus the selected date range.
//!
//! Every derived series is recomputed from `dataset` on request; nothing is
//! cached between calls, so changing the range is just replacing a field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::currency::CurrencyConfig;
use crate::error::Result;
use crate::models::{DashboardSnapshot, DateRange, MonthlyBucket, OrderRecord, PaymentMethodSummary};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Inclusive filter; `None` selects every record.
    pub date_range: Option<DateRange>,
    pub dataset: Vec<OrderRecord>,
}

impl DashboardState {
    /// Wrap a dataset, selecting its full date span.
    pub fn new(dataset: Vec<OrderRecord>) -> Self {
        let date_range = dataset_bounds(&dataset);
        Self {
            date_range,
            dataset,
        }
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.date_range = range;
    }

    /// Inclusive first/last purchase dates of the whole dataset.
    pub fn bounds(&self) -> Option<DateRange> {
        dataset_bounds(&self.dataset)
    }

    /// Records inside the selected range.
    pub fn filtered(&self) -> impl Iterator<Item = &OrderRecord> + '_ {
        let range = self.date_range;
        self.dataset.iter().filter(move |r| match &range {
            Some(range) => range.contains(&r.order_purchase_timestamp),
            None => true,
        })
    }

    pub fn monthly_orders(&self) -> Result<Vec<MonthlyBucket>> {
        aggregate::monthly_orders(self.filtered())
    }

    pub fn payment_methods(&self) -> Result<Vec<PaymentMethodSummary>> {
        aggregate::payment_methods(self.filtered())
    }

    /// Headline metrics and both series for the current selection.
    pub fn snapshot(&self, currency: &CurrencyConfig) -> Result<DashboardSnapshot> {
        let monthly_orders = self.monthly_orders()?;
        let payment_methods = self.payment_methods()?;
        let total_orders = aggregate::total_orders(&monthly_orders);
        let total_revenue = aggregate::total_revenue(&monthly_orders)?;
        let formatted_revenue = currency.format(total_revenue)?;

        tracing::debug!(
            range = ?self.date_range,
            months = monthly_orders.len(),
            payment_types = payment_methods.len(),
            total_orders,
            total_revenue = %total_revenue,
            "Computed dashboard snapshot"
        );

        Ok(DashboardSnapshot {
            date_range: self.date_range,
            total_orders,
            total_revenue,
            formatted_revenue,
            monthly_orders,
            payment_methods,
        })
    }
}

fn dataset_bounds(dataset: &[OrderRecord]) -> Option<DateRange> {
    let mut dates = dataset.iter().map(|r| r.order_purchase_timestamp.date());
    let first = dates.next()?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d: NaiveDate| {
        (lo.min(d), hi.max(d))
    });
    Some(DateRange { start, end })
}
