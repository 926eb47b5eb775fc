//! Pure aggregations over order records.
//!
//! Both aggregators accept anything that iterates `&OrderRecord`, so a
//! date-filtered view can be passed without cloning. Amounts are summed as
//! [`Decimal`], which makes every result independent of row order.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{DashboardError, Result};
use crate::models::{MonthlyBucket, OrderRecord, PaymentMethodSummary};

/// Group records by purchase month.
///
/// Returns one bucket per month that has at least one record, ascending.
/// `order_count` counts distinct order ids; `revenue` sums every row's price.
/// Fails with [`DashboardError::Overflow`] if a sum leaves `Decimal` range.
pub fn monthly_orders<'a, I>(records: I) -> Result<Vec<MonthlyBucket>>
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut months: BTreeMap<NaiveDate, (HashSet<&'a str>, Decimal)> = BTreeMap::new();

    for record in records {
        let key = month_end(record.order_purchase_timestamp.date());
        let (orders, revenue) = months.entry(key).or_default();
        orders.insert(record.order_id.as_str());
        *revenue = checked_sum(*revenue, record.price, "price")?;
    }

    Ok(months
        .into_iter()
        .map(|(order_date, (orders, revenue))| MonthlyBucket {
            order_date,
            order_count: orders.len() as u64,
            revenue,
        })
        .collect())
}

/// Group records by payment type, sorted by payment type.
///
/// `transaction_count` is the number of rows, not of distinct orders.
pub fn payment_methods<'a, I>(records: I) -> Result<Vec<PaymentMethodSummary>>
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut methods: BTreeMap<&'a str, (Decimal, u64)> = BTreeMap::new();

    for record in records {
        let (total, count) = methods.entry(record.payment_type.as_str()).or_default();
        *total = checked_sum(*total, record.payment_value, "payment_value")?;
        *count += 1;
    }

    Ok(methods
        .into_iter()
        .map(|(payment_type, (total_transaction_value, transaction_count))| {
            PaymentMethodSummary {
                payment_type: payment_type.to_string(),
                total_transaction_value,
                transaction_count,
            }
        })
        .collect())
}

/// Sum of monthly distinct order counts.
///
/// An order whose rows span two months counts once in each.
pub fn total_orders(buckets: &[MonthlyBucket]) -> u64 {
    buckets.iter().map(|b| b.order_count).sum()
}

pub fn total_revenue(buckets: &[MonthlyBucket]) -> Result<Decimal> {
    buckets
        .iter()
        .try_fold(Decimal::ZERO, |acc, b| checked_sum(acc, b.revenue, "revenue"))
}

fn checked_sum(acc: Decimal, amount: Decimal, field: &str) -> Result<Decimal> {
    acc.checked_add(amount).ok_or_else(|| {
        DashboardError::Overflow(format!("sum of {} exceeds the decimal range", field))
    })
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}
