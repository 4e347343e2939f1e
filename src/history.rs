//! Read-only projections for the summary panel and the history list.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::gateway::{from_record, Collection, Filter, PersistenceGateway, Query};
use crate::models::{DailySummary, HistoryEntry};

pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Today's total (zero when no aggregate exists yet) and number of sales.
pub fn today_summary(gateway: &dyn PersistenceGateway, today: NaiveDate) -> Result<DailySummary> {
    let rows = gateway
        .find(
            Collection::DailySales,
            &Query::new()
                .select(&["total_amount"])
                .filter(Filter::eq("date", today.to_string()))
                .limit(1),
        )
        .map_err(AppError::persistence("loading today's total"))?;

    let total_amount = match rows.into_iter().next() {
        Some(row) => {
            #[derive(serde::Deserialize)]
            struct TotalOnly {
                total_amount: Decimal,
            }
            from_record::<TotalOnly>(row)
                .map_err(AppError::persistence("reading today's total"))?
                .total_amount
        }
        None => Decimal::ZERO,
    };

    let transaction_count = gateway
        .count(
            Collection::SalesTransactions,
            &[Filter::eq("sale_date", today.to_string())],
        )
        .map_err(AppError::persistence("counting today's sales"))?;

    Ok(DailySummary {
        date: today,
        total_amount,
        transaction_count,
    })
}

/// Most recent aggregates by date, newest first, excluding today.
pub fn recent_history(
    gateway: &dyn PersistenceGateway,
    today: NaiveDate,
    limit: usize,
) -> Result<Vec<HistoryEntry>> {
    let rows = gateway
        .find(
            Collection::DailySales,
            &Query::new()
                .select(&["date", "total_amount"])
                .order_by("date", false)
                .limit(limit),
        )
        .map_err(AppError::persistence("loading sales history"))?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let entry: HistoryEntry = from_record(row).map_err(AppError::persistence("reading sales history"))?;
        if entry.date != today {
            entries.push(entry);
        }
    }
    Ok(entries)
}
