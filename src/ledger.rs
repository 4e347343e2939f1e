use rust_decimal::Decimal;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::gateway::{from_record, to_record, Collection, PersistenceGateway};
use crate::models::{CandidateItem, LineItem, NewSalesTransaction, SalesTransaction};

/// Validates and persists individual sales.
pub struct SalesLedger {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
}

impl SalesLedger {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    /// Keeps only items with a name, a positive price and a quantity of at least one.
    pub fn accept_items(candidates: &[CandidateItem]) -> Vec<LineItem> {
        candidates.iter().filter_map(CandidateItem::accept).collect()
    }

    /// Exact sum of the line totals, or `None` on overflow.
    pub fn total_of(items: &[LineItem]) -> Option<Decimal> {
        items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_total()?))
    }

    /// Persists one transaction dated today.
    ///
    /// Fails with [`AppError::Validation`] without touching the store when no
    /// candidate survives validation.
    pub fn record_sale(&self, candidates: &[CandidateItem]) -> Result<SalesTransaction> {
        let items = Self::accept_items(candidates);
        if items.is_empty() {
            return Err(AppError::Validation(
                "Please add at least one valid item".to_string(),
            ));
        }

        let dropped = candidates.len() - items.len();
        if dropped > 0 {
            tracing::debug!(dropped, "ignored invalid line items");
        }

        let total_amount = Self::total_of(&items)
            .ok_or_else(|| AppError::Validation("Sale amount too large".to_string()))?;

        let new_tx = NewSalesTransaction {
            sale_date: self.clock.today(),
            total_amount,
            items,
            created_at: self.clock.now(),
        };

        let record = to_record(&new_tx).map_err(AppError::persistence("encoding sale"))?;
        let stored = self
            .gateway
            .insert(Collection::SalesTransactions, record)
            .map_err(AppError::persistence("saving sale"))?;
        let transaction: SalesTransaction =
            from_record(stored).map_err(AppError::persistence("reading saved sale"))?;

        tracing::info!(
            id = %transaction.id,
            total = %transaction.total_amount,
            items = transaction.items.len(),
            "sale recorded"
        );
        Ok(transaction)
    }
}
