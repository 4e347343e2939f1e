//! Irreversible wipe of all sales data.
//!
//! On stores without a transactional delete the wipe is two statements:
//! transactions first, then daily totals. If the second fails the store is
//! left with aggregates but no transactions; the error says so and the
//! operator is expected to run the whole reset again.

use crate::error::{AppError, Result};
use crate::gateway::{Collection, Filter, PersistenceGateway};
use crate::models::DailyAggregate;

pub const FIRST_WARNING: &str = "WARNING: This will permanently delete ALL sales data.\n\
     This includes all daily sales records, all transaction history and all historical data.\n\
     This action CANNOT be undone!\n\
     Are you sure you want to proceed?";

pub const FINAL_WARNING: &str = "FINAL WARNING!\n\
     This is your last chance to cancel.\n\
     Confirm to DELETE ALL DATA permanently.";

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResetOutcome {
    /// The operator declined one of the confirmations. Nothing was deleted.
    Cancelled,
    /// Everything was deleted and today's record was created afresh.
    Completed(DailyAggregate),
}

/// Both confirmations must be given, in order.
pub fn confirmed(confirm: &mut dyn Confirm) -> bool {
    confirm.confirm(FIRST_WARNING) && confirm.confirm(FINAL_WARNING)
}

pub(crate) fn purge_all(gateway: &dyn PersistenceGateway) -> Result<()> {
    const COLLECTIONS: [Collection; 2] = [Collection::SalesTransactions, Collection::DailySales];

    if gateway
        .delete_all_atomically(&COLLECTIONS)
        .map_err(AppError::persistence("resetting sales data"))?
    {
        return Ok(());
    }

    gateway
        .delete_where(Collection::SalesTransactions, &Filter::all_rows())
        .map_err(AppError::persistence("deleting sales transactions"))?;

    gateway
        .delete_where(Collection::DailySales, &Filter::all_rows())
        .map_err(AppError::persistence(
            "sales transactions were deleted but daily totals were not (store is partially reset, run the reset again)",
        ))?;

    Ok(())
}
