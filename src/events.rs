use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ErrorKind;
use crate::models::{HistoryEntry, SalesTransaction};

/// Notifications the dashboard core pushes to whatever renders it.
/// All methods default to no-ops so listeners implement only what they show.
pub trait DashboardEvents: Send {
    fn on_daily_summary_changed(&mut self, _total_amount: Decimal, _transaction_count: u64) {}

    fn on_history_changed(&mut self, _entries: &[HistoryEntry]) {}

    fn on_sale_recorded(&mut self, _transaction: &SalesTransaction) {}

    fn on_day_changed(&mut self, _date: NaiveDate) {}

    fn on_error(&mut self, _kind: ErrorKind, _message: &str) {}
}

pub struct NoopEvents;

impl DashboardEvents for NoopEvents {}
