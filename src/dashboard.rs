//! One register session: ledger, aggregator and the listener that renders them.

use std::sync::Arc;

use crate::aggregator::{DailyAggregator, DayCheck};
use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::events::DashboardEvents;
use crate::gateway::{Collection, PersistenceGateway, Query};
use crate::history::{self, DEFAULT_HISTORY_LIMIT};
use crate::ledger::SalesLedger;
use crate::models::{CandidateItem, DailyAggregate, DailySummary, HistoryEntry, SalesTransaction};
use crate::reset::{self, Confirm, ResetOutcome};

pub struct Dashboard {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    ledger: SalesLedger,
    aggregator: DailyAggregator,
    events: Box<dyn DashboardEvents>,
    history_limit: usize,
}

impl Dashboard {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        clock: Arc<dyn Clock>,
        events: Box<dyn DashboardEvents>,
    ) -> Self {
        Self {
            ledger: SalesLedger::new(gateway.clone(), clock.clone()),
            aggregator: DailyAggregator::new(gateway.clone(), clock.clone()),
            gateway,
            clock,
            events,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn aggregator(&self) -> &DailyAggregator {
        &self.aggregator
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Startup sequence: probe the store, make sure today's record exists,
    /// then publish the summary and history.
    pub fn initialize(&mut self) -> Result<DailyAggregate> {
        self.check_connection()?;
        let result = self.aggregator.ensure_today_record();
        let aggregate = self.surface(result)?;
        self.refresh_views();
        Ok(aggregate)
    }

    /// Cheapest possible read against `daily_sales`.
    pub fn check_connection(&mut self) -> Result<()> {
        let result = self
            .gateway
            .find(Collection::DailySales, &Query::new().select(&["id"]).limit(1))
            .map(|_| ())
            .map_err(AppError::persistence("connecting to the sales database"));
        self.surface(result)
    }

    /// Records a sale and adds it to the day's total, in that order.
    ///
    /// When the aggregate update fails the transaction is already stored;
    /// the error says so and nothing is retried. A sale that lands on a later
    /// date than the cached aggregate counts as the day change.
    pub fn submit_sale(&mut self, candidates: &[CandidateItem]) -> Result<SalesTransaction> {
        let result = self.ledger.record_sale(candidates);
        let transaction = self.surface(result)?;
        let previous_date = self.aggregator.cached().map(|agg| agg.date);

        let saved = |context: String| {
            format!(
                "sale {} was saved but the daily total was not updated ({})",
                transaction.id, context
            )
        };
        let result = self
            .aggregator
            .apply_delta_for(transaction.sale_date, transaction.total_amount)
            .map_err(|e| match e {
                AppError::Persistence { context, source } => AppError::Persistence {
                    context: saved(context),
                    source,
                },
                AppError::Validation(message) => AppError::Validation(saved(message)),
                other => other,
            });
        self.surface(result)?;

        self.events.on_sale_recorded(&transaction);
        match previous_date {
            Some(previous) if previous < transaction.sale_date => {
                tracing::info!(from = %previous, to = %transaction.sale_date, "day changed");
                self.events.on_day_changed(transaction.sale_date);
                self.refresh_views();
            }
            _ => self.refresh_summary(),
        }
        Ok(transaction)
    }

    /// One rollover check: if the local date moved past the cached
    /// aggregate's date, re-initialize and refresh everything that shows a date.
    pub fn check_day_change(&mut self) -> Result<DayCheck> {
        let result = self.aggregator.roll_over_if_needed();
        let check = self.surface(result)?;
        if let DayCheck::RolledOver(aggregate) = &check {
            self.events.on_day_changed(aggregate.date);
            self.refresh_views();
        }
        Ok(check)
    }

    /// Deletes every transaction and every daily total after two confirmations,
    /// then recreates today's record.
    pub fn reset_all(&mut self, confirm: &mut dyn Confirm) -> Result<ResetOutcome> {
        if !reset::confirmed(confirm) {
            tracing::info!("reset cancelled by operator");
            return Ok(ResetOutcome::Cancelled);
        }

        tracing::warn!("deleting all sales data");
        let result = reset::purge_all(self.gateway.as_ref());
        self.surface(result)?;

        self.aggregator.clear();
        let result = self.aggregator.ensure_today_record();
        let aggregate = self.surface(result)?;
        self.refresh_views();

        tracing::info!("all sales data reset");
        Ok(ResetOutcome::Completed(aggregate))
    }

    pub fn today_summary(&mut self) -> Result<DailySummary> {
        let result = self.load_summary();
        self.surface(result)
    }

    pub fn history(&mut self) -> Result<Vec<HistoryEntry>> {
        let result = self.load_history();
        self.surface(result)
    }

    /// Publishes summary and history. Failures are reported, not returned:
    /// the operation that triggered the refresh already succeeded.
    pub fn refresh_views(&mut self) {
        self.refresh_summary();
        if let Ok(entries) = self.history() {
            self.events.on_history_changed(&entries);
        }
    }

    fn refresh_summary(&mut self) {
        if let Ok(summary) = self.today_summary() {
            self.events
                .on_daily_summary_changed(summary.total_amount, summary.transaction_count);
        }
    }

    fn load_summary(&self) -> Result<DailySummary> {
        history::today_summary(self.gateway.as_ref(), self.clock.today())
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        history::recent_history(self.gateway.as_ref(), self.clock.today(), self.history_limit)
    }

    /// Every failure reaches the listener before it propagates.
    fn surface<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::error!(kind = ?e.kind(), "{}", e);
            self.events.on_error(e.kind(), &e.to_string());
        }
        result
    }
}
