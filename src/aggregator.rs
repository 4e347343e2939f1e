//! Daily aggregate bookkeeping.
//!
//! Exactly one `daily_sales` row exists per calendar date. The aggregator
//! keeps the current day's row in memory as the session's source of truth
//! and updates it by id after each recorded sale.
//!
//! When the store has no atomic increment, the update is a read-modify-write
//! against the cached total. Two registers writing the same day can lose an
//! increment; the dashboard assumes a single register.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::gateway::{from_record, to_record, Collection, Filter, GatewayError, PersistenceGateway, Query, Record};
use crate::models::{DailyAggregate, NewDailyAggregate};

/// What a rollover check found.
#[derive(Debug, Clone, PartialEq)]
pub enum DayCheck {
    /// Nothing cached yet; initialization happens elsewhere.
    NotInitialized,
    Unchanged,
    RolledOver(DailyAggregate),
}

pub struct DailyAggregator {
    gateway: Arc<dyn PersistenceGateway>,
    clock: Arc<dyn Clock>,
    cached: Option<DailyAggregate>,
}

impl DailyAggregator {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, clock: Arc<dyn Clock>) -> Self {
        Self {
            gateway,
            clock,
            cached: None,
        }
    }

    pub fn cached(&self) -> Option<&DailyAggregate> {
        self.cached.as_ref()
    }

    pub fn clear(&mut self) {
        self.cached = None;
    }

    /// Looks up today's aggregate, creating it with a zero total if absent.
    pub fn ensure_today_record(&mut self) -> Result<DailyAggregate> {
        let today = self.clock.today();
        self.ensure_record(today)
    }

    fn ensure_record(&mut self, date: NaiveDate) -> Result<DailyAggregate> {
        let aggregate = match self.lookup(date)? {
            Some(existing) => existing,
            None => self.create(date)?,
        };
        self.cached = Some(aggregate.clone());
        Ok(aggregate)
    }

    fn lookup(&self, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        let rows = self
            .gateway
            .find(
                Collection::DailySales,
                &Query::new()
                    .filter(Filter::eq("date", date.to_string()))
                    .limit(1),
            )
            .map_err(AppError::persistence(format!("looking up daily total for {}", date)))?;

        rows.into_iter()
            .next()
            .map(from_record::<DailyAggregate>)
            .transpose()
            .map_err(AppError::persistence("reading daily total"))
    }

    fn create(&self, date: NaiveDate) -> Result<DailyAggregate> {
        let new_row = NewDailyAggregate {
            date,
            total_amount: Decimal::ZERO,
            updated_at: self.clock.now(),
        };
        let record = to_record(&new_row).map_err(AppError::persistence("encoding daily total"))?;

        match self.gateway.insert(Collection::DailySales, record) {
            Ok(stored) => {
                tracing::info!(%date, "created daily sales record");
                from_record(stored).map_err(AppError::persistence("reading new daily total"))
            }
            // Another session created the row between our lookup and insert.
            Err(GatewayError::Conflict(_)) => self.lookup(date)?.ok_or_else(|| AppError::Persistence {
                context: format!("creating daily total for {}", date),
                source: GatewayError::NotFound(format!("daily_sales date={}", date)),
            }),
            Err(e) => Err(AppError::persistence(format!("creating daily total for {}", date))(e)),
        }
    }

    /// Adds a just-recorded sale amount to today's aggregate.
    pub fn apply_delta(&mut self, amount: Decimal) -> Result<DailyAggregate> {
        let today = self.clock.today();
        self.apply_delta_for(today, amount)
    }

    /// Adds `amount` to the aggregate of `date`, the sale date of the
    /// transaction being applied. On failure the cache keeps its previous value.
    pub fn apply_delta_for(&mut self, date: NaiveDate, amount: Decimal) -> Result<DailyAggregate> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "sale amount must be positive, got {}",
                amount
            )));
        }

        let current = match &self.cached {
            Some(agg) if agg.date == date => agg.clone(),
            _ => self.ensure_record(date)?,
        };

        let new_total = current.total_amount.checked_add(amount).ok_or_else(|| {
            AppError::Validation(format!("daily total for {} would exceed the largest amount", date))
        })?;

        let stamp = serde_json::to_value(self.clock.now())
            .map_err(|e| GatewayError::Decode(e.to_string()))
            .map_err(AppError::persistence("encoding timestamp"))?;
        let mut patch = Record::new();
        patch.insert("updated_at".to_string(), stamp);

        let stored = match self
            .gateway
            .increment(Collection::DailySales, &current.id, "total_amount", amount, patch.clone())
            .map_err(AppError::persistence("updating daily total"))?
        {
            Some(stored) => stored,
            None => {
                patch.insert("total_amount".to_string(), Value::String(new_total.to_string()));
                self.gateway
                    .update(Collection::DailySales, &current.id, patch)
                    .map_err(AppError::persistence("updating daily total"))?
            }
        };

        let updated: DailyAggregate =
            from_record(stored).map_err(AppError::persistence("reading updated daily total"))?;
        tracing::debug!(date = %updated.date, total = %updated.total_amount, "daily total updated");
        self.cached = Some(updated.clone());
        Ok(updated)
    }

    /// Re-synchronizes the cache when the local date has moved past the cached
    /// aggregate's date.
    pub fn roll_over_if_needed(&mut self) -> Result<DayCheck> {
        let today = self.clock.today();
        let cached_date = match &self.cached {
            None => return Ok(DayCheck::NotInitialized),
            Some(agg) => agg.date,
        };
        if cached_date == today {
            return Ok(DayCheck::Unchanged);
        }

        tracing::info!(from = %cached_date, to = %today, "day changed");
        self.cached = None;
        let aggregate = self.ensure_record(today)?;
        Ok(DayCheck::RolledOver(aggregate))
    }
}
