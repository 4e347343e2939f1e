//! Display formatting for the single supported locale (rupees, en-IN dates).

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

/// `₹1234.50` style amount, rounded half away from zero to two places.
pub fn rupees(amount: Decimal) -> String {
    format!("₹{:.2}", round_money(amount))
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `Sunday, 18 October 2026`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

/// `18 Oct 2026`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

/// `18/10/2026, 2:05:09 pm`
pub fn receipt_timestamp(at: NaiveDateTime) -> String {
    at.format("%d/%m/%Y, %-I:%M:%S %P").to_string()
}
