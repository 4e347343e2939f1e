use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt::Write;

use crate::format::{receipt_timestamp, rupees};
use crate::models::{LineItem, SalesTransaction};

const SHOP_TITLE: &str = "SALES RECEIPT";
const WIDTH: usize = 48;

/// Printable bill for one sale.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub issued_at: NaiveDateTime,
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

impl Receipt {
    pub fn for_transaction(transaction: &SalesTransaction, issued_at: NaiveDateTime) -> Self {
        Self {
            issued_at,
            items: transaction.items.clone(),
            total: transaction.total_amount,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(WIDTH);

        let _ = writeln!(out, "{:^width$}", SHOP_TITLE, width = WIDTH);
        let _ = writeln!(out, "{:^width$}", receipt_timestamp(self.issued_at), width = WIDTH);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:<18}{:>10}{:>6}{:>14}", "Item", "Price", "Qty", "Amount");
        let _ = writeln!(out, "{}", rule);

        for item in &self.items {
            let _ = writeln!(
                out,
                "{:<18}{:>10}{:>6}{:>14}",
                truncate(&item.name, 17),
                rupees(item.unit_price),
                item.quantity,
                item.line_total().map(rupees).unwrap_or_default()
            );
        }

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:<18}{:>30}", "TOTAL", rupees(self.total));
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:^width$}", "Thank you!", width = WIDTH);
        out
    }
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        name.to_string()
    } else {
        let mut s: String = name.chars().take(max - 1).collect();
        s.push('…');
        s
    }
}
