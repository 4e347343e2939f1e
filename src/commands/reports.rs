use crate::commands::{print_history, App};
use crate::error::AppError;
use crate::format::{long_date, rupees};
use crate::models::{DailySummary, HistoryEntry};

/// Prints today's total and the number of sales behind it.
pub fn summary(app: &App) -> Result<DailySummary, AppError> {
    let mut session = app.session();
    session.check_connection()?;

    let summary = session.today_summary()?;
    println!("{}", long_date(summary.date));
    println!("Today's sales: {}", rupees(summary.total_amount));
    println!("Transactions:  {}", summary.transaction_count);
    Ok(summary)
}

/// Prints previous days' totals, newest first.
pub fn history(app: &App) -> Result<Vec<HistoryEntry>, AppError> {
    let mut session = app.session();
    session.check_connection()?;

    let entries = session.history()?;
    print_history(&entries);
    Ok(entries)
}
