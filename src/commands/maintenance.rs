use std::sync::Arc;

use crate::commands::{sales, App, StdinConfirm};
use crate::error::AppError;
use crate::format::{long_date, rupees};
use crate::receipt::Receipt;
use crate::reset::ResetOutcome;
use crate::rollover::RolloverMonitor;

/// Probes the store and makes sure today's record exists.
pub fn check(app: &App) -> Result<(), AppError> {
    let aggregate = app.session().initialize()?;
    println!("Connected");
    println!("{}: {}", long_date(aggregate.date), rupees(aggregate.total_amount));
    Ok(())
}

/// Wipes all sales data. `preapproved` answers that many confirmations up front.
pub fn reset(app: &App, preapproved: u8) -> Result<ResetOutcome, AppError> {
    let mut confirm = StdinConfirm::new(preapproved);
    let outcome = app.session().reset_all(&mut confirm)?;

    match &outcome {
        ResetOutcome::Cancelled => println!("Reset cancelled, nothing was deleted"),
        ResetOutcome::Completed(aggregate) => {
            println!("All data has been reset. Starting fresh for {}", long_date(aggregate.date))
        }
    }
    Ok(outcome)
}

const WATCH_HELP: &str = "Enter items as NAME:PRICE[xQTY], separated by commas.\n\
     Commands: summary, history, reset, help, quit";

/// Live register: reads sales from stdin while the rollover monitor runs.
pub fn watch(app: &App) -> Result<(), AppError> {
    app.session().initialize()?;

    let monitor = Arc::new(RolloverMonitor::new(app.shared_session(), app.config.rollover_period));
    tracing::info!(period_secs = monitor.period().as_secs(), "watching for day change");
    let handle = monitor.spawn();

    println!("{}", WATCH_HELP);
    // Read line by line without holding the stdin lock, the reset prompt reads it too.
    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading input");
                break;
            }
        }

        // Session errors are already printed by the listener.
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", WATCH_HELP),
            "summary" => app.session().refresh_views(),
            "history" => {
                if let Ok(entries) = app.session().history() {
                    super::print_history(&entries);
                }
            }
            "reset" => {
                let _ = reset(app, 0);
            }
            items => match sales::parse_items(items) {
                Ok(items) => {
                    let mut session = app.session();
                    if let Ok(transaction) = session.submit_sale(&items) {
                        let receipt = Receipt::for_transaction(&transaction, session.clock().local_now());
                        print!("{}", receipt.render());
                    }
                }
                Err(e) => eprintln!("{}", e),
            },
        }
    }

    handle.stop();
    Ok(())
}
