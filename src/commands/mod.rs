pub mod maintenance;
pub mod reports;
pub mod sales;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::{AppError, ErrorKind};
use crate::events::DashboardEvents;
use crate::format::{long_date, rupees, short_date};
use crate::models::{HistoryEntry, SalesTransaction};
use crate::reset::Confirm;

/// Shared state handed to every command.
pub struct App {
    pub config: Config,
    session: Arc<Mutex<Dashboard>>,
}

impl App {
    /// Connects to the configured store and creates the session.
    /// Nothing is read from the store yet.
    pub fn connect(config: Config, events: Box<dyn DashboardEvents>) -> Result<Self, AppError> {
        let gateway = config.connect()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let dashboard = Dashboard::new(gateway, clock, events).with_history_limit(config.history_limit);
        Ok(Self {
            config,
            session: Arc::new(Mutex::new(dashboard)),
        })
    }

    pub fn session(&self) -> MutexGuard<'_, Dashboard> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn shared_session(&self) -> Arc<Mutex<Dashboard>> {
        self.session.clone()
    }
}

/// Prints dashboard notifications to the terminal. One-shot commands only
/// want errors; the live view wants everything.
pub struct ConsoleEvents {
    live: bool,
}

impl ConsoleEvents {
    pub fn quiet() -> Self {
        Self { live: false }
    }

    pub fn live() -> Self {
        Self { live: true }
    }
}

impl DashboardEvents for ConsoleEvents {
    fn on_daily_summary_changed(&mut self, total_amount: Decimal, transaction_count: u64) {
        if self.live {
            println!("Today: {} from {} sale(s)", rupees(total_amount), transaction_count);
        }
    }

    fn on_history_changed(&mut self, entries: &[HistoryEntry]) {
        if self.live {
            print_history(entries);
        }
    }

    fn on_sale_recorded(&mut self, transaction: &SalesTransaction) {
        if self.live {
            println!("Saved sale {} ({})", transaction.id, rupees(transaction.total_amount));
        }
    }

    fn on_day_changed(&mut self, date: NaiveDate) {
        if self.live {
            println!();
            println!("=== {} ===", long_date(date));
        }
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        match kind {
            ErrorKind::Validation => eprintln!("{}", message),
            _ => eprintln!("error: {}", message),
        }
    }
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No previous sales history");
        return;
    }
    println!("Sales history:");
    for entry in entries {
        println!("  {:<14}{:>14}", short_date(entry.date), rupees(entry.total_amount));
    }
}

/// Terminal confirmation. Each `--yes` on the command line answers one prompt.
pub struct StdinConfirm {
    preapproved: u8,
}

impl StdinConfirm {
    pub fn new(preapproved: u8) -> Self {
        Self { preapproved }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.preapproved > 0 {
            self.preapproved -= 1;
            return true;
        }

        println!("{}", prompt);
        print!("Type 'yes' to continue: ");
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => answer.trim().eq_ignore_ascii_case("yes"),
            Err(_) => false,
        }
    }
}
