use crate::commands::App;
use crate::error::AppError;
use crate::format::rupees;
use crate::models::{CandidateItem, SalesTransaction};
use crate::receipt::Receipt;

/// Records one sale and prints its receipt.
pub fn record(app: &App, items: &[CandidateItem], print_receipt: bool) -> Result<SalesTransaction, AppError> {
    let mut session = app.session();
    session.initialize()?;

    let transaction = session.submit_sale(items)?;

    if print_receipt {
        let receipt = Receipt::for_transaction(&transaction, session.clock().local_now());
        print!("{}", receipt.render());
    } else {
        println!("Recorded sale {} ({})", transaction.id, rupees(transaction.total_amount));
    }

    Ok(transaction)
}

/// Splits one line of the live view into items: `Tea:20x3, Biscuits:7.75x2`.
pub fn parse_items(line: &str) -> Result<Vec<CandidateItem>, String> {
    line.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
