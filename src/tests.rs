//! Session-level tests for the dashboard.
//! These run against an in-memory SQLite store, wrapped to record and break calls.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::aggregator::{DailyAggregator, DayCheck};
use crate::clock::ManualClock;
use crate::dashboard::Dashboard;
use crate::db::Database;
use crate::error::{AppError, ErrorKind};
use crate::events::DashboardEvents;
use crate::gateway::{Collection, Filter, GatewayError, PersistenceGateway, Query, Record};
use crate::ledger::SalesLedger;
use crate::models::{CandidateItem, HistoryEntry, SalesTransaction};
use crate::reset::ResetOutcome;

// ===== TEST STORE =====

/// Wraps the SQLite store, logs every call and fails the ones it is told to.
struct RecordingGateway {
    inner: Database,
    calls: Mutex<Vec<(&'static str, Collection)>>,
    failing: Mutex<Vec<(&'static str, Collection)>>,
    with_increment: bool,
    with_atomic_delete: bool,
}

impl RecordingGateway {
    fn new() -> Self {
        Self {
            inner: Database::open_in_memory().expect("Failed to create in-memory database"),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            with_increment: true,
            with_atomic_delete: true,
        }
    }

    /// A store like the hosted backend: no atomic increment, no transactional delete.
    fn plain() -> Self {
        Self {
            with_increment: false,
            with_atomic_delete: false,
            ..Self::new()
        }
    }

    fn fail(&self, op: &'static str, collection: Collection) {
        self.failing.lock().unwrap().push((op, collection));
    }

    fn calls(&self) -> Vec<(&'static str, Collection)> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, op: &str, collection: Collection) -> usize {
        self.calls()
            .iter()
            .filter(|(o, c)| *o == op && *c == collection)
            .count()
    }

    fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn enter(&self, op: &'static str, collection: Collection) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push((op, collection));
        if self.failing.lock().unwrap().contains(&(op, collection)) {
            return Err(GatewayError::Timeout(format!("{} {}", op, collection)));
        }
        Ok(())
    }
}

impl PersistenceGateway for RecordingGateway {
    fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Record>, GatewayError> {
        self.enter("find", collection)?;
        self.inner.find(collection, query)
    }

    fn insert(&self, collection: Collection, record: Record) -> Result<Record, GatewayError> {
        self.enter("insert", collection)?;
        self.inner.insert(collection, record)
    }

    fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, GatewayError> {
        self.enter("update", collection)?;
        self.inner.update(collection, id, patch)
    }

    fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<(), GatewayError> {
        self.enter("delete", collection)?;
        self.inner.delete_where(collection, filter)
    }

    fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, GatewayError> {
        self.enter("count", collection)?;
        self.inner.count(collection, filters)
    }

    fn increment(
        &self,
        collection: Collection,
        id: &str,
        column: &str,
        delta: Decimal,
        patch: Record,
    ) -> Result<Option<Record>, GatewayError> {
        if !self.with_increment {
            return Ok(None);
        }
        self.enter("increment", collection)?;
        self.inner.increment(collection, id, column, delta, patch)
    }

    fn delete_all_atomically(&self, collections: &[Collection]) -> Result<bool, GatewayError> {
        if !self.with_atomic_delete {
            return Ok(false);
        }
        for collection in collections {
            self.enter("delete_all", *collection)?;
        }
        self.inner.delete_all_atomically(collections)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Summary(Decimal, u64),
    History(Vec<HistoryEntry>),
    Sale(String),
    DayChanged(NaiveDate),
    Error(ErrorKind, String),
}

#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl DashboardEvents for EventLog {
    fn on_daily_summary_changed(&mut self, total_amount: Decimal, transaction_count: u64) {
        self.0.lock().unwrap().push(Event::Summary(total_amount, transaction_count));
    }

    fn on_history_changed(&mut self, entries: &[HistoryEntry]) {
        self.0.lock().unwrap().push(Event::History(entries.to_vec()));
    }

    fn on_sale_recorded(&mut self, transaction: &SalesTransaction) {
        self.0.lock().unwrap().push(Event::Sale(transaction.id.clone()));
    }

    fn on_day_changed(&mut self, date: NaiveDate) {
        self.0.lock().unwrap().push(Event::DayChanged(date));
    }

    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        self.0.lock().unwrap().push(Event::Error(kind, message.to_string()));
    }
}

struct Fixture {
    store: Arc<RecordingGateway>,
    clock: Arc<ManualClock>,
    events: EventLog,
    dashboard: Dashboard,
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn setup_with(store: RecordingGateway) -> Fixture {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::at_date(day(18)));
    let events = EventLog::default();
    let dashboard = Dashboard::new(store.clone(), clock.clone(), Box::new(events.clone()));
    Fixture {
        store,
        clock,
        events,
        dashboard,
    }
}

fn setup() -> Fixture {
    setup_with(RecordingGateway::new())
}

/// Seeds a daily total directly in the store.
fn seed_day(store: &RecordingGateway, date: NaiveDate, total: &str) {
    let mut record = Record::new();
    record.insert("date".into(), json!(date.to_string()));
    record.insert("total_amount".into(), json!(total));
    record.insert("updated_at".into(), json!("2026-10-01T00:00:00Z"));
    store.inner.insert(Collection::DailySales, record).unwrap();
}

fn stored_total(store: &RecordingGateway, date: NaiveDate) -> Decimal {
    let rows = store
        .inner
        .find(
            Collection::DailySales,
            &Query::new().filter(Filter::eq("date", date.to_string())),
        )
        .unwrap();
    assert_eq!(rows.len(), 1, "expected exactly one daily row for {}", date);
    match &rows[0]["total_amount"] {
        Value::String(s) => s.parse().unwrap(),
        other => panic!("unexpected total_amount {:?}", other),
    }
}

fn tea_and_blank() -> Vec<CandidateItem> {
    vec![
        CandidateItem::new("Tea", dec!(20), 3),
        CandidateItem::new("", dec!(5), 1),
    ]
}

// ===== RECORDING SALES TESTS =====

#[test]
fn test_sale_drops_invalid_items_and_totals_the_rest() {
    let mut fx = setup();
    fx.dashboard.initialize().unwrap();
    fx.events.take();

    let tx = fx.dashboard.submit_sale(&tea_and_blank()).unwrap();

    assert_eq!(tx.items.len(), 1);
    assert_eq!(tx.items[0].name, "Tea");
    assert_eq!(tx.total_amount, dec!(60.00));
    assert_eq!(tx.sale_date, day(18));
    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));
    assert_eq!(
        fx.dashboard.aggregator().cached().map(|a| a.total_amount),
        Some(dec!(60))
    );

    let events = fx.events.take();
    assert_eq!(events, vec![Event::Sale(tx.id.clone()), Event::Summary(dec!(60), 1)]);
}

#[test]
fn test_sale_adds_to_existing_total() {
    let mut fx = setup();
    seed_day(&fx.store, day(18), "40.00");
    fx.dashboard.initialize().unwrap();

    fx.dashboard
        .submit_sale(&[CandidateItem::new("Coffee", dec!(15.50), 1)])
        .unwrap();

    assert_eq!(stored_total(&fx.store, day(18)), dec!(55.50));
}

#[test]
fn test_sale_without_increment_uses_read_modify_write() {
    let mut fx = setup_with(RecordingGateway::plain());
    seed_day(&fx.store, day(18), "40.00");
    fx.dashboard.initialize().unwrap();
    fx.store.reset_calls();

    fx.dashboard
        .submit_sale(&[CandidateItem::new("Coffee", dec!(15.50), 1)])
        .unwrap();

    assert_eq!(stored_total(&fx.store, day(18)), dec!(55.50));
    assert_eq!(fx.store.calls_to("update", Collection::DailySales), 1);
    assert_eq!(fx.store.calls_to("increment", Collection::DailySales), 0);
}

#[test]
fn test_sale_before_initialize_creates_todays_record() {
    let mut fx = setup();

    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();

    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));
}

#[test]
fn test_empty_or_invalid_sale_touches_nothing() {
    let mut fx = setup();
    fx.dashboard.initialize().unwrap();
    fx.store.reset_calls();
    fx.events.take();

    let invalid = vec![
        CandidateItem::new("  ", dec!(10), 1),
        CandidateItem::new("Tea", dec!(0), 1),
        CandidateItem::new("Tea", dec!(10), 0),
    ];
    for candidates in [Vec::new(), invalid] {
        let err = fx.dashboard.submit_sale(&candidates).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    assert!(fx.store.calls().is_empty());
    let events = fx.events.take();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, Event::Error(ErrorKind::Validation, _))));
}

#[test]
fn test_failed_transaction_write_skips_aggregate() {
    let mut fx = setup();
    fx.dashboard.initialize().unwrap();
    fx.store.fail("insert", Collection::SalesTransactions);
    fx.store.reset_calls();

    let err = fx.dashboard.submit_sale(&tea_and_blank()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(err.is_transient());
    assert_eq!(fx.store.calls_to("increment", Collection::DailySales), 0);
    assert_eq!(fx.store.calls_to("update", Collection::DailySales), 0);
    assert_eq!(
        fx.dashboard.aggregator().cached().map(|a| a.total_amount),
        Some(Decimal::ZERO)
    );
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 0);
}

#[test]
fn test_failed_aggregate_update_reports_saved_sale() {
    let mut fx = setup();
    fx.dashboard.initialize().unwrap();
    fx.store.fail("increment", Collection::DailySales);
    fx.events.take();

    let err = fx.dashboard.submit_sale(&tea_and_blank()).unwrap_err();

    assert!(err.to_string().contains("was saved but the daily total was not updated"));
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 1);
    assert_eq!(stored_total(&fx.store, day(18)), Decimal::ZERO);
    assert_eq!(
        fx.dashboard.aggregator().cached().map(|a| a.total_amount),
        Some(Decimal::ZERO)
    );

    let events = fx.events.take();
    assert!(matches!(events.as_slice(), [Event::Error(ErrorKind::Persistence, _)]));
}

#[test]
fn test_oversized_sale_is_rejected_before_any_write() {
    let mut fx = setup();
    fx.dashboard.initialize().unwrap();
    fx.store.reset_calls();

    let err = fx
        .dashboard
        .submit_sale(&[CandidateItem::new("Gold", Decimal::MAX, 2)])
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("too large")));

    let err = fx
        .dashboard
        .submit_sale(&[
            CandidateItem::new("Gold", Decimal::MAX, 1),
            CandidateItem::new("Silver", Decimal::MAX, 1),
        ])
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(fx.store.calls().is_empty());
}

#[test]
fn test_daily_total_overflow_is_an_error() {
    for store in [RecordingGateway::new(), RecordingGateway::plain()] {
        let mut fx = setup_with(store);
        fx.dashboard
            .submit_sale(&[CandidateItem::new("Gold", Decimal::MAX, 1)])
            .unwrap();

        let err = fx
            .dashboard
            .submit_sale(&[CandidateItem::new("Gold", Decimal::MAX, 1)])
            .unwrap_err();

        assert!(err.to_string().contains("was saved but the daily total was not updated"));
        assert_eq!(stored_total(&fx.store, day(18)), Decimal::MAX);
        assert_eq!(
            fx.dashboard.aggregator().cached().map(|a| a.total_amount),
            Some(Decimal::MAX)
        );
    }
}

// ===== DAILY RECORD TESTS =====

#[test]
fn test_ensure_today_record_is_idempotent() {
    let mut fx = setup();

    let first = fx.dashboard.initialize().unwrap();
    let second = fx.dashboard.initialize().unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.total_amount, Decimal::ZERO);
    assert_eq!(fx.store.calls_to("insert", Collection::DailySales), 1);
}

#[test]
fn test_initialize_reports_connection_failure() {
    let mut fx = setup();
    fx.store.fail("find", Collection::DailySales);

    let err = fx.dashboard.initialize().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(err.to_string().starts_with("connecting to the sales database"));
    assert_eq!(fx.store.calls_to("insert", Collection::DailySales), 0);
    assert!(matches!(
        fx.events.take().as_slice(),
        [Event::Error(ErrorKind::Persistence, _)]
    ));
}

#[test]
fn test_initialize_publishes_summary_and_history() {
    let mut fx = setup();
    seed_day(&fx.store, day(16), "120.00");
    seed_day(&fx.store, day(17), "80.50");

    fx.dashboard.initialize().unwrap();

    let events = fx.events.take();
    assert_eq!(
        events,
        vec![
            Event::Summary(Decimal::ZERO, 0),
            Event::History(vec![
                HistoryEntry {
                    date: day(17),
                    total_amount: dec!(80.50)
                },
                HistoryEntry {
                    date: day(16),
                    total_amount: dec!(120.00)
                },
            ]),
        ]
    );
}

// ===== DAY ROLLOVER TESTS =====

#[test]
fn test_day_change_starts_new_record() {
    let mut fx = setup();
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    let before = fx.dashboard.aggregator().cached().cloned().unwrap();

    assert_eq!(fx.dashboard.check_day_change().unwrap(), DayCheck::Unchanged);

    fx.clock.advance(chrono::Duration::days(1));
    fx.events.take();
    let check = fx.dashboard.check_day_change().unwrap();

    let after = match check {
        DayCheck::RolledOver(agg) => agg,
        other => panic!("expected rollover, got {:?}", other),
    };
    assert_ne!(after.id, before.id);
    assert_eq!(after.date, day(19));
    assert_eq!(after.total_amount, Decimal::ZERO);
    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));

    let events = fx.events.take();
    assert_eq!(events[0], Event::DayChanged(day(19)));
    assert!(events.contains(&Event::Summary(Decimal::ZERO, 0)));
    assert!(events.contains(&Event::History(vec![HistoryEntry {
        date: day(18),
        total_amount: dec!(60)
    }])));
}

#[test]
fn test_day_change_before_initialize_does_nothing() {
    let mut fx = setup();
    assert_eq!(fx.dashboard.check_day_change().unwrap(), DayCheck::NotInitialized);
    assert!(fx.store.calls().is_empty());
}

#[test]
fn test_sale_across_midnight_lands_on_its_own_day() {
    let mut fx = setup();
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.clock.advance(chrono::Duration::days(1));
    fx.events.take();

    // No rollover check has run yet; the sale still goes to the new day.
    let tx = fx.dashboard.submit_sale(&tea_and_blank()).unwrap();

    assert_eq!(tx.sale_date, day(19));
    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));
    assert_eq!(stored_total(&fx.store, day(19)), dec!(60));

    let events = fx.events.take();
    assert_eq!(
        events,
        vec![
            Event::Sale(tx.id.clone()),
            Event::DayChanged(day(19)),
            Event::Summary(dec!(60), 1),
            Event::History(vec![HistoryEntry {
                date: day(18),
                total_amount: dec!(60)
            }]),
        ]
    );

    // The sale already switched the day; the next check has nothing to do.
    assert_eq!(fx.dashboard.check_day_change().unwrap(), DayCheck::Unchanged);
    assert!(fx.events.take().is_empty());
}

// ===== RESET TESTS =====

#[test]
fn test_reset_wipes_everything_and_restarts_today() {
    let mut fx = setup();
    seed_day(&fx.store, day(17), "80.50");
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();

    let mut confirm = |_: &str| true;
    let outcome = fx.dashboard.reset_all(&mut confirm).unwrap();

    let aggregate = match outcome {
        ResetOutcome::Completed(agg) => agg,
        other => panic!("expected completed reset, got {:?}", other),
    };
    assert_eq!(aggregate.date, day(18));
    assert_eq!(aggregate.total_amount, Decimal::ZERO);
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 0);
    assert_eq!(fx.store.inner.count(Collection::DailySales, &[]).unwrap(), 1);
    assert_eq!(fx.dashboard.today_summary().unwrap().transaction_count, 0);
    assert!(fx.dashboard.history().unwrap().is_empty());
}

#[test]
fn test_declined_reset_deletes_nothing() {
    let mut fx = setup();
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.store.reset_calls();

    let mut prompts = Vec::new();
    let mut answers = vec![true, false].into_iter();
    let mut confirm = |prompt: &str| {
        prompts.push(prompt.to_string());
        answers.next().unwrap_or(false)
    };
    let outcome = fx.dashboard.reset_all(&mut confirm).unwrap();

    assert_eq!(outcome, ResetOutcome::Cancelled);
    assert_eq!(prompts.len(), 2);
    assert!(fx.store.calls().is_empty());
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 1);
}

#[test]
fn test_reset_without_transactions_deletes_both_collections() {
    let mut fx = setup_with(RecordingGateway::plain());
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.store.reset_calls();

    let mut confirm = |_: &str| true;
    fx.dashboard.reset_all(&mut confirm).unwrap();

    let deletes: Vec<_> = fx
        .store
        .calls()
        .into_iter()
        .filter(|(op, _)| *op == "delete")
        .map(|(_, c)| c)
        .collect();
    assert_eq!(deletes, vec![Collection::SalesTransactions, Collection::DailySales]);
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 0);
    assert_eq!(stored_total(&fx.store, day(18)), Decimal::ZERO);
}

#[test]
fn test_partial_reset_is_reported() {
    let mut fx = setup_with(RecordingGateway::plain());
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.store.fail("delete", Collection::DailySales);

    let mut confirm = |_: &str| true;
    let err = fx.dashboard.reset_all(&mut confirm).unwrap_err();

    assert!(err.to_string().contains("partially reset"));
    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 0);
    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));
}

#[test]
fn test_failed_atomic_reset_keeps_all_data() {
    let mut fx = setup();
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.store.fail("delete_all", Collection::DailySales);

    let mut confirm = |_: &str| true;
    assert!(fx.dashboard.reset_all(&mut confirm).is_err());

    assert_eq!(fx.store.inner.count(Collection::SalesTransactions, &[]).unwrap(), 1);
    assert_eq!(stored_total(&fx.store, day(18)), dec!(60));
}

// ===== REPORTING TESTS =====

#[test]
fn test_summary_counts_todays_transactions() {
    let mut fx = setup();
    fx.dashboard.submit_sale(&tea_and_blank()).unwrap();
    fx.dashboard
        .submit_sale(&[CandidateItem::new("Biscuits", dec!(7.75), 2)])
        .unwrap();

    let summary = fx.dashboard.today_summary().unwrap();
    assert_eq!(summary.date, day(18));
    assert_eq!(summary.total_amount, dec!(75.50));
    assert_eq!(summary.transaction_count, 2);
}

#[test]
fn test_history_respects_limit() {
    let store = RecordingGateway::new();
    for d in 1..=10 {
        seed_day(&store, day(d), "10.00");
    }
    let mut fx = setup_with(store);
    fx.dashboard = Dashboard::new(fx.store.clone(), fx.clock.clone(), Box::new(fx.events.clone()))
        .with_history_limit(3);

    let history = fx.dashboard.history().unwrap();
    let dates: Vec<_> = history.iter().map(|h| h.date).collect();
    assert_eq!(dates, vec![day(10), day(9), day(8)]);
}

// ===== ARITHMETIC PROPERTY TESTS =====

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// A candidate paired with whether it should be accepted.
fn candidate() -> impl Strategy<Value = (CandidateItem, bool)> {
    let name = prop_oneof![
        3 => "[A-Za-z][A-Za-z ]{0,10}".prop_map(String::from),
        1 => Just(String::new()),
        1 => "[ \t]{1,3}".prop_map(String::from),
    ];
    let price = prop_oneof![
        3 => amount(),
        1 => Just(Decimal::ZERO),
        1 => amount().prop_map(|a| -a),
    ];
    let quantity = prop_oneof![3 => 1i64..50, 1 => -5i64..=0];

    (name, price, quantity).prop_map(|(name, price, quantity)| {
        let ok = !name.trim().is_empty() && price > Decimal::ZERO && quantity >= 1;
        (CandidateItem::new(name, price, quantity), ok)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_transaction_total_is_exact_sum(
        lines in prop::collection::vec((amount(), 1i64..50), 1..8)
    ) {
        let candidates: Vec<_> = lines
            .iter()
            .enumerate()
            .map(|(i, (price, qty))| CandidateItem::new(format!("item{}", i), *price, *qty))
            .collect();
        let expected: Decimal = lines.iter().map(|(p, q)| *p * Decimal::from(*q)).sum();

        let items = SalesLedger::accept_items(&candidates);
        prop_assert_eq!(items.len(), candidates.len());
        prop_assert_eq!(SalesLedger::total_of(&items), Some(expected));
    }

    #[test]
    fn prop_invalid_items_do_not_change_total(
        lines in prop::collection::vec(candidate(), 0..12)
    ) {
        let candidates: Vec<_> = lines.iter().map(|(c, _)| c.clone()).collect();
        let valid: Vec<_> = lines.iter().filter(|(_, ok)| *ok).map(|(c, _)| c).collect();
        let expected: Decimal = valid.iter().map(|c| c.price * Decimal::from(c.quantity)).sum();

        let items = SalesLedger::accept_items(&candidates);
        prop_assert_eq!(items.len(), valid.len());
        prop_assert_eq!(SalesLedger::total_of(&items), Some(expected));
    }

    #[test]
    fn prop_daily_total_accumulates_every_delta(
        deltas in prop::collection::vec(amount(), 1..10),
        with_increment in any::<bool>()
    ) {
        let store = Arc::new(if with_increment { RecordingGateway::new() } else { RecordingGateway::plain() });
        let clock = Arc::new(ManualClock::at_date(day(18)));
        let mut aggregator = DailyAggregator::new(store.clone(), clock);

        for delta in &deltas {
            aggregator.apply_delta(*delta).unwrap();
        }

        let expected: Decimal = deltas.iter().copied().sum();
        prop_assert_eq!(stored_total(&store, day(18)), expected);
        prop_assert_eq!(aggregator.cached().map(|a| a.total_amount), Some(expected));
    }
}
