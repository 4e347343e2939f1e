//! Persistence gateway contract.
//!
//! The dashboard talks to its backing store only through [`PersistenceGateway`].
//! Records travel as JSON objects so the same contract fits the hosted
//! PostgREST endpoint and the local SQLite store.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub type Record = serde_json::Map<String, Value>;

/// The two collections the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    DailySales,
    SalesTransactions,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::DailySales => "daily_sales",
            Collection::SalesTransactions => "sales_transactions",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Neq,
            value: value.into(),
        }
    }

    /// Matches every row that has an id. Used for unconditional deletes,
    /// which the REST backend refuses without a filter.
    pub fn all_rows() -> Self {
        Self::neq("id", "00000000-0000-0000-0000-000000000000")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Filter, ordering and limit for [`PersistenceGateway::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Columns to return; `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no matching record in {0}")]
    NotFound(String),

    /// Unique or other constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("could not decode record: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout(_) | GatewayError::Network(_) => true,
            GatewayError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Storage capability the dashboard core depends on.
///
/// Implementations must be safe to share between the session and the
/// rollover monitor thread.
pub trait PersistenceGateway: Send + Sync {
    /// Returns matching records. An empty result means "not found".
    fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Record>, GatewayError>;

    /// Persists a record and returns it as stored, including the generated id.
    fn insert(&self, collection: Collection, record: Record) -> Result<Record, GatewayError>;

    /// Applies `patch` to the row with `id` and returns the updated row.
    fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, GatewayError>;

    fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<(), GatewayError>;

    fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, GatewayError>;

    /// Atomically adds `delta` to a decimal column of row `id` and applies
    /// `patch` in the same write. `Ok(None)` means the store has no such
    /// primitive and the caller must fall back to read-modify-write.
    fn increment(
        &self,
        _collection: Collection,
        _id: &str,
        _column: &str,
        _delta: Decimal,
        _patch: Record,
    ) -> Result<Option<Record>, GatewayError> {
        Ok(None)
    }

    /// Deletes every row of every listed collection in one transaction.
    /// Returns `false` when the store cannot do this atomically.
    fn delete_all_atomically(&self, _collections: &[Collection]) -> Result<bool, GatewayError> {
        Ok(false)
    }
}

pub fn to_record<T: Serialize>(value: &T) -> Result<Record, GatewayError> {
    match serde_json::to_value(value).map_err(|e| GatewayError::Decode(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(GatewayError::Decode(format!("expected an object, got {}", other))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(record)).map_err(|e| GatewayError::Decode(e.to_string()))
}
