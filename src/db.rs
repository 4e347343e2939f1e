//! Local SQLite store implementing the gateway contract.
//!
//! Serves as the backend when no hosted endpoint is configured and as the
//! in-memory store in tests. Decimal amounts are kept as TEXT so stored
//! totals keep full precision.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::gateway::{Collection, Filter, FilterOp, GatewayError, PersistenceGateway, Query, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Decimal,
    Json,
}

const DAILY_SALES_COLUMNS: &[(&str, ColumnKind)] = &[
    ("id", ColumnKind::Text),
    ("date", ColumnKind::Text),
    ("total_amount", ColumnKind::Decimal),
    ("updated_at", ColumnKind::Text),
];

const SALES_TRANSACTIONS_COLUMNS: &[(&str, ColumnKind)] = &[
    ("id", ColumnKind::Text),
    ("sale_date", ColumnKind::Text),
    ("items", ColumnKind::Json),
    ("total_amount", ColumnKind::Decimal),
    ("created_at", ColumnKind::Text),
];

fn columns(collection: Collection) -> &'static [(&'static str, ColumnKind)] {
    match collection {
        Collection::DailySales => DAILY_SALES_COLUMNS,
        Collection::SalesTransactions => SALES_TRANSACTIONS_COLUMNS,
    }
}

fn column_kind(collection: Collection, name: &str) -> Result<ColumnKind, GatewayError> {
    columns(collection)
        .iter()
        .find(|(col, _)| *col == name)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("unknown column {}.{}", collection, name)))
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) the database file and its schema.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, GatewayError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| GatewayError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;
        }

        let conn = Connection::open(path).map_err(storage_error)?;
        conn.busy_timeout(busy_timeout).map_err(storage_error)?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize().map_err(storage_error)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, GatewayError> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize().map_err(storage_error)?;
        Ok(db)
    }

    pub fn initialize(&self) -> rusqlite::Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());

        conn.execute_batch(
            "
            -- One aggregate row per calendar date
            CREATE TABLE IF NOT EXISTS daily_sales (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL UNIQUE,
                total_amount TEXT NOT NULL DEFAULT '0'
            );

            -- Immutable sale records, items stored as JSON
            CREATE TABLE IF NOT EXISTS sales_transactions (
                id TEXT PRIMARY KEY,
                sale_date TEXT NOT NULL,
                items TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                created_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sales_transactions_sale_date
                ON sales_transactions(sale_date);
            ",
        )?;

        // Pass the connection to avoid re-locking
        Self::migrate_conn(&conn)?;

        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> rusqlite::Result<()> {
        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(daily_sales)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .collect();

        if !columns.contains(&"updated_at".to_string()) {
            conn.execute("ALTER TABLE daily_sales ADD COLUMN updated_at TEXT", [])?;
        }

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GatewayError> {
        self.conn
            .lock()
            .map_err(|_| GatewayError::Storage("database lock poisoned".to_string()))
    }
}

impl PersistenceGateway for Database {
    fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Record>, GatewayError> {
        let selected: Vec<(&str, ColumnKind)> = match &query.columns {
            Some(names) => names
                .iter()
                .map(|n| column_kind(collection, n).map(|k| (n.as_str(), k)))
                .collect::<Result<_, _>>()?,
            None => columns(collection).to_vec(),
        };

        let (where_sql, params) = where_clause(collection, &query.filters)?;
        let mut sql = format!(
            "SELECT {} FROM {}{}",
            selected.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
            collection.table(),
            where_sql
        );
        if let Some(order) = &query.order {
            column_kind(collection, &order.column)?;
            sql.push_str(&format!(
                " ORDER BY {} {}",
                order.column,
                if order.ascending { "ASC" } else { "DESC" }
            ));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut values = Vec::with_capacity(selected.len());
                for i in 0..selected.len() {
                    values.push(row.get::<_, SqlValue>(i)?);
                }
                Ok(values)
            })
            .map_err(storage_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)?;

        rows.into_iter()
            .map(|values| row_to_record(&selected, values))
            .collect()
    }

    fn insert(&self, collection: Collection, mut record: Record) -> Result<Record, GatewayError> {
        if !record.contains_key("id") {
            record.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        let id = record_id(&record)?;

        let mut names = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (name, value) in &record {
            let kind = column_kind(collection, name)?;
            names.push(name.as_str());
            params.push(to_sql_value(kind, value)?);
        }

        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            collection.table(),
            names.join(", "),
            placeholders.join(", ")
        );

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(params.iter()))
            .map_err(storage_error)?;

        fetch_by_id(&conn, collection, &id)?
            .ok_or_else(|| GatewayError::NotFound(format!("{} id={}", collection, id)))
    }

    fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, GatewayError> {
        let conn = self.lock()?;
        apply_patch(&conn, collection, id, &patch)?;
        fetch_by_id(&conn, collection, id)?
            .ok_or_else(|| GatewayError::NotFound(format!("{} id={}", collection, id)))
    }

    fn delete_where(&self, collection: Collection, filter: &Filter) -> Result<(), GatewayError> {
        let (where_sql, params) = where_clause(collection, std::slice::from_ref(filter))?;
        let sql = format!("DELETE FROM {}{}", collection.table(), where_sql);

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(params.iter()))
            .map_err(storage_error)?;
        Ok(())
    }

    fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, GatewayError> {
        let (where_sql, params) = where_clause(collection, filters)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", collection.table(), where_sql);

        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(storage_error)?;
        Ok(count.max(0) as u64)
    }

    fn increment(
        &self,
        collection: Collection,
        id: &str,
        column: &str,
        delta: Decimal,
        patch: Record,
    ) -> Result<Option<Record>, GatewayError> {
        if column_kind(collection, column)? != ColumnKind::Decimal {
            return Err(GatewayError::InvalidRequest(format!(
                "{}.{} is not a decimal column",
                collection, column
            )));
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(storage_error)?;

        let current: Option<String> = tx
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", column, collection.table()),
                [id],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?;
        let current = current.ok_or_else(|| GatewayError::NotFound(format!("{} id={}", collection, id)))?;
        let current = Decimal::from_str(&current)
            .map_err(|e| GatewayError::Decode(format!("{}.{} = '{}': {}", collection, column, current, e)))?;

        let total = current.checked_add(delta).ok_or_else(|| {
            GatewayError::InvalidRequest(format!("{}.{} would overflow adding {}", collection, column, delta))
        })?;

        let mut patch = patch;
        patch.insert(column.to_string(), Value::String(total.to_string()));
        apply_patch(&tx, collection, id, &patch)?;

        let record = fetch_by_id(&tx, collection, id)?;
        tx.commit().map_err(storage_error)?;
        record
            .map(Some)
            .ok_or_else(|| GatewayError::NotFound(format!("{} id={}", collection, id)))
    }

    fn delete_all_atomically(&self, collections: &[Collection]) -> Result<bool, GatewayError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage_error)?;
        for collection in collections {
            tx.execute(&format!("DELETE FROM {}", collection.table()), [])
                .map_err(storage_error)?;
        }
        tx.commit().map_err(storage_error)?;
        Ok(true)
    }
}

fn apply_patch(conn: &Connection, collection: Collection, id: &str, patch: &Record) -> Result<(), GatewayError> {
    let mut assignments = Vec::with_capacity(patch.len());
    let mut params = Vec::with_capacity(patch.len() + 1);
    for (name, value) in patch {
        if name == "id" {
            continue;
        }
        let kind = column_kind(collection, name)?;
        params.push(to_sql_value(kind, value)?);
        assignments.push(format!("{} = ?{}", name, params.len()));
    }
    if assignments.is_empty() {
        return Err(GatewayError::InvalidRequest("empty update".to_string()));
    }
    params.push(SqlValue::Text(id.to_string()));

    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        collection.table(),
        assignments.join(", "),
        params.len()
    );
    let changed = conn
        .execute(&sql, params_from_iter(params.iter()))
        .map_err(storage_error)?;
    if changed == 0 {
        return Err(GatewayError::NotFound(format!("{} id={}", collection, id)));
    }
    Ok(())
}

fn fetch_by_id(conn: &Connection, collection: Collection, id: &str) -> Result<Option<Record>, GatewayError> {
    let cols = columns(collection);
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        cols.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", "),
        collection.table()
    );
    let values = conn
        .query_row(&sql, [id], |row| {
            let mut values = Vec::with_capacity(cols.len());
            for i in 0..cols.len() {
                values.push(row.get::<_, SqlValue>(i)?);
            }
            Ok(values)
        })
        .optional()
        .map_err(storage_error)?;

    values.map(|v| row_to_record(cols, v)).transpose()
}

fn where_clause(collection: Collection, filters: &[Filter]) -> Result<(String, Vec<SqlValue>), GatewayError> {
    if filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut parts = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for filter in filters {
        let kind = column_kind(collection, &filter.column)?;
        params.push(to_sql_value(kind, &filter.value)?);
        let op = match filter.op {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
        };
        parts.push(format!("{} {} ?{}", filter.column, op, params.len()));
    }
    Ok((format!(" WHERE {}", parts.join(" AND ")), params))
}

fn to_sql_value(kind: ColumnKind, value: &Value) -> Result<SqlValue, GatewayError> {
    Ok(match (kind, value) {
        (_, Value::Null) => SqlValue::Null,
        (ColumnKind::Json, v) => SqlValue::Text(v.to_string()),
        (_, Value::String(s)) => SqlValue::Text(s.clone()),
        (_, Value::Number(n)) => SqlValue::Text(n.to_string()),
        (_, Value::Bool(b)) => SqlValue::Integer(*b as i64),
        (_, other) => {
            return Err(GatewayError::InvalidRequest(format!(
                "cannot store {} in a scalar column",
                other
            )))
        }
    })
}

fn row_to_record(columns: &[(&str, ColumnKind)], values: Vec<SqlValue>) -> Result<Record, GatewayError> {
    let mut record = Record::new();
    for ((name, kind), value) in columns.iter().zip(values) {
        let json = match (kind, value) {
            (_, SqlValue::Null) => Value::Null,
            (ColumnKind::Json, SqlValue::Text(s)) => {
                serde_json::from_str(&s).map_err(|e| GatewayError::Decode(format!("{}: {}", name, e)))?
            }
            (_, SqlValue::Text(s)) => Value::String(s),
            (_, SqlValue::Integer(i)) => Value::from(i),
            (_, SqlValue::Real(f)) => Value::from(f),
            (_, SqlValue::Blob(_)) => {
                return Err(GatewayError::Decode(format!("unexpected blob in {}", name)))
            }
        };
        record.insert(name.to_string(), json);
    }
    Ok(record)
}

fn record_id(record: &Record) -> Result<String, GatewayError> {
    match record.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GatewayError::InvalidRequest("record id must be a string or number".to_string())),
    }
}

fn storage_error(e: rusqlite::Error) -> GatewayError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            GatewayError::Conflict(e.to_string())
        }
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            GatewayError::Timeout(e.to_string())
        }
        _ => GatewayError::Storage(e.to_string()),
    }
}
