//! The store handle and its query/command services.
//!
//! A [`Store`] owns one SQLite connection for its whole lifetime. It is
//! constructed explicitly by the application root, bootstraps the tables on
//! open, and is passed by reference to whatever needs storage. Dropping it
//! closes the connection.
//!
//! # Example
//!
//! ```no_run
//! use madang_sqlite::{Store, StoreConfig};
//!
//! let store = Store::open(&StoreConfig::in_dir("data/")).unwrap();
//!
//! let table = store
//!     .query("SELECT bookid, bookname FROM Book WHERE bookid > ?1 ORDER BY bookid", [5])
//!     .unwrap();
//! println!("{} books, columns {:?}", table.len(), table.columns);
//!
//! store
//!     .execute(
//!         "INSERT INTO Orders (orderid, custid, bookid, saleprice, orderdate) VALUES (?1, ?2, ?3, ?4, ?5)",
//!         rusqlite::params![500, 1, 10, 8000, "2024-05-01"],
//!     )
//!     .unwrap();
//! ```

use rusqlite::types::Value;
use rusqlite::{Connection, Params, Row, Transaction, TransactionBehavior};
use serde_json::{Map, Number};
use tracing::{debug, info};

use crate::bootstrap::{self, BootstrapReport};
use crate::config::{DataSources, StoreConfig};
use crate::error::{Result, StoreError};
use crate::schema::{BOOK, CUSTOMER, ORDERS, count_rows};

/// Handle to the bookstore database.
pub struct Store {
    conn: Connection,
    report: BootstrapReport,
}

impl Store {
    /// Opens the configured database file and bootstraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BootstrapError`] if a table is missing and its
    /// source cannot be loaded.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        info!(database = %config.database.display(), "opening store");
        let conn = Connection::open(&config.database)?;
        Self::with_connection(conn, &config.sources)
    }

    /// Opens a private in-memory database bootstrapped from `sources`.
    pub fn open_in_memory(sources: &DataSources) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, sources)
    }

    /// Wraps an existing connection and bootstraps it.
    pub fn with_connection(conn: Connection, sources: &DataSources) -> Result<Self> {
        rusqlite::vtab::csvtab::load_module(&conn)?;
        let report = bootstrap::bootstrap(&conn, sources)?;
        Ok(Self { conn, report })
    }

    /// What bootstrapping did when this handle was opened.
    pub fn bootstrap_report(&self) -> &BootstrapReport {
        &self.report
    }

    /// Runs bootstrap again. Existing tables are left untouched.
    pub fn bootstrap(&self, sources: &DataSources) -> Result<BootstrapReport> {
        bootstrap::bootstrap(&self.conn, sources)
    }

    /// Executes a read-only statement and returns every row.
    ///
    /// Parameters are positional (`?1`, `?2`, ...) and bound by SQLite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadOnlyViolation`] if the statement would
    /// modify the database, or [`StoreError::DatabaseError`] for malformed
    /// SQL and parameter mismatches.
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<Table> {
        let mut stmt = self.prepare_read(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params, |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(rows = rows.len(), "query returned");
        Ok(Table { columns, rows })
    }

    /// Executes a read-only statement, mapping each row with `f`.
    pub fn query_map<T, P, F>(&self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.prepare_read(sql)?;
        let rows = stmt
            .query_map(params, f)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Executes one mutating statement in its own transaction and commits.
    ///
    /// Returns the number of rows changed. On error nothing is applied.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.write(|tx| Ok(tx.execute(sql, params)?))
    }

    /// Runs `f` inside a write transaction and commits if it succeeds.
    ///
    /// The transaction starts with `BEGIN IMMEDIATE`, so the write lock is
    /// held from the first statement: a read followed by a dependent insert
    /// cannot interleave with another writer.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Row counts for each table.
    pub fn status(&self) -> Result<StoreStatus> {
        let last_order_id: Option<i64> =
            self.conn
                .query_row(&format!("SELECT MAX(orderid) FROM {ORDERS}"), [], |row| row.get(0))?;

        Ok(StoreStatus {
            book_count: count_rows(&self.conn, BOOK.name)?,
            customer_count: count_rows(&self.conn, CUSTOMER.name)?,
            order_count: count_rows(&self.conn, ORDERS)?,
            last_order_id,
        })
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the store and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn prepare_read(&self, sql: &str) -> Result<rusqlite::Statement<'_>> {
        let stmt = self.conn.prepare(sql)?;
        // SQLite reports transaction control and ATTACH/DETACH as read-only,
        // but they change connection state.
        let connection_control = leading_keyword(sql)
            .is_some_and(|kw| CONNECTION_CONTROL.iter().any(|c| c.eq_ignore_ascii_case(kw)));
        if !stmt.readonly() || connection_control {
            return Err(StoreError::ReadOnlyViolation(sql.trim().to_string()));
        }
        Ok(stmt)
    }
}

const CONNECTION_CONTROL: [&str; 9] = [
    "BEGIN", "COMMIT", "END", "ROLLBACK", "SAVEPOINT", "RELEASE", "ATTACH", "DETACH", "VACUUM",
];

/// First keyword of `sql`, skipping whitespace and comments.
fn leading_keyword(sql: &str) -> Option<&str> {
    let mut rest = sql;
    loop {
        rest = rest.trim_start();
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.find('\n').map_or("", |end| &line[end + 1..]);
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.find("*/").map_or("", |end| &block[end + 2..]);
        } else {
            break;
        }
    }
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Snapshot of table sizes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStatus {
    /// Number of books.
    pub book_count: usize,
    /// Number of customers.
    pub customer_count: usize,
    /// Number of orders.
    pub order_count: usize,
    /// Highest order id, absent when there are no orders.
    pub last_order_id: Option<i64>,
}

/// Tabular query result with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names in select order.
    pub columns: Vec<String>,
    /// Rows in the order SQLite returned them.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell at `row` in the named column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rows as JSON objects keyed by column name.
    ///
    /// A repeated column name gets a numeric suffix (`custid`, `custid_2`)
    /// so no cell is dropped.
    pub fn records(&self) -> Vec<Map<String, serde_json::Value>> {
        let keys = self.record_keys();
        self.rows
            .iter()
            .map(|row| {
                keys.iter()
                    .cloned()
                    .zip(row.iter().map(value_to_json))
                    .collect()
            })
            .collect()
    }

    fn record_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let mut key = column.clone();
            let mut n = 1;
            while keys.contains(&key) || (n > 1 && self.columns.contains(&key)) {
                n += 1;
                key = format!("{column}_{n}");
            }
            keys.push(key);
        }
        keys
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(*i),
        Value::Real(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::from(s.as_str()),
        Value::Blob(b) => serde_json::Value::from(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use rusqlite::params;

    use super::*;

    fn sources(dir: &Path) -> DataSources {
        fs::write(dir.join("Book.csv"), "bookid,bookname\n1,A\n2,B\n3,C\n").unwrap();
        fs::write(dir.join("Customer.csv"), "custid,name\n1,Kim\n").unwrap();
        DataSources::in_dir(dir)
    }

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory(&sources(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn test_query_named_columns_and_order() {
        let (_dir, store) = store();
        let table = store
            .query("SELECT bookid, bookname AS title FROM Book ORDER BY bookid DESC", [])
            .unwrap();
        assert_eq!(table.columns, vec!["bookid", "title"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "bookid"), Some(&Value::Integer(3)));
        assert_eq!(table.get(2, "TITLE"), Some(&Value::Text("A".to_string())));
        assert_eq!(table.get(3, "bookid"), None);
        assert_eq!(table.get(0, "missing"), None);
    }

    #[test]
    fn test_query_binds_parameters() {
        let (_dir, store) = store();
        let table = store
            .query(
                "SELECT bookname FROM Book WHERE bookid >= ?1 AND bookname <> ?2 ORDER BY bookid",
                params![2, "C"],
            )
            .unwrap();
        assert_eq!(table.rows, vec![vec![Value::Text("B".to_string())]]);

        // A quote in the parameter is data, not SQL.
        let table = store
            .query("SELECT * FROM Customer WHERE name = ?1", ["Kim' OR '1'='1"])
            .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_query_rejects_mutation() {
        let (_dir, store) = store();
        let err = store.query("DELETE FROM Book", []).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnlyViolation(_)));
        assert_eq!(store.status().unwrap().book_count, 3);
    }

    #[test]
    fn test_query_rejects_connection_control() {
        let (_dir, store) = store();
        for sql in [
            "BEGIN",
            "  begin immediate",
            "-- open\nBEGIN",
            "/* x */ SAVEPOINT s",
            "COMMIT",
            "ATTACH ':memory:' AS aux",
            "DETACH aux",
        ] {
            let result = store.query(sql, []);
            assert!(
                matches!(result, Err(StoreError::ReadOnlyViolation(_)) | Err(StoreError::DatabaseError(_))),
                "{sql} was accepted"
            );
        }
        assert!(store.connection().is_autocommit());

        let attached = store.query("SELECT name FROM pragma_database_list", []).unwrap();
        assert!(attached.column_index("name").is_some());
        assert!(!attached.rows.iter().any(|r| r[0] == Value::Text("aux".to_string())));

        store
            .execute("INSERT INTO Orders VALUES (1, 1, 2, 500, '2024-01-01')", [])
            .unwrap();
        assert_eq!(store.status().unwrap().order_count, 1);
    }

    #[test]
    fn test_query_rejects_begin_and_attach() {
        let (_dir, store) = store();
        assert!(matches!(
            store.query("BEGIN", []),
            Err(StoreError::ReadOnlyViolation(_))
        ));
        assert!(matches!(
            store.query("ATTACH ':memory:' AS aux", []),
            Err(StoreError::ReadOnlyViolation(_))
        ));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(leading_keyword("  select 1"), Some("select"));
        assert_eq!(leading_keyword("-- c\n/* d */ WITH x AS (SELECT 1) SELECT * FROM x"), Some("WITH"));
        assert_eq!(leading_keyword("-- only a comment"), None);
        assert_eq!(leading_keyword(""), None);
    }

    #[test]
    fn test_query_malformed_sql() {
        let (_dir, store) = store();
        assert!(matches!(
            store.query("SELEC * FROM Book", []),
            Err(StoreError::DatabaseError(_))
        ));
        assert!(store.query("SELECT * FROM Book WHERE bookid = ?1", []).is_err());
    }

    #[test]
    fn test_execute_commits() {
        let (_dir, store) = store();
        let changed = store
            .execute(
                "INSERT INTO Orders (orderid, custid, bookid, saleprice, orderdate) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![1, 1, 2, 500, "2024-01-01"],
            )
            .unwrap();
        assert_eq!(changed, 1);
        assert!(store.connection().is_autocommit());
        assert_eq!(store.status().unwrap().order_count, 1);
    }

    #[test]
    fn test_execute_constraint_violation_propagates() {
        let (_dir, store) = store();
        let insert = "INSERT INTO Orders VALUES (1, 1, 2, 500, '2024-01-01')";
        store.execute(insert, []).unwrap();
        assert!(matches!(
            store.execute(insert, []),
            Err(StoreError::DatabaseError(_))
        ));
        assert_eq!(store.status().unwrap().order_count, 1);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let (_dir, store) = store();
        let result: Result<()> = store.write(|tx| {
            tx.execute("INSERT INTO Orders VALUES (1, 1, 2, 500, '2024-01-01')", [])?;
            Err(StoreError::ConfigError("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.status().unwrap().order_count, 0);
        assert!(store.connection().is_autocommit());
    }

    #[test]
    fn test_status() {
        let (_dir, store) = store();
        let status = store.status().unwrap();
        assert_eq!(status.book_count, 3);
        assert_eq!(status.customer_count, 1);
        assert_eq!(status.order_count, 0);
        assert_eq!(status.last_order_id, None);
    }

    #[test]
    fn test_records_as_json() {
        let (_dir, store) = store();
        let table = store
            .query("SELECT bookid, bookname, NULL AS note, 1.5 AS ratio FROM Book WHERE bookid = 1", [])
            .unwrap();
        let records = table.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["bookid"], 1);
        assert_eq!(records[0]["bookname"], "A");
        assert!(records[0]["note"].is_null());
        assert_eq!(records[0]["ratio"], 1.5);
    }

    #[test]
    fn test_records_keep_repeated_columns() {
        let (_dir, store) = store();
        let table = store
            .query("SELECT b.bookid, c.custid AS bookid, 7 AS bookid_2 FROM Book b, Customer c WHERE b.bookid = 2", [])
            .unwrap();
        let records = table.records();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(records[0]["bookid"], 2);
        assert_eq!(records[0]["bookid_3"], 1);
        assert_eq!(records[0]["bookid_2"], 7);
    }
}
