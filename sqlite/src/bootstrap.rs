//! Storage bootstrap from CSV sources.
//!
//! Creates `Book`, `Customer`, and `Orders` when they do not exist yet.
//! Tables that already exist are never touched, so bootstrapping is safe on
//! every startup. CSV files are read through SQLite's `csv` virtual table
//! module, staged as a temporary table, and copied into the real table
//! within a single transaction per table.

use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::config::DataSources;
use crate::error::{Result, StoreError};
use crate::schema::{
    BOOK, CUSTOMER, ORDER_COLUMNS, ORDERS, ORDERS_SQL, ReferenceTable, quote_ident,
    reference_table_sql, table_exists,
};

/// Name of the temporary virtual table a CSV file is staged in.
const CSV_STAGING: &str = "madang_csv";

/// Report of a bootstrap run.
///
/// Only tables created by this run are listed; their row counts are the
/// rows loaded from CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Tables created by this run, in creation order.
    pub tables_created: Vec<String>,
    /// Rows loaded into `Book`.
    pub books_loaded: usize,
    /// Rows loaded into `Customer`.
    pub customers_loaded: usize,
    /// Rows seeded into `Orders`.
    pub orders_loaded: usize,
}

impl BootstrapReport {
    /// Returns `true` if every table already existed.
    pub fn is_noop(&self) -> bool {
        self.tables_created.is_empty()
    }
}

/// Ensures all three tables exist, creating and loading missing ones.
///
/// The `csv` module must already be registered on `conn`.
///
/// # Errors
///
/// Returns [`StoreError::BootstrapError`] if a required source is missing,
/// its header lacks a required column, or a row cannot be stored (duplicate
/// or non-integer id, ragged row).
pub(crate) fn bootstrap(conn: &Connection, sources: &DataSources) -> Result<BootstrapReport> {
    let mut report = BootstrapReport::default();

    if let Some(rows) = load_reference_table(conn, &BOOK, &sources.book)? {
        report.tables_created.push(BOOK.name.to_string());
        report.books_loaded = rows;
    }
    if let Some(rows) = load_reference_table(conn, &CUSTOMER, &sources.customer)? {
        report.tables_created.push(CUSTOMER.name.to_string());
        report.customers_loaded = rows;
    }
    if let Some(rows) = create_orders(conn, sources.orders.as_deref())? {
        report.tables_created.push(ORDERS.to_string());
        report.orders_loaded = rows;
    }

    Ok(report)
}

/// Creates a reference table from its CSV source. Returns `None` if the
/// table already exists.
fn load_reference_table(
    conn: &Connection,
    table: &ReferenceTable,
    source: &Path,
) -> Result<Option<usize>> {
    if table_exists(conn, table.name)? {
        debug!(table = table.name, "table exists, skipping bootstrap");
        return Ok(None);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let header = stage_csv(&tx, source)?;
    tx.execute_batch(&reference_table_sql(table, &header)?)?;

    let rows = tx
        .execute(
            &format!(
                "INSERT INTO {} SELECT * FROM temp.{CSV_STAGING}",
                quote_ident(table.name)
            ),
            [],
        )
        .map_err(|e| source_error(source, e))?;

    unstage_csv(&tx)?;
    tx.commit()?;

    info!(table = table.name, rows, source = %source.display(), "created table from CSV");
    Ok(Some(rows))
}

/// Creates `Orders`, seeding it from `source` when that file exists.
/// Returns `None` if the table already exists.
fn create_orders(conn: &Connection, source: Option<&Path>) -> Result<Option<usize>> {
    if table_exists(conn, ORDERS)? {
        debug!(table = ORDERS, "table exists, skipping bootstrap");
        return Ok(None);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute_batch(ORDERS_SQL)?;

    let rows = match source.filter(|path| path.exists()) {
        Some(path) => {
            let header = stage_csv(&tx, path)?;
            if let Some(missing) = ORDER_COLUMNS
                .iter()
                .find(|column| !header.iter().any(|h| h.eq_ignore_ascii_case(column)))
            {
                return Err(StoreError::BootstrapError(format!(
                    "{ORDERS}: missing required column '{missing}'"
                )));
            }

            // date() normalizes the stored form and yields NULL (rejected by
            // NOT NULL) for anything that is not a date.
            let select: Vec<String> = ORDER_COLUMNS
                .iter()
                .map(|column| match *column {
                    "orderdate" => format!("date({})", quote_ident(column)),
                    _ => quote_ident(column),
                })
                .collect();
            let rows = tx
                .execute(
                    &format!(
                        "INSERT INTO {ORDERS} ({}) SELECT {} FROM temp.{CSV_STAGING}",
                        ORDER_COLUMNS.join(", "),
                        select.join(", ")
                    ),
                    [],
                )
                .map_err(|e| source_error(path, e))?;
            unstage_csv(&tx)?;
            info!(table = ORDERS, rows, source = %path.display(), "seeded orders from CSV");
            rows
        }
        None => {
            info!(table = ORDERS, "created empty orders table");
            0
        }
    };

    tx.commit()?;
    Ok(Some(rows))
}

/// Exposes a CSV file as `temp.madang_csv` and returns its header.
fn stage_csv(conn: &Connection, source: &Path) -> Result<Vec<String>> {
    if !source.is_file() {
        return Err(StoreError::BootstrapError(format!(
            "source file '{}' not found",
            source.display()
        )));
    }

    let path = source.to_str().ok_or_else(|| {
        StoreError::BootstrapError(format!(
            "source path '{}' is not valid UTF-8",
            source.display()
        ))
    })?;
    // The csv module splits its arguments on '=' and does not unescape quotes.
    if path.contains(['\'', '=']) {
        return Err(StoreError::BootstrapError(format!(
            "source path '{path}' may not contain quotes or '='"
        )));
    }

    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE temp.{CSV_STAGING} USING csv(filename='{path}', header=yes)"
    ))
    .map_err(|e| source_error(source, e))?;

    let stmt = conn.prepare(&format!("SELECT * FROM temp.{CSV_STAGING}"))?;
    let header = stmt.column_names().into_iter().map(String::from).collect();
    Ok(header)
}

fn unstage_csv(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE temp.{CSV_STAGING}"))?;
    Ok(())
}

fn source_error(source: &Path, err: rusqlite::Error) -> StoreError {
    StoreError::BootstrapError(format!("failed to load '{}': {err}", source.display()))
}
