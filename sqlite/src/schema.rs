//! Table definitions.
//!
//! `Book` and `Customer` take their columns from the header of their CSV
//! source: the key id column becomes `INTEGER PRIMARY KEY` and every other
//! column is kept under its header name as `TEXT`. `Orders` has a fixed
//! layout.
//!
//! # Table structure
//!
//! - `Book` — `bookid`, `bookname`, plus any extra CSV columns
//! - `Customer` — `custid`, `name`, plus any extra CSV columns
//! - `Orders` — `orderid`, `custid`, `bookid`, `saleprice`, `orderdate`

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// A table populated from a CSV file with a header row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReferenceTable {
    pub name: &'static str,
    /// Integer identifier column, stored as the primary key.
    pub key: &'static str,
    /// Columns the header must contain, key included.
    pub required: &'static [&'static str],
}

pub(crate) const BOOK: ReferenceTable = ReferenceTable {
    name: "Book",
    key: "bookid",
    required: &["bookid", "bookname"],
};

pub(crate) const CUSTOMER: ReferenceTable = ReferenceTable {
    name: "Customer",
    key: "custid",
    required: &["custid", "name"],
};

pub(crate) const ORDERS: &str = "Orders";

/// Column order used when inserting into or seeding `Orders`.
pub(crate) const ORDER_COLUMNS: [&str; 5] = ["orderid", "custid", "bookid", "saleprice", "orderdate"];

/// Integer columns carry a `typeof` check: the table is not STRICT, so
/// affinity alone would store non-numeric text.
pub(crate) const ORDERS_SQL: &str = r#"
CREATE TABLE Orders (
    orderid INTEGER PRIMARY KEY,
    custid INTEGER NOT NULL CHECK (typeof(custid) = 'integer'),
    bookid INTEGER NOT NULL CHECK (typeof(bookid) = 'integer'),
    saleprice INTEGER NOT NULL CHECK (typeof(saleprice) = 'integer'),
    orderdate TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_custid ON Orders(custid);
"#;

/// Quotes an identifier for use in SQL, doubling embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Generates `CREATE TABLE` for a reference table from its CSV header.
///
/// Column names are matched case-insensitively, as SQLite does.
///
/// # Errors
///
/// Returns [`StoreError::BootstrapError`] if a header is blank, appears
/// twice, or a required column is missing.
pub(crate) fn reference_table_sql(table: &ReferenceTable, header: &[String]) -> Result<String> {
    for (i, column) in header.iter().enumerate() {
        if column.trim().is_empty() {
            return Err(StoreError::BootstrapError(format!(
                "{}: column {} has an empty header",
                table.name,
                i + 1
            )));
        }
        if header[..i].iter().any(|c| c.eq_ignore_ascii_case(column)) {
            return Err(StoreError::BootstrapError(format!(
                "{}: duplicate column '{column}'",
                table.name
            )));
        }
    }

    for required in table.required {
        if !header.iter().any(|c| c.eq_ignore_ascii_case(required)) {
            return Err(StoreError::BootstrapError(format!(
                "{}: missing required column '{required}'",
                table.name
            )));
        }
    }

    let columns: Vec<String> = header
        .iter()
        .map(|column| {
            let ty = if column.eq_ignore_ascii_case(table.key) {
                "INTEGER PRIMARY KEY"
            } else {
                "TEXT"
            };
            format!("    {} {ty}", quote_ident(column))
        })
        .collect();

    Ok(format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_ident(table.name),
        columns.join(",\n")
    ))
}

/// Checks whether a table exists in the main schema.
pub(crate) fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
    )?;
    let count: i64 = stmt.query_row([name], |row| row.get(0))?;
    Ok(count > 0)
}

/// Counts rows in a table.
pub(crate) fn count_rows(conn: &Connection, name: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}
