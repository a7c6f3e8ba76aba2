//! Output formatting for lookups, catalogs, status, and raw query results.

use madang_core::{Book, BookChoice, DATE_FORMAT, PurchaseLookup};
use madang_sqlite::{BootstrapReport, StoreStatus, Table};
use rusqlite::types::Value;
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// Message shown when a lookup matches nothing.
pub const NO_PURCHASES: &str = "No purchases found for this name.";

fn serialize<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Table => Err("table output has no serialized form".to_string()),
    }
}

/// Formats a purchase lookup.
pub fn format_lookup(lookup: &PurchaseLookup, format: OutputFormat) -> Result<String, String> {
    if format != OutputFormat::Table {
        return serialize(lookup, format);
    }
    if lookup.is_empty() {
        return Ok(format!("{NO_PURCHASES}\n"));
    }

    let rows: Vec<Vec<String>> = lookup
        .rows
        .iter()
        .map(|row| {
            vec![
                row.custid.to_string(),
                row.name.clone(),
                row.bookname.clone(),
                row.orderdate.format(DATE_FORMAT).to_string(),
                row.saleprice.to_string(),
            ]
        })
        .collect();

    let mut out = render_grid(
        &["custid", "name", "bookname", "orderdate", "saleprice"],
        &rows,
    );
    out.push_str(&format!(
        "\n{} purchase(s), total {}\n",
        lookup.rows.len(),
        lookup.total_spent()
    ));
    Ok(out)
}

/// Formats the book selection options, sentinel first.
pub fn format_books(books: &[Book], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Table => {
            let mut out = String::new();
            for option in BookChoice::options(books) {
                out.push_str(&option.to_string());
                out.push('\n');
            }
            Ok(out)
        }
        _ => serialize(books, format),
    }
}

/// Formats table sizes.
pub fn format_status(status: &StoreStatus, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Table => {
            let last = status
                .last_order_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            Ok(format!(
                "Store Status:\n  Books: {}\n  Customers: {}\n  Orders: {}\n  Last order id: {last}\n",
                status.book_count, status.customer_count, status.order_count
            ))
        }
        _ => serialize(status, format),
    }
}

/// Formats what a bootstrap run did.
pub fn format_bootstrap(report: &BootstrapReport) -> String {
    if report.is_noop() {
        return "All tables already exist; nothing loaded.\n".to_string();
    }
    format!(
        "Bootstrap complete:\n  Tables created: {}\n  Books loaded: {}\n  Customers loaded: {}\n  Orders loaded: {}\n",
        report.tables_created.join(", "),
        report.books_loaded,
        report.customers_loaded,
        report.orders_loaded
    )
}

/// Formats a raw query result.
pub fn format_table(table: &Table, format: OutputFormat) -> Result<String, String> {
    if format != OutputFormat::Table {
        return serialize(&table.records(), format);
    }

    let headers: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    let mut out = render_grid(&headers, &rows);
    let plural = if table.len() == 1 { "" } else { "s" };
    out.push_str(&format!("\n({} row{plural})\n", table.len()));
    Ok(out)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

/// Renders left-aligned columns separated by two spaces.
fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string() + "\n"
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = line(headers.to_vec());
    out.push_str(&line(rule.iter().map(String::as_str).collect()));
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}
