//! Record type definitions for the bookstore data model.
//!
//! Books and customers are reference data loaded once at bootstrap; orders
//! are append-only. All types serialize with [`serde`] so the CLI can emit
//! them as JSON or YAML.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Storage and display format for order dates (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A book from the reference catalog.
///
/// # Examples
///
/// ```
/// use madang_core::Book;
///
/// let book = Book::new(10, "Economics");
/// assert_eq!(book.bookid, 10);
/// assert_eq!(book.bookname, "Economics");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique book identifier.
    pub bookid: i64,
    /// Title as stored in the catalog.
    pub bookname: String,
}

impl Book {
    /// Creates a book record.
    pub fn new(bookid: i64, bookname: impl Into<String>) -> Self {
        Self {
            bookid,
            bookname: bookname.into(),
        }
    }
}

/// A customer from the reference data.
///
/// Names are not unique: several customers may share one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer identifier.
    pub custid: i64,
    /// Name as stored, compared case-sensitively on lookup.
    pub name: String,
}

impl Customer {
    /// Creates a customer record.
    pub fn new(custid: i64, name: impl Into<String>) -> Self {
        Self {
            custid,
            name: name.into(),
        }
    }
}

/// A purchase transaction row in `Orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique, monotonically assigned order identifier.
    pub orderid: i64,
    /// Purchasing customer.
    pub custid: i64,
    /// Purchased book.
    pub bookid: i64,
    /// Price actually paid.
    pub saleprice: i64,
    /// Calendar date of the sale.
    pub orderdate: NaiveDate,
}

/// One row of a customer's purchase history.
///
/// Produced by joining `Customer`, `Orders`, and `Book`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRow {
    pub custid: i64,
    pub name: String,
    pub bookname: String,
    pub orderdate: NaiveDate,
    pub saleprice: i64,
}

/// Result of looking up purchases by customer name.
///
/// `custid` is taken from the first row (earliest order date). When the
/// name is shared by several customers the rows may mix their histories;
/// [`is_ambiguous`](Self::is_ambiguous) reports that case.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use madang_core::{PurchaseLookup, PurchaseRow};
///
/// let empty = PurchaseLookup::from_rows(Vec::new());
/// assert!(empty.custid.is_none());
/// assert!(empty.is_empty());
///
/// let row = PurchaseRow {
///     custid: 1,
///     name: "Kim".into(),
///     bookname: "Economics".into(),
///     orderdate: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
///     saleprice: 8000,
/// };
/// let found = PurchaseLookup::from_rows(vec![row]);
/// assert_eq!(found.custid, Some(1));
/// assert!(!found.is_ambiguous());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PurchaseLookup {
    /// Customer id used for subsequent recording, absent when no rows matched.
    pub custid: Option<i64>,
    /// Purchase rows in ascending order date.
    pub rows: Vec<PurchaseRow>,
}

impl PurchaseLookup {
    /// Builds a lookup result, selecting the first row's customer id.
    pub fn from_rows(rows: Vec<PurchaseRow>) -> Self {
        let custid = rows.first().map(|row| row.custid);
        Self { custid, rows }
    }

    /// Returns `true` if no purchases matched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct customer ids present in the rows, ascending.
    pub fn customer_ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|row| row.custid)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns `true` if the rows belong to more than one customer.
    pub fn is_ambiguous(&self) -> bool {
        self.customer_ids().len() > 1
    }

    /// Sum of sale prices across all rows.
    pub fn total_spent(&self) -> i64 {
        self.rows.iter().map(|row| row.saleprice).sum()
    }
}
