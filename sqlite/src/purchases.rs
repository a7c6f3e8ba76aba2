//! Purchase workflows: the book catalog, lookup by customer name, and
//! recording a new purchase.

use chrono::{Local, NaiveDate};
use madang_core::{Book, Order, PurchaseLookup, PurchaseRow, parse_price};
use rusqlite::params;
use tracing::{debug, info, warn};

use crate::allocator;
use crate::error::Result;
use crate::store::Store;

const BOOKS_SQL: &str = "SELECT bookid, bookname FROM Book ORDER BY bookid";

const LOOKUP_SQL: &str = r#"
SELECT c.custid, c.name, b.bookname, o.orderdate, o.saleprice
FROM Customer c
JOIN Orders o ON c.custid = o.custid
JOIN Book b   ON o.bookid = b.bookid
WHERE c.name = ?1
ORDER BY o.orderdate, o.orderid
"#;

const INSERT_ORDER_SQL: &str =
    "INSERT INTO Orders (orderid, custid, bookid, saleprice, orderdate) VALUES (?1, ?2, ?3, ?4, ?5)";

impl Store {
    /// All books, ordered by id.
    pub fn books(&self) -> Result<Vec<Book>> {
        self.query_map(BOOKS_SQL, [], |row| {
            Ok(Book {
                bookid: row.get(0)?,
                bookname: row.get(1)?,
            })
        })
    }

    /// Looks up purchases made by customers named exactly `name`.
    ///
    /// Rows are ordered by order date (then order id). The returned
    /// `custid` is the first row's; when several customers share the name
    /// their rows are all included and the lookup reports itself as
    /// ambiguous.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use madang_sqlite::{Store, StoreConfig};
    /// # let store = Store::open(&StoreConfig::default()).unwrap();
    /// let lookup = store.lookup_purchases("Kim").unwrap();
    /// match lookup.custid {
    ///     Some(custid) => println!("customer {custid}: {} purchases", lookup.rows.len()),
    ///     None => println!("no purchases found"),
    /// }
    /// ```
    pub fn lookup_purchases(&self, name: &str) -> Result<PurchaseLookup> {
        let rows = self.query_map(LOOKUP_SQL, [name], |row| {
            Ok(PurchaseRow {
                custid: row.get(0)?,
                name: row.get(1)?,
                bookname: row.get(2)?,
                orderdate: row.get(3)?,
                saleprice: row.get(4)?,
            })
        })?;

        let lookup = PurchaseLookup::from_rows(rows);
        if lookup.is_ambiguous() {
            warn!(
                name,
                customers = ?lookup.customer_ids(),
                "several customers share this name; using the first row's id"
            );
        }
        debug!(name, rows = lookup.rows.len(), "looked up purchases");
        Ok(lookup)
    }

    /// Records a purchase dated today (local calendar date).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidPrice`](crate::StoreError::InvalidPrice)
    /// without writing anything if `price_input` is not a whole number.
    pub fn record_purchase(&self, custid: i64, bookid: i64, price_input: &str) -> Result<Order> {
        self.record_purchase_on(custid, bookid, price_input, Local::now().date_naive())
    }

    /// Records a purchase with an explicit order date.
    ///
    /// The price is validated first. The order id is then allocated and the
    /// row inserted within one immediate transaction, so the returned order
    /// is committed when this returns. Calling twice records two orders.
    pub fn record_purchase_on(
        &self,
        custid: i64,
        bookid: i64,
        price_input: &str,
        orderdate: NaiveDate,
    ) -> Result<Order> {
        let saleprice = parse_price(price_input)?;

        let order = self.write(|tx| {
            let order = Order {
                orderid: allocator::next_order_id(tx)?,
                custid,
                bookid,
                saleprice,
                orderdate,
            };
            tx.execute(
                INSERT_ORDER_SQL,
                params![
                    order.orderid,
                    order.custid,
                    order.bookid,
                    order.saleprice,
                    order.orderdate
                ],
            )?;
            Ok(order)
        })?;

        info!(
            orderid = order.orderid,
            custid,
            bookid,
            saleprice,
            "recorded purchase"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::{DataSources, StoreError};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store(dir: &Path) -> Store {
        fs::write(dir.join("Book.csv"), "bookid,bookname\n10,Economics\n3,Golf Bible\n").unwrap();
        fs::write(dir.join("Customer.csv"), "custid,name\n1,Kim\n2,Park\n3,Kim\n").unwrap();
        Store::open_in_memory(&DataSources::in_dir(dir)).unwrap()
    }

    #[test]
    fn test_books_ordered_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let books = store(dir.path()).books().unwrap();
        assert_eq!(books, vec![Book::new(3, "Golf Bible"), Book::new(10, "Economics")]);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.record_purchase_on(1, 10, "8000", date(2023, 1, 1)).unwrap();

        assert!(store.lookup_purchases("kim").unwrap().is_empty());
        assert_eq!(store.lookup_purchases("Kim").unwrap().rows.len(), 1);
    }

    #[test]
    fn test_lookup_shared_name_uses_earliest_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.record_purchase_on(1, 10, "8000", date(2023, 5, 1)).unwrap();
        store.record_purchase_on(3, 3, "9000", date(2023, 1, 1)).unwrap();

        let lookup = store.lookup_purchases("Kim").unwrap();
        assert_eq!(lookup.custid, Some(3));
        assert!(lookup.is_ambiguous());
        assert_eq!(lookup.rows.len(), 2);
    }

    #[test]
    fn test_same_day_orders_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.record_purchase_on(2, 10, "1", date(2023, 1, 1)).unwrap();
        store.record_purchase_on(2, 3, "2", date(2023, 1, 1)).unwrap();

        let prices: Vec<i64> = store
            .lookup_purchases("Park")
            .unwrap()
            .rows
            .iter()
            .map(|r| r.saleprice)
            .collect();
        assert_eq!(prices, vec![1, 2]);
    }

    #[test]
    fn test_record_returns_committed_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let order = store.record_purchase_on(2, 3, " 12_000 ", date(2024, 2, 29)).unwrap();
        assert_eq!(
            order,
            Order {
                orderid: 1,
                custid: 2,
                bookid: 3,
                saleprice: 12000,
                orderdate: date(2024, 2, 29),
            }
        );

        let stored: String = store
            .connection()
            .query_row("SELECT orderdate FROM Orders WHERE orderid = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, "2024-02-29");
    }

    #[test]
    fn test_invalid_price_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store.record_purchase(1, 10, "12.5").unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, StoreError::InvalidPrice(ref e) if e.input == "12.5"));
        assert_eq!(store.status().unwrap().order_count, 0);
        assert_eq!(store.next_order_id().unwrap(), 1);
    }

    #[test]
    fn test_record_is_not_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let first = store.record_purchase(1, 10, "100").unwrap();
        let second = store.record_purchase(1, 10, "100").unwrap();
        assert_eq!(second.orderid, first.orderid + 1);
        assert_eq!(first.orderdate, Local::now().date_naive());
    }
}
