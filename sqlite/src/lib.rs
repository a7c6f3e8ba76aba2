//! SQLite storage for the Madang bookstore.
//!
//! This crate owns everything that touches the database: creating the
//! `Book`, `Customer`, and `Orders` tables from CSV files, the generic
//! query/command services, order id allocation, and the two purchase
//! workflows built on them.
//!
//! # Architecture
//!
//! - **`config`** — YAML configuration naming the database and CSV sources
//! - **`schema`** — table definitions derived from CSV headers
//! - **`bootstrap`** — idempotent table creation and CSV loading
//! - **`store`** — the [`Store`] handle, `query`/`execute`/`write`, [`Table`]
//! - **`allocator`** — next order id
//! - **`purchases`** — book catalog, purchase lookup, purchase recording
//!
//! # Quick start
//!
//! ```no_run
//! use madang_sqlite::{Store, StoreConfig};
//!
//! let store = Store::open(&StoreConfig::in_dir("data/")).unwrap();
//!
//! let lookup = store.lookup_purchases("Kim Yuna").unwrap();
//! if let Some(custid) = lookup.custid {
//!     for row in &lookup.rows {
//!         println!("{} {} {}", row.orderdate, row.bookname, row.saleprice);
//!     }
//!     let order = store.record_purchase(custid, 1, "15000").unwrap();
//!     println!("recorded order {}", order.orderid);
//! }
//! ```
//!
//! # Concurrency
//!
//! A store is meant for a single writer. Recording allocates the order id
//! and inserts the row inside one `BEGIN IMMEDIATE` transaction, and
//! `orderid` is the primary key, so a second process racing on the same
//! file waits for the lock or fails with a constraint error instead of
//! silently duplicating an id.

mod allocator;
mod bootstrap;
mod config;
mod error;
mod purchases;
mod schema;
mod store;

pub use bootstrap::BootstrapReport;
pub use config::{DEFAULT_DATABASE, DataSources, StoreConfig};
pub use error::{Result, StoreError};
pub use store::{Store, StoreStatus, Table};
