//! Order id allocation.
//!
//! The next id is one more than the largest existing `orderid`, or 1 for an
//! empty table, which keeps ids small and contiguous. The value must be
//! computed immediately before each insert; callers that need the read and
//! the insert to be atomic run both inside [`Store::write`](crate::Store::write).

use rusqlite::Connection;

use crate::error::Result;
use crate::store::Store;

const NEXT_ORDER_ID_SQL: &str = "SELECT COALESCE(MAX(orderid), 0) + 1 FROM Orders";

/// Computes the next order id on `conn` (which may be an open transaction).
pub(crate) fn next_order_id(conn: &Connection) -> Result<i64> {
    let id = conn.query_row(NEXT_ORDER_ID_SQL, [], |row| row.get(0))?;
    Ok(id)
}

impl Store {
    /// Returns the id the next recorded order would receive.
    ///
    /// Outside a write transaction another writer may claim this id first;
    /// [`record_purchase`](Store::record_purchase) allocates inside its own
    /// transaction instead of relying on this value.
    pub fn next_order_id(&self) -> Result<i64> {
        next_order_id(self.connection())
    }
}
