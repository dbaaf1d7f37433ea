//! The connection provider seam.
//!
//! The engine never opens, pools or caches connections. Callers hand a
//! [`Connection`] to every operation that performs I/O; the `&mut` borrow
//! keeps one operation per connection at a time.

use futures::stream::BoxStream;
use futures::TryStreamExt;
use indexmap::IndexMap;
use oxide_rowset_core::{CompiledQuery, Result, SqlValue};

/// A fetched record: column name to raw value, in result column order.
pub type Record = IndexMap<String, SqlValue>;

/// A cursor over fetched records. Dropping it releases the cursor.
pub type RecordStream<'c> = BoxStream<'c, Result<Record>>;

/// A live connection that executes compiled queries.
///
/// Provider failures, cancellation and timeouts are reported as
/// [`oxide_rowset_core::Error::Connectivity`].
#[allow(async_fn_in_trait)]
pub trait Connection: Send {
    /// Opens a cursor over the query's result rows.
    ///
    /// Records are pulled one at a time; nothing runs until the stream is
    /// first polled.
    fn fetch(&mut self, query: CompiledQuery) -> RecordStream<'_>;

    /// Executes a statement and returns the number of affected rows.
    async fn execute(&mut self, query: CompiledQuery) -> Result<u64>;

    /// Fetches the first record, if any, and closes the cursor.
    async fn fetch_optional(&mut self, query: CompiledQuery) -> Result<Option<Record>> {
        let mut records = self.fetch(query);
        let first = records.try_next().await?;
        Ok(first)
    }
}
