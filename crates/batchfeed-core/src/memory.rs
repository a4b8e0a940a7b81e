//! In-memory page source for exercising readers without a database.
//!
//! [`MemoryPageSource`] honors the full [`PageSource`] contract against a
//! vector of rows: rows are key-sorted at construction, cursor filtering
//! uses the same strictly-after lexicographic semantics a SQL backend would
//! apply, and every fetch and release is recorded so tests can assert on
//! statement text, fetch counts and resource release.
//!
//! [`PageSource`]: crate::PageSource

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::sort::SortOrder;
use crate::source::{PageRequest, PageSource};
use crate::statement::PageStatement;
use crate::value::SqlValue;

/// Error type surfaced by [`MemoryPageSource`].
///
/// Produced only by [`fail_next_fetch`], for error-path tests.
///
/// [`fail_next_fetch`]: MemoryPageSource::fail_next_fetch
#[derive(Debug, thiserror::Error)]
#[error("memory page source error: {0}")]
pub struct MemorySourceError(pub String);

/// A [`PageSource`] backed by an in-memory, key-sorted row set.
pub struct MemoryPageSource<T> {
    rows: Vec<T>,
    key_fn: Arc<dyn Fn(&T) -> Vec<SqlValue> + Send + Sync>,
    order: SortOrder,
    statements: Vec<PageStatement>,
    releases: usize,
    fail_next: Option<String>,
}

impl<T> MemoryPageSource<T> {
    /// Creates a source over the given rows.
    ///
    /// `key_fn` projects a row onto its pagination key values, in key column
    /// order; rows are sorted by that key in `order` direction up front, the
    /// way an ORDER BY would deliver them.
    pub fn new<F>(mut rows: Vec<T>, order: SortOrder, key_fn: F) -> Self
    where
        F: Fn(&T) -> Vec<SqlValue> + Send + Sync + 'static,
    {
        let key_fn = Arc::new(key_fn);
        rows.sort_by(|a, b| {
            let ordering = key_fn(a).cmp(&key_fn(b));
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Self {
            rows,
            key_fn,
            order,
            statements: Vec::new(),
            releases: 0,
            fail_next: None,
        }
    }

    /// Makes the next fetch fail with the given message.
    pub fn fail_next_fetch(&mut self, message: impl Into<String>) {
        self.fail_next = Some(message.into());
    }

    /// Returns every statement received so far, in fetch order.
    pub fn statements(&self) -> &[PageStatement] {
        &self.statements
    }

    /// Returns the number of fetches served (including the failed ones).
    pub fn fetch_count(&self) -> usize {
        self.statements.len()
    }

    /// Returns the number of release calls received.
    pub fn release_count(&self) -> usize {
        self.releases
    }

    /// Returns whether a row's key lies strictly after the cursor in the
    /// source's sort direction.
    fn is_after_cursor(&self, row: &T, cursor: &[SqlValue]) -> bool {
        let key = (self.key_fn)(row);
        match self.order {
            SortOrder::Asc => key.as_slice().cmp(cursor) == Ordering::Greater,
            SortOrder::Desc => key.as_slice().cmp(cursor) == Ordering::Less,
        }
    }
}

impl<T> PageSource<T> for MemoryPageSource<T>
where
    T: Clone + Send + Sync,
{
    type Error = MemorySourceError;

    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<T>, MemorySourceError> {
        self.statements.push(request.statement.clone());
        if let Some(message) = self.fail_next.take() {
            return Err(MemorySourceError(message));
        }

        let page = self
            .rows
            .iter()
            .filter(|row| match request.cursor {
                Some(cursor) => self.is_after_cursor(row, cursor),
                None => true,
            })
            .skip(request.offset.max(0) as usize)
            .take(request.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(page)
    }

    async fn release(&mut self) -> Result<(), MemorySourceError> {
        self.releases += 1;
        Ok(())
    }
}

impl<T> fmt::Debug for MemoryPageSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPageSource")
            .field("rows", &self.rows.len())
            .field("order", &self.order)
            .field("fetches", &self.statements.len())
            .field("releases", &self.releases)
            .finish_non_exhaustive()
    }
}
