//! The seam between the paging readers and the persistence layer.

use std::future::Future;

use crate::statement::PageStatement;
use crate::value::SqlValue;

/// One page fetch, as handed to a [`PageSource`].
///
/// SQL-backed sources execute [`statement`] as-is. Sources that do not speak
/// SQL (test doubles, fixtures) can honor the same contract from the
/// structured fields: return up to [`limit`] rows strictly after [`cursor`]
/// in key order, skipping [`offset`] rows first.
///
/// [`statement`]: PageRequest::statement
/// [`cursor`]: PageRequest::cursor
/// [`limit`]: PageRequest::limit
/// [`offset`]: PageRequest::offset
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// The rendered page query.
    pub statement: &'a PageStatement,
    /// Last-seen key values, absent on the first page of a keyset read and
    /// always absent for offset reads.
    pub cursor: Option<&'a [SqlValue]>,
    /// Maximum number of rows to return.
    pub limit: i64,
    /// Rows to skip before the page starts. Zero for keyset reads.
    pub offset: i64,
}

/// A source of pages for the paging readers.
///
/// Implementations execute one page query per call and must not hold any
/// per-fetch resource after the call returns: connections are acquired
/// inside `fetch_page` and released by scope, on success and error paths
/// alike.
pub trait PageSource<T> {
    /// Error type surfaced by failed fetches.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches one page of rows.
    ///
    /// Rows must be returned in the statement's ORDER BY order. A result
    /// shorter than `request.limit` signals the final page.
    fn fetch_page(
        &mut self,
        request: PageRequest<'_>,
    ) -> impl Future<Output = Result<Vec<T>, Self::Error>> + Send;

    /// Releases any resources held across fetches.
    ///
    /// Called by the reader's `close()`; must be idempotent. The default
    /// implementation does nothing, which is correct for sources that
    /// acquire all resources per fetch.
    fn release(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async { Ok(()) }
    }
}
