//! The offset-based paging reader.

use crate::reader::ReaderState;
use crate::sort::SortSpec;
use crate::source::{PageRequest, PageSource};
use crate::statement::{PAGE_SUBQUERY_ALIAS, PageStatement};
use crate::template::QueryTemplate;
use crate::value::SqlValue;
use crate::{ReaderError, ReaderResult, TRACING_TARGET_READER};

/// Streams rows in fixed-size chunks using `LIMIT`/`OFFSET` pagination.
///
/// The offset-based sibling of [`KeysetPagingReader`]: same template and
/// source seams, same read contract and exhaustion policy, but pages are
/// addressed by row offset instead of a continuation predicate. Deep pages
/// pay the linear `OFFSET` scan cost, so prefer the keyset reader wherever a
/// suitable sort key exists; this reader covers small result sets and
/// queries with no usable key.
///
/// A deterministic [`SortSpec`] is required: without a stable order, offset
/// pages can overlap or skip rows between fetches.
///
/// [`KeysetPagingReader`]: crate::KeysetPagingReader
pub struct OffsetPagingReader<T, S> {
    source: S,
    sort: SortSpec,
    template: QueryTemplate,
    chunk_size: i64,
    offset: i64,
    state: ReaderState<T>,
    pages_fetched: u64,
}

impl<T, S> OffsetPagingReader<T, S>
where
    S: PageSource<T>,
{
    /// Creates a new reader.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if `chunk_size` is not positive.
    pub fn new(
        source: S,
        sort: SortSpec,
        template: QueryTemplate,
        chunk_size: i64,
    ) -> ReaderResult<Self> {
        if chunk_size <= 0 {
            return Err(ReaderError::Config(format!(
                "chunk_size must be positive, got {chunk_size}"
            )));
        }

        Ok(Self {
            source,
            sort,
            template,
            chunk_size,
            offset: 0,
            state: ReaderState::default(),
            pages_fetched: 0,
        })
    }

    /// Opens the reader at the start of the result set.
    ///
    /// No query is issued; the first page is fetched lazily by the first
    /// [`read`].
    ///
    /// [`read`]: Self::read
    pub fn open(&mut self) {
        self.open_at_offset(0);
    }

    /// Opens the reader at a previously persisted row offset.
    pub fn open_at_offset(&mut self, offset: i64) {
        self.offset = offset.max(0);
        self.state.reset();
        self.pages_fetched = 0;
        tracing::debug!(
            target: TRACING_TARGET_READER,
            chunk_size = self.chunk_size,
            offset = self.offset,
            "Opened offset paging reader"
        );
    }

    /// Reads the next row.
    ///
    /// Same contract as [`KeysetPagingReader::read`]: `Ok(Some(row))` while
    /// rows remain, then `Ok(None)` on every call after the result set is
    /// finished.
    ///
    /// [`KeysetPagingReader::read`]: crate::KeysetPagingReader::read
    pub async fn read(&mut self) -> ReaderResult<Option<T>> {
        if !self.state.opened {
            return Err(ReaderError::NotOpened);
        }

        if let Some(row) = self.state.buffer.pop_front() {
            return Ok(Some(row));
        }
        if self.state.exhausted {
            return Ok(None);
        }

        self.fetch_next_page().await?;
        Ok(self.state.buffer.pop_front())
    }

    /// Closes the reader and releases source resources.
    ///
    /// Idempotent, and safe to call without a prior [`open`].
    ///
    /// [`open`]: Self::open
    pub async fn close(&mut self) -> ReaderResult<()> {
        self.state.buffer.clear();
        self.state.opened = false;
        self.source
            .release()
            .await
            .map_err(|e| ReaderError::Query(Box::new(e)))?;
        tracing::debug!(
            target: TRACING_TARGET_READER,
            pages_fetched = self.pages_fetched,
            "Closed offset paging reader"
        );
        Ok(())
    }

    /// Returns the offset of the next unfetched page.
    ///
    /// Persist this value to resume via [`open_at_offset`]. Rows already
    /// buffered but not yet read are counted as fetched.
    ///
    /// [`open_at_offset`]: Self::open_at_offset
    #[inline]
    pub fn current_offset(&self) -> i64 {
        self.offset
    }

    /// Returns the number of page queries issued since the last open.
    #[inline]
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Renders the page statement for the current offset.
    fn build_statement(&self) -> PageStatement {
        let mut builder = self.template.render();
        builder.wrap_as_subquery(PAGE_SUBQUERY_ALIAS);

        builder.push_sql(" ");
        builder.push_sql(&self.sort.order_by_sql());

        let limit = builder.bind_value(SqlValue::BigInt(self.chunk_size));
        let offset = builder.bind_value(SqlValue::BigInt(self.offset));
        builder.push_sql(&format!(" LIMIT {limit} OFFSET {offset}"));

        builder.build()
    }

    /// Fetches the next page into the buffer and advances the offset.
    async fn fetch_next_page(&mut self) -> ReaderResult<()> {
        let statement = self.build_statement();
        let request = PageRequest {
            statement: &statement,
            cursor: None,
            limit: self.chunk_size,
            offset: self.offset,
        };

        let rows = self
            .source
            .fetch_page(request)
            .await
            .map_err(|e| ReaderError::Query(Box::new(e)))?;
        self.pages_fetched += 1;

        if (rows.len() as i64) < self.chunk_size {
            self.state.exhausted = true;
        }
        self.offset += rows.len() as i64;

        tracing::trace!(
            target: TRACING_TARGET_READER,
            page = self.pages_fetched,
            rows = rows.len(),
            next_offset = self.offset,
            exhausted = self.state.exhausted,
            "Fetched page"
        );

        self.state.buffer.extend(rows);
        Ok(())
    }
}

impl<T, S> std::fmt::Debug for OffsetPagingReader<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetPagingReader")
            .field("sort", &self.sort)
            .field("chunk_size", &self.chunk_size)
            .field("offset", &self.offset)
            .field("buffered", &self.state.buffer.len())
            .field("exhausted", &self.state.exhausted)
            .field("opened", &self.state.opened)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
