//! The keyset ("no-offset") paging reader.

use std::collections::VecDeque;

use crate::cursor::PageCursor;
use crate::options::KeysetOptions;
use crate::source::{PageRequest, PageSource};
use crate::statement::{PAGE_SUBQUERY_ALIAS, PageStatement};
use crate::template::QueryTemplate;
use crate::value::SqlValue;
use crate::{ReaderError, ReaderResult, TRACING_TARGET_READER};

/// Mutable read-side state of a paging reader.
#[derive(Debug)]
pub(crate) struct ReaderState<T> {
    pub(crate) buffer: VecDeque<T>,
    pub(crate) exhausted: bool,
    pub(crate) opened: bool,
}

impl<T> Default for ReaderState<T> {
    fn default() -> Self {
        Self {
            buffer: VecDeque::new(),
            exhausted: false,
            opened: false,
        }
    }
}

impl<T> ReaderState<T> {
    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
        self.exhausted = false;
        self.opened = true;
    }
}

/// Streams rows from a relational table in fixed-size chunks using keyset
/// pagination.
///
/// Instead of `OFFSET`, every page after the first carries a continuation
/// predicate derived from the last row of the previous page, so fetching
/// page *n* costs the same as fetching page one. Each row is returned at
/// most once per reader lifetime; with a stable dataset, every row matching
/// the template's filter is returned exactly once, in key order.
///
/// The reader is a single-consumer state machine (`&mut self` throughout):
/// callers needing parallel chunked processing partition the key range
/// across separate reader instances.
///
/// # Exhaustion policy
///
/// A page shorter than the chunk size is trusted as the last page. A page
/// exactly equal to the chunk size triggers one extra confirming fetch, so
/// reading N rows at chunk size C issues `ceil(N / C)` fetches, plus one
/// empty fetch when N is an exact positive multiple of C.
pub struct KeysetPagingReader<T, S> {
    source: S,
    options: KeysetOptions<T>,
    template: QueryTemplate,
    chunk_size: i64,
    cursor: PageCursor,
    state: ReaderState<T>,
    pages_fetched: u64,
}

impl<T, S> KeysetPagingReader<T, S>
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
        options: KeysetOptions<T>,
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
            options,
            template,
            chunk_size,
            cursor: PageCursor::new(),
            state: ReaderState::default(),
            pages_fetched: 0,
        })
    }

    /// Opens the reader at the start of the result set.
    ///
    /// Resets the buffer, the exhaustion flag and the cursor. No query is
    /// issued; the first page is fetched lazily by the first [`read`].
    /// Reopening an exhausted reader restarts it from the beginning.
    ///
    /// [`read`]: Self::read
    pub fn open(&mut self) {
        self.cursor.reset();
        self.state.reset();
        self.pages_fetched = 0;
        tracing::debug!(
            target: TRACING_TARGET_READER,
            chunk_size = self.chunk_size,
            "Opened keyset paging reader"
        );
    }

    /// Opens the reader at a previously persisted cursor position.
    ///
    /// Reading resumes strictly after the cursor's key values, which makes
    /// this the restart path for checkpointed batch jobs: persist
    /// [`cursor`] after a completed chunk, restore it here on the next run.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if the cursor's arity does not match
    /// the configured key columns.
    ///
    /// [`cursor`]: Self::cursor
    pub fn open_at(&mut self, cursor: PageCursor) -> ReaderResult<()> {
        if let Some(values) = cursor.values()
            && values.len() != self.options.key_len()
        {
            return Err(ReaderError::Config(format!(
                "restored cursor has {} value(s), but {} key column(s) are configured",
                values.len(),
                self.options.key_len()
            )));
        }

        self.open();
        self.cursor = cursor;
        Ok(())
    }

    /// Reads the next row.
    ///
    /// Returns `Ok(Some(row))` while rows remain and `Ok(None)` once the
    /// result set is finished; every call after that keeps returning
    /// `Ok(None)`. When the internal buffer is empty and the reader is not
    /// exhausted, this call blocks on one page query.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::NotOpened`] if the reader was never opened,
    /// and [`ReaderError::Query`] if the page query fails. Query failures
    /// are fatal for the current read and are not retried internally.
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
            "Closed keyset paging reader"
        );
        Ok(())
    }

    /// Returns the current cursor position.
    ///
    /// Serialize or [`encode`] this value to checkpoint storage to resume a
    /// restarted job via [`open_at`].
    ///
    /// [`encode`]: PageCursor::encode
    /// [`open_at`]: Self::open_at
    #[inline]
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Returns the number of page queries issued since the last open.
    #[inline]
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Returns the configured chunk size.
    #[inline]
    pub fn chunk_size(&self) -> i64 {
        self.chunk_size
    }

    /// Renders the page statement for the current cursor position.
    fn build_statement(&self) -> PageStatement {
        let mut builder = self.template.render();
        builder.wrap_as_subquery(PAGE_SUBQUERY_ALIAS);

        if let Some(values) = self.cursor.values() {
            builder.push_sql(" WHERE ");
            self.options.write_continuation(&mut builder, values);
        }

        builder.push_sql(" ");
        builder.push_sql(&self.options.order_by_sql());

        let limit = builder.bind_value(SqlValue::BigInt(self.chunk_size));
        builder.push_sql(&format!(" LIMIT {limit}"));

        builder.build()
    }

    /// Fetches the next page into the buffer and advances the cursor.
    async fn fetch_next_page(&mut self) -> ReaderResult<()> {
        let statement = self.build_statement();
        let request = PageRequest {
            statement: &statement,
            cursor: self.cursor.values(),
            limit: self.chunk_size,
            offset: 0,
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
        if let Some(last) = rows.last() {
            self.cursor.advance(self.options.key_of(last));
        }

        tracing::trace!(
            target: TRACING_TARGET_READER,
            page = self.pages_fetched,
            rows = rows.len(),
            exhausted = self.state.exhausted,
            "Fetched page"
        );

        self.state.buffer.extend(rows);
        Ok(())
    }
}

impl<T, S> std::fmt::Debug for KeysetPagingReader<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysetPagingReader")
            .field("options", &self.options)
            .field("chunk_size", &self.chunk_size)
            .field("cursor", &self.cursor)
            .field("buffered", &self.state.buffer.len())
            .field("exhausted", &self.state.exhausted)
            .field("opened", &self.state.opened)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::key::KeyColumn;
    use crate::memory::MemoryPageSource;
    use crate::sort::SortOrder;

    #[derive(Debug, Clone, PartialEq)]
    struct Manufacture {
        id: i64,
        name: String,
    }

    fn manufactures(count: i64) -> Vec<Manufacture> {
        (1..=count)
            .map(|id| Manufacture {
                id,
                name: format!("item-{id}"),
            })
            .collect()
    }

    fn id_options(order: SortOrder) -> KeysetOptions<Manufacture> {
        KeysetOptions::single(
            KeyColumn::big_int("id", |m: &Manufacture| m.id).expect("valid column"),
            order,
        )
    }

    fn id_source(rows: Vec<Manufacture>, order: SortOrder) -> MemoryPageSource<Manufacture> {
        MemoryPageSource::new(rows, order, |m| vec![SqlValue::BigInt(m.id)])
    }

    fn template() -> QueryTemplate {
        QueryTemplate::from_sql("SELECT id, name FROM manufacture")
    }

    type MemoryReader = KeysetPagingReader<Manufacture, MemoryPageSource<Manufacture>>;

    fn id_reader(rows: Vec<Manufacture>, order: SortOrder, chunk_size: i64) -> MemoryReader {
        KeysetPagingReader::new(
            id_source(rows, order),
            id_options(order),
            template(),
            chunk_size,
        )
        .expect("valid reader")
    }

    async fn drain(reader: &mut MemoryReader) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(row) = reader.read().await.expect("read should succeed") {
            ids.push(row.id);
        }
        ids
    }

    #[test]
    fn rejects_non_positive_chunk_size() {
        for chunk_size in [0, -3] {
            let result = KeysetPagingReader::new(
                id_source(Vec::new(), SortOrder::Asc),
                id_options(SortOrder::Asc),
                template(),
                chunk_size,
            );
            assert!(matches!(result, Err(ReaderError::Config(_))));
        }
    }

    #[tokio::test]
    async fn read_before_open_is_an_error() {
        let mut reader = id_reader(manufactures(1), SortOrder::Asc, 10);
        assert!(matches!(reader.read().await, Err(ReaderError::NotOpened)));
    }

    #[tokio::test]
    async fn reads_all_rows_in_ascending_order() {
        let mut reader = id_reader(manufactures(5), SortOrder::Asc, 2);
        reader.open();

        assert_eq!(drain(&mut reader).await, vec![1, 2, 3, 4, 5]);
        // 5 rows at chunk 2: pages of 2, 2, 1; the short page ends the read.
        assert_eq!(reader.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn reads_all_rows_in_descending_order() {
        let mut reader = id_reader(manufactures(5), SortOrder::Desc, 2);
        reader.open();

        assert_eq!(drain(&mut reader).await, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn exact_multiple_costs_one_confirming_fetch() {
        let mut reader = id_reader(manufactures(4), SortOrder::Asc, 2);
        reader.open();

        assert_eq!(drain(&mut reader).await, vec![1, 2, 3, 4]);
        // Pages of 2, 2, then an empty confirming fetch.
        assert_eq!(reader.pages_fetched(), 3);
    }

    #[tokio::test]
    async fn empty_result_set_is_one_fetch() {
        let mut reader = id_reader(Vec::new(), SortOrder::Asc, 2);
        reader.open();

        assert_eq!(reader.read().await.expect("read"), None);
        assert_eq!(reader.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn end_of_data_is_idempotent() {
        let mut reader = id_reader(manufactures(1), SortOrder::Asc, 2);
        reader.open();
        drain(&mut reader).await;

        let fetches = reader.pages_fetched();
        for _ in 0..3 {
            assert_eq!(reader.read().await.expect("read"), None);
        }
        assert_eq!(reader.pages_fetched(), fetches);
    }

    #[tokio::test]
    async fn no_row_is_returned_twice() {
        let mut reader = id_reader(manufactures(23), SortOrder::Asc, 5);
        reader.open();

        let ids = drain(&mut reader).await;
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 23);
        assert_eq!(unique.len(), 23);
    }

    #[tokio::test]
    async fn grouped_rows_read_one_per_group_ascending() {
        // Two distinct group values under a shared filter, chunk size 1.
        let rows = vec![
            Manufacture {
                id: 1,
                name: "1".to_string(),
            },
            Manufacture {
                id: 2,
                name: "2".to_string(),
            },
        ];
        let source = MemoryPageSource::new(rows, SortOrder::Asc, |m: &Manufacture| {
            vec![SqlValue::Text(m.name.clone())]
        });
        let options = KeysetOptions::single(
            KeyColumn::text("name", |m: &Manufacture| m.name.clone()).expect("valid column"),
            SortOrder::Asc,
        );
        let grouped = QueryTemplate::new(|q| {
            q.push("SELECT name FROM manufacture WHERE create_date = ")
                .push_bind("2020-10-12")
                .push("::date GROUP BY name")
        });
        let mut reader =
            KeysetPagingReader::new(source, options, grouped, 1).expect("valid reader");
        reader.open();

        let first = reader.read().await.expect("read").expect("first row");
        let second = reader.read().await.expect("read").expect("second row");
        let third = reader.read().await.expect("read");

        assert_eq!(first.name, "1");
        assert_eq!(second.name, "2");
        assert_eq!(third, None);
    }

    #[tokio::test]
    async fn grouped_rows_read_one_per_group_descending() {
        let rows = vec![
            Manufacture {
                id: 1,
                name: "1".to_string(),
            },
            Manufacture {
                id: 2,
                name: "2".to_string(),
            },
        ];
        let source = MemoryPageSource::new(rows, SortOrder::Desc, |m: &Manufacture| {
            vec![SqlValue::Text(m.name.clone())]
        });
        let options = KeysetOptions::single(
            KeyColumn::text("name", |m: &Manufacture| m.name.clone()).expect("valid column"),
            SortOrder::Desc,
        );
        let mut reader =
            KeysetPagingReader::new(source, options, template(), 1).expect("valid reader");
        reader.open();

        let first = reader.read().await.expect("read").expect("first row");
        let second = reader.read().await.expect("read").expect("second row");
        let third = reader.read().await.expect("read");

        assert_eq!(first.name, "2");
        assert_eq!(second.name, "1");
        assert_eq!(third, None);
    }

    #[tokio::test]
    async fn composite_key_resolves_ties() {
        // Every row shares the same name; the trailing id column must keep
        // pages from skipping or repeating rows.
        let rows: Vec<Manufacture> = (1..=6)
            .map(|id| Manufacture {
                id,
                name: "same".to_string(),
            })
            .collect();
        let source = MemoryPageSource::new(rows, SortOrder::Asc, |m: &Manufacture| {
            vec![SqlValue::Text(m.name.clone()), SqlValue::BigInt(m.id)]
        });
        let options = KeysetOptions::composite(
            vec![
                KeyColumn::text("name", |m: &Manufacture| m.name.clone()).expect("valid column"),
                KeyColumn::big_int("id", |m: &Manufacture| m.id).expect("valid column"),
            ],
            SortOrder::Asc,
        )
        .expect("valid options");
        let mut reader =
            KeysetPagingReader::new(source, options, template(), 2).expect("valid reader");
        reader.open();

        let mut ids = Vec::new();
        while let Some(row) = reader.read().await.expect("read") {
            ids.push(row.id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn key_on_embedded_field_resolves_like_a_direct_one() {
        #[derive(Debug, Clone)]
        struct Audited {
            id: i64,
        }
        #[derive(Debug, Clone)]
        struct Foo {
            audit: Audited,
            name: String,
        }

        let rows = vec![Foo {
            audit: Audited { id: 41 },
            name: "foo1".to_string(),
        }];
        let source = MemoryPageSource::new(rows, SortOrder::Desc, |f: &Foo| {
            vec![SqlValue::BigInt(f.audit.id)]
        });
        let options = KeysetOptions::single(
            KeyColumn::big_int("id", |f: &Foo| f.audit.id).expect("valid column"),
            SortOrder::Desc,
        );
        let mut reader =
            KeysetPagingReader::new(source, options, template(), 1).expect("valid reader");
        reader.open();

        let row = reader.read().await.expect("read").expect("one row");
        assert_eq!(row.audit.id, 41);
        assert_eq!(row.name, "foo1");
    }

    #[tokio::test]
    async fn first_page_has_no_predicate_and_later_pages_do() {
        let mut reader = id_reader(manufactures(3), SortOrder::Asc, 2);
        reader.open();
        drain(&mut reader).await;

        let statements = reader.source.statements();
        assert_eq!(statements.len(), 2);

        assert_eq!(
            statements[0].sql(),
            "SELECT * FROM (SELECT id, name FROM manufacture) AS page_rows \
             ORDER BY id ASC LIMIT $1"
        );
        assert_eq!(statements[0].binds(), &[SqlValue::BigInt(2)]);

        assert_eq!(
            statements[1].sql(),
            "SELECT * FROM (SELECT id, name FROM manufacture) AS page_rows \
             WHERE (id > $1) ORDER BY id ASC LIMIT $2"
        );
        assert_eq!(
            statements[1].binds(),
            &[SqlValue::BigInt(2), SqlValue::BigInt(2)]
        );
    }

    #[tokio::test]
    async fn template_binds_precede_pagination_binds() {
        let rows = manufactures(3);
        let source = id_source(rows, SortOrder::Asc);
        let filtered = QueryTemplate::new(|q| {
            q.push("SELECT id, name FROM manufacture WHERE category_no = ")
                .push_bind(7i64)
        });
        let mut reader =
            KeysetPagingReader::new(source, id_options(SortOrder::Asc), filtered, 2)
                .expect("valid reader");
        reader.open();
        drain(&mut reader).await;

        let second = &reader.source.statements()[1];
        assert_eq!(
            second.sql(),
            "SELECT * FROM (SELECT id, name FROM manufacture WHERE category_no = $1) \
             AS page_rows WHERE (id > $2) ORDER BY id ASC LIMIT $3"
        );
        assert_eq!(
            second.binds(),
            &[
                SqlValue::BigInt(7),
                SqlValue::BigInt(2),
                SqlValue::BigInt(2)
            ]
        );
    }

    #[tokio::test]
    async fn cursor_restart_resumes_without_duplicates_or_gaps() {
        let mut reader = id_reader(manufactures(5), SortOrder::Asc, 2);
        reader.open();

        // Consume the first chunk, then checkpoint the cursor.
        assert_eq!(reader.read().await.expect("read").map(|m| m.id), Some(1));
        assert_eq!(reader.read().await.expect("read").map(|m| m.id), Some(2));
        let checkpoint = reader.cursor().clone();
        reader.close().await.expect("close");

        let token = checkpoint.encode();
        let restored = PageCursor::decode(&token).expect("decode checkpoint");

        let mut resumed = id_reader(manufactures(5), SortOrder::Asc, 2);
        resumed.open_at(restored).expect("open at checkpoint");
        assert_eq!(drain(&mut resumed).await, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn open_at_rejects_mismatched_cursor_arity() {
        let mut reader = id_reader(manufactures(5), SortOrder::Asc, 2);
        let cursor = PageCursor::after(vec![SqlValue::BigInt(1), SqlValue::BigInt(2)]);
        assert!(matches!(reader.open_at(cursor), Err(ReaderError::Config(_))));
    }

    #[tokio::test]
    async fn reopen_restarts_from_the_beginning() {
        let mut reader = id_reader(manufactures(3), SortOrder::Asc, 2);
        reader.open();
        drain(&mut reader).await;

        reader.open();
        assert_eq!(drain(&mut reader).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn query_failure_propagates_unmodified() {
        let mut reader = id_reader(manufactures(3), SortOrder::Asc, 2);
        reader.open();
        reader.source.fail_next_fetch("connection reset");

        let error = reader.read().await.expect_err("fetch should fail");
        assert!(matches!(error, ReaderError::Query(_)));
        assert!(error.to_string().contains("connection reset"));

        // The failure is not terminal state: the next read fetches again.
        assert_eq!(reader.read().await.expect("read").map(|m| m.id), Some(1));
    }

    #[tokio::test]
    async fn close_releases_the_source_and_is_idempotent() {
        let mut reader = id_reader(manufactures(5), SortOrder::Asc, 2);
        reader.open();
        assert_eq!(reader.read().await.expect("read").map(|m| m.id), Some(1));

        reader.close().await.expect("close");
        assert_eq!(reader.source.release_count(), 1);

        reader.close().await.expect("second close");
        assert_eq!(reader.source.release_count(), 2);
    }

    #[tokio::test]
    async fn close_without_open_is_safe() {
        let mut reader = id_reader(manufactures(1), SortOrder::Asc, 2);
        reader.close().await.expect("close");
        assert_eq!(reader.source.release_count(), 1);
    }
}
