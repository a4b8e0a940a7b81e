//! PostgreSQL page source.

use std::fmt;
use std::marker::PhantomData;

use batchfeed_core::{PageRequest, PageSource, SqlValue};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types;
use diesel_async::RunQueryDsl;

use crate::{PgClient, PgError, TRACING_TARGET_QUERY};

/// Executes page statements against PostgreSQL.
///
/// `PgPageSource` is the database end of the batchfeed reader seam: it takes
/// the statement a reader rendered for one page, binds its values, and loads
/// the rows over a pooled diesel-async connection. A connection is acquired
/// per fetch and returned to the pool before the rows reach the reader, on
/// success and error paths alike, so nothing is held across `read()` calls.
///
/// Row types implement diesel's [`QueryableByName`], mapping the output
/// columns of the query template:
///
/// ```rust,ignore
/// #[derive(diesel::QueryableByName)]
/// struct Account {
///     #[diesel(sql_type = diesel::sql_types::BigInt)]
///     id: i64,
///     #[diesel(sql_type = diesel::sql_types::Text)]
///     email: String,
/// }
///
/// let source = PgPageSource::<Account>::new(client);
/// ```
///
/// [`QueryableByName`]: diesel::deserialize::QueryableByName
pub struct PgPageSource<T> {
    client: PgClient,
    _row: PhantomData<fn() -> T>,
}

impl<T> PgPageSource<T> {
    /// Creates a page source backed by the given client.
    pub fn new(client: PgClient) -> Self {
        Self {
            client,
            _row: PhantomData,
        }
    }

    /// Returns the client backing this source.
    #[inline]
    pub fn client(&self) -> &PgClient {
        &self.client
    }
}

impl<T> PageSource<T> for PgPageSource<T>
where
    T: diesel::deserialize::QueryableByName<Pg> + Send + 'static,
{
    type Error = PgError;

    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<T>, PgError> {
        let statement = request.statement;
        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            sql = %statement.sql(),
            binds = statement.binds().len(),
            "Executing page statement"
        );

        let mut conn = self.client.get_connection().await?;

        let mut query = diesel::sql_query(statement.sql().to_owned()).into_boxed();
        for value in statement.binds() {
            query = bind_value(query, value);
        }

        let rows: Vec<T> = query
            .load(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!(
                    target: TRACING_TARGET_QUERY,
                    error = %e,
                    "Page statement failed"
                );
                PgError::from(e)
            })?;

        tracing::trace!(
            target: TRACING_TARGET_QUERY,
            rows = rows.len(),
            "Page statement completed"
        );
        Ok(rows)
        // `conn` drops here and returns to the pool.
    }

    async fn release(&mut self) -> Result<(), PgError> {
        // Connections are acquired per fetch; there is nothing to release
        // between pages. The pool itself is owned by the client.
        Ok(())
    }
}

/// Appends one typed bind to a boxed SQL query.
fn bind_value<'f>(
    query: BoxedSqlQuery<'f, Pg, SqlQuery>,
    value: &SqlValue,
) -> BoxedSqlQuery<'f, Pg, SqlQuery> {
    match value {
        SqlValue::BigInt(v) => query.bind::<sql_types::BigInt, _>(*v),
        SqlValue::Text(v) => query.bind::<sql_types::Text, _>(v.clone()),
        SqlValue::Uuid(v) => query.bind::<sql_types::Uuid, _>(*v),
        SqlValue::Bool(v) => query.bind::<sql_types::Bool, _>(*v),
    }
}

impl<T> Clone for PgPageSource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _row: PhantomData,
        }
    }
}

impl<T> fmt::Debug for PgPageSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgPageSource")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
