//! User-supplied query templates.

use std::fmt;

use crate::statement::StatementBuilder;

/// Builds the base query of a paged read.
///
/// A template is a closure from a [`StatementBuilder`] to a
/// [`StatementBuilder`]: it contributes the selection, filtering and
/// optional grouping of the query, independent of pagination. The reader
/// re-renders the template for every page fetch and decorates the result
/// with the ORDER BY clause, the continuation predicate and the LIMIT.
///
/// Templates must not apply ORDER BY or LIMIT themselves; those belong to
/// the reader. The template's output columns must include the configured key
/// columns; for grouped queries that means the grouped columns themselves.
///
/// ```
/// use batchfeed_core::QueryTemplate;
///
/// let template = QueryTemplate::new(|q| {
///     q.push("SELECT id, name FROM manufacture WHERE create_date = ")
///         .push_bind("2020-10-12")
///         .push("::date GROUP BY id, name")
/// });
/// ```
pub struct QueryTemplate {
    build: Box<dyn Fn(StatementBuilder) -> StatementBuilder + Send + Sync>,
}

impl QueryTemplate {
    /// Creates a template from a builder closure.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(StatementBuilder) -> StatementBuilder + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
        }
    }

    /// Creates a template from a fixed SQL string with no bind parameters.
    pub fn from_sql(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self::new(move |builder| builder.push(&sql))
    }

    /// Renders the base query into a fresh builder.
    pub(crate) fn render(&self) -> StatementBuilder {
        (self.build)(StatementBuilder::new())
    }
}

impl fmt::Debug for QueryTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTemplate").finish_non_exhaustive()
    }
}
