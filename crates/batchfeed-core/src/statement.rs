//! SQL statement assembly with managed bind placeholders.

use std::fmt;

use crate::value::SqlValue;

/// Subquery alias used when wrapping a query template for pagination.
pub(crate) const PAGE_SUBQUERY_ALIAS: &str = "page_rows";

/// Incrementally builds SQL text and its ordered bind values.
///
/// Placeholders are Postgres-numbered (`$1`, `$2`, ...) and assigned in bind
/// order by the builder, so query templates and pagination decorations can be
/// composed without either side tracking the other's parameter count. A
/// placeholder may be referenced more than once in the SQL text; the value
/// is bound a single time.
#[derive(Debug, Default)]
pub struct StatementBuilder {
    sql: String,
    binds: Vec<SqlValue>,
}

impl StatementBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw SQL text.
    pub fn push(mut self, sql: &str) -> Self {
        self.push_sql(sql);
        self
    }

    /// Appends the next placeholder and registers its bind value.
    pub fn push_bind(mut self, value: impl Into<SqlValue>) -> Self {
        let placeholder = self.bind_value(value.into());
        self.push_sql(&placeholder);
        self
    }

    /// Appends raw SQL text.
    pub(crate) fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Registers a bind value and returns its placeholder (`$n`).
    ///
    /// The placeholder is not appended to the SQL text; callers decide where
    /// and how often to reference it.
    pub(crate) fn bind_value(&mut self, value: SqlValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    /// Wraps the SQL built so far as a named subquery.
    ///
    /// Turns `<base>` into `SELECT * FROM (<base>) AS <alias>`, leaving the
    /// bind list untouched. Pagination decorations appended afterwards apply
    /// to the subquery's output columns, which is what makes continuation
    /// predicates work against grouped templates.
    pub(crate) fn wrap_as_subquery(&mut self, alias: &str) {
        self.sql = format!("SELECT * FROM ({}) AS {alias}", self.sql);
    }

    /// Returns the number of values bound so far.
    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    /// Finishes the builder into an executable statement.
    pub fn build(self) -> PageStatement {
        PageStatement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

/// A fully rendered page query: SQL text plus ordered bind values.
///
/// Produced by the paging readers once per page fetch and handed to a
/// [`PageSource`] for execution.
///
/// [`PageSource`]: crate::PageSource
#[derive(Debug, Clone, PartialEq)]
pub struct PageStatement {
    sql: String,
    binds: Vec<SqlValue>,
}

impl PageStatement {
    /// Returns the SQL text with numbered placeholders.
    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bind values in placeholder order.
    #[inline]
    pub fn binds(&self) -> &[SqlValue] {
        &self.binds
    }
}

impl fmt::Display for PageStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} binds]", self.sql, self.binds.len())
    }
}
