//! Keyset pagination options: key columns, direction, and predicate
//! rendering.

use crate::key::KeyColumn;
use crate::sort::{SortOrder, order_by_clause};
use crate::statement::StatementBuilder;
use crate::value::SqlValue;
use crate::{ReaderError, ReaderResult, TRACING_TARGET_STATEMENT};

/// Describes the pagination key of a keyset-paged query.
///
/// Holds the ordered key column list and the sort direction, and owns the
/// three pagination concerns derived from them: the ORDER BY clause, the
/// "strictly after the cursor" continuation predicate, and extraction of the
/// cursor key from the last row of a page.
///
/// A single direction applies to every key column; the cursor is compared
/// row-lexicographically. Keys that are not unique on their own should
/// include a uniquely-identifying trailing column (typically the row id) so
/// ties cannot produce duplicates or gaps across page boundaries.
pub struct KeysetOptions<T> {
    columns: Vec<KeyColumn<T>>,
    order: SortOrder,
}

impl<T> Clone for KeysetOptions<T> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            order: self.order,
        }
    }
}

impl<T> std::fmt::Debug for KeysetOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysetOptions")
            .field("columns", &self.columns)
            .field("order", &self.order)
            .finish()
    }
}

impl<T> KeysetOptions<T> {
    /// Creates options over a single key column.
    pub fn single(column: KeyColumn<T>, order: SortOrder) -> Self {
        Self {
            columns: vec![column],
            order,
        }
    }

    /// Creates options over a composite key.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if the column list is empty or two
    /// columns share a name.
    pub fn composite(columns: Vec<KeyColumn<T>>, order: SortOrder) -> ReaderResult<Self> {
        if columns.is_empty() {
            return Err(ReaderError::Config(
                "key column list cannot be empty".to_string(),
            ));
        }
        for (index, column) in columns.iter().enumerate() {
            let duplicate = columns[..index].iter().any(|c| c.name() == column.name());
            if duplicate {
                return Err(ReaderError::Config(format!(
                    "duplicate key column: {:?}",
                    column.name()
                )));
            }
        }

        Ok(Self { columns, order })
    }

    /// Returns the sort direction.
    #[inline]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Returns the key column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(KeyColumn::name)
    }

    /// Returns the number of key columns.
    #[inline]
    pub fn key_len(&self) -> usize {
        self.columns.len()
    }

    /// Extracts the cursor key values from a row, in column order.
    pub(crate) fn key_of(&self, row: &T) -> Vec<SqlValue> {
        self.columns.iter().map(|c| c.extract(row)).collect()
    }

    /// Renders the ORDER BY clause matching this key.
    pub(crate) fn order_by_sql(&self) -> String {
        order_by_clause(self.column_names(), self.order)
    }

    /// Writes the continuation predicate for the given cursor values.
    ///
    /// Renders the lexicographic strictly-after condition
    /// `(k1 > v1 OR (k1 = v1 AND k2 > v2) OR ...)`, with the comparator
    /// flipped for descending order. Each cursor value is bound once and its
    /// placeholder reused by every disjunct that references it.
    pub(crate) fn write_continuation(&self, builder: &mut StatementBuilder, cursor: &[SqlValue]) {
        debug_assert_eq!(cursor.len(), self.columns.len());

        let placeholders: Vec<String> = cursor
            .iter()
            .map(|value| builder.bind_value(value.clone()))
            .collect();
        let operator = self.order.continuation_operator();

        let mut disjuncts = Vec::with_capacity(self.columns.len());
        for (index, column) in self.columns.iter().enumerate() {
            let mut terms: Vec<String> = self.columns[..index]
                .iter()
                .zip(&placeholders[..index])
                .map(|(tied, placeholder)| format!("{} = {placeholder}", tied.name()))
                .collect();
            terms.push(format!(
                "{} {operator} {}",
                column.name(),
                placeholders[index]
            ));

            if terms.len() == 1 {
                disjuncts.push(terms.remove(0));
            } else {
                disjuncts.push(format!("({})", terms.join(" AND ")));
            }
        }

        let predicate = format!("({})", disjuncts.join(" OR "));
        tracing::trace!(
            target: TRACING_TARGET_STATEMENT,
            predicate = %predicate,
            "Rendered continuation predicate"
        );
        builder.push_sql(&predicate);
    }
}
