//! Sort direction and ordered column specifications.

use serde::{Deserialize, Serialize};

use crate::{ReaderError, ReaderResult};

/// Sort order direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending order (A-Z, oldest first, smallest first).
    #[default]
    Asc,
    /// Descending order (Z-A, newest first, largest first).
    Desc,
}

impl SortOrder {
    /// Returns whether the sort order is ascending.
    #[inline]
    pub fn is_asc(self) -> bool {
        matches!(self, SortOrder::Asc)
    }

    /// Returns whether the sort order is descending.
    #[inline]
    pub fn is_desc(self) -> bool {
        matches!(self, SortOrder::Desc)
    }

    /// Returns the SQL keyword for this direction.
    #[inline]
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Returns the strict comparison operator that selects rows *after* a
    /// value in this direction.
    #[inline]
    pub(crate) fn continuation_operator(self) -> &'static str {
        match self {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        }
    }
}

/// An ordered, validated list of sort columns with a shared direction.
///
/// Used by [`OffsetPagingReader`] to impose a deterministic order on paged
/// queries. Column names must be valid SQL identifiers (optionally
/// qualified); anything else is a configuration error at construction.
///
/// [`OffsetPagingReader`]: crate::OffsetPagingReader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    columns: Vec<String>,
    order: SortOrder,
}

impl SortSpec {
    /// Creates a sort specification over the given columns.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if the column list is empty or any
    /// name is not a valid identifier.
    pub fn new<I, S>(columns: I, order: SortOrder) -> ReaderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(ReaderError::Config(
                "sort column list cannot be empty".to_string(),
            ));
        }
        for column in &columns {
            validate_identifier(column)?;
        }

        Ok(Self { columns, order })
    }

    /// Creates a single-column ascending sort.
    pub fn asc(column: impl Into<String>) -> ReaderResult<Self> {
        Self::new([column.into()], SortOrder::Asc)
    }

    /// Creates a single-column descending sort.
    pub fn desc(column: impl Into<String>) -> ReaderResult<Self> {
        Self::new([column.into()], SortOrder::Desc)
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Returns the sort direction.
    #[inline]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Renders the ORDER BY clause for this specification.
    pub(crate) fn order_by_sql(&self) -> String {
        order_by_clause(self.columns.iter().map(String::as_str), self.order)
    }
}

/// Renders an `ORDER BY` clause over the given columns and direction.
pub(crate) fn order_by_clause<'a>(
    columns: impl Iterator<Item = &'a str>,
    order: SortOrder,
) -> String {
    let rendered: Vec<String> = columns
        .map(|name| format!("{} {}", name, order.as_sql()))
        .collect();
    format!("ORDER BY {}", rendered.join(", "))
}

/// Validates a column reference for interpolation into SQL text.
///
/// Accepts plain identifiers and single-level qualified names
/// (`alias.column`). Each segment must start with a letter or underscore and
/// contain only ASCII alphanumerics and underscores.
pub(crate) fn validate_identifier(name: &str) -> ReaderResult<()> {
    let invalid = || {
        ReaderError::Config(format!(
            "invalid column identifier: {name:?} (expected [A-Za-z_][A-Za-z0-9_]*, optionally qualified)"
        ))
    };

    if name.is_empty() {
        return Err(invalid());
    }

    if name.split('.').count() > 2 {
        return Err(invalid());
    }

    for segment in name.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(invalid()),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }
    }

    Ok(())
}
