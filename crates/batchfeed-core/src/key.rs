//! Pagination key columns.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::sort::validate_identifier;
use crate::value::SqlValue;
use crate::{ReaderError, ReaderResult};

/// One column of a pagination key.
///
/// Pairs a column reference with a typed extraction closure that reads the
/// key value back out of a fetched row. The column name must refer to an
/// output column of the query template (for grouped templates, one of the
/// grouped columns); the closure is the row-side counterpart and resolves a
/// field path, so keys on fields embedded through struct composition work
/// the same as directly-declared fields.
///
/// The typed constructors tie the column to the value variant it produces,
/// so a key column can never yield a value of the wrong type at runtime.
pub struct KeyColumn<T> {
    name: String,
    extract: Arc<dyn Fn(&T) -> SqlValue + Send + Sync>,
}

impl<T> KeyColumn<T> {
    /// Creates a 64-bit integer key column.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if `name` is not a valid identifier.
    pub fn big_int<F>(name: impl Into<String>, extract: F) -> ReaderResult<Self>
    where
        F: Fn(&T) -> i64 + Send + Sync + 'static,
    {
        Self::checked(name, move |row| SqlValue::BigInt(extract(row)))
    }

    /// Creates a text key column.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if `name` is not a valid identifier.
    pub fn text<F>(name: impl Into<String>, extract: F) -> ReaderResult<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::checked(name, move |row| SqlValue::Text(extract(row)))
    }

    /// Creates a uuid key column.
    ///
    /// Uuid columns are the usual uniquely-identifying trailing column of a
    /// composite key.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError::Config`] if `name` is not a valid identifier.
    pub fn uuid<F>(name: impl Into<String>, extract: F) -> ReaderResult<Self>
    where
        F: Fn(&T) -> Uuid + Send + Sync + 'static,
    {
        Self::checked(name, move |row| SqlValue::Uuid(extract(row)))
    }

    fn checked<F>(name: impl Into<String>, extract: F) -> ReaderResult<Self>
    where
        F: Fn(&T) -> SqlValue + Send + Sync + 'static,
    {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            extract: Arc::new(extract),
        })
    }

    /// Returns the column reference.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extracts this column's key value from a row.
    pub(crate) fn extract(&self, row: &T) -> SqlValue {
        (self.extract)(row)
    }
}

impl<T> Clone for KeyColumn<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            extract: Arc::clone(&self.extract),
        }
    }
}

impl<T> fmt::Debug for KeyColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyColumn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
