#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for reader lifecycle and page-fetch events.
///
/// Use this target for logging open/read/close transitions and per-page
/// progress of the paging readers.
pub const TRACING_TARGET_READER: &str = "batchfeed_core::reader";

/// Tracing target for page statement rendering.
///
/// Use this target for logging rendered SQL and bind parameter counts.
pub const TRACING_TARGET_STATEMENT: &str = "batchfeed_core::statement";

mod cursor;
mod key;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod memory;
mod offset;
mod options;
mod reader;
mod sort;
mod source;
mod statement;
mod template;
mod value;

pub use crate::cursor::PageCursor;
pub use crate::key::KeyColumn;
#[cfg(any(test, feature = "test-utils"))]
pub use crate::memory::{MemoryPageSource, MemorySourceError};
pub use crate::offset::OffsetPagingReader;
pub use crate::options::KeysetOptions;
pub use crate::reader::KeysetPagingReader;
pub use crate::sort::{SortOrder, SortSpec};
pub use crate::source::{PageRequest, PageSource};
pub use crate::statement::{PageStatement, StatementBuilder};
pub use crate::template::QueryTemplate;
pub use crate::value::SqlValue;

pub mod error {
    //! Error types and utilities for paged reading.
    //!
    //! See [`ReaderError`] for the main error type used throughout this
    //! crate.
    //!
    //! [`ReaderError`]: crate::ReaderError

    /// Type-erased error type for dynamic error handling.
    ///
    /// Page-fetch failures surface the underlying source error through this
    /// alias so callers can downcast to the concrete persistence error when
    /// they need to.
    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
}

/// Error type for reader construction and read operations.
///
/// End-of-data is *not* an error: [`read`] signals stream completion by
/// returning `Ok(None)`.
///
/// [`read`]: crate::KeysetPagingReader::read
#[derive(Debug, thiserror::Error)]
#[must_use = "reader errors should be handled appropriately"]
pub enum ReaderError {
    /// Configuration error.
    ///
    /// Raised at construction or open time only: invalid chunk size, empty
    /// or invalid key column lists, or a restored cursor that does not match
    /// the configured key columns. Never raised during a read.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The reader was not opened before the first read.
    #[error("Reader must be opened before it can be read")]
    NotOpened,

    /// A page query failed.
    ///
    /// Wraps the page source's error unmodified. Fatal for the current read;
    /// the reader performs no internal retry.
    #[error("Page query error: {0}")]
    Query(#[source] error::BoxError),
}

/// Specialized [`Result`] type for reader operations.
pub type ReaderResult<T, E = ReaderError> = Result<T, E>;
