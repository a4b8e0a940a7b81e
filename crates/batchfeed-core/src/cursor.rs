//! Paging cursor: the last-seen key values of a keyset-paged read.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// A cursor over a keyset-paged result set.
///
/// Holds the key value(s) of the last row of the most recently fetched page,
/// or nothing before the first page. The cursor is advanced only by the
/// reader that owns it and is reset when the reader is reopened.
///
/// Cursors serialize as a list of primitive-typed values, and can be encoded
/// as an opaque URL-safe token for checkpoint storage between job runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Key values of the last row seen, in key column order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last: Option<Vec<SqlValue>>,
}

impl PageCursor {
    /// Creates a cursor positioned before the first page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cursor positioned after the given key values.
    pub fn after(values: Vec<SqlValue>) -> Self {
        Self { last: Some(values) }
    }

    /// Returns whether the cursor is still at its initial position.
    #[inline]
    pub fn is_initial(&self) -> bool {
        self.last.is_none()
    }

    /// Returns the last-seen key values, if any.
    #[inline]
    pub fn values(&self) -> Option<&[SqlValue]> {
        self.last.as_deref()
    }

    /// Replaces the cursor position with the given key values.
    pub(crate) fn advance(&mut self, values: Vec<SqlValue>) {
        self.last = Some(values);
    }

    /// Resets the cursor to its initial position.
    pub(crate) fn reset(&mut self) {
        self.last = None;
    }

    /// Encodes the cursor as a URL-safe base64 token.
    pub fn encode(&self) -> String {
        // Serialization of a list of plain enum values cannot fail.
        let json = serde_json::to_vec(&self.last).unwrap_or_default();
        BASE64_URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a cursor from a URL-safe base64 token.
    ///
    /// Returns `None` if the token is invalid or malformed.
    pub fn decode(encoded: &str) -> Option<Self> {
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let last = serde_json::from_slice(&bytes).ok()?;
        Some(Self { last })
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}
