//! Wire result shapes beyond a plain object or array.
//!
//! The platform wraps some responses in envelope objects: paginated indexes,
//! row copy/move results, and event streams. Field names match the wire
//! (camelCase); pagination metadata is preserved verbatim, never recomputed.

use serde::{Deserialize, Serialize};

/// A page of results plus the server's pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    /// The page contents, in server order.
    pub data: Vec<T>,
    /// 1-based page number.
    pub page_number: Option<i64>,
    /// Requested page size.
    pub page_size: Option<i64>,
    /// Total items across all pages.
    pub total_count: Option<i64>,
    /// Total number of pages.
    pub total_pages: Option<i64>,
}

/// Result of copying or moving rows between sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOrMoveRowResult {
    /// The sheet the rows landed in.
    pub destination_sheet_id: Option<i64>,
    /// Source-to-destination row id pairs.
    pub row_mappings: Option<Vec<RowMapping>>,
}

/// One source-to-destination row id pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMapping {
    /// Row id in the source sheet.
    pub from: i64,
    /// Row id in the destination sheet.
    pub to: i64,
}

/// A batch of events plus the stream cursor.
///
/// Structurally close to [`PaginatedResult`] but cursor-based rather than
/// page-based, so it stays a separate shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult<T> {
    /// The events, in stream order.
    pub data: Vec<T>,
    /// Whether more events are available right now.
    pub more_available: Option<bool>,
    /// Cursor to pass on the next poll.
    pub next_stream_position: Option<String>,
}
