//! Text encoding of timestamps persisted by the SQLite backend.
//!
//! The codec is handed to [`SqliteStore`](super::sqlite::SqliteStore) at
//! construction; there is no process-wide registry of type handlers.

use chrono::{DateTime, NaiveDateTime, ParseError, Utc};

/// Column format: `yyyy-MM-dd HH:mm:ss`, always UTC.
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts timestamps to and from their stored text form.
///
/// Formatted values must sort lexically in chronological order: the expired-row
/// sweep compares them directly in SQL.
pub trait TimestampCodec: Send + Sync {
    fn format(&self, at: DateTime<Utc>) -> String;

    /// # Errors
    ///
    /// Returns the underlying [`ParseError`] if `raw` is not in this codec's format.
    fn parse(&self, raw: &str) -> Result<DateTime<Utc>, ParseError>;
}

/// Second-granularity `yyyy-MM-dd HH:mm:ss` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDateTime;

impl TimestampCodec for SqlDateTime {
    fn format(&self, at: DateTime<Utc>) -> String {
        at.format(SQL_DATETIME_FORMAT).to_string()
    }

    fn parse(&self, raw: &str) -> Result<DateTime<Utc>, ParseError> {
        NaiveDateTime::parse_from_str(raw, SQL_DATETIME_FORMAT).map(|naive| naive.and_utc())
    }
}
