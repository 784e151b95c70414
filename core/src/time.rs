//! Time related utils.

use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};

/// DateTime used across azstore.
pub type DateTime = chrono::DateTime<Utc>;

/// Create a new DateTime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into http date: `Sun, 06 Nov 1994 08:49:37 GMT`
///
/// ## Note
///
/// HTTP date is slightly different from RFC2822.
///
/// - Timezone is fixed to GMT.
/// - Day must be 2 digit.
pub fn format_http_date(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an http date such as the `Last-Modified` header.
pub fn parse_http_date(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc2822(s)
        .map_err(|e| Error::response_invalid(format!("invalid http date: {s}")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}

/// Format time as RFC 3339 in UTC: `2022-03-01T08:12:34Z`
pub fn format_rfc3339(t: DateTime) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp, fractional seconds included.
pub fn parse_rfc3339(s: &str) -> Result<DateTime> {
    let t = chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| Error::response_invalid(format!("invalid timestamp: {s}")).with_source(e))?;
    Ok(t.with_timezone(&Utc))
}
