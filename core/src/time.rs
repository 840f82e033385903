//! Time related utils.

use crate::Error;
use chrono::format::ParseError;
use chrono::NaiveDateTime;
use chrono::Utc;

/// DateTime is the alias for `chrono::DateTime<Utc>`.
pub type DateTime = chrono::DateTime<Utc>;

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into date: `20220301`
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format time into ISO8601 basic form: `20220313T072004Z`
pub fn format_iso8601(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parse time from an http date like `Fri, 23 Dec 2012 00:00:00 GMT`.
///
/// Numeric offsets (`Fri, 23 Dec 2012 00:00:00 -0700`) are accepted too. The
/// weekday is not cross-checked against the date, services are known to get
/// it wrong.
pub fn parse_http_date(s: &str) -> crate::Result<DateTime> {
    let s = s.trim();
    let rest = match s.split_once(", ") {
        Some((_, rest)) => rest,
        None => s,
    };

    if let Some(naive) = rest
        .strip_suffix(" GMT")
        .or_else(|| rest.strip_suffix(" UTC"))
    {
        return NaiveDateTime::parse_from_str(naive, "%d %b %Y %H:%M:%S")
            .map(|v| v.and_utc())
            .map_err(|e| parse_error(s, e));
    }

    chrono::DateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S %z")
        .map(|v| v.with_timezone(&Utc))
        .map_err(|e| parse_error(s, e))
}

fn parse_error(input: &str, err: ParseError) -> Error {
    Error::unexpected(format!("parse '{input}' into time failed")).with_source(err)
}
