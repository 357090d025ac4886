//! Time literal resolution
//!
//! Turns a timestamp literal into a signed epoch-millisecond value. Accepts
//! bare integers (already epoch millis), the relative literal `now`, and
//! calendar strings in several shapes: `-`, `/` or `.` date separators, an
//! optional `T` or space time-of-day separator, optional fractional seconds,
//! and an optional explicit UTC offset suffix. The format is sniffed from
//! the input shape before parsing, so new shapes can be added here without
//! touching the planner.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use super::ast::AstNode;
use super::error::{PlanError, PlanResult};

/// Resolve a timestamp literal against the configured timezone.
///
/// `now` resolves to the wall clock at call time, so two resolutions are not
/// guaranteed to be identical. Callers needing determinism must resolve the
/// timestamp themselves before building the AST.
pub fn resolve_timestamp(text: &str, tz: &FixedOffset) -> PlanResult<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PlanError::value(text, "input timestamp cannot be empty"));
    }
    if trimmed.eq_ignore_ascii_case("now") {
        return Ok(Utc::now().timestamp_millis());
    }
    if is_integer(trimmed) {
        return trimmed
            .parse::<i64>()
            .map_err(|e| PlanError::value(trimmed, e.to_string()));
    }
    let format = sniff_format(trimmed)?;
    parse_calendar(trimmed, &format, tz)
}

/// Resolve a composite date/time token node by concatenating its children's
/// text fragments and parsing the result.
pub fn resolve_datetime_node(node: &AstNode, tz: &FixedOffset) -> PlanResult<i64> {
    let mut text = String::new();
    for child in &node.children {
        text.push_str(child.text());
    }
    resolve_timestamp(&text, tz)
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Derive a chrono format string from the literal's shape: date separator,
/// presence of a time-of-day part, fractional seconds, explicit offset.
fn sniff_format(text: &str) -> PlanResult<String> {
    if !text.is_ascii() || text.len() < 10 {
        return Err(PlanError::value(text, "unrecognized timestamp format"));
    }
    let bytes = text.as_bytes();
    let sep = bytes[4] as char;
    if !matches!(sep, '-' | '/' | '.') || bytes[7] as char != sep {
        return Err(PlanError::value(text, "unrecognized date separator"));
    }
    let mut format = format!("%Y{sep}%m{sep}%d");
    let rest = &text[10..];
    if rest.is_empty() {
        return Ok(format);
    }
    let time_sep = rest.as_bytes()[0] as char;
    if !matches!(time_sep, 'T' | ' ') {
        return Err(PlanError::value(text, "unrecognized time separator"));
    }
    format.push(time_sep);
    format.push_str("%H:%M:%S");
    if rest.contains('.') {
        format.push_str("%.f");
    }
    if rest.contains('+') || rest[1..].contains('-') {
        format.push_str("%z");
    }
    Ok(format)
}

fn parse_calendar(text: &str, format: &str, tz: &FixedOffset) -> PlanResult<i64> {
    // An explicit offset suffix carries its own zone and wins over the
    // configured timezone.
    if format.ends_with("%z") {
        let datetime = DateTime::parse_from_str(text, format)
            .map_err(|e| PlanError::value(text, e.to_string()))?;
        return Ok(datetime.timestamp_millis());
    }
    let local = if format.contains("%H") {
        NaiveDateTime::parse_from_str(text, format)
            .map_err(|e| PlanError::value(text, e.to_string()))?
    } else {
        let date =
            NaiveDate::parse_from_str(text, format).map_err(|e| PlanError::value(text, e.to_string()))?;
        match date.and_hms_opt(0, 0, 0) {
            Some(dt) => dt,
            None => return Err(PlanError::value(text, "invalid date")),
        }
    };
    match local.and_local_timezone(*tz).single() {
        Some(datetime) => Ok(datetime.timestamp_millis()),
        None => Err(PlanError::value(text, "ambiguous local time")),
    }
}
