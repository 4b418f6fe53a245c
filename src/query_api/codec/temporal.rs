//! Temporal text formats used by the Query API.
//!
//! Dates, times and date-times travel as ISO-8601 strings. Durations travel
//! as `PnYnMnDTnHnMnS` strings and are parsed with a small state machine so
//! that a component letter on the wrong side of `T` is rejected.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::driver::error::{DriverError, DriverResult};
use crate::driver::types::{Duration, OffsetTime, ZonedDateTime};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ============================================================================
// Formatting
// ============================================================================

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    let year = date.year();
    if (0..=9999).contains(&year) {
        format!("{:04}-{:02}-{:02}", year, date.month(), date.day())
    } else {
        format!("{:+05}-{:02}-{:02}", year, date.month(), date.day())
    }
}

/// Format a local time as `HH:MM:SS[.fffffffff]`, trailing zeros trimmed.
pub fn format_local_time(time: &NaiveTime) -> String {
    let mut out = format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second());
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// Format a UTC offset as `Z` or `+HH:MM[:SS]`.
pub fn format_offset(offset: &FixedOffset) -> String {
    let total = offset.local_minus_utc();
    if total == 0 {
        return "Z".to_string();
    }
    let sign = if total < 0 { '-' } else { '+' };
    let total = total.abs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if seconds == 0 {
        format!("{}{:02}:{:02}", sign, hours, minutes)
    } else {
        format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds)
    }
}

/// Format a time with offset.
pub fn format_time(time: &OffsetTime) -> String {
    format!("{}{}", format_local_time(&time.time), format_offset(&time.offset))
}

/// Format a local date-time as `YYYY-MM-DDTHH:MM:SS[.f]`.
pub fn format_local_date_time(datetime: &NaiveDateTime) -> String {
    format!("{}T{}", format_date(&datetime.date()), format_local_time(&datetime.time()))
}

/// Format a date-time with a fixed offset.
pub fn format_offset_date_time(datetime: &DateTime<FixedOffset>) -> String {
    format!(
        "{}{}",
        format_local_date_time(&datetime.naive_local()),
        format_offset(datetime.offset())
    )
}

/// Format a zoned date-time as `<local><offset>[<zone>]`.
///
/// Fails when the offset is unknown: the local time alone is ambiguous
/// around daylight-saving transitions.
pub fn format_zoned_date_time(datetime: &ZonedDateTime) -> DriverResult<String> {
    let offset = datetime.offset.ok_or_else(|| {
        DriverError::type_conversion(format!(
            "ZonedDateTime {}[{}] has no offset and cannot be encoded",
            format_local_date_time(&datetime.local),
            datetime.zone_id
        ))
    })?;
    Ok(format!(
        "{}{}[{}]",
        format_local_date_time(&datetime.local),
        format_offset(&offset),
        datetime.zone_id
    ))
}

/// Format a duration as `P<months>M<days>DT<seconds>S`.
///
/// Seconds and nanoseconds are combined into one signed decimal.
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.seconds as i128 * NANOS_PER_SECOND as i128 + duration.nanoseconds as i128;
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let whole = total / NANOS_PER_SECOND as i128;
    let fraction = total % NANOS_PER_SECOND as i128;

    let seconds = if fraction == 0 {
        format!("{}{}", sign, whole)
    } else {
        let digits = format!("{:09}", fraction);
        format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    };
    format!("P{}M{}DT{}S", duration.months, duration.days, seconds)
}

// ============================================================================
// Parsing
// ============================================================================

fn invalid(kind: &str, text: &str) -> DriverError {
    DriverError::protocol(format!("Invalid {} value: {}", kind, text))
}

/// Parse `YYYY-MM-DD` (with an optional sign on extended years).
pub fn parse_date(text: &str) -> DriverResult<NaiveDate> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let mut parts = rest.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("Date", text));
    };
    let year: i32 = year.parse().map_err(|_| invalid("Date", text))?;
    let month: u32 = month.parse().map_err(|_| invalid("Date", text))?;
    let day: u32 = day.parse().map_err(|_| invalid("Date", text))?;
    let year = if negative { -year } else { year };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid("Date", text))
}

/// Parse a fractional-second digit string into nanoseconds.
///
/// Shorter fractions are right-padded to nine digits, longer ones truncated.
fn parse_fraction(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}

/// Parse `HH:MM[:SS[.fffffffff]]`.
pub fn parse_local_time(text: &str) -> DriverResult<NaiveTime> {
    let mut parts = text.splitn(3, ':');
    let hour: u32 = parts
        .next()
        .and_then(|h| h.parse().ok())
        .ok_or_else(|| invalid("LocalTime", text))?;
    let minute: u32 = parts
        .next()
        .and_then(|m| m.parse().ok())
        .ok_or_else(|| invalid("LocalTime", text))?;

    let (second, nanos) = match parts.next() {
        None => (0, 0),
        Some(rest) => match rest.split_once(['.', ',']) {
            Some((second, fraction)) => (
                second.parse().map_err(|_| invalid("LocalTime", text))?,
                parse_fraction(fraction).ok_or_else(|| invalid("LocalTime", text))?,
            ),
            None => (rest.parse().map_err(|_| invalid("LocalTime", text))?, 0),
        },
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).ok_or_else(|| invalid("LocalTime", text))
}

/// Parse `Z`, `+HH`, `+HHMM`, `+HH:MM` or `+HH:MM:SS`.
pub fn parse_offset(text: &str) -> DriverResult<FixedOffset> {
    if text == "Z" || text == "z" {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("offset", text));
    }
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(invalid("offset", text)),
    };

    let fields: Vec<&str> = if rest.contains(':') {
        rest.split(':').collect()
    } else {
        rest.as_bytes()
            .chunks(2)
            .map(|c| std::str::from_utf8(c).unwrap_or(""))
            .collect()
    };
    if fields.is_empty() || fields.len() > 3 {
        return Err(invalid("offset", text));
    }

    let mut seconds = 0i32;
    for (field, unit) in fields.iter().zip([3600, 60, 1]) {
        if field.is_empty() || field.len() > 2 {
            return Err(invalid("offset", text));
        }
        let value: i32 = field.parse().map_err(|_| invalid("offset", text))?;
        seconds += value * unit;
    }
    FixedOffset::east_opt(sign * seconds).ok_or_else(|| invalid("offset", text))
}

/// Index where a trailing offset starts, if any.
fn offset_start(text: &str) -> Option<usize> {
    text.rfind(['+', '-', 'Z', 'z'])
}

/// Parse a time with offset, e.g. `12:50:35.556+01:00`.
pub fn parse_time(text: &str) -> DriverResult<OffsetTime> {
    let split = offset_start(text).ok_or_else(|| invalid("Time", text))?;
    let (time, offset) = text.split_at(split);
    Ok(OffsetTime::new(parse_local_time(time)?, parse_offset(offset)?))
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.f]`.
pub fn parse_local_date_time(text: &str) -> DriverResult<NaiveDateTime> {
    let (date, time) = text
        .split_once(['T', 't'])
        .ok_or_else(|| invalid("LocalDateTime", text))?;
    Ok(NaiveDateTime::new(parse_date(date)?, parse_local_time(time)?))
}

/// Parse a date-time with offset, e.g. `2015-11-21T21:40:32.142+01:00`.
pub fn parse_offset_date_time(text: &str) -> DriverResult<DateTime<FixedOffset>> {
    let (date, rest) = text
        .split_once(['T', 't'])
        .ok_or_else(|| invalid("OffsetDateTime", text))?;
    let split = offset_start(rest).ok_or_else(|| invalid("OffsetDateTime", text))?;
    let (time, offset) = rest.split_at(split);

    let local = NaiveDateTime::new(parse_date(date)?, parse_local_time(time)?);
    let offset = parse_offset(offset)?;
    local
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| invalid("OffsetDateTime", text))
}

/// Parse a zoned date-time, e.g. `2015-11-21T21:40:32.142+01:00[Europe/Stockholm]`.
///
/// The offset may be missing, in which case only the zone id is kept.
pub fn parse_zoned_date_time(text: &str) -> DriverResult<ZonedDateTime> {
    let (datetime, zone) = text
        .strip_suffix(']')
        .and_then(|t| t.split_once('['))
        .ok_or_else(|| invalid("ZonedDateTime", text))?;
    if zone.is_empty() {
        return Err(invalid("ZonedDateTime", text));
    }

    let (date, rest) = datetime
        .split_once(['T', 't'])
        .ok_or_else(|| invalid("ZonedDateTime", text))?;
    match offset_start(rest) {
        Some(split) => {
            let (time, offset) = rest.split_at(split);
            let local = NaiveDateTime::new(parse_date(date)?, parse_local_time(time)?);
            let offset = parse_offset(offset)?;
            let resolved = local
                .and_local_timezone(offset)
                .single()
                .ok_or_else(|| invalid("ZonedDateTime", text))?;
            Ok(ZonedDateTime::new(resolved, zone))
        }
        None => {
            let local = NaiveDateTime::new(parse_date(date)?, parse_local_time(rest)?);
            Ok(ZonedDateTime::with_zone_only(local, zone))
        }
    }
}

/// Parse an ISO-8601 duration.
///
/// `Y`, `M` (months) and `D` are accepted before `T`; `H`, `M` (minutes) and
/// `S` after it. Seconds may carry a fraction separated by `.` or `,`.
/// Week designators are rejected.
pub fn parse_duration(text: &str) -> DriverResult<Duration> {
    let body = text
        .strip_prefix('P')
        .ok_or_else(|| invalid("Duration", text))?;

    let mut months = 0i64;
    let mut days = 0i64;
    let mut seconds = 0i64;
    let mut nanos = 0i64;
    let mut in_time = false;
    let mut seen: Vec<(bool, char)> = Vec::new();
    let mut pending = String::new();

    for ch in body.chars() {
        if ch.is_ascii_alphabetic() && ch != 'T' {
            if seen.contains(&(in_time, ch)) {
                return Err(invalid("Duration", text));
            }
            seen.push((in_time, ch));
        }
        match ch {
            '0'..='9' | '.' | ',' | '-' | '+' => pending.push(ch),
            'T' if !in_time && pending.is_empty() => in_time = true,
            'W' => {
                return Err(DriverError::protocol(format!(
                    "Week durations are not supported: {}",
                    text
                )))
            }
            'Y' if !in_time => months = accumulate(months, take_whole(&mut pending, text)?, 12, text)?,
            'M' if !in_time => months = accumulate(months, take_whole(&mut pending, text)?, 1, text)?,
            'D' if !in_time => days = accumulate(days, take_whole(&mut pending, text)?, 1, text)?,
            'H' if in_time => seconds = accumulate(seconds, take_whole(&mut pending, text)?, 3600, text)?,
            'M' if in_time => seconds = accumulate(seconds, take_whole(&mut pending, text)?, 60, text)?,
            'S' if in_time => {
                let (whole, fraction) = take_seconds(&mut pending, text)?;
                seconds = accumulate(seconds, whole, 1, text)?;
                nanos += fraction;
            }
            _ => return Err(invalid("Duration", text)),
        }
    }

    if !pending.is_empty() || body.is_empty() || body.ends_with('T') {
        return Err(invalid("Duration", text));
    }

    let carry = nanos.div_euclid(NANOS_PER_SECOND);
    let nanos = nanos.rem_euclid(NANOS_PER_SECOND);
    let seconds = seconds
        .checked_add(carry)
        .ok_or_else(|| invalid("Duration", text))?;
    Ok(Duration::new(months, days, seconds, nanos as i32))
}

/// `total + value * unit`, failing on overflow
fn accumulate(total: i64, value: i64, unit: i64, text: &str) -> DriverResult<i64> {
    value
        .checked_mul(unit)
        .and_then(|v| total.checked_add(v))
        .ok_or_else(|| invalid("Duration", text))
}

fn take_whole(pending: &mut String, text: &str) -> DriverResult<i64> {
    let value = pending.parse().map_err(|_| invalid("Duration", text))?;
    pending.clear();
    Ok(value)
}

/// Seconds component as (whole seconds, signed nanoseconds).
fn take_seconds(pending: &mut String, text: &str) -> DriverResult<(i64, i64)> {
    let (negative, digits) = match pending.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, pending.strip_prefix('+').unwrap_or(pending.as_str())),
    };
    let (whole, fraction) = match digits.split_once(['.', ',']) {
        Some((whole, fraction)) => (
            whole,
            parse_fraction(fraction).ok_or_else(|| invalid("Duration", text))? as i64,
        ),
        None => (digits, 0),
    };
    let whole: i64 = whole.parse().map_err(|_| invalid("Duration", text))?;
    pending.clear();

    if negative {
        Ok((-whole, -fraction))
    } else {
        Ok((whole, fraction))
    }
}
