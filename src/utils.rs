use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{EdfError, Result};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Decodes a fixed-width header field and strips the space padding.
pub fn trim_field(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

/// 检查字符串是否为有效的整数
pub fn is_integer_number(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Checks for a plain decimal number: optional sign, digits, at most one
/// `.` and at least one digit. Exponents, `inf` and `NaN` are rejected.
pub fn is_decimal_number(s: &str) -> bool {
    let s = s.trim();
    let body = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);

    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in body.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

/// Parses a non-negative integer header field.
pub fn parse_unsigned(s: &str) -> Option<u32> {
    let s = s.trim();
    if !is_integer_number(s) || s.starts_with('-') {
        return None;
    }
    s.trim_start_matches('+').parse().ok()
}

/// Parses a decimal header or TAL number into seconds.
pub fn parse_decimal(s: &str) -> Option<f64> {
    if !is_decimal_number(s) {
        return None;
    }
    s.trim().parse().ok()
}

/// Converts fractional seconds to a `Duration` at nanosecond resolution.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::nanoseconds((seconds * NANOS_PER_SECOND).round() as i64)
}

/// Converts a `Duration` to fractional seconds.
pub fn duration_to_seconds(duration: Duration) -> f64 {
    match duration.num_nanoseconds() {
        Some(nanos) => nanos as f64 / NANOS_PER_SECOND,
        // 超出 i64 纳秒范围（约292年）时退化为毫秒精度
        None => duration.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Combines the `dd.mm.yy` and `hh.mm.ss` header fields.
///
/// Two-digit years use the EDF clipping rule: 85-99 are 19xx, 00-84 are 20xx.
pub fn parse_start_datetime(date_str: &str, time_str: &str) -> Result<NaiveDateTime> {
    let date_err = || EdfError::malformed("start_date", None, date_str);
    let time_err = || EdfError::malformed("start_time", None, time_str);

    let date_parts: Vec<&str> = date_str.trim().split('.').collect();
    if date_parts.len() != 3 {
        return Err(date_err());
    }
    let day = parse_unsigned(date_parts[0]).ok_or_else(date_err)?;
    let month = parse_unsigned(date_parts[1]).ok_or_else(date_err)?;
    let yy = parse_unsigned(date_parts[2]).ok_or_else(date_err)?;
    let year = if yy > 84 { 1900 + yy } else { 2000 + yy };

    let start_date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(date_err)?;

    let time_parts: Vec<&str> = time_str.trim().split('.').collect();
    if time_parts.len() != 3 {
        return Err(time_err());
    }
    let hour = parse_unsigned(time_parts[0]).ok_or_else(time_err)?;
    let minute = parse_unsigned(time_parts[1]).ok_or_else(time_err)?;
    let second = parse_unsigned(time_parts[2]).ok_or_else(time_err)?;

    let start_time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(time_err)?;

    Ok(NaiveDateTime::new(start_date, start_time))
}
