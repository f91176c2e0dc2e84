//! Lexical forms of constant expressions
//!
//! Parsing never panics: malformed text is reported as a [`LiteralError`]
//! carrying the matching `Invalid*` error code so callers can keep the text
//! as a malformed constant and let the validator report it.

use crate::expression::{Constant, ConstantKind, Expression};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use odata_edm_diagnostics::EdmErrorCode;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Text that is not a valid literal of the expected kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{text}' is not a valid {kind} value")]
pub struct LiteralError {
    pub kind: ConstantKind,
    pub text: String,
}

impl LiteralError {
    fn new(kind: ConstantKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }

    /// Error code reported for this literal kind
    pub fn code(&self) -> EdmErrorCode {
        invalid_code(self.kind)
    }
}

/// `Invalid*` code for malformed literals of `kind`
pub fn invalid_code(kind: ConstantKind) -> EdmErrorCode {
    match kind {
        ConstantKind::Binary => EdmErrorCode::InvalidBinary,
        ConstantKind::Bool => EdmErrorCode::InvalidBoolean,
        ConstantKind::Date => EdmErrorCode::InvalidDate,
        ConstantKind::DateTimeOffset => EdmErrorCode::InvalidDateTimeOffset,
        ConstantKind::Decimal => EdmErrorCode::InvalidDecimal,
        ConstantKind::Duration => EdmErrorCode::InvalidDuration,
        ConstantKind::Float => EdmErrorCode::InvalidFloatingPoint,
        ConstantKind::Guid => EdmErrorCode::InvalidGuid,
        ConstantKind::Int => EdmErrorCode::InvalidInteger,
        ConstantKind::String => EdmErrorCode::XmlError,
        ConstantKind::TimeOfDay => EdmErrorCode::InvalidTimeOfDay,
    }
}

/// Parse literal text of the given kind
pub fn parse_constant(kind: ConstantKind, text: &str) -> Result<Constant, LiteralError> {
    let err = || LiteralError::new(kind, text);
    let trimmed = text.trim();
    match kind {
        ConstantKind::String => Ok(Constant::String(text.to_string())),
        ConstantKind::Binary => hex::decode(trimmed).map(Constant::Binary).map_err(|_| err()),
        ConstantKind::Bool => parse_bool(trimmed).map(Constant::Bool).ok_or_else(err),
        ConstantKind::Int => trimmed.parse::<i64>().map(Constant::Int).map_err(|_| err()),
        ConstantKind::Float => parse_float(trimmed).map(Constant::Float).ok_or_else(err),
        ConstantKind::Decimal => Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Constant::Decimal)
            .map_err(|_| err()),
        ConstantKind::Guid => Uuid::parse_str(trimmed).map(Constant::Guid).map_err(|_| err()),
        ConstantKind::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Constant::Date)
            .map_err(|_| err()),
        ConstantKind::TimeOfDay => parse_time_of_day(trimmed)
            .map(Constant::TimeOfDay)
            .ok_or_else(err),
        ConstantKind::DateTimeOffset => DateTime::parse_from_rfc3339(trimmed)
            .map(Constant::DateTimeOffset)
            .map_err(|_| err()),
        ConstantKind::Duration => parse_duration(trimmed)
            .map(Constant::Duration)
            .ok_or_else(err),
    }
}

/// Canonical lexical form of a constant
pub fn format_constant(constant: &Constant) -> String {
    match constant {
        Constant::Binary(bytes) => hex::encode_upper(bytes),
        Constant::Bool(b) => b.to_string(),
        Constant::Date(d) => d.format("%Y-%m-%d").to_string(),
        Constant::DateTimeOffset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Constant::Decimal(d) => d.to_string(),
        Constant::Duration(d) => format_duration(d),
        Constant::Float(f) => format_float(*f),
        Constant::Guid(g) => g.hyphenated().to_string(),
        Constant::Int(i) => i.to_string(),
        Constant::String(s) => s.clone(),
        Constant::TimeOfDay(t) => t.format("%H:%M:%S%.f").to_string(),
    }
}

/// Constant expression from literal text, malformed if it does not parse
pub fn literal_expression(kind: ConstantKind, text: &str) -> Expression {
    match parse_constant(kind, text) {
        Ok(constant) => Expression::constant(constant),
        Err(_) => Expression::malformed(kind, text),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust accepts "inf" and "infinity", CSDL does not
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => text.parse().ok(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

/// Parse an `xsd:dayTimeDuration` such as `-P1DT2H3M4.5S`
pub fn parse_duration(text: &str) -> Option<chrono::Duration> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((d, t)) => {
            if t.is_empty() {
                return None;
            }
            (d, Some(t))
        }
        None => (rest, None),
    };
    if date_part.is_empty() && time_part.is_none() {
        return None;
    }

    let mut nanos: i128 = 0;
    if !date_part.is_empty() {
        let days = date_part.strip_suffix('D')?;
        nanos += parse_unsigned(days)? as i128 * 86_400_000_000_000;
    }
    if let Some(mut time) = time_part {
        for (designator, unit) in [('H', 3_600_000_000_000i128), ('M', 60_000_000_000)] {
            if let Some((amount, tail)) = time.split_once(designator) {
                nanos += parse_unsigned(amount)? as i128 * unit;
                time = tail;
            }
        }
        if !time.is_empty() {
            let seconds = time.strip_suffix('S')?;
            nanos += parse_seconds(seconds)?;
        }
    }

    let nanos = if negative { -nanos } else { nanos };
    let nanos = i64::try_from(nanos).ok()?;
    Some(chrono::Duration::nanoseconds(nanos))
}

fn parse_unsigned(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_seconds(text: &str) -> Option<i128> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let mut nanos = parse_unsigned(whole)? as i128 * 1_000_000_000;
    if !fraction.is_empty() {
        if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let padded = format!("{:0<9}", fraction);
        nanos += padded.parse::<i128>().ok()?;
    }
    Some(nanos)
}

/// Canonical `xsd:dayTimeDuration` text
pub fn format_duration(duration: &chrono::Duration) -> String {
    let total = duration.num_nanoseconds().map(i128::from).unwrap_or_else(|| {
        i128::from(duration.num_milliseconds()) * 1_000_000
    });
    let negative = total < 0;
    let mut rest = total.abs();

    let days = rest / 86_400_000_000_000;
    rest %= 86_400_000_000_000;
    let hours = rest / 3_600_000_000_000;
    rest %= 3_600_000_000_000;
    let minutes = rest / 60_000_000_000;
    rest %= 60_000_000_000;
    let seconds = rest / 1_000_000_000;
    let fraction = rest % 1_000_000_000;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || fraction > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || fraction > 0 || (hours == 0 && minutes == 0) {
            if fraction > 0 {
                let digits = format!("{:09}", fraction);
                out.push_str(&format!("{}.{}S", seconds, digits.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{}S", seconds));
            }
        }
    }
    out
}
