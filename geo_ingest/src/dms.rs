//! Parsing and formatting of geodetic angles written as decimal degrees or
//! degree/minute/second text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;

static LAT_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:90(?:\.0{1,20})?|(?:[0-9]|[1-8][0-9])(?:\.[0-9]{1,20})?)$")
        .expect("latitude pattern")
});

static LON_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[+-]?(?:180(?:\.0{1,20})?|(?:[0-9]|[1-9][0-9]|1[0-7][0-9])(?:\.[0-9]{1,20})?)$",
    )
    .expect("longitude pattern")
});

static SIGNED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+(?:\.[0-9]+)?$").expect("number pattern"));

static LAT_DMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(-)?(?:(90)[\s:°d]+(00)[\s:'′m]+(00(?:\.0+)?)"#,
        r#"|([0-8]?[0-9])[\s:°d]+([0-5]?[0-9])[\s:'′m]+([0-5]?[0-9](?:\.\d+)?))"#,
        r#"[\s"″]*([NnSs])?$"#,
    ))
    .expect("latitude dms pattern")
});

static LON_DMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"^(-)?(?:(180)[\s:°d]+(00)[\s:'′m]+(00(?:\.0+)?)"#,
        r#"|(1[0-7][0-9]|0?[0-9]?[0-9])[\s:°d]+([0-5]?[0-9])[\s:'′m]+([0-5]?[0-9](?:\.\d+)?))"#,
        r#"[\s"″]*([EeWw])?$"#,
    ))
    .expect("longitude dms pattern")
});

/// Parses a latitude given as signed decimal degrees or as a DMS literal
/// such as `40:26:46N` or `40° 26' 46" S`.
pub fn parse_dms_latitude(text: &str) -> Result<f64, ParseError> {
    parse_angle(text, &LAT_DECIMAL, &LAT_DMS, 90.0)
}

/// Parses a longitude given as signed decimal degrees or as a DMS literal
/// such as `079:56:55W`.
pub fn parse_dms_longitude(text: &str) -> Result<f64, ParseError> {
    parse_angle(text, &LON_DECIMAL, &LON_DMS, 180.0)
}

fn parse_angle(text: &str, decimal: &Regex, dms: &Regex, limit: f64) -> Result<f64, ParseError> {
    let trimmed = text.trim();
    let invalid = || ParseError::InvalidFormat(text.to_string());
    if decimal.is_match(trimmed) {
        let value: f64 = trimmed.parse().map_err(|_| invalid())?;
        return Ok(value);
    }
    // A bare number outside the decimal range is never reread as DMS.
    if SIGNED_NUMBER.is_match(trimmed) {
        return Err(invalid());
    }
    let caps = dms.captures(trimmed).ok_or_else(invalid)?;
    let groups: Vec<f64> = (2..=7)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid())?;
    if groups.len() != 3 {
        return Err(invalid());
    }
    let value = groups[0] + groups[1] / 60.0 + groups[2] / 3600.0;
    if value > limit {
        return Err(invalid());
    }
    let negative = match caps.get(8).map(|m| m.as_str()) {
        Some(c) => matches!(c, "S" | "s" | "W" | "w"),
        None => caps.get(1).is_some(),
    };
    Ok(if negative { -value } else { value })
}

/// Splits a `"lat, lon"` string and parses both halves.
pub fn parse_location(text: &str) -> Result<(f64, f64), ParseError> {
    let mut parts = text.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lat), Some(lon), None) => Ok((parse_dms_latitude(lat)?, parse_dms_longitude(lon)?)),
        _ => Err(ParseError::InvalidFormat(text.to_string())),
    }
}

/// Formats decimal degrees as a `D°M'S"` string with whole seconds.
pub fn format_dms(degrees: f64) -> String {
    let sign = if degrees < 0.0 { "-" } else { "" };
    let abs = degrees.abs();
    let mut d = abs.floor();
    let minutes = (abs - d) * 60.0;
    let mut m = minutes.floor();
    let mut s = ((minutes - m) * 60.0).round();
    if s >= 60.0 {
        s -= 60.0;
        m += 1.0;
    }
    if m >= 60.0 {
        m -= 60.0;
        d += 1.0;
    }
    format!("{}{}\u{00B0}{}'{}\"", sign, d, m, s)
}
