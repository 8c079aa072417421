//! Date formats for the `%d{...}` layout key
//!
//! Accepts .NET-style custom tokens (`yyyy-MM-dd HH:mm:ss.fff`), named
//! standard layouts (`RFC3339`, `ISO8601`, ...) and a fixed zone option,
//! separated by `;`: `yyyy-MM-ddTHH:mm:ss;GMT+8`.
//! Without a zone the local time zone is used.

use chrono::{DateTime, Datelike, FixedOffset, Local, SecondsFormat, Timelike, Utc};
use std::fmt;

use crate::error::{LogError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Day(usize),
    Hour12(usize),
    Hour24(usize),
    Minute(usize),
    Month(usize),
    Second(usize),
    Fraction(usize),
    AmPm(usize),
    Year(usize),
    Zone(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Standard {
    Rfc3339,
    Rfc3339Nano,
    Rfc1123,
    Rfc1123Z,
    Rfc822,
    Rfc822Z,
    Rfc850,
    Iso8601,
}

/// Parsed date format
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormat {
    zone: Option<FixedOffset>,
    standard: Option<Standard>,
    tokens: Vec<Token>,
}

impl DateFormat {
    pub fn parse(layout: &str) -> Result<Self> {
        let mut df = DateFormat {
            zone: None,
            standard: None,
            tokens: Vec::new(),
        };

        for part in layout.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            if part.starts_with("GMT") || part.starts_with("UTC") {
                df.zone = Some(parse_zone(part)?);
            } else if part.starts_with("RFC") || part.starts_with("ISO") {
                df.standard = Some(parse_standard(part)?);
            } else {
                df.tokens.extend(tokenize(part));
            }
        }

        if df.standard.is_none() && df.tokens.is_empty() {
            df.standard = Some(Standard::Rfc3339);
        }
        Ok(df)
    }

    /// Adapter rendering `time` with this format
    pub fn display(&self, time: DateTime<Utc>) -> DateDisplay<'_> {
        let time = match self.zone {
            Some(offset) => time.with_timezone(&offset),
            None => time.with_timezone(&Local).fixed_offset(),
        };
        DateDisplay { format: self, time }
    }
}

/// `Display` adapter returned by `DateFormat::display`
pub struct DateDisplay<'a> {
    format: &'a DateFormat,
    time: DateTime<FixedOffset>,
}

impl fmt::Display for DateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.time;
        if let Some(standard) = self.format.standard {
            match standard {
                Standard::Rfc3339 => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true))?,
                Standard::Rfc3339Nano => {
                    f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))?
                }
                Standard::Rfc1123 => write!(f, "{}", t.format("%a, %d %b %Y %H:%M:%S %Z"))?,
                Standard::Rfc1123Z => write!(f, "{}", t.format("%a, %d %b %Y %H:%M:%S %z"))?,
                Standard::Rfc822 => write!(f, "{}", t.format("%d %b %y %H:%M %Z"))?,
                Standard::Rfc822Z => write!(f, "{}", t.format("%d %b %y %H:%M %z"))?,
                Standard::Rfc850 => write!(f, "{}", t.format("%A, %d-%b-%y %H:%M:%S %Z"))?,
                Standard::Iso8601 => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S%z"))?,
            }
        }

        for token in &self.format.tokens {
            match *token {
                Token::Text(ref s) => f.write_str(s)?,
                Token::Day(1) => write!(f, "{}", t.day())?,
                Token::Day(2) => write!(f, "{:02}", t.day())?,
                Token::Day(3) => write!(f, "{}", t.format("%a"))?,
                Token::Day(_) => write!(f, "{}", t.format("%A"))?,
                Token::Hour12(n) => write!(f, "{:0w$}", t.hour12().1, w = n)?,
                Token::Hour24(n) => write!(f, "{:0w$}", t.hour(), w = n)?,
                Token::Minute(n) => write!(f, "{:0w$}", t.minute(), w = n)?,
                Token::Month(1) => write!(f, "{}", t.month())?,
                Token::Month(2) => write!(f, "{:02}", t.month())?,
                Token::Month(3) => write!(f, "{}", t.format("%b"))?,
                Token::Month(_) => write!(f, "{}", t.format("%B"))?,
                Token::Second(n) => write!(f, "{:0w$}", t.second(), w = n)?,
                Token::Fraction(n) => {
                    let nanos = t.nanosecond() % 1_000_000_000;
                    let scaled = nanos / 10u32.pow(9 - n as u32);
                    write!(f, "{:0w$}", scaled, w = n)?
                }
                Token::AmPm(n) => {
                    let pm = t.hour12().0;
                    let s = if pm { "PM" } else { "AM" };
                    f.write_str(&s[..n.min(2)])?
                }
                Token::Year(1) => write!(f, "{}", t.year() % 100)?,
                Token::Year(2) => write!(f, "{:02}", t.year() % 100)?,
                Token::Year(n) => write!(f, "{:0w$}", t.year(), w = n)?,
                Token::Zone(n) => {
                    let secs = t.offset().local_minus_utc();
                    let sign = if secs < 0 { '-' } else { '+' };
                    let hours = secs.abs() / 3600;
                    let minutes = secs.abs() % 3600 / 60;
                    match n {
                        1 => write!(f, "{}{}", sign, hours)?,
                        2 => write!(f, "{}{:02}", sign, hours)?,
                        _ => write!(f, "{}{:02}:{:02}", sign, hours, minutes)?,
                    }
                }
            }
        }
        Ok(())
    }
}

/// `GMT+8`, `UTC-5`, `UTC`; whole hours in -12..=14
fn parse_zone(part: &str) -> Result<FixedOffset> {
    let invalid = || LogError::InvalidTimeZone {
        zone: part.to_string(),
    };
    let rest = part[3..].trim();
    let hours: i32 = if rest.is_empty() {
        0
    } else {
        rest.trim_start_matches('+').parse().map_err(|_| invalid())?
    };
    if !(-12..=14).contains(&hours) {
        return Err(invalid());
    }
    FixedOffset::east_opt(hours * 3600).ok_or_else(invalid)
}

fn parse_standard(part: &str) -> Result<Standard> {
    Ok(match part {
        "RFC3339" => Standard::Rfc3339,
        "RFC3339Nano" => Standard::Rfc3339Nano,
        "RFC1123" => Standard::Rfc1123,
        "RFC1123Z" => Standard::Rfc1123Z,
        "RFC822" => Standard::Rfc822,
        "RFC822Z" => Standard::Rfc822Z,
        "RFC850" => Standard::Rfc850,
        "ISO8601" => Standard::Iso8601,
        other => {
            return Err(LogError::InvalidDateFormat {
                format: other.to_string(),
            })
        }
    })
}

/// Split into runs of the same character and classify each run
fn tokenize(layout: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut chars = layout.chars().peekable();
    while let Some(c) = chars.next() {
        let mut n = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            n += 1;
        }
        let token = match (c, n) {
            ('d', 1..=4) => Token::Day(n),
            ('h', 1..=2) => Token::Hour12(n),
            ('H', 1..=2) => Token::Hour24(n),
            ('m', 1..=2) => Token::Minute(n),
            ('M', 1..=4) => Token::Month(n),
            ('s', 1..=2) => Token::Second(n),
            ('f', 1..=5) => Token::Fraction(n),
            ('t', 1..=2) => Token::AmPm(n),
            ('y', 1..=4) => Token::Year(n),
            ('z', 1..=3) => Token::Zone(n),
            _ => {
                let run: String = std::iter::repeat(c).take(n).collect();
                match tokens.last_mut() {
                    Some(Token::Text(prev)) => {
                        prev.push_str(&run);
                        continue;
                    }
                    _ => Token::Text(run),
                }
            }
        };
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap() + chrono::Duration::milliseconds(42)
    }

    fn render(layout: &str) -> String {
        DateFormat::parse(layout).unwrap().display(at()).to_string()
    }

    #[test]
    fn test_custom_tokens_in_zone() {
        assert_eq!(render("yyyy-MM-dd HH:mm:ss.fff;UTC"), "2024-03-07 14:05:09.042");
        assert_eq!(render("yyyy-MM-ddTHH:mm:ss;GMT+8"), "2024-03-07T22:05:09");
    }

    #[test]
    fn test_names_and_twelve_hour() {
        assert_eq!(render("ddd dddd MMM MMMM;UTC"), "Thu Thursday Mar March");
        assert_eq!(render("hh:mm tt;UTC"), "02:05 PM");
    }

    #[test]
    fn test_zone_tokens() {
        assert_eq!(render("z zz zzz;GMT-5"), "-5 -05 -05:00");
    }

    #[test]
    fn test_standard_layouts() {
        assert_eq!(render("RFC3339;UTC"), "2024-03-07T14:05:09Z");
        assert_eq!(render("ISO8601;GMT+1"), "2024-03-07T15:05:09+0100");
    }

    #[test]
    fn test_empty_defaults_to_rfc3339() {
        let df = DateFormat::parse("").unwrap();
        assert_eq!(df.standard, Some(Standard::Rfc3339));
    }

    #[test]
    fn test_invalid_zone() {
        assert!(matches!(
            DateFormat::parse("HH;GMT+20"),
            Err(LogError::InvalidTimeZone { .. })
        ));
        assert!(matches!(
            DateFormat::parse("HH;UTCx"),
            Err(LogError::InvalidTimeZone { .. })
        ));
    }

    #[test]
    fn test_unknown_standard() {
        assert!(matches!(
            DateFormat::parse("RFC9999"),
            Err(LogError::InvalidDateFormat { .. })
        ));
    }
}
