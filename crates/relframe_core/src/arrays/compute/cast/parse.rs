//! Parsing related utilities for casting from a string to other types.
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

/// Logic for parsing a string into some type.
pub trait Parser {
    /// The type we'll be producing.
    type Type;

    /// Parse a string into `Type`, returning None if the parse cannot be done.
    fn parse(&mut self, s: &str) -> Option<Self::Type>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoolParser;

impl Parser for BoolParser {
    type Type = bool;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        match s {
            "t" | "true" | "TRUE" | "T" | "True" => Some(true),
            "f" | "false" | "FALSE" | "F" | "False" => Some(false),
            _ => None,
        }
    }
}

/// Parser that uses the stdlib `FromStr` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FromStrParser<T: FromStr> {
    _type: PhantomData<T>,
}

impl<T: FromStr> FromStrParser<T> {
    pub const fn new() -> Self {
        FromStrParser { _type: PhantomData }
    }
}

impl<T: FromStr> Parser for FromStrParser<T> {
    type Type = T;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        T::from_str(s).ok()
    }
}

pub type Int64Parser = FromStrParser<i64>;
pub type Float64Parser = FromStrParser<f64>;

/// Formats tried, in order, when no explicit format is given.
///
/// RFC 3339 strings are always accepted in addition to these.
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Parse a string into microseconds since the epoch.
///
/// Strings without an explicit offset are interpreted in `offset`. Formats
/// with only date fields produce midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampParser {
    formats: Vec<String>,
    offset: FixedOffset,
}

impl TimestampParser {
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_formats(DEFAULT_TIMESTAMP_FORMATS.iter().copied(), offset)
    }

    pub fn with_formats<S: Into<String>>(
        formats: impl IntoIterator<Item = S>,
        offset: FixedOffset,
    ) -> Self {
        TimestampParser {
            formats: formats.into_iter().map(|f| f.into()).collect(),
            offset,
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn parse_naive(&self, s: &str) -> Option<NaiveDateTime> {
        for format in &self.formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(dt);
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
        None
    }
}

impl Parser for TimestampParser {
    type Type = i64;
    fn parse(&mut self, s: &str) -> Option<Self::Type> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.timestamp_micros());
        }
        let naive = self.parse_naive(s)?;
        let dt = self.offset.from_local_datetime(&naive).single()?;
        Some(dt.timestamp_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn parse_bools() {
        let mut p = BoolParser;
        assert_eq!(Some(true), p.parse("TRUE"));
        assert_eq!(Some(false), p.parse("f"));
        assert_eq!(None, p.parse("yes"));
    }

    #[test]
    fn parse_numbers() {
        assert_eq!(Some(-12), Int64Parser::new().parse("-12"));
        assert_eq!(None, Int64Parser::new().parse("1.5"));
        assert_eq!(Some(1.5), Float64Parser::new().parse("1.5"));
    }

    #[test]
    fn parse_timestamps() {
        let mut p = TimestampParser::new(utc());

        // (input, expected micros)
        let test_cases = [
            ("2013-01-01 05:17:00", Some(1_357_017_420_000_000)),
            ("2013-01-01T05:17:00", Some(1_357_017_420_000_000)),
            ("2013-01-01 05:17", Some(1_357_017_420_000_000)),
            ("2013-01-01", Some(1_356_998_400_000_000)),
            ("01/01/2013", Some(1_356_998_400_000_000)),
            ("2013-01-01T05:17:00Z", Some(1_357_017_420_000_000)),
            ("2013-01-01T00:17:00-05:00", Some(1_357_017_420_000_000)),
            ("not a date", None),
            ("2013-02-30", None),
        ];

        for (input, expected) in test_cases {
            assert_eq!(expected, p.parse(input), "input: {input}");
        }
    }

    #[test]
    fn parse_timestamp_in_offset() {
        let mut p = TimestampParser::new(FixedOffset::west_opt(5 * 3600).unwrap());
        // Midnight in -05:00 is 05:00 UTC.
        assert_eq!(Some(1_357_016_400_000_000), p.parse("2013-01-01"));
    }

    #[test]
    fn parse_explicit_format() {
        let mut p = TimestampParser::with_formats(["%d/%m/%Y"], utc());
        assert_eq!(Some(1_357_171_200_000_000), p.parse("03/01/2013"));
        assert_eq!(None, p.parse("2013-01-03"));
    }
}
