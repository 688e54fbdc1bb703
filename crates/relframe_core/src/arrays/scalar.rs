use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use relframe_error::{RelError, Result};
use serde::{Serialize, Serializer};

use super::datatype::utc_offset;

/// A timestamp value, microseconds since the epoch plus a display offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampScalar {
    pub micros: i64,
    pub offset: FixedOffset,
}

impl TimestampScalar {
    pub fn new_utc(micros: i64) -> Self {
        TimestampScalar {
            micros,
            offset: utc_offset(),
        }
    }

    /// Convert to a chrono datetime in this scalar's offset.
    ///
    /// Returns None if the value is outside the range chrono can represent.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::from_timestamp_micros(self.micros).map(|dt| dt.with_timezone(&self.offset))
    }

    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            None => self.micros.to_string(),
        }
    }
}

impl fmt::Display for TimestampScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) if self.offset == utc_offset() => {
                write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
            }
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%:z")),
            None => write!(f, "{}us", self.micros),
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// The missing marker. Valid for every type.
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// The label of a categorical value.
    Categorical(String),
    Timestamp(TimestampScalar),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(v) => Ok(*v),
            other => Err(RelError::type_mismatch(format!("Not a bool: {other}"))),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int64(v) => Ok(*v),
            other => Err(RelError::type_mismatch(format!("Not an i64: {other}"))),
        }
    }

    pub fn try_as_usize(&self) -> Result<usize> {
        let v = self.try_as_i64()?;
        usize::try_from(v)
            .map_err(|_| RelError::type_mismatch(format!("Value {v} cannot be a usize")))
    }

    /// Get the value as a float, widening integers.
    pub fn try_as_f64(&self) -> Result<f64> {
        match self {
            Self::Float64(v) => Ok(*v),
            Self::Int64(v) => Ok(*v as f64),
            other => Err(RelError::type_mismatch(format!("Not a f64: {other}"))),
        }
    }

    /// Get the string value for utf8 or categorical scalars.
    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Self::Utf8(v) | Self::Categorical(v) => Ok(v.as_str()),
            other => Err(RelError::type_mismatch(format!("Not a string: {other}"))),
        }
    }

    pub fn try_into_string(self) -> Result<String> {
        match self {
            Self::Utf8(v) | Self::Categorical(v) => Ok(v),
            other => Err(RelError::type_mismatch(format!("Not a string: {other}"))),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NA"),
            Self::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) | Self::Categorical(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for ScalarValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Boolean(v) => serializer.serialize_bool(*v),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::Float64(v) => serializer.serialize_f64(*v),
            Self::Utf8(v) | Self::Categorical(v) => serializer.serialize_str(v),
            Self::Timestamp(v) => serializer.serialize_str(&v.to_rfc3339()),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<usize> for ScalarValue {
    fn from(value: usize) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl From<TimestampScalar> for ScalarValue {
    fn from(value: TimestampScalar) -> Self {
        ScalarValue::Timestamp(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_values() {
        // (input, formatted output)
        let test_cases = [
            (ScalarValue::Null, "NA"),
            (ScalarValue::Int64(8), "8"),
            (ScalarValue::Float64(2.5), "2.5"),
            (ScalarValue::Boolean(true), "TRUE"),
            (ScalarValue::Utf8("EWR".into()), "EWR"),
            (
                ScalarValue::Timestamp(TimestampScalar::new_utc(1_357_016_400_000_000)),
                "2013-01-01 05:00:00",
            ),
        ];

        for (scalar, expected) in test_cases {
            assert_eq!(expected, scalar.to_string());
        }
    }

    #[test]
    fn timestamp_with_offset() {
        let ts = TimestampScalar {
            micros: 1_357_016_400_000_000,
            offset: FixedOffset::west_opt(5 * 3600).unwrap(),
        };
        assert_eq!("2013-01-01 00:00:00-05:00", ts.to_string());
        assert_eq!("2013-01-01T00:00:00-05:00", ts.to_rfc3339());
    }

    #[test]
    fn from_option() {
        assert_eq!(ScalarValue::Null, ScalarValue::from(None::<i64>));
        assert_eq!(ScalarValue::Int64(4), ScalarValue::from(Some(4_i64)));
    }

    #[test]
    fn widen_to_f64() {
        assert_eq!(3.0, ScalarValue::Int64(3).try_as_f64().unwrap());
        ScalarValue::Utf8("3".into()).try_as_f64().unwrap_err();
    }

    #[test]
    fn serialize_json() {
        let vals = vec![
            ScalarValue::Null,
            ScalarValue::Int64(3),
            ScalarValue::Categorical("UA".into()),
        ];
        let s = serde_json::to_string(&vals).unwrap();
        assert_eq!(r#"[null,3,"UA"]"#, s);
    }
}
