//! Column type inference.
//!
//! Each column starts as the narrowest candidate and widens until every
//! non-missing sample value parses: Boolean, Int64, Float64, Timestamp, then
//! Utf8 which accepts anything.

use relframe_core::arrays::compute::cast::parse::{
    BoolParser,
    Float64Parser,
    Int64Parser,
    Parser,
    TimestampParser,
};
use relframe_core::arrays::datatype::{DataType, TimestampTypeMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Candidate {
    Boolean,
    Int64,
    Float64,
    Timestamp,
    Utf8,
}

impl Candidate {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Boolean => BoolParser.parse(value).is_some(),
            Self::Int64 => Int64Parser::new().parse(value).is_some(),
            Self::Float64 => Float64Parser::new().parse(value).is_some(),
            Self::Timestamp => TimestampParser::new(TimestampTypeMeta::utc().offset)
                .parse(value)
                .is_some(),
            Self::Utf8 => true,
        }
    }

    fn next(&self) -> Self {
        match self {
            Self::Boolean => Self::Int64,
            Self::Int64 => Self::Float64,
            Self::Float64 => Self::Timestamp,
            Self::Timestamp | Self::Utf8 => Self::Utf8,
        }
    }

    fn datatype(&self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::Timestamp => DataType::timestamp_utc(),
            Self::Utf8 => DataType::Utf8,
        }
    }
}

/// Infer a column type from sample values. Missing values are skipped, and a
/// column with no values is Utf8.
pub fn infer_column_type<'a>(
    values: impl IntoIterator<Item = &'a str>,
    is_missing: impl Fn(&str) -> bool,
) -> DataType {
    let values: Vec<&str> = values.into_iter().filter(|v| !is_missing(v)).collect();
    if values.is_empty() {
        return DataType::Utf8;
    }

    let mut candidate = Candidate::Boolean;
    while !values.iter().all(|v| candidate.accepts(v)) {
        candidate = candidate.next();
    }
    candidate.datatype()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(values: &[&str]) -> DataType {
        infer_column_type(values.iter().copied(), |v| v.is_empty() || v == "NA")
    }

    #[test]
    fn infer_types() {
        // (values, expected)
        let test_cases: [(&[&str], DataType); 9] = [
            (&["TRUE", "F", "NA"], DataType::Boolean),
            (&["1", "-20", ""], DataType::Int64),
            (&["1", "2.5"], DataType::Float64),
            (&["2013-01-01 05:00:00", "2013-01-01"], DataType::timestamp_utc()),
            (&["2013-01-01", "N14228"], DataType::Utf8),
            (&["UA", "AA"], DataType::Utf8),
            (&["NA", ""], DataType::Utf8),
            (&["1", "TRUE"], DataType::Utf8),
            (&["TRUE", "1"], DataType::Utf8),
        ];

        for (values, expected) in test_cases {
            assert_eq!(expected, infer(values), "values: {values:?}");
        }
    }
}
