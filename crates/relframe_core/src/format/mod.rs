pub mod json;
pub mod pretty;

use std::fmt;

use relframe_error::Result;

use crate::arrays::array::Array;
use crate::arrays::scalar::ScalarValue;

/// Formatting options for arrays and scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions<'a> {
    /// String to use for printing missing values.
    pub null: &'a str,
    /// String to use when a string value is empty.
    pub empty_string: &'a str,
    /// Max rows to show when pretty printing a relation.
    pub max_rows: usize,
}

impl FormatOptions<'_> {
    pub const fn new() -> Self {
        FormatOptions {
            null: "NA",
            empty_string: "",
            max_rows: 20,
        }
    }
}

impl Default for FormatOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Formatter<'a> {
    options: FormatOptions<'a>,
}

impl<'a> Formatter<'a> {
    pub const fn new(options: FormatOptions<'a>) -> Self {
        Formatter { options }
    }

    pub fn format_scalar_value(&self, scalar: ScalarValue) -> FormattedScalarValue<'_> {
        FormattedScalarValue {
            options: &self.options,
            scalar,
        }
    }

    /// Format the value at `idx` in the array.
    pub fn format_array_value(&self, array: &Array, idx: usize) -> Result<FormattedScalarValue<'_>> {
        let scalar = array.logical_value(idx)?;
        Ok(self.format_scalar_value(scalar))
    }
}

#[derive(Debug, Clone)]
pub struct FormattedScalarValue<'a> {
    options: &'a FormatOptions<'a>,
    scalar: ScalarValue,
}

impl fmt::Display for FormattedScalarValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scalar {
            ScalarValue::Null => write!(f, "{}", self.options.null),
            ScalarValue::Utf8(v) | ScalarValue::Categorical(v) => {
                if v.is_empty() {
                    write!(f, "{}", self.options.empty_string)
                } else {
                    write!(f, "{v}")
                }
            }
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::scalar::TimestampScalar;

    #[test]
    fn basic_scalar() {
        // (input, formatted output)
        let test_cases = [
            (ScalarValue::Null, "NA"),
            (ScalarValue::Int64(8), "8"),
            (ScalarValue::Float64(1.5), "1.5"),
            (ScalarValue::Boolean(true), "TRUE"),
            (ScalarValue::Utf8("hello".into()), "hello"),
            (
                ScalarValue::Timestamp(TimestampScalar::new_utc(1_357_016_400_000_000)),
                "2013-01-01 05:00:00",
            ),
        ];

        for (scalar, expected) in test_cases {
            let out = Formatter::new(FormatOptions::new())
                .format_scalar_value(scalar)
                .to_string();
            assert_eq!(expected, out);
        }
    }

    #[test]
    fn null_and_empty_formatting() {
        let opts = FormatOptions {
            null: "<missing>",
            empty_string: "(empty)",
            ..Default::default()
        };
        let formatter = Formatter::new(opts);

        assert_eq!(
            "<missing>",
            formatter.format_scalar_value(ScalarValue::Null).to_string()
        );
        assert_eq!(
            "(empty)",
            formatter
                .format_scalar_value(ScalarValue::Utf8(String::new()))
                .to_string()
        );
    }

    #[test]
    fn array_value() {
        let arr = Array::from_iter([Some(1_i64), None]);
        let formatter = Formatter::new(FormatOptions::new());
        assert_eq!("NA", formatter.format_array_value(&arr, 1).unwrap().to_string());
        formatter.format_array_value(&arr, 2).unwrap_err();
    }
}
