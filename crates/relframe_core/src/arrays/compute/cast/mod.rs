pub mod parse;

use relframe_error::{RelError, Result};

use self::parse::{BoolParser, Float64Parser, Int64Parser, Parser, TimestampParser};
use crate::arrays::array::{Array, ArrayBuilder};
use crate::arrays::categorical::encode_with_meta;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

/// Check if a value of type `from` may be stored in a column of type `to`
/// without an explicit cast.
///
/// Utf8 to categorical is allowed here, but the cast itself still fails if a
/// value is outside the label set.
pub fn can_implicit_cast(from: &DataType, to: &DataType) -> bool {
    match (from, to) {
        (a, b) if a == b => true,
        (DataType::Int64, DataType::Float64) => true,
        (DataType::Utf8, DataType::Categorical(_)) => true,
        (DataType::Categorical(_), DataType::Utf8) => true,
        _ => false,
    }
}

/// Cast an array to another data type.
///
/// Casting strings to numbers, booleans, or timestamps produces a missing
/// value for strings that fail to parse. Casting floats to integers
/// truncates, producing missing values for non-finite or out of range
/// floats. Casting to a categorical errors if a value is not in the label
/// set.
pub fn cast_array(arr: &Array, to: &DataType) -> Result<Array> {
    let from = arr.datatype();
    if from == to {
        return Ok(arr.clone());
    }

    match (from, to) {
        (DataType::Int64, DataType::Float64) => Ok(arr.iter_f64()?.collect()),
        (DataType::Float64, DataType::Int64) => Ok(arr
            .iter_f64()?
            .map(|v| v.and_then(float_to_i64))
            .collect()),
        (DataType::Boolean, DataType::Int64) => Ok(arr
            .iter_bool()?
            .map(|v| v.map(|b| b as i64))
            .collect()),
        (DataType::Int64, DataType::Boolean) => {
            Ok(arr.iter_i64()?.map(|v| v.map(|i| i != 0)).collect())
        }
        (DataType::Timestamp(_), DataType::Timestamp(_)) => arr.try_with_datatype(to.clone()),

        // Strings to other things.
        (from, DataType::Categorical(meta)) if from.is_string_like() => {
            encode_with_meta(arr, meta)
        }
        (DataType::Categorical(_), DataType::Utf8) => Ok(arr
            .iter_str()?
            .map(|v| v.map(|s| s.to_string()))
            .collect()),
        (from, DataType::Boolean) if from.is_string_like() => {
            Ok(parse_strings(arr, BoolParser)?.collect())
        }
        (from, DataType::Int64) if from.is_string_like() => {
            Ok(parse_strings(arr, Int64Parser::new())?.collect())
        }
        (from, DataType::Float64) if from.is_string_like() => {
            Ok(parse_strings(arr, Float64Parser::new())?.collect())
        }
        (from, DataType::Timestamp(meta)) if from.is_string_like() => {
            let parser = TimestampParser::new(meta.offset);
            let values: Vec<_> = parse_strings(arr, parser)?.collect();
            Ok(Array::from_timestamps(*meta, values))
        }

        // Anything to strings.
        (_, DataType::Utf8) => {
            let mut builder = ArrayBuilder::with_capacity(to, arr.len());
            for scalar in arr.iter_scalars() {
                match scalar {
                    ScalarValue::Null => builder.push_null(),
                    other => builder.push_value(&ScalarValue::Utf8(other.to_string()))?,
                }
            }
            Ok(builder.finish())
        }

        (from, to) => Err(RelError::type_mismatch(format!(
            "Cannot cast {from} to {to}"
        ))),
    }
}

fn float_to_i64(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

fn parse_strings<'a, P: Parser + 'a>(
    arr: &'a Array,
    mut parser: P,
) -> Result<impl Iterator<Item = Option<P::Type>> + 'a> {
    Ok(arr
        .iter_str()?
        .map(move |v| v.and_then(|s| parser.parse(s.trim()))))
}
