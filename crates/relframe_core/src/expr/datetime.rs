use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use relframe_error::{RelError, Result};

use crate::arrays::array::Array;
use crate::arrays::datatype::{DataType, TimestampTypeMeta};

/// Calendar fields that can be extracted from a timestamp.
///
/// Fields are computed in the offset of the timestamp's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    /// ISO weekday, Monday is 1 and Sunday is 7.
    Weekday,
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year => write!(f, "year"),
            Self::Month => write!(f, "month"),
            Self::Day => write!(f, "day"),
            Self::Hour => write!(f, "hour"),
            Self::Minute => write!(f, "minute"),
            Self::Weekday => write!(f, "weekday"),
        }
    }
}

pub fn extract_date_part(part: DatePart, arr: &Array) -> Result<Array> {
    let offset = match arr.datatype() {
        DataType::Timestamp(meta) => meta.offset,
        other => {
            return Err(RelError::type_mismatch(format!(
                "Cannot extract {part} from {other}"
            )));
        }
    };

    let out = arr.iter_timestamp()?.map(|micros| {
        let dt = DateTime::from_timestamp_micros(micros?)?.with_timezone(&offset);
        let v = match part {
            DatePart::Year => dt.year() as i64,
            DatePart::Month => dt.month() as i64,
            DatePart::Day => dt.day() as i64,
            DatePart::Hour => dt.hour() as i64,
            DatePart::Minute => dt.minute() as i64,
            DatePart::Weekday => dt.weekday().number_from_monday() as i64,
        };
        Some(v)
    });

    Ok(out.collect())
}

/// Build UTC timestamps from integer fields.
///
/// Rows where any field is missing or the fields don't form a valid date and
/// time produce a missing value.
pub fn make_timestamps(
    year: &Array,
    month: &Array,
    day: &Array,
    hour: &Array,
    minute: &Array,
) -> Result<Array> {
    let len = year.len();
    for arr in [month, day, hour, minute] {
        if arr.len() != len {
            return Err(RelError::row_count_mismatch(len, arr.len()));
        }
    }

    let columns = [year, month, day, hour, minute]
        .into_iter()
        .map(|arr| -> Result<Vec<_>> { Ok(arr.iter_i64()?.collect()) })
        .collect::<Result<Vec<_>>>()?;

    let values: Vec<_> = (0..len)
        .map(|idx| {
            let mut fields = [None; 5];
            for (field, column) in fields.iter_mut().zip(&columns) {
                *field = column[idx];
            }
            make_timestamp_micros(fields)
        })
        .collect();

    Ok(Array::from_timestamps(TimestampTypeMeta::utc(), values))
}

fn make_timestamp_micros(fields: [Option<i64>; 5]) -> Option<i64> {
    let [year, month, day, hour, minute] = fields;
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year?).ok()?,
        u32::try_from(month?).ok()?,
        u32::try_from(day?).ok()?,
    )?;
    let dt = date.and_hms_opt(u32::try_from(hour?).ok()?, u32::try_from(minute?).ok()?, 0)?;
    Some(dt.and_utc().timestamp_micros())
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    #[test]
    fn extract_parts_utc() {
        // 2013-01-01 05:17:00 UTC, a Tuesday.
        let arr = Array::from_timestamps(
            TimestampTypeMeta::utc(),
            [Some(1_357_017_420_000_000), None],
        );

        // (part, expected)
        let test_cases = [
            (DatePart::Year, 2013_i64),
            (DatePart::Month, 1),
            (DatePart::Day, 1),
            (DatePart::Hour, 5),
            (DatePart::Minute, 17),
            (DatePart::Weekday, 2),
        ];

        for (part, expected) in test_cases {
            let out = extract_date_part(part, &arr).unwrap();
            assert_eq!(Array::from_iter([Some(expected), None]), out, "part: {part}");
        }
    }

    #[test]
    fn extract_parts_in_offset() {
        // Same instant as above, but in -06:00 it's still Dec 31.
        let meta = TimestampTypeMeta::new(FixedOffset::west_opt(6 * 3600).unwrap());
        let arr = Array::from_timestamps(meta, [Some(1_357_017_420_000_000)]);

        let year = extract_date_part(DatePart::Year, &arr).unwrap();
        assert_eq!(Array::from_iter([2012_i64]), year);
        let hour = extract_date_part(DatePart::Hour, &arr).unwrap();
        assert_eq!(Array::from_iter([23_i64]), hour);
    }

    #[test]
    fn make_timestamps_invalid_rows() {
        let year = Array::from_iter([2013_i64, 2013, 2013]);
        let month = Array::from_iter([Some(1_i64), Some(2), None]);
        let day = Array::from_iter([1_i64, 30, 1]);
        let hour = Array::from_iter([5_i64, 0, 0]);
        let minute = Array::from_iter([17_i64, 0, 0]);

        let out = make_timestamps(&year, &month, &day, &hour, &minute).unwrap();
        let expected = Array::from_timestamps(
            TimestampTypeMeta::utc(),
            [Some(1_357_017_420_000_000), None, None],
        );
        assert_eq!(expected, out);
    }
}
