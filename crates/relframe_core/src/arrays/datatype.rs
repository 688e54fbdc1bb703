use std::fmt;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use relframe_error::{RelError, Result};

/// Metadata associated with categoricals.
///
/// The label set is ordered, and the position of a label is its code. Codes
/// are what's physically stored in an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoricalTypeMeta {
    labels: Arc<[String]>,
}

impl CategoricalTypeMeta {
    /// Create a new label set. Labels must be unique.
    pub fn try_new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let labels: Vec<String> = labels.into_iter().map(|s| s.into()).collect();
        for (idx, label) in labels.iter().enumerate() {
            if labels[..idx].contains(label) {
                return Err(RelError::invalid_argument("Duplicate categorical label")
                    .with_field("label", label));
            }
        }
        if labels.len() > u32::MAX as usize {
            return Err(RelError::invalid_argument("Too many categorical labels"));
        }

        Ok(CategoricalTypeMeta {
            labels: labels.into(),
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Get the code for a label.
    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|pos| pos as u32)
    }

    /// Get the label for a code.
    pub fn label(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(|s| s.as_str())
    }
}

/// Metadata associated with timestamps.
///
/// Values are always stored as microseconds since the Unix epoch (UTC). The
/// offset only affects display and calendar field extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampTypeMeta {
    pub offset: FixedOffset,
}

impl TimestampTypeMeta {
    pub const fn new(offset: FixedOffset) -> Self {
        TimestampTypeMeta { offset }
    }

    pub fn utc() -> Self {
        TimestampTypeMeta {
            offset: utc_offset(),
        }
    }

    /// Create from an offset in seconds east of UTC.
    pub fn try_from_seconds_east(secs: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(secs).ok_or_else(|| {
            RelError::invalid_argument("Timezone offset out of range").with_field("seconds", secs)
        })?;
        Ok(TimestampTypeMeta { offset })
    }
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Supported data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
    /// String values restricted to an ordered label set.
    Categorical(CategoricalTypeMeta),
    /// Instant in time with an associated fixed offset.
    Timestamp(TimestampTypeMeta),
}

impl DataType {
    pub fn categorical<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        Ok(DataType::Categorical(CategoricalTypeMeta::try_new(labels)?))
    }

    pub fn timestamp_utc() -> Self {
        DataType::Timestamp(TimestampTypeMeta::utc())
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// If values of this type are strings, either plain or categorical.
    pub const fn is_string_like(&self) -> bool {
        matches!(self, DataType::Utf8 | DataType::Categorical(_))
    }

    pub fn datatype_id(&self) -> DataTypeId {
        match self {
            Self::Boolean => DataTypeId::Boolean,
            Self::Int64 => DataTypeId::Int64,
            Self::Float64 => DataTypeId::Float64,
            Self::Utf8 => DataTypeId::Utf8,
            Self::Categorical(_) => DataTypeId::Categorical,
            Self::Timestamp(_) => DataTypeId::Timestamp,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Categorical(meta) => write!(f, "Categorical({})", meta.num_labels()),
            Self::Timestamp(meta) => write!(f, "Timestamp({})", meta.offset),
            other => write!(f, "{}", other.datatype_id()),
        }
    }
}

/// Data type without the associated metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeId {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Categorical,
    Timestamp,
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Categorical => write!(f, "Categorical"),
            Self::Timestamp => write!(f, "Timestamp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_codes() {
        let meta = CategoricalTypeMeta::try_new(["Jan", "Feb", "Mar"]).unwrap();
        assert_eq!(Some(1), meta.code_of("Feb"));
        assert_eq!(None, meta.code_of("Dec"));
        assert_eq!(Some("Mar"), meta.label(2));
        assert_eq!(None, meta.label(3));
    }

    #[test]
    fn categorical_duplicate_labels() {
        CategoricalTypeMeta::try_new(["a", "b", "a"]).unwrap_err();
    }

    #[test]
    fn display() {
        assert_eq!("Int64", DataType::Int64.to_string());
        assert_eq!(
            "Categorical(2)",
            DataType::categorical(["x", "y"]).unwrap().to_string()
        );
        assert_eq!("Timestamp(+00:00)", DataType::timestamp_utc().to_string());
    }
}
