use std::cmp::Ordering;
use std::fmt;

use relframe_error::{RelError, Result};

use crate::arrays::array::{Array, ArrayData};
use crate::arrays::bitmap::Bitmap;
use crate::arrays::datatype::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    pub fn apply(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord.is_eq(),
            Self::NotEq => ord.is_ne(),
            Self::Lt => ord.is_lt(),
            Self::LtEq => ord.is_le(),
            Self::Gt => ord.is_gt(),
            Self::GtEq => ord.is_ge(),
        }
    }

    /// If this operator only checks for equality.
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::NotEq)
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

/// Check if values of the two types can be compared with each other.
pub fn comparable(left: &DataType, right: &DataType) -> bool {
    match (left, right) {
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (a, b) if a.is_string_like() && b.is_string_like() => true,
        (DataType::Boolean, DataType::Boolean) => true,
        (DataType::Timestamp(_), DataType::Timestamp(_)) => true,
        _ => false,
    }
}

/// Compare two arrays element-wise, producing a boolean array.
///
/// A missing value on either side produces a missing result.
pub fn compare(op: CmpOp, left: &Array, right: &Array) -> Result<Array> {
    if left.len() != right.len() {
        return Err(RelError::row_count_mismatch(left.len(), right.len()));
    }

    let ords = match (left.datatype(), right.datatype()) {
        (DataType::Int64, DataType::Int64) => {
            zip_cmp(left.iter_i64()?, right.iter_i64()?, |a, b| a.cmp(b))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            zip_cmp(left.iter_f64()?, right.iter_f64()?, |a, b| cmp_f64(*a, *b))
        }
        // Same label set, order by label position.
        (DataType::Categorical(a), DataType::Categorical(b)) if a == b => {
            zip_cmp(left.iter_codes()?, right.iter_codes()?, |a, b| a.cmp(b))
        }
        (a, b) if a.is_string_like() && b.is_string_like() => {
            zip_cmp(left.iter_str()?, right.iter_str()?, |a, b| a.cmp(b))
        }
        (DataType::Boolean, DataType::Boolean) => {
            zip_cmp(left.iter_bool()?, right.iter_bool()?, |a, b| a.cmp(b))
        }
        (DataType::Timestamp(_), DataType::Timestamp(_)) => zip_cmp(
            left.iter_timestamp()?,
            right.iter_timestamp()?,
            |a, b| a.cmp(b),
        ),
        (a, b) => {
            return Err(RelError::type_mismatch(format!(
                "Cannot compare {a} with {b} using '{op}'"
            )));
        }
    };

    Ok(ords
        .into_iter()
        .map(|ord| ord.map(|ord| op.apply(ord)))
        .collect())
}

/// Total order over floats where negative zero equals zero and all NaNs are
/// equal, sorting after every other value.
#[inline]
fn cmp_f64(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => (a + 0.0).total_cmp(&(b + 0.0)),
    }
}

fn zip_cmp<T>(
    left: impl Iterator<Item = Option<T>>,
    right: impl Iterator<Item = Option<T>>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Vec<Option<Ordering>> {
    left.zip(right)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some(cmp(&a, &b)),
            _ => None,
        })
        .collect()
}

/// Compares two rows within the same array.
///
/// Only valid values should be compared, callers handle missing values
/// themselves.
#[derive(Debug, Clone, Copy)]
pub enum RowComparator<'a> {
    Boolean(&'a Bitmap),
    Int64(&'a [i64]),
    Float64(&'a [f64]),
    Utf8(&'a [String]),
    /// Categorical codes, which order by label position.
    Codes(&'a [u32]),
    Timestamp(&'a [i64]),
}

impl<'a> RowComparator<'a> {
    pub fn new(arr: &'a Array) -> Self {
        match arr.data() {
            ArrayData::Boolean(v) => Self::Boolean(v),
            ArrayData::Int64(v) => Self::Int64(v),
            ArrayData::Float64(v) => Self::Float64(v),
            ArrayData::Utf8(v) => Self::Utf8(v),
            ArrayData::Categorical(v) => Self::Codes(v),
            ArrayData::Timestamp(v) => Self::Timestamp(v),
        }
    }

    #[inline]
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        match self {
            Self::Boolean(v) => v.value(a).cmp(&v.value(b)),
            Self::Int64(v) => v[a].cmp(&v[b]),
            Self::Float64(v) => cmp_f64(v[a], v[b]),
            Self::Utf8(v) => v[a].as_bytes().cmp(v[b].as_bytes()),
            Self::Codes(v) => v[a].cmp(&v[b]),
            Self::Timestamp(v) => v[a].cmp(&v[b]),
        }
    }
}
