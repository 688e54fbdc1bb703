use std::sync::Arc;

use relframe_error::{RelError, Result};

use super::bitmap::Bitmap;
use super::datatype::{CategoricalTypeMeta, DataType, TimestampTypeMeta};
use super::scalar::{ScalarValue, TimestampScalar};
use super::selection::SelectionVector;

/// Physical storage for an array's values.
///
/// Values at invalid positions are unspecified defaults and should never be
/// read without checking validity first.
#[derive(Debug, Clone)]
pub enum ArrayData {
    Boolean(Arc<Bitmap>),
    Int64(Arc<Vec<i64>>),
    Float64(Arc<Vec<f64>>),
    Utf8(Arc<Vec<String>>),
    /// Codes into the label set on the data type.
    Categorical(Arc<Vec<u32>>),
    /// Microseconds since the epoch.
    Timestamp(Arc<Vec<i64>>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
            Self::Categorical(v) => v.len(),
            Self::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches_type(&self, datatype: &DataType) -> bool {
        matches!(
            (self, datatype),
            (Self::Boolean(_), DataType::Boolean)
                | (Self::Int64(_), DataType::Int64)
                | (Self::Float64(_), DataType::Float64)
                | (Self::Utf8(_), DataType::Utf8)
                | (Self::Categorical(_), DataType::Categorical(_))
                | (Self::Timestamp(_), DataType::Timestamp(_))
        )
    }

    /// Take values at the given locations. A None location produces a default
    /// value.
    ///
    /// Locations must be in bounds.
    fn take_locations(&self, locs: impl Iterator<Item = Option<usize>>) -> ArrayData {
        match self {
            Self::Boolean(v) => Self::Boolean(Arc::new(
                locs.map(|loc| loc.map(|l| v.value(l)).unwrap_or(false))
                    .collect(),
            )),
            Self::Int64(v) => Self::Int64(Arc::new(take_values(v, locs))),
            Self::Float64(v) => Self::Float64(Arc::new(take_values(v, locs))),
            Self::Utf8(v) => Self::Utf8(Arc::new(take_values(v, locs))),
            Self::Categorical(v) => Self::Categorical(Arc::new(take_values(v, locs))),
            Self::Timestamp(v) => Self::Timestamp(Arc::new(take_values(v, locs))),
        }
    }
}

fn take_values<T: Clone + Default>(
    values: &[T],
    locs: impl Iterator<Item = Option<usize>>,
) -> Vec<T> {
    locs.map(|loc| match loc {
        Some(loc) => values[loc].clone(),
        None => T::default(),
    })
    .collect()
}

/// A column of values with a single data type.
///
/// Arrays are immutable once built. Cloning is cheap since the data and
/// validity are reference counted.
#[derive(Debug, Clone)]
pub struct Array {
    datatype: DataType,
    validity: Option<Arc<Bitmap>>,
    data: ArrayData,
}

impl Array {
    /// Create a new array, checking that the data matches the data type and
    /// that the validity mask has the right length.
    pub fn try_new(datatype: DataType, validity: Option<Bitmap>, data: ArrayData) -> Result<Self> {
        if !data.matches_type(&datatype) {
            return Err(
                RelError::type_mismatch("Array data does not match data type")
                    .with_field("datatype", &datatype),
            );
        }
        if let Some(validity) = &validity {
            if validity.len() != data.len() {
                return Err(RelError::row_count_mismatch(data.len(), validity.len()));
            }
        }
        if let (DataType::Categorical(meta), ArrayData::Categorical(codes)) = (&datatype, &data) {
            let num_labels = meta.num_labels();
            if let Some(code) = codes.iter().find(|&&c| c as usize >= num_labels) {
                // Codes at invalid positions are still required to be in range
                // so that reading them back never panics.
                return Err(RelError::type_mismatch("Categorical code out of range")
                    .with_field("code", code)
                    .with_field("num_labels", num_labels));
            }
        }

        let validity = match validity {
            Some(v) if v.is_all_true() => None,
            other => other.map(Arc::new),
        };

        Ok(Array {
            datatype,
            validity,
            data,
        })
    }

    /// Create an array with every value missing.
    pub fn new_null(datatype: &DataType, len: usize) -> Self {
        let data = match datatype {
            DataType::Boolean => ArrayData::Boolean(Arc::new(Bitmap::new_with_all_false(len))),
            DataType::Int64 => ArrayData::Int64(Arc::new(vec![0; len])),
            DataType::Float64 => ArrayData::Float64(Arc::new(vec![0.0; len])),
            DataType::Utf8 => ArrayData::Utf8(Arc::new(vec![String::new(); len])),
            DataType::Categorical(_) => ArrayData::Categorical(Arc::new(vec![0; len])),
            DataType::Timestamp(_) => ArrayData::Timestamp(Arc::new(vec![0; len])),
        };
        // A categorical with zero labels has no valid code, but since every
        // position is invalid the placeholder code is never read.
        Array {
            datatype: datatype.clone(),
            validity: Some(Arc::new(Bitmap::new_with_all_false(len))),
            data,
        }
    }

    /// Create an array of `len` copies of `scalar`.
    pub fn new_repeated(datatype: &DataType, scalar: &ScalarValue, len: usize) -> Result<Self> {
        let mut builder = ArrayBuilder::with_capacity(datatype, len);
        for _ in 0..len {
            builder.push_value(scalar)?;
        }
        Ok(builder.finish())
    }

    /// Build an array from scalars, erroring if any scalar can't be stored as
    /// `datatype`.
    pub fn try_from_scalars<'a>(
        datatype: &DataType,
        scalars: impl IntoIterator<Item = &'a ScalarValue>,
    ) -> Result<Self> {
        let scalars = scalars.into_iter();
        let mut builder = ArrayBuilder::with_capacity(datatype, scalars.size_hint().0);
        for scalar in scalars {
            builder.push_value(scalar)?;
        }
        Ok(builder.finish())
    }

    /// Create a timestamp array from microsecond values.
    pub fn from_timestamps(
        meta: TimestampTypeMeta,
        values: impl IntoIterator<Item = Option<i64>>,
    ) -> Self {
        let (values, validity) = split_options(values);
        Array {
            datatype: DataType::Timestamp(meta),
            validity: validity.map(Arc::new),
            data: ArrayData::Timestamp(Arc::new(values)),
        }
    }

    /// Create a categorical array from codes.
    pub fn try_from_codes(
        meta: CategoricalTypeMeta,
        codes: impl IntoIterator<Item = Option<u32>>,
    ) -> Result<Self> {
        let (codes, validity) = split_options(codes);
        Array::try_new(
            DataType::Categorical(meta),
            validity,
            ArrayData::Categorical(Arc::new(codes)),
        )
    }

    pub fn datatype(&self) -> &DataType {
        &self.datatype
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the value at `idx` is not missing.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        match &self.validity {
            Some(validity) => validity.value(idx),
            None => {
                assert!(idx < self.len(), "array index {idx} out of bounds");
                true
            }
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.validity {
            Some(validity) => validity.len() - validity.count_trues(),
            None => 0,
        }
    }

    /// Get the value at `idx` as a scalar.
    pub fn logical_value(&self, idx: usize) -> Result<ScalarValue> {
        if idx >= self.len() {
            return Err(RelError::new("Row index out of bounds")
                .with_field("idx", idx)
                .with_field("len", self.len()));
        }
        Ok(self.scalar_at(idx))
    }

    /// Iterate all values as scalars.
    pub fn iter_scalars(&self) -> impl ExactSizeIterator<Item = ScalarValue> + '_ {
        (0..self.len()).map(|idx| self.scalar_at(idx))
    }

    fn scalar_at(&self, idx: usize) -> ScalarValue {
        if !self.is_valid(idx) {
            return ScalarValue::Null;
        }
        match (&self.data, &self.datatype) {
            (ArrayData::Boolean(v), _) => ScalarValue::Boolean(v.value(idx)),
            (ArrayData::Int64(v), _) => ScalarValue::Int64(v[idx]),
            (ArrayData::Float64(v), _) => ScalarValue::Float64(v[idx]),
            (ArrayData::Utf8(v), _) => ScalarValue::Utf8(v[idx].clone()),
            (ArrayData::Categorical(v), DataType::Categorical(meta)) => match meta.label(v[idx]) {
                Some(label) => ScalarValue::Categorical(label.to_string()),
                None => ScalarValue::Null,
            },
            (ArrayData::Timestamp(v), DataType::Timestamp(meta)) => {
                ScalarValue::Timestamp(TimestampScalar {
                    micros: v[idx],
                    offset: meta.offset,
                })
            }
            // Checked during construction.
            _ => ScalarValue::Null,
        }
    }

    /// Take rows from this array using a selection vector. Locations may
    /// repeat.
    pub fn take(&self, selection: &SelectionVector) -> Result<Array> {
        if let Some(max) = selection.max_location() {
            if max >= self.len() {
                return Err(RelError::new("Selection out of bounds for array")
                    .with_field("location", max)
                    .with_field("len", self.len()));
            }
        }

        let data = self
            .data
            .take_locations(selection.iter_locations().map(Some));
        let validity = self.validity.as_ref().map(|validity| {
            Arc::new(
                selection
                    .iter_locations()
                    .map(|loc| validity.value(loc))
                    .collect::<Bitmap>(),
            )
        });

        Ok(Array {
            datatype: self.datatype.clone(),
            validity,
            data,
        })
    }

    /// Take rows where None produces a missing value.
    ///
    /// Used for outer joins where rows on one side have no match.
    pub fn take_optional(&self, locations: &[Option<usize>]) -> Result<Array> {
        if let Some(max) = locations.iter().flatten().max() {
            if *max >= self.len() {
                return Err(RelError::new("Selection out of bounds for array")
                    .with_field("location", max)
                    .with_field("len", self.len()));
            }
        }

        let data = self.data.take_locations(locations.iter().copied());
        let validity: Bitmap = locations
            .iter()
            .map(|loc| match loc {
                Some(loc) => self.is_valid(*loc),
                None => false,
            })
            .collect();
        let validity = if validity.is_all_true() {
            None
        } else {
            Some(Arc::new(validity))
        };

        Ok(Array {
            datatype: self.datatype.clone(),
            validity,
            data,
        })
    }

    /// Get a contiguous range of rows.
    pub fn slice(&self, offset: usize, count: usize) -> Result<Array> {
        let end = offset.saturating_add(count);
        if end > self.len() {
            return Err(RelError::new("Slice out of bounds for array")
                .with_field("offset", offset)
                .with_field("count", count)
                .with_field("len", self.len()));
        }
        self.take(&SelectionVector::with_range(offset..end))
    }

    /// Replace the data type while keeping the physical data.
    ///
    /// Only valid for types with the same physical layout, e.g. changing the
    /// label set of a categorical or the offset of a timestamp.
    pub(crate) fn try_with_datatype(&self, datatype: DataType) -> Result<Array> {
        Array::try_new(
            datatype,
            self.validity.as_deref().cloned(),
            self.data.clone(),
        )
    }

    pub fn iter_bool(&self) -> Result<impl Iterator<Item = Option<bool>> + '_> {
        match &self.data {
            ArrayData::Boolean(v) => {
                Ok((0..self.len()).map(move |idx| self.is_valid(idx).then(|| v.value(idx))))
            }
            _ => Err(self.unexpected_type("Boolean")),
        }
    }

    pub fn iter_i64(&self) -> Result<impl Iterator<Item = Option<i64>> + '_> {
        match &self.data {
            ArrayData::Int64(v) => {
                Ok((0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx])))
            }
            _ => Err(self.unexpected_type("Int64")),
        }
    }

    /// Iterate numeric values as floats, widening integers.
    pub fn iter_f64(&self) -> Result<Box<dyn Iterator<Item = Option<f64>> + '_>> {
        match &self.data {
            ArrayData::Float64(v) => Ok(Box::new(
                (0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx])),
            )),
            ArrayData::Int64(v) => Ok(Box::new(
                (0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx] as f64)),
            )),
            _ => Err(self.unexpected_type("numeric")),
        }
    }

    /// Iterate string values, resolving categorical codes to their labels.
    pub fn iter_str(&self) -> Result<Box<dyn Iterator<Item = Option<&str>> + '_>> {
        match (&self.data, &self.datatype) {
            (ArrayData::Utf8(v), _) => Ok(Box::new(
                (0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx].as_str())),
            )),
            (ArrayData::Categorical(v), DataType::Categorical(meta)) => {
                Ok(Box::new((0..self.len()).map(move |idx| {
                    if self.is_valid(idx) {
                        meta.label(v[idx])
                    } else {
                        None
                    }
                })))
            }
            _ => Err(self.unexpected_type("string")),
        }
    }

    /// Iterate raw categorical codes.
    pub fn iter_codes(&self) -> Result<impl Iterator<Item = Option<u32>> + '_> {
        match &self.data {
            ArrayData::Categorical(v) => {
                Ok((0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx])))
            }
            _ => Err(self.unexpected_type("Categorical")),
        }
    }

    /// Iterate timestamp values as microseconds since the epoch.
    pub fn iter_timestamp(&self) -> Result<impl Iterator<Item = Option<i64>> + '_> {
        match &self.data {
            ArrayData::Timestamp(v) => {
                Ok((0..self.len()).map(move |idx| self.is_valid(idx).then(|| v[idx])))
            }
            _ => Err(self.unexpected_type("Timestamp")),
        }
    }

    fn unexpected_type(&self, want: &str) -> RelError {
        RelError::type_mismatch(format!("Expected {want} array, got {}", self.datatype))
    }
}

impl PartialEq for Array {
    /// Logical equality. Physical values under missing positions are
    /// ignored, and floats compare by total order so NaN equals NaN.
    fn eq(&self, other: &Self) -> bool {
        if self.datatype != other.datatype || self.len() != other.len() {
            return false;
        }
        self.iter_scalars()
            .zip(other.iter_scalars())
            .all(|(a, b)| match (a, b) {
                (ScalarValue::Float64(a), ScalarValue::Float64(b)) => a.total_cmp(&b).is_eq(),
                (a, b) => a == b,
            })
    }
}

fn split_options<T: Default>(values: impl IntoIterator<Item = Option<T>>) -> (Vec<T>, Option<Bitmap>) {
    let values = values.into_iter();
    let mut validity = Bitmap::with_capacity(values.size_hint().0);
    let mut out = Vec::with_capacity(values.size_hint().0);
    for value in values {
        match value {
            Some(v) => {
                validity.push(true);
                out.push(v);
            }
            None => {
                validity.push(false);
                out.push(T::default());
            }
        }
    }
    let validity = if validity.is_all_true() {
        None
    } else {
        Some(validity)
    };
    (out, validity)
}

macro_rules! impl_from_iter {
    ($native:ty, $variant:ident, $convert:expr) => {
        impl FromIterator<$native> for Array {
            fn from_iter<T: IntoIterator<Item = $native>>(iter: T) -> Self {
                Array::from_iter(iter.into_iter().map(Some))
            }
        }

        impl FromIterator<Option<$native>> for Array {
            fn from_iter<T: IntoIterator<Item = Option<$native>>>(iter: T) -> Self {
                let (values, validity) = split_options(iter.into_iter().map(|v| v.map($convert)));
                Array {
                    datatype: DataType::$variant,
                    validity: validity.map(Arc::new),
                    data: ArrayData::$variant(Arc::new(values)),
                }
            }
        }
    };
}

impl_from_iter!(i64, Int64, |v| v);
impl_from_iter!(f64, Float64, |v| v);
impl_from_iter!(String, Utf8, |v| v);

impl<'a> FromIterator<&'a str> for Array {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Array::from_iter(iter.into_iter().map(|s| Some(s.to_string())))
    }
}

impl<'a> FromIterator<Option<&'a str>> for Array {
    fn from_iter<T: IntoIterator<Item = Option<&'a str>>>(iter: T) -> Self {
        Array::from_iter(iter.into_iter().map(|s| s.map(|s| s.to_string())))
    }
}

impl FromIterator<bool> for Array {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Array::from_iter(iter.into_iter().map(Some))
    }
}

impl FromIterator<Option<bool>> for Array {
    fn from_iter<T: IntoIterator<Item = Option<bool>>>(iter: T) -> Self {
        let (values, validity) = split_options(iter);
        Array {
            datatype: DataType::Boolean,
            validity: validity.map(Arc::new),
            data: ArrayData::Boolean(Arc::new(values.into_iter().collect())),
        }
    }
}

#[derive(Debug)]
enum BuilderValues {
    Boolean(Bitmap),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
    Categorical(Vec<u32>),
    Timestamp(Vec<i64>),
}

/// Incrementally build an array from scalar values.
#[derive(Debug)]
pub struct ArrayBuilder {
    datatype: DataType,
    validity: Bitmap,
    values: BuilderValues,
}

impl ArrayBuilder {
    pub fn with_capacity(datatype: &DataType, cap: usize) -> Self {
        let values = match datatype {
            DataType::Boolean => BuilderValues::Boolean(Bitmap::with_capacity(cap)),
            DataType::Int64 => BuilderValues::Int64(Vec::with_capacity(cap)),
            DataType::Float64 => BuilderValues::Float64(Vec::with_capacity(cap)),
            DataType::Utf8 => BuilderValues::Utf8(Vec::with_capacity(cap)),
            DataType::Categorical(_) => BuilderValues::Categorical(Vec::with_capacity(cap)),
            DataType::Timestamp(_) => BuilderValues::Timestamp(Vec::with_capacity(cap)),
        };
        ArrayBuilder {
            datatype: datatype.clone(),
            validity: Bitmap::with_capacity(cap),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_null(&mut self) {
        self.validity.push(false);
        match &mut self.values {
            BuilderValues::Boolean(v) => v.push(false),
            BuilderValues::Int64(v) => v.push(0),
            BuilderValues::Float64(v) => v.push(0.0),
            BuilderValues::Utf8(v) => v.push(String::new()),
            BuilderValues::Categorical(v) => v.push(0),
            BuilderValues::Timestamp(v) => v.push(0),
        }
    }

    /// Push a scalar.
    ///
    /// Integers are widened when pushed to a float array, and string labels
    /// are encoded when pushed to a categorical array.
    pub fn push_value(&mut self, scalar: &ScalarValue) -> Result<()> {
        match (&mut self.values, scalar) {
            (_, ScalarValue::Null) => {
                self.push_null();
                return Ok(());
            }
            (BuilderValues::Boolean(v), ScalarValue::Boolean(b)) => v.push(*b),
            (BuilderValues::Int64(v), ScalarValue::Int64(i)) => v.push(*i),
            (BuilderValues::Float64(v), ScalarValue::Float64(f)) => v.push(*f),
            (BuilderValues::Float64(v), ScalarValue::Int64(i)) => v.push(*i as f64),
            (BuilderValues::Utf8(v), ScalarValue::Utf8(s) | ScalarValue::Categorical(s)) => {
                v.push(s.clone())
            }
            (
                BuilderValues::Categorical(v),
                ScalarValue::Utf8(s) | ScalarValue::Categorical(s),
            ) => {
                let code = match &self.datatype {
                    DataType::Categorical(meta) => meta.code_of(s),
                    _ => None,
                };
                match code {
                    Some(code) => v.push(code),
                    None => {
                        return Err(RelError::type_mismatch(
                            "Value is not a label of the categorical",
                        )
                        .with_field("value", s));
                    }
                }
            }
            (BuilderValues::Timestamp(v), ScalarValue::Timestamp(ts)) => v.push(ts.micros),
            (_, other) => {
                return Err(RelError::type_mismatch(format!(
                    "Cannot store {other} in a {} array",
                    self.datatype
                )));
            }
        }
        self.validity.push(true);
        Ok(())
    }

    pub fn finish(self) -> Array {
        let data = match self.values {
            BuilderValues::Boolean(v) => ArrayData::Boolean(Arc::new(v)),
            BuilderValues::Int64(v) => ArrayData::Int64(Arc::new(v)),
            BuilderValues::Float64(v) => ArrayData::Float64(Arc::new(v)),
            BuilderValues::Utf8(v) => ArrayData::Utf8(Arc::new(v)),
            BuilderValues::Categorical(v) => ArrayData::Categorical(Arc::new(v)),
            BuilderValues::Timestamp(v) => ArrayData::Timestamp(Arc::new(v)),
        };
        let validity = if self.validity.is_all_true() {
            None
        } else {
            Some(Arc::new(self.validity))
        };
        Array {
            datatype: self.datatype,
            validity,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;

    #[test]
    fn from_iter_with_nulls() {
        let arr = Array::from_iter([Some(1_i64), None, Some(3)]);
        assert_eq!(3, arr.len());
        assert_eq!(1, arr.null_count());
        assert_eq!(ScalarValue::Null, arr.logical_value(1).unwrap());
        assert_eq!(ScalarValue::Int64(3), arr.logical_value(2).unwrap());
        arr.logical_value(3).unwrap_err();
    }

    #[test]
    fn take_repeats() {
        let arr = Array::from_iter(["a", "b", "c"]);
        let out = arr.take(&SelectionVector::from_iter([2, 0, 0])).unwrap();
        assert_eq!(Array::from_iter(["c", "a", "a"]), out);
    }

    #[test]
    fn take_out_of_bounds() {
        let arr = Array::from_iter([1_i64, 2]);
        arr.take(&SelectionVector::from_iter([2])).unwrap_err();
    }

    #[test]
    fn take_optional_introduces_nulls() {
        let arr = Array::from_iter([1.5, 2.5]);
        let out = arr.take_optional(&[Some(1), None, Some(0)]).unwrap();
        assert_eq!(Array::from_iter([Some(2.5), None, Some(1.5)]), out);
    }

    #[test]
    fn equality_ignores_masked_values() {
        let a = Array::from_iter([Some(1_i64), None]);
        let b = Array::try_new(
            DataType::Int64,
            Some(Bitmap::from_iter([true, false])),
            ArrayData::Int64(Arc::new(vec![1, 99])),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nan_equals_nan() {
        let a = Array::from_iter([f64::NAN]);
        let b = Array::from_iter([f64::NAN]);
        assert_eq!(a, b);
    }

    #[test]
    fn builder_categorical() {
        let dt = DataType::categorical(["lo", "hi"]).unwrap();
        let mut builder = ArrayBuilder::with_capacity(&dt, 3);
        builder.push_value(&"hi".into()).unwrap();
        builder.push_value(&ScalarValue::Null).unwrap();
        builder.push_value(&"lo".into()).unwrap();

        let err = builder.push_value(&"mid".into()).unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());

        let arr = builder.finish();
        let labels: Vec<_> = arr.iter_str().unwrap().collect();
        assert_eq!(vec![Some("hi"), None, Some("lo")], labels);
        let codes: Vec<_> = arr.iter_codes().unwrap().collect();
        assert_eq!(vec![Some(1), None, Some(0)], codes);
    }

    #[test]
    fn builder_widens_ints() {
        let mut builder = ArrayBuilder::with_capacity(&DataType::Float64, 1);
        builder.push_value(&ScalarValue::Int64(4)).unwrap();
        assert_eq!(Array::from_iter([4.0]), builder.finish());
    }

    #[test]
    fn try_new_rejects_bad_codes() {
        let meta = CategoricalTypeMeta::try_new(["a"]).unwrap();
        Array::try_from_codes(meta, [Some(0), Some(1)]).unwrap_err();
    }

    #[test]
    fn try_new_rejects_mismatched_data() {
        let err = Array::try_new(
            DataType::Float64,
            None,
            ArrayData::Int64(Arc::new(vec![1])),
        )
        .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn null_array() {
        let arr = Array::new_null(&DataType::Utf8, 2);
        assert_eq!(2, arr.null_count());
        assert_eq!(vec![None, None], arr.iter_str().unwrap().collect::<Vec<_>>());
    }

    #[test]
    fn slice_array() {
        let arr = Array::from_iter([1_i64, 2, 3, 4]);
        assert_eq!(Array::from_iter([2_i64, 3]), arr.slice(1, 2).unwrap());
        arr.slice(3, 2).unwrap_err();
    }

    #[test]
    fn iter_f64_widens() {
        let arr = Array::from_iter([Some(1_i64), None]);
        let vals: Vec<_> = arr.iter_f64().unwrap().collect();
        assert_eq!(vec![Some(1.0), None], vals);
    }
}
