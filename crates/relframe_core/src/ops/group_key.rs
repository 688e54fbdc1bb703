//! Row keys for grouping, deduplication and join matching.

use ahash::RandomState;
use hashbrown::HashMap;
use relframe_error::{RelError, Result};

use crate::arrays::array::Array;
use crate::arrays::datatype::DataType;
use crate::relation::Relation;

/// A hashable view of a single key cell.
///
/// Categoricals hash by label, so two categorical columns with different
/// label sets still compare by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum KeyValue<'a> {
    Missing,
    Boolean(bool),
    Int(i64),
    /// Canonical bits of a float. All NaNs share one representation, and
    /// negative zero is folded into zero.
    Float(u64),
    Str(&'a str),
    Timestamp(i64),
}

impl KeyValue<'_> {
    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, KeyValue::Missing)
    }
}

fn canonical_float_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0_f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Key values for every row of a column.
pub(crate) fn column_key_values(arr: &Array) -> Result<Vec<KeyValue<'_>>> {
    Ok(match arr.datatype() {
        DataType::Boolean => arr
            .iter_bool()?
            .map(|v| v.map(KeyValue::Boolean).unwrap_or(KeyValue::Missing))
            .collect(),
        DataType::Int64 => arr
            .iter_i64()?
            .map(|v| v.map(KeyValue::Int).unwrap_or(KeyValue::Missing))
            .collect(),
        DataType::Float64 => arr
            .iter_f64()?
            .map(|v| match v {
                Some(v) => KeyValue::Float(canonical_float_bits(v)),
                None => KeyValue::Missing,
            })
            .collect(),
        DataType::Utf8 | DataType::Categorical(_) => arr
            .iter_str()?
            .map(|v| v.map(KeyValue::Str).unwrap_or(KeyValue::Missing))
            .collect(),
        DataType::Timestamp(_) => arr
            .iter_timestamp()?
            .map(|v| v.map(KeyValue::Timestamp).unwrap_or(KeyValue::Missing))
            .collect(),
    })
}

/// Key values for a numeric column that must compare exactly against a column
/// of the other numeric type.
///
/// Integral floats within the `i64` range become `Int` keys. Every other float
/// stays a `Float` key, so it never equals an integer.
pub(crate) fn exact_numeric_key_values(arr: &Array) -> Result<Vec<KeyValue<'_>>> {
    // 2^63, exactly representable.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    match arr.datatype() {
        DataType::Float64 => Ok(arr
            .iter_f64()?
            .map(|v| match v {
                Some(v) if v.fract() == 0.0 && (-BOUND..BOUND).contains(&v) => {
                    KeyValue::Int(v as i64)
                }
                Some(v) => KeyValue::Float(canonical_float_bits(v)),
                None => KeyValue::Missing,
            })
            .collect()),
        _ => column_key_values(arr),
    }
}

/// Row-major keys over a set of columns.
#[derive(Debug)]
pub(crate) struct RowKeys<'a> {
    columns: Vec<Vec<KeyValue<'a>>>,
    num_rows: usize,
}

impl<'a> RowKeys<'a> {
    pub(crate) fn try_new(columns: &[&'a Array], num_rows: usize) -> Result<Self> {
        let columns = columns
            .iter()
            .map(|&arr| column_key_values(arr))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowKeys { columns, num_rows })
    }

    pub(crate) fn from_key_values(columns: Vec<Vec<KeyValue<'a>>>, num_rows: usize) -> Self {
        RowKeys { columns, num_rows }
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub(crate) fn row(&self, idx: usize) -> Vec<KeyValue<'a>> {
        self.columns.iter().map(|col| col[idx]).collect()
    }

    pub(crate) fn row_has_missing(&self, idx: usize) -> bool {
        self.columns.iter().any(|col| col[idx].is_missing())
    }
}

/// Resolve key column names, reporting unknown names as invalid keys.
pub(crate) fn resolve_key_columns<'a>(
    relation: &'a Relation,
    keys: &[&str],
) -> Result<Vec<(usize, &'a Array)>> {
    keys.iter()
        .map(|key| match relation.schema().index_of(key) {
            Some(idx) => Ok((idx, &relation.columns()[idx])),
            None => Err(RelError::invalid_key(format!("Key column '{key}' does not exist"))
                .with_field("available", relation.column_names().collect::<Vec<_>>().join(", "))),
        })
        .collect()
}

/// Assignment of rows to groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grouping {
    /// Group index for each input row.
    pub group_ids: Vec<usize>,
    /// First row of each group, in order of first appearance.
    pub first_rows: Vec<usize>,
}

impl Grouping {
    pub(crate) fn num_groups(&self) -> usize {
        self.first_rows.len()
    }

    /// Row indices of each group, in input order.
    pub(crate) fn rows_per_group(&self) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::new(); self.num_groups()];
        for (row, &group) in self.group_ids.iter().enumerate() {
            rows[group].push(row);
        }
        rows
    }
}

/// Partition rows by equal key values. Missing key values are equal to each
/// other, so they form a single group.
pub(crate) fn group_rows(keys: &RowKeys<'_>) -> Grouping {
    let mut table: HashMap<Vec<KeyValue<'_>>, usize, RandomState> =
        HashMap::with_hasher(RandomState::new());
    let mut group_ids = Vec::with_capacity(keys.num_rows());
    let mut first_rows = Vec::new();

    for row in 0..keys.num_rows() {
        let next_id = first_rows.len();
        let id = *table.entry(keys.row(row)).or_insert_with(|| {
            first_rows.push(row);
            next_id
        });
        group_ids.push(id);
    }

    Grouping {
        group_ids,
        first_rows,
    }
}
