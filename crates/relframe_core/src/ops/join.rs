use std::fmt;

use ahash::RandomState;
use hashbrown::HashMap;
use relframe_error::{RelError, Result};
use tracing::debug;

use super::group_key::{
    KeyValue, RowKeys, column_key_values, exact_numeric_key_values, resolve_key_columns,
};
use crate::arrays::array::Array;
use crate::arrays::compute::cast::cast_array;
use crate::arrays::compute::interleave::interleave;
use crate::arrays::datatype::DataType;
use crate::arrays::field::{Field, Schema};
use crate::arrays::selection::SelectionVector;
use crate::relation::Relation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Rows with a match on both sides.
    Inner,
    /// Every left row, with missing right columns when there's no match.
    Left,
    /// Every row from both sides.
    Full,
    /// Left rows with at least one match. Only left columns are returned.
    Semi,
    /// Left rows without a match. Only left columns are returned.
    Anti,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Full => write!(f, "FULL"),
            Self::Semi => write!(f, "SEMI"),
            Self::Anti => write!(f, "ANTI"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOptions {
    /// Whether missing key values match each other.
    pub nulls_equal: bool,
    /// Suffixes appended to colliding non-key column names from the left and
    /// right sides.
    pub suffixes: (String, String),
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            nulls_equal: true,
            suffixes: (".x".to_string(), ".y".to_string()),
        }
    }
}

/// A pair of columns to join on. The output key column takes the left name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKey {
    pub left: String,
    pub right: String,
}

impl JoinKey {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        JoinKey {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl From<&str> for JoinKey {
    fn from(name: &str) -> Self {
        JoinKey::new(name, name)
    }
}

impl From<(&str, &str)> for JoinKey {
    fn from((left, right): (&str, &str)) -> Self {
        JoinKey::new(left, right)
    }
}

/// Type both sides of a key are compared as.
fn join_key_type(left: &DataType, right: &DataType) -> Result<DataType> {
    match (left, right) {
        (l, r) if l == r => Ok(l.clone()),
        (l, r) if l.is_numeric() && r.is_numeric() => Ok(DataType::Float64),
        (l, r) if l.is_string_like() && r.is_string_like() => Ok(DataType::Utf8),
        // Instants compare regardless of offset.
        (DataType::Timestamp(_), DataType::Timestamp(_)) => Ok(left.clone()),
        (l, r) => Err(RelError::type_mismatch(format!(
            "Cannot join {l} key with {r} key"
        ))),
    }
}

/// Matched (left, right) row pairs in output order.
fn match_rows(
    left: &RowKeys<'_>,
    right: &RowKeys<'_>,
    join_type: JoinType,
    nulls_equal: bool,
) -> Vec<(Option<usize>, Option<usize>)> {
    let mut table: HashMap<Vec<KeyValue<'_>>, Vec<usize>, RandomState> =
        HashMap::with_hasher(RandomState::new());
    for row in 0..right.num_rows() {
        if !nulls_equal && right.row_has_missing(row) {
            continue;
        }
        table.entry(right.row(row)).or_default().push(row);
    }

    let mut right_matched = vec![false; right.num_rows()];
    let mut pairs = Vec::with_capacity(left.num_rows());

    for row in 0..left.num_rows() {
        let matches = if !nulls_equal && left.row_has_missing(row) {
            None
        } else {
            table.get(&left.row(row))
        };

        match (join_type, matches) {
            (JoinType::Semi, Some(_)) | (JoinType::Anti, None) => pairs.push((Some(row), None)),
            (JoinType::Semi, None) | (JoinType::Anti, Some(_)) => (),
            (_, Some(matches)) => {
                for &r in matches {
                    right_matched[r] = true;
                    pairs.push((Some(row), Some(r)));
                }
            }
            (JoinType::Left | JoinType::Full, None) => pairs.push((Some(row), None)),
            (JoinType::Inner, None) => (),
        }
    }

    if join_type == JoinType::Full {
        pairs.extend(
            right_matched
                .iter()
                .enumerate()
                .filter(|(_, matched)| !**matched)
                .map(|(r, _)| (None, Some(r))),
        );
    }

    pairs
}

/// Join two relations on equal key values.
///
/// Output columns are the keys (once, named after the left side), then left
/// non-key columns, then right non-key columns. Multiple right matches repeat
/// the left row in right order. Semi and anti joins return the left columns
/// unchanged.
pub fn join(
    left: &Relation,
    right: &Relation,
    keys: &[JoinKey],
    join_type: JoinType,
    options: &JoinOptions,
) -> Result<Relation> {
    if keys.is_empty() {
        return Err(RelError::invalid_key("Join requires at least one key"));
    }

    let left_names: Vec<&str> = keys.iter().map(|k| k.left.as_str()).collect();
    let right_names: Vec<&str> = keys.iter().map(|k| k.right.as_str()).collect();
    let left_keys = resolve_key_columns(left, &left_names)?;
    let right_keys = resolve_key_columns(right, &right_names)?;

    // Cast both sides of each key to a shared type.
    let mut left_key_arrays = Vec::with_capacity(keys.len());
    let mut right_key_arrays = Vec::with_capacity(keys.len());
    for (key, ((_, l), (_, r))) in keys.iter().zip(left_keys.iter().zip(&right_keys)) {
        let datatype = join_key_type(l.datatype(), r.datatype())
            .map_err(|e| e.with_field("key", &key.left))?;
        left_key_arrays.push(cast_array(l, &datatype)?);
        right_key_arrays.push(cast_array(r, &datatype)?);
    }

    // Mixed Int64/Float64 keys match on exact values, not on the widened
    // floats.
    let mut left_values = Vec::with_capacity(keys.len());
    let mut right_values = Vec::with_capacity(keys.len());
    for (idx, ((_, l), (_, r))) in left_keys.iter().zip(&right_keys).enumerate() {
        if l.datatype().is_numeric() && l.datatype() != r.datatype() {
            left_values.push(exact_numeric_key_values(l)?);
            right_values.push(exact_numeric_key_values(r)?);
        } else {
            left_values.push(column_key_values(&left_key_arrays[idx])?);
            right_values.push(column_key_values(&right_key_arrays[idx])?);
        }
    }

    let pairs = {
        let left_rows = RowKeys::from_key_values(left_values, left.num_rows());
        let right_rows = RowKeys::from_key_values(right_values, right.num_rows());
        match_rows(&left_rows, &right_rows, join_type, options.nulls_equal)
    };

    debug!(
        %join_type,
        left_rows = left.num_rows(),
        right_rows = right.num_rows(),
        output_rows = pairs.len(),
        "join"
    );

    if matches!(join_type, JoinType::Semi | JoinType::Anti) {
        let selection: SelectionVector = pairs.iter().filter_map(|(l, _)| *l).collect();
        return left.take(&selection);
    }

    let left_locs: Vec<Option<usize>> = pairs.iter().map(|(l, _)| *l).collect();
    let right_locs: Vec<Option<usize>> = pairs.iter().map(|(_, r)| *r).collect();

    let mut fields = Vec::new();
    let mut columns = Vec::new();

    // Keys.
    for (idx, (left_idx, left_arr)) in left_keys.iter().enumerate() {
        let name = &left.schema().fields()[*left_idx].name;
        let column = if join_type == JoinType::Full {
            let indices: Vec<(usize, usize)> = pairs
                .iter()
                .map(|pair| match pair {
                    (Some(l), _) => (0, *l),
                    (None, Some(r)) => (1, *r),
                    // Pairs always have at least one side.
                    (None, None) => (0, 0),
                })
                .collect();
            interleave(&[&left_key_arrays[idx], &right_key_arrays[idx]], &indices)?
        } else {
            left_arr.take_optional(&left_locs)?
        };
        fields.push(Field::new(name.clone(), column.datatype().clone()));
        columns.push(column);
    }

    let left_key_idx: Vec<usize> = left_keys.iter().map(|(idx, _)| *idx).collect();
    let right_key_idx: Vec<usize> = right_keys.iter().map(|(idx, _)| *idx).collect();

    let left_rest: Vec<(&Field, &Array)> = left
        .iter_columns()
        .enumerate()
        .filter(|(idx, _)| !left_key_idx.contains(idx))
        .map(|(_, col)| col)
        .collect();
    let right_rest: Vec<(&Field, &Array)> = right
        .iter_columns()
        .enumerate()
        .filter(|(idx, _)| !right_key_idx.contains(idx))
        .map(|(_, col)| col)
        .collect();

    let (left_suffix, right_suffix) = &options.suffixes;
    let key_names: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();

    for (field, arr) in &left_rest {
        let collides = right_rest.iter().any(|(f, _)| f.name == field.name);
        let name = if collides {
            format!("{}{left_suffix}", field.name)
        } else {
            field.name.clone()
        };
        fields.push(Field::new(name, field.datatype.clone()));
        columns.push(arr.take_optional(&left_locs)?);
    }

    for (field, arr) in &right_rest {
        let collides = left_rest.iter().any(|(f, _)| f.name == field.name)
            || key_names.contains(&field.name);
        let name = if collides {
            format!("{}{right_suffix}", field.name)
        } else {
            field.name.clone()
        };
        fields.push(Field::new(name, field.datatype.clone()));
        columns.push(arr.take_optional(&right_locs)?);
    }

    Relation::try_from_parts(Schema::try_new(fields)?, columns, pairs.len())
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;
    use crate::arrays::scalar::ScalarValue;

    fn join_default(left: &Relation, right: &Relation, on: &str, join_type: JoinType) -> Relation {
        join(left, right, &[on.into()], join_type, &JoinOptions::default()).unwrap()
    }

    fn scalars<const N: usize>(vals: [ScalarValue; N]) -> Vec<ScalarValue> {
        vals.to_vec()
    }

    #[test]
    fn inner_duplicates_left_row_per_match() {
        let left = Relation::try_new([
            ("k", Array::from_iter([1_i64])),
            ("v", Array::from_iter(["L1"])),
        ])
        .unwrap();
        let right = Relation::try_new([
            ("k", Array::from_iter([1_i64, 1])),
            ("v", Array::from_iter(["R1", "R2"])),
        ])
        .unwrap();

        let out = join_default(&left, &right, "k", JoinType::Inner);
        assert_eq!(vec!["k", "v.x", "v.y"], out.column_names().collect::<Vec<_>>());
        assert_eq!(
            vec![
                scalars([1_i64.into(), "L1".into(), "R1".into()]),
                scalars([1_i64.into(), "L1".into(), "R2".into()]),
            ],
            out.rows().unwrap()
        );
    }

    #[test]
    fn left_and_full() {
        let flights = Relation::try_new([
            ("carrier", Array::from_iter(["UA", "ZZ", "AA"])),
            ("flight", Array::from_iter([1545_i64, 1, 1141])),
        ])
        .unwrap();
        let airlines = Relation::try_new([
            ("carrier", Array::from_iter(["AA", "B6", "UA"])),
            ("name", Array::from_iter(["American", "JetBlue", "United"])),
        ])
        .unwrap();

        let out = join_default(&flights, &airlines, "carrier", JoinType::Left);
        assert_eq!(
            vec!["carrier", "flight", "name"],
            out.column_names().collect::<Vec<_>>()
        );
        assert_eq!(
            &Array::from_iter([Some("United"), None, Some("American")]),
            out.column("name").unwrap()
        );

        let out = join_default(&flights, &airlines, "carrier", JoinType::Full);
        assert_eq!(
            &Array::from_iter(["UA", "ZZ", "AA", "B6"]),
            out.column("carrier").unwrap()
        );
        assert_eq!(
            &Array::from_iter([Some(1545_i64), Some(1), Some(1141), None]),
            out.column("flight").unwrap()
        );
        assert_eq!(
            &Array::from_iter([Some("United"), None, Some("American"), Some("JetBlue")]),
            out.column("name").unwrap()
        );
    }

    #[test]
    fn semi_and_anti() {
        let left = Relation::try_new([("k", Array::from_iter([1_i64, 2, 1]))]).unwrap();
        let right = Relation::try_new([
            ("k", Array::from_iter([1_i64, 1])),
            ("extra", Array::from_iter([true, false])),
        ])
        .unwrap();

        let out = join_default(&left, &right, "k", JoinType::Anti);
        assert_eq!(vec![vec![ScalarValue::from(2_i64)]], out.rows().unwrap());

        let out = join_default(&left, &right, "k", JoinType::Semi);
        assert_eq!(left.schema(), out.schema());
        assert_eq!(&Array::from_iter([1_i64, 1]), out.column("k").unwrap());
    }

    #[test]
    fn missing_keys_match_by_default() {
        let left = Relation::try_new([("k", Array::from_iter([None, Some(1_i64)]))]).unwrap();
        let right = Relation::try_new([
            ("k", Array::from_iter([None, Some(2_i64)])),
            ("v", Array::from_iter(["missing", "two"])),
        ])
        .unwrap();

        let out = join_default(&left, &right, "k", JoinType::Inner);
        assert_eq!(1, out.num_rows());

        let options = JoinOptions {
            nulls_equal: false,
            ..Default::default()
        };
        let out = join(&left, &right, &["k".into()], JoinType::Inner, &options).unwrap();
        assert_eq!(0, out.num_rows());
    }

    #[test]
    fn different_key_names_and_types() {
        let left = Relation::try_new([
            ("dest", Array::from_iter(["IAH", "MIA"])),
            ("n", Array::from_iter([1_i64, 2])),
        ])
        .unwrap();
        let dt = DataType::categorical(["MIA", "IAH"]).unwrap();
        let faa = Array::try_from_scalars(&dt, &[ScalarValue::from("MIA")]).unwrap();
        let right = Relation::try_new([
            ("faa", faa),
            ("dest", Array::from_iter(["Miami"])),
        ])
        .unwrap();

        let out = join(
            &left,
            &right,
            &[("dest", "faa").into()],
            JoinType::Inner,
            &JoinOptions::default(),
        )
        .unwrap();
        // Right "dest" collides with the output key name.
        assert_eq!(vec!["dest", "n", "dest.y"], out.column_names().collect::<Vec<_>>());
        assert_eq!(
            vec![scalars(["MIA".into(), 2_i64.into(), "Miami".into()])],
            out.rows().unwrap()
        );
    }

    #[test]
    fn numeric_keys_widen() {
        let left = Relation::try_new([("k", Array::from_iter([1_i64, 2]))]).unwrap();
        let right = Relation::try_new([
            ("k", Array::from_iter([2.0])),
            ("v", Array::from_iter(["two"])),
        ])
        .unwrap();
        let out = join_default(&left, &right, "k", JoinType::Left);
        assert_eq!(
            &Array::from_iter([None, Some("two")]),
            out.column("v").unwrap()
        );
        // Non-full joins keep the left key type.
        assert_eq!(&DataType::Int64, out.column("k").unwrap().datatype());
    }

    #[test]
    fn mixed_numeric_keys_match_exactly() {
        let big = 1_i64 << 53;
        let left = Relation::try_new([("k", Array::from_iter([big + 1, big, 3]))]).unwrap();
        let right = Relation::try_new([
            ("k", Array::from_iter([big as f64, 3.5, f64::NAN])),
            ("v", Array::from_iter(["big", "frac", "nan"])),
        ])
        .unwrap();

        let out = join_default(&left, &right, "k", JoinType::Inner);
        assert_eq!(1, out.num_rows());
        assert_eq!(&Array::from_iter(["big"]), out.column("v").unwrap());

        // Swapped sides behave the same.
        let out = join_default(&right, &left, "k", JoinType::Semi);
        assert_eq!(&Array::from_iter(["big"]), out.column("v").unwrap());

        let out = join_default(&left, &right, "k", JoinType::Full);
        assert_eq!(5, out.num_rows());
    }

    #[test]
    fn errors() {
        let left = Relation::try_new([("k", Array::from_iter([1_i64]))]).unwrap();
        let right = Relation::try_new([("k", Array::from_iter(["1"]))]).unwrap();

        let err = join(&left, &right, &["k".into()], JoinType::Inner, &JoinOptions::default())
            .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());

        let err = join(&left, &right, &["x".into()], JoinType::Inner, &JoinOptions::default())
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidKey, err.kind());

        let err = join(&left, &right, &[], JoinType::Inner, &JoinOptions::default()).unwrap_err();
        assert_eq!(ErrorKind::InvalidKey, err.kind());
    }
}
