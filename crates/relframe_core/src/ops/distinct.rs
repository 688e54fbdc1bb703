use relframe_error::Result;
use tracing::trace;

use super::group_key::{RowKeys, group_rows, resolve_key_columns};
use super::select::project;
use crate::arrays::selection::SelectionVector;
use crate::relation::Relation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinctOptions {
    /// Columns that determine uniqueness. None uses every column.
    pub keys: Option<Vec<String>>,
    /// When keys are given, keep the full first row for each key instead of
    /// only the key columns.
    pub keep_all: bool,
}

impl DistinctOptions {
    pub fn on<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        DistinctOptions {
            keys: Some(keys.into_iter().map(|k| k.into()).collect()),
            keep_all: false,
        }
    }

    pub fn keep_all(mut self, keep_all: bool) -> Self {
        self.keep_all = keep_all;
        self
    }
}

/// Remove duplicate rows, keeping the first row seen for each key.
pub fn distinct_rows(relation: &Relation, options: &DistinctOptions) -> Result<Relation> {
    let key_names: Vec<&str> = match &options.keys {
        Some(keys) => keys.iter().map(|k| k.as_str()).collect(),
        None => relation.column_names().collect(),
    };
    let key_columns = resolve_key_columns(relation, &key_names)?;

    let arrays: Vec<_> = key_columns.iter().map(|(_, arr)| *arr).collect();
    let keys = RowKeys::try_new(&arrays, relation.num_rows())?;
    let grouping = group_rows(&keys);

    let out = relation.take(&SelectionVector::from_iter(grouping.first_rows))?;
    trace!(
        input_rows = relation.num_rows(),
        output_rows = out.num_rows(),
        "distinct"
    );

    match &options.keys {
        Some(_) if !options.keep_all => {
            let indices: Vec<usize> = key_columns.iter().map(|(idx, _)| *idx).collect();
            project(&out, &indices)
        }
        _ => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;
    use crate::arrays::array::Array;
    use crate::arrays::scalar::ScalarValue;

    fn rel() -> Relation {
        Relation::try_new([
            ("k", Array::from_iter([1_i64, 1, 2, 1])),
            ("v", Array::from_iter(["a", "b", "c", "a"])),
        ])
        .unwrap()
    }

    #[test]
    fn distinct_all_columns() {
        let out = distinct_rows(&rel(), &DistinctOptions::default()).unwrap();
        assert_eq!(&Array::from_iter([1_i64, 1, 2]), out.column("k").unwrap());
        assert_eq!(&Array::from_iter(["a", "b", "c"]), out.column("v").unwrap());
    }

    #[test]
    fn distinct_keys_only() {
        let out = distinct_rows(&rel(), &DistinctOptions::on(["k"])).unwrap();
        assert_eq!(vec!["k"], out.column_names().collect::<Vec<_>>());
        assert_eq!(&Array::from_iter([1_i64, 2]), out.column("k").unwrap());
    }

    #[test]
    fn distinct_keep_first_full_row() {
        let rel = Relation::try_new([
            ("k", Array::from_iter([1_i64, 1])),
            ("v", Array::from_iter(["a", "b"])),
        ])
        .unwrap();
        let out = distinct_rows(&rel, &DistinctOptions::on(["k"]).keep_all(true)).unwrap();
        assert_eq!(
            vec![vec![ScalarValue::from(1_i64), ScalarValue::from("a")]],
            out.rows().unwrap()
        );
    }

    #[test]
    fn distinct_key_order_as_given() {
        let out = distinct_rows(&rel(), &DistinctOptions::on(["v", "k"])).unwrap();
        assert_eq!(vec!["v", "k"], out.column_names().collect::<Vec<_>>());
        assert_eq!(3, out.num_rows());
    }

    #[test]
    fn distinct_unknown_key() {
        let err = distinct_rows(&rel(), &DistinctOptions::on(["x"])).unwrap_err();
        assert_eq!(ErrorKind::InvalidKey, err.kind());
    }

    #[test]
    fn distinct_no_columns() {
        let rel = Relation::new_without_columns(3);
        let out = distinct_rows(&rel, &DistinctOptions::default()).unwrap();
        assert_eq!(1, out.num_rows());
    }
}
