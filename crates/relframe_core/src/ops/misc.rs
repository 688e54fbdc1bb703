use relframe_error::{RelError, Result};

use crate::arrays::field::{Field, Schema};
use crate::relation::Relation;

/// Rename columns given `(old, new)` pairs.
pub fn rename(relation: &Relation, renames: &[(&str, &str)]) -> Result<Relation> {
    let mut fields: Vec<Field> = relation.schema().fields().to_vec();
    for (old, new) in renames {
        let idx = relation.schema().try_index_of(old)?;
        fields[idx].name = new.to_string();
    }
    // Duplicate names are rejected here.
    let schema = Schema::try_new(fields)?;
    Relation::try_from_parts(schema, relation.columns().to_vec(), relation.num_rows())
}

/// Keep the first `n` rows.
pub fn slice_head(relation: &Relation, n: usize) -> Result<Relation> {
    slice_rows(relation, 0, n.min(relation.num_rows()))
}

/// Keep `count` rows starting at `offset`.
pub fn slice_rows(relation: &Relation, offset: usize, count: usize) -> Result<Relation> {
    if offset.saturating_add(count) > relation.num_rows() {
        return Err(RelError::invalid_argument("Row range out of bounds")
            .with_field("offset", offset)
            .with_field("count", count)
            .with_field("num_rows", relation.num_rows()));
    }
    let columns = relation
        .columns()
        .iter()
        .map(|c| c.slice(offset, count))
        .collect::<Result<Vec<_>>>()?;
    Relation::try_from_parts(relation.schema().clone(), columns, count)
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;
    use crate::arrays::array::Array;

    fn rel() -> Relation {
        Relation::try_new([
            ("tailnum", Array::from_iter(["N14228", "N24211", "N619AA"])),
            ("year", Array::from_iter([1999_i64, 1998, 1990])),
        ])
        .unwrap()
    }

    #[test]
    fn rename_columns() {
        let out = rename(&rel(), &[("tailnum", "tail_num")]).unwrap();
        assert_eq!(vec!["tail_num", "year"], out.column_names().collect::<Vec<_>>());
        assert_eq!(rel().columns(), out.columns());
    }

    #[test]
    fn rename_errors() {
        let err = rename(&rel(), &[("model", "m")]).unwrap_err();
        assert_eq!(ErrorKind::UnknownColumn, err.kind());

        let err = rename(&rel(), &[("tailnum", "year")]).unwrap_err();
        assert_eq!(ErrorKind::InvalidArgument, err.kind());
    }

    #[test]
    fn head_and_rows() {
        let rel = rel();
        assert_eq!(2, slice_head(&rel, 2).unwrap().num_rows());
        assert_eq!(3, slice_head(&rel, 10).unwrap().num_rows());

        let out = slice_rows(&rel, 1, 2).unwrap();
        assert_eq!(&Array::from_iter([1998_i64, 1990]), out.column("year").unwrap());

        let err = slice_rows(&rel, 2, 2).unwrap_err();
        assert_eq!(ErrorKind::InvalidArgument, err.kind());
    }
}
