//! Test utilities.
//!
//! Note this isn't behind a `#[cfg(test)]` flag since this should be usable
//! outside of this crate.
//!
//! Should not be used outside of tests.

use crate::arrays::array::Array;
use crate::format::FormatOptions;
use crate::format::pretty::pretty_format;
use crate::relation::Relation;

/// Asserts that two arrays are logically equal.
pub fn assert_arrays_eq(a: &Array, b: &Array) {
    assert_eq!(a.datatype(), b.datatype(), "data types differ");
    assert_eq!(a.len(), b.len(), "lengths differ");

    for row_idx in 0..a.len() {
        let a_val = a.logical_value(row_idx).unwrap();
        let b_val = b.logical_value(row_idx).unwrap();

        assert_eq!(a_val, b_val, "values differ at row {row_idx}");
    }
}

/// Asserts that two relations are logically equal, printing both as tables on
/// failure.
pub fn assert_relations_eq(a: &Relation, b: &Relation) {
    let show = |rel: &Relation| {
        pretty_format(
            rel,
            &FormatOptions {
                max_rows: 50,
                ..Default::default()
            },
        )
    };

    assert_eq!(
        a.schema(),
        b.schema(),
        "schemas differ\nleft:\n{}\nright:\n{}",
        show(a),
        show(b)
    );
    assert_eq!(
        a.num_rows(),
        b.num_rows(),
        "num rows differ\nleft:\n{}\nright:\n{}",
        show(a),
        show(b)
    );

    for (col_idx, (a_col, b_col)) in a.columns().iter().zip(b.columns()).enumerate() {
        for row_idx in 0..a.num_rows() {
            let a_val = a_col.logical_value(row_idx).unwrap();
            let b_val = b_col.logical_value(row_idx).unwrap();
            assert_eq!(
                a_val,
                b_val,
                "values differ at row {row_idx}, column '{}'\nleft:\n{}\nright:\n{}",
                a.schema().fields()[col_idx].name,
                show(a),
                show(b)
            );
        }
    }
}
