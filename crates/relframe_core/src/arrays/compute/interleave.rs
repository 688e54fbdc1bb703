use relframe_error::{RelError, Result};

use crate::arrays::array::{Array, ArrayBuilder};

/// Interleave multiple arrays into a single array.
///
/// The provided indices should be (array, row) pairs which are used to build
/// the final array. (array, row) pairs may be provided more than once.
///
/// Errors if no arrays are provided, or if not all arrays are of the same type.
pub fn interleave(arrays: &[&Array], indices: &[(usize, usize)]) -> Result<Array> {
    let datatype = match arrays.first() {
        Some(arr) => arr.datatype(),
        None => return Err(RelError::new("Cannot interleave zero arrays")),
    };
    if let Some(other) = arrays.iter().find(|arr| arr.datatype() != datatype) {
        return Err(RelError::type_mismatch(format!(
            "Cannot interleave arrays of different types, {datatype} and {}",
            other.datatype()
        )));
    }

    let mut builder = ArrayBuilder::with_capacity(datatype, indices.len());
    for &(arr_idx, row_idx) in indices {
        let arr = arrays.get(arr_idx).ok_or_else(|| {
            RelError::new("Interleave array index out of bounds").with_field("idx", arr_idx)
        })?;
        builder.push_value(&arr.logical_value(row_idx)?)?;
    }

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleave_i64() {
        let arr1 = Array::from_iter([4_i64, 5, 6]);
        let arr2 = Array::from_iter([Some(7_i64), None]);

        let out = interleave(&[&arr1, &arr2], &[(0, 1), (1, 0), (1, 1), (0, 0)]).unwrap();
        assert_eq!(Array::from_iter([Some(5_i64), Some(7), None, Some(4)]), out);
    }

    #[test]
    fn interleave_mismatched_types() {
        let arr1 = Array::from_iter([4_i64]);
        let arr2 = Array::from_iter(["a"]);
        interleave(&[&arr1, &arr2], &[(0, 0)]).unwrap_err();
    }

    #[test]
    fn interleave_out_of_bounds() {
        let arr1 = Array::from_iter([4_i64]);
        interleave(&[&arr1], &[(0, 1)]).unwrap_err();
        interleave(&[&arr1], &[(1, 0)]).unwrap_err();
    }
}
