use relframe_error::{RelError, Result};

use crate::arrays::array::Array;
use crate::arrays::bitmap::Bitmap;
use crate::arrays::selection::SelectionVector;

/// Collapse a boolean predicate result into a selection bitmap.
///
/// Missing values are treated as false.
pub fn selection_from_predicate(predicate: &Array) -> Result<Bitmap> {
    let iter = predicate.iter_bool().map_err(|_| {
        RelError::type_mismatch("Filter predicate must evaluate to a boolean")
            .with_field("datatype", predicate.datatype())
    })?;
    Ok(iter.map(|v| v.unwrap_or(false)).collect())
}

/// Filter an array, keeping rows where `selection` is true.
pub fn filter(arr: &Array, selection: &Bitmap) -> Result<Array> {
    if arr.len() != selection.len() {
        return Err(RelError::new(format!(
            "Selection length doesn't equal array length, got {}, want {}",
            selection.len(),
            arr.len()
        )));
    }
    arr.take(&SelectionVector::from_bitmap(selection))
}
