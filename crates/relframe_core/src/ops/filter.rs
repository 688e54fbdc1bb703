use relframe_error::{RelError, Result};
use tracing::trace;

use crate::arrays::bitmap::Bitmap;
use crate::arrays::compute::filter::selection_from_predicate;
use crate::arrays::datatype::DataType;
use crate::arrays::selection::SelectionVector;
use crate::expr::Expr;
use crate::expr::eval::evaluate;
use crate::relation::Relation;

/// Keep rows where every predicate is true.
///
/// Missing predicate results count as false. Row order is preserved.
pub fn filter(relation: &Relation, predicates: &[Expr]) -> Result<Relation> {
    // Type check everything before evaluating anything.
    for predicate in predicates {
        match predicate.output_type(relation.schema())? {
            Some(DataType::Boolean) | None => (),
            Some(other) => {
                return Err(
                    RelError::type_mismatch("Filter predicate must evaluate to a boolean")
                        .with_field("predicate", predicate)
                        .with_field("datatype", other),
                );
            }
        }
    }

    let mut selection = Bitmap::new_with_all_true(relation.num_rows());
    for predicate in predicates {
        let result = evaluate(predicate, relation, Some(&DataType::Boolean))?;
        selection.bit_and_mut(&selection_from_predicate(&result)?)?;
    }

    let out = relation.take(&SelectionVector::from_bitmap(&selection))?;
    trace!(
        input_rows = relation.num_rows(),
        output_rows = out.num_rows(),
        "filter"
    );
    Ok(out)
}
