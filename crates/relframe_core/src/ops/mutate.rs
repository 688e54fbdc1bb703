use relframe_error::{RelError, Result};
use tracing::trace;

use crate::arrays::compute::cast::{can_implicit_cast, cast_array};
use crate::arrays::datatype::DataType;
use crate::arrays::field::{Field, Schema};
use crate::expr::Expr;
use crate::expr::eval::evaluate;
use crate::relation::Relation;

/// A single `name = expr` column assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub expr: Expr,
    /// Type the computed column must be stored as.
    pub target: Option<DataType>,
}

impl Assignment {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Assignment {
            name: name.into(),
            expr,
            target: None,
        }
    }

    pub fn with_target(mut self, target: DataType) -> Self {
        self.target = Some(target);
        self
    }
}

/// Add or replace columns.
///
/// Assignments are applied left to right, so an assignment can reference
/// columns produced by earlier ones. A replaced column keeps its position,
/// new columns are appended.
pub fn mutate(relation: &Relation, assignments: &[Assignment]) -> Result<Relation> {
    let mut current = relation.clone();
    for assignment in assignments {
        current = apply_assignment(&current, assignment)?;
    }
    Ok(current)
}

fn apply_assignment(relation: &Relation, assignment: &Assignment) -> Result<Relation> {
    let computed_type = assignment.expr.output_type(relation.schema())?;

    let out_type = match (&computed_type, &assignment.target) {
        (Some(computed), Some(target)) => {
            if !can_implicit_cast(computed, target) {
                return Err(RelError::type_mismatch(format!(
                    "Cannot store {computed} in column '{}' of type {target}",
                    assignment.name
                ))
                .with_field("expression", &assignment.expr));
            }
            target.clone()
        }
        (Some(computed), None) => computed.clone(),
        (None, Some(target)) => target.clone(),
        (None, None) => DataType::Boolean,
    };

    let arr = evaluate(&assignment.expr, relation, Some(&out_type))?;
    let arr = cast_array(&arr, &out_type)?;

    trace!(column = %assignment.name, datatype = %out_type, "mutate");

    let mut fields = relation.schema().fields().to_vec();
    let mut columns = relation.columns().to_vec();
    let field = Field::new(assignment.name.clone(), out_type);
    match relation.schema().index_of(&assignment.name) {
        Some(idx) => {
            fields[idx] = field;
            columns[idx] = arr;
        }
        None => {
            fields.push(field);
            columns.push(arr);
        }
    }

    Relation::try_from_parts(Schema::try_new(fields)?, columns, relation.num_rows())
}

#[cfg(test)]
mod tests {
    use relframe_error::ErrorKind;

    use super::*;
    use crate::arrays::array::Array;
    use crate::expr::{col, lit, missing};

    fn flights() -> Relation {
        Relation::try_new([
            ("dep_delay", Array::from_iter([Some(2_i64), Some(4), None])),
            ("arr_delay", Array::from_iter([Some(11_i64), Some(20), Some(5)])),
            ("air_time", Array::from_iter([227_i64, 227, 160])),
            ("carrier", Array::from_iter(["UA", "AA", "UA"])),
        ])
        .unwrap()
    }

    #[test]
    fn sequential_assignments() {
        let rel = flights();
        let out = mutate(
            &rel,
            &[
                Assignment::new("gain", col("dep_delay") - col("arr_delay")),
                Assignment::new("gain_per_hour", col("gain") / (col("air_time") / lit(60_i64))),
            ],
        )
        .unwrap();

        assert_eq!(
            vec!["dep_delay", "arr_delay", "air_time", "carrier", "gain", "gain_per_hour"],
            out.column_names().collect::<Vec<_>>()
        );
        assert_eq!(
            &Array::from_iter([Some(-9_i64), Some(-16), None]),
            out.column("gain").unwrap()
        );
        assert_eq!(&DataType::Float64, out.column("gain_per_hour").unwrap().datatype());
        // Input untouched.
        assert_eq!(4, rel.num_columns());
    }

    #[test]
    fn replace_keeps_position() {
        let rel = flights();
        let out = mutate(
            &rel,
            &[Assignment::new("dep_delay", col("dep_delay") * lit(60_i64))],
        )
        .unwrap();
        assert_eq!(
            vec!["dep_delay", "arr_delay", "air_time", "carrier"],
            out.column_names().collect::<Vec<_>>()
        );
        assert_eq!(
            &Array::from_iter([Some(120_i64), Some(240), None]),
            out.column("dep_delay").unwrap()
        );
    }

    #[test]
    fn implicit_cast_to_target() {
        let rel = flights();
        let carriers = DataType::categorical(["AA", "UA"]).unwrap();
        let out = mutate(
            &rel,
            &[
                Assignment::new("air_time", col("air_time")).with_target(DataType::Float64),
                Assignment::new("carrier", col("carrier")).with_target(carriers.clone()),
            ],
        )
        .unwrap();
        assert_eq!(&DataType::Float64, out.column("air_time").unwrap().datatype());
        assert_eq!(&carriers, out.column("carrier").unwrap().datatype());
    }

    #[test]
    fn target_type_mismatch() {
        let rel = flights();
        let err = mutate(
            &rel,
            &[Assignment::new("carrier", col("carrier")).with_target(DataType::Int64)],
        )
        .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn label_outside_categorical() {
        let rel = flights();
        let carriers = DataType::categorical(["UA"]).unwrap();
        let err = mutate(
            &rel,
            &[Assignment::new("carrier", col("carrier")).with_target(carriers)],
        )
        .unwrap_err();
        assert_eq!(ErrorKind::TypeMismatch, err.kind());
    }

    #[test]
    fn missing_with_target() {
        let rel = flights();
        let out = mutate(
            &rel,
            &[Assignment::new("note", missing()).with_target(DataType::Utf8)],
        )
        .unwrap();
        assert_eq!(&Array::new_null(&DataType::Utf8, 3), out.column("note").unwrap());
    }

    #[test]
    fn unknown_column_in_expr() {
        let rel = flights();
        let err = mutate(&rel, &[Assignment::new("x", col("distance"))]).unwrap_err();
        assert_eq!(ErrorKind::UnknownColumn, err.kind());
    }
}
