use relframe_error::{RelError, Result};

use super::datetime::{extract_date_part, make_timestamps};
use super::{ArithOp, ConjunctionOp, Expr, StringOp, arith_output_type, common_type, scalar_type};
use crate::arrays::array::{Array, ArrayBuilder};
use crate::arrays::compute::cast::cast_array;
use crate::arrays::compute::cmp::{CmpOp, compare};
use crate::arrays::datatype::DataType;
use crate::relation::Relation;

/// Evaluate an expression that has already been type checked.
///
/// `hint` is the type to use for untyped missing literals. If there's no
/// hint, a missing literal evaluates to a boolean array.
pub(crate) fn evaluate(expr: &Expr, relation: &Relation, hint: Option<&DataType>) -> Result<Array> {
    let num_rows = relation.num_rows();
    let schema = relation.schema();

    match expr {
        Expr::Column(name) => Ok(relation.column(name)?.clone()),
        Expr::Literal(scalar) => {
            let datatype = scalar_type(scalar)
                .or_else(|| hint.cloned())
                .unwrap_or(DataType::Boolean);
            Array::new_repeated(&datatype, scalar, num_rows)
        }
        Expr::Comparison { op, left, right } => {
            let left_type = left.output_type(schema)?;
            let right_type = right.output_type(schema)?;
            let left = evaluate(left, relation, right_type.as_ref())?;
            let right = evaluate(right, relation, left_type.as_ref())?;
            if left_type.is_none() && right_type.is_none() {
                return Ok(Array::new_null(&DataType::Boolean, num_rows));
            }
            compare(*op, &left, &right)
        }
        Expr::Conjunction { op, exprs } => {
            let inputs = exprs
                .iter()
                .map(|e| evaluate(e, relation, Some(&DataType::Boolean)))
                .collect::<Result<Vec<_>>>()?;
            kleene(*op, &inputs, num_rows)
        }
        Expr::Not(expr) => {
            let input = evaluate(expr, relation, Some(&DataType::Boolean))?;
            Ok(input.iter_bool()?.map(|v| v.map(|b| !b)).collect())
        }
        Expr::Arith { op, left, right } => {
            let left_type = left.output_type(schema)?;
            let right_type = right.output_type(schema)?;
            let out_type = arith_output_type(*op, left_type.as_ref(), right_type.as_ref())
                .unwrap_or(DataType::Int64);
            let left = evaluate(left, relation, Some(&out_type))?;
            let right = evaluate(right, relation, Some(&out_type))?;
            arith(*op, &out_type, &left, &right)
        }
        Expr::Negate(expr) => {
            let input = evaluate(expr, relation, Some(&DataType::Int64))?;
            match input.datatype() {
                DataType::Int64 => Ok(input
                    .iter_i64()?
                    .map(|v| v.and_then(i64::checked_neg))
                    .collect()),
                _ => Ok(input.iter_f64()?.map(|v| v.map(|f| -f)).collect()),
            }
        }
        Expr::IsMissing { expr, negated } => {
            let input = evaluate(expr, relation, hint_for_any())?;
            Ok((0..input.len())
                .map(|idx| input.is_valid(idx) == *negated)
                .collect())
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let input = evaluate(expr, relation, hint_for_any())?;
            let mut found = vec![false; input.len()];
            for item in list {
                match scalar_type(item) {
                    Some(item_type) => {
                        let item = Array::new_repeated(&item_type, item, input.len())?;
                        let eq = compare(CmpOp::Eq, &input, &item)?;
                        for (found, eq) in found.iter_mut().zip(eq.iter_bool()?) {
                            *found |= eq.unwrap_or(false);
                        }
                    }
                    None => {
                        for (idx, found) in found.iter_mut().enumerate() {
                            *found |= !input.is_valid(idx);
                        }
                    }
                }
            }
            Ok(found.into_iter().map(|f| f != *negated).collect())
        }
        Expr::StringPredicate { op, expr, pattern } => {
            let input = evaluate(expr, relation, Some(&DataType::Utf8))?;
            let pattern = pattern.as_str();
            let out = input.iter_str()?.map(|v| {
                v.map(|s| match op {
                    StringOp::StartsWith => s.starts_with(pattern),
                    StringOp::EndsWith => s.ends_with(pattern),
                    StringOp::Contains => s.contains(pattern),
                })
            });
            Ok(out.collect())
        }
        Expr::IfElse {
            condition,
            then,
            otherwise,
        } => {
            let out_type = common_type(then.output_type(schema)?, otherwise.output_type(schema)?)?
                .or_else(|| hint.cloned())
                .unwrap_or(DataType::Boolean);
            let condition = evaluate(condition, relation, Some(&DataType::Boolean))?;
            let then = cast_array(&evaluate(then, relation, Some(&out_type))?, &out_type)?;
            let otherwise = cast_array(&evaluate(otherwise, relation, Some(&out_type))?, &out_type)?;

            let mut builder = ArrayBuilder::with_capacity(&out_type, num_rows);
            for (idx, cond) in condition.iter_bool()?.enumerate() {
                match cond {
                    Some(true) => builder.push_value(&then.logical_value(idx)?)?,
                    Some(false) => builder.push_value(&otherwise.logical_value(idx)?)?,
                    None => builder.push_null(),
                }
            }
            Ok(builder.finish())
        }
        Expr::Coalesce(exprs) => {
            let mut out_type = None;
            for expr in exprs {
                out_type = common_type(out_type, expr.output_type(schema)?)?;
            }
            let out_type = out_type
                .or_else(|| hint.cloned())
                .unwrap_or(DataType::Boolean);
            let inputs = exprs
                .iter()
                .map(|e| cast_array(&evaluate(e, relation, Some(&out_type))?, &out_type))
                .collect::<Result<Vec<_>>>()?;

            let mut builder = ArrayBuilder::with_capacity(&out_type, num_rows);
            for idx in 0..num_rows {
                match inputs.iter().find(|arr| arr.is_valid(idx)) {
                    Some(arr) => builder.push_value(&arr.logical_value(idx)?)?,
                    None => builder.push_null(),
                }
            }
            Ok(builder.finish())
        }
        Expr::Cast { expr, to } => {
            let input = evaluate(expr, relation, Some(to))?;
            cast_array(&input, to)
        }
        Expr::DatePart { part, expr } => {
            let input = evaluate(expr, relation, Some(&DataType::timestamp_utc()))?;
            extract_date_part(*part, &input)
        }
        Expr::MakeTimestamp {
            year,
            month,
            day,
            hour,
            minute,
        } => {
            let int = Some(&DataType::Int64);
            make_timestamps(
                &evaluate(year, relation, int)?,
                &evaluate(month, relation, int)?,
                &evaluate(day, relation, int)?,
                &evaluate(hour, relation, int)?,
                &evaluate(minute, relation, int)?,
            )
        }
    }
}

/// Hint for contexts that accept any type.
fn hint_for_any() -> Option<&'static DataType> {
    Some(&DataType::Boolean)
}

/// Three-valued AND/OR.
///
/// AND is false if any input is false, otherwise missing if any input is
/// missing. OR is true if any input is true, otherwise missing if any input
/// is missing.
fn kleene(op: ConjunctionOp, inputs: &[Array], num_rows: usize) -> Result<Array> {
    let (dominant, identity) = match op {
        ConjunctionOp::And => (false, true),
        ConjunctionOp::Or => (true, false),
    };

    let mut out: Vec<Option<bool>> = vec![Some(identity); num_rows];
    for input in inputs {
        for (acc, v) in out.iter_mut().zip(input.iter_bool()?) {
            *acc = match (*acc, v) {
                (Some(a), _) if a == dominant => Some(dominant),
                (_, Some(b)) if b == dominant => Some(dominant),
                (Some(_), Some(b)) => Some(b),
                _ => None,
            };
        }
    }
    Ok(out.into_iter().collect())
}

fn arith(op: ArithOp, out_type: &DataType, left: &Array, right: &Array) -> Result<Array> {
    if left.len() != right.len() {
        return Err(RelError::row_count_mismatch(left.len(), right.len()));
    }

    match out_type {
        DataType::Int64 => {
            let f: fn(i64, i64) -> Option<i64> = match op {
                ArithOp::Add => i64::checked_add,
                ArithOp::Sub => i64::checked_sub,
                ArithOp::Mul => i64::checked_mul,
                ArithOp::Rem => i64::checked_rem,
                ArithOp::Div => {
                    return Err(RelError::new("Integer division should produce a float"));
                }
            };
            Ok(left
                .iter_i64()?
                .zip(right.iter_i64()?)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => None,
                })
                .collect())
        }
        DataType::Float64 => {
            let f: fn(f64, f64) -> Option<f64> = match op {
                ArithOp::Add => |a, b| Some(a + b),
                ArithOp::Sub => |a, b| Some(a - b),
                ArithOp::Mul => |a, b| Some(a * b),
                ArithOp::Div => |a, b| Some(a / b),
                ArithOp::Rem => |a, b| if b == 0.0 { None } else { Some(a % b) },
            };
            Ok(left
                .iter_f64()?
                .zip(right.iter_f64()?)
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => None,
                })
                .collect())
        }
        other => Err(RelError::type_mismatch(format!(
            "Arithmetic '{op}' not supported for {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::{coalesce, col, if_else, lit, missing};

    fn relation() -> Relation {
        Relation::try_new([
            ("a", Array::from_iter([Some(1_i64), Some(2), None, Some(i64::MAX)])),
            ("b", Array::from_iter([Some(0.5), None, Some(2.0), Some(1.0)])),
            ("s", Array::from_iter([Some("JFK"), Some("LGA"), None, Some("EWR")])),
            ("t", Array::from_iter([Some(true), Some(false), None, None])),
        ])
        .unwrap()
    }

    #[test]
    fn int_arith_overflow_is_missing() {
        let rel = relation();
        let out = (col("a") + lit(1_i64)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(2_i64), Some(3), None, None]), out);
    }

    #[test]
    fn rem_by_zero_is_missing() {
        let rel = relation();
        let out = (col("a") % lit(0_i64)).evaluate(&rel).unwrap();
        assert_eq!(Array::new_null(&DataType::Int64, 4), out);
    }

    #[test]
    fn division_is_float() {
        let rel = relation();
        let out = (col("a") / lit(2_i64)).evaluate(&rel).unwrap();
        assert_eq!(
            Array::from_iter([Some(0.5), Some(1.0), None, Some(i64::MAX as f64 / 2.0)]),
            out
        );
    }

    #[test]
    fn mixed_arith_promotes() {
        let rel = relation();
        let out = (col("a") * col("b")).evaluate(&rel).unwrap();
        assert_eq!(
            Array::from_iter([Some(0.5), None, None, Some(i64::MAX as f64)]),
            out
        );
    }

    #[test]
    fn kleene_logic() {
        let rel = relation();
        // t: [true, false, NA, NA]
        let and = col("t").and(lit(false)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([false, false, false, false]), and);

        let and = col("t").and(lit(true)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(true), Some(false), None, None]), and);

        let or = col("t").or(lit(true)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([true, true, true, true]), or);

        let or = col("t").or(missing()).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(true), None, None, None]), or);

        let not = (!col("t")).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(false), Some(true), None, None]), not);
    }

    #[test]
    fn in_list() {
        let rel = relation();
        let out = col("s").in_list(["JFK", "EWR"]).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([true, false, false, true]), out);

        let out = col("s")
            .in_list([ScalarValue::from("LGA"), ScalarValue::Null])
            .evaluate(&rel)
            .unwrap();
        assert_eq!(Array::from_iter([false, true, true, false]), out);

        let out = col("a").not_in_list([1_i64]).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([false, true, true, true]), out);
    }

    #[test]
    fn between() {
        let rel = relation();
        let out = col("a").between(lit(2_i64), lit(10_i64)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(false), Some(true), None, Some(false)]), out);
    }

    #[test]
    fn string_predicates() {
        let rel = relation();
        let out = col("s").starts_with("J").evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(true), Some(false), None, Some(false)]), out);
        let out = col("s").contains("G").evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(false), Some(true), None, Some(false)]), out);
    }

    #[test]
    fn if_else_missing_condition() {
        let rel = relation();
        let out = if_else(col("t"), col("a"), lit(-1_i64)).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(1_i64), Some(-1), None, None]), out);
    }

    #[test]
    fn if_else_with_missing_branch() {
        let rel = relation();
        let out = if_else(col("t"), missing(), col("s")).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([None, Some("LGA"), None, None]), out);
    }

    #[test]
    fn coalesce_promotes() {
        let rel = relation();
        let out = coalesce([col("b"), col("a"), lit(0_i64)]).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([0.5, 2.0, 2.0, 1.0]), out);
    }

    #[test]
    fn is_missing() {
        let rel = relation();
        let out = col("b").is_missing().evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([false, true, false, false]), out);
        let out = col("b").is_not_missing().evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([true, false, true, true]), out);
    }

    #[test]
    fn compare_with_missing_literal() {
        let rel = relation();
        let out = col("a").eq(missing()).evaluate(&rel).unwrap();
        assert_eq!(Array::new_null(&DataType::Boolean, 4), out);
    }

    #[test]
    fn negate() {
        let rel = relation();
        let out = (-col("a")).evaluate(&rel).unwrap();
        assert_eq!(Array::from_iter([Some(-1_i64), Some(-2), None, Some(-i64::MAX)]), out);
    }
}
