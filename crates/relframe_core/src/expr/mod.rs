//! Row-wise expressions used by filter and mutate.
pub mod datetime;
pub mod eval;

use std::fmt;

use relframe_error::{RelError, Result};

pub use self::datetime::DatePart;
use crate::arrays::array::Array;
use crate::arrays::compute::cmp::{CmpOp, comparable};
use crate::arrays::datatype::{DataType, TimestampTypeMeta};
use crate::arrays::field::Schema;
use crate::arrays::scalar::ScalarValue;
use crate::relation::Relation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    /// Always produces a float.
    Div,
    Rem,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
            Self::Rem => write!(f, "%"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringOp {
    StartsWith,
    EndsWith,
    Contains,
}

impl fmt::Display for StringOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartsWith => write!(f, "starts_with"),
            Self::EndsWith => write!(f, "ends_with"),
            Self::Contains => write!(f, "contains"),
        }
    }
}

/// A scalar expression evaluated against every row of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference a column by name.
    Column(String),
    /// A constant value. A missing literal takes on the type required by its
    /// context.
    Literal(ScalarValue),
    Comparison {
        op: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Kleene AND/OR over one or more boolean expressions.
    Conjunction {
        op: ConjunctionOp,
        exprs: Vec<Expr>,
    },
    Not(Box<Expr>),
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
    IsMissing {
        expr: Box<Expr>,
        negated: bool,
    },
    /// Membership test. Never produces a missing value, a missing input is
    /// only a member if the list contains a missing value.
    InList {
        expr: Box<Expr>,
        list: Vec<ScalarValue>,
        negated: bool,
    },
    StringPredicate {
        op: StringOp,
        expr: Box<Expr>,
        pattern: String,
    },
    /// Pick `then` where the condition is true, `otherwise` where it's false,
    /// and missing where the condition is missing.
    IfElse {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// First non-missing value.
    Coalesce(Vec<Expr>),
    Cast {
        expr: Box<Expr>,
        to: DataType,
    },
    DatePart {
        part: DatePart,
        expr: Box<Expr>,
    },
    /// Build a UTC timestamp from integer fields.
    MakeTimestamp {
        year: Box<Expr>,
        month: Box<Expr>,
        day: Box<Expr>,
        hour: Box<Expr>,
        minute: Box<Expr>,
    },
}

/// Reference a column.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A literal value.
pub fn lit(value: impl Into<ScalarValue>) -> Expr {
    Expr::Literal(value.into())
}

/// The missing literal.
pub fn missing() -> Expr {
    Expr::Literal(ScalarValue::Null)
}

pub fn if_else(condition: Expr, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Expr {
    Expr::IfElse {
        condition: Box::new(condition),
        then: Box::new(then.into()),
        otherwise: Box::new(otherwise.into()),
    }
}

pub fn coalesce(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Coalesce(exprs.into_iter().collect())
}

/// AND all expressions together.
pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Conjunction {
        op: ConjunctionOp::And,
        exprs: exprs.into_iter().collect(),
    }
}

/// OR all expressions together.
pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Conjunction {
        op: ConjunctionOp::Or,
        exprs: exprs.into_iter().collect(),
    }
}

pub fn make_timestamp(
    year: impl Into<Expr>,
    month: impl Into<Expr>,
    day: impl Into<Expr>,
    hour: impl Into<Expr>,
    minute: impl Into<Expr>,
) -> Expr {
    Expr::MakeTimestamp {
        year: Box::new(year.into()),
        month: Box::new(month.into()),
        day: Box::new(day.into()),
        hour: Box::new(hour.into()),
        minute: Box::new(minute.into()),
    }
}

impl Expr {
    fn comparison(self, op: CmpOp, other: impl Into<Expr>) -> Expr {
        Expr::Comparison {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::Eq, other)
    }

    pub fn not_eq(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::NotEq, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::Lt, other)
    }

    pub fn lt_eq(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::LtEq, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::Gt, other)
    }

    pub fn gt_eq(self, other: impl Into<Expr>) -> Expr {
        self.comparison(CmpOp::GtEq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        and_all([self, other])
    }

    pub fn or(self, other: Expr) -> Expr {
        or_all([self, other])
    }

    /// Inclusive range check, `low <= self <= high`.
    pub fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        self.clone().gt_eq(low).and(self.lt_eq(high))
    }

    pub fn is_missing(self) -> Expr {
        Expr::IsMissing {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_missing(self) -> Expr {
        Expr::IsMissing {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn in_list<V: Into<ScalarValue>>(self, list: impl IntoIterator<Item = V>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list: list.into_iter().map(|v| v.into()).collect(),
            negated: false,
        }
    }

    pub fn not_in_list<V: Into<ScalarValue>>(self, list: impl IntoIterator<Item = V>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list: list.into_iter().map(|v| v.into()).collect(),
            negated: true,
        }
    }

    fn string_predicate(self, op: StringOp, pattern: impl Into<String>) -> Expr {
        Expr::StringPredicate {
            op,
            expr: Box::new(self),
            pattern: pattern.into(),
        }
    }

    pub fn starts_with(self, pattern: impl Into<String>) -> Expr {
        self.string_predicate(StringOp::StartsWith, pattern)
    }

    pub fn ends_with(self, pattern: impl Into<String>) -> Expr {
        self.string_predicate(StringOp::EndsWith, pattern)
    }

    pub fn contains(self, pattern: impl Into<String>) -> Expr {
        self.string_predicate(StringOp::Contains, pattern)
    }

    pub fn cast(self, to: DataType) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            to,
        }
    }

    pub fn date_part(self, part: DatePart) -> Expr {
        Expr::DatePart {
            part,
            expr: Box::new(self),
        }
    }

    pub fn year(self) -> Expr {
        self.date_part(DatePart::Year)
    }

    pub fn month(self) -> Expr {
        self.date_part(DatePart::Month)
    }

    pub fn day(self) -> Expr {
        self.date_part(DatePart::Day)
    }

    pub fn hour(self) -> Expr {
        self.date_part(DatePart::Hour)
    }

    pub fn minute(self) -> Expr {
        self.date_part(DatePart::Minute)
    }

    pub fn weekday(self) -> Expr {
        self.date_part(DatePart::Weekday)
    }

    /// Compute the output type of this expression for an input with the
    /// given schema.
    ///
    /// Returns None for expressions that are always missing and carry no type
    /// of their own, e.g. a missing literal.
    pub fn output_type(&self, schema: &Schema) -> Result<Option<DataType>> {
        Ok(match self {
            Self::Column(name) => Some(schema.field(name)?.datatype.clone()),
            Self::Literal(scalar) => scalar_type(scalar),
            Self::Comparison { op, left, right } => {
                let left = left.output_type(schema)?;
                let right = right.output_type(schema)?;
                if let (Some(l), Some(r)) = (&left, &right) {
                    if !comparable(l, r) {
                        return Err(RelError::type_mismatch(format!(
                            "Cannot compare {l} with {r} using '{op}'"
                        )));
                    }
                }
                Some(DataType::Boolean)
            }
            Self::Conjunction { exprs, .. } => {
                for expr in exprs {
                    expect_type(expr, schema, "boolean", |dt| dt == &DataType::Boolean)?;
                }
                Some(DataType::Boolean)
            }
            Self::Not(expr) => {
                expect_type(expr, schema, "boolean", |dt| dt == &DataType::Boolean)?;
                Some(DataType::Boolean)
            }
            Self::Arith { op, left, right } => {
                let left = expect_type(left, schema, "numeric", DataType::is_numeric)?;
                let right = expect_type(right, schema, "numeric", DataType::is_numeric)?;
                arith_output_type(*op, left.as_ref(), right.as_ref())
            }
            Self::Negate(expr) => expect_type(expr, schema, "numeric", DataType::is_numeric)?,
            Self::IsMissing { expr, .. } => {
                expr.output_type(schema)?;
                Some(DataType::Boolean)
            }
            Self::InList { expr, list, .. } => {
                if let Some(dt) = expr.output_type(schema)? {
                    for item in list {
                        if let Some(item_type) = scalar_type(item) {
                            if !comparable(&dt, &item_type) {
                                return Err(RelError::type_mismatch(format!(
                                    "List value {item} cannot be compared with {dt}"
                                )));
                            }
                        }
                    }
                }
                Some(DataType::Boolean)
            }
            Self::StringPredicate { expr, .. } => {
                expect_type(expr, schema, "string", DataType::is_string_like)?;
                Some(DataType::Boolean)
            }
            Self::IfElse {
                condition,
                then,
                otherwise,
            } => {
                expect_type(condition, schema, "boolean", |dt| dt == &DataType::Boolean)?;
                let then = then.output_type(schema)?;
                let otherwise = otherwise.output_type(schema)?;
                common_type(then, otherwise)?
            }
            Self::Coalesce(exprs) => {
                let mut out = None;
                for expr in exprs {
                    out = common_type(out, expr.output_type(schema)?)?;
                }
                out
            }
            Self::Cast { expr, to } => {
                expr.output_type(schema)?;
                Some(to.clone())
            }
            Self::DatePart { expr, .. } => {
                expect_type(expr, schema, "timestamp", |dt| {
                    matches!(dt, DataType::Timestamp(_))
                })?;
                Some(DataType::Int64)
            }
            Self::MakeTimestamp {
                year,
                month,
                day,
                hour,
                minute,
            } => {
                for expr in [year, month, day, hour, minute] {
                    expect_type(expr, schema, "integer", |dt| dt == &DataType::Int64)?;
                }
                Some(DataType::Timestamp(TimestampTypeMeta::utc()))
            }
        })
    }

    /// Evaluate this expression against every row of the relation.
    ///
    /// The expression is type checked against the relation's schema first.
    pub fn evaluate(&self, relation: &Relation) -> Result<Array> {
        let datatype = self.output_type(relation.schema())?;
        eval::evaluate(self, relation, datatype.as_ref())
    }
}

/// Data type of a literal. Categorical labels are plain strings outside of a
/// column.
pub(crate) fn scalar_type(scalar: &ScalarValue) -> Option<DataType> {
    match scalar {
        ScalarValue::Null => None,
        ScalarValue::Boolean(_) => Some(DataType::Boolean),
        ScalarValue::Int64(_) => Some(DataType::Int64),
        ScalarValue::Float64(_) => Some(DataType::Float64),
        ScalarValue::Utf8(_) | ScalarValue::Categorical(_) => Some(DataType::Utf8),
        ScalarValue::Timestamp(ts) => Some(DataType::Timestamp(TimestampTypeMeta::new(ts.offset))),
    }
}

fn expect_type(
    expr: &Expr,
    schema: &Schema,
    want: &str,
    check: impl Fn(&DataType) -> bool,
) -> Result<Option<DataType>> {
    let datatype = expr.output_type(schema)?;
    match &datatype {
        Some(dt) if !check(dt) => Err(RelError::type_mismatch(format!(
            "Expected {want} expression, got {dt}"
        ))
        .with_field("expression", expr)),
        _ => Ok(datatype),
    }
}

pub(crate) fn arith_output_type(
    op: ArithOp,
    left: Option<&DataType>,
    right: Option<&DataType>,
) -> Option<DataType> {
    match (op, left, right) {
        (ArithOp::Div, _, _) => Some(DataType::Float64),
        (_, None, None) => None,
        (_, Some(DataType::Int64) | None, Some(DataType::Int64) | None) => Some(DataType::Int64),
        _ => Some(DataType::Float64),
    }
}

/// Find a type that values of both types can be stored as.
pub(crate) fn common_type(a: Option<DataType>, b: Option<DataType>) -> Result<Option<DataType>> {
    Ok(match (a, b) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Some(DataType::Float64),
        (Some(a), Some(b)) if a.is_string_like() && b.is_string_like() => Some(DataType::Utf8),
        (Some(DataType::Timestamp(a)), Some(DataType::Timestamp(_))) => {
            Some(DataType::Timestamp(a))
        }
        (Some(a), Some(b)) => {
            return Err(RelError::type_mismatch(format!(
                "No common type for {a} and {b}"
            )));
        }
    })
}

impl From<ScalarValue> for Expr {
    fn from(value: ScalarValue) -> Self {
        Expr::Literal(value)
    }
}

macro_rules! impl_from_literal {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::Literal(value.into())
                }
            }
        )*
    };
}

impl_from_literal!(bool, i64, i32, f64, &str, String);

macro_rules! impl_arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Expr>> std::ops::$trait<T> for Expr {
            type Output = Expr;
            fn $method(self, rhs: T) -> Expr {
                Expr::Arith {
                    op: $op,
                    left: Box::new(self),
                    right: Box::new(rhs.into()),
                }
            }
        }
    };
}

impl_arith_op!(Add, add, ArithOp::Add);
impl_arith_op!(Sub, sub, ArithOp::Sub);
impl_arith_op!(Mul, mul, ArithOp::Mul);
impl_arith_op!(Div, div, ArithOp::Div);
impl_arith_op!(Rem, rem, ArithOp::Rem);

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Negate(Box::new(self))
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(name) => write!(f, "{name}"),
            Self::Literal(ScalarValue::Utf8(s) | ScalarValue::Categorical(s)) => {
                write!(f, "'{s}'")
            }
            Self::Literal(scalar) => write!(f, "{scalar}"),
            Self::Comparison { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Conjunction { op, exprs } => {
                let sep = match op {
                    ConjunctionOp::And => " AND ",
                    ConjunctionOp::Or => " OR ",
                };
                write!(f, "(")?;
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            Self::Not(expr) => write!(f, "NOT {expr}"),
            Self::Arith { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Negate(expr) => write!(f, "-{expr}"),
            Self::IsMissing { expr, negated } => {
                if *negated {
                    write!(f, "is_not_missing({expr})")
                } else {
                    write!(f, "is_missing({expr})")
                }
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{expr} ")?;
                if *negated {
                    write!(f, "NOT ")?;
                }
                write!(f, "IN (")?;
                write_list(f, list)?;
                write!(f, ")")
            }
            Self::StringPredicate { op, expr, pattern } => write!(f, "{op}({expr}, '{pattern}')"),
            Self::IfElse {
                condition,
                then,
                otherwise,
            } => write!(f, "if_else({condition}, {then}, {otherwise})"),
            Self::Coalesce(exprs) => {
                write!(f, "coalesce(")?;
                write_list(f, exprs)?;
                write!(f, ")")
            }
            Self::Cast { expr, to } => write!(f, "cast({expr} AS {to})"),
            Self::DatePart { part, expr } => write!(f, "{part}({expr})"),
            Self::MakeTimestamp {
                year,
                month,
                day,
                hour,
                minute,
            } => write!(f, "make_timestamp({year}, {month}, {day}, {hour}, {minute})"),
        }
    }
}
