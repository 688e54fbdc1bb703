//! Shared arguments and parsers for command line values.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use relframe_core::arrays::compute::cast::parse::{
    BoolParser,
    Float64Parser,
    Int64Parser,
    Parser,
    TimestampParser,
};
use relframe_core::arrays::datatype::DataType;
use relframe_core::arrays::field::Schema;
use relframe_core::arrays::scalar::{ScalarValue, TimestampScalar};
use relframe_core::expr::{Expr, col, lit};
use relframe_core::ops::aggregate::AggregateExpr;
use relframe_core::ops::join::{JoinKey, JoinType};
use relframe_core::ops::sort::SortKey;
use relframe_csv::CsvReadOptions;
use relframe_error::{RelError, Result};

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// CSV file to read.
    pub file: PathBuf,

    /// The file has no header row. Columns are named X1, X2, ...
    #[clap(long)]
    pub no_header: bool,

    /// Values read as missing. Defaults to empty cells and `NA`.
    #[clap(long = "missing", value_name = "TOKEN")]
    pub missing: Vec<String>,
}

impl InputArgs {
    pub fn read_options(&self) -> CsvReadOptions {
        let options = CsvReadOptions::default().with_header(!self.no_header);
        if self.missing.is_empty() {
            options
        } else {
            options.with_missing_values(self.missing.iter().cloned())
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    /// One JSON object per line.
    Jsonl,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum JoinMode {
    Inner,
    Left,
    Full,
    Semi,
    Anti,
}

impl From<JoinMode> for JoinType {
    fn from(mode: JoinMode) -> Self {
        match mode {
            JoinMode::Inner => JoinType::Inner,
            JoinMode::Left => JoinType::Left,
            JoinMode::Full => JoinType::Full,
            JoinMode::Semi => JoinType::Semi,
            JoinMode::Anti => JoinType::Anti,
        }
    }
}

/// Parse `name=value`.
pub fn parse_setting(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(RelError::invalid_argument(format!(
            "Expected a setting as 'name=value', got '{s}'"
        ))),
    }
}

/// Parse `col` or `col:desc`/`col:asc`.
pub fn parse_sort_key(s: &str) -> Result<SortKey> {
    match s.rsplit_once(':') {
        Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => Ok(SortKey::desc(column)),
        Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => Ok(SortKey::asc(column)),
        Some((_, dir)) => Err(RelError::invalid_argument(format!(
            "Unknown sort direction '{dir}', expected 'asc' or 'desc'"
        ))),
        None => Ok(SortKey::asc(s)),
    }
}

/// Parse `key` or `left=right`.
pub fn parse_join_key(s: &str) -> Result<JoinKey> {
    match s.split_once('=') {
        Some((left, right)) => Ok(JoinKey::new(left.trim(), right.trim())),
        None => Ok(JoinKey::from(s.trim())),
    }
}

/// Parse `fn:col`, `fn:col=alias`, or `n`/`count` for a row count.
///
/// Functions: count, count_distinct, sum, mean, min, max.
pub fn parse_aggregate(s: &str) -> Result<AggregateExpr> {
    let (spec, alias) = match s.split_once('=') {
        Some((spec, alias)) => (spec, Some(alias.trim())),
        None => (s, None),
    };

    let agg = match spec.split_once(':') {
        None if spec == "n" || spec == "count" => AggregateExpr::count(),
        None => {
            return Err(RelError::invalid_argument(format!(
                "Expected an aggregate as 'function:column', got '{s}'"
            )));
        }
        Some((func, column)) => {
            let column = column.trim();
            match func.trim() {
                "count" => AggregateExpr::count_col(column),
                "count_distinct" | "n_distinct" => AggregateExpr::count_distinct(column),
                "sum" => AggregateExpr::sum(column),
                "mean" => AggregateExpr::mean(column),
                "min" => AggregateExpr::min(column),
                "max" => AggregateExpr::max(column),
                other => {
                    return Err(RelError::invalid_argument(format!(
                        "Unknown aggregate function '{other}'"
                    )));
                }
            }
        }
    };

    Ok(match alias {
        Some(alias) => agg.alias(alias),
        None => agg,
    })
}

/// A parsed `column <op> value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: ConditionOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ConditionOp {
    // Two character operators first so `<=` isn't read as `<`.
    const ALL: [(&'static str, ConditionOp); 6] = [
        ("<=", ConditionOp::LtEq),
        (">=", ConditionOp::GtEq),
        ("!=", ConditionOp::NotEq),
        ("=", ConditionOp::Eq),
        ("<", ConditionOp::Lt),
        (">", ConditionOp::Gt),
    ];
}

/// Parse a condition like `dep_delay>=30` or `carrier = UA`.
pub fn parse_condition(s: &str) -> Result<Condition> {
    let found = s
        .char_indices()
        .find_map(|(idx, _)| {
            ConditionOp::ALL
                .iter()
                .find(|(text, _)| s[idx..].starts_with(text))
                .map(|(text, op)| (idx, text.len(), *op))
        })
        .ok_or_else(|| {
            RelError::invalid_argument(format!(
                "Expected a condition like 'column>=value', got '{s}'"
            ))
        })?;

    let (idx, len, op) = found;
    let column = s[..idx].trim();
    if column.is_empty() {
        return Err(RelError::invalid_argument(format!(
            "Missing column name in condition '{s}'"
        )));
    }
    let value = s[idx + len..].trim().trim_matches(|c| c == '\'' || c == '"');

    Ok(Condition {
        column: column.to_string(),
        op,
        value: value.to_string(),
    })
}

impl Condition {
    /// Build a predicate, interpreting the value in the column's type.
    ///
    /// `NA` compares against missing: `col=NA` keeps missing values and
    /// `col!=NA` keeps present ones.
    pub fn to_expr(&self, schema: &Schema) -> Result<Expr> {
        let field = schema.field(&self.column)?;

        if self.value == "NA" {
            return match self.op {
                ConditionOp::Eq => Ok(col(&self.column).is_missing()),
                ConditionOp::NotEq => Ok(col(&self.column).is_not_missing()),
                _ => Err(RelError::invalid_argument(
                    "Only '=' and '!=' can compare against NA",
                )),
            };
        }

        let value = parse_literal(&self.value, &field.datatype)?;
        let column = col(&self.column);
        Ok(match self.op {
            ConditionOp::Eq => column.eq(lit(value)),
            ConditionOp::NotEq => column.not_eq(lit(value)),
            ConditionOp::Lt => column.lt(lit(value)),
            ConditionOp::LtEq => column.lt_eq(lit(value)),
            ConditionOp::Gt => column.gt(lit(value)),
            ConditionOp::GtEq => column.gt_eq(lit(value)),
        })
    }
}

fn parse_literal(value: &str, datatype: &DataType) -> Result<ScalarValue> {
    let parsed = match datatype {
        DataType::Boolean => BoolParser.parse(value).map(ScalarValue::Boolean),
        DataType::Int64 | DataType::Float64 => Int64Parser::new()
            .parse(value)
            .map(ScalarValue::Int64)
            .or_else(|| Float64Parser::new().parse(value).map(ScalarValue::Float64)),
        DataType::Timestamp(meta) => TimestampParser::new(meta.offset)
            .parse(value)
            .map(|micros| {
                ScalarValue::Timestamp(TimestampScalar {
                    micros,
                    offset: meta.offset,
                })
            }),
        DataType::Utf8 | DataType::Categorical(_) => Some(ScalarValue::Utf8(value.to_string())),
    };
    parsed.ok_or_else(|| {
        RelError::type_mismatch(format!("Cannot compare '{value}' with a {datatype} column"))
    })
}
