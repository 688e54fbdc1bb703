use std::cmp::Ordering;
use std::fmt::{self, Debug};

use ahash::RandomState;
use hashbrown::HashSet;
use rayon::prelude::*;
use relframe_error::{RelError, Result};
use tracing::debug;

use super::group_key::{KeyValue, RowKeys, column_key_values, group_rows, resolve_key_columns};
use crate::arrays::array::Array;
use crate::arrays::compute::cmp::RowComparator;
use crate::arrays::datatype::DataType;
use crate::arrays::field::{Field, Schema};
use crate::arrays::selection::SelectionVector;
use crate::config::execution::ExecutionConfig;
use crate::relation::Relation;

/// How an aggregate treats missing inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Ignore missing inputs.
    Skip,
    /// Any missing input makes the group's result missing.
    Propagate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Number of rows in the group.
    Count,
    /// Number of values in the input column.
    CountValues,
    CountDistinct,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggregateFunction {
    fn name(&self) -> &'static str {
        match self {
            Self::Count => "n",
            Self::CountValues => "count",
            Self::CountDistinct => "n_distinct",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// An aggregate to compute per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateExpr {
    pub function: AggregateFunction,
    /// Input column. None only for `Count`.
    pub input: Option<String>,
    pub policy: MissingPolicy,
    pub alias: Option<String>,
}

impl AggregateExpr {
    fn new(function: AggregateFunction, input: Option<String>, policy: MissingPolicy) -> Self {
        AggregateExpr {
            function,
            input,
            policy,
            alias: None,
        }
    }

    /// Count rows. Named `n` unless aliased.
    pub fn count() -> Self {
        Self::new(AggregateFunction::Count, None, MissingPolicy::Skip)
    }

    /// Count non-missing values of a column.
    pub fn count_col(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::CountValues,
            Some(input.into()),
            MissingPolicy::Skip,
        )
    }

    pub fn count_distinct(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::CountDistinct,
            Some(input.into()),
            MissingPolicy::Skip,
        )
    }

    pub fn sum(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::Sum,
            Some(input.into()),
            MissingPolicy::Propagate,
        )
    }

    pub fn mean(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::Mean,
            Some(input.into()),
            MissingPolicy::Propagate,
        )
    }

    pub fn min(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::Min,
            Some(input.into()),
            MissingPolicy::Propagate,
        )
    }

    pub fn max(input: impl Into<String>) -> Self {
        Self::new(
            AggregateFunction::Max,
            Some(input.into()),
            MissingPolicy::Propagate,
        )
    }

    pub fn skip_missing(mut self) -> Self {
        self.policy = MissingPolicy::Skip;
        self
    }

    pub fn propagate_missing(mut self) -> Self {
        self.policy = MissingPolicy::Propagate;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name of the output column.
    pub fn output_name(&self) -> String {
        match (&self.alias, &self.input) {
            (Some(alias), _) => alias.clone(),
            (None, Some(input)) => format!("{}_{input}", self.function.name()),
            (None, None) => self.function.name().to_string(),
        }
    }

    fn output_type(&self, input: Option<&DataType>) -> Result<DataType> {
        match (self.function, input) {
            (AggregateFunction::Count, _) => Ok(DataType::Int64),
            (AggregateFunction::CountValues | AggregateFunction::CountDistinct, Some(_)) => {
                Ok(DataType::Int64)
            }
            (AggregateFunction::Sum, Some(DataType::Int64)) => Ok(DataType::Int64),
            (AggregateFunction::Sum, Some(DataType::Float64)) => Ok(DataType::Float64),
            (AggregateFunction::Mean, Some(dt)) if dt.is_numeric() => Ok(DataType::Float64),
            (AggregateFunction::Min | AggregateFunction::Max, Some(dt)) => Ok(dt.clone()),
            (_, Some(dt)) => Err(RelError::type_mismatch(format!(
                "Cannot compute {} over {dt}",
                self.function.name()
            ))
            .with_field("aggregate", self)),
            (_, None) => Err(RelError::invalid_argument(format!(
                "Aggregate '{}' requires an input column",
                self.function.name()
            ))),
        }
    }
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.input {
            Some(input) => write!(f, "{}({input})", self.function.name())?,
            None => write!(f, "{}()", self.function.name())?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

/// State for a single group's aggregate.
pub trait AggregateState<Input, Output>: Default + Debug {
    /// Update this state with a valid input.
    fn update(&mut self, input: Input) -> Result<()>;

    /// Produce a single value from the state, along with a bool indicating if
    /// the value is valid.
    fn finalize(self) -> Result<(Output, bool)>;
}

#[derive(Debug, Default)]
struct CountValuesState {
    count: i64,
}

impl<T> AggregateState<T, i64> for CountValuesState {
    fn update(&mut self, _input: T) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(self) -> Result<(i64, bool)> {
        Ok((self.count, true))
    }
}

#[derive(Debug)]
struct CountDistinctState<'a> {
    seen: HashSet<KeyValue<'a>, RandomState>,
}

impl Default for CountDistinctState<'_> {
    fn default() -> Self {
        CountDistinctState {
            seen: HashSet::with_hasher(RandomState::new()),
        }
    }
}

impl<'a> AggregateState<KeyValue<'a>, i64> for CountDistinctState<'a> {
    fn update(&mut self, input: KeyValue<'a>) -> Result<()> {
        self.seen.insert(input);
        Ok(())
    }

    fn finalize(self) -> Result<(i64, bool)> {
        Ok((self.seen.len() as i64, true))
    }
}

#[derive(Debug, Default)]
struct SumInt64State {
    sum: i64,
}

impl AggregateState<i64, i64> for SumInt64State {
    fn update(&mut self, input: i64) -> Result<()> {
        self.sum = self.sum.checked_add(input).ok_or_else(|| {
            RelError::invalid_argument("Integer overflow in sum").with_field("value", input)
        })?;
        Ok(())
    }

    fn finalize(self) -> Result<(i64, bool)> {
        Ok((self.sum, true))
    }
}

#[derive(Debug, Default)]
struct SumFloat64State {
    sum: f64,
}

impl AggregateState<f64, f64> for SumFloat64State {
    fn update(&mut self, input: f64) -> Result<()> {
        self.sum += input;
        Ok(())
    }

    fn finalize(self) -> Result<(f64, bool)> {
        Ok((self.sum, true))
    }
}

#[derive(Debug, Default)]
struct MeanState {
    sum: f64,
    count: i64,
}

impl AggregateState<f64, f64> for MeanState {
    fn update(&mut self, input: f64) -> Result<()> {
        self.sum += input;
        self.count += 1;
        Ok(())
    }

    fn finalize(self) -> Result<(f64, bool)> {
        if self.count == 0 {
            return Ok((0.0, false));
        }
        Ok((self.sum / self.count as f64, true))
    }
}

/// Run a state over each group of rows.
///
/// Returns one output per group, None when the result is missing.
fn aggregate_groups<S, I, O>(
    values: &[Option<I>],
    groups: &[Vec<usize>],
    policy: MissingPolicy,
) -> Result<Vec<Option<O>>>
where
    S: AggregateState<I, O>,
    I: Copy,
{
    let mut outputs = Vec::with_capacity(groups.len());
    'groups: for rows in groups {
        let mut state = S::default();
        for &row in rows {
            match values[row] {
                Some(v) => state.update(v)?,
                None if policy == MissingPolicy::Propagate => {
                    outputs.push(None);
                    continue 'groups;
                }
                None => (),
            }
        }
        let (out, valid) = state.finalize()?;
        outputs.push(valid.then_some(out));
    }
    Ok(outputs)
}

/// Pick the minimum or maximum row of each group.
fn extreme_rows(
    input: &Array,
    groups: &[Vec<usize>],
    policy: MissingPolicy,
    want: Ordering,
) -> Vec<Option<usize>> {
    let comparator = RowComparator::new(input);
    groups
        .iter()
        .map(|rows| {
            let mut best: Option<usize> = None;
            for &row in rows {
                if !input.is_valid(row) {
                    if policy == MissingPolicy::Propagate {
                        return None;
                    }
                    continue;
                }
                best = match best {
                    Some(current) if comparator.compare(row, current) != want => Some(current),
                    _ => Some(row),
                };
            }
            best
        })
        .collect()
}

fn compute_aggregate(
    agg: &AggregateExpr,
    input: Option<&Array>,
    groups: &[Vec<usize>],
) -> Result<Array> {
    let out: Array = match (agg.function, input) {
        (AggregateFunction::Count, _) => groups.iter().map(|rows| rows.len() as i64).collect(),
        (AggregateFunction::CountValues, Some(input)) => {
            let valid: Vec<_> = (0..input.len())
                .map(|idx| input.is_valid(idx).then_some(()))
                .collect();
            aggregate_groups::<CountValuesState, _, i64>(&valid, groups, agg.policy)?
                .into_iter()
                .collect()
        }
        (AggregateFunction::CountDistinct, Some(input)) => {
            let keys: Vec<_> = column_key_values(input)?
                .into_iter()
                .map(|k| (!k.is_missing()).then_some(k))
                .collect();
            aggregate_groups::<CountDistinctState, _, i64>(&keys, groups, agg.policy)?
                .into_iter()
                .collect()
        }
        (AggregateFunction::Sum, Some(input)) if input.datatype() == &DataType::Int64 => {
            let values: Vec<_> = input.iter_i64()?.collect();
            aggregate_groups::<SumInt64State, _, _>(&values, groups, agg.policy)?
                .into_iter()
                .collect()
        }
        (AggregateFunction::Sum, Some(input)) => {
            let values: Vec<_> = input.iter_f64()?.collect();
            aggregate_groups::<SumFloat64State, _, _>(&values, groups, agg.policy)?
                .into_iter()
                .collect()
        }
        (AggregateFunction::Mean, Some(input)) => {
            let values: Vec<_> = input.iter_f64()?.collect();
            aggregate_groups::<MeanState, _, _>(&values, groups, agg.policy)?
                .into_iter()
                .collect()
        }
        (AggregateFunction::Min, Some(input)) => {
            let rows = extreme_rows(input, groups, agg.policy, Ordering::Less);
            input.take_optional(&rows)?
        }
        (AggregateFunction::Max, Some(input)) => {
            let rows = extreme_rows(input, groups, agg.policy, Ordering::Greater);
            input.take_optional(&rows)?
        }
        (_, None) => {
            return Err(RelError::invalid_argument("Aggregate requires an input column")
                .with_field("aggregate", agg));
        }
    };
    Ok(out)
}

/// Group rows by key columns and compute aggregates per group.
///
/// Output has the key columns followed by one column per aggregate, with one
/// row per distinct key combination in order of first appearance. Missing key
/// values group together. No keys produces exactly one row, even for an empty
/// input.
pub fn group_aggregate(
    relation: &Relation,
    keys: &[&str],
    aggregates: &[AggregateExpr],
    config: &ExecutionConfig,
) -> Result<Relation> {
    let key_columns = resolve_key_columns(relation, keys)?;

    // Resolve inputs and output types before doing any work.
    let mut inputs = Vec::with_capacity(aggregates.len());
    let mut fields: Vec<Field> = key_columns
        .iter()
        .map(|(idx, _)| relation.schema().fields()[*idx].clone())
        .collect();
    for agg in aggregates {
        let input = match &agg.input {
            Some(name) => Some(relation.column(name)?),
            None => None,
        };
        let datatype = agg.output_type(input.map(|arr| arr.datatype()))?;
        fields.push(Field::new(agg.output_name(), datatype));
        inputs.push(input);
    }
    let schema = Schema::try_new(fields)?;

    let key_arrays: Vec<&Array> = key_columns.iter().map(|(_, arr)| *arr).collect();
    let row_keys = RowKeys::try_new(&key_arrays, relation.num_rows())?;
    let grouping = group_rows(&row_keys);

    let (groups, first_rows) = if keys.is_empty() {
        (vec![(0..relation.num_rows()).collect::<Vec<_>>()], Vec::new())
    } else {
        (grouping.rows_per_group(), grouping.first_rows)
    };

    debug!(
        input_rows = relation.num_rows(),
        num_groups = groups.len(),
        num_aggregates = aggregates.len(),
        parallel = config.enable_parallel,
        "group aggregate"
    );

    let agg_columns: Vec<Array> = if config.enable_parallel && aggregates.len() > 1 {
        aggregates
            .par_iter()
            .zip(inputs.par_iter())
            .map(|(agg, input)| compute_aggregate(agg, *input, &groups))
            .collect::<Result<Vec<_>>>()?
    } else {
        aggregates
            .iter()
            .zip(&inputs)
            .map(|(agg, input)| compute_aggregate(agg, *input, &groups))
            .collect::<Result<Vec<_>>>()?
    };

    let selection: SelectionVector = first_rows.into_iter().collect();
    let mut columns = key_arrays
        .iter()
        .map(|arr| arr.take(&selection))
        .collect::<Result<Vec<_>>>()?;
    columns.extend(agg_columns);

    Relation::try_from_parts(schema, columns, groups.len())
}
