use std::fmt;

use relframe_error::{RelError, Result};

use crate::arrays::array::Array;
use crate::arrays::field::{Field, Schema};
use crate::arrays::scalar::ScalarValue;
use crate::arrays::selection::SelectionVector;
use crate::config::execution::ExecutionConfig;
use crate::expr::Expr;
use crate::format::pretty::pretty_format;
use crate::ops;
use crate::ops::aggregate::AggregateExpr;
use crate::ops::distinct::DistinctOptions;
use crate::ops::join::{JoinKey, JoinOptions, JoinType};
use crate::ops::mutate::Assignment;
use crate::ops::select::ColumnSelector;
use crate::ops::sort::SortKey;

/// A single row of a relation.
pub type ScalarRow = Vec<ScalarValue>;

/// An immutable, in-memory table of named columns.
///
/// Every column has the same length. A relation may have no columns while
/// still having rows, e.g. after selecting zero columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    schema: Schema,
    columns: Vec<Array>,
    num_rows: usize,
}

impl Relation {
    /// A relation with no columns and no rows.
    pub fn empty() -> Self {
        Relation {
            schema: Schema::empty(),
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    /// Create a relation from named columns.
    ///
    /// Errors on duplicate names or columns of differing lengths.
    pub fn try_new<S: Into<String>>(columns: impl IntoIterator<Item = (S, Array)>) -> Result<Self> {
        let (fields, columns): (Vec<_>, Vec<_>) = columns
            .into_iter()
            .map(|(name, arr)| (Field::new(name, arr.datatype().clone()), arr))
            .unzip();

        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some(col) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(RelError::row_count_mismatch(num_rows, col.len()));
        }

        Ok(Relation {
            schema: Schema::try_new(fields)?,
            columns,
            num_rows,
        })
    }

    /// Create a relation with no columns and some number of rows.
    pub fn new_without_columns(num_rows: usize) -> Self {
        Relation {
            schema: Schema::empty(),
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Create a relation from parts produced by an operator.
    ///
    /// Column lengths are an operator invariant. A mismatch is a bug, so it's
    /// asserted in debug builds and returned as an error otherwise.
    pub(crate) fn try_from_parts(
        schema: Schema,
        columns: Vec<Array>,
        num_rows: usize,
    ) -> Result<Self> {
        debug_assert_eq!(schema.num_fields(), columns.len());
        debug_assert!(columns.iter().all(|c| c.len() == num_rows));

        if schema.num_fields() != columns.len() {
            return Err(RelError::new("Schema does not match number of columns")
                .with_field("fields", schema.num_fields())
                .with_field("columns", columns.len()));
        }
        if let Some(col) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(RelError::row_count_mismatch(num_rows, col.len()));
        }
        for (field, col) in schema.fields().iter().zip(&columns) {
            if &field.datatype != col.datatype() {
                return Err(RelError::type_mismatch("Column type does not match schema")
                    .with_field("column", &field.name));
            }
        }

        Ok(Relation {
            schema,
            columns,
            num_rows,
        })
    }

    /// Build a relation from rows of scalars.
    pub fn try_from_rows(schema: Schema, rows: &[ScalarRow]) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.num_fields());
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let scalars = rows
                .iter()
                .enumerate()
                .map(|(row_idx, row)| {
                    row.get(col_idx).ok_or_else(|| {
                        RelError::invalid_argument("Row has too few values")
                            .with_field("row", row_idx)
                            .with_field("column", &field.name)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            columns.push(Array::try_from_scalars(&field.datatype, scalars)?);
        }
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() > schema.num_fields())
        {
            return Err(RelError::invalid_argument("Row has too many values")
                .with_field("row", idx)
                .with_field("values", row.len()));
        }

        Self::try_from_parts(schema, columns, rows.len())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn columns(&self) -> &[Array] {
        &self.columns
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Result<&Array> {
        let idx = self.schema.try_index_of(name)?;
        Ok(&self.columns[idx])
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.schema.names()
    }

    /// Iterate (field, column) pairs.
    pub fn iter_columns(&self) -> impl ExactSizeIterator<Item = (&Field, &Array)> + '_ {
        self.schema.fields().iter().zip(self.columns.iter())
    }

    /// Get a single row as scalars.
    pub fn row(&self, idx: usize) -> Result<ScalarRow> {
        if idx >= self.num_rows {
            return Err(RelError::new("Row index out of bounds")
                .with_field("idx", idx)
                .with_field("num_rows", self.num_rows));
        }
        self.columns
            .iter()
            .map(|c| c.logical_value(idx))
            .collect()
    }

    /// Collect all rows as scalars.
    pub fn rows(&self) -> Result<Vec<ScalarRow>> {
        (0..self.num_rows).map(|idx| self.row(idx)).collect()
    }

    /// Take rows by location. Locations may repeat.
    pub fn take(&self, selection: &SelectionVector) -> Result<Relation> {
        if let Some(max) = selection.max_location() {
            if max >= self.num_rows {
                return Err(RelError::new("Selection out of bounds for relation")
                    .with_field("location", max)
                    .with_field("num_rows", self.num_rows));
            }
        }
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(selection))
            .collect::<Result<Vec<_>>>()?;
        Self::try_from_parts(self.schema.clone(), columns, selection.num_rows())
    }

    pub fn select(&self, selector: &ColumnSelector) -> Result<Relation> {
        ops::select::select(self, selector)
    }

    pub fn filter(&self, predicates: &[Expr]) -> Result<Relation> {
        ops::filter::filter(self, predicates)
    }

    pub fn mutate(&self, assignments: &[Assignment]) -> Result<Relation> {
        ops::mutate::mutate(self, assignments)
    }

    pub fn group_aggregate(
        &self,
        keys: &[&str],
        aggregates: &[AggregateExpr],
    ) -> Result<Relation> {
        ops::aggregate::group_aggregate(self, keys, aggregates, &ExecutionConfig::default())
    }

    pub fn arrange_sort(&self, keys: &[SortKey]) -> Result<Relation> {
        ops::sort::arrange_sort(self, keys)
    }

    pub fn distinct_rows(&self, options: &DistinctOptions) -> Result<Relation> {
        ops::distinct::distinct_rows(self, options)
    }

    pub fn join(
        &self,
        right: &Relation,
        keys: &[JoinKey],
        join_type: JoinType,
    ) -> Result<Relation> {
        ops::join::join(self, right, keys, join_type, &JoinOptions::default())
    }

    pub fn count(&self, keys: &[&str]) -> Result<Relation> {
        ops::count::count(self, keys)
    }

    pub fn rename(&self, renames: &[(&str, &str)]) -> Result<Relation> {
        ops::misc::rename(self, renames)
    }

    pub fn slice_head(&self, n: usize) -> Result<Relation> {
        ops::misc::slice_head(self, n)
    }

    pub fn slice_rows(&self, offset: usize, count: usize) -> Result<Relation> {
        ops::misc::slice_rows(self, offset, count)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pretty_format(self, &Default::default()))
    }
}
