use regex::Regex;
use relframe_error::{RelError, Result};
use tracing::trace;

use crate::arrays::field::Schema;
use crate::relation::Relation;

/// Picks columns from a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Explicit names, output in the given order. Repeats are collapsed to
    /// the first occurrence.
    Names(Vec<String>),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    /// Names matching a regular expression.
    Matches(String),
    /// All columns from `first` through `last`, inclusive, by position.
    Range { first: String, last: String },
    Everything,
}

impl ColumnSelector {
    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        ColumnSelector::Names(names.into_iter().map(|s| s.into()).collect())
    }

    pub fn range(first: impl Into<String>, last: impl Into<String>) -> Self {
        ColumnSelector::Range {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Resolve the selector to column positions in `schema`.
    pub fn resolve(&self, schema: &Schema) -> Result<Vec<usize>> {
        let by_predicate = |pred: &dyn Fn(&str) -> bool| -> Vec<usize> {
            schema
                .names()
                .enumerate()
                .filter(|(_, name)| pred(name))
                .map(|(idx, _)| idx)
                .collect()
        };

        Ok(match self {
            Self::Names(names) => {
                let mut indices: Vec<usize> = Vec::with_capacity(names.len());
                for name in names {
                    let idx = schema.try_index_of(name)?;
                    if !indices.contains(&idx) {
                        indices.push(idx);
                    }
                }
                indices
            }
            Self::StartsWith(prefix) => by_predicate(&|name| name.starts_with(prefix.as_str())),
            Self::EndsWith(suffix) => by_predicate(&|name| name.ends_with(suffix.as_str())),
            Self::Contains(s) => by_predicate(&|name| name.contains(s.as_str())),
            Self::Matches(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    RelError::invalid_argument("Invalid column pattern")
                        .with_field("pattern", pattern)
                        .with_field("error", e)
                })?;
                by_predicate(&|name| regex.is_match(name))
            }
            Self::Range { first, last } => {
                let start = schema.try_index_of(first)?;
                let end = schema.try_index_of(last)?;
                if start <= end {
                    (start..=end).collect()
                } else {
                    (end..=start).rev().collect()
                }
            }
            Self::Everything => (0..schema.num_fields()).collect(),
        })
    }
}

pub fn select(relation: &Relation, selector: &ColumnSelector) -> Result<Relation> {
    let indices = selector.resolve(relation.schema())?;
    trace!(?selector, num_columns = indices.len(), "select");
    project(relation, &indices)
}

/// Keep the columns at the given positions, in order.
pub(crate) fn project(relation: &Relation, indices: &[usize]) -> Result<Relation> {
    let fields = relation.schema().fields();
    let columns = relation.columns();

    let mut out_fields = Vec::with_capacity(indices.len());
    let mut out_columns = Vec::with_capacity(indices.len());
    for &idx in indices {
        let field = fields.get(idx).ok_or_else(|| {
            RelError::new("Column index out of bounds").with_field("idx", idx)
        })?;
        out_fields.push(field.clone());
        out_columns.push(columns[idx].clone());
    }

    Relation::try_from_parts(
        Schema::try_new(out_fields)?,
        out_columns,
        relation.num_rows(),
    )
}
