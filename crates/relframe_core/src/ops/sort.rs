use std::cmp::Ordering;
use std::fmt;

use relframe_error::Result;
use tracing::trace;

use crate::arrays::array::Array;
use crate::arrays::compute::cmp::RowComparator;
use crate::arrays::selection::SelectionVector;
use crate::relation::Relation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            descending: true,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "{} DESC", self.column)
        } else {
            write!(f, "{} ASC", self.column)
        }
    }
}

struct KeyComparator<'a> {
    array: &'a Array,
    values: RowComparator<'a>,
    descending: bool,
}

impl KeyComparator<'_> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        // Missing values go last regardless of direction.
        match (self.array.is_valid(a), self.array.is_valid(b)) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (true, true) => {
                let ord = self.values.compare(a, b);
                if self.descending { ord.reverse() } else { ord }
            }
        }
    }
}

/// Stable sort by one or more keys.
pub fn arrange_sort(relation: &Relation, keys: &[SortKey]) -> Result<Relation> {
    let comparators = keys
        .iter()
        .map(|key| {
            let array = relation.column(&key.column)?;
            Ok(KeyComparator {
                array,
                values: RowComparator::new(array),
                descending: key.descending,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut indices: Vec<usize> = (0..relation.num_rows()).collect();
    indices.sort_by(|&a, &b| {
        comparators
            .iter()
            .map(|cmp| cmp.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    trace!(num_rows = indices.len(), num_keys = keys.len(), "sort");

    relation.take(&SelectionVector::from_iter(indices))
}
