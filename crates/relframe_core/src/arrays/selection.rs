use std::ops::Range;

use super::bitmap::Bitmap;

/// Row indices to take from an input, in output order.
///
/// Filter, sort, join and distinct all produce one of these, then take rows
/// from every input column with it. Indices may repeat (join expansion) and
/// need not be ascending (sort).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionVector {
    indices: Vec<usize>,
}

impl SelectionVector {
    /// Rows `range.start..range.end` in order.
    pub fn with_range(range: Range<usize>) -> Self {
        SelectionVector {
            indices: range.collect(),
        }
    }

    /// Rows whose bit is set, e.g. the true values of a filter mask.
    pub fn from_bitmap(bitmap: &Bitmap) -> Self {
        bitmap.index_iter().collect()
    }

    pub fn iter_locations(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Largest row referenced, used for bounds checks before taking.
    pub fn max_location(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }

    pub fn num_rows(&self) -> usize {
        self.indices.len()
    }
}

impl FromIterator<usize> for SelectionVector {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        SelectionVector {
            indices: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_filter_mask() {
        let mask = Bitmap::from_iter([false, true, true, false, true]);
        let sel = SelectionVector::from_bitmap(&mask);
        assert_eq!(vec![1, 2, 4], sel.iter_locations().collect::<Vec<_>>());
        assert_eq!(Some(4), sel.max_location());
        assert_eq!(3, sel.num_rows());
    }

    #[test]
    fn repeated_and_unordered() {
        let sel = SelectionVector::from_iter([3, 0, 0, 2]);
        assert_eq!(vec![3, 0, 0, 2], sel.iter_locations().collect::<Vec<_>>());
        assert_eq!(Some(3), sel.max_location());
    }

    #[test]
    fn empty_range() {
        let sel = SelectionVector::with_range(2..2);
        assert_eq!(0, sel.num_rows());
        assert_eq!(None, sel.max_location());
    }
}
