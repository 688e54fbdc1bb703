use relframe_error::{RelError, Result};

/// Packed bit vector, used for validity masks and filter selections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    len: usize,
    data: Vec<u8>,
}

impl Bitmap {
    pub fn with_capacity(cap: usize) -> Self {
        Bitmap {
            len: 0,
            data: Vec::with_capacity(cap.div_ceil(8)),
        }
    }

    pub fn new_with_all_true(len: usize) -> Self {
        let mut data = vec![u8::MAX; len.div_ceil(8)];
        // Keep trailing bits zeroed so equality only depends on the logical
        // bits.
        let rem = len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last = (1 << rem) - 1;
            }
        }
        Bitmap { len, data }
    }

    pub fn new_with_all_false(len: usize) -> Self {
        Bitmap {
            len,
            data: vec![0; len.div_ceil(8)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the value at `idx`.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len, "bitmap index {idx} out of bounds {}", self.len);
        self.data[idx / 8] & (1 << (idx % 8)) != 0
    }

    /// Set the value at `idx`.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn set_unchecked(&mut self, idx: usize, val: bool) {
        assert!(idx < self.len, "bitmap index {idx} out of bounds {}", self.len);
        if val {
            self.data[idx / 8] |= 1 << (idx % 8);
        } else {
            self.data[idx / 8] &= !(1 << (idx % 8));
        }
    }

    pub fn push(&mut self, val: bool) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        self.len += 1;
        self.set_unchecked(self.len - 1, val);
    }

    pub fn count_trues(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn is_all_true(&self) -> bool {
        self.count_trues() == self.len
    }

    /// Bitwise AND with another bitmap of the same length.
    pub fn bit_and_mut(&mut self, other: &Bitmap) -> Result<()> {
        if self.len != other.len {
            return Err(RelError::new("Bitmap lengths do not match")
                .with_field("self", self.len)
                .with_field("other", other.len));
        }
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a &= *b;
        }
        Ok(())
    }

    pub fn iter(&self) -> BitmapIter<'_> {
        BitmapIter {
            bitmap: self,
            idx: 0,
        }
    }

    /// Iterate the indices of all set bits.
    pub fn index_iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter()
            .enumerate()
            .filter_map(|(idx, v)| if v { Some(idx) } else { None })
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut bitmap = Bitmap::with_capacity(iter.size_hint().0);
        for v in iter {
            bitmap.push(v);
        }
        bitmap
    }
}

impl Extend<bool> for Bitmap {
    fn extend<T: IntoIterator<Item = bool>>(&mut self, iter: T) {
        for v in iter {
            self.push(v)
        }
    }
}

#[derive(Debug)]
pub struct BitmapIter<'a> {
    bitmap: &'a Bitmap,
    idx: usize,
}

impl Iterator for BitmapIter<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.bitmap.len {
            return None;
        }
        let v = self.bitmap.value(self.idx);
        self.idx += 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.bitmap.len - self.idx;
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for BitmapIter<'_> {}
