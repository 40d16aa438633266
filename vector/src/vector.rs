use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Bound, Index, Range, RangeBounds},
    sync::Arc,
};

use imbl_sized_chunks::Chunk;

use crate::{
    error::{Error, Result},
    iter::{Entries, Iter},
    node::Leaf,
    transient::Transient,
    trie::Trie,
    Const, ValidBranchingConstant,
};

/// A persistent vector (also known as a "bitmapped vector trie").
///
/// Clones are cheap, and every modification returns a new vector that shares
/// all of its untouched structure with the old one. Random access, `set`,
/// `push` and `pop` all take `O(log_N(len))` time.
///
/// The most recently pushed (up to `N`) elements live in a separate tail
/// buffer outside the trie, so most pushes only copy the tail.
///
/// `N` is the branching factor. It must be a power of two; the default of 32
/// is a good choice unless `T` is large.
pub struct Vector<T, const N: usize = 32>
where
    Const<N>: ValidBranchingConstant,
{
    pub(crate) trie: Trie<T, N>,
    // `None` exactly when the vector is empty, so that the empty vector
    // doesn't allocate.
    pub(crate) tail: Option<Arc<Leaf<T, N>>>,
}

impl<T, const N: usize> Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    /// The empty vector.
    pub const fn new() -> Self {
        Vector {
            trie: Trie::new(),
            tail: None,
        }
    }

    pub(crate) fn with_tail(trie: Trie<T, N>, tail: Leaf<T, N>) -> Self {
        debug_assert_eq!(tail.len(), trie.tail_len());
        let tail = if tail.is_empty() {
            None
        } else {
            Some(Arc::new(tail))
        };
        Vector { trie, tail }
    }

    pub fn len(&self) -> usize {
        self.trie.size
    }

    pub fn is_empty(&self) -> bool {
        self.trie.size == 0
    }

    /// Returns the empty vector. The original is left as it was.
    pub fn clear(&self) -> Self {
        Self::new()
    }

    fn tail_slice(&self) -> &[T] {
        match &self.tail {
            Some(tail) => tail.as_slice(),
            None => &[],
        }
    }

    /// The leaf (a slice of up to `N` elements) holding index `idx`, which
    /// must be in bounds. Element `idx` is at position `idx & (N - 1)`.
    pub(crate) fn leaf_for(&self, idx: usize) -> &[T] {
        self.trie.leaf_for(self.tail_slice(), idx)
    }

    /// Gets the element at index `idx`, or `None` if `idx` is out of bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use persistent_vector::Vector;
    /// let vec: Vector<_> = (0..100).collect();
    /// assert_eq!(vec.get(42), Some(&42));
    /// assert_eq!(vec.get(100), None);
    /// ```
    pub fn get(&self, idx: usize) -> Option<&T> {
        (idx < self.len()).then(|| &self.leaf_for(idx)[idx & (N - 1)])
    }

    /// Gets the element at index `idx`, or `fallback` if `idx` is out of bounds.
    pub fn get_or<'a>(&'a self, idx: usize, fallback: &'a T) -> &'a T {
        self.get(idx).unwrap_or(fallback)
    }

    /// The last element, if there is one.
    pub fn peek(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }

    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter::new(self, 0..self.len())
    }

    /// Iterates over the elements whose indices are in `range`. Bounds past
    /// the end of the vector are clamped to its length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use persistent_vector::Vector;
    /// let vec: Vector<_> = (0..100).collect();
    /// assert_eq!(vec.values(30..34).copied().collect::<Vec<_>>(), vec![30, 31, 32, 33]);
    /// assert_eq!(vec.values(98..).count(), 2);
    /// assert_eq!(vec.values(150..200).count(), 0);
    /// ```
    pub fn values(&self, range: impl RangeBounds<usize>) -> Iter<'_, T, N> {
        Iter::new(self, self.clamp(range))
    }

    /// Like [`Vector::values`], but also yields the index of each element.
    pub fn entries(&self, range: impl RangeBounds<usize>) -> Entries<'_, T, N> {
        Entries::new(self.values(range))
    }

    /// The indices in `range` that are valid for this vector.
    pub fn keys(&self, range: impl RangeBounds<usize>) -> Range<usize> {
        self.clamp(range)
    }

    fn clamp(&self, range: impl RangeBounds<usize>) -> Range<usize> {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        };
        let end = end.min(len);
        start.min(end)..end
    }

    /// Panics if the internal invariants are violated.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        self.trie.check_invariants();
        assert_eq!(self.tail_slice().len(), self.trie.tail_len());
        assert_eq!(self.tail.is_none(), self.is_empty());
    }
}

impl<T: Clone, const N: usize> Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn copy_tail(&self) -> Leaf<T, N> {
        self.tail.as_deref().cloned().unwrap_or_default()
    }

    /// Returns a new vector with `elt` added at the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use persistent_vector::{vector, Vector};
    /// let vec = vector![1, 2, 3];
    /// let longer = vec.push(4);
    /// assert_eq!(longer, vector![1, 2, 3, 4]);
    /// assert_eq!(vec.len(), 3);
    /// ```
    pub fn push(&self, elt: T) -> Self {
        let mut trie = self.trie.clone();
        let tail = if trie.tail_len() < N {
            let mut tail = self.copy_tail();
            tail.push_back(elt);
            tail
        } else {
            trie.push_leaf(None, self.copy_tail());
            Chunk::unit(elt)
        };
        trie.size += 1;
        Vector::with_tail(trie, tail)
    }

    /// Returns a new vector with the element at `idx` replaced by `elt`.
    ///
    /// Setting at `idx == self.len()` is the same as [`Vector::push`]. Any
    /// larger index is an error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use persistent_vector::{vector, Error};
    /// let vec = vector!["a", "b", "c"];
    /// assert_eq!(vec.set(1, "x").unwrap(), vector!["a", "x", "c"]);
    /// assert_eq!(vec.set(3, "d").unwrap(), vector!["a", "b", "c", "d"]);
    /// assert_eq!(vec.set(7, "z"), Err(Error::IndexOutOfBounds { index: 7, len: 3 }));
    /// ```
    pub fn set(&self, idx: usize, elt: T) -> Result<Self> {
        match idx.cmp(&self.len()) {
            Ordering::Less if idx >= self.trie.tail_offset() => {
                let mut tail = self.copy_tail();
                tail.set(idx & (N - 1), elt);
                Ok(Vector::with_tail(self.trie.clone(), tail))
            }
            Ordering::Less => {
                let mut trie = self.trie.clone();
                trie.assoc(None, idx, elt);
                Ok(Vector {
                    trie,
                    tail: self.tail.clone(),
                })
            }
            Ordering::Equal => Ok(self.push(elt)),
            Ordering::Greater => Err(Error::IndexOutOfBounds {
                index: idx,
                len: self.len(),
            }),
        }
    }

    /// Returns a new vector without the last element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use persistent_vector::{vector, Error, Vector};
    /// assert_eq!(vector![1, 2, 3].pop().unwrap(), vector![1, 2]);
    /// assert_eq!(Vector::<i32>::new().pop(), Err(Error::PopEmpty));
    /// ```
    pub fn pop(&self) -> Result<Self> {
        match self.len() {
            0 => Err(Error::PopEmpty),
            1 => Ok(Self::new()),
            _ => {
                let mut trie = self.trie.clone();
                let tail = if trie.tail_len() > 1 {
                    let mut tail = self.copy_tail();
                    tail.pop_back();
                    tail
                } else {
                    trie.pop_leaf(None)
                };
                trie.size -= 1;
                Ok(Vector::with_tail(trie, tail))
            }
        }
    }

    /// Starts a batch of in-place modifications. See [`Transient`].
    pub fn transient(&self) -> Transient<T, N> {
        Transient::from(self)
    }
}

// Not derived, because deriving would require `T: Clone`.
impl<T, const N: usize> Clone for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn clone(&self) -> Self {
        Vector {
            trie: self.trie.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T, const N: usize> Default for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, const N: usize> fmt::Debug for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, const N: usize> PartialEq for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq, const N: usize> Eq for Vector<T, N> where Const<N>: ValidBranchingConstant {}

impl<T: Hash, const N: usize> Hash for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<T: Clone, const N: usize> Extend<T> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        // Peek so that extending by nothing doesn't open a session.
        let mut iter = iter.into_iter().peekable();
        if iter.peek().is_none() {
            return;
        }

        let (mut transient, edit) = Transient::open(self);
        for elt in iter {
            transient.push_with(edit, elt);
        }
        *self = transient.freeze();
    }
}

impl<T: Clone, const N: usize> FromIterator<T> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut iter = iter.into_iter();

        // The first `N` elements fit in the tail, so they don't need a session.
        let tail: Leaf<T, N> = iter.by_ref().take(N).collect();
        let trie = Trie {
            size: tail.len(),
            ..Trie::new()
        };
        let mut ret = Vector::with_tail(trie, tail);
        ret.extend(iter);
        ret
    }
}

impl<T: Clone, const N: usize> From<Vec<T>> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn from(vec: Vec<T>) -> Self {
        vec.into_iter().collect()
    }
}

impl<T: Clone, const N: usize, const M: usize> From<[T; M]> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn from(arr: [T; M]) -> Self {
        arr.into_iter().collect()
    }
}

impl<T: Clone, const N: usize> From<&[T]> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn from(slice: &[T]) -> Self {
        slice.iter().cloned().collect()
    }
}

impl<T, const N: usize> Index<usize> for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.get(index).expect("index out of range")
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize, const N: usize> serde::Serialize for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for elt in self {
            seq.serialize_element(elt)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Clone + serde::Deserialize<'de>, const N: usize> serde::Deserialize<'de>
    for Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let vec: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(vec.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<const N: usize>(vec: &Vector<u32, N>) -> Vec<u32>
    where
        Const<N>: ValidBranchingConstant,
    {
        vec.iter().copied().collect()
    }

    #[test]
    fn basic() {
        let vec = Vector::<u32, 2>::new();
        vec.check_invariants();
        let vec = vec.push(1);
        assert_eq!(vec.get(0), Some(&1));
        assert_eq!(vec.get(1), None);
        vec.check_invariants();

        let vec = vec.push(2).push(3);
        vec.check_invariants();
        assert_eq!(vec.get(0), Some(&1));
        assert_eq!(vec.get(1), Some(&2));
        assert_eq!(vec.get(2), Some(&3));
        assert_eq!(vec.get(3), None);
        assert_eq!(vec.peek(), Some(&3));
        assert_eq!(collect(&vec), vec![1, 2, 3]);

        let popped = vec.pop().unwrap();
        popped.check_invariants();
        assert_eq!(collect(&popped), vec![1, 2]);
        assert_eq!(collect(&vec), vec![1, 2, 3]);

        let mut vec = vec;
        vec.extend([1, 2, 3]);
        vec.check_invariants();
        assert_eq!(6, vec.len());
        assert_eq!(collect(&vec), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn push_fills_tail_before_trie() {
        let mut vec = Vector::<u32, 4>::new();
        for i in 0..4 {
            vec = vec.push(i);
        }
        assert!(vec.trie.root.is_none());
        vec = vec.push(4);
        assert_eq!(vec.trie.tail_offset(), 4);
        assert_eq!(vec.tail_slice(), &[4]);
        vec.check_invariants();
    }

    #[test]
    fn tail_set_shares_trie() {
        let vec: Vector<u32, 4> = (0..10).collect();
        let updated = vec.set(9, 90).unwrap();
        assert!(Arc::ptr_eq(
            vec.trie.root.as_ref().unwrap(),
            updated.trie.root.as_ref().unwrap()
        ));
        assert_eq!(updated[9], 90);
        assert_eq!(vec[9], 9);
    }

    #[test]
    fn trie_set_shares_tail() {
        let vec: Vector<u32, 4> = (0..10).collect();
        let updated = vec.set(1, 10).unwrap();
        assert!(Arc::ptr_eq(
            vec.tail.as_ref().unwrap(),
            updated.tail.as_ref().unwrap()
        ));
        assert_eq!(updated[1], 10);
        assert_eq!(vec[1], 1);
    }

    #[test]
    fn pop_to_empty_is_canonical() {
        let vec: Vector<u32, 4> = (0..9).collect();
        let mut cur = vec.clone();
        while !cur.is_empty() {
            cur = cur.pop().unwrap();
            cur.check_invariants();
        }
        assert!(cur.trie.root.is_none());
        assert!(cur.tail.is_none());
        assert_eq!(cur.trie.shift, 2);
        assert_eq!(vec.len(), 9);
    }

    #[test]
    fn pop_keeps_depth_minimal() {
        // With N = 4, 21 elements need a two-level trie and 20 only one.
        let vec: Vector<u32, 4> = (0..21).collect();
        assert_eq!(vec.trie.shift, 4);
        let popped = vec.pop().unwrap();
        assert_eq!(popped.trie.shift, 2);
        popped.check_invariants();
        assert_eq!(collect(&popped), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn clamped_ranges() {
        let vec: Vector<u32, 4> = (0..10).collect();
        assert_eq!(vec.keys(..), 0..10);
        assert_eq!(vec.keys(3..=5), 3..6);
        assert_eq!(vec.keys(8..20), 8..10);
        assert_eq!(vec.keys(12..), 10..10);
        assert_eq!(vec.keys(7..3), 3..3);
    }

    #[test]
    fn get_or_falls_back() {
        let vec: Vector<u32> = (0..3).collect();
        assert_eq!(vec.get_or(1, &99), &1);
        assert_eq!(vec.get_or(3, &99), &99);
    }

    #[test]
    fn clear_is_empty() {
        let vec: Vector<u32> = (0..100).collect();
        assert_eq!(vec.clear(), Vector::new());
        assert_eq!(vec.len(), 100);
    }

    #[test]
    fn debug_is_a_list() {
        let vec: Vector<u32> = (0..3).collect();
        assert_eq!(format!("{vec:?}"), "[0, 1, 2]");
    }
}
