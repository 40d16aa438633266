use std::{iter::FusedIterator, ops::Range};

use crate::{vector::Vector, Const, ValidBranchingConstant};

/// An iterator over a range of a [`Vector`]'s elements.
///
/// The iterator remembers the leaf it's currently walking through, so it
/// only goes back to the trie once every `N` elements.
#[derive(Debug)]
pub struct Iter<'a, T, const N: usize = 32>
where
    Const<N>: ValidBranchingConstant,
{
    source: &'a Vector<T, N>,
    leaf: &'a [T],
    offset: usize,
    // The index of `leaf[0]`.
    base: usize,
    end: usize,
}

impl<'a, T, const N: usize> Iter<'a, T, N>
where
    Const<N>: ValidBranchingConstant,
{
    /// `range` must be within bounds.
    pub(crate) fn new(source: &'a Vector<T, N>, range: Range<usize>) -> Self {
        let Range { start, end } = range;
        debug_assert!(start <= end && end <= source.len());
        Iter {
            source,
            leaf: if start < end {
                source.leaf_for(start)
            } else {
                &[]
            },
            offset: start,
            base: start & !(N - 1),
            end,
        }
    }
}

// Not derived, because deriving would require `T: Clone`.
impl<T, const N: usize> Clone for Iter<'_, T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn clone(&self) -> Self {
        Iter {
            source: self.source,
            leaf: self.leaf,
            offset: self.offset,
            base: self.base,
            end: self.end,
        }
    }
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N>
where
    Const<N>: ValidBranchingConstant,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.end {
            return None;
        }

        if self.offset - self.base == N {
            self.leaf = self.source.leaf_for(self.offset);
            self.base += N;
        }
        let ret = &self.leaf[self.offset & (N - 1)];
        self.offset += 1;
        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end.saturating_sub(self.offset);
        (len, Some(len))
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> where Const<N>: ValidBranchingConstant {}

impl<T, const N: usize> FusedIterator for Iter<'_, T, N> where Const<N>: ValidBranchingConstant {}

/// An iterator over a range of a [`Vector`]'s elements, together with their
/// indices.
#[derive(Debug, Clone)]
pub struct Entries<'a, T, const N: usize = 32>
where
    Const<N>: ValidBranchingConstant,
{
    values: Iter<'a, T, N>,
}

impl<'a, T, const N: usize> Entries<'a, T, N>
where
    Const<N>: ValidBranchingConstant,
{
    pub(crate) fn new(values: Iter<'a, T, N>) -> Self {
        Entries { values }
    }
}

impl<'a, T, const N: usize> Iterator for Entries<'a, T, N>
where
    Const<N>: ValidBranchingConstant,
{
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.values.offset;
        self.values.next().map(|elt| (idx, elt))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<T, const N: usize> ExactSizeIterator for Entries<'_, T, N> where
    Const<N>: ValidBranchingConstant
{
}

impl<T, const N: usize> FusedIterator for Entries<'_, T, N> where Const<N>: ValidBranchingConstant {}

impl<'a, T, const N: usize> IntoIterator for &'a Vector<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
