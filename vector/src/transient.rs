use std::{cmp::Ordering, sync::Arc};

use imbl_sized_chunks::Chunk;

use crate::{
    error::{Error, Result},
    node::{fork_root, Edit, Leaf},
    trie::Trie,
    vector::Vector,
    Const, ValidBranchingConstant,
};

/// A batch of in-place modifications to a [`Vector`].
///
/// A transient starts out sharing all of its structure with the vector it
/// came from. The first time it modifies a node it copies it, and from then
/// on it owns the copy and modifies it in place. [`Transient::seal`] turns
/// the result back into a [`Vector`] without copying anything.
///
/// Once sealed, a transient can still be read but every modification fails
/// with [`Error::UsedAfterSeal`].
///
/// # Examples
///
/// ```rust
/// # use persistent_vector::{vector, Error};
/// let vec = vector![1, 2, 3];
/// let mut transient = vec.transient();
/// transient.push(4)?.push(5)?.set(0, 0)?;
/// assert_eq!(transient.seal()?, vector![0, 2, 3, 4, 5]);
/// assert_eq!(vec, vector![1, 2, 3]);
///
/// assert!(transient.push(6).is_err());
/// assert_eq!(transient.seal(), Err(Error::SealedTwice));
/// # Ok::<(), Error>(())
/// ```
// Not `Clone`: two copies would share a token, and each could then mutate
// nodes that the other can see.
#[derive(Debug)]
pub struct Transient<T, const N: usize = 32>
where
    Const<N>: ValidBranchingConstant,
{
    // The root is never the canonical empty branch here. Its tag is the
    // session's token while the transient is open, and `None` once sealed.
    trie: Trie<T, N>,
    // Unlike a vector's tail, this is never shared, so it's modified in place.
    tail: Leaf<T, N>,
}

impl<T: Clone, const N: usize> Transient<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    /// Starts a fresh session on `vector`, returning the session's token.
    pub(crate) fn open(vector: &Vector<T, N>) -> (Self, Edit) {
        let edit = Edit::mint();
        let mut trie = vector.trie.clone();
        fork_root(&mut trie.root, Some(edit));
        let tail = vector.tail.as_deref().cloned().unwrap_or_default();
        log::trace!("opened {edit:?} on a vector of size {}", trie.size);
        (Transient { trie, tail }, edit)
    }

    fn edit(&self, op: &'static str) -> Result<Edit> {
        self.trie
            .root
            .as_ref()
            .and_then(|root| root.edit())
            .ok_or(Error::UsedAfterSeal { op })
    }

    pub(crate) fn push_with(&mut self, edit: Edit, elt: T) {
        if self.trie.tail_len() < N {
            self.tail.push_back(elt);
        } else {
            let full = std::mem::replace(&mut self.tail, Chunk::unit(elt));
            self.trie.push_leaf(Some(edit), full);
        }
        self.trie.size += 1;
    }

    /// Adds an element at the end.
    pub fn push(&mut self, elt: T) -> Result<&mut Self> {
        let edit = self.edit("push")?;
        self.push_with(edit, elt);
        Ok(self)
    }

    /// Replaces the element at `idx`. As with [`Vector::set`], setting at
    /// `idx == self.len()` pushes.
    pub fn set(&mut self, idx: usize, elt: T) -> Result<&mut Self> {
        let edit = self.edit("set")?;
        match idx.cmp(&self.trie.size) {
            Ordering::Less if idx >= self.trie.tail_offset() => {
                self.tail.set(idx & (N - 1), elt);
            }
            Ordering::Less => self.trie.assoc(Some(edit), idx, elt),
            Ordering::Equal => self.push_with(edit, elt),
            Ordering::Greater => {
                return Err(Error::IndexOutOfBounds {
                    index: idx,
                    len: self.trie.size,
                })
            }
        }
        Ok(self)
    }

    /// Removes the last element.
    pub fn pop(&mut self) -> Result<&mut Self> {
        let edit = self.edit("pop")?;
        match self.trie.size {
            0 => return Err(Error::PopEmpty),
            1 => {
                self.tail.pop_back();
            }
            _ if self.trie.tail_len() > 1 => {
                self.tail.pop_back();
            }
            _ => self.tail = self.trie.pop_leaf(Some(edit)),
        }
        self.trie.size -= 1;
        Ok(self)
    }

    /// Ends the session, returning the modified vector.
    ///
    /// Fails if the transient was already sealed.
    pub fn seal(&mut self) -> Result<Vector<T, N>> {
        if self.is_sealed() {
            return Err(Error::SealedTwice);
        }
        Ok(self.freeze())
    }

    /// Seals an open transient.
    pub(crate) fn freeze(&mut self) -> Vector<T, N> {
        // expect: the root of a transient always exists.
        let root = self.trie.root.as_mut().expect("transient without a root");
        // The root is owned by the session, so this doesn't copy it.
        Arc::make_mut(root).set_edit(None);
        log::trace!("sealed a transient of size {}", self.trie.size);

        let mut trie = self.trie.clone();
        if trie.root.as_ref().is_some_and(|root| root.children().is_empty()) {
            trie.root = None;
        }
        Vector::with_tail(trie, self.tail.clone())
    }
}

impl<T, const N: usize> Transient<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    pub fn is_sealed(&self) -> bool {
        self.trie.root.as_ref().is_none_or(|root| root.edit().is_none())
    }

    pub fn len(&self) -> usize {
        self.trie.size
    }

    pub fn is_empty(&self) -> bool {
        self.trie.size == 0
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        (idx < self.len()).then(|| &self.trie.leaf_for(&self.tail, idx)[idx & (N - 1)])
    }

    pub fn peek(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }
}

impl<T: Clone, const N: usize> From<&Vector<T, N>> for Transient<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    fn from(vector: &Vector<T, N>) -> Self {
        Transient::open(vector).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    fn collect<const N: usize>(vec: &Vector<u32, N>) -> Vec<u32>
    where
        Const<N>: ValidBranchingConstant,
    {
        vec.iter().copied().collect()
    }

    #[test]
    fn push_then_seal() {
        let vec: Vector<u32, 4> = (0..3).collect();
        let mut transient = vec.transient();
        for i in 3..30 {
            transient.push(i).unwrap();
        }
        assert_eq!(transient.len(), 30);
        assert_eq!(transient.get(17), Some(&17));
        let sealed = transient.seal().unwrap();
        sealed.check_invariants();
        assert_eq!(collect(&sealed), (0..30).collect::<Vec<_>>());
        assert_eq!(collect(&vec), vec![0, 1, 2]);
    }

    #[test]
    fn source_is_untouched() {
        let vec: Vector<u32, 4> = (0..40).collect();
        let mut transient = vec.transient();
        for i in 0..40 {
            transient.set(i as usize, i * 10).unwrap();
        }
        transient.pop().unwrap().pop().unwrap();
        let sealed = transient.seal().unwrap();
        sealed.check_invariants();

        assert_eq!(collect(&vec), (0..40).collect::<Vec<_>>());
        assert_eq!(
            collect(&sealed),
            (0..38).map(|i| i * 10).collect::<Vec<_>>()
        );
    }

    #[test]
    fn repeated_sets_reuse_owned_nodes() {
        let vec: Vector<u32, 4> = (0..40).collect();
        let mut transient = vec.transient();
        transient.set(1, 100).unwrap();
        let leaf: *const Node<u32, 4> = transient.trie.trie_leaf(1);
        transient.set(2, 200).unwrap();
        assert_eq!(transient.trie.trie_leaf(2) as *const _, leaf);
        assert_eq!(transient.get(1), Some(&100));
        assert_eq!(transient.get(2), Some(&200));
        assert_eq!(vec.get(1), Some(&1));
    }

    #[test]
    fn pop_shrinks_depth() {
        let vec: Vector<u32, 4> = (0..21).collect();
        assert_eq!(vec.trie.shift, 4);
        let mut transient = vec.transient();
        transient.pop().unwrap();
        assert_eq!(transient.trie.shift, 2);
        assert!(!transient.is_sealed());
        let sealed = transient.seal().unwrap();
        sealed.check_invariants();
        assert_eq!(collect(&sealed), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn pop_to_empty_and_refill() {
        let vec: Vector<u32, 4> = (0..9).collect();
        let mut transient = vec.transient();
        while !transient.is_empty() {
            transient.pop().unwrap();
        }
        assert_eq!(transient.pop().unwrap_err(), Error::PopEmpty);
        transient.push(7).unwrap();
        let sealed = transient.seal().unwrap();
        sealed.check_invariants();
        assert_eq!(collect(&sealed), vec![7]);
    }

    #[test]
    fn set_out_of_bounds() {
        let vec: Vector<u32, 4> = (0..4).collect();
        let mut transient = vec.transient();
        assert_eq!(
            transient.set(9, 0).unwrap_err(),
            Error::IndexOutOfBounds { index: 9, len: 4 }
        );
        transient.set(4, 4).unwrap();
        assert_eq!(transient.peek(), Some(&4));
    }

    #[test]
    fn sealed_transients_reject_writes() {
        let mut transient = Vector::<u32, 4>::new().transient();
        transient.push(1).unwrap();
        let sealed = transient.seal().unwrap();
        assert!(transient.is_sealed());

        assert_eq!(
            transient.push(2).unwrap_err(),
            Error::UsedAfterSeal { op: "push" }
        );
        assert_eq!(
            transient.pop().unwrap_err(),
            Error::UsedAfterSeal { op: "pop" }
        );
        assert_eq!(
            transient.set(0, 2).unwrap_err(),
            Error::UsedAfterSeal { op: "set" }
        );
        assert_eq!(transient.seal().unwrap_err(), Error::SealedTwice);

        // Reads still see the sealed contents.
        assert_eq!(transient.get(0), Some(&1));
        assert_eq!(collect(&sealed), vec![1]);
    }

    #[test]
    fn sealed_vector_can_start_a_new_session() {
        let mut first = Vector::<u32, 4>::new().transient();
        for i in 0..20 {
            first.push(i).unwrap();
        }
        let sealed = first.seal().unwrap();

        let mut second = sealed.transient();
        second.set(0, 99).unwrap();
        let resealed = second.seal().unwrap();
        assert_eq!(sealed.get(0), Some(&0));
        assert_eq!(resealed.get(0), Some(&99));
    }
}
