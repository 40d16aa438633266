//! The indexed part of a vector: everything except the tail.

use std::sync::Arc;

use crate::{
    node::{bits, child_index, Node},
    Const, ValidBranchingConstant,
};

/// Index of the first element that lives in the tail rather than the trie.
///
/// Always a multiple of `N`, so that the position of index `i` inside the
/// tail is `i & (N - 1)`.
pub(crate) fn tail_offset<const N: usize>(size: usize) -> usize {
    if size < N {
        0
    } else {
        ((size - 1) >> bits::<N>()) << bits::<N>()
    }
}

/// Size, depth and root of a vector's trie.
///
/// `shift` is the level (in bits) of the root, so the root's children are
/// leaves when `shift == bits::<N>()`. The root is always a branch; `None`
/// stands for the canonical empty branch, which has no node of its own.
#[derive(Debug)]
pub(crate) struct Trie<T, const N: usize> {
    pub(crate) size: usize,
    pub(crate) shift: u32,
    pub(crate) root: Option<Arc<Node<T, N>>>,
}

// Not derived, because deriving would require `T: Clone`.
impl<T, const N: usize> Clone for Trie<T, N> {
    fn clone(&self) -> Self {
        Trie {
            size: self.size,
            shift: self.shift,
            root: self.root.clone(),
        }
    }
}

impl<T, const N: usize> Trie<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    pub(crate) const fn new() -> Self {
        Trie {
            size: 0,
            shift: N.ilog2(),
            root: None,
        }
    }

    pub(crate) fn tail_offset(&self) -> usize {
        tail_offset::<N>(self.size)
    }

    /// How many elements of this vector are in the tail.
    pub(crate) fn tail_len(&self) -> usize {
        self.size - self.tail_offset()
    }

    /// The elements of the leaf holding `idx`, which is either a trie leaf or
    /// `tail`.
    ///
    /// `idx` must be less than `size`.
    pub(crate) fn leaf_for<'a>(&'a self, tail: &'a [T], idx: usize) -> &'a [T] {
        debug_assert!(idx < self.size);
        if idx >= self.tail_offset() {
            tail
        } else {
            self.trie_leaf(idx).data().as_slice()
        }
    }

    /// The trie leaf holding `idx`, which must be less than the tail offset.
    pub(crate) fn trie_leaf(&self, idx: usize) -> &Node<T, N> {
        // expect: there are trie elements, so the root isn't the empty branch.
        let mut node = self.root.as_deref().expect("empty trie");
        let mut level = self.shift;
        while level > 0 {
            node = &node.children()[child_index::<N>(idx, level)];
            level -= bits::<N>();
        }
        node
    }

    /// Checks left-packing, minimal depth and the element count below the
    /// root.
    pub(crate) fn check_invariants(&self) {
        fn packed_len<T, const N: usize>(
            node: &Node<T, N>,
            level: u32,
            rightmost: bool,
        ) -> usize
        where
            Const<N>: ValidBranchingConstant,
        {
            match node {
                Node::Leaf { data, .. } => {
                    assert_eq!(level, 0, "leaf above level zero");
                    assert_eq!(data.len(), N, "trie leaves must be full");
                    data.len()
                }
                Node::Branch { children, .. } => {
                    assert!(level > 0, "branch at level zero");
                    assert!(!children.is_empty(), "empty branch below the root");
                    let last = children.len() - 1;
                    let mut len = 0;
                    for (i, child) in children.iter().enumerate() {
                        let is_last = rightmost && i == last;
                        let child_len = packed_len(child, level - bits::<N>(), is_last);
                        if !is_last {
                            assert_eq!(child_len, 1usize << level, "subtree isn't full");
                        }
                        len += child_len;
                    }
                    len
                }
            }
        }

        assert!(self.shift >= bits::<N>());
        assert_eq!(self.shift % bits::<N>(), 0);
        let trie_len = match &self.root {
            None => 0,
            Some(root) => {
                let Node::Branch { children, .. } = root.as_ref() else {
                    panic!("the root must be a branch");
                };
                if self.shift > bits::<N>() {
                    assert!(children.len() > 1, "the trie is deeper than necessary");
                }
                if children.is_empty() {
                    0
                } else {
                    packed_len(root, self.shift, true)
                }
            }
        };
        assert_eq!(trie_len, self.tail_offset());
    }
}
