//! Copy-on-write edits along the rightmost spine (or a single root-to-leaf
//! path) of a trie.
//!
//! Every function here takes the edit tag of its caller. Immutable vectors
//! pass `None`, so each node on the path is cloned exactly once and every
//! sibling subtree is shared. A transient passes its session token, so nodes
//! it already owns are mutated in place and foreign ones are claimed on first
//! touch.

use std::sync::Arc;

use imbl_sized_chunks::Chunk;

use crate::{
    node::{bits, child_index, fork, fork_root, new_path, Edit, Leaf, Node},
    trie::Trie,
    Const, ValidBranchingConstant,
};

impl<T: Clone, const N: usize> Trie<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    /// Moves a full tail into the trie.
    ///
    /// `data` holds the elements `[size - N, size)`. The caller is
    /// responsible for updating `size` and installing the new tail.
    pub(crate) fn push_leaf(&mut self, edit: Option<Edit>, data: Leaf<T, N>) {
        debug_assert_eq!(data.len(), N);
        let leaf = Arc::new(Node::leaf(edit, data));

        if (self.size >> bits::<N>()) > (1 << self.shift) {
            // The root is full at this depth, so the new leaf goes in a fresh
            // right sibling of the old root.
            // expect: a full root has children, so it isn't the empty branch.
            let old_root = self.root.take().expect("full root is empty");
            let mut children = Chunk::new();
            children.push_back(old_root);
            children.push_back(new_path(edit, self.shift, leaf));
            self.root = Some(Arc::new(Node::branch(edit, children)));
            self.shift += bits::<N>();
            log::trace!("trie grew to shift {} at size {}", self.shift, self.size);
        } else {
            let shift = self.shift;
            push_tail(fork_root(&mut self.root, edit), edit, shift, self.size - 1, leaf);
        }
    }

    /// Removes the rightmost trie leaf and returns its elements, which become
    /// the new tail.
    ///
    /// Only valid when the tail holds a single element and the trie isn't
    /// empty. The caller is responsible for updating `size`.
    pub(crate) fn pop_leaf(&mut self, edit: Option<Edit>) -> Leaf<T, N> {
        debug_assert_eq!(self.tail_len(), 1);
        let shift = self.shift;
        let idx = self.size - 2;
        let (leaf, emptied) = pop_tail(fork_root(&mut self.root, edit), edit, shift, idx);

        if emptied {
            // Only a single-level trie can run out of children. A transient
            // keeps its (owned, now empty) root because the root carries the
            // session's token.
            if edit.is_none() {
                self.root = None;
            }
        } else if self.shift > bits::<N>() {
            // expect: we forked the root above.
            let root = self.root.as_mut().expect("forked root is missing");
            if root.children().len() == 1 {
                let mut child = Arc::make_mut(root).children_mut().pop_back();
                if edit.is_some() {
                    fork(&mut child, edit);
                }
                *root = child;
                self.shift -= bits::<N>();
                log::trace!("trie shrank to shift {} at size {}", self.shift, self.size);
            }
        }

        Node::into_data(leaf)
    }

    /// Replaces the element at `idx`, which must be below the tail offset.
    pub(crate) fn assoc(&mut self, edit: Option<Edit>, idx: usize, value: T) {
        debug_assert!(idx < self.tail_offset());
        let shift = self.shift;
        assoc_path(fork_root(&mut self.root, edit), edit, shift, idx, value);
    }
}

/// Inserts `leaf` below `node` (at `level`) so that it ends up holding `idx`,
/// which is the last index of the leaf.
fn push_tail<T: Clone, const N: usize>(
    node: &mut Node<T, N>,
    edit: Option<Edit>,
    level: u32,
    idx: usize,
    leaf: Arc<Node<T, N>>,
) where
    Const<N>: ValidBranchingConstant,
{
    let children = node.children_mut();
    let bucket_idx = child_index::<N>(idx, level);
    if level == bits::<N>() {
        debug_assert_eq!(bucket_idx, children.len());
        children.push_back(leaf);
    } else if bucket_idx < children.len() {
        let child = fork(&mut children[bucket_idx], edit);
        push_tail(child, edit, level - bits::<N>(), idx, leaf);
    } else {
        children.push_back(new_path(edit, level - bits::<N>(), leaf));
    }
}

/// Unlinks the leaf holding `idx` (the rightmost one) from below `node`.
///
/// Returns the leaf, and whether `node` was left without children.
fn pop_tail<T: Clone, const N: usize>(
    node: &mut Node<T, N>,
    edit: Option<Edit>,
    level: u32,
    idx: usize,
) -> (Arc<Node<T, N>>, bool)
where
    Const<N>: ValidBranchingConstant,
{
    let children = node.children_mut();
    let bucket_idx = child_index::<N>(idx, level);
    debug_assert_eq!(bucket_idx + 1, children.len());
    if level > bits::<N>() {
        let child = fork(&mut children[bucket_idx], edit);
        let (leaf, child_emptied) = pop_tail(child, edit, level - bits::<N>(), idx);
        if child_emptied {
            children.pop_back();
        }
        (leaf, children.is_empty())
    } else {
        let leaf = children.pop_back();
        (leaf, children.is_empty())
    }
}

fn assoc_path<T: Clone, const N: usize>(
    node: &mut Node<T, N>,
    edit: Option<Edit>,
    level: u32,
    idx: usize,
    value: T,
) where
    Const<N>: ValidBranchingConstant,
{
    match node {
        Node::Leaf { data, .. } => {
            debug_assert_eq!(level, 0);
            data.set(idx & (N - 1), value);
        }
        Node::Branch { children, .. } => {
            let child = fork(&mut children[child_index::<N>(idx, level)], edit);
            assoc_path(child, edit, level - bits::<N>(), idx, value);
        }
    }
}
