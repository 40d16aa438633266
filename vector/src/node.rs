//! Trie nodes and the edit tokens that say who may mutate them.
//!
//! Every node carries an edit tag. A frozen node (tag `None`) belongs to
//! some published [`Vector`](crate::Vector) and is only ever cloned. A node
//! tagged with an [`Edit`] was created by the [`Transient`](crate::Transient)
//! session holding that token, and that session alone may mutate it in place.

use std::{
    num::NonZeroU64,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use imbl_sized_chunks::Chunk;

use crate::{Const, ValidBranchingConstant};

pub(crate) type Leaf<T, const N: usize> = Chunk<T, N>;
pub(crate) type Children<T, const N: usize> = Chunk<Arc<Node<T, N>>, N>;

static NEXT_EDIT: AtomicU64 = AtomicU64::new(1);

/// The identity of one batched-mutation session.
///
/// Tokens are never reused, so a node tagged by a session that has since been
/// sealed can never be claimed by a later one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Edit(NonZeroU64);

impl Edit {
    pub(crate) fn mint() -> Self {
        let id = NEXT_EDIT.fetch_add(1, Ordering::Relaxed);
        // expect: a u64 counter incremented once per session doesn't wrap.
        Edit(NonZeroU64::new(id).expect("edit token counter overflowed"))
    }
}

/// The number of index bits consumed by one trie level.
pub(crate) fn bits<const N: usize>() -> u32 {
    N.ilog2()
}

/// Which child of a node at `level` does the global index `idx` belong to?
///
/// `level` is measured in bits, so leaves are at level zero and their parents
/// at level `bits::<N>()`.
pub(crate) fn child_index<const N: usize>(idx: usize, level: u32) -> usize {
    (idx >> level) & (N - 1)
}

// Branches only ever hold branches or only ever hold leaves, depending on
// their level. We could encode that in the types, but the level is always
// known at the traversal site so an `unreachable!` on the wrong variant is
// enough.
#[derive(Debug, Clone)]
pub(crate) enum Node<T, const N: usize> {
    Branch {
        edit: Option<Edit>,
        children: Children<T, N>,
    },
    Leaf {
        edit: Option<Edit>,
        data: Leaf<T, N>,
    },
}

impl<T, const N: usize> Node<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    pub(crate) fn branch(edit: Option<Edit>, children: Children<T, N>) -> Self {
        Node::Branch { edit, children }
    }

    pub(crate) fn leaf(edit: Option<Edit>, data: Leaf<T, N>) -> Self {
        Node::Leaf { edit, data }
    }

    pub(crate) fn empty_branch(edit: Option<Edit>) -> Self {
        Node::branch(edit, Chunk::new())
    }

    pub(crate) fn edit(&self) -> Option<Edit> {
        match self {
            Node::Branch { edit, .. } | Node::Leaf { edit, .. } => *edit,
        }
    }

    pub(crate) fn set_edit(&mut self, new_edit: Option<Edit>) {
        match self {
            Node::Branch { edit, .. } | Node::Leaf { edit, .. } => *edit = new_edit,
        }
    }

    /// Is this node owned by the session holding `edit`?
    ///
    /// Frozen nodes are owned by nobody, not even a frozen caller.
    pub(crate) fn is_owned_by(&self, edit: Option<Edit>) -> bool {
        edit.is_some() && self.edit() == edit
    }

    pub(crate) fn children(&self) -> &Children<T, N> {
        let Node::Branch { children, .. } = self else {
            unreachable!("expected a branch node");
        };
        children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children<T, N> {
        let Node::Branch { children, .. } = self else {
            unreachable!("expected a branch node");
        };
        children
    }

    pub(crate) fn data(&self) -> &Leaf<T, N> {
        let Node::Leaf { data, .. } = self else {
            unreachable!("expected a leaf node");
        };
        data
    }
}

impl<T: Clone, const N: usize> Node<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    /// A shallow copy of this node carrying a different tag. Branch children
    /// are shared, not copied.
    pub(crate) fn clone_with(&self, edit: Option<Edit>) -> Self {
        match self {
            Node::Branch { children, .. } => Node::branch(edit, children.clone()),
            Node::Leaf { data, .. } => Node::leaf(edit, data.clone()),
        }
    }

    /// Takes the elements out of a leaf that has just been unlinked from a
    /// trie, copying them only if some other trie still points at it.
    pub(crate) fn into_data(node: Arc<Self>) -> Leaf<T, N> {
        let Node::Leaf { data, .. } = Arc::unwrap_or_clone(node) else {
            unreachable!("expected a leaf node");
        };
        data
    }
}

/// Makes `slot` safe to mutate on behalf of `edit` and returns the node it
/// points to.
///
/// If `edit` already owns the node, this is a no-op. Otherwise the node is
/// replaced by a shallow clone tagged with `edit`; passing `None` therefore
/// always clones, which is what the immutable operations want.
pub(crate) fn fork<T: Clone, const N: usize>(
    slot: &mut Arc<Node<T, N>>,
    edit: Option<Edit>,
) -> &mut Node<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    if !slot.is_owned_by(edit) {
        *slot = Arc::new(slot.clone_with(edit));
    }
    // An owned node is only reachable from the session's own trie, so this
    // doesn't clone.
    Arc::make_mut(slot)
}

/// Like [`fork`], but for a root that may be the canonical empty branch
/// (`None`), which is never mutated: forking it always allocates.
pub(crate) fn fork_root<T: Clone, const N: usize>(
    root: &mut Option<Arc<Node<T, N>>>,
    edit: Option<Edit>,
) -> &mut Node<T, N>
where
    Const<N>: ValidBranchingConstant,
{
    match root {
        Some(node) => fork(node, edit),
        None => Arc::make_mut(root.insert(Arc::new(Node::empty_branch(edit)))),
    }
}

/// Wraps `node` in single-child branches until it sits at `level`.
pub(crate) fn new_path<T, const N: usize>(
    edit: Option<Edit>,
    level: u32,
    node: Arc<Node<T, N>>,
) -> Arc<Node<T, N>>
where
    Const<N>: ValidBranchingConstant,
{
    let mut node = node;
    let mut level = level;
    while level > 0 {
        let mut children = Chunk::new();
        children.push_back(node);
        node = Arc::new(Node::branch(edit, children));
        level -= bits::<N>();
    }
    node
}
