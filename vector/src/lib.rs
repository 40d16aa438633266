//! A persistent vector with batched in-place updates.
//!
//! [`Vector`] is a persistent vector (also known as a "bitmapped vector trie"),
//! as described [here](https://hypirion.com/musings/understanding-persistent-vector-pt-1).
//! Every modification returns a new vector sharing all the untouched structure
//! of the old one, so old versions stay valid and clones are cheap.
//!
//! [`Transient`] is a short-lived, exclusively owned view of a vector that
//! modifies nodes in place once it has copied them. It's the fast way to make
//! many modifications at once (and it's what [`FromIterator`] and [`Extend`]
//! use under the hood).
//!
//! ```rust
//! use persistent_vector::{vector, Vector};
//!
//! let v1: Vector<u32> = (0..90).collect();
//! let v2 = v1.set(0, 100).unwrap();
//! assert_eq!(v1.get(0), Some(&0));
//! assert_eq!(v2.get(0), Some(&100));
//! assert_eq!(v1.get(1), v2.get(1));
//!
//! let mut t = vector![1, 2, 3].transient();
//! t.push(4).unwrap().push(5).unwrap();
//! assert_eq!(t.seal().unwrap(), vector![1, 2, 3, 4, 5]);
//! ```

// Not yet implemented (do we need them?)
// - insertion and deletion away from the end
// - slicing

pub mod error;
pub mod iter;
mod node;
mod path;
pub mod transient;
mod trie;
pub mod vector;

/// [`Vector`] takes a "branching factor" parameter, which must be a
/// reasonably-sized power of two. We use this trait to enforce that.
pub trait ValidBranchingConstant {}
pub struct Const<const N: usize> {}

impl ValidBranchingConstant for Const<2> {}
impl ValidBranchingConstant for Const<4> {}
impl ValidBranchingConstant for Const<8> {}
impl ValidBranchingConstant for Const<16> {}
impl ValidBranchingConstant for Const<32> {}
impl ValidBranchingConstant for Const<64> {}
impl ValidBranchingConstant for Const<128> {}

pub use error::{Error, Result};
pub use iter::{Entries, Iter};
pub use transient::Transient;
pub use vector::Vector;

/// Builds a [`Vector`] (with the default branching factor) from its elements.
///
/// ```rust
/// # use persistent_vector::vector;
/// let v = vector!["a", "b", "c"];
/// assert_eq!(v.get(1), Some(&"b"));
/// assert!(vector![] == persistent_vector::Vector::<u8>::new());
/// ```
#[macro_export]
macro_rules! vector {
    () => {
        $crate::Vector::<_>::new()
    };
    ($($elt:expr),+ $(,)?) => {
        $crate::Vector::<_>::from([$($elt),+])
    };
}
