/// Ways in which a vector operation can be misused.
///
/// Reads never fail (they return `None` instead), so every variant here is
/// raised by a write.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// `set` was given an index past the end. `len` is the largest index
    /// that would have been accepted, since setting at `len` appends.
    #[error("index {index} is out of bounds [0, {len}]")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("cannot pop empty vector")]
    PopEmpty,

    /// A transient was mutated after being sealed.
    #[error("{op} called after seal")]
    UsedAfterSeal { op: &'static str },

    #[error("seal called twice")]
    SealedTwice,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
