//! Errors returned by the tree operations.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result type alias using our [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong when building or querying a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The node arena could not grow to hold another node. The tree is left as it was.
    #[error("failed to allocate a tree node: {0}")]
    Allocation(#[from] TryReserveError),

    /// A visible node with an equal key already exists.
    #[error("key is already present in the tree")]
    DuplicateKey,

    /// No visible node matches the key.
    #[error("key not found")]
    NotFound,

    /// The tree was built without a comparison function.
    #[error("tree has no comparison function")]
    NoComparator,

    /// The child slot already holds a subtree.
    #[error("child slot is already occupied")]
    SlotOccupied,

    /// The handle does not name a live node (it was freed, or the tree is empty).
    #[error("node handle does not refer to a live node")]
    StaleNode,
}

/// A failed insertion. The payload was never handed to the tree, so it comes back to the caller
/// along with the reason.
///
/// # Examples
///
/// ```
/// use avltree::avltree::AvlTree;
/// use avltree::Error;
///
/// let mut tree = AvlTree::new(1).unwrap();
/// let rejected = tree.insert(1).unwrap_err();
///
/// assert_eq!(rejected.error(), &Error::DuplicateKey);
/// assert_eq!(rejected.into_payload(), 1);
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct InsertError<T> {
    error: Error,
    payload: T,
}

impl<T> InsertError<T> {
    pub(crate) fn new(error: Error, payload: T) -> Self {
        Self { error, payload }
    }

    /// Why the insertion failed.
    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Takes back the payload that was not inserted.
    pub fn into_payload(self) -> T {
        self.payload
    }

    /// Splits into the reason and the payload.
    pub fn into_parts(self) -> (Error, T) {
        (self.error, self.payload)
    }
}

impl<T> From<InsertError<T>> for Error {
    fn from(err: InsertError<T>) -> Self {
        err.error
    }
}
