//! This crate exposes an ordered, self-balancing Binary Search Tree (BST) with lazy removal,
//! layered over a plain binary tree.
//!
//! ## Binary Search Tree
//!
//! A Binary Search Tree is a data structure supporting operations to insert, find, and delete
//! stored records. BSTs are typically defined recursively using the notion of a `Node`. A `Node`
//! will typically store some sort of value (the value that was inserted, for example) and will
//! sometimes have child `Node`s. The most important invariants of a BST are:
//!
//! 1. For every `Node` in a BST, all the `Node`s in its left subtree have a value less than its
//!    own value.
//! 2. For every `Node` in a BST, all the `Node`s in its right subtree have a value greater than
//!    its own value.
//!
//! Searching takes `O(height)`. The [`avltree::AvlTree`] keeps the height at `O(lg N)` by
//! tracking, on every node, which of its subtrees is taller and rotating nodes whenever the two
//! would differ by more than one level.
//!
//! ## Layers
//!
//! - [`btree::BinaryTree`] owns the nodes. It attaches and detaches children, walks the tree in
//!   pre-, in-, or postorder, and counts nodes, without knowing anything about ordering.
//! - [`avltree::AvlTree`] orders payloads with a user supplied comparator, keeps the tree
//!   balanced, and removes entries by hiding them. A hidden entry keeps its node until an equal
//!   payload is inserted again or the tree is rebuilt with [`avltree::AvlTree::compact`].
//!
//! Both layers take a [`btree::Callbacks`] holding the comparator and an optional destructor that
//! is handed every payload exactly once when its node is freed.

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

pub mod avltree;
pub mod btree;
mod error;

pub use error::{Error, InsertError, Result};

#[cfg(test)]
mod test;
