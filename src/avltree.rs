//! A self-balancing (AVL) ordered tree built on top of [`crate::btree::BinaryTree`].
//!
//! Payloads are ordered by the tree's comparator, so a payload is its own key. Removal is
//! logical: [`AvlTree::hide`] marks a node as a tombstone without touching the shape of the tree,
//! and inserting an equal payload later revives that node in place.
//!
//! # Examples
//!
//! ```
//! use avltree::avltree::AvlTree;
//! use avltree::Error;
//!
//! let mut tree = AvlTree::new(5).unwrap();
//! tree.insert(3).unwrap();
//! tree.insert(8).unwrap();
//!
//! assert_eq!(tree.find(&3), Ok(&3));
//! assert_eq!(tree.insert(3).unwrap_err().error(), &Error::DuplicateKey);
//!
//! // Hiding keeps the node around but makes it invisible.
//! tree.hide(&3).unwrap();
//! assert_eq!(tree.find(&3), Err(Error::NotFound));
//! assert_eq!(tree.size(), 3);
//! assert_eq!(tree.active_count(), 2);
//!
//! // Inserting it again revives the same node.
//! tree.insert(3).unwrap();
//! assert_eq!(tree.find(&3), Ok(&3));
//! assert_eq!(tree.size(), 3);
//! ```

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::btree::{BinaryTree, Callbacks, InsertResult, NodeId, Order};
use crate::error::{Error, InsertError, Result};

/// Which subtree of a node is taller. The heights of the two subtrees never differ by more than
/// one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Balance {
    /// The left subtree is one level taller.
    LeftHeavy,
    /// Both subtrees have the same height.
    #[default]
    Balanced,
    /// The right subtree is one level taller.
    RightHeavy,
}

/// The bookkeeping an [`AvlTree`] keeps on every node of its [`BinaryTree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AvlTag {
    balance: Balance,
    hidden: bool,
}

impl AvlTag {
    /// Which subtree of the node is taller.
    pub fn balance(&self) -> Balance {
        self.balance
    }

    /// Whether the node has been logically removed.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

/// Whether a subtree got taller while inserting into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Growth {
    Taller,
    Unchanged,
}

/// A self-balancing Binary Search Tree (specifically, an AVL tree) with tombstone removal.
///
/// [`AvlTree::size`] counts every node in the tree, hidden or not. [`AvlTree::active_count`]
/// counts only the visible ones.
pub struct AvlTree<T> {
    tree: BinaryTree<T, AvlTag>,
    /// How many nodes are currently tombstones.
    hidden: usize,
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvlTree")
            .field("size", &self.size())
            .field("hidden", &self.hidden)
            .field("tree", &self.tree)
            .finish()
    }
}

impl<T> AvlTree<T> {
    /// Creates a tree holding `root`, ordered by `T`'s [`Ord`] implementation.
    pub fn new(root: T) -> Result<Self>
    where
        T: Ord + 'static,
    {
        Self::init(root, Callbacks::ordered())
    }

    /// Creates a tree holding `root` with the given comparator and destructor. Fails with
    /// [`Error::NoComparator`] when `callbacks` has no comparator.
    ///
    /// # Examples
    ///
    /// ```
    /// use avltree::avltree::AvlTree;
    /// use avltree::btree::Callbacks;
    ///
    /// // Order (key, value) pairs by key only.
    /// let callbacks = Callbacks::new().with_compare(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
    /// let mut tree = AvlTree::init((1, 'a'), callbacks).unwrap();
    /// tree.insert((2, 'b')).unwrap();
    ///
    /// assert_eq!(tree.find(&(2, ' ')), Ok(&(2, 'b')));
    /// ```
    pub fn init(root: T, callbacks: Callbacks<T>) -> Result<Self> {
        if !callbacks.has_comparator() {
            return Err(Error::NoComparator);
        }
        Ok(Self {
            tree: BinaryTree::init(root, callbacks)?,
            hidden: 0,
        })
    }

    /// Inserts `payload` into the tree.
    ///
    /// Fails with [`Error::DuplicateKey`] if a visible node compares equal to it. If a hidden node
    /// compares equal, that node is revived: its old payload is destroyed and replaced with
    /// `payload`, and the shape of the tree does not change. When insertion fails the tree is
    /// left exactly as it was and `payload` comes back inside the [`InsertError`].
    ///
    /// # Examples
    ///
    /// ```
    /// use avltree::avltree::AvlTree;
    ///
    /// let mut tree = AvlTree::new(String::from("a")).unwrap();
    ///
    /// // Rejected, but the string isn't lost.
    /// let payload = tree.insert(String::from("a")).unwrap_err().into_payload();
    /// tree.hide(&payload).unwrap();
    /// tree.insert(payload).unwrap();
    /// ```
    pub fn insert(&mut self, payload: T) -> InsertResult<(), T> {
        let Some(root) = self.tree.root() else {
            self.tree.plant(payload)?;
            return Ok(());
        };

        let (new_root, _) = self.insert_at(root, payload)?;
        if new_root != root {
            self.tree.set_root(new_root);
        }
        Ok(())
    }

    /// Inserts into the subtree rooted at `id`, returning the (possibly new) root of that subtree
    /// and whether it got taller. Balances are only touched once the recursive call has
    /// succeeded so a failed insert leaves everything as it was.
    fn insert_at(&mut self, id: NodeId, payload: T) -> InsertResult<(NodeId, Growth), T> {
        let ordering = match self.compare_at(&payload, id) {
            Ok(ordering) => ordering,
            Err(error) => return Err(InsertError::new(error, payload)),
        };
        match ordering {
            Ordering::Less => {
                let growth = match self.tree.left(id) {
                    None => {
                        self.tree.attach_left(id, payload)?;
                        Growth::Taller
                    }
                    Some(left) => {
                        let (new_left, growth) = self.insert_at(left, payload)?;
                        if new_left != left {
                            self.tree.set_left(id, Some(new_left));
                        }
                        growth
                    }
                };
                Ok(self.left_grew(id, growth))
            }
            Ordering::Equal => {
                self.revive(id, payload)?;
                Ok((id, Growth::Unchanged))
            }
            Ordering::Greater => {
                let growth = match self.tree.right(id) {
                    None => {
                        self.tree.attach_right(id, payload)?;
                        Growth::Taller
                    }
                    Some(right) => {
                        let (new_right, growth) = self.insert_at(right, payload)?;
                        if new_right != right {
                            self.tree.set_right(id, Some(new_right));
                        }
                        growth
                    }
                };
                Ok(self.right_grew(id, growth))
            }
        }
    }

    fn left_grew(&mut self, id: NodeId, growth: Growth) -> (NodeId, Growth) {
        if growth == Growth::Unchanged {
            return (id, Growth::Unchanged);
        }
        match self.balance(id) {
            Balance::RightHeavy => {
                self.set_balance(id, Balance::Balanced);
                (id, Growth::Unchanged)
            }
            Balance::Balanced => {
                self.set_balance(id, Balance::LeftHeavy);
                (id, Growth::Taller)
            }
            Balance::LeftHeavy => (self.rotate_left(id), Growth::Unchanged),
        }
    }

    fn right_grew(&mut self, id: NodeId, growth: Growth) -> (NodeId, Growth) {
        if growth == Growth::Unchanged {
            return (id, Growth::Unchanged);
        }
        match self.balance(id) {
            Balance::LeftHeavy => {
                self.set_balance(id, Balance::Balanced);
                (id, Growth::Unchanged)
            }
            Balance::Balanced => {
                self.set_balance(id, Balance::RightHeavy);
                (id, Growth::Taller)
            }
            Balance::RightHeavy => (self.rotate_right(id), Growth::Unchanged),
        }
    }

    /// Rebalances `id` after its left subtree grew two levels taller than its right one and
    /// returns the new root of the subtree.
    ///
    /// # Diagram
    ///
    /// When the left child leans left a single rotation is enough:
    ///
    /// ```text
    ///        id               left
    ///       /  \              /  \
    ///     left  z    ->      x    id
    ///     /  \                   /  \
    ///    x    y                 y    z
    /// ```
    ///
    /// When it leans right its right child (the grandchild) is promoted instead:
    ///
    /// ```text
    ///        id                 grand
    ///       /  \               /     \
    ///    left   z    ->     left      id
    ///    /  \               /  \     /  \
    ///   w  grand           w    x   y    z
    ///      /  \
    ///     x    y
    /// ```
    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let left = self.tree.left(id).expect("left-heavy node => left child");

        match self.balance(left) {
            Balance::LeftHeavy => {
                log::trace!("single rotation at {:?}", id);
                let inner = self.tree.set_right(left, None);
                self.tree.set_left(id, inner);
                self.tree.set_right(left, Some(id));

                self.set_balance(id, Balance::Balanced);
                self.set_balance(left, Balance::Balanced);
                left
            }
            balance => {
                // Inserting never leaves the left child balanced here.
                debug_assert_eq!(balance, Balance::RightHeavy);
                log::trace!("double rotation at {:?}", id);
                let grand = self.tree.right(left).expect("right-heavy node => right child");

                let inner_left = self.tree.set_left(grand, None);
                let inner_right = self.tree.set_right(grand, None);
                self.tree.set_right(left, inner_left);
                self.tree.set_left(id, inner_right);
                self.tree.set_left(grand, Some(left));
                self.tree.set_right(grand, Some(id));

                let (id_balance, left_balance) = match self.balance(grand) {
                    Balance::LeftHeavy => (Balance::RightHeavy, Balance::Balanced),
                    Balance::Balanced => (Balance::Balanced, Balance::Balanced),
                    Balance::RightHeavy => (Balance::Balanced, Balance::LeftHeavy),
                };
                self.set_balance(id, id_balance);
                self.set_balance(left, left_balance);
                self.set_balance(grand, Balance::Balanced);
                grand
            }
        }
    }

    /// Mirror image of [`AvlTree::rotate_left`], used when the right subtree grew too tall.
    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let right = self.tree.right(id).expect("right-heavy node => right child");

        match self.balance(right) {
            Balance::RightHeavy => {
                log::trace!("single rotation at {:?}", id);
                let inner = self.tree.set_left(right, None);
                self.tree.set_right(id, inner);
                self.tree.set_left(right, Some(id));

                self.set_balance(id, Balance::Balanced);
                self.set_balance(right, Balance::Balanced);
                right
            }
            balance => {
                debug_assert_eq!(balance, Balance::LeftHeavy);
                log::trace!("double rotation at {:?}", id);
                let grand = self.tree.left(right).expect("left-heavy node => left child");

                let inner_left = self.tree.set_left(grand, None);
                let inner_right = self.tree.set_right(grand, None);
                self.tree.set_left(right, inner_right);
                self.tree.set_right(id, inner_left);
                self.tree.set_right(grand, Some(right));
                self.tree.set_left(grand, Some(id));

                let (id_balance, right_balance) = match self.balance(grand) {
                    Balance::RightHeavy => (Balance::LeftHeavy, Balance::Balanced),
                    Balance::Balanced => (Balance::Balanced, Balance::Balanced),
                    Balance::LeftHeavy => (Balance::Balanced, Balance::RightHeavy),
                };
                self.set_balance(id, id_balance);
                self.set_balance(right, right_balance);
                self.set_balance(grand, Balance::Balanced);
                grand
            }
        }
    }

    /// Brings a hidden node back with a new payload.
    fn revive(&mut self, id: NodeId, payload: T) -> InsertResult<(), T> {
        let tag = match self.tree.meta_mut(id) {
            Some(tag) => tag,
            None => return Err(InsertError::new(Error::StaleNode, payload)),
        };
        if !tag.hidden {
            return Err(InsertError::new(Error::DuplicateKey, payload));
        }
        tag.hidden = false;
        self.hidden -= 1;

        if let Some(old) = self.tree.replace_payload(id, payload) {
            self.tree.dispose(old);
        }
        log::debug!("revived hidden node {:?}", id);
        Ok(())
    }

    /// Logically removes the node matching `key`. The node stays in the tree (and in
    /// [`AvlTree::size`]) and its payload is kept until the node is revived or the tree is torn
    /// down. Hiding an already hidden node succeeds and changes nothing.
    pub fn hide(&mut self, key: &T) -> Result<()> {
        let id = self.locate(key)?.ok_or(Error::NotFound)?;
        let tag = self.tree.meta_mut(id).ok_or(Error::StaleNode)?;
        if !tag.hidden {
            tag.hidden = true;
            self.hidden += 1;
        }
        Ok(())
    }

    /// Finds the visible payload matching `key`. Hidden nodes are treated as absent.
    pub fn find(&self, key: &T) -> Result<&T> {
        let id = self
            .locate(key)?
            .filter(|&id| !self.tag(id).hidden)
            .ok_or(Error::NotFound)?;
        self.tree.payload(id).ok_or(Error::NotFound)
    }

    /// Whether a visible payload matches `key`.
    pub fn contains(&self, key: &T) -> bool {
        self.find(key).is_ok()
    }

    /// Finds the node matching `key`, hidden or not.
    fn locate(&self, key: &T) -> Result<Option<NodeId>> {
        let mut cursor = self.tree.root();
        while let Some(id) = cursor {
            cursor = match self.compare_at(key, id)? {
                Ordering::Less => self.tree.left(id),
                Ordering::Equal => return Ok(Some(id)),
                Ordering::Greater => self.tree.right(id),
            };
        }
        Ok(None)
    }

    fn compare_at(&self, key: &T, id: NodeId) -> Result<Ordering> {
        let payload = self.tree.payload(id).ok_or(Error::StaleNode)?;
        self.tree.compare_keys(key, payload)
    }

    /// Iterates over the visible payloads in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.tree
            .traverse(Order::In)
            .filter(move |&id| !self.tag(id).hidden)
            .filter_map(move |id| self.tree.payload(id))
    }

    /// How many nodes are in the tree, including hidden ones.
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// How many nodes are visible.
    pub fn active_count(&self) -> usize {
        self.tree.size() - self.hidden
    }

    /// The number of levels in the tree. A single node has a height of 1.
    pub fn height(&self) -> usize {
        self.subtree_height(self.tree.root())
    }

    fn subtree_height(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |id| {
            let left = self.subtree_height(self.tree.left(id));
            let right = self.subtree_height(self.tree.right(id));
            left.max(right) + 1
        })
    }

    /// The underlying binary tree, for walking or inspecting the structure. Every node's
    /// [`AvlTag`] says whether it is hidden.
    pub fn tree(&self) -> &BinaryTree<T, AvlTag> {
        &self.tree
    }

    /// Rebuilds the tree from its visible payloads, destroying the hidden ones. Returns `None`
    /// when nothing is visible.
    pub fn compact(self) -> Result<Option<Self>> {
        // Everything that can fail to allocate is reserved up front, while `self` is still
        // intact.
        let active = self.active_count();
        let mut rebuilt = BinaryTree::with_capacity(active, Callbacks::new())?;
        let mut live = Vec::new();
        live.try_reserve_exact(active)?;

        log::debug!("compacting {} hidden nodes away", self.hidden);
        let (entries, mut callbacks) = self.tree.into_inorder();
        for (payload, tag) in entries {
            if tag.hidden {
                callbacks.dispose(payload);
            } else {
                live.push(Some(payload));
            }
        }
        if live.is_empty() {
            return Ok(None);
        }
        rebuilt.set_callbacks(callbacks);
        let mut tree = Self {
            tree: rebuilt,
            hidden: 0,
        };

        // Medians go in breadth first: every level is full before the next one starts so no
        // insertion needs a rotation.
        let mut ranges = VecDeque::from([(0, live.len())]);
        while let Some((lo, hi)) = ranges.pop_front() {
            if lo >= hi {
                continue;
            }
            let mid = lo + (hi - lo) / 2;
            ranges.push_back((lo, mid));
            ranges.push_back((mid + 1, hi));

            let Some(payload) = live[mid].take() else {
                continue;
            };
            if let Err(rejected) = tree.insert(payload) {
                let (error, payload) = rejected.into_parts();
                tree.tree.dispose(payload);
                for payload in live.into_iter().flatten() {
                    tree.tree.dispose(payload);
                }
                return Err(error);
            }
        }
        Ok(Some(tree))
    }

    fn tag(&self, id: NodeId) -> AvlTag {
        self.tree.meta(id).copied().unwrap_or_default()
    }

    fn balance(&self, id: NodeId) -> Balance {
        self.tag(id).balance
    }

    fn set_balance(&mut self, id: NodeId, balance: Balance) {
        if let Some(tag) = self.tree.meta_mut(id) {
            tag.balance = balance;
        }
    }
}
