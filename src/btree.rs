//! A plain binary tree. Nodes live in an arena owned by the [`BinaryTree`] and are addressed with
//! [`NodeId`] handles. The tree knows how to attach and detach children, how to walk itself, and
//! how many nodes it holds, but it knows nothing about ordering. Ordered trees (see
//! [`crate::avltree`]) are built on top of it.
//!
//! # Examples
//!
//! ```
//! use avltree::btree::{BinaryTree, Callbacks, Order};
//!
//! let mut tree: BinaryTree<&str> = BinaryTree::init("b", Callbacks::new()).unwrap();
//! let root = tree.root().unwrap();
//!
//! tree.attach_left(root, "a").unwrap();
//! tree.attach_right(root, "c").unwrap();
//! assert_eq!(tree.size(), 3);
//!
//! let inorder: Vec<_> = tree
//!     .traverse(Order::In)
//!     .filter_map(|id| tree.payload(id))
//!     .collect();
//! assert_eq!(inorder, [&"a", &"b", &"c"]);
//!
//! // Detaching frees the whole subtree.
//! tree.detach_left(root).unwrap();
//! assert_eq!(tree.size(), 2);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::mem;

use crate::error::{Error, InsertError, Result};

/// The outcome of handing a payload to the tree. On failure the payload comes back.
pub type InsertResult<N, T> = std::result::Result<N, InsertError<T>>;

/// A total order over payloads.
pub type Comparator<T> = Box<dyn Fn(&T, &T) -> Ordering>;

/// Tears down a payload when its node is freed.
pub type Destructor<T> = Box<dyn FnMut(T)>;

/// Per-tree configuration: how payloads compare and how they are torn down.
pub struct Callbacks<T> {
    compare: Option<Comparator<T>>,
    destroy: Option<Destructor<T>>,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Callbacks<T> {
    /// No comparator and no destructor. Freed payloads are simply dropped.
    pub fn new() -> Self {
        Self {
            compare: None,
            destroy: None,
        }
    }

    /// Compare payloads with their [`Ord`] implementation.
    pub fn ordered() -> Self
    where
        T: Ord + 'static,
    {
        Self::new().with_compare(T::cmp)
    }

    /// Use `compare` to order payloads. It must be a strict total order and must answer the same
    /// way every time it is asked about the same pair.
    pub fn with_compare(mut self, compare: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        self.compare = Some(Box::new(compare));
        self
    }

    /// Hand every freed payload to `destroy` instead of dropping it.
    pub fn with_destroy(mut self, destroy: impl FnMut(T) + 'static) -> Self {
        self.destroy = Some(Box::new(destroy));
        self
    }

    pub(crate) fn has_comparator(&self) -> bool {
        self.compare.is_some()
    }

    pub(crate) fn compare(&self, a: &T, b: &T) -> Result<Ordering> {
        self.compare
            .as_ref()
            .map(|compare| compare(a, b))
            .ok_or(Error::NoComparator)
    }

    /// Gives up ownership of `payload`, running the destructor if there is one.
    pub(crate) fn dispose(&mut self, payload: T) {
        match self.destroy.as_mut() {
            Some(destroy) => destroy(payload),
            None => drop(payload),
        }
    }
}

/// A handle to a node in a [`BinaryTree`]. Handles are cheap to copy and become stale once the
/// node they name is freed; a stale handle is never confused with a newer node that happens to
/// reuse the same arena slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// The order in which [`BinaryTree::traverse`] visits nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Parent, then left subtree, then right subtree.
    Pre,
    /// Left subtree, then parent, then right subtree.
    In,
    /// Left subtree, then right subtree, then parent.
    Post,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct Node<T, M> {
    payload: T,
    meta: M,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl<T, M> Node<T, M> {
    fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn child_mut(&mut self, side: Side) -> &mut Option<NodeId> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

enum Slot<T, M> {
    Occupied { generation: u32, node: Node<T, M> },
    Vacant { generation: u32, next_free: Option<usize> },
}

/// A binary tree whose nodes each own a payload `T` and an opaque tag `M` that layers built on
/// top of the tree may use for their own bookkeeping.
///
/// A tree always starts out with a root. It only becomes empty through [`BinaryTree::clear`].
pub struct BinaryTree<T, M = ()> {
    slots: Vec<Slot<T, M>>,
    /// Head of the list of vacant slots threaded through `Slot::Vacant::next_free`.
    free: Option<usize>,
    root: Option<NodeId>,
    size: usize,
    callbacks: Callbacks<T>,
}

impl<T, M> Drop for BinaryTree<T, M> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, M> fmt::Debug for BinaryTree<T, M>
where
    T: fmt::Debug,
    M: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryTree")
            .field("size", &self.size)
            .field("root", &self.root.map(|id| DebugNode { tree: self, id }))
            .finish()
    }
}

struct DebugNode<'a, T, M> {
    tree: &'a BinaryTree<T, M>,
    id: NodeId,
}

impl<T, M> fmt::Debug for DebugNode<'_, T, M>
where
    T: fmt::Debug,
    M: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(node) = self.tree.node(self.id) else {
            return f.write_str("<stale>");
        };
        let child = |id: Option<NodeId>| id.map(|id| DebugNode { tree: self.tree, id });
        f.debug_struct("Node")
            .field("payload", &node.payload)
            .field("meta", &node.meta)
            .field("left", &child(node.left))
            .field("right", &child(node.right))
            .finish()
    }
}

impl<T, M> BinaryTree<T, M>
where
    M: Default,
{
    /// Creates a tree holding a single root node with the given payload.
    pub fn init(root: T, callbacks: Callbacks<T>) -> Result<Self> {
        let mut tree = Self::with_capacity(1, callbacks)?;
        tree.plant(root)?;
        Ok(tree)
    }

    /// Creates a new leaf holding `payload` as the left child of `parent`.
    ///
    /// Fails with [`Error::SlotOccupied`] if `parent` already has a left child; the existing
    /// subtree must be detached first. On failure the payload is handed back untouched.
    pub fn attach_left(&mut self, parent: NodeId, payload: T) -> InsertResult<NodeId, T> {
        self.attach(parent, Side::Left, payload)
    }

    /// Creates a new leaf holding `payload` as the right child of `parent`.
    ///
    /// Fails with [`Error::SlotOccupied`] if `parent` already has a right child.
    pub fn attach_right(&mut self, parent: NodeId, payload: T) -> InsertResult<NodeId, T> {
        self.attach(parent, Side::Right, payload)
    }

    fn attach(&mut self, parent: NodeId, side: Side, payload: T) -> InsertResult<NodeId, T> {
        let occupied = match self.node(parent) {
            Some(node) => node.child(side).is_some(),
            None => return Err(InsertError::new(Error::StaleNode, payload)),
        };
        if occupied {
            return Err(InsertError::new(Error::SlotOccupied, payload));
        }

        let child = self.alloc(payload)?;
        if let Some(node) = self.node_mut(parent) {
            *node.child_mut(side) = Some(child);
        }
        Ok(child)
    }

    /// Makes `payload` the root of an empty tree.
    pub(crate) fn plant(&mut self, payload: T) -> InsertResult<NodeId, T> {
        if self.root.is_some() {
            return Err(InsertError::new(Error::SlotOccupied, payload));
        }
        let root = self.alloc(payload)?;
        self.root = Some(root);
        Ok(root)
    }

    fn alloc(&mut self, payload: T) -> InsertResult<NodeId, T> {
        if self.free.is_none() {
            if let Err(err) = self.slots.try_reserve(1) {
                return Err(InsertError::new(err.into(), payload));
            }
        }
        let node = Node {
            payload,
            meta: M::default(),
            left: None,
            right: None,
        };

        let id = match self.free {
            Some(index) => {
                let (generation, next_free) = match self.slots[index] {
                    Slot::Vacant {
                        generation,
                        next_free,
                    } => (generation, next_free),
                    Slot::Occupied { .. } => unreachable!("free list points at a live node"),
                };
                self.slots[index] = Slot::Occupied { generation, node };
                self.free = next_free;
                NodeId { index, generation }
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot::Occupied {
                    generation: 0,
                    node,
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };

        self.size += 1;
        Ok(id)
    }
}

impl<T, M> BinaryTree<T, M> {
    /// An empty tree with room for `capacity` nodes, so that many attaches cannot fail to
    /// allocate.
    pub(crate) fn with_capacity(capacity: usize, callbacks: Callbacks<T>) -> Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        Ok(Self {
            slots,
            free: None,
            root: None,
            size: 0,
            callbacks,
        })
    }

    pub(crate) fn set_callbacks(&mut self, callbacks: Callbacks<T>) {
        self.callbacks = callbacks;
    }

    /// Frees the left subtree of `parent`, if there is one.
    pub fn detach_left(&mut self, parent: NodeId) -> Result<()> {
        self.detach(parent, Side::Left)
    }

    /// Frees the right subtree of `parent`, if there is one.
    pub fn detach_right(&mut self, parent: NodeId) -> Result<()> {
        self.detach(parent, Side::Right)
    }

    fn detach(&mut self, parent: NodeId, side: Side) -> Result<()> {
        let node = self.node_mut(parent).ok_or(Error::StaleNode)?;
        if let Some(child) = node.child_mut(side).take() {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Frees every node in the tree, leaving it empty.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            self.free_subtree(root);
            log::debug!("tore down tree");
        }
    }

    /// Frees `id` and everything below it, children first. The link pointing at `id` must
    /// already have been cut.
    fn free_subtree(&mut self, id: NodeId) {
        let doomed: Vec<NodeId> = self.traverse_from(id, Order::Post).collect();
        log::trace!("freeing subtree of {} nodes", doomed.len());
        for id in doomed {
            if let Some(node) = self.release(id) {
                self.callbacks.dispose(node.payload);
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Option<Node<T, M>> {
        self.node(id)?;
        let vacant = Slot::Vacant {
            generation: id.generation.wrapping_add(1),
            next_free: self.free,
        };
        let Slot::Occupied { node, .. } = mem::replace(&mut self.slots[id.index], vacant) else {
            unreachable!("`node` just found this slot occupied");
        };
        self.free = Some(id.index);
        self.size -= 1;
        Some(node)
    }

    /// Lazily walks the whole tree in the given order. Calling this again restarts the walk, as
    /// does cloning a walk before it is consumed.
    pub fn traverse(&self, order: Order) -> Traverse<'_, T, M> {
        Traverse::new(self, self.root, order)
    }

    /// Lazily walks the subtree rooted at `id` in the given order.
    pub fn traverse_from(&self, id: NodeId, order: Order) -> Traverse<'_, T, M> {
        Traverse::new(self, Some(id), order)
    }

    /// Orders two payloads with the tree's comparator.
    pub fn compare_keys(&self, a: &T, b: &T) -> Result<Ordering> {
        self.callbacks.compare(a, b)
    }

    /// How many nodes are in the tree.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The root node, or `None` once the tree has been cleared.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// The left child of `id`.
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.left)
    }

    /// The right child of `id`.
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.right)
    }

    /// The payload stored at `id`.
    pub fn payload(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|n| &n.payload)
    }

    /// The layer tag stored at `id`.
    pub fn meta(&self, id: NodeId) -> Option<&M> {
        self.node(id).map(|n| &n.meta)
    }

    pub(crate) fn meta_mut(&mut self, id: NodeId) -> Option<&mut M> {
        self.node_mut(id).map(|n| &mut n.meta)
    }

    /// Whether `id` is a live node without children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id)
            .map_or(false, |n| n.left.is_none() && n.right.is_none())
    }

    /// Whether a child slot holds no live node, i.e. the branch ends here.
    pub fn is_end_of_branch(&self, slot: Option<NodeId>) -> bool {
        slot.map_or(true, |id| self.node(id).is_none())
    }

    /// Puts `child` in the left slot of `parent` and returns what was there. Nothing is freed and
    /// `size` does not change: the caller is moving subtrees around and must re-link whatever
    /// comes back.
    pub(crate) fn set_left(&mut self, parent: NodeId, child: Option<NodeId>) -> Option<NodeId> {
        self.relink(parent, Side::Left, child)
    }

    /// Puts `child` in the right slot of `parent` and returns what was there.
    pub(crate) fn set_right(&mut self, parent: NodeId, child: Option<NodeId>) -> Option<NodeId> {
        self.relink(parent, Side::Right, child)
    }

    fn relink(&mut self, parent: NodeId, side: Side, child: Option<NodeId>) -> Option<NodeId> {
        let node = self.node_mut(parent)?;
        mem::replace(node.child_mut(side), child)
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Swaps the payload stored at `id`, handing back the old one.
    pub(crate) fn replace_payload(&mut self, id: NodeId, payload: T) -> Option<T> {
        self.node_mut(id)
            .map(|n| mem::replace(&mut n.payload, payload))
    }

    /// Gives up ownership of a payload that is no longer stored in any node.
    pub(crate) fn dispose(&mut self, payload: T) {
        self.callbacks.dispose(payload);
    }

    /// Empties the tree without destroying anything, returning every payload and tag in inorder
    /// along with the callbacks.
    pub(crate) fn into_inorder(mut self) -> (Vec<(T, M)>, Callbacks<T>) {
        let order: Vec<NodeId> = self.traverse(Order::In).collect();
        let mut slots = mem::take(&mut self.slots);
        let callbacks = mem::take(&mut self.callbacks);
        self.root = None;
        self.free = None;
        self.size = 0;

        let entries = order
            .into_iter()
            .filter_map(|id| {
                let vacant = Slot::Vacant {
                    generation: 0,
                    next_free: None,
                };
                match mem::replace(&mut slots[id.index], vacant) {
                    Slot::Occupied { node, .. } => Some((node.payload, node.meta)),
                    Slot::Vacant { .. } => None,
                }
            })
            .collect();
        (entries, callbacks)
    }

    fn node(&self, id: NodeId) -> Option<&Node<T, M>> {
        match self.slots.get(id.index)? {
            Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T, M>> {
        match self.slots.get_mut(id.index)? {
            Slot::Occupied { generation, node } if *generation == id.generation => Some(node),
            _ => None,
        }
    }
}

/// A lazy walk over a [`BinaryTree`], yielding every node (whatever its tag says) exactly once.
/// The tree is borrowed for the duration of the walk so it cannot change underneath it.
pub struct Traverse<'a, T, M> {
    tree: &'a BinaryTree<T, M>,
    order: Order,
    /// Pending nodes. `true` means the node's children have already been scheduled and the node
    /// itself is next to be yielded.
    stack: Vec<(NodeId, bool)>,
}

impl<T, M> Clone for Traverse<'_, T, M> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            order: self.order,
            stack: self.stack.clone(),
        }
    }
}

impl<'a, T, M> Traverse<'a, T, M> {
    fn new(tree: &'a BinaryTree<T, M>, start: Option<NodeId>, order: Order) -> Self {
        Self {
            tree,
            order,
            stack: start.map(|id| (id, false)).into_iter().collect(),
        }
    }
}

impl<T, M> Iterator for Traverse<'_, T, M> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some((id, expanded)) = self.stack.pop() {
            if expanded {
                return Some(id);
            }
            let Some(node) = self.tree.node(id) else {
                continue;
            };

            // Pushed in reverse of the order they should come off the stack.
            let left = node.left.map(|id| (id, false));
            let right = node.right.map(|id| (id, false));
            match self.order {
                Order::Pre => {
                    self.stack.extend(right);
                    self.stack.extend(left);
                    self.stack.push((id, true));
                }
                Order::In => {
                    self.stack.extend(right);
                    self.stack.push((id, true));
                    self.stack.extend(left);
                }
                Order::Post => {
                    self.stack.push((id, true));
                    self.stack.extend(right);
                    self.stack.extend(left);
                }
            }
        }
        None
    }
}
