use avltree::avltree::AvlTree;
use avltree::btree::{Callbacks, Order};
use avltree::Error;
use quickcheck_macros::quickcheck;

use std::collections::{HashMap, HashSet};

use crate::Op;

/// A tree of `(key, value)` pairs ordered by key, rooted at `(0, 0)`.
fn keyed_tree() -> AvlTree<(i8, i8)> {
    let callbacks = Callbacks::new().with_compare(|a: &(i8, i8), b: &(i8, i8)| a.0.cmp(&b.0));
    AvlTree::init((0, 0), callbacks).unwrap()
}

/// Applies a set of operations to a tree and a hashmap.
/// This way we can ensure that after a random smattering of inserts
/// and hides we have the same set of visible keys in the map.
fn do_ops(ops: &[Op<i8, i8>], tree: &mut AvlTree<(i8, i8)>, map: &mut HashMap<i8, i8>) {
    for op in ops {
        match *op {
            Op::Insert(k, v) => {
                if tree.insert((k, v)).is_ok() {
                    map.insert(k, v);
                }
            }
            Op::Hide(k) => {
                if tree.hide(&(k, 0)).is_ok() {
                    map.remove(&k);
                }
            }
        }
    }
}

#[quickcheck]
fn fuzz_multiple_operations_i8(ops: Vec<Op<i8, i8>>) -> bool {
    let mut tree = keyed_tree();
    let mut map = HashMap::from([(0, 0)]);

    do_ops(&ops, &mut tree, &mut map);
    map.iter().all(|(k, v)| tree.find(&(*k, 0)) == Ok(&(*k, *v)))
        && tree.active_count() == map.len()
}

#[quickcheck]
fn contains(xs: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }

    xs.iter().all(|x| tree.find(x) == Ok(x))
}

#[quickcheck]
fn contains_not(xs: Vec<i8>, nots: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }
    let added: HashSet<_> = xs.into_iter().chain(Some(0)).collect();
    let nots: HashSet<_> = nots.into_iter().collect();
    let mut nots = nots.difference(&added);

    nots.all(|x| tree.find(x) == Err(Error::NotFound))
}

#[quickcheck]
fn with_hides(xs: Vec<i8>, hides: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }
    for hide in &hides {
        let _ = tree.hide(hide);
    }

    let still_present: HashSet<_> = xs
        .iter()
        .chain(Some(&0))
        .filter(|x| !hides.contains(*x))
        .collect();

    hides.iter().all(|x| tree.find(x).is_err())
        && still_present.iter().all(|x| tree.find(x).is_ok())
        && tree.active_count() == still_present.len()
}

#[quickcheck]
fn duplicates_are_rejected(xs: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    let mut seen = HashSet::from([0]);

    xs.iter().all(|x| {
        let result = tree.insert(*x);
        if seen.insert(*x) {
            result.is_ok()
        } else {
            result.map_err(Error::from) == Err(Error::DuplicateKey)
        }
    })
}

#[quickcheck]
fn inorder_is_strictly_ascending(xs: Vec<i16>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }

    let payloads: Vec<_> = tree
        .tree()
        .traverse(Order::In)
        .filter_map(|id| tree.tree().payload(id))
        .collect();
    payloads.windows(2).all(|pair| pair[0] < pair[1])
}

#[quickcheck]
fn height_is_logarithmic(xs: Vec<u16>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }

    let bound = 1.44 * ((tree.size() + 2) as f64).log2();
    tree.height() as f64 <= bound
}

#[quickcheck]
fn revive_does_not_grow(xs: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }
    let size = tree.size();

    for x in &xs {
        let _ = tree.hide(x);
    }
    for x in &xs {
        let _ = tree.insert(*x);
    }

    tree.size() == size && xs.iter().all(|x| tree.find(x) == Ok(x))
}

#[quickcheck]
fn compact_keeps_visible(xs: Vec<i8>, hides: Vec<i8>) -> bool {
    let mut tree = AvlTree::new(0).unwrap();
    for x in &xs {
        let _ = tree.insert(*x);
    }
    for hide in &hides {
        let _ = tree.hide(hide);
    }
    let before: Vec<i8> = tree.iter().copied().collect();

    match tree.compact().unwrap() {
        Some(tree) => {
            tree.size() == before.len() && tree.iter().copied().eq(before.iter().copied())
        }
        None => before.is_empty(),
    }
}
