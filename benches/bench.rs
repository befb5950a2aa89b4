use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use avltree::avltree::AvlTree;
use std::collections::BTreeSet;

enum TreeEnum<K> {
    Avl(AvlTree<K>),
    Std(BTreeSet<K>),
}

impl<K> TreeEnum<K> {
    fn find(&self, k: &K) -> Option<&K>
    where
        K: Ord,
    {
        match self {
            Self::Avl(t) => t.find(k).ok(),
            Self::Std(t) => t.get(k),
        }
    }

    fn insert(&mut self, k: K)
    where
        K: Ord,
    {
        match self {
            Self::Avl(t) => {
                let _ = t.insert(k);
            }
            Self::Std(t) => {
                t.insert(k);
            }
        }
    }

    fn hide(&mut self, k: &K)
    where
        K: Ord,
    {
        match self {
            Self::Avl(t) => {
                let _ = t.hide(k);
            }
            Self::Std(t) => {
                t.remove(k);
            }
        }
    }
}

fn build(name: &str, num_nodes: usize) -> TreeEnum<i32> {
    match name {
        "avl" => {
            let mut tree = AvlTree::new(0).unwrap();
            for x in 1..num_nodes {
                let _ = tree.insert(x as i32);
            }
            TreeEnum::Avl(tree)
        }
        _ => TreeEnum::Std((0..num_nodes as i32).collect()),
    }
}

/// Helper to bench a function on a BST.
/// It creates a group for the given name and closure and runs tests for various sizes and
/// implementations of BSTs before finishing the group. `BTreeSet` is the baseline.
fn bench_helper(c: &mut Criterion, name: &str, f: impl Fn(&mut TreeEnum<i32>, i32)) {
    let mut group = c.benchmark_group(name);

    for num_levels in [3, 7, 11, 15] {
        let num_nodes = 2usize.pow(num_levels as u32) - 1;
        let largest_element_in_tree = num_nodes - 1;

        for tree_name in ["avl", "std"] {
            let id = BenchmarkId::new(tree_name, largest_element_in_tree);

            group.bench_function(id, |b| {
                b.iter_batched_ref(
                    || build(tree_name, num_nodes),
                    |tree| f(tree, black_box(largest_element_in_tree as i32)),
                    BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

pub fn criterion_benchmark(c: &mut Criterion) {
    bench_helper(c, "find", |tree, i| {
        let _value = black_box(tree.find(&i));
    });
    bench_helper(c, "hide", |tree, i| {
        tree.hide(&i);
    });

    bench_helper(c, "insert", |tree, i| {
        tree.insert(i + 1);
    });

    bench_helper(c, "find-miss", |tree, i| {
        let _value = black_box(tree.find(&(i + 1)));
    });
    bench_helper(c, "hide-miss", |tree, i| {
        tree.hide(&(i + 1));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
