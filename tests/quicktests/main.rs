mod avl;

use quickcheck::{Arbitrary, Gen};

/// An enum for the various kinds of "things" to do to
/// binary search trees in a quicktest.
#[derive(Copy, Clone, Debug)]
pub enum Op<K, V> {
    /// Insert the K, V into the data structure
    Insert(K, V),
    /// Hide the K in the data structure
    Hide(K),
}

impl<K, V> Arbitrary for Op<K, V>
where
    K: Arbitrary,
    V: Arbitrary,
{
    fn arbitrary(g: &mut Gen) -> Self {
        if bool::arbitrary(g) {
            Op::Insert(K::arbitrary(g), V::arbitrary(g))
        } else {
            Op::Hide(K::arbitrary(g))
        }
    }
}
