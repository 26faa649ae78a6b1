use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Walk the whole tree and assert its structural invariants.
fn validate_tree(t: &RadixTree) {
    fn walk(ev: &EdgeVector, is_root: bool, leaf_count: &mut usize) {
        assert!(
            is_root || ev.len() >= 2,
            "non-root edge vector must keep at least two entries"
        );

        let mut prev: Option<SearchKey> = None;
        for node in &ev.nodes {
            let key = node.search_key();
            if let Some(p) = prev {
                assert!(p < key, "entries must be sorted and first-byte unique");
            }
            prev = Some(key);

            match &node.payload {
                Payload::Leaf(_) => {
                    *leaf_count += 1;
                }
                Payload::Inner(child) => {
                    assert!(
                        !node.label.is_empty(),
                        "terminator edges must be leaves"
                    );
                    walk(child, false, leaf_count);
                }
            }
        }
    }

    let mut leaf_count = 0usize;
    walk(&t.rootv, true, &mut leaf_count);
    assert_eq!(
        leaf_count,
        t.len(),
        "reachable leaf count must match RadixTree::len"
    );
}

/// BTreeMap view of the successor contract.
fn oracle_next(m: &BTreeMap<Vec<u8>, u64>, key: &[u8]) -> Option<Vec<u8>> {
    m.range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
        .next()
        .map(|(k, _)| k.clone())
}

#[derive(Clone, Debug)]
enum Op {
    Put(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    Next(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(any::<u8>(), 0..=24)
}

/// Keys drawn from a three-letter alphabet collide on long prefixes, so
/// split and merge fire far more often than with uniform bytes.
fn dense_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b'c')], 0..=8)
}

fn ops_strategy(key: impl Strategy<Value = Vec<u8>> + Clone) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        45 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Put(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        15 => key.clone().prop_map(Op::Get),
        15 => key.prop_map(Op::Next),
    ];
    prop::collection::vec(op, 0..=2000)
}

fn run_equivalence(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut t = RadixTree::new();
    let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Put(key, value) => {
                t.put(&key, value);
                m.insert(key, value);
            }
            Op::Remove(key) => {
                t.remove(&key);
                m.remove(&key);
            }
            Op::Get(key) => {
                prop_assert_eq!(t.lookup(&key), m.get(&key).copied());
            }
            Op::Next(key) => {
                prop_assert_eq!(t.next_key(&key), oracle_next(&m, &key));
            }
        }

        prop_assert_eq!(t.len(), m.len());
    }

    validate_tree(&t);
    let got: Vec<(Vec<u8>, u64)> = t.iter().collect();
    let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
    prop_assert_eq!(got, expected);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy(key_strategy())) {
        run_equivalence(ops)?;
    }

    #[test]
    fn prop_equivalence_dense_prefixes(ops in ops_strategy(dense_key_strategy())) {
        run_equivalence(ops)?;
    }

    #[test]
    fn prop_successor_chain_enumerates_all(keys in prop::collection::btree_set(key_strategy(), 0..=64)) {
        let mut t = RadixTree::new();
        for (i, k) in keys.iter().enumerate() {
            t.put(k, i as u64);
        }

        // Feeding each successor back in must enumerate every non-empty key
        // ascending, exactly once.
        let mut found = Vec::new();
        let mut cursor = Vec::new();
        while let Some(next) = t.next_key(&cursor) {
            prop_assert!(next > cursor, "successor must be strictly greater");
            found.push(next.clone());
            cursor = next;
        }

        let expected: Vec<Vec<u8>> = keys.iter().filter(|k| !k.is_empty()).cloned().collect();
        prop_assert_eq!(found, expected);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_put_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"ad".to_vec(),
        b"b".to_vec(),
    ];

    for_each_permutation(&keys, |perm| {
        let mut t = RadixTree::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            t.put(&k, v);
            m.insert(k, v);
        }

        validate_tree(&t);
        let got: Vec<(Vec<u8>, u64)> = t.iter().collect();
        let expected: Vec<(Vec<u8>, u64)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"ad".to_vec(),
        b"b".to_vec(),
    ];

    // Insert in a fixed order, then remove in all permutations.
    let mut base_tree = RadixTree::new();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        base_tree.put(k, v);
        base_map.insert(k.clone(), v);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_tree.clone();
        let mut m = base_map.clone();

        for k in perm {
            t.remove(&k);
            m.remove(&k);
            assert_eq!(t.len(), m.len());
            assert_eq!(t.lookup(&k), None);
            validate_tree(&t);
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.rootv.len(), 0);
    });
}
