use std::collections::BTreeMap;
use std::collections::HashMap as StdHashMap;
use std::vec::Vec;

use core::hash::BuildHasher;
use core::hash::Hasher;

use proptest::prelude::*;

use super::*;

/// Hashes integers to `value % modulus`, so small key ranges pile into a
/// handful of home buckets and force long runs and wrap-around.
#[derive(Clone)]
struct Folding {
    modulus: u64,
}

struct FoldingHasher {
    modulus: u64,
    value: u64,
}

impl Hasher for FoldingHasher {
    fn finish(&self) -> u64 {
        self.value % self.modulus
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.value = self.value.wrapping_mul(31).wrapping_add(u64::from(*byte));
        }
    }

    fn write_u16(&mut self, n: u16) {
        self.value = u64::from(n);
    }
}

impl BuildHasher for Folding {
    type Hasher = FoldingHasher;

    fn build_hasher(&self) -> Self::Hasher {
        FoldingHasher {
            modulus: self.modulus,
            value: 0,
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Put(u16, u32),
    Remove(u16),
    Get(u16),
    Clear,
    Destroy,
}

fn ops_strategy(keys: u16) -> impl Strategy<Value = Vec<Op>> {
    let key = 0..keys;
    let op = prop_oneof![
        50 => (key.clone(), any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        30 => key.clone().prop_map(Op::Remove),
        18 => key.clone().prop_map(Op::Get),
        1 => Just(Op::Clear),
        1 => Just(Op::Destroy),
    ];
    prop::collection::vec(op, 0..=600)
}

fn run_against_oracle(
    capacity: usize,
    modulus: u64,
    ops: Vec<Op>,
) -> core::result::Result<(), TestCaseError> {
    let mut t: HashMap<u16, u32, Folding> =
        HashMap::init_with_hasher(capacity, Folding { modulus }).unwrap();
    let mut m: StdHashMap<u16, u32> = StdHashMap::new();

    for op in ops {
        match op {
            Op::Put(key, value) => {
                let outcome = t.put(key, value).unwrap();
                match m.insert(key, value) {
                    Some(old) => prop_assert_eq!(outcome, InsertOutcome::Updated(old)),
                    None => prop_assert_eq!(outcome, InsertOutcome::Inserted),
                }
            }
            Op::Remove(key) => {
                let old_t = t.remove(&key).unwrap().into_option();
                let old_m = m.remove(&key);
                prop_assert_eq!(old_t, old_m);
            }
            Op::Get(key) => {
                prop_assert_eq!(t.get(&key), m.get(&key));
                prop_assert_eq!(t.contains_key(&key), m.contains_key(&key));
            }
            Op::Clear => {
                t.clear();
                m.clear();
            }
            Op::Destroy => {
                t.destroy();
                m.clear();
                prop_assert_eq!(t.capacity(), 0);
            }
        }

        let scan = t.check_invariants();
        prop_assert!(scan.is_ok(), "{:?}\n{:#?}", scan, t.dump());
        prop_assert_eq!(t.len(), m.len());
        let (numerator, denominator) = GROWTH_THRESHOLD;
        prop_assert!(t.len() as u64 * denominator < t.capacity().max(1) as u64 * numerator);
    }

    let got: BTreeMap<u16, u32> = t.iter().map(|(k, v)| (*k, *v)).collect();
    let expected: BTreeMap<u16, u32> = m.into_iter().collect();
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
    fn prop_equivalence_spread(ops in ops_strategy(512)) {
        run_against_oracle(8, u64::MAX, ops)?;
    }

    #[test]
    fn prop_equivalence_clustered(ops in ops_strategy(128), modulus in 1u64..8) {
        run_against_oracle(8, modulus, ops)?;
    }

    #[test]
    fn prop_equivalence_from_zero(ops in ops_strategy(64), modulus in 1u64..64) {
        run_against_oracle(0, modulus, ops)?;
    }

    #[test]
    fn prop_growth_preserves_contents(
        keys in prop::collection::vec(any::<u16>(), 0..=400),
        modulus in 1u64..1024,
    ) {
        let folding = Folding { modulus };
        let mut grown: HashMap<u16, usize, Folding> =
            HashMap::init_with_hasher(8, folding.clone()).unwrap();
        for (i, key) in keys.iter().enumerate() {
            grown.put(*key, i).unwrap();
        }

        let mut fresh: HashMap<u16, usize, Folding> =
            HashMap::init_with_hasher(grown.capacity(), folding).unwrap();
        for (i, key) in keys.iter().enumerate() {
            fresh.put(*key, i).unwrap();
        }
        prop_assert_eq!(fresh.capacity(), grown.capacity());

        let a: BTreeMap<u16, usize> = grown.iter().map(|(k, v)| (*k, *v)).collect();
        let b: BTreeMap<u16, usize> = fresh.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(a, b);
        prop_assert!(grown.check_invariants().is_ok());
    }
}

#[test]
fn doubling_count_matches_threshold() {
    let (numerator, denominator) = GROWTH_THRESHOLD;
    let mut t: HashMap<u16, u16, Folding> =
        HashMap::init_with_hasher(8, Folding { modulus: u64::MAX }).unwrap();

    let mut doublings = 0;
    for key in 0..1000u16 {
        let before = t.capacity();
        t.put(key, key).unwrap();
        if t.capacity() != before {
            assert_eq!(t.capacity(), before * 2);
            assert!((key as u64 + 1) * denominator >= before as u64 * numerator);
            doublings += 1;
        }
    }
    assert_eq!(t.capacity(), 8 << doublings);
}

#[test]
fn exhaustive_remove_order_small_cluster() {
    let keys = [0u16, 1, 2, 3, 4, 5];
    for skip in 0..keys.len() {
        for modulus in 1..=3 {
            let mut t: HashMap<u16, u16, Folding> =
                HashMap::init_with_hasher(8, Folding { modulus }).unwrap();
            for key in keys {
                t.put(key, key).unwrap();
            }

            let order = keys.iter().cycle().skip(skip).take(keys.len());
            for (removed, key) in order.enumerate() {
                assert_eq!(t.remove(key).unwrap(), RemoveOutcome::Removed(*key));
                t.check_invariants()
                    .unwrap_or_else(|e| panic!("{e}: {:#?}", t.dump()));
                assert_eq!(t.len(), keys.len() - removed - 1);
            }
            assert!(t.is_empty());
        }
    }
}
