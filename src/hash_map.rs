use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::Result;
#[cfg(any(test, feature = "stats"))]
use crate::hash_table::DebugStats;
use crate::hash_table::CellRecord;
use crate::hash_table::HashTable;
use crate::hash_table::InsertOutcome;
use crate::hash_table::RemoveOutcome;

/// Hasher builder used when none is named, a randomly seeded foldhash.
#[cfg(feature = "foldhash")]
pub type DefaultHashBuilder = foldhash::fast::RandomState;

/// A hash map backed by the arrow [`HashTable`].
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. Each element
/// caches its full 64-bit hash, so growth never rehashes keys.
///
/// Allocation is fallible: constructors and insertions return
/// [`Result`](crate::Result).
#[derive(Clone)]
pub struct HashMap<K, V, S> {
    table: HashTable<K, V>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.table.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a map with `capacity` cells and the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use arrow_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::init_with_hasher(16, SimpleHasher)?;
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 16);
    /// # Ok::<(), arrow_hash::Error>(())
    /// ```
    pub fn init_with_hasher(capacity: usize, hash_builder: S) -> Result<Self> {
        Ok(HashMap {
            table: HashTable::init(capacity)?,
            hash_builder,
        })
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of cells backing the map.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns `len / capacity`.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Returns the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements, keeping the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all elements and releases the allocation.
    pub fn destroy(&mut self) {
        self.table.destroy();
    }

    /// Inserts a key-value pair, replacing and returning the old value if
    /// the key was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use arrow_hash::HashMap;
    /// # use arrow_hash::InsertOutcome;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map: HashMap<_, _, SimpleHasher> = HashMap::init(8)?;
    /// assert_eq!(map.put(37, "a")?, InsertOutcome::Inserted);
    /// assert_eq!(map.put(37, "b")?, InsertOutcome::Updated("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// # Ok::<(), arrow_hash::Error>(())
    /// ```
    pub fn put(&mut self, key: K, value: V) -> Result<InsertOutcome<V>> {
        let hash = self.hash_builder.hash_one(&key);
        self.table.put(hash, key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.get(hash, key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table.get_mut(hash, key)
    }

    /// Returns `true` if the map contains the key.
    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.hash_builder.hash_one(key);
        self.table.contains(hash, key)
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Result<RemoveOutcome<V>> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, key)
    }

    /// Inserts every pair from `iter`, stopping at the first error.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Returns one diagnostic record per cell.
    pub fn dump(&self) -> Vec<CellRecord<'_, K, V>> {
        self.table.dump()
    }

    /// An iterator visiting all key-value pairs in arbitrary order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// An iterator visiting all keys in arbitrary order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns utilization statistics of the underlying table.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.table.debug_stats()
    }

    /// Returns the histogram of element distances from their home buckets.
    #[cfg(any(test, feature = "stats"))]
    pub fn displacement_histogram(&self) -> Vec<usize> {
        self.table.displacement_histogram()
    }

    /// Prints the displacement histogram to stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_displacement_histogram(&self) {
        self.table.print_displacement_histogram();
    }

    /// Scans the underlying table for marker inconsistencies.
    #[cfg(any(test, feature = "stats"))]
    pub fn check_invariants(&self) -> Result<()> {
        self.table.check_invariants()
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a map with `capacity` cells using the default hasher builder.
    pub fn init(capacity: usize) -> Result<Self> {
        Self::init_with_hasher(capacity, S::default())
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}
