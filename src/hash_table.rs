use alloc::vec::Vec;
use core::fmt::Debug;

use tracing::debug;
use tracing::trace;

use crate::DEFAULT_CAPACITY;
use crate::GROWTH_THRESHOLD;
#[cfg(any(test, feature = "stats"))]
use crate::bounds::Bounds;
use crate::bounds::get_bounds;
use crate::error::Error;
use crate::error::Result;
use crate::slot_store::Arrow;
use crate::slot_store::Cell;
use crate::slot_store::Slot;
use crate::slot_store::SlotStore;

/// Panics on internal errors in debug builds, passes everything through in
/// release builds.
#[inline]
#[track_caller]
fn fail_fast(error: Error) -> Error {
    debug_assert!(!error.is_internal(), "{error}");
    error
}

/// Result of [`HashTable::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome<V> {
    /// The key was not present and now occupies a new cell.
    Inserted,
    /// The key was present; its value was replaced and the old value is
    /// returned.
    Updated(V),
}

/// Result of [`HashTable::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome<V> {
    /// The key was present and its value is returned.
    Removed(V),
    /// The key was not present.
    NotFound,
}

impl<V> RemoveOutcome<V> {
    /// Converts into an `Option`, discarding the distinction between
    /// outcomes.
    pub fn into_option(self) -> Option<V> {
        match self {
            RemoveOutcome::Removed(value) => Some(value),
            RemoveOutcome::NotFound => None,
        }
    }
}

/// Diagnostic view of a single cell, produced by [`HashTable::dump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRecord<'a, K, V> {
    /// Physical position of the cell.
    pub index: usize,
    /// Whether the cell holds an element.
    pub occupied: bool,
    /// Key of the element, if any.
    pub key: Option<&'a K>,
    /// Value of the element, if any.
    pub value: Option<&'a V>,
    /// Boundary marker of the bucket at this index.
    pub arrow: Arrow,
}

/// Debug statistics for table analysis.
///
/// Available in tests or with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements in the table
    pub len: usize,
    /// Number of cells allocated
    pub capacity: usize,
    /// Number of cells holding an element
    pub occupied_cells: usize,
    /// len / capacity
    pub load_factor: f64,
    /// Number of home buckets that own at least one element
    pub nonempty_runs: usize,
    /// Length of the longest run
    pub longest_run: usize,
    /// Largest distance between an element and its home bucket
    pub max_displacement: usize,
    /// Mean distance between an element and its home bucket
    pub mean_displacement: f64,
    /// Bytes held by the cell array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Arrow Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Runs: {} non-empty, longest {}",
            self.nonempty_runs, self.longest_run
        );
        println!(
            "Displacement: max {}, mean {:.3}",
            self.max_displacement, self.mean_displacement
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// An open-addressing hash table whose buckets own contiguous runs of cells.
///
/// Every element lives in the run of its home bucket (`hash % capacity`).
/// Runs are packed back to back in home order, wrapping around the end of
/// the cell array, and each bucket records where its run starts with an
/// [`Arrow`]. The end of a run is the start of the next bucket's run, so a
/// lookup reads two markers and scans one run.
///
/// Insertion carves out a cell at the end of the home run by rotating every
/// following run one cell forward, up to the nearest free cell. Removal does
/// the reverse, so the table never needs tombstones.
///
/// The caller supplies the hash for every operation; [`HashMap`] wraps this
/// with a [`BuildHasher`](core::hash::BuildHasher).
///
/// [`HashMap`]: crate::HashMap
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use arrow_hash::hash_table::HashTable;
/// # use arrow_hash::hash_table::InsertOutcome;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::init(16)?;
/// let hash = hash_id(123);
///
/// assert_eq!(table.put(hash, 123, "Alice")?, InsertOutcome::Inserted);
/// assert_eq!(table.put(hash, 123, "Bob")?, InsertOutcome::Updated("Alice"));
/// assert_eq!(table.get(hash, &123), Some(&"Bob"));
/// # Ok::<(), arrow_hash::Error>(())
/// ```
pub struct HashTable<K, V> {
    store: SlotStore<K, V>,
    len: usize,
}

impl<K, V> Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        if self.store.capacity() == 0 {
            return f
                .debug_struct("HashTable")
                .field("arrows", &"empty")
                .field("len", &self.len)
                .field("capacity", &0usize)
                .finish();
        }

        let cells = self.store.cells();
        f.debug_struct("HashTable")
            .field(
                "arrows",
                &cells
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|cell| cell.arrow.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .field(
                "homes",
                &cells
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|cell| match &cell.slot {
                                Some(slot) => format!("{:02}", self.store.home_of(slot.hash)),
                                None => String::from(".."),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<_>>(),
            )
            .field("len", &self.len)
            .field("capacity", &self.store.capacity())
            .finish()
    }
}

impl<K, V> Clone for HashTable<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        HashTable {
            store: self.store.clone(),
            len: self.len,
        }
    }
}

impl<K, V> HashTable<K, V> {
    /// Creates a table with exactly `capacity` cells, all unused.
    ///
    /// A capacity of zero allocates nothing; the first insertion grows the
    /// table to [`DEFAULT_CAPACITY`].
    ///
    /// # Errors
    ///
    /// [`Error::CapacityOverflow`] if the cell array's size in bytes is not
    /// representable, [`Error::AllocationError`] if the allocation fails.
    pub fn init(capacity: usize) -> Result<Self> {
        let store = SlotStore::with_capacity(capacity)?;
        debug!(capacity, "initialized arrow table");
        Ok(HashTable { store, len: 0 })
    }

    /// Drops every element and releases the cell array.
    ///
    /// The table is left with zero length and zero capacity and stays
    /// usable; the next insertion allocates again.
    pub fn destroy(&mut self) {
        debug!(
            capacity = self.store.capacity(),
            len = self.len,
            "destroying arrow table"
        );
        self.store = SlotStore::new();
        self.len = 0;
    }

    /// Drops every element and resets every marker, keeping the allocation.
    pub fn clear(&mut self) {
        self.store.reset();
        self.len = 0;
    }

    /// Returns the number of elements in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of cells, occupied or not.
    ///
    /// The table grows before an insertion would bring the load factor to
    /// [`GROWTH_THRESHOLD`], so fewer than `capacity()` elements fit without
    /// a resize.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Returns `len / capacity`, or `0.0` for an unallocated table.
    pub fn load_factor(&self) -> f64 {
        if self.store.capacity() == 0 {
            0.0
        } else {
            self.len as f64 / self.store.capacity() as f64
        }
    }

    /// Iterates over all elements in physical cell order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            cells: self.store.cells().iter(),
            remaining: self.len,
        }
    }

    /// Returns one record per cell describing its occupant and marker.
    ///
    /// Intended for diagnostics; the layout it exposes is not part of the
    /// table's contract.
    pub fn dump(&self) -> Vec<CellRecord<'_, K, V>> {
        self.store
            .cells()
            .iter()
            .enumerate()
            .map(|(index, cell)| CellRecord {
                index,
                occupied: cell.slot.is_some(),
                key: cell.slot.as_ref().map(|slot| &slot.key),
                value: cell.slot.as_ref().map(|slot| &slot.value),
                arrow: cell.arrow,
            })
            .collect()
    }

    fn needs_growth(&self) -> bool {
        let (numerator, denominator) = GROWTH_THRESHOLD;
        let capacity = self.store.capacity() as u128;
        (self.len as u128 + 1) * denominator as u128 >= capacity * numerator as u128
    }

    fn grow(&mut self) -> Result<()> {
        let old_capacity = self.store.capacity();
        let new_capacity = if old_capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            old_capacity
                .checked_mul(2)
                .ok_or(Error::CapacityOverflow {
                    capacity: usize::MAX,
                })?
        };

        // Allocate before touching the current store so a failure leaves the
        // table as it was.
        let fresh = SlotStore::with_capacity(new_capacity)?;
        debug!(old_capacity, new_capacity, len = self.len, "growing arrow table");

        let old = core::mem::replace(&mut self.store, fresh);
        let len = self.len;
        self.len = 0;
        for slot in old.into_slots() {
            self.place(slot)?;
        }
        debug_assert_eq!(self.len, len);

        debug!(capacity = new_capacity, len = self.len, "arrow table grown");
        Ok(())
    }

    /// Places an element whose key is known to be absent.
    fn place(&mut self, slot: Slot<K, V>) -> Result<()> {
        let home = self.store.home_of(slot.hash);

        match self.store.arrow(home) {
            Arrow::Empty | Arrow::NoRun => {
                if self.store.is_occupied(home) {
                    return Err(Error::invariant(
                        "bucket without a run holds an element",
                        home,
                    ));
                }
                self.store.fill(home, slot);
                self.store.set_arrow(home, Arrow::Offset(0));
                let next = self.store.next(home);
                if self.store.arrow(next) == Arrow::Empty {
                    self.store.set_arrow(next, Arrow::NoRun);
                }
            }
            Arrow::Offset(_) => {
                let target = get_bounds(&self.store, home)?.end(self.store.capacity());
                let free = self
                    .store
                    .find_free(target)
                    .ok_or_else(|| Error::exhausted(home))?;
                let moved = self.open_cell(target, free)?;
                self.store.fill(target, slot);
                self.advance_arrows(home, free)?;
                trace!(home, target, free, moved, "displaced runs");
            }
        }

        self.len += 1;
        Ok(())
    }

    /// Rotates every run in `[target, free)` one cell forward, leaving
    /// `target` unoccupied. Returns the number of runs moved.
    ///
    /// Each step moves the head of the run that ends at the hole into the
    /// hole, so the hole lands on that run's old start. Markers are read
    /// before any of them change.
    fn open_cell(&mut self, target: usize, free: usize) -> Result<usize> {
        let capacity = self.store.capacity();
        let mut hole = free;
        let mut moved = 0;

        while hole != target {
            let tail = self.store.prev(hole);
            let owner = self
                .store
                .slot(tail)
                .map(|slot| self.store.home_of(slot.hash))
                .ok_or_else(|| Error::invariant("gap inside a displaced region", tail))?;

            let run = get_bounds(&self.store, owner)?;
            if run.is_empty() || run.end(capacity) != hole {
                return Err(Error::invariant("run does not end at the hole", owner));
            }

            let remaining = self.store.distance(target, hole);
            self.store.relocate(run.start, hole)?;
            hole = run.start;
            if self.store.distance(target, hole) >= remaining {
                return Err(Error::invariant("displacement did not converge", hole));
            }
            moved += 1;
        }

        Ok(moved)
    }

    /// Shifts the start of every bucket in `(home, free]` one cell forward.
    fn advance_arrows(&mut self, home: usize, free: usize) -> Result<()> {
        let capacity = self.store.capacity();

        let mut bucket = self.store.next(home);
        while bucket != free {
            match self.store.arrow(bucket) {
                Arrow::Offset(offset) if offset + 1 < capacity => {
                    self.store.set_arrow(bucket, Arrow::Offset(offset + 1));
                }
                _ => {
                    return Err(Error::invariant(
                        "bucket inside a displaced region cannot advance",
                        bucket,
                    ));
                }
            }
            bucket = self.store.next(bucket);
        }

        match self.store.arrow(free) {
            Arrow::Empty | Arrow::NoRun if free != home => {
                self.store.set_arrow(free, Arrow::Offset(1));
            }
            _ => return Err(Error::invariant("free cell carries a run", free)),
        }
        let next = self.store.next(free);
        if self.store.arrow(next) == Arrow::Empty {
            self.store.set_arrow(next, Arrow::NoRun);
        }

        Ok(())
    }

    /// Pulls every displaced run after `hole` one cell back, stopping at a
    /// free cell or a run that starts at its own bucket. Returns the cell
    /// left free.
    fn close_cell(&mut self, hole: usize) -> Result<usize> {
        let capacity = self.store.capacity();
        let origin = hole;
        let mut hole = hole;

        loop {
            let head = self.store.next(hole);
            let Some(owner) = self.store.slot(head).map(|slot| self.store.home_of(slot.hash))
            else {
                break;
            };
            if owner == head {
                break;
            }

            let run = get_bounds(&self.store, owner)?;
            if run.is_empty() || run.start != head {
                return Err(Error::invariant("run does not start after the hole", owner));
            }

            let covered = self.store.distance(origin, hole);
            let last = run.last(capacity);
            self.store.relocate(last, hole)?;
            hole = last;
            if self.store.distance(origin, hole) <= covered {
                return Err(Error::invariant("compaction did not converge", hole));
            }
            trace!(owner, hole, "pulled run back");
        }

        Ok(hole)
    }

    /// Shifts the start of every bucket in `(home, hole]` one cell back.
    fn retreat_arrows(&mut self, home: usize, hole: usize) -> Result<()> {
        let mut bucket = home;
        while bucket != hole {
            bucket = self.store.next(bucket);
            let offset = match self.store.arrow(bucket) {
                Arrow::Offset(offset) if offset >= 1 => offset,
                _ => {
                    return Err(Error::invariant(
                        "compacted bucket was not displaced",
                        bucket,
                    ));
                }
            };

            // Successor markers are still untouched here, so this decodes
            // the run as it was before the pull.
            let owns_nothing = get_bounds(&self.store, bucket)?.is_empty();
            let arrow = if offset == 1 && owns_nothing {
                Arrow::NoRun
            } else {
                Arrow::Offset(offset - 1)
            };
            self.store.set_arrow(bucket, arrow);
        }
        Ok(())
    }

    /// Decodes the run owned by bucket `home`.
    ///
    /// Available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn run_bounds(&self, home: usize) -> Result<Bounds> {
        if home >= self.store.capacity() {
            return Err(Error::invariant("bucket index out of range", home));
        }
        get_bounds(&self.store, home)
    }

    /// Returns the distance from each element to its home bucket, as a
    /// histogram indexed by distance.
    ///
    /// Available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn displacement_histogram(&self) -> Vec<usize> {
        let mut histogram = Vec::new();
        for (index, cell) in self.store.cells().iter().enumerate() {
            if let Some(slot) = &cell.slot {
                let distance = self.store.distance(self.store.home_of(slot.hash), index);
                if histogram.len() <= distance {
                    histogram.resize(distance + 1, 0);
                }
                histogram[distance] += 1;
            }
        }
        histogram
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let capacity = self.store.capacity();

        let mut nonempty_runs = 0;
        let mut longest_run = 0;
        for home in 0..capacity {
            if let Ok(run) = get_bounds(&self.store, home) {
                if !run.is_empty() {
                    nonempty_runs += 1;
                }
                longest_run = longest_run.max(run.len);
            }
        }

        let histogram = self.displacement_histogram();
        let occupied_cells: usize = histogram.iter().sum();
        let total_distance: usize = histogram
            .iter()
            .enumerate()
            .map(|(distance, count)| distance * count)
            .sum();

        DebugStats {
            len: self.len,
            capacity,
            occupied_cells,
            load_factor: self.load_factor(),
            nonempty_runs,
            longest_run,
            max_displacement: histogram.len().saturating_sub(1),
            mean_displacement: if occupied_cells == 0 {
                0.0
            } else {
                total_distance as f64 / occupied_cells as f64
            },
            total_bytes: self.store.allocated_bytes(),
        }
    }

    /// Pretty-prints the displacement histogram horizontally using stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_displacement_histogram(&self) {
        let histogram = self.displacement_histogram();
        let max = histogram.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("displacement histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("displacement histogram ({} entries):", self.len);
        for (distance, &count) in histogram.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", distance, "█".repeat(width), count);
        }
    }

    /// Scans the whole table and checks that the markers describe exactly
    /// the elements present.
    ///
    /// Every bucket's run must decode, cover only elements homed at that
    /// bucket, and not overlap any other run. The runs together must cover
    /// every occupied cell, and `len` must match.
    ///
    /// Available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn check_invariants(&self) -> Result<()> {
        let capacity = self.store.capacity();
        if capacity == 0 {
            return if self.len == 0 {
                Ok(())
            } else {
                Err(Error::invariant("elements counted without storage", 0))
            };
        }

        let mut owner_of = alloc::vec![None; capacity];
        let mut covered = 0;

        for home in 0..capacity {
            let run = get_bounds(&self.store, home)?;

            match self.store.arrow(home) {
                Arrow::Offset(0) if run.is_empty() => {
                    return Err(Error::invariant("home-anchored run is empty", home));
                }
                Arrow::Offset(_) if !self.store.is_occupied(home) => {
                    return Err(Error::invariant("bucket with a run is unoccupied", home));
                }
                Arrow::Offset(offset) if offset >= 1 => {
                    if self.store.arrow(self.store.prev(home)).offset().is_none() {
                        return Err(Error::invariant(
                            "spilled-over bucket follows a bucket without a run",
                            home,
                        ));
                    }
                }
                Arrow::Empty | Arrow::NoRun if self.store.is_occupied(home) => {
                    return Err(Error::invariant(
                        "bucket without a run holds an element",
                        home,
                    ));
                }
                _ => {}
            }

            for index in run.indices(capacity) {
                let slot = self
                    .store
                    .slot(index)
                    .ok_or_else(|| Error::invariant("run covers an unoccupied cell", index))?;
                if self.store.home_of(slot.hash) != home {
                    return Err(Error::invariant("element outside its home run", index));
                }
                if owner_of[index].replace(home).is_some() {
                    return Err(Error::invariant("runs overlap", index));
                }
            }
            covered += run.len;
        }

        let occupied = self
            .store
            .cells()
            .iter()
            .filter(|cell| cell.slot.is_some())
            .count();
        if covered != self.len || occupied != self.len {
            return Err(Error::invariant("length disagrees with the runs", 0));
        }

        Ok(())
    }
}

impl<K: Eq, V> HashTable<K, V> {
    /// Finds the cell holding `key`, scanning only the run of its home
    /// bucket.
    fn locate(&self, hash: u64, key: &K) -> Result<Option<usize>> {
        if self.len == 0 {
            return Ok(None);
        }

        let home = self.store.home_of(hash);
        let run = get_bounds(&self.store, home)?;
        for index in run.indices(self.store.capacity()) {
            let slot = self
                .store
                .slot(index)
                .ok_or_else(|| Error::invariant("run covers an unoccupied cell", index))?;
            if slot.hash == hash && slot.key == *key {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn find_index(&self, hash: u64, key: &K) -> Option<usize> {
        self.locate(hash, key).unwrap_or_else(|error| {
            fail_fast(error);
            None
        })
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// `hash` must be the hash used when the key was inserted.
    pub fn get(&self, hash: u64, key: &K) -> Option<&V> {
        let index = self.find_index(hash, key)?;
        self.store.slot(index).map(|slot| &slot.value)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut(&mut self, hash: u64, key: &K) -> Option<&mut V> {
        let index = self.find_index(hash, key)?;
        self.store.slot_mut(index).map(|slot| &mut slot.value)
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, hash: u64, key: &K) -> bool {
        self.find_index(hash, key).is_some()
    }

    /// Inserts `key` with `value`, or replaces the value if the key is
    /// already present.
    ///
    /// The table grows first whenever one more element would reach
    /// [`GROWTH_THRESHOLD`], even if the key turns out to be present.
    ///
    /// # Errors
    ///
    /// Growth can fail with [`Error::AllocationError`] or
    /// [`Error::CapacityOverflow`], leaving the table unchanged. Internal
    /// errors ([`Error::CapacityExceeded`], [`Error::InvariantViolation`])
    /// panic in debug builds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use arrow_hash::hash_table::HashTable;
    /// # use arrow_hash::hash_table::InsertOutcome;
    /// #
    /// let mut table = HashTable::init(8)?;
    /// assert_eq!(table.put(5, 5u64, 1)?, InsertOutcome::Inserted);
    /// assert_eq!(table.put(5, 5u64, 2)?, InsertOutcome::Updated(1));
    /// assert_eq!(table.len(), 1);
    /// # Ok::<(), arrow_hash::Error>(())
    /// ```
    pub fn put(&mut self, hash: u64, key: K, value: V) -> Result<InsertOutcome<V>> {
        self.put_inner(hash, key, value).map_err(fail_fast)
    }

    fn put_inner(&mut self, hash: u64, key: K, value: V) -> Result<InsertOutcome<V>> {
        while self.needs_growth() {
            self.grow()?;
        }

        if let Some(index) = self.locate(hash, &key)? {
            let slot = self
                .store
                .slot_mut(index)
                .ok_or_else(|| Error::invariant("located an unoccupied cell", index))?;
            return Ok(InsertOutcome::Updated(core::mem::replace(
                &mut slot.value,
                value,
            )));
        }

        self.place(Slot { hash, key, value })?;
        Ok(InsertOutcome::Inserted)
    }

    /// Removes `key`, compacting the runs that follow it.
    ///
    /// # Errors
    ///
    /// Only internal errors, which panic in debug builds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use arrow_hash::hash_table::HashTable;
    /// # use arrow_hash::hash_table::RemoveOutcome;
    /// #
    /// let mut table = HashTable::init(8)?;
    /// table.put(3, 3u64, "three")?;
    /// assert_eq!(table.remove(3, &3)?, RemoveOutcome::Removed("three"));
    /// assert_eq!(table.remove(3, &3)?, RemoveOutcome::NotFound);
    /// # Ok::<(), arrow_hash::Error>(())
    /// ```
    pub fn remove(&mut self, hash: u64, key: &K) -> Result<RemoveOutcome<V>> {
        self.remove_inner(hash, key).map_err(fail_fast)
    }

    fn remove_inner(&mut self, hash: u64, key: &K) -> Result<RemoveOutcome<V>> {
        let Some(index) = self.locate(hash, key)? else {
            return Ok(RemoveOutcome::NotFound);
        };

        let capacity = self.store.capacity();
        let home = self.store.home_of(hash);
        let run = get_bounds(&self.store, home)?;
        let removed = self
            .store
            .take(index)
            .ok_or_else(|| Error::invariant("located an unoccupied cell", index))?;

        let last = run.last(capacity);
        if index != last {
            self.store.relocate(last, index)?;
        }

        let hole = self.close_cell(last)?;
        self.retreat_arrows(home, hole)?;
        if run.len == 1 && self.store.arrow(home) == Arrow::Offset(0) {
            self.store.set_arrow(home, Arrow::NoRun);
        }
        self.len -= 1;

        trace!(home, index, hole, "removed element");
        Ok(RemoveOutcome::Removed(removed.value))
    }
}

/// An iterator over the elements of a [`HashTable`] in physical order.
pub struct Iter<'a, K, V> {
    cells: core::slice::Iter<'a, Cell<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for cell in self.cells.by_ref() {
            if let Some(slot) = &cell.slot {
                self.remaining -= 1;
                return Some((&slot.key, &slot.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
