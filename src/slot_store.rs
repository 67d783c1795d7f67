use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt;

use crate::error::Error;
use crate::error::Result;

/// Boundary marker stored in every cell.
///
/// A bucket's marker says where its run starts; the end of the run is read
/// from the marker of the following bucket, since runs are packed back to
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Arrow {
    /// The cell has never carried a boundary since the store was allocated.
    #[default]
    Empty,
    /// The bucket owns nothing and no earlier run spills over it.
    NoRun,
    /// The bucket's run starts this many cells after the bucket.
    Offset(usize),
}

impl Arrow {
    /// Returns the offset if this is an [`Arrow::Offset`].
    #[inline]
    pub fn offset(self) -> Option<usize> {
        match self {
            Arrow::Offset(offset) => Some(offset),
            Arrow::Empty | Arrow::NoRun => None,
        }
    }
}

impl fmt::Display for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arrow::Empty => f.write_str(".."),
            Arrow::NoRun => f.write_str("--"),
            Arrow::Offset(offset) => write!(f, "{offset:02}"),
        }
    }
}

/// An element together with its cached full hash.
pub(crate) struct Slot<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K: Clone, V: Clone> Clone for Slot<K, V> {
    fn clone(&self) -> Self {
        Slot {
            hash: self.hash,
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

pub(crate) struct Cell<K, V> {
    pub(crate) arrow: Arrow,
    pub(crate) slot: Option<Slot<K, V>>,
}

impl<K, V> Cell<K, V> {
    #[inline(always)]
    fn vacant() -> Self {
        Cell {
            arrow: Arrow::Empty,
            slot: None,
        }
    }
}

impl<K: Clone, V: Clone> Clone for Cell<K, V> {
    fn clone(&self) -> Self {
        Cell {
            arrow: self.arrow,
            slot: self.slot.clone(),
        }
    }
}

/// Fixed-capacity array of cells.
///
/// Indices handed to the accessors must be below [`capacity`]; every caller
/// derives them from `home_of`, `next` or `prev`, which stay in range.
///
/// [`capacity`]: SlotStore::capacity
pub(crate) struct SlotStore<K, V> {
    cells: Vec<Cell<K, V>>,
}

impl<K, V> SlotStore<K, V> {
    /// A store with no cells and no allocation.
    pub(crate) fn new() -> Self {
        SlotStore { cells: Vec::new() }
    }

    /// Allocates `capacity` cells, all unoccupied and marked
    /// [`Arrow::Empty`].
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self> {
        let layout = Layout::array::<Cell<K, V>>(capacity)
            .map_err(|_| Error::CapacityOverflow { capacity })?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationError {
                bytes: layout.size(),
            })?;
        cells.resize_with(capacity, Cell::vacant);

        Ok(SlotStore { cells })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Bytes held by the cell array.
    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.cells.capacity() * core::mem::size_of::<Cell<K, V>>()
    }

    #[inline(always)]
    pub(crate) fn home_of(&self, hash: u64) -> usize {
        debug_assert!(self.capacity() > 0);
        (hash % self.capacity() as u64) as usize
    }

    #[inline(always)]
    pub(crate) fn next(&self, index: usize) -> usize {
        let next = index + 1;
        if next == self.capacity() { 0 } else { next }
    }

    #[inline(always)]
    pub(crate) fn prev(&self, index: usize) -> usize {
        if index == 0 {
            self.capacity() - 1
        } else {
            index - 1
        }
    }

    /// Cyclic distance walking forward from `from` to `to`.
    #[inline(always)]
    pub(crate) fn distance(&self, from: usize, to: usize) -> usize {
        if to >= from {
            to - from
        } else {
            to + self.capacity() - from
        }
    }

    /// Index `offset` cells after `index`, wrapping around.
    #[inline(always)]
    pub(crate) fn advance(&self, index: usize, offset: usize) -> usize {
        (index + offset % self.capacity()) % self.capacity()
    }

    #[inline(always)]
    pub(crate) fn arrow(&self, index: usize) -> Arrow {
        self.cells[index].arrow
    }

    #[inline(always)]
    pub(crate) fn set_arrow(&mut self, index: usize, arrow: Arrow) {
        self.cells[index].arrow = arrow;
    }

    #[inline(always)]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        self.cells[index].slot.is_some()
    }

    #[inline(always)]
    pub(crate) fn slot(&self, index: usize) -> Option<&Slot<K, V>> {
        self.cells[index].slot.as_ref()
    }

    #[inline(always)]
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot<K, V>> {
        self.cells[index].slot.as_mut()
    }

    #[inline(always)]
    pub(crate) fn take(&mut self, index: usize) -> Option<Slot<K, V>> {
        self.cells[index].slot.take()
    }

    #[inline(always)]
    pub(crate) fn fill(&mut self, index: usize, slot: Slot<K, V>) {
        debug_assert!(!self.is_occupied(index));
        self.cells[index].slot = Some(slot);
    }

    /// Moves the element at `from` into the empty cell `to`.
    pub(crate) fn relocate(&mut self, from: usize, to: usize) -> Result<()> {
        let slot = self
            .take(from)
            .ok_or_else(|| Error::invariant("relocating an unoccupied cell", from))?;
        if self.is_occupied(to) {
            return Err(Error::invariant("relocating onto an occupied cell", to));
        }
        self.fill(to, slot);
        Ok(())
    }

    /// First unoccupied cell at or after `start`, scanning at most one full
    /// cycle.
    pub(crate) fn find_free(&self, start: usize) -> Option<usize> {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }

        self.cells[start..]
            .iter()
            .position(|cell| cell.slot.is_none())
            .map(|offset| start + offset)
            .or_else(|| {
                self.cells[..start]
                    .iter()
                    .position(|cell| cell.slot.is_none())
            })
    }

    /// Drops every element and resets every marker to [`Arrow::Empty`].
    pub(crate) fn reset(&mut self) {
        for cell in self.cells.iter_mut() {
            *cell = Cell::vacant();
        }
    }

    pub(crate) fn cells(&self) -> &[Cell<K, V>] {
        &self.cells
    }

    /// Consumes the store, yielding every element in physical order.
    pub(crate) fn into_slots(self) -> impl Iterator<Item = Slot<K, V>> {
        self.cells.into_iter().filter_map(|cell| cell.slot)
    }
}

impl<K: Clone, V: Clone> Clone for SlotStore<K, V> {
    fn clone(&self) -> Self {
        SlotStore {
            cells: self.cells.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(hash: u64) -> Slot<u64, u64> {
        Slot {
            hash,
            key: hash,
            value: hash * 10,
        }
    }

    #[test]
    fn starts_empty() {
        let store: SlotStore<u64, u64> = SlotStore::with_capacity(8).unwrap();
        assert_eq!(store.capacity(), 8);
        for index in 0..8 {
            assert_eq!(store.arrow(index), Arrow::Empty);
            assert!(!store.is_occupied(index));
        }
    }

    #[test]
    fn zero_capacity_has_no_cells() {
        let store: SlotStore<u64, u64> = SlotStore::with_capacity(0).unwrap();
        assert_eq!(store.capacity(), 0);
        assert_eq!(store.find_free(0), None);
    }

    #[test]
    fn oversized_request_overflows() {
        let result = SlotStore::<[u64; 64], u64>::with_capacity(usize::MAX / 2);
        assert!(matches!(result, Err(Error::CapacityOverflow { .. })));
    }

    #[test]
    fn cyclic_navigation() {
        let store: SlotStore<u64, u64> = SlotStore::with_capacity(8).unwrap();
        assert_eq!(store.next(7), 0);
        assert_eq!(store.prev(0), 7);
        assert_eq!(store.distance(6, 1), 3);
        assert_eq!(store.distance(1, 6), 5);
        assert_eq!(store.distance(4, 4), 0);
        assert_eq!(store.advance(6, 3), 1);
        assert_eq!(store.home_of(17), 1);
    }

    #[test]
    fn find_free_wraps() {
        let mut store: SlotStore<u64, u64> = SlotStore::with_capacity(4).unwrap();
        store.fill(2, slot(2));
        store.fill(3, slot(3));
        assert_eq!(store.find_free(2), Some(0));
        store.fill(0, slot(4));
        assert_eq!(store.find_free(2), Some(1));
        store.fill(1, slot(5));
        assert_eq!(store.find_free(2), None);
    }

    #[test]
    fn relocate_moves_and_guards() {
        let mut store: SlotStore<u64, u64> = SlotStore::with_capacity(4).unwrap();
        store.fill(1, slot(9));
        store.relocate(1, 2).unwrap();
        assert!(!store.is_occupied(1));
        assert_eq!(store.slot(2).map(|s| s.value), Some(90));

        assert!(matches!(
            store.relocate(1, 3),
            Err(Error::InvariantViolation { index: 1, .. })
        ));
    }

    #[test]
    fn reset_clears_markers() {
        let mut store: SlotStore<u64, u64> = SlotStore::with_capacity(4).unwrap();
        store.fill(0, slot(0));
        store.set_arrow(0, Arrow::Offset(0));
        store.set_arrow(1, Arrow::NoRun);
        store.reset();
        assert!(store.cells().iter().all(|c| c.slot.is_none()));
        assert!(store.cells().iter().all(|c| c.arrow == Arrow::Empty));
    }

    #[test]
    fn arrow_display() {
        use alloc::format;
        assert_eq!(format!("{}", Arrow::Empty), "..");
        assert_eq!(format!("{}", Arrow::NoRun), "--");
        assert_eq!(format!("{}", Arrow::Offset(3)), "03");
        assert_eq!(Arrow::Offset(3).offset(), Some(3));
        assert_eq!(Arrow::NoRun.offset(), None);
    }
}
