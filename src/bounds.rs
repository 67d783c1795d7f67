use crate::error::Error;
use crate::error::Result;
use crate::slot_store::Arrow;
use crate::slot_store::SlotStore;

/// The cyclic, end-exclusive range of cells occupied by one home bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// First cell of the run. For an empty run this is where the run would
    /// begin.
    pub start: usize,
    /// Number of cells in the run.
    pub len: usize,
}

impl Bounds {
    #[inline(always)]
    pub(crate) fn empty(start: usize) -> Self {
        Bounds { start, len: 0 }
    }

    /// Returns `true` if the run holds no cells.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last cell of the run, wrapped to `capacity`.
    #[inline(always)]
    pub fn end(&self, capacity: usize) -> usize {
        (self.start + self.len) % capacity
    }

    /// Last cell of the run, wrapped to `capacity`.
    ///
    /// Only meaningful for non-empty runs.
    #[inline(always)]
    pub fn last(&self, capacity: usize) -> usize {
        debug_assert!(self.len > 0);
        (self.start + self.len - 1) % capacity
    }

    /// The cell indices of the run in order.
    pub fn indices(&self, capacity: usize) -> impl Iterator<Item = usize> + use<> {
        let start = self.start;
        (0..self.len).map(move |step| (start + step) % capacity)
    }
}

/// Decodes the run of `home` from its arrow and its successor's arrow.
///
/// | `arrow(home)` | `arrow(home + 1)` | run |
/// |---|---|---|
/// | `Empty` | any | empty |
/// | `NoRun` | any | empty |
/// | `Offset(0)` | `NoRun` | `[home, home + 1)` |
/// | `Offset(1)` | `NoRun` | empty, positioned at `home + 1` |
/// | `Offset(k)` | `Offset(m)` | `[home + k, home + 1 + m)` with `k <= m + 1` |
///
/// Every other pairing is an [`Error::InvariantViolation`].
pub(crate) fn get_bounds<K, V>(store: &SlotStore<K, V>, home: usize) -> Result<Bounds> {
    let capacity = store.capacity();
    debug_assert!(home < capacity);

    let next = store.next(home);
    match (store.arrow(home), store.arrow(next)) {
        (Arrow::Empty, _) | (Arrow::NoRun, _) => Ok(Bounds::empty(home)),
        (Arrow::Offset(0), Arrow::NoRun) => Ok(Bounds {
            start: home,
            len: 1,
        }),
        (Arrow::Offset(1), Arrow::NoRun) => Ok(Bounds::empty(next)),
        (Arrow::Offset(start), Arrow::Offset(end)) => {
            if start >= capacity || end >= capacity {
                return Err(Error::invariant("arrow offset wraps the table", home));
            }
            // The run ends where the successor's run starts: `next + end`.
            let Some(len) = (end + 1).checked_sub(start) else {
                return Err(Error::invariant("run ends before it starts", home));
            };
            if len > capacity {
                return Err(Error::invariant("run longer than the table", home));
            }
            Ok(Bounds {
                start: store.advance(home, start),
                len,
            })
        }
        (Arrow::Offset(_), Arrow::NoRun) => Err(Error::invariant(
            "displaced run terminated by a bucket without a run",
            home,
        )),
        (Arrow::Offset(_), Arrow::Empty) => {
            Err(Error::invariant("run terminated by a never-written cell", home))
        }
    }
}
