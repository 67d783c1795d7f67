use thiserror::Error;

/// Errors surfaced by [`HashTable`](crate::HashTable) and
/// [`HashMap`](crate::HashMap).
///
/// A missing key is never an error: lookups return `None` and removals return
/// [`RemoveOutcome::NotFound`](crate::RemoveOutcome::NotFound).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backing storage for the slot array could not be obtained.
    #[error("failed to allocate {bytes} bytes of slot storage")]
    AllocationError {
        /// Size of the allocation that failed.
        bytes: usize,
    },

    /// The byte size of the requested slot array is not representable.
    #[error("slot array of {capacity} cells overflows the address space")]
    CapacityOverflow {
        /// Requested number of cells.
        capacity: usize,
    },

    /// A full cyclic scan from `home` found no free cell.
    ///
    /// The growth policy keeps at least one cell free, so this signals a
    /// corrupted table rather than a full one.
    #[error("no free cell reachable from home bucket {home}")]
    CapacityExceeded {
        /// Home bucket the scan started from.
        home: usize,
    },

    /// The boundary arrows describe a layout that cannot exist.
    #[error("arrow table invariant violated at index {index}: {what}")]
    InvariantViolation {
        /// Which rule was broken.
        what: &'static str,
        /// Cell or bucket where the violation was detected.
        index: usize,
    },
}

impl Error {
    #[cold]
    pub(crate) fn invariant(what: &'static str, index: usize) -> Self {
        tracing::error!(index, what, "arrow table invariant violated");
        Error::InvariantViolation { what, index }
    }

    #[cold]
    pub(crate) fn exhausted(home: usize) -> Self {
        tracing::error!(home, "no free cell found during displacement");
        Error::CapacityExceeded { home }
    }

    /// Returns `true` for the kinds that indicate a bug in the table itself
    /// rather than a resource limit.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::CapacityExceeded { .. } | Error::InvariantViolation { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
