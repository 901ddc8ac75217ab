//! Error types for record allocation
//!
//! Allocation failure is the only condition the record operations report.
//! Misuse of a handle (destroying twice, reading after destruction) is a
//! contract violation and is never surfaced as an error value.

use std::fmt;
use std::io;

/// Which of the two allocations performed by `create` failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStage {
    /// The block holding the record itself
    Record,
    /// The block holding the copied name payload
    Name,
}

impl fmt::Display for AllocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStage::Record => write!(f, "record storage"),
            AllocationStage::Name => write!(f, "name payload"),
        }
    }
}

/// The allocator could not satisfy a request made while creating a record
///
/// When this is returned no allocation made by the failed call remains
/// outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationFailure {
    /// The allocation that failed
    pub stage: AllocationStage,
    /// Size of the failed request in bytes
    pub requested: usize,
}

impl AllocationFailure {
    pub(crate) fn new(stage: AllocationStage, requested: usize) -> Self {
        AllocationFailure { stage, requested }
    }
}

impl fmt::Display for AllocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to allocate {} bytes for the {}",
            self.requested, self.stage
        )
    }
}

impl std::error::Error for AllocationFailure {}

// Conversion to io::Error so callers returning io::Result can use `?`
impl From<AllocationFailure> for io::Error {
    fn from(err: AllocationFailure) -> Self {
        io::Error::new(io::ErrorKind::OutOfMemory, err)
    }
}
