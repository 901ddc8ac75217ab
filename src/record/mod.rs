//! The two-allocation user record
//!
//! A [`UserRecord`] lives in one heap block and points at a second block
//! holding a NUL-terminated copy of its name. Destroying a record correctly
//! means releasing both blocks; [`OwnedRecord::destroy_incomplete`] releases
//! only the name and leaks the record block on every call.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► Live ──┬─ destroy_incomplete ──► Leaked    (record block still allocated)
//!                   └─ destroy_complete   ──► Destroyed (nothing left)
//! ```
//!
//! ```
//! use user_record::{inspect, OwnedRecord, TrackingAllocator};
//!
//! # fn main() -> Result<(), user_record::AllocationFailure> {
//! let tracker = TrackingAllocator::new();
//!
//! let fixed = OwnedRecord::create_in(&tracker, c"Fixed User", 456)?;
//! inspect(Some(&fixed));
//! fixed.destroy_complete();
//! assert_eq!(tracker.stats().live_blocks, 0);
//!
//! let leaky = OwnedRecord::create_in(&tracker, c"Leaky User", 123)?;
//! leaky.destroy_incomplete();
//! assert_eq!(tracker.stats().live_blocks, 1); // the record block, forever
//! # Ok(())
//! # }
//! ```

use crate::alloc::{LibcAllocator, RawAllocator, LIBC};
use crate::error::{AllocationFailure, AllocationStage};
use log::info;
use std::ffi::CStr;
use std::fmt;
use std::mem::{self, ManuallyDrop};
use std::ops::Deref;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

#[cfg(test)]
mod tests;

/// A user record with the C layout `{ char *name; int id; }`
///
/// Values of this type only exist behind a pointer returned by the create
/// operation; `&UserRecord` is the borrowed reference used for inspection.
#[repr(C)]
#[derive(Debug)]
pub struct UserRecord {
    name: *mut c_char,
    id: c_int,
}

impl UserRecord {
    /// The record's copy of the name
    pub fn name(&self) -> &CStr {
        // name is non-null and NUL terminated for as long as the record is live
        unsafe { CStr::from_ptr(self.name) }
    }

    /// The id given at creation
    pub fn id(&self) -> i32 {
        self.id
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User: {}, id: {}", self.name().to_string_lossy(), self.id)
    }
}

/// Allocate a record and a copy of `name` from `alloc`
///
/// On failure nothing allocated by this call is left outstanding.
pub(crate) fn create_raw<A: RawAllocator + ?Sized>(
    alloc: &A,
    name: &CStr,
    id: c_int,
) -> Result<NonNull<UserRecord>, AllocationFailure> {
    let record_size = mem::size_of::<UserRecord>();
    let record = alloc
        .allocate(record_size)
        .ok_or(AllocationFailure::new(AllocationStage::Record, record_size))?
        .cast::<UserRecord>();

    let bytes = name.to_bytes_with_nul();
    let Some(payload) = alloc.allocate(bytes.len()) else {
        unsafe { alloc.release(record.cast()) };
        return Err(AllocationFailure::new(AllocationStage::Name, bytes.len()));
    };

    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), payload.as_ptr(), bytes.len());
        record.as_ptr().write(UserRecord {
            name: payload.as_ptr() as *mut c_char,
            id,
        });
    }

    info!(
        "Created user: {}, id: {} at {:p}",
        name.to_string_lossy(),
        id,
        record
    );
    Ok(record)
}

/// Release the name of `record` and leave the record block allocated
///
/// # Safety
///
/// `record` must be live and come from `alloc`. Afterwards it must not be
/// used again.
pub(crate) unsafe fn destroy_incomplete_raw<A: RawAllocator + ?Sized>(
    alloc: &A,
    record: NonNull<UserRecord>,
) {
    info!("Freeing user at {:p}", record);
    release_name(alloc, record);
    // the record block itself is never released
}

/// Release the name of `record`, then the record block
///
/// # Safety
///
/// `record` must be live and come from `alloc`. Afterwards it must not be
/// used again.
pub(crate) unsafe fn destroy_complete_raw<A: RawAllocator + ?Sized>(
    alloc: &A,
    record: NonNull<UserRecord>,
) {
    info!("Freeing user at {:p}", record);
    release_name(alloc, record);
    alloc.release(record.cast());
}

unsafe fn release_name<A: RawAllocator + ?Sized>(alloc: &A, record: NonNull<UserRecord>) {
    let name = (*record.as_ptr()).name;
    if let Some(name) = NonNull::new(name as *mut u8) {
        alloc.release(name);
    }
}

/// Log the name and id of a record; does nothing for `None`
pub fn inspect(record: Option<&UserRecord>) {
    if let Some(record) = record {
        info!("{}", record);
    }
}

/// The owned handle to a live record
///
/// The holder is responsible for destroying the record exactly once, either
/// with [`destroy_complete`](Self::destroy_complete) or with the leaky
/// [`destroy_incomplete`](Self::destroy_incomplete). Dropping the handle
/// performs the complete destruction.
pub struct OwnedRecord<'a, A: RawAllocator = LibcAllocator> {
    ptr: NonNull<UserRecord>,
    alloc: &'a A,
}

// The two blocks belong to this handle alone
unsafe impl<A: RawAllocator + Sync> Send for OwnedRecord<'_, A> {}

impl OwnedRecord<'static> {
    /// Create a record on the C heap
    ///
    /// The name is copied; the caller's buffer is not retained.
    pub fn create(name: &CStr, id: i32) -> Result<Self, AllocationFailure> {
        Self::create_in(&LIBC, name, id)
    }
}

impl<'a, A: RawAllocator> OwnedRecord<'a, A> {
    /// Create a record with both blocks taken from `alloc`
    ///
    /// # Errors
    ///
    /// Returns [`AllocationFailure`] if either allocation fails. If the name
    /// allocation fails the record block is released first.
    pub fn create_in(alloc: &'a A, name: &CStr, id: i32) -> Result<Self, AllocationFailure> {
        let ptr = create_raw(alloc, name, id)?;
        Ok(OwnedRecord { ptr, alloc })
    }

    /// Release the name and leak the record block
    ///
    /// The record block stays allocated and unreachable for the rest of the
    /// process. This reproduces the classic "freed the field, forgot the
    /// struct" bug.
    pub fn destroy_incomplete(self) {
        let this = ManuallyDrop::new(self);
        unsafe { destroy_incomplete_raw(this.alloc, this.ptr) }
    }

    /// Release both the name and the record block
    pub fn destroy_complete(self) {
        drop(self)
    }

    /// Address of the record block
    pub fn as_ptr(&self) -> *const UserRecord {
        self.ptr.as_ptr()
    }

    /// Give up ownership without releasing anything
    ///
    /// The pointer must eventually reach one of the destroy operations, for
    /// example through [`from_raw_in`](Self::from_raw_in) or the C exports.
    pub fn into_raw(self) -> *mut UserRecord {
        let this = ManuallyDrop::new(self);
        this.ptr.as_ptr()
    }

    /// Take ownership of a record created from `alloc`
    ///
    /// # Safety
    ///
    /// `ptr` must be a live record whose blocks both came from `alloc`, and
    /// no other owner may destroy it.
    pub unsafe fn from_raw_in(ptr: NonNull<UserRecord>, alloc: &'a A) -> Self {
        OwnedRecord { ptr, alloc }
    }
}

impl<A: RawAllocator> Deref for OwnedRecord<'_, A> {
    type Target = UserRecord;

    fn deref(&self) -> &UserRecord {
        unsafe { self.ptr.as_ref() }
    }
}

impl<A: RawAllocator> Drop for OwnedRecord<'_, A> {
    fn drop(&mut self) {
        unsafe { destroy_complete_raw(self.alloc, self.ptr) }
    }
}

impl<A: RawAllocator> fmt::Debug for OwnedRecord<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedRecord")
            .field("ptr", &self.ptr)
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}
