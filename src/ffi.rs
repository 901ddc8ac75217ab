//! C ABI for foreign hosts
//!
//! These exports mirror `include/user_record.h` and work on raw pointers.
//! Both blocks of every record come from the C heap, so a host's leak checker
//! attributes the leaked record block to `user_record_create`.
//!
//! Ownership crosses the boundary with the pointer: a host that receives a
//! record from [`user_record_create`] must pass it to exactly one of the
//! destroy exports and must not touch it afterwards.

use crate::alloc::LIBC;
use crate::logging;
use crate::record::{self, UserRecord};
use log::warn;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

/// Send record diagnostics to stderr
///
/// Without this (or a logger installed by Rust code) the create, destroy
/// and inspect lines go nowhere. Returns 1 if the logger was installed by
/// this call, 0 if one was already in place.
#[no_mangle]
pub extern "C" fn user_record_init_logging() -> c_int {
    c_int::from(logging::init())
}

/// Create a record holding a copy of `name`
///
/// Returns null if an allocation fails or if `name` is null.
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn user_record_create(name: *const c_char, id: c_int) -> *mut UserRecord {
    if name.is_null() {
        warn!("user_record_create called with a null name");
        return ptr::null_mut();
    }

    match record::create_raw(&LIBC, CStr::from_ptr(name), id) {
        Ok(record) => record.as_ptr(),
        Err(err) => {
            warn!("{}", err);
            ptr::null_mut()
        }
    }
}

/// Release the name of `record` but not the record itself
///
/// Every call leaks one record-sized block. Null is ignored.
///
/// # Safety
///
/// `record` must be null or a live record from [`user_record_create`].
#[no_mangle]
pub unsafe extern "C" fn user_record_destroy_incomplete(record: *mut UserRecord) {
    if let Some(record) = NonNull::new(record) {
        record::destroy_incomplete_raw(&LIBC, record);
    }
}

/// Release the name of `record` and the record itself
///
/// Null is ignored.
///
/// # Safety
///
/// `record` must be null or a live record from [`user_record_create`].
#[no_mangle]
pub unsafe extern "C" fn user_record_destroy_complete(record: *mut UserRecord) {
    if let Some(record) = NonNull::new(record) {
        record::destroy_complete_raw(&LIBC, record);
    }
}

/// Log the name and id of `record`; does nothing for null
///
/// # Safety
///
/// `record` must be null or a live record from [`user_record_create`].
#[no_mangle]
pub unsafe extern "C" fn user_record_inspect(record: *const UserRecord) {
    record::inspect(record.as_ref());
}

/// Borrow the name of `record`, or null for a null record
///
/// The returned string is owned by the record and dies with it.
///
/// # Safety
///
/// `record` must be null or a live record from [`user_record_create`].
#[no_mangle]
pub unsafe extern "C" fn user_record_name(record: *const UserRecord) -> *const c_char {
    match record.as_ref() {
        Some(record) => record.name().as_ptr(),
        None => ptr::null(),
    }
}

/// The id of `record`, or 0 for a null record
///
/// # Safety
///
/// `record` must be null or a live record from [`user_record_create`].
#[no_mangle]
pub unsafe extern "C" fn user_record_id(record: *const UserRecord) -> c_int {
    record.as_ref().map_or(0, UserRecord::id)
}
