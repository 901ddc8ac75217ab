//! Tests for the record module

use super::*;
use crate::alloc::TrackingAllocator;
use std::ffi::CString;

const RECORD_SIZE: usize = mem::size_of::<UserRecord>();

#[test]
fn test_record_layout_matches_c() {
    // { char *name; int id; } padded to pointer alignment
    assert_eq!(RECORD_SIZE, 2 * mem::size_of::<*mut c_char>());
    assert_eq!(mem::align_of::<UserRecord>(), mem::align_of::<*mut c_char>());
}

#[test]
fn test_create_populates_fields() {
    let tracker = TrackingAllocator::new();
    let record = OwnedRecord::create_in(&tracker, c"alice", 42).unwrap();

    assert_eq!(record.name(), c"alice");
    assert_eq!(record.id(), 42);
    assert_eq!(record.to_string(), "User: alice, id: 42");

    // one record block plus "alice\0"
    assert_eq!(tracker.live_sizes(), vec![6, RECORD_SIZE]);
    record.destroy_complete();
}

#[test]
fn test_create_copies_name() {
    let tracker = TrackingAllocator::new();
    let mut buffer = CString::new("carol").unwrap().into_bytes_with_nul();

    let record = {
        let name = CStr::from_bytes_with_nul(&buffer).unwrap();
        OwnedRecord::create_in(&tracker, name, 3).unwrap()
    };

    // Scribbling over the caller's buffer must not reach the record
    buffer[0] = b'X';
    assert_eq!(record.name(), c"carol");
    assert_ne!(record.name().as_ptr(), buffer.as_ptr() as *const c_char);
    record.destroy_complete();
}

#[test]
fn test_destroy_complete_releases_everything() {
    let tracker = TrackingAllocator::new();
    let record = OwnedRecord::create_in(&tracker, c"alice", 42).unwrap();
    assert_eq!(tracker.stats().live_blocks, 2);

    record.destroy_complete();

    let stats = tracker.stats();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.total_allocs, 2);
    assert_eq!(stats.total_frees, 2);
}

#[test]
fn test_drop_releases_everything() {
    let tracker = TrackingAllocator::new();
    {
        let _record = OwnedRecord::create_in(&tracker, c"scoped", 1).unwrap();
    }
    assert_eq!(tracker.stats().live_blocks, 0);
}

#[test]
fn test_destroy_incomplete_leaks_record_block() {
    let tracker = TrackingAllocator::new();
    let record = OwnedRecord::create_in(&tracker, c"bob", 7).unwrap();
    let address = record.as_ptr() as *const u8;

    record.destroy_incomplete();

    let stats = tracker.stats();
    assert_eq!(stats.live_blocks, 1);
    assert_eq!(stats.live_bytes, RECORD_SIZE);
    assert_eq!(stats.total_frees, 1);
    // The survivor is the record block, not the name
    assert!(tracker.is_live(address));
    assert_eq!(tracker.live_sizes(), vec![RECORD_SIZE]);
}

#[test]
fn test_leak_accumulates_per_call() {
    let tracker = TrackingAllocator::new();
    for id in 0..10 {
        OwnedRecord::create_in(&tracker, c"Leaky User", id)
            .unwrap()
            .destroy_incomplete();
    }

    let stats = tracker.stats();
    assert_eq!(stats.live_blocks, 10);
    assert_eq!(stats.live_bytes, 10 * RECORD_SIZE);
}

#[test]
fn test_record_allocation_failure() {
    let tracker = TrackingAllocator::new();
    tracker.fail_after(0);

    let err = OwnedRecord::create_in(&tracker, c"alice", 42).unwrap_err();
    assert_eq!(err.stage, AllocationStage::Record);
    assert_eq!(err.requested, RECORD_SIZE);

    let stats = tracker.stats();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.total_allocs, 0);
    assert_eq!(stats.failed_allocs, 1);
}

#[test]
fn test_name_allocation_failure_releases_record() {
    let tracker = TrackingAllocator::new();
    tracker.fail_after(1);

    let err = OwnedRecord::create_in(&tracker, c"alice", 42).unwrap_err();
    assert_eq!(err.stage, AllocationStage::Name);
    assert_eq!(err.requested, 6);

    let stats = tracker.stats();
    assert_eq!(stats.live_blocks, 0);
    assert_eq!(stats.total_allocs, 1);
    assert_eq!(stats.total_frees, 1);
    assert_eq!(stats.failed_allocs, 1);
}

#[test]
fn test_records_are_independent() {
    let tracker = TrackingAllocator::new();
    let first = OwnedRecord::create_in(&tracker, c"first", 1).unwrap();
    let second = OwnedRecord::create_in(&tracker, c"second", 2).unwrap();

    first.destroy_complete();

    inspect(Some(&second));
    assert_eq!(second.name(), c"second");
    assert_eq!(second.id(), 2);
    assert_eq!(tracker.stats().live_blocks, 2);

    second.destroy_complete();
    assert_eq!(tracker.stats().live_blocks, 0);
}

#[test]
fn test_inspect_none_is_noop() {
    inspect(None);
}

#[test]
fn test_empty_name() {
    let tracker = TrackingAllocator::new();
    let record = OwnedRecord::create_in(&tracker, c"", -1).unwrap();

    assert_eq!(record.name(), c"");
    assert_eq!(record.id(), -1);
    assert_eq!(tracker.live_sizes(), vec![1, RECORD_SIZE]);
    record.destroy_complete();
}

#[test]
fn test_extreme_ids() {
    for id in [i32::MIN, 0, i32::MAX] {
        let record = OwnedRecord::create(c"edge", id).unwrap();
        assert_eq!(record.id(), id);
        record.destroy_complete();
    }
}

#[test]
fn test_raw_round_trip() {
    let tracker = TrackingAllocator::new();
    let record = OwnedRecord::create_in(&tracker, c"raw", 9).unwrap();

    let raw = record.into_raw();
    assert_eq!(tracker.stats().live_blocks, 2);

    let record = unsafe { OwnedRecord::from_raw_in(NonNull::new(raw).unwrap(), &tracker) };
    assert_eq!(record.name(), c"raw");
    record.destroy_complete();
    assert_eq!(tracker.stats().live_blocks, 0);
}

#[test]
fn test_debug_output() {
    let record = OwnedRecord::create(c"dbg", 5).unwrap();
    let debug_str = format!("{:?}", record);
    assert!(debug_str.contains("OwnedRecord"));
    assert!(debug_str.contains("dbg"));
}
