//! # User Record
//!
//! A native record built from two heap allocations, shipped with both a
//! correct destructor and a deliberately broken one. It exists to show how a
//! leak in native code looks from the host side of a language boundary, and
//! how to prove it with an allocation tracker or an external leak checker.
//!
//! ## Overview
//!
//! Each [`UserRecord`] occupies one block and owns a second block holding a
//! NUL-terminated copy of its name:
//!
//! - [`OwnedRecord::create`] allocates both blocks (or neither)
//! - [`OwnedRecord::destroy_complete`] releases both blocks
//! - [`OwnedRecord::destroy_incomplete`] releases the name and leaks the record
//! - [`inspect`] logs the name and id of a borrowed record
//!
//! ```
//! use user_record::{inspect, OwnedRecord};
//!
//! # fn main() -> Result<(), user_record::AllocationFailure> {
//! let user = OwnedRecord::create(c"alice", 42)?;
//! inspect(Some(&user));
//! assert_eq!(user.name(), c"alice");
//! assert_eq!(user.id(), 42);
//! user.destroy_complete();
//! # Ok(())
//! # }
//! ```
//!
//! ## Observing the Leak
//!
//! Route the allocations through a [`TrackingAllocator`] to count what is
//! left behind:
//!
//! ```
//! use user_record::{OwnedRecord, TrackingAllocator, UserRecord};
//!
//! # fn main() -> Result<(), user_record::AllocationFailure> {
//! let tracker = TrackingAllocator::new();
//!
//! OwnedRecord::create_in(&tracker, c"bob", 7)?.destroy_incomplete();
//!
//! let stats = tracker.stats();
//! assert_eq!(stats.live_blocks, 1);
//! assert_eq!(stats.live_bytes, std::mem::size_of::<UserRecord>());
//! # Ok(())
//! # }
//! ```
//!
//! The [`demo`] module repeats this as a workload and renders a heap summary;
//! the `user-record` binary (feature `cli`) runs it from the command line.
//!
//! ## C Hosts
//!
//! The crate also builds as a `cdylib`. The exports in [`ffi`] and the header
//! `include/user_record.h` give C, Go (cgo) or any other host the same four
//! operations on raw pointers. All blocks come from `malloc`, so tools such as
//! valgrind report the leaked record as "definitely lost".
//!
//! ## Diagnostics
//!
//! Create, destroy and inspect each emit one line through the [`log`] facade
//! at info level, including the record's address. Install any logger to see
//! them, or call [`logging::init`] (`user_record_init_logging` from C) to
//! send them to stderr through `env_logger`.
//!
//! ## Thread Safety
//!
//! Records share no state with each other, so different records can be used
//! from different threads. Using the same record from two threads at once
//! (for example destroying while inspecting) is a data race and is not
//! supported.

// Public modules
pub mod alloc;
pub mod demo;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod record;

// Re-export high-level public API
pub use alloc::{AllocStats, LibcAllocator, RawAllocator, TrackingAllocator};
pub use error::{AllocationFailure, AllocationStage};
pub use record::{inspect, OwnedRecord, UserRecord};
