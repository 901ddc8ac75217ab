//! Intentional memory leak example - FOR TESTING LEAK DETECTION ONLY
//!
//! ⚠️  WARNING: This program INTENTIONALLY leaks memory! ⚠️
//!
//! Every iteration destroys its record with the buggy routine, which frees
//! the name but never the record block. Leak checkers must report one
//! record-sized block per iteration as definitely lost in `user_record_create`.
//!
//! Usage:
//!   cargo build --example intentional_leak --release
//!
//! macOS:
//!   leaks --atExit -- ./target/release/examples/intentional_leak
//!
//! Linux:
//!   valgrind --leak-check=full --show-leak-kinds=all ./target/release/examples/intentional_leak
//!
//! Expected result: LEAK DETECTED (10 blocks of 16 bytes on 64-bit targets)

use std::mem;
use user_record::ffi;
use user_record::UserRecord;

fn main() {
    println!("=== INTENTIONAL MEMORY LEAK TEST ===");
    println!("⚠️  This program INTENTIONALLY leaks memory to validate leak detection! ⚠️");
    println!();

    // Go through the C exports, the way a foreign host would
    ffi::user_record_init_logging();
    unsafe {
        for _ in 0..10 {
            let user = ffi::user_record_create(c"Leaky User".as_ptr(), 123);
            if user.is_null() {
                eprintln!("allocation failed");
                return;
            }
            ffi::user_record_inspect(user);
            ffi::user_record_destroy_incomplete(user);
        }
    }

    let record_size = mem::size_of::<UserRecord>();
    println!("  Leaked: {} bytes in 10 blocks via user_record_destroy_incomplete", 10 * record_size);
    println!("  ✓ This MUST be detected by leak tools");
    println!();
    println!("If NO leaks are detected, the tool is not working.");
}
