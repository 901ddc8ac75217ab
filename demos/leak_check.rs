//! Leak detection example - run with valgrind/leaks/instruments
//!
//! Exercises only the correct destroy routine, so a leak checker should
//! report nothing attributable to `user_record`.
//!
//! Usage:
//!   cargo build --example leak_check --release
//!
//! macOS:
//!   leaks --atExit -- ./target/release/examples/leak_check
//!
//! Linux:
//!   valgrind --leak-check=full ./target/release/examples/leak_check

use user_record::{inspect, logging, OwnedRecord};

fn main() {
    logging::init();

    println!("Running leak detection test...");
    println!("Iterations: 10,000");

    for i in 0..10000 {
        let user = OwnedRecord::create(c"Fixed User", 456).expect("allocation failed");
        inspect(Some(&user));
        user.destroy_complete();

        if i % 1000 == 0 {
            println!("  Completed {} iterations", i);
        }
    }

    println!("Done. Check for leaks.");
}
