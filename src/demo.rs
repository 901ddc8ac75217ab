//! Repeated create/inspect/destroy workloads and their heap summary
//!
//! Each iteration plays one request against the record API: create a user,
//! inspect it, then destroy it with either the leaky or the fixed routine.
//! Running the leaky workload long enough makes the growth of outstanding
//! record blocks obvious in the stats lines and in the final summary.

use crate::alloc::{AllocStats, RawAllocator, TrackingAllocator};
use crate::error::AllocationFailure;
use crate::record::{inspect, OwnedRecord};
use log::info;
use std::ffi::{CStr, CString};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Which destroy routine the workload uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Destroy with `destroy_incomplete`, leaking one block per iteration
    Leaky,
    /// Destroy with `destroy_complete`
    Fixed,
}

impl Mode {
    /// Name used for records when none is configured
    pub fn default_name(self) -> &'static CStr {
        match self {
            Mode::Leaky => c"Leaky User",
            Mode::Fixed => c"Fixed User",
        }
    }

    /// Id used for records when none is configured
    pub fn default_id(self) -> i32 {
        match self {
            Mode::Leaky => 123,
            Mode::Fixed => 456,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Leaky => write!(f, "leaky"),
            Mode::Fixed => write!(f, "fixed"),
        }
    }
}

/// Configuration for a workload run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Destroy routine to exercise
    pub mode: Mode,
    /// Number of create/inspect/destroy cycles
    pub iterations: usize,
    /// Record name; the mode's default when `None`
    pub name: Option<CString>,
    /// Record id; the mode's default when `None`
    pub id: Option<i32>,
    /// Log a stats line every this many iterations (0 disables)
    pub report_every: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            mode: Mode::Leaky,
            iterations: 1000,
            name: None,
            id: None,
            report_every: 100,
        }
    }
}

impl DemoConfig {
    /// Create a new configuration with defaults for `mode`
    pub fn new(mode: Mode) -> Self {
        DemoConfig {
            mode,
            ..Default::default()
        }
    }

    fn name(&self) -> &CStr {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.mode.default_name())
    }

    fn id(&self) -> i32 {
        self.id.unwrap_or_else(|| self.mode.default_id())
    }
}

/// Run the configured workload against `tracker`
///
/// Stops at the first allocation failure.
pub fn run<A: RawAllocator>(
    config: &DemoConfig,
    tracker: &TrackingAllocator<A>,
) -> Result<HeapSummary, AllocationFailure> {
    let name = config.name();
    let id = config.id();

    info!(
        "Running {} workload: {} iterations of {:?}, id {}",
        config.mode, config.iterations, name, id
    );

    for i in 0..config.iterations {
        let record = OwnedRecord::create_in(tracker, name, id)?;
        inspect(Some(&record));

        match config.mode {
            Mode::Leaky => record.destroy_incomplete(),
            Mode::Fixed => record.destroy_complete(),
        }

        if config.report_every > 0 && (i + 1) % config.report_every == 0 {
            info!("[{}/{}] {}", i + 1, config.iterations, tracker.stats());
        }
    }

    Ok(HeapSummary::new(config.mode, config.iterations, tracker))
}

/// End-of-run heap report in the style of a leak checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSummary {
    /// Destroy routine that was exercised
    pub mode: Mode,
    /// Completed iterations
    pub iterations: usize,
    /// Tracker counters at the end of the run
    pub stats: AllocStats,
    /// Outstanding blocks grouped by size, ascending
    pub lost: Vec<LossRecord>,
}

/// Outstanding blocks of one size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossRecord {
    /// Size of each block in bytes
    pub block_size: usize,
    /// Number of blocks of that size
    pub blocks: usize,
}

impl LossRecord {
    /// Total bytes held by these blocks
    pub fn bytes(&self) -> usize {
        self.block_size * self.blocks
    }
}

impl HeapSummary {
    /// Summarise the current state of `tracker`
    pub fn new<A: RawAllocator>(
        mode: Mode,
        iterations: usize,
        tracker: &TrackingAllocator<A>,
    ) -> Self {
        let mut lost: Vec<LossRecord> = Vec::new();
        for size in tracker.live_sizes() {
            match lost.last_mut() {
                Some(last) if last.block_size == size => last.blocks += 1,
                _ => lost.push(LossRecord {
                    block_size: size,
                    blocks: 1,
                }),
            }
        }

        HeapSummary {
            mode,
            iterations,
            stats: tracker.stats(),
            lost,
        }
    }

    /// Whether any block is still outstanding
    pub fn has_leaks(&self) -> bool {
        self.stats.live_blocks > 0
    }

    /// Write the summary to any writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", self)?;
        writer.flush()
    }

    /// Write the summary to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

impl fmt::Display for HeapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f, "HEAP SUMMARY ({} mode, {} iterations):", self.mode, self.iterations)?;
        writeln!(
            f,
            "    in use at exit: {} bytes in {} blocks",
            stats.live_bytes, stats.live_blocks
        )?;
        writeln!(
            f,
            "  total heap usage: {} allocs, {} frees, {} bytes allocated",
            stats.total_allocs, stats.total_frees, stats.bytes_allocated
        )?;

        if self.lost.is_empty() {
            return writeln!(f, "All heap blocks were freed -- no leaks are possible");
        }

        for (i, record) in self.lost.iter().enumerate() {
            writeln!(
                f,
                "{} bytes in {} blocks ({} bytes each) are definitely lost in loss record {} of {}",
                record.bytes(),
                record.blocks,
                record.block_size,
                i + 1,
                self.lost.len()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UserRecord;
    use std::mem;

    #[test]
    fn test_defaults_follow_mode() {
        let leaky = DemoConfig::new(Mode::Leaky);
        assert_eq!(leaky.name(), c"Leaky User");
        assert_eq!(leaky.id(), 123);

        let fixed = DemoConfig::new(Mode::Fixed);
        assert_eq!(fixed.name(), c"Fixed User");
        assert_eq!(fixed.id(), 456);
    }

    #[test]
    fn test_fixed_run_is_clean() {
        let tracker = TrackingAllocator::new();
        let config = DemoConfig {
            iterations: 50,
            report_every: 10,
            ..DemoConfig::new(Mode::Fixed)
        };

        let summary = run(&config, &tracker).unwrap();
        assert!(!summary.has_leaks());
        assert_eq!(summary.stats.total_allocs, 100);
        assert_eq!(summary.stats.total_frees, 100);
        assert!(summary.lost.is_empty());
        assert!(summary.to_string().contains("no leaks are possible"));
    }

    #[test]
    fn test_leaky_run_loses_one_block_per_iteration() {
        let tracker = TrackingAllocator::new();
        let config = DemoConfig {
            iterations: 10,
            ..DemoConfig::new(Mode::Leaky)
        };

        let summary = run(&config, &tracker).unwrap();
        let record_size = mem::size_of::<UserRecord>();

        assert!(summary.has_leaks());
        assert_eq!(summary.stats.live_blocks, 10);
        assert_eq!(
            summary.lost,
            vec![LossRecord {
                block_size: record_size,
                blocks: 10
            }]
        );
        assert!(summary.to_string().contains("definitely lost"));
    }

    #[test]
    fn test_run_stops_on_allocation_failure() {
        let tracker = TrackingAllocator::new();
        // Two full iterations, then the record block of the third fails
        tracker.fail_after(4);

        let config = DemoConfig {
            iterations: 5,
            ..DemoConfig::new(Mode::Fixed)
        };
        assert!(run(&config, &tracker).is_err());
        assert_eq!(tracker.stats().live_blocks, 0);
    }
}
