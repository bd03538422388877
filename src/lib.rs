//! jitarena - per-method memory for a JIT/AOT compiler.
//!
//! Every transient structure built while compiling one method (basic blocks,
//! SSA tables, LSRA intervals, debug info, ...) lives in an [`Arena`] that is
//! torn down in one step when the method is done. Each allocation is tagged
//! with a [`MemKind`] so the driver can report which phase used how much.
//!
//! # Primary Usage
//!
//! ```
//! use jitarena::core::{Arena, CompilationSession, MemKind, MemStatsAggregator};
//!
//! let mut arena = Arena::new();
//! let mut stats = MemStatsAggregator::new();
//!
//! let report = {
//!     let session = CompilationSession::new(&arena, "Program::Main");
//!     let intervals = session.allocator(MemKind::LsraInterval);
//!     intervals.alloc_bytes(64)?;
//!     session.finish()?
//! };
//! stats.record(&report.unit_name, &report.snapshot);
//!
//! arena.teardown()?;
//! # Ok::<(), jitarena::core::ArenaError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Kind registry, page manager, arena, snapshots, session
//! - [`metrics`] - Aggregate compilation metrics summary file
//! - [`bundle`] - Single-file bundle manifest reader

pub mod bundle;
pub mod core;
pub mod metrics;

pub use self::core::{
    Arena, ArenaConfig, ArenaError, ArenaResult, ArenaState, CompilationSession, KindAllocator,
    KindUsage, MemKind, MemStatsAggregator, UsageSnapshot,
};
pub use self::metrics::{MetricsError, MetricsSummary};
pub use self::bundle::{FileEntry, FileType, Manifest, ManifestError, Reader};
