// This module is the hub of the jitarena allocator core: the memory subsystem every
// compiler phase allocates through while one method is being compiled. It exports the
// kind registry (the closed set of memory categories), the page manager (raw blocks from
// the host, released all at once), the arena itself (bump allocation with per-kind
// counters and an Active/TornDown lifecycle), the typed KindAllocator front end, usage
// snapshots with cross-unit aggregation, and the per-unit CompilationSession the driver
// wraps around an arena.

//! Arena allocator core.
//!
//! # Key Components
//!
//! ## Kind Registry (`kind`)
//! - Closed [`MemKind`] enumeration with stable diagnostic names
//! - `ZeroInit` is the only kind that changes allocator behaviour
//!
//! ## Page Manager (`page`)
//! - Default-sized pages for ordinary requests, exact-fit pages for oversized ones
//! - Bulk release on teardown or drop, optional poisoning
//!
//! ## Arena (`arena`)
//! - Bump allocation tagged by kind
//! - Per-kind allocation count and byte counters
//!
//! ## Snapshots (`snapshot`)
//! - Owned copies of the counters that outlive the arena
//! - Aggregation across many compiled units

pub mod allocator;
pub mod arena;
pub mod error;
pub mod kind;
pub mod page;
pub mod session;
pub mod snapshot;

pub use allocator::KindAllocator;
pub use arena::{round_up, Arena, ArenaConfig, ArenaState, WORD_ALIGN};
pub use error::{ArenaError, ArenaResult};
pub use kind::{MemKind, UnknownKind};
pub use page::{
    BoundedPageSource, Page, PageManager, PageSource, SystemPageSource, DEFAULT_PAGE_SIZE,
};
pub use session::{CompilationSession, PhaseUsage, UnitReport};
pub use snapshot::{KindUsage, MemStatsAggregator, UsageSnapshot};
