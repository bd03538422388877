// This module defines the error types for the jitarena allocator core using the thiserror
// crate. ArenaError is deliberately small: the only runtime failure the allocator can
// report is the host refusing to hand out a page (OutOfMemory), plus two caller mistakes
// that are surfaced instead of silently corrupting memory: a layout that cannot be
// represented (non power-of-two alignment, size overflow while rounding) and any use of
// an arena after it has been torn down. ArenaResult<T> is the convenience alias used by
// every fallible arena operation. OutOfMemory is never retried by the allocator itself;
// callers propagate it as the abandonment of the whole compilation unit.

//! Error types for the arena allocator.

use thiserror::Error;

/// Errors raised by the arena and its page manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Out of memory: host could not supply a page of {requested} bytes")]
    OutOfMemory {
        requested: usize,
    },

    #[error("Invalid allocation layout: {size} bytes aligned to {align}")]
    InvalidLayout {
        size: usize,
        align: usize,
    },

    #[error("Arena used after teardown")]
    TornDown,
}

/// Result type alias for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
