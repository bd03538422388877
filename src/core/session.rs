// This module provides the per-unit compilation session that ties the arena to the
// compiler driver. CompilationSession borrows an Arena for the duration of one method,
// hands out kind-bound allocators to the phases, interns names (method, class and local
// names show up over and over in debug info) into arena memory through a hashbrown table,
// and records how many bytes each phase charged so the driver can log a per-phase
// breakdown. finish() consumes the session and returns a UnitReport holding the unit's
// final UsageSnapshot; once the session is gone the driver is free to tear the arena
// down, which the borrow checker enforces because the session holds a shared borrow.

//! Per-unit compilation session on top of an [`Arena`].

use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

use super::allocator::KindAllocator;
use super::arena::Arena;
use super::error::ArenaResult;
use super::kind::MemKind;
use super::page::{PageSource, SystemPageSource};
use super::snapshot::UsageSnapshot;

/// Bytes and allocations charged while one phase ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseUsage {
    pub name: &'static str,
    pub allocations: u64,
    pub bytes: u64,
}

/// Arena-backed state for compiling one unit.
pub struct CompilationSession<'arena, S: PageSource = SystemPageSource> {
    /// Arena backing every allocation of this unit.
    arena: &'arena Arena<S>,

    /// Name of the unit being compiled.
    unit_name: String,

    /// String interning for names repeated across phases.
    interned_strings: RefCell<HashMap<&'arena str, &'arena str>>,

    /// Per-phase usage in execution order.
    phases: RefCell<Vec<PhaseUsage>>,
}

impl<'arena, S: PageSource> CompilationSession<'arena, S> {
    /// Start a session for `unit_name` on `arena`.
    pub fn new(arena: &'arena Arena<S>, unit_name: &str) -> Self {
        log::debug!("Begin compiling {}", unit_name);
        Self {
            arena,
            unit_name: unit_name.to_string(),
            interned_strings: RefCell::new(HashMap::new()),
            phases: RefCell::new(Vec::new()),
        }
    }

    pub fn arena(&self) -> &'arena Arena<S> {
        self.arena
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Allocator charging to `kind`.
    pub fn allocator(&self, kind: MemKind) -> KindAllocator<'arena, S> {
        KindAllocator::new(self.arena, kind)
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> ArenaResult<&'arena str> {
        if let Some(&interned) = self.interned_strings.borrow().get(s) {
            return Ok(interned);
        }

        let interned = self.allocator(MemKind::DebugInfo).alloc_str(s)?;
        self.interned_strings.borrow_mut().insert(interned, interned);
        Ok(interned)
    }

    /// Number of distinct interned strings.
    pub fn interned_count(&self) -> usize {
        self.interned_strings.borrow().len()
    }

    /// Run one phase, recording what it allocated.
    pub fn run_phase<T>(
        &self,
        name: &'static str,
        phase: impl FnOnce(&Self) -> ArenaResult<T>,
    ) -> ArenaResult<T> {
        let before = self.arena.snapshot()?;
        let result = phase(self)?;
        let after = self.arena.snapshot()?;

        let usage = PhaseUsage {
            name,
            allocations: after.total_allocations() - before.total_allocations(),
            bytes: after.total_bytes() - before.total_bytes(),
        };
        log::debug!(
            "{}: phase {} allocated {} bytes in {} allocations",
            self.unit_name,
            name,
            usage.bytes,
            usage.allocations
        );
        self.phases.borrow_mut().push(usage);

        Ok(result)
    }

    /// Phases run so far.
    pub fn phases(&self) -> Vec<PhaseUsage> {
        self.phases.borrow().clone()
    }

    /// End the session and capture the unit's final usage.
    pub fn finish(self) -> ArenaResult<UnitReport> {
        let snapshot = self.arena.snapshot()?;
        log::debug!(
            "Finished compiling {}: {} bytes in {} allocations",
            self.unit_name,
            snapshot.total_bytes(),
            snapshot.total_allocations()
        );
        Ok(UnitReport {
            unit_name: self.unit_name,
            phases: self.phases.into_inner(),
            snapshot,
        })
    }
}

/// Final memory report for one compiled unit.
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub unit_name: String,
    pub phases: Vec<PhaseUsage>,
    pub snapshot: UsageSnapshot,
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unit: {}", self.unit_name)?;

        if !self.phases.is_empty() {
            writeln!(f, "  Phase breakdown:")?;
            for phase in &self.phases {
                writeln!(
                    f,
                    "    {}: {} bytes ({} allocations)",
                    phase.name, phase.bytes, phase.allocations
                )?;
            }
        }

        write!(f, "{}", self.snapshot)
    }
}
