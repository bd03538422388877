// This module holds the read-only side of arena accounting. KindUsage is the counter pair
// (allocation count, bytes) kept per memory kind; UsageSnapshot is an owned copy of an
// arena's counters taken at one instant, together with how many pages and bytes the arena
// had reserved. Snapshots do not borrow the arena and stay valid after teardown, so a
// driver can take one at the end of a unit and hand it to reporting. All counters are u64
// so that summing snapshots from very many units cannot overflow in practice. The Display
// implementation prints a full report with one row per kind, zero rows included, and
// MemStatsAggregator folds snapshots from many compiled units into process-wide totals
// while remembering the single most memory-hungry unit.

//! Usage snapshots and cross-unit aggregation.

use std::fmt;
use std::ops::{Add, AddAssign};

use super::kind::MemKind;

/// Allocation count and byte total for one kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KindUsage {
    /// Number of allocations.
    pub count: u64,

    /// Bytes handed out, after rounding.
    pub bytes: u64,
}

impl KindUsage {
    pub const ZERO: KindUsage = KindUsage { count: 0, bytes: 0 };

    #[inline]
    pub(crate) fn record(&mut self, bytes: usize) {
        self.count += 1;
        self.bytes += bytes as u64;
    }
}

impl Add for KindUsage {
    type Output = KindUsage;

    fn add(self, rhs: KindUsage) -> KindUsage {
        KindUsage {
            count: self.count + rhs.count,
            bytes: self.bytes + rhs.bytes,
        }
    }
}

impl AddAssign for KindUsage {
    fn add_assign(&mut self, rhs: KindUsage) {
        *self = *self + rhs;
    }
}

/// Immutable copy of an arena's per-kind counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    usage: [KindUsage; MemKind::COUNT],
    pages_acquired: u64,
    bytes_reserved: u64,
}

impl UsageSnapshot {
    pub(crate) fn new(
        usage: [KindUsage; MemKind::COUNT],
        pages_acquired: usize,
        bytes_reserved: usize,
    ) -> Self {
        Self {
            usage,
            pages_acquired: pages_acquired as u64,
            bytes_reserved: bytes_reserved as u64,
        }
    }

    /// Counters for `kind`.
    pub fn usage(&self, kind: MemKind) -> KindUsage {
        self.usage[kind.index()]
    }

    /// Every kind with its counters, unused kinds included.
    pub fn iter(&self) -> impl Iterator<Item = (MemKind, KindUsage)> + '_ {
        MemKind::ALL.iter().map(move |&kind| (kind, self.usage(kind)))
    }

    /// Kinds that saw at least one allocation.
    pub fn used_kinds(&self) -> impl Iterator<Item = (MemKind, KindUsage)> + '_ {
        self.iter().filter(|(_, usage)| usage.count > 0)
    }

    pub fn total_allocations(&self) -> u64 {
        self.usage.iter().map(|u| u.count).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.usage.iter().map(|u| u.bytes).sum()
    }

    pub fn pages_acquired(&self) -> u64 {
        self.pages_acquired
    }

    pub fn bytes_reserved(&self) -> u64 {
        self.bytes_reserved
    }

    /// Field-wise sum of two snapshots.
    pub fn combine(&self, other: &UsageSnapshot) -> UsageSnapshot {
        let mut result = self.clone();
        result += other;
        result
    }
}

impl Default for UsageSnapshot {
    fn default() -> Self {
        Self {
            usage: [KindUsage::ZERO; MemKind::COUNT],
            pages_acquired: 0,
            bytes_reserved: 0,
        }
    }
}

impl AddAssign<&UsageSnapshot> for UsageSnapshot {
    fn add_assign(&mut self, rhs: &UsageSnapshot) {
        for (lhs, rhs) in self.usage.iter_mut().zip(rhs.usage.iter()) {
            *lhs += *rhs;
        }
        self.pages_acquired += rhs.pages_acquired;
        self.bytes_reserved += rhs.bytes_reserved;
    }
}

impl fmt::Display for UsageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arena Memory Usage:")?;
        writeln!(f, "  {:<22} {:>10} {:>12}", "Kind", "Count", "Bytes")?;

        for (kind, usage) in self.iter() {
            writeln!(f, "  {:<22} {:>10} {:>12}", kind.name(), usage.count, usage.bytes)?;
        }

        writeln!(
            f,
            "  {:<22} {:>10} {:>12}",
            "Total",
            self.total_allocations(),
            self.total_bytes()
        )?;
        writeln!(
            f,
            "  Pages acquired: {} ({} bytes reserved)",
            self.pages_acquired, self.bytes_reserved
        )?;

        Ok(())
    }
}

/// Folds per-unit snapshots into process-wide totals.
#[derive(Debug, Default, Clone)]
pub struct MemStatsAggregator {
    units: u64,
    total: UsageSnapshot,
    largest_unit_name: String,
    largest_unit_bytes: u64,
}

impl MemStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the final snapshot of one compiled unit.
    pub fn record(&mut self, unit_name: &str, snapshot: &UsageSnapshot) {
        self.units += 1;
        self.total += snapshot;

        let bytes = snapshot.total_bytes();
        if self.units == 1 || bytes > self.largest_unit_bytes {
            self.largest_unit_bytes = bytes;
            self.largest_unit_name = unit_name.to_string();
        }
    }

    /// Fold another aggregator (for example one per worker thread) into this one.
    pub fn merge(&mut self, other: &MemStatsAggregator) {
        if other.units == 0 {
            return;
        }
        if self.units == 0 || other.largest_unit_bytes > self.largest_unit_bytes {
            self.largest_unit_bytes = other.largest_unit_bytes;
            self.largest_unit_name = other.largest_unit_name.clone();
        }
        self.units += other.units;
        self.total += &other.total;
    }

    /// Number of units recorded.
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Sum of every recorded snapshot.
    pub fn total(&self) -> &UsageSnapshot {
        &self.total
    }

    /// Name and byte total of the unit that allocated the most.
    pub fn largest_unit(&self) -> Option<(&str, u64)> {
        if self.units == 0 {
            None
        } else {
            Some((self.largest_unit_name.as_str(), self.largest_unit_bytes))
        }
    }

    pub fn average_bytes_per_unit(&self) -> u64 {
        self.total.total_bytes().checked_div(self.units).unwrap_or(0)
    }
}

impl fmt::Display for MemStatsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aggregate Memory Statistics:")?;
        writeln!(f, "  Units compiled: {}", self.units)?;
        writeln!(f, "  Average bytes per unit: {}", self.average_bytes_per_unit())?;

        if let Some((name, bytes)) = self.largest_unit() {
            writeln!(f, "  Largest unit: {} ({} bytes)", name, bytes)?;
        }

        write!(f, "{}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(entries: &[(MemKind, u64, u64)]) -> UsageSnapshot {
        let mut usage = [KindUsage::ZERO; MemKind::COUNT];
        for &(kind, count, bytes) in entries {
            usage[kind.index()] = KindUsage { count, bytes };
        }
        UsageSnapshot::new(usage, 1, 4096)
    }

    #[test]
    fn test_totals() {
        let snap = snapshot_with(&[(MemKind::Ssa, 2, 64), (MemKind::BasicBlock, 3, 96)]);
        assert_eq!(snap.total_allocations(), 5);
        assert_eq!(snap.total_bytes(), 160);
        assert_eq!(snap.used_kinds().count(), 2);
        assert_eq!(snap.iter().count(), MemKind::COUNT);
    }

    #[test]
    fn test_combine_is_field_wise() {
        let a = snapshot_with(&[(MemKind::Ssa, 1, 32)]);
        let b = snapshot_with(&[(MemKind::Ssa, 2, 64), (MemKind::Lsra, 1, 8)]);
        let c = a.combine(&b);
        assert_eq!(c.usage(MemKind::Ssa), KindUsage { count: 3, bytes: 96 });
        assert_eq!(c.usage(MemKind::Lsra), KindUsage { count: 1, bytes: 8 });
        assert_eq!(c.pages_acquired(), 2);
        assert_eq!(c.bytes_reserved(), 8192);
    }

    #[test]
    fn test_report_lists_every_kind() {
        let snap = snapshot_with(&[(MemKind::LsraInterval, 3, 192)]);
        let report = snap.to_string();
        for kind in MemKind::ALL {
            assert!(report.contains(kind.name()), "missing row for {}", kind);
        }
        assert!(report.contains("Pages acquired: 1 (4096 bytes reserved)"));
    }

    #[test]
    fn test_merge_aggregators() {
        let mut a = MemStatsAggregator::new();
        a.record("A1", &snapshot_with(&[(MemKind::Ssa, 1, 100)]));
        let mut b = MemStatsAggregator::new();
        b.record("B1", &snapshot_with(&[(MemKind::Lsra, 2, 300)]));
        b.record("B2", &snapshot_with(&[(MemKind::Lsra, 1, 50)]));

        a.merge(&b);
        a.merge(&MemStatsAggregator::new());
        assert_eq!(a.units(), 3);
        assert_eq!(a.largest_unit(), Some(("B1", 300)));
        assert_eq!(a.total().total_bytes(), 450);
        assert_eq!(a.total().pages_acquired(), 3);
    }

    #[test]
    fn test_aggregator_tracks_largest_unit() {
        let mut agg = MemStatsAggregator::new();
        assert!(agg.largest_unit().is_none());

        agg.record("Small", &snapshot_with(&[(MemKind::Ssa, 1, 16)]));
        agg.record("Big", &snapshot_with(&[(MemKind::Ssa, 4, 1024)]));
        agg.record("Medium", &snapshot_with(&[(MemKind::Ssa, 2, 256)]));

        assert_eq!(agg.units(), 3);
        assert_eq!(agg.largest_unit(), Some(("Big", 1024)));
        assert_eq!(agg.total().usage(MemKind::Ssa).count, 7);
        assert_eq!(agg.average_bytes_per_unit(), (16 + 1024 + 256) / 3);

        let output = agg.to_string();
        assert!(output.contains("Units compiled: 3"));
        assert!(output.contains("Largest unit: Big (1024 bytes)"));
    }

    #[test]
    fn test_unnamed_unit_can_be_largest() {
        let mut agg = MemStatsAggregator::new();
        agg.record("", &snapshot_with(&[(MemKind::Ssa, 3, 512)]));
        agg.record("Later", &snapshot_with(&[(MemKind::Ssa, 1, 64)]));

        assert_eq!(agg.largest_unit(), Some(("", 512)));

        let mut zero = MemStatsAggregator::new();
        zero.record("Empty", &UsageSnapshot::default());
        assert_eq!(zero.largest_unit(), Some(("Empty", 0)));
    }
}
