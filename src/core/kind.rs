// This module is the kind registry: the closed set of categories every arena allocation
// is tagged with. Each compiler phase (importer, SSA builder, LSRA, codegen, ...) charges
// its memory to its own kind so a usage report can say which subsystem consumed how much.
// The set is fixed at build time through the mem_kinds! macro, which expands one list into
// the enum, the diagnostic name table and the ALL array, so the three can never drift.
// Kinds are purely descriptive with one exception: ZeroInit asks the arena to hand back
// zero-filled memory. Adding or renaming a kind is a source change; there is no runtime
// registration.

//! Memory kinds used to categorise arena allocations.

use std::fmt;
use std::str::FromStr;

macro_rules! mem_kinds {
    ($($variant:ident => $name:literal,)*) => {
        /// Category tag attached to every arena allocation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MemKind {
            $($variant,)*
        }

        impl MemKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [MemKind] = &[$(MemKind::$variant,)*];

            /// Number of kinds.
            pub const COUNT: usize = Self::ALL.len();

            /// Stable diagnostic name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(MemKind::$variant => $name,)*
                }
            }
        }
    };
}

mem_kinds! {
    Abi => "ABI",
    AstNode => "ASTNode",
    ArrayStack => "ArrayStack",
    AssertionProp => "AssertionProp",
    BasicBlock => "BasicBlock",
    Cse => "CSE",
    CallArgs => "CallArgs",
    ClassLayout => "ClassLayout",
    Codegen => "Codegen",
    CopyProp => "CopyProp",
    CorTailCallInfo => "CorTailCallInfo",
    DebugInfo => "DebugInfo",
    DebugOnly => "DebugOnly",
    DepthFirstSearch => "DepthFirstSearch",
    DominatorMemory => "DominatorMemory",
    EarlyProp => "EarlyProp",
    FieldSeqStore => "FieldSeqStore",
    FixedBitVect => "FixedBitVect",
    FlowEdge => "FlowEdge",
    Gc => "GC",
    Generic => "Generic",
    ImpStack => "ImpStack",
    Inlining => "Inlining",
    InstDesc => "InstDesc",
    Liveness => "Liveness",
    Lsra => "LSRA",
    LsraInterval => "LSRA_Interval",
    LsraRefPosition => "LSRA_RefPosition",
    LocalAddressVisitor => "LocalAddressVisitor",
    LoopClone => "LoopClone",
    LoopHoist => "LoopHoist",
    LoopIvOpts => "LoopIVOpts",
    LoopOpt => "LoopOpt",
    LoopUnroll => "LoopUnroll",
    Loops => "Loops",
    LvaTable => "LvaTable",
    MemoryPhiArg => "MemoryPhiArg",
    MemorySsaMap => "MemorySsaMap",
    ObjectAllocator => "ObjectAllocator",
    Pgo => "Pgo",
    Promotion => "Promotion",
    RangeCheck => "RangeCheck",
    Reachability => "Reachability",
    Ssa => "SSA",
    SiScope => "SiScope",
    SideEffects => "SideEffects",
    TailMergeThrows => "TailMergeThrows",
    TreeStatementList => "TreeStatementList",
    Unknown => "Unknown",
    UnwindInfo => "UnwindInfo",
    ValueNumber => "ValueNumber",
    VariableLiveRanges => "VariableLiveRanges",
    ZeroInit => "ZeroInit",
    BitSet => "bitset",
    HashBv => "hashBv",
}

impl MemKind {
    /// Position of this kind in [`MemKind::ALL`], used to index counter tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether allocations of this kind must be returned zero-filled.
    #[inline]
    pub const fn zero_initialized(self) -> bool {
        matches!(self, MemKind::ZeroInit)
    }
}

impl Default for MemKind {
    fn default() -> Self {
        MemKind::Generic
    }
}

impl fmt::Display for MemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown memory kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for MemKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
