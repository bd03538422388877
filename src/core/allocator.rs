// This module provides KindAllocator, the typed front end compiler phases use instead of
// calling Arena::allocate with raw sizes. A KindAllocator pairs an arena reference with a
// single MemKind, so a phase creates one allocator for its category up front (for example
// LSRA_Interval for the interval builder) and every object it places is charged to that
// kind. Values are moved into arena memory and handed back as references that live as
// long as the arena borrow. Destructors never run: the arena releases memory in bulk,
// so types with meaningful Drop impls should not be placed here.

//! Typed, kind-bound allocation on top of [`Arena`].

use std::alloc::Layout;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::slice;

use super::arena::Arena;
use super::error::{ArenaError, ArenaResult};
use super::kind::MemKind;
use super::page::{PageSource, SystemPageSource};

/// Allocator handle bound to one arena and one kind.
pub struct KindAllocator<'a, S: PageSource = SystemPageSource> {
    arena: &'a Arena<S>,
    kind: MemKind,
}

impl<S: PageSource> Clone for KindAllocator<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: PageSource> Copy for KindAllocator<'_, S> {}

impl<'a, S: PageSource> KindAllocator<'a, S> {
    pub fn new(arena: &'a Arena<S>, kind: MemKind) -> Self {
        Self { arena, kind }
    }

    pub fn kind(&self) -> MemKind {
        self.kind
    }

    pub fn arena(&self) -> &'a Arena<S> {
        self.arena
    }

    /// Same arena, different kind.
    pub fn rebind(&self, kind: MemKind) -> Self {
        Self::new(self.arena, kind)
    }

    /// Raw bytes, word aligned. Contents are unspecified unless the kind is
    /// [`MemKind::ZeroInit`].
    pub fn alloc_bytes(&self, size: usize) -> ArenaResult<&'a mut [MaybeUninit<u8>]> {
        self.arena.allocate(self.kind, size)
    }

    /// Move `value` into the arena.
    pub fn alloc<T>(&self, value: T) -> ArenaResult<&'a mut T> {
        let ptr = self.alloc_layout::<T>(Layout::new::<T>())?;
        // SAFETY: `ptr` is valid for writes of one `T` and properly aligned.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Copy `src` into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> ArenaResult<&'a mut [T]> {
        let layout = array_layout::<T>(src.len())?;
        let ptr = self.alloc_layout::<T>(layout)?;
        // SAFETY: the destination holds `src.len()` elements and cannot overlap
        // `src`, which lives outside this fresh block.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// `len` elements initialised with `T::default()`, which is zero for the
    /// integer types bit sets and tables are built from.
    pub fn alloc_zeroed_slice<T: Copy + Default>(&self, len: usize) -> ArenaResult<&'a mut [T]> {
        let layout = array_layout::<T>(len)?;
        let ptr = self.alloc_layout::<T>(layout)?;
        // SAFETY: each of the `len` slots is written exactly once before the
        // slice is formed.
        unsafe {
            for i in 0..len {
                ptr.as_ptr().add(i).write(T::default());
            }
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), len))
        }
    }

    /// Copy `s` into the arena.
    pub fn alloc_str(&self, s: &str) -> ArenaResult<&'a str> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        // SAFETY: the bytes were copied verbatim from a valid `str`.
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    fn alloc_layout<T>(&self, layout: Layout) -> ArenaResult<NonNull<T>> {
        let block = self
            .arena
            .allocate_aligned(self.kind, layout.size(), layout.align())?;

        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        // Non-empty blocks are never null.
        Ok(NonNull::from(block).cast::<T>())
    }
}

fn array_layout<T>(len: usize) -> ArenaResult<Layout> {
    Layout::array::<T>(len).map_err(|_| ArenaError::InvalidLayout {
        size: len.saturating_mul(std::mem::size_of::<T>()),
        align: std::mem::align_of::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::ArenaConfig;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Interval {
        start: u32,
        end: u32,
        reg: Option<u8>,
    }

    #[test]
    fn test_alloc_value() {
        let arena = Arena::new();
        let alloc = KindAllocator::new(&arena, MemKind::LsraInterval);

        let a = alloc.alloc(Interval { start: 0, end: 10, reg: Some(3) }).unwrap();
        let b = alloc.alloc(Interval { start: 4, end: 12, reg: None }).unwrap();
        a.end = 11;

        assert_eq!(a.end, 11);
        assert_eq!(a.reg, Some(3));
        assert_eq!(b.start, 4);
        assert_eq!(arena.snapshot().unwrap().usage(MemKind::LsraInterval).count, 2);
    }

    #[test]
    fn test_alloc_slice_copy() {
        let arena = Arena::new();
        let alloc = KindAllocator::new(&arena, MemKind::FlowEdge);

        let edges = alloc.alloc_slice_copy(&[(0u32, 1u32), (1, 2), (2, 0)]).unwrap();
        edges[2].1 = 3;
        assert_eq!(edges, &[(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_alloc_zeroed_slice() {
        let arena = Arena::with_config(ArenaConfig::default().with_poison(true));
        let alloc = KindAllocator::new(&arena, MemKind::BitSet);

        let words = alloc.alloc_zeroed_slice::<u64>(16).unwrap();
        assert_eq!(words.len(), 16);
        assert!(words.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_alloc_bytes_without_poison() {
        let arena = Arena::with_config(ArenaConfig::default().with_poison(false));
        let alloc = KindAllocator::new(&arena, MemKind::Codegen);

        let code = alloc.alloc_bytes(5).unwrap();
        assert_eq!(code.len(), 5);
        let code: Vec<u8> = code
            .iter_mut()
            .zip([0x55u8, 0x48, 0x89, 0xE5, 0xC3])
            .map(|(slot, byte)| *slot.write(byte))
            .collect();
        assert_eq!(code, [0x55, 0x48, 0x89, 0xE5, 0xC3]);

        // The typed front end always hands back initialized values.
        let regs = alloc.rebind(MemKind::LsraRefPosition).alloc_slice_copy(&[1u8, 2, 3]).unwrap();
        assert_eq!(regs, &[1, 2, 3]);
    }

    #[test]
    fn test_alloc_str_and_rebind() {
        let arena = Arena::new();
        let alloc = KindAllocator::new(&arena, MemKind::DebugInfo);
        let name = alloc.alloc_str("System.String::Concat").unwrap();
        assert_eq!(name, "System.String::Concat");

        let gc = alloc.rebind(MemKind::Gc);
        gc.alloc(7u32).unwrap();

        let snap = arena.snapshot().unwrap();
        assert_eq!(snap.usage(MemKind::DebugInfo).count, 1);
        assert_eq!(snap.usage(MemKind::Gc).count, 1);
    }

    #[test]
    fn test_zero_sized_values() {
        let arena = Arena::new();
        let alloc = KindAllocator::new(&arena, MemKind::Generic);
        alloc.alloc(()).unwrap();
        let empty = alloc.alloc_slice_copy::<u64>(&[]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(arena.page_count(), 0);
        assert_eq!(arena.snapshot().unwrap().usage(MemKind::Generic).count, 2);
    }

    #[test]
    fn test_values_survive_page_changes() {
        let arena = Arena::with_config(ArenaConfig::default().with_page_size(256));
        let alloc = KindAllocator::new(&arena, MemKind::AstNode);

        let nodes: Vec<&mut u64> = (0..200u64).map(|i| alloc.alloc(i * 3).unwrap()).collect();
        assert!(arena.page_count() > 1);
        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(**node, i as u64 * 3);
        }
    }
}
