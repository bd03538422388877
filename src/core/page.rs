// This module implements the page manager that sits underneath every arena. Pages are raw
// contiguous blocks obtained from the host through the PageSource trait (the global Rust
// allocator by default, or a bounded source in tests) and are owned exclusively by one
// manager. Each page carries a cursor that only moves forward; the arena bumps it to carve
// out allocations. acquire() sizes a page to max(default page size, request) so ordinary
// allocations share a default page while oversized requests get an exact-fit page of
// their own. release_all() hands every page back in one step and is also run on drop, so
// the memory is returned on every exit path. When poisoning is enabled, fresh pages are
// filled with 0xCD and released pages with 0xDD to make stale reads recognisable.

//! Page acquisition and bulk release.

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::{self, NonNull};

use super::error::{ArenaError, ArenaResult};

/// Default capacity of a page in bytes.
pub const DEFAULT_PAGE_SIZE: usize = 0x10000;

/// Minimum alignment of every page base address.
pub const PAGE_ALIGN: usize = 16;

/// Byte written over freshly acquired pages when poisoning is enabled.
pub const FRESH_PAGE_POISON: u8 = 0xCD;

/// Byte written over pages right before they are released.
pub const RELEASED_PAGE_POISON: u8 = 0xDD;

/// Host memory provider used by [`PageManager`].
pub trait PageSource {
    /// Request a block for `layout`. `None` means the host is out of memory.
    fn allocate(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block previously produced by [`PageSource::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this source with the same `layout`
    /// and must not be released twice.
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout);
}

/// Page source backed by the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPageSource;

impl PageSource for SystemPageSource {
    fn allocate(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        // Callers never pass a zero-sized layout.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// A contiguous raw block with a forward-only cursor.
#[derive(Debug)]
pub struct Page {
    ptr: NonNull<u8>,
    layout: Layout,
    cursor: Cell<usize>,
}

impl Page {
    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bytes consumed so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor.get()
    }

    /// Base address of the page.
    pub fn base(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Carve `size` bytes aligned to `align` off the front of the free space.
    ///
    /// Returns `None` without moving the cursor when the page cannot fit the
    /// request.
    pub(crate) fn try_bump(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let base = self.ptr.as_ptr() as usize;
        let current = base.checked_add(self.cursor.get())?;
        let start = current.checked_add(align - 1)? & !(align - 1);
        let offset = start - base;
        let end = offset.checked_add(size)?;

        if end > self.capacity() {
            return None;
        }

        self.cursor.set(end);
        // SAFETY: offset <= end <= capacity, so the pointer stays inside the page.
        unsafe { Some(NonNull::new_unchecked(self.ptr.as_ptr().add(offset))) }
    }
}

/// Owns the pages of one arena.
pub struct PageManager<S: PageSource = SystemPageSource> {
    source: S,
    pages: Vec<Page>,
    default_page_size: usize,
    poison: bool,
}

impl PageManager<SystemPageSource> {
    /// Create a manager drawing from the global allocator.
    pub fn new(default_page_size: usize, poison: bool) -> Self {
        Self::with_source(SystemPageSource, default_page_size, poison)
    }
}

impl<S: PageSource> PageManager<S> {
    /// Create a manager drawing from `source`.
    pub fn with_source(source: S, default_page_size: usize, poison: bool) -> Self {
        Self {
            source,
            pages: Vec::new(),
            default_page_size: default_page_size.max(1),
            poison,
        }
    }

    /// Acquire a page of at least `max(default_page_size, min_size)` bytes
    /// whose base is aligned to `align`, returning its index.
    ///
    /// Failure is never retried with a smaller size.
    pub fn acquire(&mut self, min_size: usize, align: usize) -> ArenaResult<usize> {
        let capacity = self.default_page_size.max(min_size);
        let align = align.max(PAGE_ALIGN);
        let layout = Layout::from_size_align(capacity, align)
            .map_err(|_| ArenaError::InvalidLayout { size: capacity, align })?;

        let ptr = self
            .source
            .allocate(layout)
            .ok_or(ArenaError::OutOfMemory { requested: capacity })?;

        if self.poison {
            // SAFETY: the block is `capacity` bytes long and exclusively ours.
            unsafe { ptr::write_bytes(ptr.as_ptr(), FRESH_PAGE_POISON, capacity) };
        }

        self.pages.push(Page {
            ptr,
            layout,
            cursor: Cell::new(0),
        });

        log::debug!(
            "Acquired page #{} ({} bytes, {} bytes reserved)",
            self.pages.len() - 1,
            capacity,
            self.reserved_bytes()
        );

        Ok(self.pages.len() - 1)
    }

    /// Release every page. Calling this on an empty manager does nothing.
    pub fn release_all(&mut self) {
        if self.pages.is_empty() {
            return;
        }

        let count = self.pages.len();
        let reserved = self.reserved_bytes();

        for page in self.pages.drain(..) {
            if self.poison {
                // SAFETY: the page is still live and owned by this manager.
                unsafe { ptr::write_bytes(page.ptr.as_ptr(), RELEASED_PAGE_POISON, page.capacity()) };
            }
            // SAFETY: each page was produced by this source with this layout and
            // is drained from the list, so it cannot be released again.
            unsafe { self.source.release(page.ptr, page.layout) };
        }

        log::debug!("Released {} pages ({} bytes)", count, reserved);
    }

    /// Page at `index`, in acquisition order.
    pub fn page(&self, index: usize) -> &Page {
        &self.pages[index]
    }

    /// All pages, in acquisition order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Sum of all page capacities.
    pub fn reserved_bytes(&self) -> usize {
        self.pages.iter().map(Page::capacity).sum()
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// The underlying host source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: PageSource> Drop for PageManager<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Page source that refuses to hand out more than a fixed number of bytes.
///
/// Used to exercise the out-of-memory path.
#[derive(Debug, Clone)]
pub struct BoundedPageSource {
    limit: usize,
    outstanding: usize,
    released: usize,
}

impl BoundedPageSource {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            outstanding: 0,
            released: 0,
        }
    }

    /// Bytes currently handed out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Number of blocks returned so far.
    pub fn released(&self) -> usize {
        self.released
    }
}

impl PageSource for BoundedPageSource {
    fn allocate(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        if self.outstanding.checked_add(layout.size())? > self.limit {
            return None;
        }
        let ptr = SystemPageSource.allocate(layout)?;
        self.outstanding += layout.size();
        Some(ptr)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) {
        SystemPageSource.release(ptr, layout);
        self.outstanding -= layout.size();
        self.released += 1;
    }
}
