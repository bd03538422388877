// This module implements the category-tagged bump arena that backs every transient data
// structure built while compiling one method. An Arena is created per compilation unit,
// shared by reference among the phases of that unit, and torn down exactly once at the
// end. allocate() rounds the request to its alignment, bumps the cursor of the current
// page (acquiring a new page from the PageManager when the current one is exhausted) and
// charges the rounded size to the allocation's MemKind. Nothing is ever freed
// individually. Blocks are returned as mutable slices borrowed from the arena, so the
// borrow checker guarantees none of them survives teardown(), which takes &mut self.
// ZeroInit allocations are zero-filled; all other kinds get unspecified contents (the
// poison byte when poisoning is enabled), so the raw blocks are typed as MaybeUninit<u8>
// and callers write before they read. The arena uses Cell/RefCell for its mutable
// state, which makes it !Sync: one arena serves one thread at a time.

//! Category-tagged bump arena.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem::{self, MaybeUninit};
use std::slice;

use super::error::{ArenaError, ArenaResult};
use super::kind::MemKind;
use super::page::{PageManager, PageSource, SystemPageSource, DEFAULT_PAGE_SIZE};
use super::snapshot::{KindUsage, UsageSnapshot};

/// Default alignment for [`Arena::allocate`].
pub const WORD_ALIGN: usize = mem::size_of::<usize>();

/// Arena configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity of an ordinary page.
    pub default_page_size: usize,

    /// Fill fresh and released pages with poison bytes.
    pub poison: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            poison: cfg!(debug_assertions),
        }
    }
}

impl ArenaConfig {
    pub fn with_page_size(mut self, default_page_size: usize) -> Self {
        self.default_page_size = default_page_size;
        self
    }

    pub fn with_poison(mut self, poison: bool) -> Self {
        self.poison = poison;
        self
    }
}

/// Lifecycle state of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaState {
    Active,
    TornDown,
}

impl fmt::Display for ArenaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArenaState::Active => write!(f, "active"),
            ArenaState::TornDown => write!(f, "torn down"),
        }
    }
}

/// Bump allocator scoped to one compilation unit.
pub struct Arena<S: PageSource = SystemPageSource> {
    /// Pages in acquisition order.
    pages: RefCell<PageManager<S>>,

    /// Index of the page allocations are carved from.
    current: Cell<Option<usize>>,

    /// Counters indexed by `MemKind::index()`.
    usage: RefCell<[KindUsage; MemKind::COUNT]>,

    state: Cell<ArenaState>,

    config: ArenaConfig,
}

impl Arena<SystemPageSource> {
    /// Create an arena with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ArenaConfig::default())
    }

    /// Create an arena backed by the global allocator.
    pub fn with_config(config: ArenaConfig) -> Self {
        Self::with_source(config, SystemPageSource)
    }
}

impl Default for Arena<SystemPageSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PageSource> Arena<S> {
    /// Create an arena drawing pages from `source`.
    pub fn with_source(config: ArenaConfig, source: S) -> Self {
        let pages = PageManager::with_source(source, config.default_page_size, config.poison);
        Self {
            pages: RefCell::new(pages),
            current: Cell::new(None),
            usage: RefCell::new([KindUsage::ZERO; MemKind::COUNT]),
            state: Cell::new(ArenaState::Active),
            config,
        }
    }

    /// Allocate `size` word-aligned bytes charged to `kind`.
    #[allow(clippy::mut_from_ref)]
    pub fn allocate(&self, kind: MemKind, size: usize) -> ArenaResult<&mut [MaybeUninit<u8>]> {
        self.allocate_aligned(kind, size, WORD_ALIGN)
    }

    /// Allocate `size` bytes aligned to `align` charged to `kind`.
    ///
    /// The size is rounded up to a multiple of `align`; the rounded size is
    /// what the kind is charged. The returned slice is `size` bytes long and
    /// stays valid and untouched by later allocations until teardown.
    ///
    /// Only [`MemKind::ZeroInit`] blocks are initialized (to zero).
    #[allow(clippy::mut_from_ref)]
    pub fn allocate_aligned(
        &self,
        kind: MemKind,
        size: usize,
        align: usize,
    ) -> ArenaResult<&mut [MaybeUninit<u8>]> {
        self.check_active("allocate")?;

        let rounded = round_up(size, align)?;

        let block: &mut [MaybeUninit<u8>] = if rounded == 0 {
            &mut []
        } else {
            let ptr = self.bump(rounded, align)?;
            // SAFETY: `bump` reserved `rounded >= size` bytes that no other block
            // overlaps and that live until the pages are released, which needs
            // `&mut self`. `MaybeUninit<u8>` makes no claim about the contents.
            unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<MaybeUninit<u8>>(), size) }
        };

        self.usage.borrow_mut()[kind.index()].record(rounded);

        if kind.zero_initialized() {
            block.fill(MaybeUninit::new(0));
        }

        log::trace!("Allocated {} bytes ({} requested) for {}", rounded, size, kind);

        Ok(block)
    }

    /// Copy of the current per-kind counters.
    pub fn snapshot(&self) -> ArenaResult<UsageSnapshot> {
        self.check_active("snapshot")?;

        let pages = self.pages.borrow();
        Ok(UsageSnapshot::new(
            *self.usage.borrow(),
            pages.page_count(),
            pages.reserved_bytes(),
        ))
    }

    /// Release every page and move to the terminal state.
    ///
    /// Taking `&mut self` ensures no block handed out earlier is still
    /// borrowed. A second call fails with [`ArenaError::TornDown`].
    pub fn teardown(&mut self) -> ArenaResult<()> {
        self.check_active("teardown")?;

        let pages = self.pages.get_mut();
        let count = pages.page_count();
        let reserved = pages.reserved_bytes();
        pages.release_all();

        self.current.set(None);
        self.state.set(ArenaState::TornDown);

        log::debug!("Arena torn down: {} pages, {} bytes released", count, reserved);
        Ok(())
    }

    pub fn state(&self) -> ArenaState {
        self.state.get()
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Number of pages currently owned.
    pub fn page_count(&self) -> usize {
        self.pages.borrow().page_count()
    }

    /// Total capacity of all owned pages.
    pub fn reserved_bytes(&self) -> usize {
        self.pages.borrow().reserved_bytes()
    }

    /// Index of the page allocations are currently carved from.
    pub fn current_page(&self) -> Option<usize> {
        self.current.get()
    }

    /// Bytes consumed in page `index`, including alignment padding.
    pub fn page_used(&self, index: usize) -> Option<usize> {
        self.pages.borrow().pages().get(index).map(|page| page.used())
    }

    /// The host page source.
    pub fn with_page_source<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.pages.borrow().source())
    }

    fn check_active(&self, operation: &str) -> ArenaResult<()> {
        match self.state.get() {
            ArenaState::Active => Ok(()),
            ArenaState::TornDown => {
                log::error!("{} called on an arena after teardown", operation);
                Err(ArenaError::TornDown)
            }
        }
    }

    fn bump(&self, size: usize, align: usize) -> ArenaResult<std::ptr::NonNull<u8>> {
        let mut pages = self.pages.borrow_mut();

        if let Some(index) = self.current.get() {
            if let Some(ptr) = pages.page(index).try_bump(size, align) {
                return Ok(ptr);
            }
        }

        let index = pages.acquire(size, align).inspect_err(|err| {
            log::error!("Page acquisition failed for {} byte request: {}", size, err);
        })?;

        let page = pages.page(index);
        let ptr = page
            .try_bump(size, align)
            .ok_or(ArenaError::OutOfMemory { requested: size })?;

        // A page left with no free space (an exact-fit oversized page) never
        // becomes the target, so the previous page keeps serving small requests.
        if page.remaining() > 0 || self.current.get().is_none() {
            self.current.set(Some(index));
        }

        Ok(ptr)
    }
}

impl<S: PageSource> fmt::Debug for Arena<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("state", &self.state.get())
            .field("pages", &self.page_count())
            .field("reserved_bytes", &self.reserved_bytes())
            .field("current", &self.current.get())
            .field("config", &self.config)
            .finish()
    }
}

/// Round `size` up to a multiple of `align`.
pub fn round_up(size: usize, align: usize) -> ArenaResult<usize> {
    if !align.is_power_of_two() {
        return Err(ArenaError::InvalidLayout { size, align });
    }
    size.checked_add(align - 1)
        .map(|n| n & !(align - 1))
        .ok_or(ArenaError::InvalidLayout { size, align })
}
