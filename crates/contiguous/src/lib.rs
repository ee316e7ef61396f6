//! Contiguous memory allocation with first-fit, best-fit and worst-fit
//! placement.
//!
//! The simulated memory is a fixed range `[0, total_size)` measured in
//! abstract units (the demos use KiB) and carved into an ordered sequence of
//! [`Block`]s. Each allocation occupies exactly one block; each deallocation
//! frees that block and merges it with free neighbours.
//!
//! # Algorithm
//!
//! - **Search**: [`Strategy`] picks among free blocks large enough for the
//!   request, scanning in address order.
//! - **Split**: the chosen block becomes an allocated block of exactly the
//!   requested size at the same start, followed by a free remainder if any.
//! - **Coalesce**: after a deallocation a single left-to-right pass merges
//!   every pair of adjacent free blocks.
//!
//! # Usage Example
//!
//! ```
//! use contiguous::{ContiguousAllocator, ContiguousConfig, Strategy};
//!
//! let mut memory = ContiguousAllocator::new(ContiguousConfig::new(1024, 16));
//!
//! let p1 = memory.allocate(192, Strategy::FirstFit).unwrap();
//! let p2 = memory.allocate(320, Strategy::FirstFit).unwrap();
//! let p3 = memory.allocate(160, Strategy::FirstFit).unwrap();
//! assert_eq!((p1.start, p2.start, p3.start), (0, 192, 512));
//!
//! let stats = memory.fragmentation_stats();
//! assert_eq!(stats.free_block_count, 1);
//! assert_eq!(stats.external_fragmentation, 0);
//!
//! assert_eq!(memory.deallocate(p2.id).unwrap(), 320);
//! assert!(memory.fragmentation_stats().is_fragmented());
//! ```
//!
//! Every operation either succeeds or returns an [`AllocError`] with the
//! allocator left exactly as it was.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use process::{ProcessId, ProcessIdAllocator};
use snafu::{OptionExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};

use self::block::BlockList;
pub use self::{
    block::{Block, BlockState},
    fit::{ParseStrategyError, Strategy},
    stats::{FragmentationStats, Usage},
};

mod block;
mod fit;
mod stats;

/// Why a requested size was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SizeViolation {
    #[display("size must be positive")]
    Zero,
    #[display("size must be a multiple of {unit}")]
    NotMultipleOfUnit { unit: usize },
    #[display("size exceeds total memory of {capacity}")]
    ExceedsCapacity { capacity: usize },
}

/// Errors returned by [`ContiguousAllocator`] operations.
#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum AllocError {
    #[snafu(display("invalid allocation size {size}: {violation}"))]
    InvalidSize {
        size: usize,
        violation: SizeViolation,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "no contiguous free block for {size} units using {strategy}, largest free block is {largest_free}"
    ))]
    AllocationFailed {
        size: usize,
        strategy: Strategy,
        largest_free: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("process {id} not found"))]
    ProcessNotFound {
        id: ProcessId,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Field-less mirror of [`AllocError`] for matching on outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum AllocErrorKind {
    InvalidSize,
    AllocationFailed,
    ProcessNotFound,
}

impl AllocError {
    #[must_use]
    pub fn kind(&self) -> AllocErrorKind {
        match self {
            Self::InvalidSize { .. } => AllocErrorKind::InvalidSize,
            Self::AllocationFailed { .. } => AllocErrorKind::AllocationFailed,
            Self::ProcessNotFound { .. } => AllocErrorKind::ProcessNotFound,
        }
    }
}

impl Located for AllocError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidSize { location, .. }
            | Self::AllocationFailed { location, .. }
            | Self::ProcessNotFound { location, .. } => *location,
        }
    }
}

/// Geometry of a contiguous memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContiguousConfig {
    /// Size of the whole memory in units.
    pub total_size: usize,
    /// Allocation granularity; every request must be a multiple of it.
    pub unit: usize,
}

impl Default for ContiguousConfig {
    /// 1024 KiB of memory in 16 KiB units, an 8x8 grid.
    fn default() -> Self {
        Self::new(1024, 16)
    }
}

impl ContiguousConfig {
    /// # Panics
    ///
    /// Panics if `unit` is zero, `total_size` is zero, or `total_size` is
    /// not a multiple of `unit`.
    #[must_use]
    pub const fn new(total_size: usize, unit: usize) -> Self {
        assert!(unit > 0, "Unit must be positive");
        assert!(total_size > 0, "Total size must be positive");
        assert!(
            total_size.is_multiple_of(unit),
            "Total size must be a multiple of unit"
        );
        Self { total_size, unit }
    }

    /// Number of grid cells (units) in the memory.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.total_size / self.unit
    }
}

/// A successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: ProcessId,
    pub start: usize,
    pub size: usize,
}

/// A live process as shown in the process list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo {
    pub id: ProcessId,
    pub start: usize,
    pub size: usize,
    /// Number of grid cells the process covers.
    pub cells: usize,
}

/// Allocator over a single contiguous address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContiguousAllocator {
    config: ContiguousConfig,
    blocks: BlockList,
    ids: ProcessIdAllocator,
}

impl Default for ContiguousAllocator {
    fn default() -> Self {
        Self::new(ContiguousConfig::default())
    }
}

impl ContiguousAllocator {
    /// Creates an allocator whose memory is one free block.
    #[must_use]
    pub fn new(config: ContiguousConfig) -> Self {
        log::debug!(
            "contiguous memory initialized: total={}, unit={}",
            config.total_size,
            config.unit
        );
        Self {
            config,
            blocks: BlockList::new(config.total_size),
            ids: ProcessIdAllocator::new(),
        }
    }

    /// Discards all state and starts over with a new geometry.
    pub fn initialize(&mut self, config: ContiguousConfig) {
        *self = Self::new(config);
    }

    /// Discards all state, keeping the current geometry.
    pub fn reset(&mut self) {
        self.initialize(self.config);
    }

    #[must_use]
    pub fn config(&self) -> ContiguousConfig {
        self.config
    }

    /// The block sequence, ordered by start address.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    /// Returns the index of the block `strategy` would choose for `size`
    /// units, or `None` if no free block is large enough.
    #[must_use]
    pub fn find_fit(&self, size: usize, strategy: Strategy) -> Option<usize> {
        let index = fit::find_fit(self.blocks(), size, strategy);
        log::trace!("{strategy} for {size} units -> {index:?}");
        index
    }

    /// Allocates `size` units for a new process.
    ///
    /// # Errors
    ///
    /// - [`AllocError::InvalidSize`] if `size` is zero, not a multiple of the
    ///   unit, or larger than the whole memory.
    /// - [`AllocError::AllocationFailed`] if no free block is large enough.
    pub fn allocate(&mut self, size: usize, strategy: Strategy) -> Result<Allocation, AllocError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::alloc_error::*;

        let ContiguousConfig { total_size, unit } = self.config;
        ensure!(
            size > 0,
            InvalidSizeSnafu {
                size,
                violation: SizeViolation::Zero,
            }
        );
        ensure!(
            size <= total_size,
            InvalidSizeSnafu {
                size,
                violation: SizeViolation::ExceedsCapacity {
                    capacity: total_size
                },
            }
        );
        ensure!(
            size.is_multiple_of(unit),
            InvalidSizeSnafu {
                size,
                violation: SizeViolation::NotMultipleOfUnit { unit },
            }
        );

        let index = self
            .find_fit(size, strategy)
            .with_context(|| AllocationFailedSnafu {
                size,
                strategy,
                largest_free: self.fragmentation_stats().largest_free,
            })?;

        let id = self.ids.allocate();
        let start = self.blocks.split(index, size, id);
        debug_assert!(self.blocks.covers(total_size));
        log::debug!("allocated process {id}: {size} units at {start} using {strategy}");

        Ok(Allocation { id, start, size })
    }

    /// Frees the memory of process `id` and merges adjacent free blocks.
    ///
    /// Returns the number of units released.
    ///
    /// # Errors
    ///
    /// [`AllocError::ProcessNotFound`] if no block is owned by `id`.
    pub fn deallocate(&mut self, id: ProcessId) -> Result<usize, AllocError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::alloc_error::*;

        let released = self
            .blocks
            .release(id)
            .context(ProcessNotFoundSnafu { id })?;
        let merged = self.blocks.coalesce();
        debug_assert!(self.blocks.covers(self.config.total_size));
        debug_assert!(!self.blocks.has_adjacent_free());
        log::debug!("deallocated process {id}: {released} units released, {merged} merges");

        Ok(released)
    }

    /// The block currently owned by `id`.
    #[must_use]
    pub fn block_of(&self, id: ProcessId) -> Option<&Block> {
        self.blocks().iter().find(|block| block.owner() == Some(id))
    }

    #[must_use]
    pub fn fragmentation_stats(&self) -> FragmentationStats {
        FragmentationStats::from_blocks(self.blocks())
    }

    #[must_use]
    pub fn usage(&self) -> Usage {
        Usage::from_blocks(self.config.total_size, self.blocks())
    }

    /// Live processes in address order.
    pub fn processes(&self) -> impl Iterator<Item = ProcessInfo> + '_ {
        let unit = self.config.unit;
        self.blocks().iter().filter_map(move |block| {
            let id = block.owner()?;
            Some(ProcessInfo {
                id,
                start: block.start(),
                size: block.size(),
                cells: block.size() / unit,
            })
        })
    }
}
