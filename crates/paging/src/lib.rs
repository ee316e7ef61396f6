//! Paged memory allocation with per-process page tables.
//!
//! Physical memory is an array of equally sized frames. A process of `size`
//! units gets `ceil(size / page_size)` pages, each backed by one frame; the
//! frames need not be adjacent. Allocation takes the lowest-numbered free
//! frames, so the outcome is fully deterministic.
//!
//! Sizes are in KiB and addresses in bytes, so one page spans
//! `page_size * 1024` addresses.
//!
//! # Usage Example
//!
//! ```
//! use paging::{LogicalAddr, PagedAllocator, PagingConfig};
//!
//! let mut memory = PagedAllocator::new(PagingConfig::new(256, 4)).unwrap();
//! let id = memory.allocate(20).unwrap().id();
//!
//! let translation = memory.translate(id, LogicalAddr::new(4096 * 2 + 10)).unwrap();
//! assert_eq!(translation.page.value(), 2);
//! assert_eq!(translation.offset, 10);
//! assert_eq!(
//!     translation.physical.value(),
//!     translation.frame.value() * 4096 + 10
//! );
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use core::ops::Range;
use std::collections::BTreeMap;

use process::{ProcessId, ProcessIdAllocator};
use range_set::RangeSet;
use snafu::{OptionExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};

pub use self::{
    address::{FrameNum, LogicalAddr, PageNum, PhysAddr},
    frame::{Frame, FrameState},
    table::{Frames, PageTable, PageTableEntry},
};

mod address;
mod frame;
mod table;

/// Largest number of frames an allocator can manage.
pub const MAX_FRAMES: usize = 128;

/// At most every other frame can start a free run.
const FREE_RANGES: usize = MAX_FRAMES.div_ceil(2);

const BYTES_PER_KIB: usize = 1024;

/// Why a geometry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum GeometryViolation {
    #[display("page size must be positive")]
    ZeroPageSize,
    #[display("total size must be a multiple of the page size")]
    PartialFrame,
    #[display("memory must hold at least one frame")]
    NoFrames,
    #[display("{frame_count} frames exceed the maximum of {}", MAX_FRAMES)]
    TooManyFrames { frame_count: usize },
    #[display("memory size overflows the address space")]
    TooLarge,
}

/// Why a requested size was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SizeViolation {
    #[display("size must be positive")]
    Zero,
    #[display("size exceeds total memory of {capacity}")]
    ExceedsCapacity { capacity: usize },
}

/// Errors returned by [`PagedAllocator`] operations.
#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum PagingError {
    #[snafu(display("invalid geometry {total_size}/{page_size}: {violation}"))]
    InvalidGeometry {
        total_size: usize,
        page_size: usize,
        violation: GeometryViolation,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid allocation size {size}: {violation}"))]
    InvalidSize {
        size: usize,
        violation: SizeViolation,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display(
        "not enough free frames for {size} units: {needed} needed, {available} available"
    ))]
    InsufficientFrames {
        size: usize,
        needed: usize,
        available: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("process {id} not found"))]
    ProcessNotFound {
        id: ProcessId,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("page {page} is out of range for process {id} with {page_count} pages"))]
    PageOutOfRange {
        id: ProcessId,
        page: PageNum,
        page_count: usize,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("page fault at page {page} of process {id}"))]
    PageFault {
        id: ProcessId,
        page: PageNum,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Field-less mirror of [`PagingError`] for matching on outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum PagingErrorKind {
    InvalidGeometry,
    InvalidSize,
    InsufficientFrames,
    ProcessNotFound,
    PageOutOfRange,
    PageFault,
}

impl PagingError {
    #[must_use]
    pub fn kind(&self) -> PagingErrorKind {
        match self {
            Self::InvalidGeometry { .. } => PagingErrorKind::InvalidGeometry,
            Self::InvalidSize { .. } => PagingErrorKind::InvalidSize,
            Self::InsufficientFrames { .. } => PagingErrorKind::InsufficientFrames,
            Self::ProcessNotFound { .. } => PagingErrorKind::ProcessNotFound,
            Self::PageOutOfRange { .. } => PagingErrorKind::PageOutOfRange,
            Self::PageFault { .. } => PagingErrorKind::PageFault,
        }
    }
}

impl Located for PagingError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidGeometry { location, .. }
            | Self::InvalidSize { location, .. }
            | Self::InsufficientFrames { location, .. }
            | Self::ProcessNotFound { location, .. }
            | Self::PageOutOfRange { location, .. }
            | Self::PageFault { location, .. } => *location,
        }
    }
}

/// Geometry of a paged memory, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub total_size: usize,
    pub page_size: usize,
}

impl Default for PagingConfig {
    /// 256 KiB of memory in 4 KiB pages, 64 frames.
    fn default() -> Self {
        Self::new(256, 4)
    }
}

impl PagingConfig {
    /// Geometry is validated by [`PagedAllocator::new`].
    #[must_use]
    pub const fn new(total_size: usize, page_size: usize) -> Self {
        Self {
            total_size,
            page_size,
        }
    }

    /// Number of addresses in one page.
    ///
    /// Only meaningful once [`PagedAllocator::new`] has accepted the geometry.
    #[must_use]
    pub const fn page_size_bytes(&self) -> usize {
        self.page_size * BYTES_PER_KIB
    }

    /// Checks the geometry and returns the number of frames it describes.
    fn frame_count(&self) -> Result<usize, PagingError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::paging_error::*;

        let Self {
            total_size,
            page_size,
        } = *self;
        let fail = |violation| InvalidGeometrySnafu {
            total_size,
            page_size,
            violation,
        };

        ensure!(page_size > 0, fail(GeometryViolation::ZeroPageSize));
        ensure!(
            total_size.checked_mul(BYTES_PER_KIB).is_some()
                && page_size.checked_mul(BYTES_PER_KIB).is_some(),
            fail(GeometryViolation::TooLarge)
        );
        ensure!(
            total_size.is_multiple_of(page_size),
            fail(GeometryViolation::PartialFrame)
        );
        let frame_count = total_size / page_size;
        ensure!(frame_count > 0, fail(GeometryViolation::NoFrames));
        ensure!(
            frame_count <= MAX_FRAMES,
            fail(GeometryViolation::TooManyFrames { frame_count })
        );
        Ok(frame_count)
    }
}

/// A process together with its page table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    id: ProcessId,
    size: usize,
    page_table: PageTable,
}

impl Process {
    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Requested size in KiB.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    #[must_use]
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }
}

/// Result of a successful address translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub logical: LogicalAddr,
    pub page: PageNum,
    pub offset: usize,
    pub frame: FrameNum,
    pub physical: PhysAddr,
}

/// Frame usage totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_count: usize,
    pub frames_used: usize,
    pub frames_free: usize,
    /// Free frames times the page size, in KiB.
    pub free_memory: usize,
}

/// Allocator over an array of equally sized frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedAllocator {
    config: PagingConfig,
    frames: Vec<Frame>,
    free: RangeSet<FREE_RANGES>,
    processes: BTreeMap<ProcessId, Process>,
    ids: ProcessIdAllocator,
}

impl PagedAllocator {
    /// Creates an allocator with every frame free.
    ///
    /// # Errors
    ///
    /// [`PagingError::InvalidGeometry`] if the page size is zero, does not
    /// divide the total size, or the frame count is zero or above
    /// [`MAX_FRAMES`].
    pub fn new(config: PagingConfig) -> Result<Self, PagingError> {
        let frame_count = config.frame_count()?;
        log::debug!(
            "paged memory initialized: total={}, page={}, frames={frame_count}",
            config.total_size,
            config.page_size
        );
        let (frames, free) = all_free(frame_count);
        Ok(Self {
            config,
            frames,
            free,
            processes: BTreeMap::new(),
            ids: ProcessIdAllocator::new(),
        })
    }

    /// Discards all state and starts over with a new geometry.
    ///
    /// On error the allocator is left untouched.
    pub fn initialize(&mut self, config: PagingConfig) -> Result<(), PagingError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Discards all state, keeping the current geometry.
    pub fn reset(&mut self) {
        (self.frames, self.free) = all_free(self.frames.len());
        self.processes.clear();
        self.ids = ProcessIdAllocator::new();
        log::debug!("paged memory reset");
    }

    #[must_use]
    pub fn config(&self) -> PagingConfig {
        self.config
    }

    /// All frames, ordered by frame number.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Free frames as ascending, non-adjacent ranges of frame numbers.
    #[must_use]
    pub fn free_ranges(&self) -> &[Range<usize>] {
        self.free.as_slice()
    }

    #[must_use]
    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id)
    }

    /// Live processes ordered by id.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Allocates `ceil(size / page_size)` frames for a new process.
    ///
    /// Frames are taken lowest-numbered first and page `i` maps to the
    /// `i`-th of them. Allocation is all-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`PagingError::InvalidSize`] if `size` is zero or larger than the
    ///   whole memory.
    /// - [`PagingError::InsufficientFrames`] if fewer free frames than pages
    ///   are left.
    pub fn allocate(&mut self, size: usize) -> Result<&Process, PagingError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::paging_error::*;

        let capacity = self.config.total_size;
        ensure!(
            size > 0,
            InvalidSizeSnafu {
                size,
                violation: SizeViolation::Zero,
            }
        );
        ensure!(
            size <= capacity,
            InvalidSizeSnafu {
                size,
                violation: SizeViolation::ExceedsCapacity { capacity },
            }
        );

        let needed = size.div_ceil(self.config.page_size);
        let available = self.free.element_count();
        ensure!(
            needed <= available,
            InsufficientFramesSnafu {
                size,
                needed,
                available,
            }
        );

        let frames: Vec<FrameNum> = self
            .free
            .elements()
            .take(needed)
            .map(FrameNum::new)
            .collect();
        let id = self.ids.allocate();
        for (page, &frame) in frames.iter().enumerate() {
            self.frames[frame.value()].assign(id, PageNum::new(page));
            self.free.remove(frame.value()..frame.value() + 1);
        }
        let page_table = PageTable::new(frames);
        log::debug!("allocated process {id}: {size} units in {needed} pages {page_table:?}");

        self.processes.insert(
            id,
            Process {
                id,
                size,
                page_table,
            },
        );
        debug_assert!(self.is_consistent());
        Ok(&self.processes[&id])
    }

    /// Frees every frame of process `id` and forgets its page table.
    ///
    /// Returns the number of pages released.
    ///
    /// # Errors
    ///
    /// [`PagingError::ProcessNotFound`] if `id` is not a live process.
    pub fn deallocate(&mut self, id: ProcessId) -> Result<usize, PagingError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::paging_error::*;

        let process = self
            .processes
            .remove(&id)
            .context(ProcessNotFoundSnafu { id })?;
        for frame in process.page_table().frames() {
            self.frames[frame.value()].release();
            self.free.insert(frame.value()..frame.value() + 1);
        }
        debug_assert!(self.is_consistent());
        log::debug!(
            "deallocated process {id}: {} pages released",
            process.page_count()
        );

        Ok(process.page_count())
    }

    /// Translates a logical address of process `id` into a physical one.
    ///
    /// # Errors
    ///
    /// - [`PagingError::ProcessNotFound`] if `id` is not a live process.
    /// - [`PagingError::PageOutOfRange`] if the address lies past the last
    ///   page of the process.
    /// - [`PagingError::PageFault`] if the page has no valid mapping. Every
    ///   allocated page is mapped, so this does not happen today.
    pub fn translate(
        &self,
        id: ProcessId,
        logical: LogicalAddr,
    ) -> Result<Translation, PagingError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::paging_error::*;

        let process = self.process(id).context(ProcessNotFoundSnafu { id })?;
        let page_bytes = self.config.page_size_bytes();
        let (page, offset) = logical.split(page_bytes);
        let page_count = process.page_count();
        ensure!(
            page.value() < page_count,
            PageOutOfRangeSnafu {
                id,
                page,
                page_count,
            }
        );

        let frame = process
            .page_table()
            .entry(page)
            .and_then(PageTableEntry::resolve)
            .context(PageFaultSnafu { id, page })?;
        let physical = PhysAddr::from_parts(frame, offset, page_bytes);
        log::trace!("process {id}: {logical} -> page {page}+{offset} -> frame {frame} -> {physical}");

        Ok(Translation {
            logical,
            page,
            offset,
            frame,
            physical,
        })
    }

    #[must_use]
    pub fn frame_stats(&self) -> FrameStats {
        let frame_count = self.frames.len();
        let frames_free = self.free.element_count();
        FrameStats {
            frame_count,
            frames_used: frame_count - frames_free,
            frames_free,
            free_memory: frames_free * self.config.page_size,
        }
    }

    /// Fraction of frames in use, in `0.0..=1.0`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        let stats = self.frame_stats();
        stats.frames_used as f64 / stats.frame_count as f64
    }

    /// The free-frame index matches the frame states and every allocated
    /// frame belongs to exactly one page of a live process.
    fn is_consistent(&self) -> bool {
        let free_frames = self
            .frames
            .iter()
            .filter(|frame| frame.is_free())
            .map(|frame| frame.id().value());
        if !free_frames.eq(self.free.elements()) {
            return false;
        }
        let mapped: usize = self.processes.values().map(Process::page_count).sum();
        mapped == self.frames.len() - self.free.element_count()
            && self.processes.values().all(|process| {
                process.page_table().entries().all(|entry| {
                    entry.resolve().is_some_and(|frame| {
                        self.frames[frame.value()].state()
                            == FrameState::Allocated {
                                owner: process.id(),
                                page: entry.page(),
                            }
                    })
                })
            })
    }
}

fn all_free(frame_count: usize) -> (Vec<Frame>, RangeSet<FREE_RANGES>) {
    let frames = (0..frame_count)
        .map(|n| Frame::free(FrameNum::new(n)))
        .collect();
    let mut free = RangeSet::new();
    free.insert(0..frame_count);
    (frames, free)
}
