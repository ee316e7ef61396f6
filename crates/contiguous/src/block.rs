//! The ordered block sequence of the contiguous allocator.
//!
//! # Layout
//!
//! ```text
//!  0        192            512      672                        1024
//!  ┌────────┬──────────────┬────────┬──────────────────────────┐
//!  │ P1 192 │ P2 320       │ P3 160 │ free 352                 │
//!  └────────┴──────────────┴────────┴──────────────────────────┘
//! ```
//!
//! Blocks are sorted by start address and tile `[0, total)` with no gaps and
//! no overlaps. Outside of a running operation no two neighbours are both
//! free. Every mutation here preserves the tiling; the no-adjacent-free rule
//! is restored by [`BlockList::coalesce`].

use process::ProcessId;

/// Whether a block is free or owned by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum BlockState {
    Free,
    Allocated { owner: ProcessId },
}

/// A contiguous span of the simulated address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    start: usize,
    size: usize,
    state: BlockState,
}

impl Block {
    pub(crate) fn free(start: usize, size: usize) -> Self {
        Self {
            start,
            size,
            state: BlockState::Free,
        }
    }

    pub(crate) fn allocated(start: usize, size: usize, owner: ProcessId) -> Self {
        Self {
            start,
            size,
            state: BlockState::Allocated { owner },
        }
    }

    /// First address of the block.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Size of the block in units.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the last address of the block.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    #[must_use]
    pub fn state(&self) -> BlockState {
        self.state
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }

    /// The owning process, or `None` for a free block.
    #[must_use]
    pub fn owner(&self) -> Option<ProcessId> {
        match self.state {
            BlockState::Free => None,
            BlockState::Allocated { owner } => Some(owner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockList {
    blocks: Vec<Block>,
}

impl BlockList {
    pub(crate) fn new(total_size: usize) -> Self {
        Self {
            blocks: vec![Block::free(0, total_size)],
        }
    }

    pub(crate) fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    fn replace_at(&mut self, index: usize, block: Block) {
        self.blocks[index] = block;
    }

    fn insert_after(&mut self, index: usize, block: Block) {
        self.blocks.insert(index + 1, block);
    }

    /// Carves an allocated block of `size` units out of the free block at
    /// `index` and returns its start address.
    ///
    /// The allocated part keeps the original start; a free remainder, if
    /// any, directly follows it. Never coalesces.
    ///
    /// # Panics
    ///
    /// Panics if the block at `index` is not free or is smaller than `size`.
    pub(crate) fn split(&mut self, index: usize, size: usize, owner: ProcessId) -> usize {
        let block = self.blocks[index];
        assert!(block.is_free(), "Block {index} must be free");
        assert!(size > 0 && size <= block.size, "Block {index} cannot hold {size} units");

        let remaining = block.size - size;
        self.replace_at(index, Block::allocated(block.start, size, owner));
        if remaining > 0 {
            self.insert_after(index, Block::free(block.start + size, remaining));
        }
        block.start
    }

    /// Marks every block owned by `owner` as free.
    ///
    /// Returns the number of units released, or `None` (leaving the list
    /// untouched) if `owner` owns nothing.
    pub(crate) fn release(&mut self, owner: ProcessId) -> Option<usize> {
        let mut released = None;
        for block in &mut self.blocks {
            if block.owner() == Some(owner) {
                block.state = BlockState::Free;
                *released.get_or_insert(0) += block.size;
            }
        }
        released
    }

    /// Merges adjacent free blocks in a single left-to-right pass.
    ///
    /// Returns the number of merges performed.
    pub(crate) fn coalesce(&mut self) -> usize {
        let mut merged = 0;
        let mut i = 0;
        while i + 1 < self.blocks.len() {
            if self.blocks[i].is_free() && self.blocks[i + 1].is_free() {
                let next = self.blocks.remove(i + 1);
                self.blocks[i].size += next.size;
                merged += 1;
            } else {
                i += 1;
            }
        }
        merged
    }

    /// Returns `true` if the blocks tile `[0, total_size)` exactly.
    pub(crate) fn covers(&self, total_size: usize) -> bool {
        let mut expected_start = 0;
        for block in &self.blocks {
            if block.start != expected_start || block.size == 0 {
                return false;
            }
            expected_start = block.end();
        }
        expected_start == total_size
    }

    /// Returns `true` if two neighbouring blocks are both free.
    pub(crate) fn has_adjacent_free(&self) -> bool {
        self.blocks
            .windows(2)
            .any(|pair| pair[0].is_free() && pair[1].is_free())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(value: u64) -> ProcessId {
        ProcessId::from_raw(value).unwrap()
    }

    #[test]
    fn test_split_with_remainder() {
        let mut list = BlockList::new(64);
        let start = list.split(0, 16, pid(1));
        assert_eq!(start, 0);
        assert_eq!(
            list.as_slice(),
            &[Block::allocated(0, 16, pid(1)), Block::free(16, 48)]
        );
        assert!(list.covers(64));
    }

    #[test]
    fn test_split_exact_fit() {
        let mut list = BlockList::new(64);
        list.split(0, 64, pid(1));
        assert_eq!(list.as_slice(), &[Block::allocated(0, 64, pid(1))]);
        assert!(list.covers(64));
    }

    #[test]
    fn test_split_in_the_middle() {
        let mut list = BlockList::new(64);
        list.split(0, 16, pid(1));
        list.split(1, 16, pid(2));
        list.release(pid(1));
        let start = list.split(2, 8, pid(3));
        assert_eq!(start, 32);
        assert_eq!(
            list.as_slice(),
            &[
                Block::free(0, 16),
                Block::allocated(16, 16, pid(2)),
                Block::allocated(32, 8, pid(3)),
                Block::free(40, 24),
            ]
        );
        assert!(list.covers(64));
    }

    #[test]
    #[should_panic(expected = "Block 0 must be free")]
    fn test_split_allocated_block() {
        let mut list = BlockList::new(64);
        list.split(0, 16, pid(1));
        list.split(0, 16, pid(2));
    }

    #[test]
    #[should_panic(expected = "Block 0 cannot hold 128 units")]
    fn test_split_too_small() {
        let mut list = BlockList::new(64);
        list.split(0, 128, pid(1));
    }

    #[test]
    fn test_release_unknown_owner() {
        let mut list = BlockList::new(64);
        list.split(0, 16, pid(1));
        let before = list.clone();
        assert_eq!(list.release(pid(2)), None);
        assert_eq!(list, before);
    }

    #[test]
    fn test_coalesce_merges_runs() {
        let mut list = BlockList::new(64);
        list.split(0, 16, pid(1));
        list.split(1, 16, pid(2));
        list.split(2, 16, pid(3));
        assert_eq!(list.release(pid(1)), Some(16));
        assert_eq!(list.release(pid(2)), Some(16));
        assert_eq!(list.release(pid(3)), Some(16));
        assert!(list.has_adjacent_free());

        assert_eq!(list.coalesce(), 3);
        assert_eq!(list.as_slice(), &[Block::free(0, 64)]);
        assert!(!list.has_adjacent_free());
        assert!(list.covers(64));
    }

    #[test]
    fn test_coalesce_keeps_separated_holes() {
        let mut list = BlockList::new(64);
        list.split(0, 16, pid(1));
        list.split(1, 16, pid(2));
        list.split(2, 16, pid(3));
        list.release(pid(2));
        assert_eq!(list.coalesce(), 0);
        assert_eq!(list.as_slice().len(), 4);
    }

    #[test]
    fn test_covers_detects_gaps() {
        let list = BlockList {
            blocks: vec![Block::free(0, 16), Block::free(32, 32)],
        };
        assert!(!list.covers(64));
        assert!(!BlockList::new(64).covers(32));
    }
}
