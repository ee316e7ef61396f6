//! Read-only summaries derived from the block sequence.

use crate::block::Block;

/// How scattered the free space is.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FragmentationStats {
    /// Sum of all free block sizes.
    pub total_free: usize,
    /// Size of the largest free block, 0 when memory is full.
    pub largest_free: usize,
    /// Free space outside the largest free block: memory that exists but
    /// cannot back a request as large as `total_free`.
    pub external_fragmentation: usize,
    pub free_block_count: usize,
}

impl FragmentationStats {
    pub(crate) fn from_blocks(blocks: &[Block]) -> Self {
        let (total_free, largest_free, free_block_count) = blocks
            .iter()
            .filter(|block| block.is_free())
            .fold((0, 0, 0), |(total, largest, count), block| {
                (total + block.size(), usize::max(largest, block.size()), count + 1)
            });
        Self {
            total_free,
            largest_free,
            external_fragmentation: total_free - largest_free,
            free_block_count,
        }
    }

    /// Free space is split over more than one block.
    #[must_use]
    pub fn is_fragmented(&self) -> bool {
        self.free_block_count > 1
    }
}

/// Memory usage totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub total: usize,
    pub used: usize,
    pub free: usize,
    pub process_count: usize,
}

impl Usage {
    pub(crate) fn from_blocks(total: usize, blocks: &[Block]) -> Self {
        let (used, process_count) = blocks
            .iter()
            .filter(|block| !block.is_free())
            .fold((0, 0), |(used, count), block| (used + block.size(), count + 1));
        Self {
            total,
            used,
            free: total - used,
            process_count,
        }
    }

    /// Fraction of memory in use, in `0.0..=1.0`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use process::ProcessId;

    use super::*;

    fn pid(value: u64) -> ProcessId {
        ProcessId::from_raw(value).unwrap()
    }

    #[test]
    fn test_empty_memory_is_not_fragmented() {
        let stats = FragmentationStats::from_blocks(&[Block::free(0, 64)]);
        assert_eq!(
            stats,
            FragmentationStats {
                total_free: 64,
                largest_free: 64,
                external_fragmentation: 0,
                free_block_count: 1,
            }
        );
        assert!(!stats.is_fragmented());
    }

    #[test]
    fn test_full_memory() {
        let blocks = [Block::allocated(0, 64, pid(1))];
        let stats = FragmentationStats::from_blocks(&blocks);
        assert_eq!(stats.largest_free, 0);
        assert_eq!(stats.free_block_count, 0);
        assert!(!stats.is_fragmented());

        let usage = Usage::from_blocks(64, &blocks);
        assert_eq!(usage.free, 0);
        assert!((usage.utilization() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scattered_holes() {
        let blocks = [
            Block::free(0, 16),
            Block::allocated(16, 16, pid(1)),
            Block::free(32, 8),
            Block::allocated(40, 8, pid(2)),
            Block::free(48, 16),
        ];
        let stats = FragmentationStats::from_blocks(&blocks);
        assert_eq!(stats.total_free, 40);
        assert_eq!(stats.largest_free, 16);
        assert_eq!(stats.external_fragmentation, 24);
        assert_eq!(stats.free_block_count, 3);
        assert!(stats.is_fragmented());

        let usage = Usage::from_blocks(64, &blocks);
        assert_eq!(usage.used, 24);
        assert_eq!(usage.free, 40);
        assert_eq!(usage.process_count, 2);
    }
}
