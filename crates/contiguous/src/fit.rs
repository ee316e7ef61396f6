//! Free-block selection strategies.

use core::{fmt, str::FromStr};

use crate::block::Block;

/// How [`find_fit`] picks among free blocks large enough for a request.
///
/// Scan order is ascending start address. Ties are always resolved in favour
/// of the block met first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// The first block that fits.
    #[default]
    FirstFit,
    /// The smallest block that fits, minimizing the leftover.
    BestFit,
    /// The largest block that fits, maximizing the leftover.
    WorstFit,
}

impl Strategy {
    pub const ALL: [Self; 3] = [Self::FirstFit, Self::BestFit, Self::WorstFit];

    /// Name used by the command line and in messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FirstFit => "first-fit",
            Self::BestFit => "best-fit",
            Self::WorstFit => "worst-fit",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown allocation strategy {name:?}, expected first-fit, best-fit or worst-fit")]
pub struct ParseStrategyError {
    name: String,
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStrategyError { name: s.to_owned() })
    }
}

/// Returns the index of the free block `strategy` selects for `size` units,
/// or `None` if no free block is large enough.
pub(crate) fn find_fit(blocks: &[Block], size: usize, strategy: Strategy) -> Option<usize> {
    let mut candidates = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.is_free() && block.size() >= size);

    let chosen = match strategy {
        Strategy::FirstFit => candidates.next(),
        Strategy::BestFit => {
            candidates.reduce(|best, c| if c.1.size() < best.1.size() { c } else { best })
        }
        Strategy::WorstFit => {
            candidates.reduce(|best, c| if c.1.size() > best.1.size() { c } else { best })
        }
    };
    chosen.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use process::ProcessId;

    use super::*;

    fn pid(value: u64) -> ProcessId {
        ProcessId::from_raw(value).unwrap()
    }

    /// `free 32 | P1 16 | free 16 | P2 16 | free 48 | P3 16 | free 16 | P4 16 | free 48`
    fn layout() -> Vec<Block> {
        vec![
            Block::free(0, 32),
            Block::allocated(32, 16, pid(1)),
            Block::free(48, 16),
            Block::allocated(64, 16, pid(2)),
            Block::free(80, 48),
            Block::allocated(128, 16, pid(3)),
            Block::free(144, 16),
            Block::allocated(160, 16, pid(4)),
            Block::free(176, 48),
        ]
    }

    #[test]
    fn test_first_fit() {
        let blocks = layout();
        assert_eq!(find_fit(&blocks, 16, Strategy::FirstFit), Some(0));
        assert_eq!(find_fit(&blocks, 33, Strategy::FirstFit), Some(4));
    }

    #[test]
    fn test_best_fit_prefers_first_of_equal_sizes() {
        let blocks = layout();
        assert_eq!(find_fit(&blocks, 16, Strategy::BestFit), Some(2));
        assert_eq!(find_fit(&blocks, 20, Strategy::BestFit), Some(0));
        assert_eq!(find_fit(&blocks, 40, Strategy::BestFit), Some(4));
    }

    #[test]
    fn test_worst_fit_prefers_first_of_equal_sizes() {
        let blocks = layout();
        assert_eq!(find_fit(&blocks, 16, Strategy::WorstFit), Some(4));
        assert_eq!(find_fit(&blocks, 48, Strategy::WorstFit), Some(4));
    }

    #[test]
    fn test_no_fit() {
        let blocks = layout();
        for strategy in Strategy::ALL {
            assert_eq!(find_fit(&blocks, 49, strategy), None);
        }
    }

    #[test]
    fn test_allocated_blocks_are_skipped() {
        let blocks = vec![Block::allocated(0, 64, pid(1)), Block::free(64, 16)];
        for strategy in Strategy::ALL {
            assert_eq!(find_fit(&blocks, 16, strategy), Some(1));
        }
    }

    #[test]
    fn test_deterministic() {
        let blocks = layout();
        for strategy in Strategy::ALL {
            let first = find_fit(&blocks, 16, strategy);
            for _ in 0..4 {
                assert_eq!(find_fit(&blocks, 16, strategy), first);
            }
        }
    }

    #[test]
    fn test_parse_and_display() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
        }
        assert_eq!("Best-Fit".parse::<Strategy>(), Ok(Strategy::BestFit));
        assert!("next-fit".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::FirstFit);
    }
}
