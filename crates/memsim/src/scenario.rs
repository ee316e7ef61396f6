//! Scripted demonstrations.

use core::{fmt, str::FromStr};

use contiguous::{ContiguousConfig, Strategy};
use paging::PagingConfig;

/// A canned sequence of operations with a known outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scenario {
    /// Three first-fit allocations fill memory from the bottom.
    NoFrag,
    /// Freeing every other process leaves separated holes.
    WithFrag,
    /// Pages land in consecutive frames.
    Sequential,
    /// Freed frames get reused, so a process spans non-adjacent frames.
    Scattered,
}

/// Engine and operations of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Script {
    Contiguous {
        config: ContiguousConfig,
        strategy: Strategy,
        ops: &'static [&'static str],
    },
    Paging {
        config: PagingConfig,
        ops: &'static [&'static str],
    },
}

impl Scenario {
    pub(crate) const ALL: [Self; 4] = [
        Self::NoFrag,
        Self::WithFrag,
        Self::Sequential,
        Self::Scattered,
    ];

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::NoFrag => "no-frag",
            Self::WithFrag => "with-frag",
            Self::Sequential => "sequential",
            Self::Scattered => "scattered",
        }
    }

    pub(crate) fn script(self) -> Script {
        match self {
            Self::NoFrag => Script::Contiguous {
                config: ContiguousConfig::default(),
                strategy: Strategy::FirstFit,
                ops: &["alloc:192", "alloc:320", "alloc:160"],
            },
            Self::WithFrag => Script::Contiguous {
                config: ContiguousConfig::default(),
                strategy: Strategy::FirstFit,
                ops: &[
                    "alloc:96", "alloc:160", "alloc:96", "alloc:160", "alloc:96", "free:P2",
                    "free:P4",
                ],
            },
            Self::Sequential => Script::Paging {
                config: PagingConfig::default(),
                ops: &["alloc:16", "alloc:24", "alloc:12"],
            },
            Self::Scattered => Script::Paging {
                config: PagingConfig::default(),
                ops: &[
                    "alloc:20", "alloc:16", "alloc:20", "alloc:16", "free:P2", "free:P4",
                    "alloc:12",
                ],
            },
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown scenario name.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown scenario {name:?}, expected no-frag, with-frag, sequential or scattered")]
pub(crate) struct ParseScenarioError {
    name: String,
}

impl FromStr for Scenario {
    type Err = ParseScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| ParseScenarioError { name: s.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use contiguous::ContiguousAllocator;
    use paging::PagedAllocator;

    use super::*;
    use crate::session::{ContiguousSession, PagingSession, Session};

    fn run<S: Session>(session: &mut S, ops: &[&str]) {
        for op in ops {
            let op = op.parse().unwrap();
            session.apply(op).unwrap();
        }
    }

    fn contiguous(scenario: Scenario) -> ContiguousSession {
        let Script::Contiguous {
            config,
            strategy,
            ops,
        } = scenario.script()
        else {
            panic!("{scenario} is not a contiguous scenario");
        };
        let mut session = ContiguousSession::new(ContiguousAllocator::new(config), strategy);
        run(&mut session, ops);
        session
    }

    fn paging(scenario: Scenario) -> PagingSession {
        let Script::Paging { config, ops } = scenario.script() else {
            panic!("{scenario} is not a paging scenario");
        };
        let mut session = PagingSession::new(PagedAllocator::new(config).unwrap());
        run(&mut session, ops);
        session
    }

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.to_string().parse::<Scenario>().unwrap(), scenario);
        }
        assert!("fragmented".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_no_frag() {
        let session = contiguous(Scenario::NoFrag);
        let starts: Vec<_> = session.memory().processes().map(|p| p.start).collect();
        assert_eq!(starts, vec![0, 192, 512]);
        let stats = session.memory().fragmentation_stats();
        assert_eq!(stats.free_block_count, 1);
        assert_eq!(stats.external_fragmentation, 0);
    }

    #[test]
    fn test_with_frag() {
        let session = contiguous(Scenario::WithFrag);
        let stats = session.memory().fragmentation_stats();
        assert_eq!(stats.free_block_count, 3);
        assert_eq!(stats.largest_free, 416);
        assert_eq!(stats.external_fragmentation, 320);
        let labels: Vec<_> = session
            .memory()
            .processes()
            .map(|p| p.id.value())
            .collect();
        assert_eq!(labels, vec![1, 3, 5]);
    }

    #[test]
    fn test_sequential() {
        let session = paging(Scenario::Sequential);
        let stats = session.memory().frame_stats();
        assert_eq!(stats.frames_used, 13);
        assert_eq!(session.memory().free_ranges(), &[13..64]);
    }

    #[test]
    fn test_scattered() {
        let session = paging(Scenario::Scattered);
        let last = session.memory().processes().last().unwrap();
        let frames: Vec<_> = last.page_table().frames().map(paging::FrameNum::value).collect();
        assert_eq!(frames, vec![5, 6, 7]);
    }
}
