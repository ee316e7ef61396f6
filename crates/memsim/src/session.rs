//! Engines driven by parsed operations.

use core::{error::Error, str::FromStr};

use contiguous::{AllocError, ContiguousAllocator, Strategy};
use paging::{PagedAllocator, PagingError};

use crate::{
    op::{ContiguousOp, ParseOpError, PagingOp},
    render::{ContiguousView, Label, PagingView},
};

/// An engine that can be driven from the command line.
pub(crate) trait Session {
    type Op: FromStr<Err = ParseOpError>;
    type Error: Error + 'static;

    /// Applies one operation and describes its outcome.
    fn apply(&mut self, op: Self::Op) -> Result<String, Self::Error>;

    /// Renders the current engine state.
    fn render(&self, grid: bool) -> String;
}

#[derive(Debug, Clone)]
pub(crate) struct ContiguousSession {
    memory: ContiguousAllocator,
    strategy: Strategy,
}

impl ContiguousSession {
    pub(crate) fn new(memory: ContiguousAllocator, strategy: Strategy) -> Self {
        Self { memory, strategy }
    }

    #[cfg(test)]
    pub(crate) fn memory(&self) -> &ContiguousAllocator {
        &self.memory
    }
}

impl Session for ContiguousSession {
    type Op = ContiguousOp;
    type Error = AllocError;

    fn apply(&mut self, op: Self::Op) -> Result<String, Self::Error> {
        let message = match op {
            ContiguousOp::Alloc { size, strategy } => {
                let strategy = strategy.unwrap_or(self.strategy);
                let allocation = self.memory.allocate(size, strategy)?;
                format!(
                    "{} allocated: {} KB at {} ({strategy})",
                    Label(allocation.id),
                    allocation.size,
                    allocation.start
                )
            }
            ContiguousOp::Free { id } => {
                let released = self.memory.deallocate(id)?;
                format!("{} deallocated: {released} KB released", Label(id))
            }
            ContiguousOp::Reset => {
                self.memory.reset();
                "Memory reset".to_owned()
            }
        };
        Ok(message)
    }

    fn render(&self, grid: bool) -> String {
        ContiguousView {
            memory: &self.memory,
            strategy: self.strategy,
            grid,
        }
        .to_string()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PagingSession {
    memory: PagedAllocator,
}

impl PagingSession {
    pub(crate) fn new(memory: PagedAllocator) -> Self {
        Self { memory }
    }

    #[cfg(test)]
    pub(crate) fn memory(&self) -> &PagedAllocator {
        &self.memory
    }
}

impl Session for PagingSession {
    type Op = PagingOp;
    type Error = PagingError;

    fn apply(&mut self, op: Self::Op) -> Result<String, Self::Error> {
        let message = match op {
            PagingOp::Alloc { size } => {
                let process = self.memory.allocate(size)?;
                let frames: Vec<String> = process
                    .page_table()
                    .frames()
                    .map(|frame| frame.to_string())
                    .collect();
                format!(
                    "{} allocated: {size} KB in {} pages, frames {}",
                    Label(process.id()),
                    process.page_count(),
                    frames.join(", ")
                )
            }
            PagingOp::Free { id } => {
                let pages = self.memory.deallocate(id)?;
                format!("{} deallocated: {pages} pages released", Label(id))
            }
            PagingOp::Translate { id, addr } => {
                let t = self.memory.translate(id, addr)?;
                format!(
                    "{}: logical {} = page {} + offset {} -> frame {} -> physical {}",
                    Label(id),
                    t.logical,
                    t.page,
                    t.offset,
                    t.frame,
                    t.physical
                )
            }
            PagingOp::Reset => {
                self.memory.reset();
                "Memory reset".to_owned()
            }
        };
        Ok(message)
    }

    fn render(&self, grid: bool) -> String {
        PagingView {
            memory: &self.memory,
            grid,
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use contiguous::ContiguousConfig;
    use paging::PagingConfig;

    use super::*;

    fn op<T: FromStr<Err = ParseOpError>>(s: &str) -> T {
        s.parse().unwrap()
    }

    #[test]
    fn test_contiguous_messages() {
        let memory = ContiguousAllocator::new(ContiguousConfig::default());
        let mut session = ContiguousSession::new(memory, Strategy::WorstFit);
        assert_eq!(
            session.apply(op("alloc:64")).unwrap(),
            "P1 allocated: 64 KB at 0 (worst-fit)"
        );
        assert_eq!(
            session.apply(op("alloc:32:best-fit")).unwrap(),
            "P2 allocated: 32 KB at 64 (best-fit)"
        );
        assert_eq!(
            session.apply(op("free:P1")).unwrap(),
            "P1 deallocated: 64 KB released"
        );
        let err = session.apply(op("free:P1")).unwrap_err();
        assert!(err.kind().is_process_not_found());

        assert_eq!(session.apply(op("reset")).unwrap(), "Memory reset");
        assert_eq!(session.memory().processes().count(), 0);
    }

    #[test]
    fn test_paging_messages() {
        let memory = PagedAllocator::new(PagingConfig::default()).unwrap();
        let mut session = PagingSession::new(memory);
        assert_eq!(
            session.apply(op("alloc:20")).unwrap(),
            "P1 allocated: 20 KB in 5 pages, frames 0, 1, 2, 3, 4"
        );
        assert_eq!(
            session.apply(op("translate:P1:8202")).unwrap(),
            "P1: logical 8202 = page 2 + offset 10 -> frame 2 -> physical 8202"
        );
        let err = session.apply(op("translate:P1:20480")).unwrap_err();
        assert!(err.kind().is_page_out_of_range());
        assert_eq!(
            session.apply(op("free:1")).unwrap(),
            "P1 deallocated: 5 pages released"
        );
        assert_eq!(session.memory().frame_stats().frames_used, 0);
    }
}
