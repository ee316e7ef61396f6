use process::ProcessId;

use crate::address::{FrameNum, PageNum};

/// Whether a frame is free or backs a page of some process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum FrameState {
    Free,
    Allocated { owner: ProcessId, page: PageNum },
}

/// A fixed-size slot of physical memory.
///
/// The frame number is fixed for the lifetime of the allocator; only the
/// state toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    id: FrameNum,
    state: FrameState,
}

impl Frame {
    pub(crate) fn free(id: FrameNum) -> Self {
        Self {
            id,
            state: FrameState::Free,
        }
    }

    #[must_use]
    pub fn id(&self) -> FrameNum {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.state.is_free()
    }

    /// The owning process, or `None` for a free frame.
    #[must_use]
    pub fn owner(&self) -> Option<ProcessId> {
        match self.state {
            FrameState::Free => None,
            FrameState::Allocated { owner, .. } => Some(owner),
        }
    }

    pub(crate) fn assign(&mut self, owner: ProcessId, page: PageNum) {
        assert!(self.is_free(), "Frame {} is already allocated", self.id);
        self.state = FrameState::Allocated { owner, page };
    }

    pub(crate) fn release(&mut self) {
        self.state = FrameState::Free;
    }
}
