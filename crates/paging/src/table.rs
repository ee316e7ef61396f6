//! Per-process page tables.
//!
//! A page table maps the logical pages `0..len` of one process, without
//! gaps, to physical frames. `Debug` output joins runs of consecutive pages
//! backed by consecutive frames:
//!
//! ```text
//! {0..=2: 0..=2, 3..=4: 5..=6}
//! ```

use core::{fmt, iter::FusedIterator, slice};

use crate::address::{FrameNum, PageNum};

/// Mapping of one logical page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTableEntry {
    page: PageNum,
    frame: Option<FrameNum>,
    valid: bool,
}

impl PageTableEntry {
    fn mapped(page: PageNum, frame: FrameNum) -> Self {
        Self {
            page,
            frame: Some(frame),
            valid: true,
        }
    }

    #[must_use]
    pub fn page(&self) -> PageNum {
        self.page
    }

    /// The backing frame, whether or not the entry is valid.
    #[must_use]
    pub fn frame(&self) -> Option<FrameNum> {
        self.frame
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The frame a reference to this page resolves to, or `None` if the
    /// access would fault.
    #[must_use]
    pub fn resolve(&self) -> Option<FrameNum> {
        self.frame.filter(|_| self.valid)
    }
}

/// Page table of a single process.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    /// Maps page `i` to the `i`-th frame of `frames`.
    pub(crate) fn new(frames: impl IntoIterator<Item = FrameNum>) -> Self {
        let entries = frames
            .into_iter()
            .enumerate()
            .map(|(page, frame)| PageTableEntry::mapped(PageNum::new(page), frame))
            .collect();
        Self { entries }
    }

    /// Number of pages mapped by this table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, page: PageNum) -> Option<&PageTableEntry> {
        self.entries.get(page.value())
    }

    pub fn entries(&self) -> slice::Iter<'_, PageTableEntry> {
        self.entries.iter()
    }

    /// Frames referenced by valid entries, in page order.
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            iter: self.entries.iter(),
        }
    }
}

impl<'a> IntoIterator for &'a PageTable {
    type Item = &'a PageTableEntry;
    type IntoIter = slice::Iter<'a, PageTableEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

/// Iterator returned by [`PageTable::frames`].
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    iter: slice::Iter<'a, PageTableEntry>,
}

impl Iterator for Frames<'_> {
    type Item = FrameNum;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.by_ref().find_map(PageTableEntry::resolve)
    }
}

impl FusedIterator for Frames<'_> {}

impl fmt::Debug for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dm = f.debug_map();
        let mut run: Option<Run> = None;
        for entry in &self.entries {
            let next = Run::new(entry);
            if let Some(current) = &mut run
                && current.try_join(&next).is_ok()
            {
                continue;
            }
            if let Some(done) = run.replace(next) {
                dm.entry(&done.pages(), &done);
            }
        }
        if let Some(done) = run {
            dm.entry(&done.pages(), &done);
        }
        dm.finish()
    }
}

struct Run {
    pages: (PageNum, PageNum),
    frames: Option<(FrameNum, FrameNum)>,
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((min, max)) = self.frames else {
            return write!(f, "[invalid]");
        };
        write!(f, "{min}..={max}")
    }
}

impl Run {
    fn new(entry: &PageTableEntry) -> Self {
        Self {
            pages: (entry.page, entry.page),
            frames: entry.resolve().map(|frame| (frame, frame)),
        }
    }

    fn pages(&self) -> DebugRange<PageNum> {
        DebugRange(self.pages.0, self.pages.1)
    }

    fn try_join(&mut self, other: &Self) -> Result<(), ()> {
        if self.pages.1.checked_next() != Some(other.pages.0) {
            return Err(());
        }
        match (&mut self.frames, other.frames) {
            (Some(frames), Some(other_frames))
                if frames.1.checked_next() == Some(other_frames.0) =>
            {
                frames.1 = other_frames.1;
            }
            (None, None) => {}
            _ => return Err(()),
        }
        self.pages.1 = other.pages.1;
        Ok(())
    }
}

struct DebugRange<T>(T, T);

impl<T> fmt::Debug for DebugRange<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(nums: &[usize]) -> Vec<FrameNum> {
        nums.iter().copied().map(FrameNum::new).collect()
    }

    #[test]
    fn test_pages_are_numbered_without_gaps() {
        let table = PageTable::new(frames(&[4, 9, 2]));
        assert_eq!(table.len(), 3);
        let pages: Vec<_> = table.entries().map(PageTableEntry::page).collect();
        assert_eq!(pages, vec![PageNum::new(0), PageNum::new(1), PageNum::new(2)]);
        assert!(table.entries().all(PageTableEntry::is_valid));
        assert_eq!(table.frames().collect::<Vec<_>>(), frames(&[4, 9, 2]));
    }

    #[test]
    fn test_entry_lookup() {
        let table = PageTable::new(frames(&[4, 9]));
        assert_eq!(
            table.entry(PageNum::new(1)).and_then(PageTableEntry::resolve),
            Some(FrameNum::new(9))
        );
        assert_eq!(table.entry(PageNum::new(2)), None);
    }

    #[test]
    fn test_invalid_entry_does_not_resolve() {
        let entry = PageTableEntry {
            page: PageNum::new(0),
            frame: Some(FrameNum::new(1)),
            valid: false,
        };
        assert_eq!(entry.resolve(), None);
        assert_eq!(entry.frame(), Some(FrameNum::new(1)));
    }

    #[test]
    fn test_debug_joins_runs() {
        let table = PageTable::new(frames(&[0, 1, 2, 5, 6, 3]));
        assert_eq!(
            format!("{table:?}"),
            "{0..=2: 0..=2, 3..=4: 5..=6, 5..=5: 3..=3}"
        );
        assert_eq!(format!("{:?}", PageTable::new(frames(&[]))), "{}");
    }

    #[test]
    fn test_debug_marks_invalid_entries() {
        let mut table = PageTable::new(frames(&[0, 1, 2]));
        table.entries[1].valid = false;
        assert_eq!(
            format!("{table:?}"),
            "{0..=0: 0..=0, 1..=1: [invalid], 2..=2: 2..=2}"
        );
    }
}
