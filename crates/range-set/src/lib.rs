//! A fixed-capacity set of non-overlapping `usize` ranges.
//!
//! `RangeSet` keeps its ranges sorted by start and merges overlapping or
//! adjacent ranges on insertion, so the stored representation is always
//! canonical. The paged allocator uses it as its free-frame index: frames are
//! returned with [`insert`](RangeSet::insert), handed out with
//! [`remove`](RangeSet::remove), and [`elements`](RangeSet::elements) walks
//! the free frames in ascending order.
//!
//! # Examples
//!
//! ```
//! use range_set::RangeSet;
//!
//! let mut free = RangeSet::<8>::new();
//! free.insert(0..16);
//!
//! // Frames 4..9 get allocated.
//! free.remove(4..9);
//! assert_eq!(free.as_slice(), &[0..4, 9..16]);
//! assert_eq!(free.element_count(), 11);
//!
//! // The first three free frames, lowest first.
//! let first: Vec<usize> = free.elements().take(3).collect();
//! assert_eq!(first, vec![0, 1, 2]);
//!
//! // Freeing 4..9 again restores a single range.
//! free.insert(4..9);
//! assert_eq!(free.as_slice(), &[0..16]);
//! ```
//!
//! # Capacity
//!
//! Storage is an `ArrayVec`, so the set never allocates. A universe of `n`
//! elements can hold at most `n.div_ceil(2)` disjoint, non-adjacent ranges;
//! choose `CAP` accordingly. Exceeding the capacity panics.

#![cfg_attr(not(test), no_std)]

use core::{iter::FusedIterator, mem, ops::Range, slice};

use arrayvec::ArrayVec;

/// A collection of non-overlapping ranges stored in sorted order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct RangeSet<const CAP: usize> {
    ranges: ArrayVec<Range<usize>, CAP>,
}

impl<const CAP: usize> RangeSet<CAP> {
    /// Creates a new empty `RangeSet`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the ranges, sorted by start.
    pub fn iter(&self) -> slice::Iter<'_, Range<usize>> {
        self.ranges.iter()
    }

    /// Returns all ranges in sorted order.
    #[must_use]
    pub fn as_slice(&self) -> &[Range<usize>] {
        self.ranges.as_slice()
    }

    /// Returns `true` if the set contains no ranges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns the number of individual values covered by the set.
    ///
    /// ```
    /// use range_set::RangeSet;
    ///
    /// let set: RangeSet<4> = [0..3, 10..12].into_iter().collect();
    /// assert_eq!(set.element_count(), 5);
    /// ```
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.ranges.iter().map(ExactSizeIterator::len).sum()
    }

    /// Iterates over every covered value in ascending order.
    pub fn elements(&self) -> Elements<'_> {
        Elements {
            ranges: self.ranges.iter(),
            current: 0..0,
        }
    }

    /// Inserts a range into the set.
    ///
    /// Overlapping and adjacent ranges are merged into a single range.
    ///
    /// # Panics
    ///
    /// Panics if `insert_range.start > insert_range.end`, or if the result
    /// does not fit in `CAP` ranges.
    ///
    /// ```
    /// use range_set::RangeSet;
    ///
    /// let mut set = RangeSet::<4>::new();
    /// set.insert(1..5);
    /// set.insert(5..7);
    /// assert_eq!(set.as_slice(), &[1..7]);
    /// ```
    pub fn insert(&mut self, insert_range: Range<usize>) {
        assert!(
            insert_range.start <= insert_range.end,
            "Invalid range: {insert_range:?}"
        );
        if insert_range.is_empty() {
            return;
        }

        let mut inserted = false;
        let mut ir = insert_range;
        let mut ranges = mem::take(&mut self.ranges).into_iter();
        for r in ranges.by_ref() {
            if ir.end < r.start {
                inserted = true;
                self.ranges.push(ir.clone());
                self.ranges.push(r);
                break;
            }

            if ir.start > r.end {
                self.ranges.push(r);
                continue;
            }

            ir.start = usize::min(ir.start, r.start);
            ir.end = usize::max(ir.end, r.end);
        }
        if inserted {
            self.ranges.extend(ranges);
        } else {
            assert!(ranges.as_slice().is_empty());
            self.ranges.push(ir);
        }
    }

    /// Removes a range from the set.
    ///
    /// Ranges overlapping `remove_range` are trimmed or split.
    ///
    /// # Panics
    ///
    /// Panics if `remove_range.start > remove_range.end`, or if splitting
    /// would exceed `CAP` ranges.
    ///
    /// ```
    /// use range_set::RangeSet;
    ///
    /// let mut set = RangeSet::<4>::new();
    /// set.insert(0..10);
    /// set.remove(3..7);
    /// assert_eq!(set.as_slice(), &[0..3, 7..10]);
    /// ```
    pub fn remove(&mut self, remove_range: Range<usize>) {
        assert!(
            remove_range.start <= remove_range.end,
            "Invalid range: {remove_range:?}"
        );
        if remove_range.is_empty() {
            return;
        }

        let rr = remove_range;
        let mut ranges = mem::take(&mut self.ranges).into_iter();
        for r in ranges.by_ref() {
            if rr.end < r.start {
                self.ranges.push(r);
                break;
            }
            if r.start < rr.end && rr.start < r.end {
                if r.start < rr.start {
                    self.ranges.push(r.start..rr.start);
                }
                if rr.end < r.end {
                    self.ranges.push(rr.end..r.end);
                }
            } else {
                self.ranges.push(r);
            }
        }
        self.ranges.extend(ranges);
    }
}

impl<const CAP: usize> FromIterator<Range<usize>> for RangeSet<CAP> {
    fn from_iter<T: IntoIterator<Item = Range<usize>>>(iter: T) -> Self {
        let mut this = Self::new();
        this.extend(iter);
        this
    }
}

impl<const CAP: usize> Extend<Range<usize>> for RangeSet<CAP> {
    fn extend<T: IntoIterator<Item = Range<usize>>>(&mut self, iter: T) {
        for range in iter {
            self.insert(range);
        }
    }
}

impl<'a, const CAP: usize> IntoIterator for &'a RangeSet<CAP> {
    type Item = &'a Range<usize>;
    type IntoIter = slice::Iter<'a, Range<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Iterator over the individual values of a [`RangeSet`].
///
/// Created by [`RangeSet::elements`].
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    ranges: slice::Iter<'a, Range<usize>>,
    current: Range<usize>,
}

impl Iterator for Elements<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current.next() {
                return Some(value);
            }
            self.current = self.ranges.next()?.clone();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest: usize = self.ranges.clone().map(ExactSizeIterator::len).sum();
        let len = self.current.len() + rest;
        (len, Some(len))
    }
}

impl ExactSizeIterator for Elements<'_> {}

impl FusedIterator for Elements<'_> {}
