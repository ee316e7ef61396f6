//! Page numbers, frame numbers and the two address spaces.
//!
//! Logical addresses are per-process byte offsets; physical addresses are
//! byte offsets into the frame array. Both split into a page (or frame)
//! number and an offset using the runtime page size in bytes.

use core::fmt;

macro_rules! impl_fmt {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl fmt::LowerHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }

        impl fmt::UpperHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::UpperHex::fmt(&self.0, f)
            }
        }
    };
}

/// Index of a page in a process's logical address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PageNum(usize);
impl_fmt!(PageNum);

impl PageNum {
    #[must_use]
    pub const fn new(page_num: usize) -> Self {
        Self(page_num)
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }

    /// Returns the page right after this one.
    ///
    /// Returns `None` if the addition would overflow.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

/// Index of a physical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FrameNum(usize);
impl_fmt!(FrameNum);

impl FrameNum {
    #[must_use]
    pub const fn new(frame_num: usize) -> Self {
        Self(frame_num)
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }

    /// Returns the frame right after this one.
    ///
    /// Returns `None` if the addition would overflow.
    #[must_use]
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

/// Byte address in a process's logical address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct LogicalAddr(usize);
impl_fmt!(LogicalAddr);

impl LogicalAddr {
    #[must_use]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }

    /// Splits the address into its page number and the offset within that
    /// page.
    ///
    /// # Panics
    ///
    /// Panics if `page_bytes` is zero.
    #[must_use]
    pub const fn split(self, page_bytes: usize) -> (PageNum, usize) {
        assert!(page_bytes > 0, "Page size must be positive");
        (PageNum(self.0 / page_bytes), self.0 % page_bytes)
    }
}

/// Byte address in physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);
impl_fmt!(PhysAddr);

impl PhysAddr {
    #[must_use]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Creates a physical address from a frame number and offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not less than `page_bytes`.
    #[must_use]
    pub const fn from_parts(frame: FrameNum, offset: usize, page_bytes: usize) -> Self {
        assert!(offset < page_bytes, "Offset must be less than the page size");
        Self(frame.0 * page_bytes + offset)
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_logical_address() {
        let addr = LogicalAddr::new(4096 * 2 + 10);
        assert_eq!(addr.split(4096), (PageNum::new(2), 10));
        assert_eq!(LogicalAddr::new(4095).split(4096), (PageNum::new(0), 4095));
    }

    #[test]
    fn test_physical_address_parts() {
        let addr = PhysAddr::from_parts(FrameNum::new(7), 10, 4096);
        assert_eq!(addr.value(), 7 * 4096 + 10);
    }

    #[test]
    #[should_panic(expected = "Offset must be less than the page size")]
    fn test_offset_out_of_page() {
        let _ = PhysAddr::from_parts(FrameNum::new(0), 4096, 4096);
    }

    #[test]
    fn test_formatting() {
        let addr = LogicalAddr::new(8202);
        assert_eq!(format!("{addr}"), "8202");
        assert_eq!(format!("{addr:#x}"), "0x200a");
        assert_eq!(format!("{:X}", FrameNum::new(255)), "FF");
    }
}
