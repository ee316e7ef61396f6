//! Process identifiers shared by the allocation engines.
//!
//! Every engine owns its own [`ProcessIdAllocator`], so independent
//! simulations never observe each other's ids. Identifiers are handed out in
//! increasing order starting at 1 and are only recycled when the owning engine
//! is re-initialized (at which point no process is alive anymore).

use core::{fmt, num::NonZeroU64, str::FromStr};

/// Opaque identifier of a simulated process.
///
/// The numeric value is exposed for display purposes only; engines never
/// interpret it beyond equality and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(NonZeroU64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ProcessId {
    /// Creates an identifier from its raw value.
    ///
    /// Returns `None` for zero, which is never handed out.
    #[must_use]
    pub const fn from_raw(value: u64) -> Option<Self> {
        match NonZeroU64::new(value) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0.get()
    }
}

/// Error returned when parsing a [`ProcessId`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid process id: {input:?}")]
pub struct ParseProcessIdError {
    input: String,
}

impl FromStr for ProcessId {
    type Err = ParseProcessIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .ok()
            .and_then(Self::from_raw)
            .ok_or_else(|| ParseProcessIdError {
                input: s.to_owned(),
            })
    }
}

/// Monotonically increasing source of [`ProcessId`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdAllocator {
    next: NonZeroU64,
}

impl Default for ProcessIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessIdAllocator {
    /// Creates an allocator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: NonZeroU64::MIN,
        }
    }

    /// Hands out a fresh id.
    ///
    /// # Panics
    ///
    /// Panics if the id space is exhausted.
    pub fn allocate(&mut self) -> ProcessId {
        let id = ProcessId(self.next);
        self.next = self
            .next
            .checked_add(1)
            .expect("process id space exhausted");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut ids = ProcessIdAllocator::new();
        let first = ids.allocate();
        let second = ids.allocate();
        assert_eq!(first.value(), 1);
        assert_eq!(second.value(), 2);
        assert!(first < second);
    }

    #[test]
    fn test_zero_is_not_an_id() {
        assert_eq!(ProcessId::from_raw(0), None);
        assert!("0".parse::<ProcessId>().is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let id: ProcessId = "42".parse().unwrap();
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert!("P42".parse::<ProcessId>().is_err());
    }
}
