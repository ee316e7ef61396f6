//! Error plumbing shared by the workspace.
//!
//! - [`Location`] is captured implicitly by every snafu error variant so
//!   reports can point at the line that raised them.
//! - [`GenericError`] is the catch-all error of the front end, built with
//!   `whatever_context`.
//! - [`Report`] renders an error and its source chain for humans.

use core::{error::Error, fmt};

use ansi_term::{Color, WithFg};
use snafu::{GenerateImplicitData, Snafu};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Location {
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.0.file()
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.0.line()
    }
}

/// Errors that know where they were raised.
///
/// Implemented by every error type in the workspace that carries an implicit
/// [`Location`]; [`Report`] uses it to print `at <file:line>` lines.
pub trait Located {
    fn location(&self) -> Location;
}

#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct GenericError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn Error>, Some)))]
    source: Option<Box<dyn Error>>,
}

impl Located for GenericError {
    fn location(&self) -> Location {
        self.location
    }
}

type LocateFn = fn(&(dyn Error + 'static)) -> Option<Location>;

fn locate_generic(err: &(dyn Error + 'static)) -> Option<Location> {
    err.downcast_ref::<GenericError>().map(Located::location)
}

/// Human readable rendering of an error and its causes.
///
/// Locations are printed for [`GenericError`]s and for any error type
/// registered with [`with_locator`](Self::with_locator).
pub struct Report<E> {
    error: E,
    locators: Vec<LocateFn>,
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", WithFg::new(Color::Red, &self.error))?;
        if let Some(loc) = self.locate(&self.error) {
            writeln!(f, "  at {}", WithFg::new(Color::DarkGray, loc))?;
        }
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {}", WithFg::new(Color::Red, s))?;
            if let Some(loc) = self.locate(s) {
                writeln!(f, "      at {}", WithFg::new(Color::DarkGray, loc))?;
            }
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self {
            error,
            locators: vec![locate_generic],
        }
    }

    /// Teaches the report how to find the location of errors of type `T`.
    #[must_use]
    pub fn with_locator<T>(mut self) -> Self
    where
        T: Error + Located + 'static,
    {
        self.locators
            .push(|err| err.downcast_ref::<T>().map(Located::location));
        self
    }

    fn locate(&self, err: &(dyn Error + 'static)) -> Option<Location> {
        self.locators.iter().find_map(|locate| locate(err))
    }
}

#[cfg(test)]
mod tests {
    use snafu::{ResultExt as _, whatever};

    use super::*;

    fn fail_inner() -> Result<(), GenericError> {
        whatever!("inner failure")
    }

    fn fail_outer() -> Result<(), GenericError> {
        fail_inner().whatever_context("outer failure")
    }

    #[test]
    fn test_report_prints_chain() {
        let err = fail_outer().unwrap_err();
        let report = Report::new(err).to_string();
        assert!(report.contains("outer failure"));
        assert!(report.contains("Caused by:"));
        assert!(report.contains("inner failure"));
        assert!(report.contains(file!()));
    }

    #[test]
    fn test_location_points_at_caller() {
        let err = fail_inner().unwrap_err();
        assert_eq!(err.location().file(), file!());
    }
}
