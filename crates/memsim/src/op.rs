//! Command-line operations.
//!
//! An operation is one word of colon separated fields:
//!
//! ```text
//! alloc:<size>[:<strategy>]   free:<pid>   translate:<pid>:<addr>   reset
//! ```
//!
//! `<pid>` is either the numeric id or its `P<n>` label. Which operations
//! exist depends on the engine, so each engine has its own op type.

use core::{num::ParseIntError, str::FromStr};

use contiguous::{ParseStrategyError, Strategy};
use paging::LogicalAddr;
use process::{ParseProcessIdError, ProcessId};
use snafu::{OptionExt as _, ResultExt as _, Snafu};
use snafu_utils::{Located, Location};

#[derive(Debug, Snafu)]
#[snafu(module)]
pub(crate) enum ParseOpError {
    #[snafu(display("empty operation"))]
    Empty {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("unknown operation {command:?}, expected one of: {expected}"))]
    UnknownCommand {
        command: String,
        expected: &'static str,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("operation {command:?} requires a {argument}"))]
    MissingArgument {
        command: String,
        argument: &'static str,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("unexpected argument {argument:?} for operation {command:?}"))]
    UnexpectedArgument {
        command: String,
        argument: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid {argument} {value:?}"))]
    InvalidNumber {
        argument: &'static str,
        value: String,
        #[snafu(source)]
        source: ParseIntError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid strategy"))]
    InvalidStrategy {
        #[snafu(source)]
        source: ParseStrategyError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid process id {value:?}"))]
    InvalidProcessId {
        value: String,
        #[snafu(source)]
        source: ParseProcessIdError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for ParseOpError {
    fn location(&self) -> Location {
        match self {
            Self::Empty { location }
            | Self::UnknownCommand { location, .. }
            | Self::MissingArgument { location, .. }
            | Self::UnexpectedArgument { location, .. }
            | Self::InvalidNumber { location, .. }
            | Self::InvalidStrategy { location, .. }
            | Self::InvalidProcessId { location, .. } => *location,
        }
    }
}

/// An operation on the contiguous allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContiguousOp {
    /// Allocates `size` units, with the session strategy unless overridden.
    Alloc {
        size: usize,
        strategy: Option<Strategy>,
    },
    Free {
        id: ProcessId,
    },
    Reset,
}

impl FromStr for ContiguousOp {
    type Err = ParseOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        let mut fields = Fields::new(s)?;
        let op = match fields.command {
            "alloc" => Self::Alloc {
                size: fields.number("size")?,
                strategy: fields.strategy()?,
            },
            "free" => Self::Free {
                id: fields.process_id()?,
            },
            "reset" => Self::Reset,
            command => {
                return UnknownCommandSnafu {
                    command,
                    expected: "alloc, free, reset",
                }
                .fail();
            }
        };
        fields.finish()?;
        Ok(op)
    }
}

/// An operation on the paged allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PagingOp {
    Alloc { size: usize },
    Free { id: ProcessId },
    Translate { id: ProcessId, addr: LogicalAddr },
    Reset,
}

impl FromStr for PagingOp {
    type Err = ParseOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        let mut fields = Fields::new(s)?;
        let op = match fields.command {
            "alloc" => Self::Alloc {
                size: fields.number("size")?,
            },
            "free" => Self::Free {
                id: fields.process_id()?,
            },
            "translate" => Self::Translate {
                id: fields.process_id()?,
                addr: LogicalAddr::new(fields.number("address")?),
            },
            "reset" => Self::Reset,
            command => {
                return UnknownCommandSnafu {
                    command,
                    expected: "alloc, free, translate, reset",
                }
                .fail();
            }
        };
        fields.finish()?;
        Ok(op)
    }
}

struct Fields<'a> {
    command: &'a str,
    rest: core::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(s: &'a str) -> Result<Self, ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        let mut rest = s.trim().split(':');
        let command = rest.next().filter(|command| !command.is_empty());
        let command = command.context(EmptySnafu)?;
        Ok(Self { command, rest })
    }

    fn required(&mut self, argument: &'static str) -> Result<&'a str, ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        self.rest.next().context(MissingArgumentSnafu {
            command: self.command,
            argument,
        })
    }

    fn number(&mut self, argument: &'static str) -> Result<usize, ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        let value = self.required(argument)?;
        value
            .parse()
            .context(InvalidNumberSnafu { argument, value })
    }

    fn process_id(&mut self) -> Result<ProcessId, ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        let value = self.required("process id")?;
        let digits = value.strip_prefix(['P', 'p']).unwrap_or(value);
        digits.parse().context(InvalidProcessIdSnafu { value })
    }

    fn strategy(&mut self) -> Result<Option<Strategy>, ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        self.rest
            .next()
            .map(|name| name.parse().context(InvalidStrategySnafu))
            .transpose()
    }

    fn finish(mut self) -> Result<(), ParseOpError> {
        #[cfg_attr(not(test), expect(clippy::wildcard_imports))]
        use self::parse_op_error::*;

        match self.rest.next() {
            Some(argument) => UnexpectedArgumentSnafu {
                command: self.command,
                argument,
            }
            .fail(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(value: u64) -> ProcessId {
        ProcessId::from_raw(value).unwrap()
    }

    #[test]
    fn test_parse_contiguous_ops() {
        assert_eq!(
            "alloc:192".parse::<ContiguousOp>().unwrap(),
            ContiguousOp::Alloc {
                size: 192,
                strategy: None,
            }
        );
        assert_eq!(
            "alloc:64:best-fit".parse::<ContiguousOp>().unwrap(),
            ContiguousOp::Alloc {
                size: 64,
                strategy: Some(Strategy::BestFit),
            }
        );
        assert_eq!(
            "free:P2".parse::<ContiguousOp>().unwrap(),
            ContiguousOp::Free { id: pid(2) }
        );
        assert_eq!(
            "free:2".parse::<ContiguousOp>().unwrap(),
            ContiguousOp::Free { id: pid(2) }
        );
        assert_eq!("reset".parse::<ContiguousOp>().unwrap(), ContiguousOp::Reset);
    }

    #[test]
    fn test_parse_paging_ops() {
        assert_eq!(
            "translate:P1:8202".parse::<PagingOp>().unwrap(),
            PagingOp::Translate {
                id: pid(1),
                addr: LogicalAddr::new(8202),
            }
        );
        assert_eq!(
            "alloc:20".parse::<PagingOp>().unwrap(),
            PagingOp::Alloc { size: 20 }
        );
    }

    #[test]
    fn test_translate_is_paging_only() {
        let err = "translate:1:0".parse::<ContiguousOp>().unwrap_err();
        assert!(matches!(err, ParseOpError::UnknownCommand { .. }));
    }

    #[test]
    fn test_paging_rejects_strategy() {
        let err = "alloc:20:best-fit".parse::<PagingOp>().unwrap_err();
        assert!(matches!(
            err,
            ParseOpError::UnexpectedArgument { argument, .. } if argument == "best-fit"
        ));
    }

    #[test]
    fn test_malformed_ops() {
        assert!(matches!(
            "".parse::<ContiguousOp>(),
            Err(ParseOpError::Empty { .. })
        ));
        assert!(matches!(
            "alloc".parse::<ContiguousOp>(),
            Err(ParseOpError::MissingArgument { argument: "size", .. })
        ));
        assert!(matches!(
            "alloc:-16".parse::<ContiguousOp>(),
            Err(ParseOpError::InvalidNumber { argument: "size", .. })
        ));
        assert!(matches!(
            "alloc:16:fastest-fit".parse::<ContiguousOp>(),
            Err(ParseOpError::InvalidStrategy { .. })
        ));
        assert!(matches!(
            "free:P0".parse::<ContiguousOp>(),
            Err(ParseOpError::InvalidProcessId { .. })
        ));
        let err = "free:Q1".parse::<PagingOp>().unwrap_err();
        assert_eq!(err.location().file(), file!());
    }
}
