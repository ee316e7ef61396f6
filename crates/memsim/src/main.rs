//! Terminal front end for the memory-allocation engines.
//!
//! ```text
//! memsim contiguous --strategy best-fit alloc:192 alloc:320 free:P1 alloc:64
//! memsim paging --total 256 --page 4 alloc:20 translate:P1:8202
//! memsim scenario with-frag
//! ```
//!
//! After every operation the memory grid and statistics are printed.
//! Operations the engine rejects are logged as warnings and the run goes on;
//! malformed operations abort the run before anything is executed.

use ansi_term::{Color, WithFg};
use argh::FromArgs;
use contiguous::{AllocError, ContiguousAllocator, ContiguousConfig, Strategy};
use log::LevelFilter;
use paging::{PagedAllocator, PagingConfig, PagingError};
use snafu::{ResultExt as _, ensure_whatever};
use snafu_utils::{GenericError, Report};

use self::{
    op::ParseOpError,
    scenario::{Scenario, Script},
    session::{ContiguousSession, PagingSession, Session},
};

mod logger;
mod op;
mod render;
mod scenario;
mod session;

/// Simulate contiguous and paged memory allocation.
#[derive(Debug, FromArgs)]
struct Args {
    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
    /// do not draw the memory grid
    #[argh(switch)]
    no_grid: bool,
    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Contiguous(ContiguousArgs),
    Paging(PagingArgs),
    Scenario(ScenarioArgs),
}

/// Run operations against a contiguous memory.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "contiguous")]
struct ContiguousArgs {
    /// total memory in KB
    #[argh(option, default = "1024")]
    total: usize,
    /// allocation unit in KB
    #[argh(option, default = "16")]
    unit: usize,
    /// placement strategy: first-fit, best-fit or worst-fit
    #[argh(option, default = "Strategy::FirstFit")]
    strategy: Strategy,
    /// operations: alloc:<size>[:<strategy>], free:<pid>, reset
    #[argh(positional)]
    ops: Vec<String>,
}

/// Run operations against a paged memory.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "paging")]
struct PagingArgs {
    /// total memory in KB
    #[argh(option, default = "256")]
    total: usize,
    /// page size in KB
    #[argh(option, default = "4")]
    page: usize,
    /// operations: alloc:<size>, free:<pid>, translate:<pid>:<addr>, reset
    #[argh(positional)]
    ops: Vec<String>,
}

/// Replay a scripted demonstration.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "scenario")]
struct ScenarioArgs {
    /// one of no-frag, with-frag, sequential, scattered
    #[argh(positional)]
    scenario: Scenario,
}

/// What happens when the engine rejects an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnReject {
    /// Log a warning and keep going.
    Warn,
    /// Abort the run.
    Abort,
}

fn main() {
    let args: Args = argh::from_env();

    if let Err(err) = run(&args) {
        let report = Report::new(err)
            .with_locator::<ParseOpError>()
            .with_locator::<AllocError>()
            .with_locator::<PagingError>();
        eprintln!("{report}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), GenericError> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logger::init(level).whatever_context("failed to install logger")?;

    let grid = !args.no_grid;
    match &args.command {
        Command::Contiguous(cmd) => {
            ensure_whatever!(cmd.unit > 0, "unit must be positive");
            ensure_whatever!(
                cmd.total > 0 && cmd.total.is_multiple_of(cmd.unit),
                "total size {} must be a positive multiple of the unit {}",
                cmd.total,
                cmd.unit
            );
            let memory = ContiguousAllocator::new(ContiguousConfig::new(cmd.total, cmd.unit));
            let mut session = ContiguousSession::new(memory, cmd.strategy);
            drive(&mut session, &cmd.ops, OnReject::Warn, grid)
        }
        Command::Paging(cmd) => {
            let memory = PagedAllocator::new(PagingConfig::new(cmd.total, cmd.page))
                .whatever_context("failed to initialize paged memory")?;
            drive(&mut PagingSession::new(memory), &cmd.ops, OnReject::Warn, grid)
        }
        Command::Scenario(cmd) => {
            log::info!("running scenario {}", cmd.scenario);
            match cmd.scenario.script() {
                Script::Contiguous {
                    config,
                    strategy,
                    ops,
                } => {
                    let mut session =
                        ContiguousSession::new(ContiguousAllocator::new(config), strategy);
                    drive(&mut session, ops, OnReject::Abort, grid)
                }
                Script::Paging { config, ops } => {
                    let memory = PagedAllocator::new(config)
                        .whatever_context("failed to initialize paged memory")?;
                    drive(&mut PagingSession::new(memory), ops, OnReject::Abort, grid)
                }
            }
        }
    }
}

fn drive<S, T>(
    session: &mut S,
    ops: &[T],
    on_reject: OnReject,
    grid: bool,
) -> Result<(), GenericError>
where
    S: Session,
    T: AsRef<str>,
{
    let ops = ops
        .iter()
        .map(|text| -> Result<_, GenericError> {
            let text = text.as_ref();
            let op = text
                .parse::<S::Op>()
                .with_whatever_context(|_| format!("invalid operation {text:?}"))?;
            Ok((text, op))
        })
        .collect::<Result<Vec<_>, _>>()?;

    print!("{}", session.render(grid));
    for (text, op) in ops {
        println!();
        println!("{} {text}", WithFg::new(Color::LightBlue, ">"));
        match session.apply(op) {
            Ok(message) => println!("{message}"),
            Err(err) if on_reject == OnReject::Warn => log::warn!("{text}: {err}"),
            Err(err) => {
                return Err(err).with_whatever_context(|_| format!("operation {text:?} failed"));
            }
        }
        print!("{}", session.render(grid));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ContiguousSession {
        ContiguousSession::new(ContiguousAllocator::default(), Strategy::FirstFit)
    }

    #[test]
    fn test_rejected_operation_warns_and_continues() {
        let mut session = session();
        drive(&mut session, &["alloc:2048", "alloc:16"], OnReject::Warn, false).unwrap();
        let processes = session.memory().processes().collect::<Vec<_>>();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].size, 16);
    }

    #[test]
    fn test_rejected_operation_aborts() {
        let mut session = session();
        let result = drive(&mut session, &["alloc:2048", "alloc:16"], OnReject::Abort, false);
        assert!(result.is_err());
        assert_eq!(session.memory().processes().count(), 0);
    }

    #[test]
    fn test_malformed_operation_runs_nothing() {
        let mut session = session();
        let before = session.memory().clone();
        let result = drive(&mut session, &["alloc:16", "bogus"], OnReject::Warn, false);
        assert!(result.is_err());
        assert_eq!(session.memory(), &before);
    }
}
