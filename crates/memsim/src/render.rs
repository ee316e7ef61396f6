//! Terminal rendering of engine snapshots.
//!
//! Memory is drawn as a grid of 8 columns: one cell per allocation unit for
//! the contiguous allocator, one cell per frame for the paged allocator.
//! Process labels and colors exist only here.

use core::fmt;

use ansi_term::{Color, WithBg, WithFg};
use contiguous::{ContiguousAllocator, Strategy};
use paging::PagedAllocator;
use process::ProcessId;

const COLUMNS: usize = 8;

/// Display label of a process, `P<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Label(pub(crate) ProcessId);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("P{}", self.0))
    }
}

/// Palette color of a process; it repeats every 8 ids.
pub(crate) fn process_color(id: ProcessId) -> Color {
    match (id.value() - 1) % 8 {
        0 => Color::LightBlue,
        1 => Color::Green,
        2 => Color::LightRed,
        3 => Color::Purple,
        4 => Color::Yellow,
        5 => Color::Cyan,
        6 => Color::LightMagenta,
        _ => Color::LightGreen,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Free,
    Owned { id: ProcessId, labeled: bool },
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Free => write!(f, "{}", WithBg::new(Color::DarkGray, " .. ")),
            Self::Owned { id, labeled: true } => write!(
                f,
                "{}",
                WithBg::new(process_color(id), format_args!("{:^4}", Label(id)))
            ),
            Self::Owned { id, labeled: false } => {
                write!(f, "{}", WithBg::new(process_color(id), "    "))
            }
        }
    }
}

struct Grid(Vec<Cell>);

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.0.chunks(COLUMNS) {
            write!(f, "  ")?;
            for cell in row {
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct Percent(f64);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Grid, fragmentation panel and process list of a contiguous memory.
pub(crate) struct ContiguousView<'a> {
    pub(crate) memory: &'a ContiguousAllocator,
    pub(crate) strategy: Strategy,
    pub(crate) grid: bool,
}

impl ContiguousView<'_> {
    fn cells(&self) -> Grid {
        let unit = self.memory.config().unit;
        let cells = self
            .memory
            .blocks()
            .iter()
            .flat_map(|block| {
                let cell = move |index| match block.owner() {
                    None => Cell::Free,
                    Some(id) => Cell::Owned {
                        id,
                        labeled: index == 0,
                    },
                };
                (0..block.size() / unit).map(cell)
            })
            .collect();
        Grid(cells)
    }
}

impl fmt::Display for ContiguousView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.memory.config();
        let stats = self.memory.fragmentation_stats();
        let usage = self.memory.usage();

        writeln!(
            f,
            "Memory: {} KB in {} KB units ({} cells)",
            config.total_size,
            config.unit,
            config.cell_count()
        )?;
        if self.grid {
            write!(f, "{}", self.cells())?;
        }
        writeln!(
            f,
            "Strategy: {} | Total free: {} KB | Largest block: {} KB | Free blocks: {}",
            WithFg::new(Color::LightBlue, self.strategy),
            stats.total_free,
            stats.largest_free,
            stats.free_block_count
        )?;
        if stats.is_fragmented() {
            writeln!(
                f,
                "{}",
                WithFg::new(
                    Color::Yellow,
                    format_args!(
                        "External fragmentation: {} KB spread over {} free blocks",
                        stats.external_fragmentation, stats.free_block_count
                    )
                )
            )?;
        } else {
            writeln!(f, "{}", WithFg::new(Color::Green, "No fragmentation"))?;
        }
        writeln!(
            f,
            "Processes: {} | Used: {} KB | Free: {} KB | Utilization: {}",
            usage.process_count,
            usage.used,
            usage.free,
            Percent(usage.utilization())
        )?;
        for process in self.memory.processes() {
            writeln!(
                f,
                "  {}  {:>5} KB  start {:>5}  {:>3} cells",
                WithFg::new(process_color(process.id), Label(process.id)),
                process.size,
                process.start,
                process.cells
            )?;
        }
        Ok(())
    }
}

/// Frame grid, frame statistics and page tables of a paged memory.
pub(crate) struct PagingView<'a> {
    pub(crate) memory: &'a PagedAllocator,
    pub(crate) grid: bool,
}

impl PagingView<'_> {
    fn cells(&self) -> Grid {
        let cells = self
            .memory
            .frames()
            .iter()
            .map(|frame| match frame.owner() {
                None => Cell::Free,
                Some(id) => Cell::Owned { id, labeled: true },
            })
            .collect();
        Grid(cells)
    }
}

impl fmt::Display for PagingView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.memory.config();
        let stats = self.memory.frame_stats();

        writeln!(
            f,
            "Memory: {} KB in {} KB pages ({} frames)",
            config.total_size, config.page_size, stats.frame_count
        )?;
        if self.grid {
            write!(f, "{}", self.cells())?;
        }
        writeln!(
            f,
            "Frames used: {} / {} | Free memory: {} KB | Utilization: {}",
            stats.frames_used,
            stats.frame_count,
            stats.free_memory,
            Percent(self.memory.utilization())
        )?;
        write!(f, "Free frames:")?;
        if self.memory.free_ranges().is_empty() {
            write!(f, " none")?;
        }
        for range in self.memory.free_ranges() {
            write!(f, " {}..{}", range.start, range.end)?;
        }
        writeln!(f)?;
        for process in self.memory.processes() {
            writeln!(
                f,
                "  {}  {:>4} KB  {:>3} pages  {:?}",
                WithFg::new(process_color(process.id()), Label(process.id())),
                process.size(),
                process.page_count(),
                process.page_table()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use contiguous::ContiguousConfig;
    use paging::PagingConfig;

    use super::*;

    fn pid(value: u64) -> ProcessId {
        ProcessId::from_raw(value).unwrap()
    }

    #[test]
    fn test_palette_wraps_every_eight() {
        assert_eq!(process_color(pid(1)), Color::LightBlue);
        assert_eq!(process_color(pid(9)), Color::LightBlue);
        assert_eq!(process_color(pid(8)), Color::LightGreen);
    }

    #[test]
    fn test_label_padding() {
        assert_eq!(format!("{:^4}", Label(pid(3))), " P3 ");
        assert_eq!(format!("{:<5}|", Label(pid(12))), "P12  |");
    }

    #[test]
    fn test_contiguous_grid_labels_first_cell() {
        let mut memory = ContiguousAllocator::new(ContiguousConfig::new(128, 16));
        memory.allocate(48, Strategy::FirstFit).unwrap();
        let view = ContiguousView {
            memory: &memory,
            strategy: Strategy::FirstFit,
            grid: true,
        };
        let cells = view.cells().0;
        assert_eq!(cells.len(), 8);
        assert_eq!(
            cells[..4],
            [
                Cell::Owned {
                    id: pid(1),
                    labeled: true,
                },
                Cell::Owned {
                    id: pid(1),
                    labeled: false,
                },
                Cell::Owned {
                    id: pid(1),
                    labeled: false,
                },
                Cell::Free,
            ]
        );

        let text = view.to_string();
        assert_eq!(text.matches(" P1 ").count(), 1);
        assert!(text.contains("No fragmentation"));
        assert!(text.contains("Utilization: 37.5%"));
    }

    #[test]
    fn test_contiguous_fragmentation_warning() {
        let mut memory = ContiguousAllocator::new(ContiguousConfig::new(128, 16));
        let a = memory.allocate(32, Strategy::FirstFit).unwrap().id;
        memory.allocate(32, Strategy::FirstFit).unwrap();
        memory.deallocate(a).unwrap();
        let text = ContiguousView {
            memory: &memory,
            strategy: Strategy::BestFit,
            grid: false,
        }
        .to_string();
        assert!(text.contains("External fragmentation: 32 KB spread over 2 free blocks"));
        assert!(text.contains("best-fit"));
        assert!(!text.contains(" .. "));
    }

    #[test]
    fn test_paging_view() {
        let mut memory = PagedAllocator::new(PagingConfig::new(32, 4)).unwrap();
        memory.allocate(8).unwrap();
        let view = PagingView {
            memory: &memory,
            grid: true,
        };
        assert_eq!(view.cells().0.iter().filter(|cell| **cell == Cell::Free).count(), 6);

        let text = view.to_string();
        assert_eq!(text.matches(" P1 ").count(), 2);
        assert!(text.contains("Frames used: 2 / 8"));
        assert!(text.contains("Free frames: 2..8"));
        assert!(text.contains("{0..=1: 0..=1}"));
    }
}
