//! Minimal ANSI escape-sequence styling.
//!
//! Only what the terminal front end needs: bold foreground text for log tags
//! and error reports, and filled cells for the memory grid.

#![cfg_attr(not(test), no_std)]

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    DarkGray,
    Red,
    LightRed,
    Green,
    LightGreen,
    Yellow,
    LightYellow,
    Blue,
    LightBlue,
    Purple,
    LightPurple,
    Magenta,
    LightMagenta,
    Cyan,
    LightCyan,
    White,
    LightGray,
    Default,
}

impl Color {
    fn code(self) -> (u8, bool) {
        match self {
            Self::Black => (0, false),
            Self::DarkGray => (0, true),
            Self::Red => (1, false),
            Self::LightRed => (1, true),
            Self::Green => (2, false),
            Self::LightGreen => (2, true),
            Self::Yellow => (3, false),
            Self::LightYellow => (3, true),
            Self::Blue => (4, false),
            Self::LightBlue => (4, true),
            Self::Purple | Self::Magenta => (5, false),
            Self::LightPurple | Self::LightMagenta => (5, true),
            Self::Cyan => (6, false),
            Self::LightCyan => (6, true),
            Self::White => (7, false),
            Self::LightGray => (7, true),
            Self::Default => (9, false),
        }
    }

    fn fg(self) -> u8 {
        let (code, light) = self.code();
        if light { code + 90 } else { code + 30 }
    }

    fn bg(self) -> u8 {
        let (code, light) = self.code();
        if light { code + 100 } else { code + 40 }
    }
}

/// Bold text in the given foreground color.
pub struct WithFg<T>(Color, T);

impl<T> fmt::Display for WithFg<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fg = self.0.fg();
        let value = &self.1;
        write!(f, "\x1B[{fg};1m{value}\x1B[0m")
    }
}

impl<T> WithFg<T> {
    pub fn new(color: Color, value: T) -> Self {
        Self(color, value)
    }
}

/// Text drawn on a colored background.
///
/// The foreground is picked to stay readable on the background.
pub struct WithBg<T>(Color, T);

impl<T> fmt::Display for WithBg<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bg = self.0.bg();
        let fg = match self.0 {
            Color::Black | Color::DarkGray | Color::Default => Color::LightGray.fg(),
            _ => Color::Black.fg(),
        };
        let value = &self.1;
        write!(f, "\x1B[{fg};{bg}m{value}\x1B[0m")
    }
}

impl<T> WithBg<T> {
    pub fn new(color: Color, value: T) -> Self {
        Self(color, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fg_codes() {
        assert_eq!(WithFg::new(Color::Red, "x").to_string(), "\x1B[31;1mx\x1B[0m");
        assert_eq!(
            WithFg::new(Color::DarkGray, "x").to_string(),
            "\x1B[90;1mx\x1B[0m"
        );
    }

    #[test]
    fn test_bg_codes() {
        assert_eq!(
            WithBg::new(Color::LightBlue, "P1").to_string(),
            "\x1B[30;104mP1\x1B[0m"
        );
        assert_eq!(
            WithBg::new(Color::DarkGray, "..").to_string(),
            "\x1B[97;100m..\x1B[0m"
        );
    }
}
