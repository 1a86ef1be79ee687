//! Color names, color pairs and their render-time resolution.

use serde::{Deserialize, Serialize};

use super::attr::Attr;
use super::cell::{Chtype, MAX_CELL_PAIR};
use crate::error::{CursesError, Result};

/// The eight standard color names, in terminal index order
pub const COLOR_NAMES: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

/// Upper bound of an RGB component passed to `define_color`
pub const MAX_COLOR_VALUE: i32 = 1000;

/// A color as the terminal collaborator receives it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermColor {
    #[default]
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl TermColor {
    /// Convert to crossterm color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        match self {
            TermColor::Default => crossterm::style::Color::Reset,
            TermColor::Indexed(n) => crossterm::style::Color::AnsiValue(n),
            TermColor::Rgb(r, g, b) => crossterm::style::Color::Rgb { r, g, b },
        }
    }
}

/// Registry of color redefinitions and color pairs
#[derive(Clone, Debug)]
pub struct ColorTable {
    has_colors: bool,
    can_change: bool,
    started: bool,
    max_pairs: u16,
    pairs: Vec<Option<(u8, u8)>>,
    palette: [Option<(i16, i16, i16)>; 8],
}

impl ColorTable {
    /// `max_pairs` is what the terminal reports; it is capped at what a cell can encode
    pub fn new(has_colors: bool, can_change: bool, max_pairs: u16) -> Self {
        let max_pairs = max_pairs.min(MAX_CELL_PAIR as u16 + 1);
        Self {
            has_colors,
            can_change,
            started: false,
            max_pairs,
            pairs: vec![None; max_pairs as usize],
            palette: [None; 8],
        }
    }

    /// Terminal index of a color name
    pub fn color_index(name: &str) -> Result<u8> {
        COLOR_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| i as u8)
            .ok_or_else(|| CursesError::UnknownColor(name.to_string()))
    }

    pub fn has_colors(&self) -> bool {
        self.has_colors
    }

    pub fn can_change_color(&self) -> bool {
        self.has_colors && self.can_change
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of pair slots, including the reserved pair 0
    pub fn max_pairs(&self) -> u16 {
        self.max_pairs
    }

    /// Enable color handling
    pub fn start(&mut self) -> Result<()> {
        if !self.has_colors {
            return Err(CursesError::Capability("terminal does not support colors"));
        }
        self.started = true;
        Ok(())
    }

    /// Redefine a named color; components range over `0..=1000`
    pub fn define_color(&mut self, name: &str, r: i32, g: i32, b: i32) -> Result<()> {
        let index = Self::color_index(name)?;
        for value in [r, g, b] {
            if !(0..=MAX_COLOR_VALUE).contains(&value) {
                return Err(CursesError::ColorValueOutOfRange(value));
            }
        }
        if !self.can_change_color() {
            return Err(CursesError::Capability("terminal cannot redefine colors"));
        }
        if !self.started {
            return Err(CursesError::Capability("color has not been started"));
        }
        self.palette[index as usize] = Some((r as i16, g as i16, b as i16));
        Ok(())
    }

    /// Current RGB definition of a named color
    pub fn color_content(&self, name: &str) -> Result<(i16, i16, i16)> {
        let index = Self::color_index(name)? as usize;
        Ok(self.palette[index].unwrap_or_else(|| default_rgb(index)))
    }

    /// Bind pair `id` to (fg, bg). Pair 0 is reserved.
    pub fn define_pair(&mut self, id: i32, fg: &str, bg: &str) -> Result<()> {
        let slot = self.check_pair(id)?;
        let fg = Self::color_index(fg)?;
        let bg = Self::color_index(bg)?;
        if !self.started {
            return Err(CursesError::Capability("color has not been started"));
        }
        self.pairs[slot] = Some((fg, bg));
        Ok(())
    }

    /// Color indices bound to a pair. Pair 0 reads as white on black.
    pub fn pair_content(&self, id: i32) -> Result<(u8, u8)> {
        if id == 0 {
            return Ok((7, 0));
        }
        let slot = self.check_pair(id)?;
        Ok(self.pairs[slot].unwrap_or((0, 0)))
    }

    /// Cell mask selecting `pair`
    pub fn encode(&self, pair: i32) -> Result<Attr> {
        if pair != 0 {
            self.check_pair(pair)?;
        }
        Ok(Attr::from_bits_retain(Chtype::from_bits(0).with_pair(pair as u8).bits()))
    }

    /// Pair selected by a cell composite
    pub fn decode(mask: Attr) -> u8 {
        Chtype::from_bits(mask.bits()).pair()
    }

    /// Concrete colors of a pair, resolved at render time
    pub fn resolve(&self, pair: u8) -> (TermColor, TermColor) {
        if pair == 0 || !self.started {
            return (TermColor::Default, TermColor::Default);
        }
        match self.pairs.get(pair as usize).copied().flatten() {
            Some((fg, bg)) => (self.resolve_color(fg), self.resolve_color(bg)),
            None => (TermColor::Default, TermColor::Default),
        }
    }

    fn resolve_color(&self, index: u8) -> TermColor {
        match self.palette[index as usize] {
            Some((r, g, b)) => TermColor::Rgb(scale(r), scale(g), scale(b)),
            None => TermColor::Indexed(index),
        }
    }

    fn check_pair(&self, id: i32) -> Result<usize> {
        if id <= 0 || id >= self.max_pairs as i32 {
            return Err(CursesError::InvalidPairId(id));
        }
        Ok(id as usize)
    }
}

fn default_rgb(index: usize) -> (i16, i16, i16) {
    let on = |bit: usize| if index & bit != 0 { 1000 } else { 0 };
    (on(1), on(2), on(4))
}

fn scale(value: i16) -> u8 {
    (value as i32 * 255 / MAX_COLOR_VALUE) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(max_pairs: u16) -> ColorTable {
        let mut table = ColorTable::new(true, true, max_pairs);
        table.start().unwrap();
        table
    }

    #[test]
    fn test_pair_round_trip_for_every_id() {
        let mut table = started(64);
        for id in 1..64 {
            let fg = COLOR_NAMES[id as usize % 8];
            let bg = COLOR_NAMES[(id as usize + 3) % 8];
            table.define_pair(id, fg, bg).unwrap();

            let mask = table.encode(id).unwrap();
            let decoded = ColorTable::decode(mask);
            assert_eq!(decoded as i32, id);
            assert_eq!(
                table.pair_content(decoded as i32).unwrap(),
                (id as u8 % 8, (id as u8 + 3) % 8)
            );
        }
    }

    #[test]
    fn test_invalid_pair_ids() {
        let mut table = started(64);
        assert!(matches!(
            table.define_pair(0, "red", "black"),
            Err(CursesError::InvalidPairId(0))
        ));
        assert!(matches!(
            table.define_pair(64, "red", "black"),
            Err(CursesError::InvalidPairId(64))
        ));
        assert!(matches!(table.encode(64), Err(CursesError::InvalidPairId(64))));
        assert!(table.define_pair(63, "red", "black").is_ok());
    }

    #[test]
    fn test_unknown_colors() {
        let mut table = started(16);
        assert!(matches!(
            table.define_pair(1, "mauve", "black"),
            Err(CursesError::UnknownColor(name)) if name == "mauve"
        ));
        assert!(matches!(
            table.define_pair(1, "red", "beige"),
            Err(CursesError::UnknownColor(_))
        ));
        assert!(matches!(
            table.define_color("teal", 0, 0, 0),
            Err(CursesError::UnknownColor(_))
        ));
    }

    #[test]
    fn test_max_pairs_capped_to_cell_width() {
        let table = ColorTable::new(true, true, 32767);
        assert_eq!(table.max_pairs(), 256);
    }

    #[test]
    fn test_capability_errors() {
        let mut mono = ColorTable::new(false, false, 0);
        assert!(matches!(mono.start(), Err(CursesError::Capability(_))));

        let mut fixed = ColorTable::new(true, false, 16);
        fixed.start().unwrap();
        assert!(matches!(
            fixed.define_color("red", 500, 0, 0),
            Err(CursesError::Capability(_))
        ));

        let mut unstarted = ColorTable::new(true, true, 16);
        assert!(matches!(
            unstarted.define_pair(1, "red", "black"),
            Err(CursesError::Capability(_))
        ));
    }

    #[test]
    fn test_define_color_range_and_resolution() {
        let mut table = started(16);
        assert!(matches!(
            table.define_color("red", 1001, 0, 0),
            Err(CursesError::ColorValueOutOfRange(1001))
        ));
        assert!(matches!(
            table.define_color("red", 0, -1, 0),
            Err(CursesError::ColorValueOutOfRange(-1))
        ));

        table.define_pair(1, "red", "blue").unwrap();
        assert_eq!(table.resolve(1), (TermColor::Indexed(1), TermColor::Indexed(4)));

        assert_eq!(table.color_content("red").unwrap(), (1000, 0, 0));
        table.define_color("red", 1000, 500, 0).unwrap();
        assert_eq!(table.color_content("red").unwrap(), (1000, 500, 0));
        assert_eq!(table.resolve(1), (TermColor::Rgb(255, 127, 0), TermColor::Indexed(4)));
    }

    #[test]
    fn test_redefining_pair_changes_resolution() {
        let mut table = started(16);
        table.define_pair(2, "green", "black").unwrap();
        assert_eq!(table.resolve(2).0, TermColor::Indexed(2));
        table.define_pair(2, "yellow", "black").unwrap();
        assert_eq!(table.resolve(2).0, TermColor::Indexed(3));
        assert_eq!(table.resolve(0), (TermColor::Default, TermColor::Default));
        assert_eq!(table.resolve(9), (TermColor::Default, TermColor::Default));
    }
}
