//! Cell composites and cell grids
//!
//! A [`Chtype`] packs a character code, its styling flags and its color pair
//! into one value. A [`Grid`] is the rectangular backing store a window (and
//! every sub-window viewing it) draws into.

use std::fmt;

use super::attr::Attr;
use crate::error::{CursesError, Result};

/// Largest character code a cell can carry
pub const MAX_CELL_CHAR: u32 = 0xff;
/// Largest color pair a cell can carry
pub const MAX_CELL_PAIR: u32 = 0xff;

const PAIR_SHIFT: u32 = 8;

/// Character + attributes + color pair
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Chtype(u32);

impl Chtype {
    pub const BLANK: Chtype = Chtype(b' ' as u32);

    /// Compose a cell. Fails instead of truncating when a field overflows.
    pub fn new(code: u32, attrs: Attr, pair: u32) -> Result<Self> {
        if code > MAX_CELL_CHAR {
            return Err(CursesError::CellOverflow(code));
        }
        if pair > MAX_CELL_PAIR {
            return Err(CursesError::CellOverflow(pair));
        }
        Ok(Chtype(code | attrs.styling().bits() | (pair << PAIR_SHIFT)))
    }

    /// Cell for a plain character
    pub fn from_char(ch: char) -> Result<Self> {
        Self::new(ch as u32, Attr::NORMAL, 0)
    }

    /// Reinterpret a raw composite
    pub const fn from_bits(bits: u32) -> Self {
        Chtype(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Character code (A_CHARTEXT field)
    pub fn code(self) -> u8 {
        (self.0 & Attr::CHARTEXT.bits()) as u8
    }

    /// Character as a Latin-1 `char`
    pub fn ch(self) -> char {
        char::from(self.code())
    }

    /// Styling flags without character and color fields
    pub fn attrs(self) -> Attr {
        Attr::from_bits_retain(self.0).styling()
    }

    /// Color pair (A_COLOR field)
    pub fn pair(self) -> u8 {
        ((self.0 & Attr::COLOR.bits()) >> PAIR_SHIFT) as u8
    }

    /// OR every bit of `mask` into the composite
    pub fn with(self, mask: Attr) -> Self {
        Chtype(self.0 | mask.bits())
    }

    /// Same composite with a different character
    pub fn with_code(self, code: u8) -> Self {
        Chtype((self.0 & !Attr::CHARTEXT.bits()) | code as u32)
    }

    /// Same composite with a different color pair
    pub fn with_pair(self, pair: u8) -> Self {
        Chtype((self.0 & !Attr::COLOR.bits()) | ((pair as u32) << PAIR_SHIFT))
    }

    /// Replace styling and color, keeping the character
    pub fn with_rendition(self, attrs: Attr, pair: u8) -> Self {
        Chtype(self.code() as u32 | attrs.styling().bits()).with_pair(pair)
    }

    pub fn is_blank(self) -> bool {
        self.code() == b' '
    }
}

impl TryFrom<char> for Chtype {
    type Error = CursesError;

    fn try_from(ch: char) -> Result<Self> {
        Chtype::from_char(ch)
    }
}

impl From<u8> for Chtype {
    fn from(code: u8) -> Self {
        Chtype(code as u32)
    }
}

impl fmt::Debug for Chtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chtype({:?}, {}, pair {})", self.ch(), self.attrs(), self.pair())
    }
}

/// Line-drawing characters, selected through the alternate character set
pub mod acs {
    use super::Chtype;
    use crate::core::attr::Attr;

    const fn alt(code: u8) -> Chtype {
        Chtype::from_bits(code as u32 | Attr::ALTCHARSET.bits())
    }

    pub const VLINE: Chtype = alt(b'x');
    pub const HLINE: Chtype = alt(b'q');
    pub const ULCORNER: Chtype = alt(b'l');
    pub const URCORNER: Chtype = alt(b'k');
    pub const LLCORNER: Chtype = alt(b'm');
    pub const LRCORNER: Chtype = alt(b'j');
    pub const PLUS: Chtype = alt(b'n');
    pub const BLOCK: Chtype = alt(b'0');

    /// Glyph a terminal shows for an alternate-charset code
    pub fn glyph(code: u8) -> char {
        match code {
            b'x' => '│',
            b'q' => '─',
            b'l' => '┌',
            b'k' => '┐',
            b'm' => '└',
            b'j' => '┘',
            b'n' => '┼',
            b't' => '├',
            b'u' => '┤',
            b'v' => '┴',
            b'w' => '┬',
            b'0' => '█',
            b'a' => '▒',
            b'~' => '·',
            other => char::from(other),
        }
    }
}

/// Rectangular cell storage
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Chtype>>,
    width: usize,
}

impl Grid {
    pub fn new(height: usize, width: usize, fill: Chtype) -> Self {
        Self {
            rows: vec![vec![fill; width]; height],
            width,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, y: usize, x: usize) -> Option<Chtype> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Write a cell; writes outside the grid are dropped
    pub fn set(&mut self, y: usize, x: usize, cell: Chtype) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    /// Resize, keeping the overlapping region and filling new cells
    pub fn resize(&mut self, height: usize, width: usize, fill: Chtype) {
        self.rows.truncate(height);
        for row in &mut self.rows {
            row.resize(width, fill);
        }
        while self.rows.len() < height {
            self.rows.push(vec![fill; width]);
        }
        self.width = width;
    }

    /// Fill `len` cells of row `y` starting at column `x`
    pub fn fill(&mut self, y: usize, x: usize, len: usize, cell: Chtype) {
        if let Some(row) = self.rows.get_mut(y) {
            let end = (x + len).min(row.len());
            if x < end {
                row[x..end].fill(cell);
            }
        }
    }

    /// Rows as text, for diagnostics and tests
    pub fn lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.ch()).collect())
            .collect()
    }
}
