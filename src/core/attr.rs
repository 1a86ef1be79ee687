//! Character attributes
//!
//! Attributes share one 32-bit mask with the character code and the color
//! pair, laid out like a narrow curses `chtype`:
//!
//! ```text
//! bits  0..8   character (A_CHARTEXT)
//! bits  8..16  color pair (A_COLOR)
//! bits 16..25  styling flags
//! ```

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::{CursesError, Result};

bitflags! {
    /// Styling flags plus the character/color fields of a cell composite
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attr: u32 {
        const NORMAL     = 0;
        const CHARTEXT   = 0x0000_00ff;
        const COLOR      = 0x0000_ff00;
        const STANDOUT   = 1 << 16;
        const UNDERLINE  = 1 << 17;
        const REVERSE    = 1 << 18;
        const BLINK      = 1 << 19;
        const DIM        = 1 << 20;
        const BOLD       = 1 << 21;
        const ALTCHARSET = 1 << 22;
        const INVIS      = 1 << 23;
        const PROTECT    = 1 << 24;
    }
}

/// Stable attribute vocabulary
const ATTR_NAMES: &[(&str, Attr)] = &[
    ("normal", Attr::NORMAL),
    ("standout", Attr::STANDOUT),
    ("underline", Attr::UNDERLINE),
    ("reverse", Attr::REVERSE),
    ("blink", Attr::BLINK),
    ("dim", Attr::DIM),
    ("bold", Attr::BOLD),
    ("protect", Attr::PROTECT),
    ("invis", Attr::INVIS),
    ("altcharset", Attr::ALTCHARSET),
    ("chartext", Attr::CHARTEXT),
];

impl Attr {
    /// Look up a single attribute by name
    pub fn by_name(name: &str) -> Result<Self> {
        ATTR_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, attr)| *attr)
            .ok_or_else(|| CursesError::UnknownAttribute(name.to_string()))
    }

    /// Union of the named attributes. Any unknown name fails the whole call.
    pub fn compose<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .try_fold(Attr::NORMAL, |acc, name| -> Result<Attr> {
                Ok(acc | Attr::by_name(name.as_ref())?)
            })
    }

    /// Styling flags only, without character or color bits
    pub fn styling(self) -> Self {
        self & !(Attr::CHARTEXT | Attr::COLOR)
    }

    /// Styling and color bits of a mask applied to a window. Character bits
    /// or bits outside the cell layout are an error.
    pub fn rendition(self) -> Result<Self> {
        if Attr::from_bits(self.bits()).is_none() {
            return Err(CursesError::CellOverflow(self.bits()));
        }
        if self.intersects(Attr::CHARTEXT) {
            return Err(CursesError::InvalidArgument(format!(
                "attribute mask {:#x} carries character bits",
                self.bits()
            )));
        }
        Ok(self)
    }

    /// Names of the styling flags set in this mask
    pub fn names(self) -> Vec<&'static str> {
        let style = self.styling();
        ATTR_NAMES
            .iter()
            .filter(|(_, attr)| !attr.is_empty() && style.contains(*attr))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl FromStr for Attr {
    type Err = CursesError;

    fn from_str(s: &str) -> Result<Self> {
        Attr::by_name(s)
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("normal")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}
