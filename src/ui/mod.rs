//! Terminal-control collaborator.
//!
//! The window layer never writes escape sequences itself; everything it
//! needs from the physical terminal goes through the [`Terminal`] trait:
//!
//! - **renderer**: `CrosstermTerminal`, the real terminal through crossterm
//! - **keymapper**: crossterm key/mouse events back to raw input bytes
//! - **headless**: `HeadlessTerminal`, an in-memory terminal for tests and demos
//!
//! # Rendering Modes
//!
//! - **Terminal mode**: alternate screen, raw input (uses `CrosstermTerminal`)
//! - **Headless mode**: cells land in a shared in-memory image (uses `HeadlessTerminal`)

use std::io;
use std::time::Duration;

use crate::core::{Attr, TermColor};

pub mod headless;
pub mod keymapper;
pub mod renderer;

pub use headless::HeadlessTerminal;
pub use keymapper::KeyMapper;
pub use renderer::CrosstermTerminal;

/// Input processing modes the layer can toggle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermMode {
    /// No line buffering, no signal keys
    Raw,
    /// No line buffering, signal keys still handled by the driver
    Cbreak,
}

/// Cursor visibility levels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorVisibility {
    Hidden,
    #[default]
    Normal,
    VeryVisible,
}

impl TryFrom<u8> for CursorVisibility {
    type Error = crate::error::CursesError;

    fn try_from(level: u8) -> crate::error::Result<Self> {
        match level {
            0 => Ok(CursorVisibility::Hidden),
            1 => Ok(CursorVisibility::Normal),
            2 => Ok(CursorVisibility::VeryVisible),
            _ => Err(crate::error::CursesError::InvalidArgument(format!(
                "cursor visibility {}",
                level
            ))),
        }
    }
}

/// What the terminal can do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub colors: bool,
    pub can_change_color: bool,
    pub max_pairs: u16,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            colors: true,
            can_change_color: true,
            max_pairs: 256,
        }
    }
}

/// A cell with its color pair already resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paint {
    pub ch: char,
    pub attrs: Attr,
    pub fg: TermColor,
    pub bg: TermColor,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            ch: ' ',
            attrs: Attr::NORMAL,
            fg: TermColor::Default,
            bg: TermColor::Default,
        }
    }
}

/// Primitive terminal operations consumed by the session
pub trait Terminal {
    /// Take over the terminal
    fn start(&mut self) -> io::Result<()>;
    /// Give the terminal back in its original state
    fn stop(&mut self) -> io::Result<()>;
    /// Screen size as (rows, columns)
    fn size(&self) -> io::Result<(u16, u16)>;
    fn capabilities(&self) -> Capabilities;
    fn set_mode(&mut self, mode: TermMode, on: bool) -> io::Result<()>;
    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()>;
    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()>;
    /// Paint a run of cells on row `y` starting at column `x`
    fn write_cells(&mut self, y: u16, x: u16, cells: &[Paint]) -> io::Result<()>;
    fn set_mouse_reporting(&mut self, on: bool) -> io::Result<()>;
    /// Wait for input bytes. `None` timeout blocks; `Ok(None)` means nothing arrived.
    fn poll_input(&mut self, timeout: Option<Duration>) -> io::Result<Option<Vec<u8>>>;
    fn beep(&mut self) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}
