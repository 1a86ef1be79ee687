//! cellwin - character-cell windows over a terminal
//!
//! cellwin manages rectangular windows of styled cells on one physical
//! terminal. Drawing is buffered per window; `Session::update` composes the
//! refreshed windows and writes only the cells that changed.
//!
//! # Features
//!
//! - **Windows**: top-level, derived (own cells) and sub-windows (shared cells)
//! - **Attributes**: named styling flags and color pairs packed into each cell
//! - **Input**: key decoding with keypad mode, mouse events with click synthesis
//! - **Backends**: crossterm for real terminals, an in-memory terminal for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use cellwin::{wprint, Chtype, CrosstermTerminal, Session};
//!
//! # fn main() -> cellwin::Result<()> {
//! let (session, root) = Session::init(CrosstermTerminal::new())?;
//! let line = Chtype::from_bits(0);
//! root.draw_box(line, line)?;
//! wprint!(root, [1, 2], "hello {}", "world")?;
//! root.refresh()?;
//! session.update()?;
//! root.get_char()?;
//! session.teardown()
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod ui;
pub mod wm;

#[cfg(test)]
mod testing;

pub use crate::config::Config;
pub use crate::core::cell::acs;
pub use crate::core::{Attr, Chtype, ColorTable, TermColor, COLOR_NAMES};
pub use crate::error::{CursesError, Result};
pub use crate::input::keys::{self, key_name};
pub use crate::input::{MouseEvent, MouseMask};
pub use crate::ui::{Capabilities, CrosstermTerminal, HeadlessTerminal, Terminal};
pub use crate::wm::{Background, Origin, Session, SyncMode, Window, WindowId, WindowKind};
