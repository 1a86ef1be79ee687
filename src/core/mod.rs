//! Cell-level building blocks.
//!
//! - **attr**: styling flags and their stable names
//! - **cell**: the packed cell composite and the cell grid
//! - **color**: color names, color pairs, render-time color resolution
//!
//! # Cell layout
//!
//! ```text
//! Chtype (u32)
//! ├── bits  0..8   character
//! ├── bits  8..16  color pair
//! └── bits 16..25  Attr flags
//! ```

pub mod attr;
pub mod cell;
pub mod color;

pub use attr::Attr;
pub use cell::{Chtype, Grid};
pub use color::{ColorTable, TermColor, COLOR_NAMES};
