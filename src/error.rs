//! Error type shared by every fallible operation in the crate.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CursesError {
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Unknown color: {0}")]
    UnknownColor(String),

    #[error("Invalid color pair: {0}")]
    InvalidPairId(i32),

    #[error("Color component out of range (0..=1000): {0}")]
    ColorValueOutOfRange(i32),

    #[error("Unknown mouse event: {0}")]
    UnknownMouseEvent(String),

    #[error("Terminal lacks capability: {0}")]
    Capability(&'static str),

    #[error("Window has been deleted")]
    StaleWindow,

    #[error("Failed to initialize terminal: {0}")]
    Initialization(String),

    #[error("Timed out waiting for input")]
    TimedOut,

    #[error("Input buffer has no room")]
    InputOverflowRejected,

    #[error("Value does not fit in a cell: {0:#x}")]
    CellOverflow(u32),

    #[error("Position ({y}, {x}) is outside the window")]
    OutOfBounds { y: i32, x: i32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No mouse event queued")]
    NoMouseEvent,

    #[error("Terminal I/O failed: {0}")]
    Terminal(#[from] io::Error),
}

impl CursesError {
    /// Whether the handle that produced this error is unusable from now on
    pub fn is_fatal(&self) -> bool {
        matches!(self, CursesError::StaleWindow | CursesError::Initialization(_))
    }
}

pub type Result<T> = std::result::Result<T, CursesError>;
