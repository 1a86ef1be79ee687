//! In-memory terminal
//!
//! Records what the session paints so that tests and the `--headless` demo
//! can inspect the screen. Clones share the same state, so a caller can keep
//! a view while the session owns the terminal.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use super::{Capabilities, CursorVisibility, Paint, TermMode, Terminal};
use crate::core::cell::acs;
use crate::core::Attr;

#[derive(Debug)]
struct HeadlessState {
    rows: u16,
    cols: u16,
    caps: Capabilities,
    fail_start: bool,
    started: bool,
    screen: Vec<Vec<Paint>>,
    cursor: (u16, u16),
    visibility: CursorVisibility,
    raw: bool,
    cbreak: bool,
    mouse: bool,
    input: VecDeque<u8>,
    cells_written: usize,
    beeps: usize,
    flushes: usize,
}

/// Terminal that paints into memory
#[derive(Clone, Debug)]
pub struct HeadlessTerminal {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessTerminal {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self::with_capabilities(rows, cols, Capabilities::default())
    }

    pub fn with_capabilities(rows: u16, cols: u16, caps: Capabilities) -> Self {
        Self {
            state: Rc::new(RefCell::new(HeadlessState {
                rows,
                cols,
                caps,
                fail_start: false,
                started: false,
                screen: vec![vec![Paint::default(); cols as usize]; rows as usize],
                cursor: (0, 0),
                visibility: CursorVisibility::Normal,
                raw: false,
                cbreak: false,
                mouse: false,
                input: VecDeque::new(),
                cells_written: 0,
                beeps: 0,
                flushes: 0,
            })),
        }
    }

    /// A terminal whose `start` fails, as when there is no tty
    pub fn unavailable() -> Self {
        let term = Self::new(24, 80);
        term.state.borrow_mut().fail_start = true;
        term
    }

    /// Change the size, as a window-manager resize would. Only the screen
    /// image changes; the size report has to be queued separately.
    pub fn set_size(&self, rows: u16, cols: u16) {
        let mut state = self.state.borrow_mut();
        state.rows = rows;
        state.cols = cols;
        state.screen.resize(rows as usize, Vec::new());
        for row in &mut state.screen {
            row.resize(cols as usize, Paint::default());
        }
    }

    /// Queue bytes as if typed
    pub fn push_input(&self, bytes: &[u8]) {
        self.state.borrow_mut().input.extend(bytes);
    }

    /// Screen rows as text, line-drawing characters shown as glyphs
    pub fn lines(&self) -> Vec<String> {
        let state = self.state.borrow();
        state
            .screen
            .iter()
            .map(|row| {
                row.iter()
                    .map(|p| {
                        if p.attrs.contains(Attr::ALTCHARSET) {
                            acs::glyph(p.ch as u32 as u8)
                        } else {
                            p.ch
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Whole screen, one line per row
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn paint_at(&self, y: u16, x: u16) -> Paint {
        let state = self.state.borrow();
        state.screen[y as usize][x as usize]
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.state.borrow().cursor
    }

    pub fn cursor_visibility(&self) -> CursorVisibility {
        self.state.borrow().visibility
    }

    /// Total cells written since creation
    pub fn cells_written(&self) -> usize {
        self.state.borrow().cells_written
    }

    pub fn beeps(&self) -> usize {
        self.state.borrow().beeps
    }

    pub fn flushes(&self) -> usize {
        self.state.borrow().flushes
    }

    pub fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    pub fn is_raw(&self) -> bool {
        self.state.borrow().raw
    }

    pub fn is_cbreak(&self) -> bool {
        self.state.borrow().cbreak
    }

    pub fn mouse_reporting(&self) -> bool {
        self.state.borrow().mouse
    }

    /// Bytes queued but not yet consumed
    pub fn pending_input(&self) -> usize {
        self.state.borrow().input.len()
    }
}

impl Terminal for HeadlessTerminal {
    fn start(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_start {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no terminal attached"));
        }
        state.started = true;
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.started = false;
        state.raw = false;
        state.cbreak = false;
        state.mouse = false;
        Ok(())
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let state = self.state.borrow();
        Ok((state.rows, state.cols))
    }

    fn capabilities(&self) -> Capabilities {
        self.state.borrow().caps
    }

    fn set_mode(&mut self, mode: TermMode, on: bool) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        match mode {
            TermMode::Raw => state.raw = on,
            TermMode::Cbreak => state.cbreak = on,
        }
        Ok(())
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        self.state.borrow_mut().visibility = visibility;
        Ok(())
    }

    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()> {
        self.state.borrow_mut().cursor = (y, x);
        Ok(())
    }

    fn write_cells(&mut self, y: u16, x: u16, cells: &[Paint]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.cells_written += cells.len();
        if let Some(row) = state.screen.get_mut(y as usize) {
            for (offset, paint) in cells.iter().enumerate() {
                if let Some(slot) = row.get_mut(x as usize + offset) {
                    *slot = *paint;
                }
            }
        }
        Ok(())
    }

    fn set_mouse_reporting(&mut self, on: bool) -> io::Result<()> {
        self.state.borrow_mut().mouse = on;
        Ok(())
    }

    fn poll_input(&mut self, _timeout: Option<Duration>) -> io::Result<Option<Vec<u8>>> {
        let mut state = self.state.borrow_mut();
        if state.input.is_empty() {
            return Ok(None);
        }
        Ok(Some(state.input.drain(..).collect()))
    }

    fn beep(&mut self) -> io::Result<()> {
        self.state.borrow_mut().beeps += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.borrow_mut().flushes += 1;
        Ok(())
    }
}
