//! Terminal backend using crossterm
//!
//! Paints resolved cells to the console and feeds input back as bytes.

use std::io::{self, BufWriter, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{Hide, MoveTo, SetCursorStyle, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, info};

use super::keymapper::KeyMapper;
use super::{Capabilities, CursorVisibility, Paint, TermMode, Terminal};
use crate::core::cell::acs;
use crate::core::Attr;

/// The real terminal on stdout
pub struct CrosstermTerminal {
    out: BufWriter<Stdout>,
    /// Whether the terminal has been taken over
    initialized: bool,
    mouse: bool,
    /// Attributes of the last cell written, to skip redundant SGR sequences
    last_paint: Option<(Attr, crate::core::TermColor, crate::core::TermColor)>,
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        Self {
            out: BufWriter::with_capacity(65536, io::stdout()),
            initialized: false,
            mouse: false,
            last_paint: None,
        }
    }

    fn apply_attrs(&mut self, paint: &Paint) -> io::Result<()> {
        let key = (paint.attrs, paint.fg, paint.bg);
        if self.last_paint == Some(key) {
            return Ok(());
        }
        self.last_paint = Some(key);

        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;

        let attrs = paint.attrs;
        if attrs.contains(Attr::BOLD) {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if attrs.contains(Attr::DIM) {
            queue!(self.out, SetAttribute(Attribute::Dim))?;
        }
        if attrs.contains(Attr::UNDERLINE) {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        if attrs.contains(Attr::BLINK) {
            queue!(self.out, SetAttribute(Attribute::SlowBlink))?;
        }
        if attrs.intersects(Attr::REVERSE | Attr::STANDOUT) {
            queue!(self.out, SetAttribute(Attribute::Reverse))?;
        }
        if attrs.contains(Attr::INVIS) {
            queue!(self.out, SetAttribute(Attribute::Hidden))?;
        }

        let fg = paint.fg.to_crossterm();
        if fg != crossterm::style::Color::Reset {
            queue!(self.out, SetForegroundColor(fg))?;
        }
        let bg = paint.bg.to_crossterm();
        if bg != crossterm::style::Color::Reset {
            queue!(self.out, SetBackgroundColor(bg))?;
        }
        Ok(())
    }

    fn glyph(paint: &Paint) -> char {
        if paint.attrs.contains(Attr::ALTCHARSET) {
            // Cell characters are Latin-1, so the code always fits
            acs::glyph(paint.ch as u32 as u8)
        } else {
            paint.ch
        }
    }
}

impl Terminal for CrosstermTerminal {
    fn start(&mut self) -> io::Result<()> {
        info!("Taking over terminal");
        terminal::enable_raw_mode()?;
        execute!(
            self.out,
            EnterAlternateScreen,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        self.last_paint = None;
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        info!("Restoring terminal");

        if self.mouse {
            let _ = execute!(self.out, DisableMouseCapture);
            self.mouse = false;
        }
        let _ = execute!(self.out, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(self.out, SetCursorStyle::DefaultUserShape, Show);
        let _ = execute!(self.out, EnableLineWrap);
        let _ = execute!(self.out, LeaveAlternateScreen);
        let _ = self.out.flush();

        terminal::disable_raw_mode()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let (cols, rows) = terminal::size()?;
        Ok((rows, cols))
    }

    fn capabilities(&self) -> Capabilities {
        let truecolor = std::env::var("COLORTERM")
            .map(|v| v == "truecolor" || v == "24bit")
            .unwrap_or(false);
        Capabilities {
            colors: true,
            can_change_color: truecolor,
            max_pairs: 256,
        }
    }

    fn set_mode(&mut self, mode: TermMode, on: bool) -> io::Result<()> {
        // crossterm only knows raw mode; cbreak differs from it in signal
        // handling, which the driver does not expose
        debug!("Terminal mode {:?} -> {}", mode, on);
        if on {
            terminal::enable_raw_mode()
        } else {
            terminal::disable_raw_mode()
        }
    }

    fn set_cursor_visibility(&mut self, visibility: CursorVisibility) -> io::Result<()> {
        match visibility {
            CursorVisibility::Hidden => queue!(self.out, Hide),
            CursorVisibility::Normal => queue!(self.out, SetCursorStyle::DefaultUserShape, Show),
            CursorVisibility::VeryVisible => queue!(self.out, SetCursorStyle::BlinkingBlock, Show),
        }
    }

    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(x, y))
    }

    fn write_cells(&mut self, y: u16, x: u16, cells: &[Paint]) -> io::Result<()> {
        queue!(self.out, MoveTo(x, y))?;
        for paint in cells {
            self.apply_attrs(paint)?;
            queue!(self.out, Print(Self::glyph(paint)))?;
        }
        Ok(())
    }

    fn set_mouse_reporting(&mut self, on: bool) -> io::Result<()> {
        if on == self.mouse {
            return Ok(());
        }
        self.mouse = on;
        if on {
            queue!(self.out, EnableMouseCapture)
        } else {
            queue!(self.out, DisableMouseCapture)
        }
    }

    fn poll_input(&mut self, timeout: Option<Duration>) -> io::Result<Option<Vec<u8>>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    deadline - now
                }
                None => Duration::from_secs(3600),
            };
            if !event::poll(remaining)? {
                if deadline.is_some() {
                    return Ok(None);
                }
                continue;
            }
            let event = event::read()?;
            if let Event::Resize(cols, rows) = event {
                debug!("Terminal resized to {}x{}", cols, rows);
            }
            if let Some(bytes) = KeyMapper::map_event(&event) {
                return Ok(Some(bytes));
            }
        }
    }

    fn beep(&mut self) -> io::Result<()> {
        queue!(self.out, Print('\x07'))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
