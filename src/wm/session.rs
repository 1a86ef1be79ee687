//! Session - the initialized terminal
//!
//! Exactly one session can be live in a process. It owns the terminal, the
//! window arena, the color table and the input queues; window handles share
//! it through `Rc<RefCell<..>>`.
//!
//! Drawing never touches the terminal. `Window::refresh` queues a window and
//! [`Session::update`] composes every queued window into the pending screen
//! image (shallower windows first), then writes only the cells that differ
//! from what the terminal already shows.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::store::{WinState, WindowId, WindowKind, WindowStore};
use super::window::Window;
use crate::config::Config;
use crate::core::{Attr, Chtype, ColorTable, Grid};
use crate::error::{CursesError, Result};
use crate::input::keys::{KEY_MOUSE, KEY_RESIZE};
use crate::input::{Decoded, KeyDecoder, MouseEvent, MouseEventCodec, MouseMask};
use crate::ui::{CursorVisibility, Paint, TermMode, Terminal};

/// Set while a session is live
static LIVE: AtomicBool = AtomicBool::new(false);

/// Everything a session and its windows share
pub(crate) struct Screen {
    pub live: bool,
    pub term: Box<dyn Terminal>,
    pub config: Config,
    pub store: WindowStore,
    pub colors: ColorTable,
    pub mouse: MouseEventCodec,
    pub mouse_queue: VecDeque<MouseEvent>,
    pub input: VecDeque<u8>,
    pub echo: bool,
    /// `None` blocks
    pub timeout: Option<Duration>,
    /// Windows waiting for the next update, in refresh order
    pub queue: Vec<WindowId>,
    pub rows: usize,
    pub cols: usize,
    /// Image the next update will produce
    pending: Grid,
    /// What the terminal shows; `None` is unknown and always rewritten
    physical: Vec<Vec<Option<Chtype>>>,
}

impl Screen {
    /// Check that the session is live and the handle is current
    pub fn check(&self, id: WindowId) -> Result<()> {
        if !self.live {
            return Err(CursesError::StaleWindow);
        }
        self.store.get(id).map(|_| ())
    }

    /// Queue a window for the next update; a window already queued keeps its place
    pub fn enqueue(&mut self, id: WindowId) {
        if !self.queue.contains(&id) {
            self.queue.push(id);
        }
    }

    /// Forget the terminal contents so the next update repaints everything
    pub fn invalidate(&mut self) {
        for row in &mut self.physical {
            row.iter_mut().for_each(|cell| *cell = None);
        }
    }

    /// Place a window in the arena under `parent`
    pub fn attach(&mut self, mut state: WinState, parent: Option<WindowId>) -> Result<WindowId> {
        if let Some(parent) = parent {
            state.parent = Some(parent);
            state.depth = self.store.get(parent)?.depth + 1;
        }
        let id = self.store.insert(state);
        if let Some(parent) = parent {
            self.store.get_mut(parent)?.children.push(id);
        }
        Ok(id)
    }

    pub fn update(&mut self) -> Result<()> {
        if !self.live {
            return Err(CursesError::StaleWindow);
        }
        let mut queue = std::mem::take(&mut self.queue);
        queue.retain(|id| self.store.contains(*id));
        // Stable: equal depths keep refresh order
        queue.sort_by_key(|id| self.store.get(*id).map(|s| s.depth).unwrap_or(0));

        let mut cursor = None;
        for id in &queue {
            self.compose(*id)?;
            let state = self.store.get(*id)?;
            cursor = Some((
                state.begin_y + state.cury as i32,
                state.begin_x + state.curx as i32,
            ));
        }

        let written = self.flush_changes()?;
        debug!("Update composed {} windows, wrote {} cells", queue.len(), written);

        if let Some((y, x)) = cursor {
            let y = y.clamp(0, self.rows.saturating_sub(1) as i32);
            let x = x.clamp(0, self.cols.saturating_sub(1) as i32);
            self.term.move_cursor(y as u16, x as u16)?;
        }
        self.term.flush()?;
        Ok(())
    }

    /// Copy a window's dirty rows into the pending image
    fn compose(&mut self, id: WindowId) -> Result<()> {
        let view = self.store.view(id)?;
        let state = self.store.get(id)?;
        let (begin_y, begin_x, full) = (state.begin_y, state.begin_x, state.clear_ok);
        let dirty = state.dirty.clone();
        let grid = self.store.grid(view.storage)?;

        for (row, is_dirty) in dirty.iter().enumerate() {
            if !is_dirty && !full {
                continue;
            }
            let sy = begin_y + row as i32;
            if sy < 0 || sy as usize >= self.rows {
                continue;
            }
            for col in 0..view.width {
                let sx = begin_x + col as i32;
                if sx < 0 || sx as usize >= self.cols {
                    continue;
                }
                if let Some(cell) = grid.get(view.off_y + row, view.off_x + col) {
                    self.pending.set(sy as usize, sx as usize, cell);
                    if full {
                        self.physical[sy as usize][sx as usize] = None;
                    }
                }
            }
        }

        let state = self.store.get_mut(id)?;
        state.dirty.iter_mut().for_each(|d| *d = false);
        state.clear_ok = false;
        Ok(())
    }

    /// Write every run of cells that differs from the terminal
    fn flush_changes(&mut self) -> Result<usize> {
        let mut written = 0;
        for y in 0..self.rows {
            let mut x = 0;
            while x < self.cols {
                if self.physical[y][x] == self.pending.get(y, x) {
                    x += 1;
                    continue;
                }
                let start = x;
                let mut run = Vec::new();
                while x < self.cols && self.physical[y][x] != self.pending.get(y, x) {
                    let cell = self.pending.get(y, x).unwrap_or(Chtype::BLANK);
                    let (fg, bg) = self.colors.resolve(cell.pair());
                    run.push(Paint {
                        ch: cell.ch(),
                        attrs: cell.attrs(),
                        fg,
                        bg,
                    });
                    self.physical[y][x] = Some(cell);
                    x += 1;
                }
                self.term.write_cells(y as u16, start as u16, &run)?;
                written += run.len();
            }
        }
        Ok(written)
    }

    /// Next key code, honoring keypad mode and the input timeout
    pub fn read_key(&mut self, keypad: bool) -> Result<i32> {
        loop {
            while let Some(decoded) = KeyDecoder::next(&mut self.input, keypad) {
                match decoded {
                    Decoded::Key(KEY_RESIZE) => {
                        self.fit_to_terminal()?;
                        return Ok(KEY_RESIZE);
                    }
                    Decoded::Key(code) => return Ok(code),
                    Decoded::Mouse(report) => {
                        if let Some(event) = self.mouse.translate(report, Instant::now()) {
                            self.mouse_queue.push_back(event);
                            return Ok(KEY_MOUSE);
                        }
                    }
                }
            }
            // A poll that yields nothing, even a blocking one, ends the read
            match self.term.poll_input(self.timeout)? {
                Some(bytes) if !bytes.is_empty() => self.input.extend(bytes),
                _ => return Err(CursesError::TimedOut),
            }
        }
    }

    /// Take over a new terminal size; the next update repaints everything
    fn fit_to_terminal(&mut self) -> Result<()> {
        let (rows, cols) = self.term.size()?;
        let (rows, cols) = (rows as usize, cols as usize);
        info!("Screen resized from {}x{} to {}x{}", self.cols, self.rows, cols, rows);
        self.rows = rows;
        self.cols = cols;
        self.pending.resize(rows, cols, Chtype::BLANK);
        self.physical = vec![vec![None; cols]; rows];
        Ok(())
    }

    /// Give the terminal back and invalidate every window
    fn shutdown(&mut self) -> Result<()> {
        if !self.live {
            return Ok(());
        }
        info!("Tearing down session ({} windows)", self.store.len());
        self.live = false;
        self.store.clear();
        self.queue.clear();
        LIVE.store(false, Ordering::SeqCst);

        if !self.mouse.active().is_empty() {
            self.term.set_mouse_reporting(false)?;
        }
        self.term.stop()?;
        Ok(())
    }
}

/// The initialized terminal
pub struct Session {
    screen: Rc<RefCell<Screen>>,
    root: WindowId,
}

impl Session {
    /// Take over the terminal with the default configuration
    pub fn init<T: Terminal + 'static>(terminal: T) -> Result<(Session, Window)> {
        Self::init_with_config(terminal, Config::default())
    }

    /// Take over the terminal. Returns the session and the full-screen root window.
    pub fn init_with_config<T: Terminal + 'static>(
        mut terminal: T,
        config: Config,
    ) -> Result<(Session, Window)> {
        let timeout = match config.input.half_delay {
            Some(tenths) => Some(half_delay_duration(tenths as i32)?),
            None => None,
        };
        if LIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CursesError::Initialization(
                "a session is already live".to_string(),
            ));
        }

        let started = Self::start_terminal(&mut terminal);
        let (rows, cols) = match started {
            Ok(size) => size,
            Err(e) => {
                LIVE.store(false, Ordering::SeqCst);
                return Err(CursesError::Initialization(e.to_string()));
            }
        };
        info!("Session started on a {}x{} terminal", cols, rows);

        let caps = terminal.capabilities();
        let mut screen = Screen {
            live: true,
            term: Box::new(terminal),
            colors: ColorTable::new(caps.colors, caps.can_change_color, caps.max_pairs),
            mouse: MouseEventCodec::new(
                config.input.strict_mouse_names,
                config.input.mouse_interval(),
            ),
            mouse_queue: VecDeque::new(),
            input: VecDeque::new(),
            echo: true,
            timeout,
            queue: Vec::new(),
            rows,
            cols,
            pending: Grid::new(rows, cols, Chtype::BLANK),
            physical: vec![vec![None; cols]; rows],
            store: WindowStore::new(),
            config,
        };
        let root = screen
            .store
            .insert(WinState::owned(WindowKind::Root, rows, cols, 0, 0));

        let screen = Rc::new(RefCell::new(screen));
        let window = Window::new(root, Rc::clone(&screen));
        Ok((Session { screen, root }, window))
    }

    fn start_terminal<T: Terminal>(terminal: &mut T) -> std::io::Result<(usize, usize)> {
        terminal.start()?;
        let (rows, cols) = terminal.size()?;
        Ok((rows as usize, cols as usize))
    }

    /// The full-screen window created at init
    pub fn root(&self) -> Window {
        Window::new(self.root, Rc::clone(&self.screen))
    }

    /// A new top-level window. A zero height or width extends it to the
    /// screen edge.
    pub fn new_window(&self, height: i32, width: i32, y: i32, x: i32) -> Result<Window> {
        let mut screen = self.screen.borrow_mut();
        Self::check_live(&screen)?;
        let (rows, cols) = (screen.rows as i32, screen.cols as i32);
        if y < 0 || x < 0 || y >= rows || x >= cols {
            return Err(CursesError::OutOfBounds { y, x });
        }
        let height = if height == 0 { rows - y } else { height };
        let width = if width == 0 { cols - x } else { width };
        if height < 0 || width < 0 {
            return Err(CursesError::InvalidArgument(format!(
                "window size {}x{}",
                height, width
            )));
        }
        if height > rows - y || width > cols - x {
            return Err(CursesError::OutOfBounds {
                y: y.saturating_add(height - 1),
                x: x.saturating_add(width - 1),
            });
        }

        let state = WinState::owned(WindowKind::Root, height as usize, width as usize, y, x);
        let id = screen.attach(state, None)?;
        debug!("New window {:?}: {}x{} at ({}, {})", id, height, width, y, x);
        Ok(Window::new(id, Rc::clone(&self.screen)))
    }

    /// Flush every queued window to the terminal
    pub fn update(&self) -> Result<()> {
        self.screen.borrow_mut().update()
    }

    /// Restore the terminal. Every window becomes stale.
    pub fn teardown(self) -> Result<()> {
        self.screen.borrow_mut().shutdown()
    }

    pub fn is_live(&self) -> bool {
        self.screen.borrow().live
    }

    /// Screen size as (rows, columns)
    pub fn screen_size(&self) -> (i32, i32) {
        let screen = self.screen.borrow();
        (screen.rows as i32, screen.cols as i32)
    }

    fn check_live(screen: &Screen) -> Result<()> {
        if screen.live {
            Ok(())
        } else {
            Err(CursesError::StaleWindow)
        }
    }

    fn with_live<R>(&self, f: impl FnOnce(&mut Screen) -> Result<R>) -> Result<R> {
        let mut screen = self.screen.borrow_mut();
        Self::check_live(&screen)?;
        f(&mut screen)
    }

    // Terminal modes

    pub fn raw(&self, on: bool) -> Result<()> {
        self.with_live(|s| Ok(s.term.set_mode(TermMode::Raw, on)?))
    }

    pub fn cbreak(&self, on: bool) -> Result<()> {
        self.with_live(|s| Ok(s.term.set_mode(TermMode::Cbreak, on)?))
    }

    /// Echo typed characters into the reading window
    pub fn echo(&self, on: bool) -> Result<()> {
        self.with_live(|s| {
            s.echo = on;
            Ok(())
        })
    }

    /// Cursor visibility: 0 hidden, 1 normal, 2 very visible
    pub fn cursor(&self, level: u8) -> Result<()> {
        let visibility = CursorVisibility::try_from(level)?;
        self.with_live(|s| Ok(s.term.set_cursor_visibility(visibility)?))
    }

    /// Cbreak mode with reads that give up after `tenths` tenths of a second
    pub fn half_delay(&self, tenths: i32) -> Result<()> {
        let timeout = half_delay_duration(tenths)?;
        self.with_live(|s| {
            s.term.set_mode(TermMode::Cbreak, true)?;
            s.timeout = Some(timeout);
            Ok(())
        })
    }

    /// Input timeout; `None` blocks
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.with_live(|s| {
            s.timeout = timeout;
            Ok(())
        })
    }

    pub fn beep(&self) -> Result<()> {
        self.with_live(|s| Ok(s.term.beep()?))
    }

    // Colors

    pub fn start_color(&self) -> Result<()> {
        self.with_live(|s| s.colors.start())
    }

    pub fn has_colors(&self) -> bool {
        self.screen.borrow().colors.has_colors()
    }

    pub fn can_change_color(&self) -> bool {
        self.screen.borrow().colors.can_change_color()
    }

    /// Number of pair slots, including the reserved pair 0
    pub fn max_pairs(&self) -> i32 {
        self.screen.borrow().colors.max_pairs() as i32
    }

    /// Redefine a named color. Shown from the next update on.
    pub fn init_color(&self, name: &str, r: i32, g: i32, b: i32) -> Result<()> {
        self.with_live(|s| {
            s.colors.define_color(name, r, g, b)?;
            s.invalidate();
            Ok(())
        })
    }

    /// Bind a pair to foreground and background colors. Shown from the next update on.
    pub fn init_pair(&self, id: i32, fg: &str, bg: &str) -> Result<()> {
        self.with_live(|s| {
            s.colors.define_pair(id, fg, bg)?;
            s.invalidate();
            debug!("Pair {} = {} on {}", id, fg, bg);
            Ok(())
        })
    }

    pub fn pair_content(&self, id: i32) -> Result<(u8, u8)> {
        self.screen.borrow().colors.pair_content(id)
    }

    pub fn color_content(&self, name: &str) -> Result<(i16, i16, i16)> {
        self.screen.borrow().colors.color_content(name)
    }

    /// Cell mask selecting a pair, for `attr_on` and friends
    pub fn color_pair(&self, id: i32) -> Result<Attr> {
        self.screen.borrow().colors.encode(id)
    }

    // Mouse

    /// Resolve mouse event names against the configured strictness
    pub fn resolve_mouse<I, S>(&self, names: I) -> Result<MouseMask>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.screen.borrow().mouse.resolve_mask(names)
    }

    /// Report the events in `mask`; returns the previous mask
    pub fn mouse_mask(&self, mask: MouseMask) -> Result<MouseMask> {
        self.with_live(|s| {
            let previous = s.mouse.enable(mask);
            s.term.set_mouse_reporting(!mask.is_empty())?;
            info!("Mouse mask {:?} -> {:?}", previous, mask);
            Ok(previous)
        })
    }

    /// Next queued mouse event, available after a read returns `KEY_MOUSE`
    pub fn get_mouse(&self) -> Result<MouseEvent> {
        self.with_live(|s| s.mouse_queue.pop_front().ok_or(CursesError::NoMouseEvent))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut screen) = self.screen.try_borrow_mut() {
            if let Err(e) = screen.shutdown() {
                warn!("Teardown on drop failed: {}", e);
            }
        }
    }
}

fn half_delay_duration(tenths: i32) -> Result<Duration> {
    if !(1..=255).contains(&tenths) {
        return Err(CursesError::InvalidArgument(format!(
            "half delay must be 1..=255 tenths, got {}",
            tenths
        )));
    }
    Ok(Duration::from_millis(tenths as u64 * 100))
}
