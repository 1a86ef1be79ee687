//! Window - an addressable rectangle of cells
//!
//! A `Window` is a cheap handle (arena id + shared session state). Every
//! drawing call mutates cells in memory only; `refresh` queues the window
//! and `Session::update` puts it on the terminal.
//!
//! Derived windows own their cells and sit inside their parent. Sub-windows
//! view an ancestor's cells: writes through either are visible through both,
//! but only the writer's rows are marked dirty until `touch` or `sync`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::session::Screen;
use super::store::{WinState, WindowId, WindowKind};
use crate::core::cell::acs;
use crate::core::{Attr, Chtype, ColorTable};
use crate::error::{CursesError, Result};
use crate::input::keys::{KEY_BACKSPACE, KEY_ENTER};

/// Where `print` starts writing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// At the cursor
    Cursor,
    /// At the start of a row
    Row(i32),
    /// At (y, x)
    At(i32, i32),
}

impl From<()> for Origin {
    fn from(_: ()) -> Self {
        Origin::Cursor
    }
}

impl From<i32> for Origin {
    fn from(y: i32) -> Self {
        Origin::Row(y)
    }
}

impl From<(i32, i32)> for Origin {
    fn from((y, x): (i32, i32)) -> Self {
        Origin::At(y, x)
    }
}

/// Formatted print into a window.
///
/// ```ignore
/// wprint!(win, "score: {}", score)?;          // at the cursor
/// wprint!(win, [5], "row five")?;             // at (5, 0)
/// wprint!(win, [5, 10], "hello {}", name)?;   // at (5, 10)
/// ```
#[macro_export]
macro_rules! wprint {
    ($win:expr, [$y:expr, $x:expr], $($arg:tt)+) => {
        $win.print(($y, $x), format_args!($($arg)+))
    };
    ($win:expr, [$y:expr], $($arg:tt)+) => {
        $win.print($y, format_args!($($arg)+))
    };
    ($win:expr, $($arg:tt)+) => {
        $win.print((), format_args!($($arg)+))
    };
}

/// Refresh propagation between windows sharing cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    #[default]
    None,
    /// Ancestors sharing storage take over the overlapping rows
    Down,
    /// Descendants sharing storage take over the overlapping rows
    Up,
    /// Ancestors move their cursor to this window's cursor
    Cursor,
}

/// Background description for [`Window::background`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Background {
    ch: u8,
    attrs: Attr,
    pair: i32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            ch: b' ',
            attrs: Attr::NORMAL,
            pair: 0,
        }
    }
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ch(mut self, ch: u8) -> Self {
        self.ch = ch;
        self
    }

    pub fn attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn pair(mut self, pair: i32) -> Self {
        self.pair = pair;
        self
    }
}

/// Handle to a window
#[derive(Clone)]
pub struct Window {
    id: WindowId,
    screen: Rc<RefCell<Screen>>,
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window").field("id", &self.id).finish()
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.screen, &other.screen)
    }
}

impl Window {
    pub(crate) fn new(id: WindowId, screen: Rc<RefCell<Screen>>) -> Self {
        Self { id, screen }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Whether the window was deleted or its session torn down
    pub fn is_stale(&self) -> bool {
        self.screen.borrow().check(self.id).is_err()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Screen, WindowId) -> Result<R>) -> Result<R> {
        let mut screen = self.screen.borrow_mut();
        screen.check(self.id)?;
        f(&mut screen, self.id)
    }

    fn state<R>(&self, f: impl FnOnce(&WinState) -> R) -> Result<R> {
        self.with(|s, id| Ok(f(s.store.get(id)?)))
    }

    fn state_mut<R>(&self, f: impl FnOnce(&mut WinState) -> R) -> Result<R> {
        self.with(|s, id| Ok(f(s.store.get_mut(id)?)))
    }

    // Text

    /// Write one character at the cursor and advance
    pub fn add_char(&self, ch: Chtype, attrs: Attr) -> Result<()> {
        if Attr::from_bits(ch.bits()).is_none() {
            return Err(CursesError::CellOverflow(ch.bits()));
        }
        let attrs = attrs.rendition()?;
        self.with(|s, id| put_char(s, id, ch, attrs))
    }

    /// Write a string at the cursor. Characters outside Latin-1 are rejected
    /// before anything is written.
    pub fn add_str(&self, text: &str) -> Result<()> {
        let cells = cells_of(text)?;
        self.with(|s, id| {
            for cell in cells {
                put_char(s, id, cell, Attr::NORMAL)?;
            }
            Ok(())
        })
    }

    /// Formatted write, optionally moving first. See [`wprint!`](crate::wprint).
    pub fn print<A: Into<Origin>>(&self, at: A, args: fmt::Arguments<'_>) -> Result<()> {
        let cells = cells_of(&args.to_string())?;
        let origin = at.into();
        self.with(|s, id| {
            match origin {
                Origin::Cursor => {}
                Origin::Row(y) => move_to(s, id, y, 0)?,
                Origin::At(y, x) => move_to(s, id, y, x)?,
            }
            for cell in cells {
                put_char(s, id, cell, Attr::NORMAL)?;
            }
            Ok(())
        })
    }

    // Cursor and geometry

    pub fn move_to(&self, y: i32, x: i32) -> Result<()> {
        self.with(|s, id| move_to(s, id, y, x))
    }

    /// Cursor position as (y, x)
    pub fn cursor(&self) -> Result<(i32, i32)> {
        self.state(|w| (w.cury as i32, w.curx as i32))
    }

    /// Size as (rows, columns)
    pub fn max_yx(&self) -> Result<(i32, i32)> {
        self.state(|w| (w.height as i32, w.width as i32))
    }

    /// Screen position of the top-left cell
    pub fn begin_yx(&self) -> Result<(i32, i32)> {
        self.state(|w| (w.begin_y, w.begin_x))
    }

    pub fn kind(&self) -> Result<WindowKind> {
        self.state(|w| w.kind)
    }

    /// Read a cell composite
    pub fn cell_at(&self, y: i32, x: i32) -> Result<Chtype> {
        self.with(|s, id| {
            if y < 0 || x < 0 {
                return Err(CursesError::OutOfBounds { y, x });
            }
            s.store.cell(id, y as usize, x as usize)
        })
    }

    // Attributes and color

    pub fn attr_on(&self, mask: Attr) -> Result<()> {
        let mask = mask.rendition()?;
        self.state_mut(|w| {
            w.attrs |= mask.styling();
            let pair = ColorTable::decode(mask);
            if pair != 0 {
                w.pair = pair;
            }
        })
    }

    pub fn attr_off(&self, mask: Attr) -> Result<()> {
        let mask = mask.rendition()?;
        self.state_mut(|w| {
            w.attrs.remove(mask.styling());
            let pair = ColorTable::decode(mask);
            if pair != 0 && pair == w.pair {
                w.pair = 0;
            }
        })
    }

    pub fn attr_set(&self, mask: Attr) -> Result<()> {
        let mask = mask.rendition()?;
        self.state_mut(|w| {
            w.attrs = mask.styling();
            w.pair = ColorTable::decode(mask);
        })
    }

    /// Current styling and pair as one mask
    pub fn attributes(&self) -> Result<Attr> {
        self.state(|w| w.attrs | pair_mask(w.pair))
    }

    /// Select the pair for subsequent writes
    pub fn color_set(&self, pair: i32) -> Result<()> {
        self.with(|s, id| {
            let pair = ColorTable::decode(s.colors.encode(pair)?);
            s.store.get_mut(id)?.pair = pair;
            Ok(())
        })
    }

    pub fn color_on(&self, pair: i32) -> Result<()> {
        self.color_set(pair)
    }

    /// Drop `pair` if it is the selected one
    pub fn color_off(&self, pair: i32) -> Result<()> {
        self.with(|s, id| {
            let pair = ColorTable::decode(s.colors.encode(pair)?);
            let state = s.store.get_mut(id)?;
            if state.pair == pair {
                state.pair = 0;
            }
            Ok(())
        })
    }

    /// Replace the background in every cell and use it for future blanks
    pub fn background(&self, bg: Background) -> Result<()> {
        self.with(|s, id| {
            let pair = ColorTable::decode(s.colors.encode(bg.pair)?);
            let new = Chtype::new(bg.ch as u32, bg.attrs.rendition()?, pair as u32)?;
            let state = s.store.get(id)?;
            let (old, height, width) = (state.bkgd, state.height, state.width);

            for y in 0..height {
                for x in 0..width {
                    let mut cell = s.store.cell(id, y, x)?;
                    if cell.code() == old.code() {
                        cell = cell.with_code(new.code());
                    }
                    let attrs = cell.attrs().difference(old.attrs()) | new.attrs();
                    let pair = if cell.pair() == old.pair() {
                        new.pair()
                    } else {
                        cell.pair()
                    };
                    s.store.put(id, y, x, cell.with_rendition(attrs, pair))?;
                }
            }
            s.store.get_mut(id)?.bkgd = new;
            debug!("Window {:?} background {:?}", id, new);
            Ok(())
        })
    }

    pub fn background_cell(&self) -> Result<Chtype> {
        self.state(|w| w.bkgd)
    }

    // Lines and borders

    /// Draw the edges. A zero composite picks the line-drawing default.
    #[allow(clippy::too_many_arguments)]
    pub fn border(
        &self,
        ls: Chtype,
        rs: Chtype,
        ts: Chtype,
        bs: Chtype,
        tl: Chtype,
        tr: Chtype,
        bl: Chtype,
        br: Chtype,
    ) -> Result<()> {
        self.with(|s, id| {
            let state = s.store.get(id)?;
            let (h, w) = (state.height, state.width);
            if h == 0 || w == 0 {
                return Ok(());
            }
            let edge = |ch: Chtype, default: Chtype| render(state, or_default(ch, default));
            let (ls, rs) = (edge(ls, acs::VLINE), edge(rs, acs::VLINE));
            let (ts, bs) = (edge(ts, acs::HLINE), edge(bs, acs::HLINE));
            let (tl, tr) = (edge(tl, acs::ULCORNER), edge(tr, acs::URCORNER));
            let (bl, br) = (edge(bl, acs::LLCORNER), edge(br, acs::LRCORNER));

            let inner = w.saturating_sub(2);
            s.store.fill(id, 0, 1, inner, ts)?;
            s.store.fill(id, h - 1, 1, inner, bs)?;
            for y in 1..h.saturating_sub(1) {
                s.store.put(id, y, 0, ls)?;
                s.store.put(id, y, w - 1, rs)?;
            }
            s.store.put(id, 0, 0, tl)?;
            s.store.put(id, 0, w - 1, tr)?;
            s.store.put(id, h - 1, 0, bl)?;
            s.store.put(id, h - 1, w - 1, br)?;
            Ok(())
        })
    }

    /// Border with default corners
    pub fn draw_box(&self, vch: Chtype, hch: Chtype) -> Result<()> {
        let corner = Chtype::from_bits(0);
        self.border(vch, vch, hch, hch, corner, corner, corner, corner)
    }

    /// `n` copies of `ch` rightwards from (y, x); the cursor ends at (y, x)
    pub fn hline(&self, y: i32, x: i32, ch: Chtype, n: i32) -> Result<()> {
        self.with(|s, id| draw_line(s, id, y, x, or_default(ch, acs::HLINE), n, false))
    }

    /// `n` copies of `ch` downwards from (y, x); the cursor ends at (y, x)
    pub fn vline(&self, y: i32, x: i32, ch: Chtype, n: i32) -> Result<()> {
        self.with(|s, id| draw_line(s, id, y, x, or_default(ch, acs::VLINE), n, true))
    }

    // Clearing

    /// Blank the window and home the cursor
    pub fn erase(&self) -> Result<()> {
        self.with(|s, id| {
            let state = s.store.get_mut(id)?;
            let (h, w, blank) = (state.height, state.width, state.bkgd);
            state.cury = 0;
            state.curx = 0;
            for y in 0..h {
                s.store.fill(id, y, 0, w, blank)?;
            }
            Ok(())
        })
    }

    /// Erase, and repaint the whole window on the next update
    pub fn clear(&self) -> Result<()> {
        self.erase()?;
        self.state_mut(|w| w.clear_ok = true)
    }

    /// Blank from the cursor to the end of the row
    pub fn clear_to_eol(&self) -> Result<()> {
        self.with(clear_to_eol)
    }

    /// Blank from the cursor to the bottom-right
    pub fn clear_to_bottom(&self) -> Result<()> {
        self.with(|s, id| {
            clear_to_eol(s, id)?;
            let state = s.store.get(id)?;
            let (cury, h, w, blank) = (state.cury, state.height, state.width, state.bkgd);
            for y in cury + 1..h {
                s.store.fill(id, y, 0, w, blank)?;
            }
            Ok(())
        })
    }

    // Scrolling

    pub fn set_scroll(&self, on: bool) -> Result<()> {
        self.state_mut(|w| w.scroll = on)
    }

    /// Scroll the contents up by `n` rows (down when negative)
    pub fn scroll(&self, n: i32) -> Result<()> {
        self.with(|s, id| {
            if !s.store.get(id)?.scroll {
                return Err(CursesError::InvalidArgument(
                    "scrolling is not enabled".to_string(),
                ));
            }
            scroll_lines(s, id, n)
        })
    }

    // Geometry changes

    /// Change the size, keeping the overlapping cells
    pub fn resize(&self, height: i32, width: i32) -> Result<()> {
        self.with(|s, id| {
            if height <= 0 || width <= 0 {
                return Err(CursesError::InvalidArgument(format!(
                    "window size {}x{}",
                    height, width
                )));
            }
            let (h, w) = (height as usize, width as usize);
            let state = s.store.get(id)?;

            if let Some(parent) = state.parent {
                let parent = s.store.get(parent)?;
                let room_y = parent.height as i32 - state.par_y;
                let room_x = parent.width as i32 - state.par_x;
                if height > room_y || width > room_x {
                    return Err(CursesError::OutOfBounds {
                        y: state.par_y.saturating_add(height - 1),
                        x: state.par_x.saturating_add(width - 1),
                    });
                }
            }
            for child in &state.children {
                let child = s.store.get(*child)?;
                let bottom = child.par_y + child.height as i32;
                let right = child.par_x + child.width as i32;
                if bottom > height || right > width {
                    return Err(CursesError::OutOfBounds {
                        y: bottom - 1,
                        x: right - 1,
                    });
                }
            }

            let state = s.store.get_mut(id)?;
            let blank = state.bkgd;
            if let Some(grid) = state.grid.as_mut() {
                grid.resize(h, w, blank);
            }
            state.height = h;
            state.width = w;
            state.dirty = vec![true; h];
            state.cury = state.cury.min(h - 1);
            state.curx = state.curx.min(w - 1);
            debug!("Window {:?} resized to {}x{}", id, h, w);
            Ok(())
        })
    }

    /// Window with its own cells at (y, x) inside this one. A zero height or
    /// width extends it to this window's edge.
    pub fn derived_window(&self, height: i32, width: i32, y: i32, x: i32) -> Result<Window> {
        self.with(|s, id| {
            let (h, w) = child_extent(s.store.get(id)?, height, width, y, x)?;
            let parent = s.store.get(id)?;
            let mut state = WinState::owned(
                WindowKind::Derived,
                h,
                w,
                parent.begin_y + y,
                parent.begin_x + x,
            );
            state.par_y = y;
            state.par_x = x;
            state.attrs = parent.attrs;
            state.pair = parent.pair;
            state.bkgd = parent.bkgd;
            if let Some(grid) = state.grid.as_mut() {
                for row in 0..h {
                    for col in 0..w {
                        let cell = s.store.cell(id, y as usize + row, x as usize + col)?;
                        grid.set(row, col, cell);
                    }
                }
            }
            let child = s.attach(state, Some(id))?;
            debug!("Derived window {:?} under {:?}: {}x{} at ({}, {})", child, id, h, w, y, x);
            Ok(Window::new(child, Rc::clone(&self.screen)))
        })
    }

    /// Window at (y, x) inside this one that shares its cells
    pub fn sub_window(&self, height: i32, width: i32, y: i32, x: i32) -> Result<Window> {
        self.with(|s, id| {
            let (h, w) = child_extent(s.store.get(id)?, height, width, y, x)?;
            let view = s.store.view(id)?;
            let parent = s.store.get(id)?;
            let mut state = WinState::view_of(
                view.storage,
                view.off_y + y as usize,
                view.off_x + x as usize,
                h,
                w,
            );
            state.begin_y = parent.begin_y + y;
            state.begin_x = parent.begin_x + x;
            state.par_y = y;
            state.par_x = x;
            state.attrs = parent.attrs;
            state.pair = parent.pair;
            state.bkgd = parent.bkgd;
            let child = s.attach(state, Some(id))?;
            debug!("Sub-window {:?} under {:?}: {}x{} at ({}, {})", child, id, h, w, y, x);
            Ok(Window::new(child, Rc::clone(&self.screen)))
        })
    }

    /// Independent top-level copy with its own cells
    pub fn duplicate(&self) -> Result<Window> {
        self.with(|s, id| {
            let source = s.store.get(id)?;
            let (h, w) = (source.height, source.width);
            let mut state = WinState::owned(WindowKind::Root, h, w, source.begin_y, source.begin_x);
            state.cury = source.cury;
            state.curx = source.curx;
            state.attrs = source.attrs;
            state.pair = source.pair;
            state.bkgd = source.bkgd;
            state.keypad = source.keypad;
            state.scroll = source.scroll;
            if let Some(grid) = state.grid.as_mut() {
                for row in 0..h {
                    for col in 0..w {
                        grid.set(row, col, s.store.cell(id, row, col)?);
                    }
                }
            }
            let copy = s.attach(state, None)?;
            Ok(Window::new(copy, Rc::clone(&self.screen)))
        })
    }

    /// Destroy this window and every window under it
    pub fn delete(&self) -> Result<()> {
        self.with(|s, id| {
            let removed = s.store.remove(id)?;
            s.queue.retain(|queued| !removed.contains(queued));
            debug!("Deleted window {:?} ({} windows)", id, removed.len());
            Ok(())
        })
    }

    // Refresh bookkeeping

    /// Mark every row dirty
    pub fn touch(&self) -> Result<()> {
        self.state_mut(|w| w.touch_all())
    }

    pub fn is_touched(&self) -> Result<bool> {
        self.state(|w| w.clear_ok || w.dirty.iter().any(|d| *d))
    }

    /// Queue the window for the next `Session::update`
    pub fn refresh(&self) -> Result<()> {
        self.with(|s, id| {
            s.enqueue(id);
            Ok(())
        })
    }

    pub fn sync(&self, mode: SyncMode) -> Result<()> {
        self.with(|s, id| match mode {
            SyncMode::None => Ok(()),
            SyncMode::Down => {
                let targets = s.store.ancestors(id)?;
                sync_rows(s, id, targets)
            }
            SyncMode::Up => {
                let targets = s.store.descendants(id)?;
                sync_rows(s, id, targets)
            }
            SyncMode::Cursor => {
                let state = s.store.get(id)?;
                let y = state.begin_y + state.cury as i32;
                let x = state.begin_x + state.curx as i32;
                for ancestor in s.store.ancestors(id)? {
                    let target = s.store.get_mut(ancestor)?;
                    let ty = (y - target.begin_y).clamp(0, target.height as i32 - 1);
                    let tx = (x - target.begin_x).clamp(0, target.width as i32 - 1);
                    target.cury = ty as usize;
                    target.curx = tx as usize;
                }
                Ok(())
            }
        })
    }

    // Input

    /// Interpret escape sequences as special keys
    pub fn keypad(&self, on: bool) -> Result<()> {
        self.state_mut(|w| w.keypad = on)
    }

    /// Read one key code. Fails with `TimedOut` when no input arrives in time.
    pub fn get_char(&self) -> Result<i32> {
        self.with(|s, id| {
            let keypad = s.store.get(id)?.keypad;
            let key = s.read_key(keypad)?;
            if s.echo && is_printable(key) {
                put_char(s, id, Chtype::from(key as u8), Attr::NORMAL)?;
            }
            Ok(key)
        })
    }

    /// Read up to `max_len` characters, stopping at enter. Input past the
    /// bound stays queued and rings the bell.
    pub fn get_string(&self, max_len: usize) -> Result<String> {
        if max_len == 0 {
            return Err(CursesError::InputOverflowRejected);
        }
        self.with(|s, id| {
            let keypad = s.store.get(id)?.keypad;
            let mut bytes: Vec<u8> = Vec::with_capacity(max_len);
            loop {
                if bytes.len() == max_len {
                    if !s.input.is_empty() {
                        s.term.beep()?;
                    }
                    break;
                }
                match s.read_key(keypad)? {
                    10 | 13 | KEY_ENTER => break,
                    8 | 0x7f | KEY_BACKSPACE => {
                        if bytes.pop().is_some() && s.echo {
                            erase_back(s, id)?;
                        }
                    }
                    key if is_printable(key) => {
                        bytes.push(key as u8);
                        if s.echo {
                            put_char(s, id, Chtype::from(key as u8), Attr::NORMAL)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(bytes.into_iter().map(char::from).collect())
        })
    }
}

fn cells_of(text: &str) -> Result<Vec<Chtype>> {
    text.chars().map(Chtype::from_char).collect()
}

fn pair_mask(pair: u8) -> Attr {
    Attr::from_bits_retain(Chtype::from_bits(0).with_pair(pair).bits())
}

fn or_default(ch: Chtype, default: Chtype) -> Chtype {
    if ch.bits() == 0 {
        default
    } else {
        ch
    }
}

fn is_printable(key: i32) -> bool {
    (0x20..0x7f).contains(&key) || (0xa0..=0xff).contains(&key)
}

/// Composite for a character written through `add_char`: the given
/// attributes, the window's, then the background's
fn compose(state: &WinState, ch: Chtype, attrs: Attr) -> Chtype {
    let bkgd = state.bkgd;
    let pair = [ch.pair(), ColorTable::decode(attrs), state.pair, bkgd.pair()]
        .into_iter()
        .find(|p| *p != 0)
        .unwrap_or(0);
    let mut cell = ch.with(attrs.styling() | state.attrs | bkgd.attrs());
    if cell.is_blank() {
        cell = cell.with_code(bkgd.code());
    }
    cell.with_pair(pair)
}

/// Composite for line drawing: only the background is merged in
fn render(state: &WinState, ch: Chtype) -> Chtype {
    let pair = if ch.pair() != 0 { ch.pair() } else { state.bkgd.pair() };
    ch.with(state.bkgd.attrs()).with_pair(pair)
}

fn move_to(s: &mut Screen, id: WindowId, y: i32, x: i32) -> Result<()> {
    let state = s.store.get_mut(id)?;
    if y < 0 || x < 0 || y as usize >= state.height || x as usize >= state.width {
        return Err(CursesError::OutOfBounds { y, x });
    }
    state.cury = y as usize;
    state.curx = x as usize;
    Ok(())
}

fn put_char(s: &mut Screen, id: WindowId, ch: Chtype, attrs: Attr) -> Result<()> {
    if !ch.attrs().contains(Attr::ALTCHARSET) {
        match ch.code() {
            b'\n' => {
                clear_to_eol(s, id)?;
                return newline(s, id);
            }
            b'\r' => {
                s.store.get_mut(id)?.curx = 0;
                return Ok(());
            }
            b'\t' => {
                let tab = s.config.draw.tab_width.max(1) as usize;
                let state = s.store.get(id)?;
                let stop = ((state.curx / tab + 1) * tab).min(state.width);
                for _ in state.curx..stop {
                    put_char(s, id, Chtype::BLANK, attrs)?;
                }
                return Ok(());
            }
            0x08 => {
                let state = s.store.get_mut(id)?;
                state.curx = state.curx.saturating_sub(1);
                return Ok(());
            }
            _ => {}
        }
    }

    let state = s.store.get(id)?;
    let cell = compose(state, ch, attrs);
    let (y, x) = (state.cury, state.curx);
    s.store.put(id, y, x, cell)?;

    let state = s.store.get_mut(id)?;
    if x + 1 < state.width {
        state.curx = x + 1;
        Ok(())
    } else {
        wrap(s, id)
    }
}

/// Cursor past the right edge
fn wrap(s: &mut Screen, id: WindowId) -> Result<()> {
    let state = s.store.get_mut(id)?;
    if state.cury + 1 < state.height {
        state.cury += 1;
        state.curx = 0;
    } else if state.scroll {
        state.curx = 0;
        scroll_lines(s, id, 1)?;
    } else {
        // Bottom-right without scrolling: stay on the last cell
        state.curx = state.width - 1;
    }
    Ok(())
}

fn newline(s: &mut Screen, id: WindowId) -> Result<()> {
    let state = s.store.get_mut(id)?;
    if state.cury + 1 < state.height {
        state.cury += 1;
        state.curx = 0;
    } else if state.scroll {
        state.curx = 0;
        scroll_lines(s, id, 1)?;
    }
    Ok(())
}

fn clear_to_eol(s: &mut Screen, id: WindowId) -> Result<()> {
    let state = s.store.get(id)?;
    let (y, x, w, blank) = (state.cury, state.curx, state.width, state.bkgd);
    s.store.fill(id, y, x, w - x, blank)
}

/// Step back one cell and blank it
fn erase_back(s: &mut Screen, id: WindowId) -> Result<()> {
    let state = s.store.get_mut(id)?;
    if state.curx > 0 {
        state.curx -= 1;
    } else if state.cury > 0 {
        state.cury -= 1;
        state.curx = state.width - 1;
    } else {
        return Ok(());
    }
    let (y, x, blank) = (state.cury, state.curx, state.bkgd);
    s.store.put(id, y, x, blank)
}

fn scroll_lines(s: &mut Screen, id: WindowId, n: i32) -> Result<()> {
    let state = s.store.get(id)?;
    let (h, w, blank) = (state.height, state.width, state.bkgd);
    let rows = (0..h)
        .map(|y| (0..w).map(|x| s.store.cell(id, y, x)).collect::<Result<Vec<_>>>())
        .collect::<Result<Vec<_>>>()?;

    for y in 0..h {
        let source = y as i32 + n.clamp(-(h as i32), h as i32);
        if (0..h as i32).contains(&source) {
            for (x, cell) in rows[source as usize].iter().enumerate() {
                s.store.put(id, y, x, *cell)?;
            }
        } else {
            s.store.fill(id, y, 0, w, blank)?;
        }
    }
    Ok(())
}

fn draw_line(
    s: &mut Screen,
    id: WindowId,
    y: i32,
    x: i32,
    ch: Chtype,
    n: i32,
    vertical: bool,
) -> Result<()> {
    let clip = s.config.draw.clip_lines;
    let state = s.store.get(id)?;
    if y < 0 || x < 0 || y as usize >= state.height || x as usize >= state.width {
        return Err(CursesError::OutOfBounds { y, x });
    }
    let room = if vertical {
        state.height as i32 - y
    } else {
        state.width as i32 - x
    };
    if n > room && !clip {
        let last = n - 1;
        let (ey, ex) = if vertical {
            (y.saturating_add(last), x)
        } else {
            (y, x.saturating_add(last))
        };
        return Err(CursesError::OutOfBounds { y: ey, x: ex });
    }

    let cell = render(state, ch);
    let count = n.clamp(0, room) as usize;
    let (y, x) = (y as usize, x as usize);
    if vertical {
        for row in y..y + count {
            s.store.put(id, row, x, cell)?;
        }
    } else {
        s.store.fill(id, y, x, count, cell)?;
    }

    let state = s.store.get_mut(id)?;
    state.cury = y;
    state.curx = x;
    Ok(())
}

/// Height and width of a child at (y, x), zero meaning "to the edge"
fn child_extent(parent: &WinState, height: i32, width: i32, y: i32, x: i32) -> Result<(usize, usize)> {
    let (ph, pw) = (parent.height as i32, parent.width as i32);
    if y < 0 || x < 0 || y >= ph || x >= pw {
        return Err(CursesError::OutOfBounds { y, x });
    }
    let height = if height == 0 { ph - y } else { height };
    let width = if width == 0 { pw - x } else { width };
    if height < 0 || width < 0 {
        return Err(CursesError::InvalidArgument(format!(
            "window size {}x{}",
            height, width
        )));
    }
    if height > ph - y || width > pw - x {
        return Err(CursesError::OutOfBounds {
            y: y.saturating_add(height - 1),
            x: x.saturating_add(width - 1),
        });
    }
    Ok((height as usize, width as usize))
}

/// Mark the rows each target shares with `id` dirty and queue the target
fn sync_rows(s: &mut Screen, id: WindowId, targets: Vec<WindowId>) -> Result<()> {
    let view = s.store.view(id)?;
    let (top, bottom) = (view.off_y, view.off_y + view.height);

    for target in targets {
        let other = s.store.view(target)?;
        if other.storage != view.storage {
            continue;
        }
        let from = top.max(other.off_y);
        let to = bottom.min(other.off_y + other.height);
        if from >= to {
            continue;
        }
        let state = s.store.get_mut(target)?;
        for row in from..to {
            state.dirty[row - other.off_y] = true;
        }
        s.enqueue(target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DrawConfig};
    use crate::input::keys::{KEY_LEFT, KEY_UP};
    use crate::testing;

    fn strict_lines() -> Config {
        Config {
            draw: DrawConfig {
                clip_lines: false,
                ..DrawConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_print_origins() {
        let fx = testing::fixture(10, 20);
        fx.root.move_to(2, 3).unwrap();

        wprint!(fx.root, "hi").unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (2, 5));
        assert_eq!(fx.root.cell_at(2, 3).unwrap().ch(), 'h');

        wprint!(fx.root, [5], "hi").unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (5, 2));
        assert_eq!(fx.root.cell_at(5, 0).unwrap().ch(), 'h');

        wprint!(fx.root, [5, 10], "hi {}", 7).unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (5, 14));
        assert_eq!(fx.root.cell_at(5, 10).unwrap().ch(), 'h');
        assert_eq!(fx.root.cell_at(5, 13).unwrap().ch(), '7');

        let row = 4;
        fx.root.print(row, format_args!("{}", "x")).unwrap();
        assert_eq!(fx.root.cell_at(4, 0).unwrap().ch(), 'x');
        assert!(matches!(
            wprint!(fx.root, [10, 0], "no"),
            Err(CursesError::OutOfBounds { y: 10, x: 0 })
        ));
    }

    #[test]
    fn test_attribute_composition_is_idempotent() {
        let fx = testing::fixture(2, 10);
        let names = ["bold", "underline", "reverse"];
        let mask = Attr::compose(names).unwrap();
        fx.root.attr_on(mask).unwrap();
        fx.root.attr_on(mask).unwrap();
        fx.root.add_char(Chtype::from(b'a'), Attr::NORMAL).unwrap();

        let cell = fx.root.cell_at(0, 0).unwrap();
        let expected = Attr::BOLD | Attr::UNDERLINE | Attr::REVERSE;
        assert_eq!(cell.attrs(), expected);
        assert_eq!(cell.bits(), b'a' as u32 | expected.bits());
        assert_eq!(fx.root.attributes().unwrap(), expected);

        fx.root.attr_off(Attr::UNDERLINE).unwrap();
        fx.root.add_char(Chtype::from(b'b'), Attr::DIM).unwrap();
        assert_eq!(
            fx.root.cell_at(0, 1).unwrap().attrs(),
            Attr::BOLD | Attr::REVERSE | Attr::DIM
        );
        fx.root.attr_set(Attr::NORMAL).unwrap();
        assert_eq!(fx.root.attributes().unwrap(), Attr::NORMAL);
    }

    #[test]
    fn test_color_pair_applies_to_writes() {
        let fx = testing::fixture(2, 10);
        fx.session.start_color().unwrap();
        fx.session.init_pair(3, "yellow", "blue").unwrap();
        fx.root.attr_on(fx.session.color_pair(3).unwrap()).unwrap();
        wprint!(fx.root, "c").unwrap();
        let cell = fx.root.cell_at(0, 0).unwrap();
        assert_eq!(cell.pair(), 3);
        assert_eq!(fx.session.pair_content(cell.pair() as i32).unwrap(), (3, 4));

        fx.root.color_off(3).unwrap();
        wprint!(fx.root, "d").unwrap();
        assert_eq!(fx.root.cell_at(0, 1).unwrap().pair(), 0);

        assert!(matches!(
            fx.root.color_set(fx.session.max_pairs()),
            Err(CursesError::InvalidPairId(_))
        ));
    }

    #[test]
    fn test_wrap_and_bottom_right() {
        let fx = testing::fixture(2, 3);
        wprint!(fx.root, "abcd").unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (1, 1));
        wprint!(fx.root, "ef").unwrap();
        // Last cell written, no scrolling: the cursor stays there
        assert_eq!(fx.root.cursor().unwrap(), (1, 2));
        wprint!(fx.root, "g").unwrap();
        assert_eq!(fx.root.cell_at(1, 2).unwrap().ch(), 'g');
        assert_eq!(fx.root.cursor().unwrap(), (1, 2));
    }

    #[test]
    fn test_scrolling_at_bottom() {
        let fx = testing::fixture(2, 3);
        fx.root.set_scroll(true).unwrap();
        wprint!(fx.root, "abcdefgh").unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (1, 2));
        let row = |y| -> String {
            (0..3).map(|x| fx.root.cell_at(y, x).unwrap().ch()).collect()
        };
        assert_eq!(row(0), "def");
        assert_eq!(row(1), "gh ");

        fx.root.scroll(-1).unwrap();
        assert_eq!(row(0), "   ");
        assert_eq!(row(1), "def");

        fx.root.set_scroll(false).unwrap();
        assert!(matches!(fx.root.scroll(1), Err(CursesError::InvalidArgument(_))));
    }

    #[test]
    fn test_control_characters() {
        let fx = testing::fixture(3, 12);
        wprint!(fx.root, "abcdef").unwrap();
        fx.root.move_to(0, 2).unwrap();
        wprint!(fx.root, "X\nY").unwrap();
        assert_eq!(fx.root.cell_at(0, 3).unwrap().ch(), ' ');
        assert_eq!(fx.root.cell_at(1, 0).unwrap().ch(), 'Y');

        wprint!(fx.root, "\tZ").unwrap();
        assert_eq!(fx.root.cell_at(1, 8).unwrap().ch(), 'Z');

        wprint!(fx.root, "\rQ").unwrap();
        assert_eq!(fx.root.cell_at(1, 0).unwrap().ch(), 'Q');

        fx.root.add_char(Chtype::from(0x08), Attr::NORMAL).unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (1, 0));
    }

    #[test]
    fn test_non_latin1_text_is_rejected_whole() {
        let fx = testing::fixture(1, 10);
        assert!(matches!(
            fx.root.add_str("ab\u{3bb}"),
            Err(CursesError::CellOverflow(0x3bb))
        ));
        assert_eq!(fx.root.cell_at(0, 0).unwrap().ch(), ' ');
        assert_eq!(fx.root.cursor().unwrap(), (0, 0));
    }

    #[test]
    fn test_box_draws_line_glyphs() {
        let fx = testing::fixture(3, 4);
        let zero = Chtype::from_bits(0);
        fx.root.move_to(1, 1).unwrap();
        fx.root.draw_box(zero, zero).unwrap();
        assert_eq!(fx.root.cursor().unwrap(), (1, 1));
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();
        assert_eq!(fx.term.lines(), vec!["┌──┐", "│  │", "└──┘"]);

        let star = Chtype::from(b'*');
        fx.root
            .border(star, star, Chtype::from(b'-'), Chtype::from(b'='), zero, zero, zero, Chtype::from(b'+'))
            .unwrap();
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();
        assert_eq!(fx.term.lines(), vec!["┌--┐", "*  *", "└==+"]);
    }

    #[test]
    fn test_hline_clips_by_default() {
        let fx = testing::fixture(3, 5);
        fx.root.hline(1, 2, Chtype::from(b'-'), 10).unwrap();
        let row: String = (0..5).map(|x| fx.root.cell_at(1, x).unwrap().ch()).collect();
        assert_eq!(row, "  ---");
        assert_eq!(fx.root.cursor().unwrap(), (1, 2));

        fx.root.vline(0, 0, Chtype::from_bits(0), 9).unwrap();
        assert_eq!(fx.root.cell_at(2, 0).unwrap(), acs::VLINE);

        assert!(matches!(
            fx.root.hline(3, 0, Chtype::from(b'-'), 1),
            Err(CursesError::OutOfBounds { y: 3, x: 0 })
        ));
    }

    #[test]
    fn test_strict_clipping_rejects_overflow() {
        let fx = testing::fixture_with(3, 5, strict_lines());
        assert!(matches!(
            fx.root.hline(1, 2, Chtype::from(b'-'), 4),
            Err(CursesError::OutOfBounds { y: 1, x: 5 })
        ));
        // Nothing was drawn
        assert_eq!(fx.root.cell_at(1, 2).unwrap().ch(), ' ');
        fx.root.hline(1, 2, Chtype::from(b'-'), 3).unwrap();
        assert!(matches!(
            fx.root.vline(1, 0, Chtype::from(b'|'), 3),
            Err(CursesError::OutOfBounds { y: 3, x: 0 })
        ));
    }

    #[test]
    fn test_clear_variants() {
        let fx = testing::fixture(3, 4);
        for y in 0..3 {
            wprint!(fx.root, [y], "abcd").unwrap();
        }
        fx.root.move_to(1, 2).unwrap();
        fx.root.clear_to_eol().unwrap();
        assert_eq!(fx.root.cell_at(1, 1).unwrap().ch(), 'b');
        assert_eq!(fx.root.cell_at(1, 2).unwrap().ch(), ' ');
        assert_eq!(fx.root.cell_at(2, 0).unwrap().ch(), 'a');

        fx.root.move_to(0, 3).unwrap();
        fx.root.clear_to_bottom().unwrap();
        assert_eq!(fx.root.cell_at(0, 2).unwrap().ch(), 'c');
        assert_eq!(fx.root.cell_at(0, 3).unwrap().ch(), ' ');
        assert_eq!(fx.root.cell_at(2, 0).unwrap().ch(), ' ');
        assert_eq!(fx.root.cursor().unwrap(), (0, 3));

        fx.root.clear().unwrap();
        assert_eq!(fx.root.cell_at(0, 0).unwrap().ch(), ' ');
        assert_eq!(fx.root.cursor().unwrap(), (0, 0));
        assert!(fx.root.is_touched().unwrap());
    }

    #[test]
    fn test_clear_forces_full_repaint() {
        let fx = testing::fixture(2, 3);
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();
        let before = fx.term.cells_written();

        fx.root.clear().unwrap();
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();
        assert_eq!(fx.term.cells_written(), before + 6);
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let fx = testing::fixture(10, 10);
        let win = fx.session.new_window(3, 4, 0, 0).unwrap();
        for y in 0..3 {
            wprint!(win, [y], "{}{}{}{}", y, y, y, y).unwrap();
        }
        win.move_to(2, 3).unwrap();

        win.resize(2, 6).unwrap();
        assert_eq!(win.max_yx().unwrap(), (2, 6));
        assert_eq!(win.cursor().unwrap(), (1, 3));
        assert_eq!(win.cell_at(1, 3).unwrap().ch(), '1');
        assert_eq!(win.cell_at(1, 5).unwrap().ch(), ' ');
        assert!(win.cell_at(2, 0).is_err());

        assert!(matches!(win.resize(0, 3), Err(CursesError::InvalidArgument(_))));
    }

    #[test]
    fn test_resize_respects_parent_and_children() {
        let fx = testing::fixture(10, 10);
        let outer = fx.session.new_window(6, 6, 0, 0).unwrap();
        let inner = outer.derived_window(3, 3, 2, 2).unwrap();
        assert!(matches!(outer.resize(4, 6), Err(CursesError::OutOfBounds { .. })));
        assert!(matches!(inner.resize(5, 3), Err(CursesError::OutOfBounds { .. })));
        inner.resize(4, 4).unwrap();

        let sub = outer.sub_window(2, 2, 0, 0).unwrap();
        assert!(matches!(sub.resize(7, 2), Err(CursesError::OutOfBounds { .. })));
        sub.resize(2, 6).unwrap();
        wprint!(sub, [0, 5], "z").unwrap();
        assert_eq!(outer.cell_at(0, 5).unwrap().ch(), 'z');
    }

    #[test]
    fn test_delete_cascades_to_descendants() {
        let fx = testing::fixture(10, 10);
        let parent = fx.session.new_window(8, 8, 1, 1).unwrap();
        let derived = parent.derived_window(4, 4, 1, 1).unwrap();
        let sub = derived.sub_window(2, 2, 1, 1).unwrap();
        let other = fx.session.new_window(1, 1, 0, 0).unwrap();

        parent.delete().unwrap();
        for gone in [&parent, &derived, &sub] {
            assert!(gone.is_stale());
            assert!(matches!(gone.refresh(), Err(CursesError::StaleWindow)));
            assert!(matches!(wprint!(gone, "x"), Err(CursesError::StaleWindow)));
            assert!(matches!(gone.cursor(), Err(CursesError::StaleWindow)));
        }
        assert!(!other.is_stale());
        assert!(matches!(parent.delete(), Err(CursesError::StaleWindow)));
    }

    #[test]
    fn test_derived_window_geometry() {
        let fx = testing::fixture(10, 10);
        let outer = fx.session.new_window(6, 6, 2, 3).unwrap();
        wprint!(outer, [1, 1], "ab").unwrap();
        let inner = outer.derived_window(0, 0, 1, 1).unwrap();
        assert_eq!(inner.max_yx().unwrap(), (5, 5));
        assert_eq!(inner.begin_yx().unwrap(), (3, 4));
        assert_eq!(inner.kind().unwrap(), WindowKind::Derived);
        // Starts out showing what the parent had there
        assert_eq!(inner.cell_at(0, 1).unwrap().ch(), 'b');

        // Own storage: writes do not reach the parent
        wprint!(inner, "zz").unwrap();
        assert_eq!(outer.cell_at(1, 1).unwrap().ch(), 'a');

        assert!(matches!(
            outer.derived_window(3, 3, 4, 4),
            Err(CursesError::OutOfBounds { .. })
        ));
        assert!(matches!(
            outer.sub_window(1, 1, -1, 0),
            Err(CursesError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_child_windows_with_huge_sizes_are_out_of_bounds() {
        let fx = testing::fixture(6, 6);
        assert!(matches!(
            fx.root.derived_window(1, i32::MAX, 0, 1),
            Err(CursesError::OutOfBounds { y: 0, x: i32::MAX })
        ));
        assert!(matches!(
            fx.root.sub_window(i32::MAX, 1, 1, 0),
            Err(CursesError::OutOfBounds { y: i32::MAX, x: 0 })
        ));
    }

    #[test]
    fn test_resize_to_huge_size_is_out_of_bounds() {
        let fx = testing::fixture(6, 6);
        let inner = fx.root.derived_window(3, 3, 2, 2).unwrap();
        assert!(matches!(
            inner.resize(i32::MAX, 3),
            Err(CursesError::OutOfBounds { y: i32::MAX, x: 4 })
        ));
        assert!(matches!(
            inner.resize(3, i32::MAX),
            Err(CursesError::OutOfBounds { .. })
        ));
        assert_eq!(inner.max_yx().unwrap(), (3, 3));
    }

    #[test]
    fn test_scroll_by_huge_amounts_blanks_window() {
        let fx = testing::fixture(3, 4);
        fx.root.set_scroll(true).unwrap();
        wprint!(fx.root, [1, 0], "ab").unwrap();
        fx.root.scroll(i32::MAX).unwrap();
        assert_eq!(fx.root.cell_at(1, 0).unwrap().ch(), ' ');

        wprint!(fx.root, [2, 0], "cd").unwrap();
        fx.root.scroll(i32::MIN).unwrap();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(fx.root.cell_at(y, x).unwrap().ch(), ' ');
            }
        }
    }

    #[test]
    fn test_strict_lines_with_huge_length_are_out_of_bounds() {
        let fx = testing::fixture_with(3, 5, strict_lines());
        assert!(matches!(
            fx.root.hline(1, 2, Chtype::from(b'-'), i32::MAX),
            Err(CursesError::OutOfBounds { y: 1, x: i32::MAX })
        ));
        assert!(matches!(
            fx.root.vline(1, 0, Chtype::from(b'|'), i32::MAX),
            Err(CursesError::OutOfBounds { y: i32::MAX, x: 0 })
        ));
        assert_eq!(fx.root.cell_at(1, 2).unwrap().ch(), ' ');
    }

    #[test]
    fn test_masks_outside_cell_layout_are_rejected() {
        let fx = testing::fixture(2, 4);
        fx.root.attr_on(Attr::BOLD).unwrap();
        assert!(matches!(
            fx.root.attr_on(Attr::CHARTEXT),
            Err(CursesError::InvalidArgument(_))
        ));
        assert!(matches!(
            fx.root.attr_set(Attr::from_bits_retain(1 << 30)),
            Err(CursesError::CellOverflow(_))
        ));
        assert!(matches!(
            fx.root.attr_off(Attr::from_bits_retain(b'x' as u32)),
            Err(CursesError::InvalidArgument(_))
        ));
        assert_eq!(fx.root.attributes().unwrap(), Attr::BOLD);

        let foreign = Chtype::from_bits(b'a' as u32 | 1 << 29);
        assert!(matches!(
            fx.root.add_char(foreign, Attr::NORMAL),
            Err(CursesError::CellOverflow(_))
        ));
        assert!(matches!(
            fx.root.add_char(Chtype::from(b'a'), Attr::CHARTEXT),
            Err(CursesError::InvalidArgument(_))
        ));
        assert!(matches!(
            fx.root.background(Background::new().attrs(Attr::CHARTEXT)),
            Err(CursesError::InvalidArgument(_))
        ));
        assert_eq!(fx.root.cell_at(0, 0).unwrap(), Chtype::BLANK);
        assert_eq!(fx.root.cursor().unwrap(), (0, 0));
    }

    #[test]
    fn test_sub_window_needs_sync_to_show_in_parent() {
        let fx = testing::fixture(4, 8);
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();

        let sub = fx.root.sub_window(2, 4, 1, 2).unwrap();
        wprint!(sub, [1, 0], "abcd").unwrap();
        // Shared cells, but the parent's rows are still clean
        assert_eq!(fx.root.cell_at(2, 2).unwrap().ch(), 'a');
        assert!(!fx.root.is_touched().unwrap());
        fx.root.refresh().unwrap();
        fx.session.update().unwrap();
        assert_eq!(fx.term.lines()[2], "        ");

        sub.sync(SyncMode::Down).unwrap();
        assert!(fx.root.is_touched().unwrap());
        fx.session.update().unwrap();
        assert_eq!(fx.term.lines()[2], "  abcd  ");
    }

    #[test]
    fn test_sync_up_marks_shared_descendants() {
        let fx = testing::fixture(4, 8);
        let sub = fx.root.sub_window(2, 2, 2, 0).unwrap();
        let derived = fx.root.derived_window(1, 1, 0, 0).unwrap();
        sub.touch().unwrap();
        fx.root.refresh().unwrap();
        sub.refresh().unwrap();
        derived.refresh().unwrap();
        fx.session.update().unwrap();

        wprint!(fx.root, [3, 0], "up").unwrap();
        fx.root.sync(SyncMode::Up).unwrap();
        assert!(sub.is_touched().unwrap());
        // Derived windows have their own cells
        assert!(!derived.is_touched().unwrap());

        fx.session.update().unwrap();
        assert_eq!(fx.term.lines()[3], "up      ");
        fx.root.sync(SyncMode::None).unwrap();
    }

    #[test]
    fn test_sync_cursor_moves_ancestors() {
        let fx = testing::fixture(10, 10);
        let outer = fx.session.new_window(6, 6, 2, 2).unwrap();
        let inner = outer.derived_window(3, 3, 1, 2).unwrap();
        inner.move_to(2, 1).unwrap();
        inner.sync(SyncMode::Cursor).unwrap();
        assert_eq!(outer.cursor().unwrap(), (3, 3));
    }

    #[test]
    fn test_background_replaces_old_background() {
        let fx = testing::fixture(2, 4);
        fx.session.start_color().unwrap();
        fx.session.init_pair(2, "white", "blue").unwrap();
        wprint!(fx.root, "ab").unwrap();

        fx.root
            .background(Background::new().ch(b'.').attrs(Attr::DIM).pair(2))
            .unwrap();
        let a = fx.root.cell_at(0, 0).unwrap();
        assert_eq!((a.ch(), a.attrs(), a.pair()), ('a', Attr::DIM, 2));
        let blank = fx.root.cell_at(1, 3).unwrap();
        assert_eq!((blank.ch(), blank.attrs(), blank.pair()), ('.', Attr::DIM, 2));

        // Replacing again drops the old background entirely
        fx.root.background(Background::new().attrs(Attr::BOLD)).unwrap();
        let blank = fx.root.cell_at(1, 3).unwrap();
        assert_eq!((blank.ch(), blank.attrs(), blank.pair()), (' ', Attr::BOLD, 0));
        let a = fx.root.cell_at(0, 0).unwrap();
        assert_eq!((a.ch(), a.attrs()), ('a', Attr::BOLD));

        // Erase fills with the background
        fx.root.erase().unwrap();
        assert_eq!(fx.root.cell_at(0, 0).unwrap().attrs(), Attr::BOLD);
        assert!(matches!(
            fx.root.background(Background::new().pair(900)),
            Err(CursesError::InvalidPairId(900))
        ));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let fx = testing::fixture(4, 4);
        wprint!(fx.root, [1, 1], "hi").unwrap();
        let copy = fx.root.duplicate().unwrap();
        assert_eq!(copy.cursor().unwrap(), (1, 3));
        assert_eq!(copy.cell_at(1, 1).unwrap().ch(), 'h');
        wprint!(copy, [1, 1], "yo").unwrap();
        assert_eq!(fx.root.cell_at(1, 1).unwrap().ch(), 'h');
        assert_ne!(copy, fx.root);
    }

    #[test]
    fn test_get_string_stops_at_bound() {
        let fx = testing::fixture(2, 20);
        fx.term.push_input(b"abcdefghij");
        let text = fx.root.get_string(5).unwrap();
        assert_eq!(text, "abcde");
        assert_eq!(fx.term.beeps(), 1);
        // The rest is still queued
        assert_eq!(fx.root.get_char().unwrap(), 'f' as i32);
    }

    #[test]
    fn test_get_string_edits_and_echoes() {
        let fx = testing::fixture(2, 20);
        fx.term.push_input(b"ab\x7fc\rrest");
        assert_eq!(fx.root.get_string(10).unwrap(), "ac");
        assert_eq!(fx.term.beeps(), 0);
        let echoed: String = (0..3).map(|x| fx.root.cell_at(0, x).unwrap().ch()).collect();
        assert_eq!(echoed, "ac ");

        fx.session.echo(false).unwrap();
        fx.term.push_input(b"\n");
        assert_eq!(fx.root.get_string(10).unwrap(), "rest");
        assert_eq!(fx.root.cursor().unwrap(), (0, 2));
    }

    #[test]
    fn test_get_string_zero_is_rejected() {
        let fx = testing::fixture(2, 2);
        fx.term.push_input(b"a");
        assert!(matches!(
            fx.root.get_string(0),
            Err(CursesError::InputOverflowRejected)
        ));
        assert_eq!(fx.term.pending_input(), 1);
    }

    #[test]
    fn test_get_char_keypad() {
        let fx = testing::fixture(2, 10);
        fx.session.echo(false).unwrap();
        fx.term.push_input(b"\x1b[A");
        assert_eq!(fx.root.get_char().unwrap(), 0x1b);
        assert_eq!(fx.root.get_char().unwrap(), b'[' as i32);
        assert_eq!(fx.root.get_char().unwrap(), b'A' as i32);

        fx.root.keypad(true).unwrap();
        fx.term.push_input(b"\x1b[A\x1b[D");
        assert_eq!(fx.root.get_char().unwrap(), KEY_UP);
        assert_eq!(fx.root.get_char().unwrap(), KEY_LEFT);
        assert!(matches!(fx.root.get_char(), Err(CursesError::TimedOut)));
    }
}
