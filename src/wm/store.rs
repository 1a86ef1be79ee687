//! Window slots
//!
//! Windows live in a generational arena. A handle carries the slot index and
//! the generation it was created in; once a slot is freed its generation is
//! bumped and every old handle to it reads as stale.
//!
//! Cell storage belongs to root and derived windows. A sub-window records the
//! owner of the storage it views plus its offset into it, so writes through
//! any view land in the same grid.

use crate::core::{Attr, Chtype, Grid};
use crate::error::{CursesError, Result};

/// Handle to a window slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId {
    index: u32,
    generation: u32,
}

/// How a window relates to its parent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowKind {
    Root,
    /// Own storage, confined to the parent
    Derived,
    /// View into an ancestor's storage
    Sub,
}

/// State of one live window
#[derive(Debug)]
pub(crate) struct WinState {
    pub kind: WindowKind,
    pub parent: Option<WindowId>,
    pub children: Vec<WindowId>,
    pub depth: usize,
    /// Origin on the screen
    pub begin_y: i32,
    pub begin_x: i32,
    /// Origin inside the parent
    pub par_y: i32,
    pub par_x: i32,
    pub height: usize,
    pub width: usize,
    /// Owned cells; `None` for sub-windows
    pub grid: Option<Grid>,
    /// Window owning the grid this one views (itself when it owns one)
    pub storage: Option<WindowId>,
    pub off_y: usize,
    pub off_x: usize,
    pub cury: usize,
    pub curx: usize,
    /// Styling applied to every write
    pub attrs: Attr,
    pub pair: u8,
    pub bkgd: Chtype,
    pub dirty: Vec<bool>,
    /// Repaint the whole region on the next update
    pub clear_ok: bool,
    pub keypad: bool,
    pub scroll: bool,
}

impl WinState {
    /// Fresh window with its own blank storage
    pub fn owned(kind: WindowKind, height: usize, width: usize, begin_y: i32, begin_x: i32) -> Self {
        Self::with_grid(
            kind,
            Some(Grid::new(height, width, Chtype::BLANK)),
            height,
            width,
            begin_y,
            begin_x,
        )
    }

    /// Sub-window viewing `storage` at the given offset
    pub fn view_of(storage: WindowId, off_y: usize, off_x: usize, height: usize, width: usize) -> Self {
        let mut state = Self::with_grid(WindowKind::Sub, None, height, width, 0, 0);
        state.storage = Some(storage);
        state.off_y = off_y;
        state.off_x = off_x;
        state
    }

    fn with_grid(
        kind: WindowKind,
        grid: Option<Grid>,
        height: usize,
        width: usize,
        begin_y: i32,
        begin_x: i32,
    ) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            depth: 0,
            begin_y,
            begin_x,
            par_y: 0,
            par_x: 0,
            height,
            width,
            grid,
            storage: None,
            off_y: 0,
            off_x: 0,
            cury: 0,
            curx: 0,
            attrs: Attr::NORMAL,
            pair: 0,
            bkgd: Chtype::BLANK,
            dirty: vec![true; height],
            clear_ok: false,
            keypad: false,
            scroll: false,
        }
    }

    pub fn touch_all(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = true);
    }
}

/// Where a window's cells live
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct View {
    pub storage: WindowId,
    pub off_y: usize,
    pub off_x: usize,
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    state: Option<WinState>,
}

/// Arena of window slots
#[derive(Debug, Default)]
pub(crate) struct WindowStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a window in a free slot. Owned windows become their own storage.
    pub fn insert(&mut self, mut state: WinState) -> WindowId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = WindowId {
            index,
            generation: slot.generation,
        };
        if state.grid.is_some() {
            state.storage = Some(id);
        }
        slot.state = Some(state);
        id
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: WindowId) -> Result<&WinState> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_ref())
            .ok_or(CursesError::StaleWindow)
    }

    pub fn get_mut(&mut self, id: WindowId) -> Result<&mut WinState> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.state.as_mut())
            .ok_or(CursesError::StaleWindow)
    }

    /// Storage location of a window
    pub fn view(&self, id: WindowId) -> Result<View> {
        let state = self.get(id)?;
        Ok(View {
            storage: state.storage.unwrap_or(id),
            off_y: state.off_y,
            off_x: state.off_x,
            height: state.height,
            width: state.width,
        })
    }

    pub fn grid(&self, storage: WindowId) -> Result<&Grid> {
        self.get(storage)?.grid.as_ref().ok_or(CursesError::StaleWindow)
    }

    pub fn grid_mut(&mut self, storage: WindowId) -> Result<&mut Grid> {
        self.get_mut(storage)?.grid.as_mut().ok_or(CursesError::StaleWindow)
    }

    /// Read a cell at view coordinates
    pub fn cell(&self, id: WindowId, y: usize, x: usize) -> Result<Chtype> {
        let view = self.view(id)?;
        if y >= view.height || x >= view.width {
            return Err(CursesError::OutOfBounds {
                y: y as i32,
                x: x as i32,
            });
        }
        self.grid(view.storage)?
            .get(view.off_y + y, view.off_x + x)
            .ok_or(CursesError::OutOfBounds {
                y: y as i32,
                x: x as i32,
            })
    }

    /// Write a cell at view coordinates and mark the row dirty. Writes
    /// outside the view are dropped.
    pub fn put(&mut self, id: WindowId, y: usize, x: usize, cell: Chtype) -> Result<()> {
        let view = self.view(id)?;
        if y >= view.height || x >= view.width {
            return Ok(());
        }
        self.grid_mut(view.storage)?
            .set(view.off_y + y, view.off_x + x, cell);
        self.get_mut(id)?.dirty[y] = true;
        Ok(())
    }

    /// Fill `len` cells of row `y` from column `x`, clipped to the view
    pub fn fill(&mut self, id: WindowId, y: usize, x: usize, len: usize, cell: Chtype) -> Result<()> {
        let view = self.view(id)?;
        if y >= view.height || x >= view.width {
            return Ok(());
        }
        let len = len.min(view.width - x);
        self.grid_mut(view.storage)?
            .fill(view.off_y + y, view.off_x + x, len, cell);
        self.get_mut(id)?.dirty[y] = true;
        Ok(())
    }

    /// Every window under `id`, depth first, `id` excluded
    pub fn descendants(&self, id: WindowId) -> Result<Vec<WindowId>> {
        let mut out = Vec::new();
        let mut stack = self.get(id)?.children.clone();
        while let Some(next) = stack.pop() {
            if let Ok(state) = self.get(next) {
                stack.extend(state.children.iter().copied());
                out.push(next);
            }
        }
        Ok(out)
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: WindowId) -> Result<Vec<WindowId>> {
        let mut out = Vec::new();
        let mut current = self.get(id)?.parent;
        while let Some(next) = current {
            out.push(next);
            current = self.get(next)?.parent;
        }
        Ok(out)
    }

    /// Remove a window and everything under it. Returns the removed ids.
    pub fn remove(&mut self, id: WindowId) -> Result<Vec<WindowId>> {
        let mut removed = self.descendants(id)?;
        removed.push(id);

        if let Some(parent) = self.get(id)?.parent {
            if let Ok(parent) = self.get_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        for gone in &removed {
            self.free_slot(*gone);
        }
        Ok(removed)
    }

    /// Free every slot; all outstanding handles become stale
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].state.is_some() {
                let generation = self.slots[index].generation;
                self.free_slot(WindowId {
                    index: index as u32,
                    generation,
                });
            }
        }
    }

    /// Number of live windows
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.state.is_some()).count()
    }

    fn free_slot(&mut self, id: WindowId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.state.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
            }
        }
    }
}
