//! Shared test fixtures

use std::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::ui::HeadlessTerminal;
use crate::wm::{Session, Window};

/// Only one session may be live per process, so session tests take turns
pub(crate) static LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn lock() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A live session on a headless terminal. Fields drop in declaration
/// order, so the session is gone before the lock is released.
pub(crate) struct Fixture {
    pub session: Session,
    pub root: Window,
    pub term: HeadlessTerminal,
    _guard: MutexGuard<'static, ()>,
}

pub(crate) fn fixture(rows: u16, cols: u16) -> Fixture {
    fixture_with(rows, cols, Config::default())
}

pub(crate) fn fixture_with(rows: u16, cols: u16, config: Config) -> Fixture {
    let guard = lock();
    let term = HeadlessTerminal::new(rows, cols);
    let (session, root) = Session::init_with_config(term.clone(), config).unwrap();
    Fixture {
        session,
        root,
        term,
        _guard: guard,
    }
}
