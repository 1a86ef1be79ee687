//! Window layer - sessions, windows and screen updates.
//!
//! - **session**: `Session`, the one live terminal session and its screen update
//! - **window**: `Window` handles and every drawing/input operation on them
//! - **store**: generational arena holding window state and cell storage
//!
//! # Module Hierarchy
//!
//! ```text
//! wm/
//! ├── mod.rs      - Module exports
//! ├── session.rs  - Session (terminal, colors, mouse, update)
//! ├── window.rs   - Window (cells, cursor, attributes, input)
//! └── store.rs    - WindowStore (arena + shared storage views)
//! ```

pub mod session;
pub(crate) mod store;
pub mod window;

pub use session::Session;
pub use store::{WindowId, WindowKind};
pub use window::{Background, Origin, SyncMode, Window};
