//! Input decoding.
//!
//! - **keys**: key codes, key names, byte-sequence decoding
//! - **mouse**: mouse event names, masks, click resolution

pub mod keys;
pub mod mouse;

pub use keys::{key_name, Decoded, KeyDecoder};
pub use mouse::{MouseEvent, MouseEventCodec, MouseMask, MouseReport, ReportKind};
