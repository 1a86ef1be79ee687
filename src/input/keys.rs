//! Key codes, key names and input byte decoding
//!
//! Key codes use the curses numbering so that application code written
//! against curses constants keeps working. Byte sequences arriving from the
//! terminal are turned into key codes here; mouse reports embedded in the
//! stream come out as [`Decoded::Mouse`].

use std::collections::VecDeque;
use std::sync::OnceLock;

use super::mouse::{MouseMask, MouseReport, ReportKind};

pub const KEY_DOWN: i32 = 0o402;
pub const KEY_UP: i32 = 0o403;
pub const KEY_LEFT: i32 = 0o404;
pub const KEY_RIGHT: i32 = 0o405;
pub const KEY_HOME: i32 = 0o406;
pub const KEY_BACKSPACE: i32 = 0o407;
pub const KEY_F0: i32 = 0o410;
pub const KEY_DC: i32 = 0o512;
pub const KEY_IC: i32 = 0o513;
pub const KEY_NPAGE: i32 = 0o522;
pub const KEY_PPAGE: i32 = 0o523;
pub const KEY_ENTER: i32 = 0o527;
pub const KEY_BTAB: i32 = 0o541;
pub const KEY_END: i32 = 0o550;
pub const KEY_MOUSE: i32 = 0o631;
pub const KEY_RESIZE: i32 = 0o632;

/// Highest function key number with a name
pub const MAX_FUNCTION_KEY: i32 = 12;

const ESC: u8 = 0x1b;

/// Code of function key `n`
pub const fn key_f(n: i32) -> i32 {
    KEY_F0 + n
}

const FUNCTION_NAMES: [&str; 13] = [
    "F0", "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

fn key_table() -> &'static [(i32, &'static str)] {
    static TABLE: OnceLock<Vec<(i32, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![
            (9, "tab"),
            (10, "enter"),
            (KEY_DOWN, "down"),
            (KEY_UP, "up"),
            (KEY_LEFT, "left"),
            (KEY_RIGHT, "right"),
            (KEY_HOME, "home"),
            (KEY_END, "end"),
            (KEY_BACKSPACE, "backspace"),
            (KEY_DC, "dc"),
            (KEY_IC, "ic"),
            (KEY_NPAGE, "npage"),
            (KEY_PPAGE, "ppage"),
            (KEY_BTAB, "btab"),
            (KEY_ENTER, "enter"),
            (KEY_MOUSE, "mouse"),
            (KEY_RESIZE, "resize"),
        ];
        table.extend((0..=MAX_FUNCTION_KEY).map(|n| (key_f(n), FUNCTION_NAMES[n as usize])));
        table
    })
}

/// Symbolic name of a key code, or the code rendered as a character
pub fn key_name(code: i32) -> String {
    match key_table().iter().find(|(c, _)| *c == code) {
        Some((_, name)) => name.to_string(),
        None => u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string(),
    }
}

/// One unit of decoded input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    Key(i32),
    Mouse(MouseReport),
}

/// Byte stream to key code decoder
pub struct KeyDecoder;

impl KeyDecoder {
    /// Take one key off the front of `input`.
    ///
    /// With `keypad` off every byte is its own key. With it on, escape
    /// sequences for the special keys and mouse reports are recognized; an
    /// escape that does not start a complete known sequence is returned as a
    /// plain ESC and the rest of the bytes follow one by one.
    pub fn next(input: &mut VecDeque<u8>, keypad: bool) -> Option<Decoded> {
        let first = *input.front()?;
        if !keypad {
            input.pop_front();
            return Some(Decoded::Key(first as i32));
        }
        if first == 0x7f {
            input.pop_front();
            return Some(Decoded::Key(KEY_BACKSPACE));
        }
        if first == ESC {
            let bytes: Vec<u8> = input.iter().copied().collect();
            if let Some((used, decoded)) = Self::parse_sequence(&bytes) {
                input.drain(..used);
                return Some(decoded);
            }
        }
        input.pop_front();
        Some(Decoded::Key(first as i32))
    }

    /// Parse an escape sequence at the start of `bytes`
    fn parse_sequence(bytes: &[u8]) -> Option<(usize, Decoded)> {
        match bytes.get(1)? {
            b'O' => {
                let key = match bytes.get(2)? {
                    b'A' => KEY_UP,
                    b'B' => KEY_DOWN,
                    b'C' => KEY_RIGHT,
                    b'D' => KEY_LEFT,
                    b'H' => KEY_HOME,
                    b'F' => KEY_END,
                    b'M' => KEY_ENTER,
                    b @ b'P'..=b'S' => key_f((b - b'P') as i32 + 1),
                    _ => return None,
                };
                Some((3, Decoded::Key(key)))
            }
            b'[' => match bytes.get(2)? {
                b'<' => Self::parse_sgr_mouse(bytes),
                b'M' => Self::parse_x10_mouse(bytes),
                _ => Self::parse_csi_key(bytes),
            },
            _ => None,
        }
    }

    /// `ESC [ params final`
    fn parse_csi_key(bytes: &[u8]) -> Option<(usize, Decoded)> {
        let end = bytes[2..].iter().position(|b| (0x40..=0x7e).contains(b))? + 2;
        let params: Vec<u16> = std::str::from_utf8(&bytes[2..end])
            .ok()?
            .split(';')
            .map(|p| if p.is_empty() { Some(1) } else { p.parse().ok() })
            .collect::<Option<_>>()?;

        let key = match bytes[end] {
            b'A' => KEY_UP,
            b'B' => KEY_DOWN,
            b'C' => KEY_RIGHT,
            b'D' => KEY_LEFT,
            b'H' => KEY_HOME,
            b'F' => KEY_END,
            b'Z' => KEY_BTAB,
            // Window size report: CSI 8 ; rows ; cols t
            b't' if params.first() == Some(&8) => KEY_RESIZE,
            b @ b'P'..=b'S' => key_f((b - b'P') as i32 + 1),
            b'~' => match params.first().copied()? {
                1 | 7 => KEY_HOME,
                2 => KEY_IC,
                3 => KEY_DC,
                4 | 8 => KEY_END,
                5 => KEY_PPAGE,
                6 => KEY_NPAGE,
                n @ 11..=15 => key_f(n as i32 - 10),
                n @ 17..=21 => key_f(n as i32 - 11),
                n @ 23..=24 => key_f(n as i32 - 12),
                _ => return None,
            },
            _ => return None,
        };
        Some((end + 1, Decoded::Key(key)))
    }

    /// `ESC [ < Cb ; Cx ; Cy M` (press) or `... m` (release), 1-based coordinates
    fn parse_sgr_mouse(bytes: &[u8]) -> Option<(usize, Decoded)> {
        let end = bytes[3..].iter().position(|b| *b == b'M' || *b == b'm')? + 3;
        let fields: Vec<u16> = std::str::from_utf8(&bytes[3..end])
            .ok()?
            .split(';')
            .map(|p| p.parse().ok())
            .collect::<Option<_>>()?;
        let [cb, cx, cy] = fields[..] else {
            return None;
        };
        let report = Self::mouse_report(
            cb,
            bytes[end] == b'm',
            cx.saturating_sub(1),
            cy.saturating_sub(1),
        );
        Some((end + 1, Decoded::Mouse(report)))
    }

    /// `ESC [ M Cb Cx Cy`, each offset by 32, 1-based coordinates
    fn parse_x10_mouse(bytes: &[u8]) -> Option<(usize, Decoded)> {
        let raw = bytes.get(3..6)?;
        let cb = raw[0].checked_sub(32)? as u16;
        let x = raw[1].checked_sub(33)? as u16;
        let y = raw[2].checked_sub(33)? as u16;
        // X10 has no release button; button bits 3 mean "released"
        let release = cb & 0b11 == 3 && cb & 64 == 0;
        Some((6, Decoded::Mouse(Self::mouse_report(cb, release, x, y))))
    }

    fn mouse_report(cb: u16, release: bool, x: u16, y: u16) -> MouseReport {
        let mut modifiers = MouseMask::empty();
        if cb & 4 != 0 {
            modifiers |= MouseMask::BUTTON_SHIFT;
        }
        if cb & 8 != 0 {
            modifiers |= MouseMask::BUTTON_ALT;
        }
        if cb & 16 != 0 {
            modifiers |= MouseMask::BUTTON_CTRL;
        }

        let low = (cb & 0b11) as u8;
        let (kind, button) = if cb & 64 != 0 {
            // Wheel: up is button 4, down is button 5
            (ReportKind::Press, 4 + low.min(1))
        } else if cb & 32 != 0 {
            (ReportKind::Motion, if low == 3 { 0 } else { low + 1 })
        } else if release {
            (ReportKind::Release, if low == 3 { 0 } else { low + 1 })
        } else {
            (ReportKind::Press, low + 1)
        };

        MouseReport {
            kind,
            button,
            x,
            y,
            modifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8], keypad: bool) -> Vec<Decoded> {
        let mut input: VecDeque<u8> = bytes.iter().copied().collect();
        let mut out = Vec::new();
        while let Some(decoded) = KeyDecoder::next(&mut input, keypad) {
            out.push(decoded);
        }
        out
    }

    fn keys(bytes: &[u8], keypad: bool) -> Vec<i32> {
        decode_all(bytes, keypad)
            .into_iter()
            .map(|d| match d {
                Decoded::Key(k) => k,
                Decoded::Mouse(_) => KEY_MOUSE,
            })
            .collect()
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(KEY_DOWN), "down");
        assert_eq!(key_name(KEY_ENTER), "enter");
        assert_eq!(key_name(10), "enter");
        assert_eq!(key_name(9), "tab");
        assert_eq!(key_name(KEY_MOUSE), "mouse");
        assert_eq!(key_name(KEY_BACKSPACE), "backspace");
        assert_eq!(key_name('q' as i32), "q");
        assert_eq!(key_name(-1), "\u{fffd}");
    }

    #[test]
    fn test_function_keys_follow_offset_rule() {
        for n in 0..=MAX_FUNCTION_KEY {
            assert_eq!(key_name(KEY_F0 + n), format!("F{}", n));
        }
        assert_eq!(key_f(12), 0o424);
        // One past the table is not a function key
        assert_ne!(key_name(KEY_F0 + 13), "F13");
    }

    #[test]
    fn test_arrow_and_function_sequences() {
        assert_eq!(
            keys(b"\x1b[A\x1b[B\x1bOC\x1b[D", true),
            vec![KEY_UP, KEY_DOWN, KEY_RIGHT, KEY_LEFT]
        );
        assert_eq!(
            keys(b"\x1bOP\x1b[15~\x1b[24~\x1b[1;5A", true),
            vec![key_f(1), key_f(5), key_f(12), KEY_UP]
        );
        assert_eq!(
            keys(b"\x1b[H\x1b[4~\x1b[5~\x1b[6~\x1b[3~\x1b[Z", true),
            vec![KEY_HOME, KEY_END, KEY_PPAGE, KEY_NPAGE, KEY_DC, KEY_BTAB]
        );
    }

    #[test]
    fn test_keypad_off_passes_bytes() {
        assert_eq!(keys(b"\x1b[A", false), vec![27, b'[' as i32, b'A' as i32]);
        assert_eq!(keys(b"\x7f", false), vec![0x7f]);
        assert_eq!(keys(b"\x7f", true), vec![KEY_BACKSPACE]);
    }

    #[test]
    fn test_incomplete_sequence_falls_back_to_bytes() {
        assert_eq!(keys(b"\x1b[", true), vec![27, b'[' as i32]);
        assert_eq!(keys(b"\x1bx", true), vec![27, b'x' as i32]);
    }

    #[test]
    fn test_sgr_mouse_reports() {
        let decoded = decode_all(b"\x1b[<0;11;21M\x1b[<0;11;21m\x1b[<22;1;1M", true);
        assert_eq!(decoded.len(), 3);

        let Decoded::Mouse(press) = decoded[0] else { panic!("expected mouse") };
        assert_eq!(press.kind, ReportKind::Press);
        assert_eq!((press.button, press.x, press.y), (1, 10, 20));

        let Decoded::Mouse(release) = decoded[1] else { panic!("expected mouse") };
        assert_eq!(release.kind, ReportKind::Release);

        // 22 = right button + shift + ctrl
        let Decoded::Mouse(mods) = decoded[2] else { panic!("expected mouse") };
        assert_eq!(mods.button, 3);
        assert_eq!(mods.modifiers, MouseMask::BUTTON_SHIFT | MouseMask::BUTTON_CTRL);
    }

    #[test]
    fn test_x10_and_wheel_reports() {
        let decoded = decode_all(&[0x1b, b'[', b'M', 34, 43, 38, 0x1b, b'[', b'M', 35, 33, 33], true);
        let Decoded::Mouse(press) = decoded[0] else { panic!("expected mouse") };
        assert_eq!((press.kind, press.button, press.x, press.y), (ReportKind::Press, 3, 10, 5));
        let Decoded::Mouse(release) = decoded[1] else { panic!("expected mouse") };
        assert_eq!((release.kind, release.button), (ReportKind::Release, 0));

        let decoded = decode_all(b"\x1b[<64;6;6M\x1b[<65;6;6M", true);
        let Decoded::Mouse(up) = decoded[0] else { panic!("expected mouse") };
        let Decoded::Mouse(down) = decoded[1] else { panic!("expected mouse") };
        assert_eq!((up.kind, up.button), (ReportKind::Press, 4));
        assert_eq!((down.kind, down.button), (ReportKind::Press, 5));
    }
}
