//! Crossterm events to input bytes
//!
//! crossterm hands us parsed events, but the window layer decodes keys from
//! a byte stream (so that keypad mode can be switched off and ESC sequences
//! come through raw). Events are re-encoded here into the xterm sequences
//! [`KeyDecoder`](crate::input::KeyDecoder) understands.

use bitflags::bitflags;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

impl Modifiers {
    /// xterm modifier parameter (1 + shift + 2*alt + 4*ctrl)
    fn code(self) -> u8 {
        1 + if self.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if self.contains(Modifiers::ALT) { 2 } else { 0 }
            + if self.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}

/// Re-encodes crossterm events as terminal input bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Bytes for any event the input stream carries, `None` for the rest
    pub fn map_event(event: &Event) -> Option<Vec<u8>> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::map_key(key),
            Event::Mouse(mouse) => Self::encode_mouse(mouse),
            Event::Paste(text) => Some(text.as_bytes().to_vec()),
            Event::Resize(cols, rows) => Some(format!("\x1b[8;{};{}t", rows, cols).into_bytes()),
            _ => None,
        }
    }

    /// Bytes for a key press
    pub fn map_key(event: &KeyEvent) -> Option<Vec<u8>> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, mods)),
            KeyCode::Enter => Some(vec![b'\r']),
            KeyCode::Backspace => Some(vec![0x7f]),
            KeyCode::Tab => Some(vec![b'\t']),
            KeyCode::BackTab => Some(b"\x1b[Z".to_vec()),
            KeyCode::Esc => Some(vec![0x1b]),

            KeyCode::Up => Some(Self::csi_letter(b'A', mods)),
            KeyCode::Down => Some(Self::csi_letter(b'B', mods)),
            KeyCode::Right => Some(Self::csi_letter(b'C', mods)),
            KeyCode::Left => Some(Self::csi_letter(b'D', mods)),
            KeyCode::Home => Some(Self::csi_letter(b'H', mods)),
            KeyCode::End => Some(Self::csi_letter(b'F', mods)),

            KeyCode::Insert => Some(Self::tilde_key(2, mods)),
            KeyCode::Delete => Some(Self::tilde_key(3, mods)),
            KeyCode::PageUp => Some(Self::tilde_key(5, mods)),
            KeyCode::PageDown => Some(Self::tilde_key(6, mods)),

            KeyCode::F(n) => Self::function_key(n, mods),

            _ => None,
        }
    }

    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        if mods.contains(Modifiers::CTRL) {
            let ctrl = match ch {
                'a'..='z' => Some(ch as u8 - b'a' + 1),
                'A'..='Z' => Some(ch as u8 - b'A' + 1),
                '@' | ' ' => Some(0x00),
                '[' => Some(0x1b),
                '\\' => Some(0x1c),
                ']' => Some(0x1d),
                '^' => Some(0x1e),
                '_' => Some(0x1f),
                _ => None,
            };
            if let Some(code) = ctrl {
                return if mods.contains(Modifiers::ALT) {
                    vec![0x1b, code]
                } else {
                    vec![code]
                };
            }
        }

        let mut bytes = Vec::with_capacity(5);
        if mods.contains(Modifiers::ALT) {
            bytes.push(0x1b);
        }
        // Cells are Latin-1; anything wider comes through as UTF-8
        match u8::try_from(ch as u32) {
            Ok(byte) => bytes.push(byte),
            Err(_) => bytes.extend(ch.to_string().as_bytes()),
        }
        bytes
    }

    /// `ESC [ X` or `ESC [ 1 ; mod X`
    fn csi_letter(key: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            vec![0x1b, b'[', key]
        } else {
            format!("\x1b[1;{}{}", mods.code(), key as char).into_bytes()
        }
    }

    /// `ESC [ n ~` or `ESC [ n ; mod ~`
    fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
        if mods.is_empty() {
            format!("\x1b[{}~", code).into_bytes()
        } else {
            format!("\x1b[{};{}~", code, mods.code()).into_bytes()
        }
    }

    fn function_key(n: u8, mods: Modifiers) -> Option<Vec<u8>> {
        match n {
            1..=4 => {
                let key = b'P' + (n - 1);
                if mods.is_empty() {
                    Some(vec![0x1b, b'O', key])
                } else {
                    Some(format!("\x1b[1;{}{}", mods.code(), key as char).into_bytes())
                }
            }
            5 => Some(Self::tilde_key(15, mods)),
            6..=10 => Some(Self::tilde_key(n + 11, mods)),
            11 | 12 => Some(Self::tilde_key(n + 12, mods)),
            _ => None,
        }
    }

    /// SGR mouse report: `ESC [ < Cb ; Cx ; Cy M` (press) or `m` (release)
    pub fn encode_mouse(event: &MouseEvent) -> Option<Vec<u8>> {
        let (mut cb, pressed) = match event.kind {
            MouseEventKind::Down(btn) => (Self::button_code(btn), true),
            MouseEventKind::Up(btn) => (Self::button_code(btn), false),
            MouseEventKind::Drag(btn) => (Self::button_code(btn) + 32, true),
            MouseEventKind::Moved => (35, true),
            MouseEventKind::ScrollUp => (64, true),
            MouseEventKind::ScrollDown => (65, true),
            MouseEventKind::ScrollLeft | MouseEventKind::ScrollRight => return None,
        };

        if event.modifiers.contains(KeyModifiers::SHIFT) {
            cb += 4;
        }
        if event.modifiers.contains(KeyModifiers::ALT) {
            cb += 8;
        }
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            cb += 16;
        }

        let suffix = if pressed { 'M' } else { 'm' };
        Some(
            format!(
                "\x1b[<{};{};{}{}",
                cb,
                event.column.saturating_add(1),
                event.row.saturating_add(1),
                suffix
            )
            .into_bytes(),
        )
    }

    fn button_code(button: MouseButton) -> u16 {
        match button {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        }
    }
}
