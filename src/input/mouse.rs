//! Mouse event names, masks and decoding
//!
//! Masks follow the curses mouse-version-2 layout: five bits per button
//! (released, pressed, clicked, double, triple) for buttons 1 to 5, then the
//! modifier bits and the position-report bit.

use std::time::{Duration, Instant};

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::error::{CursesError, Result};

bitflags! {
    /// Mouse event state bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseMask: u32 {
        const BUTTON1_RELEASED       = 0o1;
        const BUTTON1_PRESSED        = 0o2;
        const BUTTON1_CLICKED        = 0o4;
        const BUTTON1_DOUBLE_CLICKED = 0o10;
        const BUTTON1_TRIPLE_CLICKED = 0o20;
        const BUTTON2_RELEASED       = 0o1 << 5;
        const BUTTON2_PRESSED        = 0o2 << 5;
        const BUTTON2_CLICKED        = 0o4 << 5;
        const BUTTON2_DOUBLE_CLICKED = 0o10 << 5;
        const BUTTON2_TRIPLE_CLICKED = 0o20 << 5;
        const BUTTON3_RELEASED       = 0o1 << 10;
        const BUTTON3_PRESSED        = 0o2 << 10;
        const BUTTON3_CLICKED        = 0o4 << 10;
        const BUTTON3_DOUBLE_CLICKED = 0o10 << 10;
        const BUTTON3_TRIPLE_CLICKED = 0o20 << 10;
        const BUTTON4_RELEASED       = 0o1 << 15;
        const BUTTON4_PRESSED        = 0o2 << 15;
        const BUTTON4_CLICKED        = 0o4 << 15;
        const BUTTON4_DOUBLE_CLICKED = 0o10 << 15;
        const BUTTON4_TRIPLE_CLICKED = 0o20 << 15;
        const BUTTON5_RELEASED       = 0o1 << 20;
        const BUTTON5_PRESSED        = 0o2 << 20;
        const BUTTON5_CLICKED        = 0o4 << 20;
        const BUTTON5_DOUBLE_CLICKED = 0o10 << 20;
        const BUTTON5_TRIPLE_CLICKED = 0o20 << 20;
        const BUTTON_CTRL            = 1 << 25;
        const BUTTON_SHIFT           = 1 << 26;
        const BUTTON_ALT             = 1 << 27;
        const REPORT_MOUSE_POSITION  = 1 << 28;
        const ALL_MOUSE_EVENTS       = (1 << 28) - 1;
    }
}

const MODIFIERS: MouseMask = MouseMask::BUTTON_CTRL
    .union(MouseMask::BUTTON_SHIFT)
    .union(MouseMask::BUTTON_ALT);

/// Stable mouse event vocabulary
const MOUSE_NAMES: &[(&str, MouseMask)] = &[
    ("button1-pressed", MouseMask::BUTTON1_PRESSED),
    ("button1-released", MouseMask::BUTTON1_RELEASED),
    ("button1-clicked", MouseMask::BUTTON1_CLICKED),
    ("button1-double-clicked", MouseMask::BUTTON1_DOUBLE_CLICKED),
    ("button1-triple-clicked", MouseMask::BUTTON1_TRIPLE_CLICKED),
    ("button2-pressed", MouseMask::BUTTON2_PRESSED),
    ("button2-released", MouseMask::BUTTON2_RELEASED),
    ("button2-clicked", MouseMask::BUTTON2_CLICKED),
    ("button2-double-clicked", MouseMask::BUTTON2_DOUBLE_CLICKED),
    ("button2-triple-clicked", MouseMask::BUTTON2_TRIPLE_CLICKED),
    ("button3-pressed", MouseMask::BUTTON3_PRESSED),
    ("button3-released", MouseMask::BUTTON3_RELEASED),
    ("button3-clicked", MouseMask::BUTTON3_CLICKED),
    ("button3-double-clicked", MouseMask::BUTTON3_DOUBLE_CLICKED),
    ("button3-triple-clicked", MouseMask::BUTTON3_TRIPLE_CLICKED),
    ("button4-pressed", MouseMask::BUTTON4_PRESSED),
    ("button4-released", MouseMask::BUTTON4_RELEASED),
    ("button4-clicked", MouseMask::BUTTON4_CLICKED),
    ("button4-double-clicked", MouseMask::BUTTON4_DOUBLE_CLICKED),
    ("button4-triple-clicked", MouseMask::BUTTON4_TRIPLE_CLICKED),
    ("shift", MouseMask::BUTTON_SHIFT),
    ("ctrl", MouseMask::BUTTON_CTRL),
    ("alt", MouseMask::BUTTON_ALT),
    ("all", MouseMask::ALL_MOUSE_EVENTS),
    ("position", MouseMask::REPORT_MOUSE_POSITION),
];

fn button_bits(button: u8, shift: u32) -> MouseMask {
    if (1..=5).contains(&button) {
        MouseMask::from_bits_retain(1 << (shift + 5 * (button as u32 - 1)))
    } else {
        MouseMask::empty()
    }
}

impl MouseMask {
    pub fn released(button: u8) -> Self {
        button_bits(button, 0)
    }

    pub fn pressed(button: u8) -> Self {
        button_bits(button, 1)
    }

    pub fn clicked(button: u8) -> Self {
        button_bits(button, 2)
    }

    /// Names of the individual events carried by this mask
    pub fn names(self) -> Vec<&'static str> {
        MOUSE_NAMES
            .iter()
            .filter(|(name, bits)| *name != "all" && self.contains(*bits))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// What the input stream reported, before masking and click resolution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Press,
    Release,
    Motion,
}

/// A protocol-level mouse report decoded from the input byte stream.
/// `button` is 1..=5, or 0 when the protocol does not say (X10 release).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseReport {
    pub kind: ReportKind,
    pub button: u8,
    pub x: u16,
    pub y: u16,
    pub modifiers: MouseMask,
}

/// A decoded mouse event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub id: i16,
    pub bstate: MouseMask,
}

impl MouseEvent {
    pub fn names(&self) -> Vec<&'static str> {
        self.bstate.names()
    }

    /// Whether the event carries the named event. Unknown names never match.
    pub fn is(&self, name: &str) -> bool {
        MOUSE_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .is_some_and(|(_, bits)| self.bstate.intersects(*bits))
    }
}

/// Translates between symbolic mouse names, masks and reports
#[derive(Debug)]
pub struct MouseEventCodec {
    strict: bool,
    active: MouseMask,
    interval: Duration,
    last_press: Option<(u8, Instant)>,
}

impl MouseEventCodec {
    pub fn new(strict: bool, interval: Duration) -> Self {
        Self {
            strict,
            active: MouseMask::empty(),
            interval,
            last_press: None,
        }
    }

    /// Union of the named events. Unknown names are left out of the union
    /// unless the codec is strict, in which case they are an error.
    pub fn resolve_mask<I, S>(&self, names: I) -> Result<MouseMask>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mask = MouseMask::empty();
        for name in names {
            let name = name.as_ref();
            match MOUSE_NAMES.iter().find(|(n, _)| *n == name) {
                Some((_, bits)) => mask |= *bits,
                None if self.strict => {
                    return Err(CursesError::UnknownMouseEvent(name.to_string()));
                }
                None => warn!("Ignoring unknown mouse event name: {}", name),
            }
        }
        Ok(mask)
    }

    /// Replace the active mask, returning the previous one
    pub fn enable(&mut self, mask: MouseMask) -> MouseMask {
        let previous = self.active;
        self.active = mask;
        self.last_press = None;
        previous
    }

    pub fn active(&self) -> MouseMask {
        self.active
    }

    /// Decode a raw state word (as carried by a curses `MEVENT`)
    pub fn decode(&self, x: i32, y: i32, z: i32, id: i16, bstate: u32) -> MouseEvent {
        MouseEvent {
            x,
            y,
            z,
            id,
            bstate: MouseMask::from_bits_truncate(bstate),
        }
    }

    /// Resolve a report into an event, or `None` when the active mask does
    /// not ask for it
    pub fn translate(&mut self, report: MouseReport, now: Instant) -> Option<MouseEvent> {
        let events = match report.kind {
            ReportKind::Press => {
                self.last_press = Some((report.button, now));
                MouseMask::pressed(report.button)
            }
            ReportKind::Release => {
                let pressed = self.last_press.take();
                let button = match (report.button, pressed) {
                    (0, Some((held, _))) => held,
                    (button, _) => button,
                };
                let quick = pressed.is_some_and(|(held, at)| {
                    held == button && now.saturating_duration_since(at) <= self.interval
                });
                if quick && self.active.contains(MouseMask::clicked(button)) {
                    MouseMask::clicked(button)
                } else {
                    MouseMask::released(button)
                }
            }
            ReportKind::Motion => MouseMask::REPORT_MOUSE_POSITION,
        };

        if !self.active.intersects(events) {
            debug!("Dropping unrequested mouse report: {:?}", report);
            return None;
        }

        Some(MouseEvent {
            x: report.x as i32,
            y: report.y as i32,
            z: 0,
            id: 0,
            bstate: events | (report.modifiers & MODIFIERS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> MouseEventCodec {
        MouseEventCodec::new(false, Duration::from_millis(166))
    }

    fn report(kind: ReportKind, button: u8) -> MouseReport {
        MouseReport {
            kind,
            button,
            x: 4,
            y: 2,
            modifiers: MouseMask::empty(),
        }
    }

    #[test]
    fn test_resolve_and_decode_round_trip() {
        let codec = codec();
        let mask = codec.resolve_mask(["button1-clicked", "shift"]).unwrap();
        assert_eq!(mask, MouseMask::BUTTON1_CLICKED | MouseMask::BUTTON_SHIFT);

        let event = codec.decode(3, 7, 0, 0, mask.bits());
        assert_eq!(event.names(), vec!["button1-clicked", "shift"]);
        assert!(event.is("shift"));
        assert!(!event.is("button1-pressed"));
    }

    #[test]
    fn test_unknown_names_are_dropped_by_default() {
        let codec = codec();
        assert_eq!(
            codec.resolve_mask(["nonexistent-event"]).unwrap(),
            MouseMask::empty()
        );
        assert_eq!(
            codec.resolve_mask(["nonexistent-event", "ctrl"]).unwrap(),
            MouseMask::BUTTON_CTRL
        );
    }

    #[test]
    fn test_unknown_names_rejected_when_strict() {
        let codec = MouseEventCodec::new(true, Duration::from_millis(166));
        match codec.resolve_mask(["button2-pressed", "nonexistent-event"]) {
            Err(CursesError::UnknownMouseEvent(name)) => assert_eq!(name, "nonexistent-event"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(codec.resolve_mask(["button2-pressed"]).is_ok());
    }

    #[test]
    fn test_mask_values_match_curses_layout() {
        assert_eq!(MouseMask::BUTTON1_CLICKED.bits(), 0x4);
        assert_eq!(MouseMask::BUTTON3_PRESSED.bits(), 0x800);
        assert_eq!(MouseMask::BUTTON_SHIFT.bits(), 0x400_0000);
        assert_eq!(MouseMask::ALL_MOUSE_EVENTS.bits(), 0xfff_ffff);
        assert_eq!(MouseMask::pressed(4), MouseMask::BUTTON4_PRESSED);
        assert_eq!(MouseMask::clicked(9), MouseMask::empty());
        // `all` is not reported as an individual event name
        assert!(!MouseMask::ALL_MOUSE_EVENTS.names().contains(&"all"));
    }

    #[test]
    fn test_enable_returns_previous_mask() {
        let mut codec = codec();
        assert_eq!(codec.enable(MouseMask::BUTTON1_PRESSED), MouseMask::empty());
        assert_eq!(
            codec.enable(MouseMask::ALL_MOUSE_EVENTS),
            MouseMask::BUTTON1_PRESSED
        );
        assert_eq!(codec.active(), MouseMask::ALL_MOUSE_EVENTS);
    }

    #[test]
    fn test_quick_release_becomes_click() {
        let mut codec = codec();
        codec.enable(MouseMask::BUTTON1_PRESSED | MouseMask::BUTTON1_CLICKED);
        let t0 = Instant::now();

        let press = codec.translate(report(ReportKind::Press, 1), t0).unwrap();
        assert_eq!(press.bstate, MouseMask::BUTTON1_PRESSED);
        assert_eq!((press.x, press.y), (4, 2));

        let click = codec
            .translate(report(ReportKind::Release, 0), t0 + Duration::from_millis(50))
            .unwrap();
        assert_eq!(click.bstate, MouseMask::BUTTON1_CLICKED);
    }

    #[test]
    fn test_slow_release_and_masking() {
        let mut codec = codec();
        codec.enable(MouseMask::BUTTON1_CLICKED | MouseMask::BUTTON1_RELEASED);
        let t0 = Instant::now();

        // Press is not in the mask
        assert!(codec.translate(report(ReportKind::Press, 1), t0).is_none());
        let release = codec
            .translate(report(ReportKind::Release, 1), t0 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(release.bstate, MouseMask::BUTTON1_RELEASED);

        // Motion needs the position bit
        assert!(codec.translate(report(ReportKind::Motion, 0), t0).is_none());
    }

    #[test]
    fn test_modifiers_carried() {
        let mut codec = codec();
        codec.enable(MouseMask::ALL_MOUSE_EVENTS);
        let mut shifted = report(ReportKind::Press, 3);
        shifted.modifiers = MouseMask::BUTTON_SHIFT | MouseMask::BUTTON_CTRL;
        let event = codec.translate(shifted, Instant::now()).unwrap();
        assert_eq!(event.names(), vec!["button3-pressed", "shift", "ctrl"]);
    }
}
