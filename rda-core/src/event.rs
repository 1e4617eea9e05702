//! Input event model and its on-wire text encoding.
//!
//! ## Wire format
//!
//! One event per frame, as a UTF-8 JSON array `[kind, ...fields]`:
//!
//! ```text
//! ["MOUSE_MOVE",   x, y]
//! ["MOUSE_CLICK",  x, y, button, pressed]
//! ["MOUSE_SCROLL", x, y, dx, dy]
//! ["KEY_DOWN",     key]
//! ["KEY_UP",       key]
//! ```
//!
//! Coordinates are fractions of the *sender's* screen in `[0, 1]`,
//! re-scaled against the *receiver's* [`ScreenDimensions`] at replay
//! time, so the two sides may run different resolutions. Button codes
//! are `1` (left), `2` (right), `0` (middle). A key is either one
//! printable character or a symbolic name carried with the `Key.`
//! prefix; the prefix form round-trips losslessly even when the name
//! itself contains the marker.

use serde_json::{Value, json};

use crate::error::RdaError;

// ── Wire kind tags ───────────────────────────────────────────────

const KIND_MOUSE_MOVE: &str = "MOUSE_MOVE";
const KIND_MOUSE_CLICK: &str = "MOUSE_CLICK";
const KIND_MOUSE_SCROLL: &str = "MOUSE_SCROLL";
const KIND_KEY_DOWN: &str = "KEY_DOWN";
const KIND_KEY_UP: &str = "KEY_UP";

// ── ScreenDimensions ─────────────────────────────────────────────

/// The pixel dimensions of one side's display.
///
/// Passed explicitly to whatever normalizes or replays coordinates;
/// there is no process-wide display lookup, so tests and multiple
/// sessions can each use their own simulated dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenDimensions {
    pub width: u32,
    pub height: u32,
}

impl ScreenDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel position to `[0, 1]` fractions of this display.
    pub fn normalize(&self, px: f64, py: f64) -> (f64, f64) {
        let x = if self.width == 0 { 0.0 } else { px / self.width as f64 };
        let y = if self.height == 0 { 0.0 } else { py / self.height as f64 };
        (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    /// `[0, 1]` fractions back to pixel position on this display.
    pub fn to_pixels(&self, nx: f64, ny: f64) -> (f64, f64) {
        (nx * self.width as f64, ny * self.height as f64)
    }
}

// ── MouseButton ──────────────────────────────────────────────────

/// Mouse button identity with its wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Wire code: left 1, right 2, middle 0.
    pub fn code(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Right => 2,
            MouseButton::Middle => 0,
        }
    }

    pub fn from_code(code: u64) -> Result<Self, RdaError> {
        match code {
            1 => Ok(MouseButton::Left),
            2 => Ok(MouseButton::Right),
            0 => Ok(MouseButton::Middle),
            other => Err(RdaError::Encoding(format!("unknown button code {other}"))),
        }
    }
}

// ── Key ──────────────────────────────────────────────────────────

/// Marker prefix carried by symbolic (non-printable) key names.
pub const SYMBOLIC_KEY_PREFIX: &str = "Key.";

/// A keyboard key: one printable character, or a symbolic name such
/// as `enter` or `f5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Named(String),
}

impl Key {
    /// Text form carried on the wire.
    pub fn encode(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Named(name) => format!("{SYMBOLIC_KEY_PREFIX}{name}"),
        }
    }

    /// Parse the wire form. The prefix always wins, so a name that
    /// itself contains the marker survives a round trip.
    pub fn decode(text: &str) -> Result<Self, RdaError> {
        if let Some(name) = text.strip_prefix(SYMBOLIC_KEY_PREFIX) {
            if name.is_empty() {
                return Err(RdaError::Encoding("empty symbolic key name".into()));
            }
            return Ok(Key::Named(name.to_string()));
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Key::Char(c)),
            _ => Err(RdaError::Encoding(format!("unrecognized key {text:?}"))),
        }
    }
}

// ── InputEvent ───────────────────────────────────────────────────

/// One captured input event, as carried on a mouse or keyboard channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    MouseMove { x: f64, y: f64 },
    MouseClick { x: f64, y: f64, button: MouseButton, pressed: bool },
    MouseScroll { x: f64, y: f64, dx: i32, dy: i32 },
    KeyDown { key: Key },
    KeyUp { key: Key },
}

impl InputEvent {
    /// Mouse move at normalized coordinates (clamped into `[0, 1]`).
    pub fn mouse_move(x: f64, y: f64) -> Self {
        InputEvent::MouseMove {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }

    pub fn mouse_click(x: f64, y: f64, button: MouseButton, pressed: bool) -> Self {
        InputEvent::MouseClick {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            button,
            pressed,
        }
    }

    pub fn mouse_scroll(x: f64, y: f64, dx: i32, dy: i32) -> Self {
        InputEvent::MouseScroll {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            dx,
            dy,
        }
    }

    pub fn key_down(key: Key) -> Self {
        InputEvent::KeyDown { key }
    }

    pub fn key_up(key: Key) -> Self {
        InputEvent::KeyUp { key }
    }

    /// The wire kind tag, also useful in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            InputEvent::MouseMove { .. } => KIND_MOUSE_MOVE,
            InputEvent::MouseClick { .. } => KIND_MOUSE_CLICK,
            InputEvent::MouseScroll { .. } => KIND_MOUSE_SCROLL,
            InputEvent::KeyDown { .. } => KIND_KEY_DOWN,
            InputEvent::KeyUp { .. } => KIND_KEY_UP,
        }
    }

    /// Normalized pointer position, for the mouse variants.
    pub fn position(&self) -> Option<(f64, f64)> {
        match *self {
            InputEvent::MouseMove { x, y }
            | InputEvent::MouseClick { x, y, .. }
            | InputEvent::MouseScroll { x, y, .. } => Some((x, y)),
            _ => None,
        }
    }

    // ── Wire codec ───────────────────────────────────────────────

    /// Serialize to the UTF-8 JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RdaError> {
        let value = match self {
            InputEvent::MouseMove { x, y } => json!([KIND_MOUSE_MOVE, x, y]),
            InputEvent::MouseClick { x, y, button, pressed } => {
                json!([KIND_MOUSE_CLICK, x, y, button.code(), pressed])
            }
            InputEvent::MouseScroll { x, y, dx, dy } => {
                json!([KIND_MOUSE_SCROLL, x, y, dx, dy])
            }
            InputEvent::KeyDown { key } => json!([KIND_KEY_DOWN, key.encode()]),
            InputEvent::KeyUp { key } => json!([KIND_KEY_UP, key.encode()]),
        };
        Ok(serde_json::to_vec(&value)?)
    }

    /// Deserialize from the UTF-8 JSON wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RdaError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let fields = value
            .as_array()
            .ok_or_else(|| RdaError::Encoding("event is not a JSON array".into()))?;

        let kind = fields
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| RdaError::Encoding("event kind missing".into()))?;

        match kind {
            KIND_MOUSE_MOVE => {
                expect_fields(fields, 3, kind)?;
                Ok(InputEvent::MouseMove {
                    x: coord(&fields[1], "x")?,
                    y: coord(&fields[2], "y")?,
                })
            }
            KIND_MOUSE_CLICK => {
                expect_fields(fields, 5, kind)?;
                Ok(InputEvent::MouseClick {
                    x: coord(&fields[1], "x")?,
                    y: coord(&fields[2], "y")?,
                    button: MouseButton::from_code(integer(&fields[3], "button")? as u64)?,
                    pressed: fields[4]
                        .as_bool()
                        .ok_or_else(|| RdaError::Encoding("pressed is not a bool".into()))?,
                })
            }
            KIND_MOUSE_SCROLL => {
                expect_fields(fields, 5, kind)?;
                Ok(InputEvent::MouseScroll {
                    x: coord(&fields[1], "x")?,
                    y: coord(&fields[2], "y")?,
                    dx: integer(&fields[3], "dx")? as i32,
                    dy: integer(&fields[4], "dy")? as i32,
                })
            }
            KIND_KEY_DOWN | KIND_KEY_UP => {
                expect_fields(fields, 2, kind)?;
                let key = Key::decode(
                    fields[1]
                        .as_str()
                        .ok_or_else(|| RdaError::Encoding("key is not a string".into()))?,
                )?;
                Ok(if kind == KIND_KEY_DOWN {
                    InputEvent::KeyDown { key }
                } else {
                    InputEvent::KeyUp { key }
                })
            }
            other => Err(RdaError::Encoding(format!("unknown event kind {other:?}"))),
        }
    }
}

// ── Decode helpers ───────────────────────────────────────────────

fn expect_fields(fields: &[Value], expected: usize, kind: &str) -> Result<(), RdaError> {
    if fields.len() != expected {
        return Err(RdaError::Encoding(format!(
            "{kind} carries {} fields, expected {expected}",
            fields.len()
        )));
    }
    Ok(())
}

fn coord(value: &Value, field: &str) -> Result<f64, RdaError> {
    let v = value
        .as_f64()
        .ok_or_else(|| RdaError::Encoding(format!("{field} is not a number")))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(RdaError::Encoding(format!("{field} {v} outside [0, 1]")));
    }
    Ok(v)
}

fn integer(value: &Value, field: &str) -> Result<i64, RdaError> {
    value
        .as_i64()
        .ok_or_else(|| RdaError::Encoding(format!("{field} is not an integer")))
}

// ── Tests ────────────────────────────────────────────────────────
