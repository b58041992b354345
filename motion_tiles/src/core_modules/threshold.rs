// THEORY:
// The threshold is the one piece of state a person changes while the loop runs.
// It is stored as a `u8`, so the `[0, 255]` clamp is a property of the type and the
// keyboard handlers only have to saturate.

pub const ESC_KEY: i32 = 27;

/// Brightness delta a tile mean must exceed to be flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Threshold(u8);

impl Threshold {
    pub const MIN: Threshold = Threshold(u8::MIN);
    pub const MAX: Threshold = Threshold(u8::MAX);

    pub fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// One step up, saturating at 255.
    pub fn raise(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// One step down, saturating at 0.
    pub fn lower(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    /// True if a tile whose mean moved by `delta` should be flagged.
    #[inline]
    pub fn is_exceeded_by(&self, delta: f64) -> bool {
        delta > self.0 as f64
    }
}

/// What a key press asks the control loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    RaiseThreshold,
    LowerThreshold,
    Ignore,
}

impl KeyAction {
    /// Decodes a raw key code. Only the low byte is significant; window toolkits
    /// report modifier state in the upper bits.
    pub fn from_key_code(code: i32) -> Self {
        match code & 0xFF {
            ESC_KEY => KeyAction::Quit,
            k if k == b'+' as i32 || k == b'=' as i32 => KeyAction::RaiseThreshold,
            k if k == b'-' as i32 || k == b'_' as i32 => KeyAction::LowerThreshold,
            _ => KeyAction::Ignore,
        }
    }
}
