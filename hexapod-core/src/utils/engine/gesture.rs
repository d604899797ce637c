//! Touch gestures.
//!
//! The touch sensor has three zones (left, middle, right). A decoded sample is
//! the set of pressed zones, packed as `left|middle|right` bits.

use serde::{Deserialize, Serialize};

/// One touch zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Left,
    Middle,
    Right,
}

impl Zone {
    const fn bit(self) -> u8 {
        match self {
            Zone::Left => 0b100,
            Zone::Middle => 0b010,
            Zone::Right => 0b001,
        }
    }
}

/// Decoded three-zone touch pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TouchPattern {
    Released = 0b000,
    Right = 0b001,
    Middle = 0b010,
    MiddleRight = 0b011,
    Left = 0b100,
    /// Both outer zones, the confirm gesture.
    Outer = 0b101,
    LeftMiddle = 0b110,
    All = 0b111,
}

impl TouchPattern {
    pub const fn from_zones(
        left: bool,
        middle: bool,
        right: bool,
    ) -> Self {
        Self::from_bits(((left as u8) << 2) | ((middle as u8) << 1) | right as u8)
    }

    /// Decode a raw pattern; bits above the three zones are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => TouchPattern::Released,
            0b001 => TouchPattern::Right,
            0b010 => TouchPattern::Middle,
            0b011 => TouchPattern::MiddleRight,
            0b100 => TouchPattern::Left,
            0b101 => TouchPattern::Outer,
            0b110 => TouchPattern::LeftMiddle,
            _ => TouchPattern::All,
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn is_pressed(
        self,
        zone: Zone,
    ) -> bool {
        self.bits() & zone.bit() != 0
    }
}

/// Meaning of a pattern for the mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Outer zones: confirm / enter calibration / save.
    Confirm,
    /// Middle only: next mode, or next leg while calibrating.
    Advance,
    /// Left only: lower the selected offset.
    Decrement,
    /// Right only: raise the selected offset.
    Increment,
    /// Two adjacent zones: next joint layer.
    NextLayer,
    /// Sample with nothing pressed.
    Release,
    /// Every zone pressed; has no meaning of its own.
    Other,
}

impl From<TouchPattern> for Gesture {
    fn from(pattern: TouchPattern) -> Self {
        match pattern {
            TouchPattern::Outer => Gesture::Confirm,
            TouchPattern::Middle => Gesture::Advance,
            TouchPattern::Left => Gesture::Decrement,
            TouchPattern::Right => Gesture::Increment,
            TouchPattern::LeftMiddle | TouchPattern::MiddleRight => Gesture::NextLayer,
            TouchPattern::Released => Gesture::Release,
            TouchPattern::All => Gesture::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zones_pack_into_bits() {
        assert_eq!(TouchPattern::from_zones(true, false, true), TouchPattern::Outer);
        assert_eq!(TouchPattern::from_zones(false, true, false), TouchPattern::Middle);
        assert_eq!(TouchPattern::from_zones(true, true, true), TouchPattern::All);
        assert_eq!(TouchPattern::from_zones(false, false, false), TouchPattern::Released);
    }

    #[test]
    fn decode_ignores_high_bits() {
        assert_eq!(TouchPattern::from_bits(0b1010_0101), TouchPattern::Outer);
        assert!(TouchPattern::Outer.is_pressed(Zone::Left));
        assert!(!TouchPattern::Outer.is_pressed(Zone::Middle));
        assert!(TouchPattern::Outer.is_pressed(Zone::Right));
    }

    #[test]
    fn adjacent_pairs_select_layer() {
        assert_eq!(Gesture::from(TouchPattern::LeftMiddle), Gesture::NextLayer);
        assert_eq!(Gesture::from(TouchPattern::MiddleRight), Gesture::NextLayer);
    }
}
