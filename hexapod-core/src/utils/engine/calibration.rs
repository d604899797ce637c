//! Calibration cursor: which servo the trim gestures act on.

use crate::utils::state::{Color, LAYER_COUNT, LEG_COUNT};

/// Leg visited at each step of the selection counter.
///
/// The counter walks the LED ring in order; legs are numbered left side front
/// to back, then right side front to back, so the right side is reversed here.
pub const LEG_ORDER: [u8; LEG_COUNT] = [0, 1, 2, 5, 4, 3];

/// Highlight colour of the selected leg's LED for each joint layer.
pub const LAYER_COLORS: [Color; LAYER_COUNT] = [Color::YELLOW, Color::CYAN, Color::PURPLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationCursor {
    counter: u8,
    leg: u8,
    layer: u8,
}

impl Default for CalibrationCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationCursor {
    pub const fn new() -> Self {
        Self {
            counter: 0,
            leg: LEG_ORDER[0],
            layer: 0,
        }
    }

    pub fn leg(&self) -> usize {
        self.leg as usize
    }

    pub fn layer(&self) -> usize {
        self.layer as usize
    }

    /// Position on the LED ring, which is the raw selection counter.
    pub fn led_index(&self) -> usize {
        self.counter as usize
    }

    pub fn highlight_color(&self) -> Color {
        LAYER_COLORS[self.layer()]
    }

    /// Step to the next leg in ring order and return it.
    pub fn next_leg(&mut self) -> usize {
        self.counter = (self.counter + 1) % LEG_COUNT as u8;
        self.leg = LEG_ORDER[self.counter as usize];
        self.leg()
    }

    /// Step to the next joint layer and return it.
    pub fn next_layer(&mut self) -> u8 {
        self.layer = (self.layer + 1) % LAYER_COUNT as u8;
        self.layer
    }
}
