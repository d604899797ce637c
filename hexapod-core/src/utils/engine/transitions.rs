//! Mode transition table.
//!
//! `transition` is a single exhaustive match over `(Mode, Gesture)`, so adding a
//! mode or gesture without deciding every edge is a compile error. The battery
//! override is not part of the table; the engine applies it before consulting
//! this function.

use crate::utils::engine::gesture::Gesture;
use crate::utils::state::Mode;

/// Offset step applied by one increment/decrement gesture.
pub const OFFSET_STEP: i8 = 10;

/// Side effect that accompanies a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Switch servos into calibration mode.
    EnterCalibration,
    /// Persist offsets and switch servos back to walking.
    SaveCalibration,
    /// Change the selected offset by the given amount (saturating).
    AdjustOffset(i8),
    NextLayer,
    NextLeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Mode,
    pub effect: Effect,
}

impl Transition {
    const fn to(next: Mode) -> Self {
        Self {
            next,
            effect: Effect::None,
        }
    }

    const fn with(
        next: Mode,
        effect: Effect,
    ) -> Self {
        Self { next, effect }
    }
}

/// Look up the edge taken from `mode` on `gesture`.
pub const fn transition(
    mode: Mode,
    gesture: Gesture,
) -> Transition {
    use Gesture::*;
    use Mode::*;

    match (mode, gesture) {
        // Neither mode reacts to touch.
        (UserMode, _) => Transition::to(UserMode),
        (BatteryEmpty, _) => Transition::to(BatteryEmpty),

        (Standby, Confirm) => Transition::to(PreCalibration),
        (Standby, Advance) => Transition::to(Walk),
        (Standby, Decrement | Increment | NextLayer | Release | Other) => Transition::to(Standby),

        (Walk, Confirm) => Transition::to(PreCalibration),
        (Walk, Advance) => Transition::to(WalkAndTilt),
        (Walk, Decrement | Increment | NextLayer | Release | Other) => Transition::to(Walk),

        (WalkAndTilt, Confirm) => Transition::to(PreCalibration),
        (WalkAndTilt, Advance) => Transition::to(Dance),
        (WalkAndTilt, Decrement | Increment | NextLayer | Release | Other) => {
            Transition::to(WalkAndTilt)
        }

        (Dance, Confirm) => Transition::to(PreCalibration),
        (Dance, Advance) => Transition::to(UserMode),
        (Dance, Decrement | Increment | NextLayer | Release | Other) => Transition::to(Dance),

        // Anything but the confirm gesture abandons calibration entry.
        (PreCalibration, Confirm) => Transition::with(Calibration, Effect::EnterCalibration),
        (PreCalibration, Advance | Decrement | Increment | NextLayer | Release | Other) => {
            Transition::to(Walk)
        }

        (Calibration, Confirm) => Transition::with(Walk, Effect::SaveCalibration),
        (Calibration, Decrement) => {
            Transition::with(Calibration, Effect::AdjustOffset(-OFFSET_STEP))
        }
        (Calibration, Increment) => Transition::with(Calibration, Effect::AdjustOffset(OFFSET_STEP)),
        (Calibration, NextLayer) => Transition::with(Calibration, Effect::NextLayer),
        (Calibration, Advance) => Transition::with(Calibration, Effect::NextLeg),
        (Calibration, Release | Other) => Transition::to(Calibration),
    }
}
