//! Decision nucleus: mode state machine, calibration cursor and actuation
//! dispatch, run together once per decision cycle.
//!
//! - `gesture`: three-zone touch patterns and their meaning
//! - `transitions`: the `(mode, gesture) -> (mode, effect)` table
//! - `calibration`: servo selection cursor and its static tables
//! - `dispatch`: per-mode LED, motion, height and power directives
//! - `dance`: the nested fast loop active in `Dance`

pub mod calibration;
pub mod dance;
pub mod dispatch;
pub mod gesture;
pub mod transitions;

use nanorand::{Rng, WyRand};

use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::{Mode, RobotShared, RobotState, ServoMode};
use calibration::CalibrationCursor;
use dispatch::DispatchInputs;
use gesture::{Gesture, TouchPattern};
use transitions::{transition, Effect, Transition};

/// What one pass of the state machine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `UserMode`: touch and battery are not looked at.
    Skipped,
    /// Voltage under the threshold; servos cut and mode forced to `BatteryEmpty`.
    BatteryEmpty,
    /// No gesture was pending.
    Idle,
    Applied {
        pattern: TouchPattern,
        transition: Transition,
    },
}

pub struct ModeEngine {
    cursor: CalibrationCursor,
    battery_empty_voltage: f32,
    rng: WyRand,
}

impl ModeEngine {
    pub fn new(
        battery_empty_voltage: f32,
        seed: u64,
    ) -> Self {
        Self {
            cursor: CalibrationCursor::new(),
            battery_empty_voltage,
            rng: WyRand::new_seed(seed),
        }
    }

    pub fn cursor(&self) -> &CalibrationCursor {
        &self.cursor
    }

    /// One full decision cycle: state machine, then dispatch.
    pub fn cycle(
        &mut self,
        shared: &RobotShared,
    ) -> Decision {
        let decision = self.check_state(shared);
        self.modes_go(shared);
        decision
    }

    /// Battery override, then the transition for the pending gesture, if any.
    pub fn check_state(
        &mut self,
        shared: &RobotShared,
    ) -> Decision {
        let threshold = self.battery_empty_voltage;
        let proceed = shared.lock(|state| {
            if state.mode == Mode::UserMode {
                return Some(Decision::Skipped);
            }
            let low = state.battery.is_some_and(|b| b.voltage < threshold);
            if low {
                if state.mode != Mode::BatteryEmpty {
                    tracing::warn!(from = ?state.mode, voltage = ?state.battery, "battery empty, cutting servo power");
                }
                state.servo.power = false;
                state.mode = Mode::BatteryEmpty;
                return Some(Decision::BatteryEmpty);
            }
            None
        });
        if let Some(decision) = proceed {
            return decision;
        }

        let Some(pattern) = shared.take_touch() else {
            return Decision::Idle;
        };

        let transition = shared.lock(|state| {
            let t = transition(state.mode, Gesture::from(pattern));
            self.apply(shared, state, t);
            t
        });
        Decision::Applied {
            pattern,
            transition,
        }
    }

    fn apply(
        &mut self,
        shared: &RobotShared,
        state: &mut RobotState,
        t: Transition,
    ) {
        match t.effect {
            Effect::None => {}
            Effect::EnterCalibration => state.servo.mode = ServoMode::Calibration,
            Effect::SaveCalibration => {
                shared.request_calibration_store(state.servo.offsets);
                state.servo.mode = ServoMode::Walking;
            }
            Effect::AdjustOffset(delta) => {
                let value = state
                    .servo
                    .offsets
                    .adjust(self.cursor.leg(), self.cursor.layer(), delta);
                tracing::debug!(leg = self.cursor.leg(), layer = self.cursor.layer(), value, "offset adjusted");
            }
            Effect::NextLayer => state.servo.nudge = self.cursor.next_layer(),
            Effect::NextLeg => {
                let leg = self.cursor.next_leg();
                tracing::debug!(leg, "calibration leg selected");
            }
        }

        if t.next != state.mode {
            tracing::info!(from = ?state.mode, to = ?t.next, "mode transition");
            state.mode = t.next;
        }
    }

    /// Write this cycle's actuation directives for the current mode.
    pub fn modes_go(
        &mut self,
        shared: &RobotShared,
    ) {
        let x: u8 = self.rng.generate();
        let random = crate::utils::state::Color::new(x, 255 - x, x / 2);
        let cursor = self.cursor;

        shared.lock(|state| {
            let remote = state.move_input.remote;
            let user = state.move_input.user;
            let inputs = DispatchInputs {
                remote: &remote,
                user: &user,
                cursor: &cursor,
                random,
            };
            let d = dispatch::directives(state.mode, &inputs);
            dispatch::apply(&d, state);
        });
    }
}

/// Periodic decision task.
pub struct EngineActivity<'a> {
    shared: &'a RobotShared,
    engine: ModeEngine,
}

impl<'a> EngineActivity<'a> {
    pub fn new(
        shared: &'a RobotShared,
        engine: ModeEngine,
    ) -> Self {
        Self { shared, engine }
    }
}

impl Activity for EngineActivity<'_> {
    async fn tick(&mut self) -> Cadence {
        self.engine.cycle(self.shared);
        Cadence::Steady
    }
}
