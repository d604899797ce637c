//! Shared robot state.
//!
//! One `RobotShared` instance lives for the whole program and is handed to every
//! periodic task as a `&'static` reference. All plain data sits behind a single
//! critical-section mutex and is only reachable through [`RobotShared::lock`], so
//! a task always reads or writes a logical unit (mode, offset block, LED control,
//! move input) in one piece.
//!
//! Cross-task requests that must fire exactly once do not live in the locked
//! struct:
//! - the latest touch gesture is a `Signal`, consumed with `try_take`
//! - a calibration save carries its offset snapshot through a `Signal`
//! - battery zero-point recalibration is a compare-and-clear [`OneShot`]
//!
//! # Writers
//! - `mode`: decision task only
//! - `battery`: battery task only
//! - `connected_peers`, `move_input.remote`: link task only
//! - `dance_frame`: dance task only
//! - `servo.targets`: walking task, or the dance task while dancing

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_sync::signal::Signal;
use serde::{Deserialize, Serialize};
use smart_leds_trait::RGB8;

use crate::utils::engine::gesture::TouchPattern;

/// Number of legs.
pub const LEG_COUNT: usize = 6;
/// Joint layers per leg (hip, knee, ankle).
pub const LAYER_COUNT: usize = 3;
/// Total servo count.
pub const SERVO_COUNT: usize = LEG_COUNT * LAYER_COUNT;
/// Number of LEDs on the body ring, one per leg.
pub const LED_COUNT: usize = 6;
/// Calibration offsets saturate at `±OFFSET_LIMIT`.
pub const OFFSET_LIMIT: i8 = 100;

/// Top-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Externally driven mode; gestures and the battery check are ignored.
    UserMode,
    /// Terminal; only a reset leaves it.
    BatteryEmpty,
    #[default]
    Standby,
    Walk,
    WalkAndTilt,
    Dance,
    /// Waiting for the confirm gesture before entering calibration.
    PreCalibration,
    Calibration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServoMode {
    #[default]
    Walking,
    Calibration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LedMode {
    /// Ring is computed from primary/secondary colour, blink and rotation.
    #[default]
    Parametric,
    /// Ring shows `LedControl::manual` verbatim.
    Manual,
}

/// Plain RGB colour, serializable for the remote link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 242, 0);
    pub const PURPLE: Color = Color::new(255, 0, 255);
    pub const CYAN: Color = Color::new(0, 255, 255);

    pub const fn new(
        r: u8,
        g: u8,
        b: u8,
    ) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for RGB8 {
    fn from(c: Color) -> Self {
        RGB8 {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}

/// Trim values for all servos, indexed by `leg * LAYER_COUNT + layer`.
///
/// Every mutation saturates to `[-OFFSET_LIMIT, OFFSET_LIMIT]`, so the block can
/// never hold an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationOffsets([i8; SERVO_COUNT]);

impl Default for CalibrationOffsets {
    fn default() -> Self {
        Self([0; SERVO_COUNT])
    }
}

impl CalibrationOffsets {
    /// Build from raw values, clamping each one.
    pub fn from_raw(raw: [i8; SERVO_COUNT]) -> Self {
        Self(raw.map(|v| v.clamp(-OFFSET_LIMIT, OFFSET_LIMIT)))
    }

    pub fn get(
        &self,
        leg: usize,
        layer: usize,
    ) -> i8 {
        self.0[leg * LAYER_COUNT + layer]
    }

    /// Add `delta` to one offset with saturation and return the new value.
    pub fn adjust(
        &mut self,
        leg: usize,
        layer: usize,
        delta: i8,
    ) -> i8 {
        let slot = &mut self.0[leg * LAYER_COUNT + layer];
        let next = (*slot as i16 + delta as i16).clamp(-(OFFSET_LIMIT as i16), OFFSET_LIMIT as i16);
        *slot = next as i8;
        *slot
    }

    pub fn as_array(&self) -> &[i8; SERVO_COUNT] {
        &self.0
    }

    /// Byte image used by calibration storage.
    pub fn to_bytes(&self) -> [u8; SERVO_COUNT] {
        self.0.map(|v| v as u8)
    }

    pub fn from_bytes(bytes: [u8; SERVO_COUNT]) -> Self {
        Self::from_raw(bytes.map(|b| b as i8))
    }
}

/// Joint angles in degrees relative to neutral, same indexing as the offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTargets(pub [f32; SERVO_COUNT]);

impl Default for JointTargets {
    fn default() -> Self {
        Self([0.0; SERVO_COUNT])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ServoControl {
    pub mode: ServoMode,
    pub offsets: CalibrationOffsets,
    /// Layer last selected during calibration, used to wiggle that joint tier.
    pub nudge: u8,
    /// Servo power gate. Cleared on an empty battery.
    pub power: bool,
    pub targets: JointTargets,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedControl {
    pub mode: LedMode,
    pub primary: Color,
    pub secondary: Color,
    /// Blink cycles per second, 0 = steady.
    pub blink_speed: f32,
    /// Ring revolutions per second, 0 = still.
    pub rotation_speed: f32,
    pub manual: [Color; LED_COUNT],
}

impl Default for LedControl {
    fn default() -> Self {
        Self {
            mode: LedMode::Parametric,
            primary: Color::BLUE,
            secondary: Color::GREEN,
            blink_speed: 0.0,
            rotation_speed: 0.0,
            manual: [Color::BLACK; LED_COUNT],
        }
    }
}

/// Body height class handed to the gait engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightClass {
    Low,
    #[default]
    Normal,
    High,
}

/// One motion command record, from the local input or the remote link.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputData {
    /// Translational speed, 0..=1.
    pub speed: f32,
    /// Heading in degrees, 0 = forward.
    pub direction: f32,
    /// Turn rate, -1..=1.
    pub turn: f32,
    /// Body tilt in degrees, used by walk-and-tilt.
    pub tilt: f32,
    pub height: HeightClass,
    pub led_primary: Color,
    pub led_secondary: Color,
    pub led_blink_speed: f32,
    pub led_rotation_speed: f32,
}

/// Which record the walking task follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionSource {
    /// Stand still.
    #[default]
    Hold,
    Remote,
    User,
    /// Legs are driven by the dance loop, walking is paused.
    Dance,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveInput {
    pub user: InputData,
    pub remote: InputData,
    pub source: MotionSource,
    pub height: HeightClass,
}

impl MoveInput {
    /// The record selected by `source`; `Hold` and `Dance` yield a zero command.
    pub fn selected(&self) -> InputData {
        match self.source {
            MotionSource::Remote => self.remote,
            MotionSource::User => self.user,
            MotionSource::Hold | MotionSource::Dance => InputData {
                height: self.height,
                ..InputData::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    pub voltage: f32,
    pub percentage: u8,
}

/// Everything tasks share, guarded as one unit by [`RobotShared`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotState {
    pub mode: Mode,
    /// `None` until the battery task has taken its first sample.
    pub battery: Option<BatteryReading>,
    pub servo: ServoControl,
    pub led: LedControl,
    pub move_input: MoveInput,
    pub dance_frame: u32,
    pub connected_peers: u32,
}

impl RobotState {
    pub fn new(initial_mode: Mode) -> Self {
        Self {
            mode: initial_mode,
            battery: None,
            servo: ServoControl {
                power: true,
                ..ServoControl::default()
            },
            led: LedControl::default(),
            move_input: MoveInput::default(),
            dance_frame: 0,
            connected_peers: 0,
        }
    }
}

/// Boolean request consumed by exactly one `take`.
#[derive(Debug, Default)]
pub struct OneShot(AtomicBool);

impl OneShot {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once per request and clears it in the same atomic step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Process-wide shared state, built once before any task starts.
pub struct RobotShared {
    state: Mutex<CriticalSectionRawMutex, RefCell<RobotState>>,
    touch: Signal<CriticalSectionRawMutex, TouchPattern>,
    store_calibration: Signal<CriticalSectionRawMutex, CalibrationOffsets>,
    /// Battery zero-point recalibration request.
    pub battery_recalibrate: OneShot,
}

impl RobotShared {
    pub fn new(initial_mode: Mode) -> Self {
        Self {
            state: Mutex::new(RefCell::new(RobotState::new(initial_mode))),
            touch: Signal::new(),
            store_calibration: Signal::new(),
            battery_recalibrate: OneShot::new(),
        }
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// Keep the closure short: it runs inside a critical section.
    pub fn lock<R>(
        &self,
        f: impl FnOnce(&mut RobotState) -> R,
    ) -> R {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn snapshot(&self) -> RobotState {
        self.lock(|state| *state)
    }

    pub fn mode(&self) -> Mode {
        self.lock(|state| state.mode)
    }

    /// Publish a decoded gesture; a newer one replaces an unconsumed older one.
    pub fn post_touch(
        &self,
        pattern: TouchPattern,
    ) {
        self.touch.signal(pattern);
    }

    pub fn take_touch(&self) -> Option<TouchPattern> {
        self.touch.try_take()
    }

    pub fn request_calibration_store(
        &self,
        offsets: CalibrationOffsets,
    ) {
        self.store_calibration.signal(offsets);
    }

    pub fn take_calibration_store(&self) -> Option<CalibrationOffsets> {
        self.store_calibration.try_take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_wakes_in_standby() {
        assert_eq!(Mode::default(), Mode::Standby);
        assert_eq!(serde_json::to_string(&Mode::default()).unwrap(), "\"standby\"");
    }

    #[test]
    fn offsets_saturate_on_adjust() {
        let mut offsets = CalibrationOffsets::default();
        for _ in 0..20 {
            offsets.adjust(4, 2, 10);
        }
        assert_eq!(offsets.get(4, 2), 100);
        for _ in 0..40 {
            offsets.adjust(4, 2, -10);
        }
        assert_eq!(offsets.get(4, 2), -100);
    }

    #[test]
    fn offsets_from_raw_clamp() {
        let mut raw = [0i8; SERVO_COUNT];
        raw[0] = -128;
        raw[17] = 127;
        let offsets = CalibrationOffsets::from_raw(raw);
        assert_eq!(offsets.get(0, 0), -100);
        assert_eq!(offsets.get(5, 2), 100);
    }

    #[test]
    fn one_shot_fires_once_per_request() {
        let flag = OneShot::new();
        assert!(!flag.take());
        flag.request();
        flag.request();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn hold_source_yields_zero_command() {
        let mut input = MoveInput::default();
        input.remote.speed = 0.8;
        input.height = HeightClass::Low;
        let selected = input.selected();
        assert_eq!(selected.speed, 0.0);
        assert_eq!(selected.height, HeightClass::Low);

        input.source = MotionSource::Remote;
        assert_eq!(input.selected().speed, 0.8);
    }
}
