//! Collaborator interfaces and hardware adapters.
//!
//! The control core never touches hardware itself; each periodic task drives
//! exactly one collaborator through the traits below. Calls are assumed to be
//! bounded (one bus transaction, one sample). A failing call is logged by the
//! owning task and retried on its next tick.
//!
//! - `servo_board`: 18 servos over two PCA9685 PWM chips
//! - `leds`: addressable LED ring behind `SmartLedsWrite`

pub mod leds;
pub mod servo_board;

use core::fmt::Debug;

use crate::utils::engine::gesture::TouchPattern;
use crate::utils::state::{
    BatteryReading, CalibrationOffsets, HeightClass, InputData, JointTargets, LedControl,
    ServoControl,
};

pub use leds::LedRing;
pub use servo_board::ServoBoard;

/// Battery voltage sensing.
pub trait BatterySensor {
    type Error: Debug;

    /// Take one (filtered) sample.
    fn sample(&mut self) -> Result<BatteryReading, Self::Error>;

    /// Re-derive the ADC zero point from the current reading.
    fn recalibrate_zero_point(&mut self) -> Result<(), Self::Error>;
}

/// Servo output stage.
pub trait ServoActuator {
    type Error: Debug;

    /// Push targets, trim and power gate of `ctrl` to the servos.
    fn write_current_targets(
        &mut self,
        ctrl: &ServoControl,
    ) -> Result<(), Self::Error>;

    /// Store trim values so they survive a reset.
    fn persist_calibration(
        &mut self,
        offsets: &CalibrationOffsets,
    ) -> Result<(), Self::Error>;
}

/// LED ring output stage.
pub trait LedActuator {
    type Error: Debug;

    fn render_parametric(
        &mut self,
        ctrl: &LedControl,
    );

    fn render_manual(
        &mut self,
        ctrl: &LedControl,
    );

    /// Write the rendered frame out.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Capacitive three-zone touch pad.
pub trait TouchSensor {
    type Error: Debug;

    fn sample(&mut self) -> Result<(), Self::Error>;

    fn has_gesture(&self) -> bool;

    /// Decode the detected gesture; with `latch` the detection is cleared.
    fn decode_gesture(
        &mut self,
        latch: bool,
    ) -> TouchPattern;
}

/// Body motion generator.
pub trait GaitEngine {
    type Error: Debug;

    /// One step of normal locomotion.
    fn advance(
        &mut self,
        input: &InputData,
        height: HeightClass,
    ) -> Result<JointTargets, Self::Error>;

    /// Pose for one frame of the dance animation.
    fn render_dance_frame(
        &mut self,
        frame: u32,
    ) -> Result<JointTargets, Self::Error>;
}

/// Command arriving over the wireless link.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "lc", rename_all = "snake_case")] // lc = link command
pub enum LinkCommand {
    /// Remote controller motion / LED record.
    M(InputData),
    /// Request a battery zero-point recalibration.
    RecalibrateBattery,
}

/// Remote controller link.
pub trait WirelessLink {
    type Error: Debug;

    /// Hardware address the advertised name is derived from.
    fn hardware_address(&self) -> [u8; 6];

    fn start_advertising(
        &mut self,
        name: &str,
    ) -> Result<(), Self::Error>;

    fn connected_peer_count(&self) -> u32;

    fn publish_battery(
        &mut self,
        percentage: u8,
    ) -> Result<(), Self::Error>;

    /// Next queued command from a peer, if any.
    fn poll_command(&mut self) -> Option<LinkCommand>;
}
