//! Start-up configuration.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::utils::state::Mode;

/// Default empty-battery threshold for a 2S Li-Ion pack (V).
pub const DEFAULT_BATTERY_EMPTY_VOLTAGE: f32 = 6.4;

/// Wake periods of every periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPeriods {
    pub servo_ms: u64,
    pub led_ms: u64,
    pub walk_ms: u64,
    pub engine_ms: u64,
    pub link_ms: u64,
    pub touch_ms: u64,
    pub dance_ms: u64,
    /// Frame period of the nested dance loop.
    pub dance_frame_us: u64,
    pub battery_ms: u64,
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            servo_ms: 10,
            led_ms: 20,
            walk_ms: 20,
            engine_ms: 30,
            link_ms: 100,
            touch_ms: 50,
            dance_ms: 20,
            dance_frame_us: 700,
            battery_ms: 1000,
        }
    }
}

impl TaskPeriods {
    pub fn dance_frame(&self) -> Duration {
        Duration::from_micros(self.dance_frame_us)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexapodConfig {
    /// `Standby`, or `UserMode` when an external controller owns the robot.
    pub initial_mode: Mode,
    pub battery_empty_voltage: f32,
    pub periods: TaskPeriods,
}

impl Default for HexapodConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Standby,
            battery_empty_voltage: DEFAULT_BATTERY_EMPTY_VOLTAGE,
            periods: TaskPeriods::default(),
        }
    }
}

impl HexapodConfig {
    pub fn new(
        initial_mode: Option<Mode>,
        battery_empty_voltage: Option<f32>,
        periods: Option<TaskPeriods>,
    ) -> Self {
        Self {
            initial_mode: initial_mode.unwrap_or(Mode::Standby),
            battery_empty_voltage: battery_empty_voltage.unwrap_or(DEFAULT_BATTERY_EMPTY_VOLTAGE),
            periods: periods.unwrap_or_default(),
        }
    }
}
