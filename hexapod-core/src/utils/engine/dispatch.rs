//! Actuation dispatch: what each mode asks of the LEDs, legs and servo power.
//!
//! [`directives`] is a pure function of the mode and its inputs; [`apply`]
//! writes the result into the shared state. Both run once per decision cycle.

use crate::utils::engine::calibration::CalibrationCursor;
use crate::utils::state::{
    Color, HeightClass, InputData, LedMode, MotionSource, Mode, RobotState, LED_COUNT,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedDirective {
    pub mode: LedMode,
    pub primary: Color,
    /// `None` keeps the current secondary colour.
    pub secondary: Option<Color>,
    pub blink_speed: f32,
    pub rotation_speed: f32,
    /// Single lit LED over a black ring, used in manual mode.
    pub highlight: Option<(usize, Color)>,
}

impl LedDirective {
    const fn solid(
        color: Color,
        blink_speed: f32,
    ) -> Self {
        Self {
            mode: LedMode::Parametric,
            primary: color,
            secondary: Some(color),
            blink_speed,
            rotation_speed: 0.0,
            highlight: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directives {
    pub led: LedDirective,
    pub motion: MotionSource,
    /// `None` leaves the body height unchanged.
    pub height: Option<HeightClass>,
    pub servo_power: bool,
}

/// Per-cycle inputs the table may draw from.
#[derive(Debug, Clone, Copy)]
pub struct DispatchInputs<'a> {
    pub remote: &'a InputData,
    pub user: &'a InputData,
    pub cursor: &'a CalibrationCursor,
    /// Fresh colour for this cycle, shown while dancing.
    pub random: Color,
}

pub fn directives(
    mode: Mode,
    inputs: &DispatchInputs<'_>,
) -> Directives {
    match mode {
        Mode::Standby => Directives {
            led: LedDirective {
                mode: LedMode::Parametric,
                primary: Color::BLUE,
                secondary: Some(Color::GREEN),
                blink_speed: 0.0,
                rotation_speed: 1.0,
                highlight: None,
            },
            motion: MotionSource::Hold,
            height: Some(HeightClass::Low),
            servo_power: true,
        },
        Mode::Walk => Directives {
            led: LedDirective {
                mode: LedMode::Parametric,
                primary: inputs.remote.led_primary,
                secondary: None,
                blink_speed: 1.0,
                rotation_speed: 0.0,
                highlight: None,
            },
            motion: MotionSource::Remote,
            height: Some(HeightClass::Normal),
            servo_power: true,
        },
        Mode::WalkAndTilt => Directives {
            led: LedDirective {
                mode: LedMode::Parametric,
                primary: inputs.remote.led_primary,
                secondary: None,
                blink_speed: 0.0,
                rotation_speed: 1.0,
                highlight: None,
            },
            motion: MotionSource::Remote,
            height: Some(HeightClass::Normal),
            servo_power: true,
        },
        Mode::Dance => Directives {
            led: LedDirective {
                mode: LedMode::Parametric,
                primary: inputs.random,
                secondary: Some(inputs.random),
                blink_speed: 2.0,
                rotation_speed: 1.0,
                highlight: None,
            },
            motion: MotionSource::Dance,
            height: Some(HeightClass::High),
            servo_power: true,
        },
        Mode::UserMode => Directives {
            led: LedDirective {
                mode: LedMode::Parametric,
                primary: inputs.user.led_primary,
                secondary: Some(inputs.user.led_secondary),
                blink_speed: inputs.user.led_blink_speed,
                rotation_speed: inputs.user.led_rotation_speed,
                highlight: None,
            },
            motion: MotionSource::User,
            height: Some(inputs.user.height),
            servo_power: true,
        },
        Mode::PreCalibration => Directives {
            led: LedDirective::solid(Color::RED, 0.0),
            motion: MotionSource::Hold,
            height: None,
            servo_power: true,
        },
        Mode::Calibration => Directives {
            led: LedDirective {
                mode: LedMode::Manual,
                primary: Color::BLACK,
                secondary: Some(Color::BLACK),
                blink_speed: 0.0,
                rotation_speed: 0.0,
                highlight: Some((inputs.cursor.led_index(), inputs.cursor.highlight_color())),
            },
            motion: MotionSource::Hold,
            height: None,
            servo_power: true,
        },
        Mode::BatteryEmpty => Directives {
            led: LedDirective::solid(Color::RED, 0.5),
            motion: MotionSource::Hold,
            height: None,
            servo_power: false,
        },
    }
}

/// Write directives into the shared state.
pub fn apply(
    d: &Directives,
    state: &mut RobotState,
) {
    let led = &mut state.led;
    led.mode = d.led.mode;
    led.primary = d.led.primary;
    if let Some(secondary) = d.led.secondary {
        led.secondary = secondary;
    }
    led.blink_speed = d.led.blink_speed;
    led.rotation_speed = d.led.rotation_speed;
    led.manual = [d.led.primary; LED_COUNT];
    if let Some((index, color)) = d.led.highlight {
        led.manual[index % LED_COUNT] = color;
    }

    state.move_input.source = d.motion;
    if let Some(height) = d.height {
        state.move_input.height = height;
    }
    state.servo.power = d.servo_power;
}
