//! Servo output over I2C.
//!
//! Eighteen hobby servos hang off two PCA9685 PWM chips that share one bus:
//! legs 0..=2 on the first chip, legs 3..=5 on the second, nine channels each in
//! `leg * 3 + layer` order. Trim values are stored through a
//! [`CalibrationStore`].

use core::cell::RefCell;
use core::fmt::Debug;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use crate::utils::controllers::ServoActuator;
use crate::utils::state::{
    CalibrationOffsets, ServoControl, ServoMode, LAYER_COUNT, SERVO_COUNT,
};

/// I2C addresses of the two PWM chips.
pub const PWM_ADDRESSES: [u8; 2] = [0x40, 0x41];
/// Prescale for a 50 Hz frame from the 25 MHz internal oscillator.
pub const SERVO_PRESCALE: u8 = 121;

const SERVOS_PER_CHIP: usize = SERVO_COUNT / PWM_ADDRESSES.len();
const CHANNELS: [Channel; SERVOS_PER_CHIP] = [
    Channel::C0,
    Channel::C1,
    Channel::C2,
    Channel::C3,
    Channel::C4,
    Channel::C5,
    Channel::C6,
    Channel::C7,
    Channel::C8,
];

const FRAME_US: f32 = 20_000.0;
const COUNTS_PER_FRAME: f32 = 4096.0;
const NEUTRAL_US: f32 = 1500.0;
const MIN_US: f32 = 500.0;
const MAX_US: f32 = 2500.0;
const US_PER_DEGREE: f32 = 1000.0 / 90.0;
/// Pulse shift of one trim unit.
const US_PER_OFFSET: f32 = 1.0;
/// Wiggle amplitude of the selected layer after a layer change.
const NUDGE_DEGREES: f32 = 8.0;
const NUDGE_WRITES: u8 = 40;

/// Non-volatile storage for the trim image.
pub trait CalibrationStore {
    type Error: Debug;

    fn load(&mut self) -> Result<Option<[u8; SERVO_COUNT]>, Self::Error>;

    fn store(
        &mut self,
        image: &[u8; SERVO_COUNT],
    ) -> Result<(), Self::Error>;
}

/// Errors that can occur when driving the servo board.
#[derive(Debug)]
pub enum DeviceError<E: Debug> {
    PwmError(PwmError<E>),
    StoreFailed,
}

/// PWM count for a joint angle plus trim.
pub fn pulse_counts(
    angle_deg: f32,
    offset: i8,
) -> u16 {
    let us = (NEUTRAL_US + angle_deg * US_PER_DEGREE + offset as f32 * US_PER_OFFSET)
        .clamp(MIN_US, MAX_US);
    (us * COUNTS_PER_FRAME / FRAME_US) as u16
}

pub struct ServoBoard<'a, I2C: 'static, S> {
    pwm: [Pca9685<RefCellDevice<'a, I2C>>; 2],
    store: S,
    powered: bool,
    last_nudge: u8,
    nudge_left: u8,
}

impl<'a, I2C, E, S> ServoBoard<'a, I2C, S>
where
    I2C: I2c<Error = E> + 'static,
    E: Debug,
    S: CalibrationStore,
{
    pub fn new(
        i2c_bus: &'a RefCell<I2C>,
        store: S,
    ) -> Result<Self, DeviceError<E>> {
        let chip = |addr: u8| {
            Pca9685::new(RefCellDevice::new(i2c_bus), PwmAddress::from(addr))
                .map_err(DeviceError::PwmError)
        };
        Ok(Self {
            pwm: [chip(PWM_ADDRESSES[0])?, chip(PWM_ADDRESSES[1])?],
            store,
            powered: false,
            last_nudge: 0,
            nudge_left: 0,
        })
    }

    /// Wake both chips and set the 50 Hz servo frame.
    pub fn configure(&mut self) -> Result<(), DeviceError<E>> {
        for pca in self.pwm.iter_mut() {
            pca.enable().map_err(DeviceError::PwmError)?;
            pca.set_prescale(SERVO_PRESCALE)
                .map_err(DeviceError::PwmError)?;
        }
        self.powered = true;
        tracing::info!("servo board configured");
        Ok(())
    }

    /// Trim stored by an earlier calibration, or all zero.
    pub fn load_calibration(&mut self) -> Result<CalibrationOffsets, DeviceError<E>> {
        match self.store.load() {
            Ok(Some(image)) => Ok(CalibrationOffsets::from_bytes(image)),
            Ok(None) => Ok(CalibrationOffsets::default()),
            Err(e) => {
                tracing::error!(?e, "failed to load calibration");
                Err(DeviceError::StoreFailed)
            }
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn set_power(
        &mut self,
        on: bool,
    ) -> Result<(), DeviceError<E>> {
        for pca in self.pwm.iter_mut() {
            if on {
                pca.enable().map_err(DeviceError::PwmError)?;
            } else {
                pca.disable().map_err(DeviceError::PwmError)?;
            }
        }
        self.powered = on;
        tracing::info!(on, "servo power");
        Ok(())
    }

    fn joint_angle(
        &self,
        ctrl: &ServoControl,
        servo: usize,
    ) -> f32 {
        match ctrl.mode {
            ServoMode::Walking => ctrl.targets.0[servo],
            // Neutral pose so the trim is visible; the selected layer wiggles
            // for a moment after it was chosen.
            ServoMode::Calibration => {
                let layer = (servo % LAYER_COUNT) as u8;
                if layer == self.last_nudge && self.nudge_left > 0 {
                    if (self.nudge_left / 10) % 2 == 0 {
                        NUDGE_DEGREES
                    } else {
                        -NUDGE_DEGREES
                    }
                } else {
                    0.0
                }
            }
        }
    }
}

impl<I2C, E, S> ServoActuator for ServoBoard<'_, I2C, S>
where
    I2C: I2c<Error = E> + 'static,
    E: Debug,
    S: CalibrationStore,
{
    type Error = DeviceError<E>;

    fn write_current_targets(
        &mut self,
        ctrl: &ServoControl,
    ) -> Result<(), Self::Error> {
        if !ctrl.power {
            if self.powered {
                self.set_power(false)?;
            }
            return Ok(());
        }
        if !self.powered {
            self.set_power(true)?;
        }

        if ctrl.mode == ServoMode::Calibration && ctrl.nudge != self.last_nudge {
            self.last_nudge = ctrl.nudge;
            self.nudge_left = NUDGE_WRITES;
        }

        for servo in 0..SERVO_COUNT {
            let counts = pulse_counts(self.joint_angle(ctrl, servo), ctrl.offsets.as_array()[servo]);
            let chip = servo / SERVOS_PER_CHIP;
            self.pwm[chip]
                .set_channel_on_off(CHANNELS[servo % SERVOS_PER_CHIP], 0, counts)
                .map_err(DeviceError::PwmError)?;
        }

        self.nudge_left = self.nudge_left.saturating_sub(1);
        Ok(())
    }

    fn persist_calibration(
        &mut self,
        offsets: &CalibrationOffsets,
    ) -> Result<(), Self::Error> {
        self.store.store(&offsets.to_bytes()).map_err(|e| {
            tracing::error!(?e, "failed to store calibration");
            DeviceError::StoreFailed
        })?;
        tracing::info!("calibration stored");
        Ok(())
    }
}
