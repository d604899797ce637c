//! Simulated collaborators for running the control core on a host.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::PathBuf;

use embedded_hal::i2c::{ErrorType, I2c, Operation};
use hexapod_core::utils::controllers::servo_board::CalibrationStore;
use hexapod_core::utils::controllers::{BatterySensor, GaitEngine, TouchSensor};
use hexapod_core::utils::engine::gesture::TouchPattern;
use hexapod_core::utils::state::{
    BatteryReading, HeightClass, InputData, JointTargets, LAYER_COUNT, SERVO_COUNT,
};
use smart_leds_trait::{SmartLedsWrite, RGB8};
use tracing::{debug, info, trace};

const FULL_VOLTAGE: f32 = 8.4;
const EMPTY_VOLTAGE: f32 = 6.0;

/// 2S pack that drains a little with every sample.
pub struct SimBattery {
    voltage: f32,
    drain_per_sample: f32,
    zero_offset: f32,
}

impl SimBattery {
    pub fn new(
        voltage: f32,
        drain_per_sample: f32,
    ) -> Self {
        Self {
            voltage,
            drain_per_sample,
            zero_offset: 0.0,
        }
    }
}

impl BatterySensor for SimBattery {
    type Error = Infallible;

    fn sample(&mut self) -> Result<BatteryReading, Self::Error> {
        self.voltage = (self.voltage - self.drain_per_sample).max(0.0);
        let voltage = self.voltage + self.zero_offset;
        let percentage = ((voltage - EMPTY_VOLTAGE) / (FULL_VOLTAGE - EMPTY_VOLTAGE) * 100.0)
            .clamp(0.0, 100.0) as u8;
        Ok(BatteryReading {
            voltage,
            percentage,
        })
    }

    fn recalibrate_zero_point(&mut self) -> Result<(), Self::Error> {
        info!(offset = self.zero_offset, "battery zero point reset");
        self.zero_offset = 0.0;
        Ok(())
    }
}

/// I2C bus that accepts every write and reads zeros.
pub struct SimI2c;

impl ErrorType for SimI2c {
    type Error = Infallible;
}

impl I2c for SimI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Write(bytes) => trace!(address, ?bytes, "i2c write"),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}

/// Calibration image kept in a file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CalibrationStore for FileStore {
    type Error = io::Error;

    fn load(&mut self) -> Result<Option<[u8; SERVO_COUNT]>, Self::Error> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes.try_into().ok()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(
        &mut self,
        image: &[u8; SERVO_COUNT],
    ) -> Result<(), Self::Error> {
        fs::write(&self.path, image)
    }
}

/// LED driver that logs to console.
pub struct SerialLedDriver {
    last: Vec<RGB8>,
}

impl SerialLedDriver {
    pub fn new() -> Self {
        Self { last: Vec::new() }
    }
}

impl SmartLedsWrite for SerialLedDriver {
    type Color = RGB8;
    type Error = Infallible;

    fn write<T, I>(
        &mut self,
        iterator: T,
    ) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let frame: Vec<RGB8> = iterator.into_iter().map(Into::into).collect();
        // Only log changes, the ring is rewritten every 20 ms.
        if frame != self.last {
            debug!(?frame, "LED");
            self.last = frame;
        }
        Ok(())
    }
}

/// Touch pad replaying a fixed list of gestures, one every `spacing` samples.
pub struct SimTouch {
    script: VecDeque<TouchPattern>,
    spacing: u32,
    samples: u32,
    pending: Option<TouchPattern>,
}

impl SimTouch {
    pub fn new(
        script: Vec<TouchPattern>,
        spacing: u32,
    ) -> Self {
        Self {
            script: script.into(),
            spacing: spacing.max(1),
            samples: 0,
            pending: None,
        }
    }
}

impl TouchSensor for SimTouch {
    type Error = Infallible;

    fn sample(&mut self) -> Result<(), Self::Error> {
        self.samples += 1;
        if self.samples % self.spacing == 0 && self.pending.is_none() {
            self.pending = self.script.pop_front();
        }
        Ok(())
    }

    fn has_gesture(&self) -> bool {
        self.pending.is_some()
    }

    fn decode_gesture(
        &mut self,
        latch: bool,
    ) -> TouchPattern {
        let pattern = self.pending.unwrap_or(TouchPattern::Released);
        if latch {
            self.pending = None;
        }
        info!(?pattern, "touch");
        pattern
    }
}

/// Stand-in for the inverse kinematics: a tripod-ish swing scaled by speed.
#[derive(Default)]
pub struct SimGait {
    phase: f32,
}

fn body_lift(height: HeightClass) -> f32 {
    match height {
        HeightClass::Low => -20.0,
        HeightClass::Normal => 0.0,
        HeightClass::High => 20.0,
    }
}

impl GaitEngine for SimGait {
    type Error = Infallible;

    fn advance(
        &mut self,
        input: &InputData,
        height: HeightClass,
    ) -> Result<JointTargets, Self::Error> {
        self.phase = (self.phase + 0.1 * input.speed) % core::f32::consts::TAU;
        let mut targets = [0.0; SERVO_COUNT];
        for (i, t) in targets.iter_mut().enumerate() {
            let leg = i / LAYER_COUNT;
            let swing = if leg % 2 == 0 { self.phase.sin() } else { -self.phase.sin() };
            *t = match i % LAYER_COUNT {
                0 => 20.0 * swing * input.speed + input.turn * 10.0,
                1 => body_lift(height) + input.tilt,
                _ => -body_lift(height),
            };
        }
        Ok(JointTargets(targets))
    }

    fn render_dance_frame(
        &mut self,
        frame: u32,
    ) -> Result<JointTargets, Self::Error> {
        let t = frame as f32 * 0.002;
        let mut targets = [0.0; SERVO_COUNT];
        for (i, target) in targets.iter_mut().enumerate() {
            *target = 15.0 * (t + i as f32 * 0.35).sin();
        }
        Ok(JointTargets(targets))
    }
}
