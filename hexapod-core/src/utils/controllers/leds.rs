//! LED ring driver.
//!
//! Renders `LedControl` onto a ring of six addressable LEDs (one per leg) via
//! `SmartLedsWrite`. Parametric mode splits the ring into a primary and a
//! secondary half that can rotate and blink; manual mode shows the per-LED
//! colours as given.

use smart_leds_trait::{SmartLedsWrite, RGB8};

use crate::utils::controllers::LedActuator;
use crate::utils::state::{LedControl, LED_COUNT};

/// Render calls per second, i.e. the rate of the LED task.
pub const DEFAULT_FRAME_RATE: f32 = 50.0;

/// High-level controller for the body LED ring.
///
/// Keeps the last rendered frame and the animation clock.
pub struct LedRing<Driver> {
    driver: Driver,
    frame: [RGB8; LED_COUNT],
    frame_rate: f32,
    ticks: u32,
}

impl<Driver, E> LedRing<Driver>
where
    Driver: SmartLedsWrite<Color = RGB8, Error = E>,
{
    /// Create a ring over `driver`, rendered `frame_rate` times per second.
    pub fn new(
        driver: Driver,
        frame_rate: Option<f32>,
    ) -> Self {
        Self {
            driver,
            frame: [RGB8::default(); LED_COUNT],
            frame_rate: frame_rate.unwrap_or(DEFAULT_FRAME_RATE),
            ticks: 0,
        }
    }

    pub fn frame(&self) -> &[RGB8; LED_COUNT] {
        &self.frame
    }

    fn seconds(&self) -> f32 {
        self.ticks as f32 / self.frame_rate
    }

    /// Whether a blinking ring is in its lit half-period.
    fn blink_on(
        &self,
        blink_speed: f32,
    ) -> bool {
        if blink_speed <= 0.0 {
            return true;
        }
        libm::fmodf(self.seconds() * blink_speed, 1.0) < 0.5
    }

    /// Ring positions shifted by the rotation so far.
    fn rotation_steps(
        &self,
        rotation_speed: f32,
    ) -> usize {
        let turns = libm::fmodf(self.seconds() * rotation_speed, 1.0);
        (libm::floorf(turns * LED_COUNT as f32) as usize) % LED_COUNT
    }
}

impl<Driver, E> LedActuator for LedRing<Driver>
where
    Driver: SmartLedsWrite<Color = RGB8, Error = E>,
    E: core::fmt::Debug,
{
    type Error = E;

    fn render_parametric(
        &mut self,
        ctrl: &LedControl,
    ) {
        let lit = self.blink_on(ctrl.blink_speed);
        let shift = self.rotation_steps(ctrl.rotation_speed);
        for (i, led) in self.frame.iter_mut().enumerate() {
            *led = if !lit {
                RGB8::default()
            } else if (i + shift) % LED_COUNT < LED_COUNT / 2 {
                ctrl.primary.into()
            } else {
                ctrl.secondary.into()
            };
        }
        self.ticks = self.ticks.wrapping_add(1);
    }

    fn render_manual(
        &mut self,
        ctrl: &LedControl,
    ) {
        for (led, color) in self.frame.iter_mut().zip(ctrl.manual.iter()) {
            *led = (*color).into();
        }
        self.ticks = self.ticks.wrapping_add(1);
    }

    fn flush(&mut self) -> Result<(), E> {
        self.driver.write(self.frame.iter().copied())
    }
}
