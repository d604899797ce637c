//! LED output task.

use crate::utils::controllers::LedActuator;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::{LedMode, RobotShared};

pub struct LedActivity<'a, L> {
    shared: &'a RobotShared,
    leds: L,
}

impl<'a, L: LedActuator> LedActivity<'a, L> {
    pub fn new(
        shared: &'a RobotShared,
        leds: L,
    ) -> Self {
        Self { shared, leds }
    }

    pub fn leds(&self) -> &L {
        &self.leds
    }
}

impl<L: LedActuator> Activity for LedActivity<'_, L> {
    async fn tick(&mut self) -> Cadence {
        let ctrl = self.shared.lock(|state| state.led);
        match ctrl.mode {
            LedMode::Parametric => self.leds.render_parametric(&ctrl),
            LedMode::Manual => self.leds.render_manual(&ctrl),
        }
        if let Err(e) = self.leds.flush() {
            tracing::error!(?e, "LED write failed");
        }
        Cadence::Steady
    }
}
