//! Battery supervision.

use crate::utils::controllers::BatterySensor;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::RobotShared;

pub struct BatteryActivity<'a, B> {
    shared: &'a RobotShared,
    sensor: B,
}

impl<'a, B: BatterySensor> BatteryActivity<'a, B> {
    pub fn new(
        shared: &'a RobotShared,
        sensor: B,
    ) -> Self {
        Self { shared, sensor }
    }

    pub fn sensor(&self) -> &B {
        &self.sensor
    }

    fn read(&mut self) {
        match self.sensor.sample() {
            Ok(reading) => self.shared.lock(|state| state.battery = Some(reading)),
            Err(e) => tracing::error!(?e, "battery sample failed"),
        }
    }
}

impl<B: BatterySensor> Activity for BatteryActivity<'_, B> {
    /// Safety read before the first period, so the decision task never runs
    /// on a stale voltage.
    async fn setup(&mut self) {
        self.read();
        if let Some(reading) = self.shared.lock(|state| state.battery) {
            tracing::info!(voltage = reading.voltage, percentage = reading.percentage, "initial battery read");
        }
    }

    async fn tick(&mut self) -> Cadence {
        if self.shared.battery_recalibrate.take() {
            if let Err(e) = self.sensor.recalibrate_zero_point() {
                tracing::error!(?e, "battery recalibration failed");
            }
        }
        self.read();
        Cadence::Steady
    }
}
