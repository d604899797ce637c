//! Servo output task.

use crate::utils::controllers::ServoActuator;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::RobotShared;

pub struct ServoActivity<'a, S> {
    shared: &'a RobotShared,
    servos: S,
}

impl<'a, S: ServoActuator> ServoActivity<'a, S> {
    pub fn new(
        shared: &'a RobotShared,
        servos: S,
    ) -> Self {
        Self { shared, servos }
    }

    pub fn servos(&self) -> &S {
        &self.servos
    }
}

impl<S: ServoActuator> Activity for ServoActivity<'_, S> {
    async fn tick(&mut self) -> Cadence {
        if let Some(offsets) = self.shared.take_calibration_store() {
            tracing::info!("storing calibration data");
            if let Err(e) = self.servos.persist_calibration(&offsets) {
                tracing::error!(?e, "calibration store failed");
            }
        }

        let ctrl = self.shared.lock(|state| state.servo);
        if let Err(e) = self.servos.write_current_targets(&ctrl) {
            tracing::error!(?e, "servo write failed");
        }
        Cadence::Steady
    }
}
