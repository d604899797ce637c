//! Locomotion task: turns the selected motion input into joint targets.

use crate::utils::controllers::GaitEngine;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::{MotionSource, RobotShared};

pub struct WalkingActivity<'a, G> {
    shared: &'a RobotShared,
    gait: G,
}

impl<'a, G: GaitEngine> WalkingActivity<'a, G> {
    pub fn new(
        shared: &'a RobotShared,
        gait: G,
    ) -> Self {
        Self { shared, gait }
    }

    pub fn gait(&self) -> &G {
        &self.gait
    }
}

impl<G: GaitEngine> Activity for WalkingActivity<'_, G> {
    async fn tick(&mut self) -> Cadence {
        let (source, input, height) = self.shared.lock(|state| {
            let m = &state.move_input;
            (m.source, m.selected(), m.height)
        });
        // The dance loop owns the legs while dancing.
        if source == MotionSource::Dance {
            return Cadence::Steady;
        }

        match self.gait.advance(&input, height) {
            Ok(targets) => self.shared.lock(|state| {
                if state.move_input.source != MotionSource::Dance {
                    state.servo.targets = targets;
                }
            }),
            Err(e) => tracing::error!(?e, "gait step failed"),
        }
        Cadence::Steady
    }
}
