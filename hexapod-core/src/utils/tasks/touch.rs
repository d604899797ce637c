//! Touch pad sampling.

use crate::utils::controllers::TouchSensor;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::RobotShared;

pub struct TouchActivity<'a, T> {
    shared: &'a RobotShared,
    touch: T,
}

impl<'a, T: TouchSensor> TouchActivity<'a, T> {
    pub fn new(
        shared: &'a RobotShared,
        touch: T,
    ) -> Self {
        Self { shared, touch }
    }
}

impl<T: TouchSensor> Activity for TouchActivity<'_, T> {
    async fn tick(&mut self) -> Cadence {
        if let Err(e) = self.touch.sample() {
            tracing::error!(?e, "touch sample failed");
            return Cadence::Steady;
        }
        if self.touch.has_gesture() {
            let pattern = self.touch.decode_gesture(true);
            tracing::debug!(?pattern, "gesture");
            self.shared.post_touch(pattern);
        }
        Cadence::Steady
    }
}
