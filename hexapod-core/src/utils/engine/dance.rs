//! Dance sub-loop.
//!
//! The dance task ticks at the outer cadence like any other task. Once the mode
//! turns to `Dance` a tick does not return: it runs a much faster frame loop that
//! hands an ever increasing frame index to the gait engine, and only falls back
//! to the outer cadence when the mode changes. The frame counter has a single
//! writer, this task.

use embassy_time::{Duration, Ticker};

use crate::utils::controllers::GaitEngine;
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::{Mode, RobotShared, RobotState};

/// Claim the next frame index, or reset the counter once dancing has stopped.
///
/// Runs under the state lock so the mode check and the counter update are one
/// step.
pub fn next_frame(state: &mut RobotState) -> Option<u32> {
    if state.mode == Mode::Dance {
        let frame = state.dance_frame;
        state.dance_frame = frame.wrapping_add(1);
        Some(frame)
    } else {
        state.dance_frame = 0;
        None
    }
}

pub struct DanceActivity<'a, G> {
    shared: &'a RobotShared,
    gait: G,
    frame_period: Duration,
}

impl<'a, G: GaitEngine> DanceActivity<'a, G> {
    pub fn new(
        shared: &'a RobotShared,
        gait: G,
        frame_period: Duration,
    ) -> Self {
        Self {
            shared,
            gait,
            frame_period,
        }
    }

    pub fn gait(&self) -> &G {
        &self.gait
    }

    /// Run frames until the mode leaves `Dance`. Returns the number of frames.
    pub async fn sojourn(&mut self) -> u32 {
        self.shared.lock(|state| state.dance_frame = 0);
        tracing::info!("dance started");

        let mut ticker = Ticker::every(self.frame_period);
        let mut frames: u32 = 0;
        while let Some(frame) = self.shared.lock(next_frame) {
            match self.gait.render_dance_frame(frame) {
                Ok(targets) => self.shared.lock(|state| state.servo.targets = targets),
                Err(e) => tracing::error!(?e, frame, "dance frame failed"),
            }
            frames = frames.wrapping_add(1);
            ticker.next().await;
        }

        tracing::info!(frames, "dance stopped");
        frames
    }
}

impl<G: GaitEngine> Activity for DanceActivity<'_, G> {
    async fn tick(&mut self) -> Cadence {
        let dancing = self.shared.lock(|state| {
            if state.mode != Mode::Dance {
                state.dance_frame = 0;
            }
            state.mode == Mode::Dance
        });
        if !dancing {
            return Cadence::Steady;
        }
        self.sojourn().await;
        Cadence::Resync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_advances_only_while_dancing() {
        let mut state = RobotState::new(Mode::Dance);
        assert_eq!(next_frame(&mut state), Some(0));
        assert_eq!(next_frame(&mut state), Some(1));
        assert_eq!(state.dance_frame, 2);

        state.mode = Mode::PreCalibration;
        assert_eq!(next_frame(&mut state), None);
        assert_eq!(state.dance_frame, 0);

        state.mode = Mode::Dance;
        assert_eq!(next_frame(&mut state), Some(0));
    }

    #[test]
    fn counter_wraps_instead_of_overflowing() {
        let mut state = RobotState::new(Mode::Dance);
        state.dance_frame = u32::MAX;
        assert_eq!(next_frame(&mut state), Some(u32::MAX));
        assert_eq!(state.dance_frame, 0);
        assert_eq!(next_frame(&mut state), Some(0));
    }
}
