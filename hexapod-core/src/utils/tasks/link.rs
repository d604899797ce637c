//! Wireless link supervision.

use crate::utils::connection::names;
use crate::utils::controllers::{LinkCommand, WirelessLink};
use crate::utils::scheduler::{Activity, Cadence};
use crate::utils::state::RobotShared;

/// Commands drained per tick.
const MAX_COMMANDS_PER_TICK: usize = 8;

pub struct LinkActivity<'a, W> {
    shared: &'a RobotShared,
    link: W,
}

impl<'a, W: WirelessLink> LinkActivity<'a, W> {
    pub fn new(
        shared: &'a RobotShared,
        link: W,
    ) -> Self {
        Self { shared, link }
    }

    pub fn link(&self) -> &W {
        &self.link
    }

    fn handle(
        &mut self,
        cmd: LinkCommand,
    ) {
        match cmd {
            LinkCommand::M(input) => self.shared.lock(|state| state.move_input.remote = input),
            LinkCommand::RecalibrateBattery => self.shared.battery_recalibrate.request(),
        }
    }
}

impl<W: WirelessLink> Activity for LinkActivity<'_, W> {
    async fn setup(&mut self) {
        let name = names::advertised_name(&self.link.hardware_address());
        tracing::info!(%name, "advertising");
        if let Err(e) = self.link.start_advertising(&name) {
            tracing::error!(?e, "advertising failed");
        }
    }

    async fn tick(&mut self) -> Cadence {
        let peers = self.link.connected_peer_count();
        let battery = self.shared.lock(|state| {
            state.connected_peers = peers;
            state.battery
        });
        if let Some(reading) = battery {
            if let Err(e) = self.link.publish_battery(reading.percentage) {
                tracing::error!(?e, "battery publish failed");
            }
        }

        for _ in 0..MAX_COMMANDS_PER_TICK {
            match self.link.poll_command() {
                Some(cmd) => self.handle(cmd),
                None => break,
            }
        }
        Cadence::Steady
    }
}
