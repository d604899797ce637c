//! Hexapod control core.
//!
//! - `state`: the shared robot state and its lock
//! - `scheduler`: periodic task runner, task table and boot check
//! - `engine`: mode state machine, calibration cursor, dispatch and dance loop
//! - `tasks`: effector and sensor tasks around the engine
//! - `controllers`: collaborator traits plus servo board and LED ring adapters
//! - `connection`: WebSocket remote link and advertised names
//! - `config`: start-up configuration
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod config;
pub mod connection;
pub mod controllers;
pub mod engine;
pub mod scheduler;
pub mod state;
pub mod tasks;

pub use config::HexapodConfig;
pub use connection::server::run as wss;
pub use state::{Mode, RobotShared};

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
