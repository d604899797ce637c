//! Periodic effector and sensor tasks around the decision engine.
//!
//! Each task owns one collaborator and talks to the rest of the system only
//! through `RobotShared`. The decision task lives in `engine`, the dance task
//! in `engine::dance`.

pub mod battery;
pub mod led;
pub mod link;
pub mod servo;
pub mod touch;
pub mod walking;

pub use battery::BatteryActivity;
pub use led::LedActivity;
pub use link::LinkActivity;
pub use servo::ServoActivity;
pub use touch::TouchActivity;
pub use walking::WalkingActivity;
