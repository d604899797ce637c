//! Control core for a six-legged walking robot on no-std embedded platforms.
//!
//! Fixed-rate tasks share one `RobotState`; a mode state machine driven by
//! touch gestures and battery level decides what the effector tasks do.
//! Hardware is reached only through the collaborator traits in
//! `utils::controllers`. See `hexapod-app/mock-mcu` for a host build.
#![no_std]

pub mod utils;
