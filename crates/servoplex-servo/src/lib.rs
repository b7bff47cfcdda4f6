//! Drive several servos through a bridge that only addresses one at a time.
//!
//! The bridge exposes relative "select next/previous" and "speed up/down"
//! requests plus absolute actions on whichever servo is selected. This crate
//! tracks the selection, walks it to each target and serializes every
//! operation behind one fair lock so panel events and CLI commands never
//! interleave.

pub mod config;
pub mod error;
pub mod link;
pub mod mux;
pub mod presets;
pub mod sequencer;
pub mod speed;

#[cfg(test)]
mod testing;

pub use config::{ServoConfig, DEFAULT_ACTUATOR_COUNT};
pub use error::{LinkError, Result, ServoError};
pub use link::{
    ActionCode, Direction, HttpLink, LinkConfig, RemoteCommand, RemoteLink, DEFAULT_HOST,
    DEFAULT_LINK_TIMEOUT,
};
pub use mux::{Multiplexer, MuxGuard};
pub use presets::{self_test_sweep, step_sequence, wave_cycle, PlanStep, Preset};
pub use sequencer::{Action, Position};
pub use speed::{parse_speed, SpeedLevel};
