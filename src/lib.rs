//! Bridge between a Neato robot vacuum and an MQTT broker.
//!
//! Robot state is polled from the Nucleo API, flattened into retained
//! topics under `<prefix>/<robot>/...`, and commands published to
//! `<prefix>/<robot>/<action>/set` are forwarded to the robot.

pub mod bridge;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod neato;

pub use bridge::{Bridge, Lifecycle};
pub use error::Error;
