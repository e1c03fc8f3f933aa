// src/lib.rs

//! # SITL Flight Control Stack
//!
//! A software-in-the-loop flight controller for a simulated multirotor or
//! fixed-wing vehicle. The simulator publishes the vehicle's physical state
//! as text frames; this crate turns those frames into a shared state,
//! derives noisy synthetic sensor readings from it, runs mode-dependent PID
//! cascades against operator setpoints and mixes the result into rotor
//! speeds and control-surface deflections.
//!
//! ```text
//! frames ─► Environment ─► SensorSuite ─► ControlCore ─► ActuatorSink
//!                                             ▲
//!                      commands ─► CommandChannel
//! ```
//!
//! Each input stream has its own OS thread: the environment listener, the
//! sensor scheduler, the command listener and the control loop. All of them
//! watch one [`task::ShutdownFlag`] and are joined by a [`task::TaskGroup`].
//!
//! The transport is abstracted behind [`transport::Subscriber`] and
//! [`transport::Publisher`]; [`transport::LocalBus`] is the in-process
//! implementation. No logger is installed; diagnostics go through the `log`
//! facade.

#![deny(missing_docs)]

pub mod codec;
pub mod command;
pub mod config;
pub mod controller;
pub mod environment;
pub mod error;
pub mod log_sink;
pub mod mixer;
pub mod pid;
pub mod sensor;
pub mod task;
pub mod transport;

#[doc(inline)]
pub use command::{CommandChannel, OperatorState};
#[doc(inline)]
pub use config::Params;
#[doc(inline)]
pub use controller::{ControlCore, ControllerMode};
#[doc(inline)]
pub use environment::Environment;
#[doc(inline)]
pub use pid::Number;
#[doc(inline)]
pub use sensor::SensorSuite;

#[cfg(test)]
mod test_utils;
