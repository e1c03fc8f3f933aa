// src/pid/clamped.rs

//! # Clamped Scalar PID
//!
//! [`Pid`] wraps a [`PidController`] driven by [`compute_error`] with a
//! fixed control period and an output clamp. The clamp bounds only the
//! output; the integral keeps accumulating while the output is saturated
//! unless an explicit integral limit is configured.

use crate::pid::{compute_error, ErrorControlData, Number};
use piddiy::PidController;

/// Gains, output range and optional integral bound of one PID.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidConfig<T> {
    /// Proportional gain.
    pub kp: T,
    /// Integral gain.
    pub ki: T,
    /// Derivative gain.
    pub kd: T,
    /// Lower output bound.
    pub min: T,
    /// Upper output bound.
    pub max: T,
    /// Symmetric bound on the integral term, none by default.
    pub integral_limit: Option<T>,
}

/// A scalar PID with a fixed period and clamped output.
pub struct Pid<T: Number> {
    controller: PidController<T, ErrorControlData<T>>,
    config: PidConfig<T>,
    dt: T,
}

impl<T: Number> Pid<T> {
    /// Creates a PID stepping every `dt` seconds.
    pub fn new(config: PidConfig<T>, dt: T) -> Self {
        let mut controller = PidController::new();
        controller
            .compute_fn(compute_error)
            .set_point(T::zero())
            .kp(config.kp)
            .ki(config.ki)
            .kd(config.kd);
        Self {
            controller,
            config,
            dt,
        }
    }

    /// Advances the PID by one period with tracking error `error` and
    /// returns the clamped output.
    pub fn calc(&mut self, error: T) -> T {
        let output = self.controller.compute(ErrorControlData {
            error,
            dt: self.dt,
            integral_limit: self.config.integral_limit,
        });
        output.clamp(self.config.min, self.config.max)
    }

    /// Zeroes the accumulated integral and the previous error.
    pub fn clear(&mut self) {
        self.controller.integral = T::zero();
        self.controller.error = T::zero();
    }

    /// Accumulated integral.
    pub fn integral(&self) -> T {
        self.controller.integral
    }

    /// Error of the previous step.
    pub fn previous_error(&self) -> T {
        self.controller.error
    }

    /// Configuration the PID was built with.
    pub fn config(&self) -> &PidConfig<T> {
        &self.config
    }

    /// Control period.
    pub fn dt(&self) -> T {
        self.dt
    }
}
