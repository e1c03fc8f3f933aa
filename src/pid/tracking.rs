// src/pid/tracking.rs

//! # Error-Tracking PID Callback
//!
//! The control laws compute the tracking error themselves (`demand − actual`)
//! and feed it in directly, so the controller's own set point stays at zero.
//! The callback integrates the error over the control period, optionally
//! bounds the integral, and differentiates against the previous error.

use crate::pid::Number;
use piddiy::PidController;

/// Control data for the error-tracking PID callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorControlData<T> {
    /// Tracking error of this step.
    pub error: T,
    /// The time delta since the last computation.
    pub dt: T,
    /// Optional symmetric bound on the integral term.
    pub integral_limit: Option<T>,
}

/// Error-tracking PID compute callback.
pub fn compute_error<T: Number>(
    pid: &mut PidController<T, ErrorControlData<T>>,
    data: ErrorControlData<T>,
) -> (T, T, T) {
    let error = data.error;
    let integral = pid.integral + error * data.dt;
    let integral = match data.integral_limit {
        Some(limit) => integral.clamp(-limit, limit),
        None => integral,
    };
    let derivative = (error - pid.error) / data.dt;

    (error, integral, derivative)
}
