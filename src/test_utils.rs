// src/test_utils.rs

//! This module contains utilities for testing.

use nalgebra::{Matrix3, Vector3};

/// A constant defining the tolerance within which floating-point values
/// are considered close enough to be equal.
pub const TEST_TOLERANCE: f64 = 1e-9;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f64, value: f64) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if each of the components in a vector is close enough to
/// be considered equal.
///
/// # Arguments
/// * `target` - The target vector as a tuple of three `f64` values.
/// * `value` - The vector to compare against the target.
///
/// # Returns
/// `true` if each component of `target` and `value` is close as per `value_close`,
/// otherwise `false`.
pub fn vector_close(target: (f64, f64, f64), value: Vector3<f64>) -> bool {
    value_close(target.0, value.x) && value_close(target.1, value.y) && value_close(target.2, value.z)
}

/// Checks if every entry of two matrices is close enough to be considered equal.
pub fn matrix_close(target: &Matrix3<f64>, value: &Matrix3<f64>) -> bool {
    target
        .iter()
        .zip(value.iter())
        .all(|(a, b)| value_close(*a, *b))
}

/// Checks if two slices have the same length and every element is close.
pub fn slice_close(target: &[f64], value: &[f64]) -> bool {
    target.len() == value.len()
        && target
            .iter()
            .zip(value.iter())
            .all(|(a, b)| value_close(*a, *b))
}

/// Actuator sink that keeps every command it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Shared record of `send_speed` calls.
    pub speeds: std::sync::Arc<std::sync::Mutex<Vec<Vec<f64>>>>,
    /// Shared record of `send_surface` calls.
    pub surfaces: std::sync::Arc<std::sync::Mutex<Vec<Vec<f64>>>>,
}

impl RecordingSink {
    /// Last rotor speeds sent, if any.
    pub fn last_speed(&self) -> Option<Vec<f64>> {
        self.speeds.lock().unwrap().last().cloned()
    }

    /// Last surface deflections sent, if any.
    pub fn last_surface(&self) -> Option<Vec<f64>> {
        self.surfaces.lock().unwrap().last().cloned()
    }
}

impl crate::controller::ActuatorSink for RecordingSink {
    fn send_speed(&mut self, speeds: &[f64]) {
        self.speeds.lock().unwrap().push(speeds.to_vec());
    }

    fn send_surface(&mut self, surfaces: &[f64]) {
        self.surfaces.lock().unwrap().push(surfaces.to_vec());
    }
}
