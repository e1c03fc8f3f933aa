// src/pid.rs

//! # PID Control Module
//!
//! This module provides the compute function, control data and the clamped
//! scalar controller used by every axis of the control core. The arithmetic
//! is delegated to [`piddiy::PidController`]; this module supplies the
//! error-tracking callback and the output clamp around it.

pub mod clamped;
pub use clamped::*;
pub mod tracking;
pub use tracking::*;

use piddiy::Number as PiddiyNumber;

/// Custom trait to encapsulate base number requirements.
pub trait Number: PiddiyNumber {
    /// Clamps generic PartialOrd values within a given range.
    fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if max < self {
            max
        } else {
            self
        }
    }
}

impl<T: PiddiyNumber> Number for T {}
