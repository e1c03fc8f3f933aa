// src/controller/navigation.rs

//! Where the control laws get the vehicle's state from.

use std::sync::Arc;

use nalgebra::Vector3;

use crate::environment::Environment;
use crate::sensor::{SensorKind, SensorSuite};

/// The state the control laws close their loops on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Navigation {
    /// World-frame position.
    pub position: Vector3<f64>,
    /// Roll, pitch, yaw.
    pub orientation: Vector3<f64>,
    /// Body-frame linear velocity.
    pub body_linear_velocity: Vector3<f64>,
    /// Body-frame angular velocity.
    pub body_angular_velocity: Vector3<f64>,
}

/// Provides the navigation solution once per control step.
pub trait NavigationSource: Send + Sync {
    /// Current navigation solution.
    fn navigation(&self) -> Navigation;
}

/// Ground truth straight from the state aggregator.
impl NavigationSource for Environment {
    fn navigation(&self) -> Navigation {
        Navigation {
            position: self.position(),
            orientation: self.orientation(),
            body_linear_velocity: self.body_linear_velocity(),
            body_angular_velocity: self.body_angular_velocity(),
        }
    }
}

/// Navigation built from sensor readings where a sensor exists: the
/// gyroscope for angular velocity and the barometer for height. Everything
/// else, and any missing sensor, falls back to ground truth.
pub struct SensorNavigation {
    sensors: Arc<SensorSuite>,
}

impl SensorNavigation {
    /// Wraps a sensor suite.
    pub fn new(sensors: Arc<SensorSuite>) -> Self {
        Self { sensors }
    }
}

impl NavigationSource for SensorNavigation {
    fn navigation(&self) -> Navigation {
        let mut nav = self.sensors.environment().navigation();
        if let Some(rates) = self.sensors.vector(SensorKind::Gyroscope) {
            nav.body_angular_velocity = rates;
        }
        if let Some(height) = self.sensors.scalar(SensorKind::Barometer) {
            nav.position.z = height;
        }
        nav
    }
}
