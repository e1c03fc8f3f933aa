// src/config.rs

//! # Configuration
//!
//! Startup parameters, deserialized from JSON with `serde`. Every field has a
//! default, so `{}` is a complete configuration. PIDs not listed under
//! `pids` keep their tuned defaults.
//!
//! ```json
//! {
//!     "step_time_ms": 3,
//!     "seed": 42,
//!     "sensors": [
//!         { "name": "gyroscope", "sd": 0.01, "bias": [0.01, -0.02, 0.03], "refresh_time_ms": 5 }
//!     ],
//!     "pids": {
//!         "Roll": { "kp": -6.0, "ki": -0.9, "kd": -0.2, "min": -250, "max": 250, "integral_limit": 50 }
//!     },
//!     "joystick": { "max_angle": 0.5, "max_rate": 3.0 }
//! }
//! ```
//!
//! [`Params::validate`] is the only place configuration errors surface; the
//! running stack assumes validated parameters.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::controller::{Mixers, PidAxis, PidBank};
use crate::error::ConfigError;
use crate::mixer::Mixer;
use crate::pid::PidConfig;
use crate::sensor::SensorKind;

/// One sensor definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorParams {
    /// Sensor kind, e.g. `accelerometer` or `GPSVel`.
    pub name: String,
    /// Noise standard deviation.
    pub sd: f64,
    /// Fixed bias, one value per channel. Empty means zero.
    #[serde(default)]
    pub bias: Vec<f64>,
    /// Minimum time between two samples.
    pub refresh_time_ms: u64,
}

/// Gains and output range of one PID.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Lower output bound.
    pub min: f64,
    /// Upper output bound.
    pub max: f64,
    /// Optional symmetric bound on the integral.
    #[serde(default)]
    pub integral_limit: Option<f64>,
}

impl From<PidGains> for PidConfig<f64> {
    fn from(gains: PidGains) -> Self {
        PidConfig {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            min: gains.min,
            max: gains.max,
            integral_limit: gains.integral_limit,
        }
    }
}

/// Mixer coefficients and output range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MixerParams {
    /// One `[climb, roll, pitch, yaw]` row per actuator.
    pub coefficients: Vec<Vec<f64>>,
    /// Lower output bound.
    pub min: f64,
    /// Upper output bound.
    pub max: f64,
}

/// Joystick deflection scaling.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct JoystickScale {
    /// Attitude demand at full deflection, radians.
    pub max_angle: f64,
    /// Rate demand at full deflection, radians per second.
    pub max_rate: f64,
}

impl Default for JoystickScale {
    fn default() -> Self {
        Self {
            max_angle: 1.0,
            max_rate: 1.0,
        }
    }
}

/// Startup parameters of the whole stack.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Control period.
    pub step_time_ms: u64,
    /// How long a built `info` reply is reused.
    pub info_period_ms: u64,
    /// Bounded wait for each inbound frame.
    pub receive_timeout_ms: u64,
    /// Base seed of the sensor noise generators. Entropy when absent.
    pub seed: Option<u64>,
    /// Sensor definitions.
    pub sensors: Vec<SensorParams>,
    /// PID overrides by axis name.
    pub pids: BTreeMap<String, PidGains>,
    /// Rotor mixer, quad X when absent.
    pub rotor_mixer: Option<MixerParams>,
    /// Surface mixer, four-surface plane when absent.
    pub surface_mixer: Option<MixerParams>,
    /// Joystick scaling.
    pub joystick: JoystickScale,
}

impl Default for Params {
    fn default() -> Self {
        let sensor = |name: &str, sd, bias: &[f64], refresh_time_ms| SensorParams {
            name: name.to_owned(),
            sd,
            bias: bias.to_vec(),
            refresh_time_ms,
        };
        Self {
            step_time_ms: 3,
            info_period_ms: 10,
            receive_timeout_ms: 1,
            seed: None,
            sensors: vec![
                sensor("accelerometer", 0.05, &[], 5),
                sensor("gyroscope", 0.01, &[0.01, -0.02, 0.03], 5),
                sensor("magnetometer", 0.5, &[], 20),
                sensor("barometer", 0.1, &[], 20),
            ],
            pids: BTreeMap::new(),
            rotor_mixer: None,
            surface_mixer: None,
            joystick: JoystickScale::default(),
        }
    }
}

impl Params {
    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let params: Params = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks every field the running stack relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_time_ms == 0 {
            return Err(ConfigError::ZeroPeriod("step_time_ms"));
        }
        if self.receive_timeout_ms == 0 {
            return Err(ConfigError::ZeroPeriod("receive_timeout_ms"));
        }

        for sensor in &self.sensors {
            let kind = SensorKind::from_name(&sensor.name)
                .ok_or_else(|| ConfigError::UnknownSensor(sensor.name.clone()))?;
            if !sensor.sd.is_finite() || sensor.sd < 0.0 {
                return Err(ConfigError::InvalidNoise {
                    name: sensor.name.clone(),
                    sd: sensor.sd,
                });
            }
            if !sensor.bias.is_empty() && sensor.bias.len() != kind.channels() {
                return Err(ConfigError::BiasArity {
                    name: sensor.name.clone(),
                    expected: kind.channels(),
                    found: sensor.bias.len(),
                });
            }
            if sensor.refresh_time_ms == 0 {
                return Err(ConfigError::ZeroRefresh(sensor.name.clone()));
            }
        }

        for (axis, gains) in &self.pids {
            if PidAxis::from_name(axis).is_none() {
                return Err(ConfigError::UnknownPidAxis(axis.clone()));
            }
            if !(gains.min <= gains.max) {
                return Err(ConfigError::InvalidPidRange {
                    axis: axis.clone(),
                    min: gains.min,
                    max: gains.max,
                });
            }
        }

        self.mixers().map(|_| ())
    }

    /// Control period.
    pub fn step_time(&self) -> Duration {
        Duration::from_millis(self.step_time_ms)
    }

    /// Control period in seconds, the PID time step.
    pub fn dt(&self) -> f64 {
        self.step_time().as_secs_f64()
    }

    /// Lifetime of a cached `info` reply.
    pub fn info_period(&self) -> Duration {
        Duration::from_millis(self.info_period_ms)
    }

    /// Bounded wait for each inbound frame.
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Gains of `axis`, the configured override or the tuned default.
    pub fn pid_config(&self, axis: PidAxis) -> PidConfig<f64> {
        self.pids
            .get(axis.name())
            .map(|gains| PidConfig::from(*gains))
            .unwrap_or_else(|| axis.default_config())
    }

    /// Builds the PID bank stepping at the control period.
    pub fn pid_bank(&self) -> PidBank {
        PidBank::with_configs(|axis| self.pid_config(axis), self.dt())
    }

    /// Builds the rotor and surface mixers.
    pub fn mixers(&self) -> Result<Mixers, ConfigError> {
        let build = |name: &'static str, params: &Option<MixerParams>, preset: fn() -> Mixer| {
            let Some(params) = params else {
                return Ok(preset());
            };
            Mixer::from_rows(name, &params.coefficients, params.min, params.max)
        };
        Ok(Mixers {
            rotor: build("rotor_mixer", &self.rotor_mixer, Mixer::quad_x)?,
            surface: build("surface_mixer", &self.surface_mixer, Mixer::surfaces)?,
        })
    }
}
