// src/sensor.rs

//! # Synthetic Sensor Pipeline
//!
//! Each sensor derives a measurement from the [`Environment`], adds its fixed
//! bias and one zero-mean Gaussian noise draw per channel, stores the result
//! and appends a log record stamped with the environment time.
//!
//! | Sensor        | Value                                   |
//! |---------------|-----------------------------------------|
//! | accelerometer | `a_body + R·(0, 0, 9.81) + bias + noise` |
//! | gyroscope     | `ω_body + bias + noise`                  |
//! | magnetometer  | `R·(60, 0, 0) + bias + noise`            |
//! | barometer     | `position.z + bias + noise`              |
//! | GPS           | `position + bias + noise`                |
//! | GPSVel        | `v_world + bias + noise`                 |
//!
//! When a sensor is sampled is up to the caller: [`SensorSuite::update`]
//! samples everything, [`SensorSuite::update_due`] only the sensors whose
//! refresh period has elapsed, and [`SensorSuite::spawn_scheduler`] drives the
//! latter from a background thread.

pub mod measurement;

pub use measurement::Measurement;

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;

use crate::config::SensorParams;
use crate::environment::Environment;
use crate::error::ConfigError;
use crate::log_sink::{LogFactory, LogSink};
use crate::task::ShutdownFlag;

/// Gravity in the navigation frame, m/s².
pub const GRAVITY: Vector3<f64> = Vector3::new(0.0, 0.0, 9.81);

/// Reference magnetic field in the navigation frame.
pub const MAGNETIC_FIELD: Vector3<f64> = Vector3::new(60.0, 0.0, 0.0);

/// The closed set of sensor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    /// Specific force in the body frame.
    Accelerometer,
    /// Body angular rate.
    Gyroscope,
    /// Reference field in the body frame.
    Magnetometer,
    /// Height.
    Barometer,
    /// World position.
    Gps,
    /// World linear velocity.
    GpsVel,
}

impl SensorKind {
    /// Every sensor kind.
    pub const ALL: [SensorKind; 6] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
        SensorKind::Barometer,
        SensorKind::Gps,
        SensorKind::GpsVel,
    ];

    /// Configuration name of the sensor.
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Barometer => "barometer",
            SensorKind::Gps => "GPS",
            SensorKind::GpsVel => "GPSVel",
        }
    }

    /// Looks a sensor kind up by its configuration name.
    pub fn from_name(name: &str) -> Option<SensorKind> {
        SensorKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Number of output channels.
    pub fn channels(self) -> usize {
        match self {
            SensorKind::Barometer => 1,
            _ => 3,
        }
    }

    /// Column names of the sensor log, after the timestamp.
    pub fn log_columns(self) -> &'static [&'static str] {
        match self {
            SensorKind::Accelerometer => &["AccX", "AccY", "AccZ"],
            SensorKind::Gyroscope => &["GyrX", "GyrY", "GyrZ"],
            SensorKind::Magnetometer => &["MagX", "MagY", "MagZ"],
            SensorKind::Barometer => &["Height"],
            SensorKind::Gps => &["PosX", "PosY", "PosZ"],
            SensorKind::GpsVel => &["VelX", "VelY", "VelZ"],
        }
    }
}

/// Bias, noise and latest value of one sensor channel group.
pub struct SensorSample<T: Measurement> {
    bias: T,
    noise: Normal<f64>,
    rng: StdRng,
    refresh_period: Duration,
    value: T,
    timestamp: Option<f64>,
    log: Box<dyn LogSink>,
}

impl<T: Measurement> SensorSample<T> {
    /// Creates a sample holder. Fails if `sd` is negative or not finite.
    pub fn new(
        sd: f64,
        bias: T,
        refresh_period: Duration,
        rng: StdRng,
        log: Box<dyn LogSink>,
    ) -> Result<Self, rand_distr::NormalError> {
        if !sd.is_finite() || sd < 0.0 {
            return Err(rand_distr::NormalError::BadVariance);
        }
        Ok(Self {
            bias,
            noise: Normal::new(0.0, sd)?,
            rng,
            refresh_period,
            value: T::zero(),
            timestamp: None,
            log,
        })
    }

    /// Computes `truth + bias + noise`, stores it and logs it at `time`.
    pub fn sample(&mut self, truth: T, time: f64) -> T {
        let value = truth.offset(self.bias).perturb(&self.noise, &mut self.rng);
        self.value = value;
        self.timestamp = Some(time);
        self.log.log(time, &value.channels());
        value
    }

    /// Latest computed value, zero before the first sample.
    pub fn value(&self) -> T {
        self.value
    }

    /// Environment time of the latest sample.
    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Configured bias.
    pub fn bias(&self) -> T {
        self.bias
    }

    /// Noise standard deviation.
    pub fn sd(&self) -> f64 {
        self.noise.std_dev()
    }

    /// Configured refresh period.
    pub fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    fn is_due(&self, now: f64) -> bool {
        match self.timestamp {
            None => true,
            Some(last) => now - last >= self.refresh_period.as_secs_f64() || now < last,
        }
    }
}

/// One sensor model, dispatched by variant.
pub enum SensorModel {
    /// Accelerometer model.
    Accelerometer(SensorSample<Vector3<f64>>),
    /// Gyroscope model.
    Gyroscope(SensorSample<Vector3<f64>>),
    /// Magnetometer model.
    Magnetometer(SensorSample<Vector3<f64>>),
    /// Barometer model.
    Barometer(SensorSample<f64>),
    /// GPS position model.
    Gps(SensorSample<Vector3<f64>>),
    /// GPS velocity model.
    GpsVel(SensorSample<Vector3<f64>>),
}

impl SensorModel {
    /// Builds a sensor of `kind`. `bias` must have [`SensorKind::channels`]
    /// values, or be empty for a zero bias.
    pub fn new(
        kind: SensorKind,
        sd: f64,
        bias: &[f64],
        refresh_period: Duration,
        rng: StdRng,
        log: Box<dyn LogSink>,
    ) -> Result<Self, ConfigError> {
        Ok(match kind {
            SensorKind::Accelerometer => {
                SensorModel::Accelerometer(build(kind, sd, bias, refresh_period, rng, log)?)
            }
            SensorKind::Gyroscope => {
                SensorModel::Gyroscope(build(kind, sd, bias, refresh_period, rng, log)?)
            }
            SensorKind::Magnetometer => {
                SensorModel::Magnetometer(build(kind, sd, bias, refresh_period, rng, log)?)
            }
            SensorKind::Barometer => {
                SensorModel::Barometer(build(kind, sd, bias, refresh_period, rng, log)?)
            }
            SensorKind::Gps => SensorModel::Gps(build(kind, sd, bias, refresh_period, rng, log)?),
            SensorKind::GpsVel => {
                SensorModel::GpsVel(build(kind, sd, bias, refresh_period, rng, log)?)
            }
        })
    }

    /// Kind of the sensor.
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorModel::Accelerometer(_) => SensorKind::Accelerometer,
            SensorModel::Gyroscope(_) => SensorKind::Gyroscope,
            SensorModel::Magnetometer(_) => SensorKind::Magnetometer,
            SensorModel::Barometer(_) => SensorKind::Barometer,
            SensorModel::Gps(_) => SensorKind::Gps,
            SensorModel::GpsVel(_) => SensorKind::GpsVel,
        }
    }

    /// Samples the environment once.
    pub fn update(&mut self, env: &Environment) {
        let time = env.time();
        match self {
            SensorModel::Accelerometer(sample) => {
                let truth = env.body_linear_acceleration() + env.rotation() * GRAVITY;
                sample.sample(truth, time);
            }
            SensorModel::Gyroscope(sample) => {
                sample.sample(env.body_angular_velocity(), time);
            }
            SensorModel::Magnetometer(sample) => {
                sample.sample(env.rotation() * MAGNETIC_FIELD, time);
            }
            SensorModel::Barometer(sample) => {
                sample.sample(env.position().z, time);
            }
            SensorModel::Gps(sample) => {
                sample.sample(env.position(), time);
            }
            SensorModel::GpsVel(sample) => {
                sample.sample(env.world_linear_velocity(), time);
            }
        }
    }

    /// Latest value of a three-channel sensor.
    pub fn vector(&self) -> Option<Vector3<f64>> {
        match self {
            SensorModel::Barometer(_) => None,
            SensorModel::Accelerometer(sample)
            | SensorModel::Gyroscope(sample)
            | SensorModel::Magnetometer(sample)
            | SensorModel::Gps(sample)
            | SensorModel::GpsVel(sample) => Some(sample.value()),
        }
    }

    /// Latest value of a single-channel sensor.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            SensorModel::Barometer(sample) => Some(sample.value()),
            _ => None,
        }
    }

    fn is_due(&self, now: f64) -> bool {
        match self {
            SensorModel::Barometer(sample) => sample.is_due(now),
            SensorModel::Accelerometer(sample)
            | SensorModel::Gyroscope(sample)
            | SensorModel::Magnetometer(sample)
            | SensorModel::Gps(sample)
            | SensorModel::GpsVel(sample) => sample.is_due(now),
        }
    }
}

/// Every configured sensor, sampling one shared environment.
pub struct SensorSuite {
    env: Arc<Environment>,
    sensors: Vec<Mutex<SensorModel>>,
}

impl SensorSuite {
    /// Creates a suite from ready-made sensors.
    pub fn new(env: Arc<Environment>, sensors: Vec<SensorModel>) -> Self {
        Self {
            env,
            sensors: sensors.into_iter().map(Mutex::new).collect(),
        }
    }

    /// Builds one sensor per definition. Each sensor gets its own generator,
    /// seeded from `seed` plus its position when a seed is given.
    pub fn from_params(
        env: Arc<Environment>,
        params: &[SensorParams],
        seed: Option<u64>,
        logs: &mut LogFactory<'_>,
    ) -> Result<Self, ConfigError> {
        let mut sensors = Vec::with_capacity(params.len());
        for (index, sensor) in params.iter().enumerate() {
            let kind = SensorKind::from_name(&sensor.name)
                .ok_or_else(|| ConfigError::UnknownSensor(sensor.name.clone()))?;
            if sensor.refresh_time_ms == 0 {
                return Err(ConfigError::ZeroRefresh(sensor.name.clone()));
            }
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
                None => StdRng::from_entropy(),
            };
            sensors.push(SensorModel::new(
                kind,
                sensor.sd,
                &sensor.bias,
                Duration::from_millis(sensor.refresh_time_ms),
                rng,
                logs(kind.name(), kind.log_columns()),
            )?);
        }
        Ok(Self::new(env, sensors))
    }

    /// The environment the sensors sample.
    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Number of sensors.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Whether the suite has no sensors.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Samples every sensor once.
    pub fn update(&self) {
        for sensor in &self.sensors {
            lock(sensor).update(&self.env);
        }
    }

    /// Samples the sensors whose refresh period has elapsed at `now`.
    /// Returns how many were sampled.
    pub fn update_due(&self, now: f64) -> usize {
        let mut updated = 0;
        for sensor in &self.sensors {
            let mut sensor = lock(sensor);
            if sensor.is_due(now) {
                sensor.update(&self.env);
                updated += 1;
            }
        }
        updated
    }

    /// Latest value of the first three-channel sensor of `kind`.
    pub fn vector(&self, kind: SensorKind) -> Option<Vector3<f64>> {
        self.find(kind).and_then(|sensor| lock(sensor).vector())
    }

    /// Latest value of the first single-channel sensor of `kind`.
    pub fn scalar(&self, kind: SensorKind) -> Option<f64> {
        self.find(kind).and_then(|sensor| lock(sensor).scalar())
    }

    /// Spawns a thread that calls [`SensorSuite::update_due`] with the
    /// environment time every `tick` until `shutdown` is raised.
    pub fn spawn_scheduler(
        self: &Arc<Self>,
        tick: Duration,
        shutdown: ShutdownFlag,
    ) -> io::Result<JoinHandle<()>> {
        let suite = Arc::clone(self);
        thread::Builder::new()
            .name("sensors".to_owned())
            .spawn(move || {
                log::info!("sensor scheduler started with {} sensors", suite.len());
                while !shutdown.is_triggered() {
                    suite.update_due(suite.env.time());
                    thread::sleep(tick);
                }
                log::info!("sensor scheduler exited");
            })
    }

    fn find(&self, kind: SensorKind) -> Option<&Mutex<SensorModel>> {
        self.sensors.iter().find(|sensor| lock(sensor).kind() == kind)
    }
}

fn build<T: Measurement>(
    kind: SensorKind,
    sd: f64,
    bias: &[f64],
    refresh_period: Duration,
    rng: StdRng,
    log: Box<dyn LogSink>,
) -> Result<SensorSample<T>, ConfigError> {
    let bias = T::from_bias(bias).ok_or_else(|| ConfigError::BiasArity {
        name: kind.name().to_owned(),
        expected: kind.channels(),
        found: bias.len(),
    })?;
    SensorSample::new(sd, bias, refresh_period, rng, log).map_err(|_| ConfigError::InvalidNoise {
        name: kind.name().to_owned(),
        sd,
    })
}

fn lock(sensor: &Mutex<SensorModel>) -> std::sync::MutexGuard<'_, SensorModel> {
    sensor.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EnvironmentTopics, PhysicalState};
    use crate::log_sink::{MemoryLog, NullLog};
    use crate::test_utils::*;
    use crate::transport::{LocalBus, Publisher};

    fn environment_with(state: &PhysicalState) -> Arc<Environment> {
        let bus = LocalBus::new();
        let topics = EnvironmentTopics::subscribe(&bus);
        let env = Environment::new(Box::new(NullLog));
        let publisher = bus.publisher();
        for frame in state.to_frames() {
            publisher.publish(frame.as_bytes());
        }
        env.update(&topics).unwrap();
        Arc::new(env)
    }

    fn noiseless(kind: SensorKind, bias: &[f64], log: Box<dyn LogSink>) -> SensorModel {
        SensorModel::new(
            kind,
            0.0,
            bias,
            Duration::from_millis(10),
            StdRng::seed_from_u64(7),
            log,
        )
        .unwrap()
    }

    /// Test the accelerometer adds rotated gravity and bias.
    #[test]
    fn test_accelerometer_level() {
        let state = PhysicalState {
            time: 0.5,
            body_linear_acceleration: Vector3::new(1.0, 2.0, 3.0),
            ..PhysicalState::default()
        };
        let env = environment_with(&state);
        let mut accel = noiseless(SensorKind::Accelerometer, &[0.1, 0.0, -0.1], Box::new(NullLog));
        accel.update(&env);
        assert!(vector_close((1.1, 2.0, 12.71), accel.vector().unwrap()));
    }

    /// Test the gyroscope passes body rates through with bias.
    #[test]
    fn test_gyroscope() {
        let state = PhysicalState {
            body_angular_velocity: Vector3::new(0.1, -0.2, 0.3),
            ..PhysicalState::default()
        };
        let env = environment_with(&state);
        let mut gyro = noiseless(SensorKind::Gyroscope, &[0.01, -0.02, 0.03], Box::new(NullLog));
        gyro.update(&env);
        assert!(vector_close((0.11, -0.22, 0.33), gyro.vector().unwrap()));
        assert_eq!(None, gyro.scalar());
    }

    /// Test the magnetometer rotates the reference field with yaw.
    #[test]
    fn test_magnetometer_yaw() {
        let state = PhysicalState {
            orientation: Vector3::new(0.0, 0.0, core::f64::consts::PI),
            ..PhysicalState::default()
        };
        let env = environment_with(&state);
        let mut mag = noiseless(SensorKind::Magnetometer, &[], Box::new(NullLog));
        mag.update(&env);
        let value = mag.vector().unwrap();
        assert!((value.x + 60.0).abs() < 1e-9, "Field should reverse with 180° yaw.");
        assert!(value.y.abs() < 1e-9);
    }

    /// Test the barometer reports height and logs it with the environment time.
    #[test]
    fn test_barometer_logs() {
        let state = PhysicalState {
            time: 3.25,
            position: Vector3::new(4.0, 5.0, -12.5),
            ..PhysicalState::default()
        };
        let env = environment_with(&state);
        let log = MemoryLog::new();
        let mut baro = noiseless(SensorKind::Barometer, &[0.5], Box::new(log.clone()));
        baro.update(&env);
        assert!(value_close(-12.0, baro.scalar().unwrap()));
        let records = log.records();
        assert_eq!(1, records.len());
        assert!(value_close(3.25, records[0].time));
        assert_eq!(vec![-12.0], records[0].columns);
    }

    /// Test that bias arity and noise are validated.
    #[test]
    fn test_sensor_validation() {
        let rng = || StdRng::seed_from_u64(1);
        let period = Duration::from_millis(5);
        assert!(matches!(
            SensorModel::new(SensorKind::Gyroscope, 0.1, &[1.0], period, rng(), Box::new(NullLog)),
            Err(ConfigError::BiasArity { expected: 3, found: 1, .. })
        ));
        assert!(matches!(
            SensorModel::new(SensorKind::Barometer, -1.0, &[], period, rng(), Box::new(NullLog)),
            Err(ConfigError::InvalidNoise { .. })
        ));
        assert!(matches!(
            SensorModel::new(SensorKind::Gps, f64::NAN, &[], period, rng(), Box::new(NullLog)),
            Err(ConfigError::InvalidNoise { .. })
        ));
    }

    /// Test that noise is drawn independently per channel.
    #[test]
    fn test_noise_per_channel() {
        let env = environment_with(&PhysicalState::default());
        let mut gps = SensorModel::new(
            SensorKind::Gps,
            1.0,
            &[],
            Duration::from_millis(1),
            StdRng::seed_from_u64(42),
            Box::new(NullLog),
        )
        .unwrap();
        gps.update(&env);
        let first = gps.vector().unwrap();
        assert!(first.x != first.y && first.y != first.z, "Channels should differ.");
        gps.update(&env);
        assert!(first != gps.vector().unwrap(), "Each update should redraw.");
    }

    /// Test that update_due honours each sensor's refresh period.
    #[test]
    fn test_update_due() {
        let env = environment_with(&PhysicalState::default());
        let fast = SensorModel::new(
            SensorKind::Gyroscope,
            0.0,
            &[],
            Duration::from_millis(10),
            StdRng::seed_from_u64(1),
            Box::new(NullLog),
        )
        .unwrap();
        let slow = SensorModel::new(
            SensorKind::Barometer,
            0.0,
            &[],
            Duration::from_millis(100),
            StdRng::seed_from_u64(2),
            Box::new(NullLog),
        )
        .unwrap();
        let suite = SensorSuite::new(env, vec![fast, slow]);

        assert_eq!(2, suite.update_due(0.0));
        assert_eq!(0, suite.update_due(0.005));
        assert_eq!(1, suite.update_due(0.010));
        assert_eq!(1, suite.update_due(0.050));
        assert_eq!(2, suite.update_due(0.100));
    }

    /// Test building a suite from configuration with per-sensor logs.
    #[test]
    fn test_suite_from_params() {
        let env = environment_with(&PhysicalState::default());
        let params = vec![
            SensorParams {
                name: "accelerometer".to_owned(),
                sd: 0.0,
                bias: vec![],
                refresh_time_ms: 4,
            },
            SensorParams {
                name: "barometer".to_owned(),
                sd: 0.0,
                bias: vec![1.0],
                refresh_time_ms: 20,
            },
        ];
        let mut names = Vec::new();
        let suite = SensorSuite::from_params(env, &params, Some(3), &mut |name, columns| {
            names.push((name.to_owned(), columns.len()));
            Box::new(NullLog)
        })
        .unwrap();
        suite.update();

        assert_eq!(
            vec![("accelerometer".to_owned(), 3), ("barometer".to_owned(), 1)],
            names
        );
        assert!(vector_close((0.0, 0.0, 9.81), suite.vector(SensorKind::Accelerometer).unwrap()));
        assert!(value_close(1.0, suite.scalar(SensorKind::Barometer).unwrap()));
        assert_eq!(None, suite.vector(SensorKind::Gyroscope));
    }

    /// Test unknown names and zero periods are configuration errors.
    #[test]
    fn test_suite_from_params_errors() {
        let env = environment_with(&PhysicalState::default());
        let unknown = vec![SensorParams {
            name: "lidar".to_owned(),
            sd: 0.0,
            bias: vec![],
            refresh_time_ms: 1,
        }];
        assert!(matches!(
            SensorSuite::from_params(env.clone(), &unknown, None, &mut |_, _| Box::new(NullLog)),
            Err(ConfigError::UnknownSensor(_))
        ));
        let zero = vec![SensorParams {
            name: "gyroscope".to_owned(),
            sd: 0.0,
            bias: vec![],
            refresh_time_ms: 0,
        }];
        assert!(matches!(
            SensorSuite::from_params(env.clone(), &zero, None, &mut |_, _| Box::new(NullLog)),
            Err(ConfigError::ZeroRefresh(_))
        ));
        let negative = vec![SensorParams {
            name: "barometer".to_owned(),
            sd: -1.0,
            bias: vec![],
            refresh_time_ms: 1,
        }];
        assert!(matches!(
            SensorSuite::from_params(env, &negative, None, &mut |_, _| Box::new(NullLog)),
            Err(ConfigError::InvalidNoise { .. })
        ));
    }

    /// Test a sample exposes its configuration and the time of its last reading.
    #[test]
    fn test_sample_state() {
        let mut sample = SensorSample::new(
            0.25,
            1.5,
            Duration::from_millis(8),
            StdRng::seed_from_u64(11),
            Box::new(NullLog),
        )
        .unwrap();
        assert!(value_close(0.25, sample.sd()));
        assert!(value_close(1.5, sample.bias()));
        assert_eq!(Duration::from_millis(8), sample.refresh_period());
        assert_eq!(None, sample.timestamp());
        assert!(value_close(0.0, sample.value()));

        let value = sample.sample(10.0, 2.5);
        assert_eq!(Some(2.5), sample.timestamp());
        assert!(value_close(value, sample.value()));
        assert!(!sample.is_due(2.505));
        assert!(sample.is_due(2.51));
        assert!(sample.is_due(1.0), "A rewound clock should resample.");

        assert!(SensorSample::new(
            -0.1,
            0.0,
            Duration::from_millis(8),
            StdRng::seed_from_u64(11),
            Box::new(NullLog),
        )
        .is_err());
    }
}
