// src/environment.rs

//! # State Aggregator
//!
//! [`Environment`] owns the authoritative physical state of the simulated
//! vehicle. A single listener task decodes the `t:`, `pos:`, `vb:`, `vn:`
//! and `ab:` frames and replaces the fields; any number of sensor and control
//! tasks read them.
//!
//! ## Consistency
//!
//! Every field is its own synchronized cell, written whole by the listener.
//! A reader never sees a torn field, but two getters called back to back may
//! observe different update cycles. Consumers that need several fields accept
//! last-writer-wins per field. The rotation matrix is the one exception with a
//! stronger rule: it is recomputed from the orientation of the same cycle,
//! right after that orientation is stored.

pub mod rotation;

pub use rotation::rotation_nb;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nalgebra::{Matrix3, Vector3};

use crate::codec::{self, Topic};
use crate::error::{TransportError, UpdateError};
use crate::log_sink::LogSink;
use crate::task::ShutdownFlag;
use crate::transport::{LocalBus, Subscriber};

/// Column names of the environment log, after the timestamp.
pub const LOG_COLUMNS: &[&str] = &[
    "PosX", "PosY", "PosZ", "Roll", "Pitch", "Yaw", "VelX", "VelY", "VelZ", "OmX", "OmY", "OmZ",
    "VelBX", "VelBY", "VelBZ", "OmBX", "OmBY", "OmBZ", "AccX", "AccY", "AccZ", "EpsX", "EpsY",
    "EpsZ",
];

/// Default bounded wait for each frame of an update cycle.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(1);

/// A plain copy of every physical state field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalState {
    /// Simulation time in seconds.
    pub time: f64,
    /// World-frame position.
    pub position: Vector3<f64>,
    /// Roll, pitch, yaw in radians.
    pub orientation: Vector3<f64>,
    /// Rotation matrix derived from `orientation`.
    pub rotation: Matrix3<f64>,
    /// Body-frame linear velocity.
    pub body_linear_velocity: Vector3<f64>,
    /// Body-frame angular velocity.
    pub body_angular_velocity: Vector3<f64>,
    /// World-frame linear velocity.
    pub world_linear_velocity: Vector3<f64>,
    /// World-frame angular velocity.
    pub world_angular_velocity: Vector3<f64>,
    /// Body-frame linear acceleration.
    pub body_linear_acceleration: Vector3<f64>,
    /// Body-frame angular acceleration.
    pub body_angular_acceleration: Vector3<f64>,
}

impl Default for PhysicalState {
    fn default() -> Self {
        Self {
            time: 0.0,
            position: Vector3::zeros(),
            orientation: Vector3::zeros(),
            rotation: Matrix3::identity(),
            body_linear_velocity: Vector3::zeros(),
            body_angular_velocity: Vector3::zeros(),
            world_linear_velocity: Vector3::zeros(),
            world_angular_velocity: Vector3::zeros(),
            body_linear_acceleration: Vector3::zeros(),
            body_angular_acceleration: Vector3::zeros(),
        }
    }
}

impl PhysicalState {
    /// Encodes the state into the five frames of one simulator tick,
    /// time frame last so a listener sees the rest first.
    pub fn to_frames(&self) -> [String; 5] {
        [
            codec::encode_vectors(Topic::Pose, &self.position, &self.orientation),
            codec::encode_vectors(
                Topic::BodyVelocity,
                &self.body_linear_velocity,
                &self.body_angular_velocity,
            ),
            codec::encode_vectors(
                Topic::WorldVelocity,
                &self.world_linear_velocity,
                &self.world_angular_velocity,
            ),
            codec::encode_vectors(
                Topic::BodyAcceleration,
                &self.body_linear_acceleration,
                &self.body_angular_acceleration,
            ),
            codec::encode(&codec::Frame::Time(self.time)),
        ]
    }
}

/// One independently synchronized field.
#[derive(Debug, Default)]
struct Field<T>(Mutex<T>);

impl<T: Copy> Field<T> {
    fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    fn get(&self) -> T {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, value: T) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// The subscriptions one update cycle reads from.
pub struct EnvironmentTopics {
    /// `t:` subscription.
    pub time: Box<dyn Subscriber>,
    /// `pos:` subscription.
    pub pose: Box<dyn Subscriber>,
    /// `vb:` subscription.
    pub body_velocity: Box<dyn Subscriber>,
    /// `vn:` subscription.
    pub world_velocity: Box<dyn Subscriber>,
    /// `ab:` subscription.
    pub body_acceleration: Box<dyn Subscriber>,
}

impl EnvironmentTopics {
    /// Subscribes to all five state topics on a local bus.
    pub fn subscribe(bus: &LocalBus) -> Self {
        Self {
            time: Box::new(bus.subscribe(Topic::Time.prefix())),
            pose: Box::new(bus.subscribe(Topic::Pose.prefix())),
            body_velocity: Box::new(bus.subscribe(Topic::BodyVelocity.prefix())),
            world_velocity: Box::new(bus.subscribe(Topic::WorldVelocity.prefix())),
            body_acceleration: Box::new(bus.subscribe(Topic::BodyAcceleration.prefix())),
        }
    }
}

/// Thread-safe holder of the vehicle's physical state.
pub struct Environment {
    time: AtomicU64,
    position: Field<Vector3<f64>>,
    orientation: Field<Vector3<f64>>,
    rotation: Field<Matrix3<f64>>,
    body_linear_velocity: Field<Vector3<f64>>,
    body_angular_velocity: Field<Vector3<f64>>,
    world_linear_velocity: Field<Vector3<f64>>,
    world_angular_velocity: Field<Vector3<f64>>,
    body_linear_acceleration: Field<Vector3<f64>>,
    body_angular_acceleration: Field<Vector3<f64>>,
    log: Mutex<Box<dyn LogSink>>,
    receive_timeout: Duration,
}

impl Environment {
    /// Creates a zeroed environment that appends its records to `log`.
    pub fn new(log: Box<dyn LogSink>) -> Self {
        Self::with_receive_timeout(log, DEFAULT_RECEIVE_TIMEOUT)
    }

    /// Creates a zeroed environment with a custom per-frame receive wait.
    pub fn with_receive_timeout(log: Box<dyn LogSink>, receive_timeout: Duration) -> Self {
        Self {
            time: AtomicU64::new(0f64.to_bits()),
            position: Field::new(Vector3::zeros()),
            orientation: Field::new(Vector3::zeros()),
            rotation: Field::new(Matrix3::identity()),
            body_linear_velocity: Field::new(Vector3::zeros()),
            body_angular_velocity: Field::new(Vector3::zeros()),
            world_linear_velocity: Field::new(Vector3::zeros()),
            world_angular_velocity: Field::new(Vector3::zeros()),
            body_linear_acceleration: Field::new(Vector3::zeros()),
            body_angular_acceleration: Field::new(Vector3::zeros()),
            log: Mutex::new(log),
            receive_timeout,
        }
    }

    /// Runs one update cycle.
    ///
    /// Waits for a time frame, then takes one frame from each of the other
    /// four topics. If any of them is missing or malformed the whole cycle is
    /// dropped and the stored state is left as it was. Returns the new
    /// simulation time on success.
    pub fn update(&self, topics: &EnvironmentTopics) -> Result<f64, UpdateError> {
        let timeout = self.receive_timeout;
        let time = codec::decode(&topics.time.recv_timeout(timeout)?)?.into_time()?;
        let (position, orientation) = receive_vectors(&*topics.pose, Topic::Pose, timeout)?;
        let (body_linear_velocity, body_angular_velocity) =
            receive_vectors(&*topics.body_velocity, Topic::BodyVelocity, timeout)?;
        let (world_linear_velocity, world_angular_velocity) =
            receive_vectors(&*topics.world_velocity, Topic::WorldVelocity, timeout)?;
        let (body_linear_acceleration, body_angular_acceleration) =
            receive_vectors(&*topics.body_acceleration, Topic::BodyAcceleration, timeout)?;

        self.time.store(time.to_bits(), Ordering::Relaxed);
        self.position.set(position);
        self.orientation.set(orientation);
        self.rotation
            .set(rotation_nb(orientation.x, orientation.y, orientation.z));
        self.world_linear_velocity.set(world_linear_velocity);
        self.world_angular_velocity.set(world_angular_velocity);
        self.body_linear_velocity.set(body_linear_velocity);
        self.body_angular_velocity.set(body_angular_velocity);
        self.body_linear_acceleration.set(body_linear_acceleration);
        self.body_angular_acceleration.set(body_angular_acceleration);

        let mut columns = Vec::with_capacity(LOG_COLUMNS.len());
        for vector in [
            position,
            orientation,
            world_linear_velocity,
            world_angular_velocity,
            body_linear_velocity,
            body_angular_velocity,
            body_linear_acceleration,
            body_angular_acceleration,
        ] {
            columns.extend_from_slice(vector.as_slice());
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .log(time, &columns);

        log::trace!("environment updated at t = {}", time);
        Ok(time)
    }

    /// Spawns the listener task that runs [`Environment::update`] until
    /// `shutdown` is raised.
    pub fn spawn_listener(
        self: &Arc<Self>,
        topics: EnvironmentTopics,
        shutdown: ShutdownFlag,
    ) -> io::Result<JoinHandle<()>> {
        let env = Arc::clone(self);
        thread::Builder::new()
            .name("environment".to_owned())
            .spawn(move || {
                log::info!("environment listener started");
                while !shutdown.is_triggered() {
                    match env.update(&topics) {
                        Ok(_) | Err(UpdateError::Transport(TransportError::Timeout)) => {}
                        Err(UpdateError::Transport(TransportError::Disconnected)) => {
                            log::warn!("environment transport disconnected, stopping listener");
                            break;
                        }
                        Err(UpdateError::Decode(err)) => {
                            log::warn!("environment frame dropped: {}", err);
                        }
                    }
                }
                log::info!("environment listener exited");
            })
    }

    /// Latest simulation time.
    pub fn time(&self) -> f64 {
        f64::from_bits(self.time.load(Ordering::Relaxed))
    }

    /// World-frame position.
    pub fn position(&self) -> Vector3<f64> {
        self.position.get()
    }

    /// Roll, pitch, yaw.
    pub fn orientation(&self) -> Vector3<f64> {
        self.orientation.get()
    }

    /// Rotation matrix of the latest orientation.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.rotation.get()
    }

    /// Body-frame linear velocity.
    pub fn body_linear_velocity(&self) -> Vector3<f64> {
        self.body_linear_velocity.get()
    }

    /// Body-frame angular velocity.
    pub fn body_angular_velocity(&self) -> Vector3<f64> {
        self.body_angular_velocity.get()
    }

    /// World-frame linear velocity.
    pub fn world_linear_velocity(&self) -> Vector3<f64> {
        self.world_linear_velocity.get()
    }

    /// World-frame angular velocity.
    pub fn world_angular_velocity(&self) -> Vector3<f64> {
        self.world_angular_velocity.get()
    }

    /// Body-frame linear acceleration.
    pub fn body_linear_acceleration(&self) -> Vector3<f64> {
        self.body_linear_acceleration.get()
    }

    /// Body-frame angular acceleration.
    pub fn body_angular_acceleration(&self) -> Vector3<f64> {
        self.body_angular_acceleration.get()
    }

    /// Reads every field, one at a time. Not an atomic snapshot.
    pub fn snapshot(&self) -> PhysicalState {
        PhysicalState {
            time: self.time(),
            position: self.position(),
            orientation: self.orientation(),
            rotation: self.rotation(),
            body_linear_velocity: self.body_linear_velocity(),
            body_angular_velocity: self.body_angular_velocity(),
            world_linear_velocity: self.world_linear_velocity(),
            world_angular_velocity: self.world_angular_velocity(),
            body_linear_acceleration: self.body_linear_acceleration(),
            body_angular_acceleration: self.body_angular_acceleration(),
        }
    }
}

fn receive_vectors(
    sub: &dyn Subscriber,
    topic: Topic,
    timeout: Duration,
) -> Result<(Vector3<f64>, Vector3<f64>), UpdateError> {
    let frame = codec::decode(&sub.recv_timeout(timeout)?)?;
    Ok(frame.into_vectors(topic)?)
}
