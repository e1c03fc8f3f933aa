// src/command/setpoints.rs

//! Operator setpoints shared between the command channel and the control
//! loop. Every field is its own atomic cell; there is no ordering between
//! fields.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector3;

/// An `f64` stored as bits in an [`AtomicU64`].
#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    /// Creates a cell holding `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Reads the value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Replaces the value.
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Setpoint axes addressable by `control:<axis>,<value>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetpointAxis {
    /// Demanded position x.
    X,
    /// Demanded position y.
    Y,
    /// Demanded position z.
    Z,
    /// Demanded roll.
    Fi,
    /// Demanded pitch.
    Theta,
    /// Demanded yaw.
    Psi,
    /// Demanded body velocity u.
    U,
    /// Demanded body velocity v.
    V,
    /// Demanded body velocity w.
    W,
    /// Demanded roll rate.
    P,
    /// Demanded pitch rate.
    Q,
    /// Demanded yaw rate.
    R,
    /// Demanded throttle.
    Throttle,
}

impl SetpointAxis {
    /// Every axis in display order.
    pub const ALL: [SetpointAxis; 13] = [
        SetpointAxis::X,
        SetpointAxis::Y,
        SetpointAxis::Z,
        SetpointAxis::Fi,
        SetpointAxis::Theta,
        SetpointAxis::Psi,
        SetpointAxis::U,
        SetpointAxis::V,
        SetpointAxis::W,
        SetpointAxis::P,
        SetpointAxis::Q,
        SetpointAxis::R,
        SetpointAxis::Throttle,
    ];

    /// Command name of the axis.
    pub fn name(self) -> &'static str {
        match self {
            SetpointAxis::X => "X",
            SetpointAxis::Y => "Y",
            SetpointAxis::Z => "Z",
            SetpointAxis::Fi => "Fi",
            SetpointAxis::Theta => "Theta",
            SetpointAxis::Psi => "Psi",
            SetpointAxis::U => "U",
            SetpointAxis::V => "V",
            SetpointAxis::W => "W",
            SetpointAxis::P => "P",
            SetpointAxis::Q => "Q",
            SetpointAxis::R => "R",
            SetpointAxis::Throttle => "throttle",
        }
    }

    /// Case-insensitive lookup by command name.
    pub fn from_name(name: &str) -> Option<SetpointAxis> {
        SetpointAxis::ALL
            .into_iter()
            .find(|axis| axis.name().eq_ignore_ascii_case(name))
    }
}

/// A plain copy of every setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Demand {
    /// Demanded position.
    pub position: Vector3<f64>,
    /// Demanded roll, pitch, yaw.
    pub attitude: Vector3<f64>,
    /// Demanded body velocities u, v, w.
    pub velocity: Vector3<f64>,
    /// Demanded body rates p, q, r.
    pub rates: Vector3<f64>,
    /// Demanded throttle.
    pub throttle: f64,
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = [
            self.position.x,
            self.position.y,
            self.position.z,
            self.attitude.x,
            self.attitude.y,
            self.attitude.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.rates.x,
            self.rates.y,
            self.rates.z,
            self.throttle,
        ];
        for (index, (axis, value)) in SetpointAxis::ALL.iter().zip(values).enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: {}", axis.name(), value)?;
        }
        Ok(())
    }
}

/// Operator setpoints, one atomic cell per axis.
#[derive(Debug, Default)]
pub struct OperatorState {
    x: AtomicF64,
    y: AtomicF64,
    z: AtomicF64,
    fi: AtomicF64,
    theta: AtomicF64,
    psi: AtomicF64,
    u: AtomicF64,
    v: AtomicF64,
    w: AtomicF64,
    p: AtomicF64,
    q: AtomicF64,
    r: AtomicF64,
    throttle: AtomicF64,
}

impl OperatorState {
    /// Creates zeroed setpoints.
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, axis: SetpointAxis) -> &AtomicF64 {
        match axis {
            SetpointAxis::X => &self.x,
            SetpointAxis::Y => &self.y,
            SetpointAxis::Z => &self.z,
            SetpointAxis::Fi => &self.fi,
            SetpointAxis::Theta => &self.theta,
            SetpointAxis::Psi => &self.psi,
            SetpointAxis::U => &self.u,
            SetpointAxis::V => &self.v,
            SetpointAxis::W => &self.w,
            SetpointAxis::P => &self.p,
            SetpointAxis::Q => &self.q,
            SetpointAxis::R => &self.r,
            SetpointAxis::Throttle => &self.throttle,
        }
    }

    /// Reads one setpoint.
    pub fn get(&self, axis: SetpointAxis) -> f64 {
        self.cell(axis).load()
    }

    /// Replaces one setpoint.
    pub fn set(&self, axis: SetpointAxis, value: f64) {
        self.cell(axis).store(value);
    }

    /// Reads every setpoint, one cell at a time.
    pub fn demand(&self) -> Demand {
        Demand {
            position: Vector3::new(self.x.load(), self.y.load(), self.z.load()),
            attitude: Vector3::new(self.fi.load(), self.theta.load(), self.psi.load()),
            velocity: Vector3::new(self.u.load(), self.v.load(), self.w.load()),
            rates: Vector3::new(self.p.load(), self.q.load(), self.r.load()),
            throttle: self.throttle.load(),
        }
    }
}
