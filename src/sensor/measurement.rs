// src/sensor/measurement.rs

//! Values a sensor can produce: a single channel or a three-axis vector.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A sensor output with one or more float channels.
pub trait Measurement: Copy + Send + 'static {
    /// The all-zero value.
    fn zero() -> Self;

    /// Builds a bias from configuration values. An empty slice is a zero
    /// bias; any other length must match the channel count.
    fn from_bias(values: &[f64]) -> Option<Self>;

    /// Adds `other` channel by channel.
    fn offset(self, other: Self) -> Self;

    /// Adds one independent draw from `noise` to every channel.
    fn perturb<R: Rng + ?Sized>(self, noise: &Normal<f64>, rng: &mut R) -> Self;

    /// Channel values in order.
    fn channels(&self) -> Vec<f64>;
}

impl Measurement for f64 {
    fn zero() -> Self {
        0.0
    }

    fn from_bias(values: &[f64]) -> Option<Self> {
        match values {
            [] => Some(0.0),
            [value] => Some(*value),
            _ => None,
        }
    }

    fn offset(self, other: Self) -> Self {
        self + other
    }

    fn perturb<R: Rng + ?Sized>(self, noise: &Normal<f64>, rng: &mut R) -> Self {
        self + noise.sample(rng)
    }

    fn channels(&self) -> Vec<f64> {
        vec![*self]
    }
}

impl Measurement for Vector3<f64> {
    fn zero() -> Self {
        Vector3::zeros()
    }

    fn from_bias(values: &[f64]) -> Option<Self> {
        match values {
            [] => Some(Vector3::zeros()),
            [x, y, z] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    fn offset(self, other: Self) -> Self {
        self + other
    }

    fn perturb<R: Rng + ?Sized>(self, noise: &Normal<f64>, rng: &mut R) -> Self {
        self.map(|value| value + noise.sample(rng))
    }

    fn channels(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }
}
