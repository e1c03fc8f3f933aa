// src/controller/actuator.rs

//! Outbound actuator commands.

use crate::codec::{self, Frame, Topic};
use crate::transport::Publisher;

/// Receives the mixed actuator outputs of each control step.
pub trait ActuatorSink: Send {
    /// Rotor speeds.
    fn send_speed(&mut self, speeds: &[f64]);

    /// Control-surface deflections.
    fn send_surface(&mut self, surfaces: &[f64]);
}

/// Publishes actuator outputs as `speed:` and `surface:` frames.
pub struct PublisherSink<P> {
    publisher: P,
}

impl<P: Publisher> PublisherSink<P> {
    /// Wraps a publisher.
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    fn publish(&self, topic: Topic, values: &[f64]) {
        let frame = codec::encode(&Frame::Actuators {
            topic,
            values: values.to_vec(),
        });
        self.publisher.publish(frame.as_bytes());
    }
}

impl<P: Publisher> ActuatorSink for PublisherSink<P> {
    fn send_speed(&mut self, speeds: &[f64]) {
        self.publish(Topic::Speed, speeds);
    }

    fn send_surface(&mut self, surfaces: &[f64]) {
        self.publish(Topic::Surface, surfaces);
    }
}
