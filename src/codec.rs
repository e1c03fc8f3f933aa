// src/codec.rs

//! # Wire Codec
//!
//! Frames are UTF-8 text of the form `<topic>:<payload>`, one topic per
//! logical channel. Vector topics carry six comma-separated decimals: the
//! first three map to one 3-vector and the last three to a second one.
//!
//! | Topic      | Payload   | Meaning                                  |
//! |------------|-----------|------------------------------------------|
//! | `t:`       | 1 float   | simulation time                          |
//! | `pos:`     | 6 floats  | position, orientation                    |
//! | `vb:`      | 6 floats  | body linear and angular velocity         |
//! | `vn:`      | 6 floats  | world linear and angular velocity        |
//! | `ab:`      | 6 floats  | body linear and angular acceleration     |
//! | `speed:`   | n floats  | rotor speeds (outbound)                  |
//! | `surface:` | n floats  | control surface deflections (outbound)   |
//!
//! Floats are written with Rust's shortest round-trip formatting, so decoding
//! an encoded frame reproduces every finite value exactly.

use core::fmt::Write as _;

use nalgebra::Vector3;

use crate::error::DecodeError;

/// Number of fields in a vector frame payload.
pub const VECTOR_FIELDS: usize = 6;

/// Topics understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `t:` simulation time.
    Time,
    /// `pos:` position and orientation.
    Pose,
    /// `vb:` body-frame linear and angular velocity.
    BodyVelocity,
    /// `vn:` world-frame linear and angular velocity.
    WorldVelocity,
    /// `ab:` body-frame linear and angular acceleration.
    BodyAcceleration,
    /// `speed:` rotor speed commands.
    Speed,
    /// `surface:` control surface commands.
    Surface,
}

impl Topic {
    /// All topics, inbound first.
    pub const ALL: [Topic; 7] = [
        Topic::Time,
        Topic::Pose,
        Topic::BodyVelocity,
        Topic::WorldVelocity,
        Topic::BodyAcceleration,
        Topic::Speed,
        Topic::Surface,
    ];

    /// Topic name without the trailing colon.
    pub fn name(self) -> &'static str {
        match self {
            Topic::Time => "t",
            Topic::Pose => "pos",
            Topic::BodyVelocity => "vb",
            Topic::WorldVelocity => "vn",
            Topic::BodyAcceleration => "ab",
            Topic::Speed => "speed",
            Topic::Surface => "surface",
        }
    }

    /// Subscription prefix, the name followed by a colon.
    pub fn prefix(self) -> &'static str {
        match self {
            Topic::Time => "t:",
            Topic::Pose => "pos:",
            Topic::BodyVelocity => "vb:",
            Topic::WorldVelocity => "vn:",
            Topic::BodyAcceleration => "ab:",
            Topic::Speed => "speed:",
            Topic::Surface => "surface:",
        }
    }

    /// Looks a topic up by name.
    pub fn from_name(name: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|topic| topic.name() == name)
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Simulation time in seconds.
    Time(f64),
    /// A pair of 3-vectors on one of the vector topics.
    Vectors {
        /// Vector topic the frame belongs to.
        topic: Topic,
        /// Fields one to three.
        first: Vector3<f64>,
        /// Fields four to six.
        second: Vector3<f64>,
    },
    /// Actuator commands on `speed:` or `surface:`.
    Actuators {
        /// Actuator topic the frame belongs to.
        topic: Topic,
        /// One value per actuator.
        values: Vec<f64>,
    },
}

impl Frame {
    /// Topic of the frame.
    pub fn topic(&self) -> Topic {
        match self {
            Frame::Time(_) => Topic::Time,
            Frame::Vectors { topic, .. } | Frame::Actuators { topic, .. } => *topic,
        }
    }

    /// Returns the vector pair if this frame is on `expected`.
    pub fn into_vectors(self, expected: Topic) -> Result<(Vector3<f64>, Vector3<f64>), DecodeError> {
        match self {
            Frame::Vectors {
                topic,
                first,
                second,
            } if topic == expected => Ok((first, second)),
            other => Err(DecodeError::UnexpectedTopic {
                expected: expected.name(),
                found: other.topic().name(),
            }),
        }
    }

    /// Returns the time value if this is a time frame.
    pub fn into_time(self) -> Result<f64, DecodeError> {
        match self {
            Frame::Time(time) => Ok(time),
            other => Err(DecodeError::UnexpectedTopic {
                expected: Topic::Time.name(),
                found: other.topic().name(),
            }),
        }
    }
}

/// Decodes one frame.
pub fn decode(frame: &[u8]) -> Result<Frame, DecodeError> {
    let text = core::str::from_utf8(frame).map_err(|_| DecodeError::NotUtf8)?;
    let (name, payload) = text.split_once(':').ok_or(DecodeError::MissingTopic)?;
    let topic = Topic::from_name(name).ok_or_else(|| DecodeError::UnknownTopic(name.to_owned()))?;

    match topic {
        Topic::Time => {
            let fields = parse_fields(topic, payload, 1)?;
            Ok(Frame::Time(fields[0]))
        }
        Topic::Pose | Topic::BodyVelocity | Topic::WorldVelocity | Topic::BodyAcceleration => {
            let fields = parse_fields(topic, payload, VECTOR_FIELDS)?;
            Ok(Frame::Vectors {
                topic,
                first: Vector3::new(fields[0], fields[1], fields[2]),
                second: Vector3::new(fields[3], fields[4], fields[5]),
            })
        }
        Topic::Speed | Topic::Surface => {
            let count = if payload.trim().is_empty() {
                0
            } else {
                payload.split(',').count()
            };
            let values = parse_fields(topic, payload, count)?;
            Ok(Frame::Actuators { topic, values })
        }
    }
}

/// Parses the first `expected` comma-separated fields, ignoring any extras.
fn parse_fields(topic: Topic, payload: &str, expected: usize) -> Result<Vec<f64>, DecodeError> {
    let mut values = Vec::with_capacity(expected);
    if expected == 0 {
        return Ok(values);
    }
    for (index, field) in payload.split(',').take(expected).enumerate() {
        let value = field
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| DecodeError::InvalidField {
                topic: topic.name(),
                index,
                field: field.to_owned(),
            })?;
        values.push(value);
    }
    if values.len() < expected {
        return Err(DecodeError::TooFewFields {
            topic: topic.name(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

/// Encodes one frame into its text form.
pub fn encode(frame: &Frame) -> String {
    let mut out = String::from(frame.topic().prefix());
    match frame {
        Frame::Time(time) => push_values(&mut out, &[*time]),
        Frame::Vectors { first, second, .. } => push_values(
            &mut out,
            &[first.x, first.y, first.z, second.x, second.y, second.z],
        ),
        Frame::Actuators { values, .. } => push_values(&mut out, values),
    }
    out
}

/// Shorthand for encoding a vector pair on `topic`.
pub fn encode_vectors(topic: Topic, first: &Vector3<f64>, second: &Vector3<f64>) -> String {
    encode(&Frame::Vectors {
        topic,
        first: *first,
        second: *second,
    })
}

fn push_values(out: &mut String, values: &[f64]) {
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{}", value);
    }
}
