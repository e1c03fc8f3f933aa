// src/error.rs

//! # Error Taxonomy
//!
//! Steady-state errors ([`TransportError`], [`DecodeError`], [`UpdateError`],
//! [`CommandError`]) are handled inside the loop that produced them and never
//! stop it. [`ConfigError`] is the only error surfaced to the caller, and only
//! at startup.

/// Errors reported by a transport endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No frame arrived within the receive wait. Expected, means "no new data".
    #[error("receive timed out")]
    Timeout,

    /// The other end of the endpoint has gone away.
    #[error("endpoint disconnected")]
    Disconnected,
}

/// A frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The frame bytes are not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    /// The frame carries no `<topic>:` prefix.
    #[error("frame has no topic separator")]
    MissingTopic,

    /// The topic prefix is not part of the protocol.
    #[error("unknown topic `{0}`")]
    UnknownTopic(String),

    /// Fewer numeric fields than the topic requires.
    #[error("topic `{topic}` expects {expected} fields, found {found}")]
    TooFewFields {
        /// Topic prefix of the frame.
        topic: &'static str,
        /// Number of fields the topic requires.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },

    /// A field is not a finite decimal number.
    #[error("field {index} of topic `{topic}` is not a finite number: `{field}`")]
    InvalidField {
        /// Topic prefix of the frame.
        topic: &'static str,
        /// Zero-based field index.
        index: usize,
        /// Raw field text.
        field: String,
    },

    /// The frame decoded, but not to the topic the caller expected.
    #[error("expected topic `{expected}`, got `{found}`")]
    UnexpectedTopic {
        /// Topic the caller was waiting on.
        expected: &'static str,
        /// Topic that actually arrived.
        found: &'static str,
    },
}

/// Why one state aggregator cycle was discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpdateError {
    /// A required frame was not available.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// A required frame was malformed.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
}

/// An operator command that was rejected without mutating any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The leading verb is not known.
    #[error("unknown command `{0}`")]
    UnknownVerb(String),

    /// The setpoint axis is not known.
    #[error("unknown axis `{0}`")]
    UnknownAxis(String),

    /// The mode name is not one of the legal modes.
    #[error("unknown mode `{0}`")]
    UnknownMode(String),

    /// The payload does not have the shape the verb requires.
    #[error("malformed payload for `{verb}`: {reason}")]
    Malformed {
        /// Command verb.
        verb: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },
}

/// Invalid configuration, fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration text is not valid JSON for [`crate::config::Params`].
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A sensor definition names an unknown sensor kind.
    #[error("unknown sensor `{0}`")]
    UnknownSensor(String),

    /// A sensor noise standard deviation is negative or not finite.
    #[error("sensor `{name}` has invalid noise sd {sd}")]
    InvalidNoise {
        /// Sensor name.
        name: String,
        /// Offending standard deviation.
        sd: f64,
    },

    /// A sensor bias does not have the arity of the sensor's value.
    #[error("sensor `{name}` expects a bias of {expected} values, got {found}")]
    BiasArity {
        /// Sensor name.
        name: String,
        /// Expected number of bias values.
        expected: usize,
        /// Number of bias values given.
        found: usize,
    },

    /// A sensor refresh period is zero.
    #[error("sensor `{0}` has a zero refresh period")]
    ZeroRefresh(String),

    /// A PID gain set names an unknown control axis.
    #[error("unknown PID axis `{0}`")]
    UnknownPidAxis(String),

    /// A PID gain set has an empty or inverted output range.
    #[error("PID `{axis}` has invalid output range [{min}, {max}]")]
    InvalidPidRange {
        /// Axis name.
        axis: String,
        /// Lower output bound.
        min: f64,
        /// Upper output bound.
        max: f64,
    },

    /// A mixer row does not have one coefficient per control axis.
    #[error("mixer `{name}` row {row} has {found} coefficients, expected 4")]
    MixerShape {
        /// Mixer name.
        name: &'static str,
        /// Zero-based row index.
        row: usize,
        /// Number of coefficients in the row.
        found: usize,
    },

    /// A period or timeout is zero.
    #[error("`{0}` must be greater than zero")]
    ZeroPeriod(&'static str),
}
