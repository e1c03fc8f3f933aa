// src/mixer.rs

//! # Actuator Mixers
//!
//! A mixer maps the four control axes `(climb, roll, pitch, yaw)` onto the
//! actuators of one airframe. Every output is a fixed linear combination of
//! the axes, clamped to the mixer's range.

use crate::error::ConfigError;

/// Number of control axes a mixer row combines.
pub const AXES: usize = 4;

/// Linear control-axis to actuator map.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixer {
    coefficients: Vec<[f64; AXES]>,
    min: f64,
    max: f64,
}

impl Mixer {
    /// Creates a mixer with one `[climb, roll, pitch, yaw]` row per output.
    /// The range must satisfy `min <= max`.
    fn new(coefficients: Vec<[f64; AXES]>, min: f64, max: f64) -> Self {
        Self {
            coefficients,
            min,
            max,
        }
    }

    /// Builds a mixer from configuration rows, each of which must have
    /// exactly four coefficients. Fails on an inverted or NaN range.
    pub fn from_rows(
        name: &'static str,
        rows: &[Vec<f64>],
        min: f64,
        max: f64,
    ) -> Result<Self, ConfigError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ConfigError::InvalidPidRange {
                axis: name.to_owned(),
                min,
                max,
            });
        }
        let mut coefficients = Vec::with_capacity(rows.len());
        for (row, values) in rows.iter().enumerate() {
            let coefficient: [f64; AXES] =
                values.as_slice().try_into().map_err(|_| ConfigError::MixerShape {
                    name,
                    row,
                    found: values.len(),
                })?;
            coefficients.push(coefficient);
        }
        Ok(Self::new(coefficients, min, max))
    }

    /// Quadcopter in X configuration. Outputs are front-left, front-right,
    /// rear-right and rear-left rotor speeds in `[0, 1000]`.
    pub fn quad_x() -> Self {
        Self::new(
            vec![
                [1.0, 1.0, 1.0, -1.0],
                [1.0, -1.0, 1.0, 1.0],
                [1.0, -1.0, -1.0, -1.0],
                [1.0, 1.0, -1.0, 1.0],
            ],
            0.0,
            1000.0,
        )
    }

    /// Fixed-wing control surfaces. Outputs are left aileron, right aileron,
    /// elevator and rudder deflections in `[-1, 1]`.
    pub fn surfaces() -> Self {
        Self::new(
            vec![
                [0.0, 1.0, 0.0, 0.0],
                [0.0, -1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            -1.0,
            1.0,
        )
    }

    /// Mixes one set of axis commands into clamped actuator outputs.
    pub fn mix(&self, climb: f64, roll: f64, pitch: f64, yaw: f64) -> Vec<f64> {
        let axes = [climb, roll, pitch, yaw];
        self.coefficients
            .iter()
            .map(|row| {
                let value: f64 = row.iter().zip(axes).map(|(c, a)| c * a).sum();
                value.clamp(self.min, self.max)
            })
            .collect()
    }

    /// Number of actuator outputs.
    pub fn outputs(&self) -> usize {
        self.coefficients.len()
    }

    /// Output range.
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Test that pure climb drives every rotor equally.
    #[test]
    fn test_quad_x_climb() {
        assert!(slice_close(&[10.0; 4], &Mixer::quad_x().mix(10.0, 0.0, 0.0, 0.0)));
    }

    /// Test roll, pitch and yaw split the rotors in opposite pairs.
    #[test]
    fn test_quad_x_axes() {
        let mixer = Mixer::quad_x();
        assert!(slice_close(&[110.0, 90.0, 90.0, 110.0], &mixer.mix(100.0, 10.0, 0.0, 0.0)));
        assert!(slice_close(&[110.0, 110.0, 90.0, 90.0], &mixer.mix(100.0, 0.0, 10.0, 0.0)));
        assert!(slice_close(&[90.0, 110.0, 90.0, 110.0], &mixer.mix(100.0, 0.0, 0.0, 10.0)));
    }

    /// Test rotor outputs are clamped to the mixer range.
    #[test]
    fn test_quad_x_clamp() {
        let out = Mixer::quad_x().mix(995.0, 10.0, 0.0, 0.0);
        assert!(slice_close(&[1000.0, 985.0, 985.0, 1000.0], &out));
        assert!(slice_close(&[0.0; 4], &Mixer::quad_x().mix(-50.0, 0.0, 0.0, 0.0)));
    }

    /// Test the surface preset ignores climb and clamps to [-1, 1].
    #[test]
    fn test_surfaces() {
        let out = Mixer::surfaces().mix(500.0, 0.25, -0.5, 3.0);
        assert!(slice_close(&[0.25, -0.25, -0.5, 1.0], &out));
    }

    /// Test configuration rows must have four coefficients.
    #[test]
    fn test_from_rows_shape() {
        let rows = vec![vec![1.0, 0.0, 0.0, 0.0], vec![1.0, 0.0, 0.0]];
        assert!(matches!(
            Mixer::from_rows("rotor_mixer", &rows, 0.0, 1.0),
            Err(ConfigError::MixerShape { row: 1, found: 3, .. })
        ));
        let mixer = Mixer::from_rows("rotor_mixer", &rows[..1], 0.0, 1.0).unwrap();
        assert_eq!(1, mixer.outputs());
        assert_eq!((0.0, 1.0), mixer.range());
    }

    /// Test configuration rejects an inverted or NaN output range.
    #[test]
    fn test_from_rows_range() {
        let rows = vec![vec![1.0, 0.0, 0.0, 0.0]];
        assert!(matches!(
            Mixer::from_rows("rotor_mixer", &rows, 1.0, -1.0),
            Err(ConfigError::InvalidPidRange { ref axis, .. }) if axis == "rotor_mixer"
        ));
        assert!(Mixer::from_rows("rotor_mixer", &rows, f64::NAN, 1.0).is_err());
        assert!(Mixer::from_rows("rotor_mixer", &rows, 0.0, f64::NAN).is_err());

        let flat = Mixer::from_rows("rotor_mixer", &rows, 2.0, 2.0).unwrap();
        assert!(slice_close(&[2.0], &flat.mix(0.5, 0.0, 0.0, 0.0)));
    }
}
