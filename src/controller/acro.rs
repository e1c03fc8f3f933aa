// src/controller/acro.rs

//! # Acro Mode
//!
//! Body-rate control. The operator throttle goes straight to the climb axis
//! and the three rate PIDs track the demanded body rates.

use crate::command::{Demand, OperatorState, SetpointAxis};
use crate::config::JoystickScale;
use crate::controller::{tracking_error, ActuatorSink, Mixers, Navigation, PidAxis, PidBank};

pub(super) fn step(
    pids: &mut PidBank,
    demand: &Demand,
    nav: &Navigation,
    mixers: &Mixers,
    sink: &mut dyn ActuatorSink,
) {
    let rates = nav.body_angular_velocity;
    let climb = demand.throttle;
    let roll = pids.calc(PidAxis::Roll, tracking_error(demand.rates.x, rates.x));
    let pitch = pids.calc(PidAxis::Pitch, tracking_error(demand.rates.y, rates.y));
    let yaw = pids.calc(PidAxis::Yaw, tracking_error(demand.rates.z, rates.z));

    sink.send_speed(&mixers.rotor.mix(climb, roll, pitch, yaw));
}

/// Rate-mode stick mapping, shared with the manual mode.
pub(super) fn handle_joystick(operator: &OperatorState, axes: [f64; 4], scale: &JoystickScale) {
    let [throttle, roll, pitch, yaw] = axes;
    operator.set(SetpointAxis::Throttle, throttle);
    operator.set(SetpointAxis::P, roll * scale.max_rate);
    operator.set(SetpointAxis::Q, -pitch * scale.max_rate);
    operator.set(SetpointAxis::R, yaw * scale.max_rate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::PidConfig;
    use crate::test_utils::*;
    use nalgebra::Vector3;

    /// Test throttle passes through and rate errors feed the rate PIDs.
    #[test]
    fn test_acro_step() {
        let mut pids = PidBank::with_configs(
            |axis| PidConfig {
                kp: if axis == PidAxis::Yaw { 2.0 } else { 1.0 },
                ki: 0.0,
                kd: 0.0,
                min: -250.0,
                max: 250.0,
                integral_limit: None,
            },
            0.003,
        );
        let mut sink = RecordingSink::default();
        let demand = Demand {
            rates: Vector3::new(0.0, 0.0, 5.0),
            throttle: 400.0,
            ..Demand::default()
        };
        let nav = Navigation {
            body_angular_velocity: Vector3::new(0.0, 0.0, 0.0),
            ..Navigation::default()
        };

        step(&mut pids, &demand, &nav, &Mixers::default(), &mut sink);

        assert!(slice_close(&[390.0, 410.0, 390.0, 410.0], &sink.last_speed().unwrap()));
        assert!(value_close(0.0, pids.get(PidAxis::Z).previous_error()), "Z is unused.");
    }

    /// Test the joystick drives throttle and rate demands.
    #[test]
    fn test_acro_joystick() {
        let operator = OperatorState::new();
        let scale = JoystickScale {
            max_angle: 0.5,
            max_rate: 2.0,
        };
        handle_joystick(&operator, [150.0, 0.5, 0.25, -0.5], &scale);
        assert!(value_close(150.0, operator.get(SetpointAxis::Throttle)));
        assert!(value_close(1.0, operator.get(SetpointAxis::P)));
        assert!(value_close(-0.5, operator.get(SetpointAxis::Q)));
        assert!(value_close(-1.0, operator.get(SetpointAxis::R)));
        assert!(value_close(0.0, operator.get(SetpointAxis::Fi)));
    }
}
