// src/controller/angle.rs

//! # Angle Mode
//!
//! Height and attitude hold through a two-level PID cascade. The outer loop
//! turns height and attitude errors into demanded climb and body rates; the
//! inner loop turns rate errors into the four mixer axes.
//!
//! ```text
//! w_d = PID_Z(z_d − z)          climb = PID_W(w_d − w)
//! p_d = PID_Fi(φ_d − φ)         roll  = PID_Roll(p_d − p)
//! q_d = PID_Theta(θ_d − θ)      pitch = PID_Pitch(q_d − q)
//! r_d = PID_Psi(ψ_d − ψ)        yaw   = PID_Yaw(r_d − r)
//! ```

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
    let demanded_w = pids.calc(PidAxis::Z, tracking_error(demand.position.z, nav.position.z));
    let demanded_p = pids.calc(PidAxis::Fi, tracking_error(demand.attitude.x, nav.orientation.x));
    let demanded_q = pids.calc(
        PidAxis::Theta,
        tracking_error(demand.attitude.y, nav.orientation.y),
    );
    let demanded_r = pids.calc(PidAxis::Psi, tracking_error(demand.attitude.z, nav.orientation.z));

    let climb = pids.calc(
        PidAxis::W,
        tracking_error(demanded_w, nav.body_linear_velocity.z),
    );
    let roll = pids.calc(
        PidAxis::Roll,
        tracking_error(demanded_p, nav.body_angular_velocity.x),
    );
    let pitch = pids.calc(
        PidAxis::Pitch,
        tracking_error(demanded_q, nav.body_angular_velocity.y),
    );
    let yaw = pids.calc(
        PidAxis::Yaw,
        tracking_error(demanded_r, nav.body_angular_velocity.z),
    );

    log::trace!(
        "angle: climb {} roll {} pitch {} yaw {}",
        climb,
        roll,
        pitch,
        yaw
    );
    sink.send_speed(&mixers.rotor.mix(climb, roll, pitch, yaw));
}

pub(super) fn handle_joystick(operator: &OperatorState, axes: [f64; 4], scale: &JoystickScale) {
    let [throttle, roll, pitch, yaw] = axes;
    operator.set(SetpointAxis::Throttle, throttle);
    operator.set(SetpointAxis::Fi, roll * scale.max_angle);
    operator.set(SetpointAxis::Theta, -pitch * scale.max_angle);
    operator.set(SetpointAxis::Psi, yaw * scale.max_angle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pid::PidConfig;
    use crate::test_utils::*;
    use nalgebra::Vector3;

    fn unit_bank() -> PidBank {
        PidBank::with_configs(
            |_| PidConfig {
                kp: 1.0,
                ki: 0.0,
                kd: 0.0,
                min: -1000.0,
                max: 1000.0,
                integral_limit: None,
            },
            0.01,
        )
    }

    /// Test the cascade with unit proportional gains.
    #[test]
    fn test_angle_cascade() {
        let mut pids = unit_bank();
        let mut sink = RecordingSink::default();
        let demand = Demand {
            position: Vector3::new(0.0, 0.0, 100.0),
            attitude: Vector3::new(0.0, 0.0, 0.0),
            ..Demand::default()
        };
        let nav = Navigation {
            position: Vector3::new(0.0, 0.0, 90.0),
            orientation: Vector3::new(0.0, 0.0, 0.0),
            body_linear_velocity: Vector3::new(0.0, 0.0, 4.0),
            body_angular_velocity: Vector3::new(0.0, 0.0, 0.0),
        };

        step(&mut pids, &demand, &nav, &Mixers::default(), &mut sink);

        // climb = (100 - 90) - 4
        assert!(slice_close(&[6.0; 4], &sink.last_speed().unwrap()));
        assert!(sink.last_surface().is_none(), "Angle mode drives rotors only.");
    }

    /// Test a roll error splits the rotors left against right.
    #[test]
    fn test_angle_roll_correction() {
        let mut pids = unit_bank();
        let mut sink = RecordingSink::default();
        let demand = Demand {
            position: Vector3::new(0.0, 0.0, 500.0),
            attitude: Vector3::new(0.5, 0.0, 0.0),
            ..Demand::default()
        };
        let nav = Navigation::default();

        step(&mut pids, &demand, &nav, &Mixers::default(), &mut sink);

        let speeds = sink.last_speed().unwrap();
        assert!(slice_close(&[500.5, 499.5, 499.5, 500.5], &speeds));
    }

    /// Test the joystick drives throttle and attitude demands.
    #[test]
    fn test_angle_joystick() {
        let operator = OperatorState::new();
        let scale = JoystickScale {
            max_angle: 0.5,
            max_rate: 2.0,
        };
        handle_joystick(&operator, [300.0, 0.2, 0.4, -1.0], &scale);
        assert!(value_close(300.0, operator.get(SetpointAxis::Throttle)));
        assert!(value_close(0.1, operator.get(SetpointAxis::Fi)));
        assert!(value_close(-0.2, operator.get(SetpointAxis::Theta)));
        assert!(value_close(-0.5, operator.get(SetpointAxis::Psi)));
        assert!(value_close(0.0, operator.get(SetpointAxis::P)));
    }
}
