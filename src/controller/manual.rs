// src/controller/manual.rs

//! # Manual Mode
//!
//! No feedback. Throttle and the demanded rates are mixed straight onto the
//! rotors and the control surfaces.

use crate::command::{Demand, OperatorState};
use crate::config::JoystickScale;
use crate::controller::{ActuatorSink, Mixers};

pub(super) fn step(demand: &Demand, mixers: &Mixers, sink: &mut dyn ActuatorSink) {
    let rates = demand.rates;
    sink.send_speed(&mixers.rotor.mix(demand.throttle, rates.x, rates.y, rates.z));
    sink.send_surface(&mixers.surface.mix(demand.throttle, rates.x, rates.y, rates.z));
}

pub(super) fn handle_joystick(operator: &OperatorState, axes: [f64; 4], scale: &JoystickScale) {
    super::acro::handle_joystick(operator, axes, scale);
}
