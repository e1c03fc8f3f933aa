// src/controller.rs

//! # Control Core
//!
//! The control core runs one control law per step. Which law runs is decided
//! by the active [`ControllerMode`]; each law reads the operator [`Demand`],
//! closes its PID loops against a [`Navigation`] solution and hands the mixed
//! outputs to an [`ActuatorSink`].
//!
//! ## Modes
//!
//! | Mode    | PIDs used                                   | Outputs          |
//! |---------|---------------------------------------------|------------------|
//! | Angle   | Z, Fi, Theta, Psi, W, Roll, Pitch, Yaw      | rotors           |
//! | Acro    | Roll, Pitch, Yaw                            | rotors           |
//! | Fmanual | none                                        | rotors, surfaces |
//!
//! ## Mode Switching
//!
//! The active mode and the PID bank sit behind one mutex. A control step
//! holds it for the whole law evaluation and [`ControlCore::set_mode`] holds
//! it while clearing the PIDs, so a switch never lands in the middle of a
//! step. Every switch clears every PID, including re-selecting the mode that
//! is already active.

pub mod actuator;
pub use actuator::*;
pub mod navigation;
pub use navigation::*;

mod acro;
mod angle;
mod manual;

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command::{Demand, OperatorState};
use crate::config::JoystickScale;
use crate::mixer::Mixer;
use crate::pid::{Pid, PidConfig};
use crate::task::ShutdownFlag;

/// Control-law selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControllerMode {
    /// Altitude and attitude hold through a PID cascade.
    #[default]
    Angle,
    /// Body-rate control with raw throttle.
    Acro,
    /// Operator inputs mixed straight to rotors and surfaces.
    Fmanual,
}

impl ControllerMode {
    /// Every mode.
    pub const ALL: [ControllerMode; 3] = [
        ControllerMode::Angle,
        ControllerMode::Acro,
        ControllerMode::Fmanual,
    ];

    /// Command name of the mode.
    pub fn name(self) -> &'static str {
        match self {
            ControllerMode::Angle => "angle",
            ControllerMode::Acro => "acro",
            ControllerMode::Fmanual => "fmanual",
        }
    }

    /// Case-insensitive lookup by command name.
    pub fn from_name(name: &str) -> Option<ControllerMode> {
        ControllerMode::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    /// PIDs the mode's control law evaluates.
    pub fn required_pids(self) -> &'static [PidAxis] {
        match self {
            ControllerMode::Angle => &PidAxis::ALL,
            ControllerMode::Acro => &[PidAxis::Roll, PidAxis::Pitch, PidAxis::Yaw],
            ControllerMode::Fmanual => &[],
        }
    }

    /// Maps four joystick axes onto the operator setpoints.
    pub fn apply_joystick(self, operator: &OperatorState, axes: [f64; 4], scale: &JoystickScale) {
        match self {
            ControllerMode::Angle => angle::handle_joystick(operator, axes, scale),
            ControllerMode::Acro => acro::handle_joystick(operator, axes, scale),
            ControllerMode::Fmanual => manual::handle_joystick(operator, axes, scale),
        }
    }
}

/// The PIDs of the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PidAxis {
    /// Height to climb rate.
    Z,
    /// Roll angle to roll rate.
    Fi,
    /// Pitch angle to pitch rate.
    Theta,
    /// Yaw angle to yaw rate.
    Psi,
    /// Climb rate to collective.
    W,
    /// Roll rate to roll command.
    Roll,
    /// Pitch rate to pitch command.
    Pitch,
    /// Yaw rate to yaw command.
    Yaw,
}

impl PidAxis {
    /// Every PID in bank order.
    pub const ALL: [PidAxis; 8] = [
        PidAxis::Z,
        PidAxis::Fi,
        PidAxis::Theta,
        PidAxis::Psi,
        PidAxis::W,
        PidAxis::Roll,
        PidAxis::Pitch,
        PidAxis::Yaw,
    ];

    /// Configuration name of the PID.
    pub fn name(self) -> &'static str {
        match self {
            PidAxis::Z => "Z",
            PidAxis::Fi => "Fi",
            PidAxis::Theta => "Theta",
            PidAxis::Psi => "Psi",
            PidAxis::W => "W",
            PidAxis::Roll => "Roll",
            PidAxis::Pitch => "Pitch",
            PidAxis::Yaw => "Yaw",
        }
    }

    /// Looks a PID up by configuration name.
    pub fn from_name(name: &str) -> Option<PidAxis> {
        PidAxis::ALL.into_iter().find(|axis| axis.name() == name)
    }

    /// Tuned gains used when the configuration does not override them.
    pub fn default_config(self) -> PidConfig<f64> {
        let (kp, ki, kd, min, max) = match self {
            PidAxis::Z => (2.122, 0.035, -0.387, -1000.0, 1000.0),
            PidAxis::Fi => (9.584, 0.798, 0.192, -1000.0, 1000.0),
            PidAxis::Theta => (5.191, 0.228, 0.127, -1000.0, 1000.0),
            PidAxis::Psi => (5.288, 0.230, -0.151, -1000.0, 1000.0),
            PidAxis::W => (-3556.149, -538.572, -112.917, 0.0, 1000.0),
            PidAxis::Roll => (-6.249, -0.904, -0.219, -250.0, 250.0),
            PidAxis::Pitch => (6.304, 1.174, 0.433, -250.0, 250.0),
            PidAxis::Yaw => (112.662, 22.778, 3.419, -250.0, 250.0),
        };
        PidConfig {
            kp,
            ki,
            kd,
            min,
            max,
            integral_limit: None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One PID per [`PidAxis`].
pub struct PidBank {
    pids: Vec<Pid<f64>>,
}

impl PidBank {
    /// Builds the bank from the default gain table.
    pub fn new(dt: f64) -> Self {
        Self::with_configs(|axis| axis.default_config(), dt)
    }

    /// Builds the bank, asking `config` for each axis in turn.
    pub fn with_configs<F>(mut config: F, dt: f64) -> Self
    where
        F: FnMut(PidAxis) -> PidConfig<f64>,
    {
        Self {
            pids: PidAxis::ALL
                .into_iter()
                .map(|axis| Pid::new(config(axis), dt))
                .collect(),
        }
    }

    /// Advances the PID of `axis` by one step.
    pub fn calc(&mut self, axis: PidAxis, error: f64) -> f64 {
        self.pids[axis.index()].calc(error)
    }

    /// The PID of `axis`.
    pub fn get(&self, axis: PidAxis) -> &Pid<f64> {
        &self.pids[axis.index()]
    }

    /// Zeroes the integral and previous error of every PID.
    pub fn clear(&mut self) {
        self.pids.iter_mut().for_each(Pid::clear);
    }
}

/// The mixers of the airframe.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixers {
    /// Rotor speeds.
    pub rotor: Mixer,
    /// Control surfaces.
    pub surface: Mixer,
}

impl Default for Mixers {
    fn default() -> Self {
        Self {
            rotor: Mixer::quad_x(),
            surface: Mixer::surfaces(),
        }
    }
}

struct CoreState {
    mode: ControllerMode,
    pids: PidBank,
    sink: Box<dyn ActuatorSink>,
}

/// Mode state machine, PID bank and control loop.
pub struct ControlCore {
    state: Mutex<CoreState>,
    operator: Arc<OperatorState>,
    navigation: Arc<dyn NavigationSource>,
    mixers: Mixers,
}

impl ControlCore {
    /// Creates a core in `mode` with every PID cleared.
    pub fn new(
        mode: ControllerMode,
        pids: PidBank,
        mixers: Mixers,
        operator: Arc<OperatorState>,
        navigation: Arc<dyn NavigationSource>,
        sink: Box<dyn ActuatorSink>,
    ) -> Self {
        Self {
            state: Mutex::new(CoreState { mode, pids, sink }),
            operator,
            navigation,
            mixers,
        }
    }

    /// Active mode.
    pub fn mode(&self) -> ControllerMode {
        self.lock().mode
    }

    /// Operator setpoints the core reads.
    pub fn operator(&self) -> &Arc<OperatorState> {
        &self.operator
    }

    /// Runs `f` on the PID bank while holding the mode lock.
    pub fn with_pids<R>(&self, f: impl FnOnce(&PidBank) -> R) -> R {
        f(&self.lock().pids)
    }

    /// Clears every PID and activates `mode`.
    pub fn set_mode(&self, mode: ControllerMode) {
        let mut state = self.lock();
        state.pids.clear();
        let previous = state.mode;
        state.mode = mode;
        log::info!(
            "controller mode {} -> {} using {} PIDs",
            previous.name(),
            mode.name(),
            mode.required_pids().len()
        );
    }

    /// Runs the active control law once.
    pub fn step(&self) {
        let demand: Demand = self.operator.demand();
        let nav = self.navigation.navigation();
        let mut guard = self.lock();
        let CoreState { mode, pids, sink } = &mut *guard;
        let sink = sink.as_mut();
        match mode {
            ControllerMode::Angle => angle::step(pids, &demand, &nav, &self.mixers, sink),
            ControllerMode::Acro => acro::step(pids, &demand, &nav, &self.mixers, sink),
            ControllerMode::Fmanual => manual::step(&demand, &self.mixers, sink),
        }
    }

    /// Spawns the control loop, stepping every `period` on fixed deadlines
    /// until `shutdown` is raised. A late step moves the schedule forward
    /// instead of firing a burst of catch-up steps.
    pub fn spawn_loop(
        self: &Arc<Self>,
        period: Duration,
        shutdown: ShutdownFlag,
    ) -> io::Result<JoinHandle<()>> {
        let core = Arc::clone(self);
        thread::Builder::new()
            .name("controller".to_owned())
            .spawn(move || {
                log::info!(
                    "control loop started in {} mode, period {:?}",
                    core.mode().name(),
                    period
                );
                let mut deadline = Instant::now();
                while !shutdown.is_triggered() {
                    core.step();
                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        log::trace!("control step overran by {:?}", now - deadline);
                        deadline = now;
                    }
                }
                log::info!("control loop exited");
            })
    }

    fn lock(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tracking error passed to every PID.
fn tracking_error(demand: f64, actual: f64) -> f64 {
    demand - actual
}
