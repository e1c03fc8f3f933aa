// src/command.rs

//! # Command Channel
//!
//! Operator commands arrive as text, independent of the control loop:
//!
//! | Command                    | Effect                                       |
//! |----------------------------|----------------------------------------------|
//! | `control:<axis>,<value>`   | store one setpoint                           |
//! | `mode:<angle\|acro\|fmanual>` | clear every PID, then switch mode         |
//! | `joystick:<a>,<b>,<c>,<d>` | mode-specific mapping onto the setpoints     |
//! | `info`                     | mode and setpoints, rebuilt once per period  |
//! | `exit`                     | raise the shutdown flag                      |
//!
//! A command is parsed completely before anything is applied, so a rejected
//! command leaves every setpoint, the mode and the PIDs untouched. The reply
//! is `ok`, the info text, or `error: <reason>`.

pub mod setpoints;
pub use setpoints::*;

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::JoystickScale;
use crate::controller::{ControlCore, ControllerMode};
use crate::error::{CommandError, TransportError};
use crate::task::ShutdownFlag;
use crate::transport::CommandServer;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Store one setpoint.
    Control {
        /// Target axis.
        axis: SetpointAxis,
        /// New value.
        value: f64,
    },
    /// Switch control mode.
    Mode(ControllerMode),
    /// Four joystick axes.
    Joystick([f64; 4]),
    /// Report mode and setpoints.
    Info,
    /// Stop the stack.
    Exit,
}

impl Command {
    /// Parses `<verb>:<payload>`. Verbs without payload may omit the colon.
    pub fn parse(text: &str) -> Result<Command, CommandError> {
        let text = text.trim();
        let (verb, payload) = text.split_once(':').unwrap_or((text, ""));
        let verb = verb.trim();
        let payload = payload.trim();

        if verb.eq_ignore_ascii_case("control") {
            let (axis, value) = payload.split_once(',').ok_or_else(|| CommandError::Malformed {
                verb: "control",
                reason: "expected `<axis>,<value>`".to_owned(),
            })?;
            let axis = SetpointAxis::from_name(axis.trim())
                .ok_or_else(|| CommandError::UnknownAxis(axis.trim().to_owned()))?;
            let value = parse_number("control", value)?;
            Ok(Command::Control { axis, value })
        } else if verb.eq_ignore_ascii_case("mode") {
            ControllerMode::from_name(payload)
                .map(Command::Mode)
                .ok_or_else(|| CommandError::UnknownMode(payload.to_owned()))
        } else if verb.eq_ignore_ascii_case("joystick") {
            let fields: Vec<&str> = payload.split(',').collect();
            if fields.len() != 4 {
                return Err(CommandError::Malformed {
                    verb: "joystick",
                    reason: format!("expected 4 axes, found {}", fields.len()),
                });
            }
            let mut axes = [0.0; 4];
            for (axis, field) in axes.iter_mut().zip(fields) {
                *axis = parse_number("joystick", field)?;
            }
            Ok(Command::Joystick(axes))
        } else if verb.eq_ignore_ascii_case("info") {
            Ok(Command::Info)
        } else if verb.eq_ignore_ascii_case("exit") {
            Ok(Command::Exit)
        } else {
            Err(CommandError::UnknownVerb(verb.to_owned()))
        }
    }
}

fn parse_number(verb: &'static str, field: &str) -> Result<f64, CommandError> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandError::Malformed {
            verb,
            reason: format!("`{}` is not a finite number", field.trim()),
        })
}

/// Applies operator commands to the setpoints and the control core.
pub struct CommandChannel {
    core: Arc<ControlCore>,
    joystick: JoystickScale,
    info_period: Duration,
    info_cache: Mutex<Option<(Instant, String)>>,
    shutdown: ShutdownFlag,
}

impl CommandChannel {
    /// Creates a channel driving `core`. `exit` raises `shutdown`.
    pub fn new(
        core: Arc<ControlCore>,
        joystick: JoystickScale,
        info_period: Duration,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            core,
            joystick,
            info_period,
            info_cache: Mutex::new(None),
            shutdown,
        }
    }

    /// Parses and applies one command, returning the reply text.
    pub fn handle(&self, text: &str) -> String {
        match Command::parse(text) {
            Ok(command) => self.apply(command),
            Err(err) => {
                log::warn!("rejected command `{}`: {}", text.trim(), err);
                format!("error: {}", err)
            }
        }
    }

    /// Applies an already parsed command.
    pub fn apply(&self, command: Command) -> String {
        let operator = self.core.operator();
        match command {
            Command::Control { axis, value } => {
                log::debug!("setpoint {} = {}", axis.name(), value);
                operator.set(axis, value);
            }
            Command::Mode(mode) => self.core.set_mode(mode),
            Command::Joystick(axes) => {
                self.core
                    .mode()
                    .apply_joystick(operator, axes, &self.joystick);
            }
            Command::Info => return self.info(),
            Command::Exit => {
                log::info!("exit requested");
                self.shutdown.trigger();
            }
        }
        "ok".to_owned()
    }

    /// Mode and setpoints, rebuilt at most once per info period.
    pub fn info(&self) -> String {
        let mut cache = self
            .info_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((built, text)) = cache.as_ref() {
            if built.elapsed() < self.info_period {
                return text.clone();
            }
        }
        let text = format!(
            "mode: {}\n{}",
            self.core.mode().name(),
            self.core.operator().demand()
        );
        *cache = Some((Instant::now(), text.clone()));
        text
    }

    /// Spawns the listener that serves `server` until `shutdown` is raised
    /// or the client side goes away.
    pub fn spawn_listener(
        self: &Arc<Self>,
        server: CommandServer,
        receive_timeout: Duration,
        shutdown: ShutdownFlag,
    ) -> io::Result<JoinHandle<()>> {
        let channel = Arc::clone(self);
        thread::Builder::new()
            .name("commands".to_owned())
            .spawn(move || {
                log::info!("command listener started");
                while !shutdown.is_triggered() {
                    match server.recv_timeout(receive_timeout) {
                        Ok(request) => {
                            let text = String::from_utf8_lossy(&request.command).into_owned();
                            let reply = channel.handle(&text);
                            request.reply(reply);
                        }
                        Err(TransportError::Timeout) => {}
                        Err(TransportError::Disconnected) => {
                            log::warn!("command client disconnected, stopping listener");
                            break;
                        }
                    }
                }
                log::info!("command listener exited");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Mixers, Navigation, NavigationSource, PidAxis, PidBank};
    use crate::test_utils::*;
    use crate::transport::command_pipe;
    use nalgebra::Vector3;

    struct Drifting;

    impl NavigationSource for Drifting {
        fn navigation(&self) -> Navigation {
            Navigation {
                position: Vector3::new(0.0, 0.0, 3.0),
                body_angular_velocity: Vector3::new(0.1, -0.1, 0.2),
                ..Navigation::default()
            }
        }
    }

    fn build_channel(info_period: Duration) -> (CommandChannel, Arc<ControlCore>, ShutdownFlag) {
        let core = Arc::new(ControlCore::new(
            ControllerMode::Angle,
            PidBank::new(0.003),
            Mixers::default(),
            Arc::new(OperatorState::new()),
            Arc::new(Drifting),
            Box::new(RecordingSink::default()),
        ));
        let shutdown = ShutdownFlag::new();
        let channel = CommandChannel::new(
            core.clone(),
            JoystickScale {
                max_angle: 0.5,
                max_rate: 2.0,
            },
            info_period,
            shutdown.clone(),
        );
        (channel, core, shutdown)
    }

    /// Test parsing of every verb.
    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Ok(Command::Control {
                axis: SetpointAxis::Z,
                value: -12.5
            }),
            Command::parse("control:z, -12.5")
        );
        assert_eq!(
            Ok(Command::Mode(ControllerMode::Acro)),
            Command::parse("MODE:Acro")
        );
        assert_eq!(
            Ok(Command::Joystick([1.0, 0.5, -0.5, 0.0])),
            Command::parse("joystick:1,0.5,-0.5,0")
        );
        assert_eq!(Ok(Command::Info), Command::parse("info"));
        assert_eq!(Ok(Command::Info), Command::parse("info:"));
        assert_eq!(Ok(Command::Exit), Command::parse(" exit \n"));
    }

    /// Test malformed commands are rejected with a reason.
    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("hover"), Err(CommandError::UnknownVerb(_))));
        assert!(matches!(
            Command::parse("control:yaw,1"),
            Err(CommandError::UnknownAxis(_))
        ));
        assert!(matches!(
            Command::parse("control:X"),
            Err(CommandError::Malformed { verb: "control", .. })
        ));
        assert!(matches!(
            Command::parse("control:X,abc"),
            Err(CommandError::Malformed { verb: "control", .. })
        ));
        assert!(matches!(
            Command::parse("control:X,inf"),
            Err(CommandError::Malformed { .. })
        ));
        assert!(matches!(
            Command::parse("mode:loiter"),
            Err(CommandError::UnknownMode(_))
        ));
        assert!(matches!(
            Command::parse("joystick:1,2,3"),
            Err(CommandError::Malformed { verb: "joystick", .. })
        ));
    }

    /// Test control commands store setpoints.
    #[test]
    fn test_control_sets_setpoint() {
        let (channel, core, _) = build_channel(Duration::ZERO);
        assert_eq!("ok", channel.handle("control:Theta,0.25"));
        assert_eq!("ok", channel.handle("control:throttle,450"));
        assert!(value_close(0.25, core.operator().get(SetpointAxis::Theta)));
        assert!(value_close(450.0, core.operator().get(SetpointAxis::Throttle)));
    }

    /// Test an invalid mode leaves mode and PIDs untouched.
    #[test]
    fn test_invalid_mode_is_rejected() {
        let (channel, core, _) = build_channel(Duration::ZERO);
        core.step();
        core.step();
        let before = channel.info();

        let reply = channel.handle("mode:hover");
        assert!(reply.starts_with("error: "), "Unexpected reply `{reply}`.");
        assert_eq!(ControllerMode::Angle, core.mode());
        assert_eq!(before, channel.info());

        let integral = core.with_pids(|pids| pids.get(PidAxis::Z).integral());
        assert!(integral != 0.0);
        channel.handle("mode:");
        assert_eq!(integral, core.with_pids(|pids| pids.get(PidAxis::Z).integral()));
    }

    /// Test a valid mode switch replies ok and changes the mode.
    #[test]
    fn test_mode_switch() {
        let (channel, core, _) = build_channel(Duration::ZERO);
        assert_eq!("ok", channel.handle("mode:fmanual"));
        assert_eq!(ControllerMode::Fmanual, core.mode());
    }

    /// Test the joystick mapping follows the active mode.
    #[test]
    fn test_joystick_per_mode() {
        let (channel, core, _) = build_channel(Duration::ZERO);
        assert_eq!("ok", channel.handle("joystick:300,0.2,0.4,-1"));
        let operator = core.operator();
        assert!(value_close(300.0, operator.get(SetpointAxis::Throttle)));
        assert!(value_close(0.1, operator.get(SetpointAxis::Fi)));
        assert!(value_close(-0.2, operator.get(SetpointAxis::Theta)));
        assert!(value_close(-0.5, operator.get(SetpointAxis::Psi)));

        channel.handle("mode:acro");
        assert_eq!("ok", channel.handle("joystick:100,0.5,0.25,-0.5"));
        assert!(value_close(100.0, operator.get(SetpointAxis::Throttle)));
        assert!(value_close(1.0, operator.get(SetpointAxis::P)));
        assert!(value_close(-0.5, operator.get(SetpointAxis::Q)));
        assert!(value_close(-1.0, operator.get(SetpointAxis::R)));
    }

    /// Test info is cached for the info period.
    #[test]
    fn test_info_cached() {
        let (channel, _, _) = build_channel(Duration::from_secs(60));
        let first = channel.handle("info");
        assert!(first.starts_with("mode: angle\nX: 0"));
        channel.handle("control:X,5");
        assert_eq!(first, channel.handle("info"), "Info should be served from cache.");

        let (channel, _, _) = build_channel(Duration::ZERO);
        channel.handle("control:X,5");
        assert!(channel.handle("info").contains("X: 5"));
    }

    /// Test exit raises the shutdown flag.
    #[test]
    fn test_exit() {
        let (channel, _, shutdown) = build_channel(Duration::ZERO);
        assert_eq!("ok", channel.handle("exit"));
        assert!(shutdown.is_triggered());
    }

    /// Test the listener serves requests over a command pipe.
    #[test]
    fn test_listener() {
        let (channel, core, shutdown) = build_channel(Duration::ZERO);
        let channel = Arc::new(channel);
        let (client, server) = command_pipe();
        let handle = channel
            .spawn_listener(server, Duration::from_millis(5), shutdown.clone())
            .unwrap();

        let wait = Duration::from_secs(1);
        assert_eq!("ok", client.request("mode:acro", wait).unwrap());
        assert!(client
            .request("bogus", wait)
            .unwrap()
            .starts_with("error: unknown command"));
        assert_eq!("ok", client.request("exit", wait).unwrap());
        handle.join().unwrap();
        assert_eq!(ControllerMode::Acro, core.mode());
    }
}
