// demos/hover.rs

//! Runs the whole stack against a synthetic hovering vehicle on an
//! in-process bus, sends a few operator commands and prints the actuator
//! frames that come out.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nalgebra::Vector3;
use sitl_flight_control::codec::Topic;
use sitl_flight_control::command::{CommandChannel, OperatorState};
use sitl_flight_control::config::Params;
use sitl_flight_control::controller::{ControlCore, ControllerMode, PublisherSink, SensorNavigation};
use sitl_flight_control::environment::{Environment, EnvironmentTopics, PhysicalState, LOG_COLUMNS};
use sitl_flight_control::log_sink::TraceLog;
use sitl_flight_control::sensor::SensorSuite;
use sitl_flight_control::task::TaskGroup;
use sitl_flight_control::transport::{command_pipe, LocalBus, Publisher, Subscriber};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let params = Params::from_json(r#"{ "seed": 42, "joystick": { "max_angle": 0.3, "max_rate": 2.0 } }"#)?;

    let bus = LocalBus::new();
    let speed = bus.subscribe(Topic::Speed.prefix());
    let surface = bus.subscribe(Topic::Surface.prefix());
    let mut group = TaskGroup::new();

    let env = Arc::new(Environment::with_receive_timeout(
        Box::new(TraceLog::new("environment", LOG_COLUMNS)),
        params.receive_timeout(),
    ));
    let handle = env.spawn_listener(EnvironmentTopics::subscribe(&bus), group.shutdown_flag())?;
    group.adopt("environment", handle);

    let sensors = Arc::new(SensorSuite::from_params(
        env.clone(),
        &params.sensors,
        params.seed,
        &mut |name, columns| Box::new(TraceLog::new(name, columns)),
    )?);
    let handle = sensors.spawn_scheduler(Duration::from_millis(1), group.shutdown_flag())?;
    group.adopt("sensors", handle);

    let core = Arc::new(ControlCore::new(
        ControllerMode::Angle,
        params.pid_bank(),
        params.mixers()?,
        Arc::new(OperatorState::new()),
        Arc::new(SensorNavigation::new(sensors.clone())),
        Box::new(PublisherSink::new(bus.publisher())),
    ));
    let handle = core.spawn_loop(params.step_time(), group.shutdown_flag())?;
    group.adopt("controller", handle);

    let (client, server) = command_pipe();
    let channel = Arc::new(CommandChannel::new(
        core,
        params.joystick,
        params.info_period(),
        group.shutdown_flag(),
    ));
    let handle = channel.spawn_listener(server, params.receive_timeout(), group.shutdown_flag())?;
    group.adopt("commands", handle);

    // A simulator stand-in: the vehicle hovers at 10 m with a slight tilt.
    let publisher = bus.publisher();
    group.spawn("simulator", move |shutdown| {
        let mut time = 0.0;
        while !shutdown.is_triggered() {
            let state = PhysicalState {
                time,
                position: Vector3::new(0.0, 0.0, -10.0),
                orientation: Vector3::new(0.02, -0.01, 0.0),
                ..PhysicalState::default()
            };
            for frame in state.to_frames() {
                publisher.publish(frame.as_bytes());
            }
            time += 0.002;
            thread::sleep(Duration::from_millis(2));
        }
    })?;

    let wait = Duration::from_millis(100);
    for command in [
        "control:Z,-10",
        "joystick:0,0.1,0,0",
        "info",
        "mode:fmanual",
        "control:throttle,400",
        "control:P,0.2",
        "info",
    ] {
        println!("> {}", command);
        println!("{}", client.request(command, wait)?);
        thread::sleep(Duration::from_millis(30));
        if let Ok(frame) = speed.recv_timeout(wait) {
            println!("  {}", String::from_utf8_lossy(&frame));
        }
        if let Ok(frame) = surface.recv_timeout(Duration::from_millis(5)) {
            println!("  {}", String::from_utf8_lossy(&frame));
        }
    }

    println!("> exit");
    println!("{}", client.request("exit", wait)?);
    let panicked = group.shutdown();
    println!("stopped, {} task(s) panicked", panicked);
    Ok(())
}
