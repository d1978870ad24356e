//! Demo binary: wires a simulated DC motor + tacho pair per configured port
//! into the [`servohub_core::scheduler::Controller`] and runs the periodic
//! control loop.
//!
//! This binary exists to exercise the core end-to-end; it is not the
//! reference firmware's own I/O stack (out of scope, per the purpose
//! statement) — driver/tacho access here is a physics-free simulation.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fixed::types::I16F16;
use tracing::info;

use servohub_common::actuation::ActuationKind;
use servohub_common::error::ErrorKind;
use servohub_common::motor::MotorType;
use servohub_core::config::{load_config, SchedulerConfig};
use servohub_core::scheduler::Controller;
use servohub_core::servo::{DcMotor, Servo, Tacho};

const MAX_PORTS: usize = 8;

/// The simulated physical shaft a [`SimMotor`]/[`SimTacho`] pair share:
/// no load dynamics, no noise, just duty-proportional rate.
struct SimShaft {
    count_mdeg: i64,
    rate_mdeg: i32,
}

struct SimMotor {
    motor_type: MotorType,
    shaft: Rc<RefCell<SimShaft>>,
    duty_millivolt: i32,
    tick_period_us: i64,
}

impl SimMotor {
    /// Advances the shared shaft by one tick at the duty that was in
    /// effect since the last advance, then records the newly requested
    /// duty — a zero-order-hold simulation matching the one duty-per-tick
    /// cadence `control_update` actually drives.
    fn advance_then_set(&mut self, duty_millivolt: i32) {
        let mut shaft = self.shaft.borrow_mut();
        shaft.rate_mdeg = self.duty_millivolt * 10;
        shaft.count_mdeg += shaft.rate_mdeg as i64 * self.tick_period_us / 1_000_000;
        self.duty_millivolt = duty_millivolt;
    }
}

impl DcMotor for SimMotor {
    fn coast(&mut self) {
        self.advance_then_set(0);
    }
    fn brake(&mut self) {
        self.advance_then_set(0);
    }
    fn set_duty(&mut self, duty_millivolt: i32) -> Result<(), ErrorKind> {
        self.advance_then_set(duty_millivolt);
        Ok(())
    }
    fn motor_type(&self) -> MotorType {
        self.motor_type
    }
}

struct SimTacho {
    shaft: Rc<RefCell<SimShaft>>,
}

impl Tacho for SimTacho {
    fn count(&self) -> i32 {
        (self.shaft.borrow().count_mdeg / 1000) as i32
    }
    fn rate(&self) -> i32 {
        self.shaft.borrow().rate_mdeg / 1000
    }
    fn reset_angle(&mut self, value: i32, _use_absolute: bool) -> Result<(), ErrorKind> {
        self.shaft.borrow_mut().count_mdeg = value as i64 * 1000;
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("servohub.toml"));

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    info!(tick_period_us = config.tick_period_us, ports = config.ports.len(), "scheduler starting");

    let mut controller: Controller<SimMotor, SimTacho, MAX_PORTS> = Controller::new();

    for port_cfg in &config.ports {
        let shaft = Rc::new(RefCell::new(SimShaft { count_mdeg: 0, rate_mdeg: 0 }));
        let dc = SimMotor {
            motor_type: port_cfg.motor_type,
            shaft: shaft.clone(),
            duty_millivolt: 0,
            tick_period_us: config.tick_period_us,
        };
        let tacho = SimTacho { shaft };
        let gear_ratio = I16F16::from_num(port_cfg.gear_ratio);
        let servo = Servo::get(port_cfg.port, dc, tacho, gear_ratio);
        controller.bind(servo).expect("bind configured port");
    }

    run_sim_loop(config, &mut controller);
}

fn run_sim_loop(config: SchedulerConfig, controller: &mut Controller<SimMotor, SimTacho, MAX_PORTS>) {
    let period = Duration::from_micros(config.tick_period_us as u64);
    let start = Instant::now();

    for port_cfg in &config.ports {
        if let Some(servo) = controller.get_mut(port_cfg.port) {
            servo.run_target(0, 200, 90, ActuationKind::Hold);
        }
    }

    loop {
        let tick_start = Instant::now();
        let time_now_us = start.elapsed().as_micros() as i64;

        controller.poll(time_now_us);

        let elapsed = tick_start.elapsed();
        controller.record_tick(elapsed.as_nanos() as i64, config.tick_period_us * 1000);
        if let Some(remaining) = period.checked_sub(elapsed) {
            std::thread::sleep(remaining);
        }
    }
}
