//! Observer / control-law hot-path micro-benchmark.
//!
//! Measures throughput of the per-tick pieces the scheduler calls once per
//! bound servo every cycle:
//! - Observer state update alone
//! - Control law update alone (trajectory sample + PID + feedforward + saturation)
//! - A full `Servo::control_update` tick, wiring both together

use criterion::{criterion_group, criterion_main, Criterion};

use fixed::types::I16F16;
use servohub_common::error::ErrorKind;
use servohub_common::motor::MotorType;
use servohub_common::settings::settings_for;
use servohub_core::control::law::{Completion, ControlLaw};
use servohub_core::control::pid::PidGains;
use servohub_core::observer::Observer;
use servohub_core::servo::{DcMotor, Servo, Tacho};
use servohub_core::trajectory::Trajectory;

const DT_US: i64 = 5_000; // 5 ms tick

fn bench_observer_update(c: &mut Criterion) {
    let (settings, model) = settings_for(MotorType::TechnicL);
    let mut observer = Observer::new(model, 0);
    let mut t = 0i64;

    c.bench_function("observer_update", |b| {
        b.iter(|| {
            t += DT_US;
            observer.update(t, (t / 10) as i32, servohub_common::actuation::ActuationKind::Duty, 3000, settings.stall_time)
        });
    });
}

fn bench_control_law_update(c: &mut Criterion) {
    let (settings, model) = settings_for(MotorType::TechnicL);
    let gains = PidGains { kp: settings.pid_kp, ki: settings.pid_ki, kd: settings.pid_kd };
    let mut law = ControlLaw::idle();
    let traj = Trajectory::for_target(0, 0, 0, 1_000_000, 500_000, 2_000_000, 2_000_000);
    law.start_angle(traj, Completion::Position, servohub_common::actuation::ActuationKind::Coast);
    let mut t = 0i64;

    c.bench_function("control_law_update", |b| {
        b.iter(|| {
            t += DT_US;
            law.update(t, (t / 20) as i32, 100, &settings, model, &gains, false)
        });
    });
}

struct BenchDc;
impl DcMotor for BenchDc {
    fn coast(&mut self) {}
    fn brake(&mut self) {}
    fn set_duty(&mut self, _duty_millivolt: i32) -> Result<(), ErrorKind> {
        Ok(())
    }
    fn motor_type(&self) -> MotorType {
        MotorType::TechnicL
    }
}

struct BenchTacho {
    count: i32,
}
impl Tacho for BenchTacho {
    fn count(&self) -> i32 {
        self.count
    }
    fn rate(&self) -> i32 {
        100
    }
    fn reset_angle(&mut self, value: i32, _use_absolute: bool) -> Result<(), ErrorKind> {
        self.count = value;
        Ok(())
    }
}

fn bench_full_control_update(c: &mut Criterion) {
    let dc = BenchDc;
    let tacho = BenchTacho { count: 0 };
    let mut servo = Servo::get(0, dc, tacho, I16F16::from_num(1));
    servo.run_target(0, 500, 90_000, servohub_common::actuation::ActuationKind::Hold);
    let mut t = 0i64;

    c.bench_function("servo_control_update", |b| {
        b.iter(|| {
            t += DT_US;
            servo.control_update(t)
        });
    });
}

criterion_group!(benches, bench_observer_update, bench_control_law_update, bench_full_control_update);
criterion_main!(benches);
