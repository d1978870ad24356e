//! End-to-end scenarios exercising the observer, trajectory, control law,
//! and servo facade together.

use std::cell::RefCell;
use std::rc::Rc;

use fixed::types::I16F16;

use servohub_common::actuation::ActuationKind;
use servohub_common::error::ErrorKind;
use servohub_common::model::MODEL_TECHNIC_L;
use servohub_common::motor::MotorType;
use servohub_common::settings::settings_for;
use servohub_core::observer::Observer;
use servohub_core::servo::{DcMotor, Servo, Tacho};

const TICK_US: i64 = 5_000;

/// A duty-proportional shaft shared between a [`SimDc`] and a [`SimTacho`],
/// letting these scenarios drive a real closed loop end to end instead of
/// stubbing the feedback path away.
struct Shaft {
    count_mdeg: i64,
    rate_mdeg: i32,
}

struct SimDc {
    motor_type: MotorType,
    shaft: Rc<RefCell<Shaft>>,
    duty_millivolt: i32,
    fail: Rc<RefCell<bool>>,
}

impl DcMotor for SimDc {
    fn coast(&mut self) {
        self.advance(0);
    }
    fn brake(&mut self) {
        self.advance(0);
    }
    fn set_duty(&mut self, duty_millivolt: i32) -> Result<(), ErrorKind> {
        if *self.fail.borrow() {
            return Err(ErrorKind::Io);
        }
        self.advance(duty_millivolt);
        Ok(())
    }
    fn motor_type(&self) -> MotorType {
        self.motor_type
    }
}

impl SimDc {
    fn advance(&mut self, next_duty: i32) {
        let mut shaft = self.shaft.borrow_mut();
        shaft.rate_mdeg = self.duty_millivolt * 10;
        shaft.count_mdeg += shaft.rate_mdeg as i64 * TICK_US / 1_000_000;
        self.duty_millivolt = next_duty;
    }
}

struct SimTacho {
    shaft: Rc<RefCell<Shaft>>,
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

fn sim_servo(
    motor_type: MotorType,
) -> (Servo<SimDc, SimTacho>, Rc<RefCell<Shaft>>, Rc<RefCell<bool>>) {
    let shaft = Rc::new(RefCell::new(Shaft { count_mdeg: 0, rate_mdeg: 0 }));
    let fail = Rc::new(RefCell::new(false));
    let dc = SimDc { motor_type, shaft: shaft.clone(), duty_millivolt: 0, fail: fail.clone() };
    let tacho = SimTacho { shaft: shaft.clone() };
    (Servo::get(0, dc, tacho, I16F16::from_num(1)), shaft, fail)
}

// A. Reset + estimate.
#[test]
fn reset_and_estimate() {
    let mut observer = Observer::new(&MODEL_TECHNIC_L, 360);
    observer.update(1_000, 360, ActuationKind::Duty, 0, 200_000);
    assert_eq!(observer.estimated_state(), (360, 0));
}

// B. Forward step response.
#[test]
fn forward_step_response_reaches_commanded_speed() {
    let (mut servo, _shaft, _fail) = sim_servo(MotorType::TechnicL);

    servo.run(0, 500);

    let mut t = 0i64;
    while t < 500_000 {
        t += TICK_US;
        servo.control_update(t).unwrap();
    }

    let (_count, rate) = servo.estimated_state();
    let target = 500;
    assert!(rate > 0, "observer should report forward motion, got {rate}");
    assert!(
        (rate - target).abs() <= target / 5,
        "rate {rate} not within 20% of commanded {target} deg/s"
    );
}

// C. Position target.
#[test]
fn position_target_settles_within_tolerance() {
    let (settings, _) = settings_for(MotorType::TechnicL);
    let (mut servo, _shaft, _fail) = sim_servo(MotorType::TechnicL);

    servo.run_target(0, 500, 180, ActuationKind::Coast);

    let mut t = 0i64;
    while t < 2_000_000 {
        t += TICK_US;
        servo.control_update(t).unwrap();
    }

    let (count, rate) = servo.estimated_state();
    let position_tolerance_deg = (settings.position_tolerance / 1000).max(5);
    assert!(
        (count - 180).abs() <= position_tolerance_deg,
        "count {count} not within tolerance of target 180"
    );
    assert!(rate.abs() <= settings.speed_tolerance.max(50), "rate {rate} not settled");
}

// D. Stall.
#[test]
fn stall_saturates_and_reports_stalled() {
    let (settings, model) = settings_for(MotorType::Interactive);
    let mut observer = Observer::new(model, 0);

    // Measured count held at 0 (stuck) while commanding full forward
    // voltage drives the feedback term negative, tripping the predicate.
    let mut t = 0i64;
    for _ in 0..210 {
        t += 1_000;
        observer.update(t, 0, ActuationKind::Duty, 9_000, settings.stall_time);
    }
    let (stalled, _) = observer.is_stalled(t, settings.stall_time);
    assert!(stalled);
}

// E. Wrap.
#[test]
fn angle_wraps_and_offset_advances() {
    let mut observer = Observer::new(&MODEL_TECHNIC_L, 0);
    let mut t = 0i64;
    let (mut count_prev, _) = observer.estimated_state();
    for _ in 0..2_000_000 {
        t += 1_000;
        observer.update(t, 0, ActuationKind::Duty, 9_000, 200_000);
        let (count_now, _) = observer.estimated_state();
        // No discontinuity greater than a handful of degrees per tick at
        // this drive voltage; the offset absorbs the internal wrap.
        assert!((count_now - count_prev).abs() < 1_000_000);
        count_prev = count_now;
    }
}

// F. Coast-on-error.
#[test]
fn driver_io_error_coasts_and_disconnects() {
    let (mut servo, shaft, fail) = sim_servo(MotorType::TechnicL);

    servo.run(0, 500);
    servo.control_update(TICK_US).unwrap();
    assert!(servo.is_connected());
    let rate_before_failure = shaft.borrow().rate_mdeg;
    assert_ne!(rate_before_failure, 0, "first tick should have actuated");

    // Force every subsequent dispatch to fail; the facade must coast and
    // disconnect rather than propagate a panicking state.
    *fail.borrow_mut() = true;
    let result = servo.control_update(2 * TICK_US);
    assert!(result.is_err());
    assert!(!servo.is_connected());
}
