//! One motor's control surface: owns the DC driver and tacho handles, the
//! observer, and the active control command, and exposes the user-facing
//! run/stop operations.

use fixed::types::I16F16;
use tracing::{debug, info, warn};

use servohub_common::actuation::ActuationKind;
use servohub_common::consts::{deg_to_mdeg, MDEG_PER_DEG};
use servohub_common::error::ErrorKind;
use servohub_common::model::ObserverModel;
use servohub_common::motor::MotorType;
use servohub_common::settings::{settings_for, ControlSettings};

use crate::control::law::{Completion, ControlLaw, ControlType};
use crate::control::pid::PidGains;
use crate::error::ServoError;
use crate::observer::Observer;
use crate::trajectory::Trajectory;

/// The DC motor driver this core drives. Duty is per-mille of full scale,
/// signed.
pub trait DcMotor {
    fn coast(&mut self);
    fn brake(&mut self);
    fn set_duty(&mut self, duty_millivolt: i32) -> Result<(), ErrorKind>;
    fn motor_type(&self) -> MotorType;
}

/// The tacho/encoder driver this core reads. Counts are in the motor's own
/// (ungeared) shaft domain; [`Servo`] applies the gear ratio at its public
/// boundary.
pub trait Tacho {
    fn count(&self) -> i32;
    fn rate(&self) -> i32;
    fn reset_angle(&mut self, value: i32, use_absolute: bool) -> Result<(), ErrorKind>;
}

/// Monotonic clock, consumed by the scheduler to drive `control_update`.
pub trait Clock {
    fn now_us(&self) -> i64;
}

/// A bound motor: DC driver, tacho, observer, control settings, and the
/// currently active command, if any.
///
/// The observer, trajectory, and control law all operate in the tacho's raw
/// (motor-shaft) count domain, since the observer model was identified
/// against that shaft; `gear_ratio` converts only at the public,
/// output-shaft-facing boundary (`run_target`, `run_angle`, `reset_angle`).
pub struct Servo<D, T> {
    port: u8,
    dc: D,
    tacho: T,
    gear_ratio: I16F16,
    settings: ControlSettings,
    model: &'static ObserverModel,
    gains: PidGains,
    observer: Observer,
    control: ControlLaw,
    last_voltage: i32,
    last_tick_time: i64,
    connected: bool,
}

impl<D: DcMotor, T: Tacho> Servo<D, T> {
    /// Acquires a servo at `port`: loads settings from the DC driver's
    /// reported motor type and resets the observer at the tacho's current
    /// count.
    pub fn get(port: u8, dc: D, tacho: T, gear_ratio: I16F16) -> Self {
        let motor_type = dc.motor_type();
        let (settings, model) = settings_for(motor_type);
        let gains = PidGains { kp: settings.pid_kp, ki: settings.pid_ki, kd: settings.pid_kd };
        let measured = tacho.count();
        info!(port, ?motor_type, "servo acquired");
        Servo {
            port,
            dc,
            tacho,
            gear_ratio,
            settings,
            model,
            gains,
            observer: Observer::new(model, measured),
            control: ControlLaw::idle(),
            last_voltage: 0,
            last_tick_time: 0,
            connected: true,
        }
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The observer's current best estimate, in output-shaft degrees and
    /// degrees/sec.
    pub fn estimated_state(&self) -> (i32, i32) {
        let (count, rate) = self.observer.estimated_state();
        (self.to_output(count), self.to_output(rate))
    }

    /// Converts an output-shaft (geared, user-facing) value to the tacho's
    /// raw motor-shaft domain.
    fn to_raw(&self, output_value: i32) -> i32 {
        (I16F16::from_num(output_value) * self.gear_ratio).to_num()
    }

    /// Converts a raw motor-shaft value to the output-shaft domain.
    fn to_output(&self, raw_value: i32) -> i32 {
        I16F16::from_num(raw_value)
            .checked_div(self.gear_ratio)
            .map(|v| v.to_num())
            .unwrap_or(raw_value)
    }

    /// Resets the angle origin. Stops any active command unless the servo
    /// is holding (ANGLE control, on target), in which case the hold
    /// target shifts by the same delta as the measured angle.
    pub fn reset_angle(&mut self, new_angle: i32, use_absolute: bool) -> Result<(), ServoError> {
        let holding = self.control.control_type() == ControlType::Angle;
        if !holding {
            self.stop_internal();
        }
        self.tacho
            .reset_angle(self.to_raw(new_angle), use_absolute)
            .map_err(|kind| ServoError::new(kind, "tacho reset_angle failed"))?;
        let measured = self.tacho.count();
        self.observer.reset(measured);
        Ok(())
    }

    /// Stops control and passes `duty_millivolt` directly to the DC driver.
    pub fn set_duty(&mut self, duty_millivolt: i32) -> Result<(), ServoError> {
        self.stop_internal();
        self.dispatch_duty(duty_millivolt)
    }

    /// Stops the active command and applies the requested actuation.
    pub fn stop(&mut self, after_stop: ActuationKind) -> Result<(), ServoError> {
        self.stop_internal();
        match after_stop {
            ActuationKind::Coast => {
                self.dc.coast();
                Ok(())
            }
            ActuationKind::Brake => {
                self.dc.brake();
                Ok(())
            }
            ActuationKind::Hold => {
                let (count, _) = self.observer.estimated_state();
                self.control.start_angle(
                    Trajectory::hold(self.last_tick_time, count as i64 * MDEG_PER_DEG),
                    Completion::Hold,
                    ActuationKind::Hold,
                );
                Ok(())
            }
            ActuationKind::Duty => self.dispatch_duty(0),
        }
    }

    /// Runs indefinitely at `speed` (output-shaft degrees/sec).
    pub fn run(&mut self, time_now: i64, speed: i32) {
        self.last_tick_time = time_now;
        let (count, rate) = self.observer.estimated_state();
        let traj = Trajectory::for_rate(
            time_now,
            count as i64 * MDEG_PER_DEG,
            rate * MDEG_PER_DEG as i32,
            deg_to_mdeg(self.to_raw(speed)),
            self.settings.acceleration,
            self.settings.deceleration,
        );
        self.control.start_timed(traj, Completion::Never, ActuationKind::Coast);
    }

    /// Runs at `speed` for `duration_us`, then applies `after_stop`.
    pub fn run_time(&mut self, time_now: i64, speed: i32, duration_us: i64, after_stop: ActuationKind) {
        self.last_tick_time = time_now;
        let (count, rate) = self.observer.estimated_state();
        let traj = Trajectory::for_rate_timed(
            time_now,
            count as i64 * MDEG_PER_DEG,
            rate * MDEG_PER_DEG as i32,
            deg_to_mdeg(self.to_raw(speed)),
            self.settings.acceleration,
            self.settings.deceleration,
            duration_us,
        );
        self.control.start_timed(traj, Completion::Time, after_stop);
    }

    /// Runs at `speed` until the observer detects a sustained stall, then
    /// applies `after_stop`.
    pub fn run_until_stalled(&mut self, time_now: i64, speed: i32, after_stop: ActuationKind) {
        self.last_tick_time = time_now;
        let (count, rate) = self.observer.estimated_state();
        let traj = Trajectory::for_rate(
            time_now,
            count as i64 * MDEG_PER_DEG,
            rate * MDEG_PER_DEG as i32,
            deg_to_mdeg(self.to_raw(speed)),
            self.settings.acceleration,
            self.settings.deceleration,
        );
        self.control.start_timed(traj, Completion::Stalled, after_stop);
    }

    /// Runs at `speed` toward the absolute output-shaft angle `target`,
    /// then applies `after_stop`.
    pub fn run_target(&mut self, time_now: i64, speed: i32, target: i32, after_stop: ActuationKind) {
        self.last_tick_time = time_now;
        let (count, rate) = self.observer.estimated_state();
        let target_raw = self.to_raw(target);
        let traj = Trajectory::for_target(
            time_now,
            count as i64 * MDEG_PER_DEG,
            rate * MDEG_PER_DEG as i32,
            target_raw as i64 * MDEG_PER_DEG,
            deg_to_mdeg(self.to_raw(speed)),
            self.settings.acceleration,
            self.settings.deceleration,
        );
        self.control.start_angle(traj, Completion::Position, after_stop);
    }

    /// Runs at `speed` by a relative output-shaft angle `delta`, then
    /// applies `after_stop`.
    pub fn run_angle(&mut self, time_now: i64, speed: i32, delta: i32, after_stop: ActuationKind) {
        let (count, _) = self.observer.estimated_state();
        let target = self.to_output(count) + delta;
        self.run_target(time_now, speed, target, after_stop);
    }

    /// Re-targets an already-active ANGLE command at the default speed,
    /// used by continuous tracking callers.
    pub fn track_target(&mut self, time_now: i64, target: i32) {
        let default_speed = self.to_output(self.settings.speed_default / MDEG_PER_DEG as i32);
        self.run_target(time_now, default_speed, target, ActuationKind::Coast);
    }

    fn stop_internal(&mut self) {
        self.control.stop();
    }

    fn dispatch_duty(&mut self, duty_millivolt: i32) -> Result<(), ServoError> {
        match self.dc.set_duty(duty_millivolt) {
            Ok(()) => {
                self.last_voltage = duty_millivolt;
                Ok(())
            }
            Err(ErrorKind::Io) => {
                warn!(port = self.port, "driver io error, coasting");
                self.dc.coast();
                self.control.stop();
                self.connected = false;
                Err(ServoError::new(ErrorKind::Io, "driver set_duty failed"))
            }
            Err(kind) => Err(ServoError::new(kind, "driver set_duty failed")),
        }
    }

    /// Advances the observer and control law by one tick, and dispatches
    /// the resulting actuation to the DC driver.
    pub fn control_update(&mut self, time_now: i64) -> Result<(), ServoError> {
        self.last_tick_time = time_now;
        let measured_count = self.tacho.count();
        let measured_rate = self.tacho.rate();

        let (stalled, _) = self.observer.is_stalled(time_now, self.settings.stall_time);

        let output = self.control.update(
            time_now,
            measured_count,
            measured_rate,
            &self.settings,
            self.model,
            &self.gains,
            stalled,
        );

        debug!(
            port = self.port,
            time_now,
            measured_count,
            measured_rate,
            actuation = ?output.actuation,
            value = output.value,
            "control tick"
        );

        let dispatch_result = match output.actuation {
            ActuationKind::Coast => {
                self.dc.coast();
                Ok(())
            }
            ActuationKind::Brake => {
                self.dc.brake();
                Ok(())
            }
            // The transition tick into HOLD only starts position-hold
            // control (already done above); it carries the hold target
            // count in `value`, not a duty, so it must not reach the
            // driver's set_duty path.
            ActuationKind::Hold => Ok(()),
            ActuationKind::Duty => self.dispatch_duty(output.value),
        };

        self.observer.update(
            time_now,
            measured_count,
            output.actuation,
            self.last_voltage,
            self.settings.stall_time,
        );

        dispatch_result
    }
}
